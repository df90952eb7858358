use crate::core::{AccessUnit, CodecParameters, PixelFormat, PlayerError, Result};
use crate::player::codec::{CodecOutput, Picture, SendStatus, VideoCodec};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{codec, software, util};
use log::{debug, info};

const EAGAIN: i32 = 11;

/// FFmpeg 软件视频解码器（输出统一转换为 RGBA）
pub struct FfmpegVideoCodec {
    decoder: codec::decoder::Video,
    scaler: Option<software::scaling::Context>,
    draining: bool,
    codec_name: String,
}

// SwsContext 本身不是 Send，但每个解码器实例只在工作线程中使用
unsafe impl Send for FfmpegVideoCodec {}

impl FfmpegVideoCodec {
    /// 按 Demuxer 给出的流参数创建解码器
    pub fn configure(params: &CodecParameters) -> Result<Self> {
        info!("创建视频解码器: {} ({})", params.mime, params.codec_name);
        let native = params
            .native
            .as_ref()
            .ok_or_else(|| PlayerError::CodecConfig(format!("缺少 {} 的流参数", params.mime)))?;

        let context = codec::context::Context::from_parameters(native.0.clone())
            .map_err(|e| PlayerError::CodecConfig(format!("{}: {}", params.mime, e)))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| PlayerError::CodecConfig(format!("不支持的格式 {}: {}", params.mime, e)))?;

        debug!(
            "软件解码器: {}x{}, 格式: {:?}",
            decoder.width(),
            decoder.height(),
            decoder.format()
        );

        Ok(Self {
            decoder,
            scaler: None,
            draining: false,
            codec_name: params.codec_name.clone(),
        })
    }

    /// 转换帧格式为 RGBA，并拷贝到连续内存
    fn convert_frame(&mut self, frame: &util::frame::Video) -> Result<Picture> {
        let width = frame.width();
        let height = frame.height();

        // 分辨率或像素格式变化时重建 scaler
        let stale = match self.scaler.as_ref() {
            Some(scaler) => {
                let input = scaler.input();
                input.width != width || input.height != height || input.format != frame.format()
            }
            None => true,
        };
        if stale {
            self.scaler = Some(software::scaling::Context::get(
                frame.format(),
                width,
                height,
                util::format::Pixel::RGBA,
                width,
                height,
                software::scaling::Flags::BILINEAR,
            )?);
        }

        let mut rgba_frame = util::frame::Video::empty();
        if let Some(scaler) = self.scaler.as_mut() {
            scaler.run(frame, &mut rgba_frame)?;
        }

        // 送入的包 PTS 已经是微秒
        let pts_us = frame.timestamp().or(frame.pts()).unwrap_or(0);

        let row_size = width as usize * 4;
        let mut data = vec![0u8; PixelFormat::RGBA.frame_size(width, height)];
        let stride = rgba_frame.stride(0);
        let frame_data = rgba_frame.data(0);
        for y in 0..height as usize {
            let src_offset = y * stride;
            let dst_offset = y * row_size;
            data[dst_offset..dst_offset + row_size]
                .copy_from_slice(&frame_data[src_offset..src_offset + row_size]);
        }

        Ok(Picture {
            pts_us,
            width,
            height,
            format: PixelFormat::RGBA,
            data,
        })
    }
}

impl VideoCodec for FfmpegVideoCodec {
    fn send(&mut self, unit: &AccessUnit) -> Result<SendStatus> {
        if unit.end_of_stream {
            if !self.draining {
                match self.decoder.send_eof() {
                    Ok(()) | Err(ffmpeg::Error::Eof) => {}
                    Err(e) => return Err(PlayerError::Decode(e.to_string())),
                }
                self.draining = true;
            }
            return Ok(SendStatus::Accepted);
        }

        let mut packet = ffmpeg::Packet::copy(&unit.data);
        packet.set_pts(Some(unit.pts_us));
        if unit.key_frame {
            packet.set_flags(ffmpeg::packet::Flags::KEY);
        }

        match self.decoder.send_packet(&packet) {
            Ok(()) => Ok(SendStatus::Accepted),
            Err(ffmpeg::Error::Other { errno: EAGAIN }) => Ok(SendStatus::Again),
            Err(e) => Err(PlayerError::Decode(format!("PTS={}us: {}", unit.pts_us, e))),
        }
    }

    fn receive(&mut self) -> Result<CodecOutput> {
        let mut decoded_frame = util::frame::Video::empty();
        match self.decoder.receive_frame(&mut decoded_frame) {
            Ok(()) => Ok(CodecOutput::Picture(self.convert_frame(&decoded_frame)?)),
            Err(ffmpeg::Error::Other { errno: EAGAIN }) => Ok(CodecOutput::Pending),
            Err(ffmpeg::Error::Eof) => Ok(CodecOutput::Drained),
            Err(e) => Err(PlayerError::Decode(e.to_string())),
        }
    }

    fn flush(&mut self) {
        self.decoder.flush();
        self.draining = false;
    }

    fn info(&self) -> String {
        format!("软件解码 ({})", self.codec_name)
    }
}
