use crate::core::{AccessUnit, CodecParameters, PlayerError, Result, TrackInfo};
use crate::player::demuxer_source::DemuxerSource;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{codec, format, media, Rational, Rescale};
use log::{debug, info};
use std::fmt;
use std::path::Path;

/// FFmpeg 原生流参数（交给解码器 from_parameters）
pub struct NativeParameters(pub(crate) codec::Parameters);

// Parameters 的拷贝不再引用输入上下文，可以跨线程移动
unsafe impl Send for NativeParameters {}
unsafe impl Sync for NativeParameters {}

impl Clone for NativeParameters {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl fmt::Debug for NativeParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeParameters").field(&self.0.id()).finish()
    }
}

/// 解封装器 - 只读取第一个视频轨道的压缩包
pub struct Demuxer {
    input_ctx: Option<format::context::Input>,
    track: TrackInfo,
    params: CodecParameters,
    time_base: Rational,
    last_pts_us: i64,
    source_path: String,
}

// Input 只在工作线程中使用
unsafe impl Send for Demuxer {}

/// codec id -> MIME（与 Android MediaFormat 的命名一致）
fn mime_for(id: codec::Id) -> String {
    match id {
        codec::Id::H264 => "video/avc".to_string(),
        codec::Id::HEVC => "video/hevc".to_string(),
        codec::Id::VP8 => "video/x-vnd.on2.vp8".to_string(),
        codec::Id::VP9 => "video/x-vnd.on2.vp9".to_string(),
        codec::Id::AV1 => "video/av01".to_string(),
        codec::Id::MPEG4 => "video/mp4v-es".to_string(),
        codec::Id::H263 => "video/3gpp".to_string(),
        codec::Id::MPEG2VIDEO => "video/mpeg2".to_string(),
        other => format!("video/{}", other.name()),
    }
}

impl Demuxer {
    /// 打开媒体文件并选中第一个视频轨道
    pub fn open(path: &Path) -> Result<Self> {
        info!("正在打开文件: {}", path.display());

        let input_ctx = format::input(&path)
            .map_err(|e| PlayerError::Source(format!("无法打开文件 {}: {}", path.display(), e)))?;

        let stream = input_ctx
            .streams()
            .find(|s| s.parameters().medium() == media::Type::Video)
            .ok_or_else(|| PlayerError::Source(format!("没有视频轨道: {}", path.display())))?;

        let index = stream.index();
        let time_base = stream.time_base();
        let native = stream.parameters().clone();
        let id = native.id();

        // 宽高直接取自流参数；解码器由 FfmpegVideoCodec::configure 打开
        let (width, height) = unsafe {
            let raw = native.as_ptr();
            ((*raw).width.max(0) as u32, (*raw).height.max(0) as u32)
        };

        let rate = stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let duration_us = input_ctx.duration().max(0);

        let track = TrackInfo {
            index,
            mime: mime_for(id),
            codec_name: id.name().to_string(),
            width,
            height,
            fps,
            duration_us,
        };
        debug!("视频流索引: {}, 时间基: {}", index, time_base);

        let mut params = CodecParameters::new(&track.mime, &track.codec_name, width, height);
        params.native = Some(NativeParameters(native));

        Ok(Self {
            input_ctx: Some(input_ctx),
            track,
            params,
            time_base,
            last_pts_us: 0,
            source_path: path.display().to_string(),
        })
    }

    fn to_us(&self, ts: i64) -> i64 {
        ts.rescale(self.time_base, ffmpeg::rescale::TIME_BASE)
    }
}

impl DemuxerSource for Demuxer {
    fn track(&self) -> &TrackInfo {
        &self.track
    }

    fn codec_parameters(&self) -> CodecParameters {
        self.params.clone()
    }

    fn next_access_unit(&mut self) -> Result<AccessUnit> {
        let index = self.track.index;
        let input_ctx = self
            .input_ctx
            .as_mut()
            .ok_or_else(|| PlayerError::Source("Demuxer 已关闭".into()))?;

        // 跳过其他轨道的包
        let packet = loop {
            match input_ctx.packets().next() {
                Some((stream, packet)) if stream.index() == index => break Some(packet),
                Some(_) => continue,
                None => break None,
            }
        };

        match packet {
            Some(packet) => {
                let pts_us = match packet.pts().or(packet.dts()) {
                    Some(ts) => self.to_us(ts),
                    None => self.last_pts_us,
                };
                self.last_pts_us = pts_us;
                let data = packet.data().map(<[u8]>::to_vec).unwrap_or_default();
                Ok(AccessUnit::new(data, pts_us, packet.is_key()))
            }
            None => Ok(AccessUnit::end_of_stream(self.last_pts_us)),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        let input_ctx = self
            .input_ctx
            .as_mut()
            .ok_or_else(|| PlayerError::Source("Demuxer 已关闭".into()))?;
        input_ctx.seek(0, ..0)?;
        self.last_pts_us = 0;
        Ok(())
    }

    fn close(&mut self) {
        if self.input_ctx.take().is_some() {
            info!("关闭文件: {}", self.source_path);
        }
    }

    fn description(&self) -> String {
        format!("FFmpeg Demuxer: {}", self.source_path)
    }
}
