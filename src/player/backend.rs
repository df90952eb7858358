use crate::core::{CodecParameters, Result, VideoSize};
use crate::player::codec::VideoCodec;
use crate::player::demuxer_source::DemuxerSource;
use log::info;
use std::path::Path;

/// 媒体后端工厂 - 负责创建 Demuxer 和解码器
///
/// 控制器只通过这个接口接触具体实现（FFmpeg、内存脚本源等）。
pub trait MediaBackend: Send + Sync {
    /// 打开容器并选中第一个视频轨道，失败返回 `PlayerError::Source`
    fn open_source(&self, path: &Path) -> Result<Box<dyn DemuxerSource>>;

    /// 为协商好的编码参数创建解码器，不支持时返回 `PlayerError::CodecConfig`
    fn create_codec(&self, params: &CodecParameters) -> Result<Box<dyn VideoCodec>>;

    fn name(&self) -> &str;
}

/// 探测视频尺寸：打开、读取第一个视频轨道的宽高、关闭
pub fn probe_video_size(backend: &dyn MediaBackend, path: &Path) -> Result<VideoSize> {
    let mut source = backend.open_source(path)?;
    let size = source.track().size();
    source.close();
    info!("📐 探测视频尺寸: {} -> {}x{}", path.display(), size.width, size.height);
    Ok(size)
}

#[cfg(feature = "ffmpeg")]
pub use ffmpeg_backend::FfmpegBackend;

#[cfg(feature = "ffmpeg")]
mod ffmpeg_backend {
    use super::*;
    use crate::core::PlayerError;
    use crate::player::decoder::FfmpegVideoCodec;
    use crate::player::demuxer::Demuxer;
    use std::sync::Once;

    static FFMPEG_INIT: Once = Once::new();

    /// FFmpeg 后端：文件解封装 + 软件解码
    pub struct FfmpegBackend;

    impl FfmpegBackend {
        pub fn new() -> Result<Self> {
            let mut init_result = Ok(());
            FFMPEG_INIT.call_once(|| {
                init_result = ffmpeg_next::init()
                    .map_err(|e| PlayerError::CodecConfig(format!("FFmpeg 初始化失败: {}", e)));
            });
            init_result?;
            Ok(Self)
        }
    }

    impl MediaBackend for FfmpegBackend {
        fn open_source(&self, path: &Path) -> Result<Box<dyn DemuxerSource>> {
            Ok(Box::new(Demuxer::open(path)?))
        }

        fn create_codec(&self, params: &CodecParameters) -> Result<Box<dyn VideoCodec>> {
            Ok(Box::new(FfmpegVideoCodec::configure(params)?))
        }

        fn name(&self) -> &str {
            "ffmpeg"
        }
    }
}
