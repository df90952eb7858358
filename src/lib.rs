//! 单会话视频播放核心：解封装、解码、按时钟呈现到外部 Surface。

pub mod core;
pub mod player;

pub use crate::core::{
    ErrorKind, PixelFormat, PlayerConfig, PlayerError, PlayerStatus, Result, SessionState,
    TrackInfo, VideoSize,
};
pub use crate::player::{probe_video_size, DecodedFrame, MediaBackend, Player, Surface, SurfaceHandle};
#[cfg(feature = "ffmpeg")]
pub use crate::player::FfmpegBackend;
