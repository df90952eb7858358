// 播放器核心模块

pub mod backend;
pub mod codec;
pub mod controller;
#[cfg(feature = "ffmpeg")]
pub mod decoder;
#[cfg(feature = "ffmpeg")]
pub mod demuxer;
pub mod demuxer_source;
pub mod engine;
pub mod pool;
pub mod sink;
mod worker;

#[cfg(test)]
pub(crate) mod test_support;

use std::{process, thread};

pub use backend::{probe_video_size, MediaBackend};
#[cfg(feature = "ffmpeg")]
pub use backend::FfmpegBackend;
pub use codec::{CodecOutput, Picture, SendStatus, VideoCodec};
pub use controller::Player;
pub use demuxer_source::DemuxerSource;
pub use engine::DecoderEngine;
pub use pool::{DecodedFrame, FramePool, PoolStats};
pub use sink::{PresentationSink, Presented, Surface, SurfaceHandle};

/// 日志上下文：进程号 + 线程号
pub(crate) fn log_ctx() -> String {
    format!("[pid:{} tid:{:?}]", process::id(), thread::current().id())
}
