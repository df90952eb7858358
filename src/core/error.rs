use thiserror::Error;

use crate::core::SessionState;

#[derive(Error, Debug)]
pub enum PlayerError {
    /// 文件不存在、不可读，或没有视频轨道
    #[error("媒体源错误: {0}")]
    Source(String),

    /// 不支持的编码格式
    #[error("解码器配置错误: {0}")]
    CodecConfig(String),

    #[error("当前状态 {state:?} 不允许操作 {op}")]
    InvalidState { op: &'static str, state: SessionState },

    /// 播放中途的解码失败（会话将被强制关闭）
    #[error("解码错误: {0}")]
    Decode(String),

    #[error("Surface 错误: {0}")]
    Surface(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg 错误: {0}")]
    FFmpeg(#[from] ffmpeg_next::Error),
}

/// 错误分类（供调用方判断，不关心具体消息）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Source,
    CodecConfig,
    InvalidState,
    Decode,
    Surface,
    Config,
    Io,
}

impl PlayerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlayerError::Source(_) => ErrorKind::Source,
            PlayerError::CodecConfig(_) => ErrorKind::CodecConfig,
            PlayerError::InvalidState { .. } => ErrorKind::InvalidState,
            PlayerError::Decode(_) => ErrorKind::Decode,
            PlayerError::Surface(_) => ErrorKind::Surface,
            PlayerError::Config(_) | PlayerError::Json(_) => ErrorKind::Config,
            PlayerError::Io(_) => ErrorKind::Io,
            #[cfg(feature = "ffmpeg")]
            PlayerError::FFmpeg(_) => ErrorKind::Decode,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
