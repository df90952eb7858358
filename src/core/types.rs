use serde::{Deserialize, Serialize};

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    RGBA,
    NV12,
    YUV420P,
}

impl PixelFormat {
    /// 每帧所需字节数
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            PixelFormat::RGBA => w * h * 4,
            PixelFormat::NV12 | PixelFormat::YUV420P => w * h + w * h / 2,
        }
    }
}

/// 视频尺寸（宽高探测结果）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

/// 视频轨道信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackInfo {
    pub index: usize,
    pub mime: String,       // 例如 "video/avc"
    pub codec_name: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_us: i64,   // 总时长（微秒），未知时为 0
}

impl TrackInfo {
    pub fn size(&self) -> VideoSize {
        VideoSize {
            width: self.width,
            height: self.height,
        }
    }
}

/// 解码器协商参数（由 Demuxer 给出，交给解码器 configure）
#[derive(Debug, Clone)]
pub struct CodecParameters {
    pub mime: String,
    pub codec_name: String,
    pub width: u32,
    pub height: u32,

    /// FFmpeg 原生流参数（仅 FFmpeg 后端使用）
    #[cfg(feature = "ffmpeg")]
    pub(crate) native: Option<crate::player::demuxer::NativeParameters>,
}

impl CodecParameters {
    pub fn new(mime: &str, codec_name: &str, width: u32, height: u32) -> Self {
        Self {
            mime: mime.to_string(),
            codec_name: codec_name.to_string(),
            width,
            height,
            #[cfg(feature = "ffmpeg")]
            native: None,
        }
    }
}

/// 访问单元：一个压缩帧及其显示时间戳
///
/// 由 Demuxer 产出，被解码器恰好消费一次。`end_of_stream` 为真时负载为空。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessUnit {
    pub data: Vec<u8>,
    pub pts_us: i64,        // 显示时间戳（微秒）
    pub key_frame: bool,
    pub end_of_stream: bool,
}

impl AccessUnit {
    pub fn new(data: Vec<u8>, pts_us: i64, key_frame: bool) -> Self {
        Self {
            data,
            pts_us,
            key_frame,
            end_of_stream: false,
        }
    }

    /// 流结束标记
    pub fn end_of_stream(pts_us: i64) -> Self {
        Self {
            data: Vec::new(),
            pts_us,
            key_frame: false,
            end_of_stream: true,
        }
    }
}

/// 会话生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Uninitialized,
    Created,
    Paused,
    Playing,
    Shutdown,
}

impl SessionState {
    /// Created 之后、Shutdown 之前
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Created | SessionState::Paused | SessionState::Playing
        )
    }
}

/// 播放器状态快照（带外状态通道）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub state: SessionState,
    pub playing: bool,
    pub surface: Option<String>,
    pub track: Option<TrackInfo>,
    pub position_us: i64,       // 最近一次呈现帧的 PTS
    pub frames_presented: u64,
    pub frames_dropped: u64,    // 未显示即归还的帧
    pub slots_in_use: usize,
    pub end_of_stream: bool,
    pub last_error: Option<String>,
}
