use crate::core::{AccessUnit, PixelFormat, Result};

/// 解码器输出的一张图像（尚未占用输出槽位）
#[derive(Debug, Clone)]
pub struct Picture {
    pub pts_us: i64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

/// 送入压缩数据的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Accepted,
    /// 解码器内部已满，需要先取走输出（EAGAIN）
    Again,
}

/// 取出图像的结果
#[derive(Debug)]
pub enum CodecOutput {
    Picture(Picture),
    /// 暂时没有可用输出（硬件流水线尚未产出）
    Pending,
    /// 已经送入流结束标记，且所有图像都已取出
    Drained,
}

/// 底层视频解码器：送包 / 收帧模型
///
/// 对应 FFmpeg 的 send_packet/receive_frame 与 MediaCodec 的输入输出缓冲区。
/// 只在工作线程中使用。
pub trait VideoCodec: Send {
    fn send(&mut self, unit: &AccessUnit) -> Result<SendStatus>;

    fn receive(&mut self) -> Result<CodecOutput>;

    /// 丢弃所有在途数据，但保留解码器实例
    fn flush(&mut self);

    fn info(&self) -> String;
}
