use crate::core::{AccessUnit, CodecParameters, Result, TrackInfo};

/// Demuxer 数据源抽象接口
///
/// 打开后已经选定第一个视频轨道，只按容器顺序向前产出该轨道的访问单元。
/// 不同的媒体源（FFmpeg 文件、内存脚本源等）都实现这个接口。
pub trait DemuxerSource: Send {
    /// 选中的视频轨道信息
    fn track(&self) -> &TrackInfo;

    /// 交给解码器 configure 的编码参数
    fn codec_parameters(&self) -> CodecParameters;

    /// 读取下一个访问单元
    ///
    /// 到达末尾后返回 `end_of_stream` 标记的单元，之后重复调用仍返回该标记。
    fn next_access_unit(&mut self) -> Result<AccessUnit>;

    /// 回到位置 0（不能原地重启时由实现重新打开）
    fn rewind(&mut self) -> Result<()>;

    /// 释放全部解封装资源，之后不应再调用其它方法
    fn close(&mut self);

    /// 获取描述信息（用于调试）
    fn description(&self) -> String;
}
