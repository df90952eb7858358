use crate::core::{PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 播放器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// 解码器输入队列容量（访问单元个数，满时背压）
    pub input_queue_capacity: usize,
    /// 输出帧槽位数（有界、可复用）
    pub output_pool_size: usize,
    /// 为恢复 PTS 顺序而暂存的图像数
    pub reorder_depth: usize,
    /// 暂停状态下先解码并显示一帧预览
    pub preview_first_frame: bool,
    /// 解码器流水线未出帧时的轮询间隔（毫秒）
    pub idle_poll_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            input_queue_capacity: 4,
            output_pool_size: 3,
            reorder_depth: 0,
            preview_first_frame: true,
            idle_poll_ms: 5,
        }
    }
}

impl PlayerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_queue_capacity == 0 {
            return Err(PlayerError::Config("input_queue_capacity 必须大于 0".into()));
        }
        if self.output_pool_size == 0 {
            return Err(PlayerError::Config("output_pool_size 必须大于 0".into()));
        }
        if self.idle_poll_ms == 0 {
            return Err(PlayerError::Config("idle_poll_ms 必须大于 0".into()));
        }
        Ok(())
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}
