use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 播放时钟 - 从 0 开始，暂停时停止推进
#[derive(Clone)]
pub struct PlaybackClock {
    inner: Arc<Mutex<ClockInner>>,
}

struct ClockInner {
    base_us: i64,               // 基准时间（微秒）
    base_instant: Instant,      // 基准时刻
    paused: bool,
    paused_at: i64,             // 暂停时的位置
}

impl ClockInner {
    fn now(&self) -> i64 {
        if self.paused {
            self.paused_at
        } else {
            self.base_us + self.base_instant.elapsed().as_micros() as i64
        }
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClockInner {
                base_us: 0,
                base_instant: Instant::now(),
                paused: true,
                paused_at: 0,
            })),
        }
    }

    /// 获取当前播放时间（微秒）
    pub fn now_us(&self) -> i64 {
        self.inner.lock().now()
    }

    /// 归零（保持当前的暂停/播放状态）
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.base_us = 0;
        inner.base_instant = Instant::now();
        inner.paused_at = 0;
    }

    /// 开始播放
    pub fn play(&self) {
        let mut inner = self.inner.lock();
        if inner.paused {
            inner.base_us = inner.paused_at;
            inner.base_instant = Instant::now();
            inner.paused = false;
        }
    }

    /// 暂停播放
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        if !inner.paused {
            inner.paused_at = inner.now();
            inner.paused = true;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    /// 距离 `pts_us` 到期还需等待多久；已经到期（或落后）返回 None
    pub fn until(&self, pts_us: i64) -> Option<Duration> {
        let delay = pts_us - self.now_us();
        if delay > 0 {
            Some(Duration::from_micros(delay as u64))
        } else {
            None
        }
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_starts_paused_at_zero() {
        let clock = PlaybackClock::new();
        assert!(clock.is_paused());
        thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.now_us(), 0);
    }

    #[test]
    fn test_clock_advances_only_while_playing() {
        let clock = PlaybackClock::new();
        clock.play();
        thread::sleep(Duration::from_millis(10));
        clock.pause();
        let paused_at = clock.now_us();
        assert!(paused_at >= 10_000);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(clock.now_us(), paused_at);
    }

    #[test]
    fn test_clock_reset_keeps_paused_state() {
        let clock = PlaybackClock::new();
        clock.play();
        thread::sleep(Duration::from_millis(5));
        clock.pause();
        clock.reset();
        assert_eq!(clock.now_us(), 0);
        assert!(clock.is_paused());
    }

    #[test]
    fn test_until_reports_remaining_delay() {
        let clock = PlaybackClock::new();
        assert_eq!(clock.until(0), None);
        assert_eq!(clock.until(-5), None);
        assert_eq!(clock.until(2_000), Some(Duration::from_micros(2_000)));
    }
}
