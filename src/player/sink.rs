use crate::core::{PixelFormat, PlaybackClock, Result, TrackInfo};
use crate::player::pool::DecodedFrame;
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// 外部持有的可呈现目标（窗口、纹理等）
///
/// 核心从不拥有 Surface，只在 attach 与下一次 attach/detach 之间持有引用。
pub trait Surface: Send + Sync {
    /// 设置缓冲区几何（宽、高、像素格式），attach 时调用一次
    fn configure(&self, width: u32, height: u32, format: PixelFormat) -> Result<()>;

    /// 显示一帧（锁定缓冲区、拷贝、提交）
    fn post(&self, frame: &DecodedFrame) -> Result<()>;

    /// 用于日志和状态快照
    fn label(&self) -> String {
        "surface".to_string()
    }
}

/// 不透明的 Surface 句柄，按实例身份比较
#[derive(Clone)]
pub struct SurfaceHandle(Arc<dyn Surface>);

impl SurfaceHandle {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self(surface)
    }

    pub fn same_as(&self, other: &SurfaceHandle) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const u8,
            Arc::as_ptr(&other.0) as *const u8,
        )
    }

    pub fn label(&self) -> String {
        self.0.label()
    }

    fn surface(&self) -> &dyn Surface {
        self.0.as_ref()
    }
}

impl<S: Surface + 'static> From<Arc<S>> for SurfaceHandle {
    fn from(surface: Arc<S>) -> Self {
        Self(surface)
    }
}

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SurfaceHandle").field(&self.label()).finish()
    }
}

/// present 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presented {
    Shown,
    /// 没有绑定 Surface，帧直接归还
    Detached,
    /// Surface 拒绝了这一帧，帧同样已归还
    Failed,
}

/// 呈现端：把解码帧交给当前绑定的 Surface，并按播放时钟节奏放行
pub struct PresentationSink {
    surface: Option<SurfaceHandle>,
    clock: PlaybackClock,
    width: u32,
    height: u32,
    format: PixelFormat,
    presented: u64,
}

impl PresentationSink {
    pub fn new(track: &TrackInfo, clock: PlaybackClock) -> Self {
        Self {
            surface: None,
            clock,
            width: track.width,
            height: track.height,
            format: PixelFormat::RGBA,
            presented: 0,
        }
    }

    /// 绑定 Surface；同一句柄重复绑定是空操作
    pub fn attach(&mut self, handle: SurfaceHandle) -> Result<()> {
        if matches!(&self.surface, Some(current) if current.same_as(&handle)) {
            debug!("🖼️ Surface {} 已绑定，忽略", handle.label());
            return Ok(());
        }
        // 先配置新 Surface，失败时保留旧的
        handle
            .surface()
            .configure(self.width, self.height, self.format)?;
        self.detach();
        info!(
            "🖼️ 绑定 Surface: {} ({}x{} {:?})",
            handle.label(),
            self.width,
            self.height,
            self.format
        );
        self.surface = Some(handle);
        Ok(())
    }

    /// 解绑（不销毁，Surface 仍归调用方所有）
    pub fn detach(&mut self) -> Option<SurfaceHandle> {
        let previous = self.surface.take();
        if let Some(ref handle) = previous {
            info!("🖼️ 解绑 Surface: {}", handle.label());
        }
        previous
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    pub fn surface(&self) -> Option<&SurfaceHandle> {
        self.surface.as_ref()
    }

    /// 距离该帧应当显示还需等待多久；已到期或落后返回 None
    pub fn time_until_due(&self, frame: &DecodedFrame) -> Option<Duration> {
        self.clock.until(frame.pts_us)
    }

    /// 显示一帧并归还其槽位（无论是否显示成功）
    pub fn present(&mut self, frame: DecodedFrame) -> Presented {
        let result = match self.surface {
            Some(ref handle) => match handle.surface().post(&frame) {
                Ok(()) => {
                    self.presented += 1;
                    if self.presented <= 5 || self.presented % 100 == 0 {
                        debug!(
                            "🖼️ 呈现第 {} 帧: PTS={}us -> {}",
                            self.presented,
                            frame.pts_us,
                            handle.label()
                        );
                    }
                    Presented::Shown
                }
                Err(e) => {
                    warn!("⚠️ Surface {} 提交失败: {}", handle.label(), e);
                    Presented::Failed
                }
            },
            None => Presented::Detached,
        };
        frame.release();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::player::codec::Picture;
    use crate::player::pool::FramePool;
    use crate::player::test_support::{track, RecordingSurface};

    fn frame(pool: &FramePool, pts_us: i64) -> DecodedFrame {
        let picture = Picture {
            pts_us,
            width: 4,
            height: 2,
            format: PixelFormat::RGBA,
            data: vec![0; 32],
        };
        DecodedFrame::fill(pool.try_acquire().unwrap(), picture)
    }

    #[test]
    fn test_attach_configures_geometry() {
        let surface = RecordingSurface::new("S1");
        let mut sink = PresentationSink::new(&track(640, 360), PlaybackClock::new());
        sink.attach(surface.handle()).unwrap();
        assert_eq!(surface.geometry(), Some((640, 360, PixelFormat::RGBA)));
        assert!(sink.is_attached());
    }

    #[test]
    fn test_reattach_same_handle_is_idempotent() {
        let surface = RecordingSurface::new("S1");
        let mut sink = PresentationSink::new(&track(4, 2), PlaybackClock::new());
        let handle = surface.handle();
        sink.attach(handle.clone()).unwrap();
        sink.attach(handle).unwrap();
        assert_eq!(surface.configure_calls(), 1);
    }

    #[test]
    fn test_failed_swap_keeps_current_surface() {
        let s1 = RecordingSurface::new("S1");
        let broken = RecordingSurface::new("broken").rejecting_configure();
        let mut sink = PresentationSink::new(&track(4, 2), PlaybackClock::new());
        sink.attach(s1.handle()).unwrap();

        let err = sink.attach(broken.handle()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Surface);
        assert!(sink.surface().unwrap().same_as(&s1.handle()));
    }

    #[test]
    fn test_present_posts_and_returns_slot() {
        let pool = FramePool::new(1);
        let surface = RecordingSurface::new("S1");
        let mut sink = PresentationSink::new(&track(4, 2), PlaybackClock::new());
        sink.attach(surface.handle()).unwrap();

        assert_eq!(sink.present(frame(&pool, 42)), Presented::Shown);
        assert_eq!(surface.presented(), vec![42]);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_present_while_detached_still_returns_slot() {
        let pool = FramePool::new(1);
        let mut sink = PresentationSink::new(&track(4, 2), PlaybackClock::new());
        assert_eq!(sink.present(frame(&pool, 0)), Presented::Detached);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_failed_post_still_returns_slot() {
        let pool = FramePool::new(1);
        let surface = RecordingSurface::new("broken").rejecting_posts();
        let mut sink = PresentationSink::new(&track(4, 2), PlaybackClock::new());
        sink.attach(surface.handle()).unwrap();
        assert_eq!(sink.present(frame(&pool, 0)), Presented::Failed);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_detach_leaves_surface_with_caller() {
        let surface = RecordingSurface::new("S1");
        let mut sink = PresentationSink::new(&track(4, 2), PlaybackClock::new());
        sink.attach(surface.handle()).unwrap();
        let returned = sink.detach().unwrap();
        assert!(returned.same_as(&surface.handle()));
        assert!(!sink.is_attached());
        assert!(sink.detach().is_none());
    }

    #[test]
    fn test_pacing_follows_clock() {
        let pool = FramePool::new(2);
        let clock = PlaybackClock::new();
        let sink = PresentationSink::new(&track(4, 2), clock.clone());
        let early = frame(&pool, 0);
        let later = frame(&pool, 40_000);
        assert_eq!(sink.time_until_due(&early), None);
        assert_eq!(sink.time_until_due(&later), Some(Duration::from_micros(40_000)));
    }
}
