use crate::core::PixelFormat;
use crate::player::codec::Picture;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// 输出帧槽位池 - 有界、可复用
///
/// 解码器每输出一帧都要占用一个槽位，帧被呈现（或丢弃）后槽位自动归还。
/// 槽位耗尽时解码器停止出帧，所以任何持有的帧都必须尽快释放。
#[derive(Clone)]
pub struct FramePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    capacity: usize,
    free: Mutex<Vec<Vec<u8>>>,  // 空闲槽位（保留已分配的内存）
    in_use: AtomicUsize,
    recycled: AtomicU64,
}

/// 池统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub in_use: usize,
    pub recycled: u64,
}

impl FramePool {
    pub fn new(capacity: usize) -> Self {
        let free = (0..capacity).map(|_| Vec::new()).collect();
        Self {
            inner: Arc::new(PoolInner {
                capacity,
                free: Mutex::new(free),
                in_use: AtomicUsize::new(0),
                recycled: AtomicU64::new(0),
            }),
        }
    }

    /// 取一个空闲槽位；池已耗尽返回 None
    pub fn try_acquire(&self) -> Option<SlotLease> {
        let buffer = self.inner.free.lock().pop()?;
        self.inner.in_use.fetch_add(1, Ordering::SeqCst);
        Some(SlotLease {
            buffer,
            pool: Arc::clone(&self.inner),
        })
    }

    pub fn has_free_slot(&self) -> bool {
        !self.inner.free.lock().is_empty()
    }

    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.inner.capacity,
            in_use: self.in_use(),
            recycled: self.inner.recycled.load(Ordering::Relaxed),
        }
    }
}

/// 槽位租约，drop 时归还
pub struct SlotLease {
    buffer: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clear();
        self.pool.free.lock().push(buffer);
        self.pool.in_use.fetch_sub(1, Ordering::SeqCst);
        self.pool.recycled.fetch_add(1, Ordering::Relaxed);
    }
}

/// 已解码帧：占用一个输出槽位，直到被呈现或丢弃
pub struct DecodedFrame {
    pub pts_us: i64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    lease: SlotLease,
}

impl DecodedFrame {
    /// 把图像数据拷入槽位
    pub(crate) fn fill(mut lease: SlotLease, picture: Picture) -> Self {
        lease.buffer.extend_from_slice(&picture.data);
        Self {
            pts_us: picture.pts_us,
            width: picture.width,
            height: picture.height,
            format: picture.format,
            lease,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.lease.buffer
    }

    /// 显式归还槽位（等价于 drop）
    pub fn release(self) {}
}

impl fmt::Debug for DecodedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedFrame")
            .field("pts_us", &self.pts_us)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("len", &self.lease.buffer.len())
            .finish()
    }
}
