use crate::core::{AccessUnit, CodecParameters, PlayerConfig, PlayerError, Result};
use crate::player::backend::MediaBackend;
use crate::player::codec::{CodecOutput, Picture, SendStatus, VideoCodec};
use crate::player::pool::{DecodedFrame, FramePool};
use log::{debug, info, warn};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

/// submit 的结果
#[derive(Debug)]
pub enum Submitted {
    Queued,
    /// 输入队列已满，原样退回
    Full(AccessUnit),
    /// 已经送过流结束标记，本次提交被忽略
    EndOfStream,
}

/// 解码引擎 - 包装有状态的底层解码器
///
/// - 有界输入队列：submit 立即返回，满时退回访问单元
/// - 重排窗口：保证输出 PTS 不递减
/// - 有界输出槽位：槽位耗尽时停止出帧
pub struct DecoderEngine {
    codec: Option<Box<dyn VideoCodec>>,
    input: VecDeque<AccessUnit>,
    input_capacity: usize,
    reorder: BinaryHeap<Reverse<PendingPicture>>,
    reorder_depth: usize,
    pool: FramePool,
    last_pts: Option<i64>,
    input_eos: bool,   // 已提交流结束标记
    codec_eos: bool,   // 底层解码器已排空
    submitted: u64,
    emitted: u64,
}

struct PendingPicture(Picture);

impl PartialEq for PendingPicture {
    fn eq(&self, other: &Self) -> bool {
        self.0.pts_us == other.0.pts_us
    }
}

impl Eq for PendingPicture {}

impl PartialOrd for PendingPicture {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingPicture {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.pts_us.cmp(&other.0.pts_us)
    }
}

impl DecoderEngine {
    /// 为协商好的编码参数初始化解码器
    pub fn configure(
        backend: &dyn MediaBackend,
        params: &CodecParameters,
        config: &PlayerConfig,
    ) -> Result<Self> {
        let codec = backend.create_codec(params)?;
        info!(
            "🎞️ 解码器已配置: {} ({} {}x{})",
            codec.info(),
            params.mime,
            params.width,
            params.height
        );
        Ok(Self::with_codec(codec, config))
    }

    pub fn with_codec(codec: Box<dyn VideoCodec>, config: &PlayerConfig) -> Self {
        Self {
            codec: Some(codec),
            input: VecDeque::with_capacity(config.input_queue_capacity),
            input_capacity: config.input_queue_capacity,
            reorder: BinaryHeap::new(),
            reorder_depth: config.reorder_depth,
            pool: FramePool::new(config.output_pool_size),
            last_pts: None,
            input_eos: false,
            codec_eos: false,
            submitted: 0,
            emitted: 0,
        }
    }

    /// 输入队列还能否接收
    pub fn can_accept(&self) -> bool {
        !self.input_eos && self.input.len() < self.input_capacity
    }

    /// 提交一个访问单元（立即返回）
    pub fn submit(&mut self, unit: AccessUnit) -> Result<Submitted> {
        if self.codec.is_none() {
            return Err(PlayerError::Decode("解码器已释放".into()));
        }
        if self.input_eos {
            return Ok(Submitted::EndOfStream);
        }
        if self.input.len() >= self.input_capacity {
            return Ok(Submitted::Full(unit));
        }

        if unit.end_of_stream {
            debug!("📥 提交流结束标记 (共 {} 个访问单元)", self.submitted);
            self.input_eos = true;
        } else {
            self.submitted += 1;
            if self.submitted <= 5 || self.submitted % 100 == 0 {
                debug!("📥 提交访问单元 #{}: PTS={}us", self.submitted, unit.pts_us);
            }
        }
        self.input.push_back(unit);
        self.pump_input()?;
        Ok(Submitted::Queued)
    }

    /// 取出当前已就绪的帧（按需、每次突发有限）
    pub fn drain_ready(&mut self) -> DrainReady<'_> {
        DrainReady { engine: self }
    }

    /// 解码器已排空且没有剩余帧
    pub fn is_drained(&self) -> bool {
        self.codec_eos && self.reorder.is_empty()
    }

    /// 丢弃所有在途输入输出（回到起点时使用），解码器实例保留
    pub fn flush(&mut self) {
        let queued = self.input.len();
        let held = self.reorder.len();
        self.input.clear();
        self.reorder.clear();
        if let Some(codec) = self.codec.as_mut() {
            codec.flush();
        }
        self.last_pts = None;
        self.input_eos = false;
        self.codec_eos = false;
        info!("🔄 解码器 flush: 丢弃 {} 个待送访问单元, {} 张待出图像", queued, held);
    }

    /// 永久释放解码器资源
    pub fn release(&mut self) {
        if self.codec.take().is_some() {
            self.input.clear();
            self.reorder.clear();
            info!(
                "🗑️ 解码器已释放（提交 {} 个访问单元，输出 {} 帧）",
                self.submitted, self.emitted
            );
        }
    }

    pub fn is_released(&self) -> bool {
        self.codec.is_none()
    }

    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    /// 把排队的访问单元送进底层解码器，直到它要求先取输出
    fn pump_input(&mut self) -> Result<()> {
        let Some(codec) = self.codec.as_mut() else {
            return Ok(());
        };
        while let Some(unit) = self.input.front() {
            match codec.send(unit)? {
                SendStatus::Accepted => {
                    self.input.pop_front();
                }
                SendStatus::Again => break,
            }
        }
        Ok(())
    }

    /// 从底层解码器收图像到重排窗口
    fn pull_pictures(&mut self) -> Result<()> {
        while !self.codec_eos && self.reorder.len() <= self.reorder_depth {
            self.pump_input()?;
            let Some(codec) = self.codec.as_mut() else {
                return Ok(());
            };
            match codec.receive()? {
                CodecOutput::Picture(picture) => self.reorder.push(Reverse(PendingPicture(picture))),
                CodecOutput::Pending => break,
                CodecOutput::Drained => {
                    debug!("📤 解码器输出已排空");
                    self.codec_eos = true;
                }
            }
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame>> {
        if self.codec.is_none() || !self.pool.has_free_slot() {
            return Ok(None);
        }
        loop {
            self.pull_pictures()?;
            let ready = self.reorder.len() > self.reorder_depth
                || (self.codec_eos && !self.reorder.is_empty());
            if !ready {
                return Ok(None);
            }
            let Some(Reverse(PendingPicture(picture))) = self.reorder.pop() else {
                return Ok(None);
            };
            if matches!(self.last_pts, Some(last) if picture.pts_us < last) {
                warn!(
                    "⚠️ 丢弃乱序图像: PTS={}us < 上一帧 {}us",
                    picture.pts_us,
                    self.last_pts.unwrap_or_default()
                );
                continue;
            }
            let Some(lease) = self.pool.try_acquire() else {
                self.reorder.push(Reverse(PendingPicture(picture)));
                return Ok(None);
            };
            self.last_pts = Some(picture.pts_us);
            self.emitted += 1;
            return Ok(Some(DecodedFrame::fill(lease, picture)));
        }
    }
}

impl Drop for DecoderEngine {
    fn drop(&mut self) {
        self.release();
    }
}

/// drain_ready 返回的迭代器
pub struct DrainReady<'a> {
    engine: &'a mut DecoderEngine,
}

impl Iterator for DrainReady<'_> {
    type Item = Result<DecodedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.engine.next_frame().transpose()
    }
}
