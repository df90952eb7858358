// 测试用的内存后端：脚本化 Demuxer、直通解码器、记录型 Surface

use crate::core::{
    AccessUnit, CodecParameters, PixelFormat, PlayerError, Result, TrackInfo,
};
use crate::player::backend::MediaBackend;
use crate::player::codec::{CodecOutput, Picture, SendStatus, VideoCodec};
use crate::player::demuxer_source::DemuxerSource;
use crate::player::pool::DecodedFrame;
use crate::player::sink::{Surface, SurfaceHandle};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub fn track(width: u32, height: u32) -> TrackInfo {
    TrackInfo {
        index: 0,
        mime: "video/avc".to_string(),
        codec_name: "h264".to_string(),
        width,
        height,
        fps: 30.0,
        duration_us: 0,
    }
}

/// 轮询直到条件成立或超时
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// 资源计数（用于检查泄漏）
#[derive(Default)]
pub struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    codecs_created: AtomicUsize,
    codecs_dropped: AtomicUsize,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn codecs_created(&self) -> usize {
        self.codecs_created.load(Ordering::SeqCst)
    }

    pub fn codecs_dropped(&self) -> usize {
        self.codecs_dropped.load(Ordering::SeqCst)
    }
}

/// 一个内存中的“容器文件”
#[derive(Clone)]
pub struct MemoryMedia {
    track: Option<TrackInfo>,
    units: Vec<AccessUnit>,
    latency: usize,
    fail_at: Option<i64>,
}

impl MemoryMedia {
    pub fn frames(width: u32, height: u32, pts: &[i64]) -> Self {
        let units = pts
            .iter()
            .enumerate()
            .map(|(i, &pts_us)| AccessUnit::new(vec![i as u8; 4], pts_us, i == 0))
            .collect();
        Self {
            track: Some(track(width, height)),
            units,
            latency: 0,
            fail_at: None,
        }
    }

    pub fn audio_only() -> Self {
        Self {
            track: None,
            units: Vec::new(),
            latency: 0,
            fail_at: None,
        }
    }

    pub fn with_mime(mut self, mime: &str) -> Self {
        if let Some(track) = self.track.as_mut() {
            track.mime = mime.to_string();
        }
        self
    }

    /// 解码器流水线延迟（帧数）
    pub fn with_latency(mut self, latency: usize) -> Self {
        self.latency = latency;
        self
    }

    /// 解码到该 PTS 时报错
    pub fn failing_at(mut self, pts_us: i64) -> Self {
        self.fail_at = Some(pts_us);
        self
    }
}

pub struct MemoryBackend {
    media: Mutex<HashMap<PathBuf, MemoryMedia>>,
    last_opened: Mutex<Option<MemoryMedia>>,
    counters: Arc<Counters>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            media: Mutex::new(HashMap::new()),
            last_opened: Mutex::new(None),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn insert(&self, path: &str, media: MemoryMedia) {
        self.media.lock().insert(PathBuf::from(path), media);
    }

    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }
}

impl MediaBackend for MemoryBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn DemuxerSource>> {
        let media = self
            .media
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| PlayerError::Source(format!("无法打开文件: {}", path.display())))?;
        let track = media
            .track
            .clone()
            .ok_or_else(|| PlayerError::Source("无法找到视频流".into()))?;
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        *self.last_opened.lock() = Some(media.clone());
        Ok(Box::new(MemorySource {
            track,
            units: media.units,
            cursor: 0,
            closed: false,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn create_codec(&self, params: &CodecParameters) -> Result<Box<dyn VideoCodec>> {
        if params.mime == "video/unsupported" {
            return Err(PlayerError::CodecConfig(format!("不支持的格式: {}", params.mime)));
        }
        let script = self.last_opened.lock().clone();
        let mut codec = PassthroughCodec::new().with_size(params.width, params.height);
        if let Some(script) = script {
            codec = codec.with_latency(script.latency);
            if let Some(pts) = script.fail_at {
                codec = codec.failing_at(pts);
            }
        }
        codec.counters = Some(Arc::clone(&self.counters));
        self.counters.codecs_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(codec))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

pub struct MemorySource {
    track: TrackInfo,
    units: Vec<AccessUnit>,
    cursor: usize,
    closed: bool,
    counters: Arc<Counters>,
}

impl DemuxerSource for MemorySource {
    fn track(&self) -> &TrackInfo {
        &self.track
    }

    fn codec_parameters(&self) -> CodecParameters {
        CodecParameters::new(&self.track.mime, "memory", self.track.width, self.track.height)
    }

    fn next_access_unit(&mut self) -> Result<AccessUnit> {
        match self.units.get(self.cursor) {
            Some(unit) => {
                self.cursor += 1;
                Ok(unit.clone())
            }
            None => Ok(AccessUnit::end_of_stream(
                self.units.last().map_or(0, |u| u.pts_us),
            )),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn description(&self) -> String {
        format!("Memory Demuxer: {} units", self.units.len())
    }
}

/// 直通解码器：负载原样作为图像数据，可模拟流水线延迟和解码失败
pub struct PassthroughCodec {
    queue: VecDeque<Picture>,
    latency: usize,
    input_slots: usize,
    fail_at: Option<i64>,
    draining: bool,
    width: u32,
    height: u32,
    counters: Option<Arc<Counters>>,
}

impl PassthroughCodec {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            latency: 0,
            input_slots: 16,
            fail_at: None,
            draining: false,
            width: 4,
            height: 2,
            counters: None,
        }
    }

    pub fn with_latency(mut self, latency: usize) -> Self {
        self.latency = latency;
        self
    }

    /// 内部可容纳的图像数，满了返回 Again
    pub fn with_input_slots(mut self, slots: usize) -> Self {
        self.input_slots = slots;
        self
    }

    pub fn failing_at(mut self, pts_us: i64) -> Self {
        self.fail_at = Some(pts_us);
        self
    }

    fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

impl VideoCodec for PassthroughCodec {
    fn send(&mut self, unit: &AccessUnit) -> Result<SendStatus> {
        if unit.end_of_stream {
            self.draining = true;
            return Ok(SendStatus::Accepted);
        }
        if self.fail_at == Some(unit.pts_us) {
            return Err(PlayerError::Decode(format!("损坏的访问单元: PTS={}us", unit.pts_us)));
        }
        if self.queue.len() >= self.input_slots {
            return Ok(SendStatus::Again);
        }
        self.queue.push_back(Picture {
            pts_us: unit.pts_us,
            width: self.width,
            height: self.height,
            format: PixelFormat::RGBA,
            data: unit.data.clone(),
        });
        Ok(SendStatus::Accepted)
    }

    fn receive(&mut self) -> Result<CodecOutput> {
        if self.queue.len() > self.latency || (self.draining && !self.queue.is_empty()) {
            if let Some(picture) = self.queue.pop_front() {
                return Ok(CodecOutput::Picture(picture));
            }
        }
        if self.draining {
            Ok(CodecOutput::Drained)
        } else {
            Ok(CodecOutput::Pending)
        }
    }

    fn flush(&mut self) {
        self.queue.clear();
        self.draining = false;
    }

    fn info(&self) -> String {
        "直通解码".to_string()
    }
}

impl Drop for PassthroughCodec {
    fn drop(&mut self) {
        if let Some(counters) = self.counters.as_ref() {
            counters.codecs_dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// 记录每一帧 PTS 的 Surface
pub struct RecordingSurface {
    label: String,
    presented: Mutex<Vec<i64>>,
    geometry: Mutex<Option<(u32, u32, PixelFormat)>>,
    configure_calls: AtomicUsize,
    reject_posts: AtomicBool,
    reject_configure: AtomicBool,
}

impl RecordingSurface {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            presented: Mutex::new(Vec::new()),
            geometry: Mutex::new(None),
            configure_calls: AtomicUsize::new(0),
            reject_posts: AtomicBool::new(false),
            reject_configure: AtomicBool::new(false),
        })
    }

    pub fn rejecting_posts(self: Arc<Self>) -> Arc<Self> {
        self.reject_posts.store(true, Ordering::SeqCst);
        self
    }

    /// 几何配置失败（例如窗口已经失效）
    pub fn rejecting_configure(self: Arc<Self>) -> Arc<Self> {
        self.set_reject_configure(true);
        self
    }

    pub fn set_reject_configure(&self, reject: bool) {
        self.reject_configure.store(reject, Ordering::SeqCst);
    }

    pub fn handle(self: &Arc<Self>) -> SurfaceHandle {
        SurfaceHandle::from(Arc::clone(self))
    }

    pub fn presented(&self) -> Vec<i64> {
        self.presented.lock().clone()
    }

    pub fn geometry(&self) -> Option<(u32, u32, PixelFormat)> {
        *self.geometry.lock()
    }

    pub fn configure_calls(&self) -> usize {
        self.configure_calls.load(Ordering::SeqCst)
    }
}

impl Surface for RecordingSurface {
    fn configure(&self, width: u32, height: u32, format: PixelFormat) -> Result<()> {
        if self.reject_configure.load(Ordering::SeqCst) {
            return Err(PlayerError::Surface(format!("{} 无法设置几何", self.label)));
        }
        self.configure_calls.fetch_add(1, Ordering::SeqCst);
        *self.geometry.lock() = Some((width, height, format));
        Ok(())
    }

    fn post(&self, frame: &DecodedFrame) -> Result<()> {
        if self.reject_posts.load(Ordering::SeqCst) {
            return Err(PlayerError::Surface(format!("{} 已失效", self.label)));
        }
        self.presented.lock().push(frame.pts_us);
        Ok(())
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}
