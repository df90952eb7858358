use crate::core::{AccessUnit, PlaybackClock, PlayerConfig, Result};
use crate::player::demuxer_source::DemuxerSource;
use crate::player::engine::{DecoderEngine, Submitted};
use crate::player::log_ctx;
use crate::player::pool::DecodedFrame;
use crate::player::sink::{PresentationSink, Presented, SurfaceHandle};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 工作线程命令（由控制线程在会话锁内按顺序发送）
#[derive(Debug)]
pub(crate) enum WorkerCommand {
    SetPlaying(bool),
    /// 绑定新 Surface，结果（几何配置是否成功）通过 reply 返回
    Attach(SurfaceHandle, Sender<Result<()>>),
    Detach,
    Rewind,
    Shutdown,
}

/// 工作线程对外公布的状态（只由工作线程写入）
#[derive(Default)]
pub(crate) struct WorkerStatus {
    frames_presented: AtomicU64,
    frames_dropped: AtomicU64,
    position_us: AtomicI64,
    end_of_stream: AtomicBool,
    failure: Mutex<Option<String>>,
}

impl WorkerStatus {
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented.load(Ordering::SeqCst)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::SeqCst)
    }

    pub fn position_us(&self) -> i64 {
        self.position_us.load(Ordering::SeqCst)
    }

    pub fn end_of_stream(&self) -> bool {
        self.end_of_stream.load(Ordering::SeqCst)
    }

    pub fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    fn fail(&self, message: String) {
        *self.failure.lock() = Some(message);
    }
}

/// 解码/渲染工作线程
///
/// 独占 Demuxer、解码引擎（含输出槽位池）和呈现端；控制线程只通过命令通道与其交互。
pub(crate) struct PlaybackWorker {
    demuxer: Box<dyn DemuxerSource>,
    engine: DecoderEngine,
    sink: PresentationSink,
    clock: PlaybackClock,
    commands: Receiver<WorkerCommand>,
    status: Arc<WorkerStatus>,
    idle_poll: Duration,
    preview_enabled: bool,

    playing: bool,
    preview_pending: bool,
    end_of_stream: bool,
    held_unit: Option<AccessUnit>,    // 被输入队列退回、等待重新提交的访问单元
    pending: Option<DecodedFrame>,    // 已解码、等待到期显示的帧
}

impl PlaybackWorker {
    pub fn new(
        demuxer: Box<dyn DemuxerSource>,
        engine: DecoderEngine,
        sink: PresentationSink,
        clock: PlaybackClock,
        commands: Receiver<WorkerCommand>,
        status: Arc<WorkerStatus>,
        config: &PlayerConfig,
    ) -> Self {
        Self {
            demuxer,
            engine,
            sink,
            clock,
            commands,
            status,
            idle_poll: config.idle_poll(),
            preview_enabled: config.preview_first_frame,
            playing: false,
            preview_pending: config.preview_first_frame,
            end_of_stream: false,
            held_unit: None,
            pending: None,
        }
    }

    /// 线程入口
    pub fn run(mut self) {
        info!("{} 🎬 播放工作线程启动: {}", log_ctx(), self.demuxer.description());

        if let Err(e) = self.run_loop() {
            error!("{} ❌ 播放失败，会话将被关闭: {}", log_ctx(), e);
            self.status.fail(e.to_string());
        }
        self.teardown();

        info!(
            "{} 🛑 播放工作线程退出（呈现 {} 帧，丢弃 {} 帧）",
            log_ctx(),
            self.status.frames_presented(),
            self.status.frames_dropped()
        );
    }

    fn run_loop(&mut self) -> Result<()> {
        loop {
            // 优先处理所有命令（非阻塞）
            loop {
                match self.commands.try_recv() {
                    Ok(cmd) => {
                        if !self.apply(cmd)? {
                            return Ok(());
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return Ok(()),
                }
            }

            if !self.wants_frames() {
                // 暂停 / 流结束 / 等待 Surface：阻塞等待下一条命令
                match self.commands.recv() {
                    Ok(cmd) => {
                        if !self.apply(cmd)? {
                            return Ok(());
                        }
                    }
                    Err(_) => return Ok(()),
                }
                continue;
            }

            if let Some(frame) = self.pending.take() {
                let delay = if self.playing {
                    self.sink.time_until_due(&frame)
                } else {
                    None // 预览帧不等时钟
                };
                match delay {
                    Some(delay) => {
                        self.pending = Some(frame);
                        if !self.wait_command(delay)? {
                            return Ok(());
                        }
                    }
                    None => self.present(frame),
                }
                continue;
            }

            self.feed()?;
            match self.engine.drain_ready().next() {
                Some(frame) => self.pending = Some(frame?),
                None if self.engine.is_drained() => {
                    info!("{} 📄 播放到达流末尾，等待命令（Rewind/Shutdown）", log_ctx());
                    self.end_of_stream = true;
                    self.status.end_of_stream.store(true, Ordering::SeqCst);
                }
                None => {
                    // 解码器流水线还没有产出
                    if !self.wait_command(self.idle_poll)? {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn wants_frames(&self) -> bool {
        if self.end_of_stream {
            return false;
        }
        self.playing || (self.preview_pending && self.sink.is_attached())
    }

    /// 带超时等待命令；返回 false 表示需要退出
    fn wait_command(&mut self, timeout: Duration) -> Result<bool> {
        match self.commands.recv_timeout(timeout) {
            Ok(cmd) => self.apply(cmd),
            Err(RecvTimeoutError::Timeout) => Ok(true),
            Err(RecvTimeoutError::Disconnected) => Ok(false),
        }
    }

    /// 按 Demuxer 顺序把访问单元送进解码引擎，直到输入队列满或流结束
    fn feed(&mut self) -> Result<()> {
        while self.engine.can_accept() {
            let unit = match self.held_unit.take() {
                Some(unit) => unit,
                None => self.demuxer.next_access_unit()?,
            };
            match self.engine.submit(unit)? {
                Submitted::Queued => {}
                Submitted::Full(unit) => {
                    self.held_unit = Some(unit);
                    break;
                }
                Submitted::EndOfStream => break,
            }
        }
        Ok(())
    }

    fn present(&mut self, frame: DecodedFrame) {
        let pts_us = frame.pts_us;
        match self.sink.present(frame) {
            Presented::Shown => {
                self.status.frames_presented.fetch_add(1, Ordering::SeqCst);
                self.status.position_us.store(pts_us, Ordering::SeqCst);
            }
            Presented::Detached | Presented::Failed => {
                self.status.frames_dropped.fetch_add(1, Ordering::SeqCst);
            }
        }
        if self.preview_pending && !self.playing {
            debug!("{} 🖼️ 预览帧已显示: PTS={}us", log_ctx(), pts_us);
            self.preview_pending = false;
        }
    }

    /// 未显示就归还的帧
    fn drop_pending(&mut self, reason: &str) {
        if let Some(frame) = self.pending.take() {
            debug!("{} 🧹 {}: 归还在途帧 PTS={}us", log_ctx(), reason, frame.pts_us);
            frame.release();
            self.status.frames_dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 应用一条命令；返回 false 表示收到 Shutdown
    fn apply(&mut self, cmd: WorkerCommand) -> Result<bool> {
        match cmd {
            WorkerCommand::SetPlaying(true) => {
                if !self.playing {
                    info!("{} ▶️ 开始播放", log_ctx());
                    self.playing = true;
                    self.preview_pending = false;
                    self.clock.play();
                }
            }
            WorkerCommand::SetPlaying(false) => {
                if self.playing {
                    info!("{} ⏸️ 暂停", log_ctx());
                    self.playing = false;
                    self.clock.pause();
                }
            }
            WorkerCommand::Attach(handle, reply) => {
                let unchanged = matches!(self.sink.surface(), Some(current) if current.same_as(&handle));
                let result = if unchanged {
                    Ok(())
                } else {
                    let swapping = self.sink.is_attached();
                    let result = self.sink.attach(handle);
                    match result {
                        Ok(()) if swapping => self.drop_pending("切换 Surface"),
                        Ok(()) => {}
                        Err(ref e) => warn!("{} ⚠️ Surface 绑定失败，保留原绑定: {}", log_ctx(), e),
                    }
                    result
                };
                // 控制线程可能已经放弃等待
                let _ = reply.send(result);
            }
            WorkerCommand::Detach => {
                self.drop_pending("解绑 Surface");
                self.sink.detach();
            }
            WorkerCommand::Rewind => {
                info!("{} ⏪ 回到起点", log_ctx());
                self.drop_pending("Rewind");
                self.held_unit = None;
                self.engine.flush();
                self.demuxer.rewind()?;
                self.clock.reset();
                self.end_of_stream = false;
                self.status.end_of_stream.store(false, Ordering::SeqCst);
                self.status.position_us.store(0, Ordering::SeqCst);
                self.preview_pending = self.preview_enabled && !self.playing;
            }
            WorkerCommand::Shutdown => {
                info!("{} ⏹ 收到关闭命令", log_ctx());
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn teardown(&mut self) {
        self.drop_pending("关闭");
        self.engine.release();
        self.demuxer.close();
        self.sink.detach();
    }
}
