use crate::core::{
    PlaybackClock, PlayerConfig, PlayerError, PlayerStatus, Result, SessionState, TrackInfo,
    VideoSize,
};
use crate::player::backend::MediaBackend;
use crate::player::engine::DecoderEngine;
use crate::player::log_ctx;
use crate::player::pool::FramePool;
use crate::player::sink::{PresentationSink, SurfaceHandle};
use crate::player::worker::{PlaybackWorker, WorkerCommand, WorkerStatus};
use crossbeam_channel::{bounded, unbounded, Sender};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// 播放控制器 - 会话状态机与工作线程的所有者
///
/// 五个边界操作（create / set_playing / bind_surface / rewind / shutdown）都是线程安全的，
/// 在同一把会话锁内修改状态并向工作线程发送命令，然后立即返回；
/// 真正的解码和呈现在工作线程上异步进行。
pub struct Player {
    backend: Arc<dyn MediaBackend>,
    config: PlayerConfig,
    session: Mutex<Session>,
}

/// 单个播放会话
struct Session {
    state: SessionState,
    playing: bool,
    source_path: Option<PathBuf>,
    track: Option<TrackInfo>,
    surface: Option<SurfaceHandle>,
    worker: Option<WorkerLink>,
    last_error: Option<String>,
}

struct WorkerLink {
    commands: Sender<WorkerCommand>,
    thread: Option<JoinHandle<()>>,
    status: Arc<WorkerStatus>,
    pool: FramePool,
}

impl WorkerLink {
    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("{} ❌ 播放工作线程 panic", log_ctx());
            }
        }
    }
}

impl Session {
    fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            playing: false,
            source_path: None,
            track: None,
            surface: None,
            worker: None,
            last_error: None,
        }
    }

    fn invalid(&self, op: &'static str) -> PlayerError {
        PlayerError::InvalidState {
            op,
            state: self.state,
        }
    }

    /// 工作线程因解码错误退出时，把会话强制转入 Shutdown
    fn reap_failed_worker(&mut self) {
        if self.state == SessionState::Shutdown {
            return;
        }
        let Some(link) = self.worker.as_mut() else {
            return;
        };
        if let Some(message) = link.status.failure() {
            error!("{} ❌ 会话因解码错误终止: {}", log_ctx(), message);
            link.join();
            self.state = SessionState::Shutdown;
            self.playing = false;
            self.surface = None;
            self.last_error = Some(message);
        }
    }

    /// 向工作线程发送命令；线程已退出视为会话失效
    fn dispatch(&mut self, op: &'static str, cmd: WorkerCommand) -> Result<()> {
        let sent = match self.worker.as_ref() {
            Some(link) => link.commands.send(cmd).is_ok(),
            None => return Ok(()),
        };
        if sent {
            return Ok(());
        }
        Err(self.worker_gone(op))
    }

    /// 工作线程已经退出：会话转入 Shutdown
    fn worker_gone(&mut self, op: &'static str) -> PlayerError {
        self.reap_failed_worker();
        if self.state != SessionState::Shutdown {
            // 线程无故退出（例如 panic）
            warn!("{} ⚠️ 播放工作线程已退出，会话关闭", log_ctx());
            if let Some(link) = self.worker.as_mut() {
                link.join();
            }
            self.state = SessionState::Shutdown;
            self.playing = false;
        }
        self.invalid(op)
    }
}

impl Player {
    /// 使用指定后端创建播放器（会话处于 Uninitialized）
    pub fn new(backend: Arc<dyn MediaBackend>, config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        info!("{} 🎮 创建播放器（后端: {}）", log_ctx(), backend.name());
        Ok(Self {
            backend,
            config,
            session: Mutex::new(Session::new()),
        })
    }

    /// FFmpeg 后端 + 默认配置
    #[cfg(feature = "ffmpeg")]
    pub fn with_ffmpeg(config: PlayerConfig) -> Result<Self> {
        let backend = crate::player::backend::FfmpegBackend::new()?;
        Self::new(Arc::new(backend), config)
    }

    /// 打开媒体源、探测视频轨道、配置解码器并启动工作线程
    ///
    /// 失败时会话保持 Uninitialized，可以重试。
    pub fn create(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut session = self.session.lock();
        if session.state != SessionState::Uninitialized {
            return Err(session.invalid("create"));
        }

        info!("{} 📂 创建播放会话: {}", log_ctx(), path.display());
        let mut source = self.backend.open_source(path)?;
        let track = source.track().clone();
        info!(
            "{} 🎞️ 视频轨道 #{}: {} {}x{} @ {:.2}fps",
            log_ctx(),
            track.index,
            track.mime,
            track.width,
            track.height,
            track.fps
        );

        let engine = match DecoderEngine::configure(
            self.backend.as_ref(),
            &source.codec_parameters(),
            &self.config,
        ) {
            Ok(engine) => engine,
            Err(e) => {
                source.close();
                return Err(e);
            }
        };

        let clock = PlaybackClock::new();
        let mut sink = PresentationSink::new(&track, clock.clone());
        if let Some(handle) = session.surface.clone() {
            if let Err(e) = sink.attach(handle) {
                // 解码器随 engine 一起释放；解绑后可以重试
                warn!("{} ⚠️ 预先绑定的 Surface 无法使用: {}", log_ctx(), e);
                source.close();
                session.surface = None;
                return Err(e);
            }
        }

        let (command_tx, command_rx) = unbounded::<WorkerCommand>();
        let status = Arc::new(WorkerStatus::default());
        let pool = engine.pool().clone();
        let worker = PlaybackWorker::new(
            source,
            engine,
            sink,
            clock,
            command_rx,
            Arc::clone(&status),
            &self.config,
        );
        let thread = thread::Builder::new()
            .name("playback-worker".to_string())
            .spawn(move || worker.run())?;

        session.worker = Some(WorkerLink {
            commands: command_tx,
            thread: Some(thread),
            status,
            pool,
        });
        session.state = SessionState::Created;
        session.playing = false;
        session.source_path = Some(path.to_path_buf());
        session.track = Some(track);
        info!("{} ✅ 播放会话已创建", log_ctx());
        Ok(())
    }

    /// 切换播放 / 暂停；重复设置同一个值不会累积
    pub fn set_playing(&self, playing: bool) -> Result<()> {
        let mut session = self.session.lock();
        session.reap_failed_worker();
        if !session.state.is_active() {
            return Err(session.invalid("set_playing"));
        }
        session.dispatch("set_playing", WorkerCommand::SetPlaying(playing))?;
        session.playing = playing;
        session.state = if playing {
            SessionState::Playing
        } else {
            SessionState::Paused
        };
        Ok(())
    }

    /// 绑定 Surface；先配置新的再解绑旧的，同一句柄重复绑定是空操作
    ///
    /// 新 Surface 配置失败时返回 `PlayerError::Surface`，原绑定保持不变。
    pub fn bind_surface(&self, handle: SurfaceHandle) -> Result<()> {
        let mut session = self.session.lock();
        session.reap_failed_worker();
        if session.state == SessionState::Shutdown {
            return Err(session.invalid("bind_surface"));
        }
        if matches!(&session.surface, Some(current) if current.same_as(&handle)) {
            return Ok(());
        }
        info!("{} 🖼️ 绑定 Surface: {}", log_ctx(), handle.label());
        if session.worker.is_some() {
            // 等工作线程配置完几何再返回，失败时保留原绑定
            let (reply_tx, reply_rx) = bounded(1);
            session.dispatch("bind_surface", WorkerCommand::Attach(handle.clone(), reply_tx))?;
            match reply_rx.recv() {
                Ok(result) => result?,
                Err(_) => return Err(session.worker_gone("bind_surface")),
            }
        }
        session.surface = Some(handle);
        Ok(())
    }

    /// 解绑当前 Surface（Surface 被销毁时调用）
    pub fn unbind_surface(&self) -> Result<()> {
        let mut session = self.session.lock();
        session.reap_failed_worker();
        if session.state == SessionState::Shutdown {
            return Err(session.invalid("unbind_surface"));
        }
        if session.surface.is_none() {
            return Ok(());
        }
        session.dispatch("unbind_surface", WorkerCommand::Detach)?;
        session.surface = None;
        Ok(())
    }

    /// 回到第一个访问单元，保持当前的播放 / 暂停状态
    pub fn rewind(&self) -> Result<()> {
        let mut session = self.session.lock();
        session.reap_failed_worker();
        if !session.state.is_active() {
            return Err(session.invalid("rewind"));
        }
        info!("{} ⏪ Rewind", log_ctx());
        session.dispatch("rewind", WorkerCommand::Rewind)
    }

    /// 停止工作线程并释放全部资源；重复调用是空操作
    pub fn shutdown(&self) -> Result<()> {
        let mut session = self.session.lock();
        if session.state == SessionState::Shutdown {
            if let Some(link) = session.worker.as_mut() {
                link.join();
            }
            return Ok(());
        }

        info!("{} ⏹️ 关闭播放会话", log_ctx());
        if let Some(link) = session.worker.as_mut() {
            let _ = link.commands.send(WorkerCommand::Shutdown);
            link.join();
            if let Some(message) = link.status.failure() {
                session.last_error = Some(message);
            }
        }
        session.state = SessionState::Shutdown;
        session.playing = false;
        session.surface = None;
        info!("{} ✅ 播放会话已关闭", log_ctx());
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        let mut session = self.session.lock();
        session.reap_failed_worker();
        session.state
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SessionState::Playing
    }

    /// 当前会话的视频尺寸
    pub fn video_size(&self) -> Option<VideoSize> {
        self.session.lock().track.as_ref().map(TrackInfo::size)
    }

    pub fn source_path(&self) -> Option<PathBuf> {
        self.session.lock().source_path.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        let mut session = self.session.lock();
        session.reap_failed_worker();
        session.last_error.clone()
    }

    /// 状态快照
    pub fn status(&self) -> PlayerStatus {
        let mut session = self.session.lock();
        session.reap_failed_worker();
        let link = session.worker.as_ref();
        PlayerStatus {
            state: session.state,
            playing: session.playing,
            surface: session.surface.as_ref().map(SurfaceHandle::label),
            track: session.track.clone(),
            position_us: link.map_or(0, |l| l.status.position_us()),
            frames_presented: link.map_or(0, |l| l.status.frames_presented()),
            frames_dropped: link.map_or(0, |l| l.status.frames_dropped()),
            slots_in_use: link.map_or(0, |l| l.pool.in_use()),
            end_of_stream: link.is_some_and(|l| l.status.end_of_stream()),
            last_error: session.last_error.clone(),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
