use anyhow::{Context, Result};
use log::{info, warn};
use native_player::{DecodedFrame, PixelFormat, Player, PlayerConfig, Surface, SurfaceHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// 控制台 Surface：只记录收到的帧
struct ConsoleSurface {
    frames: AtomicU64,
}

impl Surface for ConsoleSurface {
    fn configure(&self, width: u32, height: u32, format: PixelFormat) -> native_player::Result<()> {
        info!("🖼️ Surface 几何: {}x{} {:?}", width, height, format);
        Ok(())
    }

    fn post(&self, frame: &DecodedFrame) -> native_player::Result<()> {
        let n = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        if n <= 5 || n % 100 == 0 {
            info!(
                "🎞️ 第 {} 帧: PTS={:.3}s {}x{} ({} 字节)",
                n,
                frame.pts_us as f64 / 1_000_000.0,
                frame.width,
                frame.height,
                frame.data().len()
            );
        }
        Ok(())
    }

    fn label(&self) -> String {
        "console".to_string()
    }
}

fn main() -> Result<()> {
    // 初始化日志
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .context("用法: native_player <视频文件> [config.json]")?;
    let config = match args.next() {
        Some(config_path) => PlayerConfig::load(&config_path)
            .with_context(|| format!("无法加载配置 {}", config_path))?,
        None => PlayerConfig::default(),
    };

    info!("🎬 Native Player 启动: {}", path);
    let player = Player::with_ffmpeg(config)?;
    player.create(&path)?;
    if let Some(size) = player.video_size() {
        info!("📐 视频尺寸: {}x{}", size.width, size.height);
    }

    let surface = Arc::new(ConsoleSurface {
        frames: AtomicU64::new(0),
    });
    player.bind_surface(SurfaceHandle::from(surface))?;
    player.set_playing(true)?;

    loop {
        thread::sleep(Duration::from_millis(200));
        let status = player.status();
        if let Some(message) = status.last_error {
            warn!("❌ 播放失败: {}", message);
            break;
        }
        if status.end_of_stream {
            info!(
                "✅ 播放完成: 呈现 {} 帧，丢弃 {} 帧",
                status.frames_presented, status.frames_dropped
            );
            break;
        }
    }

    player.shutdown()?;
    Ok(())
}
