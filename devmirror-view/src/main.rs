//! devmirror viewer entry point.
//!
//! ```text
//! devmirror-view                     Connect with defaults
//! devmirror-view --config <path>     Use custom config TOML
//! devmirror-view --device <addr>     Override the device address
//! devmirror-view --gen-config        Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use devmirror_core::{DeviceSession, RemoteSession, Size};
use devmirror_view::MirrorView;
use devmirror_view::config::ViewConfig;
use devmirror_view::display::DisplayRenderer;
use devmirror_view::window::{NativeWindow, WindowEvent};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "devmirror-view", about = "Mirror and control a remote device")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "devmirror-view.toml")]
    config: PathBuf,

    /// Device address (overrides config). Example: 192.168.1.20:27183
    #[arg(short, long)]
    device: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

fn size_of_client(width: u32, height: u32) -> Size {
    Size::new(
        i32::try_from(width).unwrap_or(i32::MAX),
        i32::try_from(height).unwrap_or(i32::MAX),
    )
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewConfig::load(&cli.config);
    if let Some(addr) = cli.device {
        config.network.device_address = addr;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("devmirror-view v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Window + view ────────────────────────────────────────

    let window = NativeWindow::create(
        &config.display.title,
        config.display.width,
        config.display.height,
    )?;
    // Touches scale against the drawn area, which is the client rect,
    // not the outer size requested from the config.
    let (client_w, client_h) = window.client_size();
    let mut renderer = DisplayRenderer::new(window.hwnd(), client_w, client_h);

    let mut view = MirrorView::from_config(&config);
    view.attach_display(size_of_client(client_w, client_h));

    // ── 2. Connect to the device ────────────────────────────────

    let session = RemoteSession::connect(
        config.network.device_address.as_str(),
        config.connect_timeout(),
    )
    .await?;
    info!(device = session.name(), size = %session.device_size(), "connected");
    let session: Arc<RemoteSession> = Arc::new(session);
    view.bind_session(Some(session.clone() as Arc<dyn DeviceSession>));

    // ── 3. Rendering loop ───────────────────────────────────────

    'running: loop {
        if !session.is_connected() {
            info!("device disconnected");
            break;
        }

        for ev in window.poll_events() {
            match ev {
                WindowEvent::Close => break 'running,
                WindowEvent::Resize(w, h) => {
                    renderer.resize(w, h);
                    view.resize_display(size_of_client(w, h));
                }
                WindowEvent::Pointer(pointer) => {
                    view.handle_pointer(&pointer);
                }
            }
        }

        view.pump();
        if view.take_dirty().is_some() {
            if let Some(surface) = view.surface() {
                if let Err(e) = renderer.render(&surface) {
                    warn!("render error: {e}");
                }
            }
        }

        // Yield briefly so Tokio can make progress.
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }

    // ── 4. Shutdown ─────────────────────────────────────────────

    info!("shutting down");
    let stats = view.present_stats();
    info!(
        presented = stats.presented,
        rejected = stats.rejected,
        dropped = stats.dropped,
        "presentation totals"
    );
    view.bind_session(None);
    view.detach_display();
    // Dropping the view closes its render queue, releasing any producer
    // still waiting on a frame hand-off.
    drop(view);
    session.close();

    Ok(())
}
