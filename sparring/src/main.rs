mod config;
mod orchestrator;
mod ui;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chess::PieceColor;
use config::Settings;

/// Play chess in the terminal against a separately compiled engine
/// module, run sandboxed in its own process per search.
#[derive(Debug, Parser)]
#[command(name = "sparring", version)]
struct Cli {
    /// Path to the engine module executable
    #[arg(long)]
    module: Option<PathBuf>,

    /// Path to the module's binary payload (derived from the module
    /// path when omitted)
    #[arg(long)]
    payload: Option<PathBuf>,

    /// Search depth handed to the module per move
    #[arg(long)]
    depth: Option<u8>,

    /// Which side the engine plays
    #[arg(long, value_enum)]
    engine_side: Option<SideArg>,

    /// Starting position as FEN instead of the initial position
    #[arg(long)]
    fen: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SideArg {
    White,
    Black,
}

impl From<SideArg> for PieceColor {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::White => Self::White,
            SideArg::Black => Self::Black,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(module) = cli.module.or_else(config::get_module_path) else {
        anyhow::bail!("no engine module configured; pass --module or set SPARRING_MODULE_PATH");
    };
    let settings = Settings {
        module,
        payload: cli.payload.or_else(config::get_payload_path),
        depth: config::clamp_depth(cli.depth.unwrap_or_else(config::get_search_depth)),
        engine_side: cli
            .engine_side
            .map(PieceColor::from)
            .unwrap_or_else(config::get_engine_side),
        start_fen: cli.fen,
        log_dir: config::get_log_dir(),
    };

    // the terminal owns stdout, so logs go to a rolling file
    std::fs::create_dir_all(&settings.log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&settings.log_dir, "sparring");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(module = %settings.module.display(), "sparring starting up");
    ui::run(settings).await?;
    tracing::info!("sparring shutting down");

    Ok(())
}
