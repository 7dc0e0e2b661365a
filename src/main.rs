use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use voice_loop::{create_router, AppState, Config, Services, SessionConfig};

#[derive(Debug, Parser)]
#[command(name = "voice-loop", about = "Real-time conversational voice server")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/voice-loop")]
    config: String,

    /// Override the HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Audio: {} byte frames, {} Hz {} ({})",
        cfg.audio.frame_size, cfg.audio.sample_rate, cfg.audio.encoding, cfg.audio.language
    );
    info!("Completion model: {}", cfg.completion.model);

    let services = Services::connect(&cfg).await?;
    let state = AppState::new(services, SessionConfig::from(&cfg.audio));
    let app = create_router(state, cfg.service.static_dir.as_deref());

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}
