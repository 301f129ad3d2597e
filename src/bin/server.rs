//! Folio server: HTTP API for a PDF reading session.
//!
//! Usage:
//!   FOLIO_DRIVE_TOKEN=ya29... folio-server --bind 127.0.0.1:3742
//!
//! Without a Drive token every upload stays local to the running process.

use clap::Parser;
use folio_lib::ai_client::OpenAiSummarizer;
use folio_lib::http_server::{router, AppState};
use folio_lib::identity::{Identity, TokenIdentity};
use folio_lib::pdf::renderer::PdfTextRenderer;
use folio_lib::settings::SettingsStore;
use folio_lib::storage::DriveClient;
use folio_lib::{FolioError, Session};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "folio-server", version, about = "PDF reading session HTTP API")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "FOLIO_BIND", default_value = "127.0.0.1:3742")]
    bind: String,

    /// Directory holding settings.json
    #[arg(long, env = "FOLIO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// OAuth access token for Google Drive
    #[arg(long, env = "FOLIO_DRIVE_TOKEN", hide_env_values = true)]
    drive_token: Option<String>,

    /// Seconds between background Drive syncs (overrides settings.json)
    #[arg(long)]
    sync_interval: Option<u64>,
}

fn data_dir(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(|| {
        dirs::data_dir()
            .map(|p| p.join("folio"))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

async fn sync_loop(session: Arc<Session>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // First tick fires immediately; the startup sign-in already synced
    interval.tick().await;
    loop {
        interval.tick().await;
        match session.sync().await {
            Ok(report) => tracing::debug!(remote = report.remote, "Periodic sync done"),
            Err(FolioError::NotSignedIn) => {}
            Err(e) if e.is_guard() => {}
            Err(e) => tracing::warn!("Periodic sync failed: {}", e),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("folio_lib=info,folio_server=info")),
        )
        .init();

    let args = Args::parse();
    let data_dir = data_dir(args.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("[Server] Failed to create data dir {}: {}", data_dir.display(), e);
        std::process::exit(1);
    }
    tracing::info!("Data dir: {}", data_dir.display());

    let settings_store = Arc::new(SettingsStore::open(&data_dir));
    let settings = settings_store.get();
    tracing::info!("Settings file: {}", settings_store.path().display());

    let identity = match TokenIdentity::new(args.drive_token, &settings) {
        Ok(identity) => Arc::new(identity),
        Err(e) => {
            eprintln!("[Server] Failed to set up identity: {}", e);
            std::process::exit(1);
        }
    };
    let has_token = identity.has_token();
    let identity: Arc<dyn Identity> = identity;

    let drive = match DriveClient::new(identity.clone(), &settings) {
        Ok(drive) => Arc::new(drive),
        Err(e) => {
            eprintln!("[Server] Failed to set up Drive client: {}", e);
            std::process::exit(1);
        }
    };
    let summarizer = match OpenAiSummarizer::new(&settings) {
        Ok(summarizer) => Arc::new(summarizer),
        Err(e) => {
            eprintln!("[Server] Failed to set up summarizer: {}", e);
            std::process::exit(1);
        }
    };

    let session = Arc::new(Session::new(
        settings_store,
        identity,
        drive,
        Arc::new(PdfTextRenderer::new()),
        summarizer,
    ));

    if has_token {
        match session.sign_in().await {
            Ok(user) => tracing::info!("Signed in as {}", user.email),
            Err(e) => tracing::warn!("Drive sign-in failed, running local only: {}", e),
        }
    }

    if let Some(secs) = args.sync_interval.or(settings.sync_interval_secs).filter(|s| *s > 0) {
        tracing::info!("Background sync every {}s", secs);
        tokio::spawn(sync_loop(session.clone(), Duration::from_secs(secs)));
    }

    let app = router(AppState::new(session));

    let listener = match tokio::net::TcpListener::bind(&args.bind).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("[Server] Failed to bind to {}: {}", args.bind, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {}", args.bind);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
    {
        eprintln!("[Server] Server error: {}", e);
        std::process::exit(1);
    }
}
