use std::net::SocketAddr;
use std::time::Duration;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use charge_core::http::router;

mod context;
use context::ServerContext;

#[derive(Parser, Debug, Clone)]
#[command(name = "charge")]
#[command(author, version, about = "Charge - subscription plans and coupon service")]
pub struct Args {
    /// Address to which the server will bind
    #[arg(long, env = "CHARGE_SERVER_ADDR", default_value = "0.0.0.0:8080")]
    pub server_addr: String,

    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://charge@localhost:5432/charge")]
    pub db_url: String,

    /// Size of the Postgres connection pool
    #[arg(long, env = "CHARGE_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Per-request deadline in milliseconds
    #[arg(long, env = "CHARGE_REQUEST_TIMEOUT_MS", default_value_t = 500)]
    pub request_timeout_ms: u64,

    /// Apply pending migrations on startup
    #[arg(long, env = "CHARGE_MIGRATE", default_value = "false")]
    pub migrate: bool,
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_log::LogTracer::init()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("charge=info,charge_core=info,tower_http=info"));
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;
    let args = Args::parse();
    info!(
        "Charge starting. server_addr={}, max_connections={}, migrate={}",
        args.server_addr, args.max_connections, args.migrate
    );

    if let Err(e) = run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run_server(args: Args) -> anyhow::Result<()> {
    let addr: SocketAddr = args.server_addr.parse()?;
    let ctx = ServerContext::new(&args).await?;
    let app = router(ctx.app_state(), ctx.request_timeout);

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Ctrl-C received; shutting down.");
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(5)));
    });

    info!("Charge listening on http://{}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    ctx.db.pool().close().await;
    Ok(())
}
