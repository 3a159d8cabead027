use anyhow::{anyhow, Context, Result};
use split_aggr::config::AppConfig;
use split_aggr::ledger::WorldState;
use split_aggr::registry::SourceRegistry;
use split_aggr::router::{create_api_router, Aggregator};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing().context("initialize tracing subscriber")?;

    if let Err(err) = run().await {
        tracing::error!(error = ?err, "fatal aggregator error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("load configuration from environment")?;
    let book = config.load_venue_book().context("load venue book")?;
    let (registry, world) = SourceRegistry::from_book(&book).context("build source registry")?;

    let config = Arc::new(config);
    let registry = Arc::new(registry);
    let world = Arc::new(RwLock::new(world));

    let aggregator = Arc::new(Aggregator::new(
        Arc::clone(&config),
        Arc::clone(&registry),
        world,
    ));

    let app = App { config, registry, aggregator };
    app.run().await
}

struct App {
    config: Arc<AppConfig>,
    registry: Arc<SourceRegistry>,
    aggregator: Arc<Aggregator>,
}

impl App {
    async fn run(self) -> Result<()> {
        info!(
            sources = self.registry.len(),
            wrapped_native = %self.registry.wrapped_native(),
            max_parts = self.config.max_parts(),
            "split aggregator online"
        );
        for source in self.registry.sources() {
            info!(
                source = %source.id,
                family = source.family.as_str(),
                pair = %format!("{}/{}", source.pair.token0, source.pair.token1),
                disable_bit = source.disable_bit,
                "registered liquidity source"
            );
        }

        // Start HTTP API server
        let api_router = create_api_router(self.aggregator.clone());
        let api_addr: std::net::SocketAddr = self
            .config
            .api_addr()
            .parse()
            .with_context(|| format!("bad API address {}", self.config.api_addr()))?;
        info!(address = %api_addr, "HTTP API server starting");
        let _api_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&api_addr)
                .await
                .expect("bind API server address");
            if let Err(err) = axum::serve(listener, api_router).await {
                warn!(error = %err, "API server error");
            }
        });

        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let stats = self.aggregator.executor().get_stats();
                    let open_breakers = self.aggregator.engine().breakers().open_count().await;
                    info!(
                        total_swaps = stats.total_swaps,
                        successful = stats.successful_swaps,
                        failed = stats.failed_swaps,
                        success_rate = stats.success_rate,
                        open_breakers = open_breakers,
                        "aggregator heartbeat"
                    );
                }
                res = tokio::signal::ctrl_c() => {
                    if let Err(err) = res {
                        warn!(error = %err, "ctrl_c listener error");
                    }
                    info!("Shutdown signal received, exiting");
                    break;
                }
            }
        }
        Ok(())
    }
}

fn init_tracing() -> Result<()> {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,hyper=warn,tower=warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
