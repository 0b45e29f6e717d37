use bs_heatmap::config::AppConfig;
use bs_heatmap::server;
use bs_heatmap::state::AppState;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("bs_heatmap starting");

    // Load config
    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let port = cfg.server_port;
    tracing::info!(
        grid_points = cfg.grid_points,
        parallel_min_cells = cfg.parallel_min_cells,
        rayon_threads = rayon::current_num_threads(),
        "pricing config loaded"
    );

    let app_state = match AppState::from_config(cfg) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("spot table error: {e}");
            std::process::exit(1);
        }
    };

    let app = server::router(app_state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}
