use crate::app_state::AppState;
use crate::config::Config;
use dotenvy::dotenv;
use engine::recovery::run_recovery;
use engine::runtime::{NatsRuntimeClient, RuntimeClient};
use engine::scheduler::{trigger_conditional_jupyter_build, Scheduler};
use sqlx::postgres::PgPoolOptions;
use std::{env, process, sync::Arc};
use tokio::signal::ctrl_c;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

mod app_state;
mod config;
mod routes;
mod utils;

#[tokio::main]
async fn main() -> Result<(), async_nats::Error> {
    dotenv().ok();
    init_tracing();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    db::MIGRATOR.run(&pool).await?;

    #[cfg(feature = "seed")]
    if config::env_flag("SEED", false) {
        db::seed::seed_database(&pool).await?;
        info!("Seeded the database");
    }

    let nats_client = async_nats::connect(&config.nats_url).await?;
    let runtime: Arc<dyn RuntimeClient> =
        Arc::new(NatsRuntimeClient::connect(nats_client).await?);

    // Exactly one process should be primary; it reconciles whatever the
    // previous incarnation left behind before this one serves traffic.
    if config.primary {
        run_recovery(&pool, runtime.clone()).await;
    }

    if config.scheduler_enabled {
        trigger_conditional_jupyter_build(
            &pool,
            runtime.clone(),
            &config.jupyter_setup_script,
            &config.jupyter_image,
        )
        .await;

        Scheduler::new(pool.clone(), runtime.clone(), config.scheduler_interval).spawn();
    }

    let app = routes::router(AppState { db: pool, runtime });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}

fn init_tracing() {
    let filter_layer = EnvFilter::from_default_env();
    let fmt_layer = fmt::layer().with_target(false).with_line_number(true);

    // Ship logs to Loki when configured, plain stdout otherwise.
    if let Ok(loki_url) = env::var("LOKI_URL") {
        let (loki_layer, loki_task) = tracing_loki::builder()
            .label("service", "api")
            .expect("Failed to create Loki layer")
            .extra_field("pid", format!("{}", process::id()))
            .expect("Failed to add extra field to Loki layer")
            .build_url(loki_url.parse().expect("Failed to parse Loki URL"))
            .expect("Failed to build Loki layer");

        tokio::spawn(loki_task);

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(loki_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    }
}
