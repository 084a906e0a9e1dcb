use blog_api::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PgPostRepository, PgUserRepository, PostRepositoryState, UserRepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::{process::ExitCode, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database and migrations, then the HTTP server.
/// Any startup failure is logged and turns into a non-zero exit code.
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    // Config errors are printed directly: the subscriber depends on the loaded env.
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_api=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .map_err(|e| format!("failed to connect to Postgres, check DATABASE_URL: {e}"))?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    let users = Arc::new(PgUserRepository::new(pool.clone())) as UserRepositoryState;
    let posts = Arc::new(PgPostRepository::new(pool)) as PostRepositoryState;

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        users,
        posts,
        config,
    });

    let listener = TcpListener::bind(bind_addr.as_str()).await?;

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
