use crate::config::DbConfig;
use crate::error::AppError;
use deadpool_postgres::tokio_postgres::{Config as PgConfig, NoTls};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime, Timeouts};
use std::time::Duration;
use tracing::{error, info};

// Embedded so startup does not depend on the working directory
const MIG_0001: &str = include_str!("../migrations/0001_create_chat_messages.sql");
const MIG_0002: &str = include_str!("../migrations/0002_create_profiles.sql");

/// Build a deadpool-postgres pool, verify it, and apply migrations.
pub async fn init_pool(config: &DbConfig) -> Result<Pool, AppError> {
    info!(
        max_connections = config.max_connections,
        connect_timeout_secs = config.connect_timeout_secs,
        acquire_timeout_secs = config.acquire_timeout_secs,
        "Creating database pool"
    );

    let pg_config: PgConfig = config
        .database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| AppError::Config(format!("DATABASE_URL: {e}")))?;

    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };
    let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
    let pool = Pool::builder(mgr)
        .max_size(config.max_connections)
        .runtime(Runtime::Tokio1)
        .timeouts(Timeouts {
            wait: Some(Duration::from_secs(config.acquire_timeout_secs)),
            create: Some(Duration::from_secs(config.connect_timeout_secs)),
            recycle: None,
        })
        .build()
        .map_err(|e| AppError::StartServer(format!("build pool: {e}")))?;

    // Verify connection with connect timeout
    let verify = tokio::time::timeout(Duration::from_secs(config.connect_timeout_secs), async {
        let client = pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok::<(), AppError>(())
    })
    .await;

    match verify {
        Ok(Ok(())) => info!("Database pool created and verified successfully"),
        Ok(Err(e)) => {
            error!(error = %e, "Database connection verification failed");
            return Err(e);
        }
        Err(_) => {
            error!(
                timeout_secs = config.connect_timeout_secs,
                "Database connection verification timeout"
            );
            return Err(AppError::StartServer("database verification timeout".into()));
        }
    }

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool) -> Result<(), AppError> {
    let client = pool.get().await?;
    for (i, sql) in [MIG_0001, MIG_0002].into_iter().enumerate() {
        let label = i + 1;
        client.batch_execute(sql).await.map_err(|e| {
            error!(migration = %label, error = %e, "chat-service migration failed");
            AppError::from(e)
        })?;
        info!(migration = %label, "chat-service migration applied");
    }
    Ok(())
}
