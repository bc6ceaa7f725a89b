use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info};

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Lightweight connectivity probe used by the health endpoint.
pub async fn check_db_health(pool: &PgPool) -> bool {
    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await {
        Ok(1) => true,
        Ok(other) => {
            error!("Database health check returned unexpected result: {other}");
            false
        }
        Err(e) => {
            error!("Database health check failed: {e}");
            false
        }
    }
}
