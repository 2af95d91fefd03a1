use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, warn};

use crate::db::errors::{DatabaseError, Result};

/// Create the connection pool used by the Postgres share store
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(3))
        .idle_timeout(Duration::from_secs(10))
        .max_lifetime(Duration::from_secs(300)) // 5 minutes
        .test_before_acquire(true)
        .connect(database_url)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("Failed to create pool: {}", e)))?;

    info!("Database connection pool created successfully");
    Ok(pool)
}

/// Apply the bundled migrations (share_requests / share_status)
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Health check for the database connection
pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::QueryError)?;

    Ok(())
}

/// Execute a function with retry logic for handling transient errors.
/// Only idempotent operations should go through here.
pub async fn with_retry<F, Fut, T>(
    max_retries: u8,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                warn!(
                    attempt = attempt,
                    max_retries = max_retries,
                    error = %e,
                    "Retryable error occurred, retrying..."
                );

                // Exponential backoff with jitter
                let delay_ms = (50 * 2_u64.pow(attempt as u32 - 1))
                    .min(1000)  // Cap at 1 second
                    + jitter_ms(50);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(e) if e.is_retryable() => {
                return Err(DatabaseError::RetryLimitExceeded { attempts: max_retries });
            }
            Err(e) => return Err(e),
        }
    }
}

fn jitter_ms(bound: u64) -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    RandomState::new().hash_one(std::time::Instant::now()) % bound
}
