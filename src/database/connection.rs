use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::Row;
use tracing::info;

use crate::config::DatabaseConfig;

/// Owned handle to the MySQL connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: MySqlPool,
}

impl DatabaseConnection {
    /// Open the pool and verify connectivity with a round trip
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options())
            .await?;

        let connection = Self { pool };
        connection.health_check().await?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = config.max_connections,
            "Database connection successfully established"
        );

        Ok(connection)
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Round trip `SELECT 1`; any other answer is a protocol error
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        let row = sqlx::query("SELECT 1 AS health")
            .fetch_one(&self.pool)
            .await?;

        let health: i64 = row.try_get("health")?;
        check_health_value(health)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn check_health_value(health: i64) -> Result<(), sqlx::Error> {
    if health == 1 {
        Ok(())
    } else {
        Err(sqlx::Error::Protocol(format!(
            "health check returned {health}, expected 1"
        )))
    }
}
