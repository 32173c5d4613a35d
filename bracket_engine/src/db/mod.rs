//! Tournament storage.
//!
//! Two `TournamentRepository` backends are available: [`PgTournamentRepository`]
//! for PostgreSQL and [`MemoryTournamentRepository`] for tests and single-process
//! deployments. [`Database`] opens the PostgreSQL side: it connects the pool,
//! applies the tournament schema and hands out repositories and managers
//! sharing that pool.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::{sync::Arc, time::Duration};

use crate::tournament::{TournamentManager, TournamentResult};

pub mod config;
pub mod memory;
pub mod repository;

pub use config::DatabaseConfig;
pub use memory::MemoryTournamentRepository;
pub use repository::{PgTournamentRepository, TournamentRepository};

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
}

/// Connected tournament database
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Connect to PostgreSQL and make sure the tournament tables exist
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bracket_engine::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), bracket_engine::tournament::TournamentError> {
    ///     let db = Database::connect(&DatabaseConfig::from_env()).await?;
    ///     let manager = db.tournament_manager();
    ///     println!("{} tournaments", manager.list_tournaments(None).await?.len());
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: &DatabaseConfig) -> TournamentResult<Self> {
        let pool = pool_options(config).connect(&config.database_url).await?;
        let db = Self {
            pool: Arc::new(pool),
        };
        db.repository().ensure_schema().await?;
        Ok(db)
    }

    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Repository over the shared pool
    pub fn repository(&self) -> PgTournamentRepository {
        PgTournamentRepository::new(self.pool.clone())
    }

    /// Tournament manager storing through this database
    pub fn tournament_manager(&self) -> TournamentManager {
        TournamentManager::postgres(self.pool.clone())
    }

    /// Round-trip a trivial query
    pub async fn health_check(&self) -> TournamentResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
