pub mod commands;
pub mod delete;
pub mod findings;
pub mod list;
pub mod logs;
pub mod query;
pub mod render;
pub mod scan;
pub mod tools;

pub use commands::{Cli, Commands};

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::{load_config, DatabaseConfig, EngineConfig};
use crate::db::Database;
use crate::errors::ScanhiveError;
use crate::pipeline::ScanManager;

/// Global options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub config_path: Option<String>,
    pub db: Option<String>,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config_path: cli.config.clone(),
            db: cli.db.clone(),
        }
    }

    pub async fn config(&self) -> Result<EngineConfig, ScanhiveError> {
        let mut config = load_config(self.config_path.as_deref().map(Path::new)).await?;
        if let Some(db) = &self.db {
            config.database = Some(DatabaseConfig { path: Some(db.clone()) });
        }
        Ok(config)
    }

    pub async fn manager(&self) -> Result<ScanManager, ScanhiveError> {
        let config = self.config().await?;
        debug!(path = config.database_path(), "Opening result store");
        let db = Database::new(config.database_path())?;
        Ok(ScanManager::with_config(Arc::new(db), config))
    }
}
