// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Persistence adapters for the inventory and movement log
//!
//! Every adapter loads both tables whole and rewrites both tables whole on
//! save. There is no partial write or merge.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::config::{AppConfig, BackendKind};
use crate::model::{Movement, Reagent};
use crate::Result;

pub mod memory;
pub mod rows;
pub mod sheets;
pub mod spreadsheet;
pub mod sqlite;
pub mod table_store;

pub use memory::MemoryStore;
pub use sheets::SheetsStore;
pub use spreadsheet::SpreadsheetStore;
pub use sqlite::SqliteStore;
pub use table_store::TableStore;

/// Trait implemented by every storage backend
#[async_trait]
pub trait Repository: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Human-readable location of the data
    fn location(&self) -> String;

    /// Read the full inventory and movement log
    async fn load(&self) -> Result<(Vec<Reagent>, Vec<Movement>)>;

    /// Overwrite both tables with the given contents
    async fn save(&self, reagents: &[Reagent], movements: &[Movement]) -> Result<()>;
}

/// Build the repository selected by the configuration
pub fn open_repository(config: &AppConfig) -> Result<Box<dyn Repository>> {
    config.validate()?;
    let storage = &config.storage;
    let repo: Box<dyn Repository> = match storage.backend {
        BackendKind::Spreadsheet => Box::new(SpreadsheetStore::new(
            PathBuf::from(&storage.spreadsheet.inventory_path),
            PathBuf::from(&storage.spreadsheet.movements_path),
        )),
        BackendKind::Sqlite => Box::new(SqliteStore::open(&storage.sqlite.path)?),
        BackendKind::TableStore => Box::new(TableStore::from_config(&storage.table_store)?),
        BackendKind::Sheets => Box::new(SheetsStore::from_config(&storage.sheets)?),
        BackendKind::Memory => Box::new(MemoryStore::new()),
    };
    tracing::debug!("Opened {} storage at {}", repo.name(), repo.location());
    Ok(repo)
}
