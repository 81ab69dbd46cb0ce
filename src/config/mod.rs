// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for the reagent inventory

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::ledger::{LedgerSettings, MAX_HORIZON_DAYS};
use crate::InventoryError;

const REDACTED: &str = "********";

/// Environment variable overriding the table store API key
pub const TABLE_STORE_KEY_ENV: &str = "REAGENT_TABLE_STORE_KEY";
/// Environment variable overriding the spreadsheet service token
pub const SHEETS_TOKEN_ENV: &str = "REAGENT_SHEETS_TOKEN";
/// Environment variable overriding the storage backend
pub const BACKEND_ENV: &str = "REAGENT_BACKEND";

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Where the inventory and movement log live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Expiry and stock alert thresholds
    #[serde(default)]
    pub alerts: AlertConfig,

    /// Defaults applied to new reagents
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,

    /// Report export settings
    #[serde(default)]
    pub reports: ReportConfig,
}

/// Which persistence adapter to use
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Spreadsheet,
    Sqlite,
    TableStore,
    Sheets,
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "spreadsheet",
            Self::Sqlite => "sqlite",
            Self::TableStore => "table_store",
            Self::Sheets => "sheets",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "spreadsheet" | "csv" => Ok(Self::Spreadsheet),
            "sqlite" => Ok(Self::Sqlite),
            "table_store" | "supabase" | "postgrest" => Ok(Self::TableStore),
            "sheets" | "google_sheets" => Ok(Self::Sheets),
            "memory" => Ok(Self::Memory),
            other => Err(InventoryError::Config(format!("Unknown storage backend '{}'", other))),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Install the sample reagent set when the inventory is empty
    #[serde(default = "default_true")]
    pub seed_sample_data: bool,
    #[serde(default)]
    pub spreadsheet: SpreadsheetConfig,
    #[serde(default)]
    pub sqlite: SqliteConfig,
    #[serde(default)]
    pub table_store: TableStoreConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpreadsheetConfig {
    #[serde(default = "default_inventory_csv")]
    pub inventory_path: String,
    #[serde(default = "default_movements_csv")]
    pub movements_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SqliteConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TableStoreConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_inventory_table")]
    pub inventory_table: String,
    #[serde(default = "default_movements_table")]
    pub movements_table: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Write Spanish column names (`reactivo`, `cantidad`, ...) and statuses
    #[serde(default)]
    pub legacy_columns: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SheetsConfig {
    #[serde(default = "default_sheets_url")]
    pub base_url: String,
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default = "default_inventory_sheet")]
    pub inventory_sheet: String,
    #[serde(default = "default_log_sheet")]
    pub log_sheet: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlertConfig {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,
    #[serde(default = "default_low_stock")]
    pub low_stock_threshold: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DefaultsConfig {
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default = "default_shelf_life")]
    pub shelf_life_days: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
}

// Default value functions
fn default_true() -> bool { true }
fn default_inventory_csv() -> String { "inventory.csv".to_string() }
fn default_movements_csv() -> String { "movements.csv".to_string() }
fn default_db_path() -> String { "reagents.db".to_string() }
fn default_inventory_table() -> String { "inventory".to_string() }
fn default_movements_table() -> String { "movements".to_string() }
fn default_sheets_url() -> String { "https://sheets.googleapis.com".to_string() }
fn default_inventory_sheet() -> String { "inventario".to_string() }
fn default_log_sheet() -> String { "log".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_horizon_days() -> i64 { 30 }
fn default_low_stock() -> f64 { 1.0 }
fn default_unit() -> String { "L".to_string() }
fn default_shelf_life() -> i64 { 365 }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }
fn default_export_dir() -> String { ".".to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            seed_sample_data: true,
            spreadsheet: SpreadsheetConfig::default(),
            sqlite: SqliteConfig::default(),
            table_store: TableStoreConfig::default(),
            sheets: SheetsConfig::default(),
        }
    }
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        Self {
            inventory_path: default_inventory_csv(),
            movements_path: default_movements_csv(),
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

impl Default for TableStoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            inventory_table: default_inventory_table(),
            movements_table: default_movements_table(),
            timeout_secs: default_timeout(),
            legacy_columns: false,
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: default_sheets_url(),
            spreadsheet_id: String::new(),
            access_token: None,
            inventory_sheet: default_inventory_sheet(),
            log_sheet: default_log_sheet(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            low_stock_threshold: default_low_stock(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            unit: default_unit(),
            shelf_life_days: default_shelf_life(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { export_dir: default_export_dir() }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)
                .map_err(|e| InventoryError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Pick up credentials and backend choice from the environment
    pub fn apply_env_overrides(&mut self) -> crate::Result<()> {
        if let Ok(backend) = std::env::var(BACKEND_ENV) {
            self.storage.backend = backend.parse()?;
        }
        if let Ok(key) = std::env::var(TABLE_STORE_KEY_ENV) {
            self.storage.table_store.api_key = Some(key);
        }
        if let Ok(token) = std::env::var(SHEETS_TOKEN_ENV) {
            self.storage.sheets.access_token = Some(token);
        }
        Ok(())
    }

    /// Check that the selected backend has what it needs
    pub fn validate(&self) -> crate::Result<()> {
        match self.storage.backend {
            BackendKind::TableStore => {
                let ts = &self.storage.table_store;
                if ts.url.trim().is_empty() {
                    return Err(InventoryError::Config("storage.table_store.url is required".into()));
                }
                if ts.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                    return Err(InventoryError::Config(format!(
                        "table store API key missing; set storage.table_store.api_key or {}",
                        TABLE_STORE_KEY_ENV
                    )));
                }
            }
            BackendKind::Sheets => {
                let sheets = &self.storage.sheets;
                if sheets.spreadsheet_id.trim().is_empty() {
                    return Err(InventoryError::Config("storage.sheets.spreadsheet_id is required".into()));
                }
                if sheets.access_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
                    return Err(InventoryError::Config(format!(
                        "spreadsheet access token missing; set storage.sheets.access_token or {}",
                        SHEETS_TOKEN_ENV
                    )));
                }
            }
            BackendKind::Spreadsheet | BackendKind::Sqlite | BackendKind::Memory => {}
        }
        if !(0..=MAX_HORIZON_DAYS).contains(&self.alerts.horizon_days) {
            return Err(InventoryError::Config(format!(
                "alerts.horizon_days must be between 0 and {}",
                MAX_HORIZON_DAYS
            )));
        }
        if !(1..=MAX_HORIZON_DAYS).contains(&self.defaults.shelf_life_days) {
            return Err(InventoryError::Config(format!(
                "defaults.shelf_life_days must be between 1 and {}",
                MAX_HORIZON_DAYS
            )));
        }
        Ok(())
    }

    /// Copy with credentials masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        let mask = |secret: &mut Option<String>| {
            if secret.is_some() {
                *secret = Some(REDACTED.to_string());
            }
        };
        mask(&mut config.storage.table_store.api_key);
        mask(&mut config.storage.sheets.access_token);
        config
    }

    /// Ledger tunables derived from this configuration
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            default_unit: self.defaults.unit.clone(),
            shelf_life_days: self.defaults.shelf_life_days,
            low_stock_threshold: self.alerts.low_stock_threshold,
            expiry_horizon_days: self.alerts.horizon_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{ "storage": { "backend": "sqlite", "sqlite": { "path": "lab.db" } },
                 "alerts": { "horizon_days": 14 } }"#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, BackendKind::Sqlite);
        assert_eq!(config.storage.sqlite.path, "lab.db");
        assert!(config.storage.seed_sample_data);
        assert_eq!(config.alerts.horizon_days, 14);
        assert_eq!(config.alerts.low_stock_threshold, 1.0);
        assert_eq!(config.defaults.unit, "L");
        assert_eq!(config.web.port, 8080);
    }

    #[test]
    fn test_table_store_requires_credentials() {
        let mut config = AppConfig::default();
        config.storage.backend = BackendKind::TableStore;
        config.storage.table_store.url = "https://lab.example.co".into();
        assert!(matches!(config.validate(), Err(InventoryError::Config(_))));

        config.storage.table_store.api_key = Some("secret".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_day_counts_are_rejected() {
        let mut config = AppConfig::default();
        config.alerts.horizon_days = MAX_HORIZON_DAYS + 1;
        assert!(matches!(config.validate(), Err(InventoryError::Config(_))));

        let mut config = AppConfig::default();
        config.defaults.shelf_life_days = i64::MAX;
        assert!(matches!(config.validate(), Err(InventoryError::Config(_))));
    }

    #[test]
    fn test_redacted_masks_credentials() {
        let mut config = AppConfig::default();
        config.storage.table_store.api_key = Some("service-role-key".into());
        config.storage.sheets.access_token = Some("ya29.token".into());

        let shown = serde_json::to_string(&config.redacted()).unwrap();

        assert!(!shown.contains("service-role-key"));
        assert!(!shown.contains("ya29.token"));
        assert!(shown.contains(REDACTED));
        assert_eq!(config.storage.table_store.api_key.as_deref(), Some("service-role-key"));
        assert_eq!(AppConfig::default().redacted().storage.sheets.access_token, None);
    }

    #[test]
    fn test_backend_kind_aliases() {
        assert_eq!("supabase".parse::<BackendKind>().unwrap(), BackendKind::TableStore);
        assert_eq!("google-sheets".parse::<BackendKind>().unwrap(), BackendKind::Sheets);
        assert!("excel".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.defaults.unit = "kg".into();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.defaults.unit, "kg");
        assert_eq!(loaded.ledger_settings().default_unit, "kg");
    }
}
