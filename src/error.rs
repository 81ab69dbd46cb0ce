// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for the reagent inventory

use thiserror::Error;

/// Result type alias for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Inventory error types
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Reagent not found: '{0}'")]
    NotFound(String),

    #[error("Insufficient stock for '{name}'. Available: {available} {unit}, requested: {requested} {unit}")]
    InsufficientStock {
        name: String,
        available: f64,
        requested: f64,
        unit: String,
    },

    #[error("Quantity must be a valid number greater than zero (got '{0}')")]
    InvalidQuantity(String),

    #[error("Required fields missing: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Expiry horizon must be between 0 and 36500 days (got {0})")]
    InvalidHorizon(i64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InventoryError {
    /// Whether the error was caused by the request itself rather than the backend
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::InsufficientStock { .. }
                | Self::InvalidQuantity(_)
                | Self::MissingFields(_)
                | Self::InvalidDate(_)
                | Self::InvalidHorizon(_)
        )
    }

    /// Whether the error came from talking to a storage backend
    pub fn is_backend_error(&self) -> bool {
        matches!(
            self,
            Self::FileSystem(_)
                | Self::Database(_)
                | Self::Csv(_)
                | Self::Spreadsheet(_)
                | Self::Api(_)
                | Self::BackendUnavailable(_)
                | Self::InvalidRecord(_)
        )
    }
}
