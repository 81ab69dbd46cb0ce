// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Reagent Inventory: laboratory chemical-reagent ledger
//!
//! Tracks reagent stock and an append-only movement log, raises expiry and
//! low-stock alerts, and persists to local sheets, SQLite or a remote store.

pub mod config;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod model;
pub mod report;
pub mod seed;
pub mod store;
pub mod web;

pub use config::AppConfig;
pub use error::{InventoryError, Result};
