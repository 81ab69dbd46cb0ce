// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Inventory records: reagents and the movement log

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::InventoryError;

/// Date format used for every persisted date column
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time format used for the movement log
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Column layout of the inventory table
pub const INVENTORY_COLUMNS: [&str; 7] = [
    "name",
    "quantity",
    "unit",
    "status",
    "expiration_date",
    "received_date",
    "notes",
];

/// Column layout of the movement log table
pub const MOVEMENT_COLUMNS: [&str; 9] = [
    "date", "time", "kind", "name", "quantity", "unit", "user", "project", "notes",
];

/// Stock status of a reagent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReagentStatus {
    Available,
    InUse,
    Depleted,
    Damaged,
    Expired,
}

impl ReagentStatus {
    pub const ALL: [ReagentStatus; 5] = [
        Self::Available,
        Self::InUse,
        Self::Depleted,
        Self::Damaged,
        Self::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in-use",
            Self::Depleted => "depleted",
            Self::Damaged => "damaged",
            Self::Expired => "expired",
        }
    }

    /// Spelling used by the legacy Spanish tables
    pub fn legacy_str(&self) -> &'static str {
        match self {
            Self::Available => "disponible",
            Self::InUse => "en uso",
            Self::Depleted => "agotado",
            Self::Damaged => "dañado",
            Self::Expired => "vencido",
        }
    }

    /// Human label for reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::InUse => "In use",
            Self::Depleted => "Depleted",
            Self::Damaged => "Damaged",
            Self::Expired => "Expired",
        }
    }

    /// Statuses that need attention from lab staff
    pub fn is_problem(&self) -> bool {
        matches!(self, Self::Depleted | Self::Damaged | Self::Expired)
    }
}

impl fmt::Display for ReagentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReagentStatus {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "available" | "disponible" => Ok(Self::Available),
            "in-use" | "inuse" | "en-uso" => Ok(Self::InUse),
            "depleted" | "agotado" => Ok(Self::Depleted),
            "damaged" | "dañado" | "danado" => Ok(Self::Damaged),
            "expired" | "vencido" => Ok(Self::Expired),
            _ => Err(InventoryError::InvalidRecord(format!("unknown status '{}'", s))),
        }
    }
}

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    #[serde(rename = "ENTRADA", alias = "deposit")]
    Deposit,
    #[serde(rename = "SALIDA", alias = "withdrawal")]
    Withdrawal,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "ENTRADA",
            Self::Withdrawal => "SALIDA",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entrada" | "deposit" => Ok(Self::Deposit),
            "salida" | "withdrawal" => Ok(Self::Withdrawal),
            _ => Err(InventoryError::InvalidRecord(format!("unknown movement kind '{}'", s))),
        }
    }
}

/// One inventory row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reagent {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub status: ReagentStatus,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub received_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

impl Reagent {
    /// Case-insensitive name comparison used for lookups
    pub fn is_named(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }

    /// Signed number of days from `today` until expiry
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiration_date.map(|d| (d - today).num_days())
    }
}

/// One append-only log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub kind: MovementKind,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub user: String,
    pub project: String,
    #[serde(default)]
    pub notes: String,
}
