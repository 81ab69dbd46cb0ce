// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Stock ledger: reagent table plus the movement log
//!
//! All mutation rules live here. The ledger does no I/O and takes the
//! current instant as a parameter, so callers decide when "now" is.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{Movement, MovementKind, Reagent, ReagentStatus, DATE_FORMAT};
use crate::{InventoryError, Result};

/// Quantities closer to zero than this are treated as zero after a withdrawal
const ZERO_EPSILON: f64 = 1e-9;

/// Largest near-expiry window accepted from users (about a century)
pub const MAX_HORIZON_DAYS: i64 = 36_500;

/// Tunables for ledger operations
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSettings {
    /// Unit for new reagents when none is given
    pub default_unit: String,
    /// Expiry offset for new reagents deposited without one
    pub shelf_life_days: i64,
    /// Quantities below this count as low stock
    pub low_stock_threshold: f64,
    /// Default near-expiry window
    pub expiry_horizon_days: i64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            default_unit: "L".to_string(),
            shelf_life_days: 365,
            low_stock_threshold: 1.0,
            expiry_horizon_days: 30,
        }
    }
}

/// A stock entry request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepositRequest {
    pub name: String,
    pub quantity: f64,
    pub user: String,
    pub project: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

/// A stock exit request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub name: String,
    pub quantity: f64,
    pub user: String,
    pub project: String,
    #[serde(default)]
    pub notes: String,
}

/// Reagents classified by expiry
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpiryScan {
    pub expired: Vec<Reagent>,
    pub near_expiry: Vec<Reagent>,
}

impl ExpiryScan {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.near_expiry.is_empty()
    }
}

/// In-memory reagent table and movement log
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    reagents: Vec<Reagent>,
    movements: Vec<Movement>,
    settings: LedgerSettings,
}

impl Ledger {
    pub fn new(reagents: Vec<Reagent>, movements: Vec<Movement>, settings: LedgerSettings) -> Self {
        Self { reagents, movements, settings }
    }

    pub fn reagents(&self) -> &[Reagent] {
        &self.reagents
    }

    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Look up a reagent by exact name, ignoring case
    pub fn find(&self, name: &str) -> Option<&Reagent> {
        self.reagents.iter().find(|r| r.is_named(name))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.reagents.iter().position(|r| r.is_named(name))
    }

    /// Case-insensitive substring search; a blank term matches everything
    pub fn search(&self, term: &str) -> Vec<&Reagent> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.reagents.iter().collect();
        }
        self.reagents
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&term))
            .collect()
    }

    /// Register an entry, creating the reagent if it is unknown
    pub fn deposit(&mut self, request: &DepositRequest, now: NaiveDateTime) -> Result<String> {
        require_fields(&[
            ("name", &request.name),
            ("user", &request.user),
            ("project", &request.project),
        ])?;
        validate_quantity(request.quantity)?;

        let today = now.date();
        let name = request.name.trim();
        let requested_unit = request
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());

        let (logged_name, unit, message) = match self.position(name) {
            Some(idx) => {
                let reagent = &mut self.reagents[idx];
                reagent.quantity += request.quantity;
                if reagent.status == ReagentStatus::Depleted {
                    reagent.status = ReagentStatus::Available;
                }
                if let Some(expiry) = request.expiration_date {
                    reagent.expiration_date = Some(expiry);
                }
                if let Some(unit) = requested_unit {
                    if unit != reagent.unit {
                        warn!(
                            "Deposit unit '{}' differs from stored unit '{}' for {}; keeping stored unit",
                            unit, reagent.unit, reagent.name
                        );
                    }
                }
                let message = format!(
                    "Entry registered: +{} {}. New stock: {} {}",
                    request.quantity, reagent.unit, reagent.quantity, reagent.unit
                );
                (reagent.name.clone(), reagent.unit.clone(), message)
            }
            None => {
                let unit = requested_unit
                    .unwrap_or(&self.settings.default_unit)
                    .to_string();
                let expiry = request
                    .expiration_date
                    .unwrap_or_else(|| days_after(today, self.settings.shelf_life_days));
                self.reagents.push(Reagent {
                    name: name.to_string(),
                    quantity: request.quantity,
                    unit: unit.clone(),
                    status: ReagentStatus::Available,
                    expiration_date: Some(expiry),
                    received_date: Some(today),
                    notes: request.notes.clone(),
                });
                let message = format!(
                    "New reagent added: {} {} of {}",
                    request.quantity, unit, name
                );
                (name.to_string(), unit, message)
            }
        };

        self.record(
            MovementKind::Deposit,
            logged_name,
            request.quantity,
            unit,
            &request.user,
            &request.project,
            &request.notes,
            now,
        );
        Ok(message)
    }

    /// Register an exit; never lets stock go negative
    pub fn withdraw(&mut self, request: &WithdrawRequest, now: NaiveDateTime) -> Result<String> {
        require_fields(&[
            ("name", &request.name),
            ("user", &request.user),
            ("project", &request.project),
        ])?;
        validate_quantity(request.quantity)?;

        let idx = self
            .position(&request.name)
            .ok_or_else(|| InventoryError::NotFound(request.name.trim().to_string()))?;
        let reagent = &mut self.reagents[idx];

        if request.quantity > reagent.quantity {
            return Err(InventoryError::InsufficientStock {
                name: reagent.name.clone(),
                available: reagent.quantity,
                requested: request.quantity,
                unit: reagent.unit.clone(),
            });
        }

        let mut remaining = reagent.quantity - request.quantity;
        if remaining.abs() < ZERO_EPSILON {
            remaining = 0.0;
        }
        reagent.quantity = remaining;
        if remaining == 0.0 {
            debug!("{} depleted", reagent.name);
            reagent.status = ReagentStatus::Depleted;
        }

        let name = reagent.name.clone();
        let unit = reagent.unit.clone();
        let message = format!(
            "Withdrawal registered: {} {} of {}",
            request.quantity, unit, name
        );
        self.record(
            MovementKind::Withdrawal,
            name,
            request.quantity,
            unit,
            &request.user,
            &request.project,
            &request.notes,
            now,
        );
        Ok(message)
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &mut self,
        kind: MovementKind,
        name: String,
        quantity: f64,
        unit: String,
        user: &str,
        project: &str,
        notes: &str,
        now: NaiveDateTime,
    ) {
        let time = now.time().with_nanosecond(0).unwrap_or_else(|| now.time());
        self.movements.push(Movement {
            date: now.date(),
            time,
            kind,
            name,
            quantity,
            unit,
            user: user.trim().to_string(),
            project: project.trim().to_string(),
            notes: notes.to_string(),
        });
    }

    /// Split reagents into expired and expiring within `horizon_days`
    pub fn expiry_scan(&self, horizon_days: i64, today: NaiveDate) -> ExpiryScan {
        let limit = days_after(today, horizon_days);
        let mut scan = ExpiryScan::default();
        for reagent in &self.reagents {
            match reagent.expiration_date {
                Some(expiry) if expiry < today => scan.expired.push(reagent.clone()),
                Some(expiry) if expiry <= limit => scan.near_expiry.push(reagent.clone()),
                _ => {}
            }
        }
        scan
    }

    /// Reagents below the configured low-stock threshold
    pub fn low_stock(&self) -> Vec<&Reagent> {
        self.reagents
            .iter()
            .filter(|r| r.quantity < self.settings.low_stock_threshold)
            .collect()
    }

    /// Reagents whose status is expired, damaged or depleted
    pub fn problem_reagents(&self) -> Vec<&Reagent> {
        self.reagents.iter().filter(|r| r.status.is_problem()).collect()
    }

    pub fn count_by_status(&self, status: ReagentStatus) -> usize {
        self.reagents.iter().filter(|r| r.status == status).count()
    }

    /// Most recent movements first
    pub fn recent_movements(&self, limit: usize) -> Vec<&Movement> {
        self.movements.iter().rev().take(limit).collect()
    }
}

/// `date` shifted by `days`, clamped to the representable calendar
fn days_after(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|offset| date.checked_add_signed(offset))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Check a user-supplied near-expiry window
pub fn validate_horizon(days: i64) -> Result<i64> {
    if (0..=MAX_HORIZON_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(InventoryError::InvalidHorizon(days))
    }
}

fn require_fields(fields: &[(&'static str, &str)]) -> Result<()> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(InventoryError::MissingFields(missing))
    }
}

fn validate_quantity(quantity: f64) -> Result<()> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(())
    } else {
        Err(InventoryError::InvalidQuantity(quantity.to_string()))
    }
}

/// Parse a user-entered quantity, accepting a decimal comma
pub fn parse_quantity(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    let value: f64 = trimmed
        .replace(',', ".")
        .parse()
        .map_err(|_| InventoryError::InvalidQuantity(trimmed.to_string()))?;
    validate_quantity(value).map_err(|_| InventoryError::InvalidQuantity(trimmed.to_string()))?;
    Ok(value)
}

/// Parse an optional user-entered date; blank means "not given"
pub fn parse_date(input: &str) -> Result<Option<NaiveDate>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(Some)
        .map_err(|_| InventoryError::InvalidDate(trimmed.to_string()))
}
