// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Stock reports, alert panels and report export

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::ledger::Ledger;
use crate::model::{Reagent, ReagentStatus, DATE_FORMAT};
use crate::{InventoryError, Result};

const RULE_WIDTH: usize = 70;

/// Snapshot of the inventory at one instant
#[derive(Debug, Clone, Serialize)]
pub struct StockReport {
    pub generated_at: NaiveDateTime,
    pub horizon_days: i64,
    pub low_stock_threshold: f64,
    pub summary: StockSummary,
    pub expired: Vec<Reagent>,
    pub near_expiry: Vec<Reagent>,
    pub low_stock: Vec<Reagent>,
    pub damaged: Vec<Reagent>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StockSummary {
    pub total: usize,
    pub available: usize,
    pub in_use: usize,
    pub depleted: usize,
    pub damaged: usize,
    pub expired_status: usize,
    pub expired_by_date: usize,
    pub near_expiry: usize,
}

impl StockReport {
    pub fn build(ledger: &Ledger, now: NaiveDateTime) -> Self {
        let settings = ledger.settings();
        let scan = ledger.expiry_scan(settings.expiry_horizon_days, now.date());
        let low_stock: Vec<Reagent> = ledger.low_stock().into_iter().cloned().collect();
        let damaged: Vec<Reagent> = ledger
            .reagents()
            .iter()
            .filter(|r| r.status == ReagentStatus::Damaged)
            .cloned()
            .collect();

        let summary = StockSummary {
            total: ledger.reagents().len(),
            available: ledger.count_by_status(ReagentStatus::Available),
            in_use: ledger.count_by_status(ReagentStatus::InUse),
            depleted: ledger.count_by_status(ReagentStatus::Depleted),
            damaged: ledger.count_by_status(ReagentStatus::Damaged),
            expired_status: ledger.count_by_status(ReagentStatus::Expired),
            expired_by_date: scan.expired.len(),
            near_expiry: scan.near_expiry.len(),
        };

        Self {
            generated_at: now,
            horizon_days: settings.expiry_horizon_days,
            low_stock_threshold: settings.low_stock_threshold,
            summary,
            expired: scan.expired,
            near_expiry: scan.near_expiry,
            low_stock,
            damaged,
        }
    }

    fn today(&self) -> NaiveDate {
        self.generated_at.date()
    }

    /// Plain-text stock report
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Detailed alerts panel
    pub fn render_alerts(&self) -> String {
        AlertsPanel(self).to_string()
    }

    /// One-line warnings shown once at startup
    pub fn startup_alerts(&self) -> Vec<String> {
        let mut alerts = Vec::new();
        if !self.expired.is_empty() {
            alerts.push(format!("{} reagent(s) expired", self.expired.len()));
        }
        if !self.near_expiry.is_empty() {
            alerts.push(format!("{} reagent(s) expiring soon", self.near_expiry.len()));
        }
        if !self.low_stock.is_empty() {
            alerts.push(format!("{} reagent(s) with low stock", self.low_stock.len()));
        }
        alerts
    }
}

impl fmt::Display for StockReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(f, "╔{}╗", "═".repeat(62))?;
        writeln!(f, "║{:^62}║", "REAGENT INVENTORY REPORT")?;
        writeln!(f, "╚{}╝", "═".repeat(62))?;
        writeln!(f)?;
        writeln!(f, "Report date: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f)?;
        writeln!(f, "GENERAL SUMMARY:")?;
        writeln!(f, "  • Total reagents: {}", s.total)?;
        writeln!(f, "  • Available: {}", s.available)?;
        writeln!(f, "  • In use: {}", s.in_use)?;
        writeln!(f, "  • Depleted: {}", s.depleted)?;
        writeln!(f, "  • Damaged: {}", s.damaged)?;
        writeln!(f, "  • Marked expired: {}", s.expired_status)?;
        writeln!(f, "  • Expired: {}", s.expired_by_date)?;
        writeln!(f, "  • Expiring soon ({} days): {}", self.horizon_days, s.near_expiry)?;
        writeln!(f)?;
        writeln!(f, "ALERTS:")?;

        if self.expired.is_empty() && self.near_expiry.is_empty() && self.low_stock.is_empty() {
            writeln!(f, "  None")?;
        }

        if !self.expired.is_empty() {
            writeln!(f, "\n⚠️  EXPIRED REAGENTS:")?;
            for r in &self.expired {
                writeln!(f, "  - {}: expired on {}", r.name, format_date(r.expiration_date))?;
            }
        }

        if !self.near_expiry.is_empty() {
            writeln!(f, "\n⚠️  EXPIRING SOON ({} days):", self.horizon_days)?;
            for r in &self.near_expiry {
                let days = r.days_until_expiry(self.today()).unwrap_or_default();
                writeln!(
                    f,
                    "  - {}: expires in {} days ({})",
                    r.name,
                    days,
                    format_date(r.expiration_date)
                )?;
            }
        }

        if !self.low_stock.is_empty() {
            writeln!(f, "\n⚠️  LOW STOCK (< {} unit):", self.low_stock_threshold)?;
            for r in &self.low_stock {
                writeln!(f, "  - {}: {} {}", r.name, r.quantity, r.unit)?;
            }
        }

        Ok(())
    }
}

/// Detailed alerts view of a report
struct AlertsPanel<'a>(&'a StockReport);

impl fmt::Display for AlertsPanel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let heavy = "═".repeat(RULE_WIDTH);
        let light = "─".repeat(RULE_WIDTH);
        let today = report.today();

        writeln!(f, "{}", heavy)?;
        writeln!(f, "{:^70}", "SYSTEM ALERTS AND WARNINGS")?;
        writeln!(f, "{}", heavy)?;
        writeln!(f)?;
        writeln!(f, "Checked at: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f)?;

        if report.expired.is_empty() {
            writeln!(f, "✓ No expired reagents\n")?;
        } else {
            writeln!(f, "🔴 EXPIRED REAGENTS (IMMEDIATE ACTION REQUIRED):")?;
            writeln!(f, "{}", light)?;
            for r in &report.expired {
                let days_past = -r.days_until_expiry(today).unwrap_or_default();
                write_reagent_block(f, r)?;
                writeln!(f, "    Days expired: {} days", days_past)?;
                writeln!(f, "    Notes: {}\n", r.notes)?;
            }
        }

        if report.near_expiry.is_empty() {
            writeln!(f, "✓ No reagents expiring in the next {} days\n", report.horizon_days)?;
        } else {
            writeln!(f, "🟡 REAGENTS EXPIRING SOON ({} days):", report.horizon_days)?;
            writeln!(f, "{}", light)?;
            for r in &report.near_expiry {
                let days_left = r.days_until_expiry(today).unwrap_or_default();
                write_reagent_block(f, r)?;
                writeln!(f, "    Days remaining: {} days", days_left)?;
                writeln!(f, "    Notes: {}\n", r.notes)?;
            }
        }

        if report.low_stock.is_empty() {
            writeln!(f, "✓ All reagents have adequate stock\n")?;
        } else {
            writeln!(f, "🟠 LOW STOCK REAGENTS (< {} unit):", report.low_stock_threshold)?;
            writeln!(f, "{}", light)?;
            for r in &report.low_stock {
                writeln!(f, "  • {}: {:.2} {}", r.name, r.quantity, r.unit)?;
                if r.status == ReagentStatus::Depleted {
                    writeln!(f, "    ⚠️ DEPLETED - Restock urgently")?;
                }
                writeln!(f)?;
            }
        }

        if report.damaged.is_empty() {
            writeln!(f, "✓ No damaged reagents\n")?;
        } else {
            writeln!(f, "🔴 DAMAGED REAGENTS:")?;
            writeln!(f, "{}", light)?;
            for r in &report.damaged {
                writeln!(f, "  • {}: {:.2} {}", r.name, r.quantity, r.unit)?;
                writeln!(f, "    Notes: {}\n", r.notes)?;
            }
        }

        writeln!(f, "{}", heavy)?;
        writeln!(f, "End of alerts")
    }
}

fn write_reagent_block(f: &mut fmt::Formatter<'_>, r: &Reagent) -> fmt::Result {
    writeln!(f, "  • {}", r.name)?;
    writeln!(f, "    Stock: {:.2} {}", r.quantity, r.unit)?;
    writeln!(f, "    Expiration date: {}", format_date(r.expiration_date))
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn render_stock_report(ledger: &Ledger, now: NaiveDateTime) -> String {
    StockReport::build(ledger, now).render()
}

pub fn render_alerts(ledger: &Ledger, now: NaiveDateTime) -> String {
    StockReport::build(ledger, now).render_alerts()
}

pub fn startup_alerts(ledger: &Ledger, now: NaiveDateTime) -> Vec<String> {
    StockReport::build(ledger, now).startup_alerts()
}

/// File name used for an export made at `now`
pub fn report_file_name(now: NaiveDateTime) -> String {
    format!("inventory_report_{}.txt", now.format("%Y%m%d_%H%M%S"))
}

/// Write report text into `dir`, returning the created path
pub fn export_report(dir: &Path, text: &str, now: NaiveDateTime) -> Result<PathBuf> {
    if text.trim().is_empty() {
        return Err(InventoryError::MissingFields(vec!["report"]));
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(now));
    fs::write(&path, text)?;
    info!("Exported report to {:?}", path);
    Ok(path)
}
