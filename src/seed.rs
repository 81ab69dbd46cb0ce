// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Sample reagent set installed into an empty inventory

use chrono::NaiveDate;

use crate::model::{Reagent, ReagentStatus};

// (name, quantity, unit, status, expires, received, notes)
const SAMPLES: [(&str, f64, &str, ReagentStatus, &str, &str, &str); 8] = [
    ("Ácido Sulfúrico 98%", 2.5, "L", ReagentStatus::Available, "2026-12-31", "2024-01-15", "Handle with care - Corrosive"),
    ("Hidróxido de Sodio", 5.0, "kg", ReagentStatus::Available, "2027-06-30", "2024-02-20", "Store in a dry place"),
    ("Etanol 96%", 10.0, "L", ReagentStatus::Available, "2025-11-15", "2024-03-10", "Flammable - Keep away from flames"),
    ("Cloruro de Sodio", 15.0, "kg", ReagentStatus::Available, "2028-01-31", "2024-01-05", "Analytical grade"),
    ("Acetona", 8.0, "L", ReagentStatus::Available, "2025-10-20", "2024-04-12", "Flammable - Good ventilation"),
    ("Ácido Clorhídrico 37%", 3.0, "L", ReagentStatus::InUse, "2026-08-15", "2024-05-08", "Corrosive - Use in fume hood"),
    ("Glucosa", 20.0, "kg", ReagentStatus::Available, "2027-03-31", "2024-02-28", "Store in a cool place"),
    ("Permanganato de Potasio", 1.5, "kg", ReagentStatus::Available, "2025-09-30", "2024-06-01", "Oxidizer - Fire risk"),
];

/// The demo inventory a fresh install starts with
pub fn sample_reagents() -> Vec<Reagent> {
    SAMPLES
        .iter()
        .map(|&(name, quantity, unit, status, expires, received, notes)| Reagent {
            name: name.to_string(),
            quantity,
            unit: unit.to_string(),
            status,
            expiration_date: NaiveDate::parse_from_str(expires, "%Y-%m-%d").ok(),
            received_date: NaiveDate::parse_from_str(received, "%Y-%m-%d").ok(),
            notes: notes.to_string(),
        })
        .collect()
}
