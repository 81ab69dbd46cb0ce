// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Row codec shared by the tabular backends
//!
//! Columns are located by header name, so sheets may order them freely.
//! Legacy Spanish headers (`Reactivo`, `FechaVencimiento`, `ProyectoCurso`, ...)
//! resolve to the same columns as the English ones.

use chrono::{Duration, NaiveDate, NaiveTime};
use std::collections::HashMap;
use tracing::warn;

use crate::model::{
    Movement, MovementKind, Reagent, ReagentStatus, DATE_FORMAT, INVENTORY_COLUMNS,
    MOVEMENT_COLUMNS, TIME_FORMAT,
};
use crate::{InventoryError, Result};

/// Largest serial day number a spreadsheet date can hold (9999-12-31)
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

/// Map a header cell to its canonical column name
pub fn canonical_column(header: &str) -> Option<&'static str> {
    let key: String = header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    let column = match key.as_str() {
        "name" | "reactivo" | "reagent" => "name",
        "quantity" | "cantidad" => "quantity",
        "unit" | "unidad" => "unit",
        "status" | "estado" => "status",
        "expirationdate" | "fechavencimiento" | "vencimiento" | "expiry" => "expiration_date",
        "receiveddate" | "fechaingreso" | "ingreso" => "received_date",
        "notes" | "notas" => "notes",
        "date" | "fecha" => "date",
        "time" | "hora" => "time",
        "kind" | "tipomovimiento" | "tipo" => "kind",
        "user" | "usuario" => "user",
        "project" | "proyectocurso" | "proyecto" => "project",
        _ => return None,
    };
    Some(column)
}

/// Positions of known columns within a header row
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<&'static str, usize>,
}

impl HeaderIndex {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut positions = HashMap::new();
        for (idx, header) in headers.into_iter().enumerate() {
            if let Some(column) = canonical_column(header.as_ref()) {
                positions.entry(column).or_insert(idx);
            }
        }
        Self { positions }
    }

    fn require(&self, columns: &[&str], table: &str) -> Result<()> {
        let missing: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| !self.positions.contains_key(c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(InventoryError::InvalidRecord(format!(
                "{} sheet is missing column(s): {}",
                table,
                missing.join(", ")
            )))
        }
    }

    fn cell<'a>(&self, cells: &'a [String], column: &str) -> &'a str {
        self.positions
            .get(column)
            .and_then(|&idx| cells.get(idx))
            .map(|s| s.trim())
            .unwrap_or("")
    }
}

/// Lenient date parsing for stored cells
pub fn parse_cell_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }
    // Timestamps such as "2025-11-15 00:00:00" or "2025-11-15T00:00:00"
    if raw.len() > 10 && raw.is_char_boundary(10) {
        if let Ok(date) = NaiveDate::parse_from_str(&raw[..10], DATE_FORMAT) {
            return Some(date);
        }
    }
    // Spreadsheet serial day numbers
    match raw.parse::<f64>() {
        Ok(serial) if (1.0..=MAX_SERIAL_DAY).contains(&serial) => {
            NaiveDate::from_ymd_opt(1899, 12, 30).map(|epoch| epoch + Duration::days(serial as i64))
        }
        _ => None,
    }
}

/// Lenient time parsing for stored cells
pub fn parse_cell_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    for format in [TIME_FORMAT, "%H:%M:%S%.f", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(raw, format) {
            return Some(time);
        }
    }
    // Fraction of a day
    match raw.parse::<f64>() {
        Ok(fraction) if (0.0..1.0).contains(&fraction) => {
            let secs = (fraction * 86_400.0).round() as u32;
            NaiveTime::from_num_seconds_from_midnight_opt(secs.min(86_399), 0)
        }
        _ => None,
    }
}

fn parse_cell_quantity(raw: &str, row: usize) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| InventoryError::InvalidRecord(format!("row {}: bad quantity '{}'", row, raw)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(InventoryError::InvalidRecord(format!(
            "row {}: quantity must be a non-negative number, got '{}'",
            row, raw
        )));
    }
    Ok(value)
}

fn is_blank(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
}

/// Header row for the inventory sheet
pub fn inventory_header() -> Vec<String> {
    INVENTORY_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Header row for the movement sheet
pub fn movement_header() -> Vec<String> {
    MOVEMENT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

pub fn reagent_to_cells(reagent: &Reagent) -> Vec<String> {
    vec![
        reagent.name.clone(),
        reagent.quantity.to_string(),
        reagent.unit.clone(),
        reagent.status.to_string(),
        format_date(reagent.expiration_date),
        format_date(reagent.received_date),
        reagent.notes.clone(),
    ]
}

pub fn movement_to_cells(movement: &Movement) -> Vec<String> {
    vec![
        movement.date.format(DATE_FORMAT).to_string(),
        movement.time.format(TIME_FORMAT).to_string(),
        movement.kind.to_string(),
        movement.name.clone(),
        movement.quantity.to_string(),
        movement.unit.clone(),
        movement.user.clone(),
        movement.project.clone(),
        movement.notes.clone(),
    ]
}

/// Decode one inventory row; blank rows yield `None`
pub fn reagent_from_cells(index: &HeaderIndex, cells: &[String], row: usize) -> Result<Option<Reagent>> {
    if is_blank(cells) {
        return Ok(None);
    }
    let name = index.cell(cells, "name");
    if name.is_empty() {
        return Err(InventoryError::InvalidRecord(format!("row {}: reagent name is empty", row)));
    }
    let quantity = parse_cell_quantity(index.cell(cells, "quantity"), row)?;

    let status_raw = index.cell(cells, "status");
    let status = if status_raw.is_empty() {
        ReagentStatus::Available
    } else {
        status_raw
            .parse()
            .map_err(|e| InventoryError::InvalidRecord(format!("row {}: {}", row, e)))?
    };

    let expiry_raw = index.cell(cells, "expiration_date");
    let expiration_date = parse_cell_date(expiry_raw);
    if expiration_date.is_none() && !expiry_raw.is_empty() {
        warn!("Row {}: unreadable expiration date '{}' for {}", row, expiry_raw, name);
    }

    Ok(Some(Reagent {
        name: name.to_string(),
        quantity,
        unit: index.cell(cells, "unit").to_string(),
        status,
        expiration_date,
        received_date: parse_cell_date(index.cell(cells, "received_date")),
        notes: index.cell(cells, "notes").to_string(),
    }))
}

/// Decode one movement row; blank rows yield `None`
pub fn movement_from_cells(index: &HeaderIndex, cells: &[String], row: usize) -> Result<Option<Movement>> {
    if is_blank(cells) {
        return Ok(None);
    }
    let date_raw = index.cell(cells, "date");
    let date = parse_cell_date(date_raw)
        .ok_or_else(|| InventoryError::InvalidRecord(format!("row {}: bad date '{}'", row, date_raw)))?;
    let time_raw = index.cell(cells, "time");
    let time = parse_cell_time(time_raw)
        .ok_or_else(|| InventoryError::InvalidRecord(format!("row {}: bad time '{}'", row, time_raw)))?;
    let kind: MovementKind = index
        .cell(cells, "kind")
        .parse()
        .map_err(|e| InventoryError::InvalidRecord(format!("row {}: {}", row, e)))?;

    Ok(Some(Movement {
        date,
        time,
        kind,
        name: index.cell(cells, "name").to_string(),
        quantity: parse_cell_quantity(index.cell(cells, "quantity"), row)?,
        unit: index.cell(cells, "unit").to_string(),
        user: index.cell(cells, "user").to_string(),
        project: index.cell(cells, "project").to_string(),
        notes: index.cell(cells, "notes").to_string(),
    }))
}

/// Decode an inventory sheet given its header and data rows
pub fn decode_reagents<S: AsRef<str>>(header: &[S], rows: &[Vec<String>]) -> Result<Vec<Reagent>> {
    let index = HeaderIndex::new(header);
    index.require(&["name", "quantity"], "inventory")?;
    let mut reagents = Vec::with_capacity(rows.len());
    for (i, cells) in rows.iter().enumerate() {
        // Row numbers are 1-based and count the header
        if let Some(reagent) = reagent_from_cells(&index, cells, i + 2)? {
            reagents.push(reagent);
        }
    }
    ensure_unique_names(&reagents)?;
    Ok(reagents)
}

/// Reject a reagent table that lists the same name twice, ignoring case
pub fn ensure_unique_names(reagents: &[Reagent]) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(reagents.len());
    for reagent in reagents {
        if let Some(first) = seen.insert(reagent.name.trim().to_lowercase(), &reagent.name) {
            return Err(InventoryError::InvalidRecord(format!(
                "reagent '{}' is listed twice (also as '{}')",
                reagent.name, first
            )));
        }
    }
    Ok(())
}

/// Decode a movement sheet given its header and data rows
pub fn decode_movements<S: AsRef<str>>(header: &[S], rows: &[Vec<String>]) -> Result<Vec<Movement>> {
    let index = HeaderIndex::new(header);
    index.require(&["date", "time", "kind", "name", "quantity"], "movements")?;
    let mut movements = Vec::with_capacity(rows.len());
    for (i, cells) in rows.iter().enumerate() {
        if let Some(movement) = movement_from_cells(&index, cells, i + 2)? {
            movements.push(movement);
        }
    }
    Ok(movements)
}

/// Split a grid into header and data rows; an empty grid decodes as no rows
pub fn split_grid(grid: Vec<Vec<String>>) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let mut rows = grid.into_iter();
    let header = rows.next()?;
    Some((header, rows.collect()))
}
