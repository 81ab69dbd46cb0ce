// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Local spreadsheet backend: one CSV sheet per table
//!
//! Also reads legacy `.xlsx` / `.xls` / `.ods` workbooks for one-off imports.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::rows::{self, split_grid};
use super::Repository;
use crate::model::{Movement, Reagent};
use crate::{InventoryError, Result};

/// CSV-file backed repository
pub struct SpreadsheetStore {
    inventory_path: PathBuf,
    movements_path: PathBuf,
}

impl SpreadsheetStore {
    pub fn new(inventory_path: PathBuf, movements_path: PathBuf) -> Self {
        Self { inventory_path, movements_path }
    }

    pub fn inventory_path(&self) -> &Path {
        &self.inventory_path
    }

    pub fn movements_path(&self) -> &Path {
        &self.movements_path
    }
}

#[async_trait]
impl Repository for SpreadsheetStore {
    fn name(&self) -> &'static str {
        "spreadsheet"
    }

    fn location(&self) -> String {
        format!("{} + {}", self.inventory_path.display(), self.movements_path.display())
    }

    async fn load(&self) -> Result<(Vec<Reagent>, Vec<Movement>)> {
        let reagents = match read_csv_grid(&self.inventory_path)? {
            Some((header, data)) => rows::decode_reagents(&header, &data)?,
            None => Vec::new(),
        };
        let movements = match read_csv_grid(&self.movements_path)? {
            Some((header, data)) => rows::decode_movements(&header, &data)?,
            None => Vec::new(),
        };
        debug!("Loaded {} reagents and {} movements from CSV", reagents.len(), movements.len());
        Ok((reagents, movements))
    }

    async fn save(&self, reagents: &[Reagent], movements: &[Movement]) -> Result<()> {
        write_csv_atomic(
            &self.inventory_path,
            rows::inventory_header(),
            reagents.iter().map(rows::reagent_to_cells),
        )?;
        write_csv_atomic(
            &self.movements_path,
            rows::movement_header(),
            movements.iter().map(rows::movement_to_cells),
        )?;
        Ok(())
    }
}

/// Read a CSV file into header + rows; a missing or empty file yields `None`
fn read_csv_grid(path: &Path) -> Result<Option<(Vec<String>, Vec<Vec<String>>)>> {
    if !path.exists() {
        debug!("Sheet {:?} does not exist yet", path);
        return Ok(None);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    Ok(split_grid(grid))
}

/// Write a sheet to a sibling temp file, then rename it into place
fn write_csv_atomic<I>(path: &Path, header: Vec<String>, records: I) -> Result<()>
where
    I: Iterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        writer.write_record(&header)?;
        for record in records {
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read the first sheet of a workbook as text cells
pub fn read_workbook_grid(path: &Path) -> Result<Vec<Vec<String>>> {
    use calamine::{open_workbook_auto, Reader};

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| InventoryError::Spreadsheet(format!("Failed to open {:?}: {}", path, e)))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .ok_or_else(|| InventoryError::Spreadsheet(format!("{:?} has no sheets", path)))?;

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| InventoryError::Spreadsheet(format!("Failed to read sheet '{}': {}", first, e)))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect())
}

/// Load reagents from a legacy inventory workbook
pub fn import_inventory_workbook(path: &Path) -> Result<Vec<Reagent>> {
    let reagents = match split_grid(read_workbook_grid(path)?) {
        Some((header, data)) => rows::decode_reagents(&header, &data)?,
        None => Vec::new(),
    };
    info!("Read {} reagents from {:?}", reagents.len(), path);
    Ok(reagents)
}

/// Load movements from a legacy log workbook
pub fn import_movement_workbook(path: &Path) -> Result<Vec<Movement>> {
    let movements = match split_grid(read_workbook_grid(path)?) {
        Some((header, data)) => rows::decode_movements(&header, &data)?,
        None => Vec::new(),
    };
    info!("Read {} movements from {:?}", movements.len(), path);
    Ok(movements)
}

/// Read either a workbook or a CSV sheet, picked by extension
pub fn import_inventory_file(path: &Path) -> Result<Vec<Reagent>> {
    if is_csv(path) {
        return match read_csv_grid(path)? {
            Some((header, data)) => rows::decode_reagents(&header, &data),
            None => Err(InventoryError::Spreadsheet(format!("{:?} not found or empty", path))),
        };
    }
    import_inventory_workbook(path)
}

/// Movement counterpart of [`import_inventory_file`]
pub fn import_movement_file(path: &Path) -> Result<Vec<Movement>> {
    if is_csv(path) {
        return match read_csv_grid(path)? {
            Some((header, data)) => rows::decode_movements(&header, &data),
            None => Err(InventoryError::Spreadsheet(format!("{:?} not found or empty", path))),
        };
    }
    import_movement_workbook(path)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}
