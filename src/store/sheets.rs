// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Remote spreadsheet backend (Google Sheets values API)
//!
//! Each table lives in its own sheet of one spreadsheet. Rows go through the
//! same cell codec as the local CSV sheets.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::rows::{self, split_grid};
use super::Repository;
use crate::config::SheetsConfig;
use crate::model::{Movement, Reagent};
use crate::{InventoryError, Result};

/// Remote spreadsheet client
pub struct SheetsStore {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    access_token: String,
    inventory_sheet: String,
    log_sheet: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueUpdate<'a> {
    range: String,
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

impl SheetsStore {
    pub fn from_config(config: &SheetsConfig) -> Result<Self> {
        let access_token = config
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| InventoryError::Config("sheets access token is not set".to_string()))?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| InventoryError::Config(format!("invalid sheets base_url '{}': {}", config.base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            spreadsheet_id: config.spreadsheet_id.clone(),
            access_token,
            inventory_sheet: config.inventory_sheet.clone(),
            log_sheet: config.log_sheet.clone(),
        })
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}`
    fn values_url(&self, range: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| InventoryError::Config(format!("sheets base_url cannot hold a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.access_token)
    }

    async fn read_sheet(&self, sheet: &str) -> Result<Option<(Vec<String>, Vec<Vec<String>>)>> {
        let response = self
            .authorized(self.client.get(self.values_url(sheet)?))
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;
        let response = check_status(response, sheet).await?;

        let range: ValueRange = response.json().await?;
        let grid = range
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        Ok(split_grid(grid))
    }

    async fn write_sheet(&self, sheet: &str, grid: Vec<Vec<String>>) -> Result<()> {
        let clear = format!("{}:clear", sheet);
        let response = self
            .authorized(self.client.post(self.values_url(&clear)?))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;
        check_status(response, sheet).await?;

        let range = format!("{}!A1", sheet);
        let body = ValueUpdate {
            range: range.clone(),
            major_dimension: "ROWS",
            values: &grid,
        };
        let response = self
            .authorized(self.client.put(self.values_url(&range)?))
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;
        check_status(response, sheet).await?;

        debug!("Wrote {} rows to sheet {}", grid.len().saturating_sub(1), sheet);
        Ok(())
    }

    fn connect_error(&self, e: reqwest::Error) -> InventoryError {
        InventoryError::BackendUnavailable(format!("Cannot reach sheets API at {}: {}", self.base_url, e))
    }
}

/// Cells come back as strings, but numbers and booleans are accepted too
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn check_status(response: reqwest::Response, sheet: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(InventoryError::BackendUnavailable(format!(
        "Sheets API returned status {} for sheet '{}': {}",
        status,
        sheet,
        body.trim()
    )))
}

#[async_trait]
impl Repository for SheetsStore {
    fn name(&self) -> &'static str {
        "sheets"
    }

    fn location(&self) -> String {
        format!("spreadsheet {} ({}, {})", self.spreadsheet_id, self.inventory_sheet, self.log_sheet)
    }

    async fn load(&self) -> Result<(Vec<Reagent>, Vec<Movement>)> {
        let reagents = match self.read_sheet(&self.inventory_sheet).await? {
            Some((header, data)) => rows::decode_reagents(&header, &data)?,
            None => Vec::new(),
        };
        let movements = match self.read_sheet(&self.log_sheet).await? {
            Some((header, data)) => rows::decode_movements(&header, &data)?,
            None => Vec::new(),
        };
        Ok((reagents, movements))
    }

    async fn save(&self, reagents: &[Reagent], movements: &[Movement]) -> Result<()> {
        let mut inventory = vec![rows::inventory_header()];
        inventory.extend(reagents.iter().map(rows::reagent_to_cells));
        let mut log = vec![rows::movement_header()];
        log.extend(movements.iter().map(rows::movement_to_cells));

        self.write_sheet(&self.inventory_sheet, inventory).await?;
        self.write_sheet(&self.log_sheet, log).await?;
        Ok(())
    }
}
