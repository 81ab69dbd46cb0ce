// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Hosted table store backend (PostgREST / Supabase REST API)

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::rows::{ensure_unique_names, parse_cell_date, parse_cell_time};
use super::Repository;
use crate::config::TableStoreConfig;
use crate::model::{Movement, MovementKind, Reagent, ReagentStatus, DATE_FORMAT, TIME_FORMAT};
use crate::{InventoryError, Result};

/// PostgREST client over two tables
pub struct TableStore {
    client: Client,
    base_url: String,
    api_key: String,
    inventory_table: String,
    movements_table: String,
    legacy_columns: bool,
}

/// Canonical column names and their counterparts in legacy Spanish tables
const LEGACY_COLUMNS: [(&str, &str); 12] = [
    ("name", "reactivo"),
    ("quantity", "cantidad"),
    ("unit", "unidad"),
    ("status", "estado"),
    ("expiration_date", "fecha_vencimiento"),
    ("received_date", "fecha_ingreso"),
    ("notes", "notas"),
    ("date", "fecha"),
    ("time", "hora"),
    ("kind", "tipo_movimiento"),
    ("user", "usuario"),
    ("project", "proyecto_curso"),
];

fn legacy_column(column: &str) -> &str {
    LEGACY_COLUMNS
        .iter()
        .find(|(canonical, _)| *canonical == column)
        .map_or(column, |(_, legacy)| legacy)
}

/// Inventory row as stored remotely; text columns may be null
///
/// Dates and statuses travel as text and are parsed leniently, so tables
/// written with the legacy Spanish layout load as well.
#[derive(Serialize, Deserialize)]
struct ReagentRow {
    #[serde(alias = "reactivo")]
    name: String,
    #[serde(alias = "cantidad")]
    quantity: f64,
    #[serde(default, alias = "unidad")]
    unit: Option<String>,
    #[serde(default, alias = "estado")]
    status: Option<String>,
    #[serde(default, alias = "fecha_vencimiento")]
    expiration_date: Option<String>,
    #[serde(default, alias = "fecha_ingreso")]
    received_date: Option<String>,
    #[serde(default, alias = "notas")]
    notes: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct MovementRow {
    #[serde(alias = "fecha")]
    date: String,
    #[serde(alias = "hora")]
    time: String,
    #[serde(alias = "tipo_movimiento")]
    kind: String,
    #[serde(alias = "reactivo")]
    name: String,
    #[serde(alias = "cantidad")]
    quantity: f64,
    #[serde(default, alias = "unidad")]
    unit: Option<String>,
    #[serde(default, alias = "usuario")]
    user: Option<String>,
    #[serde(default, alias = "proyecto_curso")]
    project: Option<String>,
    #[serde(default, alias = "notas")]
    notes: Option<String>,
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ReagentRow {
    fn new(r: &Reagent, legacy: bool) -> Self {
        let status = if legacy { r.status.legacy_str() } else { r.status.as_str() };
        Self {
            name: r.name.clone(),
            quantity: r.quantity,
            unit: Some(r.unit.clone()),
            status: Some(status.to_string()),
            expiration_date: format_date(r.expiration_date),
            received_date: format_date(r.received_date),
            notes: Some(r.notes.clone()),
        }
    }
}

impl TryFrom<ReagentRow> for Reagent {
    type Error = InventoryError;

    fn try_from(row: ReagentRow) -> Result<Self> {
        let status = match non_blank(row.status.as_deref()) {
            Some(raw) => raw
                .parse()
                .map_err(|e| InventoryError::InvalidRecord(format!("{}: {}", row.name, e)))?,
            None => ReagentStatus::Available,
        };
        let expiration_date = non_blank(row.expiration_date.as_deref()).and_then(|raw| {
            let parsed = parse_cell_date(raw);
            if parsed.is_none() {
                warn!("Unreadable expiration date '{}' for {}", raw, row.name);
            }
            parsed
        });
        let received_date = non_blank(row.received_date.as_deref()).and_then(parse_cell_date);
        Ok(Self {
            name: row.name.trim().to_string(),
            quantity: row.quantity,
            unit: row.unit.unwrap_or_default(),
            status,
            expiration_date,
            received_date,
            notes: row.notes.unwrap_or_default(),
        })
    }
}

impl From<&Movement> for MovementRow {
    fn from(m: &Movement) -> Self {
        Self {
            date: m.date.format(DATE_FORMAT).to_string(),
            time: m.time.format(TIME_FORMAT).to_string(),
            kind: m.kind.as_str().to_string(),
            name: m.name.clone(),
            quantity: m.quantity,
            unit: Some(m.unit.clone()),
            user: Some(m.user.clone()),
            project: Some(m.project.clone()),
            notes: Some(m.notes.clone()),
        }
    }
}

impl TryFrom<MovementRow> for Movement {
    type Error = InventoryError;

    fn try_from(row: MovementRow) -> Result<Self> {
        let date = parse_cell_date(&row.date).ok_or_else(|| {
            InventoryError::InvalidRecord(format!("movement of {}: bad date '{}'", row.name, row.date))
        })?;
        let time = parse_cell_time(&row.time).ok_or_else(|| {
            InventoryError::InvalidRecord(format!("movement of {}: bad time '{}'", row.name, row.time))
        })?;
        let kind: MovementKind = row
            .kind
            .parse()
            .map_err(|e| InventoryError::InvalidRecord(format!("movement of {}: {}", row.name, e)))?;
        Ok(Self {
            date,
            time,
            kind,
            name: row.name,
            quantity: row.quantity,
            unit: row.unit.unwrap_or_default(),
            user: row.user.unwrap_or_default(),
            project: row.project.unwrap_or_default(),
            notes: row.notes.unwrap_or_default(),
        })
    }
}

impl TableStore {
    pub fn from_config(config: &TableStoreConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| InventoryError::Config("table store API key is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key,
            inventory_table: config.inventory_table.clone(),
            movements_table: config.movements_table.clone(),
            legacy_columns: config.legacy_columns,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Column name as it exists in the remote tables
    fn column<'a>(&self, canonical: &'a str) -> &'a str {
        if self.legacy_columns {
            legacy_column(canonical)
        } else {
            canonical
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&[("select", "*")])
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        let response = check_status(response, table).await?;
        Ok(response.json().await?)
    }

    async fn replace<T: Serialize + Sync>(&self, table: &str, rows: &[T]) -> Result<()> {
        let response = self
            .authorized(self.client.delete(self.table_url(table)))
            .query(&[(self.column("name"), "not.is.null")])
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;
        check_status(response, table).await?;

        if rows.is_empty() {
            return Ok(());
        }

        let body = rows
            .iter()
            .map(|row| serde_json::to_value(row).map(|value| self.rename_columns(value)))
            .collect::<serde_json::Result<Vec<Value>>>()?;

        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;
        check_status(response, table).await?;

        debug!("Wrote {} rows to table {}", rows.len(), table);
        Ok(())
    }

    fn rename_columns(&self, row: Value) -> Value {
        match row {
            Value::Object(map) if self.legacy_columns => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (legacy_column(&key).to_string(), value))
                    .collect(),
            ),
            other => other,
        }
    }

    fn connect_error(&self, e: reqwest::Error) -> InventoryError {
        InventoryError::BackendUnavailable(format!("Cannot reach table store at {}: {}", self.base_url, e))
    }
}

async fn check_status(response: Response, table: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(InventoryError::BackendUnavailable(format!(
        "Table store returned status {} for '{}': {}",
        status,
        table,
        body.trim()
    )))
}

#[async_trait]
impl Repository for TableStore {
    fn name(&self) -> &'static str {
        "table_store"
    }

    fn location(&self) -> String {
        format!("{} ({}, {})", self.base_url, self.inventory_table, self.movements_table)
    }

    async fn load(&self) -> Result<(Vec<Reagent>, Vec<Movement>)> {
        let reagents: Vec<ReagentRow> = self.fetch(&self.inventory_table).await?;
        let movements: Vec<MovementRow> = self.fetch(&self.movements_table).await?;
        let reagents = reagents
            .into_iter()
            .map(Reagent::try_from)
            .collect::<Result<Vec<_>>>()?;
        ensure_unique_names(&reagents)?;
        let movements = movements
            .into_iter()
            .map(Movement::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((reagents, movements))
    }

    async fn save(&self, reagents: &[Reagent], movements: &[Movement]) -> Result<()> {
        let reagent_rows: Vec<ReagentRow> = reagents
            .iter()
            .map(|r| ReagentRow::new(r, self.legacy_columns))
            .collect();
        let movement_rows: Vec<MovementRow> = movements.iter().map(MovementRow::from).collect();
        self.replace(&self.inventory_table, &reagent_rows).await?;
        self.replace(&self.movements_table, &movement_rows).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TableStoreConfig {
        TableStoreConfig {
            url: "https://lab.example.co/".to_string(),
            api_key: Some("anon-key".to_string()),
            inventory_table: "inventory".to_string(),
            movements_table: "movements".to_string(),
            timeout_secs: 5,
            legacy_columns: false,
        }
    }

    #[test]
    fn test_from_config_requires_key() {
        let mut cfg = config();
        cfg.api_key = None;
        assert!(matches!(TableStore::from_config(&cfg), Err(InventoryError::Config(_))));
    }

    #[test]
    fn test_table_url_trims_slash() {
        let store = TableStore::from_config(&config()).unwrap();
        assert_eq!(store.table_url("inventory"), "https://lab.example.co/rest/v1/inventory");
    }

    #[test]
    fn test_null_text_columns_decode_as_empty() {
        let row: ReagentRow = serde_json::from_str(
            r#"{"id": 4, "name": "Acetona", "quantity": 8.0, "unit": null, "status": "available", "notes": null}"#,
        )
        .unwrap();
        let reagent = Reagent::try_from(row).unwrap();
        assert_eq!(reagent.unit, "");
        assert_eq!(reagent.notes, "");
        assert_eq!(reagent.expiration_date, None);
    }

    #[test]
    fn test_spanish_row_decodes() {
        let row: ReagentRow = serde_json::from_str(
            r#"{"id": 7, "reactivo": "Etanol 96%", "cantidad": 10.0, "unidad": "L",
                "estado": "en uso", "fecha_vencimiento": "2025-11-15",
                "fecha_ingreso": "2024-03-10T00:00:00", "notas": "Inflamable",
                "updated_at": "2025-01-02T10:00:00"}"#,
        )
        .unwrap();
        let reagent = Reagent::try_from(row).unwrap();
        assert_eq!(reagent.name, "Etanol 96%");
        assert_eq!(reagent.status, ReagentStatus::InUse);
        assert_eq!(reagent.expiration_date, NaiveDate::from_ymd_opt(2025, 11, 15));
        assert_eq!(reagent.received_date, NaiveDate::from_ymd_opt(2024, 3, 10));

        let row: ReagentRow =
            serde_json::from_str(r#"{"name": "Acetona", "quantity": 8.0, "status": "disponible"}"#).unwrap();
        assert_eq!(Reagent::try_from(row).unwrap().status, ReagentStatus::Available);
    }

    #[test]
    fn test_unknown_status_is_invalid_record() {
        let row: ReagentRow =
            serde_json::from_str(r#"{"name": "Acetona", "quantity": 8.0, "status": "borrowed"}"#).unwrap();
        assert!(matches!(Reagent::try_from(row), Err(InventoryError::InvalidRecord(_))));
    }

    #[test]
    fn test_legacy_columns_rename_on_write() {
        let mut cfg = config();
        cfg.legacy_columns = true;
        let store = TableStore::from_config(&cfg).unwrap();
        assert_eq!(store.column("name"), "reactivo");

        let value = serde_json::json!({ "name": "Acetona", "kind": "SALIDA", "id": 3 });
        let renamed = store.rename_columns(value);
        assert_eq!(renamed["reactivo"], "Acetona");
        assert_eq!(renamed["tipo_movimiento"], "SALIDA");
        assert_eq!(renamed["id"], 3);
    }
}
