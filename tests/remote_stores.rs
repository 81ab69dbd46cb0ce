// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Remote adapters driven against in-process mock servers

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use reagent_inventory::config::{SheetsConfig, TableStoreConfig};
use reagent_inventory::model::{Movement, MovementKind, Reagent, ReagentStatus};
use reagent_inventory::store::{Repository, SheetsStore, TableStore};
use reagent_inventory::InventoryError;

type Tables = Arc<Mutex<HashMap<String, Vec<Value>>>>;
type Sheets = Arc<Mutex<HashMap<String, Vec<Vec<Value>>>>>;

const API_KEY: &str = "anon-key";
const TOKEN: &str = "sheets-token";

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn sample() -> (Vec<Reagent>, Vec<Movement>) {
    let reagents = vec![
        Reagent {
            name: "Ácido Clorhídrico 37%".into(),
            quantity: 3.0,
            unit: "L".into(),
            status: ReagentStatus::InUse,
            expiration_date: NaiveDate::from_ymd_opt(2026, 8, 15),
            received_date: NaiveDate::from_ymd_opt(2024, 5, 8),
            notes: "Corrosive - Use in fume hood".into(),
        },
        Reagent {
            name: "Glucosa".into(),
            quantity: 0.0,
            unit: "kg".into(),
            status: ReagentStatus::Depleted,
            expiration_date: None,
            received_date: None,
            notes: String::new(),
        },
    ];
    let movements = vec![Movement {
        date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        time: NaiveTime::from_hms_opt(10, 15, 30).unwrap(),
        kind: MovementKind::Withdrawal,
        name: "Glucosa".into(),
        quantity: 20.0,
        unit: "kg".into(),
        user: "bob".into(),
        project: "BIO-2".into(),
        notes: "last of the lot".into(),
    }];
    (reagents, movements)
}

// === PostgREST mock ===

fn has_key(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
    apikey == Some(API_KEY) && bearer == Some(format!("Bearer {}", API_KEY).as_str())
}

async fn rest_select(
    State(tables): State<Tables>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !has_key(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if params.get("select").map(String::as_str) != Some("*") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let rows = tables.lock().unwrap().get(&table).cloned().unwrap_or_default();
    Json(rows).into_response()
}

async fn rest_delete(
    State(tables): State<Tables>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> StatusCode {
    if !has_key(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    // PostgREST refuses unfiltered deletes
    if params.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    tables.lock().unwrap().remove(&table);
    StatusCode::NO_CONTENT
}

async fn rest_insert(
    State(tables): State<Tables>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(rows): Json<Vec<Value>>,
) -> StatusCode {
    if !has_key(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    tables.lock().unwrap().entry(table).or_default().extend(rows);
    StatusCode::CREATED
}

async fn table_store_server(tables: Tables) -> String {
    let app = Router::new()
        .route(
            "/rest/v1/:table",
            get(rest_select).delete(rest_delete).post(rest_insert),
        )
        .with_state(tables);
    serve(app).await
}

fn table_store_config(url: String, key: &str) -> TableStoreConfig {
    TableStoreConfig {
        url,
        api_key: Some(key.to_string()),
        inventory_table: "inventory".to_string(),
        movements_table: "movements".to_string(),
        timeout_secs: 5,
        legacy_columns: false,
    }
}

#[tokio::test]
async fn test_table_store_round_trip() {
    let tables = Tables::default();
    let url = table_store_server(tables.clone()).await;
    let store = TableStore::from_config(&table_store_config(url, API_KEY)).unwrap();
    let (reagents, movements) = sample();

    store.save(&reagents, &movements).await.unwrap();
    let (loaded_reagents, loaded_movements) = store.load().await.unwrap();

    assert_eq!(loaded_reagents, reagents);
    assert_eq!(loaded_movements, movements);

    let raw = tables.lock().unwrap().get("movements").cloned().unwrap();
    assert_eq!(raw[0]["kind"], "SALIDA");
    assert_eq!(raw[0]["date"], "2025-03-14");
}

#[tokio::test]
async fn test_table_store_save_replaces_rows() {
    let tables = Tables::default();
    let url = table_store_server(tables.clone()).await;
    let store = TableStore::from_config(&table_store_config(url, API_KEY)).unwrap();
    let (reagents, movements) = sample();

    store.save(&reagents, &movements).await.unwrap();
    store.save(&reagents[..1], &[]).await.unwrap();

    let (loaded_reagents, loaded_movements) = store.load().await.unwrap();
    assert_eq!(loaded_reagents.len(), 1);
    assert!(loaded_movements.is_empty());
}

fn legacy_tables() -> Tables {
    let mut tables = HashMap::new();
    tables.insert(
        "inventario".to_string(),
        vec![json!({
            "id": 3,
            "reactivo": "Etanol 96%",
            "cantidad": 10.0,
            "unidad": "L",
            "estado": "disponible",
            "fecha_vencimiento": "2025-11-15",
            "fecha_ingreso": "2024-03-10",
            "notas": "Inflamable - Mantener alejado del fuego",
            "updated_at": "2025-02-01T09:00:00"
        })],
    );
    tables.insert(
        "log_movimientos".to_string(),
        vec![json!({
            "id": 11,
            "fecha": "2025-02-01",
            "hora": "09:00:00",
            "tipo_movimiento": "SALIDA",
            "reactivo": "Etanol 96%",
            "cantidad": 0.5,
            "unidad": "L",
            "usuario": "ana",
            "proyecto_curso": "QUI-101",
            "notas": ""
        })],
    );
    Arc::new(Mutex::new(tables))
}

fn legacy_config(url: String) -> TableStoreConfig {
    TableStoreConfig {
        inventory_table: "inventario".to_string(),
        movements_table: "log_movimientos".to_string(),
        legacy_columns: true,
        ..table_store_config(url, API_KEY)
    }
}

#[tokio::test]
async fn test_table_store_loads_spanish_layout() {
    let url = table_store_server(legacy_tables()).await;
    // Reading needs no layout flag
    let store = TableStore::from_config(&TableStoreConfig {
        legacy_columns: false,
        ..legacy_config(url)
    })
    .unwrap();

    let (reagents, movements) = store.load().await.unwrap();

    assert_eq!(reagents.len(), 1);
    assert_eq!(reagents[0].name, "Etanol 96%");
    assert_eq!(reagents[0].quantity, 10.0);
    assert_eq!(reagents[0].status, ReagentStatus::Available);
    assert_eq!(reagents[0].expiration_date, NaiveDate::from_ymd_opt(2025, 11, 15));
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].kind, MovementKind::Withdrawal);
    assert_eq!(movements[0].user, "ana");
    assert_eq!(movements[0].project, "QUI-101");
}

#[tokio::test]
async fn test_table_store_writes_spanish_layout() {
    let tables = legacy_tables();
    let url = table_store_server(tables.clone()).await;
    let store = TableStore::from_config(&legacy_config(url)).unwrap();
    let (reagents, movements) = sample();

    store.save(&reagents, &movements).await.unwrap();

    let raw = tables.lock().unwrap().clone();
    let inventory = &raw["inventario"];
    assert_eq!(inventory.len(), 2);
    assert_eq!(inventory[0]["reactivo"], "Ácido Clorhídrico 37%");
    assert_eq!(inventory[0]["estado"], "en uso");
    assert_eq!(inventory[1]["estado"], "agotado");
    assert!(inventory[0].get("name").is_none());
    assert_eq!(raw["log_movimientos"][0]["tipo_movimiento"], "SALIDA");
    assert_eq!(raw["log_movimientos"][0]["proyecto_curso"], "BIO-2");

    let (loaded_reagents, loaded_movements) = store.load().await.unwrap();
    assert_eq!(loaded_reagents, reagents);
    assert_eq!(loaded_movements, movements);
}

#[tokio::test]
async fn test_table_store_rejects_duplicate_names() {
    let tables = legacy_tables();
    tables.lock().unwrap().get_mut("inventario").unwrap().push(json!({
        "reactivo": "etanol 96%",
        "cantidad": 1.0,
        "estado": "disponible"
    }));
    let url = table_store_server(tables).await;
    let store = TableStore::from_config(&legacy_config(url)).unwrap();

    let err = store.load().await.unwrap_err();
    assert!(matches!(err, InventoryError::InvalidRecord(ref msg) if msg.contains("etanol 96%")));
}

#[tokio::test]
async fn test_table_store_rejected_key() {
    let url = table_store_server(Tables::default()).await;
    let store = TableStore::from_config(&table_store_config(url, "wrong-key")).unwrap();

    let err = store.load().await.unwrap_err();
    assert!(matches!(err, InventoryError::BackendUnavailable(ref msg) if msg.contains("401")));
}

#[tokio::test]
async fn test_table_store_unreachable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let store = TableStore::from_config(&table_store_config(url, API_KEY)).unwrap();
    let err = store.save(&[], &[]).await.unwrap_err();
    assert!(matches!(err, InventoryError::BackendUnavailable(_)));
}

// === Sheets values API mock ===

fn has_token(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(format!("Bearer {}", TOKEN).as_str())
}

async fn values_get(
    State(sheets): State<Sheets>,
    Path((_id, range)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !has_token(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match sheets.lock().unwrap().get(&range) {
        Some(grid) if !grid.is_empty() => {
            Json(json!({ "range": format!("{}!A1:Z{}", range, grid.len()), "majorDimension": "ROWS", "values": grid }))
                .into_response()
        }
        // The API omits `values` for an empty range
        _ => Json(json!({ "range": range, "majorDimension": "ROWS" })).into_response(),
    }
}

async fn values_clear(
    State(sheets): State<Sheets>,
    Path((_id, range)): Path<(String, String)>,
    headers: HeaderMap,
) -> StatusCode {
    if !has_token(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    match range.strip_suffix(":clear") {
        Some(sheet) => {
            sheets.lock().unwrap().remove(sheet);
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn values_update(
    State(sheets): State<Sheets>,
    Path((_id, range)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    if !has_token(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    if params.get("valueInputOption").map(String::as_str) != Some("RAW") {
        return StatusCode::BAD_REQUEST;
    }
    let Some(sheet) = range.strip_suffix("!A1") else {
        return StatusCode::BAD_REQUEST;
    };
    let values: Vec<Vec<Value>> = serde_json::from_value(body["values"].clone()).unwrap_or_default();
    sheets.lock().unwrap().insert(sheet.to_string(), values);
    StatusCode::OK
}

async fn sheets_server(sheets: Sheets) -> String {
    let app = Router::new()
        .route(
            "/v4/spreadsheets/:id/values/:range",
            get(values_get).post(values_clear).put(values_update),
        )
        .with_state(sheets);
    serve(app).await
}

fn sheets_config(base_url: String) -> SheetsConfig {
    SheetsConfig {
        base_url,
        spreadsheet_id: "lab-sheet".to_string(),
        access_token: Some(TOKEN.to_string()),
        inventory_sheet: "inventario".to_string(),
        log_sheet: "log".to_string(),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_sheets_round_trip() {
    let sheets = Sheets::default();
    let url = sheets_server(sheets.clone()).await;
    let store = SheetsStore::from_config(&sheets_config(url)).unwrap();
    let (reagents, movements) = sample();

    store.save(&reagents, &movements).await.unwrap();
    let (loaded_reagents, loaded_movements) = store.load().await.unwrap();

    assert_eq!(loaded_reagents, reagents);
    assert_eq!(loaded_movements, movements);

    let grid = sheets.lock().unwrap().get("inventario").cloned().unwrap();
    assert_eq!(grid[0][0], "name");
    assert_eq!(grid.len(), 3);
}

#[tokio::test]
async fn test_sheets_empty_spreadsheet_loads_empty() {
    let url = sheets_server(Sheets::default()).await;
    let store = SheetsStore::from_config(&sheets_config(url)).unwrap();

    let (reagents, movements) = store.load().await.unwrap();
    assert!(reagents.is_empty());
    assert!(movements.is_empty());
}

#[tokio::test]
async fn test_sheets_reads_legacy_spanish_layout() {
    let sheets = Sheets::default();
    sheets.lock().unwrap().insert(
        "inventario".to_string(),
        vec![
            vec![json!("Reactivo"), json!("Cantidad"), json!("Unidad"), json!("Estado"), json!("FechaVencimiento")],
            vec![json!("Acetona"), json!(8), json!("L"), json!("disponible"), json!("2025-10-20 00:00:00")],
        ],
    );
    sheets.lock().unwrap().insert(
        "log".to_string(),
        vec![
            vec![
                json!("Fecha"), json!("Hora"), json!("TipoMovimiento"), json!("Reactivo"),
                json!("Cantidad"), json!("Unidad"), json!("Usuario"), json!("ProyectoCurso"),
            ],
            vec![
                json!("2025-01-10"), json!("09:12:44"), json!("ENTRADA"), json!("Acetona"),
                json!("8"), json!("L"), json!("ana"), json!("QUI-101"),
            ],
        ],
    );
    let url = sheets_server(sheets).await;
    let store = SheetsStore::from_config(&sheets_config(url)).unwrap();

    let (reagents, movements) = store.load().await.unwrap();
    assert_eq!(reagents[0].quantity, 8.0);
    assert_eq!(reagents[0].expiration_date, NaiveDate::from_ymd_opt(2025, 10, 20));
    assert_eq!(movements[0].kind, MovementKind::Deposit);
    assert_eq!(movements[0].user, "ana");
}

#[tokio::test]
async fn test_sheets_rejected_token() {
    let url = sheets_server(Sheets::default()).await;
    let mut config = sheets_config(url);
    config.access_token = Some("expired".to_string());
    let store = SheetsStore::from_config(&config).unwrap();

    let err = store.save(&[], &[]).await.unwrap_err();
    assert!(matches!(err, InventoryError::BackendUnavailable(_)));
}
