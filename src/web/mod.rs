// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Web dashboard and JSON API

mod pages;

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::inventory::Inventory;
use crate::ledger::{
    parse_date, parse_quantity, validate_horizon, DepositRequest, ExpiryScan, WithdrawRequest,
};
use crate::model::{Movement, Reagent};
use crate::report::{self, StockReport};
use crate::{InventoryError, Result};

pub use pages::escape_html;

const DEFAULT_MOVEMENT_LIMIT: usize = 100;

/// Shared application state
pub struct AppState {
    pub inventory: Mutex<Inventory>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(inventory: Inventory, config: AppConfig) -> Arc<Self> {
        Arc::new(Self {
            inventory: Mutex::new(inventory),
            config,
        })
    }
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Pages
        .route("/", get(index_page))
        .route("/inventory", get(inventory_page))
        .route("/deposit", get(deposit_page).post(deposit_submit))
        .route("/withdraw", get(withdraw_page).post(withdraw_submit))
        .route("/movements", get(movements_page))
        .route("/alerts", get(alerts_page))
        .route("/reports", get(reports_page))
        .route("/reports/export", post(reports_export))
        // API endpoints
        .route("/api/reagents", get(api_get_reagents))
        .route("/api/movements", get(api_get_movements))
        .route("/api/expiry", get(api_get_expiry))
        .route("/api/report", get(api_get_report))
        .route("/api/deposit", post(api_deposit))
        .route("/api/withdraw", post(api_withdraw))
        .route("/api/reload", post(api_reload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP status for a domain error
pub fn status_for(error: &InventoryError) -> StatusCode {
    match error {
        InventoryError::NotFound(_) => StatusCode::NOT_FOUND,
        InventoryError::InsufficientStock { .. } => StatusCode::CONFLICT,
        InventoryError::InvalidQuantity(_)
        | InventoryError::MissingFields(_)
        | InventoryError::InvalidDate(_)
        | InventoryError::InvalidHorizon(_) => StatusCode::UNPROCESSABLE_ENTITY,
        e if e.is_backend_error() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for InventoryError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

// === Page Handlers ===

async fn index_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let inventory = state.inventory.lock().await;
    let report = StockReport::build(inventory.ledger(), Local::now().naive_local());
    let recent: Vec<&Movement> = inventory.ledger().recent_movements(10);
    let problems = inventory.ledger().problem_reagents();
    Html(pages::render_index(&report, &recent, &problems, &inventory.location()))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn inventory_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Html<String> {
    let inventory = state.inventory.lock().await;
    let reagents = search_or_all(&inventory, &query.q);
    Html(pages::render_inventory_page(&reagents, &query.q))
}

async fn deposit_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let inventory = state.inventory.lock().await;
    Html(pages::render_deposit_page(
        inventory.ledger().reagents(),
        &inventory.ledger().settings().default_unit,
        None,
    ))
}

/// Deposit form fields, all as typed by the user
#[derive(Debug, Deserialize)]
struct DepositForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    quantity: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    project: String,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    expires: String,
    #[serde(default)]
    notes: String,
}

impl DepositForm {
    fn to_request(&self) -> Result<DepositRequest> {
        check_form_fields(&self.name, &self.quantity, &self.user, &self.project)?;
        let unit = self.unit.trim();
        Ok(DepositRequest {
            name: self.name.trim().to_string(),
            quantity: parse_quantity(&self.quantity)?,
            user: self.user.trim().to_string(),
            project: self.project.trim().to_string(),
            unit: (!unit.is_empty()).then(|| unit.to_string()),
            expiration_date: parse_date(&self.expires)?,
            notes: self.notes.trim().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WithdrawForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    quantity: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    project: String,
    #[serde(default)]
    notes: String,
}

impl WithdrawForm {
    fn to_request(&self) -> Result<WithdrawRequest> {
        check_form_fields(&self.name, &self.quantity, &self.user, &self.project)?;
        Ok(WithdrawRequest {
            name: self.name.trim().to_string(),
            quantity: parse_quantity(&self.quantity)?,
            user: self.user.trim().to_string(),
            project: self.project.trim().to_string(),
            notes: self.notes.trim().to_string(),
        })
    }
}

fn check_form_fields(name: &str, quantity: &str, user: &str, project: &str) -> Result<()> {
    let missing: Vec<&'static str> = [("name", name), ("quantity", quantity), ("user", user), ("project", project)]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(InventoryError::MissingFields(missing))
    }
}

async fn deposit_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DepositForm>,
) -> (StatusCode, Html<String>) {
    let mut inventory = state.inventory.lock().await;
    let outcome = match form.to_request() {
        Ok(request) => inventory.deposit(&request).await,
        Err(e) => Err(e),
    };
    let (status, banner) = banner_for(outcome);
    let page = pages::render_deposit_page(
        inventory.ledger().reagents(),
        &inventory.ledger().settings().default_unit,
        Some(&banner),
    );
    (status, Html(page))
}

async fn withdraw_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let inventory = state.inventory.lock().await;
    Html(pages::render_withdraw_page(inventory.ledger().reagents(), None))
}

async fn withdraw_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<WithdrawForm>,
) -> (StatusCode, Html<String>) {
    let mut inventory = state.inventory.lock().await;
    let outcome = match form.to_request() {
        Ok(request) => inventory.withdraw(&request).await,
        Err(e) => Err(e),
    };
    let (status, banner) = banner_for(outcome);
    let page = pages::render_withdraw_page(inventory.ledger().reagents(), Some(&banner));
    (status, Html(page))
}

fn banner_for(outcome: Result<String>) -> (StatusCode, pages::Banner) {
    match outcome {
        Ok(message) => (StatusCode::OK, pages::Banner::Success(message)),
        Err(e) => (status_for(&e), pages::Banner::Error(e.to_string())),
    }
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn movements_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Html<String> {
    let inventory = state.inventory.lock().await;
    let movements = inventory
        .ledger()
        .recent_movements(query.limit.unwrap_or(DEFAULT_MOVEMENT_LIMIT));
    Html(pages::render_movements_page(&movements))
}

async fn alerts_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let inventory = state.inventory.lock().await;
    let text = report::render_alerts(inventory.ledger(), Local::now().naive_local());
    Html(pages::render_text_page("Alerts", &text, None))
}

async fn reports_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let inventory = state.inventory.lock().await;
    let text = report::render_stock_report(inventory.ledger(), Local::now().naive_local());
    Html(pages::render_reports_page(&text, None))
}

async fn reports_export(State(state): State<Arc<AppState>>) -> (StatusCode, Html<String>) {
    let inventory = state.inventory.lock().await;
    let now = Local::now().naive_local();
    let text = report::render_stock_report(inventory.ledger(), now);
    let outcome = report::export_report(Path::new(&state.config.reports.export_dir), &text, now)
        .map(|path| format!("Report exported to {}", path.display()));
    let (status, banner) = banner_for(outcome);
    (status, Html(pages::render_reports_page(&text, Some(&banner))))
}

fn search_or_all<'a>(inventory: &'a Inventory, term: &str) -> Vec<&'a Reagent> {
    if term.trim().is_empty() {
        inventory.ledger().reagents().iter().collect()
    } else {
        inventory.ledger().search(term)
    }
}

// === API Handlers ===

async fn api_get_reagents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<Reagent>> {
    let inventory = state.inventory.lock().await;
    Json(search_or_all(&inventory, &query.q).into_iter().cloned().collect())
}

async fn api_get_movements(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<Movement>> {
    let inventory = state.inventory.lock().await;
    let movements = inventory
        .ledger()
        .recent_movements(query.limit.unwrap_or(DEFAULT_MOVEMENT_LIMIT))
        .into_iter()
        .cloned()
        .collect();
    Json(movements)
}

#[derive(Deserialize)]
struct ExpiryQuery {
    days: Option<u32>,
}

async fn api_get_expiry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExpiryQuery>,
) -> Result<Json<ExpiryScan>> {
    let inventory = state.inventory.lock().await;
    let ledger = inventory.ledger();
    let days = match query.days {
        Some(days) => validate_horizon(i64::from(days))?,
        None => ledger.settings().expiry_horizon_days,
    };
    Ok(Json(ledger.expiry_scan(days, Local::now().date_naive())))
}

async fn api_get_report(State(state): State<Arc<AppState>>) -> Json<StockReport> {
    let inventory = state.inventory.lock().await;
    Json(StockReport::build(inventory.ledger(), Local::now().naive_local()))
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

async fn api_deposit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<MessageResponse>> {
    let mut inventory = state.inventory.lock().await;
    let message = inventory.deposit(&request).await?;
    Ok(Json(MessageResponse { message }))
}

async fn api_withdraw(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<MessageResponse>> {
    let mut inventory = state.inventory.lock().await;
    let message = inventory.withdraw(&request).await?;
    Ok(Json(MessageResponse { message }))
}

#[derive(Serialize)]
struct ReloadResponse {
    reagents: usize,
    movements: usize,
}

async fn api_reload(State(state): State<Arc<AppState>>) -> Result<Json<ReloadResponse>> {
    let mut inventory = state.inventory.lock().await;
    inventory.reload().await?;
    Ok(Json(ReloadResponse {
        reagents: inventory.ledger().reagents().len(),
        movements: inventory.ledger().movements().len(),
    }))
}

/// Start the web server with config and an opened inventory
pub async fn start_server(config: AppConfig, inventory: Inventory) -> Result<()> {
    inventory.log_startup_alerts();

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let state = AppState::new(inventory, config);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Web UI available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router)
        .await
        .map_err(|e| InventoryError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&InventoryError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&InventoryError::InsufficientStock {
                name: "x".into(),
                available: 1.0,
                requested: 2.0,
                unit: "L".into(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&InventoryError::MissingFields(vec!["user"])),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&InventoryError::BackendUnavailable("down".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&InventoryError::Config("bad".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_deposit_form_reports_all_missing_fields() {
        let form = DepositForm {
            name: "Acetona".into(),
            quantity: " ".into(),
            user: String::new(),
            project: "QUI-1".into(),
            unit: String::new(),
            expires: String::new(),
            notes: String::new(),
        };
        match form.to_request() {
            Err(InventoryError::MissingFields(fields)) => assert_eq!(fields, vec!["quantity", "user"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_deposit_form_parses_decimal_comma_and_date() {
        let form = DepositForm {
            name: " Acetona ".into(),
            quantity: "2,5".into(),
            user: "ana".into(),
            project: "QUI-1".into(),
            unit: "L".into(),
            expires: "2026-01-31".into(),
            notes: String::new(),
        };
        let request = form.to_request().unwrap();
        assert_eq!(request.name, "Acetona");
        assert_eq!(request.quantity, 2.5);
        assert_eq!(request.unit.as_deref(), Some("L"));
        assert!(request.expiration_date.is_some());
    }
}
