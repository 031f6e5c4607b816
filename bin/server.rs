// Expense Ledger - Web Server
// JSON API over the same ledger the terminal UI edits

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use expense_ledger::{logging, validate_expense, Config, Expense, LedgerError, LedgerStore, SqliteLedger};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
struct AppState {
    ledger: Arc<Mutex<SqliteLedger>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
}

#[derive(Serialize)]
struct ApiError {
    kind: &'static str,
    message: String,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Raw form values, validated exactly like the terminal form.
///
/// `amount` is accepted as text or as a JSON number.
#[derive(Deserialize)]
struct ExpenseRequest {
    #[serde(default)]
    date: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    amount: Option<serde_json::Value>,
    #[serde(default)]
    notes: String,
}

impl ExpenseRequest {
    fn amount_text(&self) -> String {
        match &self.amount {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct CreatedResponse {
    id: String,
}

/// Client mistakes are 400, a vanished record is 404, the store is 503.
fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        LedgerError::SelectionRequired { .. } => StatusCode::BAD_REQUEST,
        LedgerError::RecordNotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(err: LedgerError) -> Response {
    let status = status_for(&err);

    if status == StatusCode::SERVICE_UNAVAILABLE {
        error!(kind = err.kind(), "{}", err);
    } else {
        warn!(kind = err.kind(), "{}", err);
    }

    let body = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(ApiError {
            kind: err.kind(),
            message: err.to_string(),
        }),
    };
    (status, Json(body)).into_response()
}

fn poisoned() -> Response {
    error!("ledger lock poisoned");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(ApiError {
                kind: "storage_unavailable",
                message: String::from("ledger lock poisoned"),
            }),
        }),
    )
        .into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/expenses - All expenses, newest date first
async fn list_expenses(State(state): State<AppState>) -> Response {
    let Ok(ledger) = state.ledger.lock() else {
        return poisoned();
    };

    match ledger.list() {
        Ok(expenses) => (StatusCode::OK, Json(ApiResponse::<Vec<Expense>>::ok(expenses))).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/expenses - Add an expense
async fn create_expense(State(state): State<AppState>, Json(req): Json<ExpenseRequest>) -> Response {
    let expense = match validate_expense(&req.date, &req.category, &req.amount_text(), &req.notes) {
        Ok(expense) => expense,
        Err(e) => return error_response(e),
    };

    let Ok(mut ledger) = state.ledger.lock() else {
        return poisoned();
    };

    match ledger.create(&expense) {
        Ok(id) => {
            info!(%id, "expense added");
            (StatusCode::CREATED, Json(ApiResponse::ok(CreatedResponse { id }))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// PUT /api/expenses/:id - Replace every field of an expense
async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ExpenseRequest>,
) -> Response {
    let expense = match validate_expense(&req.date, &req.category, &req.amount_text(), &req.notes) {
        Ok(expense) => expense,
        Err(e) => return error_response(e),
    };

    let Ok(mut ledger) = state.ledger.lock() else {
        return poisoned();
    };

    match ledger.update(&id, &expense) {
        Ok(()) => {
            info!(%id, "expense updated");
            (StatusCode::OK, Json(ApiResponse::ok(expense.with_id(id)))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /api/expenses/:id - Remove an expense
async fn delete_expense(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(mut ledger) = state.ledger.lock() else {
        return poisoned();
    };

    match ledger.delete(&id) {
        Ok(()) => {
            info!(%id, "expense deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/:id", put(update_expense).delete(delete_expense))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::Context;

    logging::init_stderr();
    let config = Config::from_env()?;

    config.ensure_db_dir()?;
    let ledger = SqliteLedger::open(&config.db_path)
        .with_context(|| format!("failed to open ledger at {:?}", config.db_path))?;

    let state = AppState {
        ledger: Arc::new(Mutex::new(ledger)),
    };

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server_addr))?;

    info!(addr = %config.server_addr, "server running, API at /api/expenses");

    axum::serve(listener, router(state))
        .await
        .context("server error")?;

    Ok(())
}
