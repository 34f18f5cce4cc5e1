//! HTTP gateway over a deployed `.dcn` registry database.
//!
//! JSON in, JSON out. Amounts travel as raw 18-decimal integer units and
//! the caller identity is the explicit `from` address on every mutating
//! request. Rejections carry a `{reason, message}` body where `reason` is
//! the stable registrar error token.

pub mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use dcn_registrar::{Error as RegistrarError, Registrar};
use dcn_types::{format_native, Address, Balance, Moment, NameRecord, NameStatus};

#[derive(Clone)]
pub struct AppState {
    pub registrar: Arc<Registrar>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/available/:name", get(available))
        .route("/owner/:name", get(owner))
        .route("/registration/:name", get(registration))
        .route("/expiry/:name", get(expiry))
        .route("/info/:name", get(get_info))
        .route("/names/:address", get(names))
        .route("/fee/:years", get(fee))
        .route("/all", get(all))
        .route("/register", post(register))
        .route("/renew", post(renew))
        .route("/transfer", post(transfer))
        .route("/reserved", post(set_reserved))
        .route("/open", post(set_open))
        .route("/managers", post(set_manager))
        .with_state(state)
}

pub async fn serve(registrar: Registrar, socket: SocketAddr) -> anyhow::Result<()> {
    let app = router(AppState {
        registrar: Arc::new(registrar),
    });
    info!("gateway listening on {socket}");
    axum::Server::bind(&socket)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
}

/// A record as served to clients: raw unix timestamps plus the derived
/// renderings detail and profile views need.
#[derive(Debug, Serialize)]
pub struct RecordView {
    pub name: String,
    pub owner: Address,
    pub registration: Moment,
    pub registered_at: String,
    pub expire: Moment,
    pub expires_at: String,
    pub status: NameStatus,
    pub days_until_expiry: i64,
}

impl RecordView {
    fn new(name: String, record: NameRecord, now: Moment, grace: Moment) -> Self {
        RecordView {
            owner: record.owner,
            registration: record.registration,
            registered_at: rfc3339(record.registration),
            expire: record.expire,
            expires_at: rfc3339(record.expire),
            status: record.status(now, grace),
            days_until_expiry: record.days_until_expiry(now),
            name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeeView {
    pub years: u32,
    /// Raw 18-decimal units.
    pub amount: Balance,
    /// Decimal rendering of `amount`, e.g. `"0.03"`.
    pub formatted: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub from: Address,
    pub name: String,
    pub years: u32,
    /// Payment offered, raw 18-decimal units. Captured whole on success.
    pub value: Balance,
}

#[derive(Debug, Deserialize)]
pub struct RenewRequest {
    pub from: Address,
    pub name: String,
    pub years: u32,
    pub value: Balance,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from: Address,
    pub name: String,
    pub to: Address,
}

#[derive(Debug, Deserialize)]
pub struct ReservedRequest {
    pub from: Address,
    pub name: String,
    pub reserved: bool,
}

#[derive(Debug, Deserialize)]
pub struct OpenRequest {
    pub from: Address,
    pub open: bool,
}

#[derive(Debug, Deserialize)]
pub struct ManagerRequest {
    pub from: Address,
    pub account: Address,
    pub approved: bool,
}

/// Registrar rejection on its way to the wire.
#[derive(Debug)]
pub struct ApiError(RegistrarError);

impl From<RegistrarError> for ApiError {
    fn from(err: RegistrarError) -> Self {
        ApiError(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    reason: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RegistrarError::NotAvailable
            | RegistrarError::Reserved
            | RegistrarError::NotRenewable => StatusCode::CONFLICT,
            RegistrarError::Unauthorized => StatusCode::FORBIDDEN,
            RegistrarError::InsufficientPayment { .. } => StatusCode::PAYMENT_REQUIRED,
            RegistrarError::InvalidRecipient
            | RegistrarError::InvalidName(_)
            | RegistrarError::InvalidDuration { .. }
            | RegistrarError::Overflow => StatusCode::BAD_REQUEST,
            RegistrarError::NotFound => StatusCode::NOT_FOUND,
            RegistrarError::RegistrarClosed => StatusCode::SERVICE_UNAVAILABLE,
            RegistrarError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("storage fault: {}", self.0);
        }
        let body = ErrorBody {
            reason: self.0.reason(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn available(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(state.registrar.is_available(&name)?))
}

async fn owner(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Address>, ApiError> {
    Ok(Json(state.registrar.owner_of(&name)?))
}

async fn registration(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Moment>, ApiError> {
    Ok(Json(state.registrar.registration_date(&name)?))
}

async fn expiry(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Moment>, ApiError> {
    Ok(Json(state.registrar.expiry_of(&name)?))
}

async fn get_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RecordView>, ApiError> {
    let (label, record) = state.registrar.record(&name)?;
    Ok(Json(render(&state.registrar, label.qualified(), record)?))
}

async fn names(
    State(state): State<AppState>,
    Path(address): Path<Address>,
) -> Result<Json<Vec<RecordView>>, ApiError> {
    let registrar = &state.registrar;
    let grace = registrar.grace_period()?;
    let now = registrar.now();
    let views = registrar
        .names_by_owner(address)?
        .into_iter()
        .map(|(name, record)| RecordView::new(name, record, now, grace))
        .collect();
    Ok(Json(views))
}

async fn fee(
    State(state): State<AppState>,
    Path(years): Path<u32>,
) -> Result<Json<FeeView>, ApiError> {
    let amount = state.registrar.register_price(years)?;
    Ok(Json(FeeView {
        years,
        amount,
        formatted: format_native(amount),
    }))
}

async fn all(State(state): State<AppState>) -> Result<Json<Vec<RecordView>>, ApiError> {
    let registrar = &state.registrar;
    let grace = registrar.grace_period()?;
    let now = registrar.now();
    let views = registrar
        .all()?
        .into_iter()
        .map(|(name, record)| RecordView::new(name, record, now, grace))
        .collect();
    Ok(Json(views))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RecordView>, ApiError> {
    let (label, record) = state
        .registrar
        .register(req.from, &req.name, req.years, req.value)?;
    Ok(Json(render(&state.registrar, label.qualified(), record)?))
}

async fn renew(
    State(state): State<AppState>,
    Json(req): Json<RenewRequest>,
) -> Result<Json<RecordView>, ApiError> {
    let (label, record) = state
        .registrar
        .renew(req.from, &req.name, req.years, req.value)?;
    Ok(Json(render(&state.registrar, label.qualified(), record)?))
}

async fn transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<RecordView>, ApiError> {
    let (label, record) = state.registrar.transfer(req.from, &req.name, req.to)?;
    Ok(Json(render(&state.registrar, label.qualified(), record)?))
}

async fn set_reserved(
    State(state): State<AppState>,
    Json(req): Json<ReservedRequest>,
) -> Result<Json<bool>, ApiError> {
    if req.reserved {
        state.registrar.add_reserved(req.from, &req.name)?;
    } else {
        state.registrar.remove_reserved(req.from, &req.name)?;
    }
    Ok(Json(true))
}

async fn set_open(
    State(state): State<AppState>,
    Json(req): Json<OpenRequest>,
) -> Result<Json<bool>, ApiError> {
    state.registrar.set_registrar_open(req.from, req.open)?;
    Ok(Json(true))
}

async fn set_manager(
    State(state): State<AppState>,
    Json(req): Json<ManagerRequest>,
) -> Result<Json<bool>, ApiError> {
    state.registrar.set_manager(req.from, req.account, req.approved)?;
    Ok(Json(true))
}

fn render(
    registrar: &Registrar,
    name: String,
    record: NameRecord,
) -> Result<RecordView, RegistrarError> {
    let grace = registrar.grace_period()?;
    Ok(RecordView::new(name, record, registrar.now(), grace))
}

fn rfc3339(ts: Moment) -> String {
    chrono::DateTime::from_timestamp(ts as i64, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
