//! # REST API
//!
//! Builds the axum router that exposes the envelope engine over HTTP.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                      |
//! |--------|-------------------------------|----------------------------------|
//! | GET    | `/health`                     | Liveness probe                   |
//! | GET    | `/status`                     | Node status summary              |
//! | POST   | `/envelopes`                  | Mint a new envelope              |
//! | GET    | `/envelopes/:id`              | Envelope details                 |
//! | GET    | `/envelopes/:id/value`        | Live redeemable value            |
//! | POST   | `/envelopes/:id/transfer`     | Reassign ownership               |
//! | POST   | `/envelopes/:id/burn`         | Redeem and destroy               |
//! | GET    | `/accounts/:owner/envelopes`  | Ids owned by an account          |

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use hongbao_engine::{
    Clock, EnvelopeEngine, EnvelopeError, EnvelopeId, FixedRateVault, SystemClock, VaultGateway,
};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// The engine configuration the binary serves: a fixed-rate devnet vault
/// over the system clock.
pub type Engine = EnvelopeEngine<FixedRateVault<SystemClock>, SystemClock>;

/// Shared application state available to all request handlers.
///
/// Generic over the vault and clock so tests can stand the router up over
/// failure-injecting doubles and a manual clock; the binary uses
/// [`Engine`]. Cheap to clone, everything behind `Arc`.
pub struct AppState<V: VaultGateway, C: Clock> {
    /// The node's reported version string.
    pub version: String,
    /// Network identifier (e.g., "devnet").
    pub network: String,
    /// Yield rate of the backing vault, in basis points. Reported in
    /// `/status` so clients can price envelopes without a round trip.
    pub apy_bps: u32,
    /// The envelope engine. Writer lock for mutations, reader lock for
    /// queries.
    pub engine: Arc<RwLock<EnvelopeEngine<V, C>>>,
}

impl<V: VaultGateway, C: Clock> Clone for AppState<V, C> {
    fn clone(&self) -> Self {
        Self {
            version: self.version.clone(),
            network: self.network.clone(),
            apy_bps: self.apy_bps,
            engine: Arc::clone(&self.engine),
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured RPC port.
pub fn create_router<V, C>(state: AppState<V, C>) -> Router
where
    V: VaultGateway + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler::<V, C>))
        .route("/envelopes", post(mint_handler::<V, C>))
        .route("/envelopes/:id", get(envelope_handler::<V, C>))
        .route("/envelopes/:id/value", get(value_handler::<V, C>))
        .route("/envelopes/:id/transfer", post(transfer_handler::<V, C>))
        .route("/envelopes/:id/burn", post(burn_handler::<V, C>))
        .route("/accounts/:owner/envelopes", get(holdings_handler::<V, C>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Network identifier.
    pub network: String,
    /// Vault yield rate in basis points.
    pub apy_bps: u32,
    /// Number of active envelopes.
    pub active_envelopes: usize,
    /// Total envelopes ever minted, burned ones included.
    pub total_minted: u64,
    /// Total base-asset value currently held by the vault.
    pub vault_underlying: u64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Request payload for `POST /envelopes`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MintRequest {
    /// Account that funds and initially owns the envelope.
    pub depositor: String,
    /// Principal to lock, in smallest units.
    pub amount: u64,
    /// When the envelope becomes redeemable. Must be in the future.
    pub unlock_at: DateTime<Utc>,
}

/// Response payload for `POST /envelopes`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MintResponse {
    /// Id of the freshly minted envelope.
    pub id: EnvelopeId,
}

/// Response payload for `GET /envelopes/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EnvelopeResponse {
    /// Envelope id.
    pub id: EnvelopeId,
    /// Current owner.
    pub owner: String,
    /// Principal originally deposited.
    pub original_amount: u64,
    /// Current redeemable value at the live vault rate.
    pub current_value: u64,
    /// When the envelope becomes redeemable.
    pub unlock_at: DateTime<Utc>,
}

/// Response payload for `GET /envelopes/:id/value`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValueResponse {
    /// Envelope id.
    pub id: EnvelopeId,
    /// Current redeemable value at the live vault rate.
    pub current_value: u64,
}

/// Request payload for `POST /envelopes/:id/transfer`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    /// The current owner authorizing the transfer.
    pub from: String,
    /// The new owner.
    pub to: String,
}

/// Request payload for `POST /envelopes/:id/burn`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BurnRequest {
    /// The owner opening the envelope.
    pub caller: String,
}

/// Response payload for `POST /envelopes/:id/burn`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BurnResponse {
    /// Envelope id, now destroyed.
    pub id: EnvelopeId,
    /// Base-asset amount disbursed to the caller.
    pub disbursed: u64,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Set when the failure stranded funds and needs operator attention,
    /// as opposed to a caller mistake worth retrying.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fatal: bool,
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// Maps an engine error to an HTTP response.
///
/// Caller mistakes get 4xx, an unreachable vault gets 502, and the fatal
/// stranded-funds condition gets 500 with the `fatal` marker set.
fn error_response(err: EnvelopeError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        EnvelopeError::PositionNotFound(_) => StatusCode::NOT_FOUND,
        EnvelopeError::NotOwner { .. } => StatusCode::FORBIDDEN,
        EnvelopeError::InvalidAmount | EnvelopeError::InvalidUnlockTime { .. } => {
            StatusCode::BAD_REQUEST
        }
        EnvelopeError::StillLocked { .. }
        | EnvelopeError::AlreadyBurned(_)
        | EnvelopeError::AlreadyAssigned(_) => StatusCode::CONFLICT,
        EnvelopeError::DepositFailed { .. } | EnvelopeError::ValueQueryFailed { .. } => {
            StatusCode::BAD_GATEWAY
        }
        EnvelopeError::WithdrawalFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let fatal = err.is_fatal();
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            fatal,
        }),
    )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.).
/// It intentionally does not inspect engine state; that belongs in
/// `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns node status summary.
///
/// A vault that cannot price shares degrades the `vault_underlying` field
/// to zero rather than failing the whole summary.
async fn status_handler<V, C>(State(state): State<AppState<V, C>>) -> impl IntoResponse
where
    V: VaultGateway + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let engine = state.engine.read().await;
    let vault_underlying = match engine.total_locked_value() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(%e, "vault value query failed while building status");
            0
        }
    };
    let resp = StatusResponse {
        version: state.version.clone(),
        network: state.network.clone(),
        apy_bps: state.apy_bps,
        active_envelopes: engine.active_count(),
        total_minted: engine.total_minted(),
        vault_underlying,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `POST /envelopes` — mints a new envelope.
async fn mint_handler<V, C>(
    State(state): State<AppState<V, C>>,
    Json(req): Json<MintRequest>,
) -> impl IntoResponse
where
    V: VaultGateway + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let mut engine = state.engine.write().await;
    match engine.mint(&req.depositor, req.amount, req.unlock_at) {
        Ok(id) => (StatusCode::CREATED, Json(MintResponse { id })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// `GET /envelopes/:id` — returns the full envelope view.
async fn envelope_handler<V, C>(
    Path(id): Path<EnvelopeId>,
    State(state): State<AppState<V, C>>,
) -> impl IntoResponse
where
    V: VaultGateway + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let engine = state.engine.read().await;

    let details = (|| {
        Ok::<_, EnvelopeError>(EnvelopeResponse {
            id,
            owner: engine.owner_of(id)?,
            original_amount: engine.original_amount(id)?,
            current_value: engine.current_value(id)?,
            unlock_at: engine.unlock_timestamp(id)?,
        })
    })();

    match details {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// `GET /envelopes/:id/value` — returns just the live value.
async fn value_handler<V, C>(
    Path(id): Path<EnvelopeId>,
    State(state): State<AppState<V, C>>,
) -> impl IntoResponse
where
    V: VaultGateway + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let engine = state.engine.read().await;
    match engine.current_value(id) {
        Ok(current_value) => {
            (StatusCode::OK, Json(ValueResponse { id, current_value })).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

/// `POST /envelopes/:id/transfer` — reassigns ownership.
async fn transfer_handler<V, C>(
    Path(id): Path<EnvelopeId>,
    State(state): State<AppState<V, C>>,
    Json(req): Json<TransferRequest>,
) -> impl IntoResponse
where
    V: VaultGateway + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let mut engine = state.engine.write().await;
    match engine.transfer(id, &req.from, &req.to) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// `POST /envelopes/:id/burn` — redeems and destroys the envelope.
async fn burn_handler<V, C>(
    Path(id): Path<EnvelopeId>,
    State(state): State<AppState<V, C>>,
    Json(req): Json<BurnRequest>,
) -> impl IntoResponse
where
    V: VaultGateway + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let mut engine = state.engine.write().await;
    match engine.burn(id, &req.caller) {
        Ok(disbursed) => (StatusCode::OK, Json(BurnResponse { id, disbursed })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// `GET /accounts/:owner/envelopes` — returns the ids owned by an account.
///
/// Unknown accounts get an empty list, not a 404; owning nothing is a
/// perfectly normal state of affairs.
async fn holdings_handler<V, C>(
    Path(owner): Path<String>,
    State(state): State<AppState<V, C>>,
) -> impl IntoResponse
where
    V: VaultGateway + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let engine = state.engine.read().await;
    Json(engine.envelopes_of(&owner))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
