//! # HTTP Gateway
//!
//! Builds the axum router that exposes the hub's actors over HTTP. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                                   | Description                      |
//! |--------|----------------------------------------|----------------------------------|
//! | GET    | `/health`                              | Liveness probe                   |
//! | GET    | `/status`                              | Registry and ledger summary      |
//! | POST   | `/registry`                            | Submit an enveloped registry msg |
//! | POST   | `/ledger`                              | Submit an enveloped ledger msg   |
//! | GET    | `/vaults`                              | Connected vault count            |
//! | GET    | `/vaults/:vault`                       | Vault record and derived state   |
//! | GET    | `/holders/:holder`                     | Shares and balance of a holder   |
//! | GET    | `/holders/:owner/allowances/:spender`  | Remaining allowance              |
//! | GET    | `/conversions/shares?value=N`          | Shares worth `N`                 |
//! | GET    | `/conversions/value?shares=N`          | Value of `N` shares              |
//!
//! A rejected message answers with its error class mapped to a status code
//! and a `{code, class, message}` body. Envelopes sent as the registry or the
//! ledger are refused with 403 before reaching either actor.

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vaulthub_contracts::share_ledger::ShareLedger;
use vaulthub_contracts::vault_registry::{VaultRecord, VaultRegistry};
use vaulthub_protocol::error::{Classify, ErrorClass, Rejection};
use vaulthub_protocol::message::{LedgerMessage, RegistryMessage};
use vaulthub_protocol::runtime::{ActorHandle, RuntimeError};
use vaulthub_protocol::types::{Address, Envelope, MessageId};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: actor handles are channel senders.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Registry actor.
    pub registry: ActorHandle<VaultRegistry>,
    /// Ledger actor.
    pub ledger: ActorHandle<ShareLedger>,
    /// Registry and ledger addresses. Only the hub's router sends as these.
    pub internal: Vec<Address>,
    /// Reference to Prometheus metrics.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/registry", post(submit_registry_handler))
        .route("/ledger", post(submit_ledger_handler))
        .route("/vaults", get(vault_count_handler))
        .route("/vaults/:vault", get(vault_handler))
        .route("/holders/:holder", get(holder_handler))
        .route(
            "/holders/:owner/allowances/:spender",
            get(allowance_handler),
        )
        .route("/conversions/shares", get(shares_by_value_handler))
        .route("/conversions/value", get(value_by_shares_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<ErrorClass>,
    pub message: String,
}

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// The actor rejected the message.
    Rejected(Rejection),
    /// The envelope claims an internal actor's identity.
    ReservedSender(Address),
    /// The actor is not running.
    Unavailable(RuntimeError),
    /// The requested record does not exist.
    NotFound(String),
    /// A conversion does not fit in `u64`.
    Overflow,
}

impl ApiError {
    fn rejected<E: Classify + std::fmt::Display>(err: &E) -> Self {
        ApiError::Rejected(Rejection::from_error(err))
    }
}

impl From<RuntimeError> for ApiError {
    fn from(err: RuntimeError) -> Self {
        ApiError::Unavailable(err)
    }
}

/// HTTP status for an error class.
pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Authorization => StatusCode::FORBIDDEN,
        ErrorClass::StateValidation | ErrorClass::Replay => StatusCode::CONFLICT,
        ErrorClass::Economic => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorClass::Operational => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Rejected(rejection) => (
                status_for(rejection.class),
                ErrorBody {
                    code: rejection.code,
                    class: Some(rejection.class),
                    message: rejection.message,
                },
            ),
            ApiError::ReservedSender(sender) => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "unauthorized".into(),
                    class: Some(ErrorClass::Authorization),
                    message: format!("{sender} is reserved for internal routing"),
                },
            ),
            ApiError::Unavailable(err) => {
                tracing::error!(error = %err, "actor unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody {
                        code: "unavailable".into(),
                        class: Some(ErrorClass::Operational),
                        message: err.to_string(),
                    },
                )
            }
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "not_found".into(),
                    class: None,
                    message: format!("{what} not found"),
                },
            ),
            ApiError::Overflow => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    code: "overflow".into(),
                    class: Some(ErrorClass::Economic),
                    message: "result does not fit in 64 bits".into(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Returned when a submitted message was applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedResponse {
    pub id: MessageId,
    pub kind: String,
    pub status: String,
}

/// Response for `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub admin: Address,
    pub oracle: Address,
    pub paused: bool,
    pub vault_count: usize,
    pub total_shares_minted: u64,
    pub in_flight: usize,
    pub total_shares: u64,
    pub total_pooled_value: u64,
}

/// Response for `GET /vaults/:vault`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultResponse {
    pub vault: Address,
    pub connected: bool,
    pub accumulated_fee: u64,
    pub has_bad_debt: bool,
    pub mintable_shares: Option<u64>,
    pub record: VaultRecord,
}

/// Response for `GET /holders/:holder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderResponse {
    pub holder: Address,
    pub shares: u64,
    pub balance: u64,
}

/// Response for `GET /holders/:owner/allowances/:spender`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowanceResponse {
    pub owner: Address,
    pub spender: Address,
    pub shares: u64,
}

/// Query and response for the conversion endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversion {
    pub value: u64,
    pub shares: u64,
}

#[derive(Debug, Deserialize)]
struct ValueQuery {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct SharesQuery {
    shares: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Refuses envelopes that speak for the registry or the ledger. Those
/// identities carry supply changes and receipts and only travel in-process.
fn reject_internal_sender(state: &AppState, sender: &Address) -> Result<(), ApiError> {
    if state.internal.contains(sender) {
        tracing::warn!(sender = %sender, "refused envelope from internal identity");
        return Err(ApiError::ReservedSender(sender.clone()));
    }
    Ok(())
}

/// `GET /health` — returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — one consistent read from each actor.
async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let (admin, oracle, paused, vault_count, total_shares_minted, in_flight) = state
        .registry
        .query(|r| {
            (
                r.admin().clone(),
                r.oracle().clone(),
                r.is_paused(),
                r.vault_count(),
                r.total_shares_minted(),
                r.in_flight().len(),
            )
        })
        .await?;
    let (total_shares, total_pooled_value) = state
        .ledger
        .query(|l| (l.total_shares(), l.total_pooled_value()))
        .await?;

    Ok(Json(StatusResponse {
        version: state.version.clone(),
        admin,
        oracle,
        paused,
        vault_count,
        total_shares_minted,
        in_flight,
        total_shares,
        total_pooled_value,
    }))
}

/// `POST /registry` — submits an enveloped registry message and waits for
/// the verdict.
async fn submit_registry_handler(
    State(state): State<AppState>,
    Json(envelope): Json<Envelope<RegistryMessage>>,
) -> Result<Json<AppliedResponse>, ApiError> {
    reject_internal_sender(&state, &envelope.sender)?;
    let id = envelope.id;
    let kind = envelope.body.kind();
    state
        .registry
        .submit(envelope)
        .await?
        .map_err(|e| ApiError::rejected(&e))?;
    Ok(Json(AppliedResponse {
        id,
        kind: kind.into(),
        status: "applied".into(),
    }))
}

/// `POST /ledger` — submits an enveloped ledger message and waits for the
/// verdict.
async fn submit_ledger_handler(
    State(state): State<AppState>,
    Json(envelope): Json<Envelope<LedgerMessage>>,
) -> Result<Json<AppliedResponse>, ApiError> {
    reject_internal_sender(&state, &envelope.sender)?;
    let id = envelope.id;
    let kind = envelope.body.kind();
    state
        .ledger
        .submit(envelope)
        .await?
        .map_err(|e| ApiError::rejected(&e))?;
    Ok(Json(AppliedResponse {
        id,
        kind: kind.into(),
        status: "applied".into(),
    }))
}

/// `GET /vaults` — number of connected vaults.
async fn vault_count_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let count = state.registry.query(|r| r.vault_count()).await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

/// `GET /vaults/:vault` — the vault's record plus derived predicates.
/// Disconnected vaults are still returned, with `connected: false`.
async fn vault_handler(
    State(state): State<AppState>,
    Path(vault): Path<String>,
) -> Result<Json<VaultResponse>, ApiError> {
    let vault = Address::new(vault);
    let key = vault.clone();
    let found = state
        .registry
        .query(move |r| {
            r.vault(&key).cloned().map(|record| {
                (
                    record,
                    r.accumulated_fees(&key),
                    r.has_bad_debt(&key),
                    r.mintable_shares(&key),
                )
            })
        })
        .await?;

    let (record, accumulated_fee, has_bad_debt, mintable_shares) =
        found.ok_or_else(|| ApiError::NotFound(format!("vault {vault}")))?;
    Ok(Json(VaultResponse {
        connected: record.connected,
        vault,
        accumulated_fee,
        has_bad_debt,
        mintable_shares,
        record,
    }))
}

/// `GET /holders/:holder` — unknown holders report zero.
async fn holder_handler(
    State(state): State<AppState>,
    Path(holder): Path<String>,
) -> Result<Json<HolderResponse>, ApiError> {
    let holder = Address::new(holder);
    let key = holder.clone();
    let (shares, balance) = state
        .ledger
        .query(move |l| (l.shares_of(&key), l.balance_of(&key)))
        .await?;
    Ok(Json(HolderResponse {
        holder,
        shares,
        balance,
    }))
}

/// `GET /holders/:owner/allowances/:spender`.
async fn allowance_handler(
    State(state): State<AppState>,
    Path((owner, spender)): Path<(String, String)>,
) -> Result<Json<AllowanceResponse>, ApiError> {
    let owner = Address::new(owner);
    let spender = Address::new(spender);
    let (o, s) = (owner.clone(), spender.clone());
    let shares = state.ledger.query(move |l| l.allowance(&o, &s)).await?;
    Ok(Json(AllowanceResponse {
        owner,
        spender,
        shares,
    }))
}

/// `GET /conversions/shares?value=N`.
async fn shares_by_value_handler(
    State(state): State<AppState>,
    Query(query): Query<ValueQuery>,
) -> Result<Json<Conversion>, ApiError> {
    let value = query.value;
    let shares = state
        .ledger
        .query(move |l| l.shares_by_pooled_value(value))
        .await?
        .ok_or(ApiError::Overflow)?;
    Ok(Json(Conversion { value, shares }))
}

/// `GET /conversions/value?shares=N`.
async fn value_by_shares_handler(
    State(state): State<AppState>,
    Query(query): Query<SharesQuery>,
) -> Result<Json<Conversion>, ApiError> {
    let shares = query.shares;
    let value = state
        .ledger
        .query(move |l| l.pooled_value_by_shares(shares))
        .await?
        .ok_or(ApiError::Overflow)?;
    Ok(Json(Conversion { value, shares }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    use vaulthub_contracts::system::{Hub, HubConfig};
    use vaulthub_protocol::clock::ManualClock;

    use crate::metrics::HubMetrics;

    /// Starts a hub on a manual clock and builds a router over it. The hub
    /// must outlive the router, so both are returned.
    fn test_app() -> (Router, Hub) {
        let metrics = Arc::new(HubMetrics::new().expect("metrics"));
        let hub = Hub::start(
            HubConfig::default(),
            Arc::new(ManualClock::new(1_700_000_000)),
            metrics.clone(),
        );
        let state = AppState {
            version: "0.1.0-test".into(),
            registry: hub.registry().clone(),
            ledger: hub.ledger().clone(),
            internal: vec![
                hub.config().registry_address.clone(),
                hub.config().ledger_address.clone(),
            ],
            metrics,
        };
        (create_router(state), hub)
    }

    /// Sends a GET request and returns the (status, body as JSON).
    async fn get(router: &Router, path: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    /// Sends a POST request with JSON body and returns (status, body as JSON).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    fn connect(id: u64, vault: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "sender": "admin",
            "body": {
                "type": "connect_vault",
                "vault": vault,
                "share_limit": 1_000,
                "reserve_ratio_bp": 5_000,
                "infra_fee_bp": 100,
                "liquidity_fee_bp": 0
            }
        })
    }

    fn report(id: u64, vault: &str, total_value: i64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "sender": "oracle",
            "body": {
                "type": "apply_vault_report",
                "vault": vault,
                "total_value": total_value,
                "in_out_delta": total_value
            }
        })
    }

    fn mint(id: u64, vault: &str, amount: u64, recipient: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "sender": "admin",
            "body": {
                "type": "mint_shares",
                "vault": vault,
                "amount": amount,
                "recipient": recipient
            }
        })
    }

    // -- Liveness ------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (router, _hub) = test_app();
        let (status, json) = get(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    // -- Submissions ---------------------------------------------------------

    #[tokio::test]
    async fn connect_then_read_vault() {
        let (router, _hub) = test_app();
        let (status, json) = post_json(&router, "/registry", connect(1, "v1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["kind"], "connect_vault");

        let (status, json) = get(&router, "/vaults/v1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["connected"], true);
        assert_eq!(json["has_bad_debt"], false);
        assert_eq!(json["record"]["share_limit"], 1_000);

        let (_, json) = get(&router, "/vaults").await;
        assert_eq!(json["count"], 1);
    }

    #[tokio::test]
    async fn wrong_sender_maps_to_forbidden() {
        let (router, _hub) = test_app();
        let mut msg = connect(1, "v1");
        msg["sender"] = "mallory".into();
        let (status, json) = post_json(&router, "/registry", msg).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["code"], "unauthorized");
        assert_eq!(json["class"], "authorization");
    }

    #[tokio::test]
    async fn ledger_refuses_mint_sent_as_registry() {
        let (router, hub) = test_app();
        let forged = serde_json::json!({
            "id": 1_000,
            "sender": "registry",
            "body": { "type": "mint", "recipient": "mallory", "shares": 1_000_000 }
        });
        let (status, json) = post_json(&router, "/ledger", forged).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["class"], "authorization");

        let (_, json) = get(&router, "/holders/mallory").await;
        assert_eq!(json["shares"], 0);
        let (_, json) = get(&router, "/status").await;
        assert_eq!(json["total_shares"], 0);
        assert!(!hub
            .ledger()
            .query(|l| l.is_processed(&Address::new("registry"), 1_000))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn registry_refuses_receipt_sent_as_ledger() {
        let (router, hub) = test_app();
        post_json(&router, "/registry", connect(1, "v1")).await;
        post_json(&router, "/registry", report(1, "v1", 500)).await;
        post_json(&router, "/registry", mint(2, "v1", 250, "alice")).await;
        hub.settle(Duration::from_secs(2)).await.unwrap();

        let forged = serde_json::json!({
            "id": 3,
            "sender": "ledger",
            "body": {
                "type": "receipt",
                "original": 2,
                "outcome": {
                    "status": "rejected",
                    "code": "insufficient_balance",
                    "class": "economic",
                    "message": "forged"
                }
            }
        });
        let (status, json) = post_json(&router, "/registry", forged).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["code"], "unauthorized");

        let (_, json) = get(&router, "/vaults/v1").await;
        assert_eq!(json["record"]["liability_shares"], 250);
        let (_, json) = get(&router, "/status").await;
        assert_eq!(json["total_shares_minted"], 250);
        assert_eq!(json["total_shares"], 250);
    }

    #[tokio::test]
    async fn duplicate_id_maps_to_conflict() {
        let (router, _hub) = test_app();
        post_json(&router, "/registry", connect(1, "v1")).await;
        let (status, json) = post_json(&router, "/registry", connect(1, "v2")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["class"], "replay");
    }

    #[tokio::test]
    async fn stale_oracle_maps_to_unprocessable() {
        let (router, _hub) = test_app();
        post_json(&router, "/registry", connect(1, "v1")).await;
        let (status, json) = post_json(&router, "/registry", mint(2, "v1", 10, "alice")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["code"], "oracle_stale");
    }

    #[tokio::test]
    async fn paused_maps_to_service_unavailable() {
        let (router, _hub) = test_app();
        let pause = serde_json::json!({
            "id": 1, "sender": "admin", "body": { "type": "pause" }
        });
        assert_eq!(post_json(&router, "/registry", pause).await.0, StatusCode::OK);
        let (status, json) = post_json(&router, "/registry", connect(2, "v1")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["code"], "paused");
    }

    #[tokio::test]
    async fn unknown_vault_is_not_found() {
        let (router, _hub) = test_app();
        let (status, json) = get(&router, "/vaults/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "not_found");
    }

    // -- End to end ----------------------------------------------------------

    #[tokio::test]
    async fn minted_shares_show_up_on_the_ledger() {
        let (router, hub) = test_app();
        post_json(&router, "/registry", connect(1, "v1")).await;
        post_json(&router, "/registry", report(1, "v1", 500)).await;
        let (status, _) = post_json(&router, "/registry", mint(2, "v1", 250, "alice")).await;
        assert_eq!(status, StatusCode::OK);
        hub.settle(Duration::from_secs(2)).await.unwrap();

        let (_, json) = get(&router, "/holders/alice").await;
        assert_eq!(json["shares"], 250);
        assert_eq!(json["balance"], 500);

        let (_, json) = get(&router, "/conversions/shares?value=100").await;
        assert_eq!(json["shares"], 50);
        let (_, json) = get(&router, "/conversions/value?shares=50").await;
        assert_eq!(json["value"], 100);

        let approve = serde_json::json!({
            "id": 1,
            "sender": "alice",
            "body": { "type": "approve", "spender": "bob", "shares": 40 }
        });
        assert_eq!(post_json(&router, "/ledger", approve).await.0, StatusCode::OK);
        let (_, json) = get(&router, "/holders/alice/allowances/bob").await;
        assert_eq!(json["shares"], 40);

        let (_, json) = get(&router, "/status").await;
        assert_eq!(json["total_shares_minted"], 250);
        assert_eq!(json["total_shares"], 250);
        assert_eq!(json["total_pooled_value"], 500);
        assert_eq!(json["in_flight"], 0);
    }

    #[tokio::test]
    async fn overdrawn_transfer_maps_to_unprocessable() {
        let (router, _hub) = test_app();
        let transfer = serde_json::json!({
            "id": 1,
            "sender": "alice",
            "body": { "type": "transfer_shares", "to": "bob", "shares": 1 }
        });
        let (status, json) = post_json(&router, "/ledger", transfer).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["code"], "insufficient_balance");
    }

    #[test]
    fn every_class_has_a_status() {
        assert_eq!(status_for(ErrorClass::Authorization), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorClass::StateValidation), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorClass::Economic), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorClass::Operational), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorClass::Replay), StatusCode::CONFLICT);
    }
}
