//! # REST API
//!
//! Builds the axum router that exposes the VaultLink HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                          |
//! |--------|-------------------------------|--------------------------------------|
//! | GET    | `/health`                     | Liveness probe                       |
//! | POST   | `/wallet/initiate`            | Create a wallet-link request         |
//! | GET    | `/wallet/status/:request_id`  | Poll a link request / claim the key  |
//! | POST   | `/vaults`                     | Provision a vault contract           |
//! | POST   | `/dev/deposits/:request_id`   | (dev mode) mark a deposit observed   |
//!
//! ## Authentication
//!
//! Upstream auth terminates before this service and forwards the resolved
//! account in the `x-account-id` header. Requests without it get `401`.
//!
//! ## Status codes
//!
//! The status endpoint leans on HTTP semantics: `202` while the outcome is
//! still open (`PENDING`) or closed without a credential (`EXPIRED`),
//! `200` for the single response that carries the API key, and `410` for
//! every read after the reveal.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vaultlink_core::chains::dev::DevLedgerService;
use vaultlink_core::error::CoreError;
use vaultlink_core::link::{LinkClaimResolver, LinkRequestInitiator, LinkStatus};
use vaultlink_core::vault::VaultProvisioner;

use crate::metrics::SharedMetrics;

/// Header carrying the upstream-resolved account id.
pub const ACCOUNT_HEADER: &str = "x-account-id";

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — every component is either `Clone` over sled handles or
/// behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Creates link requests.
    pub initiator: LinkRequestInitiator,
    /// Resolves link status and performs the one-time claim.
    pub resolver: LinkClaimResolver,
    /// Drives vault provisioning.
    pub provisioner: VaultProvisioner,
    /// Prometheus metric handles.
    pub metrics: SharedMetrics,
    /// Present only in dev mode; backs the deposit-marking endpoint.
    pub dev_ledger: Option<Arc<DevLedgerService>>,
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /wallet/initiate`. All fields optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateBody {
    /// Token the deposit will be made in; defaults to the native asset.
    pub token_address: Option<String>,
    /// Requested TTL; defaulted and capped server-side.
    pub expires_in_seconds: Option<u64>,
    /// Chain to watch; defaults to the registry's default chain.
    pub chain_id: Option<String>,
}

/// Response of `POST /wallet/initiate`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResponse {
    /// Handle for polling `GET /wallet/status/:request_id`.
    pub request_id: String,
    /// Exact amount the user must deposit.
    pub magic_amount: u64,
    /// Token the deposit must be made in.
    pub token_address: String,
    /// RFC 3339 deadline after which the request expires.
    pub expires_at: String,
    /// Where the deposit must be sent.
    pub deposit_to_address: String,
    /// Chain the deposit is watched on.
    pub chain_id: String,
}

/// Response of `GET /wallet/status/:request_id`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Wire-format status name.
    pub status: String,
    /// The one-time API key. Present in exactly one response per request,
    /// ever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Body of `POST /vaults`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultBody {
    /// Requested globally unique vault name.
    pub vault_name: Option<String>,
    /// Chain to deploy on; defaults to the registry's default chain.
    pub chain_id: Option<String>,
}

/// Response of `POST /vaults`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultResponse {
    /// The now-owned vault name.
    pub vault_name: String,
    /// Where the contract was deployed (verified against the prediction).
    pub predicted_address: String,
    /// Chain the vault lives on.
    pub chain_id: String,
    /// Wallet address owning the contract.
    pub owner_address: String,
    /// The mined salt, for independent re-derivation.
    pub salt: u64,
}

/// Error body returned by all endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable code (see `CoreError::code`).
    pub code: String,
    /// Human-readable description. Not for branching.
    pub message: String,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The dev deposit route is mounted only when the state carries a dev
/// ledger handle.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/wallet/initiate", post(initiate_handler))
        .route("/wallet/status", get(missing_request_id_handler))
        .route("/wallet/status/:request_id", get(status_handler))
        .route("/vaults", post(vaults_handler));

    if state.dev_ledger.is_some() {
        router = router.route("/dev/deposits/:request_id", post(dev_deposit_handler));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// Maps a [`CoreError`] to its HTTP response.
///
/// Server-side failures are logged here, once, so handlers don't have to;
/// client errors (4xx) are the caller's problem and stay at debug level.
fn error_response(err: &CoreError) -> Response {
    let status = match err {
        CoreError::Unauthorized => StatusCode::UNAUTHORIZED,
        CoreError::InvalidInput(_) | CoreError::UnknownChain(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFound(_) | CoreError::WalletNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::NameTaken(_) => StatusCode::CONFLICT,
        CoreError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::SaltMiningTimeout | CoreError::AddressMismatch { .. } | CoreError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        tracing::error!(code = err.code(), error = %err, "request failed");
    } else {
        tracing::debug!(code = err.code(), error = %err, "request rejected");
    }

    let body = ErrorBody {
        code: err.code().to_string(),
        message: err.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Extracts the upstream-resolved account id or fails with 401.
fn account_id(headers: &HeaderMap) -> Result<String, CoreError> {
    headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(CoreError::Unauthorized)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the service is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `POST /wallet/initiate` — creates a new link request.
async fn initiate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<InitiateBody>>,
) -> Response {
    let account = match account_id(&headers) {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();

    match state.initiator.initiate(
        &account,
        body.token_address.as_deref(),
        body.expires_in_seconds,
        body.chain_id.as_deref(),
    ) {
        Ok(request) => {
            state.metrics.link_requests_initiated_total.inc();
            let resp = InitiateResponse {
                request_id: request.request_id,
                magic_amount: request.expected_amount,
                token_address: request.token_address,
                expires_at: request.expires_at.to_rfc3339(),
                deposit_to_address: request.deposit_to_address,
                chain_id: request.chain_id,
            };
            (StatusCode::OK, Json(resp)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// `GET /wallet/status` — the path parameter is required.
async fn missing_request_id_handler() -> Response {
    error_response(&CoreError::InvalidInput("requestId is required".into()))
}

/// `GET /wallet/status/:request_id` — polls a link request.
///
/// This is the claim path: the first poll to observe the satisfied
/// deposit receives the API key, everyone else gets a status. Safe to
/// call arbitrarily many times.
async fn status_handler(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Response {
    let request_id = request_id.trim();
    if request_id.is_empty() {
        return error_response(&CoreError::InvalidInput("requestId is required".into()));
    }

    match state.resolver.resolve_and_claim(request_id).await {
        Ok(outcome) => {
            let http_status = match outcome.status {
                LinkStatus::Pending | LinkStatus::Expired => StatusCode::ACCEPTED,
                LinkStatus::Completed => StatusCode::OK,
                LinkStatus::AlreadyClaimed => StatusCode::GONE,
            };
            match outcome.status {
                LinkStatus::Completed => state.metrics.credentials_claimed_total.inc(),
                LinkStatus::AlreadyClaimed => state.metrics.claims_already_claimed_total.inc(),
                LinkStatus::Expired => state.metrics.link_requests_expired_total.inc(),
                LinkStatus::Pending => {}
            }
            let resp = StatusResponse {
                status: outcome.status.as_str().to_string(),
                api_key: outcome.api_key,
            };
            (http_status, Json(resp)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// `POST /vaults` — provisions a vault contract at a mined address.
async fn vaults_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<VaultBody>>,
) -> Response {
    let account = match account_id(&headers) {
        Ok(a) => a,
        Err(e) => return error_response(&e),
    };
    let Some(Json(body)) = body else {
        return error_response(&CoreError::InvalidInput("request body is required".into()));
    };
    let Some(vault_name) = body.vault_name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    else {
        return error_response(&CoreError::InvalidInput("vaultName is required".into()));
    };

    let timer = std::time::Instant::now();
    match state
        .provisioner
        .provision(&account, vault_name, body.chain_id.as_deref())
        .await
    {
        Ok(provisioned) => {
            state.metrics.vaults_provisioned_total.inc();
            state
                .metrics
                .provision_seconds
                .observe(timer.elapsed().as_secs_f64());
            let resp = VaultResponse {
                vault_name: provisioned.vault_name,
                predicted_address: provisioned.predicted_address,
                chain_id: provisioned.chain_id,
                owner_address: provisioned.owner_address,
                salt: provisioned.salt,
            };
            (StatusCode::CREATED, Json(resp)).into_response()
        }
        Err(e) => {
            // Name conflicts and bad input never got past reservation;
            // everything else is a failed attempt worth counting.
            if !matches!(
                e,
                CoreError::NameTaken(_) | CoreError::InvalidInput(_) | CoreError::UnknownChain(_)
            ) {
                state.metrics.provisioning_failures_total.inc();
            }
            error_response(&e)
        }
    }
}

/// `POST /dev/deposits/:request_id` — dev mode only. Marks the request's
/// deposit as observed so the claim flow can be exercised locally.
async fn dev_deposit_handler(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Response {
    let Some(ledger) = state.dev_ledger.as_ref() else {
        // Route only exists in dev mode; this is unreachable in practice.
        return error_response(&CoreError::NotFound("dev mode disabled".into()));
    };
    match ledger.mark_satisfied(&request_id) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "requestId": request_id, "satisfied": true })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    use vaultlink_core::chains::dev::{DevAccountDirectory, DevChainRpc};
    use vaultlink_core::chains::registry::ChainServiceRegistry;
    use vaultlink_core::chains::ChainServices;
    use vaultlink_core::link::request::LinkRequest;
    use vaultlink_core::storage::{LinkRequestStore, VaultLinkDb, VaultNameRegistry};
    use vaultlink_core::vault::mining::{derive_vault_address, AddressPolicy};

    use crate::metrics::ServiceMetrics;

    struct Fixture {
        router: Router,
        store: LinkRequestStore,
        metrics: SharedMetrics,
    }

    /// Builds a dev-backed AppState over a temporary database.
    ///
    /// `acct_1` has a registered wallet; any other account id exercises
    /// the no-wallet path.
    fn fixture() -> Fixture {
        let db = VaultLinkDb::open_temporary().expect("temp db");
        let store = LinkRequestStore::new(&db);
        let names = VaultNameRegistry::new(&db);
        let dev_ledger = Arc::new(DevLedgerService::new(&db));

        let accounts = Arc::new(DevAccountDirectory::new());
        accounts.register("acct_1", "0xowner");

        let mut chains = ChainServiceRegistry::new();
        chains.register(ChainServices {
            chain_id: "1".into(),
            deposit_address: "0xdeposit".into(),
            ledger: dev_ledger.clone(),
            rpc: Arc::new(DevChainRpc::faithful()),
        });
        let chains = Arc::new(chains);

        let policy = AddressPolicy::new("", 1_000, Duration::from_secs(5)).expect("policy");
        let metrics: SharedMetrics = Arc::new(ServiceMetrics::new());

        let state = AppState {
            initiator: LinkRequestInitiator::new(store.clone(), chains.clone()),
            resolver: LinkClaimResolver::new(store.clone(), chains.clone()),
            provisioner: VaultProvisioner::new(names, accounts, chains, policy),
            metrics: metrics.clone(),
            dev_ledger: Some(dev_ledger),
        };
        Fixture {
            router: create_router(state),
            store,
            metrics,
        }
    }

    /// Sends a GET request and returns (status, body_bytes).
    async fn get_req(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    /// Sends a POST with JSON body and optional account header.
    async fn post_json(
        router: &Router,
        path: &str,
        account: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(account) = account {
            builder = builder.header(ACCOUNT_HEADER, account);
        }
        let req = builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    async fn initiate(router: &Router, ttl: u64) -> InitiateResponse {
        let (status, body) = post_json(
            router,
            "/wallet/initiate",
            Some("acct_1"),
            serde_json::json!({ "expiresInSeconds": ttl }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    // -- 1. Health ------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let fx = fixture();
        let (status, body) = get_req(&fx.router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    // -- 2. Initiate requires authentication ----------------------------------

    #[tokio::test]
    async fn initiate_without_account_header_is_unauthorized() {
        let fx = fixture();
        let (status, body) =
            post_json(&fx.router, "/wallet/initiate", None, serde_json::json!({})).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "UNAUTHORIZED");
    }

    // -- 3. Initiate returns the deposit fingerprint ---------------------------

    #[tokio::test]
    async fn initiate_returns_request_fields() {
        let fx = fixture();
        let resp = initiate(&fx.router, 60).await;

        assert!(!resp.request_id.is_empty());
        assert_eq!(resp.deposit_to_address, "0xdeposit");
        assert_eq!(resp.chain_id, "1");
        assert!(resp.magic_amount >= 1_000_000);
        assert!(fx.metrics.link_requests_initiated_total.get() >= 1);
    }

    // -- 4. Fresh request polls as PENDING ------------------------------------

    #[tokio::test]
    async fn fresh_request_polls_pending() {
        let fx = fixture();
        let resp = initiate(&fx.router, 60).await;

        let (status, body) =
            get_req(&fx.router, &format!("/wallet/status/{}", resp.request_id)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let poll: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(poll.status, "PENDING");
        assert!(poll.api_key.is_none());
    }

    // -- 5. The full claim scenario -------------------------------------------

    #[tokio::test]
    async fn claim_scenario_pending_completed_then_gone() {
        let fx = fixture();
        let resp = initiate(&fx.router, 60).await;
        let path = format!("/wallet/status/{}", resp.request_id);

        // Immediately: 202 PENDING.
        let (status, _) = get_req(&fx.router, &path).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        // Simulate the deposit through the dev endpoint.
        let (status, _) = post_json(
            &fx.router,
            &format!("/dev/deposits/{}", resp.request_id),
            None,
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Next poll: 200 COMPLETED with the one-time key.
        let (status, body) = get_req(&fx.router, &path).await;
        assert_eq!(status, StatusCode::OK);
        let claimed: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(claimed.status, "COMPLETED");
        let key = claimed.api_key.expect("key revealed");
        assert!(key.starts_with("vlk_"));

        // Third poll: 410 ALREADY_CLAIMED, no key.
        let (status, body) = get_req(&fx.router, &path).await;
        assert_eq!(status, StatusCode::GONE);
        let gone: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(gone.status, "ALREADY_CLAIMED");
        assert!(gone.api_key.is_none());

        assert_eq!(fx.metrics.credentials_claimed_total.get(), 1);
    }

    // -- 6. Unknown request id is 404 ------------------------------------------

    #[tokio::test]
    async fn unknown_request_id_is_not_found() {
        let fx = fixture();
        let (status, body) = get_req(&fx.router, "/wallet/status/does-not-exist").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "NOT_FOUND");
    }

    // -- 7. Missing request id is 400 -------------------------------------------

    #[tokio::test]
    async fn missing_request_id_is_bad_request() {
        let fx = fixture();
        let (status, _) = get_req(&fx.router, "/wallet/status").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get_req(&fx.router, "/wallet/status/%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "INVALID_INPUT");
    }

    // -- 8. Expired requests resolve EXPIRED on first poll ----------------------

    #[tokio::test]
    async fn expired_request_polls_expired() {
        let fx = fixture();

        // Plant a request whose deadline has already passed — equivalent
        // to initiating with a tiny TTL and waiting it out.
        let mut req = LinkRequest::new("acct_1", "1", "0xtoken", "0xdeposit", 900);
        req.expires_at = chrono::Utc::now() - chrono::Duration::seconds(2);
        fx.store.insert_new(&req).expect("insert");

        let (status, body) =
            get_req(&fx.router, &format!("/wallet/status/{}", req.request_id)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let poll: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(poll.status, "EXPIRED");
        assert!(poll.api_key.is_none());
    }

    // -- 9. One-second TTLs really expire, end to end ----------------------------

    #[tokio::test]
    async fn one_second_ttl_expires_through_the_public_flow() {
        let fx = fixture();
        let resp = initiate(&fx.router, 1).await;

        tokio::time::sleep(Duration::from_secs(2)).await;

        let (status, body) =
            get_req(&fx.router, &format!("/wallet/status/{}", resp.request_id)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let poll: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(poll.status, "EXPIRED");
        assert!(poll.api_key.is_none());
    }

    // -- 10. Vaults require authentication ----------------------------------------

    #[tokio::test]
    async fn vaults_without_account_header_is_unauthorized() {
        let fx = fixture();
        let (status, _) = post_json(
            &fx.router,
            "/vaults",
            None,
            serde_json::json!({ "vaultName": "alpha" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // -- 11. Vaults require a name -----------------------------------------------

    #[tokio::test]
    async fn vaults_without_name_is_bad_request() {
        let fx = fixture();
        let (status, body) =
            post_json(&fx.router, "/vaults", Some("acct_1"), serde_json::json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "INVALID_INPUT");
    }

    // -- 12. Vault provisioning happy path ----------------------------------------

    #[tokio::test]
    async fn vault_provisioning_returns_created() {
        let fx = fixture();
        let (status, body) = post_json(
            &fx.router,
            "/vaults",
            Some("acct_1"),
            serde_json::json!({ "vaultName": "alpha" }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        let vault: VaultResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(vault.vault_name, "alpha");
        assert_eq!(vault.chain_id, "1");
        assert_eq!(vault.owner_address, "0xowner");
        assert_eq!(
            vault.predicted_address,
            derive_vault_address("0xowner", vault.salt)
        );
        assert_eq!(fx.metrics.vaults_provisioned_total.get(), 1);
    }

    // -- 13. Duplicate vault names conflict ----------------------------------------

    #[tokio::test]
    async fn duplicate_vault_name_is_conflict() {
        let fx = fixture();
        let body = serde_json::json!({ "vaultName": "alpha" });

        let (status, _) = post_json(&fx.router, "/vaults", Some("acct_1"), body.clone()).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, err_body) = post_json(&fx.router, "/vaults", Some("acct_1"), body).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let err: ErrorBody = serde_json::from_slice(&err_body).unwrap();
        assert_eq!(err.code, "NAME_TAKEN");
    }

    // -- 14. Concurrent provisioning of one name: one 201, one 409 ------------------

    #[tokio::test]
    async fn concurrent_vault_requests_one_winner() {
        let fx = fixture();
        let body = serde_json::json!({ "vaultName": "alpha" });

        let (a, b) = tokio::join!(
            post_json(&fx.router, "/vaults", Some("acct_1"), body.clone()),
            post_json(&fx.router, "/vaults", Some("acct_1"), body.clone()),
        );

        let mut statuses = vec![a.0, b.0];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
    }

    // -- 15. No wallet, no vault -----------------------------------------------------

    #[tokio::test]
    async fn vault_without_wallet_is_not_found() {
        let fx = fixture();
        let (status, body) = post_json(
            &fx.router,
            "/vaults",
            Some("acct_unlinked"),
            serde_json::json!({ "vaultName": "alpha" }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "WALLET_NOT_FOUND");

        // The failed attempt released the name.
        let (status, _) = post_json(
            &fx.router,
            "/vaults",
            Some("acct_1"),
            serde_json::json!({ "vaultName": "alpha" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // -- 16. Unknown chain is rejected, not defaulted --------------------------------

    #[tokio::test]
    async fn unknown_chain_is_bad_request() {
        let fx = fixture();
        let (status, body) = post_json(
            &fx.router,
            "/vaults",
            Some("acct_1"),
            serde_json::json!({ "vaultName": "alpha", "chainId": "999" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "UNKNOWN_CHAIN");
    }
}
