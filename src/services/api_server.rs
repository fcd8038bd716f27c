// src/services/api_server.rs
//! API Server for the credential anchoring engine
//!
//! Exposes anchoring, the four verification paths and the issued-documents
//! listing over HTTP. Payloads travel as base64 inside JSON bodies. Every
//! verification answers 200 with a tagged verdict; only malformed requests
//! and failed anchors use error statuses.
//!
//! Endpoints:
//! - `POST /anchor`
//! - `POST /verify`, `/verify/qr`, `/verify/payload`, `/verify/proof`
//! - `GET  /issued?q=&order=`
//! - `GET  /issued/:tx_hash/proof`

use crate::blockchain::LedgerError;
use crate::error::AnchorError;
use crate::index::{LocalIndex, SortOrder};
use crate::models::proof::ProofDocument;
use crate::models::record::{AnchorRecord, LocalIndexEntry};
use crate::services::anchoring::AnchoringService;
use crate::services::verifier::{Verdict, Verifier};
use crate::storage::BlobStoreError;
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

// API request and response structures

/// Request payload for anchoring a document
#[derive(Serialize, Deserialize)]
struct AnchorRequest {
    subject_id: String,
    document_name: String,
    #[serde(default)]
    file_name: Option<String>,
    /// Base64-encoded document bytes
    payload: String,
}

/// Response for a successful anchor, with everything the confirmation screen shows
#[derive(Serialize, Deserialize)]
struct AnchorResponse {
    record: AnchorRecord,
    organization: String,
    /// Gateway URI; this is what gets encoded in the QR code
    content_link: String,
    ledger_link: String,
}

/// Request payload for verification by subject and document name
#[derive(Serialize, Deserialize)]
struct VerifyRequest {
    subject_id: String,
    document_name: String,
}

/// Request payload for verification by a scanned locator
#[derive(Serialize, Deserialize)]
struct VerifyQrRequest {
    locator: String,
}

/// Request payload for verification against the document bytes
#[derive(Serialize, Deserialize)]
struct VerifyPayloadRequest {
    subject_id: String,
    document_name: String,
    payload: String,
}

#[derive(Serialize, Deserialize)]
struct IssuedQuery {
    q: Option<String>,
    order: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    kind: String,
    error: String,
}

fn error_response(status: StatusCode, kind: &str, message: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            kind: kind.to_string(),
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn invalid_payload(err: base64::DecodeError) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "validation",
        format!("payload is not base64: {}", err),
    )
}

fn anchor_status(err: &AnchorError) -> StatusCode {
    match err {
        AnchorError::Validation(_) => StatusCode::BAD_REQUEST,
        AnchorError::Ledger(LedgerError::NoSigner) => StatusCode::SERVICE_UNAVAILABLE,
        AnchorError::Ledger(LedgerError::Timeout(_))
        | AnchorError::Upload(BlobStoreError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        AnchorError::Upload(_) | AnchorError::Ledger(_) => StatusCode::BAD_GATEWAY,
    }
}

/// API server state containing all service dependencies
#[derive(Clone)]
pub struct ApiServer {
    /// Service for anchoring new documents
    anchoring: Arc<AnchoringService>,

    /// Service for verifying documents
    verifier: Arc<Verifier>,

    /// Issued-documents listing and proof export
    index: Arc<LocalIndex>,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `anchoring` - Anchoring service
    /// * `verifier` - Verification service
    /// * `index` - Local index backing the listing endpoints
    pub fn new(
        anchoring: Arc<AnchoringService>,
        verifier: Arc<Verifier>,
        index: Arc<LocalIndex>,
    ) -> Self {
        ApiServer {
            anchoring,
            verifier,
            index,
        }
    }

    /// Builds the router with all routes bound to this server's state
    pub fn router(&self) -> Router {
        Router::new()
            .route("/anchor", post(Self::anchor_handler))
            .route("/verify", post(Self::verify_handler))
            .route("/verify/qr", post(Self::verify_qr_handler))
            .route("/verify/payload", post(Self::verify_payload_handler))
            .route("/verify/proof", post(Self::verify_proof_handler))
            .route("/issued", get(Self::issued_handler))
            .route("/issued/:tx_hash/proof", get(Self::proof_handler))
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and serves until the listener fails
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router()).await
    }

    /// Anchors a document
    ///
    /// # Endpoint
    /// POST /anchor
    ///
    /// # Responses
    /// - 200 OK: anchored record and its links
    /// - 400 Bad Request: invalid base64 or missing fields
    /// - 502 Bad Gateway: blob store or ledger failure
    /// - 503 Service Unavailable: no signing account configured
    /// - 504 Gateway Timeout: blob store or ledger did not answer in time
    async fn anchor_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<AnchorRequest>,
    ) -> Response {
        let bytes = match base64::decode(payload.payload.trim()) {
            Ok(bytes) => bytes,
            Err(e) => return invalid_payload(e),
        };
        let file_name = payload.file_name.unwrap_or_default();

        match state
            .anchoring
            .anchor(&payload.subject_id, &payload.document_name, &file_name, &bytes)
            .await
        {
            Ok(record) => {
                let organization = state.anchoring.organization(&record.document_name).to_string();
                let locators = state.index.locators();
                let response = AnchorResponse {
                    content_link: state.anchoring.locator(&record.content_address),
                    ledger_link: locators.ledger_link(&record.receipt.transaction_hash),
                    organization,
                    record,
                };
                (StatusCode::OK, Json(response)).into_response()
            }
            Err(e) => {
                let status = anchor_status(&e);
                if status == StatusCode::BAD_REQUEST {
                    warn!("anchor request rejected: {}", e);
                } else {
                    error!("anchor failed: {}", e);
                }
                error_response(status, e.kind(), e)
            }
        }
    }

    /// Verifies by subject id and document name
    ///
    /// # Endpoint
    /// POST /verify
    async fn verify_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<VerifyRequest>,
    ) -> Json<Verdict> {
        Json(
            state
                .verifier
                .verify_by_identifier(&payload.subject_id, &payload.document_name)
                .await,
        )
    }

    /// Verifies a scanned QR locator
    ///
    /// # Endpoint
    /// POST /verify/qr
    async fn verify_qr_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<VerifyQrRequest>,
    ) -> Json<Verdict> {
        Json(state.verifier.verify_by_content_address(&payload.locator).await)
    }

    /// Verifies document bytes against the recorded fingerprint
    ///
    /// # Endpoint
    /// POST /verify/payload
    ///
    /// # Responses
    /// - 200 OK: verdict
    /// - 400 Bad Request: invalid base64
    async fn verify_payload_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<VerifyPayloadRequest>,
    ) -> Response {
        let bytes = match base64::decode(payload.payload.trim()) {
            Ok(bytes) => bytes,
            Err(e) => return invalid_payload(e),
        };
        let verdict = state
            .verifier
            .verify_by_payload(&payload.subject_id, &payload.document_name, &bytes)
            .await;
        (StatusCode::OK, Json(verdict)).into_response()
    }

    /// Re-verifies an exported proof document
    ///
    /// # Endpoint
    /// POST /verify/proof
    async fn verify_proof_handler(
        State(state): State<Arc<ApiServer>>,
        Json(proof): Json<ProofDocument>,
    ) -> Json<Verdict> {
        Json(state.verifier.verify_proof(&proof).await)
    }

    /// Lists issued documents, optionally filtered and ordered
    ///
    /// # Endpoint
    /// GET /issued?q=<text>&order=newest|oldest
    async fn issued_handler(
        State(state): State<Arc<ApiServer>>,
        Query(params): Query<IssuedQuery>,
    ) -> Response {
        let order = match params.order.as_deref().map(str::parse::<SortOrder>) {
            None => SortOrder::default(),
            Some(Ok(order)) => order,
            Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, "validation", e),
        };
        let entries: Vec<LocalIndexEntry> = state.index.query(params.q.as_deref(), order);
        (StatusCode::OK, Json(entries)).into_response()
    }

    /// Downloads the proof document for one issued record
    ///
    /// # Endpoint
    /// GET /issued/:tx_hash/proof
    ///
    /// # Responses
    /// - 200 OK: proof JSON as an attachment
    /// - 404 Not Found: no local entry for that transaction
    async fn proof_handler(
        Path(tx_hash): Path<String>,
        State(state): State<Arc<ApiServer>>,
    ) -> Response {
        let Some(entry) = state.index.find_by_transaction(&tx_hash) else {
            return error_response(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("no issued record for {}", tx_hash),
            );
        };
        let proof = state.index.export_proof(&entry);
        match proof.to_json() {
            Ok(json) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", proof.file_name()),
                    ),
                ],
                json,
            )
                .into_response(),
            Err(e) => {
                error!("could not render proof for {}: {}", tx_hash, e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e)
            }
        }
    }
}
