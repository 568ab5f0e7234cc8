// src/services/api_server.rs
//! API Server for the DID ledger
//!
//! Thin HTTP front end over [`DidSystem`]. Handlers only parse requests,
//! reject missing parameters, call one context operation and map the result
//! to a status code. Binary signature bytes are returned as base64 and
//! public keys as PEM.
//!
//! The API is built using Axum and includes endpoints for:
//! - DID registration for issuers, holders and verifiers
//! - Credential issuance, presentation, verification and revocation
//! - Ledger and identity listings

use crate::error::DidError;
use crate::models::credential::VerifiableCredential;
use crate::models::did::{IdentityRecord, Role};
use crate::services::did_system::DidSystem;
use crate::utils::serialization::encode_bytes;
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

const MISSING_PARAMETERS: &str = "Missing required parameters";
const NOT_FOUND_OR_UNAUTHORIZED: &str = "Credential not found or unauthorized";

// API request and response structures

/// Request payload for registering a DID
#[derive(Serialize, Deserialize)]
struct CreateDIDRequest {
    name: Option<String>,
}

/// Request payload for issuing a verifiable credential
#[derive(Serialize, Deserialize)]
struct IssueCredentialRequest {
    issuer_did: Option<String>,
    subject_did: Option<String>,
    claims: Option<BTreeMap<String, String>>,
}

/// Response for credential issuance operation
#[derive(Serialize, Deserialize)]
struct IssueCredentialResponse {
    credential_id: String,
    credential: VerifiableCredential,
    /// Base64 signature over the canonical credential JSON
    signature: String,
    /// PEM public key of the per-credential signing key
    public_key: String,
}

/// Request payload for presenting a credential, or revoking that presentation
#[derive(Serialize, Deserialize)]
struct PresentationRequest {
    holder_did: Option<String>,
    verifier_did: Option<String>,
    credential_id: Option<String>,
}

/// Request payload for verifying a credential
#[derive(Serialize, Deserialize)]
struct VerifyCredentialRequest {
    verifier_did: Option<String>,
    credential_id: Option<String>,
}

/// Response for credential verification operation
#[derive(Serialize, Deserialize)]
struct VerifyCredentialResponse {
    valid: bool,
}

/// Request payload for revoking a credential
#[derive(Serialize, Deserialize)]
struct RevokeCredentialRequest {
    issuer_did: Option<String>,
    credential_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for DidError {
    fn into_response(self) -> Response {
        match self {
            DidError::InvalidInput(reason) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: reason })).into_response()
            }
            // Unauthorized is reported as not found so callers cannot learn about
            // credential ids they are not party to.
            DidError::NotFound(_) | DidError::Unauthorized(_) => (
                StatusCode::NOT_FOUND,
                Json(MessageResponse {
                    message: NOT_FOUND_OR_UNAUTHORIZED.into(),
                }),
            )
                .into_response(),
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: other.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl From<JsonRejection> for DidError {
    fn from(rejection: JsonRejection) -> Self {
        DidError::InvalidInput(rejection.body_text())
    }
}

/// Unwraps a JSON body, turning axum's 415/422 rejections into a 400.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, DidError> {
    match body {
        Ok(Json(payload)) => Ok(payload),
        Err(rejection) => {
            error!("Rejected request body: {}", rejection.body_text());
            Err(rejection.into())
        }
    }
}

fn missing_parameters() -> DidError {
    error!("Error: {}", MISSING_PARAMETERS);
    DidError::InvalidInput(MISSING_PARAMETERS.into())
}

/// Unwraps a request field, treating absent and blank values alike.
fn required(field: Option<String>) -> Result<String, DidError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(missing_parameters()),
    }
}

/// API server state: the DID system context shared by every handler
#[derive(Clone)]
pub struct ApiServer {
    system: DidSystem,
}

impl ApiServer {
    pub fn new(system: DidSystem) -> Self {
        ApiServer { system }
    }

    /// Builds the router with every endpoint bound to this server's state.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/create-issuer-did", post(Self::create_issuer_did_handler))
            .route("/create-holder-did", post(Self::create_holder_did_handler))
            .route("/create-verifier-did", post(Self::create_verifier_did_handler))
            .route("/issue-credential", post(Self::issue_credential_handler))
            .route("/present-credential", post(Self::present_credential_handler))
            .route("/verify-credential", post(Self::verify_credential_handler))
            .route("/revoke-credential", post(Self::revoke_credential_handler))
            .route(
                "/revoke-access-credential",
                post(Self::revoke_access_credential_handler),
            )
            .route("/show-blockchain", get(Self::show_blockchain_handler))
            .route("/show-dids", get(Self::show_dids_handler))
            .route("/validate-chain", get(Self::validate_chain_handler))
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and serves requests until the process stops.
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server running at http://{}", listener.local_addr()?);
        axum::serve(listener, self.router()).await
    }

    // =====================
    // DID Registration Handlers
    // =====================

    fn register(
        state: &ApiServer,
        payload: CreateDIDRequest,
        role: Role,
    ) -> Result<(StatusCode, Json<IdentityRecord>), DidError> {
        let name = required(payload.name)?;
        let record = state.system.register_identity(&name, role)?;
        Ok((StatusCode::CREATED, Json(record)))
    }

    /// Registers an issuer DID
    ///
    /// # Endpoint
    /// POST /create-issuer-did
    ///
    /// # Responses
    /// - 201 Created: Returns `{did, name, role}`
    /// - 400 Bad Request: Missing name
    async fn create_issuer_did_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<CreateDIDRequest>, JsonRejection>,
    ) -> Result<(StatusCode, Json<IdentityRecord>), DidError> {
        Self::register(&state, json_body(body)?, Role::Issuer)
    }

    /// Registers a holder DID
    ///
    /// # Endpoint
    /// POST /create-holder-did
    async fn create_holder_did_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<CreateDIDRequest>, JsonRejection>,
    ) -> Result<(StatusCode, Json<IdentityRecord>), DidError> {
        Self::register(&state, json_body(body)?, Role::Holder)
    }

    /// Registers a verifier DID
    ///
    /// # Endpoint
    /// POST /create-verifier-did
    async fn create_verifier_did_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<CreateDIDRequest>, JsonRejection>,
    ) -> Result<(StatusCode, Json<IdentityRecord>), DidError> {
        Self::register(&state, json_body(body)?, Role::Verifier)
    }

    // =====================
    // Credential Handlers
    // =====================

    /// Issues a new verifiable credential
    ///
    /// # Endpoint
    /// POST /issue-credential
    ///
    /// # Responses
    /// - 201 Created: Returns credential id, body, base64 signature and PEM key
    /// - 400 Bad Request: Missing issuer, subject or claims
    async fn issue_credential_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<IssueCredentialRequest>, JsonRejection>,
    ) -> Result<(StatusCode, Json<IssueCredentialResponse>), DidError> {
        let payload = json_body(body)?;
        let issuer_did = required(payload.issuer_did)?;
        let subject_did = required(payload.subject_did)?;
        let claims = match payload.claims {
            Some(claims) if !claims.is_empty() => claims,
            _ => return Err(missing_parameters()),
        };

        let issued = state
            .system
            .issue_credential(&issuer_did, &subject_did, claims)?;
        debug!("Credential issued successfully: {}", issued.credential_id);

        Ok((
            StatusCode::CREATED,
            Json(IssueCredentialResponse {
                signature: encode_bytes(&issued.signature),
                credential_id: issued.credential_id,
                credential: issued.credential,
                public_key: issued.public_key,
            }),
        ))
    }

    /// Presents a credential to a verifier on behalf of its holder
    ///
    /// # Endpoint
    /// POST /present-credential
    ///
    /// # Responses
    /// - 200 OK
    /// - 404 Not Found: Unknown credential or holder is not its subject
    async fn present_credential_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<PresentationRequest>, JsonRejection>,
    ) -> Result<Json<MessageResponse>, DidError> {
        let payload = json_body(body)?;
        let holder_did = required(payload.holder_did)?;
        let verifier_did = required(payload.verifier_did)?;
        let credential_id = required(payload.credential_id)?;

        state
            .system
            .present_credential(&credential_id, &holder_did, &verifier_did)?;
        Ok(Json(MessageResponse {
            message: "Credential presented to verifier".into(),
        }))
    }

    /// Verifies a credential's signature
    ///
    /// # Endpoint
    /// POST /verify-credential
    ///
    /// # Responses
    /// - 200 OK: `{valid}`; unknown or revoked credentials are `false`
    /// - 400 Bad Request: Missing verifier or credential id
    async fn verify_credential_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<VerifyCredentialRequest>, JsonRejection>,
    ) -> Result<Json<VerifyCredentialResponse>, DidError> {
        let payload = json_body(body)?;
        let verifier_did = required(payload.verifier_did)?;
        let credential_id = required(payload.credential_id)?;

        let valid = state.system.verify_credential(&credential_id);
        debug!(
            "Verification result for credential {} requested by {}: {}",
            credential_id, verifier_did, valid
        );
        Ok(Json(VerifyCredentialResponse { valid }))
    }

    /// Revokes a credential on behalf of its issuer
    ///
    /// # Endpoint
    /// POST /revoke-credential
    ///
    /// # Responses
    /// - 200 OK
    /// - 404 Not Found: Unknown/revoked credential or requester is not its issuer
    async fn revoke_credential_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<RevokeCredentialRequest>, JsonRejection>,
    ) -> Result<Json<MessageResponse>, DidError> {
        let payload = json_body(body)?;
        let issuer_did = required(payload.issuer_did)?;
        let credential_id = required(payload.credential_id)?;

        state.system.revoke_credential(&credential_id, &issuer_did)?;
        Ok(Json(MessageResponse {
            message: "Credential revoked".into(),
        }))
    }

    /// Withdraws a presentation on behalf of the holder
    ///
    /// # Endpoint
    /// POST /revoke-access-credential
    ///
    /// # Responses
    /// - 200 OK
    /// - 404 Not Found: Unknown credential, holder mismatch, or verifier never granted
    async fn revoke_access_credential_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<PresentationRequest>, JsonRejection>,
    ) -> Result<Json<MessageResponse>, DidError> {
        let payload = json_body(body)?;
        let holder_did = required(payload.holder_did)?;
        let verifier_did = required(payload.verifier_did)?;
        let credential_id = required(payload.credential_id)?;

        state
            .system
            .revoke_access(&credential_id, &holder_did, &verifier_did)?;
        Ok(Json(MessageResponse {
            message: "Credential access revoked from verifier".into(),
        }))
    }

    // =====================
    // Ledger & Registry Listings
    // =====================

    async fn show_blockchain_handler(State(state): State<Arc<ApiServer>>) -> impl IntoResponse {
        Json(state.system.dump_chain())
    }

    async fn show_dids_handler(State(state): State<Arc<ApiServer>>) -> impl IntoResponse {
        Json(state.system.dump_identities())
    }

    async fn validate_chain_handler(State(state): State<Arc<ApiServer>>) -> impl IntoResponse {
        Json(serde_json::json!({ "valid": state.system.validate_chain() }))
    }
}
