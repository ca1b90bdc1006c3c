use crate::blockchain::contracts::{
    GetVoteOnProposalRequest, GetVotingPowerAtRequest, PrepareDelegateByTypeSignature,
    PrepareDelegateSignature, SubmitVoteRequest, Vote,
};
use crate::blockchain::provider::ResolvedProvider;
use crate::blockchain::transactions::TransactionDescriptor;
use crate::config::{GovernanceConfig, NetworkConfig};
use crate::governance::adapter::{
    DelegateArgs, DelegateByTypeArgs, DelegateTokensBySigArgs, DelegateTokensByTypeBySigArgs,
};
use crate::governance::PowersSnapshot;
use crate::utils::errors::{GovernanceError, Result};
use crate::utils::helpers::parse_address;
use crate::utils::math::{format_token_amount, value_to_big_number};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

impl IntoResponse for GovernanceError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if self.is_upstream_error() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::warn!(error = %self, "Governance request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionBody {
    pub account: Option<Address>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub account: Option<Address>,
    pub network: NetworkConfig,
    pub provider: Option<ResolvedProvider>,
}

#[derive(Debug, Serialize)]
pub struct SignaturePayloadResponse {
    pub typed_data: String,
}

#[derive(Debug, Serialize)]
pub struct VotingPowerResponse {
    pub raw: U256,
    pub formatted: String,
}

#[derive(Debug, Deserialize)]
pub struct VotingPowerQuery {
    pub user: Address,
    pub block: u64,
    /// Defaults to the configured governance strategy.
    pub strategy: Option<Address>,
}

impl VotingPowerQuery {
    pub fn into_request(self, governance: &GovernanceConfig) -> GetVotingPowerAtRequest {
        GetVotingPowerAtRequest {
            user: self.user,
            block: self.block,
            strategy: self.strategy.unwrap_or(governance.addresses.voting_strategy),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NonceQuery {
    pub user: Address,
    pub token: Address,
}

#[derive(Debug, Serialize)]
pub struct NonceResponse {
    pub nonce: U256,
}

pub async fn health_check() -> &'static str {
    "OK"
}

async fn session_response(state: &AppState) -> SessionResponse {
    let store = state.adapter.store();
    SessionResponse {
        account: store.account().await,
        network: store.current_network().await,
        provider: state.adapter.resolve_provider().await.ok(),
    }
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(session_response(&state).await)
}

pub async fn set_session(
    State(state): State<AppState>,
    Json(body): Json<SessionBody>,
) -> Json<SessionResponse> {
    match body.account {
        Some(account) => state.adapter.store().set_account(account).await,
        None => state.adapter.store().clear_account().await,
    }
    Json(session_response(&state).await)
}

pub async fn clear_session(State(state): State<AppState>) -> StatusCode {
    state.adapter.store().clear_account().await;
    StatusCode::NO_CONTENT
}

pub async fn set_network(
    State(state): State<AppState>,
    Json(network): Json<NetworkConfig>,
) -> Result<Json<SessionResponse>> {
    network.validate()?;
    state.adapter.store().set_current_network(network).await;
    Ok(Json(session_response(&state).await))
}

pub async fn get_powers(State(state): State<AppState>) -> Json<Option<Arc<PowersSnapshot>>> {
    Json(state.adapter.store().powers())
}

/// Failures are not reported here; the previous snapshot is returned instead.
pub async fn refresh_powers(State(state): State<AppState>) -> Json<Option<Arc<PowersSnapshot>>> {
    state.adapter.refresh_governance_data().await;
    Json(state.adapter.store().powers())
}

pub async fn delegate(
    State(state): State<AppState>,
    Json(args): Json<DelegateArgs>,
) -> Result<Json<Vec<TransactionDescriptor>>> {
    Ok(Json(state.adapter.delegate(args).await?))
}

pub async fn delegate_by_type(
    State(state): State<AppState>,
    Json(args): Json<DelegateByTypeArgs>,
) -> Result<Json<Vec<TransactionDescriptor>>> {
    Ok(Json(state.adapter.delegate_by_type(args).await?))
}

pub async fn prepare_delegate_signature(
    State(state): State<AppState>,
    Json(args): Json<PrepareDelegateSignature>,
) -> Result<Json<SignaturePayloadResponse>> {
    let typed_data = state.adapter.prepare_delegate_signature(args).await?;
    Ok(Json(SignaturePayloadResponse { typed_data }))
}

pub async fn prepare_delegate_by_type_signature(
    State(state): State<AppState>,
    Json(args): Json<PrepareDelegateByTypeSignature>,
) -> Result<Json<SignaturePayloadResponse>> {
    let typed_data = state.adapter.prepare_delegate_by_type_signature(args).await?;
    Ok(Json(SignaturePayloadResponse { typed_data }))
}

pub async fn delegate_tokens_by_sig(
    State(state): State<AppState>,
    Json(args): Json<DelegateTokensBySigArgs>,
) -> Result<Json<Vec<TransactionDescriptor>>> {
    Ok(Json(state.adapter.delegate_tokens_by_sig(args).await?))
}

pub async fn delegate_tokens_by_type_by_sig(
    State(state): State<AppState>,
    Json(args): Json<DelegateTokensByTypeBySigArgs>,
) -> Result<Json<Vec<TransactionDescriptor>>> {
    Ok(Json(state.adapter.delegate_tokens_by_type_by_sig(args).await?))
}

pub async fn submit_vote(
    State(state): State<AppState>,
    Json(args): Json<SubmitVoteRequest>,
) -> Result<Json<Vec<TransactionDescriptor>>> {
    Ok(Json(state.adapter.submit_vote(args).await?))
}

/// Proposal ids are decimal in paths, as shown by governance UIs.
fn parse_proposal_id(value: &str) -> Result<U256> {
    let id = value_to_big_number(value)?;
    if id.bits() > 256 {
        return Err(GovernanceError::InvalidDecimal(value.to_string()));
    }
    Ok(U256::from_big_endian(&id.to_bytes_be()))
}

pub async fn get_governance_config(State(state): State<AppState>) -> Json<GovernanceConfig> {
    Json(state.adapter.governance_config().clone())
}

pub async fn get_vote_on_proposal(
    State(state): State<AppState>,
    Path((proposal_id, voter)): Path<(String, String)>,
) -> Result<Json<Vote>> {
    let proposal_id = parse_proposal_id(&proposal_id)?;
    let user = parse_address(&voter)?;
    let vote = state
        .adapter
        .get_vote_on_proposal(GetVoteOnProposalRequest { user, proposal_id })
        .await?;
    Ok(Json(vote))
}

pub async fn get_voting_power_at(
    State(state): State<AppState>,
    Query(query): Query<VotingPowerQuery>,
) -> Result<Json<VotingPowerResponse>> {
    let request = query.into_request(state.adapter.governance_config());
    let raw = state.adapter.get_voting_power_at(request).await?;
    Ok(Json(VotingPowerResponse {
        raw,
        formatted: format_token_amount(raw),
    }))
}

pub async fn get_token_nonce(
    State(state): State<AppState>,
    Query(query): Query<NonceQuery>,
) -> Result<Json<NonceResponse>> {
    let nonce = state.adapter.get_token_nonce(query.user, query.token).await?;
    Ok(Json(NonceResponse { nonce }))
}
