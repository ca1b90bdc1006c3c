use crate::blockchain::transactions::TransactionDescriptor;
use crate::utils::errors::Result;
use crate::utils::validation::{validate_signature_batch, validate_signature_v};
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

// Contract-facing types. Field names follow the on-chain structs.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationType {
    Voting = 0,
    Proposition = 1,
}

impl DelegationType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Powers of one account on one token, as returned by the governance helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Power {
    pub voting_power: U256,
    pub delegated_address_voting_power: Address,
    pub proposition_power: U256,
    pub delegated_address_proposition_power: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub support: bool,
    pub voting_power: U256,
}

// Requests handed to the services. `user` is filled in by the adapter for
// every delegation request.

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegateRequest {
    pub user: Address,
    pub delegatee: Address,
    pub governance_token: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegateByTypeRequest {
    pub user: Address,
    pub delegatee: Address,
    pub delegation_type: DelegationType,
    pub governance_token: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareDelegateSignature {
    pub delegatee: Address,
    pub nonce: U256,
    pub expiry: U256,
    pub governance_token_name: String,
    pub governance_token: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareDelegateByTypeSignature {
    pub delegatee: Address,
    pub delegation_type: DelegationType,
    pub nonce: U256,
    pub expiry: U256,
    pub governance_token_name: String,
    pub governance_token: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateSignature {
    pub delegatee: Address,
    pub nonce: U256,
    pub expiry: U256,
    pub v: u8,
    pub r: H256,
    pub s: H256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateByTypeSignature {
    pub delegatee: Address,
    pub delegation_type: DelegationType,
    pub nonce: U256,
    pub expiry: U256,
    pub v: u8,
    pub r: H256,
    pub s: H256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegateTokensBySigRequest {
    pub user: Address,
    pub tokens: Vec<Address>,
    pub data: Vec<DelegateSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegateTokensByTypeBySigRequest {
    pub user: Address,
    pub tokens: Vec<Address>,
    pub data: Vec<DelegateByTypeSignature>,
}

fn validate_relayed_signatures<I>(
    tokens: usize,
    recovery_ids: I,
) -> std::result::Result<(), ValidationErrors>
where
    I: IntoIterator<Item = u8>,
{
    let mut errors = ValidationErrors::new();
    let recovery_ids: Vec<u8> = recovery_ids.into_iter().collect();

    if let Err(e) = validate_signature_batch(tokens, recovery_ids.len()) {
        errors.add("tokens", e);
    }
    for v in recovery_ids {
        if let Err(e) = validate_signature_v(v) {
            errors.add("data", e);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

impl Validate for DelegateTokensBySigRequest {
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        validate_relayed_signatures(self.tokens.len(), self.data.iter().map(|sig| sig.v))
    }
}

impl Validate for DelegateTokensByTypeBySigRequest {
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        validate_relayed_signatures(self.tokens.len(), self.data.iter().map(|sig| sig.v))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitVoteRequest {
    pub user: Address,
    pub proposal_id: U256,
    pub support: bool,
    /// Power the UI expects the vote to carry. Informational, never encoded.
    #[serde(default)]
    pub voting_power_override: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetVoteOnProposalRequest {
    pub user: Address,
    pub proposal_id: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetVotingPowerAtRequest {
    pub user: Address,
    pub block: u64,
    pub strategy: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetTokensPowerRequest {
    pub user: Address,
    pub tokens: Vec<Address>,
}

// Service seams. Each handle is short-lived and bound to one resolved provider.

#[async_trait]
pub trait DelegationTokenService: Send + Sync {
    async fn delegate(&self, request: DelegateRequest) -> Result<Vec<TransactionDescriptor>>;

    async fn delegate_by_type(
        &self,
        request: DelegateByTypeRequest,
    ) -> Result<Vec<TransactionDescriptor>>;

    /// EIP-712 typed data, serialized as JSON, ready for `eth_signTypedData_v4`.
    async fn prepare_delegate_signature(&self, request: PrepareDelegateSignature) -> Result<String>;

    async fn prepare_delegate_by_type_signature(
        &self,
        request: PrepareDelegateByTypeSignature,
    ) -> Result<String>;
}

#[async_trait]
pub trait GovernanceService: Send + Sync {
    async fn submit_vote(&self, request: SubmitVoteRequest) -> Result<Vec<TransactionDescriptor>>;

    async fn get_vote_on_proposal(&self, request: GetVoteOnProposalRequest) -> Result<Vote>;

    async fn get_voting_power_at(&self, request: GetVotingPowerAtRequest) -> Result<U256>;

    /// One helper call for all tokens; results come back in request order.
    async fn get_tokens_power(&self, request: GetTokensPowerRequest) -> Result<Vec<Power>>;

    async fn delegate_tokens_by_sig(
        &self,
        request: DelegateTokensBySigRequest,
    ) -> Result<Vec<TransactionDescriptor>>;

    async fn delegate_tokens_by_type_by_sig(
        &self,
        request: DelegateTokensByTypeBySigRequest,
    ) -> Result<Vec<TransactionDescriptor>>;
}

#[async_trait]
pub trait NonceService: Send + Sync {
    /// `None` when the token exposes no readable nonce.
    async fn get_nonce(&self, token: Address, owner: Address) -> Result<Option<U256>>;
}
