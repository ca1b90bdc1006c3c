use crate::blockchain::contracts::*;
use crate::blockchain::provider::{ProviderResolver, ResolvedProvider};
use crate::blockchain::services::ServiceFactory;
use crate::blockchain::transactions::TransactionDescriptor;
use crate::config::{Config, GovernanceConfig};
use crate::governance::powers::PowersSnapshot;
use crate::governance::store::GovernanceStore;
use crate::utils::errors::{GovernanceError, Result};
use ethers::types::{Address, U256};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

// Caller-facing arguments of the delegation operations. None of them carries
// the delegating account: it always comes from the session.

#[derive(Debug, Clone, Deserialize)]
pub struct DelegateArgs {
    pub delegatee: Address,
    pub governance_token: Address,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelegateByTypeArgs {
    pub delegatee: Address,
    pub delegation_type: DelegationType,
    pub governance_token: Address,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelegateTokensBySigArgs {
    pub tokens: Vec<Address>,
    pub data: Vec<DelegateSignature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelegateTokensByTypeBySigArgs {
    pub tokens: Vec<Address>,
    pub data: Vec<DelegateByTypeSignature>,
}

/// Governance API consumed by the UI layer.
///
/// Every call resolves the provider for the current network and builds a fresh
/// service handle bound to it; nothing is cached between calls. Only
/// [`GovernanceAdapter::refresh_governance_data`] writes to the store.
#[derive(Clone)]
pub struct GovernanceAdapter {
    governance: GovernanceConfig,
    resolver: ProviderResolver,
    services: Arc<dyn ServiceFactory>,
    store: GovernanceStore,
}

impl GovernanceAdapter {
    pub fn new(config: &Config, services: Arc<dyn ServiceFactory>) -> Result<Self> {
        Ok(Self {
            governance: config.governance.clone(),
            resolver: ProviderResolver::new(&config.governance, &config.providers)?,
            services,
            store: GovernanceStore::new(config.network.clone()),
        })
    }

    pub fn store(&self) -> &GovernanceStore {
        &self.store
    }

    pub fn governance_config(&self) -> &GovernanceConfig {
        &self.governance
    }

    pub async fn resolve_provider(&self) -> Result<ResolvedProvider> {
        let current = self.store.current_network().await;
        self.resolver.resolve(&current)
    }

    async fn session_account(&self) -> Result<Address> {
        self.store.account().await.ok_or(GovernanceError::NoActiveAccount)
    }

    async fn delegation_service(&self) -> Result<Arc<dyn DelegationTokenService>> {
        let provider = self.resolve_provider().await?;
        self.services.delegation_service(&provider)
    }

    async fn governance_service(&self) -> Result<Arc<dyn GovernanceService>> {
        let provider = self.resolve_provider().await?;
        self.services.governance_service(&provider, &self.governance)
    }

    async fn nonce_service(&self) -> Result<Arc<dyn NonceService>> {
        let provider = self.resolve_provider().await?;
        self.services.nonce_service(&provider)
    }

    pub async fn delegate(&self, args: DelegateArgs) -> Result<Vec<TransactionDescriptor>> {
        let user = self.session_account().await?;
        let service = self.delegation_service().await?;
        service
            .delegate(DelegateRequest {
                user,
                delegatee: args.delegatee,
                governance_token: args.governance_token,
            })
            .await
    }

    pub async fn delegate_by_type(
        &self,
        args: DelegateByTypeArgs,
    ) -> Result<Vec<TransactionDescriptor>> {
        let user = self.session_account().await?;
        let service = self.delegation_service().await?;
        service
            .delegate_by_type(DelegateByTypeRequest {
                user,
                delegatee: args.delegatee,
                delegation_type: args.delegation_type,
                governance_token: args.governance_token,
            })
            .await
    }

    pub async fn prepare_delegate_signature(
        &self,
        args: PrepareDelegateSignature,
    ) -> Result<String> {
        let service = self.delegation_service().await?;
        service.prepare_delegate_signature(args).await
    }

    pub async fn prepare_delegate_by_type_signature(
        &self,
        args: PrepareDelegateByTypeSignature,
    ) -> Result<String> {
        let service = self.delegation_service().await?;
        service.prepare_delegate_by_type_signature(args).await
    }

    pub async fn delegate_tokens_by_sig(
        &self,
        args: DelegateTokensBySigArgs,
    ) -> Result<Vec<TransactionDescriptor>> {
        let request = DelegateTokensBySigRequest {
            user: self.session_account().await?,
            tokens: args.tokens,
            data: args.data,
        };
        request.validate()?;

        let service = self.governance_service().await?;
        service.delegate_tokens_by_sig(request).await
    }

    pub async fn delegate_tokens_by_type_by_sig(
        &self,
        args: DelegateTokensByTypeBySigArgs,
    ) -> Result<Vec<TransactionDescriptor>> {
        let request = DelegateTokensByTypeBySigRequest {
            user: self.session_account().await?,
            tokens: args.tokens,
            data: args.data,
        };
        request.validate()?;

        let service = self.governance_service().await?;
        service.delegate_tokens_by_type_by_sig(request).await
    }

    pub async fn submit_vote(&self, args: SubmitVoteRequest) -> Result<Vec<TransactionDescriptor>> {
        let service = self.governance_service().await?;
        service.submit_vote(args).await
    }

    pub async fn get_vote_on_proposal(&self, args: GetVoteOnProposalRequest) -> Result<Vote> {
        let service = self.governance_service().await?;
        service.get_vote_on_proposal(args).await
    }

    pub async fn get_voting_power_at(&self, args: GetVotingPowerAtRequest) -> Result<U256> {
        let service = self.governance_service().await?;
        service.get_voting_power_at(args).await
    }

    /// Nonce to sign the next delegation with; 0 when the token reports none.
    pub async fn get_token_nonce(&self, user: Address, token: Address) -> Result<U256> {
        let service = self.nonce_service().await?;
        let nonce = service.get_nonce(token, user).await?;
        Ok(nonce.unwrap_or_default())
    }

    /// Recomputes the powers snapshot of the session account.
    ///
    /// Does nothing without a session account. Failures are logged and the
    /// previous snapshot stays in place.
    pub async fn refresh_governance_data(&self) {
        if let Err(e) = self.try_refresh_governance_data().await {
            tracing::error!(error = %e, "Failed to refresh governance powers");
        }
    }

    /// Same as [`Self::refresh_governance_data`] but reports the failure.
    /// Returns the published snapshot, if any.
    pub async fn try_refresh_governance_data(&self) -> Result<Option<Arc<PowersSnapshot>>> {
        let Some(account) = self.store.account().await else {
            tracing::debug!("No session account, skipping governance refresh");
            return Ok(None);
        };

        let service = self.governance_service().await?;
        let tokens = self.governance.power_tokens();
        let powers = service
            .get_tokens_power(GetTokensPowerRequest {
                user: account,
                tokens: tokens.to_vec(),
            })
            .await?;

        let [governance_token_power, staked_token_power]: [Power; 2] =
            powers.try_into().map_err(|powers: Vec<Power>| {
                GovernanceError::unexpected_response(format!(
                    "expected powers for {} tokens, got {}",
                    tokens.len(),
                    powers.len()
                ))
            })?;

        let snapshot =
            PowersSnapshot::from_token_powers(account, governance_token_power, staked_token_power);
        tracing::info!(
            account = ?account,
            voting_power = %snapshot.voting_power,
            proposition_power = %snapshot.proposition_power,
            "Refreshed governance powers"
        );

        if self.store.replace_powers(snapshot).await {
            Ok(self.store.powers())
        } else {
            Ok(None)
        }
    }
}
