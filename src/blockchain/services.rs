use crate::blockchain::contracts::*;
use crate::blockchain::provider::ResolvedProvider;
use crate::blockchain::signatures;
use crate::blockchain::transactions::{TransactionDescriptor, TransactionType};
use crate::config::GovernanceConfig;
use crate::utils::errors::{GovernanceError, Result};
use async_trait::async_trait;
use ethers::abi::{parse_abi, Detokenize, Tokenize};
use ethers::contract::BaseContract;
use ethers::prelude::*;
use ethers::providers::JsonRpcClient;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;

const DELEGATION_TOKEN_ABI: &[&str] = &[
    "function name() external view returns (string)",
    "function delegate(address delegatee) external",
    "function delegateByType(address delegatee, uint8 delegationType) external",
];

const NONCES_ABI: &[&str] = &[
    "function nonces(address owner) external view returns (uint256)",
    "function _nonces(address owner) external view returns (uint256)",
];

const GOVERNANCE_ABI: &[&str] = &[
    "function submitVote(uint256 proposalId, bool support) external",
    "function getVoteOnProposal(uint256 proposalId, address voter) \
     external view returns ((bool,uint248))",
];

const VOTING_STRATEGY_ABI: &[&str] = &[
    "function getVotingPowerAt(address user, uint256 blockNumber) \
     external view returns (uint256)",
];

// Tuple arrays only parse through struct declarations.
const GOVERNANCE_HELPER_ABI: &[&str] = &[
    "struct Power { uint256 votingPower; address delegatedAddressVotingPower; \
     uint256 propositionPower; address delegatedAddressPropositionPower; }",
    "struct DelegateBySigParams { address delegatee; uint256 nonce; uint256 expiry; \
     uint8 v; bytes32 r; bytes32 s; }",
    "struct DelegateByTypeBySigParams { address delegatee; uint8 delegationType; \
     uint256 nonce; uint256 expiry; uint8 v; bytes32 r; bytes32 s; }",
    "function getTokensPower(address user, address[] tokens) external view returns (Power[])",
    "function delegateTokensBySig(address[] tokens, DelegateBySigParams[] data) external",
    "function delegateTokensByTypeBySig(address[] tokens, DelegateByTypeBySigParams[] data) \
     external",
];

type RawPower = (U256, Address, U256, Address);
type RawDelegateSig = (Address, U256, U256, u8, H256, H256);
type RawDelegateByTypeSig = (Address, u8, U256, U256, u8, H256, H256);

/// Human-readable ABI wrapper used to encode calldata and decode return data.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    name: &'static str,
    inner: BaseContract,
}

impl ContractAbi {
    pub fn parse(name: &'static str, signatures: &[&str]) -> Result<Self> {
        let abi = parse_abi(signatures)
            .map_err(|e| GovernanceError::contract(format!("{} ABI: {}", name, e)))?;
        Ok(Self {
            name,
            inner: BaseContract::from(abi),
        })
    }

    pub fn delegation_token() -> Result<Self> {
        Self::parse("GovernancePowerDelegationToken", DELEGATION_TOKEN_ABI)
    }

    pub fn nonces() -> Result<Self> {
        Self::parse("ERC20_2612", NONCES_ABI)
    }

    pub fn governance() -> Result<Self> {
        Self::parse("GovernanceV2", GOVERNANCE_ABI)
    }

    pub fn voting_strategy() -> Result<Self> {
        Self::parse("GovernanceStrategy", VOTING_STRATEGY_ABI)
    }

    pub fn governance_helper() -> Result<Self> {
        Self::parse("GovernanceV2Helper", GOVERNANCE_HELPER_ABI)
    }

    pub fn encode<T: Tokenize>(&self, function: &str, args: T) -> Result<Bytes> {
        self.inner
            .encode(function, args)
            .map_err(|e| GovernanceError::contract(format!("{}.{}: {}", self.name, function, e)))
    }

    pub fn decode_output<D: Detokenize>(&self, function: &str, data: &Bytes) -> Result<D> {
        self.inner
            .decode_output(function, data)
            .map_err(|e| GovernanceError::contract(format!("{}.{}: {}", self.name, function, e)))
    }
}

/// Issues a read-only call and returns the raw return data.
async fn call<P: JsonRpcClient>(
    provider: &Provider<P>,
    to: Address,
    calldata: Bytes,
) -> Result<Bytes> {
    let tx: TypedTransaction = TransactionRequest::new().to(to).data(calldata).into();
    Ok(provider.call(&tx, None).await?)
}

async fn read<P: JsonRpcClient, D: Detokenize>(
    provider: &Provider<P>,
    abi: &ContractAbi,
    to: Address,
    function: &str,
    calldata: Bytes,
) -> Result<D> {
    let output = call(provider, to, calldata).await?;
    abi.decode_output(function, &output)
}

pub struct EthersDelegationTokenService<P = Http> {
    provider: Arc<Provider<P>>,
    abi: ContractAbi,
}

impl<P: JsonRpcClient> EthersDelegationTokenService<P> {
    pub fn new(provider: Arc<Provider<P>>) -> Result<Self> {
        Ok(Self {
            provider,
            abi: ContractAbi::delegation_token()?,
        })
    }

    async fn chain_id(&self) -> Result<u64> {
        let chain_id = self.provider.get_chainid().await?;
        if chain_id > U256::from(u64::MAX) {
            return Err(GovernanceError::unexpected_response(format!(
                "chain id out of range: {}",
                chain_id
            )));
        }
        Ok(chain_id.as_u64())
    }

    /// Signing domains use the token's on-chain name; fetch it when the caller
    /// left it blank.
    async fn token_name(&self, token: Address, name: String) -> Result<String> {
        if !name.trim().is_empty() {
            return Ok(name);
        }
        let calldata = self.abi.encode("name", ())?;
        read(&self.provider, &self.abi, token, "name", calldata).await
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> DelegationTokenService for EthersDelegationTokenService<P> {
    async fn delegate(&self, request: DelegateRequest) -> Result<Vec<TransactionDescriptor>> {
        let data = self.abi.encode("delegate", request.delegatee)?;
        tracing::debug!(
            user = ?request.user,
            delegatee = ?request.delegatee,
            token = ?request.governance_token,
            "Prepared delegate transaction"
        );
        Ok(vec![TransactionDescriptor::new(
            TransactionType::GovDelegationAction,
            request.user,
            request.governance_token,
            data,
        )])
    }

    async fn delegate_by_type(
        &self,
        request: DelegateByTypeRequest,
    ) -> Result<Vec<TransactionDescriptor>> {
        let data = self.abi.encode(
            "delegateByType",
            (request.delegatee, request.delegation_type.as_u8()),
        )?;
        tracing::debug!(
            user = ?request.user,
            delegatee = ?request.delegatee,
            delegation_type = ?request.delegation_type,
            "Prepared delegateByType transaction"
        );
        Ok(vec![TransactionDescriptor::new(
            TransactionType::GovDelegationAction,
            request.user,
            request.governance_token,
            data,
        )])
    }

    async fn prepare_delegate_signature(
        &self,
        mut request: PrepareDelegateSignature,
    ) -> Result<String> {
        let chain_id = self.chain_id().await?;
        request.governance_token_name = self
            .token_name(request.governance_token, request.governance_token_name)
            .await?;
        signatures::prepare_delegate_signature(chain_id, &request)
    }

    async fn prepare_delegate_by_type_signature(
        &self,
        mut request: PrepareDelegateByTypeSignature,
    ) -> Result<String> {
        let chain_id = self.chain_id().await?;
        request.governance_token_name = self
            .token_name(request.governance_token, request.governance_token_name)
            .await?;
        signatures::prepare_delegate_by_type_signature(chain_id, &request)
    }
}

pub struct EthersGovernanceService<P = Http> {
    provider: Arc<Provider<P>>,
    config: GovernanceConfig,
    governance: ContractAbi,
    strategy: ContractAbi,
    helper: ContractAbi,
}

impl<P: JsonRpcClient> EthersGovernanceService<P> {
    pub fn new(provider: Arc<Provider<P>>, config: GovernanceConfig) -> Result<Self> {
        Ok(Self {
            provider,
            config,
            governance: ContractAbi::governance()?,
            strategy: ContractAbi::voting_strategy()?,
            helper: ContractAbi::governance_helper()?,
        })
    }

    /// Decodes `getVoteOnProposal` return data.
    pub fn decode_vote(&self, output: &Bytes) -> Result<Vote> {
        let (support, voting_power): (bool, U256) =
            self.governance.decode_output("getVoteOnProposal", output)?;
        Ok(Vote {
            support,
            voting_power,
        })
    }

    /// Decodes `getTokensPower` return data; one entry is expected per requested token.
    pub fn decode_tokens_power(&self, requested: usize, output: &Bytes) -> Result<Vec<Power>> {
        let raw: Vec<RawPower> = self.helper.decode_output("getTokensPower", output)?;
        if raw.len() != requested {
            return Err(GovernanceError::unexpected_response(format!(
                "getTokensPower returned {} entries for {} tokens",
                raw.len(),
                requested
            )));
        }

        Ok(raw
            .into_iter()
            .map(|(voting_power, voting_to, proposition_power, proposition_to)| Power {
                voting_power,
                delegated_address_voting_power: voting_to,
                proposition_power,
                delegated_address_proposition_power: proposition_to,
            })
            .collect())
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> GovernanceService for EthersGovernanceService<P> {
    async fn submit_vote(&self, request: SubmitVoteRequest) -> Result<Vec<TransactionDescriptor>> {
        let data = self
            .governance
            .encode("submitVote", (request.proposal_id, request.support))?;
        tracing::debug!(
            user = ?request.user,
            proposal_id = %request.proposal_id,
            support = request.support,
            expected_power = ?request.voting_power_override,
            "Prepared submitVote transaction"
        );
        Ok(vec![TransactionDescriptor::new(
            TransactionType::GovernanceAction,
            request.user,
            self.config.addresses.governance_core,
            data,
        )])
    }

    async fn get_vote_on_proposal(&self, request: GetVoteOnProposalRequest) -> Result<Vote> {
        let calldata = self
            .governance
            .encode("getVoteOnProposal", (request.proposal_id, request.user))?;
        let output = call(&self.provider, self.config.addresses.governance_core, calldata).await?;
        self.decode_vote(&output)
    }

    async fn get_voting_power_at(&self, request: GetVotingPowerAtRequest) -> Result<U256> {
        let calldata = self
            .strategy
            .encode("getVotingPowerAt", (request.user, U256::from(request.block)))?;
        read(
            &self.provider,
            &self.strategy,
            request.strategy,
            "getVotingPowerAt",
            calldata,
        )
        .await
    }

    async fn get_tokens_power(&self, request: GetTokensPowerRequest) -> Result<Vec<Power>> {
        let calldata = self
            .helper
            .encode("getTokensPower", (request.user, request.tokens.clone()))?;
        let output = call(&self.provider, self.config.addresses.governance_helper, calldata).await?;
        self.decode_tokens_power(request.tokens.len(), &output)
    }

    async fn delegate_tokens_by_sig(
        &self,
        request: DelegateTokensBySigRequest,
    ) -> Result<Vec<TransactionDescriptor>> {
        let data: Vec<RawDelegateSig> = request
            .data
            .iter()
            .map(|sig| (sig.delegatee, sig.nonce, sig.expiry, sig.v, sig.r, sig.s))
            .collect();
        let calldata = self
            .helper
            .encode("delegateTokensBySig", (request.tokens.clone(), data))?;
        tracing::debug!(
            user = ?request.user,
            tokens = request.tokens.len(),
            "Prepared delegateTokensBySig transaction"
        );
        Ok(vec![TransactionDescriptor::new(
            TransactionType::GovernanceAction,
            request.user,
            self.config.addresses.governance_helper,
            calldata,
        )])
    }

    async fn delegate_tokens_by_type_by_sig(
        &self,
        request: DelegateTokensByTypeBySigRequest,
    ) -> Result<Vec<TransactionDescriptor>> {
        let data: Vec<RawDelegateByTypeSig> = request
            .data
            .iter()
            .map(|sig| {
                (
                    sig.delegatee,
                    sig.delegation_type.as_u8(),
                    sig.nonce,
                    sig.expiry,
                    sig.v,
                    sig.r,
                    sig.s,
                )
            })
            .collect();
        let calldata = self
            .helper
            .encode("delegateTokensByTypeBySig", (request.tokens.clone(), data))?;
        tracing::debug!(
            user = ?request.user,
            tokens = request.tokens.len(),
            "Prepared delegateTokensByTypeBySig transaction"
        );
        Ok(vec![TransactionDescriptor::new(
            TransactionType::GovernanceAction,
            request.user,
            self.config.addresses.governance_helper,
            calldata,
        )])
    }
}

pub struct EthersNonceService<P = Http> {
    provider: Arc<Provider<P>>,
    abi: ContractAbi,
}

impl<P: JsonRpcClient> EthersNonceService<P> {
    pub fn new(provider: Arc<Provider<P>>) -> Result<Self> {
        Ok(Self {
            provider,
            abi: ContractAbi::nonces()?,
        })
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> NonceService for EthersNonceService<P> {
    async fn get_nonce(&self, token: Address, owner: Address) -> Result<Option<U256>> {
        // EIP-2612 tokens expose `nonces`, older governance tokens only `_nonces`.
        for function in ["nonces", "_nonces"] {
            let calldata = self.abi.encode(function, owner)?;
            match read::<P, U256>(&self.provider, &self.abi, token, function, calldata).await {
                Ok(nonce) => return Ok(Some(nonce)),
                Err(e) => {
                    tracing::debug!(?token, function, error = %e, "Nonce lookup failed");
                }
            }
        }
        Ok(None)
    }
}

/// Builds the transient service handles for a resolved provider.
pub trait ServiceFactory: Send + Sync {
    fn delegation_service(
        &self,
        provider: &ResolvedProvider,
    ) -> Result<Arc<dyn DelegationTokenService>>;

    fn governance_service(
        &self,
        provider: &ResolvedProvider,
        config: &GovernanceConfig,
    ) -> Result<Arc<dyn GovernanceService>>;

    fn nonce_service(&self, provider: &ResolvedProvider) -> Result<Arc<dyn NonceService>>;
}

#[derive(Debug, Clone, Default)]
pub struct EthersServiceFactory;

impl ServiceFactory for EthersServiceFactory {
    fn delegation_service(
        &self,
        provider: &ResolvedProvider,
    ) -> Result<Arc<dyn DelegationTokenService>> {
        Ok(Arc::new(EthersDelegationTokenService::new(provider.connect()?)?))
    }

    fn governance_service(
        &self,
        provider: &ResolvedProvider,
        config: &GovernanceConfig,
    ) -> Result<Arc<dyn GovernanceService>> {
        Ok(Arc::new(EthersGovernanceService::new(
            provider.connect()?,
            config.clone(),
        )?))
    }

    fn nonce_service(&self, provider: &ResolvedProvider) -> Result<Arc<dyn NonceService>> {
        Ok(Arc::new(EthersNonceService::new(provider.connect()?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::provider::ProviderSource;
    use crate::config::Config;
    use ethers::utils::id;

    fn unreachable_provider() -> Arc<Provider<Http>> {
        Arc::new(Provider::<Http>::try_from("http://127.0.0.1:1").unwrap())
    }

    #[test]
    fn test_all_abis_parse() {
        assert!(ContractAbi::delegation_token().is_ok());
        assert!(ContractAbi::nonces().is_ok());
        assert!(ContractAbi::governance().is_ok());
        assert!(ContractAbi::voting_strategy().is_ok());
        assert!(ContractAbi::governance_helper().is_ok());
    }

    #[tokio::test]
    async fn test_delegate_encodes_token_call() {
        let service = EthersDelegationTokenService::new(unreachable_provider()).unwrap();
        let user = Address::repeat_byte(0x01);
        let delegatee = Address::repeat_byte(0x02);
        let token = Address::repeat_byte(0x03);

        let txs = service
            .delegate(DelegateRequest {
                user,
                delegatee,
                governance_token: token,
            })
            .await
            .unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].tx_type, TransactionType::GovDelegationAction);
        assert_eq!(txs[0].from(), Some(user));
        assert_eq!(txs[0].to(), Some(token));

        let data = txs[0].data().unwrap();
        assert_eq!(&data[..4], &id("delegate(address)")[..]);
        assert_eq!(&data[16..36], delegatee.as_bytes());
    }

    #[tokio::test]
    async fn test_delegate_by_type_encodes_type() {
        let service = EthersDelegationTokenService::new(unreachable_provider()).unwrap();
        let txs = service
            .delegate_by_type(DelegateByTypeRequest {
                user: Address::repeat_byte(0x01),
                delegatee: Address::repeat_byte(0x02),
                delegation_type: DelegationType::Proposition,
                governance_token: Address::repeat_byte(0x03),
            })
            .await
            .unwrap();

        let data = txs[0].data().unwrap();
        assert_eq!(&data[..4], &id("delegateByType(address,uint8)")[..]);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(data[data.len() - 1], 1);
    }

    #[tokio::test]
    async fn test_submit_vote_targets_governance_core() {
        let config = Config::default().governance;
        let service = EthersGovernanceService::new(unreachable_provider(), config.clone()).unwrap();
        let txs = service
            .submit_vote(SubmitVoteRequest {
                user: Address::repeat_byte(0x01),
                proposal_id: U256::from(42),
                support: true,
                voting_power_override: Some(U256::from(10)),
            })
            .await
            .unwrap();

        assert_eq!(txs[0].tx_type, TransactionType::GovernanceAction);
        assert_eq!(txs[0].to(), Some(config.addresses.governance_core));
        let data = txs[0].data().unwrap();
        assert_eq!(&data[..4], &id("submitVote(uint256,bool)")[..]);
        // override is not part of the calldata
        assert_eq!(data.len(), 4 + 64);
    }

    #[tokio::test]
    async fn test_relayed_delegation_targets_helper() {
        let config = Config::default().governance;
        let service = EthersGovernanceService::new(unreachable_provider(), config.clone()).unwrap();
        let txs = service
            .delegate_tokens_by_type_by_sig(DelegateTokensByTypeBySigRequest {
                user: Address::repeat_byte(0x01),
                tokens: vec![config.governance_token],
                data: vec![DelegateByTypeSignature {
                    delegatee: Address::repeat_byte(0x02),
                    delegation_type: DelegationType::Voting,
                    nonce: U256::zero(),
                    expiry: U256::from(1_900_000_000u64),
                    v: 27,
                    r: H256::repeat_byte(0xaa),
                    s: H256::repeat_byte(0xbb),
                }],
            })
            .await
            .unwrap();

        assert_eq!(txs[0].to(), Some(config.addresses.governance_helper));
        let data = txs[0].data().unwrap();
        let signature = "delegateTokensByTypeBySig(address[],\
                         (address,uint8,uint256,uint256,uint8,bytes32,bytes32)[])";
        assert_eq!(&data[..4], &id(signature)[..]);
    }

    #[tokio::test]
    async fn test_relayed_delegation_encodes_signature_array() {
        let config = Config::default().governance;
        let service = EthersGovernanceService::new(unreachable_provider(), config.clone()).unwrap();
        let txs = service
            .delegate_tokens_by_sig(DelegateTokensBySigRequest {
                user: Address::repeat_byte(0x01),
                tokens: vec![config.governance_token, config.staked_token],
                data: vec![
                    DelegateSignature {
                        delegatee: Address::repeat_byte(0x02),
                        nonce: U256::zero(),
                        expiry: U256::from(1_900_000_000u64),
                        v: 27,
                        r: H256::repeat_byte(0xaa),
                        s: H256::repeat_byte(0xbb),
                    };
                    2
                ],
            })
            .await
            .unwrap();

        let data = txs[0].data().unwrap();
        let signature =
            "delegateTokensBySig(address[],(address,uint256,uint256,uint8,bytes32,bytes32)[])";
        assert_eq!(&data[..4], &id(signature)[..]);
        // selector, two offsets, two token slots, length word, two 6-word structs
        assert_eq!(data.len(), 4 + 32 * (2 + 3 + 1 + 12));
    }

    #[test]
    fn test_factory_builds_governance_service() {
        let resolved = ResolvedProvider {
            chain_id: 1,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            source: ProviderSource::Configured,
        };
        let governance = Config::default().governance;
        assert!(EthersServiceFactory.governance_service(&resolved, &governance).is_ok());
        assert!(EthersServiceFactory.delegation_service(&resolved).is_ok());
        assert!(EthersServiceFactory.nonce_service(&resolved).is_ok());
    }

    #[test]
    fn test_service_decodes_helper_and_vote_output() {
        let service =
            EthersGovernanceService::new(unreachable_provider(), Config::default().governance)
                .unwrap();

        let powers: Vec<RawPower> = vec![
            (U256::from(5), Address::repeat_byte(0x01), U256::from(6), Address::repeat_byte(0x02)),
            (U256::from(7), Address::repeat_byte(0x03), U256::from(8), Address::repeat_byte(0x04)),
        ];
        let encoded = Bytes::from(ethers::abi::encode(&powers.into_tokens()));
        let decoded = service.decode_tokens_power(2, &encoded).unwrap();
        assert_eq!(decoded[1].voting_power, U256::from(7));
        assert_eq!(decoded[1].delegated_address_proposition_power, Address::repeat_byte(0x04));
        assert!(matches!(
            service.decode_tokens_power(3, &encoded),
            Err(GovernanceError::UnexpectedResponse(_))
        ));

        let encoded = Bytes::from(ethers::abi::encode(&(true, U256::from(100)).into_tokens()));
        let vote = service.decode_vote(&encoded).unwrap();
        assert!(vote.support);
        assert_eq!(vote.voting_power, U256::from(100));
    }

    #[test]
    fn test_decode_tokens_power_output() {
        let helper = ContractAbi::governance_helper().unwrap();
        let expected: Vec<RawPower> = vec![
            (U256::from(5), Address::repeat_byte(0x01), U256::from(6), Address::repeat_byte(0x02)),
            (U256::from(7), Address::repeat_byte(0x03), U256::from(8), Address::repeat_byte(0x04)),
        ];
        let encoded = Bytes::from(ethers::abi::encode(&expected.clone().into_tokens()));

        let decoded: Vec<RawPower> = helper.decode_output("getTokensPower", &encoded).unwrap();
        assert_eq!(decoded, expected);
    }

    #[tokio::test]
    async fn test_nonce_lookup_against_dead_endpoint_is_none() {
        let service = EthersNonceService::new(unreachable_provider()).unwrap();
        let nonce = service
            .get_nonce(Address::repeat_byte(0x03), Address::repeat_byte(0x01))
            .await
            .unwrap();
        assert_eq!(nonce, None);
    }

    #[test]
    fn test_factory_rejects_bad_url() {
        let resolved = ResolvedProvider {
            chain_id: 1,
            rpc_url: "::".to_string(),
            source: ProviderSource::Configured,
        };
        assert!(EthersServiceFactory.nonce_service(&resolved).is_err());
    }
}
