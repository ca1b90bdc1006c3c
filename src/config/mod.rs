use config::{ConfigError, Environment, File};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use validator::Validate;

pub const MAINNET_CHAIN_ID: u64 = 1;

const DEFAULT_MAINNET_RPC: &str = "https://eth.llamarpc.com";
const AAVE_GOVERNANCE_V2: &str = "0xEC568fffba86c094cf06b22134B23074DFE2252c";
const AAVE_GOVERNANCE_V2_HELPER: &str = "0x16ff7583ea21055bf5f929ec4b896d997ff35847";
const AAVE_GOVERNANCE_STRATEGY: &str = "0xb7e383ef9b1e9189fc0f71fb30af8aa14377429e";
const AAVE_TOKEN: &str = "0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9";
const STK_AAVE_TOKEN: &str = "0x4da27a545c0c5B758a6BA100e3a049001de870f5";
const IPFS_GATEWAY: &str = "https://cloudflare-ipfs.com/ipfs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    /// Network the session starts on. Can be switched at runtime.
    pub network: NetworkConfig,
    pub governance: GovernanceConfig,
    /// RPC endpoint per chain id.
    pub providers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NetworkConfig {
    #[validate(length(min = 1))]
    pub name: String,
    pub chain_id: u64,
    #[validate(url)]
    pub rpc_url: String,
    #[serde(default)]
    pub is_fork: bool,
    /// Chain a fork was taken from.
    #[serde(default)]
    pub underlying_chain_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    pub chain_id: u64,
    pub addresses: GovernanceAddresses,
    pub ipfs_gateway: String,
    pub governance_token: Address,
    pub staked_token: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceAddresses {
    pub governance_core: Address,
    pub governance_helper: Address,
    pub voting_strategy: Address,
}

impl GovernanceConfig {
    /// Tokens whose powers are aggregated, in snapshot order.
    pub fn power_tokens(&self) -> [Address; 2] {
        [self.governance_token, self.staked_token]
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        Self::load(&config_path)
    }

    pub fn load(config_path: &str) -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("network.name", "mainnet")?
            .set_default("network.chain_id", MAINNET_CHAIN_ID)?
            .set_default("network.rpc_url", DEFAULT_MAINNET_RPC)?
            .set_default("network.is_fork", false)?
            .set_default("governance.chain_id", MAINNET_CHAIN_ID)?
            .set_default("governance.addresses.governance_core", AAVE_GOVERNANCE_V2)?
            .set_default("governance.addresses.governance_helper", AAVE_GOVERNANCE_V2_HELPER)?
            .set_default("governance.addresses.voting_strategy", AAVE_GOVERNANCE_STRATEGY)?
            .set_default("governance.ipfs_gateway", IPFS_GATEWAY)?
            .set_default("governance.governance_token", AAVE_TOKEN)?
            .set_default("governance.staked_token", STK_AAVE_TOKEN)?
            .set_default(format!("providers.{}", MAINNET_CHAIN_ID), DEFAULT_MAINNET_RPC)?
            .add_source(File::with_name(config_path).required(false))
            // GOV_ADAPTER__NETWORK__RPC_URL -> network.rpc_url
            .add_source(Environment::with_prefix("GOV_ADAPTER").separator("__"));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(MAINNET_CHAIN_ID.to_string(), DEFAULT_MAINNET_RPC.to_string());

        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            network: NetworkConfig {
                name: "mainnet".to_string(),
                chain_id: MAINNET_CHAIN_ID,
                rpc_url: DEFAULT_MAINNET_RPC.to_string(),
                is_fork: false,
                underlying_chain_id: None,
            },
            governance: GovernanceConfig {
                chain_id: MAINNET_CHAIN_ID,
                addresses: GovernanceAddresses {
                    governance_core: address(AAVE_GOVERNANCE_V2),
                    governance_helper: address(AAVE_GOVERNANCE_V2_HELPER),
                    voting_strategy: address(AAVE_GOVERNANCE_STRATEGY),
                },
                ipfs_gateway: IPFS_GATEWAY.to_string(),
                governance_token: address(AAVE_TOKEN),
                staked_token: address(STK_AAVE_TOKEN),
            },
            providers,
        }
    }
}

// Only used on the compile-time constants above.
fn address(hex: &str) -> Address {
    hex.parse().unwrap_or_default()
}
