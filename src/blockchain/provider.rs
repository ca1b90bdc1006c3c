use crate::config::{GovernanceConfig, NetworkConfig};
use crate::utils::errors::{GovernanceError, Result};
use ethers::providers::{Http, Provider};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderSource {
    /// Local fork of the governance chain.
    Fork,
    /// Endpoint from the provider table.
    Configured,
}

/// Endpoint a transient service gets bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedProvider {
    pub chain_id: u64,
    pub rpc_url: String,
    pub source: ProviderSource,
}

impl ResolvedProvider {
    pub fn connect(&self) -> Result<Arc<Provider<Http>>> {
        let provider = Provider::<Http>::try_from(self.rpc_url.as_str())?;
        Ok(Arc::new(provider))
    }
}

#[derive(Debug, Clone)]
pub struct ProviderResolver {
    governance_chain_id: u64,
    endpoints: HashMap<u64, String>,
}

impl ProviderResolver {
    pub fn new(
        governance: &GovernanceConfig,
        providers: &HashMap<String, String>,
    ) -> Result<Self> {
        let mut endpoints = HashMap::with_capacity(providers.len());
        for (chain_id, rpc_url) in providers {
            let chain_id = chain_id.parse::<u64>().map_err(|_| {
                GovernanceError::invalid_request(format!(
                    "Invalid chain id in provider table: {}",
                    chain_id
                ))
            })?;
            endpoints.insert(chain_id, rpc_url.clone());
        }

        Ok(Self {
            governance_chain_id: governance.chain_id,
            endpoints,
        })
    }

    /// A fork of the governance chain is served by the fork's own endpoint;
    /// everything else goes to the configured endpoint of the governance chain.
    pub fn resolve(&self, current: &NetworkConfig) -> Result<ResolvedProvider> {
        let is_governance_fork =
            current.is_fork && current.underlying_chain_id == Some(self.governance_chain_id);

        if is_governance_fork {
            tracing::debug!(
                network = %current.name,
                chain_id = current.chain_id,
                "Using fork provider for governance"
            );
            return Ok(ResolvedProvider {
                chain_id: current.chain_id,
                rpc_url: current.rpc_url.clone(),
                source: ProviderSource::Fork,
            });
        }

        let rpc_url = self
            .endpoints
            .get(&self.governance_chain_id)
            .ok_or(GovernanceError::ProviderUnavailable {
                chain_id: self.governance_chain_id,
            })?;

        Ok(ResolvedProvider {
            chain_id: self.governance_chain_id,
            rpc_url: rpc_url.clone(),
            source: ProviderSource::Configured,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn fork_network(underlying_chain_id: Option<u64>) -> NetworkConfig {
        NetworkConfig {
            name: "fork".to_string(),
            chain_id: 3030,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            is_fork: true,
            underlying_chain_id,
        }
    }

    fn resolver() -> ProviderResolver {
        let config = Config::default();
        ProviderResolver::new(&config.governance, &config.providers).unwrap()
    }

    #[test]
    fn test_fork_of_governance_chain_uses_fork_endpoint() {
        let resolved = resolver().resolve(&fork_network(Some(1))).unwrap();
        assert_eq!(resolved.source, ProviderSource::Fork);
        assert_eq!(resolved.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(resolved.chain_id, 3030);
    }

    #[test]
    fn test_fork_of_other_chain_uses_configured_endpoint() {
        let resolved = resolver().resolve(&fork_network(Some(137))).unwrap();
        assert_eq!(resolved.source, ProviderSource::Configured);
        assert_eq!(resolved.chain_id, 1);

        let resolved = resolver().resolve(&fork_network(None)).unwrap();
        assert_eq!(resolved.source, ProviderSource::Configured);
    }

    #[test]
    fn test_non_fork_network_uses_configured_endpoint() {
        let config = Config::default();
        let resolved = resolver().resolve(&config.network).unwrap();
        assert_eq!(resolved.source, ProviderSource::Configured);
        assert_eq!(&resolved.rpc_url, config.providers.get("1").unwrap());
    }

    #[test]
    fn test_missing_endpoint_is_reported() {
        let config = Config::default();
        let resolver = ProviderResolver::new(&config.governance, &HashMap::new()).unwrap();
        let err = resolver.resolve(&config.network).unwrap_err();
        assert!(matches!(err, GovernanceError::ProviderUnavailable { chain_id: 1 }));
    }

    #[test]
    fn test_invalid_chain_id_key_is_rejected() {
        let config = Config::default();
        let mut providers = HashMap::new();
        providers.insert("mainnet".to_string(), "http://localhost:8545".to_string());
        assert!(ProviderResolver::new(&config.governance, &providers).is_err());
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        let resolved = ResolvedProvider {
            chain_id: 1,
            rpc_url: "not a url".to_string(),
            source: ProviderSource::Configured,
        };
        assert!(matches!(resolved.connect(), Err(GovernanceError::InvalidRpcUrl(_))));
    }
}
