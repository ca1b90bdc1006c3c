use crate::config::NetworkConfig;
use crate::governance::powers::PowersSnapshot;
use crate::utils::helpers::short_address;
use ethers::types::Address;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

#[derive(Debug, Clone)]
struct Session {
    account: Option<Address>,
    current_network: NetworkConfig,
}

/// Shared state read by the adapter and by UI-facing consumers.
///
/// The powers snapshot is only ever replaced wholesale. Subscribers see every
/// replacement through a `watch` channel.
#[derive(Clone)]
pub struct GovernanceStore {
    session: Arc<RwLock<Session>>,
    powers: Arc<watch::Sender<Option<Arc<PowersSnapshot>>>>,
}

impl GovernanceStore {
    pub fn new(current_network: NetworkConfig) -> Self {
        let (powers, _) = watch::channel(None);
        Self {
            session: Arc::new(RwLock::new(Session {
                account: None,
                current_network,
            })),
            powers: Arc::new(powers),
        }
    }

    pub async fn account(&self) -> Option<Address> {
        self.session.read().await.account
    }

    /// Switching accounts drops the previous account's snapshot.
    pub async fn set_account(&self, account: Address) {
        let mut session = self.session.write().await;
        if session.account != Some(account) {
            session.account = Some(account);
            self.powers.send_replace(None);
            tracing::info!("Session account set to {}", short_address(&account));
        }
    }

    pub async fn clear_account(&self) {
        let mut session = self.session.write().await;
        if session.account.take().is_some() {
            self.powers.send_replace(None);
            tracing::info!("Session account cleared");
        }
    }

    pub async fn current_network(&self) -> NetworkConfig {
        self.session.read().await.current_network.clone()
    }

    pub async fn set_current_network(&self, network: NetworkConfig) {
        tracing::info!(
            name = %network.name,
            chain_id = network.chain_id,
            is_fork = network.is_fork,
            "Switched current network"
        );
        self.session.write().await.current_network = network;
    }

    pub fn powers(&self) -> Option<Arc<PowersSnapshot>> {
        self.powers.borrow().clone()
    }

    pub fn subscribe_powers(&self) -> watch::Receiver<Option<Arc<PowersSnapshot>>> {
        self.powers.subscribe()
    }

    /// Publishes `snapshot` if it still belongs to the session account.
    /// Returns whether it was stored.
    pub async fn replace_powers(&self, snapshot: PowersSnapshot) -> bool {
        let session = self.session.read().await;
        if session.account != Some(snapshot.account) {
            tracing::debug!(
                "Discarding powers fetched for {}, session account changed",
                short_address(&snapshot.account)
            );
            return false;
        }
        self.powers.send_replace(Some(Arc::new(snapshot)));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::contracts::Power;
    use crate::config::Config;
    use ethers::types::U256;

    fn snapshot(account: Address, voting_power: &str) -> PowersSnapshot {
        let power = Power {
            voting_power: U256::zero(),
            delegated_address_voting_power: account,
            proposition_power: U256::zero(),
            delegated_address_proposition_power: account,
        };
        PowersSnapshot {
            account,
            voting_power: voting_power.to_string(),
            proposition_power: "0".to_string(),
            governance_token_voting_delegatee: None,
            governance_token_proposition_delegatee: None,
            staked_token_voting_delegatee: None,
            staked_token_proposition_delegatee: None,
            governance_token_power: power.clone(),
            staked_token_power: power,
            fetched_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_replace_powers_notifies_subscribers() {
        let store = GovernanceStore::new(Config::default().network);
        let account = Address::repeat_byte(0x01);
        store.set_account(account).await;

        let mut receiver = store.subscribe_powers();
        assert!(store.replace_powers(snapshot(account, "1")).await);

        receiver.changed().await.unwrap();
        let current = receiver.borrow().clone().unwrap();
        assert_eq!(current.voting_power, "1");

        assert!(store.replace_powers(snapshot(account, "2")).await);
        assert_eq!(store.powers().unwrap().voting_power, "2");
    }

    #[tokio::test]
    async fn test_snapshot_for_stale_account_is_discarded() {
        let store = GovernanceStore::new(Config::default().network);
        store.set_account(Address::repeat_byte(0x01)).await;

        assert!(!store.replace_powers(snapshot(Address::repeat_byte(0x02), "1")).await);
        assert!(store.powers().is_none());
    }

    #[tokio::test]
    async fn test_account_switch_clears_powers() {
        let store = GovernanceStore::new(Config::default().network);
        let account = Address::repeat_byte(0x01);
        store.set_account(account).await;
        store.replace_powers(snapshot(account, "1")).await;

        // same account keeps the snapshot
        store.set_account(account).await;
        assert!(store.powers().is_some());

        store.set_account(Address::repeat_byte(0x02)).await;
        assert!(store.powers().is_none());

        store.clear_account().await;
        assert_eq!(store.account().await, None);
    }

    #[tokio::test]
    async fn test_switch_network() {
        let store = GovernanceStore::new(Config::default().network);
        let mut network = store.current_network().await;
        network.is_fork = true;
        network.underlying_chain_id = Some(1);
        store.set_current_network(network.clone()).await;
        assert_eq!(store.current_network().await, network);
    }
}
