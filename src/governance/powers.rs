use crate::blockchain::contracts::Power;
use crate::utils::math::{normalize, sum_amounts, GOVERNANCE_TOKEN_DECIMALS};
use chrono::{DateTime, Utc};
use ethers::types::Address;
use serde::{Serialize, Serializer};

/// Aggregated governance powers of the session account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowersSnapshot {
    pub account: Address,
    /// Governance token plus staked token, in display units.
    pub voting_power: String,
    pub proposition_power: String,
    /// `None` when the account holds its own power. Serialized as `""`.
    #[serde(serialize_with = "serialize_delegatee")]
    pub governance_token_voting_delegatee: Option<Address>,
    #[serde(serialize_with = "serialize_delegatee")]
    pub governance_token_proposition_delegatee: Option<Address>,
    #[serde(serialize_with = "serialize_delegatee")]
    pub staked_token_voting_delegatee: Option<Address>,
    #[serde(serialize_with = "serialize_delegatee")]
    pub staked_token_proposition_delegatee: Option<Address>,
    pub governance_token_power: Power,
    pub staked_token_power: Power,
    pub fetched_at: DateTime<Utc>,
}

fn serialize_delegatee<S: Serializer>(
    delegatee: &Option<Address>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match delegatee {
        Some(address) => address.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}

/// Self-delegation is shown as no delegation.
pub fn delegatee_for_display(delegatee: Address, account: Address) -> Option<Address> {
    if delegatee == account {
        None
    } else {
        Some(delegatee)
    }
}

impl PowersSnapshot {
    pub fn from_token_powers(
        account: Address,
        governance_token_power: Power,
        staked_token_power: Power,
    ) -> Self {
        let voting_power = sum_amounts([
            governance_token_power.voting_power,
            staked_token_power.voting_power,
        ]);
        let proposition_power = sum_amounts([
            governance_token_power.proposition_power,
            staked_token_power.proposition_power,
        ]);

        Self {
            account,
            voting_power: normalize(&voting_power, GOVERNANCE_TOKEN_DECIMALS),
            proposition_power: normalize(&proposition_power, GOVERNANCE_TOKEN_DECIMALS),
            governance_token_voting_delegatee: delegatee_for_display(
                governance_token_power.delegated_address_voting_power,
                account,
            ),
            governance_token_proposition_delegatee: delegatee_for_display(
                governance_token_power.delegated_address_proposition_power,
                account,
            ),
            staked_token_voting_delegatee: delegatee_for_display(
                staked_token_power.delegated_address_voting_power,
                account,
            ),
            staked_token_proposition_delegatee: delegatee_for_display(
                staked_token_power.delegated_address_proposition_power,
                account,
            ),
            governance_token_power,
            staked_token_power,
            fetched_at: Utc::now(),
        }
    }
}
