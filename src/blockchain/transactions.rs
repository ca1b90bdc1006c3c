use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    /// Delegation sent straight to a governance token.
    GovDelegationAction,
    /// Vote or relayed delegation sent to the governance contracts.
    GovernanceAction,
}

/// Unsigned transaction the caller signs and submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDescriptor {
    pub tx_type: TransactionType,
    pub tx: TypedTransaction,
}

impl TransactionDescriptor {
    pub fn new(tx_type: TransactionType, from: Address, to: Address, data: Bytes) -> Self {
        let tx = Eip1559TransactionRequest::new()
            .from(from)
            .to(to)
            .data(data)
            .value(U256::zero());

        Self {
            tx_type,
            tx: TypedTransaction::Eip1559(tx),
        }
    }

    pub fn from(&self) -> Option<Address> {
        self.tx.from().copied()
    }

    pub fn to(&self) -> Option<Address> {
        self.tx.to_addr().copied()
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.tx.data()
    }
}
