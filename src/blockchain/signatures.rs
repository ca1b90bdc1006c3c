//! EIP-712 payloads for delegation by signature.
//!
//! The governance tokens verify signatures against a domain made of the token
//! name, the chain id and the token address. The payload is returned as a JSON
//! string because wallets take it verbatim through `eth_signTypedData_v4`.

use crate::blockchain::contracts::{PrepareDelegateByTypeSignature, PrepareDelegateSignature};
use crate::utils::errors::Result;
use crate::utils::helpers::format_address;
use serde_json::{json, Value};

fn domain_types() -> Value {
    json!([
        { "name": "name", "type": "string" },
        { "name": "chainId", "type": "uint256" },
        { "name": "verifyingContract", "type": "address" },
    ])
}

pub fn delegate_typed_data(chain_id: u64, request: &PrepareDelegateSignature) -> Value {
    json!({
        "types": {
            "EIP712Domain": domain_types(),
            "Delegate": [
                { "name": "delegatee", "type": "address" },
                { "name": "nonce", "type": "uint256" },
                { "name": "expiry", "type": "uint256" },
            ],
        },
        "primaryType": "Delegate",
        "domain": {
            "name": request.governance_token_name,
            "chainId": chain_id,
            "verifyingContract": format_address(&request.governance_token),
        },
        "message": {
            "delegatee": format_address(&request.delegatee),
            "nonce": request.nonce.to_string(),
            "expiry": request.expiry.to_string(),
        },
    })
}

pub fn delegate_by_type_typed_data(
    chain_id: u64,
    request: &PrepareDelegateByTypeSignature,
) -> Value {
    json!({
        "types": {
            "EIP712Domain": domain_types(),
            "DelegateByType": [
                { "name": "delegatee", "type": "address" },
                { "name": "type", "type": "uint8" },
                { "name": "nonce", "type": "uint256" },
                { "name": "expiry", "type": "uint256" },
            ],
        },
        "primaryType": "DelegateByType",
        "domain": {
            "name": request.governance_token_name,
            "chainId": chain_id,
            "verifyingContract": format_address(&request.governance_token),
        },
        "message": {
            "delegatee": format_address(&request.delegatee),
            "type": request.delegation_type.as_u8().to_string(),
            "nonce": request.nonce.to_string(),
            "expiry": request.expiry.to_string(),
        },
    })
}

pub fn prepare_delegate_signature(
    chain_id: u64,
    request: &PrepareDelegateSignature,
) -> Result<String> {
    Ok(serde_json::to_string(&delegate_typed_data(chain_id, request))?)
}

pub fn prepare_delegate_by_type_signature(
    chain_id: u64,
    request: &PrepareDelegateByTypeSignature,
) -> Result<String> {
    Ok(serde_json::to_string(&delegate_by_type_typed_data(chain_id, request))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::contracts::DelegationType;
    use ethers::types::transaction::eip712::{Eip712, TypedData};
    use ethers::types::{Address, U256};

    fn delegate_request() -> PrepareDelegateSignature {
        PrepareDelegateSignature {
            delegatee: Address::repeat_byte(0x22),
            nonce: U256::from(3),
            expiry: U256::from(1_900_000_000u64),
            governance_token_name: "Aave Token".to_string(),
            governance_token: "0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9".parse().unwrap(),
        }
    }

    #[test]
    fn test_delegate_payload_shape() {
        let payload = prepare_delegate_signature(1, &delegate_request()).unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(value["primaryType"], "Delegate");
        assert_eq!(value["domain"]["name"], "Aave Token");
        assert_eq!(value["domain"]["chainId"], 1);
        assert_eq!(
            value["domain"]["verifyingContract"],
            "0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9"
        );
        assert_eq!(value["message"]["nonce"], "3");
        assert_eq!(value["message"]["expiry"], "1900000000");
        assert_eq!(value["types"]["Delegate"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_by_type_payload_carries_type() {
        let base = delegate_request();
        let request = PrepareDelegateByTypeSignature {
            delegatee: base.delegatee,
            delegation_type: DelegationType::Proposition,
            nonce: base.nonce,
            expiry: base.expiry,
            governance_token_name: base.governance_token_name,
            governance_token: base.governance_token,
        };

        let value = delegate_by_type_typed_data(1, &request);
        assert_eq!(value["primaryType"], "DelegateByType");
        assert_eq!(value["message"]["type"], "1");
        assert_eq!(value["types"]["DelegateByType"][1]["type"], "uint8");
    }

    #[test]
    fn test_payload_is_hashable_typed_data() {
        let payload = prepare_delegate_signature(1, &delegate_request()).unwrap();
        let typed: TypedData = serde_json::from_str(&payload).unwrap();
        assert_eq!(typed.primary_type, "Delegate");
        assert!(typed.encode_eip712().is_ok());

        // the digest binds the chain id
        let other = prepare_delegate_signature(5, &delegate_request()).unwrap();
        let other: TypedData = serde_json::from_str(&other).unwrap();
        assert_ne!(typed.encode_eip712().unwrap(), other.encode_eip712().unwrap());
    }
}
