use crate::utils::errors::{GovernanceError, Result};
use ethers::types::U256;
use num_bigint::BigUint;

/// Decimals of the governance token and its staked variant.
pub const GOVERNANCE_TOKEN_DECIMALS: u32 = 18;

/// Converts an on-chain integer into an arbitrary-precision value.
pub fn u256_to_big(value: U256) -> BigUint {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    BigUint::from_bytes_be(&bytes)
}

/// Parses a base-10 integer string such as the ones returned by contract reads.
pub fn value_to_big_number(value: &str) -> Result<BigUint> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GovernanceError::InvalidDecimal(value.to_string()));
    }

    trimmed
        .parse::<BigUint>()
        .map_err(|_| GovernanceError::InvalidDecimal(value.to_string()))
}

/// Exact sum of raw token amounts. Never overflows, unlike `U256` addition.
pub fn sum_amounts<I>(amounts: I) -> BigUint
where
    I: IntoIterator<Item = U256>,
{
    amounts
        .into_iter()
        .map(u256_to_big)
        .fold(BigUint::default(), |acc, amount| acc + amount)
}

/// Shifts `value` left by `decimals` places and renders it without trailing zeros,
/// e.g. `1500000000000000000` with 18 decimals becomes `"1.5"`.
pub fn normalize(value: &BigUint, decimals: u32) -> String {
    let digits = value.to_str_radix(10);
    let decimals = decimals as usize;

    if decimals == 0 {
        return digits;
    }

    let (integer, fraction) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };

    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer
    } else {
        format!("{}.{}", integer, fraction)
    }
}

/// Normalizes a raw token amount into display units.
pub fn format_token_amount(value: U256) -> String {
    normalize(&u256_to_big(value), GOVERNANCE_TOKEN_DECIMALS)
}
