use crate::utils::errors::{GovernanceError, Result};
use ethers::types::Address;
use ethers::utils::to_checksum;

/// Parses a hex address, accepting any letter case.
pub fn parse_address(address: &str) -> Result<Address> {
    address
        .trim()
        .parse()
        .map_err(|_| GovernanceError::invalid_request(format!("Invalid address: {}", address)))
}

/// EIP-55 checksummed form, the way wallets display addresses.
pub fn format_address(address: &Address) -> String {
    to_checksum(address, None)
}

pub fn short_address(address: &Address) -> String {
    let full = format_address(address);
    format!("{}...{}", &full[0..6], &full[full.len() - 4..])
}
