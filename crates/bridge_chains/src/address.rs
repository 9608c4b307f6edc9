//! Canonical address encodings per wallet kind.

use bridge_core::WalletKind;
use thiserror::Error;

/// Tron mainnet address version byte.
const TRON_ADDRESS_PREFIX: u8 = 0x41;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} address: {address}")]
pub struct AddressError {
    pub kind: WalletKind,
    pub address: String,
}

/// Check that `address` uses the canonical encoding for `kind`:
/// hex for EVM, base58check for Tron, base58 public key for Solana.
pub fn validate(kind: WalletKind, address: &str) -> Result<(), AddressError> {
    let ok = match kind {
        WalletKind::Evm => is_evm_address(address),
        WalletKind::Tron => is_tron_address(address),
        WalletKind::Solana => is_solana_address(address),
    };
    if ok {
        Ok(())
    } else {
        Err(AddressError {
            kind,
            address: address.to_string(),
        })
    }
}

fn is_evm_address(address: &str) -> bool {
    match address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")) {
        Some(body) => body.len() == 40 && hex::decode(body).is_ok(),
        None => false,
    }
}

fn is_tron_address(address: &str) -> bool {
    match bs58::decode(address).with_check(None).into_vec() {
        Ok(bytes) => bytes.len() == 21 && bytes[0] == TRON_ADDRESS_PREFIX,
        Err(_) => false,
    }
}

fn is_solana_address(address: &str) -> bool {
    matches!(bs58::decode(address).into_vec(), Ok(bytes) if bytes.len() == 32)
}

/// Convert a hex Tron address (`41` + 20 bytes) to its base58check form.
pub fn tron_from_hex(hex_address: &str) -> Result<String, AddressError> {
    let invalid = || AddressError {
        kind: WalletKind::Tron,
        address: hex_address.to_string(),
    };
    let bytes = hex::decode(hex_address.trim_start_matches("0x")).map_err(|_| invalid())?;
    if bytes.len() != 21 || bytes[0] != TRON_ADDRESS_PREFIX {
        return Err(invalid());
    }
    Ok(bs58::encode(bytes).with_check().into_string())
}

/// Short form used in wallet buttons: the first `len` characters plus `...`.
pub fn shorten(address: &str, len: usize) -> String {
    if address.is_empty() {
        return String::new();
    }
    let head: String = address.chars().take(len).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_addresses() {
        assert!(validate(WalletKind::Evm, "0x742d35Cc6634C0532925a3b844Bc9e7595f2bD18").is_ok());
        assert!(validate(WalletKind::Evm, "742d35Cc6634C0532925a3b844Bc9e7595f2bD18").is_err());
        assert!(validate(WalletKind::Evm, "0x742d35").is_err());
        assert!(validate(WalletKind::Evm, "0xZZ2d35Cc6634C0532925a3b844Bc9e7595f2bD18").is_err());
    }

    #[test]
    fn test_tron_addresses() {
        // TRC-20 USDT contract.
        assert!(validate(WalletKind::Tron, "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t").is_ok());
        assert!(validate(WalletKind::Tron, "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6u").is_err());
        assert!(validate(WalletKind::Tron, "0x742d35Cc6634C0532925a3b844Bc9e7595f2bD18").is_err());
    }

    #[test]
    fn test_tron_hex_conversion_produces_t_prefix() {
        let addr = tron_from_hex("41a614f803b6fd780986a42c78ec9c7f77e6ded13c").unwrap();
        assert_eq!(addr, "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t");
        assert!(tron_from_hex("42a614f803b6fd780986a42c78ec9c7f77e6ded13c").is_err());
        assert!(tron_from_hex("not-hex").is_err());
    }

    #[test]
    fn test_solana_addresses() {
        assert!(validate(WalletKind::Solana, "11111111111111111111111111111111").is_ok());
        let key = bs58::encode([7u8; 32]).into_string();
        assert!(validate(WalletKind::Solana, &key).is_ok());
        let short = bs58::encode([7u8; 20]).into_string();
        assert!(validate(WalletKind::Solana, &short).is_err());
        assert!(validate(WalletKind::Solana, "0OIl").is_err());
    }

    #[test]
    fn test_shorten_address() {
        assert_eq!(shorten("0x742d35Cc6634", 7), "0x742d3...");
        assert_eq!(shorten("", 7), "");
    }
}
