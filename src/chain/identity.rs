//! Signing identities derived from recovery phrases.
//!
//! # Security
//! - Recovery phrases come ONLY from environment variables
//! - Phrases, seeds and keys are never logged or serialized
//! - Seeds are zeroed after derivation; identities live for one request

use bip39::{Language, Mnemonic};
use cosmrs::bip32::{DerivationPath, XPrv};
use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::crypto::PublicKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

/// BIP-44 purpose field.
const BIP44_PURPOSE: u32 = 44;

/// Errors raised while deriving or using a signing identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The phrase is not a valid mnemonic under the English wordlist.
    #[error("invalid secret phrase: {0}")]
    InvalidSecret(String),

    /// Path, algorithm or key material could not produce an identity.
    #[error("derivation failure: {0}")]
    DerivationFailure(String),

    /// The derived key failed to sign.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// Supported key algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    #[default]
    Secp256k1,
    Ed25519,
}

/// An address plus the key material that authorizes transactions for it.
pub struct SigningIdentity {
    name: String,
    derivation_path: String,
    address: String,
    key: SigningKey,
}

impl SigningIdentity {
    /// Derive an identity from a recovery phrase.
    ///
    /// # Arguments
    /// * `name` - Opaque label used in logs
    /// * `phrase` - BIP-39 mnemonic (English wordlist)
    /// * `path` - BIP-44 path, e.g. `m/44'/990'/0'/0/0`
    /// * `coin_type` - Coin type the path must use
    /// * `algorithm` - Key algorithm
    /// * `prefix` - Bech32 account prefix
    ///
    /// Deterministic: identical inputs always produce the same address.
    pub fn resolve(
        name: &str,
        phrase: &str,
        path: &str,
        coin_type: u32,
        algorithm: KeyAlgorithm,
        prefix: &str,
    ) -> Result<Self, IdentityError> {
        if algorithm != KeyAlgorithm::Secp256k1 {
            return Err(IdentityError::DerivationFailure(format!(
                "key algorithm {:?} is not supported by the ledger",
                algorithm
            )));
        }

        let mnemonic = Mnemonic::parse_in(Language::English, phrase.trim())
            .map_err(|e| IdentityError::InvalidSecret(e.to_string()))?;
        let derivation_path = parse_derivation_path(path, coin_type)?;

        let seed = Zeroizing::new(mnemonic.to_seed(""));
        let xprv = XPrv::derive_from_path(seed.as_slice(), &derivation_path)
            .map_err(|e| IdentityError::DerivationFailure(e.to_string()))?;
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&xprv.private_key().to_bytes());
        let key = SigningKey::from_slice(secret.as_slice())
            .map_err(|e| IdentityError::DerivationFailure(e.to_string()))?;

        let address = key
            .public_key()
            .account_id(prefix)
            .map_err(|e| IdentityError::DerivationFailure(e.to_string()))?
            .to_string();

        tracing::debug!(identity = %name, address = %address, "Signing identity resolved");

        Ok(Self {
            name: name.to_string(),
            derivation_path: path.to_string(),
            address,
            key,
        })
    }

    /// Bech32 account address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Label given at resolution time.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn derivation_path(&self) -> &str {
        &self.derivation_path
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("name", &self.name)
            .field("derivation_path", &self.derivation_path)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Parse a BIP-44 path and check that it belongs to `coin_type`.
pub fn parse_derivation_path(path: &str, coin_type: u32) -> Result<DerivationPath, IdentityError> {
    let parsed: DerivationPath = path
        .parse()
        .map_err(|e| IdentityError::DerivationFailure(format!("invalid path '{}': {}", path, e)))?;

    let components: Vec<_> = parsed.iter().collect();
    match components.as_slice() {
        [purpose, coin, ..]
            if purpose.is_hardened()
                && purpose.index() == BIP44_PURPOSE
                && coin.is_hardened()
                && coin.index() == coin_type =>
        {
            Ok(parsed)
        }
        _ => Err(IdentityError::DerivationFailure(format!(
            "path '{}' is not a BIP-44 path for coin type {}",
            path, coin_type
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const OTHER_PHRASE: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";
    const PATH: &str = "m/44'/990'/0'/0/0";

    fn resolve(phrase: &str, path: &str) -> Result<SigningIdentity, IdentityError> {
        SigningIdentity::resolve("test", phrase, path, 990, KeyAlgorithm::Secp256k1, "testcore")
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let first = resolve(PHRASE, PATH).unwrap();
        let second = resolve(PHRASE, PATH).unwrap();
        assert_eq!(first.address(), second.address());
        assert!(first.address().starts_with("testcore1"));
        assert_eq!(first.derivation_path(), PATH);
    }

    #[test]
    fn test_different_inputs_give_different_addresses() {
        let base = resolve(PHRASE, PATH).unwrap();
        let other_phrase = resolve(OTHER_PHRASE, PATH).unwrap();
        let other_index = resolve(PHRASE, "m/44'/990'/0'/0/1").unwrap();
        assert_ne!(base.address(), other_phrase.address());
        assert_ne!(base.address(), other_index.address());
    }

    #[test]
    fn test_prefix_is_applied() {
        let identity =
            SigningIdentity::resolve("main", PHRASE, PATH, 990, KeyAlgorithm::Secp256k1, "core")
                .unwrap();
        assert!(identity.address().starts_with("core1"));
    }

    #[test]
    fn test_invalid_phrase() {
        let result = resolve("not a real recovery phrase at all", PATH);
        assert!(matches!(result, Err(IdentityError::InvalidSecret(_))));
    }

    #[test]
    fn test_wrong_coin_type() {
        let result = resolve(PHRASE, "m/44'/118'/0'/0/0");
        assert!(matches!(result, Err(IdentityError::DerivationFailure(_))));
    }

    #[test]
    fn test_malformed_path() {
        let result = resolve(PHRASE, "44/990/0");
        assert!(matches!(result, Err(IdentityError::DerivationFailure(_))));
    }

    #[test]
    fn test_unsupported_algorithm() {
        let result =
            SigningIdentity::resolve("test", PHRASE, PATH, 990, KeyAlgorithm::Ed25519, "testcore");
        assert!(matches!(result, Err(IdentityError::DerivationFailure(_))));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let identity = resolve(PHRASE, PATH).unwrap();
        let printed = format!("{:?}", identity);
        assert!(printed.contains(identity.address()));
        assert!(!printed.contains("abandon"));
    }

    #[test]
    fn test_error_does_not_echo_phrase() {
        let err = resolve("abandon abandon secretword", PATH).unwrap_err();
        assert!(!err.to_string().contains("secretword"));
    }
}
