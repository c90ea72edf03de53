//! The fee payer that signs every submitted transaction.

use std::fmt;
use std::path::Path;

use zeroize::{Zeroize, Zeroizing};

use crate::error::ClientError;

/// Ed25519 signing identity. The secret seed is wiped on drop.
pub struct Authority {
    secret: Zeroizing<[u8; 32]>,
    pubkey: [u8; 32],
}

impl Authority {
    /// Build from a 32-byte Ed25519 seed.
    pub fn from_secret(secret: [u8; 32]) -> Self {
        let pubkey = ed25519_dalek::SigningKey::from_bytes(&secret)
            .verifying_key()
            .to_bytes();
        Self {
            secret: Zeroizing::new(secret),
            pubkey,
        }
    }

    /// Build from the 64-byte `secret || public` keypair layout used by
    /// Solana keypair files and wallets.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, ClientError> {
        if bytes.len() != 64 {
            return Err(ClientError::InvalidKeypair(format!(
                "expected 64 bytes, got {}",
                bytes.len()
            )));
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&bytes[..32]);
        let authority = Self::from_secret(secret);
        secret.zeroize();

        if authority.pubkey[..] != bytes[32..] {
            return Err(ClientError::InvalidKeypair(
                "public half does not match secret".into(),
            ));
        }
        Ok(authority)
    }

    /// Base58-encoded 64-byte keypair.
    pub fn from_base58(encoded: &str) -> Result<Self, ClientError> {
        let bytes = Zeroizing::new(
            bs58::decode(encoded.trim())
                .into_vec()
                .map_err(|e| ClientError::InvalidKeypair(format!("base58 decode failed: {e}")))?,
        );
        Self::from_keypair_bytes(&bytes)
    }

    /// JSON byte-array keypair file, as written by `solana-keygen`.
    pub fn from_json_file(path: &Path) -> Result<Self, ClientError> {
        let text = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            ClientError::InvalidKeypair(format!("cannot read {}: {e}", path.display()))
        })?);
        let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
            serde_json::from_str(&text)
                .map_err(|e| ClientError::InvalidKeypair(format!("{}: {e}", path.display())))?,
        );
        Self::from_keypair_bytes(&bytes)
    }

    pub fn pubkey(&self) -> [u8; 32] {
        self.pubkey
    }

    pub fn address(&self) -> String {
        social_codec::bytes_to_address(&self.pubkey)
    }

    pub(crate) fn secret(&self) -> &[u8; 32] {
        &self.secret
    }
}

impl fmt::Debug for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authority")
            .field("pubkey", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn keypair_bytes(seed: u8) -> Vec<u8> {
        let authority = Authority::from_secret([seed; 32]);
        let mut bytes = vec![seed; 32];
        bytes.extend_from_slice(&authority.pubkey());
        bytes
    }

    #[test]
    fn pubkey_matches_dalek() {
        let authority = Authority::from_secret([0x42; 32]);
        let expected = ed25519_dalek::SigningKey::from_bytes(&[0x42; 32])
            .verifying_key()
            .to_bytes();
        assert_eq!(authority.pubkey(), expected);
    }

    #[test]
    fn base58_keypair_roundtrip() {
        let encoded = bs58::encode(keypair_bytes(7)).into_string();
        let authority = Authority::from_base58(&encoded).unwrap();
        assert_eq!(authority.pubkey(), Authority::from_secret([7; 32]).pubkey());
    }

    #[test]
    fn mismatched_public_half_is_rejected() {
        let mut bytes = keypair_bytes(7);
        bytes[40] ^= 0xFF;
        let err = Authority::from_keypair_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(Authority::from_keypair_bytes(&[0u8; 32]).is_err());
        assert!(Authority::from_base58("not base58 0OIl").is_err());
    }

    #[test]
    fn json_keypair_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&keypair_bytes(9)).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let authority = Authority::from_json_file(file.path()).unwrap();
        assert_eq!(authority.pubkey(), Authority::from_secret([9; 32]).pubkey());
    }

    #[test]
    fn debug_hides_secret() {
        let authority = Authority::from_secret([0x11; 32]);
        let debug = format!("{authority:?}");
        assert!(debug.contains(&authority.address()));
        assert!(!debug.contains("secret"));
    }
}
