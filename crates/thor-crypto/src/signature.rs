//! secp256k1 signatures in the native 65-byte layout

use crate::{keccak256, CryptoError};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use std::cmp::Ordering;
use thor_primitives::{Address, H256};

/// n/2 for secp256k1
const SECP256K1_N_DIV_2: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D,
    0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// secp256k1 curve order
const SECP256K1_N: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B,
    0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// Recoverable signature. Serialized as `r || s || recovery_id` where the
/// recovery id is 0 or 1 (no Ethereum-style 27 offset).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// r component
    pub r: [u8; 32],
    /// s component (always low-s when produced by [`sign`])
    pub s: [u8; 32],
    /// recovery id, 0 or 1
    pub recovery_id: u8,
}

/// Verifying key
pub type PublicKey = VerifyingKey;

/// Signing key
pub type PrivateKey = SigningKey;

impl Signature {
    /// Serialized length
    pub const LEN: usize = 65;

    /// Convert to 65-byte representation
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.recovery_id;
        bytes
    }

    /// Parse from a 65-byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != Self::LEN {
            return Err(CryptoError::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        let recovery_id = bytes[64];
        if recovery_id > 1 {
            return Err(CryptoError::InvalidRecoveryId(recovery_id));
        }
        Ok(Signature { r, s, recovery_id })
    }

    /// Whether s is in the lower half of the curve order
    pub fn is_low_s(&self) -> bool {
        compare_be(&self.s, &SECP256K1_N_DIV_2) != Ordering::Greater
    }

    fn to_k256(&self) -> Result<K256Signature, CryptoError> {
        let r: k256::FieldBytes = self.r.into();
        let s: k256::FieldBytes = self.s.into();
        K256Signature::from_scalars(r, s).map_err(|e| CryptoError::InvalidSignature(e.to_string()))
    }
}

fn compare_be(a: &[u8; 32], b: &[u8; 32]) -> Ordering {
    a.iter().cmp(b.iter())
}

/// n - s
fn negate_s(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: u16 = 0;
    for i in (0..32).rev() {
        let diff = (SECP256K1_N[i] as u16)
            .wrapping_sub(s[i] as u16)
            .wrapping_sub(borrow);
        result[i] = diff as u8;
        borrow = if diff > 255 { 1 } else { 0 };
    }
    result
}

/// Sign a 32-byte digest, normalizing to low-s.
pub fn sign(digest: &H256, private_key: &PrivateKey) -> Result<Signature, CryptoError> {
    let (signature, mut recovery_id) = private_key
        .sign_prehash_recoverable(digest.as_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    let r: [u8; 32] = signature.r().to_bytes().into();
    let mut s: [u8; 32] = signature.s().to_bytes().into();

    if compare_be(&s, &SECP256K1_N_DIV_2) == Ordering::Greater {
        s = negate_s(&s);
        recovery_id = RecoveryId::try_from(recovery_id.to_byte() ^ 1)
            .map_err(|_| CryptoError::SigningFailed("recovery id out of range".to_string()))?;
    }

    Ok(Signature {
        r,
        s,
        recovery_id: recovery_id.to_byte(),
    })
}

/// Verify a low-s signature over `digest`.
pub fn verify(
    digest: &H256,
    signature: &Signature,
    public_key: &PublicKey,
) -> Result<bool, CryptoError> {
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    if !signature.is_low_s() {
        return Ok(false);
    }
    let sig = signature.to_k256()?;
    Ok(public_key.verify_prehash(digest.as_bytes(), &sig).is_ok())
}

/// Recover the signing key from a signature over `digest`.
pub fn recover_public_key(digest: &H256, signature: &Signature) -> Result<PublicKey, CryptoError> {
    let sig = signature.to_k256()?;
    let recovery_id = RecoveryId::try_from(signature.recovery_id)
        .map_err(|_| CryptoError::InvalidRecoveryId(signature.recovery_id))?;
    VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))
}

/// Recover the signer address from a signature over `digest`.
pub fn recover_address(digest: &H256, signature: &Signature) -> Result<Address, CryptoError> {
    recover_public_key(digest, signature).map(|key| public_key_to_address(&key))
}

/// Account address of a public key: last 20 bytes of keccak256 over the
/// uncompressed point without its 0x04 tag.
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn known_key() -> SigningKey {
        let bytes =
            hex::decode("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").unwrap();
        SigningKey::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_known_key_address() {
        let key = known_key();
        let address = public_key_to_address(key.verifying_key());
        assert_eq!(address.to_hex(), "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    }

    #[test]
    fn test_sign_and_verify() {
        let key = SigningKey::random(&mut OsRng);
        let digest = keccak256(b"clause body");
        let signature = sign(&digest, &key).unwrap();
        assert!(signature.is_low_s());
        assert!(signature.recovery_id <= 1);
        assert!(verify(&digest, &signature, key.verifying_key()).unwrap());
    }

    #[test]
    fn test_recover_address() {
        let key = known_key();
        let digest = keccak256(b"recover me");
        let signature = sign(&digest, &key).unwrap();
        let recovered = recover_address(&digest, &signature).unwrap();
        assert_eq!(recovered, public_key_to_address(key.verifying_key()));
    }

    #[test]
    fn test_signature_bytes_roundtrip() {
        let key = known_key();
        let signature = sign(&keccak256(b"x"), &key).unwrap();
        let bytes = signature.to_bytes();
        assert_eq!(bytes[64], signature.recovery_id);
        assert_eq!(Signature::from_slice(&bytes).unwrap(), signature);
    }

    #[test]
    fn test_signature_from_slice_rejects_bad_input() {
        assert!(Signature::from_slice(&[0u8; 64]).is_err());
        let mut bytes = [1u8; 65];
        bytes[64] = 27;
        assert!(matches!(
            Signature::from_slice(&bytes),
            Err(CryptoError::InvalidRecoveryId(27))
        ));
    }

    #[test]
    fn test_high_s_rejected() {
        let key = SigningKey::random(&mut OsRng);
        let digest = keccak256(b"test");
        let mut signature = sign(&digest, &key).unwrap();
        signature.s = [0xFF; 32];
        assert!(!signature.is_low_s());
        assert!(!verify(&digest, &signature, key.verifying_key()).unwrap());
    }

    #[test]
    fn test_negate_s_is_involution() {
        let s = [0x11u8; 32];
        assert_eq!(negate_s(&negate_s(&s)), s);
    }
}
