//! Signers and wallets

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use std::sync::Arc;
use thor_crypto::{public_key_to_address, sign, PrivateKey, Signature};
use thor_primitives::{strip_hex_prefix, Address, H256};
use zeroize::Zeroize;

use crate::tx::TxBody;
use crate::SdkError;

/// Something that can sign transactions for one address.
pub trait Signer: Send + Sync {
    /// Address whose key this signer holds
    fn address(&self) -> Address;

    /// Sign `body` and return the encoded signed transaction
    fn sign_transaction(&self, body: &TxBody) -> Result<Vec<u8>, SdkError>;
}

/// A set of accounts, each with a signer.
pub trait Wallet: Send + Sync {
    /// Addresses in wallet order
    fn accounts(&self) -> Vec<Address>;

    /// Signer for `address`, if the wallet holds its key
    fn signer(&self, address: &Address) -> Option<Arc<dyn Signer>>;
}

/// In-process secp256k1 key.
///
/// Clone is not implemented so keys are not duplicated by accident.
pub struct LocalSigner {
    private_key: PrivateKey,
    address: Address,
}

impl LocalSigner {
    /// Create a new random key
    pub fn new_random() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    fn from_signing_key(private_key: SigningKey) -> Self {
        let address = public_key_to_address(private_key.verifying_key());
        Self {
            private_key,
            address,
        }
    }

    /// Create from a 32-byte private key
    pub fn from_private_key(key: &[u8; 32]) -> Result<Self, SdkError> {
        let private_key =
            SigningKey::from_slice(key).map_err(|e| SdkError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_signing_key(private_key))
    }

    /// Create from a hex-encoded private key, with or without `0x`
    pub fn from_private_key_hex(hex: &str) -> Result<Self, SdkError> {
        let mut bytes = hex::decode(strip_hex_prefix(hex))?;
        if bytes.len() != 32 {
            let len = bytes.len();
            bytes.zeroize();
            return Err(SdkError::InvalidPrivateKey(format!(
                "Expected 32 bytes, got {}",
                len
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();

        let result = Self::from_private_key(&key);
        key.zeroize();
        result
    }

    /// Sign a 32-byte digest
    pub fn sign_hash(&self, hash: &H256) -> Result<Signature, SdkError> {
        Ok(sign(hash, &self.private_key)?)
    }
}

impl Signer for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_transaction(&self, body: &TxBody) -> Result<Vec<u8>, SdkError> {
        let signature = self.sign_hash(&body.signing_hash())?;
        Ok(body.encode_signed(&signature))
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of local keys
#[derive(Default)]
pub struct LocalWallet {
    signers: Vec<Arc<LocalSigner>>,
}

impl LocalWallet {
    /// Empty wallet
    pub fn new() -> Self {
        Self::default()
    }

    /// Wallet holding the given hex keys, in order
    pub fn from_private_keys<S: AsRef<str>>(keys: &[S]) -> Result<Self, SdkError> {
        let mut wallet = Self::new();
        for key in keys {
            wallet.add(LocalSigner::from_private_key_hex(key.as_ref())?);
        }
        Ok(wallet)
    }

    /// Append a key; a key already present is not added twice
    pub fn add(&mut self, signer: LocalSigner) {
        if self.signers.iter().all(|s| s.address != signer.address) {
            self.signers.push(Arc::new(signer));
        }
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.signers.len()
    }

    /// Whether the wallet holds no keys
    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}

impl Wallet for LocalWallet {
    fn accounts(&self) -> Vec<Address> {
        self.signers.iter().map(|s| s.address).collect()
    }

    fn signer(&self, address: &Address) -> Option<Arc<dyn Signer>> {
        self.signers
            .iter()
            .find(|s| &s.address == address)
            .map(|s| Arc::clone(s) as Arc<dyn Signer>)
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("accounts", &self.accounts())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::TxBuilder;
    use thor_primitives::U256;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const KEY_2: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn test_signer_from_hex() {
        let signer = LocalSigner::from_private_key_hex(KEY).unwrap();
        assert_eq!(signer.address().to_hex(), KEY_ADDRESS);
    }

    #[test]
    fn test_signer_rejects_bad_keys() {
        assert!(matches!(
            LocalSigner::from_private_key_hex("0x1234"),
            Err(SdkError::InvalidPrivateKey(_))
        ));
        assert!(LocalSigner::from_private_key_hex("0xzz").is_err());
        assert!(LocalSigner::from_private_key(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = LocalSigner::from_private_key_hex(KEY).unwrap();
        let debug = format!("{:?}", signer);
        assert!(debug.contains("address"));
        assert!(!debug.contains("ac0974bec39a17e3"));
    }

    #[test]
    fn test_signed_transaction_recovers_origin() {
        let signer = LocalSigner::from_private_key_hex(KEY).unwrap();
        let body = TxBuilder::new(0x27)
            .clause(Some(Address::from_bytes([2; 20])), U256::from(5u64), vec![0xab])
            .block_ref(0x0000000a851caf3c)
            .nonce(42)
            .build()
            .unwrap();
        let raw = signer.sign_transaction(&body).unwrap();
        let (decoded, _) = TxBody::decode_signed(&raw).unwrap();
        assert_eq!(decoded, body);
        assert_eq!(TxBody::recover_origin(&raw).unwrap(), signer.address());
    }

    #[test]
    fn test_wallet_order_and_lookup() {
        let wallet = LocalWallet::from_private_keys(&[KEY, KEY_2]).unwrap();
        let accounts = wallet.accounts();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].to_hex(), KEY_ADDRESS);
        assert!(wallet.signer(&accounts[1]).is_some());
        assert!(wallet.signer(&Address::ZERO).is_none());
    }

    #[test]
    fn test_wallet_ignores_duplicates() {
        let mut wallet = LocalWallet::new();
        wallet.add(LocalSigner::from_private_key_hex(KEY).unwrap());
        wallet.add(LocalSigner::from_private_key_hex(KEY).unwrap());
        assert_eq!(wallet.len(), 1);
    }
}
