//! Signing and transaction encoding tests for thor-sdk
//!
//! Tests transaction signing, origin recovery and key hygiene.

use thor_crypto::recover_address;
use thor_sdk::tx::{block_ref_from_id, intrinsic_gas};
use thor_sdk::{Address, LocalSigner, LocalWallet, Signer, TxBody, TxBuilder, Wallet, H256, U256};

const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn sample_body() -> TxBody {
    TxBuilder::new(0x4a)
        .block_ref(block_ref_from_id(&H256::from_low_u64_be(0x1234)))
        .clause(Some(Address::from_bytes([9; 20])), U256::from(1_000u64), vec![])
        .clause(None, U256::zero(), vec![0x60, 0x80, 0x00])
        .nonce(7)
        .build()
        .unwrap()
}

// ==================== Hash Signing Tests ====================

#[test]
fn test_sign_hash_verifies_and_recovers() {
    let signer = LocalSigner::new_random();
    let hash = H256::from_bytes([0x42; 32]);
    let signature = signer.sign_hash(&hash).unwrap();

    assert!(signature.recovery_id <= 1);
    assert!(signature.is_low_s());
    assert_eq!(recover_address(&hash, &signature).unwrap(), signer.address());
}

#[test]
fn test_signatures_are_deterministic() {
    let signer = LocalSigner::from_private_key_hex(KEY).unwrap();
    let hash = H256::from_bytes([0x01; 32]);
    assert_eq!(signer.sign_hash(&hash).unwrap(), signer.sign_hash(&hash).unwrap());
}

// ==================== Transaction Tests ====================

#[test]
fn test_signed_transaction_round_trip() {
    let signer = LocalSigner::from_private_key_hex(KEY).unwrap();
    let body = sample_body();
    let raw = signer.sign_transaction(&body).unwrap();

    let (decoded, signature) = TxBody::decode_signed(&raw).unwrap();
    assert_eq!(decoded, body);
    assert_eq!(decoded.clauses[1].to, None);
    assert_eq!(signature.to_bytes().len(), 65);
    assert_eq!(TxBody::recover_origin(&raw).unwrap(), signer.address());
}

#[test]
fn test_intrinsic_gas_includes_creation_and_data() {
    let body = sample_body();
    // 5000 + 16000 + 48000 + 68 + 68 + 4
    assert_eq!(intrinsic_gas(&body.clauses), 69_140);
    assert_eq!(body.gas, 69_140);
}

#[test]
fn test_tampered_transaction_recovers_other_origin() {
    let signer = LocalSigner::from_private_key_hex(KEY).unwrap();
    let body = sample_body();
    let raw = signer.sign_transaction(&body).unwrap();
    let (_, signature) = TxBody::decode_signed(&raw).unwrap();

    let mut tampered = body.clone();
    tampered.nonce += 1;
    let forged = tampered.encode_signed(&signature);
    if let Ok(origin) = TxBody::recover_origin(&forged) {
        assert_ne!(origin, signer.address());
    }
}

#[test]
fn test_decode_rejects_garbage() {
    assert!(TxBody::decode_signed(&[]).is_err());
    assert!(TxBody::decode_signed(&[0xc0]).is_err());
    assert!(TxBody::decode_signed(&sample_body().encode_unsigned()).is_err());
}

// ==================== Wallet Tests ====================

#[test]
fn test_wallet_signer_lookup_signs_for_address() {
    let wallet = LocalWallet::from_private_keys(&[KEY]).unwrap();
    let address = wallet.accounts()[0];
    let signer = wallet.signer(&address).unwrap();
    let raw = signer.sign_transaction(&sample_body()).unwrap();
    assert_eq!(TxBody::recover_origin(&raw).unwrap(), address);
}

#[test]
fn test_key_not_in_debug_output() {
    let wallet = LocalWallet::from_private_keys(&[KEY]).unwrap();
    let debug = format!("{:?}", wallet);
    assert!(!debug.contains("ac0974bec39a17e3"));
}
