//! Native transaction body, encoding and builder

use rlp::{Rlp, RlpStream};
use thor_crypto::{keccak256, recover_address, Signature};
use thor_primitives::{Address, H256, U256};

use crate::types::{HexBytes, NativeClause};
use crate::SdkError;

/// Base cost of any transaction
pub const TX_GAS: u64 = 5_000;
/// Per-clause cost for calls and transfers
pub const CLAUSE_GAS: u64 = 16_000;
/// Per-clause cost for contract creation
pub const CLAUSE_GAS_CONTRACT_CREATION: u64 = 48_000;
/// Cost per zero byte of clause data
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Cost per non-zero byte of clause data
pub const TX_DATA_NON_ZERO_GAS: u64 = 68;

/// Gas charged before any clause executes
pub fn intrinsic_gas(clauses: &[NativeClause]) -> u64 {
    if clauses.is_empty() {
        return TX_GAS + CLAUSE_GAS;
    }
    clauses.iter().fold(TX_GAS, |total, clause| {
        let base = if clause.to.is_some() {
            CLAUSE_GAS
        } else {
            CLAUSE_GAS_CONTRACT_CREATION
        };
        let data: u64 = clause
            .data
            .as_slice()
            .iter()
            .map(|b| {
                if *b == 0 {
                    TX_DATA_ZERO_GAS
                } else {
                    TX_DATA_NON_ZERO_GAS
                }
            })
            .sum();
        total + base + data
    })
}

/// First 8 bytes of a block id, used as a transaction's reference block
pub fn block_ref_from_id(id: &H256) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&id.as_bytes()[..8]);
    u64::from_be_bytes(bytes)
}

/// Unsigned transaction body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxBody {
    /// Last byte of the genesis id
    pub chain_tag: u8,
    /// Reference block prefix
    pub block_ref: u64,
    /// Lifetime in blocks after `block_ref`
    pub expiration: u32,
    /// Clauses
    pub clauses: Vec<NativeClause>,
    /// Legacy gas price coefficient
    pub gas_price_coef: u8,
    /// Gas limit
    pub gas: u64,
    /// Dependency
    pub depends_on: Option<H256>,
    /// Nonce
    pub nonce: u64,
}

impl TxBody {
    fn append_fields(&self, s: &mut RlpStream) {
        s.append(&self.chain_tag);
        s.append(&self.block_ref);
        s.append(&self.expiration);
        s.begin_list(self.clauses.len());
        for clause in &self.clauses {
            s.begin_list(3);
            match &clause.to {
                Some(to) => s.append(to),
                None => s.append_empty_data(),
            };
            s.append(&clause.value);
            s.append(&clause.data.0);
        }
        s.append(&self.gas_price_coef);
        s.append(&self.gas);
        match &self.depends_on {
            Some(id) => s.append(id),
            None => s.append_empty_data(),
        };
        s.append(&self.nonce);
        // reserved
        s.begin_list(0);
    }

    /// RLP encoding without signature
    pub fn encode_unsigned(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(9);
        self.append_fields(&mut s);
        s.out().to_vec()
    }

    /// Hash that the origin signs
    pub fn signing_hash(&self) -> H256 {
        keccak256(self.encode_unsigned())
    }

    /// RLP encoding with the 65-byte signature appended
    pub fn encode_signed(&self, signature: &Signature) -> Vec<u8> {
        let mut s = RlpStream::new_list(10);
        self.append_fields(&mut s);
        s.append(&signature.to_bytes().to_vec());
        s.out().to_vec()
    }

    /// Decode a signed transaction
    pub fn decode_signed(raw: &[u8]) -> Result<(TxBody, Signature), SdkError> {
        let rlp = Rlp::new(raw);
        let err = |e: rlp::DecoderError| SdkError::TxBuild(format!("invalid encoding: {}", e));

        if rlp.item_count().map_err(err)? != 10 {
            return Err(SdkError::TxBuild("expected 10 fields".to_string()));
        }

        let mut clauses = Vec::new();
        for clause in rlp.at(3).map_err(err)?.iter() {
            let to_item = clause.at(0).map_err(err)?;
            let to = if to_item.is_empty() {
                None
            } else {
                Some(to_item.as_val::<Address>().map_err(err)?)
            };
            clauses.push(NativeClause {
                to,
                value: clause.val_at::<U256>(1).map_err(err)?,
                data: HexBytes(clause.val_at::<Vec<u8>>(2).map_err(err)?),
            });
        }

        let depends_item = rlp.at(6).map_err(err)?;
        let depends_on = if depends_item.is_empty() {
            None
        } else {
            Some(depends_item.as_val::<H256>().map_err(err)?)
        };

        let body = TxBody {
            chain_tag: rlp.val_at(0).map_err(err)?,
            block_ref: rlp.val_at(1).map_err(err)?,
            expiration: rlp.val_at(2).map_err(err)?,
            clauses,
            gas_price_coef: rlp.val_at(4).map_err(err)?,
            gas: rlp.val_at(5).map_err(err)?,
            depends_on,
            nonce: rlp.val_at(7).map_err(err)?,
        };
        let sig_bytes: Vec<u8> = rlp.val_at(9).map_err(err)?;
        let signature = Signature::from_slice(&sig_bytes)?;
        Ok((body, signature))
    }

    /// Signer of an encoded transaction
    pub fn recover_origin(raw: &[u8]) -> Result<Address, SdkError> {
        let (body, signature) = Self::decode_signed(raw)?;
        Ok(recover_address(&body.signing_hash(), &signature)?)
    }
}

/// Transaction builder with fluent API
#[derive(Debug, Clone, Default)]
pub struct TxBuilder {
    chain_tag: u8,
    block_ref: u64,
    expiration: u32,
    clauses: Vec<NativeClause>,
    gas_price_coef: u8,
    gas: Option<u64>,
    depends_on: Option<H256>,
    nonce: Option<u64>,
}

impl TxBuilder {
    /// Start a transaction for the chain identified by `chain_tag`
    pub fn new(chain_tag: u8) -> Self {
        Self {
            chain_tag,
            expiration: 32,
            ..Default::default()
        }
    }

    /// Reference block (first 8 bytes of its id)
    pub fn block_ref(mut self, block_ref: u64) -> Self {
        self.block_ref = block_ref;
        self
    }

    /// Lifetime in blocks
    pub fn expiration(mut self, expiration: u32) -> Self {
        self.expiration = expiration;
        self
    }

    /// Append a clause
    pub fn clause(mut self, to: Option<Address>, value: U256, data: Vec<u8>) -> Self {
        self.clauses.push(NativeClause {
            to,
            value,
            data: HexBytes(data),
        });
        self
    }

    /// Gas price coefficient (0-255)
    pub fn gas_price_coef(mut self, coef: u8) -> Self {
        self.gas_price_coef = coef;
        self
    }

    /// Gas limit; defaults to the intrinsic gas of the clauses
    pub fn gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    /// Depend on another transaction
    pub fn depends_on(mut self, id: H256) -> Self {
        self.depends_on = Some(id);
        self
    }

    /// Nonce; defaults to a random value
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Finish the body
    pub fn build(self) -> Result<TxBody, SdkError> {
        if self.clauses.is_empty() {
            return Err(SdkError::TxBuild("at least one clause is required".to_string()));
        }
        let intrinsic = intrinsic_gas(&self.clauses);
        let gas = self.gas.unwrap_or(intrinsic);
        if gas < intrinsic {
            return Err(SdkError::TxBuild(format!(
                "gas {} below intrinsic gas {}",
                gas, intrinsic
            )));
        }
        Ok(TxBody {
            chain_tag: self.chain_tag,
            block_ref: self.block_ref,
            expiration: self.expiration,
            clauses: self.clauses,
            gas_price_coef: self.gas_price_coef,
            gas,
            depends_on: self.depends_on,
            nonce: self.nonce.unwrap_or_else(rand::random),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_clause(data: Vec<u8>) -> NativeClause {
        NativeClause {
            to: Some(Address::from_bytes([1; 20])),
            value: U256::from(10u64),
            data: HexBytes(data),
        }
    }

    #[test]
    fn test_intrinsic_gas() {
        assert_eq!(intrinsic_gas(&[transfer_clause(vec![])]), 21_000);
        assert_eq!(intrinsic_gas(&[transfer_clause(vec![0, 1])]), 21_000 + 4 + 68);
        let create = NativeClause {
            to: None,
            value: U256::zero(),
            data: HexBytes(vec![]),
        };
        assert_eq!(intrinsic_gas(&[create]), 53_000);
        assert_eq!(
            intrinsic_gas(&[transfer_clause(vec![]), transfer_clause(vec![])]),
            37_000
        );
    }

    #[test]
    fn test_block_ref_from_id() {
        let id = H256::from_hex("0x0000000a851caf3cfdb6e899cf5958bfb1ac3413d346d43539627e6be7ec1b4a")
            .unwrap();
        assert_eq!(block_ref_from_id(&id), 0x0000000a851caf3c);
    }

    #[test]
    fn test_builder_defaults() {
        let body = TxBuilder::new(0x27)
            .clause(Some(Address::ZERO), U256::one(), vec![])
            .nonce(1)
            .build()
            .unwrap();
        assert_eq!(body.gas, 21_000);
        assert_eq!(body.expiration, 32);
        assert_eq!(body.chain_tag, 0x27);
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        assert!(TxBuilder::new(1).build().is_err());
        assert!(TxBuilder::new(1)
            .clause(Some(Address::ZERO), U256::zero(), vec![])
            .gas(100)
            .build()
            .is_err());
    }

    #[test]
    fn test_signing_hash_changes_with_body() {
        let a = TxBuilder::new(1)
            .clause(Some(Address::ZERO), U256::one(), vec![])
            .nonce(1)
            .build()
            .unwrap();
        let mut b = a.clone();
        b.nonce = 2;
        assert_ne!(a.signing_hash(), b.signing_hash());
        assert_eq!(a.signing_hash(), a.clone().signing_hash());
    }
}
