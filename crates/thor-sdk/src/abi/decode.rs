//! ABI decoding

use thor_primitives::{Address, U256};

use super::types::{ParamType, Token, I256};
use crate::SdkError;

/// Decode a sequence of values laid out with head/tail encoding.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, SdkError> {
    decode_params(types, data, 0)
}

/// Decode function return data
pub fn decode_output(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, SdkError> {
    if types.is_empty() {
        return Ok(Vec::new());
    }
    decode(types, data)
}

/// Decode a single 32-byte word as a value of a static type (used for
/// indexed event topics).
pub fn decode_word(param_type: &ParamType, word: &[u8; 32]) -> Result<Token, SdkError> {
    if param_type.is_dynamic() || param_type.head_len() != 32 {
        return Err(SdkError::AbiDecode(format!(
            "type {} does not fit in a single word",
            param_type
        )));
    }
    decode_static(param_type, word, 0).map(|(token, _)| token)
}

/// Decode values whose head section starts at `base`; dynamic offsets are
/// relative to `base`.
fn decode_params(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>, SdkError> {
    let mut cursor = base;
    let mut tokens = Vec::with_capacity(types.len());

    for param_type in types {
        if param_type.is_dynamic() {
            let offset = read_usize(data, cursor)?;
            let start = base
                .checked_add(offset)
                .ok_or_else(|| SdkError::AbiDecode("offset overflow".to_string()))?;
            tokens.push(decode_dynamic(param_type, data, start)?);
            cursor += 32;
        } else {
            let (token, consumed) = decode_static(param_type, data, cursor)?;
            tokens.push(token);
            cursor += consumed;
        }
    }

    Ok(tokens)
}

fn decode_static(
    param_type: &ParamType,
    data: &[u8],
    offset: usize,
) -> Result<(Token, usize), SdkError> {
    match param_type {
        ParamType::Address => {
            let word = read_word(data, offset)?;
            Ok((Token::Address(Address::from_word(&word)), 32))
        }
        ParamType::Uint(_) => {
            let word = read_word(data, offset)?;
            Ok((Token::Uint(U256::from_big_endian(&word)), 32))
        }
        ParamType::Int(_) => {
            let word = read_word(data, offset)?;
            Ok((Token::Int(I256::from_word(&word)), 32))
        }
        ParamType::Bool => {
            let word = read_word(data, offset)?;
            Ok((Token::Bool(word[31] != 0), 32))
        }
        ParamType::FixedBytes(size) => {
            let word = read_word(data, offset)?;
            let size = (*size).min(32);
            Ok((Token::FixedBytes(word[..size].to_vec()), 32))
        }
        ParamType::FixedArray(inner, size) => {
            let inner_types = vec![(**inner).clone(); *size];
            let tokens = decode_params(&inner_types, data, offset)?;
            Ok((Token::FixedArray(tokens), param_type.head_len()))
        }
        ParamType::Tuple(types) => {
            let tokens = decode_params(types, data, offset)?;
            Ok((Token::Tuple(tokens), param_type.head_len()))
        }
        ParamType::Bytes | ParamType::String | ParamType::Array(_) => Err(SdkError::AbiDecode(
            format!("type {} is dynamic", param_type),
        )),
    }
}

fn decode_dynamic(param_type: &ParamType, data: &[u8], start: usize) -> Result<Token, SdkError> {
    match param_type {
        ParamType::Bytes => read_bytes(data, start).map(Token::Bytes),
        ParamType::String => {
            let bytes = read_bytes(data, start)?;
            String::from_utf8(bytes)
                .map(Token::String)
                .map_err(|e| SdkError::AbiDecode(format!("Invalid UTF-8: {}", e)))
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, start)?;
            // Every element needs at least one word; reject absurd lengths early.
            check_length(data, start + 32 + len.saturating_mul(32).min(data.len() + 1))?;
            let inner_types = vec![(**inner).clone(); len];
            decode_params(&inner_types, data, start + 32).map(Token::Array)
        }
        ParamType::FixedArray(inner, size) => {
            let inner_types = vec![(**inner).clone(); *size];
            decode_params(&inner_types, data, start).map(Token::FixedArray)
        }
        ParamType::Tuple(types) => decode_params(types, data, start).map(Token::Tuple),
        _ => decode_static(param_type, data, start).map(|(token, _)| token),
    }
}

fn read_word(data: &[u8], offset: usize) -> Result<[u8; 32], SdkError> {
    check_length(data, offset + 32)?;
    let mut word = [0u8; 32];
    word.copy_from_slice(&data[offset..offset + 32]);
    Ok(word)
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, SdkError> {
    let word = read_word(data, offset)?;
    let value = U256::from_big_endian(&word);
    if value > U256::from(u32::MAX) {
        return Err(SdkError::AbiDecode(format!("length or offset too large: {}", value)));
    }
    Ok(value.as_usize())
}

fn read_bytes(data: &[u8], offset: usize) -> Result<Vec<u8>, SdkError> {
    let len = read_usize(data, offset)?;
    check_length(data, offset + 32 + len)?;
    Ok(data[offset + 32..offset + 32 + len].to_vec())
}

fn check_length(data: &[u8], required: usize) -> Result<(), SdkError> {
    if data.len() < required {
        return Err(SdkError::AbiDecode(format!(
            "Insufficient data: need {} bytes, have {}",
            required,
            data.len()
        )));
    }
    Ok(())
}
