//! ABI encoding

use thor_primitives::U256;

use super::types::{ParamType, Token};
use crate::SdkError;

/// Encode `tokens` against declared `types`.
pub fn encode(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, SdkError> {
    if types.len() != tokens.len() {
        return Err(SdkError::AbiEncode(format!(
            "expected {} values, got {}",
            types.len(),
            tokens.len()
        )));
    }
    for (ty, token) in types.iter().zip(tokens) {
        if !token.type_check(ty) {
            return Err(SdkError::AbiEncode(format!(
                "value {:?} does not match type {}",
                token, ty
            )));
        }
    }
    Ok(encode_params(types, tokens))
}

/// Encode tokens using their inferred types
pub fn encode_tokens(tokens: &[Token]) -> Vec<u8> {
    let types: Vec<ParamType> = tokens.iter().map(Token::type_of).collect();
    encode_params(&types, tokens)
}

/// Selector followed by encoded arguments
pub fn encode_function_call(
    selector: [u8; 4],
    types: &[ParamType],
    tokens: &[Token],
) -> Result<Vec<u8>, SdkError> {
    let mut result = selector.to_vec();
    result.extend(encode(types, tokens)?);
    Ok(result)
}

fn encode_params(types: &[ParamType], tokens: &[Token]) -> Vec<u8> {
    let head_size: usize = types.iter().map(ParamType::head_len).sum();

    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (param_type, token) in types.iter().zip(tokens) {
        if param_type.is_dynamic() {
            head.extend(word_from_usize(head_size + tail.len()));
            tail.extend(encode_token(param_type, token));
        } else {
            head.extend(encode_token(param_type, token));
        }
    }

    head.extend(tail);
    head
}

fn encode_token(param_type: &ParamType, token: &Token) -> Vec<u8> {
    match (param_type, token) {
        (ParamType::Address, Token::Address(addr)) => addr.to_word().to_vec(),
        (ParamType::Uint(_), Token::Uint(value)) => word_from_u256(value).to_vec(),
        (ParamType::Int(_), Token::Int(value)) => value.to_word().to_vec(),
        (ParamType::Bool, Token::Bool(b)) => {
            let mut word = [0u8; 32];
            word[31] = u8::from(*b);
            word.to_vec()
        }
        (ParamType::FixedBytes(_), Token::FixedBytes(data)) => {
            let mut word = [0u8; 32];
            let len = data.len().min(32);
            word[..len].copy_from_slice(&data[..len]);
            word.to_vec()
        }
        (ParamType::Bytes, Token::Bytes(data)) => encode_bytes(data),
        (ParamType::String, Token::String(s)) => encode_bytes(s.as_bytes()),
        (ParamType::Array(inner), Token::Array(tokens)) => {
            let mut result = word_from_usize(tokens.len()).to_vec();
            let inner_types = vec![(**inner).clone(); tokens.len()];
            result.extend(encode_params(&inner_types, tokens));
            result
        }
        (ParamType::FixedArray(inner, _), Token::FixedArray(tokens)) => {
            let inner_types = vec![(**inner).clone(); tokens.len()];
            encode_params(&inner_types, tokens)
        }
        (ParamType::Tuple(types), Token::Tuple(tokens)) => encode_params(types, tokens),
        // encode() type-checks first; inferred types always match.
        _ => vec![0u8; 32],
    }
}

/// Big-endian 32-byte word
pub(crate) fn word_from_u256(value: &U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}

fn word_from_usize(value: usize) -> [u8; 32] {
    word_from_u256(&U256::from(value))
}

fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut result = word_from_usize(data.len()).to_vec();
    let padded_len = data.len().div_ceil(32) * 32;
    let mut padded = vec![0u8; padded_len];
    padded[..data.len()].copy_from_slice(data);
    result.extend(padded);
    result
}

/// First 4 bytes of keccak256(signature)
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = thor_crypto::keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash.as_bytes()[..4]);
    selector
}

/// Parse a canonical Solidity type string such as `uint256`, `bytes32[]`,
/// `(address,uint8)[2]`.
pub fn parse_type(s: &str) -> Result<ParamType, SdkError> {
    let s = s.trim();

    if let Some(stripped) = s.strip_suffix(']') {
        let open = stripped
            .rfind('[')
            .ok_or_else(|| SdkError::AbiEncode(format!("Unknown type: {}", s)))?;
        let inner = parse_type(&stripped[..open])?;
        let size = &stripped[open + 1..];
        if size.is_empty() {
            return Ok(ParamType::Array(Box::new(inner)));
        }
        let size: usize = size
            .parse()
            .map_err(|_| SdkError::AbiEncode(format!("Invalid array size: {}", size)))?;
        return Ok(ParamType::FixedArray(Box::new(inner), size));
    }

    if let Some(body) = s.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        return split_tuple(body)?
            .into_iter()
            .map(parse_type)
            .collect::<Result<Vec<_>, _>>()
            .map(ParamType::Tuple);
    }

    match s {
        "address" => return Ok(ParamType::Address),
        "bool" => return Ok(ParamType::Bool),
        "string" => return Ok(ParamType::String),
        "bytes" => return Ok(ParamType::Bytes),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("uint") {
        return parse_bits(rest).map(ParamType::Uint);
    }
    if let Some(rest) = s.strip_prefix("int") {
        return parse_bits(rest).map(ParamType::Int);
    }
    if let Some(rest) = s.strip_prefix("bytes") {
        let size: usize = rest
            .parse()
            .map_err(|_| SdkError::AbiEncode(format!("Invalid bytes size: {}", rest)))?;
        if size == 0 || size > 32 {
            return Err(SdkError::AbiEncode(format!("Invalid bytes size: {}", size)));
        }
        return Ok(ParamType::FixedBytes(size));
    }

    Err(SdkError::AbiEncode(format!("Unknown type: {}", s)))
}

fn parse_bits(rest: &str) -> Result<usize, SdkError> {
    if rest.is_empty() {
        return Ok(256);
    }
    let bits: usize = rest
        .parse()
        .map_err(|_| SdkError::AbiEncode(format!("Invalid integer size: {}", rest)))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(SdkError::AbiEncode(format!("Invalid integer size: {}", bits)));
    }
    Ok(bits)
}

/// Split a tuple body on top-level commas
fn split_tuple(body: &str) -> Result<Vec<&str>, SdkError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        if depth < 0 {
            return Err(SdkError::AbiEncode(format!("Unbalanced tuple: ({})", body)));
        }
    }
    if depth != 0 {
        return Err(SdkError::AbiEncode(format!("Unbalanced tuple: ({})", body)));
    }
    parts.push(&body[start..]);
    Ok(parts)
}
