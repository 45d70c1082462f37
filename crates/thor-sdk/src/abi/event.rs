//! Event fragments: selectors, criteria construction and log decoding

use thor_crypto::keccak256;
use thor_primitives::{Address, H256};

use super::decode::{decode, decode_word};
use super::encode::encode;
use super::types::{ParamType, Token};
use crate::types::EventCriteria;
use crate::SdkError;

/// Most topic slots a log can carry
const MAX_TOPICS: usize = 5;

/// One input of an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    /// Parameter name (may be empty)
    pub name: String,
    /// Declared type
    pub kind: ParamType,
    /// Whether the value is stored in a topic
    pub indexed: bool,
}

impl EventParam {
    /// Create a parameter
    pub fn new(name: impl Into<String>, kind: ParamType, indexed: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed,
        }
    }
}

/// Event ABI fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDef {
    /// Event name
    pub name: String,
    /// Inputs in declaration order
    pub inputs: Vec<EventParam>,
    /// Anonymous events have no selector topic
    pub anonymous: bool,
}

/// Values for indexed arguments used to narrow a criteria entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexedArgs {
    /// One entry per indexed input, in declaration order; `None` is a wildcard.
    Positional(Vec<Option<Token>>),
    /// Values keyed by input name; absent names are wildcards.
    Named(Vec<(String, Token)>),
}

impl Default for IndexedArgs {
    fn default() -> Self {
        IndexedArgs::Positional(Vec::new())
    }
}

/// A decoded log, values in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    /// Event name
    pub name: String,
    /// `(name, value)` pairs. Dynamic indexed values come back as their
    /// 32-byte topic hash in a `FixedBytes` token.
    pub params: Vec<(String, Token)>,
}

impl DecodedEvent {
    /// Values without names
    pub fn values(&self) -> Vec<Token> {
        self.params.iter().map(|(_, v)| v.clone()).collect()
    }

    /// Look a value up by input name
    pub fn get(&self, name: &str) -> Option<&Token> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl EventDef {
    /// Create a non-anonymous event
    pub fn new(name: impl Into<String>, inputs: Vec<EventParam>) -> Self {
        Self {
            name: name.into(),
            inputs,
            anonymous: false,
        }
    }

    /// Mark the event anonymous
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Canonical signature, e.g. `Transfer(address,address,uint256)`
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.kind.to_string()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// keccak256 of the signature; topic0 of every non-anonymous log
    pub fn selector(&self) -> H256 {
        keccak256(self.signature().as_bytes())
    }

    fn indexed(&self) -> impl Iterator<Item = &EventParam> {
        self.inputs.iter().filter(|p| p.indexed)
    }

    fn first_indexed_slot(&self) -> usize {
        if self.anonymous {
            0
        } else {
            1
        }
    }

    /// Build a criteria entry: topic0 is the selector (unless anonymous),
    /// the following slots come from `args` in declaration order.
    pub fn criteria(
        &self,
        address: Option<Address>,
        args: &IndexedArgs,
    ) -> Result<EventCriteria, SdkError> {
        let indexed: Vec<&EventParam> = self.indexed().collect();
        let first = self.first_indexed_slot();
        if first + indexed.len() > MAX_TOPICS {
            return Err(SdkError::InvalidAbiItem(format!(
                "event {} has too many indexed inputs",
                self.name
            )));
        }

        let values: Vec<Option<Token>> = match args {
            IndexedArgs::Positional(values) => {
                if values.len() > indexed.len() {
                    return Err(SdkError::AbiEncode(format!(
                        "event {} has {} indexed inputs, got {} values",
                        self.name,
                        indexed.len(),
                        values.len()
                    )));
                }
                let mut padded = values.clone();
                padded.resize(indexed.len(), None);
                padded
            }
            IndexedArgs::Named(pairs) => {
                for (name, _) in pairs {
                    if !indexed.iter().any(|p| &p.name == name) {
                        return Err(SdkError::AbiEncode(format!(
                            "event {} has no indexed input named {}",
                            self.name, name
                        )));
                    }
                }
                indexed
                    .iter()
                    .map(|p| {
                        pairs
                            .iter()
                            .find(|(name, _)| name == &p.name)
                            .map(|(_, v)| v.clone())
                    })
                    .collect()
            }
        };

        let mut criteria = EventCriteria {
            address,
            ..Default::default()
        };
        if !self.anonymous {
            criteria.set_topic(0, self.selector());
        }
        for (i, (param, value)) in indexed.iter().zip(values).enumerate() {
            if let Some(value) = value {
                criteria.set_topic(first + i, topic_for(&param.kind, &value)?);
            }
        }
        Ok(criteria)
    }

    /// Decode a log's `data` and `topics`. Fails with `InvalidAbiItem` when
    /// the log was not emitted by this event.
    pub fn parse_log(&self, data: &[u8], topics: &[H256]) -> Result<DecodedEvent, SdkError> {
        let indexed_topics = if self.anonymous {
            topics
        } else {
            match topics.first() {
                Some(topic0) if *topic0 == self.selector() => &topics[1..],
                Some(topic0) => {
                    return Err(SdkError::InvalidAbiItem(format!(
                        "topic0 {} does not match event {}",
                        topic0,
                        self.signature()
                    )))
                }
                None => {
                    return Err(SdkError::InvalidAbiItem(format!(
                        "log has no topics for event {}",
                        self.signature()
                    )))
                }
            }
        };

        let indexed_count = self.indexed().count();
        if indexed_topics.len() != indexed_count {
            return Err(SdkError::InvalidAbiItem(format!(
                "event {} expects {} indexed topics, log has {}",
                self.signature(),
                indexed_count,
                indexed_topics.len()
            )));
        }

        let body_types: Vec<ParamType> = self
            .inputs
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.kind.clone())
            .collect();
        let mut body = decode(&body_types, data)?.into_iter();
        let mut topic_iter = indexed_topics.iter();

        let mut params = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let value = if input.indexed {
                let topic = topic_iter
                    .next()
                    .ok_or_else(|| SdkError::AbiDecode("missing topic".to_string()))?;
                if input.kind.is_dynamic() {
                    Token::FixedBytes(topic.as_bytes().to_vec())
                } else {
                    decode_word(&input.kind, topic.as_bytes())?
                }
            } else {
                body.next()
                    .ok_or_else(|| SdkError::AbiDecode("missing data value".to_string()))?
            };
            params.push((input.name.clone(), value));
        }

        Ok(DecodedEvent {
            name: self.name.clone(),
            params,
        })
    }

    /// Produce the topics and data a contract would emit for `values`.
    pub fn encode_log(&self, values: &[Token]) -> Result<(Vec<H256>, Vec<u8>), SdkError> {
        if values.len() != self.inputs.len() {
            return Err(SdkError::AbiEncode(format!(
                "event {} has {} inputs, got {} values",
                self.name,
                self.inputs.len(),
                values.len()
            )));
        }
        let mut topics = Vec::new();
        if !self.anonymous {
            topics.push(self.selector());
        }
        let mut body_types = Vec::new();
        let mut body_values = Vec::new();
        for (input, value) in self.inputs.iter().zip(values) {
            if input.indexed {
                topics.push(topic_for(&input.kind, value)?);
            } else {
                body_types.push(input.kind.clone());
                body_values.push(value.clone());
            }
        }
        let data = encode(&body_types, &body_values)?;
        Ok((topics, data))
    }
}

/// Topic word for an indexed value. Static values are stored as their
/// 32-byte encoding, strings and bytes as the hash of their contents, other
/// dynamic values as the hash of their encoding.
pub fn topic_for(kind: &ParamType, value: &Token) -> Result<H256, SdkError> {
    if !value.type_check(kind) {
        return Err(SdkError::AbiEncode(format!(
            "value {:?} does not match indexed type {}",
            value, kind
        )));
    }
    match value {
        Token::String(s) => Ok(keccak256(s.as_bytes())),
        Token::Bytes(b) => Ok(keccak256(b)),
        _ if kind.is_dynamic() || kind.head_len() != 32 => {
            Ok(keccak256(encode(std::slice::from_ref(kind), std::slice::from_ref(value))?))
        }
        _ => {
            let encoded = encode(std::slice::from_ref(kind), std::slice::from_ref(value))?;
            Ok(H256::from_slice(&encoded)?)
        }
    }
}

/// The standard `Transfer(address indexed from, address indexed to, uint256 value)` event
pub fn transfer_event() -> EventDef {
    EventDef::new(
        "Transfer",
        vec![
            EventParam::new("from", ParamType::Address, true),
            EventParam::new("to", ParamType::Address, true),
            EventParam::new("value", ParamType::Uint(256), false),
        ],
    )
}

/// The standard `Approval(address indexed owner, address indexed spender, uint256 value)` event
pub fn approval_event() -> EventDef {
    EventDef::new(
        "Approval",
        vec![
            EventParam::new("owner", ParamType::Address, true),
            EventParam::new("spender", ParamType::Address, true),
            EventParam::new("value", ParamType::Uint(256), false),
        ],
    )
}
