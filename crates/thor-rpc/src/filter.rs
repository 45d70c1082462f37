//! Log filter objects of `eth_getLogs` and `eth_subscribe("logs")`
//!
//! An Ethereum filter allows several addresses and, per topic slot, several
//! alternatives. Native criteria hold one value per field, so a filter
//! expands to the cartesian product of its alternatives; the native node
//! ORs the resulting criteria set.

use serde_json::Value;
use thor_primitives::{Address, H256};
use thor_sdk::types::EventCriteria;

use crate::error::RpcError;
use crate::types::{parse_address, parse_block_param, parse_h256, BlockParam};

/// Native criteria carry at most five topic slots
pub const MAX_TOPICS: usize = 5;

/// Parsed filter object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Emitting contracts; empty matches any
    pub addresses: Vec<Address>,
    /// Per slot alternatives; `None` is a wildcard
    pub topics: Vec<Option<Vec<H256>>>,
    /// Lower bound
    pub from_block: Option<BlockParam>,
    /// Upper bound
    pub to_block: Option<BlockParam>,
    /// Single block; excludes `from_block`/`to_block`
    pub block_hash: Option<H256>,
}

fn parse_addresses(value: &Value) -> Result<Vec<Address>, RpcError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(_) => Ok(vec![parse_address(value)?]),
        Value::Array(items) => items.iter().map(parse_address).collect(),
        _ => Err(RpcError::invalid_params("address must be a string or an array")),
    }
}

fn parse_topic_slot(value: &Value) -> Result<Option<Vec<H256>>, RpcError> {
    match value {
        Value::Null => Ok(None),
        Value::String(_) => Ok(Some(vec![parse_h256(value)?])),
        Value::Array(items) if items.is_empty() => Ok(None),
        Value::Array(items) => items
            .iter()
            .map(parse_h256)
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        _ => Err(RpcError::invalid_params("topic must be null, a string or an array")),
    }
}

fn optional_block(value: Option<&Value>) -> Result<Option<BlockParam>, RpcError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => parse_block_param(v).map(Some),
    }
}

impl LogFilter {
    /// Parse a filter object
    pub fn from_value(value: &Value) -> Result<Self, RpcError> {
        let object = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            _ => return Err(RpcError::invalid_params("filter must be an object")),
        };

        let topics = match object.get("topics") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(slots)) => {
                if slots.len() > MAX_TOPICS {
                    return Err(RpcError::invalid_params(format!(
                        "at most {} topics are supported",
                        MAX_TOPICS
                    )));
                }
                slots.iter().map(parse_topic_slot).collect::<Result<_, _>>()?
            }
            Some(_) => return Err(RpcError::invalid_params("topics must be an array")),
        };

        let filter = Self {
            addresses: parse_addresses(object.get("address").unwrap_or(&Value::Null))?,
            topics,
            from_block: optional_block(object.get("fromBlock"))?,
            to_block: optional_block(object.get("toBlock"))?,
            block_hash: match object.get("blockHash") {
                None | Some(Value::Null) => None,
                Some(v) => Some(parse_h256(v)?),
            },
        };

        if filter.block_hash.is_some() && (filter.from_block.is_some() || filter.to_block.is_some()) {
            return Err(RpcError::invalid_params(
                "blockHash cannot be combined with fromBlock/toBlock",
            ));
        }
        Ok(filter)
    }

    /// Native criteria set: one entry per combination of address and
    /// topic alternatives. A filter without constraints yields one
    /// wildcard entry.
    pub fn criteria_set(&self) -> Vec<EventCriteria> {
        let addresses: Vec<Option<Address>> = if self.addresses.is_empty() {
            vec![None]
        } else {
            self.addresses.iter().copied().map(Some).collect()
        };

        let mut set: Vec<EventCriteria> = addresses
            .into_iter()
            .map(|address| EventCriteria {
                address,
                ..Default::default()
            })
            .collect();

        for (slot, alternatives) in self.topics.iter().enumerate() {
            let Some(alternatives) = alternatives else {
                continue;
            };
            set = set
                .into_iter()
                .flat_map(|criteria| {
                    alternatives.iter().map(move |topic| {
                        let mut next = criteria.clone();
                        next.set_topic(slot, *topic);
                        next
                    })
                })
                .collect();
        }
        set
    }
}
