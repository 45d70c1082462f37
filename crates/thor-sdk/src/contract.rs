//! Contract ABI: function and event fragments

use serde::Deserialize;
use thor_primitives::{Address, H256};

use crate::abi::{
    approval_event, decode_output, encode_function_call, function_selector, parse_type,
    transfer_event, DecodedEvent, EventDef, EventParam, IndexedArgs, ParamType, Token,
};
use crate::types::EventCriteria;
use crate::SdkError;

/// Function definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    /// Function name
    pub name: String,
    /// Input parameter types
    pub inputs: Vec<ParamType>,
    /// Output parameter types
    pub outputs: Vec<ParamType>,
}

impl FunctionDef {
    /// Create a new function definition
    pub fn new(name: impl Into<String>, inputs: Vec<ParamType>, outputs: Vec<ParamType>) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
        }
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(ParamType::to_string).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// 4-byte selector
    pub fn selector(&self) -> [u8; 4] {
        function_selector(&self.signature())
    }

    /// Encode call data
    pub fn encode_input(&self, args: &[Token]) -> Result<Vec<u8>, SdkError> {
        encode_function_call(self.selector(), &self.inputs, args)
    }

    /// Decode return data
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        decode_output(&self.outputs, data)
    }
}

/// A contract interface: named functions and events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abi {
    functions: Vec<FunctionDef>,
    events: Vec<EventDef>,
}

impl Abi {
    /// Empty interface
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a standard JSON ABI document.
    pub fn from_json(json: &str) -> Result<Self, SdkError> {
        let entries: Vec<JsonEntry> = serde_json::from_str(json)?;
        let mut abi = Abi::new();
        for entry in entries {
            match entry.kind.as_str() {
                "function" => {
                    let inputs = entry
                        .inputs
                        .iter()
                        .map(JsonParam::param_type)
                        .collect::<Result<Vec<_>, _>>()?;
                    let outputs = entry
                        .outputs
                        .iter()
                        .map(JsonParam::param_type)
                        .collect::<Result<Vec<_>, _>>()?;
                    abi.functions.push(FunctionDef::new(entry.name, inputs, outputs));
                }
                "event" => {
                    let inputs = entry
                        .inputs
                        .iter()
                        .map(|p| Ok(EventParam::new(p.name.clone(), p.param_type()?, p.indexed)))
                        .collect::<Result<Vec<_>, SdkError>>()?;
                    let mut event = EventDef::new(entry.name, inputs);
                    event.anonymous = entry.anonymous;
                    abi.events.push(event);
                }
                // constructor, fallback, receive, error
                _ => {}
            }
        }
        Ok(abi)
    }

    /// Add a function with builder pattern
    pub fn with_function(mut self, function: FunctionDef) -> Self {
        self.functions.push(function);
        self
    }

    /// Add an event with builder pattern
    pub fn with_event(mut self, event: EventDef) -> Self {
        self.events.push(event);
        self
    }

    /// Get a function by name
    pub fn function(&self, name: &str) -> Result<&FunctionDef, SdkError> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SdkError::InvalidAbiItem(format!("unknown function: {}", name)))
    }

    /// Get an event by name
    pub fn event(&self, name: &str) -> Result<&EventDef, SdkError> {
        self.events
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| SdkError::InvalidAbiItem(format!("unknown event: {}", name)))
    }

    /// Find the event whose selector equals `topic0`
    pub fn event_by_selector(&self, topic0: &H256) -> Option<&EventDef> {
        self.events
            .iter()
            .find(|e| !e.anonymous && e.selector() == *topic0)
    }

    /// Encode a function call
    pub fn encode_call(&self, function: &str, args: &[Token]) -> Result<Vec<u8>, SdkError> {
        self.function(function)?.encode_input(args)
    }

    /// Decode function output
    pub fn decode_output(&self, function: &str, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        self.function(function)?.decode_output(data)
    }

    /// Criteria for `event` emitted by `address`
    pub fn criteria(
        &self,
        event: &str,
        address: Option<Address>,
        args: &IndexedArgs,
    ) -> Result<EventCriteria, SdkError> {
        self.event(event)?.criteria(address, args)
    }

    /// Decode a log using the event its topic0 names
    pub fn parse_log(&self, data: &[u8], topics: &[H256]) -> Result<DecodedEvent, SdkError> {
        let topic0 = topics
            .first()
            .ok_or_else(|| SdkError::InvalidAbiItem("log has no topics".to_string()))?;
        self.event_by_selector(topic0)
            .ok_or_else(|| SdkError::InvalidAbiItem(format!("no event with selector {}", topic0)))?
            .parse_log(data, topics)
    }
}

#[derive(Debug, Deserialize)]
struct JsonEntry {
    #[serde(rename = "type", default = "default_entry_kind")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<JsonParam>,
    #[serde(default)]
    outputs: Vec<JsonParam>,
    #[serde(default)]
    anonymous: bool,
}

fn default_entry_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct JsonParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    indexed: bool,
    #[serde(default)]
    components: Vec<JsonParam>,
}

impl JsonParam {
    fn canonical(&self) -> String {
        match self.kind.strip_prefix("tuple") {
            Some(suffix) => {
                let inner: Vec<String> = self.components.iter().map(JsonParam::canonical).collect();
                format!("({}){}", inner.join(","), suffix)
            }
            None => self.kind.clone(),
        }
    }

    fn param_type(&self) -> Result<ParamType, SdkError> {
        parse_type(&self.canonical())
    }
}

/// The standard ERC-20 interface
pub fn erc20() -> Abi {
    let address = ParamType::Address;
    let amount = ParamType::Uint(256);
    Abi::new()
        .with_function(FunctionDef::new("name", vec![], vec![ParamType::String]))
        .with_function(FunctionDef::new("symbol", vec![], vec![ParamType::String]))
        .with_function(FunctionDef::new("decimals", vec![], vec![ParamType::Uint(8)]))
        .with_function(FunctionDef::new("totalSupply", vec![], vec![amount.clone()]))
        .with_function(FunctionDef::new(
            "balanceOf",
            vec![address.clone()],
            vec![amount.clone()],
        ))
        .with_function(FunctionDef::new(
            "transfer",
            vec![address.clone(), amount.clone()],
            vec![ParamType::Bool],
        ))
        .with_function(FunctionDef::new(
            "approve",
            vec![address.clone(), amount.clone()],
            vec![ParamType::Bool],
        ))
        .with_function(FunctionDef::new(
            "allowance",
            vec![address.clone(), address.clone()],
            vec![amount.clone()],
        ))
        .with_function(FunctionDef::new(
            "transferFrom",
            vec![address.clone(), address, amount],
            vec![ParamType::Bool],
        ))
        .with_event(transfer_event())
        .with_event(approval_event())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_FRAGMENT: &str = r#"[
        {"type":"function","name":"balanceOf","stateMutability":"view",
         "inputs":[{"name":"owner","type":"address"}],
         "outputs":[{"name":"","type":"uint256"}]},
        {"type":"event","name":"Transfer","anonymous":false,
         "inputs":[{"name":"from","type":"address","indexed":true},
                   {"name":"to","type":"address","indexed":true},
                   {"name":"value","type":"uint256","indexed":false}]},
        {"type":"function","name":"submit",
         "inputs":[{"name":"order","type":"tuple[]","components":[
             {"name":"maker","type":"address"},{"name":"amounts","type":"uint128[2]"}]}],
         "outputs":[]},
        {"type":"constructor","inputs":[]}
    ]"#;

    #[test]
    fn test_erc20_selectors() {
        let abi = erc20();
        assert_eq!(abi.function("transfer").unwrap().selector(), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(abi.function("balanceOf").unwrap().selector(), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(
            abi.event("Transfer").unwrap().selector().to_hex(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_from_json() {
        let abi = Abi::from_json(ERC20_FRAGMENT).unwrap();
        assert_eq!(abi.function("balanceOf").unwrap().signature(), "balanceOf(address)");
        assert_eq!(
            abi.function("submit").unwrap().signature(),
            "submit((address,uint128[2])[])"
        );
        assert_eq!(abi.event("Transfer").unwrap(), &transfer_event());
    }

    #[test]
    fn test_encode_call_and_decode_output() {
        let abi = erc20();
        let data = abi
            .encode_call("balanceOf", &[Token::Address(Address::ZERO)])
            .unwrap();
        assert_eq!(data.len(), 36);
        let mut word = [0u8; 32];
        word[31] = 42;
        assert_eq!(abi.decode_output("balanceOf", &word).unwrap(), vec![Token::uint(42)]);
    }

    #[test]
    fn test_unknown_items() {
        let abi = erc20();
        assert!(matches!(abi.function("mint"), Err(SdkError::InvalidAbiItem(_))));
        assert!(matches!(abi.event("Mint"), Err(SdkError::InvalidAbiItem(_))));
        assert!(abi.encode_call("transfer", &[]).is_err());
    }

    #[test]
    fn test_parse_log_by_selector() {
        let abi = erc20();
        let event = abi.event("Approval").unwrap();
        let values = [
            Token::Address(Address::from_bytes([1; 20])),
            Token::Address(Address::from_bytes([2; 20])),
            Token::uint(77),
        ];
        let (topics, data) = event.encode_log(&values).unwrap();
        let decoded = abi.parse_log(&data, &topics).unwrap();
        assert_eq!(decoded.name, "Approval");
        assert_eq!(decoded.values(), values.to_vec());
    }
}
