use bytes::Bytes;
use ethtrace_common::{
    Address, U256,
    serde_utils,
    tracing::{TraceType, TraceTypeSet},
    types::{CallParameters, TxKind},
};
use serde::Deserialize;
use serde_json::Value;

use super::errors::TraceCallError;

/// Call object as sent by the client, before any structural check.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCall {
    #[serde(default)]
    from: Option<Address>,
    #[serde(default)]
    to: Option<Address>,
    #[serde(default, deserialize_with = "serde_utils::u64::hex_str_opt::deserialize")]
    gas: Option<u64>,
    #[serde(default, deserialize_with = "serde_utils::u256::hex_str_opt::deserialize")]
    gas_price: Option<U256>,
    #[serde(default, deserialize_with = "serde_utils::u256::hex_str_opt::deserialize")]
    max_fee_per_gas: Option<U256>,
    #[serde(default, deserialize_with = "serde_utils::u256::hex_str_opt::deserialize")]
    max_priority_fee_per_gas: Option<U256>,
    #[serde(default, deserialize_with = "serde_utils::u256::hex_str_opt::deserialize")]
    value: Option<U256>,
    #[serde(default, deserialize_with = "serde_utils::bytes::opt::deserialize")]
    data: Option<Bytes>,
    #[serde(default, deserialize_with = "serde_utils::bytes::opt::deserialize")]
    input: Option<Bytes>,
    #[serde(default, deserialize_with = "serde_utils::u64::hex_str_opt::deserialize")]
    nonce: Option<u64>,
}

/// Decodes the call object and checks its fields do not contradict each other.
pub fn validate_call(raw: &Value) -> Result<CallParameters, TraceCallError> {
    let raw: RawCall = serde_json::from_value(raw.clone())
        .map_err(|err| TraceCallError::MalformedCallParameters(err.to_string()))?;

    if raw.gas_price.is_some()
        && (raw.max_fee_per_gas.is_some() || raw.max_priority_fee_per_gas.is_some())
    {
        return Err(TraceCallError::MalformedCallParameters(
            "gasPrice cannot be combined with maxFeePerGas or maxPriorityFeePerGas".to_string(),
        ));
    }
    if let (Some(max_fee), Some(priority_fee)) =
        (raw.max_fee_per_gas, raw.max_priority_fee_per_gas)
    {
        if priority_fee > max_fee {
            return Err(TraceCallError::MalformedCallParameters(format!(
                "maxPriorityFeePerGas ({priority_fee}) is greater than maxFeePerGas ({max_fee})"
            )));
        }
    }
    let input = match (raw.input, raw.data) {
        (Some(input), Some(data)) if input != data => {
            return Err(TraceCallError::MalformedCallParameters(
                "data and input are both set and differ".to_string(),
            ));
        }
        (Some(input), _) => input,
        (None, data) => data.unwrap_or_default(),
    };

    Ok(CallParameters {
        from: raw.from,
        to: TxKind::from(raw.to),
        gas: raw.gas,
        gas_price: raw.gas_price,
        max_fee_per_gas: raw.max_fee_per_gas,
        max_priority_fee_per_gas: raw.max_priority_fee_per_gas,
        value: raw.value.unwrap_or_default(),
        input,
        nonce: raw.nonce,
    })
}

/// Reads the list of requested trace kinds, which must hold at least one known kind.
pub fn parse_trace_types(raw: &Value) -> Result<TraceTypeSet, TraceCallError> {
    let Value::Array(tokens) = raw else {
        return Err(TraceCallError::UnsupportedTraceKind(format!(
            "expected a list of trace types, got {raw}"
        )));
    };
    if tokens.is_empty() {
        return Err(TraceCallError::UnsupportedTraceKind(
            "no trace type requested".to_string(),
        ));
    }
    tokens
        .iter()
        .map(|token| match token {
            Value::String(name) => name
                .parse::<TraceType>()
                .map_err(|err| TraceCallError::UnsupportedTraceKind(err.to_string())),
            other => Err(TraceCallError::UnsupportedTraceKind(format!(
                "trace types must be strings, got {other}"
            ))),
        })
        .collect()
}
