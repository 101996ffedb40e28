//! Application envelope: `{graphql, variables?}` out, `{data, errors?}` in.

use crate::domain::errors::ChannelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize)]
struct Request<'a> {
    graphql: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<&'a Value>,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

/// Serialize an outbound query.
pub fn encode_request(graphql: &str, variables: Option<&Value>) -> Result<Vec<u8>, ChannelError> {
    serde_json::to_vec(&Request { graphql, variables })
        .map_err(|e| ChannelError::Envelope(e.to_string()))
}

/// Parse a decrypted response.
///
/// A non-empty `errors` list wins over any data. A `data` object with a
/// single key is replaced by that key's value.
pub fn decode_response(payload: &[u8]) -> Result<Value, ChannelError> {
    let response: Response =
        serde_json::from_slice(payload).map_err(|e| ChannelError::Envelope(e.to_string()))?;

    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        return Err(ChannelError::Application(errors));
    }

    match response.data {
        Value::Object(mut map) if map.len() == 1 => {
            let key = map.keys().next().cloned().unwrap_or_default();
            Ok(map.remove(&key).unwrap_or(Value::Null))
        }
        data => Ok(data),
    }
}
