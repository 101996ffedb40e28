//! Messages exchanged between the two contexts.
//!
//! Outbound: `{correlationId, functionName, args[], classTag?, refId?,
//! preload?, transfer?, releaseImmediately?, resultClassTag?, isStaticCall?}`.
//! Inbound: `{correlationId, response | error}`, where an object-typed
//! response is `{refId, classTag}` plus any preloaded accessor values.

use crate::domain::correlation::CorrelationId;
use crate::domain::fault::BridgeFault;
use sc_01_handle_registry::RefId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A marshaled argument or scalar result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
    /// Reference to an object owned by the computation context.
    Handle {
        #[serde(rename = "refId")]
        ref_id: RefId,
        #[serde(rename = "classTag")]
        class_tag: String,
    },
}

impl WireValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            WireValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            WireValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            WireValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            WireValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Short variant name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Bool(_) => "bool",
            WireValue::Int(_) => "int",
            WireValue::Str(_) => "string",
            WireValue::Bytes(_) => "bytes",
            WireValue::Handle { .. } => "handle",
        }
    }
}

/// Outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMessage {
    pub correlation_id: CorrelationId,
    pub function_name: String,
    #[serde(default)]
    pub args: Vec<WireValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<RefId>,
    /// Result key -> zero-argument accessor run against an object result.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub preload: BTreeMap<String, String>,
    /// Positions in `args` whose buffers were moved rather than copied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfer: Vec<usize>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub release_immediately: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_class_tag: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_static_call: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl CallMessage {
    /// Free-function call with no arguments. The correlation id is assigned
    /// at dispatch.
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId::from_raw(0),
            function_name: function_name.into(),
            args: Vec::new(),
            class_tag: None,
            ref_id: None,
            preload: BTreeMap::new(),
            transfer: Vec::new(),
            release_immediately: false,
            result_class_tag: None,
            is_static_call: false,
        }
    }
}

/// Successful result of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    /// Object-typed result, now owned by the caller.
    #[serde(rename_all = "camelCase")]
    Object {
        ref_id: RefId,
        class_tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        preloaded: BTreeMap<String, WireValue>,
    },
    /// Scalar or buffer result.
    Value(WireValue),
}

/// Body of an inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseBody {
    Response(Reply),
    Error(BridgeFault),
}

/// Inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    pub correlation_id: CorrelationId,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl BridgeResponse {
    pub fn new(correlation_id: CorrelationId, outcome: Result<Reply, BridgeFault>) -> Self {
        let body = match outcome {
            Ok(reply) => ResponseBody::Response(reply),
            Err(fault) => ResponseBody::Error(fault),
        };
        Self {
            correlation_id,
            body,
        }
    }

    pub fn into_outcome(self) -> Result<Reply, BridgeFault> {
        match self.body {
            ResponseBody::Response(reply) => Ok(reply),
            ResponseBody::Error(fault) => Err(fault),
        }
    }
}
