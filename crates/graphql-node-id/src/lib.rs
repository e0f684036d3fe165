//! The request-time half of global object identification: encoding entity
//! representations into opaque identifiers and resolving `node` lookups back
//! into representations.
//!
//! An identifier is `base64(typename ":" transform(canonical_json(key)))`.
//! Canonical JSON sorts record keys recursively, so the same logical entity
//! always yields the same identifier regardless of the field ordering in the
//! caller's representation.

#![forbid(unsafe_code)]

mod lookup;

pub use lookup::{NodeResponse, handle_node_request};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Map, Value};

/// Errors of the identifier layer. All of them are recoverable per lookup
/// slot; see [handle_node_request].
#[derive(Debug, thiserror::Error)]
pub enum NodeIdError {
    #[error("invalid base64 in node id: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("node id is not valid utf-8")]
    InvalidUtf8,
    #[error("malformed node id payload")]
    MalformedPayload,
    #[error("invalid node id key payload: {0}")]
    InvalidKeyJson(#[from] serde_json::Error),
    #[error("an entity representation must be an object")]
    InvalidRepresentation,
    #[error("the `node` field requires an `id` argument")]
    MissingIdArgument,
    #[error("the id argument must be a string literal or a variable")]
    UnsupportedIdArgument,
    #[error("unknown variable `${0}`")]
    UnknownVariable(String),
    #[error("transform failed: {0}")]
    Transform(String),
}

/// A caller-pluggable, invertible payload transformation, applied between
/// canonical JSON and base64. The default passes the payload through
/// unchanged; an encryption or compression pair slots in here as long as
/// `invert(apply(x)) == x`.
pub trait Transform {
    fn apply(&self, payload: &str) -> Result<String, NodeIdError>;
    fn invert(&self, payload: &str) -> Result<String, NodeIdError>;
}

/// The default transform: the canonical JSON payload is the identifier
/// payload.
pub struct NoopTransform;

impl Transform for NoopTransform {
    fn apply(&self, payload: &str) -> Result<String, NodeIdError> {
        Ok(payload.to_owned())
    }

    fn invert(&self, payload: &str) -> Result<String, NodeIdError> {
        Ok(payload.to_owned())
    }
}

/// Encodes an entity representation into an opaque identifier. The
/// representation must be an object; a `__typename` entry is dropped since
/// the concrete type name is carried separately.
pub fn encode_node_id(typename: &str, representation: &Value, transform: &dyn Transform) -> Result<String, NodeIdError> {
    let Value::Object(representation) = representation else {
        return Err(NodeIdError::InvalidRepresentation);
    };

    let mut key = representation.clone();
    key.remove("__typename");

    let canonical = canonical_json(&Value::Object(key));
    let payload = transform.apply(&serde_json::to_string(&canonical)?)?;

    Ok(STANDARD.encode(format!("{typename}:{payload}")))
}

/// The two halves of a decoded identifier.
#[derive(Debug)]
pub struct DecodedNodeId {
    /// The concrete type name of the identified entity.
    pub typename: String,
    /// The key fields identifying the entity instance.
    pub key_fields: Map<String, Value>,
}

/// Decodes an identifier produced by [encode_node_id] with the paired
/// transform.
pub fn decode_node_id(id: &str, transform: &dyn Transform) -> Result<DecodedNodeId, NodeIdError> {
    let decoded = String::from_utf8(STANDARD.decode(id)?).map_err(|_| NodeIdError::InvalidUtf8)?;

    let (typename, payload) = decoded.split_once(':').ok_or(NodeIdError::MalformedPayload)?;

    if typename.is_empty() {
        return Err(NodeIdError::MalformedPayload);
    }

    let key_json = transform.invert(payload)?;

    match serde_json::from_str(&key_json)? {
        Value::Object(key_fields) => Ok(DecodedNodeId {
            typename: typename.to_owned(),
            key_fields,
        }),
        _ => Err(NodeIdError::MalformedPayload),
    }
}

/// Recursively sorts record keys, applying the same rule to values inside
/// sequences.
pub fn canonical_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());

            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonical_json(value)))
                    .collect(),
            )
        }
        Value::Array(values) => Value::Array(values.iter().map(canonical_json).collect()),
        other => other.clone(),
    }
}
