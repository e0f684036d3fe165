//! Resolution of `node` lookup requests against the identifier layer.

use crate::{NodeIdError, Transform, decode_node_id};
use async_graphql_parser::types as ast;
use async_graphql_value::Value as GqlValue;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// The lookup field on the root query type.
const NODE_FIELD_NAME: &str = "node";

/// A GraphQL-shaped response to a lookup request.
pub struct NodeResponse {
    /// One entry per lookup slot, keyed by alias (or `node`). `None` when the
    /// request failed as a whole.
    pub data: Option<Value>,
    /// Errors, each carrying the path of the slot it belongs to, or no path
    /// for request-level failures.
    pub errors: Vec<Value>,
}

impl NodeResponse {
    /// The response as a single JSON document.
    pub fn into_json(self) -> Value {
        let mut response = Map::new();
        response.insert("data".to_owned(), self.data.unwrap_or(Value::Null));

        if !self.errors.is_empty() {
            response.insert("errors".to_owned(), Value::Array(self.errors));
        }

        Value::Object(response)
    }
}

/// Resolves every top-level `node` lookup of a request in one pass.
///
/// Failures are isolated per slot: a malformed identifier nulls its own slot
/// and attaches an error without touching sibling lookups. Only a document
/// that does not parse fails the whole request.
///
/// `cache` is an optional caller-owned map from query text to its parsed
/// form, shareable across invocations; keeping it consistent is the caller's
/// business.
pub fn handle_node_request(
    query: &str,
    variables: &Map<String, Value>,
    transform: &dyn Transform,
    cache: Option<&mut HashMap<String, ast::ExecutableDocument>>,
) -> NodeResponse {
    let document = match parse_with_cache(query, cache) {
        Ok(document) => document,
        Err(err) => {
            return NodeResponse {
                data: None,
                errors: vec![json!({ "message": format!("failed to parse the lookup document: {err}") })],
            };
        }
    };

    let operation = match &document.operations {
        ast::DocumentOperations::Single(operation) => &operation.node,
        ast::DocumentOperations::Multiple(_) => {
            return NodeResponse {
                data: None,
                errors: vec![json!({ "message": "the lookup document must contain a single operation" })],
            };
        }
    };

    let mut data = Map::new();
    let mut errors = Vec::new();

    for item in &operation.selection_set.node.items {
        let ast::Selection::Field(field) = &item.node else { continue };

        if field.node.name.node.as_str() != NODE_FIELD_NAME {
            continue;
        }

        // The alias keys the response slot, so several simultaneous lookups
        // can live in one request.
        let slot = field
            .node
            .alias
            .as_ref()
            .map(|alias| alias.node.to_string())
            .unwrap_or_else(|| NODE_FIELD_NAME.to_owned());

        match resolve_slot(&field.node, variables, transform) {
            Ok(entity) => {
                data.insert(slot, entity);
            }
            Err(err) => {
                errors.push(json!({ "message": err.to_string(), "path": [&slot] }));
                data.insert(slot, Value::Null);
            }
        }
    }

    NodeResponse {
        data: Some(Value::Object(data)),
        errors,
    }
}

/// Decodes one lookup into the minimal representation: the concrete type
/// name, the identifier itself and the decoded key fields.
fn resolve_slot(field: &ast::Field, variables: &Map<String, Value>, transform: &dyn Transform) -> Result<Value, NodeIdError> {
    let argument = field.get_argument("id").ok_or(NodeIdError::MissingIdArgument)?;

    let id = match &argument.node {
        GqlValue::String(id) => id.clone(),
        GqlValue::Variable(name) => match variables.get(name.as_str()) {
            Some(Value::String(id)) => id.clone(),
            Some(_) => return Err(NodeIdError::UnsupportedIdArgument),
            None => return Err(NodeIdError::UnknownVariable(name.to_string())),
        },
        _ => return Err(NodeIdError::UnsupportedIdArgument),
    };

    let decoded = decode_node_id(&id, transform)?;

    let mut entity = Map::new();
    entity.insert("__typename".to_owned(), Value::String(decoded.typename));
    entity.insert("id".to_owned(), Value::String(id));
    entity.extend(decoded.key_fields);

    Ok(Value::Object(entity))
}

fn parse_with_cache(
    query: &str,
    cache: Option<&mut HashMap<String, ast::ExecutableDocument>>,
) -> Result<ast::ExecutableDocument, async_graphql_parser::Error> {
    let Some(cache) = cache else {
        return async_graphql_parser::parse_query(query);
    };

    if let Some(document) = cache.get(query) {
        return Ok(document.clone());
    }

    let document = async_graphql_parser::parse_query(query)?;
    cache.insert(query.to_owned(), document.clone());

    Ok(document)
}
