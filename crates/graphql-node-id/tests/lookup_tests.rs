use graphql_node_id::{NoopTransform, encode_node_id, handle_node_request};
use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

fn no_variables() -> Map<String, Value> {
    Map::new()
}

#[test]
fn a_single_lookup_resolves_to_the_minimal_representation() {
    let id = encode_node_id("Book", &json!({"bookId": "b1"}), &NoopTransform).unwrap();
    let query = format!(r#"query {{ node(id: "{id}") {{ id }} }}"#);

    let response = handle_node_request(&query, &no_variables(), &NoopTransform, None);

    assert_eq!(
        response.into_json(),
        json!({
            "data": {
                "node": { "__typename": "Book", "id": id, "bookId": "b1" }
            }
        })
    );
}

#[test]
fn lookups_accept_variables() {
    let id = encode_node_id("Book", &json!({"bookId": "b1"}), &NoopTransform).unwrap();
    let query = "query($bookId: ID!) { node(id: $bookId) { id } }";

    let mut variables = Map::new();
    variables.insert("bookId".to_owned(), Value::String(id.clone()));

    let response = handle_node_request(query, &variables, &NoopTransform, None);

    assert_eq!(
        response.into_json(),
        json!({
            "data": {
                "node": { "__typename": "Book", "id": id, "bookId": "b1" }
            }
        })
    );
}

#[test]
fn failures_are_isolated_per_slot() {
    let good = encode_node_id("Book", &json!({"bookId": "b1"}), &NoopTransform).unwrap();
    let query = format!(
        r#"query {{
            bad: node(id: "certainly-not-an-id") {{ id }}
            good: node(id: "{good}") {{ id }}
        }}"#
    );

    let response = handle_node_request(&query, &no_variables(), &NoopTransform, None);
    let json = response.into_json();

    assert_eq!(json["data"]["bad"], Value::Null);
    assert_eq!(json["data"]["good"]["__typename"], json!("Book"));
    assert_eq!(json["data"]["good"]["bookId"], json!("b1"));

    let errors = json["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], json!(["bad"]));
}

#[test]
fn non_literal_non_variable_arguments_are_slot_errors() {
    let query = "query { node(id: 42) { id } }";

    let response = handle_node_request(query, &no_variables(), &NoopTransform, None);
    let json = response.into_json();

    assert_eq!(json["data"]["node"], Value::Null);
    assert!(
        json["errors"][0]["message"]
            .as_str()
            .unwrap()
            .contains("string literal or a variable"),
        "{json}"
    );
}

#[test]
fn unknown_variables_are_slot_errors() {
    let query = "query($bookId: ID!) { node(id: $bookId) { id } }";

    let response = handle_node_request(query, &no_variables(), &NoopTransform, None);
    let json = response.into_json();

    assert_eq!(json["data"]["node"], Value::Null);
    assert!(
        json["errors"][0]["message"].as_str().unwrap().contains("$bookId"),
        "{json}"
    );
}

#[test]
fn an_unparseable_document_fails_the_whole_request() {
    let response = handle_node_request("query {{{", &no_variables(), &NoopTransform, None);
    let json = response.into_json();

    assert_eq!(json["data"], Value::Null);
    assert!(
        json["errors"][0]["message"]
            .as_str()
            .unwrap()
            .contains("failed to parse the lookup document"),
        "{json}"
    );
}

#[test]
fn the_parse_cache_is_reused_across_invocations() {
    let id = encode_node_id("Book", &json!({"bookId": "b1"}), &NoopTransform).unwrap();
    let query = "query($bookId: ID!) { node(id: $bookId) { id } }";

    let mut variables = Map::new();
    variables.insert("bookId".to_owned(), Value::String(id));

    let mut cache = HashMap::new();

    let first = handle_node_request(query, &variables, &NoopTransform, Some(&mut cache)).into_json();
    assert_eq!(cache.len(), 1);

    let second = handle_node_request(query, &variables, &NoopTransform, Some(&mut cache)).into_json();
    assert_eq!(cache.len(), 1);
    assert_eq!(first, second);
}
