use async_graphql_parser::{Positioned, types as ast};
use std::fmt;

/// The field name every GraphQL object can answer with its concrete type name.
/// It is never stored in a [Key]; the canonical rendering re-inserts it at the
/// start of every nested selection set so that values reached through a key
/// remain distinguishable by concrete type.
pub(crate) const TYPENAME: &str = "__typename";

/// One named selection inside a key, with its child selections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyField {
    name: String,
    selections: Vec<KeyField>,
}

impl KeyField {
    pub fn new(name: impl Into<String>) -> Self {
        KeyField {
            name: name.into(),
            selections: Vec::new(),
        }
    }

    pub fn with_selections(name: impl Into<String>, selections: Vec<KeyField>) -> Self {
        KeyField {
            name: name.into(),
            selections,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selections(&self) -> &[KeyField] {
        &self.selections
    }

    /// Structural union. Children with the same name have their own selection
    /// sets unioned recursively, so merging a field into itself is a no-op.
    pub fn merge(&mut self, other: &KeyField) {
        for selection in &other.selections {
            merge_into(&mut self.selections, selection);
        }
    }

    /// Number of nesting levels below this field. A bare field is depth 0.
    pub fn depth(&self) -> usize {
        self.selections
            .iter()
            .map(|selection| 1 + selection.depth())
            .max()
            .unwrap_or(0)
    }
}

fn merge_into(selections: &mut Vec<KeyField>, field: &KeyField) {
    match selections.iter_mut().find(|existing| existing.name == field.name) {
        Some(existing) => existing.merge(field),
        None => selections.push(field.clone()),
    }
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;

        if self.selections.is_empty() {
            return Ok(());
        }

        f.write_str(" { ")?;
        f.write_str(TYPENAME)?;

        let mut sorted: Vec<&KeyField> = self.selections.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        for selection in sorted {
            write!(f, " {selection}")?;
        }

        f.write_str(" }")
    }
}

/// The selection set of one `@key(fields: "...")` directive instance.
///
/// Top-level field names are unique: adding a field that is already present
/// merges the two selections instead of duplicating the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    type_name: String,
    fields: Vec<KeyField>,
}

impl Key {
    pub fn new(type_name: impl Into<String>) -> Self {
        Key {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Parses the raw `fields` string of a key directive as a selection set.
    pub fn parse(type_name: &str, fields: &str) -> Result<Key, String> {
        let wrapped = format!("{{ {fields} }}");
        let parsed = async_graphql_parser::parse_query(&wrapped).map_err(|err| {
            format!("could not parse the key fields `{fields}` on `{type_name}` as a selection set: {err}")
        })?;

        let ast::ExecutableDocument {
            operations: ast::DocumentOperations::Single(operation),
            ..
        } = parsed
        else {
            return Err(format!(
                "the key fields `{fields}` on `{type_name}` must be a single selection set"
            ));
        };

        let fields = key_fields_from_ast(&operation.node.selection_set.node.items)
            .map_err(|err| format!("invalid key on `{type_name}`: {err}"))?;

        Ok(Key {
            type_name: type_name.to_owned(),
            fields,
        })
    }

    /// Reads a key out of a `@key(fields: "...")` directive.
    pub fn from_directive(type_name: &str, directive: &ast::ConstDirective) -> Result<Key, String> {
        let Some(fields) = directive.get_argument("fields") else {
            return Err(format!("the key on `{type_name}` is missing its `fields` argument"));
        };

        match &fields.node {
            async_graphql_value::ConstValue::String(fields) => Key::parse(type_name, fields),
            _ => Err(format!("the `fields` argument of the key on `{type_name}` must be a string")),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[KeyField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Adds one top-level selection, merging with an existing field of the
    /// same name.
    pub fn add_selection(&mut self, field: KeyField) {
        merge_into(&mut self.fields, &field);
    }

    /// Unions another key into this one. Idempotent.
    pub fn merge(&mut self, other: &Key) {
        for field in &other.fields {
            merge_into(&mut self.fields, field);
        }
    }

    /// Unions `field_name { child_key }` into this key.
    pub fn merge_nested(&mut self, field_name: &str, child_key: &Key) {
        merge_into(
            &mut self.fields,
            &KeyField::with_selections(field_name, child_key.fields.clone()),
        );
    }

    /// Deepest chain of nested selections. `"upc"` is 0, `"brand { brandId }"` is 1.
    pub fn depth(&self) -> usize {
        self.fields.iter().map(KeyField::depth).max().unwrap_or(0)
    }

    pub(crate) fn top_level_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }
}

impl fmt::Display for Key {
    /// Canonical rendering: siblings sorted by name ascending at every level.
    /// Declaration order never shows in the output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<&KeyField> = self.fields.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut fields = sorted.into_iter().peekable();
        while let Some(field) = fields.next() {
            write!(f, "{field}")?;
            if fields.peek().is_some() {
                f.write_str(" ")?;
            }
        }

        Ok(())
    }
}

fn key_fields_from_ast(items: &[Positioned<ast::Selection>]) -> Result<Vec<KeyField>, String> {
    let mut fields = Vec::new();

    for item in items {
        match &item.node {
            ast::Selection::Field(field) => {
                let name = field.node.name.node.as_str();

                if name == TYPENAME {
                    continue;
                }

                let selections = key_fields_from_ast(&field.node.selection_set.node.items)?;
                merge_into(&mut fields, &KeyField::with_selections(name, selections));
            }
            ast::Selection::FragmentSpread(_) | ast::Selection::InlineFragment(_) => {
                return Err("fragments are not allowed in key selections".to_owned());
            }
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(fields: &str) -> Key {
        Key::parse("Book", fields).unwrap()
    }

    #[test]
    fn canonical_rendering_sorts_at_every_level() {
        assert_eq!(
            key("upc brand { name brandId } sku").to_string(),
            "brand { __typename brandId name } sku upc"
        );
    }

    #[test]
    fn rendering_is_declaration_order_independent() {
        assert_eq!(key("a b { d c }").to_string(), key("b { c d } a").to_string());
    }

    #[test]
    fn duplicate_top_level_field_collapses() {
        assert_eq!(key("bookId bookId").to_string(), "bookId");
    }

    #[test]
    fn typename_is_never_stored() {
        let parsed = key("__typename bookId author { __typename name }");
        assert_eq!(parsed.to_string(), "author { __typename name } bookId");
        assert_eq!(parsed.fields().len(), 2);
        assert_eq!(parsed.fields()[0].selections().len(), 1);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut merged = key("a b { c }");
        let original = merged.clone();
        merged.merge(&original.clone());
        assert_eq!(merged.to_string(), original.to_string());
    }

    #[test]
    fn merge_is_commutative_and_associative() {
        let (a, b, c) = (key("x y { m }"), key("y { n } z"), key("x w { q }"));

        let mut left = a.clone();
        left.merge(&b);
        left.merge(&c);

        let mut right = b.clone();
        right.merge(&c);
        let mut a2 = a.clone();
        a2.merge(&right);

        let mut b_first = b.clone();
        b_first.merge(&a);
        b_first.merge(&c);

        assert_eq!(left.to_string(), a2.to_string());
        assert_eq!(left.to_string(), b_first.to_string());
    }

    #[test]
    fn disjoint_branches_both_survive_a_merge() {
        let mut merged = key("author { name }");
        merged.merge(&key("genre { name }"));
        assert_eq!(
            merged.to_string(),
            "author { __typename name } genre { __typename name }"
        );
    }

    #[test]
    fn depth_counts_nesting_levels() {
        assert_eq!(key("upc").depth(), 0);
        assert_eq!(key("upc brand { brandId }").depth(), 1);
        assert_eq!(key("brand { group { groupId } name }").depth(), 2);
    }

    #[test]
    fn fragments_are_rejected() {
        let err = Key::parse("Book", "... on Book { bookId }").unwrap_err();
        assert!(err.contains("fragments are not allowed"), "{err}");
    }

    #[test]
    fn unparseable_fields_string_names_the_type() {
        let err = Key::parse("Book", "{{{").unwrap_err();
        assert!(err.contains("`Book`"), "{err}");
    }

    #[test]
    fn directive_without_fields_argument_is_an_error() {
        let doc = async_graphql_parser::parse_schema(r#"type Book @key(resolvable: true) { id: ID }"#).unwrap();
        let ast::TypeSystemDefinition::Type(ty) = &doc.definitions[0] else {
            unreachable!()
        };
        let err = Key::from_directive("Book", &ty.node.directives[0].node).unwrap_err();
        assert!(err.contains("missing its `fields` argument"), "{err}");
    }
}
