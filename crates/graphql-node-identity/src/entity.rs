use crate::{
    Diagnostics,
    key::{Key, KeyField},
    options::KeySelector,
};
use async_graphql_parser::types as ast;
use std::collections::{BTreeMap, BTreeSet};

/// Hard bound on nested-key recursion. Cycle detection on the ancestor path
/// should always trip first; this is the backstop.
const MAX_KEY_RECURSION_DEPTH: usize = 100;

/// One definition or `extend` fragment of a type, from one subgraph.
#[derive(Clone)]
pub(crate) struct TypeOccurrence {
    pub(crate) subgraph_name: String,
    pub(crate) definition: ast::TypeDefinition,
}

impl TypeOccurrence {
    pub(crate) fn object(&self) -> Option<&ast::ObjectType> {
        match &self.definition.kind {
            ast::TypeKind::Object(object) => Some(object),
            _ => None,
        }
    }
}

pub(crate) fn base_type_name(ty: &ast::Type) -> &str {
    match &ty.base {
        ast::BaseType::Named(name) => name.as_str(),
        ast::BaseType::List(inner) => base_type_name(inner),
    }
}

pub(crate) fn has_directive(directives: &[async_graphql_parser::Positioned<ast::ConstDirective>], name: &str) -> bool {
    directives.iter().any(|directive| directive.node.name.node.as_str() == name)
}

/// Every occurrence of one type name across all subgraphs, collated.
pub(crate) struct EntityType {
    name: String,
    occurrences: Vec<TypeOccurrence>,
    /// Declared keys, one per `@key` instance, in declaration order across
    /// occurrences.
    keys: Vec<Key>,
    /// Key derived from the key subtrees of other entities reaching this
    /// type. Only set for types without declared keys.
    derived_key: Option<Key>,
    /// Field names pulled in purely because another entity's key path passes
    /// through this type. Grows monotonically during dependency closure.
    externally_selected_fields: BTreeSet<String>,
}

impl EntityType {
    pub(crate) fn new(name: String, occurrences: Vec<TypeOccurrence>, diagnostics: &mut Diagnostics) -> EntityType {
        let mut keys = Vec::new();

        for occurrence in &occurrences {
            for directive in &occurrence.definition.directives {
                if directive.node.name.node.as_str() != "key" {
                    continue;
                }

                match Key::from_directive(&name, &directive.node) {
                    Ok(key) => keys.push(key),
                    Err(message) => diagnostics.push_fatal(format!("[{}]: {message}", occurrence.subgraph_name)),
                }
            }
        }

        EntityType {
            name,
            occurrences,
            keys,
            derived_key: None,
            externally_selected_fields: BTreeSet::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn occurrences(&self) -> &[TypeOccurrence] {
        &self.occurrences
    }

    pub(crate) fn has_declared_keys(&self) -> bool {
        !self.keys.is_empty()
    }

    /// The first non-extension occurrence, used as context for the pluggable
    /// policies.
    pub(crate) fn primary_occurrence(&self) -> &TypeOccurrence {
        self.occurrences
            .iter()
            .find(|occurrence| !occurrence.definition.extend)
            .unwrap_or(&self.occurrences[0])
    }

    /// Name-deduplicated union of fields across all occurrences, two passes:
    /// first the occurrences where the field is locally resolvable (no
    /// `@external`), then a fallback pass taking the first occurrence
    /// unconditionally, so every field name that appears anywhere resolves.
    pub(crate) fn all_fields(&self) -> BTreeMap<String, ast::FieldDefinition> {
        let mut resolved: BTreeMap<String, ast::FieldDefinition> = BTreeMap::new();
        let mut fallback: BTreeMap<String, ast::FieldDefinition> = BTreeMap::new();

        for occurrence in &self.occurrences {
            let Some(object) = occurrence.object() else { continue };

            for field in &object.fields {
                let field_name = field.node.name.node.to_string();

                if !has_directive(&field.node.directives, "external") {
                    resolved.entry(field_name).or_insert_with(|| field.node.clone());
                } else {
                    fallback.entry(field_name).or_insert_with(|| field.node.clone());
                }
            }
        }

        for (name, field) in fallback {
            resolved.entry(name).or_insert(field);
        }

        resolved
    }

    /// The key chosen for output. Declared keys go through the selection
    /// policy; a dependency-only type falls back to its derived key.
    pub(crate) fn selected_key(&self, selector: &dyn KeySelector) -> Option<Key> {
        if self.keys.is_empty() {
            return self.derived_key.clone();
        }

        selector
            .select(self.keys.clone(), &self.primary_occurrence().definition)
            .into_iter()
            .next()
    }

    pub(crate) fn externally_selected_fields(&self) -> &BTreeSet<String> {
        &self.externally_selected_fields
    }

    /// Returns true when the field was not already tracked.
    pub(crate) fn add_externally_selected_field(&mut self, field_name: &str) -> bool {
        self.externally_selected_fields.insert(field_name.to_owned())
    }

    /// Unions a key subtree into the derived key of a dependency-only type.
    /// Returns true when the derived key changed.
    pub(crate) fn merge_derived_key(&mut self, subtree: &Key) -> bool {
        debug_assert!(self.keys.is_empty());

        match &mut self.derived_key {
            Some(derived) => {
                let before = derived.to_string();
                derived.merge(subtree);
                derived.to_string() != before
            }
            None => {
                self.derived_key = Some(subtree.clone());
                true
            }
        }
    }
}

/// Arena of [EntityType]s for one synthesis run, keyed by type name. Entities
/// refer to each other by name through this registry; final keys are computed
/// here with an explicit ancestor path instead of back-references.
#[derive(Default)]
pub(crate) struct EntityGraph {
    pub(crate) entities: BTreeMap<String, EntityType>,
    /// All non-root object type occurrences in the inputs, entity or not.
    pub(crate) object_types: BTreeMap<String, Vec<TypeOccurrence>>,
}

impl EntityGraph {
    /// Top-level `(field name, returned object type)` pairs of a key, for the
    /// fields whose return type is a known object type. Scalar- and
    /// enum-returning key fields are excluded.
    pub(crate) fn child_objects_in_key(
        &self,
        key: &Key,
        all_fields: &BTreeMap<String, ast::FieldDefinition>,
    ) -> Vec<(String, String)> {
        key.top_level_names()
            .filter_map(|field_name| {
                let field = all_fields.get(field_name)?;
                let returned = base_type_name(&field.ty.node);

                self.object_types
                    .contains_key(returned)
                    .then(|| (field_name.to_owned(), returned.to_owned()))
            })
            .collect()
    }

    /// The public key of an entity, transparently expanded with the final
    /// keys of the entities its own key nests through. `None` iff the type
    /// has no selected key.
    pub(crate) fn final_key(
        &self,
        type_name: &str,
        selector: &dyn KeySelector,
        diagnostics: &mut Diagnostics,
    ) -> Option<Key> {
        let mut ancestors = vec![type_name.to_owned()];
        self.final_key_inner(type_name, selector, diagnostics, &mut ancestors)
    }

    fn final_key_inner(
        &self,
        type_name: &str,
        selector: &dyn KeySelector,
        diagnostics: &mut Diagnostics,
        ancestors: &mut Vec<String>,
    ) -> Option<Key> {
        let entity = self.entities.get(type_name)?;
        let selected = entity.selected_key(selector)?;
        let all_fields = entity.all_fields();

        let mut merged = selected.clone();

        // Fields that resolved only after cross-subgraph aggregation and were
        // absent from the originally declared fields string.
        let mut resolved_flat = Key::new(type_name);
        for field_name in selected.top_level_names() {
            if all_fields.contains_key(field_name) {
                resolved_flat.add_selection(KeyField::new(field_name));
            }
        }
        merged.merge(&resolved_flat);

        for (field_name, child_type) in self.child_objects_in_key(&selected, &all_fields) {
            if ancestors.iter().any(|ancestor| *ancestor == child_type) {
                diagnostics.push_warning(format!(
                    "cyclic key dependency on `{child_type}` while composing the key of `{}` (path: {})",
                    ancestors[0],
                    ancestors.join(" -> "),
                ));
                continue;
            }

            if ancestors.len() >= MAX_KEY_RECURSION_DEPTH {
                diagnostics.push_warning(format!(
                    "nested key recursion exceeded the ceiling of {MAX_KEY_RECURSION_DEPTH} at `{child_type}` while composing the key of `{}`",
                    ancestors[0],
                ));
                continue;
            }

            ancestors.push(child_type.clone());
            let child_key = self.final_key_inner(&child_type, selector, diagnostics, ancestors);
            ancestors.pop();

            if let Some(child_key) = child_key {
                merged.merge_nested(&field_name, &child_key);
            }
        }

        Some(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FirstDeclaredKey;
    use pretty_assertions::assert_eq;

    fn occurrences(schemas: &[&str]) -> Vec<TypeOccurrence> {
        schemas
            .iter()
            .enumerate()
            .flat_map(|(idx, schema)| {
                let doc = async_graphql_parser::parse_schema(schema).unwrap();
                doc.definitions.into_iter().filter_map(move |definition| match definition {
                    ast::TypeSystemDefinition::Type(ty) => Some(TypeOccurrence {
                        subgraph_name: format!("subgraph-{idx}"),
                        definition: ty.node,
                    }),
                    _ => None,
                })
            })
            .collect()
    }

    #[test]
    fn all_fields_prefers_locally_resolvable_occurrences() {
        let mut diagnostics = Diagnostics::default();
        let entity = EntityType::new(
            "Book".to_owned(),
            occurrences(&[
                r#"type Book @key(fields: "bookId") { bookId: ID! title: String @external }"#,
                r#"type Book { title: String! rating: Int @external }"#,
            ]),
            &mut diagnostics,
        );

        let fields = entity.all_fields();

        // The second subgraph resolves `title`, the first only references it.
        assert_eq!(fields["title"].ty.node.to_string(), "String!");
        // `rating` only ever appears as @external; the fallback pass keeps it.
        assert_eq!(fields["rating"].ty.node.to_string(), "Int");
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn cyclic_key_dependencies_are_skipped_and_reported() {
        let occs = |schema: &str| occurrences(&[schema]);
        let mut diagnostics = Diagnostics::default();

        let mut graph = EntityGraph::default();
        for (name, schema) in [
            ("Author", r#"type Author @key(fields: "authorId book { bookId }") { authorId: ID! book: Book }"#),
            ("Book", r#"type Book @key(fields: "bookId author { authorId }") { bookId: ID! author: Author }"#),
        ] {
            let occurrences = occs(schema);
            graph.object_types.insert(name.to_owned(), occurrences.clone());
            graph
                .entities
                .insert(name.to_owned(), EntityType::new(name.to_owned(), occurrences, &mut diagnostics));
        }

        let final_key = graph.final_key("Author", &FirstDeclaredKey, &mut diagnostics).unwrap();

        // Book's key references Author again; that branch is omitted, not recursed.
        assert_eq!(
            final_key.to_string(),
            "authorId book { __typename author { __typename authorId } bookId }"
        );
        let warnings: Vec<_> = diagnostics.iter_warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("cyclic key dependency on `Author`"), "{}", warnings[0]);
    }
}
