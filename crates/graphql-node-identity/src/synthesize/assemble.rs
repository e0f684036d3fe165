//! Assembly of the output document from the closed entity graph.

use super::{Context, ID_FIELD_NAME, NODE_FIELD_NAME, NODE_INTERFACE_NAME};
use crate::{
    entity::{EntityType, base_type_name, has_directive},
    ir::*,
    key::Key,
    options::{FederationVersion, SynthesisOptions},
};
use async_graphql_parser::types as ast;
use std::collections::{BTreeMap, BTreeSet};

const BUILTIN_SCALARS: &[&str] = &["ID", "String", "Int", "Float", "Boolean"];
const QUERY_TYPE_NAME: &str = "Query";

pub(super) fn assemble(ctx: &mut Context, options: &SynthesisOptions, version: FederationVersion) -> Document {
    let mut final_keys: BTreeMap<String, Key> = BTreeMap::new();
    for type_name in ctx.graph.entities.keys().cloned().collect::<Vec<_>>() {
        if let Some(final_key) = ctx
            .graph
            .final_key(&type_name, options.key_selector.as_ref(), &mut ctx.diagnostics)
        {
            final_keys.insert(type_name, final_key);
        }
    }

    let mut definitions = Vec::new();

    definitions.push(version_declaration(options, version));
    definitions.push(Definition::Object(query_type(options, version)));
    definitions.push(Definition::Interface(node_interface(options)));

    // Scalar and enum names referenced by emitted fields.
    let mut referenced: BTreeSet<String> = BTreeSet::new();

    for (type_name, final_key) in &final_keys {
        let entity = &ctx.graph.entities[type_name];
        definitions.push(Definition::Object(entity_type(
            entity,
            final_key,
            options,
            version,
            &mut referenced,
        )));
    }

    for type_name in referenced {
        if BUILTIN_SCALARS.contains(&type_name.as_str()) || final_keys.contains_key(&type_name) {
            continue;
        }

        if let Some(occurrences) = ctx.enums.get(&type_name) {
            definitions.push(Definition::Enum(passthrough_enum(&type_name, occurrences, version)));
        } else if ctx.scalars.contains(&type_name) {
            definitions.push(Definition::Scalar(ScalarDefinition { name: type_name }));
        } else if ctx.graph.object_types.contains_key(&type_name) {
            ctx.diagnostics.push_warning(format!(
                "`{type_name}` is referenced by an emitted field but is not itself emitted",
            ));
        }
    }

    Document { definitions }
}

fn version_declaration(options: &SynthesisOptions, version: FederationVersion) -> Definition {
    match version.link_url() {
        Some(url) => Definition::SchemaExtension(SchemaExtension {
            directives: vec![Directive {
                name: "link".to_owned(),
                arguments: vec![
                    ("url".to_owned(), Value::String(url)),
                    (
                        "import".to_owned(),
                        Value::List(options.imports.iter().cloned().map(Value::String).collect()),
                    ),
                ],
            }],
        }),
        // v1 has no @link; the tag marker needs a standalone definition.
        None => Definition::Directive(DirectiveDefinition {
            name: "tag".to_owned(),
            arguments: vec![InputValue {
                name: "name".to_owned(),
                ty: "String!".to_owned(),
            }],
            repeatable: true,
            locations: ["FIELD_DEFINITION", "INTERFACE", "OBJECT", "UNION"]
                .into_iter()
                .map(String::from)
                .collect(),
        }),
    }
}

fn query_type(options: &SynthesisOptions, version: FederationVersion) -> ObjectDefinition {
    ObjectDefinition {
        name: QUERY_TYPE_NAME.to_owned(),
        extend: version == FederationVersion::V1,
        implements: Vec::new(),
        directives: Vec::new(),
        fields: vec![Field {
            name: NODE_FIELD_NAME.to_owned(),
            arguments: vec![InputValue {
                name: ID_FIELD_NAME.to_owned(),
                ty: "ID!".to_owned(),
            }],
            ty: NODE_INTERFACE_NAME.to_owned(),
            directives: tag_directives(options.contract_tags.iter().map(String::as_str)),
        }],
    }
}

fn node_interface(options: &SynthesisOptions) -> InterfaceDefinition {
    InterfaceDefinition {
        name: NODE_INTERFACE_NAME.to_owned(),
        fields: vec![Field {
            name: ID_FIELD_NAME.to_owned(),
            arguments: Vec::new(),
            ty: "ID!".to_owned(),
            directives: tag_directives(options.contract_tags.iter().map(String::as_str)),
        }],
    }
}

fn entity_type(
    entity: &EntityType,
    final_key: &Key,
    options: &SynthesisOptions,
    version: FederationVersion,
    referenced: &mut BTreeSet<String>,
) -> ObjectDefinition {
    let all_fields = entity.all_fields();
    let key_field_names: BTreeSet<&str> = final_key.top_level_names().collect();

    let mut fields = vec![Field {
        name: ID_FIELD_NAME.to_owned(),
        arguments: Vec::new(),
        ty: "ID!".to_owned(),
        directives: tag_directives(id_tag_names(entity, options).iter().map(String::as_str)),
    }];

    // Fields selected by the final key. Un-tagged: tags merge back in from
    // the owning subgraph at composition time.
    for field_name in &key_field_names {
        let Some(field) = all_fields.get(*field_name) else { continue };

        referenced.insert(base_type_name(&field.ty.node).to_owned());

        let mut directives = Vec::new();
        match version {
            FederationVersion::V1 => directives.push(Directive::new("external")),
            FederationVersion::V2 { .. } => {
                if has_directive(&field.directives, "shareable") {
                    directives.push(Directive::new("shareable"));
                }
            }
        }

        fields.push(Field {
            name: (*field_name).to_owned(),
            arguments: Vec::new(),
            ty: field.ty.node.to_string(),
            directives,
        });
    }

    // Fields pulled in only because another entity's key passes through this
    // type. Not resolvable in the synthesized subgraph.
    for field_name in entity.externally_selected_fields() {
        if key_field_names.contains(field_name.as_str()) {
            continue;
        }

        let Some(field) = all_fields.get(field_name) else { continue };

        referenced.insert(base_type_name(&field.ty.node).to_owned());

        fields.push(Field {
            name: field_name.clone(),
            arguments: Vec::new(),
            ty: field.ty.node.to_string(),
            directives: vec![Directive::new("external")],
        });
    }

    ObjectDefinition {
        name: entity.name().to_owned(),
        extend: version == FederationVersion::V1,
        implements: vec![NODE_INTERFACE_NAME.to_owned()],
        directives: vec![Directive::with_arg("key", "fields", Value::String(final_key.to_string()))],
        fields,
    }
}

/// The identifier field carries the union of all tag markers found on any
/// field or field argument of the type, across all subgraphs, plus the
/// global contract tags.
fn id_tag_names(entity: &EntityType, options: &SynthesisOptions) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = options.contract_tags.iter().cloned().collect();

    for occurrence in entity.occurrences() {
        let Some(object) = occurrence.object() else { continue };

        for field in &object.fields {
            collect_tag_names(&field.node.directives, &mut names);

            for argument in &field.node.arguments {
                collect_tag_names(&argument.node.directives, &mut names);
            }
        }
    }

    names
}

fn collect_tag_names(
    directives: &[async_graphql_parser::Positioned<ast::ConstDirective>],
    names: &mut BTreeSet<String>,
) {
    for directive in directives {
        if directive.node.name.node.as_str() != "tag" {
            continue;
        }

        if let Some(name) = directive.node.get_argument("name") {
            if let async_graphql_value::ConstValue::String(name) = &name.node {
                names.insert(name.clone());
            }
        }
    }
}

fn tag_directives<'a>(names: impl Iterator<Item = &'a str>) -> Vec<Directive> {
    names
        .map(|name| Directive::with_arg("tag", "name", Value::String(name.to_owned())))
        .collect()
}

/// Enum passthrough: variants are unioned across every subgraph-local
/// definition of the name and deduplicated. A variant suppressed with
/// `@inaccessible` anywhere keeps the marker under v2 and is omitted under
/// v1, which cannot express suppression.
fn passthrough_enum(
    type_name: &str,
    occurrences: &[crate::entity::TypeOccurrence],
    version: FederationVersion,
) -> EnumDefinition {
    let mut variants: BTreeMap<String, bool> = BTreeMap::new();

    for occurrence in occurrences {
        let ast::TypeKind::Enum(r#enum) = &occurrence.definition.kind else {
            continue;
        };

        for value in &r#enum.values {
            let suppressed = has_directive(&value.node.directives, "inaccessible");
            *variants.entry(value.node.value.node.to_string()).or_insert(false) |= suppressed;
        }
    }

    EnumDefinition {
        name: type_name.to_owned(),
        values: variants
            .into_iter()
            .filter_map(|(name, suppressed)| match (version, suppressed) {
                (FederationVersion::V1, true) => None,
                (FederationVersion::V2 { .. }, true) => Some(EnumValue {
                    name,
                    directives: vec![Directive::new("inaccessible")],
                }),
                (_, false) => Some(EnumValue {
                    name,
                    directives: Vec::new(),
                }),
            })
            .collect(),
    }
}
