//! The synthesis pipeline: classify input definitions, discover entities,
//! close over nested-key dependencies, compose final keys and assemble the
//! output document.

mod assemble;

use crate::{
    Diagnostics,
    entity::{EntityGraph, EntityType, TypeOccurrence, base_type_name, has_directive},
    key::KeyField,
    options::{FederationVersion, SynthesisOptions},
    result::{SynthesisResult, SynthesizedSubgraph},
    sort::sort_document,
    subgraphs::Subgraphs,
};
use async_graphql_parser::types as ast;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// The identifier field every synthesized entity type exposes.
pub const ID_FIELD_NAME: &str = "id";
/// The lookup field added to the root query type.
pub const NODE_FIELD_NAME: &str = "node";
/// The marker interface every synthesized entity type implements.
pub const NODE_INTERFACE_NAME: &str = "Node";

/// Subgraph-protocol types that must never be treated as candidates.
const SERVICE_TYPE_NAME: &str = "_Service";
const ENTITY_UNION_NAME: &str = "_Entity";

/// Synthesizes the object-identification subgraph for the given set of
/// subgraphs. A subgraph ingested under `options.subgraph_name` is excluded
/// from its own input.
pub fn synthesize(subgraphs: &Subgraphs, options: &SynthesisOptions) -> SynthesisResult {
    let mut diagnostics = Diagnostics::default();
    subgraphs.emit_ingestion_diagnostics(&mut diagnostics);

    let version = match FederationVersion::parse(&options.federation_version) {
        Ok(version) => Some(version),
        Err(message) => {
            diagnostics.push_fatal(message);
            None
        }
    };

    if matches!(version, Some(FederationVersion::V2 { .. })) && options.imports.is_empty() {
        diagnostics.push_fatal("the capability import list must not be empty".to_owned());
    }

    if diagnostics.any_fatal() {
        return SynthesisResult {
            schema: None,
            diagnostics,
        };
    }

    let version = version.expect("checked above");

    let mut ctx = Context {
        graph: EntityGraph::default(),
        enums: BTreeMap::new(),
        scalars: BTreeSet::new(),
        diagnostics,
    };

    classify_definitions(subgraphs, options, &mut ctx);
    discover_entities(options, &mut ctx);

    if ctx.diagnostics.any_fatal() {
        return SynthesisResult {
            schema: None,
            diagnostics: ctx.diagnostics,
        };
    }

    close_dependencies(options, &mut ctx);

    tracing::debug!(
        entities = ctx.graph.entities.len(),
        "dependency closure reached fixed point"
    );

    let mut document = assemble::assemble(&mut ctx, options, version);
    sort_document(&mut document, ID_FIELD_NAME);

    if ctx.diagnostics.any_fatal() {
        return SynthesisResult {
            schema: None,
            diagnostics: ctx.diagnostics,
        };
    }

    SynthesisResult {
        schema: Some(SynthesizedSubgraph {
            name: options.subgraph_name.clone(),
            sdl: document.to_string(),
        }),
        diagnostics: ctx.diagnostics,
    }
}

pub(crate) struct Context {
    pub(crate) graph: EntityGraph,
    pub(crate) enums: BTreeMap<String, Vec<TypeOccurrence>>,
    pub(crate) scalars: BTreeSet<String>,
    pub(crate) diagnostics: Diagnostics,
}

/// Splits the input documents into object occurrences (grouped by name, root
/// and protocol types excluded) and passthrough scalar/enum material.
fn classify_definitions(subgraphs: &Subgraphs, options: &SynthesisOptions, ctx: &mut Context) {
    for subgraph in subgraphs.iter().filter(|subgraph| subgraph.name() != options.subgraph_name) {
        let root_type_names = subgraph.root_type_names();

        for definition in &subgraph.document().definitions {
            let ast::TypeSystemDefinition::Type(ty) = definition else {
                continue;
            };

            let type_name = ty.node.name.node.to_string();
            let occurrence = || TypeOccurrence {
                subgraph_name: subgraph.name().to_owned(),
                definition: ty.node.clone(),
            };

            match &ty.node.kind {
                ast::TypeKind::Object(_) => {
                    if root_type_names.contains(&type_name) || type_name == SERVICE_TYPE_NAME {
                        continue;
                    }

                    ctx.graph.object_types.entry(type_name).or_default().push(occurrence());
                }
                ast::TypeKind::Enum(_) => {
                    ctx.enums.entry(type_name).or_default().push(occurrence());
                }
                ast::TypeKind::Scalar => {
                    ctx.scalars.insert(type_name);
                }
                ast::TypeKind::Union(_) if type_name == ENTITY_UNION_NAME => (),
                _ => (),
            }
        }
    }

    tracing::debug!(
        object_types = ctx.graph.object_types.len(),
        enums = ctx.enums.len(),
        scalars = ctx.scalars.len(),
        "classified input definitions"
    );
}

/// Two-phase entity discovery: direct entities first, then reconsideration of
/// the types the primary qualifier turned down.
fn discover_entities(options: &SynthesisOptions, ctx: &mut Context) {
    let mut accepted: BTreeMap<String, ast::TypeDefinition> = BTreeMap::new();
    let mut omitted: Vec<(String, ast::TypeDefinition)> = Vec::new();

    // Phase A: direct entities.
    for (type_name, occurrences) in &ctx.graph.object_types {
        // Extension-only types belong to whichever subgraph defines them.
        let Some(primary) = occurrences.iter().find(|occurrence| !occurrence.definition.extend) else {
            continue;
        };

        if options.exceptions.contains(type_name) {
            continue;
        }

        let is_entity = occurrences
            .iter()
            .any(|occurrence| has_directive(&occurrence.definition.directives, "key"));

        if !is_entity {
            continue;
        }

        if options.entity_qualifier.qualifies(&primary.definition, &accepted) {
            accepted.insert(type_name.clone(), primary.definition.clone());
        } else {
            omitted.push((type_name.clone(), primary.definition.clone()));
        }
    }

    // Phase B: types skipped purely for failing the qualifier get a second
    // opinion against the final accepted set.
    let phase_a_accepted = accepted.clone();
    for (type_name, definition) in omitted {
        if options.omitted_entity_qualifier.rescues(&definition, &phase_a_accepted) {
            accepted.insert(type_name, definition);
        }
    }

    for type_name in accepted.into_keys() {
        let occurrences = ctx.graph.object_types[&type_name].clone();
        let entity = EntityType::new(type_name.clone(), occurrences, &mut ctx.diagnostics);
        ctx.graph.entities.insert(type_name, entity);
    }

    tracing::debug!(entities = ctx.graph.entities.len(), "entity discovery finished");
}

/// Walks every entity's selected key and registers the object types the key
/// nests through, until no new types are touched and no derived key changes.
/// Must reach fixed point before final keys are composed.
fn close_dependencies(options: &SynthesisOptions, ctx: &mut Context) {
    let mut queue: VecDeque<String> = ctx.graph.entities.keys().cloned().collect();

    while let Some(type_name) = queue.pop_front() {
        let Some(selected_key) = ctx
            .graph
            .entities
            .get(&type_name)
            .and_then(|entity| entity.selected_key(options.key_selector.as_ref()))
        else {
            continue;
        };

        close_over_fields(&type_name, selected_key.fields(), options, ctx, &mut queue);
    }
}

fn close_over_fields(
    parent_name: &str,
    key_fields: &[KeyField],
    options: &SynthesisOptions,
    ctx: &mut Context,
    queue: &mut VecDeque<String>,
) {
    let parent_fields = match ctx.graph.entities.get(parent_name) {
        Some(entity) => entity.all_fields(),
        None => return,
    };

    for key_field in key_fields {
        if key_field.selections().is_empty() {
            continue;
        }

        let Some(field) = parent_fields.get(key_field.name()) else {
            continue;
        };

        let child_type = base_type_name(&field.ty.node).to_owned();

        let Some(child_occurrences) = ctx.graph.object_types.get(&child_type) else {
            continue;
        };

        let mut changed = false;

        if !ctx.graph.entities.contains_key(&child_type) {
            // Dependency-only entity: registered even without a key of its own.
            let entity = EntityType::new(child_type.clone(), child_occurrences.clone(), &mut ctx.diagnostics);
            ctx.graph.entities.insert(child_type.clone(), entity);
            changed = true;
        }

        let declared_key_names: BTreeSet<String> = {
            let child = &ctx.graph.entities[&child_type];
            if child.has_declared_keys() {
                child
                    .selected_key(options.key_selector.as_ref())
                    .map(|key| key.top_level_names().map(str::to_owned).collect())
                    .unwrap_or_default()
            } else {
                BTreeSet::new()
            }
        };

        let child = ctx.graph.entities.get_mut(&child_type).expect("registered above");

        for sibling in key_field.selections() {
            if !declared_key_names.contains(sibling.name()) {
                child.add_externally_selected_field(sibling.name());
            }
        }

        if !child.has_declared_keys() {
            let mut subtree = crate::key::Key::new(&child_type);
            for selection in key_field.selections() {
                subtree.add_selection(selection.clone());
            }
            changed |= child.merge_derived_key(&subtree);
        }

        if changed {
            queue.push_back(child_type.clone());
        }

        close_over_fields(&child_type, key_field.selections(), options, ctx, queue);
    }
}
