use crate::Diagnostics;
use async_graphql_parser::types as ast;

/// The set of subgraph schemas a synthesis run reads from.
#[derive(Default)]
pub struct Subgraphs {
    subgraphs: Vec<Subgraph>,
    ingestion_diagnostics: Diagnostics,
}

impl Subgraphs {
    /// Parse and add a subgraph schema. Parse failures are recorded as fatal
    /// diagnostics and surface when synthesis runs.
    pub fn ingest_str(&mut self, name: &str, schema: &str) {
        match async_graphql_parser::parse_schema(schema) {
            Ok(document) => self.subgraphs.push(Subgraph {
                name: name.to_owned(),
                document,
            }),
            Err(err) => self
                .ingestion_diagnostics
                .push_fatal(format!("[{name}]: failed to parse the subgraph schema: {err}")),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Subgraph> {
        self.subgraphs.iter()
    }

    pub(crate) fn emit_ingestion_diagnostics(&self, diagnostics: &mut Diagnostics) {
        diagnostics.clone_all_from(&self.ingestion_diagnostics);
    }
}

/// One independently authored partial schema.
pub(crate) struct Subgraph {
    name: String,
    document: ast::ServiceDocument,
}

impl Subgraph {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn document(&self) -> &ast::ServiceDocument {
        &self.document
    }

    /// The names of the root operation types in this subgraph, honoring a
    /// `schema { ... }` definition when present.
    pub(crate) fn root_type_names(&self) -> Vec<String> {
        let mut roots = vec!["Query".to_owned(), "Mutation".to_owned(), "Subscription".to_owned()];

        for definition in &self.document.definitions {
            if let ast::TypeSystemDefinition::Schema(schema) = definition {
                let renames = [
                    (0, schema.node.query.as_ref()),
                    (1, schema.node.mutation.as_ref()),
                    (2, schema.node.subscription.as_ref()),
                ];
                for (idx, name) in renames {
                    if let Some(name) = name {
                        roots[idx] = name.node.to_string();
                    }
                }
            }
        }

        roots
    }
}
