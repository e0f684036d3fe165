//! Synthesis of a GraphQL federation subgraph implementing global object
//! identification.
//!
//! Given the schemas of a federated graph's subgraphs, [`synthesize()`]
//! produces one additional subgraph in which every entity type gains a
//! globally unique opaque identifier, retrievable through a single `node`
//! lookup field, without any subgraph owner adding identifier logic
//! themselves.
//!
//! ```
//! use graphql_node_identity::{Subgraphs, SynthesisOptions, synthesize};
//!
//! let mut subgraphs = Subgraphs::default();
//! subgraphs.ingest_str("books", r#"
//!     type Book @key(fields: "bookId") {
//!         bookId: String!
//!         title: String
//!     }
//! "#);
//!
//! let schema = synthesize(&subgraphs, &SynthesisOptions::default())
//!     .into_result()
//!     .unwrap();
//!
//! assert!(schema.sdl.contains("type Book implements Node"));
//! ```

#![forbid(unsafe_code)]

mod diagnostics;
mod entity;
mod ir;
mod key;
mod options;
mod render_sdl;
mod result;
mod sort;
mod subgraphs;
mod synthesize;

pub use self::{
    diagnostics::Diagnostics,
    key::{Key, KeyField},
    options::{
        AcceptAllEntities, EntityQualifier, FederationVersion, FirstDeclaredKey, KeySelector, OmittedEntityQualifier,
        RescueNone, SynthesisOptions,
    },
    result::{SynthesisResult, SynthesizedSubgraph},
    subgraphs::Subgraphs,
    synthesize::{ID_FIELD_NAME, NODE_FIELD_NAME, NODE_INTERFACE_NAME, synthesize},
};
