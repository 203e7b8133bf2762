//! Schema-driven metadata object and reference resolution.
//!
//! Submissions arrive as batches of XML documents whose layout is described
//! by a declarative [`PathConfig`]: where each object type's instances
//! live, the alternate locations holding an instance's name and id, the
//! typed references between objects, and the per-schema set wrapper for
//! documents carrying many instances. The engine is a two-pass linker over
//! those documents:
//!
//! 1. **Load**: every instance's identity (and every reference's identity)
//!    is reconciled across its alternate locations, instances are indexed
//!    by `(schema type, root path, name)`, duplicates are rejected, and
//!    per-type cardinality rules are enforced over the whole batch.
//! 2. **Fixup**: externally generated ids are assigned per object and
//!    written through every configured location — including every
//!    reference in every document that points at the object by name.
//!
//! The layers build bottom-up: [`path`] (normalization and node access)
//! feeds [`ObjectProcessor`] (one instance), which feeds
//! [`DocumentProcessor`] (one document, possibly a set), which feeds
//! [`SubmissionProcessor`] (the whole batch). [`DocumentWriter`]
//! reassembles processed fragments into output documents and depends on
//! processor output only.
//!
//! # Example
//!
//! ```rust
//! use curator_engine::{
//!     IdentifierPath, ObjectPathSpec, PathConfig, Registry, SubmissionProcessor,
//! };
//!
//! let registry = Registry::compile(PathConfig {
//!     objects: vec![ObjectPathSpec {
//!         schema_type: "study".into(),
//!         object_type: "study".into(),
//!         root_path: "/STUDY".into(),
//!         mandatory: false,
//!         single: false,
//!         identifier_paths: vec![IdentifierPath {
//!             name_path: "@alias".into(),
//!             id_path: "@accession".into(),
//!             name_insertion: None,
//!             id_insertion: None,
//!         }],
//!         title_path: None,
//!         description_path: None,
//!     }],
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let doc = curator_xml::parse(r#"<STUDY alias="s-1"/>"#).unwrap();
//! let mut submission = SubmissionProcessor::new(vec![doc], &registry, None).unwrap();
//!
//! let study = submission.identifier("study", "/STUDY", "s-1").unwrap();
//! submission.set_id(&study.with_id("ACC-1")).unwrap();
//! assert_eq!(submission.identifiers(None)[0].id.as_deref(), Some("ACC-1"));
//! ```
//!
//! Processing is synchronous and single-threaded per submission; the only
//! state shared across submissions is the schema cache behind
//! [`validate::schema_cache`].

pub mod config;
pub mod document;
pub mod error;
pub mod identifier;
pub mod object;
pub mod path;
pub mod submission;
pub mod validate;
pub mod writer;

pub use config::{
    IdentifierPath, InsertionStrategy, ObjectPathSpec, PathConfig, ReferencePathSpec, Registry,
    SchemaPathSpec,
};
pub use document::DocumentProcessor;
pub use error::{Error, Result};
pub use identifier::ObjectIdentifier;
pub use object::ObjectProcessor;
pub use submission::SubmissionProcessor;
pub use validate::{
    NoopValidator, SchemaCache, StructuralValidator, ValidationMessage, schema_cache,
};
pub use writer::{DocumentWriter, XML_DECLARATION};
