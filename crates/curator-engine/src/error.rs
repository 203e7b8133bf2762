//! Error types for the resolution engine.

use crate::validate::ValidationMessage;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while linking a submission.
///
/// Configuration errors (`InvalidConfig`, `MalformedPath`, `UnknownType`,
/// `UnknownSchema`) are programmer mistakes and never retried. Data
/// integrity errors (`NoName`, `ConflictingName`, `ConflictingId`,
/// `DuplicateName`, `MixedSchema`) describe malformed submitted documents
/// and surface to the submitter; no partial mutation is rolled back, so
/// callers validate a staged copy before committing. Cardinality errors are
/// only raised at submission assembly, once every document is merged.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration itself is inconsistent.
    #[error("invalid path configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A configured path does not parse.
    #[error("malformed path {path}: {reason}")]
    MalformedPath { path: String, reason: String },

    /// No configured object type matches a document's root tag.
    #[error("no configured object type matches root tag <{tag}>")]
    UnknownType { tag: String },

    /// No configured schema type with this name.
    #[error("unknown schema type {schema_type}")]
    UnknownSchema { schema_type: String },

    /// A path matched no node and no insertion strategy applies.
    #[error("no node matches path {path}")]
    NotFound { path: String },

    /// A path matched more than one node where one was required.
    #[error("more than one node matches path {path}")]
    AmbiguousMatch { path: String },

    /// A node exists but holds no value.
    #[error("node at {path} has no value")]
    MissingValue { path: String },

    /// No configured identifier location holds a name.
    #[error("{schema_type} object at {root_path} has no name in any configured location")]
    NoName {
        schema_type: String,
        root_path: String,
    },

    /// Different identifier locations hold different names.
    #[error("conflicting names for {schema_type} object at {root_path}: {values:?}")]
    ConflictingName {
        schema_type: String,
        root_path: String,
        values: Vec<String>,
    },

    /// Different identifier locations hold different ids.
    #[error("conflicting ids for {schema_type} object {name}: {values:?}")]
    ConflictingId {
        schema_type: String,
        name: String,
        values: Vec<String>,
    },

    /// Two objects share a (schema type, root path, name) triple.
    #[error("duplicate {schema_type} object named {name}")]
    DuplicateName { schema_type: String, name: String },

    /// One parsed document holds instances of different schema types.
    #[error("document mixes schema types: expected {expected}, found {found}")]
    MixedSchema { expected: String, found: String },

    /// Lookup for an object that is not part of the submission.
    #[error("no {schema_type} object named {name} in this submission")]
    UnknownObject { schema_type: String, name: String },

    /// Structural (schema file) validation failed.
    #[error("{schema_type} document failed structural validation ({} violations)", .errors.len())]
    SchemaValidation {
        schema_type: String,
        errors: Vec<ValidationMessage>,
    },

    /// A mandatory, singular object type did not appear exactly once.
    #[error("expected exactly one {object_type} per submission, found {found}")]
    ExpectedExactlyOne {
        schema_type: String,
        object_type: String,
        found: usize,
    },

    /// A mandatory object type did not appear at all.
    #[error("expected at least one {object_type} per submission")]
    ExpectedAtLeastOne {
        schema_type: String,
        object_type: String,
    },

    /// A singular object type appeared more than once.
    #[error("expected at most one {object_type} per submission, found {found}")]
    ExpectedAtMostOne {
        schema_type: String,
        object_type: String,
        found: usize,
    },

    /// A second, different id was assigned to the same object.
    #[error("object {name} already carries id {existing} (attempted {attempted})")]
    IdAlreadyAssigned {
        name: String,
        existing: String,
        attempted: String,
    },

    /// `set_id` was called with an identifier that carries no id.
    #[error("identifier for {name} carries no id")]
    MissingId { name: String },

    /// The writer needs exactly one of object type or schema type.
    #[error("exactly one of object_type or schema_type must be given")]
    AmbiguousCardinality,

    /// Multiple fragments but nothing to wrap them in.
    #[error("no set wrapper configured for {type_name}; cannot write multiple fragments")]
    SetTagMissing { type_name: String },

    /// Title or description access on a type that declares no such path.
    #[error("no such path configured for object type {object_type}")]
    UnconfiguredPath { object_type: String },

    #[error(transparent)]
    Xml(#[from] curator_xml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
