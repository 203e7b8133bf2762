//! Object identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The resolved identity of one object instance.
///
/// An instance is identified by `(schema_type, root_path, name)` until an
/// id is assigned; thereafter the id is authoritative and immutable. The
/// engine never generates ids itself, it only writes externally supplied
/// ones through the configured locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectIdentifier {
    pub schema_type: String,
    pub object_type: String,
    pub root_path: String,
    pub name: String,
    pub id: Option<String>,
}

impl ObjectIdentifier {
    /// Copy of this identifier carrying `id`.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Whether both identifiers name the same object instance, id aside.
    pub(crate) fn same_object(&self, other: &ObjectIdentifier) -> bool {
        self.schema_type == other.schema_type
            && self.object_type == other.object_type
            && self.root_path == other.root_path
            && self.name == other.name
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} \"{}\"",
            self.schema_type, self.object_type, self.name
        )?;
        if let Some(id) = &self.id {
            write!(f, " ({})", id)?;
        }
        Ok(())
    }
}
