//! Declarative path configuration and its compiled registry.
//!
//! A workflow supplies a [`PathConfig`] describing where its metadata
//! objects live inside XML documents: the root path of each object type,
//! the alternate locations holding an object's name and id, the typed
//! references between objects, and the per-schema "set" wrapper used by
//! documents carrying many instances. The configuration is pure data
//! (serde-compatible, typically loaded from YAML) and is compiled once
//! into a [`Registry`] of resolved, pre-validated handles.

use crate::error::{Error, Result};
use crate::path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Where a missing element is attached when a value is first written.
///
/// Strategies form a closed, auditable set selected per [`IdentifierPath`]
/// at configuration time; attribute targets never insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionStrategy {
    /// Attach as the first child of the deepest existing ancestor.
    FirstChild,

    /// Attach as the last child of the deepest existing ancestor.
    LastChild,

    /// Attach directly after the last existing child whose tag is listed;
    /// first child when none is present.
    AfterAnyOf(Vec<String>),
}

/// One alternate location where an object's (or reference's) name and id
/// are stored, relative to the object or reference node.
///
/// Paths address element text (`IDENTIFIERS/PRIMARY_ID`) or an attribute
/// (`@accession`, `IDENTIFIERS/@label`), and may be a parenthesized
/// alternation of several expressions joined by `|`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierPath {
    pub name_path: String,
    pub id_path: String,

    /// Strategy for creating the name element when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_insertion: Option<InsertionStrategy>,

    /// Strategy for creating the id element when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_insertion: Option<InsertionStrategy>,
}

/// Declares one object type: where its instances live and how many of
/// them a submission may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPathSpec {
    pub schema_type: String,
    pub object_type: String,

    /// Absolute path of the instance root node.
    pub root_path: String,

    /// The submission must carry at least one instance.
    #[serde(default)]
    pub mandatory: bool,

    /// The submission may carry at most one instance.
    #[serde(default)]
    pub single: bool,

    /// Alternate name/id locations; must not be empty.
    pub identifier_paths: Vec<IdentifierPath>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_path: Option<String>,
}

/// Declares a typed reference from one object type to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePathSpec {
    /// Schema/object type the reference lives in.
    pub schema_type: String,
    pub object_type: String,

    /// Schema/object type the reference points at.
    pub ref_schema_type: String,
    pub ref_object_type: String,

    /// Absolute path of the reference node; extends the owning object's
    /// root path and may match any number of nodes.
    pub root_path: String,

    /// The target object type's root path.
    pub ref_root_path: String,

    /// Name/id locations relative to the reference node; must not be empty.
    pub paths: Vec<IdentifierPath>,
}

/// Declares a schema type's set wrapper and root path aliases, used for
/// document-type detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaPathSpec {
    pub schema_type: String,

    /// Path of the wrapper element holding multiple sibling instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_path: Option<String>,

    /// Root paths belonging to this schema type.
    pub root_paths: Vec<String>,
}

/// A workflow's complete path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    pub objects: Vec<ObjectPathSpec>,

    #[serde(default)]
    pub references: Vec<ReferencePathSpec>,

    #[serde(default)]
    pub schemas: Vec<SchemaPathSpec>,
}

/// The compiled form of a [`PathConfig`]: canonicalized paths and lookup
/// tables resolved once at load time.
#[derive(Debug)]
pub struct Registry {
    objects: Vec<Arc<ObjectPathSpec>>,
    by_root_tag: HashMap<String, Arc<ObjectPathSpec>>,
    references: Vec<Arc<ReferencePathSpec>>,
    schemas: HashMap<String, Arc<SchemaPathSpec>>,
    by_set_tag: HashMap<String, Arc<SchemaPathSpec>>,
}

impl Registry {
    /// Compile a configuration, canonicalizing every path (root paths
    /// absolute, value paths relative) and rejecting inconsistencies.
    pub fn compile(config: PathConfig) -> Result<Self> {
        let mut objects = Vec::new();
        let mut by_root_tag = HashMap::new();

        for mut spec in config.objects {
            spec.root_path = canonical_root_path(&spec.root_path)?;
            for ip in &mut spec.identifier_paths {
                canonicalize_identifier_path(ip)?;
            }
            if spec.identifier_paths.is_empty() {
                return Err(Error::InvalidConfig {
                    reason: format!("object type {} declares no identifier paths", spec.object_type),
                });
            }
            if let Some(p) = spec.title_path.take() {
                spec.title_path = Some(canonical_value_path(&p)?);
            }
            if let Some(p) = spec.description_path.take() {
                spec.description_path = Some(canonical_value_path(&p)?);
            }

            let tag = path::last_segment(&spec.root_path).to_string();
            let spec = Arc::new(spec);
            if by_root_tag.insert(tag.clone(), spec.clone()).is_some() {
                return Err(Error::InvalidConfig {
                    reason: format!("root tag <{}> is claimed by more than one object type", tag),
                });
            }
            objects.push(spec);
        }

        let mut references = Vec::new();
        for mut spec in config.references {
            spec.root_path = canonical_root_path(&spec.root_path)?;
            spec.ref_root_path = canonical_root_path(&spec.ref_root_path)?;
            for ip in &mut spec.paths {
                canonicalize_identifier_path(ip)?;
            }
            if spec.paths.is_empty() {
                return Err(Error::InvalidConfig {
                    reason: format!(
                        "reference {} -> {} declares no identifier paths",
                        spec.object_type, spec.ref_object_type
                    ),
                });
            }

            let owner = objects.iter().find(|o| {
                o.schema_type == spec.schema_type && o.object_type == spec.object_type
            });
            match owner {
                Some(owner) if path::strip_prefix(&spec.root_path, &owner.root_path).is_some() => {}
                Some(owner) => {
                    return Err(Error::InvalidConfig {
                        reason: format!(
                            "reference path {} does not extend object root {}",
                            spec.root_path, owner.root_path
                        ),
                    });
                }
                None => {
                    return Err(Error::InvalidConfig {
                        reason: format!(
                            "reference declared for unknown object type {}:{}",
                            spec.schema_type, spec.object_type
                        ),
                    });
                }
            }
            references.push(Arc::new(spec));
        }

        let mut schemas = HashMap::new();
        let mut by_set_tag = HashMap::new();
        for mut spec in config.schemas {
            if let Some(p) = spec.set_path.take() {
                spec.set_path = Some(canonical_root_path(&p)?);
            }
            spec.root_paths = std::mem::take(&mut spec.root_paths)
                .iter()
                .map(|p| canonical_root_path(p))
                .collect::<Result<_>>()?;

            let spec = Arc::new(spec);
            if let Some(set_path) = &spec.set_path {
                let tag = path::last_segment(set_path);
                if by_set_tag.insert(tag.to_string(), spec.clone()).is_some() {
                    return Err(Error::InvalidConfig {
                        reason: format!("set tag <{}> is claimed by more than one schema", tag),
                    });
                }
            }
            if schemas
                .insert(spec.schema_type.clone(), spec.clone())
                .is_some()
            {
                return Err(Error::InvalidConfig {
                    reason: format!("schema type {} declared twice", spec.schema_type),
                });
            }
        }

        Ok(Self {
            objects,
            by_root_tag,
            references,
            schemas,
            by_set_tag,
        })
    }

    /// All compiled object specs, in declaration order.
    pub fn object_specs(&self) -> &[Arc<ObjectPathSpec>] {
        &self.objects
    }

    /// Resolve the object type whose root path ends in `tag`.
    pub fn object_for_tag(&self, tag: &str) -> Result<Arc<ObjectPathSpec>> {
        self.by_root_tag
            .get(tag)
            .cloned()
            .ok_or_else(|| Error::UnknownType {
                tag: tag.to_string(),
            })
    }

    /// Reference specs owned by the given object type.
    pub(crate) fn references_for(&self, spec: &ObjectPathSpec) -> Vec<Arc<ReferencePathSpec>> {
        self.references
            .iter()
            .filter(|r| r.schema_type == spec.schema_type && r.object_type == spec.object_type)
            .cloned()
            .collect()
    }

    /// Schema path spec by schema type.
    pub fn schema(&self, schema_type: &str) -> Result<Arc<SchemaPathSpec>> {
        self.schemas
            .get(schema_type)
            .cloned()
            .ok_or_else(|| Error::UnknownSchema {
                schema_type: schema_type.to_string(),
            })
    }

    /// Schema whose set wrapper ends in `tag`, if any.
    pub fn schema_for_set_tag(&self, tag: &str) -> Option<Arc<SchemaPathSpec>> {
        self.by_set_tag.get(tag).cloned()
    }

    /// Detect which schema type a parsed document belongs to, via its set
    /// wrapper tag or its root tag.
    pub fn detect_schema_type(&self, doc: &curator_xml::XmlDocument) -> Option<&str> {
        let tag = &doc.node(doc.root()).name;
        if let Some(schema) = self.by_set_tag.get(tag) {
            return Some(&schema.schema_type);
        }
        self.by_root_tag
            .get(tag)
            .map(|spec| spec.schema_type.as_str())
    }
}

fn canonical_root_path(raw: &str) -> Result<String> {
    let canonical = path::to_absolute(raw);
    let expr = path::parse_path(&canonical)?;
    if expr.alternatives().len() > 1 {
        return Err(Error::MalformedPath {
            path: raw.to_string(),
            reason: "alternation is not allowed in root paths".to_string(),
        });
    }
    if expr.alternatives()[0].attribute.is_some() {
        return Err(Error::MalformedPath {
            path: raw.to_string(),
            reason: "root paths cannot address attributes".to_string(),
        });
    }
    Ok(canonical)
}

fn canonical_value_path(raw: &str) -> Result<String> {
    let canonical = path::to_relative(raw);
    path::parse_path(&canonical)?;
    Ok(canonical)
}

fn canonicalize_identifier_path(ip: &mut IdentifierPath) -> Result<()> {
    ip.name_path = canonical_value_path(&ip.name_path)?;
    ip.id_path = canonical_value_path(&ip.id_path)?;

    for (p, insertion) in [
        (&ip.name_path, &ip.name_insertion),
        (&ip.id_path, &ip.id_insertion),
    ] {
        if insertion.is_some() && path::is_attribute_path(p)? {
            return Err(Error::InvalidConfig {
                reason: format!("attribute path {} cannot declare an insertion strategy", p),
            });
        }
    }
    Ok(())
}
