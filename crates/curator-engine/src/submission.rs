//! Submission Processor: the submission-wide linking pass.

use crate::config::Registry;
use crate::document::{DocumentProcessor, LookupKey};
use crate::error::{Error, Result};
use crate::identifier::ObjectIdentifier;
use crate::object::ObjectProcessor;
use crate::validate::StructuralValidator;
use curator_xml::XmlDocument;
use std::collections::HashMap;

/// Aggregates every document of one submission behind a single lookup,
/// and runs the checks that are only meaningful once all documents are
/// loaded: cross-document name uniqueness and per-type cardinality.
///
/// Id assignment goes through this layer so a freshly assigned id reaches
/// every reference in every document, wherever the referencing instance
/// happens to live.
#[derive(Debug)]
pub struct SubmissionProcessor {
    documents: Vec<DocumentProcessor>,
    lookup: HashMap<LookupKey, (usize, usize)>,
}

impl SubmissionProcessor {
    /// Process and merge a batch of parsed documents.
    ///
    /// Cardinality rules are evaluated here, once, over the complete
    /// batch; they are a whole-submission property.
    pub fn new(
        docs: Vec<XmlDocument>,
        registry: &Registry,
        validator: Option<&dyn StructuralValidator>,
    ) -> Result<Self> {
        let mut documents = Vec::new();
        for doc in docs {
            documents.push(DocumentProcessor::new(doc, registry, validator)?);
        }

        let mut lookup = HashMap::new();
        for (doc_index, document) in documents.iter().enumerate() {
            for (key, object_index) in document.entries() {
                if lookup
                    .insert(key.clone(), (doc_index, object_index))
                    .is_some()
                {
                    return Err(Error::DuplicateName {
                        schema_type: key.schema_type.clone(),
                        name: key.name.clone(),
                    });
                }
            }
        }

        let processor = Self { documents, lookup };
        processor.check_cardinality(registry)?;
        Ok(processor)
    }

    fn check_cardinality(&self, registry: &Registry) -> Result<()> {
        for spec in registry.object_specs() {
            let found = self
                .objects()
                .filter(|o| {
                    o.schema_type() == spec.schema_type && o.object_type() == spec.object_type
                })
                .count();

            tracing::debug!(
                object_type = %spec.object_type,
                found,
                mandatory = spec.mandatory,
                single = spec.single,
                "cardinality check"
            );

            match (spec.mandatory, spec.single) {
                (true, true) if found != 1 => {
                    return Err(Error::ExpectedExactlyOne {
                        schema_type: spec.schema_type.clone(),
                        object_type: spec.object_type.clone(),
                        found,
                    });
                }
                (true, false) if found == 0 => {
                    return Err(Error::ExpectedAtLeastOne {
                        schema_type: spec.schema_type.clone(),
                        object_type: spec.object_type.clone(),
                    });
                }
                (false, true) if found > 1 => {
                    return Err(Error::ExpectedAtMostOne {
                        schema_type: spec.schema_type.clone(),
                        object_type: spec.object_type.clone(),
                        found,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// The processed documents, in submission order.
    pub fn documents(&self) -> &[DocumentProcessor] {
        &self.documents
    }

    /// Iterate every object in the submission.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectProcessor> {
        self.documents.iter().flat_map(|d| d.objects().iter())
    }

    /// Identity of the named instance, if the submission contains it.
    pub fn identifier(
        &self,
        schema_type: &str,
        root_path: &str,
        name: &str,
    ) -> Option<ObjectIdentifier> {
        self.lookup
            .get(&LookupKey {
                schema_type: schema_type.to_string(),
                root_path: root_path.to_string(),
                name: name.to_string(),
            })
            .map(|&(d, o)| self.documents[d].objects()[o].identifier().clone())
    }

    /// All resolved identities, optionally filtered by schema type.
    pub fn identifiers(&self, schema_type: Option<&str>) -> Vec<ObjectIdentifier> {
        self.objects()
            .filter(|o| schema_type.is_none_or(|s| o.schema_type() == s))
            .map(|o| o.identifier().clone())
            .collect()
    }

    /// Assign an externally generated id to the named object and write it
    /// into every reference across the submission that points at it.
    ///
    /// # Errors
    ///
    /// [`Error::MissingId`] when `target` carries no id,
    /// [`Error::UnknownObject`] when the submission holds no such object,
    /// and [`Error::IdAlreadyAssigned`] when a different id was assigned
    /// earlier. Re-assigning the same id is a no-op.
    pub fn set_id(&mut self, target: &ObjectIdentifier) -> Result<()> {
        let Some(id) = target.id.as_deref() else {
            return Err(Error::MissingId {
                name: target.name.clone(),
            });
        };

        let &(doc_index, object_index) =
            self.lookup
                .get(&LookupKey::of(target))
                .ok_or_else(|| Error::UnknownObject {
                    schema_type: target.schema_type.clone(),
                    name: target.name.clone(),
                })?;

        let object = self.documents[doc_index].object_mut(object_index);
        if let Some(existing) = &object.identifier().id {
            if existing != id {
                return Err(Error::IdAlreadyAssigned {
                    name: target.name.clone(),
                    existing: existing.clone(),
                    attempted: id.to_string(),
                });
            }
        }
        object.set_id(id)?;

        // A reference to this object may live in any document.
        let resolved = [target.clone()];
        for document in &mut self.documents {
            document.set_reference_ids(&resolved)?;
        }

        tracing::debug!(object = %target, "id propagated across submission");
        Ok(())
    }

    /// Union of every document's references.
    pub fn references(&self) -> Result<Vec<ObjectIdentifier>> {
        let mut out = Vec::new();
        for document in &self.documents {
            out.extend(document.references()?);
        }
        Ok(out)
    }

    /// References still missing an id, across the whole submission.
    ///
    /// After the caller has assigned every id, a non-empty result means
    /// dangling relations; the engine reports the list and leaves the
    /// verdict to the caller.
    pub fn unresolved_references(&self) -> Result<Vec<ObjectIdentifier>> {
        let mut out = Vec::new();
        for document in &self.documents {
            out.extend(document.unresolved_references()?);
        }
        Ok(out)
    }

    /// Serialized `(object_type, fragment)` pairs for every instance.
    pub fn fragments(&self) -> Vec<(String, String)> {
        self.objects()
            .map(|o| (o.object_type().to_string(), o.to_xml()))
            .collect()
    }
}
