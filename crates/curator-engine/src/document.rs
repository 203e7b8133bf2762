//! Document Processor: one parsed document, one or many instances.

use crate::config::Registry;
use crate::error::{Error, Result};
use crate::identifier::ObjectIdentifier;
use crate::object::ObjectProcessor;
use crate::validate::StructuralValidator;
use curator_xml::XmlDocument;
use std::collections::HashMap;

/// Key of the per-submission object lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct LookupKey {
    pub schema_type: String,
    pub root_path: String,
    pub name: String,
}

impl LookupKey {
    pub fn of(identifier: &ObjectIdentifier) -> Self {
        Self {
            schema_type: identifier.schema_type.clone(),
            root_path: identifier.root_path.clone(),
            name: identifier.name.clone(),
        }
    }
}

/// Wraps one parsed document: either a single object instance, or a set
/// wrapper holding many instances of one schema type.
///
/// Splitting detaches each instance into its own subtree, so every
/// [`ObjectProcessor`] owns its document outright; the writer reassembles
/// set documents from the processed fragments.
#[derive(Debug)]
pub struct DocumentProcessor {
    schema_type: String,
    objects: Vec<ObjectProcessor>,
    lookup: HashMap<LookupKey, usize>,
}

impl DocumentProcessor {
    /// Split and index one parsed document.
    ///
    /// # Errors
    ///
    /// Everything [`ObjectProcessor::new`] raises, plus
    /// [`Error::MixedSchema`] when instances disagree on the schema type
    /// and [`Error::DuplicateName`] when two instances share a name.
    pub fn new(
        doc: XmlDocument,
        registry: &Registry,
        validator: Option<&dyn StructuralValidator>,
    ) -> Result<Self> {
        let root_tag = doc.node(doc.root()).name.clone();

        let mut objects = Vec::new();
        let schema_type = match registry.schema_for_set_tag(&root_tag) {
            Some(schema) => {
                for child in doc.node(doc.root()).children().to_vec() {
                    let object =
                        ObjectProcessor::new(doc.extract_subtree(child), registry, validator)?;
                    if object.schema_type() != schema.schema_type {
                        return Err(Error::MixedSchema {
                            expected: schema.schema_type.clone(),
                            found: object.schema_type().to_string(),
                        });
                    }
                    objects.push(object);
                }
                schema.schema_type.clone()
            }
            None => {
                let object = ObjectProcessor::new(doc, registry, validator)?;
                let schema_type = object.schema_type().to_string();
                objects.push(object);
                schema_type
            }
        };

        let mut lookup = HashMap::new();
        for (index, object) in objects.iter().enumerate() {
            let key = LookupKey::of(object.identifier());
            if lookup.insert(key, index).is_some() {
                return Err(Error::DuplicateName {
                    schema_type: object.schema_type().to_string(),
                    name: object.identifier().name.clone(),
                });
            }
        }

        tracing::debug!(
            schema_type = %schema_type,
            objects = objects.len(),
            "document processed"
        );
        Ok(Self {
            schema_type,
            objects,
            lookup,
        })
    }

    /// Schema type shared by every instance in this document.
    pub fn schema_type(&self) -> &str {
        &self.schema_type
    }

    /// The contained object processors, in document order.
    pub fn objects(&self) -> &[ObjectProcessor] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Identity of the named instance, if present.
    pub fn identifier(
        &self,
        schema_type: &str,
        root_path: &str,
        name: &str,
    ) -> Option<ObjectIdentifier> {
        self.index_of(schema_type, root_path, name)
            .map(|i| self.objects[i].identifier().clone())
    }

    /// The named instance's processor.
    pub fn processor(
        &self,
        schema_type: &str,
        root_path: &str,
        name: &str,
    ) -> Result<&ObjectProcessor> {
        self.index_of(schema_type, root_path, name)
            .map(|i| &self.objects[i])
            .ok_or_else(|| Error::UnknownObject {
                schema_type: schema_type.to_string(),
                name: name.to_string(),
            })
    }

    /// The named instance's processor, mutably.
    pub fn processor_mut(
        &mut self,
        schema_type: &str,
        root_path: &str,
        name: &str,
    ) -> Result<&mut ObjectProcessor> {
        match self.index_of(schema_type, root_path, name) {
            Some(i) => Ok(&mut self.objects[i]),
            None => Err(Error::UnknownObject {
                schema_type: schema_type.to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// All references declared by instances in this document.
    pub fn references(&self) -> Result<Vec<ObjectIdentifier>> {
        let mut out = Vec::new();
        for object in &self.objects {
            out.extend(object.references()?);
        }
        Ok(out)
    }

    /// Propagate resolved target ids into every instance.
    pub fn set_reference_ids(&mut self, resolved: &[ObjectIdentifier]) -> Result<()> {
        for object in &mut self.objects {
            object.set_reference_ids(resolved)?;
        }
        Ok(())
    }

    /// References in this document still missing an id.
    pub fn unresolved_references(&self) -> Result<Vec<ObjectIdentifier>> {
        let mut out = Vec::new();
        for object in &self.objects {
            out.extend(object.unresolved_references()?);
        }
        Ok(out)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&LookupKey, usize)> {
        self.lookup.iter().map(|(k, v)| (k, *v))
    }

    pub(crate) fn object_mut(&mut self, index: usize) -> &mut ObjectProcessor {
        &mut self.objects[index]
    }

    fn index_of(&self, schema_type: &str, root_path: &str, name: &str) -> Option<usize> {
        self.lookup
            .get(&LookupKey {
                schema_type: schema_type.to_string(),
                root_path: root_path.to_string(),
                name: name.to_string(),
            })
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdentifierPath, ObjectPathSpec, PathConfig, SchemaPathSpec};
    use curator_xml::parse;

    fn spec(schema_type: &str, root: &str, name_attr: &str) -> ObjectPathSpec {
        ObjectPathSpec {
            schema_type: schema_type.to_string(),
            object_type: schema_type.to_string(),
            root_path: root.to_string(),
            mandatory: false,
            single: false,
            identifier_paths: vec![IdentifierPath {
                name_path: format!("@{}", name_attr),
                id_path: "@accession".to_string(),
                name_insertion: None,
                id_insertion: None,
            }],
            title_path: None,
            description_path: None,
        }
    }

    fn registry() -> Registry {
        Registry::compile(PathConfig {
            objects: vec![spec("sample", "/SAMPLE", "alias"), spec("study", "/STUDY", "alias")],
            references: vec![],
            schemas: vec![
                SchemaPathSpec {
                    schema_type: "sample".to_string(),
                    set_path: Some("/SAMPLE_SET".to_string()),
                    root_paths: vec!["/SAMPLE".to_string()],
                },
                SchemaPathSpec {
                    schema_type: "study".to_string(),
                    set_path: Some("/STUDY_SET".to_string()),
                    root_paths: vec!["/STUDY".to_string()],
                },
            ],
        })
        .unwrap()
    }

    #[test]
    fn test_single_instance_document() {
        let processor = DocumentProcessor::new(
            parse(r#"<SAMPLE alias="sm-1"/>"#).unwrap(),
            &registry(),
            None,
        )
        .unwrap();

        assert_eq!(processor.schema_type(), "sample");
        assert_eq!(processor.len(), 1);
        assert!(processor.identifier("sample", "/SAMPLE", "sm-1").is_some());
    }

    #[test]
    fn test_set_document_splits_instances() {
        let processor = DocumentProcessor::new(
            parse(r#"<SAMPLE_SET><SAMPLE alias="sm-1"/><SAMPLE alias="sm-2"/></SAMPLE_SET>"#)
                .unwrap(),
            &registry(),
            None,
        )
        .unwrap();

        assert_eq!(processor.len(), 2);
        assert!(processor.identifier("sample", "/SAMPLE", "sm-2").is_some());
        assert!(processor.identifier("sample", "/SAMPLE", "sm-3").is_none());
    }

    #[test]
    fn test_empty_set_document() {
        let processor =
            DocumentProcessor::new(parse("<SAMPLE_SET/>").unwrap(), &registry(), None).unwrap();
        assert!(processor.is_empty());
        assert_eq!(processor.schema_type(), "sample");
    }

    #[test]
    fn test_duplicate_name_within_document() {
        let err = DocumentProcessor::new(
            parse(r#"<SAMPLE_SET><SAMPLE alias="sm-1"/><SAMPLE alias="sm-1"/></SAMPLE_SET>"#)
                .unwrap(),
            &registry(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));
    }

    #[test]
    fn test_mixed_schema_rejected() {
        let err = DocumentProcessor::new(
            parse(r#"<SAMPLE_SET><SAMPLE alias="sm-1"/><STUDY alias="s-1"/></SAMPLE_SET>"#)
                .unwrap(),
            &registry(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MixedSchema { .. }));
    }

    #[test]
    fn test_unknown_object_lookup() {
        let processor = DocumentProcessor::new(
            parse(r#"<SAMPLE alias="sm-1"/>"#).unwrap(),
            &registry(),
            None,
        )
        .unwrap();

        assert!(matches!(
            processor.processor("sample", "/SAMPLE", "missing"),
            Err(Error::UnknownObject { .. })
        ));
    }
}
