//! Object Processor: one parsed object instance and its subtree.

use crate::config::{ReferencePathSpec, Registry};
use crate::error::{Error, Result};
use crate::identifier::ObjectIdentifier;
use crate::path::{self, PathExpr};
use crate::validate::StructuralValidator;
use curator_xml::{NodeId, XmlDocument};
use std::sync::Arc;

/// Wraps one object instance: its root node plus subtree, owned outright.
///
/// Construction identifies the instance's type from its root tag, runs
/// structural validation when a validator is supplied, then synchronizes
/// the instance's own identity and every reference it contains across
/// their configured alternate locations. A constructed processor is
/// therefore always in a reconciled state: every configured location that
/// can hold the name (or id) holds the same value.
#[derive(Debug)]
pub struct ObjectProcessor {
    doc: XmlDocument,
    spec: Arc<crate::config::ObjectPathSpec>,
    /// Owned reference specs, each with its pre-computed path below the
    /// object root.
    references: Vec<(Arc<ReferencePathSpec>, PathExpr)>,
    identifier: ObjectIdentifier,
}

impl ObjectProcessor {
    /// Build a processor around one instance document.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownType`] when no configured object type matches the
    /// root tag; [`Error::SchemaValidation`] when structural validation
    /// rejects the document; [`Error::NoName`], [`Error::ConflictingName`]
    /// or [`Error::ConflictingId`] when the instance's identity cannot be
    /// reconciled.
    pub fn new(
        doc: XmlDocument,
        registry: &Registry,
        validator: Option<&dyn StructuralValidator>,
    ) -> Result<Self> {
        let tag = doc.node(doc.root()).name.clone();
        let spec = registry.object_for_tag(&tag)?;

        if let Some(validator) = validator {
            if let Err(errors) = validator.validate(&doc, &spec.schema_type) {
                return Err(Error::SchemaValidation {
                    schema_type: spec.schema_type.clone(),
                    errors,
                });
            }
        }

        let mut references = Vec::new();
        for rspec in registry.references_for(&spec) {
            // Compile guarantees the reference root extends the object
            // root; the remainder is evaluated below the instance node.
            if let Some(rel) = path::strip_prefix(&rspec.root_path, &spec.root_path) {
                references.push((rspec, path::parse_path(&rel)?));
            }
        }

        let mut processor = Self {
            doc,
            identifier: ObjectIdentifier {
                schema_type: spec.schema_type.clone(),
                object_type: spec.object_type.clone(),
                root_path: spec.root_path.clone(),
                name: String::new(),
                id: None,
            },
            spec,
            references,
        };

        let (name, id) = processor.sync_identifier()?;
        processor.identifier.name = name;
        processor.identifier.id = id;
        processor.sync_references()?;

        tracing::debug!(object = %processor.identifier, "object synchronized");
        Ok(processor)
    }

    /// The instance's resolved identity. The name is always present; the
    /// id only once assigned.
    pub fn identifier(&self) -> &ObjectIdentifier {
        &self.identifier
    }

    pub fn schema_type(&self) -> &str {
        &self.spec.schema_type
    }

    pub fn object_type(&self) -> &str {
        &self.spec.object_type
    }

    /// Write `id` through every configured identifier location.
    ///
    /// Single assignment is the caller's contract; the submission layer
    /// rejects a second, different id before it reaches this point.
    pub fn set_id(&mut self, id: &str) -> Result<()> {
        let spec = self.spec.clone();
        let root = self.doc.root();
        for ip in &spec.identifier_paths {
            path::set_value(
                &mut self.doc,
                root,
                &path::parse_path(&ip.id_path)?,
                id,
                ip.id_insertion.as_ref(),
            )?;
        }
        self.identifier.id = Some(id.to_string());
        tracing::debug!(object = %self.identifier, "assigned id");
        Ok(())
    }

    /// All populated references, one entry per reference-node occurrence,
    /// each carrying the target's type and root path. The id is `None`
    /// until resolved.
    pub fn references(&self) -> Result<Vec<ObjectIdentifier>> {
        let mut out = Vec::new();
        for (rspec, rel) in &self.references {
            for node in path::get_nodes(&self.doc, self.doc.root(), rel) {
                if let Some(reference) = self.read_reference(rspec, node)? {
                    out.push(reference);
                }
            }
        }
        Ok(out)
    }

    /// Write resolved target ids into every reference occurrence whose
    /// target type, root path and name match.
    pub fn set_reference_ids(&mut self, resolved: &[ObjectIdentifier]) -> Result<()> {
        let references = self.references.clone();
        for (rspec, rel) in &references {
            for node in path::get_nodes(&self.doc, self.doc.root(), rel) {
                let Some(current) = self.read_reference(rspec, node)? else {
                    continue;
                };
                for target in resolved {
                    let Some(id) = &target.id else { continue };
                    if !target.same_object(&current) {
                        continue;
                    }
                    for p in &rspec.paths {
                        path::set_value(
                            &mut self.doc,
                            node,
                            &path::parse_path(&p.id_path)?,
                            id,
                            p.id_insertion.as_ref(),
                        )?;
                    }
                    tracing::debug!(reference = %target, "resolved reference");
                    break;
                }
            }
        }
        Ok(())
    }

    /// References still missing an id.
    pub fn unresolved_references(&self) -> Result<Vec<ObjectIdentifier>> {
        Ok(self
            .references()?
            .into_iter()
            .filter(|r| r.id.is_none())
            .collect())
    }

    /// The object's title, `Ok(None)` when the type declares no title path
    /// or the node is absent.
    pub fn title(&self) -> Result<Option<String>> {
        self.read_optional(self.spec.title_path.clone())
    }

    /// The object's description, mirroring [`Self::title`].
    pub fn description(&self) -> Result<Option<String>> {
        self.read_optional(self.spec.description_path.clone())
    }

    /// Overwrite the title in place; the node must exist.
    pub fn set_title(&mut self, value: &str) -> Result<()> {
        self.write_configured(self.spec.title_path.clone(), value)
    }

    /// Overwrite the description in place; the node must exist.
    pub fn set_description(&mut self, value: &str) -> Result<()> {
        self.write_configured(self.spec.description_path.clone(), value)
    }

    /// Serialize the instance fragment (no declaration).
    pub fn to_xml(&self) -> String {
        self.doc.to_xml()
    }

    fn read_optional(&self, configured: Option<String>) -> Result<Option<String>> {
        match configured {
            None => Ok(None),
            Some(p) => path::get_value(&self.doc, self.doc.root(), &path::parse_path(&p)?, true),
        }
    }

    fn write_configured(&mut self, configured: Option<String>, value: &str) -> Result<()> {
        let Some(p) = configured else {
            return Err(Error::UnconfiguredPath {
                object_type: self.spec.object_type.clone(),
            });
        };
        let root = self.doc.root();
        path::set_value(&mut self.doc, root, &path::parse_path(&p)?, value, None)
    }

    /// Reconcile the instance's own identity: collect the distinct names
    /// and ids across every configured location, assert there is exactly
    /// one name and at most one id, and write both back everywhere.
    fn sync_identifier(&mut self) -> Result<(String, Option<String>)> {
        let spec = self.spec.clone();
        let root = self.doc.root();

        let mut names: Vec<String> = Vec::new();
        let mut ids: Vec<String> = Vec::new();
        for ip in &spec.identifier_paths {
            let name_expr = path::parse_path(&ip.name_path)?;
            if let Some(v) = path::get_value(&self.doc, root, &name_expr, true)? {
                if !names.contains(&v) {
                    names.push(v);
                }
            }
            let id_expr = path::parse_path(&ip.id_path)?;
            if let Some(v) = path::get_value(&self.doc, root, &id_expr, true)? {
                if !ids.contains(&v) {
                    ids.push(v);
                }
            }
        }

        let name = match names.len() {
            0 => {
                return Err(Error::NoName {
                    schema_type: spec.schema_type.clone(),
                    root_path: spec.root_path.clone(),
                });
            }
            1 => names.remove(0),
            _ => {
                return Err(Error::ConflictingName {
                    schema_type: spec.schema_type.clone(),
                    root_path: spec.root_path.clone(),
                    values: names,
                });
            }
        };
        let id = match ids.len() {
            0 => None,
            1 => Some(ids.remove(0)),
            _ => {
                return Err(Error::ConflictingId {
                    schema_type: spec.schema_type.clone(),
                    name,
                    values: ids,
                });
            }
        };

        for ip in &spec.identifier_paths {
            path::set_value(
                &mut self.doc,
                root,
                &path::parse_path(&ip.name_path)?,
                &name,
                ip.name_insertion.as_ref(),
            )?;
            if let Some(id) = &id {
                path::set_value(
                    &mut self.doc,
                    root,
                    &path::parse_path(&ip.id_path)?,
                    id,
                    ip.id_insertion.as_ref(),
                )?;
            }
        }

        Ok((name, id))
    }

    /// Reconcile every populated reference node the same way the object's
    /// own identity is reconciled. A node with no value in any configured
    /// location is not a reference yet and is left untouched.
    fn sync_references(&mut self) -> Result<()> {
        let references = self.references.clone();
        for (rspec, rel) in &references {
            for node in path::get_nodes(&self.doc, self.doc.root(), rel) {
                self.sync_reference_node(rspec, node)?;
            }
        }
        Ok(())
    }

    fn sync_reference_node(&mut self, rspec: &ReferencePathSpec, node: NodeId) -> Result<()> {
        let mut names: Vec<String> = Vec::new();
        let mut ids: Vec<String> = Vec::new();
        for p in &rspec.paths {
            if let Some(v) = path::get_value(&self.doc, node, &path::parse_path(&p.name_path)?, true)? {
                if !names.contains(&v) {
                    names.push(v);
                }
            }
            if let Some(v) = path::get_value(&self.doc, node, &path::parse_path(&p.id_path)?, true)? {
                if !ids.contains(&v) {
                    ids.push(v);
                }
            }
        }

        if names.is_empty() && ids.is_empty() {
            // Relation never populated.
            return Ok(());
        }

        let name = match names.len() {
            0 => {
                return Err(Error::NoName {
                    schema_type: rspec.ref_schema_type.clone(),
                    root_path: rspec.root_path.clone(),
                });
            }
            1 => names.remove(0),
            _ => {
                return Err(Error::ConflictingName {
                    schema_type: rspec.ref_schema_type.clone(),
                    root_path: rspec.root_path.clone(),
                    values: names,
                });
            }
        };
        let id = match ids.len() {
            0 => None,
            1 => Some(ids.remove(0)),
            _ => {
                return Err(Error::ConflictingId {
                    schema_type: rspec.ref_schema_type.clone(),
                    name,
                    values: ids,
                });
            }
        };

        for p in &rspec.paths {
            path::set_value(
                &mut self.doc,
                node,
                &path::parse_path(&p.name_path)?,
                &name,
                p.name_insertion.as_ref(),
            )?;
            if let Some(id) = &id {
                path::set_value(
                    &mut self.doc,
                    node,
                    &path::parse_path(&p.id_path)?,
                    id,
                    p.id_insertion.as_ref(),
                )?;
            }
        }

        Ok(())
    }

    fn read_reference(
        &self,
        rspec: &ReferencePathSpec,
        node: NodeId,
    ) -> Result<Option<ObjectIdentifier>> {
        let mut name = None;
        let mut id = None;
        for p in &rspec.paths {
            if name.is_none() {
                name = path::get_value(&self.doc, node, &path::parse_path(&p.name_path)?, true)?;
            }
            if id.is_none() {
                id = path::get_value(&self.doc, node, &path::parse_path(&p.id_path)?, true)?;
            }
        }

        let Some(name) = name else {
            return Ok(None);
        };
        Ok(Some(ObjectIdentifier {
            schema_type: rspec.ref_schema_type.clone(),
            object_type: rspec.ref_object_type.clone(),
            root_path: rspec.ref_root_path.clone(),
            name,
            id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        IdentifierPath, InsertionStrategy, ObjectPathSpec, PathConfig, ReferencePathSpec,
    };
    use crate::validate::ValidationMessage;
    use curator_xml::parse;

    fn registry() -> Registry {
        Registry::compile(PathConfig {
            objects: vec![
                ObjectPathSpec {
                    schema_type: "study".to_string(),
                    object_type: "study".to_string(),
                    root_path: "/STUDY".to_string(),
                    mandatory: true,
                    single: true,
                    identifier_paths: vec![
                        IdentifierPath {
                            name_path: "@alias".to_string(),
                            id_path: "@accession".to_string(),
                            name_insertion: None,
                            id_insertion: None,
                        },
                        IdentifierPath {
                            name_path: "IDENTIFIERS/SUBMITTER_ID".to_string(),
                            id_path: "IDENTIFIERS/PRIMARY_ID".to_string(),
                            name_insertion: Some(InsertionStrategy::FirstChild),
                            id_insertion: Some(InsertionStrategy::FirstChild),
                        },
                    ],
                    title_path: Some("DESCRIPTOR/STUDY_TITLE".to_string()),
                    description_path: Some("DESCRIPTOR/STUDY_DESCRIPTION".to_string()),
                },
                ObjectPathSpec {
                    schema_type: "experiment".to_string(),
                    object_type: "experiment".to_string(),
                    root_path: "/EXPERIMENT".to_string(),
                    mandatory: false,
                    single: false,
                    identifier_paths: vec![IdentifierPath {
                        name_path: "@alias".to_string(),
                        id_path: "@accession".to_string(),
                        name_insertion: None,
                        id_insertion: None,
                    }],
                    title_path: None,
                    description_path: None,
                },
            ],
            references: vec![ReferencePathSpec {
                schema_type: "experiment".to_string(),
                object_type: "experiment".to_string(),
                ref_schema_type: "study".to_string(),
                ref_object_type: "study".to_string(),
                root_path: "/EXPERIMENT/STUDY_REF".to_string(),
                ref_root_path: "/STUDY".to_string(),
                paths: vec![IdentifierPath {
                    name_path: "@refname".to_string(),
                    id_path: "@accession".to_string(),
                    name_insertion: None,
                    id_insertion: None,
                }],
            }],
            schemas: vec![],
        })
        .unwrap()
    }

    fn study(xml: &str) -> ObjectProcessor {
        ObjectProcessor::new(parse(xml).unwrap(), &registry(), None).unwrap()
    }

    #[test]
    fn test_identity_from_any_location() {
        let from_attr = study(r#"<STUDY alias="s-1"/>"#);
        assert_eq!(from_attr.identifier().name, "s-1");

        let from_element =
            study("<STUDY><IDENTIFIERS><SUBMITTER_ID>s-1</SUBMITTER_ID></IDENTIFIERS></STUDY>");
        assert_eq!(from_element.identifier().name, "s-1");
        assert_eq!(from_element.identifier().id, None);
    }

    #[test]
    fn test_synchronization_invariant() {
        // Name present only as an attribute; after construction both
        // configured locations agree.
        let processor = study(r#"<STUDY alias="s-1" accession="ACC1"/>"#);
        let xml = processor.to_xml();
        assert!(xml.contains("<SUBMITTER_ID>s-1</SUBMITTER_ID>"));
        assert!(xml.contains("<PRIMARY_ID>ACC1</PRIMARY_ID>"));
        assert!(xml.contains(r#"alias="s-1""#));
        assert_eq!(processor.identifier().id.as_deref(), Some("ACC1"));
    }

    #[test]
    fn test_synchronization_is_idempotent() {
        let once = study(r#"<STUDY alias="s-1" accession="ACC1"/>"#).to_xml();
        let twice = ObjectProcessor::new(parse(&once).unwrap(), &registry(), None)
            .unwrap()
            .to_xml();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_name_rejected() {
        let err = ObjectProcessor::new(parse("<STUDY/>").unwrap(), &registry(), None).unwrap_err();
        assert!(matches!(err, Error::NoName { .. }));
    }

    #[test]
    fn test_conflicting_name_rejected() {
        let err = ObjectProcessor::new(
            parse(r#"<STUDY alias="a"><IDENTIFIERS><SUBMITTER_ID>b</SUBMITTER_ID></IDENTIFIERS></STUDY>"#)
                .unwrap(),
            &registry(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConflictingName { .. }));
    }

    #[test]
    fn test_conflicting_id_rejected() {
        let err = ObjectProcessor::new(
            parse(r#"<STUDY alias="a" accession="ACC1"><IDENTIFIERS><PRIMARY_ID>ACC2</PRIMARY_ID></IDENTIFIERS></STUDY>"#)
                .unwrap(),
            &registry(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConflictingId { .. }));
    }

    #[test]
    fn test_unknown_root_tag_rejected() {
        let err =
            ObjectProcessor::new(parse("<MYSTERY/>").unwrap(), &registry(), None).unwrap_err();
        assert!(matches!(err, Error::UnknownType { .. }));
    }

    #[test]
    fn test_set_id_writes_every_location() {
        let mut processor = study(r#"<STUDY alias="s-1"/>"#);
        processor.set_id("ACC7").unwrap();

        assert_eq!(processor.identifier().id.as_deref(), Some("ACC7"));
        let xml = processor.to_xml();
        assert!(xml.contains(r#"accession="ACC7""#));
        assert!(xml.contains("<PRIMARY_ID>ACC7</PRIMARY_ID>"));
    }

    #[test]
    fn test_set_id_reuses_inserted_container() {
        let mut processor = study(r#"<STUDY alias="s-1"/>"#);
        processor.set_id("ACC7").unwrap();
        processor.set_id("ACC7").unwrap();

        let xml = processor.to_xml();
        assert_eq!(xml.matches("<IDENTIFIERS>").count(), 1);
    }

    #[test]
    fn test_structural_validation_failure_carries_all_violations() {
        let reject = |_: &XmlDocument, _: &str| -> std::result::Result<(), Vec<ValidationMessage>> {
            Err(vec![
                ValidationMessage::new(Some(3), "missing DESCRIPTOR"),
                ValidationMessage::new(None, "unexpected LINKS"),
            ])
        };

        let err = ObjectProcessor::new(
            parse(r#"<STUDY alias="s-1"/>"#).unwrap(),
            &registry(),
            Some(&reject),
        )
        .unwrap_err();
        match err {
            Error::SchemaValidation {
                schema_type,
                errors,
            } => {
                assert_eq!(schema_type, "study");
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected SchemaValidation, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_synchronization_and_resolution() {
        let mut processor = ObjectProcessor::new(
            parse(r#"<EXPERIMENT alias="e-1"><STUDY_REF refname="s-1"/></EXPERIMENT>"#).unwrap(),
            &registry(),
            None,
        )
        .unwrap();

        let refs = processor.references().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].object_type, "study");
        assert_eq!(refs[0].name, "s-1");
        assert_eq!(refs[0].id, None);
        assert_eq!(processor.unresolved_references().unwrap().len(), 1);

        let resolved = refs[0].clone().with_id("ACC1");
        processor.set_reference_ids(&[resolved]).unwrap();

        let refs = processor.references().unwrap();
        assert_eq!(refs[0].id.as_deref(), Some("ACC1"));
        assert!(processor.unresolved_references().unwrap().is_empty());
        assert!(processor.to_xml().contains(r#"accession="ACC1""#));
    }

    #[test]
    fn test_empty_reference_left_untouched() {
        let processor = ObjectProcessor::new(
            parse(r#"<EXPERIMENT alias="e-1"><STUDY_REF/></EXPERIMENT>"#).unwrap(),
            &registry(),
            None,
        )
        .unwrap();

        // A reference node with no identity anywhere is not a reference.
        assert!(processor.references().unwrap().is_empty());
        assert!(processor.to_xml().contains("<STUDY_REF/>"));
    }

    #[test]
    fn test_title_and_description() {
        let mut processor = study(
            r#"<STUDY alias="s-1"><DESCRIPTOR><STUDY_TITLE>Old</STUDY_TITLE></DESCRIPTOR></STUDY>"#,
        );
        assert_eq!(processor.title().unwrap().as_deref(), Some("Old"));
        assert_eq!(processor.description().unwrap(), None);

        processor.set_title("New").unwrap();
        assert_eq!(processor.title().unwrap().as_deref(), Some("New"));

        let experiment = ObjectProcessor::new(
            parse(r#"<EXPERIMENT alias="e-1"/>"#).unwrap(),
            &registry(),
            None,
        )
        .unwrap();
        assert_eq!(experiment.title().unwrap(), None);
    }
}
