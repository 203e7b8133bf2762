//! Link a batch of documents: reconcile identities, assign accessions,
//! resolve references, write the reassembled set documents.

use anyhow::{Context, Result, bail};
use curator_engine::{DocumentWriter, PathConfig, Registry, SubmissionProcessor};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub fn execute(config: &Path, inputs: &[PathBuf], out_dir: Option<&Path>) -> Result<()> {
    let registry = load_registry(config)?;

    let mut docs = Vec::new();
    for input in inputs {
        let text = fs::read_to_string(input)
            .with_context(|| format!("reading {}", input.display()))?;
        let doc = curator_xml::parse(&text)
            .with_context(|| format!("parsing {}", input.display()))?;
        docs.push(doc);
    }

    let mut submission = SubmissionProcessor::new(docs, &registry, None)?;

    // Accessions are supplied here; the engine never generates ids itself.
    for identifier in submission.identifiers(None) {
        if identifier.id.is_some() {
            continue;
        }
        let accession = format!(
            "{}-{}",
            identifier.object_type.to_uppercase(),
            Uuid::new_v4()
        );
        submission.set_id(&identifier.with_id(accession))?;
    }

    let dangling = submission.unresolved_references()?;
    if !dangling.is_empty() {
        for reference in &dangling {
            tracing::warn!(reference = %reference, "dangling reference");
        }
        bail!(
            "{} reference(s) do not resolve to any object in this submission",
            dangling.len()
        );
    }

    for identifier in submission.identifiers(None) {
        println!("{}", identifier);
    }

    if let Some(out_dir) = out_dir {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("creating {}", out_dir.display()))?;
        let writer = DocumentWriter::new(&registry);

        let mut by_schema: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for document in submission.documents() {
            for object in document.objects() {
                by_schema
                    .entry(object.schema_type().to_string())
                    .or_default()
                    .push(object.to_xml());
            }
        }

        for (schema_type, fragments) in by_schema {
            let path = out_dir.join(format!("{}.xml", schema_type));
            let mut file = fs::File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            writer.write(
                &mut file,
                None,
                Some(schema_type.as_str()),
                fragments.into_iter().map(Ok),
            )?;
            tracing::info!(path = %path.display(), "wrote set document");
        }
    }

    Ok(())
}

pub(crate) fn load_registry(path: &Path) -> Result<Registry> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: PathConfig =
        serde_yaml::from_str(&text).context("parsing path configuration")?;
    Ok(Registry::compile(config)?)
}
