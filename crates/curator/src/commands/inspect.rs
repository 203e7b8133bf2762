//! Identify the objects and references in one document.

use anyhow::{Context, Result};
use curator_engine::DocumentProcessor;
use std::fs;
use std::path::Path;

pub fn execute(config: &Path, input: &Path) -> Result<()> {
    let registry = super::link::load_registry(config)?;

    let text =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let doc = curator_xml::parse(&text)
        .with_context(|| format!("parsing {}", input.display()))?;

    if let Some(schema_type) = registry.detect_schema_type(&doc) {
        println!("schema type: {}", schema_type);
    }

    let processor = DocumentProcessor::new(doc, &registry, None)?;
    for object in processor.objects() {
        println!("{}", object.identifier());
        if let Some(title) = object.title()? {
            println!("  title: {}", title);
        }
        for reference in object.references()? {
            println!("  -> {}", reference);
        }
    }

    Ok(())
}
