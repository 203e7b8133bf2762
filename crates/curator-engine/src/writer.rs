//! Document Writer: reassembles processed fragments into output documents.

use crate::config::Registry;
use crate::error::{Error, Result};
use crate::path;
use std::io::Write;

/// The declaration line written at the top of every output document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Writes one output document from already-serialized object fragments.
///
/// Fragments may come from a pre-materialized buffer or from a lazily
/// produced sequence; they are flushed in production order without
/// buffering the whole output. An error mid-sequence aborts the write
/// with whatever partial output has already been flushed, so callers that
/// need atomicity buffer downstream.
pub struct DocumentWriter<'a> {
    registry: &'a Registry,
}

impl<'a> DocumentWriter<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Write a document for exactly one of `object_type` or `schema_type`.
    ///
    /// With a `schema_type`, fragments are wrapped in the schema's
    /// configured set tag and indented by one two-space unit; a schema
    /// without a set tag accepts only a single, unwrapped fragment. With
    /// an `object_type`, the single fragment is written unwrapped.
    ///
    /// # Errors
    ///
    /// [`Error::AmbiguousCardinality`] when neither (or both) of the two
    /// types is given; [`Error::SetTagMissing`] when several fragments
    /// have nothing to wrap them.
    pub fn write<W, I>(
        &self,
        out: &mut W,
        object_type: Option<&str>,
        schema_type: Option<&str>,
        fragments: I,
    ) -> Result<()>
    where
        W: Write,
        I: IntoIterator<Item = Result<String>>,
    {
        let set_tag = match (object_type, schema_type) {
            (Some(_), None) => None,
            (None, Some(schema_type)) => {
                let schema = self.registry.schema(schema_type)?;
                schema
                    .set_path
                    .as_deref()
                    .map(|p| path::last_segment(p).to_string())
            }
            _ => return Err(Error::AmbiguousCardinality),
        };

        writeln!(out, "{}", XML_DECLARATION)?;

        match &set_tag {
            Some(tag) => {
                writeln!(out, "<{}>", tag)?;
                for fragment in fragments {
                    write_indented(out, &fragment?)?;
                }
                writeln!(out, "</{}>", tag)?;
            }
            None => {
                let wrapless = object_type.or(schema_type).unwrap_or_default();
                let mut first = true;
                for fragment in fragments {
                    if !first {
                        return Err(Error::SetTagMissing {
                            type_name: wrapless.to_string(),
                        });
                    }
                    first = false;

                    let fragment = fragment?;
                    out.write_all(fragment.as_bytes())?;
                    if !fragment.ends_with('\n') {
                        writeln!(out)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Convenience wrapper buffering the output into a string.
    pub fn write_string<I, S>(
        &self,
        object_type: Option<&str>,
        schema_type: Option<&str>,
        fragments: I,
    ) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        self.write(
            &mut out,
            object_type,
            schema_type,
            fragments.into_iter().map(|f| Ok(f.into())),
        )?;
        // The writer only emits UTF-8.
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

/// Prefix every non-empty line of `fragment` with one indent unit,
/// appending the trailing newline when missing.
fn write_indented<W: Write>(out: &mut W, fragment: &str) -> std::io::Result<()> {
    for line in fragment.lines() {
        if line.is_empty() {
            writeln!(out)?;
        } else {
            writeln!(out, "  {}", line)?;
        }
    }
    Ok(())
}
