//! Mutable XML trees for curator.
//!
//! This crate wraps [`quick-xml`] to provide an arena-backed, *editable* tree
//! of XML elements. Metadata processing rewrites element text and attribute
//! values in place, inserts missing container elements, and re-serializes the
//! result in a canonical indented form, so the tree is held as a flat arena of
//! [`XmlNode`]s addressed by [`NodeId`] handles that stay valid across
//! mutation.
//!
//! # Overview
//!
//! The main types are:
//! - [`XmlDocument`]: the arena, plus the root node id
//! - [`XmlNode`]: an element with name, attributes, and either text or
//!   child elements
//! - [`XmlAttribute`]: a name/value pair
//!
//! # Example
//!
//! ```rust
//! use curator_xml::parse;
//!
//! let mut doc = parse(r#"<sample alias="s-1">
//!   <TITLE>Liver biopsy</TITLE>
//! </sample>"#).unwrap();
//!
//! let root = doc.root();
//! assert_eq!(doc.node(root).name, "sample");
//! assert_eq!(doc.node(root).attribute("alias"), Some("s-1"));
//!
//! let title = doc.children_named(root, "TITLE")[0];
//! doc.set_text(title, "Liver biopsy, frozen");
//! assert!(doc.to_xml().contains("Liver biopsy, frozen"));
//! ```
//!
//! Mixed content (text interleaved with elements) is rejected at parse time:
//! the documents this engine handles store values either as element text or
//! as attributes, never both at once.

pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

pub use error::{Error, Result};
pub use parser::parse;
pub use types::{NodeId, XmlAttribute, XmlDocument, XmlNode};
