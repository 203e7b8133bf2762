//! Canonical serialization of [`XmlDocument`] trees.
//!
//! Output is deterministic: two-space indentation, attributes in stored
//! order, empty elements self-closed. Parsing the output and serializing
//! again reproduces it byte for byte.

use crate::{NodeId, XmlDocument};
use quick_xml::escape::escape;
use std::fmt::Write;

const INDENT: &str = "  ";

impl XmlDocument {
    /// Serialize the document to an indented XML fragment.
    ///
    /// No XML declaration is emitted; document assembly adds one.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_node(self.root(), 0, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        for _ in 0..depth {
            out.push_str(INDENT);
        }

        out.push('<');
        push_qualified(out, node.prefix.as_deref(), &node.name);
        for attr in &node.attributes {
            out.push(' ');
            push_qualified(out, attr.prefix.as_deref(), &attr.name);
            let _ = write!(out, "=\"{}\"", escape(attr.value.as_str()));
        }

        if !node.children.is_empty() {
            out.push_str(">\n");
            for child in node.children() {
                self.write_node(*child, depth + 1, out);
                out.push('\n');
            }
            for _ in 0..depth {
                out.push_str(INDENT);
            }
            out.push_str("</");
            push_qualified(out, node.prefix.as_deref(), &node.name);
            out.push('>');
        } else if let Some(text) = node.text() {
            out.push('>');
            let _ = write!(out, "{}", escape(text));
            out.push_str("</");
            push_qualified(out, node.prefix.as_deref(), &node.name);
            out.push('>');
        } else {
            out.push_str("/>");
        }
    }
}

fn push_qualified(out: &mut String, prefix: Option<&str>, name: &str) {
    if let Some(prefix) = prefix {
        out.push_str(prefix);
        out.push(':');
    }
    out.push_str(name);
}
