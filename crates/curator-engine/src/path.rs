//! Path normalization and node access.
//!
//! Configuration paths address element text or attribute values inside a
//! tree: `DESCRIPTOR/STUDY_TITLE`, `@accession`, `IDENTIFIERS/@label`, or
//! a parenthesized alternation such as `(DESCRIPTOR/STUDY_TITLE|TITLE)`.
//! The same stored path is re-anchored at the use site: absolute (`/...`)
//! when matched against a whole document, relative (`./...`) when
//! evaluated against a node. Evaluation itself always descends from a
//! context node.

use crate::config::InsertionStrategy;
use crate::error::{Error, Result};
use curator_xml::{NodeId, XmlDocument};

/// Rewrite a path's leading anchor to `/`.
///
/// Each alternative of a parenthesized alternation is re-anchored
/// individually:
///
/// ```rust
/// use curator_engine::path::to_absolute;
///
/// assert_eq!(to_absolute("./STUDY"), "/STUDY");
/// assert_eq!(to_absolute("(./A|B)"), "(/A|/B)");
/// ```
pub fn to_absolute(path: &str) -> String {
    reanchor(path, true)
}

/// Rewrite a path's leading anchor to `./`.
///
/// ```rust
/// use curator_engine::path::to_relative;
///
/// assert_eq!(to_relative("/STUDY/DESCRIPTOR"), "./STUDY/DESCRIPTOR");
/// assert_eq!(to_relative("@accession"), "./@accession");
/// ```
pub fn to_relative(path: &str) -> String {
    reanchor(path, false)
}

fn reanchor(path: &str, absolute: bool) -> String {
    let trimmed = path.trim();
    if let Some(inner) = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        let parts: Vec<String> = inner
            .split('|')
            .map(|p| reanchor_one(p.trim(), absolute))
            .collect();
        format!("({})", parts.join("|"))
    } else {
        reanchor_one(trimmed, absolute)
    }
}

fn reanchor_one(p: &str, absolute: bool) -> String {
    let rest = p
        .strip_prefix("./")
        .unwrap_or_else(|| p.strip_prefix('/').unwrap_or(p));
    let rest = if rest == "." { "" } else { rest };

    if absolute {
        format!("/{}", rest)
    } else if rest.is_empty() {
        ".".to_string()
    } else {
        format!("./{}", rest)
    }
}

/// A parsed path: one or more alternatives, each a chain of element
/// segments with an optional trailing attribute selector.
#[derive(Debug, Clone)]
pub(crate) struct PathExpr {
    raw: String,
    alternatives: Vec<PathAlt>,
}

#[derive(Debug, Clone)]
pub(crate) struct PathAlt {
    pub segments: Vec<String>,
    pub attribute: Option<String>,
}

impl PathExpr {
    pub fn alternatives(&self) -> &[PathAlt] {
        &self.alternatives
    }
}

/// Parse a path expression, anchor-agnostic.
pub(crate) fn parse_path(raw: &str) -> Result<PathExpr> {
    let trimmed = raw.trim();
    let parts: Vec<&str> = if let Some(inner) = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        inner.split('|').map(str::trim).collect()
    } else {
        vec![trimmed]
    };

    let mut alternatives = Vec::new();
    for part in parts {
        alternatives.push(parse_alternative(part, raw)?);
    }

    Ok(PathExpr {
        raw: raw.to_string(),
        alternatives,
    })
}

fn parse_alternative(p: &str, raw: &str) -> Result<PathAlt> {
    let malformed = |reason: &str| Error::MalformedPath {
        path: raw.to_string(),
        reason: reason.to_string(),
    };

    let rest = p
        .strip_prefix("./")
        .unwrap_or_else(|| p.strip_prefix('/').unwrap_or(p));
    if rest == "." || rest.is_empty() {
        return Ok(PathAlt {
            segments: Vec::new(),
            attribute: None,
        });
    }

    let parts: Vec<&str> = rest.split('/').collect();
    let mut segments = Vec::new();
    let mut attribute = None;

    for (i, seg) in parts.iter().enumerate() {
        if let Some(attr) = seg.strip_prefix('@') {
            if i != parts.len() - 1 {
                return Err(malformed("attribute selector must be the final segment"));
            }
            if attr.is_empty() {
                return Err(malformed("empty attribute name"));
            }
            attribute = Some(attr.to_string());
        } else if seg.is_empty() {
            return Err(malformed("empty path segment"));
        } else if seg.contains('@') {
            return Err(malformed("attribute selector must be its own segment"));
        } else if *seg == "." {
            return Err(malformed("'.' is only valid as a leading anchor"));
        } else {
            segments.push((*seg).to_string());
        }
    }

    Ok(PathAlt {
        segments,
        attribute,
    })
}

/// Whether writes through this path target an attribute (judged by the
/// primary alternative, the one insertion would build).
pub(crate) fn is_attribute_path(path: &str) -> Result<bool> {
    let expr = parse_path(path)?;
    Ok(expr.alternatives[0].attribute.is_some())
}

/// Last element segment of a canonical root path (`/STUDY` → `STUDY`).
pub(crate) fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Strip `prefix` off `full` at a segment boundary, returning the
/// remainder as a relative path (`.` when they are equal).
pub(crate) fn strip_prefix(full: &str, prefix: &str) -> Option<String> {
    let rest = full.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(".".to_string());
    }
    let rest = rest.strip_prefix('/')?;
    if rest.is_empty() {
        None
    } else {
        Some(format!("./{}", rest))
    }
}

/// One resolved location: a node, plus the attribute the matching
/// alternative addresses on it (None for element text).
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathMatch {
    node: NodeId,
    attribute: Option<String>,
}

fn resolve(doc: &XmlDocument, ctx: NodeId, expr: &PathExpr) -> Vec<PathMatch> {
    let mut matches: Vec<PathMatch> = Vec::new();

    for alt in &expr.alternatives {
        let mut frontier = vec![ctx];
        for seg in &alt.segments {
            let mut next = Vec::new();
            for node in frontier {
                next.extend(doc.children_named(node, seg));
            }
            frontier = next;
        }

        for node in frontier {
            let m = PathMatch {
                node,
                attribute: alt.attribute.clone(),
            };
            if !matches.contains(&m) {
                matches.push(m);
            }
        }
    }

    matches
}

/// Resolve a path to exactly one node.
///
/// Fails with [`Error::NotFound`] unless `optional`, and with
/// [`Error::AmbiguousMatch`] when more than one node matches.
pub(crate) fn get_node(
    doc: &XmlDocument,
    ctx: NodeId,
    expr: &PathExpr,
    optional: bool,
) -> Result<Option<NodeId>> {
    let mut nodes: Vec<NodeId> = Vec::new();
    for m in resolve(doc, ctx, expr) {
        if !nodes.contains(&m.node) {
            nodes.push(m.node);
        }
    }

    match nodes.len() {
        0 if optional => Ok(None),
        0 => Err(Error::NotFound {
            path: expr.raw.clone(),
        }),
        1 => Ok(Some(nodes[0])),
        _ => Err(Error::AmbiguousMatch {
            path: expr.raw.clone(),
        }),
    }
}

/// Resolve a path to zero or more nodes; never fails.
pub(crate) fn get_nodes(doc: &XmlDocument, ctx: NodeId, expr: &PathExpr) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    for m in resolve(doc, ctx, expr) {
        if !nodes.contains(&m.node) {
            nodes.push(m.node);
        }
    }
    nodes
}

/// Read the value a path addresses: an attribute value when the path ends
/// in an attribute selector, the element's text otherwise.
///
/// An existing node without a (non-empty) value fails with
/// [`Error::MissingValue`] unless `optional`.
pub(crate) fn get_value(
    doc: &XmlDocument,
    ctx: NodeId,
    expr: &PathExpr,
    optional: bool,
) -> Result<Option<String>> {
    let matches = resolve(doc, ctx, expr);

    let m = match matches.len() {
        0 if optional => return Ok(None),
        0 => {
            return Err(Error::NotFound {
                path: expr.raw.clone(),
            });
        }
        1 => &matches[0],
        _ => {
            return Err(Error::AmbiguousMatch {
                path: expr.raw.clone(),
            });
        }
    };

    let value = match &m.attribute {
        Some(attr) => doc.node(m.node).attribute(attr),
        None => doc.node(m.node).text(),
    };

    match value {
        Some(v) if !v.is_empty() => Ok(Some(v.to_string())),
        _ if optional => Ok(None),
        _ => Err(Error::MissingValue {
            path: expr.raw.clone(),
        }),
    }
}

/// Write the value a path addresses.
///
/// An existing target is overwritten in place. A missing element target is
/// created through the supplied insertion strategy (building the primary
/// alternative's missing segment chain and attaching it at the strategy's
/// position); without a strategy the write fails with [`Error::NotFound`].
/// Attribute targets never insert; their parent element must pre-exist.
pub(crate) fn set_value(
    doc: &mut XmlDocument,
    ctx: NodeId,
    expr: &PathExpr,
    value: &str,
    insertion: Option<&InsertionStrategy>,
) -> Result<()> {
    let matches = resolve(doc, ctx, expr);

    match matches.len() {
        1 => {
            let m = &matches[0];
            match &m.attribute {
                Some(attr) => doc.set_attribute(m.node, attr, value),
                None => doc.set_text(m.node, value),
            }
            Ok(())
        }
        0 => insert_and_set(doc, ctx, expr, value, insertion),
        _ => Err(Error::AmbiguousMatch {
            path: expr.raw.clone(),
        }),
    }
}

fn insert_and_set(
    doc: &mut XmlDocument,
    ctx: NodeId,
    expr: &PathExpr,
    value: &str,
    insertion: Option<&InsertionStrategy>,
) -> Result<()> {
    let alt = &expr.alternatives[0];
    if alt.attribute.is_some() {
        // The owning element is missing; attributes are never inserted.
        return Err(Error::NotFound {
            path: expr.raw.clone(),
        });
    }
    let Some(strategy) = insertion else {
        return Err(Error::NotFound {
            path: expr.raw.clone(),
        });
    };

    // Walk the deepest existing prefix of the primary alternative, then
    // build the remaining chain. Re-running the walk after an earlier
    // insertion finds the existing chain, so containers are reused.
    let mut current = ctx;
    let mut idx = 0;
    while idx < alt.segments.len() {
        let found = doc.children_named(current, &alt.segments[idx]);
        match found.len() {
            0 => break,
            1 => {
                current = found[0];
                idx += 1;
            }
            _ => {
                return Err(Error::AmbiguousMatch {
                    path: expr.raw.clone(),
                });
            }
        }
    }

    if idx == alt.segments.len() {
        doc.set_text(current, value);
        return Ok(());
    }

    let first = doc.create_element(&alt.segments[idx]);
    attach(doc, current, first, strategy);

    let mut node = first;
    for seg in &alt.segments[idx + 1..] {
        let child = doc.create_element(seg);
        doc.append_child(node, child);
        node = child;
    }

    doc.set_text(node, value);
    Ok(())
}

fn attach(doc: &mut XmlDocument, parent: NodeId, node: NodeId, strategy: &InsertionStrategy) {
    match strategy {
        InsertionStrategy::FirstChild => doc.insert_child(parent, 0, node),
        InsertionStrategy::LastChild => doc.append_child(parent, node),
        InsertionStrategy::AfterAnyOf(tags) => {
            let anchor = doc
                .node(parent)
                .children()
                .iter()
                .rposition(|c| tags.iter().any(|t| *t == doc.node(*c).name));
            match anchor {
                Some(i) => doc.insert_child(parent, i + 1, node),
                None => doc.insert_child(parent, 0, node),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_xml::parse;

    fn expr(p: &str) -> PathExpr {
        parse_path(p).unwrap()
    }

    #[test]
    fn test_reanchoring() {
        assert_eq!(to_absolute("STUDY"), "/STUDY");
        assert_eq!(to_absolute("./STUDY"), "/STUDY");
        assert_eq!(to_absolute("/STUDY"), "/STUDY");
        assert_eq!(to_absolute("."), "/");

        assert_eq!(to_relative("/STUDY/DESCRIPTOR"), "./STUDY/DESCRIPTOR");
        assert_eq!(to_relative("STUDY"), "./STUDY");
        assert_eq!(to_relative("/"), ".");
        assert_eq!(to_relative("@accession"), "./@accession");
    }

    #[test]
    fn test_reanchoring_alternation() {
        assert_eq!(
            to_relative("(DESCRIPTOR/STUDY_TITLE|/TITLE)"),
            "(./DESCRIPTOR/STUDY_TITLE|./TITLE)"
        );
        assert_eq!(to_absolute("(./A|B)"), "(/A|/B)");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_path("A//B").is_err());
        assert!(parse_path("A/@x/B").is_err());
        assert!(parse_path("A@x").is_err());
        assert!(parse_path("@").is_err());
        assert!(parse_path("A/./B").is_err());
    }

    #[test]
    fn test_get_value_element_and_attribute() {
        let doc = parse(
            r#"<STUDY accession="ACC1"><IDENTIFIERS><PRIMARY_ID>P1</PRIMARY_ID></IDENTIFIERS></STUDY>"#,
        )
        .unwrap();
        let root = doc.root();

        let id = get_value(&doc, root, &expr("./IDENTIFIERS/PRIMARY_ID"), false).unwrap();
        assert_eq!(id.as_deref(), Some("P1"));

        let acc = get_value(&doc, root, &expr("./@accession"), false).unwrap();
        assert_eq!(acc.as_deref(), Some("ACC1"));

        let missing = get_value(&doc, root, &expr("./@alias"), true).unwrap();
        assert_eq!(missing, None);
        assert!(matches!(
            get_value(&doc, root, &expr("./@alias"), false),
            Err(Error::MissingValue { .. })
        ));
    }

    #[test]
    fn test_get_value_empty_element_is_missing() {
        let doc = parse("<STUDY><TITLE/></STUDY>").unwrap();
        let root = doc.root();

        assert_eq!(get_value(&doc, root, &expr("./TITLE"), true).unwrap(), None);
        assert!(matches!(
            get_value(&doc, root, &expr("./TITLE"), false),
            Err(Error::MissingValue { .. })
        ));
    }

    #[test]
    fn test_get_node_ambiguous() {
        let doc = parse("<STUDY><LINK/><LINK/></STUDY>").unwrap();
        let root = doc.root();

        assert!(matches!(
            get_node(&doc, root, &expr("./LINK"), false),
            Err(Error::AmbiguousMatch { .. })
        ));
        assert_eq!(get_nodes(&doc, root, &expr("./LINK")).len(), 2);
    }

    #[test]
    fn test_get_value_alternation() {
        let doc = parse("<STUDY><TITLE>alt title</TITLE></STUDY>").unwrap();
        let root = doc.root();

        let title = get_value(
            &doc,
            root,
            &expr("(./DESCRIPTOR/STUDY_TITLE|./TITLE)"),
            false,
        )
        .unwrap();
        assert_eq!(title.as_deref(), Some("alt title"));
    }

    #[test]
    fn test_set_value_overwrites_in_place() {
        let mut doc = parse("<STUDY><TITLE>old</TITLE></STUDY>").unwrap();
        let root = doc.root();

        set_value(&mut doc, root, &expr("./TITLE"), "new", None).unwrap();
        assert_eq!(
            get_value(&doc, root, &expr("./TITLE"), false).unwrap(),
            Some("new".to_string())
        );
    }

    #[test]
    fn test_set_value_requires_insertion_for_missing_node() {
        let mut doc = parse("<STUDY/>").unwrap();
        let root = doc.root();

        assert!(matches!(
            set_value(&mut doc, root, &expr("./TITLE"), "x", None),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_set_value_attribute_never_inserts_parent() {
        let mut doc = parse("<STUDY/>").unwrap();
        let root = doc.root();

        // Attribute on the root itself: the parent exists, so this works.
        set_value(&mut doc, root, &expr("./@accession"), "ACC1", None).unwrap();
        assert_eq!(doc.node(root).attribute("accession"), Some("ACC1"));

        // Attribute under a missing element: no insertion, ever.
        assert!(matches!(
            set_value(
                &mut doc,
                root,
                &expr("./IDENTIFIERS/@label"),
                "x",
                Some(&InsertionStrategy::FirstChild),
            ),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_insertion_builds_chain_and_reuses_it() {
        let mut doc = parse("<STUDY><DESCRIPTOR/></STUDY>").unwrap();
        let root = doc.root();
        let path = expr("./IDENTIFIERS/PRIMARY_ID");

        set_value(
            &mut doc,
            root,
            &path,
            "P1",
            Some(&InsertionStrategy::FirstChild),
        )
        .unwrap();
        assert_eq!(
            get_value(&doc, root, &path, false).unwrap(),
            Some("P1".to_string())
        );
        // Inserted before the existing DESCRIPTOR.
        assert_eq!(doc.node(doc.node(root).children()[0]).name, "IDENTIFIERS");

        // Second write reuses the chain instead of duplicating it.
        set_value(
            &mut doc,
            root,
            &path,
            "P2",
            Some(&InsertionStrategy::FirstChild),
        )
        .unwrap();
        assert_eq!(doc.children_named(root, "IDENTIFIERS").len(), 1);
        assert_eq!(
            get_value(&doc, root, &path, false).unwrap(),
            Some("P2".to_string())
        );
    }

    #[test]
    fn test_insertion_after_any_of() {
        let mut doc = parse("<SAMPLE><TITLE>t</TITLE><ATTRIBUTES/></SAMPLE>").unwrap();
        let root = doc.root();

        set_value(
            &mut doc,
            root,
            &expr("./SAMPLE_NAME"),
            "n",
            Some(&InsertionStrategy::AfterAnyOf(vec![
                "IDENTIFIERS".to_string(),
                "TITLE".to_string(),
            ])),
        )
        .unwrap();

        let names: Vec<&str> = doc
            .node(root)
            .children()
            .iter()
            .map(|id| doc.node(*id).name.as_str())
            .collect();
        assert_eq!(names, vec!["TITLE", "SAMPLE_NAME", "ATTRIBUTES"]);
    }

    #[test]
    fn test_insertion_last_child() {
        let mut doc = parse("<SAMPLE><TITLE>t</TITLE></SAMPLE>").unwrap();
        let root = doc.root();

        set_value(
            &mut doc,
            root,
            &expr("./DESCRIPTION"),
            "d",
            Some(&InsertionStrategy::LastChild),
        )
        .unwrap();

        let last = *doc.node(root).children().last().unwrap();
        assert_eq!(doc.node(last).name, "DESCRIPTION");
    }

    #[test]
    fn test_strip_prefix_segment_boundary() {
        assert_eq!(
            strip_prefix("/EXPERIMENT/STUDY_REF", "/EXPERIMENT"),
            Some("./STUDY_REF".to_string())
        );
        assert_eq!(strip_prefix("/EXPERIMENT", "/EXPERIMENT"), Some(".".to_string()));
        assert_eq!(strip_prefix("/EXPERIMENTAL", "/EXPERIMENT"), None);
    }
}
