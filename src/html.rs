// authflow_rewriter::html
//
// HTML tree mutator.  Parses markup into the mutable DOM produced by
// html5ever / kuchikiki, exposes a document-order traversal over elements,
// and serializes the tree back to markup.  All rewrite passes and the
// autofill engine are built on the three operations in this module.
//
// html5ever always synthesizes an <html><head><body> skeleton.  Inputs that
// never mention <html> are remembered as fragments and serialized as the
// children of the synthesized head and body, so a parse/serialize round
// trip of untouched markup stays a semantic no-op.

use html5ever::serialize::{serialize as serialize_tree, SerializeOpts, TraversalScope};
use kuchikiki::traits::*;
use kuchikiki::{parse_html, NodeData, NodeRef};
use markup5ever::{namespace_url, ns};

/// Elements whose listed attribute carries a URL.  Fixed for the process
/// lifetime; every URL rewrite pass locates its candidate attributes here.
pub const KNOWN_URL_ATTRS: &[(&str, &str)] = &[
    ("script", "src"),
    ("link", "href"),
    ("form", "action"),
    ("a", "href"),
    ("img", "src"),
];

/// The URL-bearing attribute for `tag`, if `tag` is a known URL carrier.
pub fn url_attribute(tag: &str) -> Option<&'static str> {
    KNOWN_URL_ATTRS
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|&(_, attr)| attr)
}

/// An owned, call-scoped document tree.
pub struct Document {
    root: NodeRef,
    full_document: bool,
}

/// Parse markup into an owned tree.  Never fails: empty or unparsable input
/// yields a tree that serializes back to the empty string.
pub fn parse(html: &str) -> Document {
    Document {
        root: parse_html().one(html),
        full_document: mentions_html_tag(html),
    }
}

/// Apply `visit` to every element, in document order, whose lowercased tag
/// name satisfies `predicate`.  Mutations are in place on the owned tree.
pub fn for_each_element<P, V>(doc: &Document, predicate: P, mut visit: V)
where
    P: Fn(&str) -> bool,
    V: FnMut(&str, &mut kuchikiki::Attributes),
{
    for node in doc.root.inclusive_descendants() {
        if let NodeData::Element(ref el) = *node.data() {
            let tag = el.name.local.to_string().to_ascii_lowercase();
            if predicate(&tag) {
                let mut attrs = el.attributes.borrow_mut();
                visit(&tag, &mut attrs);
            }
        }
    }
}

/// Render the tree back to markup.  Full documents serialize whole;
/// fragments serialize as the children of the synthesized head and body.
pub fn serialize(doc: &Document) -> String {
    if doc.full_document {
        return serialize_node(&doc.root);
    }
    let mut out = String::new();
    for section in ["head", "body"] {
        if let Some(node) = find_element(&doc.root, section) {
            for child in node.children() {
                out.push_str(&serialize_node(&child));
            }
        }
    }
    out
}

fn serialize_node(node: &NodeRef) -> String {
    let mut buf = Vec::new();
    let result = serialize_tree(
        &mut buf,
        node,
        SerializeOpts {
            scripting_enabled: true,
            traversal_scope: TraversalScope::IncludeNode,
            create_missing_parent: false,
        },
    );
    if result.is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

fn find_element(root: &NodeRef, tag: &str) -> Option<NodeRef> {
    for node in root.inclusive_descendants() {
        if let NodeData::Element(ref el) = *node.data() {
            if el.name.local.to_string() == tag {
                return Some(node.clone());
            }
        }
    }
    None
}

/// Case-insensitive scan for an `<html` tag, deciding fragment vs. full
/// document serialization.
fn mentions_html_tag(html: &str) -> bool {
    html.as_bytes()
        .windows(5)
        .any(|w| w.eq_ignore_ascii_case(b"<html"))
}

// ---------------------------------------------------------------------------
// Attribute access helpers
// ---------------------------------------------------------------------------

pub(crate) trait AttrsExt {
    fn get(&self, name: &str) -> Option<&str>;
    fn set(&mut self, name: &str, value: String);
}

impl AttrsExt for kuchikiki::Attributes {
    fn get(&self, name: &str) -> Option<&str> {
        self.map
            .get(&kuchikiki::ExpandedName::new(
                ns!(),
                markup5ever::LocalName::from(name),
            ))
            .map(|a| a.value.as_str())
    }

    fn set(&mut self, name: &str, value: String) {
        let key = kuchikiki::ExpandedName::new(ns!(), markup5ever::LocalName::from(name));
        match self.map.get_mut(&key) {
            Some(attr) => attr.value = value,
            None => {
                self.map
                    .insert(key, kuchikiki::Attribute { prefix: None, value });
            }
        }
    }
}
