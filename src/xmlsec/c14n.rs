//! Exclusive XML canonicalization (xml-exc-c14n).
//!
//! Produces one byte form for all documents with the same infoset:
//! the declaration and comments are dropped, empty elements are expanded,
//! attributes are sorted by namespace URI then local name, namespace
//! declarations are rendered only where visibly utilized and not already
//! rendered by an ancestor, and text escaping follows the C14N rules.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::str;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

type NsBindings = BTreeMap<Vec<u8>, Vec<u8>>;

/// Namespace context of one open element.
#[derive(Debug, Clone, Default)]
struct NsScope {
    /// Prefix bindings in scope, ancestors included.
    declared: NsBindings,
    /// Bindings an ancestor (or this element) has already emitted.
    rendered: NsBindings,
}

/// Canonicalizes a fragment, optionally forcing the given prefixes to be
/// rendered even where not visibly utilized (the `InclusiveNamespaces`
/// prefix list of xml-exc-c14n).
pub fn canonicalize(xml: &str, inclusive_prefixes: Option<&[&str]>) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = true;

    let mut out = String::new();
    let mut scopes: Vec<NsScope> = vec![NsScope::default()];

    loop {
        match reader.read_event()? {
            Event::Start(e) => write_start_tag(&mut out, &e, &mut scopes, inclusive_prefixes)?,
            Event::End(e) => {
                out.push_str("</");
                out.push_str(str::from_utf8(e.name().as_ref())?);
                out.push('>');
                scopes.pop();
            }
            Event::Text(t) => {
                let text = t
                    .xml_content()
                    .map_err(|e| Error::Xml(e.to_string()))?;
                out.push_str(&escape_text(&text));
            }
            Event::CData(c) => {
                // CDATA sections are folded into plain text content.
                let raw = c.into_inner();
                let normalized = normalize_line_endings(&raw);
                out.push_str(&escape_text(str::from_utf8(&normalized)?));
            }
            Event::GeneralRef(r) => {
                out.push('&');
                out.push_str(str::from_utf8(r.as_ref())?);
                out.push(';');
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
            Event::Empty(_) => unreachable!("empty elements are expanded"),
        }
    }
    Ok(out)
}

fn write_start_tag(
    out: &mut String,
    element: &BytesStart<'_>,
    scopes: &mut Vec<NsScope>,
    inclusive_prefixes: Option<&[&str]>,
) -> Result<()> {
    let parent = scopes.last().cloned().unwrap_or_default();
    let mut declared = parent.declared.clone();

    // Split namespace declarations from ordinary attributes.
    let mut attributes: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
    for attr in element.attributes().with_checks(false) {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"xmlns" {
            apply_binding(&mut declared, Vec::new(), attr.value.to_vec());
        } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            apply_binding(&mut declared, prefix.to_vec(), attr.value.to_vec());
        } else {
            let value = attr.unescape_value()?;
            attributes.push((key.to_vec(), value.into_owned().into_bytes()));
        }
    }

    // Prefixes this element makes visible: its own name, its attribute
    // names, plus anything the caller forces in.
    let mut utilized = BTreeSet::new();
    utilized.insert(prefix_of(element.name().as_ref()).to_vec());
    for (key, _) in &attributes {
        let prefix = prefix_of(key);
        if !prefix.is_empty() && prefix != b"xml" {
            utilized.insert(prefix.to_vec());
        }
    }
    if let Some(forced) = inclusive_prefixes {
        for prefix in forced {
            if declared.contains_key(prefix.as_bytes()) {
                utilized.insert(prefix.as_bytes().to_vec());
            }
        }
    }

    // BTreeSet iteration gives the required lexicographic prefix order.
    let mut render: Vec<(&[u8], &[u8])> = Vec::new();
    for prefix in &utilized {
        if prefix == b"xml" {
            continue;
        }
        if let Some(uri) = declared.get(prefix) {
            let fresh = parent.rendered.get(prefix) != Some(uri);
            if fresh {
                render.push((prefix, uri));
            }
        }
    }

    out.push('<');
    out.push_str(str::from_utf8(element.name().as_ref())?);
    for (prefix, uri) in &render {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(str::from_utf8(prefix)?);
            out.push_str("=\"");
        }
        out.push_str(&escape_attribute(str::from_utf8(uri)?));
        out.push('"');
    }

    // Attributes sort by (namespace URI, local name).
    let mut ordered: Vec<(Vec<u8>, &[u8], &[u8], &[u8])> = attributes
        .iter()
        .map(|(key, value)| {
            let prefix = prefix_of(key);
            let local = if prefix.is_empty() {
                key.as_slice()
            } else {
                &key[prefix.len() + 1..]
            };
            let uri = if prefix == b"xml" {
                b"http://www.w3.org/XML/1998/namespace".to_vec()
            } else if prefix.is_empty() {
                Vec::new()
            } else {
                declared.get(prefix).cloned().unwrap_or_default()
            };
            (uri, local, key.as_slice(), value.as_slice())
        })
        .collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    for (_, _, key, value) in &ordered {
        out.push(' ');
        out.push_str(str::from_utf8(key)?);
        out.push_str("=\"");
        out.push_str(&escape_attribute(str::from_utf8(value)?));
        out.push('"');
    }
    out.push('>');

    let mut rendered = parent.rendered.clone();
    for (prefix, uri) in &render {
        rendered.insert(prefix.to_vec(), uri.to_vec());
    }
    scopes.push(NsScope { declared, rendered });
    Ok(())
}

fn apply_binding(bindings: &mut NsBindings, prefix: Vec<u8>, uri: Vec<u8>) {
    if uri.is_empty() {
        bindings.remove(&prefix);
    } else {
        bindings.insert(prefix, uri);
    }
}

fn prefix_of(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[..pos],
        None => b"",
    }
}

fn normalize_line_endings(text: &[u8]) -> Cow<'_, [u8]> {
    if !text.contains(&b'\r') {
        return Cow::Borrowed(text);
    }
    let mut result = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if text[i] == b'\r' {
            result.push(b'\n');
            if i + 1 < text.len() && text[i + 1] == b'\n' {
                i += 1;
            }
        } else {
            result.push(text[i]);
        }
        i += 1;
    }
    Cow::Owned(result)
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 4);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 4);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}
