//! Event-stream XML helpers for the signature and encryption engines.
//!
//! The engines treat a document as an opaque string: elements are located by
//! byte span so that insertion and removal splice the original bytes rather
//! than reserializing the whole tree. Reserializing would perturb content
//! the digests were computed over.

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};

use crate::error::{Error, Result};
use crate::xmlsec::types::SignatureInfo;

/// Resolves a general entity reference event to its replacement text:
/// character references and the five predefined XML entities.
pub(crate) fn resolve_general_ref(r: &BytesRef<'_>) -> Result<String> {
    if let Some(ch) = r
        .resolve_char_ref()
        .map_err(|e| Error::Xml(e.to_string()))?
    {
        return Ok(ch.to_string());
    }
    let name = r.xml_content()?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| Error::Xml(format!("unknown entity: &{name};")))
}

/// Byte span of the first element with the given local name, tags included.
pub fn element_span(xml: &str, local_name: &str) -> Result<Option<(usize, usize)>> {
    let target = local_name.as_bytes();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) if e.name().local_name().as_ref() == target => {
                reader.read_to_end(e.name())?;
                return Ok(Some((start, reader.buffer_position() as usize)));
            }
            Event::Empty(e) if e.name().local_name().as_ref() == target => {
                return Ok(Some((start, reader.buffer_position() as usize)));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Byte spans of every element with the given local name. A match nested
/// inside another match is covered by the outer span and not listed again;
/// a match inside a non-matching parent is its own span.
pub fn element_spans(xml: &str, local_name: &str) -> Result<Vec<(usize, usize)>> {
    let target = local_name.as_bytes();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut spans = Vec::new();

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) if e.name().local_name().as_ref() == target => {
                reader.read_to_end(e.name())?;
                spans.push((start, reader.buffer_position() as usize));
            }
            Event::Empty(e) if e.name().local_name().as_ref() == target => {
                spans.push((start, reader.buffer_position() as usize));
            }
            Event::Eof => return Ok(spans),
            _ => {}
        }
    }
}

/// Removes every element with the given local name by splicing out its
/// exact bytes (the enveloped-signature transform, applied textually).
pub fn remove_elements(xml: &str, local_name: &str) -> Result<String> {
    let spans = element_spans(xml, local_name)?;
    let mut result = xml.to_string();
    for (start, end) in spans.into_iter().rev() {
        result.replace_range(start..end, "");
    }
    Ok(result)
}

/// Value of an attribute on the document element, matched by local name.
pub fn root_attribute(xml: &str, attr_name: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => return attr_value(&e, attr_name),
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Byte offset just past the document element's start tag, where a first
/// child can be inserted.
pub fn root_content_offset(xml: &str) -> Result<usize> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    loop {
        match reader.read_event()? {
            Event::Start(_) => return Ok(reader.buffer_position() as usize),
            Event::Empty(_) | Event::Eof => {
                return Err(Error::MalformedInput(
                    "document element cannot hold a child".into(),
                ));
            }
            _ => {}
        }
    }
}

/// Byte offset just past the first element with the given local name.
pub fn after_element_offset(xml: &str, local_name: &str) -> Result<Option<usize>> {
    Ok(element_span(xml, local_name)?.map(|(_, end)| end))
}

/// Byte span of the element carrying the given `ID` attribute value.
pub fn element_span_by_id(xml: &str, id: &str) -> Result<Option<(usize, usize)>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) => {
                if attr_value(&e, "ID")?.as_deref() == Some(id) {
                    reader.read_to_end(e.name())?;
                    return Ok(Some((start, reader.buffer_position() as usize)));
                }
            }
            Event::Empty(e) => {
                if attr_value(&e, "ID")?.as_deref() == Some(id) {
                    return Ok(Some((start, reader.buffer_position() as usize)));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Resolves a signature Reference URI to the bytes it covers: the whole
/// document for an empty URI, the identified element for `#id`. Any other
/// URI form, or an unmatched identifier, resolves to nothing.
pub fn reference_target<'a>(xml: &'a str, reference_uri: &str) -> Result<Option<&'a str>> {
    if reference_uri.is_empty() {
        return Ok(Some(xml));
    }
    let Some(id) = reference_uri.strip_prefix('#') else {
        return Ok(None);
    };
    Ok(element_span_by_id(xml, id)?.map(|(start, end)| &xml[start..end]))
}

/// Text content of the first element with the given local name.
pub fn element_text(xml: &str, local_name: &str) -> Result<Option<String>> {
    let target = local_name.as_bytes();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().local_name().as_ref() == target => {
                let mut text = String::new();
                let mut depth = 1usize;
                loop {
                    match reader.read_event()? {
                        Event::Start(_) => depth += 1,
                        Event::End(_) => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(Some(text));
                            }
                        }
                        Event::Text(t) => text.push_str(&t.xml_content()?),
                        Event::GeneralRef(r) => text.push_str(&resolve_general_ref(&r)?),
                        Event::Eof => return Err(Error::Xml("unclosed element".into())),
                        _ => {}
                    }
                }
            }
            Event::Empty(e) if e.name().local_name().as_ref() == target => {
                return Ok(Some(String::new()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Value of an attribute matched by local name.
pub fn attr_value(element: &BytesStart<'_>, attr_name: &str) -> Result<Option<String>> {
    let target = attr_name.as_bytes();
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == target {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Extracts the verification-relevant components from a ds:Signature
/// element, in document order.
pub fn collect_signature_info(signature_xml: &str) -> Result<SignatureInfo> {
    let mut info = SignatureInfo::default();
    let mut reader = Reader::from_str(signature_xml);
    reader.config_mut().trim_text(false);

    // Text capture target while inside one of the value-bearing elements.
    enum Capture {
        None,
        DigestValue,
        SignatureValue,
        Certificate,
    }
    let mut capture = Capture::None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                match e.name().local_name().as_ref() {
                    b"CanonicalizationMethod" => {
                        info.canonicalization_algorithm =
                            require_attr(&e, "Algorithm", "CanonicalizationMethod")?;
                    }
                    b"SignatureMethod" => {
                        info.signature_algorithm =
                            require_attr(&e, "Algorithm", "SignatureMethod")?;
                    }
                    b"Reference" => {
                        info.reference_uri = attr_value(&e, "URI")?.unwrap_or_default();
                    }
                    b"Transform" => {
                        info.transform_algorithms
                            .push(require_attr(&e, "Algorithm", "Transform")?);
                    }
                    b"DigestMethod" => {
                        info.digest_algorithm = require_attr(&e, "Algorithm", "DigestMethod")?;
                    }
                    b"DigestValue" => capture = Capture::DigestValue,
                    b"SignatureValue" => capture = Capture::SignatureValue,
                    b"X509Certificate" => capture = Capture::Certificate,
                    _ => {}
                }
            }
            Event::Text(t) => {
                let text = t.xml_content()?;
                match capture {
                    Capture::DigestValue => info.digest_value_b64.push_str(&text),
                    Capture::SignatureValue => info.signature_value_b64.push_str(&text),
                    Capture::Certificate => {
                        info.x509_certificate_b64
                            .get_or_insert_with(String::new)
                            .push_str(&text);
                    }
                    Capture::None => {}
                }
            }
            Event::GeneralRef(r) => {
                let text = resolve_general_ref(&r)?;
                match capture {
                    Capture::DigestValue => info.digest_value_b64.push_str(&text),
                    Capture::SignatureValue => info.signature_value_b64.push_str(&text),
                    Capture::Certificate => {
                        info.x509_certificate_b64
                            .get_or_insert_with(String::new)
                            .push_str(&text);
                    }
                    Capture::None => {}
                }
            }
            Event::End(_) => capture = Capture::None,
            Event::Eof => break,
            _ => {}
        }
    }

    if info.signature_algorithm.is_empty() {
        return Err(Error::Xml("signature has no SignatureMethod".into()));
    }
    if info.digest_value_b64.trim().is_empty() || info.signature_value_b64.trim().is_empty() {
        return Err(Error::Xml("signature has no digest or signature value".into()));
    }
    Ok(info)
}

fn require_attr(element: &BytesStart<'_>, attr_name: &str, context: &str) -> Result<String> {
    attr_value(element, attr_name)?
        .ok_or_else(|| Error::Xml(format!("{context} has no {attr_name} attribute")))
}
