//! Status extraction from SAML response documents.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};
use crate::xmlsec::xmlutil::{attr_value, resolve_general_ref};

/// Outcome reported by a SAML response's `samlp:Status` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Top-level status code URI.
    pub code: String,
    /// Human-oriented detail: the StatusMessage text when present,
    /// otherwise the nested second-level status code.
    pub message: String,
}

/// Reads the `Status` element out of a response document.
///
/// A response without a top-level `StatusCode` is structurally unusable
/// and reported as an error; a missing message is not.
pub fn get_status(response_xml: &str) -> Result<Status> {
    let mut reader = Reader::from_str(response_xml);
    reader.config_mut().trim_text(false);

    let mut in_status = false;
    let mut codes: Vec<String> = Vec::new();
    let mut message: Option<String> = None;
    let mut in_message = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.name().local_name().as_ref() {
                b"Status" => in_status = true,
                b"StatusCode" if in_status => {
                    let value = attr_value(&e, "Value")?.ok_or_else(|| {
                        Error::MalformedInput("StatusCode has no Value attribute".into())
                    })?;
                    codes.push(value);
                }
                b"StatusMessage" if in_status => in_message = true,
                _ => {}
            },
            Event::Text(t) if in_message => {
                message
                    .get_or_insert_with(String::new)
                    .push_str(&t.xml_content()?);
            }
            Event::GeneralRef(r) if in_message => {
                message
                    .get_or_insert_with(String::new)
                    .push_str(&resolve_general_ref(&r)?);
            }
            Event::End(e) => match e.name().local_name().as_ref() {
                b"Status" => break,
                b"StatusMessage" => in_message = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !in_status {
        return Err(Error::MalformedInput("response has no Status element".into()));
    }
    let mut codes = codes.into_iter();
    let code = codes
        .next()
        .ok_or_else(|| Error::MalformedInput("Status has no StatusCode".into()))?;
    let message = message
        .or_else(|| codes.next())
        .unwrap_or_default();
    Ok(Status { code, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROTO: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

    #[test]
    fn success_without_message() {
        let xml = format!(
            r#"<samlp:Response xmlns:samlp="{PROTO}"><samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status></samlp:Response>"#
        );
        let status = get_status(&xml).unwrap();
        assert_eq!(status.code, "urn:oasis:names:tc:SAML:2.0:status:Success");
        assert_eq!(status.message, "");
    }

    #[test]
    fn message_text_wins_over_nested_code() {
        let xml = format!(
            r#"<samlp:Response xmlns:samlp="{PROTO}"><samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Responder"><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:AuthnFailed"/></samlp:StatusCode><samlp:StatusMessage>user not allowed</samlp:StatusMessage></samlp:Status></samlp:Response>"#
        );
        let status = get_status(&xml).unwrap();
        assert_eq!(status.code, "urn:oasis:names:tc:SAML:2.0:status:Responder");
        assert_eq!(status.message, "user not allowed");
    }

    #[test]
    fn nested_code_backfills_missing_message() {
        let xml = format!(
            r#"<samlp:Response xmlns:samlp="{PROTO}"><samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Requester"><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:InvalidNameIDPolicy"/></samlp:StatusCode></samlp:Status></samlp:Response>"#
        );
        let status = get_status(&xml).unwrap();
        assert_eq!(status.code, "urn:oasis:names:tc:SAML:2.0:status:Requester");
        assert_eq!(
            status.message,
            "urn:oasis:names:tc:SAML:2.0:status:InvalidNameIDPolicy"
        );
    }

    #[test]
    fn missing_status_or_code_is_malformed() {
        assert!(get_status(r#"<samlp:Response xmlns:samlp="x"/>"#).is_err());
        let xml = format!(
            r#"<samlp:Response xmlns:samlp="{PROTO}"><samlp:Status/></samlp:Response>"#
        );
        assert!(get_status(&xml).is_err());
        let xml = format!(
            r#"<samlp:Response xmlns:samlp="{PROTO}"><samlp:Status><samlp:StatusCode/></samlp:Status></samlp:Response>"#
        );
        assert!(get_status(&xml).is_err());
    }
}
