//! Request locator construction for binding-specific URLs.
//!
//! Derives the externally visible base URL from an inbound request snapshot
//! and builds the redirect URLs used by the HTTP-Redirect binding, including
//! the exact byte sequence covered by a redirect-binding signature.

use tracing::debug;

use crate::error::{Error, Result};

/// Immutable snapshot of inbound transport metadata.
///
/// Only ever read to derive URLs; the core never mutates it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub http_host: Option<String>,
    pub server_name: Option<String>,
    pub server_port: Option<u16>,
    pub https: Option<String>,
    pub script_name: Option<String>,
    pub path_info: Option<String>,
    pub request_uri: Option<String>,
    pub query_string: Option<String>,
}

impl RequestContext {
    /// Returns the current host, preferring the host header over the server
    /// name.
    ///
    /// A trailing `:port` segment is stripped only when it parses as an
    /// integer and the remainder holds no further colon; an IPv6 literal
    /// such as `fe80::1` is kept intact.
    pub fn host(&self) -> Result<String> {
        let current = self
            .http_host
            .as_deref()
            .or(self.server_name.as_deref())
            .ok_or(Error::MissingHost)?;

        if let Some((name, possible_port)) = current.rsplit_once(':') {
            if possible_port.parse::<u32>().is_ok() && !name.contains(':') {
                return Ok(name.to_string());
            }
        }
        Ok(current.to_string())
    }

    /// True when the https flag is set (and not `"off"`) or the port is 443.
    pub fn is_https(&self) -> bool {
        self.https.as_deref().is_some_and(|flag| flag != "off")
            || self.server_port == Some(443)
    }

    /// `scheme://host[:port]`, omitting the scheme's default port.
    pub fn url_host(&self) -> Result<String> {
        let host = self.host()?;
        let scheme = if self.is_https() { "https" } else { "http" };

        let port = match (scheme, self.server_port) {
            (_, None) | ("http", Some(80)) | ("https", Some(443)) => String::new(),
            (_, Some(port)) => format!(":{port}"),
        };
        Ok(format!("{scheme}://{host}{port}"))
    }

    /// Current host + script path (+ path-info suffix), without the query.
    pub fn url_no_query(&self) -> Result<String> {
        let mut url = self.url_host()?;
        if let Some(script_name) = self.script_name.as_deref() {
            if !script_name.is_empty() && !script_name.starts_with('/') {
                url.push('/');
            }
            url.push_str(script_name);
        }
        if let Some(path_info) = self.path_info.as_deref() {
            url.push_str(path_info);
        }
        Ok(url)
    }

    /// Current host + routed path, with the query string stripped.
    pub fn routed_url_no_query(&self) -> Result<String> {
        let mut url = self.url_host()?;
        if let Some(request_uri) = self.request_uri.as_deref() {
            if !request_uri.is_empty() {
                let route = match self.query_string.as_deref() {
                    Some(query) if !query.is_empty() => request_uri.replace(query, ""),
                    _ => request_uri.to_string(),
                };
                url.push_str(&route);
            }
        }
        Ok(url)
    }

    /// Current host + request URI, query included.
    ///
    /// A request URI supplied as an absolute URL is normalized to its
    /// path-only form first.
    pub fn url(&self) -> Result<String> {
        let mut url = self.url_host()?;
        if let Some(request_uri) = self.request_uri.as_deref() {
            url.push_str(&path_of(request_uri));
        }
        Ok(url)
    }
}

/// Reduces an absolute `http(s)://host/path` request URI to `/path`.
fn path_of(request_uri: &str) -> String {
    if request_uri.starts_with('/') {
        return request_uri.to_string();
    }
    for scheme in ["http://", "https://"] {
        if let Some(rest) = request_uri.strip_prefix(scheme) {
            if let Some(slash) = rest.find('/') {
                return rest[slash..].to_string();
            }
        }
    }
    request_uri.to_string()
}

/// Escapes the non-safe symbols of a URL component (form-urlencoding,
/// space becomes `+`).
pub fn escape_url(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

/// A query parameter value for [`build_redirect_url`].
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// Emitted as a bare encoded key with no `=`
    Flag,
    Single(String),
    /// Emitted as repeated `key[]=value` pairs in sequence order
    Multi(Vec<String>),
}

/// Builds the target URL for a redirect, with encoded extra parameters.
///
/// A relative target is resolved against the request's own URL host first.
/// Anything that does not then match `^https?://` is rejected before any
/// parameter concatenation: the scheme guard is deliberate and never
/// silently corrected.
pub fn build_redirect_url(
    url: &str,
    parameters: &[(&str, ParamValue)],
    ctx: &RequestContext,
) -> Result<String> {
    let mut target = if url.starts_with('/') {
        format!("{}{}", ctx.url_host()?, url)
    } else {
        url.to_string()
    };

    if !target.starts_with("http://") && !target.starts_with("https://") {
        debug!(url = %target, "redirect target failed scheme guard");
        return Err(Error::InvalidRedirectTarget(target));
    }

    let mut prefix = if target.contains('?') { '&' } else { '?' };
    for (name, value) in parameters {
        let param = match value {
            ParamValue::Flag => escape_url(name),
            ParamValue::Single(value) => format!("{}={}", escape_url(name), escape_url(value)),
            ParamValue::Multi(values) => values
                .iter()
                .map(|value| format!("{}={}", escape_url(&format!("{name}[]")), escape_url(value)))
                .collect::<Vec<_>>()
                .join("&"),
        };
        if param.is_empty() {
            continue;
        }
        target.push(prefix);
        target.push_str(&param);
        prefix = '&';
    }

    Ok(target)
}

/// Which protocol message travels in the redirect query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
}

impl MessageKind {
    fn query_param(self) -> &'static str {
        match self {
            MessageKind::Request => "SAMLRequest",
            MessageKind::Response => "SAMLResponse",
        }
    }
}

/// Assembles the exact byte sequence covered by a redirect-binding signature.
///
/// Field order is fixed by the binding: message, then RelayState (omitted
/// when absent), then SigAlg. The `Signature` parameter is appended after
/// signing and is never part of these bytes.
pub fn signed_query_string(
    kind: MessageKind,
    message: &str,
    relay_state: Option<&str>,
    sig_alg: &str,
) -> String {
    let mut query = format!("{}={}", kind.query_param(), escape_url(message));
    if let Some(relay_state) = relay_state {
        query.push_str(&format!("&RelayState={}", escape_url(relay_state)));
    }
    query.push_str(&format!("&SigAlg={}", escape_url(sig_alg)));
    query
}
