use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the trust engine.
///
/// Verification paths never surface these for attacker-controlled input;
/// they degrade to a negative verification outcome instead. Construction
/// paths (signing, encryption, redirect building) propagate them so the
/// caller sees the problem immediately.
#[derive(Debug, Error)]
pub enum Error {
    /// Empty or absent document / key material where content was required
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Redirect target failed the `^https?://` scheme guard
    #[error("redirect to invalid URL: {0}")]
    InvalidRedirectTarget(String),

    /// Timestamp did not match either accepted SAML form
    #[error("malformed SAML timestamp: {0}")]
    MalformedTimestamp(String),

    /// ISO-8601 duration could not be interpreted
    #[error("malformed ISO-8601 duration: {0}")]
    MalformedDuration(String),

    /// Neither a host header nor a server name in the request context
    #[error("no hostname defined in request context")]
    MissingHost,

    /// Opaque by design: the reason is only visible on the debug channel
    #[error("decryption failed")]
    DecryptionFailed,

    /// Algorithm URI not handled by the security provider
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("PEM error: {0}")]
    Pem(#[from] pem::PemError),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("XML processing error: {0}")]
    Xml(String),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::encoding::EncodingError> for Error {
    fn from(err: quick_xml::encoding::EncodingError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::DeError> for Error {
    fn from(err: quick_xml::DeError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::SeError> for Error {
    fn from(err: quick_xml::SeError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Utf8(err.utf8_error())
    }
}
