//! Client-side error model for calls against the console API.
//! Every transport failure is classified into one of these variants before it
//! reaches the session store or the caller.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Login answered, but not with something we can use as a credential.
    #[error("auth: {message}")]
    Auth { message: String },
    /// Server responded with a non-2xx status.
    #[error("http {status} from {url}: {message}")]
    HttpStatus { status: u16, url: String, message: String },
    /// Request was sent but no response came back (refused, reset, timeout).
    #[error("network: no response from {url}: {message}")]
    Network { url: String, message: String },
    /// Request could not be built or sent at all.
    #[error("request config: {message}")]
    RequestConfig { message: String },
    /// 2xx response whose body does not match the expected shape.
    #[error("decode: {message}")]
    Decode { message: String },
}

/// Coarse failure classes the authorizer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Unauthorized,
    EndpointMissing,
    OtherStatus(u16),
    NoResponse,
    RequestConfig,
    Other,
}

impl ApiError {
    pub fn auth<S: Into<String>>(msg: S) -> Self { ApiError::Auth { message: msg.into() } }
    pub fn status<S: Into<String>>(status: u16, url: S, msg: S) -> Self {
        ApiError::HttpStatus { status, url: url.into(), message: msg.into() }
    }
    pub fn network<S: Into<String>>(url: S, msg: S) -> Self { ApiError::Network { url: url.into(), message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { ApiError::RequestConfig { message: msg.into() } }
    pub fn decode<S: Into<String>>(msg: S) -> Self { ApiError::Decode { message: msg.into() } }

    /// HTTP status carried by the failure, if the server answered.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401 and 404 from the identity endpoint mean the credential is no good.
    pub fn invalidates_session(&self) -> bool {
        matches!(self.http_status(), Some(401) | Some(404))
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ApiError::HttpStatus { status: 401, .. } => FailureKind::Unauthorized,
            ApiError::HttpStatus { status: 404, .. } => FailureKind::EndpointMissing,
            ApiError::HttpStatus { status, .. } => FailureKind::OtherStatus(*status),
            ApiError::Network { .. } => FailureKind::NoResponse,
            ApiError::RequestConfig { .. } => FailureKind::RequestConfig,
            ApiError::Auth { .. } | ApiError::Decode { .. } => FailureKind::Other,
        }
    }

    /// Human-readable message suitable for `last_error`.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Auth { message }
            | ApiError::HttpStatus { message, .. }
            | ApiError::Network { message, .. }
            | ApiError::RequestConfig { message }
            | ApiError::Decode { message } => message.as_str(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_mapping() {
        assert_eq!(ApiError::status(401, "/me", "no").failure_kind(), FailureKind::Unauthorized);
        assert_eq!(ApiError::status(404, "/me", "gone").failure_kind(), FailureKind::EndpointMissing);
        assert_eq!(ApiError::status(500, "/x", "boom").failure_kind(), FailureKind::OtherStatus(500));
        assert_eq!(ApiError::network("/x", "refused").failure_kind(), FailureKind::NoResponse);
        assert_eq!(ApiError::config("bad header").failure_kind(), FailureKind::RequestConfig);
        assert_eq!(ApiError::auth("missing access token").failure_kind(), FailureKind::Other);
    }

    #[test]
    fn only_401_and_404_invalidate() {
        assert!(ApiError::status(401, "/me", "x").invalidates_session());
        assert!(ApiError::status(404, "/me", "x").invalidates_session());
        assert!(!ApiError::status(403, "/me", "x").invalidates_session());
        assert!(!ApiError::network("/me", "timeout").invalidates_session());
    }

    #[test]
    fn display_includes_status_and_url() {
        let e = ApiError::status(500, "http://h/api/x", "internal");
        assert_eq!(e.to_string(), "http 500 from http://h/api/x: internal");
        assert_eq!(e.message(), "internal");
    }
}
