use thiserror::Error;

#[derive(Debug, Error)]
#[error("`{scope}` failed: {message}")]
pub struct ServiceError {
    scope: &'static str,
    message: String,
    kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Unauthorized,
    NotFound,
    Conflict,
    UpstreamAuth,
    UpstreamQuery,
    Internal,
}

impl ServiceError {
    fn new(scope: &'static str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            scope,
            message: message.into(),
            kind,
        }
    }

    pub fn invalid_argument(scope: &'static str, message: impl Into<String>) -> Self {
        Self::new(scope, ErrorKind::InvalidArgument, message)
    }

    pub fn unauthorized(scope: &'static str, message: impl Into<String>) -> Self {
        Self::new(scope, ErrorKind::Unauthorized, message)
    }

    pub fn not_found(scope: &'static str, message: impl Into<String>) -> Self {
        Self::new(scope, ErrorKind::NotFound, message)
    }

    pub fn conflict(scope: &'static str, message: impl Into<String>) -> Self {
        Self::new(scope, ErrorKind::Conflict, message)
    }

    pub fn upstream_auth(scope: &'static str, message: impl Into<String>) -> Self {
        Self::new(scope, ErrorKind::UpstreamAuth, message)
    }

    pub fn upstream_query(scope: &'static str, message: impl Into<String>) -> Self {
        Self::new(scope, ErrorKind::UpstreamQuery, message)
    }

    pub fn internal(scope: &'static str, message: impl Into<String>) -> Self {
        Self::new(scope, ErrorKind::Internal, message)
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.message
    }
}
