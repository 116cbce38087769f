use thiserror::Error;

/// Failures surfaced by the cache, the accessors and the mutation protocols.
///
/// `Forbidden` is always distinct from `Transport` so a caller can render
/// "not authorized" instead of a generic failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DaoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("No valid selector found on {0}")]
    NoSelector(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("K8s API error: {0}")]
    Transport(String),

    #[error("Stale cache: {0}")]
    Stale(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DaoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DaoError::NotFound(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, DaoError::Forbidden(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, DaoError::Transport(_))
    }

    /// Warning-grade: reads still succeed with best-effort data.
    pub fn is_stale(&self) -> bool {
        matches!(self, DaoError::Stale(_))
    }
}

/// Helper for mapping any unknown error into a transport error
pub fn transport_error<E: ToString>(err: E) -> DaoError {
    DaoError::Transport(err.to_string())
}

impl From<kube::Error> for DaoError {
    fn from(err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => DaoError::NotFound(resp.message.clone()),
            kube::Error::Api(resp) if resp.code == 403 => DaoError::Forbidden(resp.message.clone()),
            _ => DaoError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DaoError {
    fn from(err: serde_json::Error) -> Self {
        DaoError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_renders_differently_from_transport() {
        let denied = DaoError::Forbidden("user is not authorized to restart a daemonset".into());
        let broken = transport_error("connection reset");

        assert!(denied.is_forbidden());
        assert!(!denied.is_transport());
        assert!(broken.is_transport());
        assert_ne!(denied.to_string(), broken.to_string());
        assert!(denied.to_string().starts_with("Forbidden"));
    }

    #[test]
    fn json_errors_become_decode_errors() {
        let err = serde_json::from_str::<u32>("\"nope\"").unwrap_err();
        assert!(matches!(DaoError::from(err), DaoError::Decode(_)));
    }
}
