//! Error types for participants and configuration.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use xmlls_dom::BadLocation;

/// Outcome of a grammar download, delivered when the download finishes.
pub type ResourceFuture = Pin<Box<dyn Future<Output = Result<String, String>> + Send>>;

/// A failure raised by a participant or a content model provider.
///
/// The registry isolates these: the failing contribution is logged and
/// skipped. Diagnostics treat [`ParticipantError::ResourceDownloading`]
/// specially, see [`crate::services::diagnostics`].
#[derive(Error)]
pub enum ParticipantError {
    /// A grammar referenced by the document is not available yet.
    ///
    /// With a future, the resource is being fetched and the future
    /// resolves to its local path (or the download error). Without one,
    /// the resource will never be available, e.g. a refused location.
    #[error("{message}")]
    ResourceDownloading {
        message: String,
        future: Option<ResourceFuture>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ParticipantError {
    pub fn downloading(message: impl Into<String>, future: ResourceFuture) -> Self {
        Self::ResourceDownloading {
            message: message.into(),
            future: Some(future),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ResourceDownloading {
            message: message.into(),
            future: None,
        }
    }

    pub fn is_resource_downloading(&self) -> bool {
        matches!(self, Self::ResourceDownloading { .. })
    }
}

impl fmt::Debug for ParticipantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceDownloading { message, future } => f
                .debug_struct("ResourceDownloading")
                .field("message", message)
                .field("pending", &future.is_some())
                .finish(),
            Self::Other(err) => f.debug_tuple("Other").field(err).finish(),
        }
    }
}

impl From<BadLocation> for ParticipantError {
    fn from(err: BadLocation) -> Self {
        Self::Other(err.into())
    }
}

pub type ParticipantResult<T = ()> = Result<T, ParticipantError>;

/// Invalid client configuration.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings must be a JSON object")]
    NotAnObject,

    #[error("invalid settings: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_error_display() {
        let err = ParticipantError::unavailable("Cannot download grammar.xsd");
        assert!(err.is_resource_downloading());
        assert_eq!(err.to_string(), "Cannot download grammar.xsd");

        let err = ParticipantError::from(anyhow::anyhow!("boom"));
        assert!(!err.is_resource_downloading());
        assert_eq!(err.to_string(), "boom");
    }
}
