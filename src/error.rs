//! Error types for the put.io provider.

use thiserror::Error;

use crate::client::ClientError;
use crate::schema::Diagnostic;

/// Errors that can occur while serving a provider request.
///
/// Every variant surfaces to the host as exactly one error [`Diagnostic`]
/// whose summary is [`ProviderError::category`] and whose detail is the
/// rendered error message.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A call to the put.io API failed, either while building the request,
    /// in transit, or because put.io answered with a non-2xx status.
    #[error("{context}, got error: {source}")]
    Client {
        /// What the provider was trying to do.
        context: String,
        /// The underlying client failure.
        #[source]
        source: ClientError,
    },

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("{summary}: {detail}")]
    Configuration {
        /// Short description of the failed configuration step.
        summary: String,
        /// Why it failed.
        detail: String,
    },

    /// A resource operation ran before `configure` succeeded.
    #[error("Provider is not configured: {0}")]
    NotConfigured(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal provider error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Wrap a client failure with the operation that triggered it.
    pub fn client(context: impl Into<String>, source: ClientError) -> Self {
        Self::Client {
            context: context.into(),
            source,
        }
    }

    /// Build a configuration error.
    pub fn configuration(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Configuration {
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// The short, user-facing label for this error.
    ///
    /// Remote rejections and network failures share the same label.
    pub fn category(&self) -> &str {
        match self {
            Self::Client { .. } => "Client Error",
            Self::Validation(_) => "Validation Error",
            Self::Configuration { summary, .. } => summary,
            Self::NotConfigured(_) => "Unconfigured Provider",
            Self::UnknownResource(_) => "Unknown Resource Type",
            Self::Serialization(_) => "Invalid State",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Render this error as a single error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let detail = match self {
            Self::Configuration { detail, .. } => detail.clone(),
            other => other.to_string(),
        };
        Diagnostic::error(self.category()).with_detail(detail)
    }
}
