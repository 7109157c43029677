//! Hermod error types

use std::collections::BTreeMap;

/// Hermod error types
#[derive(Debug, thiserror::Error)]
pub enum HermodError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    // Server-side errors
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// 4xx response carrying a field-level validation payload.
    ///
    /// `fields` maps field name → messages; `non_field` collects
    /// `detail` / `non_field_errors` style entries. Callers render these
    /// inline or summarized; the library never flattens them to a string.
    #[error("validation failed: {}", summarize_fields(.fields, .non_field))]
    Validation {
        fields: BTreeMap<String, Vec<String>>,
        non_field: Vec<String>,
    },

    // Authentication errors
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The access token was rejected and could not be refreshed. The
    /// session has been cleared and a signed-out event emitted.
    #[error("session expired")]
    SessionExpired,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A cache entry was read with a different type than it was written
    /// with. Query keys must always be paired with a single data type.
    #[error("cache type mismatch for key {key}")]
    CacheTypeMismatch { key: String },

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HermodError {
    /// Whether this error means the session is gone and the caller should
    /// route the user back to the login screen.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            HermodError::AuthenticationFailed | HermodError::SessionExpired
        )
    }

    /// Field-level validation messages, if this is a validation error.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            HermodError::Validation { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Best-effort single-line message for generic presentation.
    ///
    /// Mirrors the original client's `detail || JSON.stringify(data) ||
    /// message` extraction: prefer non-field detail, fall back to the
    /// first field message, then to the Display impl.
    pub fn summary(&self) -> String {
        match self {
            HermodError::Validation { fields, non_field } => non_field
                .first()
                .cloned()
                .or_else(|| {
                    fields
                        .iter()
                        .next()
                        .and_then(|(name, msgs)| msgs.first().map(|m| format!("{name}: {m}")))
                })
                .unwrap_or_else(|| "validation failed".to_string()),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for HermodError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured duration on the error
            HermodError::Timeout(std::time::Duration::ZERO)
        } else {
            HermodError::Http(err.to_string())
        }
    }
}

fn summarize_fields(fields: &BTreeMap<String, Vec<String>>, non_field: &[String]) -> String {
    if let Some(msg) = non_field.first() {
        return msg.clone();
    }
    let names: Vec<&str> = fields.keys().map(String::as_str).collect();
    if names.is_empty() {
        "no details".to_string()
    } else {
        names.join(", ")
    }
}

/// Result type alias for Hermod operations
pub type Result<T> = std::result::Result<T, HermodError>;
