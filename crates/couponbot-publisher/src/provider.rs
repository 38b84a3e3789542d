use async_trait::async_trait;

/// Identifiers the platform returns for a created post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Photo object id.
    pub id: Option<String>,
    /// Feed post id (`{page_id}_{post}`), present for page photo posts.
    pub post_id: Option<String>,
}

/// Errors from a publish attempt. None of them are retried in-cycle.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publisher credentials missing: {0}")]
    MissingCredentials(&'static str),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        /// Platform-specific error code, when the body carried one.
        code: Option<i64>,
        message: String,
    },
}

impl PublishError {
    /// True when the failure points at the token or page id rather than at
    /// the network, so the next cycle will fail the same way.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            PublishError::MissingCredentials(_) => true,
            PublishError::Api { status, code, .. } => {
                matches!(status, 401 | 403) || *code == Some(190)
            }
            _ => false,
        }
    }
}

/// A destination a coupon post can be published to.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Publish one image post with `caption`.
    async fn publish(&self, image_url: &str, caption: &str)
        -> Result<PublishReceipt, PublishError>;
}
