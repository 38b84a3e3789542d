//! Facebook Graph API photo publisher.
//!
//! One form-encoded `POST {graph_url}/{page_id}/photos` per call, bounded by
//! the configured timeout. The platform fetches the image from `url` itself.

use std::time::Duration;

use async_trait::async_trait;
use couponbot_core::config::FacebookConfig;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{PublishError, PublishReceipt, Publisher};

pub struct GraphPublisher {
    client: reqwest::Client,
    page_id: Option<String>,
    access_token: Option<String>,
    base_url: String,
    timeout_secs: u64,
}

impl GraphPublisher {
    pub fn new(cfg: &FacebookConfig) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            page_id: cfg.page_id.clone(),
            access_token: cfg.access_token.clone(),
            base_url: cfg.graph_url.trim_end_matches('/').to_string(),
            timeout_secs: cfg.timeout_secs,
        })
    }

    /// Whether both the page id and the token are present.
    pub fn is_configured(&self) -> bool {
        self.page_id.is_some() && self.access_token.is_some()
    }

    fn photos_url(&self, page_id: &str) -> String {
        format!("{}/{}/photos", self.base_url, page_id)
    }
}

#[async_trait]
impl Publisher for GraphPublisher {
    fn name(&self) -> &str {
        "facebook"
    }

    async fn publish(
        &self,
        image_url: &str,
        caption: &str,
    ) -> Result<PublishReceipt, PublishError> {
        let page_id = self
            .page_id
            .as_deref()
            .ok_or(PublishError::MissingCredentials("FACEBOOK_PAGE_ID"))?;
        let token = self
            .access_token
            .as_deref()
            .ok_or(PublishError::MissingCredentials("FACEBOOK_PAGE_ACCESS_TOKEN"))?;

        let url = self.photos_url(page_id);
        debug!(%url, image = %image_url, "posting photo to Graph API");

        let form = [("url", image_url), ("caption", caption), ("access_token", token)];
        let resp = self
            .client
            .post(&url)
            .form(&form[..])
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.map_err(|e| self.map_transport(e))?;
            let (code, message) = parse_error_body(&text);
            warn!(status = status.as_u16(), ?code, body = %text, "Graph API error");
            return Err(PublishError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        // The post is live once we get a 2xx; a body we can't read or parse
        // only costs us the ids in the log line.
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    status = status.as_u16(),
                    error = %e,
                    "Graph API accepted the post but the body was unreadable"
                );
                return Ok(PublishReceipt::default());
            }
        };
        let receipt = serde_json::from_str::<PhotoResponse>(&text)
            .map(|r| PublishReceipt {
                id: r.id,
                post_id: r.post_id,
            })
            .unwrap_or_default();
        Ok(receipt)
    }
}

impl GraphPublisher {
    fn map_transport(&self, e: reqwest::Error) -> PublishError {
        if e.is_timeout() {
            PublishError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            PublishError::Transport(e)
        }
    }
}

#[derive(Deserialize)]
struct PhotoResponse {
    id: Option<String>,
    post_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: GraphError,
}

#[derive(Deserialize)]
struct GraphError {
    message: Option<String>,
    code: Option<i64>,
}

/// Pull `error.message` / `error.code` out of a Graph error body, falling
/// back to the raw text.
fn parse_error_body(text: &str) -> (Option<i64>, String) {
    match serde_json::from_str::<ErrorEnvelope>(text) {
        Ok(env) => (
            env.error.code,
            env.error.message.unwrap_or_else(|| text.to_string()),
        ),
        Err(_) => (None, text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn config(base: &str) -> FacebookConfig {
        FacebookConfig {
            page_id: Some("12345".into()),
            access_token: Some("page-token".into()),
            graph_url: base.to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn posts_form_fields_and_reads_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/12345/photos"))
            .and(body_string_contains("url=https%3A%2F%2Fcdn.example%2Fa.jpg"))
            .and(body_string_contains("access_token=page-token"))
            .and(body_string_contains("caption="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "777",
                "post_id": "12345_888"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let publisher = GraphPublisher::new(&config(&server.uri())).unwrap();
        let receipt = publisher
            .publish("https://cdn.example/a.jpg", "Hello coupon")
            .await
            .unwrap();
        assert_eq!(receipt.id.as_deref(), Some("777"));
        assert_eq!(receipt.post_id.as_deref(), Some("12345_888"));
    }

    #[tokio::test]
    async fn success_with_unexpected_body_is_still_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/12345/photos"))
            .respond_with(ResponseTemplate::new(201).set_body_string("ok"))
            .mount(&server)
            .await;

        let publisher = GraphPublisher::new(&config(&server.uri())).unwrap();
        let receipt = publisher.publish("https://img", "cap").await.unwrap();
        assert_eq!(receipt, PublishReceipt::default());
    }

    #[tokio::test]
    async fn success_with_truncated_body_is_still_success() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Announces more body than it sends, then hangs up.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if n == 0 || buf.ends_with(b"access_token=page-token") {
                    break;
                }
            }
            sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"id\":")
                .await
                .unwrap();
            sock.shutdown().await.unwrap();
        });

        let publisher = GraphPublisher::new(&config(&format!("http://{addr}"))).unwrap();
        let receipt = publisher.publish("https://img", "cap").await.unwrap();
        assert_eq!(receipt, PublishReceipt::default());
    }

    #[tokio::test]
    async fn bad_request_surfaces_graph_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/12345/photos"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "message": "(#324) Missing or invalid image file",
                    "type": "OAuthException",
                    "code": 324
                }
            })))
            .mount(&server)
            .await;

        let publisher = GraphPublisher::new(&config(&server.uri())).unwrap();
        let err = publisher.publish("https://img", "cap").await.unwrap_err();
        match &err {
            PublishError::Api { status, code, message } => {
                assert_eq!(*status, 400);
                assert_eq!(*code, Some(324));
                assert!(message.contains("Missing or invalid image"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert!(!err.is_auth_failure());
    }

    #[tokio::test]
    async fn expired_token_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "Error validating access token", "code": 190 }
            })))
            .mount(&server)
            .await;

        let publisher = GraphPublisher::new(&config(&server.uri())).unwrap();
        let err = publisher.publish("https://img", "cap").await.unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn non_json_error_body_kept_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let publisher = GraphPublisher::new(&config(&server.uri())).unwrap();
        match publisher.publish("https://img", "cap").await {
            Err(PublishError::Api { status, code, message }) => {
                assert_eq!(status, 502);
                assert_eq!(code, None);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut cfg = config(&server.uri());
        cfg.timeout_secs = 1;
        let publisher = GraphPublisher::new(&cfg).unwrap();
        let err = publisher.publish("https://img", "cap").await.unwrap_err();
        assert!(matches!(err, PublishError::Timeout { secs: 1 }));
    }

    #[tokio::test]
    async fn missing_credentials_skip_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut cfg = config(&server.uri());
        cfg.access_token = None;
        let publisher = GraphPublisher::new(&cfg).unwrap();
        assert!(!publisher.is_configured());
        let err = publisher.publish("https://img", "cap").await.unwrap_err();
        assert!(matches!(
            err,
            PublishError::MissingCredentials("FACEBOOK_PAGE_ACCESS_TOKEN")
        ));
        assert!(err.is_auth_failure());
    }

    #[test]
    fn trailing_slash_in_base_url_is_trimmed() {
        let publisher = GraphPublisher::new(&config("https://graph.example/")).unwrap();
        assert_eq!(
            publisher.photos_url("42"),
            "https://graph.example/42/photos"
        );
    }
}
