use crate::config::toml_config::NotificationSection;
use crate::core::presenter::resolve_link;
use crate::domain::model::{NotificationRequest, SubmissionRequest, SubmissionResult};
use crate::domain::ports::NotificationRelay;
use crate::utils::error::{NotificationError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Builds the relay request for a successful submission.
///
/// The link is made absolute against `base_url` because the recipient opens
/// it outside this session.
pub fn prepare_notification(
    request: &SubmissionRequest,
    result: &SubmissionResult,
    base_url: &str,
) -> std::result::Result<NotificationRequest, NotificationError> {
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or(NotificationError::MissingEmail)?;
    let download_ref = result
        .download_ref
        .as_deref()
        .ok_or(NotificationError::MissingLink)?;

    Ok(NotificationRequest {
        email: email.to_string(),
        result_link: resolve_link(base_url, download_ref)?.to_string(),
    })
}

#[derive(Debug, Serialize)]
struct RelayPayload<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

#[derive(Debug, Serialize)]
struct TemplateParams<'a> {
    to_email: &'a str,
    result_link: &'a str,
}

/// EmailJS-style REST relay with a fixed template.
#[derive(Debug, Clone)]
pub struct EmailJsRelay {
    client: Client,
    endpoint: String,
    service_id: String,
    template_id: String,
    public_key: String,
}

impl EmailJsRelay {
    pub fn new(section: &NotificationSection, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: section.endpoint.clone(),
            service_id: section.service_id.clone(),
            template_id: section.template_id.clone(),
            public_key: section.public_key.clone(),
        })
    }
}

#[async_trait]
impl NotificationRelay for EmailJsRelay {
    async fn send(&self, request: &NotificationRequest) -> std::result::Result<(), NotificationError> {
        if request.email.trim().is_empty() {
            return Err(NotificationError::MissingEmail);
        }

        let payload = RelayPayload {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: &self.public_key,
            template_params: TemplateParams {
                to_email: &request.email,
                result_link: &request.result_link,
            },
        };

        tracing::debug!("Sending result link via {}", self.endpoint);
        let response = self.client.post(&self.endpoint).json(&payload).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// An unconfigured relay reports itself instead of silently doing nothing.
#[async_trait]
impl<R: NotificationRelay> NotificationRelay for Option<R> {
    async fn send(&self, request: &NotificationRequest) -> std::result::Result<(), NotificationError> {
        match self {
            Some(relay) => relay.send(request).await,
            None => Err(NotificationError::NotConfigured),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request(email: Option<&str>) -> SubmissionRequest {
        SubmissionRequest {
            file_name: "m.csv".to_string(),
            file_bytes: Vec::new(),
            weights_raw: "1,1".to_string(),
            impacts_raw: "+,-".to_string(),
            notify: true,
            email: email.map(str::to_string),
        }
    }

    fn result(download: Option<&str>) -> SubmissionResult {
        SubmissionResult {
            table: Vec::new(),
            download_ref: download.map(str::to_string),
            server_mail: None,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_prepare_resolves_absolute_link() {
        let notification = prepare_notification(
            &request(Some("user@example.com")),
            &result(Some("/api/download/topsis_result_7.csv")),
            "https://topsis.example.com",
        )
        .unwrap();

        assert_eq!(notification.email, "user@example.com");
        assert_eq!(
            notification.result_link,
            "https://topsis.example.com/api/download/topsis_result_7.csv"
        );
    }

    #[test]
    fn test_prepare_preconditions() {
        assert!(matches!(
            prepare_notification(&request(None), &result(Some("/r.csv")), "http://x.io"),
            Err(NotificationError::MissingEmail)
        ));
        assert!(matches!(
            prepare_notification(&request(Some("  ")), &result(Some("/r.csv")), "http://x.io"),
            Err(NotificationError::MissingEmail)
        ));
        assert!(matches!(
            prepare_notification(&request(Some("a@b.io")), &result(None), "http://x.io"),
            Err(NotificationError::MissingLink)
        ));
        assert!(matches!(
            prepare_notification(&request(Some("a@b.io")), &result(Some("/r.csv")), "bad base"),
            Err(NotificationError::InvalidLink(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_relay_reports_not_configured() {
        let relay: Option<EmailJsRelay> = None;
        let outcome = relay
            .send(&NotificationRequest {
                email: "a@b.io".to_string(),
                result_link: "http://x.io/r.csv".to_string(),
            })
            .await;
        assert!(matches!(outcome, Err(NotificationError::NotConfigured)));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_relay_logs_endpoint_without_recipient() {
        use httpmock::prelude::*;

        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/send");
                then.status(200).body("OK");
            })
            .await;

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let relay = EmailJsRelay::new(
            &NotificationSection {
                endpoint: server.url("/send"),
                service_id: "svc".to_string(),
                template_id: "tpl".to_string(),
                public_key: "pk".to_string(),
            },
            5,
        )
        .unwrap();
        relay
            .send(&NotificationRequest {
                email: "private@example.com".to_string(),
                result_link: "http://x.io/r.csv".to_string(),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains(&server.url("/send")));
        assert!(!output.contains("private@example.com"));
    }
}
