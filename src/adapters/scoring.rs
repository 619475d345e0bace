use crate::domain::model::{ResultRow, ServerMailStatus, SubmissionRequest, SubmissionResult};
use crate::domain::ports::{ScoringService, ServiceConfig};
use crate::utils::error::{Result, ScoringError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

/// Multipart client for the TOPSIS scoring service. Never retries.
#[derive(Debug, Clone)]
pub struct HttpScoringClient {
    client: Client,
    scoring_url: Url,
    health_url: Url,
}

impl HttpScoringClient {
    pub fn new<C: ServiceConfig>(config: &C) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()?;

        Ok(Self {
            client,
            scoring_url: endpoint_url(config.base_url(), config.scoring_path())?,
            health_url: endpoint_url(config.base_url(), config.health_path())?,
        })
    }

    pub fn scoring_url(&self) -> &Url {
        &self.scoring_url
    }

    pub fn health_url(&self) -> &Url {
        &self.health_url
    }

    fn form(request: &SubmissionRequest) -> std::result::Result<Form, ScoringError> {
        let file = Part::bytes(request.file_bytes.clone())
            .file_name(request.file_name.clone())
            .mime_str("text/csv")?;

        let mut form = Form::new()
            .part("file", file)
            .text("weights", request.weights_raw.clone())
            .text("impacts", request.impacts_raw.clone())
            .text("send_mail", request.notify.to_string());

        if let Some(email) = &request.email {
            form = form.text("email", email.clone());
        }
        Ok(form)
    }
}

#[async_trait]
impl ScoringService for HttpScoringClient {
    async fn score(
        &self,
        request: &SubmissionRequest,
    ) -> std::result::Result<SubmissionResult, ScoringError> {
        tracing::debug!(
            "Posting '{}' ({} bytes) to {}",
            request.file_name,
            request.file_bytes.len(),
            self.scoring_url
        );

        let response = self
            .client
            .post(self.scoring_url.clone())
            .multipart(Self::form(request)?)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Scoring response status: {}", status);
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ScoringError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let json = serde_json::from_slice::<Value>(&body).unwrap_or_else(|e| {
            tracing::warn!("Scoring response is not JSON ({}), treating as empty", e);
            Value::Null
        });
        Ok(normalize_response(json))
    }

    async fn health(&self) -> std::result::Result<String, ScoringError> {
        let response = self.client.get(self.health_url.clone()).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ScoringError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let text = match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(obj)) => match obj.get("status") {
                Some(Value::String(s)) => s.clone(),
                _ => Value::Object(obj).to_string(),
            },
            _ => String::from_utf8_lossy(&body).trim().to_string(),
        };
        Ok(text)
    }
}

/// `path` appended to whatever path `base_url` already carries.
pub fn endpoint_url(base_url: &str, path: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    let joined = format!("{}{}", url.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    Ok(url)
}

/// The `error` string of a failure body, when there is one.
pub fn error_message(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(mut obj)) => match obj.remove("error") {
            Some(Value::String(message)) => Some(message),
            _ => None,
        },
        _ => None,
    }
}

/// Coerces whatever the service returned into the canonical result shape.
pub fn normalize_response(body: Value) -> SubmissionResult {
    let mut obj = match body {
        Value::Object(obj) => obj,
        other => {
            tracing::warn!("Scoring response is not an object: {}", kind(&other));
            Map::new()
        }
    };

    let table = match obj.remove("table") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(ResultRow(row)),
                other => {
                    tracing::warn!("Dropping non-object result row: {}", kind(&other));
                    None
                }
            })
            .collect(),
        Some(other) => {
            tracing::warn!("Result table is {}, not an array", kind(&other));
            Vec::new()
        }
        None => {
            tracing::warn!("Scoring response has no table");
            Vec::new()
        }
    };

    let download_ref = match obj.remove("download") {
        Some(Value::String(locator)) if !locator.is_empty() => Some(locator),
        _ => None,
    };

    let server_mail = match obj.remove("emailSent") {
        Some(Value::Bool(sent)) => Some(ServerMailStatus {
            sent,
            error: match obj.remove("emailError") {
                Some(Value::String(error)) => Some(error),
                _ => None,
            },
        }),
        _ => None,
    };

    SubmissionResult {
        table,
        download_ref,
        server_mail,
        received_at: Utc::now(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
