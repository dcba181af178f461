//! HTTP implementation of the remote API contracts.

use super::{
    ApiError, JobApi, JobStatus, JobUpload, NotificationApi, NotificationFilter,
    NotificationPage, SubmitOptions, SubmittedJob, UnreadCount,
};
use crate::config::HttpSettings;
use crate::session;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// JSON-over-HTTP client implementing both [`JobApi`] and [`NotificationApi`].
///
/// Submissions go up as multipart form data; everything else is JSON. The
/// process session id rides along on every submit so the server can
/// correlate this client instance's jobs and notifications.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base: String,
}

impl HttpClient {
    /// Build a client from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(settings: &HttpSettings) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Map a non-success response to [`ApiError::Status`].
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl JobApi for HttpClient {
    async fn submit(
        &self,
        upload: JobUpload,
        options: &SubmitOptions,
    ) -> Result<SubmittedJob, ApiError> {
        let mut part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name(upload.filename.clone());
        if let Some(content_type) = &upload.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|err| ApiError::Transport(err.to_string()))?;
        }

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("sessionId", session::id().to_string());
        if let Some(priority) = options.priority {
            form = form.text("priority", priority.to_string());
        }
        if let Some(webhook_url) = &options.webhook_url {
            form = form.text("webhookUrl", webhook_url.clone());
        }

        let response = self
            .http
            .post(self.url("/jobs"))
            .multipart(form)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let response = self.http.get(self.url(&format!("/jobs/{job_id}"))).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn cancel(&self, job_id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/jobs/{job_id}/cancel")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn retry(&self, job_id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/jobs/{job_id}/retry")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationApi for HttpClient {
    async fn unread_count(&self) -> Result<UnreadCount, ApiError> {
        let response = self
            .http
            .get(self.url("/notifications/unread-count"))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<NotificationPage, ApiError> {
        let mut request = self
            .http
            .get(self.url("/notifications"))
            .query(&[("unreadOnly", filter.unread_only.to_string())]);
        if let Some(limit) = filter.limit {
            request = request.query(&[("limit", limit.to_string())]);
        }
        if let Some(offset) = filter.offset {
            request = request.query(&[("offset", offset.to_string())]);
        }

        let response = request.send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn mark_read(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/notifications/{id}/read")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn mark_many_read(&self, ids: &[String]) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("/notifications/read"))
            .json(&json!({ "ids": ids }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("/notifications/read-all"))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HttpClient::new(&HttpSettings {
            base_url: "http://localhost:8080/api/".to_string(),
            timeout_ms: 1_000,
        })
        .unwrap();

        assert_eq!(client.url("/jobs"), "http://localhost:8080/api/jobs");
    }
}
