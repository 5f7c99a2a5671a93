// SPDX-FileCopyrightText: 2026 Admitdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the consultation backend's queue and session endpoints.
//!
//! Provides [`QueueGateway`], the [`QueueClient`] implementation. The backend
//! signals business-rule refusals inside 200-status bodies via an `error`
//! field; those are mapped to [`AdmitdeskError::SoftFailure`] and never
//! retried. Transport failures surface as `Queue` errors for the caller's
//! retry affordance.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};
use tracing::debug;

use admitdesk_core::types::sort_history;
use admitdesk_core::{
    AdmitdeskError, ChatMessage, ChatSession, Credentials, CustomerId, OfficialId, QueueClient,
    QueueEntry, QueueId, SessionId, SoftFailure,
};

/// REST gateway to the consultation backend.
///
/// Holds its credential explicitly; nothing is read from ambient storage
/// at call time.
#[derive(Debug, Clone)]
pub struct QueueGateway {
    client: reqwest::Client,
    base_url: String,
}

impl QueueGateway {
    /// Creates a gateway against `base_url`, attaching the bearer token
    /// from `credentials` to every request when present.
    pub fn new(
        base_url: impl Into<String>,
        credentials: &Credentials,
    ) -> Result<Self, AdmitdeskError> {
        let mut headers = HeaderMap::new();
        if let Some(ref token) = credentials.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| AdmitdeskError::Config(format!("invalid bearer token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AdmitdeskError::Queue {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, AdmitdeskError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdmitdeskError::Queue {
                message: format!("POST {path} failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        Self::read_body(path, response).await
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, AdmitdeskError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AdmitdeskError::Queue {
                message: format!("GET {path} failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        Self::read_body(path, response).await
    }

    /// Reads a response body, mapping non-success statuses to `Queue`
    /// errors and in-body `error` fields to soft failures.
    async fn read_body(path: &str, response: reqwest::Response) -> Result<Value, AdmitdeskError> {
        let status = response.status();
        debug!(status = %status, path, "backend response received");

        let body = response.text().await.map_err(|e| AdmitdeskError::Queue {
            message: format!("failed to read response body for {path}: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            return Err(AdmitdeskError::Queue {
                message: format!("{path} returned {status}: {body}"),
                source: None,
            });
        }

        let value: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).map_err(|e| AdmitdeskError::Protocol(format!(
                "malformed response body for {path}: {e}"
            )))?
        };

        // A 200 body carrying an `error` field is a refusal, not a success.
        if let Some(code) = value.get("error").and_then(Value::as_str) {
            return Err(AdmitdeskError::SoftFailure(SoftFailure::from_code(code)));
        }

        Ok(value)
    }

    fn parse<T: serde::de::DeserializeOwned>(path: &str, value: Value) -> Result<T, AdmitdeskError> {
        serde_json::from_value(value).map_err(|e| {
            AdmitdeskError::Protocol(format!("unexpected response shape for {path}: {e}"))
        })
    }
}

#[async_trait]
impl QueueClient for QueueGateway {
    async fn join_queue(&self, customer: CustomerId) -> Result<QueueEntry, AdmitdeskError> {
        let value = self
            .post("/queue/join", json!({ "customer_id": customer.0 }))
            .await?;
        Self::parse("/queue/join", value)
    }

    async fn cancel_queue_request(&self, customer: CustomerId) -> Result<(), AdmitdeskError> {
        self.post("/queue/cancel", json!({ "customer_id": customer.0 }))
            .await?;
        Ok(())
    }

    async fn list_queue(&self, official: OfficialId) -> Result<Vec<QueueEntry>, AdmitdeskError> {
        let value = self
            .get("/queue/list", &[("official_id", official.0.to_string())])
            .await?;
        Self::parse("/queue/list", value)
    }

    async fn list_active_sessions(
        &self,
        official: OfficialId,
    ) -> Result<Vec<ChatSession>, AdmitdeskError> {
        let value = self
            .get("/sessions/active", &[("official_id", official.0.to_string())])
            .await?;
        Self::parse("/sessions/active", value)
    }

    async fn accept(
        &self,
        official: OfficialId,
        queue: QueueId,
    ) -> Result<ChatSession, AdmitdeskError> {
        let value = self
            .post(
                "/queue/accept",
                json!({ "official_id": official.0, "queue_id": queue.0 }),
            )
            .await?;
        // SessionId deserialization rejects 0/null ids here.
        Self::parse("/queue/accept", value)
    }

    async fn reject(
        &self,
        official: OfficialId,
        queue: QueueId,
        reason: &str,
    ) -> Result<(), AdmitdeskError> {
        self.post(
            "/queue/reject",
            json!({ "official_id": official.0, "queue_id": queue.0, "reason": reason }),
        )
        .await?;
        Ok(())
    }

    async fn end_session(&self, session: SessionId, ended_by: i64) -> Result<(), AdmitdeskError> {
        self.post(
            "/sessions/end",
            json!({ "session_id": session.get(), "ended_by": ended_by }),
        )
        .await?;
        Ok(())
    }

    async fn session_messages(
        &self,
        session: SessionId,
    ) -> Result<Vec<ChatMessage>, AdmitdeskError> {
        let path = format!("/sessions/{}/messages", session.get());
        let value = self.get(&path, &[]).await?;
        let mut messages: Vec<ChatMessage> = Self::parse(&path, value)?;
        sort_history(&mut messages);
        Ok(messages)
    }
}
