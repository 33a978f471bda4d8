//! HTTP client for the meetly-server API
//!
//! [`MeetingApi`] is the narrow surface the session tracker needs (join,
//! leave, refresh); [`HttpMeetingApi`] implements it over reqwest and also
//! exposes the rest of the endpoints for the CLI.

use async_trait::async_trait;
use meetly_common::api::{
    AuthResponse, CreateMeetingRequest, ErrorResponse, JoinMeetingResponse, LoginRequest,
    MeetingCodeRequest, RegisterRequest, SubmitFileRequest,
};
use meetly_common::db::{
    Meeting, MeetingParticipant, MeetingWithParticipants, Submission, SubmissionWithUser, User,
};
use meetly_common::AttendanceReport;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{ClientError, Result};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server calls made by a [`crate::MeetingSession`]
#[async_trait]
pub trait MeetingApi: Send + Sync {
    async fn join(&self, code: &str) -> Result<JoinMeetingResponse>;
    async fn leave(&self, code: &str) -> Result<MeetingParticipant>;
    async fn meeting(&self, code: &str) -> Result<MeetingWithParticipants>;
}

pub struct HttpMeetingApi {
    http_client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpMeetingApi {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("meetly/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("API {} {}", method, url);
        let builder = self.http_client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        if self.token.is_none() {
            return Err(ClientError::NotSignedIn);
        }
        Ok(self.request(method, path))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) => (body.error.code, body.error.message),
            Err(_) => ("UNKNOWN".to_string(), text),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(self.authed(method, path)?.json(body)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(self.authed(Method::GET, path)?).await
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let body = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_json(self.request(Method::POST, "/auth/register").json(&body))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_json(self.request(Method::POST, "/auth/login").json(&body))
            .await
    }

    pub async fn logout(&self) -> Result<()> {
        self.send(self.authed(Method::POST, "/auth/logout")?).await?;
        Ok(())
    }

    pub async fn me(&self) -> Result<User> {
        self.get("/auth/me").await
    }

    pub async fn create_meeting(&self, title: &str, description: Option<String>) -> Result<Meeting> {
        let body = CreateMeetingRequest {
            title: title.to_string(),
            description,
            start_time: None,
        };
        self.call(Method::POST, "/meetings", &body).await
    }

    pub async fn ongoing(&self) -> Result<Vec<MeetingWithParticipants>> {
        self.get("/meetings/ongoing").await
    }

    pub async fn created(&self) -> Result<Vec<MeetingWithParticipants>> {
        self.get("/meetings/created").await
    }

    pub async fn participated(&self) -> Result<Vec<MeetingWithParticipants>> {
        self.get("/meetings/meetings").await
    }

    pub async fn attendance(&self, meeting_id: &str) -> Result<AttendanceReport> {
        self.get(&format!("/meetings/{}/attendance", meeting_id)).await
    }

    pub async fn submit(&self, request: &SubmitFileRequest) -> Result<Submission> {
        self.call(Method::PUT, "/submissions", request).await
    }

    pub async fn submissions(&self, meeting_id: &str) -> Result<Vec<SubmissionWithUser>> {
        self.get(&format!("/submissions/meeting/{}", meeting_id)).await
    }
}

#[async_trait]
impl MeetingApi for HttpMeetingApi {
    async fn join(&self, code: &str) -> Result<JoinMeetingResponse> {
        let body = MeetingCodeRequest {
            code: code.to_string(),
        };
        self.call(Method::PUT, "/meetings/join", &body).await
    }

    async fn leave(&self, code: &str) -> Result<MeetingParticipant> {
        let body = MeetingCodeRequest {
            code: code.to_string(),
        };
        self.call(Method::PUT, "/meetings/leave", &body).await
    }

    async fn meeting(&self, code: &str) -> Result<MeetingWithParticipants> {
        self.get(&format!("/meetings/code/{}", code)).await
    }
}
