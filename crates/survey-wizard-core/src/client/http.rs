//! HTTP client for the survey backend.
//!
//! JSON over HTTP against an explicit base URL, no auth header: the usercode
//! is the only correlation key. Every request is bounded by the configured
//! timeout. Idempotent calls retry transient failures with exponential
//! backoff; calls that create something on the server are sent once.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::traits::SurveyBackend;
use super::wire::{
    AnswerFeedbackRequest, ChatRequest, FeedbackReply, FinalFeedbackRequest, SessionStart,
    TextReply, UsercodeReply, ValidateRequest,
};
use crate::error::ApiError;
use crate::storage::ApiConfig;
use crate::survey::{Demographics, Distribution, Question};
use crate::wizard::SurveySubmission;

/// Retry schedule for idempotent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based): `backoff * 2^attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub register_path: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ApiConfig::default().into()
    }
}

impl From<&ApiConfig> for ClientOptions {
    fn from(api: &ApiConfig) -> Self {
        Self {
            base_url: api.base_url.clone(),
            register_path: api.register_path.clone(),
            timeout: Duration::from_secs(api.timeout_secs),
            retry: RetryPolicy {
                retries: api.retries,
                backoff: Duration::from_millis(api.backoff_ms),
            },
        }
    }
}

impl From<ApiConfig> for ClientOptions {
    fn from(api: ApiConfig) -> Self {
        (&api).into()
    }
}

/// Typed wrapper over the survey REST API.
#[derive(Debug, Clone)]
pub struct RemoteSurveyClient {
    http: Client,
    base_url: Url,
    register_path: String,
    retry: RetryPolicy,
}

impl RemoteSurveyClient {
    pub fn new(options: ClientOptions) -> Result<Self, ApiError> {
        let base_url = Url::parse(&options.base_url).map_err(|e| ApiError::InvalidUrl {
            url: options.base_url.clone(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: options.base_url,
                message: "URL cannot be used as a base".to_string(),
            });
        }
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| ApiError::Transport {
                endpoint: "client setup".to_string(),
                source: e,
            })?;
        Ok(Self {
            http,
            base_url,
            register_path: options.register_path,
            retry: options.retry,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append `path` to the base URL, keeping any path prefix of the base.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| ApiError::InvalidUrl {
            url: joined,
            message: e.to_string(),
        })
    }

    /// Send once and return the body of a 2xx response.
    async fn execute(&self, endpoint: &str, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let resp = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(endpoint, e))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(endpoint, e))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn with_retry<T, F, Fut>(&self, endpoint: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retry.retries && e.is_transient() => {
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(endpoint, attempt, ?delay, error = %e, "retrying request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Idempotent GET, retried on transient failure.
    async fn get(&self, path: &str) -> Result<String, ApiError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "GET");
        self.with_retry(path, || self.execute(path, self.http.get(url.clone())))
            .await
    }

    async fn post<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        idempotent: bool,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, idempotent, "POST");
        let send = || self.execute(path, self.http.post(url.clone()).json(body));
        if idempotent {
            self.with_retry(path, send).await
        } else {
            send().await
        }
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

/// Parse leniently: unusable payloads become `Value::Null`.
fn lenient_json(endpoint: &str, body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| {
        tracing::warn!(endpoint, error = %e, "malformed response body, treating as empty");
        Value::Null
    })
}

#[async_trait]
impl SurveyBackend for RemoteSurveyClient {
    async fn fetch_questions(&self) -> Result<Vec<Question>, ApiError> {
        let endpoint = "/questions";
        let body = self.get(endpoint).await?;
        let questions = match lenient_json(endpoint, &body) {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<Question>(item).ok())
                .collect(),
            _ => Vec::new(),
        };
        Ok(questions)
    }

    async fn validate_user_code(&self, usercode: &str) -> Result<bool, ApiError> {
        let endpoint = "/validate_usercode";
        let body = self.post(endpoint, &ValidateRequest { usercode }, true).await?;
        Ok(lenient_json(endpoint, &body)
            .get("valid")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn register_user(&self, demographics: &Demographics) -> Result<String, ApiError> {
        let endpoint = self.register_path.clone();
        let body = self.post(&endpoint, demographics, false).await?;
        let reply: UsercodeReply = decode(&endpoint, &body)?;
        Ok(reply.usercode)
    }

    async fn start_session(&self, usercode: &str) -> Result<SessionStart, ApiError> {
        let endpoint = format!("/users/{}/session/start", urlencoding::encode(usercode));
        let body = self.post(&endpoint, &serde_json::json!({}), false).await?;
        decode(&endpoint, &body)
    }

    async fn fetch_answer_distribution(&self, question_id: &str) -> Result<Distribution, ApiError> {
        let endpoint = format!("/question_answers/{}", urlencoding::encode(question_id));
        let body = self.get(&endpoint).await?;
        Ok(Distribution::from_value(&lenient_json(&endpoint, &body)))
    }

    async fn submit_survey(&self, submission: &SurveySubmission) -> Result<(), ApiError> {
        self.post("/submit_survey", submission, false).await?;
        Ok(())
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        let endpoint = "/v1/chat";
        let body = self.post(endpoint, request, false).await?;
        let reply: TextReply = decode(endpoint, &body)?;
        Ok(reply.text)
    }

    async fn answer_feedback(&self, request: &AnswerFeedbackRequest) -> Result<FeedbackReply, ApiError> {
        let endpoint = "/v1/survey/answer_feedback";
        let body = self.post(endpoint, request, false).await?;
        decode(endpoint, &body)
    }

    async fn final_feedback(&self, request: &FinalFeedbackRequest) -> Result<FeedbackReply, ApiError> {
        let endpoint = "/v1/survey/final_feedback";
        let body = self.post(endpoint, request, false).await?;
        decode(endpoint, &body)
    }
}
