//! LMS REST API backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use examkit_core::error::BackendError;
use examkit_core::model::{
    AnswerMap, ExamHistoryEntry, Lesson, LessonDetail, Module, ModuleRef, SubmitReceipt,
};
use examkit_core::traits::ExamBackend;

use crate::auth::{AuthSession, User};
use crate::config::ClientConfig;

/// [`ExamBackend`] over the LMS REST API, authenticated through an
/// [`AuthSession`].
pub struct HttpBackend {
    base_url: String,
    timeout_secs: u64,
    session: Arc<AuthSession>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    user: User,
    access_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// The token endpoint answers with `access` or `access_token` depending on
/// which JWT view serves it.
#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct LessonDetailResponse {
    lesson: Lesson,
    module: ModuleRef,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    answers: &'a AnswerMap,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(flatten)]
    receipt: SubmitReceipt,
}

fn default_success() -> bool {
    true
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<ExamHistoryEntry>,
}

#[derive(Deserialize)]
struct ModulesOverviewResponse {
    #[serde(default)]
    modules: Vec<Module>,
}

#[derive(Deserialize)]
struct ModuleDetailResponse {
    module: Module,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout_secs: u64, session: Arc<AuthSession>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            session,
            client,
        })
    }

    pub fn from_config(config: &ClientConfig, session: Arc<AuthSession>) -> anyhow::Result<Self> {
        Self::new(&config.api_base_url, config.timeout_secs, session)
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(self.timeout_secs)
        } else {
            BackendError::Network(e.to_string())
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Response, BackendError> {
        let request_id = Uuid::new_v4();
        tracing::debug!(%method, path, %request_id, "sending request");

        let mut req = self
            .client
            .request(method, self.url(path))
            .header("X-Request-Id", request_id.to_string());
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send().await.map_err(|e| self.transport_error(e))
    }

    /// Send with the stored access token, refreshing once on 401.
    async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> anyhow::Result<Response> {
        let token = self.session.access_token()?;
        let response = self
            .send(method.clone(), path, body.as_ref(), token.as_deref())
            .await?;
        if response.status().as_u16() != 401 {
            return Ok(check_status(response, path).await?);
        }

        tracing::debug!(path, "access token rejected, refreshing");
        let Some(new_token) = self.refresh().await? else {
            self.session.logout()?;
            return Err(BackendError::AuthenticationFailed("session expired, please log in again".into()).into());
        };

        let retried = self
            .send(method, path, body.as_ref(), Some(&new_token))
            .await?;
        if retried.status().as_u16() == 401 {
            self.session.logout()?;
            return Err(BackendError::AuthenticationFailed("access token rejected after refresh".into()).into());
        }
        Ok(check_status(retried, path).await?)
    }

    /// Trade the refresh token for a new access token.
    ///
    /// Returns `None` when there is no refresh token or the backend refuses
    /// it; the caller is expected to end the session.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> anyhow::Result<Option<String>> {
        let Some(refresh_token) = self.session.refresh_token()? else {
            return Ok(None);
        };

        let body = serde_json::to_value(RefreshRequest {
            refresh: &refresh_token,
        })?;
        let response = match self.send(Method::POST, "token/refresh/", Some(&body), None).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed");
                return Ok(None);
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = response.status().as_u16(), "refresh token rejected");
            return Ok(None);
        }

        let refreshed: RefreshResponse = decode(response).await?;
        match refreshed.access.or(refreshed.access_token) {
            Some(token) => {
                self.session.set_access_token(&token)?;
                tracing::info!("access token refreshed");
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    /// Log in and initialize the session.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> anyhow::Result<User> {
        let body = serde_json::to_value(LoginRequest { username, password })?;
        let response = self.send(Method::POST, "login/", Some(&body), None).await?;

        let status = response.status().as_u16();
        if status == 400 || status == 401 {
            let message = error_message(response).await;
            return Err(BackendError::AuthenticationFailed(message).into());
        }
        let response = check_status(response, "login/").await?;
        let login: LoginResponse = decode(response).await?;

        self.session
            .login(&login.access_token, &login.refresh_token, &login.user)?;
        Ok(login.user)
    }

    /// End the session locally.
    pub fn logout(&self) -> anyhow::Result<()> {
        Ok(self.session.logout()?)
    }

    #[instrument(skip(self))]
    pub async fn modules_overview(&self) -> anyhow::Result<Vec<Module>> {
        let response = self.execute(Method::GET, "modules/overview", None).await?;
        let overview: ModulesOverviewResponse = decode(response).await?;
        Ok(overview.modules)
    }

    #[instrument(skip(self))]
    pub async fn module_detail(&self, module_id: u64) -> anyhow::Result<Module> {
        let response = self
            .execute(Method::GET, &format!("modules/{module_id}/detail"), None)
            .await?;
        let detail: ModuleDetailResponse = decode(response).await?;
        Ok(detail.module)
    }
}

#[async_trait]
impl ExamBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn load_lesson(&self, module_id: u64, lesson_id: u64) -> anyhow::Result<LessonDetail> {
        let response = self
            .execute(
                Method::GET,
                &format!("modules/{module_id}/lessons/{lesson_id}"),
                None,
            )
            .await?;
        let detail: LessonDetailResponse = decode(response).await?;
        Ok(LessonDetail {
            lesson: detail.lesson,
            module: detail.module,
        })
    }

    #[instrument(skip(self, answers), fields(answered = answers.len()))]
    async fn submit_answers(&self, lesson_id: u64, answers: &AnswerMap) -> anyhow::Result<SubmitReceipt> {
        let body = serde_json::to_value(SubmitRequest { answers })?;
        let response = self
            .execute(Method::POST, &format!("exam/{lesson_id}/submit"), Some(body))
            .await?;
        let submitted: SubmitResponse = decode(response).await?;
        if !submitted.success {
            return Err(BackendError::Rejected {
                status: 200,
                message: submitted.receipt.message,
            }
            .into());
        }
        Ok(submitted.receipt)
    }

    #[instrument(skip(self))]
    async fn exam_history(&self) -> anyhow::Result<Vec<ExamHistoryEntry>> {
        let response = self
            .execute(Method::GET, "student/exam-history", None)
            .await?;
        let history: HistoryResponse = decode(response).await?;
        Ok(history.history)
    }
}

/// Map non-success statuses to [`BackendError`].
async fn check_status(response: Response, path: &str) -> Result<Response, BackendError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    let message = error_message(response).await;
    Err(match status {
        401 => BackendError::AuthenticationFailed(message),
        404 => BackendError::NotFound(format!("{path}: {message}")),
        400..=499 => BackendError::Rejected { status, message },
        _ => BackendError::Api { status, message },
    })
}

/// Best-effort error text: the body's `message` or `detail` field, else the raw body.
async fn error_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            ["message", "detail", "error"]
                .iter()
                .find_map(|k| v.get(k).and_then(Value::as_str).map(String::from))
        })
        .unwrap_or(body)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let body = response
        .bytes()
        .await
        .map_err(|e| BackendError::Network(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| BackendError::Decode(e.to_string()))
}
