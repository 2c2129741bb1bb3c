//! HTTP client for the remote plan service.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{credentials, Plan};
use crate::error::PlanError;
use crate::storage::PlanServiceConfig;

const USER_HEADER: &str = "X-User-Id";

/// Entry of `GET /plans`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub daily_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct PlanList {
    #[serde(default)]
    plans: Vec<PlanSummary>,
}

#[derive(Deserialize)]
struct AnonymousUser {
    user_id: String,
}

/// Client for the plan service REST API.
pub struct HttpPlanClient {
    http: Client,
    base: String,
    user_id: Option<String>,
}

impl HttpPlanClient {
    /// Create a client for `api_base`, bounding every request by `timeout`.
    pub fn new(
        api_base: &str,
        timeout: Duration,
        user_id: Option<String>,
    ) -> Result<Self, PlanError> {
        url::Url::parse(api_base)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base: api_base.trim_end_matches('/').to_string(),
            user_id,
        })
    }

    /// Build from configuration, reading the user id from the keyring.
    pub fn from_config(config: &PlanServiceConfig) -> Result<Self, PlanError> {
        let user_id = credentials::user_id()?;
        Self::new(&config.api_base, config.request_timeout(), user_id)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn plan_path(plan_id: &str) -> String {
        format!("/plans/{}", urlencoding::encode(plan_id))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, PlanError> {
        let user = self.user_id.as_deref().ok_or(PlanError::MissingUser)?;
        Ok(self
            .http
            .request(method, self.url(path))
            .header(USER_HEADER, user))
    }

    async fn ensure_success(method: &str, resp: Response) -> Result<Response, PlanError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let url = resp.url().to_string();
        let body = resp.text().await.unwrap_or_default();
        Err(PlanError::Status {
            method: method.to_string(),
            url,
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }

    /// `GET /plans/{id}`. A 404 means the plan is gone and yields `Ok(None)`.
    pub async fn fetch_plan(&self, plan_id: &str) -> Result<Option<Plan>, PlanError> {
        let resp = self
            .authed(Method::GET, &Self::plan_path(plan_id))?
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = Self::ensure_success("GET", resp).await?;
        let text = resp.text().await?;
        let plan: Plan =
            serde_json::from_str(&text).map_err(|e| PlanError::Malformed(e.to_string()))?;
        Ok(Some(plan))
    }

    /// `GET /plans`.
    pub async fn list_plans(&self) -> Result<Vec<PlanSummary>, PlanError> {
        let resp = self.authed(Method::GET, "/plans")?.send().await?;
        let resp = Self::ensure_success("GET", resp).await?;
        let text = resp.text().await?;
        let list: PlanList =
            serde_json::from_str(&text).map_err(|e| PlanError::Malformed(e.to_string()))?;
        Ok(list.plans)
    }

    /// `PATCH /plans/{id}/days/{day}` with `{"is_done": ..}`.
    pub async fn patch_day_done(
        &self,
        plan_id: &str,
        day_number: u32,
        is_done: bool,
    ) -> Result<(), PlanError> {
        let path = format!("{}/days/{day_number}", Self::plan_path(plan_id));
        let resp = self
            .authed(Method::PATCH, &path)?
            .json(&json!({ "is_done": is_done }))
            .send()
            .await?;
        Self::ensure_success("PATCH", resp).await?;
        Ok(())
    }

    /// `DELETE /plans/{id}`.
    pub async fn delete_plan(&self, plan_id: &str) -> Result<(), PlanError> {
        let resp = self
            .authed(Method::DELETE, &Self::plan_path(plan_id))?
            .send()
            .await?;
        Self::ensure_success("DELETE", resp).await?;
        Ok(())
    }

    /// `POST /auth/anonymous`. Returns the new user id and adopts it.
    pub async fn register_anonymous(&mut self) -> Result<String, PlanError> {
        let resp = self
            .http
            .post(self.url("/auth/anonymous"))
            .send()
            .await?;
        let resp = Self::ensure_success("POST", resp).await?;
        let text = resp.text().await?;
        let user: AnonymousUser =
            serde_json::from_str(&text).map_err(|e| PlanError::Malformed(e.to_string()))?;
        self.user_id = Some(user.user_id.clone());
        Ok(user.user_id)
    }
}
