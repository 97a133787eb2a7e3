use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AppError;

pub const ATS_INTEGRATION: &str = "zoho_recruit";

/// Result of an authorization-code exchange or a refresh grant.
/// Consumed server-side only; never serialized into a response.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub api_domain: Option<String>,
    pub accounts_server: Option<String>,
    pub scope: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobDraft {
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteJob {
    pub id: String,
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCandidate {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// The system-of-record boundary. One live implementation talks to the real
/// ATS; tests inject their own. Injected per `AppState`, never a process-wide
/// singleton, so worker restarts and per-request contexts stay cheap.
#[async_trait]
pub trait AtsApi: Send + Sync {
    fn integration_id(&self) -> &'static str;

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, AppError>;

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, AppError>;

    async fn create_job(&self, access_token: &str, draft: &JobDraft) -> Result<String, AppError>;

    async fn list_jobs(&self, access_token: &str) -> Result<Vec<RemoteJob>, AppError>;

    async fn create_candidate(
        &self,
        access_token: &str,
        draft: &CandidateDraft,
    ) -> Result<String, AppError>;

    async fn list_candidates(&self, access_token: &str) -> Result<Vec<RemoteCandidate>, AppError>;
}

// ─── Live client ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RecruitClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    accounts_base: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct OauthTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    api_domain: Option<String>,
    scope: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordListResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RecordWriteResponse {
    #[serde(default)]
    data: Vec<RecordWriteResult>,
}

#[derive(Debug, Deserialize)]
struct RecordWriteResult {
    code: String,
    #[serde(default)]
    details: serde_json::Value,
}

impl RecruitClient {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            http,
            client_id: config
                .ats_client_id
                .clone()
                .unwrap_or_else(|| crate::config::FALLBACK_ATS_CLIENT_ID.to_string()),
            client_secret: config.ats_client_secret.clone(),
            accounts_base: config.ats_accounts_base.trim_end_matches('/').to_string(),
            api_base: config.ats_api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant, AppError> {
        let url = format!("{}/oauth/v2/token", self.accounts_base);
        let resp = self.http.post(&url).form(params).send().await?;
        let status = resp.status();
        let body: OauthTokenResponse = resp
            .json()
            .await
            .map_err(|e| AppError::ExchangeFailed(format!("unparseable token response: {e}")))?;

        if let Some(err) = body.error {
            return Err(AppError::ExchangeFailed(err));
        }
        if !status.is_success() {
            return Err(AppError::ExchangeFailed(format!(
                "token endpoint returned {}",
                status.as_u16()
            )));
        }

        // All-or-nothing: a grant missing its access token is not a grant.
        let access_token = body
            .access_token
            .ok_or_else(|| AppError::ExchangeFailed("response missing access_token".to_string()))?;

        Ok(TokenGrant {
            access_token,
            refresh_token: body.refresh_token.unwrap_or_default(),
            expires_in: body.expires_in.unwrap_or(3600),
            api_domain: body.api_domain,
            accounts_server: Some(self.accounts_base.clone()),
            scope: body.scope.unwrap_or_default(),
        })
    }

    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, AppError> {
        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(AppError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::UpstreamError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn create_record(
        &self,
        access_token: &str,
        module: &str,
        record: serde_json::Value,
    ) -> Result<String, AppError> {
        let url = format!("{}/{module}", self.api_base);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Zoho-oauthtoken {access_token}"))
            .json(&serde_json::json!({ "data": [record] }))
            .send()
            .await?;

        let resp = self.check_status(resp).await?;
        let body: RecordWriteResponse = resp.json().await?;
        let first = body.data.into_iter().next().ok_or_else(|| {
            AppError::UpstreamError {
                status: 200,
                body: "empty write response".to_string(),
            }
        })?;

        if first.code != "SUCCESS" {
            return Err(AppError::UpstreamError {
                status: 200,
                body: format!("record rejected: {}", first.code),
            });
        }

        first.details["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::UpstreamError {
                status: 200,
                body: "write response missing record id".to_string(),
            })
    }

    async fn list_records(
        &self,
        access_token: &str,
        module: &str,
    ) -> Result<Vec<serde_json::Value>, AppError> {
        let url = format!("{}/{module}", self.api_base);
        let resp = self
            .http
            .get(&url)
            .header("Authorization", format!("Zoho-oauthtoken {access_token}"))
            .send()
            .await?;

        let resp = self.check_status(resp).await?;
        let body: RecordListResponse = resp.json().await?;
        Ok(body.data)
    }
}

#[async_trait]
impl AtsApi for RecruitClient {
    fn integration_id(&self) -> &'static str {
        ATS_INTEGRATION
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, AppError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ])
        .await
    }

    async fn create_job(&self, access_token: &str, draft: &JobDraft) -> Result<String, AppError> {
        self.create_record(
            access_token,
            "JobOpenings",
            serde_json::json!({
                "Posting_Title": draft.title,
                "Job_Opening_Status": draft.status,
            }),
        )
        .await
    }

    async fn list_jobs(&self, access_token: &str) -> Result<Vec<RemoteJob>, AppError> {
        let records = self.list_records(access_token, "JobOpenings").await?;
        Ok(records
            .into_iter()
            .filter_map(|r| {
                Some(RemoteJob {
                    id: r["id"].as_str()?.to_string(),
                    title: r["Posting_Title"].as_str().unwrap_or_default().to_string(),
                    status: r["Job_Opening_Status"]
                        .as_str()
                        .unwrap_or("open")
                        .to_string(),
                })
            })
            .collect())
    }

    async fn create_candidate(
        &self,
        access_token: &str,
        draft: &CandidateDraft,
    ) -> Result<String, AppError> {
        self.create_record(
            access_token,
            "Candidates",
            serde_json::json!({
                "Last_Name": draft.name,
                "Email": draft.email,
                "Phone": draft.phone,
            }),
        )
        .await
    }

    async fn list_candidates(&self, access_token: &str) -> Result<Vec<RemoteCandidate>, AppError> {
        let records = self.list_records(access_token, "Candidates").await?;
        Ok(records
            .into_iter()
            .filter_map(|r| {
                Some(RemoteCandidate {
                    id: r["id"].as_str()?.to_string(),
                    name: r["Last_Name"].as_str().unwrap_or_default().to_string(),
                    email: r["Email"].as_str().map(|s| s.to_string()),
                    phone: r["Phone"].as_str().map(|s| s.to_string()),
                })
            })
            .collect())
    }
}
