//! GitHub REST client. Every call is bearer-authenticated and bounded by
//! the client-wide timeout; the installation token is fetched fresh per
//! remediation request — no caching or refresh, which is an accepted
//! simplification at this call volume.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::json;

use super::app_auth::{sign_app_jwt, AppCredentials};
use crate::error::{RemediationError, Result};

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "fixlink";

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct InstallationTokenResponse {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
struct RepoMetadata {
    #[serde(default)]
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitRefObject,
}

#[derive(Debug, Deserialize)]
struct GitRefObject {
    #[serde(default)]
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    html_url: String,
}

impl GitHubClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: "https://api.github.com".to_string(),
        })
    }

    /// Point the client at a different API root. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(&self, method: Method, path: &str, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {bearer}"))
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Exchange the signed app assertion for an installation-scoped
    /// access token.
    pub async fn installation_token(&self, creds: &AppCredentials) -> Result<String> {
        let jwt = sign_app_jwt(creds)?;
        let path = format!("/app/installations/{}/access_tokens", creds.installation_id);
        let response = self
            .request(Method::POST, &path, &jwt)
            .json(&json!({}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemediationError::AuthFailure(format!(
                "token exchange failed: status={status}"
            )));
        }
        let out: InstallationTokenResponse = response.json().await?;
        if out.token.is_empty() {
            return Err(RemediationError::AuthFailure(
                "empty installation token".to_string(),
            ));
        }
        Ok(out.token)
    }

    pub async fn default_branch(&self, owner: &str, repo: &str, token: &str) -> Result<String> {
        let path = format!("/repos/{owner}/{repo}");
        let meta: RepoMetadata = self.get_json(&path, token).await?;
        if meta.default_branch.is_empty() {
            return Err(RemediationError::ProviderApi(
                "default branch missing from repository metadata".to_string(),
            ));
        }
        Ok(meta.default_branch)
    }

    pub async fn branch_sha(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        token: &str,
    ) -> Result<String> {
        let path = format!("/repos/{owner}/{repo}/git/ref/heads/{branch}");
        let git_ref: GitRef = self.get_json(&path, token).await?;
        if git_ref.object.sha.is_empty() {
            return Err(RemediationError::ProviderApi(format!(
                "head sha missing for branch {branch}"
            )));
        }
        Ok(git_ref.object.sha)
    }

    pub async fn create_ref(
        &self,
        owner: &str,
        repo: &str,
        ref_name: &str,
        sha: &str,
        token: &str,
    ) -> Result<()> {
        let path = format!("/repos/{owner}/{repo}/git/refs");
        let response = self
            .request(Method::POST, &path, token)
            .json(&json!({ "ref": ref_name, "sha": sha }))
            .send()
            .await?;
        Self::expect_success(&path, response).await?;
        Ok(())
    }

    /// Create or replace a file on a branch; the body goes up
    /// base64-encoded per the contents API.
    pub async fn create_or_update_content(
        &self,
        owner: &str,
        repo: &str,
        file_path: &str,
        message: &str,
        content: &[u8],
        branch: &str,
        token: &str,
    ) -> Result<()> {
        let path = format!("/repos/{owner}/{repo}/contents/{file_path}");
        let response = self
            .request(Method::PUT, &path, token)
            .json(&json!({
                "message": message,
                "content": BASE64_STANDARD.encode(content),
                "branch": branch,
            }))
            .send()
            .await?;
        Self::expect_success(&path, response).await?;
        Ok(())
    }

    /// Open a pull request and return its HTML URL.
    pub async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
        token: &str,
    ) -> Result<String> {
        let path = format!("/repos/{owner}/{repo}/pulls");
        let response = self
            .request(Method::POST, &path, token)
            .json(&json!({ "title": title, "head": head, "base": base, "body": body }))
            .send()
            .await?;
        let response = Self::expect_success(&path, response).await?;
        let pr: PullRequest = response.json().await?;
        Ok(pr.html_url)
    }

    pub async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &str,
        token: &str,
    ) -> Result<()> {
        let path = format!("/repos/{owner}/{repo}/issues/{number}/comments");
        let response = self
            .request(Method::POST, &path, token)
            .json(&json!({ "body": comment }))
            .send()
            .await?;
        Self::expect_success(&path, response).await?;
        Ok(())
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, token: &str) -> Result<T> {
        let response = self.request(Method::GET, path, token).send().await?;
        let response = Self::expect_success(path, response).await?;
        Ok(response.json().await?)
    }

    async fn expect_success(path: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(RemediationError::ProviderApi(format!(
                "{path} returned status={status}"
            )));
        }
        Ok(response)
    }
}
