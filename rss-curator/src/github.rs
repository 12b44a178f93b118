//! GitHub contents API as a [`DocumentStore`].

use crate::config::GithubAuth;
use crate::traits::DocumentStore;
use crate::types::{CommitAuthor, CuratorError, RemoteDocument, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Deserialize)]
struct Installation {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct InstallationToken {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    commit: Option<CommitRef>,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: Option<String>,
}

pub struct GithubDocumentStore {
    client: Client,
    api_url: String,
    repo: String,
    token: String,
}

impl GithubDocumentStore {
    /// Authenticates and returns a store bound to `repo` (`owner/name`).
    pub async fn connect(api_url: &str, repo: &str, auth: &GithubAuth, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("RSS-Curator/1.0")
            .timeout(timeout)
            .build()?;
        let api_url = api_url.trim_end_matches('/').to_string();

        let token = match auth {
            GithubAuth::Token(token) => token.clone(),
            GithubAuth::App { app_id, private_key_path } => {
                let jwt = app_jwt(app_id, private_key_path)?;
                installation_token(&client, &api_url, &jwt).await?
            }
        };

        Ok(Self {
            client,
            api_url,
            repo: repo.to_string(),
            token,
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_url,
            self.repo,
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        github_headers(request).bearer_auth(&self.token)
    }
}

fn github_headers(request: RequestBuilder) -> RequestBuilder {
    request
        .header("Accept", "application/vnd.github+json")
        .header("X-GitHub-Api-Version", API_VERSION)
}

/// Signs a ten-minute app JWT. The key is read from disk and dropped here.
fn app_jwt(app_id: &str, private_key_path: &Path) -> Result<String> {
    let pem = std::fs::read(private_key_path).map_err(|e| {
        CuratorError::Auth(format!(
            "cannot read GitHub App key {}: {}",
            private_key_path.display(),
            e
        ))
    })?;
    let key = EncodingKey::from_rsa_pem(&pem)
        .map_err(|e| CuratorError::Auth(format!("invalid GitHub App key: {}", e)))?;
    drop(pem);

    let now = Utc::now().timestamp();
    let claims = AppClaims {
        // Backdated to absorb clock drift.
        iat: now - 60,
        exp: now + 600,
        iss: app_id.to_string(),
    };
    encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| CuratorError::Auth(format!("cannot sign app token: {}", e)))
}

async fn installation_token(client: &Client, api_url: &str, jwt: &str) -> Result<String> {
    let response = github_headers(client.get(format!("{}/app/installations", api_url)))
        .bearer_auth(jwt)
        .send()
        .await?;
    let installations: Vec<Installation> = read_json(response).await?;
    let installation = installations
        .first()
        .ok_or_else(|| CuratorError::Auth("GitHub App has no installations".to_string()))?;
    debug!("Using installation {}", installation.id);

    let response = github_headers(client.post(format!(
        "{}/app/installations/{}/access_tokens",
        api_url, installation.id
    )))
    .bearer_auth(jwt)
    .send()
    .await?;
    let token: InstallationToken = read_json(response).await?;
    info!("Obtained installation token");
    Ok(token.token)
}

async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(CuratorError::RemoteStore {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl DocumentStore for GithubDocumentStore {
    async fn fetch(&self, path: &str) -> Result<RemoteDocument> {
        let response = self
            .authorized(self.client.get(self.contents_url(path)))
            .send()
            .await?;
        let contents: ContentsResponse = read_json(response).await?;

        // The API wraps base64 at 60 columns.
        let packed: String = contents.content.split_whitespace().collect();
        let bytes = STANDARD
            .decode(packed)
            .map_err(|e| CuratorError::General(format!("bad base64 in {}: {}", contents.path, e)))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| CuratorError::General(format!("{} is not UTF-8: {}", contents.path, e)))?;

        debug!("Fetched {} ({} bytes) at {}", contents.path, content.len(), contents.sha);
        Ok(RemoteDocument {
            path: contents.path,
            content,
            sha: contents.sha,
        })
    }

    async fn update(
        &self,
        document: &RemoteDocument,
        new_content: &str,
        message: &str,
        author: &CommitAuthor,
    ) -> Result<Option<String>> {
        let body = json!({
            "message": message,
            "content": STANDARD.encode(new_content.as_bytes()),
            "sha": document.sha,
            "author": author,
            "committer": author,
        });

        let response = self
            .authorized(self.client.put(self.contents_url(&document.path)))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(CuratorError::PublishConflict {
                path: document.path.clone(),
                sha: document.sha.clone(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CuratorError::RemoteStore {
                status: status.as_u16(),
                message,
            });
        }

        // The write landed; a body we cannot read only loses the commit id.
        let commit = response
            .json::<UpdateResponse>()
            .await
            .ok()
            .and_then(|r| r.commit)
            .and_then(|c| c.sha);
        Ok(commit)
    }
}
