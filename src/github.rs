//! GitHub REST client: labels and issue creation.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_ROOT: &str = "https://api.github.com";

/// Repository coordinates as accepted by the `--repo` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseRepoError {
    #[error("expected repository of the form \"<owner>/<name>\", got {0:?}")]
    Malformed(String),
}

impl FromStr for Repo {
    type Err = ParseRepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('/').collect::<Vec<_>>()[..] {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Repo {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(ParseRepoError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

/// The slice of an issue we care about, shared by creation and lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    pub html_url: String,
}

#[derive(Debug, Serialize)]
struct IssueRequest<'a> {
    title: &'a str,
    body: &'a str,
    labels: &'a [String],
}

pub struct GithubClient {
    client: reqwest::Client,
    token: String,
}

impl GithubClient {
    pub fn new(token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("jira2gh/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building github http client")?;
        Ok(Self {
            client,
            token: token.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }

    /// List the labels defined in the repository.
    pub async fn list_labels(&self, repo: &Repo) -> Result<Vec<Label>> {
        let url = format!(
            "{}/repos/{}/{}/labels?per_page=100",
            API_ROOT, repo.owner, repo.name
        );
        let resp = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .with_context(|| format!("listing labels of {}", repo))?;

        if !resp.status().is_success() {
            anyhow::bail!(
                "could not get {} repo labels, status {}",
                repo,
                resp.status()
            );
        }
        resp.json().await.context("decoding label list")
    }

    /// Create an issue and return its number and URL.
    pub async fn create_issue(
        &self,
        repo: &Repo,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<IssueRef> {
        let url = format!("{}/repos/{}/{}/issues", API_ROOT, repo.owner, repo.name);
        let request = IssueRequest {
            title,
            body,
            labels,
        };
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("creating issue in {}", repo))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("issue creation failed with status {}: {}", status, text);
        }
        resp.json().await.context("decoding created issue")
    }

    /// Look up an existing issue.
    pub async fn get_issue(&self, repo: &Repo, number: u64) -> Result<IssueRef> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}",
            API_ROOT, repo.owner, repo.name, number
        );
        let resp = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .with_context(|| format!("fetching issue {}#{}", repo, number))?;

        if !resp.status().is_success() {
            anyhow::bail!(
                "issue {}#{} not reachable, status {}",
                repo,
                number,
                resp.status()
            );
        }
        resp.json().await.context("decoding issue")
    }

    /// Add labels to an existing issue.
    pub async fn add_labels(&self, repo: &Repo, number: u64, labels: &[String]) -> Result<()> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/labels",
            API_ROOT, repo.owner, repo.name, number
        );
        let body = serde_json::json!({ "labels": labels });
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("labeling issue {}#{}", repo, number))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "labeling issue {}#{} failed with status {}: {}",
                repo,
                number,
                status,
                text
            );
        }
        Ok(())
    }
}

/// Keep only the requested labels that actually exist in the repository.
pub fn intersect_labels(requested: &[String], existing: &[Label]) -> Vec<String> {
    requested
        .iter()
        .filter(|wanted| existing.iter().any(|label| label.name.as_str() == wanted.as_str()))
        .cloned()
        .collect()
}
