//! Jira REST client: ticket search and GitHub back-linking.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Connection settings for one Jira instance.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Base URL, e.g. `https://example.atlassian.net`
    pub base_url: String,
    pub username: String,
    pub token: String,
    /// Project key the tickets are addressed under, e.g. `TM`
    pub project: String,
    /// Custom field that stores the linked GitHub issue URL
    pub github_link_field: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    jql: &'a str,
    #[serde(rename = "maxResults")]
    max_results: usize,
    fields: &'a [&'a str],
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Issue>,
}

/// One ticket as returned by the search API, narrowed to the fields we read.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub key: String,
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    /// Absent on tickets without a description; the converter turns that
    /// into the empty string.
    #[serde(default)]
    pub description: Option<String>,
}

pub struct JiraClient {
    config: JiraConfig,
    client: reqwest::Client,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the given ticket numbers of the configured project.
    pub async fn search_by_numbers(&self, numbers: &[String]) -> Result<Vec<Issue>> {
        let jql = numbers_jql(&self.config.project, numbers);
        self.search(&jql, numbers.len()).await
    }

    /// Fetch open tickets carrying the given fix version that have no GitHub
    /// issue linked yet.
    pub async fn search_help_wanted(&self, fix_version: &str) -> Result<Vec<Issue>> {
        let jql = help_wanted_jql(&self.config.project, fix_version);
        self.search(&jql, 100).await
    }

    async fn search(&self, jql: &str, max_results: usize) -> Result<Vec<Issue>> {
        let url = format!("{}/rest/api/2/search", self.config.base_url);
        let body = SearchRequest {
            jql,
            max_results,
            fields: &["summary", "description"],
        };
        log::debug!("searching jira: {}", jql);

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.token))
            .json(&body)
            .send()
            .await
            .context("sending jira search request")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("jira search failed with status {}: {}", status, text);
        }

        let found: SearchResponse = resp
            .json()
            .await
            .context("decoding jira search response")?;
        Ok(found.issues)
    }

    /// Record the created GitHub issue URL on the ticket's link field.
    pub async fn link_to_github(&self, key: &str, issue_url: &str) -> Result<()> {
        let url = format!(
            "{}/rest/api/3/issue/{}",
            self.config.base_url,
            urlencoding::encode(key)
        );
        let mut fields = serde_json::Map::new();
        fields.insert(
            self.config.github_link_field.clone(),
            serde_json::Value::String(issue_url.to_string()),
        );
        let body = serde_json::json!({ "fields": fields });

        let resp = self
            .client
            .put(&url)
            .basic_auth(&self.config.username, Some(&self.config.token))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("sending update request for ticket {}", key))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "unable to update ticket {}, status {}: {}",
                key,
                status,
                text
            );
        }
        Ok(())
    }
}

fn numbers_jql(project: &str, numbers: &[String]) -> String {
    let keys: Vec<String> = numbers
        .iter()
        .map(|number| format!("key = {}-{}", project, number))
        .collect();
    format!("project = {} AND {}", project, keys.join(" OR "))
}

fn help_wanted_jql(project: &str, fix_version: &str) -> String {
    format!(
        "project = {} AND status in (Open, Reopened) AND fixversion = \"{}\" AND \"GITHUB ISSUE\" IS EMPTY AND type != EPIC",
        project, fix_version
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_jql() {
        let numbers = vec!["19977".to_string(), "12345".to_string()];
        assert_eq!(
            numbers_jql("TM", &numbers),
            "project = TM AND key = TM-19977 OR key = TM-12345"
        );
    }

    #[test]
    fn test_help_wanted_jql() {
        assert_eq!(
            help_wanted_jql("TM", "Help Wanted"),
            "project = TM AND status in (Open, Reopened) AND fixversion = \"Help Wanted\" AND \"GITHUB ISSUE\" IS EMPTY AND type != EPIC"
        );
    }

    #[test]
    fn test_issue_without_description_deserializes() {
        let raw = r#"{"issues": [{"key": "TM-1", "fields": {"summary": "a bug"}}]}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.issues.len(), 1);
        assert_eq!(parsed.issues[0].fields.summary, "a bug");
        assert_eq!(parsed.issues[0].fields.description, None);
    }

    #[test]
    fn test_empty_search_response_deserializes() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.issues.is_empty());
    }
}
