//! Ticket-to-issue migration loop.

use std::time::Duration;

use anyhow::Result;

use crate::converter::MarkupConverter;
use crate::github::{intersect_labels, GithubClient, Repo};
use crate::jira::{Issue, JiraClient};

/// Footer appended to every created issue body. `{{TICKET}}` is replaced with
/// the ticket key.
const CONTRIBUTING_FOOTER: &str = "----\n\n\
If you are interested in working on this issue, please comment here so it can be \
assigned to you, and mention the ticket {{TICKET}} in your pull request. New \
contributors are welcome: see the CONTRIBUTING guide of this repository for how \
to get set up.";

/// Outcome of one migration run.
#[derive(Debug, Default)]
pub struct MigrateStats {
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    /// Ticket key paired with the created issue URL.
    pub links: Vec<(String, String)>,
}

impl MigrateStats {
    /// Human-readable run log, suitable for webhook delivery. Empty when
    /// nothing happened.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (key, url) in &self.links {
            out.push_str(&format!(
                "Created github issue for ticket {} here: {}\n",
                key, url
            ));
        }
        for error in &self.errors {
            out.push_str(error);
            out.push('\n');
        }
        out
    }
}

pub struct Migrator {
    jira: JiraClient,
    github: GithubClient,
    converter: MarkupConverter,
    repo: Repo,
    labels: Vec<String>,
    dry_run: bool,
}

impl Migrator {
    pub fn new(
        jira: JiraClient,
        github: GithubClient,
        repo: Repo,
        labels: Vec<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            jira,
            github,
            converter: MarkupConverter::new(),
            repo,
            labels,
            dry_run,
        }
    }

    /// Create one GitHub issue per ticket and link it back to Jira. A failing
    /// ticket is recorded and the loop moves on to the next one.
    pub async fn run(&self, issues: &[Issue]) -> Result<MigrateStats> {
        let mut stats = MigrateStats::default();
        let labels = self.resolve_labels().await?;

        if self.dry_run {
            println!("Dry run, no issues will be created. Ticket information:");
        }

        for issue in issues {
            let title = &issue.fields.summary;
            let body = self.issue_body(issue);

            if self.dry_run {
                println!("------\n{}\n{}\n\n{}", title, "=".repeat(title.len()), body);
                stats.skipped += 1;
                continue;
            }

            // One second between creations, per GitHub's abuse rate limit
            // guidance for integrators.
            tokio::time::sleep(Duration::from_secs(1)).await;

            let created = match self
                .github
                .create_issue(&self.repo, title, &body, &labels)
                .await
            {
                Ok(created) => created,
                Err(e) => {
                    let msg = format!("Unable to create issue for ticket {}: {:#}", issue.key, e);
                    log::warn!("{}", msg);
                    stats.errors.push(msg);
                    continue;
                }
            };

            if let Err(e) = self.jira.link_to_github(&issue.key, &created.html_url).await {
                let msg = format!("Unable to update ticket {}: {:#}", issue.key, e);
                log::warn!("{}", msg);
                stats.errors.push(msg);
                continue;
            }

            log::info!(
                "Created github issue for ticket {}: {}",
                issue.key,
                created.html_url
            );
            stats.links.push((issue.key.clone(), created.html_url));
            stats.created += 1;
        }

        Ok(stats)
    }

    fn issue_body(&self, issue: &Issue) -> String {
        let markdown = self.converter.convert(issue.fields.description.as_deref());
        format!("{}\n\n{}", markdown, contributing_footer(&issue.key))
    }

    async fn resolve_labels(&self) -> Result<Vec<String>> {
        let existing = self.github.list_labels(&self.repo).await?;
        let resolved = intersect_labels(&self.labels, &existing);
        for requested in &self.labels {
            if !resolved.contains(requested) {
                log::warn!(
                    "label {:?} does not exist in {} and will not be set",
                    requested,
                    self.repo
                );
            }
        }
        Ok(resolved)
    }
}

fn contributing_footer(key: &str) -> String {
    CONTRIBUTING_FOOTER.replacen("{{TICKET}}", key, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jira::{IssueFields, JiraConfig};

    fn test_migrator(dry_run: bool) -> Migrator {
        let jira = JiraClient::new(JiraConfig {
            base_url: "https://example.atlassian.net".to_string(),
            username: "user".to_string(),
            token: "secret".to_string(),
            project: "TM".to_string(),
            github_link_field: "customfield_10039".to_string(),
        });
        let github = GithubClient::new("token").unwrap();
        let repo: Repo = "example/server".parse().unwrap();
        Migrator::new(jira, github, repo, vec!["Help Wanted".to_string()], dry_run)
    }

    #[test]
    fn test_contributing_footer_substitutes_key() {
        let footer = contributing_footer("TM-42");
        assert!(footer.contains("ticket TM-42"));
        assert!(!footer.contains("{{TICKET}}"));
    }

    #[test]
    fn test_issue_body_converts_markup_and_appends_footer() {
        let migrator = test_migrator(false);
        let issue = Issue {
            key: "TM-7".to_string(),
            fields: IssueFields {
                summary: "A bug".to_string(),
                description: Some("h1. Steps\n* do the *thing*".to_string()),
            },
        };
        let body = migrator.issue_body(&issue);
        assert!(body.starts_with("## Steps\n  * do the **thing**\n\n"));
        assert!(body.contains("ticket TM-7"));
    }

    #[test]
    fn test_issue_body_without_description() {
        let migrator = test_migrator(true);
        let issue = Issue {
            key: "TM-8".to_string(),
            fields: IssueFields {
                summary: "No description".to_string(),
                description: None,
            },
        };
        let body = migrator.issue_body(&issue);
        assert!(body.starts_with("\n\n----"));
    }

    #[test]
    fn test_summary_lists_links_then_errors() {
        let mut stats = MigrateStats::default();
        stats
            .links
            .push(("TM-1".to_string(), "https://github.com/e/s/issues/1".to_string()));
        stats.errors.push("Unable to update ticket TM-2".to_string());

        let summary = stats.summary();
        assert_eq!(
            summary,
            "Created github issue for ticket TM-1 here: https://github.com/e/s/issues/1\n\
             Unable to update ticket TM-2\n"
        );
    }

    #[test]
    fn test_summary_empty_run() {
        assert_eq!(MigrateStats::default().summary(), "");
    }
}
