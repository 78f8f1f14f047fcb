//! Outgoing webhook notification for run logs.

use anyhow::{Context, Result};

/// Post a plain-text message to an incoming webhook. No retries; the caller
/// decides whether a delivery failure matters.
pub async fn post_text(url: &str, text: &str) -> Result<()> {
    let body = serde_json::json!({ "text": text });
    let resp = reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .context("sending webhook message")?;

    if !resp.status().is_success() {
        anyhow::bail!("webhook delivery failed with status {}", resp.status());
    }
    Ok(())
}
