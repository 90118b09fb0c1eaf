//! Discord webhook announcements when the translation count hits a milestone.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

pub const MILESTONES: [u64; 10] = [10, 25, 50, 100, 250, 500, 750, 1000, 2500, 5000];

#[derive(Debug, Clone)]
pub struct MilestoneNotifier {
    client: Client,
    webhook_url: String,
}

impl MilestoneNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }

    pub fn is_milestone(count: u64) -> bool {
        MILESTONES.contains(&count)
    }

    /// Post the announcement if `count` is a milestone. Returns whether a post succeeded.
    pub async fn notify(&self, count: u64) -> bool {
        if !Self::is_milestone(count) {
            return false;
        }

        match self
            .client
            .post(&self.webhook_url)
            .json(&milestone_embed(count))
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::NO_CONTENT => {
                info!("Milestone webhook sent: {}", count);
                true
            }
            Ok(response) => {
                warn!("Webhook response: {}", response.status());
                false
            }
            Err(e) => {
                warn!("Webhook failed: {}", e);
                false
            }
        }
    }

    /// Fire and forget; never blocks the caller.
    pub fn spawn_notify(&self, count: u64) {
        if !Self::is_milestone(count) {
            return;
        }
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.notify(count).await;
        });
    }
}

fn milestone_embed(count: u64) -> Value {
    let now = chrono::Utc::now();
    json!({
        "embeds": [{
            "title": "🚀 JSON Translator - Milestone Reached!",
            "description": format!("**{} translations completed!** 🎉", count),
            "color": 4287245,
            "fields": [
                {
                    "name": "📊 Total Translations",
                    "value": format!("**{}**", count),
                    "inline": true
                },
                {
                    "name": "⏰ Time",
                    "value": now.format("%d.%m.%Y %H:%M UTC").to_string(),
                    "inline": true
                }
            ],
            "timestamp": now.to_rfc3339()
        }]
    })
}
