use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait ProfanityFilter: Send + Sync {
    async fn is_profane(&self, text: &str) -> bool;
}

#[derive(Serialize)]
struct ProfanityRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfanityResponse {
    is_profanity: bool,
}

/// Remote classifier. Any failure lets the text through.
pub struct ProfanityApi {
    client: Client,
    url: String,
}

impl ProfanityApi {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            tracing::warn!("Failed to build profanity HTTP client, using defaults: {:?}", e);
            Client::new()
        });

        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ProfanityFilter for ProfanityApi {
    async fn is_profane(&self, text: &str) -> bool {
        let response = match self
            .client
            .post(&self.url)
            .json(&ProfanityRequest { message: text })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Profanity check unavailable, allowing name: {:?}", e);
                return false;
            }
        };

        match response.json::<ProfanityResponse>().await {
            Ok(body) => body.is_profanity,
            Err(e) => {
                tracing::warn!("Unreadable profanity check response, allowing name: {:?}", e);
                false
            }
        }
    }
}
