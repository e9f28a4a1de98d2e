//! AI squad namer over an OpenAI-compatible chat completions API.
//!
//! Sends one prompt listing every squad's display names and expects one name
//! per line back, in squad order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use squad_application::{NamingError, SquadNamer};
use tracing::debug;

/// Longest squad name kept; longer lines are cut
const MAX_NAME_CHARS: usize = 32;

const SYSTEM_PROMPT: &str = "You name teams for a gaming community. \
Reply with exactly one short, fun team name per line, in the order given, \
and nothing else.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct HttpSquadNamer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpSquadNamer {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait]
impl SquadNamer for HttpSquadNamer {
    async fn name_groups(&self, squads: &[Vec<String>]) -> Result<Vec<String>, NamingError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(squads),
                },
            ],
            temperature: 0.9,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| NamingError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NamingError::RequestFailed(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| NamingError::InvalidResponse(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| NamingError::InvalidResponse("no choices".to_string()))?;

        let names = parse_names(&content);
        debug!("Namer returned {} names for {} squads", names.len(), squads.len());
        if names.len() != squads.len() {
            return Err(NamingError::InvalidResponse(format!(
                "expected {} names, got {}",
                squads.len(),
                names.len()
            )));
        }
        Ok(names)
    }
}

fn build_prompt(squads: &[Vec<String>]) -> String {
    let mut prompt = format!("Give {} team names, one per line.\n", squads.len());
    for (i, members) in squads.iter().enumerate() {
        prompt.push_str(&format!("Team {}: {}\n", i + 1, members.join(", ")));
    }
    prompt
}

/// One name per non-blank line, with list markers and quotes stripped
fn parse_names(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = line
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches(['.', ')', '-', '*', ':'])
                .trim();
            let line = line.trim_matches(['"', '\'', '*']).trim();
            line.chars().take(MAX_NAME_CHARS).collect::<String>()
        })
        .filter(|line| !line.is_empty())
        .collect()
}
