//! AI squad naming configuration from TOML (`[naming]` section)
//!
//! Naming is off unless an endpoint is set; squads are then called
//! `Squad-1`, `Squad-2` and so on.
//!
//! ```toml
//! [naming]
//! endpoint = "https://api.openai.com/v1/chat/completions"
//! model = "gpt-4o-mini"
//! timeout_secs = 8
//! api_key_env = "OPENAI_API_KEY"
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNamingConfig {
    /// OpenAI-compatible chat completions URL
    pub endpoint: Option<String>,
    pub model: String,
    /// Names arriving later than this are ignored
    pub timeout_secs: u64,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for FileNamingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 8,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl FileNamingConfig {
    pub fn is_enabled(&self) -> bool {
        self.endpoint.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}
