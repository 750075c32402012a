//! Configuration for the Omnis chat client.
//!
//! Read once at startup from `~/.omnis/config.toml`, with environment
//! variables taking precedence for the agent endpoint and user id. Every
//! field is optional; with no config at all the client runs offline against
//! the scripted backend.
//!
//! ```toml
//! [agent]
//! base_url = "https://agent.example.com/api/agent"
//! user_id = "analyst-7"
//! execute = true
//! ```

use std::env;
use std::path::PathBuf;

use serde::Deserialize;

pub const AGENT_URL_ENV: &str = "OMNIS_AGENT_URL";
pub const USER_ID_ENV: &str = "OMNIS_USER_ID";

const DEFAULT_USER_ID: &str = "omnis-demo";

#[derive(Debug, Default, Deserialize)]
pub struct OmnisConfig {
    pub agent: Option<AgentConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AgentConfig {
    pub base_url: Option<String>,
    pub user_id: Option<String>,
    pub execute: Option<bool>,
}

impl OmnisConfig {
    /// Load from the default path. Missing or unparseable files fall back to
    /// defaults; a parse failure is logged, not fatal.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    #[must_use]
    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Agent endpoint, env override first. `None` means run the scripted
    /// backend.
    #[must_use]
    pub fn agent_base_url(&self) -> Option<String> {
        if let Ok(url) = env::var(AGENT_URL_ENV)
            && !url.trim().is_empty()
        {
            return Some(url);
        }
        self.agent.as_ref()?.base_url.clone()
    }

    #[must_use]
    pub fn user_id(&self) -> String {
        if let Ok(id) = env::var(USER_ID_ENV)
            && !id.trim().is_empty()
        {
            return id;
        }
        self.agent
            .as_ref()
            .and_then(|agent| agent.user_id.clone())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string())
    }

    #[must_use]
    pub fn execute(&self) -> bool {
        self.agent
            .as_ref()
            .and_then(|agent| agent.execute)
            .unwrap_or(true)
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".omnis").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::OmnisConfig;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = OmnisConfig::load_from(&dir.path().join("nope.toml"));
        assert!(config.agent.is_none());
        assert!(config.execute());
    }

    #[test]
    fn parses_agent_section() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(
            file,
            "[agent]\nbase_url = \"http://localhost:8080/api/agent\"\nuser_id = \"analyst\"\nexecute = false"
        )
        .expect("write");

        let config = OmnisConfig::load_from(&path);
        let agent = config.agent.as_ref().expect("agent section");
        assert_eq!(
            agent.base_url.as_deref(),
            Some("http://localhost:8080/api/agent")
        );
        assert_eq!(agent.user_id.as_deref(), Some("analyst"));
        assert!(!config.execute());
    }

    #[test]
    fn unparseable_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not valid toml [[[").expect("write");

        let config = OmnisConfig::load_from(&path);
        assert!(config.agent.is_none());
    }
}
