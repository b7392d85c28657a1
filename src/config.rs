use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Which instant opens a new category's voting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStartPolicy {
    /// The window opens the moment the category is created; submitting an
    /// explicit start time is rejected.
    CreationTime,
    /// The window opens at an explicitly scheduled start time, falling back
    /// to the creation instant when none is given.
    Scheduled,
}

/// Application configuration, derived from `Votes.toml` and `VOTES_*`
/// environment variables.
#[derive(Deserialize)]
pub struct Config {
    // secrets
    db_uri: String,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
    #[serde(default = "default_window_start")]
    window_start: WindowStartPolicy,
    #[serde(default)]
    sns_topic_arn: Option<String>,
}

fn default_db_name() -> String {
    "chapel".to_string()
}

fn default_window_start() -> WindowStartPolicy {
    WindowStartPolicy::CreationTime
}

impl Config {
    /// Load the configuration, with environment variables taking
    /// precedence over the file.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("Votes.toml"))
            .merge(Env::prefixed("VOTES_"))
            .extract()
    }

    /// MongoDB connection string.
    /// Configured via `VOTES_DB_URI`.
    pub fn db_uri(&self) -> &str {
        &self.db_uri
    }

    /// Name of the database holding vote and directory data.
    /// Configured via `VOTES_DB_NAME`.
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// How the voting window of a new category starts.
    /// Configured via `VOTES_WINDOW_START`.
    pub fn window_start(&self) -> WindowStartPolicy {
        self.window_start
    }

    /// SNS topic to receive result-published events, if any.
    /// Configured via `VOTES_SNS_TOPIC_ARN`.
    pub fn sns_topic_arn(&self) -> Option<&str> {
        self.sns_topic_arn.as_deref()
    }
}
