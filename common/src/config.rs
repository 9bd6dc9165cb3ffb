use crate::error::{Nl2SqlError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "ortocenter";
pub const DEFAULT_SHORTCUT_TABLE: &str = "agenda";
pub const DEFAULT_SHORTCUT_DATE_COLUMN: &str = "data_agendamento";
pub const DEFAULT_SYNTHESIS_MODEL: &str = "gpt-4o";
pub const DEFAULT_RENDERING_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// connection settings for the relational store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// bound applied to every catalog and execution round trip
    pub timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// settings for the chat-completions endpoint
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub synthesis_model: String,
    pub rendering_model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("synthesis_model", &self.synthesis_model)
            .field("rendering_model", &self.rendering_model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            synthesis_model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            rendering_model: DEFAULT_RENDERING_MODEL.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(60),
        }
    }
}

/// last day used by the month counting shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthEnd {
    /// every month ends on day 28 (historical behavior, ignores 29-31)
    TwentyEighth,
    /// real last day of the month
    Calendar,
}

impl FromStr for MonthEnd {
    type Err = Nl2SqlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "28" | "twenty-eighth" | "fixed" => Ok(MonthEnd::TwentyEighth),
            "calendar" => Ok(MonthEnd::Calendar),
            other => Err(Nl2SqlError::Config(format!(
                "unknown month end policy '{}' (expected 28 or calendar)",
                other
            ))),
        }
    }
}

/// what to do with a question that does not look like the supported locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalePolicy {
    Reject,
    Flag,
    Off,
}

impl FromStr for LocalePolicy {
    type Err = Nl2SqlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(LocalePolicy::Reject),
            "flag" => Ok(LocalePolicy::Flag),
            "off" | "none" => Ok(LocalePolicy::Off),
            other => Err(Nl2SqlError::Config(format!(
                "unknown locale policy '{}' (expected reject, flag or off)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// database schema every table is qualified under
    pub namespace: String,
    pub shortcut_table: String,
    pub shortcut_date_column: String,
    pub month_end: MonthEnd,
    pub locale_policy: LocalePolicy,
    /// ask the rendering model to phrase single scalar answers
    pub phrase_scalar_with_model: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            shortcut_table: DEFAULT_SHORTCUT_TABLE.to_string(),
            shortcut_date_column: DEFAULT_SHORTCUT_DATE_COLUMN.to_string(),
            month_end: MonthEnd::TwentyEighth,
            locale_policy: LocalePolicy::Reject,
            phrase_scalar_with_model: false,
        }
    }
}

impl PipelineConfig {
    /// names end up inside generated sql and regex patterns, so only plain
    /// identifiers are accepted
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("namespace", &self.namespace),
            ("shortcut_table", &self.shortcut_table),
            ("shortcut_date_column", &self.shortcut_date_column),
        ] {
            if !is_plain_identifier(value) {
                return Err(Nl2SqlError::Config(format!(
                    "{} must be a plain sql identifier, got '{}'",
                    field, value
                )));
            }
        }
        Ok(())
    }
}

fn is_plain_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
