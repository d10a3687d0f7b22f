//! Environment configuration
//!
//! Every setting is read once at startup. A `.env` file is honoured, variables
//! already present in the process environment take precedence.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"Du bist ein digitaler Homöopath. Deine Aufgabe ist es, Menschen bei der Wahl eines passenden homöopathischen Mittels zu helfen.

Gesprächsstruktur:
1. Begrüße die Person freundlich.
2. Frage gezielt nach Symptomen. Versuche, alle relevanten Symptome zu erfassen (körperlich & emotional).
3. Wenn noch Symptome fehlen könnten, frage weiter: "Gibt es noch weitere Symptome, die du erwähnen möchtest?"
4. Sobald alle Symptome bekannt sind, schlage EIN passendes homöopathisches Mittel vor. Gib dazu die passende Potenz an (z. B. C30 oder C200).
5. Erkläre klar, wie und wann das Mittel eingenommen werden soll.
6. Sprich auf Deutsch, sei empathisch, aber klar und strukturiert. Du darfst keine Diagnosen stellen oder schulmedizinische Aussagen machen.
7. Wenn du keine Empfehlung geben kannst, sag freundlich, dass du dafür mehr Infos brauchst.

- Falls dir Kontextinformationen vorliegen (z. B. aus medizinischen Texten oder einem Homöopathiebuch), nutze diese für deine Empfehlung.

Achte darauf, die Konversation natürlich zu gestalten – du bist professionell, freundlich und zurückhaltend sicher."#;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable `{0}`")]
    MissingVariable(&'static str),

    #[error("environment variable `{name}` has an invalid value: {reason}")]
    InvalidVariable { name: &'static str, reason: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub model: String,
    pub openai_base_url: String,
    pub completion_timeout: Duration,
    pub system_prompt: String,
    pub database_url: Option<String>,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<AppConfig, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let openai_api_key =
            var("OPENAI_API_KEY").ok_or(ConfigError::MissingVariable("OPENAI_API_KEY"))?;

        let timeout_secs = parse_var(var("OPENAI_TIMEOUT_SECS"), "OPENAI_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidVariable {
                name: "OPENAI_TIMEOUT_SECS",
                reason: "must be greater than zero".to_owned(),
            });
        }

        Ok(AppConfig {
            openai_api_key,
            model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            openai_base_url: var("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            completion_timeout: Duration::from_secs(timeout_secs),
            system_prompt: lookup("SYSTEM_PROMPT")
                .filter(|prompt| !prompt.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_owned()),
            database_url: var("DATABASE_URL"),
            port: parse_var(var("PORT"), "PORT")?.unwrap_or(DEFAULT_PORT),
            cors_origins: var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn store_configured(&self) -> bool {
        self.database_url.is_some()
    }
}

fn parse_var<T>(value: Option<String>, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::InvalidVariable {
                name,
                reason: e.to_string(),
            })
        })
        .transpose()
}

// The API key must never end up in logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_api_key", &"<redacted>")
            .field("model", &self.model)
            .field("openai_base_url", &self.openai_base_url)
            .field("completion_timeout", &self.completion_timeout)
            .field("system_prompt_len", &self.system_prompt.len())
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("port", &self.port)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}
