use crate::CapsuleCareError;
use secrecy::SecretString;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_HISTORY_MAX_PAGES: u32 = 20;

#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub token: Option<SecretString>,
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub history_max_pages: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            token: None,
            credentials: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            history_max_pages: DEFAULT_HISTORY_MAX_PAGES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, CapsuleCareError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function, so tests never touch the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, CapsuleCareError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let base_url = get("CAPSULECARE_BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let token = get("CAPSULECARE_TOKEN")
            .filter(|s| !s.trim().is_empty())
            .map(|t| SecretString::new(t.into()));

        let credentials = match (get("CAPSULECARE_USERNAME"), get("CAPSULECARE_PASSWORD")) {
            (Some(username), Some(password)) => Some(Credentials {
                username,
                password: SecretString::new(password.into()),
            }),
            (None, None) => None,
            _ => {
                return Err(CapsuleCareError::Config(
                    "CAPSULECARE_USERNAME and CAPSULECARE_PASSWORD must be set together".into(),
                ));
            }
        };

        let timeout_secs = parse_number(&mut get, "CAPSULECARE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let max_retries = parse_number(&mut get, "CAPSULECARE_MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        let history_max_pages = parse_number(
            &mut get,
            "CAPSULECARE_HISTORY_MAX_PAGES",
            DEFAULT_HISTORY_MAX_PAGES,
        )?;

        Ok(Self {
            base_url,
            token,
            credentials,
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            history_max_pages,
        })
    }
}

fn parse_number<F, T>(get: &mut F, key: &str, default: T) -> Result<T, CapsuleCareError>
where
    F: FnMut(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CapsuleCareError::Config(format!("{key} must be a number, got {raw:?}"))),
    }
}
