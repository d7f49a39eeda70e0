use serde::Deserialize;
use std::{env, fs, path::Path};

use chorepoints_shared::domain::{Child, Role};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub children: Vec<Child>,
    pub users: Vec<UserConfig>,
    /// Family-local timezone for routine bonus windows and instance dates.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub dev_cors_origin: Option<String>,
    pub listen_port: Option<u16>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub id: String,
    pub role: Role, // legacy "parent" deserializes as main_parent
    pub child_id: Option<String>, // required when role == child
    /// For linked members of a shared family: the primary parent whose data
    /// scope they belong to. Defaults to the user's own id.
    pub family_root: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    BadTimezone(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Yaml(e) => write!(f, "YAML error: {}", e),
            ConfigError::BadTimezone(tz) => write!(f, "unknown timezone: {}", tz),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        ConfigError::Yaml(value)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        Self::load_from_path(path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        let cfg: AppConfig = serde_yaml::from_str(&text)?;
        cfg.tz()
            .map_err(|_| ConfigError::BadTimezone(cfg.timezone.clone()))?;
        Ok(cfg)
    }

    pub fn tz(&self) -> Result<chrono_tz::Tz, chrono_tz::ParseError> {
        self.timezone.parse()
    }

    pub fn user(&self, user_id: &str) -> Option<&UserConfig> {
        self.users.iter().find(|u| u.id == user_id)
    }

    /// Family-root resolver: the primary parent id whose shared data scope a
    /// member belongs to.
    pub fn family_root_of(&self, user: &UserConfig) -> String {
        user.family_root.clone().unwrap_or_else(|| user.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_parent_role_normalizes_in_yaml() {
        let cfg: AppConfig = serde_yaml::from_str(
            r#"
children:
  - id: mia
    display_name: Mia
users:
  - id: dad
    role: parent
  - id: mia
    role: child
    child_id: mia
    family_root: dad
"#,
        )
        .unwrap();
        assert_eq!(cfg.users[0].role, Role::MainParent);
        let mia = cfg.user("mia").unwrap();
        assert_eq!(cfg.family_root_of(mia), "dad");
        assert_eq!(cfg.family_root_of(cfg.user("dad").unwrap()), "dad");
    }
}
