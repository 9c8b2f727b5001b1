use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/mlbbot/config.toml";
const CONFIG_PATH_ENV: &str = "MLBBOT_CONFIG";
/// One day.
const MAX_POLL_INTERVAL_MINUTES: u64 = 24 * 60;

/// Bot configuration
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub poll: Poll,
    pub storage: Storage,
    pub mlb: MlbSettings,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct General {
    pub discord_token: String,
    pub channel_id: u64,
    /// Members holding a role with this exact name may change the roster.
    pub admin_role_name: String,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Poll {
    pub interval_minutes: u64,
    pub post_daily_schedule: bool,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Storage {
    pub roster_file: PathBuf,
    pub seen_at_bats_file: PathBuf,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MlbSettings {
    pub base_url: String,
    /// The live game feed is only served from the v1.1 API.
    pub live_base_url: String,
    pub timeout_seconds: u64,
    pub timezone: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            channel_id: 0,
            admin_role_name: "MLB Bot Admin".to_owned(),
        }
    }
}

impl Default for Poll {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
            post_daily_schedule: true,
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            roster_file: PathBuf::from("players.json"),
            seen_at_bats_file: PathBuf::from("last_atbats.json"),
        }
    }
}

impl Default for MlbSettings {
    fn default() -> Self {
        Self {
            base_url: "https://statsapi.mlb.com/api/v1".to_owned(),
            live_base_url: "https://statsapi.mlb.com/api/v1.1".to_owned(),
            timeout_seconds: 10,
            timezone: "America/New_York".to_owned(),
        }
    }
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;

        // Everything has a default, so running from a bare `.env` is fine.
        let mut config = match tokio::fs::File::open(&path).await {
            Ok(mut file) => {
                let mut contents = String::new();
                file.read_to_string(&mut contents).await.map_err(|e| {
                    anyhow!(
                        "Could not read configuration at `{}`: {}",
                        path.to_string_lossy(),
                        e
                    )
                })?;

                Self::from_toml_str(&contents).map_err(|e| {
                    anyhow!(
                        "Could not parse configuration at `{}`: {}",
                        path.to_string_lossy(),
                        e
                    )
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(anyhow!(
                    "Could not open configuration at `{}`: {}",
                    path.to_string_lossy(),
                    e
                ))
            }
        };

        dotenvy::dotenv().ok();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    pub async fn reload(&mut self) -> Result<()> {
        let new = Self::load().await?;
        *self = new;
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(Into::into)
    }

    /// Environment values win over the configuration file.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(token) = lookup("DISCORD_BOT_TOKEN") {
            self.general.discord_token = token.trim().to_owned();
        }

        if let Some(raw) = lookup("DISCORD_CHANNEL_ID") {
            self.general.channel_id = raw
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid DISCORD_CHANNEL_ID `{}`: expected an integer", raw))?;
        }

        if let Some(role) = lookup("MLBBOT_ADMIN_ROLE") {
            self.general.admin_role_name = role;
        }

        if let Some(raw) = lookup("MLBBOT_POLL_INTERVAL_MINUTES") {
            self.poll.interval_minutes = raw.trim().parse().map_err(|_| {
                anyhow!(
                    "Invalid MLBBOT_POLL_INTERVAL_MINUTES `{}`: expected an integer",
                    raw
                )
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.discord_token.is_empty() {
            return Err(anyhow!(
                "DISCORD_BOT_TOKEN not found.  Set it in your .env file or as `general.discord_token` in the configuration"
            ));
        }

        if self.general.channel_id == 0 {
            return Err(anyhow!(
                "DISCORD_CHANNEL_ID not set.  Enable developer mode, right-click the channel and \"Copy ID\""
            ));
        }

        if !(1..=MAX_POLL_INTERVAL_MINUTES).contains(&self.poll.interval_minutes) {
            return Err(anyhow!(
                "poll.interval_minutes must be between 1 and {}",
                MAX_POLL_INTERVAL_MINUTES
            ));
        }

        self.mlb.tz()?;
        Ok(())
    }
}

impl Poll {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }
}

impl MlbSettings {
    pub fn tz(&self) -> Result<Tz> {
        Tz::from_str(&self.timezone).map_err(|_| {
            anyhow!(
                "Invalid mlb.timezone `{}` (expected IANA tz like America/New_York)",
                self.timezone
            )
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.general.admin_role_name, "MLB Bot Admin");
        assert_eq!(cfg.poll.interval_minutes, 5);
        assert!(cfg.poll.post_daily_schedule);
        assert_eq!(cfg.storage.roster_file, PathBuf::from("players.json"));
        assert_eq!(cfg.storage.seen_at_bats_file, PathBuf::from("last_atbats.json"));
        assert_eq!(cfg.mlb.tz().unwrap(), chrono_tz::America::New_York);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [general]
            channel_id = 42

            [poll]
            interval_minutes = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.general.channel_id, 42);
        assert_eq!(cfg.general.admin_role_name, "MLB Bot Admin");
        assert_eq!(cfg.poll.interval(), Duration::from_secs(120));
        assert!(cfg.poll.post_daily_schedule);
    }

    #[test]
    fn environment_overrides_file() {
        let mut cfg = Config::from_toml_str("[general]\ndiscord_token = \"file\"\nchannel_id = 1").unwrap();
        cfg.apply_overrides(env(&[
            ("DISCORD_BOT_TOKEN", " secret "),
            ("DISCORD_CHANNEL_ID", "1234567890"),
            ("MLBBOT_ADMIN_ROLE", "Scorekeeper"),
        ]))
        .unwrap();
        assert_eq!(cfg.general.discord_token, "secret");
        assert_eq!(cfg.general.channel_id, 1234567890);
        assert_eq!(cfg.general.admin_role_name, "Scorekeeper");
        cfg.validate().unwrap();
    }

    #[test]
    fn huge_poll_interval_is_rejected() {
        let mut cfg = Config::default();
        cfg.general.discord_token = "token".to_owned();
        cfg.general.channel_id = 7;

        cfg.poll.interval_minutes = MAX_POLL_INTERVAL_MINUTES;
        cfg.validate().unwrap();

        cfg.poll.interval_minutes = u64::MAX;
        assert!(cfg.validate().unwrap_err().to_string().contains("poll.interval_minutes"));
        // Never overflows, even unvalidated.
        assert_eq!(cfg.poll.interval(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn bad_channel_id_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_overrides(env(&[("DISCORD_CHANNEL_ID", "general")]))
            .unwrap_err();
        assert!(err.to_string().contains("DISCORD_CHANNEL_ID"));
    }

    #[test]
    fn validation_reports_missing_token_and_channel() {
        let mut cfg = Config::default();
        assert!(cfg.validate().unwrap_err().to_string().contains("DISCORD_BOT_TOKEN"));

        cfg.general.discord_token = "token".to_owned();
        assert!(cfg.validate().unwrap_err().to_string().contains("DISCORD_CHANNEL_ID"));

        cfg.general.channel_id = 7;
        cfg.poll.interval_minutes = 0;
        assert!(cfg.validate().is_err());

        cfg.poll.interval_minutes = 5;
        cfg.mlb.timezone = "Mars/Olympus_Mons".to_owned();
        assert!(cfg.validate().unwrap_err().to_string().contains("mlb.timezone"));
    }
}
