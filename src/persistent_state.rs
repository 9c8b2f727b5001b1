use crate::{config::Storage, roster::Roster};
use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::HashMap, path::Path};

/// State which persists across sessions
pub struct PersistentState {
    pub roster: Roster,
    pub seen: SeenAtBats,
}

/// Last processed at-bat per player, keyed by the stringified player id.
#[derive(Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SeenAtBats {
    pub at_bats: HashMap<String, SeenAtBat>,
    /// Game whose final summary was last posted for each player.
    pub summaries: HashMap<String, u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SeenAtBat {
    pub game_pk: u64,
    pub at_bat_index: u32,
}

impl PersistentState {
    pub async fn load(storage: &Storage) -> Result<Self> {
        Ok(Self {
            roster: Roster::load(&storage.roster_file).await?,
            seen: SeenAtBats::load(&storage.seen_at_bats_file).await?,
        })
    }
}

impl SeenAtBats {
    pub async fn load(path: &Path) -> Result<Self> {
        Ok(read_json(path).await?.unwrap_or_default())
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self).await
    }

    pub fn last(&self, player_id: u64) -> Option<SeenAtBat> {
        self.at_bats.get(&player_id.to_string()).copied()
    }

    /// Most recent observation wins.
    pub fn record(&mut self, player_id: u64, game_pk: u64, at_bat_index: u32) {
        self.at_bats.insert(
            player_id.to_string(),
            SeenAtBat {
                game_pk,
                at_bat_index,
            },
        );
    }

    pub fn summary_posted(&self, player_id: u64, game_pk: u64) -> bool {
        self.summaries.get(&player_id.to_string()) == Some(&game_pk)
    }

    pub fn record_summary(&mut self, player_id: u64, game_pk: u64) {
        self.summaries.insert(player_id.to_string(), game_pk);
    }

    pub fn forget(&mut self, player_id: u64) {
        let key = player_id.to_string();
        self.at_bats.remove(&key);
        self.summaries.remove(&key);
    }
}

/// Read a JSON document.  `Ok(None)` if the file does not exist yet.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(data) => serde_json::from_slice(&data).map(Some).map_err(|e| {
            anyhow!(
                "Could not parse `{}`: {}",
                path.to_string_lossy(),
                e
            )
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow!(
            "Could not read `{}`: {}",
            path.to_string_lossy(),
            e
        )),
    }
}

pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)
        .map_err(|e| anyhow!("Could not serialize `{}`: {}", path.to_string_lossy(), e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            anyhow!(
                "Could not create directory `{}`: {}",
                parent.to_string_lossy(),
                e
            )
        })?;
    }

    // Create a temporary file in the same directory.
    let tmp_path = path.with_extension("json.new");

    tokio::fs::write(&tmp_path, serialized).await.map_err(|e| {
        anyhow!(
            "Could not write temporary file `{}`: {}",
            tmp_path.to_string_lossy(),
            e
        )
    })?;

    // Atomically rename the temporary file over the target file.
    tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
        anyhow!(
            "Could not rename temporary file `{}` to `{}`: {}",
            tmp_path.to_string_lossy(),
            path.to_string_lossy(),
            e
        )
    })?;

    Ok(())
}

#[cfg(test)]
pub(crate) fn scratch_path(name: &str) -> std::path::PathBuf {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir()
        .join(format!("mlbbot-test-{}-{}", std::process::id(), n))
        .join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_replaces_previous_observation() {
        let mut seen = SeenAtBats::default();
        assert_eq!(seen.last(660271), None);

        seen.record(660271, 745000, 3);
        seen.record(660271, 745000, 17);
        assert_eq!(
            seen.last(660271),
            Some(SeenAtBat {
                game_pk: 745000,
                at_bat_index: 17
            })
        );
    }

    #[test]
    fn summaries_are_per_game() {
        let mut seen = SeenAtBats::default();
        seen.record_summary(1, 100);
        assert!(seen.summary_posted(1, 100));
        assert!(!seen.summary_posted(1, 101));
        assert!(!seen.summary_posted(2, 100));

        seen.forget(1);
        assert!(!seen.summary_posted(1, 100));
    }

    #[tokio::test]
    async fn missing_file_is_empty_state() {
        let path = scratch_path("last_atbats.json");
        let seen = SeenAtBats::load(&path).await.unwrap();
        assert_eq!(seen, SeenAtBats::default());
    }

    #[tokio::test]
    async fn state_survives_save_and_load() {
        let path = scratch_path("last_atbats.json");
        let mut seen = SeenAtBats::default();
        seen.record(592450, 746123, 41);
        seen.record_summary(592450, 746122);
        seen.save(&path).await.unwrap();

        let loaded = SeenAtBats::load(&path).await.unwrap();
        assert_eq!(loaded, seen);
        assert!(!path.with_extension("json.new").exists());
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let path = scratch_path("last_atbats.json");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = SeenAtBats::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("Could not parse"));
    }
}
