//! Tracked players, stored as a flat JSON list that may also be edited by hand.

use crate::persistent_state::{read_json, write_json_atomic};
use anyhow::Result;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackedPlayer {
    pub id: u64,
    pub name: String,
    #[serde(rename = "primaryNumber", default)]
    pub primary_number: Option<String>,
    #[serde(default = "unknown_team")]
    pub team: String,
    #[serde(default)]
    pub team_id: Option<u64>,
    #[serde(default = "unknown_position")]
    pub position: String,
}

fn unknown_team() -> String {
    "Unknown".to_owned()
}

fn unknown_position() -> String {
    "N/A".to_owned()
}

impl TrackedPlayer {
    /// Jersey number for display, `N/A` when the API has none.
    pub fn number(&self) -> &str {
        self.primary_number.as_deref().unwrap_or("N/A")
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Roster(Vec<TrackedPlayer>);

impl Roster {
    pub async fn load(path: &Path) -> Result<Self> {
        Ok(read_json(path).await?.unwrap_or_default())
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self).await
    }

    /// Returns false, leaving the roster unchanged, if the id is already tracked.
    pub fn add(&mut self, player: TrackedPlayer) -> bool {
        if self.contains(player.id) {
            return false;
        }
        self.0.push(player);
        true
    }

    /// Remove every player whose name contains `query`, ignoring case.
    pub fn remove_matching(&mut self, query: &str) -> Vec<TrackedPlayer> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.0)
            .into_iter()
            .partition(|p| p.name.to_lowercase().contains(&query));
        self.0 = kept;
        removed
    }

    pub fn contains(&self, id: u64) -> bool {
        self.0.iter().any(|p| p.id == id)
    }

    pub fn list(&self) -> &[TrackedPlayer] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
pub(crate) fn player(id: u64, name: &str) -> TrackedPlayer {
    TrackedPlayer {
        id,
        name: name.to_owned(),
        primary_number: Some("17".to_owned()),
        team: "Los Angeles Dodgers".to_owned(),
        team_id: Some(119),
        position: "DH".to_owned(),
    }
}
