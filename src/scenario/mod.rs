//! Offline replay input: seed requests plus an ordered list of media writes.

use crate::engine::AvailabilityEngine;
use crate::models::{MediaRequest, MediaSnapshot};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub requests: Vec<MediaRequest>,
    #[serde(default)]
    pub writes: Vec<MediaWrite>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaWrite {
    /// State before the write; absent for a first observation.
    pub old: Option<MediaSnapshot>,
    pub new: MediaSnapshot,
}

impl Scenario {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let scenario: Scenario = serde_yaml::from_str(&content)?;
        Ok(scenario)
    }

    /// Feed every write to the engine in order. Returns the transitions queued.
    pub fn replay(&self, engine: &AvailabilityEngine) -> usize {
        let mut queued = 0;
        for (index, write) in self.writes.iter().enumerate() {
            let count = engine.on_media_write(write.old.as_ref(), &write.new);
            info!(write = index, media_id = write.new.id, transitions = count, "Replayed write");
            queued += count;
        }
        queued
    }
}
