// One-time guild setup: which MapleStory world the guild plays on and
// what the guild is called. Commands refuse to run until this exists.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum World {
    Kronos,
    Hyperion,
    Scania,
    Bera,
}

impl World {
    pub fn all() -> &'static [World] {
        &[World::Kronos, World::Hyperion, World::Scania, World::Bera]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            World::Kronos => "Kronos",
            World::Hyperion => "Hyperion",
            World::Scania => "Scania",
            World::Bera => "Bera",
        }
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for World {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        World::all()
            .iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| SetupError::UnknownWorld(s.trim().to_string()))
    }
}

/// Stored per Discord guild in the settings sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildProfile {
    pub guild_id: u64,
    pub guild_name: String,
    pub world: World,
    pub setup_by: u64,
    pub setup_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Guild names need at least 2 characters")]
    InvalidName,

    #[error("'{0}' is not a supported world")]
    UnknownWorld(String),

    #[error("This server is already set up for '{0}'")]
    AlreadySetUp(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, guild_id: u64) -> Result<Option<GuildProfile>, SetupError>;
    async fn save_profile(&self, profile: &GuildProfile) -> Result<(), SetupError>;
}

pub struct SetupService<S: ProfileStore> {
    store: Arc<S>,
}

impl<S: ProfileStore> SetupService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn profile(&self, guild_id: u64) -> Result<Option<GuildProfile>, SetupError> {
        self.store.get_profile(guild_id).await
    }

    pub async fn is_setup(&self, guild_id: u64) -> Result<bool, SetupError> {
        Ok(self.store.get_profile(guild_id).await?.is_some())
    }

    pub async fn complete_setup(
        &self,
        guild_id: u64,
        guild_name: &str,
        world: World,
        setup_by: u64,
        now: DateTime<Utc>,
    ) -> Result<GuildProfile, SetupError> {
        let guild_name = guild_name.trim();
        if guild_name.chars().count() < 2 {
            return Err(SetupError::InvalidName);
        }
        if let Some(existing) = self.store.get_profile(guild_id).await? {
            return Err(SetupError::AlreadySetUp(existing.guild_name));
        }

        let profile = GuildProfile {
            guild_id,
            guild_name: guild_name.to_string(),
            world,
            setup_by,
            setup_at: now,
        };
        self.store.save_profile(&profile).await?;
        Ok(profile)
    }
}
