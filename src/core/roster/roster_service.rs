// Business logic for the guild roster and weekly score tracking.
// No Discord-specific code here (no serenity, no poise imports) - the
// service works with primitive types and returns plain data that the
// Discord layer turns into embeds and replies.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::stats::{self, ScoreSummary};
use super::week::{self, WeekKey};

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// A tracked character on the roster sheet.
///
/// A Discord account can own several characters; ownership is recorded
/// per row via the Discord ID column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub ign: String,
    pub discord_username: Option<String>,
    pub discord_id: Option<u64>,
}

impl Player {
    pub fn is_owned_by(&self, discord_id: u64) -> bool {
        self.discord_id == Some(discord_id)
    }
}

/// Why a character left the roster. Recorded in the departed archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureReason {
    Left,
    Kicked,
}

impl DepartureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepartureReason::Left => "Left",
            DepartureReason::Kicked => "Kicked",
        }
    }
}

/// Result of submitting a score, returned so the Discord layer can
/// announce new personal bests.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub ign: String,
    pub week: WeekKey,
    pub score: u64,
    pub new_personal_best: bool,
    pub previous_best: u64,
}

/// Everything the profile embed needs for one character.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub player: Player,
    pub summary: ScoreSummary,
    pub current_week: WeekKey,
    pub current_week_done: bool,
}

/// Data series for a score chart.
#[derive(Debug, Clone)]
pub struct GraphData {
    pub ign: String,
    /// Short week labels, oldest first.
    pub labels: Vec<String>,
    /// One entry per label; `None` where the week has no score.
    pub scores: Vec<Option<u64>>,
    pub personal_best: u64,
    pub sandbag_threshold: u64,
}

impl GraphData {
    /// The latest submitted score sits below the sandbag threshold.
    pub fn is_sandbagging(&self) -> bool {
        self.sandbag_threshold > 0
            && self
                .scores
                .iter()
                .rev()
                .find_map(|s| *s)
                .map_or(false, |latest| latest < self.sandbag_threshold)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("No character named '{0}' is on the roster")]
    UnknownCharacter(String),

    #[error("No characters are linked to this Discord account")]
    NoLinkedCharacters,

    #[error("{0} characters are linked to this account, name one explicitly")]
    AmbiguousCharacter(usize),

    #[error("'{0}' is not linked to your Discord account")]
    NotOwned(String),

    #[error("A character named '{0}' is already on the roster")]
    DuplicateCharacter(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================
// The core defines WHAT it needs from the roster sheet; the infra layer
// implements it against the actual spreadsheet API.

#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Case-insensitive lookup by IGN.
    async fn find_player(&self, ign: &str) -> Result<Option<Player>, RosterError>;

    /// All characters owned by a Discord account.
    async fn players_for_discord_id(&self, discord_id: u64) -> Result<Vec<Player>, RosterError>;

    /// Add a character, or update the Discord columns of an existing row.
    async fn upsert_player(&self, player: &Player) -> Result<(), RosterError>;

    /// Change a character's IGN in place, keeping its score history.
    async fn rename_player(&self, old_ign: &str, new_ign: &str) -> Result<(), RosterError>;

    /// Remove a character's row entirely.
    async fn remove_player(&self, ign: &str) -> Result<(), RosterError>;

    /// Copy departed characters to the archive sheet with the reason.
    async fn archive_departed(
        &self,
        players: &[Player],
        reason: DepartureReason,
    ) -> Result<(), RosterError>;

    /// Write a score into the cell for (character, week), creating the
    /// week column if it does not exist yet.
    async fn record_score(
        &self,
        ign: &str,
        week: &WeekKey,
        score: u64,
    ) -> Result<(), RosterError>;

    /// A character's full score series, oldest week first.
    async fn score_history(&self, ign: &str)
        -> Result<Vec<(WeekKey, Option<u64>)>, RosterError>;

    /// Every character's score for one week.
    async fn scores_for_week(
        &self,
        week: &WeekKey,
    ) -> Result<Vec<(Player, Option<u64>)>, RosterError>;

    /// All tracked week columns, oldest first.
    async fn weeks(&self) -> Result<Vec<WeekKey>, RosterError>;

    /// Guild-wide score sum per week, oldest first.
    async fn weekly_totals(&self) -> Result<Vec<(WeekKey, u64)>, RosterError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct RosterService<S: RosterStore> {
    store: Arc<S>,
}

impl<S: RosterStore> RosterService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolves which character a command applies to.
    ///
    /// With an explicit name the character must exist (and, when
    /// `enforce_ownership` is set, belong to the caller). Without one,
    /// the caller's single linked character is used; zero or several
    /// linked characters is an error the caller must disambiguate.
    pub async fn resolve_character(
        &self,
        discord_id: u64,
        character: Option<&str>,
        enforce_ownership: bool,
    ) -> Result<Player, RosterError> {
        if let Some(name) = character {
            let player = self
                .store
                .find_player(name)
                .await?
                .ok_or_else(|| RosterError::UnknownCharacter(name.to_string()))?;
            if enforce_ownership && !player.is_owned_by(discord_id) {
                return Err(RosterError::NotOwned(player.ign.clone()));
            }
            return Ok(player);
        }

        let mut owned = self.store.players_for_discord_id(discord_id).await?;
        match owned.len() {
            0 => Err(RosterError::NoLinkedCharacters),
            1 => Ok(owned.remove(0)),
            n => Err(RosterError::AmbiguousCharacter(n)),
        }
    }

    /// Submits a score for the current week (or last week, for late
    /// submissions). Only admins may write on behalf of characters they
    /// do not own.
    pub async fn record_score(
        &self,
        caller_id: u64,
        character: Option<&str>,
        score: u64,
        previous_week: bool,
        is_admin: bool,
        now: DateTime<Utc>,
    ) -> Result<ScoreOutcome, RosterError> {
        let player = self
            .resolve_character(caller_id, character, !is_admin)
            .await?;

        let week = if previous_week {
            week::last_week(now)
        } else {
            week::current_week(now)
        };

        let history = self.store.score_history(&player.ign).await?;
        let previous_best = history
            .iter()
            .filter_map(|(_, s)| *s)
            .max()
            .unwrap_or(0);

        self.store.record_score(&player.ign, &week, score).await?;

        Ok(ScoreOutcome {
            ign: player.ign,
            week,
            score,
            new_personal_best: score > previous_best && previous_best > 0,
            previous_best,
        })
    }

    pub async fn profile(
        &self,
        caller_id: u64,
        character: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ProfileView, RosterError> {
        let player = self.resolve_character(caller_id, character, false).await?;
        let history = self.store.score_history(&player.ign).await?;

        let current = week::current_week(now);
        let current_week_done = history
            .iter()
            .any(|(w, s)| *w == current && s.map_or(false, |s| s > 0));

        let series: Vec<Option<u64>> = history.iter().map(|(_, s)| *s).collect();
        let summary = stats::summarize(&series);

        Ok(ProfileView {
            player,
            summary,
            current_week: current,
            current_week_done,
        })
    }

    /// Builds the score series for a chart over the last `num_weeks`
    /// tracked weeks.
    pub async fn graph_series(
        &self,
        caller_id: u64,
        character: Option<&str>,
        num_weeks: usize,
        now: DateTime<Utc>,
    ) -> Result<GraphData, RosterError> {
        let player = self.resolve_character(caller_id, character, false).await?;
        let history = self.store.score_history(&player.ign).await?;

        let current = week::current_week(now);
        let recent: Vec<&(WeekKey, Option<u64>)> = history
            .iter()
            .filter(|(w, _)| *w <= current)
            .collect();
        let start = recent.len().saturating_sub(num_weeks);
        let window = &recent[start..];

        let labels = window.iter().map(|(w, _)| w.short_label()).collect();
        let scores: Vec<Option<u64>> = window.iter().map(|(_, s)| *s).collect();
        let personal_best = history.iter().filter_map(|(_, s)| *s).max().unwrap_or(0);

        Ok(GraphData {
            ign: player.ign,
            labels,
            scores,
            personal_best,
            sandbag_threshold: stats::sandbag_threshold(personal_best),
        })
    }

    /// Guild-wide weekly totals over the last `num_weeks`, skipping
    /// weeks that have not started yet.
    pub async fn guild_weekly_totals(
        &self,
        num_weeks: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<(WeekKey, u64)>, RosterError> {
        let current = week::current_week(now);
        let mut totals: Vec<(WeekKey, u64)> = self
            .store
            .weekly_totals()
            .await?
            .into_iter()
            .filter(|(w, _)| *w <= current)
            .collect();
        let start = totals.len().saturating_sub(num_weeks);
        Ok(totals.split_off(start))
    }

    /// Links a character to a Discord account, creating the roster row
    /// if the character is new.
    pub async fn link(
        &self,
        ign: &str,
        discord_id: u64,
        discord_username: &str,
    ) -> Result<Player, RosterError> {
        let ign = ign.trim();
        let player = Player {
            ign: match self.store.find_player(ign).await? {
                Some(existing) => existing.ign,
                None => ign.to_string(),
            },
            discord_username: Some(discord_username.to_string()),
            discord_id: Some(discord_id),
        };
        self.store.upsert_player(&player).await?;
        Ok(player)
    }

    /// Archives and removes every character linked to a departing
    /// member. Returns the IGNs that were removed.
    pub async fn unlink(
        &self,
        discord_id: u64,
        reason: DepartureReason,
    ) -> Result<Vec<String>, RosterError> {
        let players = self.store.players_for_discord_id(discord_id).await?;
        if players.is_empty() {
            return Err(RosterError::NoLinkedCharacters);
        }

        self.store.archive_departed(&players, reason).await?;
        let mut removed = Vec::with_capacity(players.len());
        for player in &players {
            self.store.remove_player(&player.ign).await?;
            removed.push(player.ign.clone());
        }
        Ok(removed)
    }

    /// Changes a character's IGN, keeping its score history.
    pub async fn rename(
        &self,
        caller_id: u64,
        old_ign: &str,
        new_ign: &str,
        is_admin: bool,
    ) -> Result<(), RosterError> {
        let new_ign = new_ign.trim();
        let player = self
            .store
            .find_player(old_ign)
            .await?
            .ok_or_else(|| RosterError::UnknownCharacter(old_ign.to_string()))?;
        if !is_admin && !player.is_owned_by(caller_id) {
            return Err(RosterError::NotOwned(player.ign));
        }
        if let Some(existing) = self.store.find_player(new_ign).await? {
            if !existing.ign.eq_ignore_ascii_case(&player.ign) {
                return Err(RosterError::DuplicateCharacter(existing.ign));
            }
        }
        self.store.rename_player(&player.ign, new_ign).await
    }

    /// The caller's linked characters.
    pub async fn characters_of(&self, discord_id: u64) -> Result<Vec<Player>, RosterError> {
        self.store.players_for_discord_id(discord_id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use tokio::sync::Mutex;

    // In-memory roster, same shape as the sheet: one row per character,
    // one column per week.
    #[derive(Default)]
    struct MemoryStore {
        inner: Mutex<MemoryInner>,
    }

    #[derive(Default)]
    struct MemoryInner {
        players: Vec<Player>,
        weeks: Vec<WeekKey>,
        // (ign, week) -> score
        scores: BTreeMap<(String, String), u64>,
        archived: Vec<(Player, DepartureReason)>,
    }

    #[async_trait]
    impl RosterStore for MemoryStore {
        async fn find_player(&self, ign: &str) -> Result<Option<Player>, RosterError> {
            Ok(self
                .inner
                .lock()
                .await
                .players
                .iter()
                .find(|p| p.ign.eq_ignore_ascii_case(ign))
                .cloned())
        }

        async fn players_for_discord_id(
            &self,
            discord_id: u64,
        ) -> Result<Vec<Player>, RosterError> {
            Ok(self
                .inner
                .lock()
                .await
                .players
                .iter()
                .filter(|p| p.is_owned_by(discord_id))
                .cloned()
                .collect())
        }

        async fn upsert_player(&self, player: &Player) -> Result<(), RosterError> {
            let mut inner = self.inner.lock().await;
            if let Some(existing) = inner
                .players
                .iter_mut()
                .find(|p| p.ign.eq_ignore_ascii_case(&player.ign))
            {
                *existing = player.clone();
            } else {
                inner.players.push(player.clone());
            }
            Ok(())
        }

        async fn rename_player(&self, old_ign: &str, new_ign: &str) -> Result<(), RosterError> {
            let mut inner = self.inner.lock().await;
            let weeks: Vec<String> = inner.weeks.iter().map(|w| w.to_string()).collect();
            for week in weeks {
                if let Some(score) = inner.scores.remove(&(old_ign.to_string(), week.clone())) {
                    inner.scores.insert((new_ign.to_string(), week), score);
                }
            }
            if let Some(player) = inner
                .players
                .iter_mut()
                .find(|p| p.ign.eq_ignore_ascii_case(old_ign))
            {
                player.ign = new_ign.to_string();
                Ok(())
            } else {
                Err(RosterError::UnknownCharacter(old_ign.to_string()))
            }
        }

        async fn remove_player(&self, ign: &str) -> Result<(), RosterError> {
            let mut inner = self.inner.lock().await;
            inner.players.retain(|p| !p.ign.eq_ignore_ascii_case(ign));
            Ok(())
        }

        async fn archive_departed(
            &self,
            players: &[Player],
            reason: DepartureReason,
        ) -> Result<(), RosterError> {
            let mut inner = self.inner.lock().await;
            for player in players {
                inner.archived.push((player.clone(), reason));
            }
            Ok(())
        }

        async fn record_score(
            &self,
            ign: &str,
            week: &WeekKey,
            score: u64,
        ) -> Result<(), RosterError> {
            let mut inner = self.inner.lock().await;
            if !inner.weeks.contains(week) {
                inner.weeks.push(*week);
                inner.weeks.sort();
            }
            inner
                .scores
                .insert((ign.to_string(), week.to_string()), score);
            Ok(())
        }

        async fn score_history(
            &self,
            ign: &str,
        ) -> Result<Vec<(WeekKey, Option<u64>)>, RosterError> {
            let inner = self.inner.lock().await;
            Ok(inner
                .weeks
                .iter()
                .map(|w| {
                    let score = inner.scores.get(&(ign.to_string(), w.to_string())).copied();
                    (*w, score)
                })
                .collect())
        }

        async fn scores_for_week(
            &self,
            week: &WeekKey,
        ) -> Result<Vec<(Player, Option<u64>)>, RosterError> {
            let inner = self.inner.lock().await;
            Ok(inner
                .players
                .iter()
                .map(|p| {
                    let score = inner
                        .scores
                        .get(&(p.ign.clone(), week.to_string()))
                        .copied();
                    (p.clone(), score)
                })
                .collect())
        }

        async fn weeks(&self) -> Result<Vec<WeekKey>, RosterError> {
            Ok(self.inner.lock().await.weeks.clone())
        }

        async fn weekly_totals(&self) -> Result<Vec<(WeekKey, u64)>, RosterError> {
            let inner = self.inner.lock().await;
            Ok(inner
                .weeks
                .iter()
                .map(|w| {
                    let total = inner
                        .scores
                        .iter()
                        .filter(|((_, week), _)| *week == w.to_string())
                        .map(|(_, s)| *s)
                        .sum();
                    (*w, total)
                })
                .collect())
        }
    }

    fn service() -> RosterService<MemoryStore> {
        RosterService::new(Arc::new(MemoryStore::default()))
    }

    // Monday 2025-01-06 at noon; the tracked week is 01/09/2025.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn linking_creates_a_roster_row() {
        let svc = service();
        let player = svc.link("Aran", 42, "aran_main").await.unwrap();
        assert_eq!(player.discord_id, Some(42));

        let resolved = svc.resolve_character(42, None, true).await.unwrap();
        assert_eq!(resolved.ign, "Aran");
    }

    #[tokio::test]
    async fn resolution_fails_without_linked_characters() {
        let svc = service();
        let err = svc.resolve_character(42, None, true).await.unwrap_err();
        assert!(matches!(err, RosterError::NoLinkedCharacters));
    }

    #[tokio::test]
    async fn resolution_is_ambiguous_with_multiple_characters() {
        let svc = service();
        svc.link("Aran", 42, "aran_main").await.unwrap();
        svc.link("Evan", 42, "aran_main").await.unwrap();

        let err = svc.resolve_character(42, None, true).await.unwrap_err();
        assert!(matches!(err, RosterError::AmbiguousCharacter(2)));

        let picked = svc
            .resolve_character(42, Some("evan"), true)
            .await
            .unwrap();
        assert_eq!(picked.ign, "Evan");
    }

    #[tokio::test]
    async fn non_admins_cannot_submit_for_other_characters() {
        let svc = service();
        svc.link("Aran", 42, "aran_main").await.unwrap();

        let err = svc
            .record_score(99, Some("Aran"), 1_000_000, false, false, now())
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::NotOwned(_)));

        // An admin may.
        let outcome = svc
            .record_score(99, Some("Aran"), 1_000_000, false, true, now())
            .await
            .unwrap();
        assert_eq!(outcome.score, 1_000_000);
    }

    #[tokio::test]
    async fn score_submission_lands_in_the_current_week() {
        let svc = service();
        svc.link("Aran", 42, "aran_main").await.unwrap();

        let outcome = svc
            .record_score(42, None, 2_000_000, false, false, now())
            .await
            .unwrap();
        assert_eq!(outcome.week.to_string(), "01/09/2025");
        // First ever score is not announced as a personal best.
        assert!(!outcome.new_personal_best);
    }

    #[tokio::test]
    async fn beating_a_previous_score_is_a_personal_best() {
        let svc = service();
        svc.link("Aran", 42, "aran_main").await.unwrap();

        svc.record_score(42, None, 1_000_000, true, false, now())
            .await
            .unwrap();
        let outcome = svc
            .record_score(42, None, 2_000_000, false, false, now())
            .await
            .unwrap();
        assert!(outcome.new_personal_best);
        assert_eq!(outcome.previous_best, 1_000_000);
    }

    #[tokio::test]
    async fn previous_week_flag_targets_last_week() {
        let svc = service();
        svc.link("Aran", 42, "aran_main").await.unwrap();

        let outcome = svc
            .record_score(42, None, 500_000, true, false, now())
            .await
            .unwrap();
        assert_eq!(outcome.week.to_string(), "01/02/2025");
    }

    #[tokio::test]
    async fn profile_reports_current_week_status() {
        let svc = service();
        svc.link("Aran", 42, "aran_main").await.unwrap();

        let before = svc.profile(42, None, now()).await.unwrap();
        assert!(!before.current_week_done);

        svc.record_score(42, None, 1_500_000, false, false, now())
            .await
            .unwrap();
        let after = svc.profile(42, None, now()).await.unwrap();
        assert!(after.current_week_done);
        assert_eq!(after.summary.personal_best, 1_500_000);
    }

    #[test]
    fn sandbagging_flags_only_latest_scores_below_the_threshold() {
        let mut data = GraphData {
            ign: "Aran".to_string(),
            labels: vec![],
            scores: vec![Some(1_000_000), Some(100_000)],
            personal_best: 1_000_000,
            sandbag_threshold: 850_000,
        };
        assert!(data.is_sandbagging());

        // 900k is above 85% of the personal best.
        data.scores = vec![Some(1_000_000), Some(900_000)];
        assert!(!data.is_sandbagging());

        // A week not yet run falls back to the last submitted score.
        data.scores = vec![Some(100_000), None];
        assert!(data.is_sandbagging());

        // No scores and no threshold never flag.
        data.scores = vec![None, None];
        assert!(!data.is_sandbagging());
        data.sandbag_threshold = 0;
        data.scores = vec![Some(0)];
        assert!(!data.is_sandbagging());
    }

    #[tokio::test]
    async fn graph_series_flags_a_sandbagged_week() {
        let svc = service();
        svc.link("Aran", 42, "aran_main").await.unwrap();
        svc.record_score(42, None, 1_000_000, true, false, now())
            .await
            .unwrap();
        svc.record_score(42, None, 100_000, false, false, now())
            .await
            .unwrap();

        let data = svc.graph_series(42, None, 10, now()).await.unwrap();
        assert_eq!(data.sandbag_threshold, 850_000);
        assert!(data.is_sandbagging());
    }

    #[tokio::test]
    async fn unlink_archives_every_owned_character() {
        let svc = service();
        svc.link("Aran", 42, "aran_main").await.unwrap();
        svc.link("Evan", 42, "aran_main").await.unwrap();

        let removed = svc.unlink(42, DepartureReason::Left).await.unwrap();
        assert_eq!(removed, vec!["Aran".to_string(), "Evan".to_string()]);
        assert!(svc.characters_of(42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_keeps_score_history() {
        let svc = service();
        svc.link("Aran", 42, "aran_main").await.unwrap();
        svc.record_score(42, None, 3_000_000, false, false, now())
            .await
            .unwrap();

        svc.rename(42, "Aran", "AranV2", false).await.unwrap();
        let profile = svc.profile(42, Some("AranV2"), now()).await.unwrap();
        assert_eq!(profile.summary.personal_best, 3_000_000);
    }

    #[tokio::test]
    async fn rename_rejects_a_taken_name() {
        let svc = service();
        svc.link("Aran", 42, "aran_main").await.unwrap();
        svc.link("Evan", 43, "evan_main").await.unwrap();

        let err = svc.rename(42, "Aran", "evan", false).await.unwrap_err();
        assert!(matches!(err, RosterError::DuplicateCharacter(_)));
    }

    #[tokio::test]
    async fn guild_totals_skip_future_weeks() {
        let svc = service();
        svc.link("Aran", 42, "aran_main").await.unwrap();
        svc.record_score(42, None, 1_000_000, false, false, now())
            .await
            .unwrap();
        // A score recorded "now" two weeks later creates a future column
        // relative to the original now().
        let later = Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap();
        svc.record_score(42, None, 2_000_000, false, false, later)
            .await
            .unwrap();

        let totals = svc.guild_weekly_totals(10, now()).await.unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].1, 1_000_000);
    }
}
