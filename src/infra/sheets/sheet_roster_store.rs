// Roster and settings storage backed by the guild's spreadsheet.
//
// Worksheet layout:
//   GPQ           IGN | Discord Username | Discord ID | one column per week
//   LeftorKicked  IGN | Discord Username | Discord ID | Reason | Departed At
//   Settings      Guild ID | Guild Name | World | Setup By | Setup At
//
// The sheet stays human-editable, so parsing is forgiving: officers
// leave blank rows behind, type scores with thousands separators, and
// old week headers use two-digit years.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::core::roster::week::WeekKey;
use crate::core::roster::{DepartureReason, Player, RosterError, RosterStore};
use crate::core::setup::{GuildProfile, ProfileStore, SetupError, World};

use super::range_cache::RangeCache;
use super::sheets_client::{SheetError, SheetsClient};

const ROSTER_SHEET: &str = "GPQ";
const DEPARTED_SHEET: &str = "LeftorKicked";
const SETTINGS_SHEET: &str = "Settings";

const ROSTER_RANGE: &str = "GPQ!A1:ZZ1000";
const SETTINGS_RANGE: &str = "Settings!A1:E1000";

/// Week columns start after IGN, Discord Username and Discord ID.
const FIRST_WEEK_COL: usize = 3;

const CACHE_TTL: Duration = Duration::from_secs(60);

pub struct SheetRosterStore {
    client: SheetsClient,
    cache: RangeCache,
}

impl SheetRosterStore {
    pub fn new(client: SheetsClient) -> Self {
        Self {
            client,
            cache: RangeCache::new(CACHE_TTL),
        }
    }

    async fn load_roster(&self) -> Result<RosterTable, RosterError> {
        let values = match self.cache.get(ROSTER_RANGE) {
            Some(values) => values,
            None => {
                let values = self
                    .client
                    .get_range(ROSTER_RANGE)
                    .await
                    .map_err(storage_err)?;
                self.cache.put(ROSTER_RANGE, values.clone());
                values
            }
        };
        parse_roster(&values)
    }

    async fn update_cell(&self, cell: &str, value: String) -> Result<(), RosterError> {
        self.client
            .update_range(cell, vec![vec![value]])
            .await
            .map_err(storage_err)?;
        self.cache.invalidate_sheet(ROSTER_SHEET);
        Ok(())
    }

    fn row_of<'a>(table: &'a RosterTable, ign: &str) -> Result<&'a RosterRow, RosterError> {
        table
            .rows
            .iter()
            .find(|row| row.player.ign.eq_ignore_ascii_case(ign))
            .ok_or_else(|| RosterError::UnknownCharacter(ign.to_string()))
    }
}

fn storage_err(e: SheetError) -> RosterError {
    RosterError::Storage(e.to_string())
}

// ============================================================================
// SHEET PARSING
// ============================================================================
// Pure functions over raw cell values, kept separate from the API calls
// so they can be tested without a live spreadsheet.

#[derive(Debug)]
struct RosterTable {
    /// Week columns: 0-based column index paired with the parsed key,
    /// in chronological order.
    weeks: Vec<(usize, WeekKey)>,
    rows: Vec<RosterRow>,
}

#[derive(Debug)]
struct RosterRow {
    /// 1-based sheet row number.
    sheet_row: usize,
    player: Player,
    /// Aligned with `RosterTable::weeks`.
    scores: Vec<Option<u64>>,
}

fn parse_roster(values: &[Vec<String>]) -> Result<RosterTable, RosterError> {
    let header = values
        .first()
        .ok_or_else(|| RosterError::Storage("Roster sheet has no header row".to_string()))?;

    let mut weeks: Vec<(usize, WeekKey)> = header
        .iter()
        .enumerate()
        .skip(FIRST_WEEK_COL)
        .filter_map(|(col, raw)| WeekKey::parse(raw).map(|week| (col, week)))
        .collect();
    weeks.sort_by_key(|(_, week)| *week);

    let mut rows = Vec::new();
    for (index, raw_row) in values.iter().enumerate().skip(1) {
        let ign = cell(raw_row, 0);
        if ign.is_empty() {
            // Cleared row left behind by a departure.
            continue;
        }

        let discord_username = non_empty(cell(raw_row, 1));
        let discord_id = cell(raw_row, 2).parse::<u64>().ok();

        let scores = weeks
            .iter()
            .map(|(col, _)| clean_score(&cell(raw_row, *col)))
            .collect();

        rows.push(RosterRow {
            sheet_row: index + 1,
            player: Player {
                ign: ign.to_string(),
                discord_username,
                discord_id,
            },
            scores,
        });
    }

    Ok(RosterTable { weeks, rows })
}

fn cell(row: &[String], col: usize) -> String {
    row.get(col).map(|s| s.trim().to_string()).unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Scores come back as display strings, sometimes with thousands
/// separators. Anything non-numeric reads as an empty cell.
fn clean_score(raw: &str) -> Option<u64> {
    let cleaned = raw.replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// New week headers go in the column after the rightmost existing week,
/// regardless of the chronological order the headers parse to.
fn next_week_column(weeks: &[(usize, WeekKey)]) -> usize {
    weeks
        .iter()
        .map(|(col, _)| col + 1)
        .max()
        .unwrap_or(FIRST_WEEK_COL)
}

/// A1 column letters for a 0-based index: 0 -> A, 25 -> Z, 26 -> AA.
fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

// ============================================================================
// ROSTER STORE IMPLEMENTATION
// ============================================================================

#[async_trait]
impl RosterStore for SheetRosterStore {
    async fn find_player(&self, ign: &str) -> Result<Option<Player>, RosterError> {
        let table = self.load_roster().await?;
        Ok(table
            .rows
            .into_iter()
            .map(|row| row.player)
            .find(|p| p.ign.eq_ignore_ascii_case(ign)))
    }

    async fn players_for_discord_id(&self, discord_id: u64) -> Result<Vec<Player>, RosterError> {
        let table = self.load_roster().await?;
        Ok(table
            .rows
            .into_iter()
            .map(|row| row.player)
            .filter(|p| p.is_owned_by(discord_id))
            .collect())
    }

    async fn upsert_player(&self, player: &Player) -> Result<(), RosterError> {
        let table = self.load_roster().await?;
        let identity = vec![
            player.ign.clone(),
            player.discord_username.clone().unwrap_or_default(),
            player
                .discord_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ];

        match table
            .rows
            .iter()
            .find(|row| row.player.ign.eq_ignore_ascii_case(&player.ign))
        {
            Some(row) => {
                let range = format!("{}!A{row}:C{row}", ROSTER_SHEET, row = row.sheet_row);
                self.client
                    .update_range(&range, vec![identity])
                    .await
                    .map_err(storage_err)?;
            }
            None => {
                self.client
                    .append_rows(&format!("{}!A1:C1", ROSTER_SHEET), vec![identity])
                    .await
                    .map_err(storage_err)?;
            }
        }
        self.cache.invalidate_sheet(ROSTER_SHEET);
        Ok(())
    }

    async fn rename_player(&self, old_ign: &str, new_ign: &str) -> Result<(), RosterError> {
        let table = self.load_roster().await?;
        let row = Self::row_of(&table, old_ign)?;
        let cell = format!("{}!A{}", ROSTER_SHEET, row.sheet_row);
        self.update_cell(&cell, new_ign.to_string()).await
    }

    async fn remove_player(&self, ign: &str) -> Result<(), RosterError> {
        let table = self.load_roster().await?;
        let row = Self::row_of(&table, ign)?;
        // Clearing instead of deleting keeps every other row number
        // stable; parsing skips blank rows.
        let range = format!("{}!A{row}:ZZ{row}", ROSTER_SHEET, row = row.sheet_row);
        self.client.clear_range(&range).await.map_err(storage_err)?;
        self.cache.invalidate_sheet(ROSTER_SHEET);
        Ok(())
    }

    async fn archive_departed(
        &self,
        players: &[Player],
        reason: DepartureReason,
    ) -> Result<(), RosterError> {
        let departed_at = Utc::now().to_rfc3339();
        let rows: Vec<Vec<String>> = players
            .iter()
            .map(|player| {
                vec![
                    player.ign.clone(),
                    player.discord_username.clone().unwrap_or_default(),
                    player
                        .discord_id
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    reason.as_str().to_string(),
                    departed_at.clone(),
                ]
            })
            .collect();

        self.client
            .append_rows(&format!("{}!A1:E1", DEPARTED_SHEET), rows)
            .await
            .map_err(storage_err)
    }

    async fn record_score(
        &self,
        ign: &str,
        week: &WeekKey,
        score: u64,
    ) -> Result<(), RosterError> {
        let table = self.load_roster().await?;

        let col = match table.weeks.iter().find(|(_, w)| w == week) {
            Some((col, _)) => *col,
            None => {
                // New week: add a header cell in the next free column.
                let col = next_week_column(&table.weeks);
                let header_cell = format!("{}!{}1", ROSTER_SHEET, column_letter(col));
                self.client
                    .update_range(&header_cell, vec![vec![week.to_string()]])
                    .await
                    .map_err(storage_err)?;
                col
            }
        };

        let row = Self::row_of(&table, ign)?.sheet_row;
        let cell = format!("{}!{}{}", ROSTER_SHEET, column_letter(col), row);
        self.update_cell(&cell, score.to_string()).await
    }

    async fn score_history(
        &self,
        ign: &str,
    ) -> Result<Vec<(WeekKey, Option<u64>)>, RosterError> {
        let table = self.load_roster().await?;
        let row = Self::row_of(&table, ign)?;
        Ok(table
            .weeks
            .iter()
            .zip(row.scores.iter())
            .map(|((_, week), score)| (*week, *score))
            .collect())
    }

    async fn scores_for_week(
        &self,
        week: &WeekKey,
    ) -> Result<Vec<(Player, Option<u64>)>, RosterError> {
        let table = self.load_roster().await?;
        let position = table.weeks.iter().position(|(_, w)| w == week);
        Ok(table
            .rows
            .into_iter()
            .map(|row| {
                let score = position.and_then(|i| row.scores[i]);
                (row.player, score)
            })
            .collect())
    }

    async fn weeks(&self) -> Result<Vec<WeekKey>, RosterError> {
        let table = self.load_roster().await?;
        Ok(table.weeks.into_iter().map(|(_, week)| week).collect())
    }

    async fn weekly_totals(&self) -> Result<Vec<(WeekKey, u64)>, RosterError> {
        let table = self.load_roster().await?;
        Ok(table
            .weeks
            .iter()
            .enumerate()
            .map(|(i, (_, week))| {
                let total = table
                    .rows
                    .iter()
                    .filter_map(|row| row.scores[i])
                    .sum();
                (*week, total)
            })
            .collect())
    }
}

// ============================================================================
// SETTINGS STORE IMPLEMENTATION
// ============================================================================

fn settings_err(e: SheetError) -> SetupError {
    SetupError::Storage(e.to_string())
}

#[async_trait]
impl ProfileStore for SheetRosterStore {
    async fn get_profile(&self, guild_id: u64) -> Result<Option<GuildProfile>, SetupError> {
        let values = match self.cache.get(SETTINGS_RANGE) {
            Some(values) => values,
            None => {
                let values = self
                    .client
                    .get_range(SETTINGS_RANGE)
                    .await
                    .map_err(settings_err)?;
                self.cache.put(SETTINGS_RANGE, values.clone());
                values
            }
        };

        for row in values.iter().skip(1) {
            if cell(row, 0).parse::<u64>() != Ok(guild_id) {
                continue;
            }
            let world: World = cell(row, 2).parse()?;
            let setup_at = chrono::DateTime::parse_from_rfc3339(&cell(row, 4))
                .map_err(|e| SetupError::Storage(format!("Bad setup timestamp: {}", e)))?
                .with_timezone(&Utc);
            return Ok(Some(GuildProfile {
                guild_id,
                guild_name: cell(row, 1),
                world,
                setup_by: cell(row, 3).parse().unwrap_or(0),
                setup_at,
            }));
        }
        Ok(None)
    }

    async fn save_profile(&self, profile: &GuildProfile) -> Result<(), SetupError> {
        let row = vec![
            profile.guild_id.to_string(),
            profile.guild_name.clone(),
            profile.world.to_string(),
            profile.setup_by.to_string(),
            profile.setup_at.to_rfc3339(),
        ];
        self.client
            .append_rows(&format!("{}!A1:E1", SETTINGS_SHEET), vec![row])
            .await
            .map_err(settings_err)?;
        self.cache.invalidate_sheet(SETTINGS_SHEET);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sheet() -> Vec<Vec<String>> {
        let row = |cells: &[&str]| cells.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        vec![
            row(&["IGN", "Discord Username", "Discord ID", "1/2/25", "01/09/2025"]),
            row(&["Aran", "aran_main", "111", "1,000,000", "2000000"]),
            // Cleared row from a kicked member.
            row(&["", "", "", "", ""]),
            row(&["Evan", "", "", "500000"]),
        ]
    }

    #[test]
    fn parsing_reads_players_and_weeks() {
        let table = parse_roster(&sample_sheet()).unwrap();

        assert_eq!(table.weeks.len(), 2);
        assert_eq!(table.weeks[0].1.to_string(), "01/02/2025");
        assert_eq!(table.weeks[1].1.to_string(), "01/09/2025");

        assert_eq!(table.rows.len(), 2);
        let aran = &table.rows[0];
        assert_eq!(aran.sheet_row, 2);
        assert_eq!(aran.player.discord_id, Some(111));
        assert_eq!(aran.scores, vec![Some(1_000_000), Some(2_000_000)]);

        // Evan has no Discord link and no score for the second week.
        let evan = &table.rows[1];
        assert_eq!(evan.sheet_row, 4);
        assert_eq!(evan.player.discord_id, None);
        assert_eq!(evan.scores, vec![Some(500_000), None]);
    }

    #[test]
    fn parsing_skips_cleared_rows_but_keeps_row_numbers() {
        let table = parse_roster(&sample_sheet()).unwrap();
        let rows: Vec<usize> = table.rows.iter().map(|r| r.sheet_row).collect();
        assert_eq!(rows, vec![2, 4]);
    }

    #[test]
    fn week_columns_are_sorted_by_date_not_position() {
        let row = |cells: &[&str]| cells.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        // A later week was inserted before an earlier one.
        let values = vec![row(&[
            "IGN",
            "Discord Username",
            "Discord ID",
            "01/16/2025",
            "01/09/2025",
        ])];
        let table = parse_roster(&values).unwrap();
        assert_eq!(table.weeks[0].0, 4);
        assert_eq!(table.weeks[1].0, 3);
    }

    #[test]
    fn non_week_header_columns_are_ignored() {
        let row = |cells: &[&str]| cells.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let values = vec![row(&[
            "IGN",
            "Discord Username",
            "Discord ID",
            "Notes",
            "01/09/2025",
        ])];
        let table = parse_roster(&values).unwrap();
        assert_eq!(table.weeks.len(), 1);
        assert_eq!(table.weeks[0].0, 4);
    }

    #[test]
    fn scores_tolerate_separators_and_garbage() {
        assert_eq!(clean_score("1,234,567"), Some(1_234_567));
        assert_eq!(clean_score("42"), Some(42));
        assert_eq!(clean_score(""), None);
        assert_eq!(clean_score("dnf"), None);
    }

    #[test]
    fn new_week_headers_append_after_the_rightmost_week() {
        let table = parse_roster(&sample_sheet()).unwrap();
        // Existing weeks sit in columns D and E (3 and 4); the next
        // header lands in F.
        assert_eq!(next_week_column(&table.weeks), 5);
        assert_eq!(column_letter(next_week_column(&table.weeks)), "F");

        // An empty sheet starts weeks right after the identity columns.
        assert_eq!(next_week_column(&[]), FIRST_WEEK_COL);

        // Chronological sorting must not move the append point: a later
        // week inserted left of an earlier one still appends after the
        // rightmost column.
        let week = |s: &str| WeekKey::parse(s).unwrap();
        let weeks = vec![(4, week("01/09/2025")), (3, week("01/16/2025"))];
        assert_eq!(next_week_column(&weeks), 5);
    }

    #[test]
    fn column_letters_cover_double_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(3), "D");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(51), "AZ");
        assert_eq!(column_letter(52), "BA");
    }
}
