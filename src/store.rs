//! Raw value storage: matches, participations and per-match metric values.
//!
//! The engine only ever reads through [`RawValueStore`]; the write API on
//! [`SqliteStore`] exists for seeding and tests and re-validates the rules
//! the schema cannot express (raw-only writes, PERCENT range).

use std::path::Path;

use chrono::NaiveDate;
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde::{Deserialize, Serialize};

use crate::catalog::{MetricCatalog, MetricSide};
use crate::{EngineError, MatchId, PlayerId, Result, SeasonId, TeamId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchType {
    League,
    Cup,
    Friendly,
    Tournament,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::League => "LEAGUE",
            MatchType::Cup => "CUP",
            MatchType::Friendly => "FRIENDLY",
            MatchType::Tournament => "TOURNAMENT",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "LEAGUE" => Some(MatchType::League),
            "CUP" => Some(MatchType::Cup),
            "FRIENDLY" => Some(MatchType::Friendly),
            "TOURNAMENT" => Some(MatchType::Tournament),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub team_id: TeamId,
    pub season_id: SeasonId,
    pub date: NaiveDate,
    pub opponent_name: String,
    pub is_home: bool,
    pub match_type: MatchType,
    pub competition: Option<String>,
    pub score_for: Option<i32>,
    pub score_against: Option<i32>,
}

impl Match {
    /// Strictly more goals scored than conceded. Draws and matches without a
    /// recorded score count as not-won.
    pub fn is_win(&self) -> bool {
        matches!((self.score_for, self.score_against), (Some(f), Some(a)) if f > a)
    }
}

/// Match fields as supplied by a writer; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub team_id: TeamId,
    pub season_id: SeasonId,
    pub date: NaiveDate,
    pub opponent_name: String,
    pub is_home: bool,
    pub match_type: MatchType,
    pub competition: Option<String>,
    pub score_for: Option<i32>,
    pub score_against: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub team_id: TeamId,
    pub first_name: String,
    pub last_name: String,
    pub main_position: String,
}

impl Player {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participation {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub is_starter: bool,
    pub is_captain: bool,
    pub minutes_played: Option<i32>,
    pub position_played: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMetricRow {
    pub match_id: MatchId,
    pub metric_slug: String,
    pub side: MetricSide,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerMetricRow {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub metric_slug: String,
    pub value: f64,
}

/// Point lookups the derived-metric evaluator runs against: a live store or
/// a prefetched snapshot of one. A missing row reads as `None`; the absence
/// policy (zero) belongs to the evaluator, not the store.
pub trait ValueLookup {
    fn team_value(&self, match_id: MatchId, slug: &str, side: MetricSide) -> Result<Option<f64>>;
    fn player_value(&self, match_id: MatchId, player_id: PlayerId, slug: &str)
    -> Result<Option<f64>>;
}

/// Read interface the engine consumes. Implementations return matches ordered
/// by date (ascending, id as tie-break).
pub trait RawValueStore: ValueLookup {
    fn match_by_id(&self, id: MatchId) -> Result<Option<Match>>;

    fn list_matches(
        &self,
        team_id: TeamId,
        season_id: Option<SeasonId>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<Match>>;

    fn sum_team_values(&self, match_ids: &[MatchId], slug: &str, side: MetricSide) -> Result<f64>;

    /// Mean over rows that exist; `None` when no row matches.
    fn mean_team_values(
        &self,
        match_ids: &[MatchId],
        slug: &str,
        side: MetricSide,
    ) -> Result<Option<f64>>;

    fn sum_player_values(&self, match_ids: &[MatchId], player_id: PlayerId, slug: &str)
    -> Result<f64>;

    fn count_participations(&self, player_id: PlayerId, match_ids: &[MatchId]) -> Result<usize>;

    fn players_for_team(&self, team_id: TeamId) -> Result<Vec<Player>>;

    /// Participations for one match joined with player identity, ordered by
    /// player last name then first name.
    fn participations_with_players(&self, match_id: MatchId)
    -> Result<Vec<(Participation, Player)>>;

    fn team_metric_rows(&self, match_id: MatchId) -> Result<Vec<TeamMetricRow>>;

    /// Player metric rows for one match joined with player identity.
    fn player_metric_rows(&self, match_id: MatchId) -> Result<Vec<(PlayerMetricRow, Player)>>;

    /// Bulk reads used to prefetch a whole match set before derived
    /// evaluation, so per-match resolution never goes back to the database.
    fn team_values_for_matches(&self, match_ids: &[MatchId]) -> Result<Vec<TeamMetricRow>>;

    fn player_values_for_matches(&self, match_ids: &[MatchId]) -> Result<Vec<PlayerMetricRow>>;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
CREATE TABLE IF NOT EXISTS teams (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS seasons (
    id INTEGER PRIMARY KEY,
    label TEXT NOT NULL UNIQUE,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY,
    team_id INTEGER NOT NULL REFERENCES teams(id),
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    main_position TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS matches (
    id INTEGER PRIMARY KEY,
    team_id INTEGER NOT NULL REFERENCES teams(id),
    season_id INTEGER NOT NULL REFERENCES seasons(id),
    date TEXT NOT NULL,
    opponent_name TEXT NOT NULL,
    is_home INTEGER NOT NULL,
    match_type TEXT NOT NULL,
    competition TEXT NULL,
    score_for INTEGER NULL,
    score_against INTEGER NULL
);
CREATE TABLE IF NOT EXISTS participations (
    match_id INTEGER NOT NULL REFERENCES matches(id),
    player_id INTEGER NOT NULL REFERENCES players(id),
    is_starter INTEGER NOT NULL,
    is_captain INTEGER NOT NULL,
    minutes_played INTEGER NULL,
    position_played TEXT NULL,
    UNIQUE(match_id, player_id)
);
CREATE TABLE IF NOT EXISTS team_metric_values (
    match_id INTEGER NOT NULL REFERENCES matches(id),
    metric_slug TEXT NOT NULL,
    side TEXT NOT NULL,
    value REAL NOT NULL,
    UNIQUE(match_id, metric_slug, side)
);
CREATE TABLE IF NOT EXISTS player_metric_values (
    match_id INTEGER NOT NULL REFERENCES matches(id),
    player_id INTEGER NOT NULL REFERENCES players(id),
    metric_slug TEXT NOT NULL,
    value REAL NOT NULL,
    UNIQUE(match_id, player_id, metric_slug)
);
CREATE INDEX IF NOT EXISTS idx_matches_team_date ON matches(team_id, date);
CREATE INDEX IF NOT EXISTS idx_team_values_slug ON team_metric_values(metric_slug, side);
CREATE INDEX IF NOT EXISTS idx_player_values_player ON player_metric_values(player_id, metric_slug);
CREATE INDEX IF NOT EXISTS idx_participations_player ON participations(player_id);
"#;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let store = SqliteStore { conn };
        store.init_schema()?;
        debug!("opened sqlite store at {}", path.display());
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Write API (seeding and tests)
    // ------------------------------------------------------------------

    pub fn insert_team(&self, name: &str) -> Result<TeamId> {
        self.conn
            .execute("INSERT INTO teams (name) VALUES (?1)", params![name])?;
        Ok(TeamId(self.conn.last_insert_rowid()))
    }

    pub fn insert_season(&self, label: &str, start: NaiveDate, end: NaiveDate) -> Result<SeasonId> {
        self.conn.execute(
            "INSERT INTO seasons (label, start_date, end_date) VALUES (?1, ?2, ?3)",
            params![label, start.to_string(), end.to_string()],
        )?;
        Ok(SeasonId(self.conn.last_insert_rowid()))
    }

    pub fn insert_player(
        &self,
        team_id: TeamId,
        first_name: &str,
        last_name: &str,
        main_position: &str,
    ) -> Result<PlayerId> {
        self.conn.execute(
            "INSERT INTO players (team_id, first_name, last_name, main_position)
             VALUES (?1, ?2, ?3, ?4)",
            params![team_id.0, first_name, last_name, main_position],
        )?;
        Ok(PlayerId(self.conn.last_insert_rowid()))
    }

    pub fn insert_match(&self, new: &NewMatch) -> Result<MatchId> {
        self.conn.execute(
            "INSERT INTO matches
             (team_id, season_id, date, opponent_name, is_home, match_type, competition,
              score_for, score_against)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                new.team_id.0,
                new.season_id.0,
                new.date.to_string(),
                new.opponent_name,
                new.is_home,
                new.match_type.as_str(),
                new.competition,
                new.score_for,
                new.score_against,
            ],
        )?;
        Ok(MatchId(self.conn.last_insert_rowid()))
    }

    pub fn insert_participation(&self, participation: &Participation) -> Result<()> {
        self.conn.execute(
            "INSERT INTO participations
             (match_id, player_id, is_starter, is_captain, minutes_played, position_played)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(match_id, player_id) DO UPDATE SET
                 is_starter = excluded.is_starter,
                 is_captain = excluded.is_captain,
                 minutes_played = excluded.minutes_played,
                 position_played = excluded.position_played",
            params![
                participation.match_id.0,
                participation.player_id.0,
                participation.is_starter,
                participation.is_captain,
                participation.minutes_played,
                participation.position_played,
            ],
        )?;
        Ok(())
    }

    pub fn upsert_team_value(
        &self,
        catalog: &MetricCatalog,
        match_id: MatchId,
        slug: &str,
        side: MetricSide,
        value: f64,
    ) -> Result<()> {
        catalog.check_value(slug, value)?;
        self.conn.execute(
            "INSERT INTO team_metric_values (match_id, metric_slug, side, value)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(match_id, metric_slug, side) DO UPDATE SET value = excluded.value",
            params![match_id.0, slug, side.as_str(), value],
        )?;
        Ok(())
    }

    pub fn upsert_player_value(
        &self,
        catalog: &MetricCatalog,
        match_id: MatchId,
        player_id: PlayerId,
        slug: &str,
        value: f64,
    ) -> Result<()> {
        catalog.check_value(slug, value)?;
        self.conn.execute(
            "INSERT INTO player_metric_values (match_id, player_id, metric_slug, value)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(match_id, player_id, metric_slug) DO UPDATE SET value = excluded.value",
            params![match_id.0, player_id.0, slug, value],
        )?;
        Ok(())
    }
}

const MATCH_COLUMNS: &str =
    "id, team_id, season_id, date, opponent_name, is_home, match_type, competition, \
     score_for, score_against";

type RawMatchRow =
    (i64, i64, i64, String, String, bool, String, Option<String>, Option<i32>, Option<i32>);

fn match_from_raw(raw: RawMatchRow) -> Result<Match> {
    let (id, team_id, season_id, date, opponent_name, is_home, match_type, competition, score_for, score_against) =
        raw;
    let date = parse_date(&date)?;
    let match_type = MatchType::parse(&match_type)
        .ok_or_else(|| EngineError::CorruptRow(format!("unknown match type '{match_type}'")))?;
    Ok(Match {
        id: MatchId(id),
        team_id: TeamId(team_id),
        season_id: SeasonId(season_id),
        date,
        opponent_name,
        is_home,
        match_type,
        competition,
        score_for,
        score_against,
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    raw.parse()
        .map_err(|_| EngineError::CorruptRow(format!("bad date '{raw}'")))
}

fn parse_side(raw: &str) -> Result<MetricSide> {
    MetricSide::parse(raw)
        .ok_or_else(|| EngineError::CorruptRow(format!("unknown metric side '{raw}'")))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

fn id_values(match_ids: &[MatchId]) -> impl Iterator<Item = SqlValue> + '_ {
    match_ids.iter().map(|id| SqlValue::Integer(id.0))
}

impl ValueLookup for SqliteStore {
    fn team_value(&self, match_id: MatchId, slug: &str, side: MetricSide) -> Result<Option<f64>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM team_metric_values
                 WHERE match_id = ?1 AND metric_slug = ?2 AND side = ?3",
                params![match_id.0, slug, side.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn player_value(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
        slug: &str,
    ) -> Result<Option<f64>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM player_metric_values
                 WHERE match_id = ?1 AND player_id = ?2 AND metric_slug = ?3",
                params![match_id.0, player_id.0, slug],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl RawValueStore for SqliteStore {
    fn match_by_id(&self, id: MatchId) -> Result<Option<Match>> {
        let raw: Option<RawMatchRow> = self
            .conn
            .query_row(
                &format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1"),
                params![id.0],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                    ))
                },
            )
            .optional()?;
        raw.map(match_from_raw).transpose()
    }

    fn list_matches(
        &self,
        team_id: TeamId,
        season_id: Option<SeasonId>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<Match>> {
        let mut sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE team_id = ?");
        let mut binds: Vec<SqlValue> = vec![SqlValue::Integer(team_id.0)];
        if let Some(season) = season_id {
            sql.push_str(" AND season_id = ?");
            binds.push(SqlValue::Integer(season.0));
        }
        if let Some(from) = date_from {
            sql.push_str(" AND date >= ?");
            binds.push(SqlValue::Text(from.to_string()));
        }
        if let Some(to) = date_to {
            sql.push_str(" AND date <= ?");
            binds.push(SqlValue::Text(to.to_string()));
        }
        sql.push_str(" ORDER BY date, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds), |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
            ))
        })?;

        let mut matches = Vec::new();
        for raw in rows {
            matches.push(match_from_raw(raw?)?);
        }
        Ok(matches)
    }

    fn sum_team_values(&self, match_ids: &[MatchId], slug: &str, side: MetricSide) -> Result<f64> {
        if match_ids.is_empty() {
            return Ok(0.0);
        }
        let sql = format!(
            "SELECT COALESCE(SUM(value), 0.0) FROM team_metric_values
             WHERE metric_slug = ? AND side = ? AND match_id IN ({})",
            placeholders(match_ids.len())
        );
        let mut binds: Vec<SqlValue> =
            vec![SqlValue::Text(slug.to_string()), SqlValue::Text(side.as_str().to_string())];
        binds.extend(id_values(match_ids));
        let total = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(total)
    }

    fn mean_team_values(
        &self,
        match_ids: &[MatchId],
        slug: &str,
        side: MetricSide,
    ) -> Result<Option<f64>> {
        if match_ids.is_empty() {
            return Ok(None);
        }
        let sql = format!(
            "SELECT AVG(value) FROM team_metric_values
             WHERE metric_slug = ? AND side = ? AND match_id IN ({})",
            placeholders(match_ids.len())
        );
        let mut binds: Vec<SqlValue> =
            vec![SqlValue::Text(slug.to_string()), SqlValue::Text(side.as_str().to_string())];
        binds.extend(id_values(match_ids));
        let mean = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(mean)
    }

    fn sum_player_values(
        &self,
        match_ids: &[MatchId],
        player_id: PlayerId,
        slug: &str,
    ) -> Result<f64> {
        if match_ids.is_empty() {
            return Ok(0.0);
        }
        let sql = format!(
            "SELECT COALESCE(SUM(value), 0.0) FROM player_metric_values
             WHERE player_id = ? AND metric_slug = ? AND match_id IN ({})",
            placeholders(match_ids.len())
        );
        let mut binds: Vec<SqlValue> =
            vec![SqlValue::Integer(player_id.0), SqlValue::Text(slug.to_string())];
        binds.extend(id_values(match_ids));
        let total = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(total)
    }

    fn count_participations(&self, player_id: PlayerId, match_ids: &[MatchId]) -> Result<usize> {
        if match_ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "SELECT COUNT(*) FROM participations WHERE player_id = ? AND match_id IN ({})",
            placeholders(match_ids.len())
        );
        let mut binds: Vec<SqlValue> = vec![SqlValue::Integer(player_id.0)];
        binds.extend(id_values(match_ids));
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn players_for_team(&self, team_id: TeamId) -> Result<Vec<Player>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, team_id, first_name, last_name, main_position
             FROM players WHERE team_id = ?1 ORDER BY last_name, first_name",
        )?;
        let rows = stmt.query_map(params![team_id.0], |row| {
            Ok(Player {
                id: PlayerId(row.get(0)?),
                team_id: TeamId(row.get(1)?),
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                main_position: row.get(4)?,
            })
        })?;
        let mut players = Vec::new();
        for player in rows {
            players.push(player?);
        }
        Ok(players)
    }

    fn participations_with_players(
        &self,
        match_id: MatchId,
    ) -> Result<Vec<(Participation, Player)>> {
        let mut stmt = self.conn.prepare(
            "SELECT pa.match_id, pa.player_id, pa.is_starter, pa.is_captain,
                    pa.minutes_played, pa.position_played,
                    pl.id, pl.team_id, pl.first_name, pl.last_name, pl.main_position
             FROM participations pa
             JOIN players pl ON pa.player_id = pl.id
             WHERE pa.match_id = ?1
             ORDER BY pl.last_name, pl.first_name",
        )?;
        let rows = stmt.query_map(params![match_id.0], |row| {
            Ok((
                Participation {
                    match_id: MatchId(row.get(0)?),
                    player_id: PlayerId(row.get(1)?),
                    is_starter: row.get(2)?,
                    is_captain: row.get(3)?,
                    minutes_played: row.get(4)?,
                    position_played: row.get(5)?,
                },
                Player {
                    id: PlayerId(row.get(6)?),
                    team_id: TeamId(row.get(7)?),
                    first_name: row.get(8)?,
                    last_name: row.get(9)?,
                    main_position: row.get(10)?,
                },
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn team_metric_rows(&self, match_id: MatchId) -> Result<Vec<TeamMetricRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT match_id, metric_slug, side, value FROM team_metric_values
             WHERE match_id = ?1 ORDER BY metric_slug, side",
        )?;
        let rows = stmt.query_map(params![match_id.0], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?, row.get::<_, f64>(3)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (mid, slug, side, value) = row?;
            out.push(TeamMetricRow {
                match_id: MatchId(mid),
                metric_slug: slug,
                side: parse_side(&side)?,
                value,
            });
        }
        Ok(out)
    }

    fn player_metric_rows(&self, match_id: MatchId) -> Result<Vec<(PlayerMetricRow, Player)>> {
        let mut stmt = self.conn.prepare(
            "SELECT v.match_id, v.player_id, v.metric_slug, v.value,
                    pl.id, pl.team_id, pl.first_name, pl.last_name, pl.main_position
             FROM player_metric_values v
             JOIN players pl ON v.player_id = pl.id
             WHERE v.match_id = ?1
             ORDER BY pl.last_name, pl.first_name, v.metric_slug",
        )?;
        let rows = stmt.query_map(params![match_id.0], |row| {
            Ok((
                PlayerMetricRow {
                    match_id: MatchId(row.get(0)?),
                    player_id: PlayerId(row.get(1)?),
                    metric_slug: row.get(2)?,
                    value: row.get(3)?,
                },
                Player {
                    id: PlayerId(row.get(4)?),
                    team_id: TeamId(row.get(5)?),
                    first_name: row.get(6)?,
                    last_name: row.get(7)?,
                    main_position: row.get(8)?,
                },
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn team_values_for_matches(&self, match_ids: &[MatchId]) -> Result<Vec<TeamMetricRow>> {
        if match_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT match_id, metric_slug, side, value FROM team_metric_values
             WHERE match_id IN ({})",
            placeholders(match_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(id_values(match_ids)), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?, row.get::<_, f64>(3)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (mid, slug, side, value) = row?;
            out.push(TeamMetricRow {
                match_id: MatchId(mid),
                metric_slug: slug,
                side: parse_side(&side)?,
                value,
            });
        }
        Ok(out)
    }

    fn player_values_for_matches(&self, match_ids: &[MatchId]) -> Result<Vec<PlayerMetricRow>> {
        if match_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT match_id, player_id, metric_slug, value FROM player_metric_values
             WHERE match_id IN ({})",
            placeholders(match_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(id_values(match_ids)), |row| {
            Ok(PlayerMetricRow {
                match_id: MatchId(row.get(0)?),
                player_id: PlayerId(row.get(1)?),
                metric_slug: row.get(2)?,
                value: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Plain-vector store for tests and benches.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub matches: Vec<Match>,
    pub players: Vec<Player>,
    pub participations: Vec<Participation>,
    pub team_values: Vec<TeamMetricRow>,
    pub player_values: Vec<PlayerMetricRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_match(&mut self, m: Match) {
        self.matches.push(m);
    }

    pub fn add_player(&mut self, player: Player) {
        self.players.push(player);
    }

    pub fn add_participation(&mut self, participation: Participation) {
        self.participations.push(participation);
    }

    pub fn add_team_value(&mut self, match_id: MatchId, slug: &str, side: MetricSide, value: f64) {
        self.team_values.push(TeamMetricRow {
            match_id,
            metric_slug: slug.to_string(),
            side,
            value,
        });
    }

    pub fn add_player_value(
        &mut self,
        match_id: MatchId,
        player_id: PlayerId,
        slug: &str,
        value: f64,
    ) {
        self.player_values.push(PlayerMetricRow {
            match_id,
            player_id,
            metric_slug: slug.to_string(),
            value,
        });
    }

    fn player_by_id(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }
}

impl ValueLookup for MemoryStore {
    fn team_value(&self, match_id: MatchId, slug: &str, side: MetricSide) -> Result<Option<f64>> {
        Ok(self
            .team_values
            .iter()
            .find(|r| r.match_id == match_id && r.metric_slug == slug && r.side == side)
            .map(|r| r.value))
    }

    fn player_value(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
        slug: &str,
    ) -> Result<Option<f64>> {
        Ok(self
            .player_values
            .iter()
            .find(|r| r.match_id == match_id && r.player_id == player_id && r.metric_slug == slug)
            .map(|r| r.value))
    }
}

impl RawValueStore for MemoryStore {
    fn match_by_id(&self, id: MatchId) -> Result<Option<Match>> {
        Ok(self.matches.iter().find(|m| m.id == id).cloned())
    }

    fn list_matches(
        &self,
        team_id: TeamId,
        season_id: Option<SeasonId>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .matches
            .iter()
            .filter(|m| m.team_id == team_id)
            .filter(|m| season_id.is_none_or(|s| m.season_id == s))
            .filter(|m| date_from.is_none_or(|from| m.date >= from))
            .filter(|m| date_to.is_none_or(|to| m.date <= to))
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.date, m.id));
        Ok(matches)
    }

    fn sum_team_values(&self, match_ids: &[MatchId], slug: &str, side: MetricSide) -> Result<f64> {
        Ok(self
            .team_values
            .iter()
            .filter(|r| r.metric_slug == slug && r.side == side && match_ids.contains(&r.match_id))
            .map(|r| r.value)
            .sum())
    }

    fn mean_team_values(
        &self,
        match_ids: &[MatchId],
        slug: &str,
        side: MetricSide,
    ) -> Result<Option<f64>> {
        let values: Vec<f64> = self
            .team_values
            .iter()
            .filter(|r| r.metric_slug == slug && r.side == side && match_ids.contains(&r.match_id))
            .map(|r| r.value)
            .collect();
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
    }

    fn sum_player_values(
        &self,
        match_ids: &[MatchId],
        player_id: PlayerId,
        slug: &str,
    ) -> Result<f64> {
        Ok(self
            .player_values
            .iter()
            .filter(|r| {
                r.player_id == player_id
                    && r.metric_slug == slug
                    && match_ids.contains(&r.match_id)
            })
            .map(|r| r.value)
            .sum())
    }

    fn count_participations(&self, player_id: PlayerId, match_ids: &[MatchId]) -> Result<usize> {
        Ok(self
            .participations
            .iter()
            .filter(|p| p.player_id == player_id && match_ids.contains(&p.match_id))
            .count())
    }

    fn players_for_team(&self, team_id: TeamId) -> Result<Vec<Player>> {
        let mut players: Vec<Player> = self
            .players
            .iter()
            .filter(|p| p.team_id == team_id)
            .cloned()
            .collect();
        players.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(players)
    }

    fn participations_with_players(
        &self,
        match_id: MatchId,
    ) -> Result<Vec<(Participation, Player)>> {
        let mut out: Vec<(Participation, Player)> = self
            .participations
            .iter()
            .filter(|p| p.match_id == match_id)
            .filter_map(|p| self.player_by_id(p.player_id).map(|pl| (p.clone(), pl.clone())))
            .collect();
        out.sort_by(|(_, a), (_, b)| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(out)
    }

    fn team_metric_rows(&self, match_id: MatchId) -> Result<Vec<TeamMetricRow>> {
        let mut rows: Vec<TeamMetricRow> = self
            .team_values
            .iter()
            .filter(|r| r.match_id == match_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.metric_slug.cmp(&b.metric_slug));
        Ok(rows)
    }

    fn player_metric_rows(&self, match_id: MatchId) -> Result<Vec<(PlayerMetricRow, Player)>> {
        let mut out: Vec<(PlayerMetricRow, Player)> = self
            .player_values
            .iter()
            .filter(|r| r.match_id == match_id)
            .filter_map(|r| self.player_by_id(r.player_id).map(|pl| (r.clone(), pl.clone())))
            .collect();
        out.sort_by(|(ra, a), (rb, b)| {
            (a.last_name.as_str(), a.first_name.as_str(), ra.metric_slug.as_str()).cmp(&(
                b.last_name.as_str(),
                b.first_name.as_str(),
                rb.metric_slug.as_str(),
            ))
        });
        Ok(out)
    }

    fn team_values_for_matches(&self, match_ids: &[MatchId]) -> Result<Vec<TeamMetricRow>> {
        Ok(self
            .team_values
            .iter()
            .filter(|r| match_ids.contains(&r.match_id))
            .cloned()
            .collect())
    }

    fn player_values_for_matches(&self, match_ids: &[MatchId]) -> Result<Vec<PlayerMetricRow>> {
        Ok(self
            .player_values
            .iter()
            .filter(|r| match_ids.contains(&r.match_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn match_type_round_trip() {
        for mt in [MatchType::League, MatchType::Cup, MatchType::Friendly, MatchType::Tournament] {
            assert_eq!(MatchType::parse(mt.as_str()), Some(mt));
        }
        assert_eq!(MatchType::parse("EXHIBITION"), None);
    }

    #[test]
    fn memory_store_list_matches_orders_by_date() {
        let mut store = MemoryStore::new();
        let team = TeamId(1);
        let season = SeasonId(1);
        for (id, day) in [(1, 20), (2, 5), (3, 12)] {
            store.add_match(Match {
                id: MatchId(id),
                team_id: team,
                season_id: season,
                date: date(2025, 9, day),
                opponent_name: format!("Opp {id}"),
                is_home: true,
                match_type: MatchType::League,
                competition: None,
                score_for: None,
                score_against: None,
            });
        }
        let matches = store.list_matches(team, None, None, None).unwrap();
        let ids: Vec<i64> = matches.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn mean_team_values_ignores_missing_rows() {
        let mut store = MemoryStore::new();
        store.add_team_value(MatchId(1), "team_possession_pct", MetricSide::Own, 60.0);
        store.add_team_value(MatchId(2), "team_possession_pct", MetricSide::Own, 40.0);
        // Match 3 has no row at all.
        let ids = [MatchId(1), MatchId(2), MatchId(3)];
        let mean = store
            .mean_team_values(&ids, "team_possession_pct", MetricSide::Own)
            .unwrap();
        assert_eq!(mean, Some(50.0));
        let none = store
            .mean_team_values(&ids, "team_pass_zone_att_pct", MetricSide::Own)
            .unwrap();
        assert_eq!(none, None);
    }
}
