//! Aggregation engine for football team statistics.
//!
//! Raw per-match observations (team-level and player-level metric values,
//! participations, match results) live behind the [`store`] read interface;
//! metric definitions live in the [`catalog`]. On top of those two
//! collaborators the engine computes derived metrics ([`resolver`]),
//! aggregated KPIs and timeseries ([`aggregate`]), two-period radar
//! comparisons ([`compare`]), player leaderboards ([`leaderboard`]) and
//! per-match summary grids ([`summary`]). The engine never writes.

pub mod aggregate;
pub mod catalog;
pub mod compare;
pub mod demo;
pub mod export;
pub mod formula;
pub mod leaderboard;
pub mod resolver;
pub mod store;
pub mod summary;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub i64);

/// Unique identifier for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

/// Unique identifier for a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchId(pub i64);

/// Unique identifier for a season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeasonId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SeasonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors surfaced by the engine and its stores.
///
/// Gaps that are part of normal operation are not errors: a metric slug the
/// catalog does not know is skipped from result lists, and a missing raw
/// value row reads as 0.0.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("match not found: {0}")]
    MatchNotFound(MatchId),

    /// A derived metric depends, directly or transitively, on itself.
    #[error("formula cycle detected at '{0}'")]
    FormulaCycle(String),

    /// A formula references a slug missing from the catalog. Unlike an
    /// unknown top-level slug this indicates a broken registry and is never
    /// swallowed.
    #[error("formula for '{formula}' references unknown metric '{reference}'")]
    UnknownFormulaRef { formula: String, reference: String },

    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A stored row failed to decode (bad date, unknown enum text).
    #[error("corrupt row in store: {0}")]
    CorruptRow(String),

    /// A write was rejected by defensive validation (derived slug, PERCENT
    /// out of range).
    #[error("rejected value for '{slug}': {reason}")]
    InvalidValue { slug: String, reason: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
