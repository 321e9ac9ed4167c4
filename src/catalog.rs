//! Metric definitions and the catalog that serves them by slug.
//!
//! Definitions are seeded once and treated as immutable afterwards, so the
//! builtin catalog lives in a process-wide `Lazy` and is handed to engine
//! components explicitly instead of being reached for as global state.

use std::collections::HashMap;

use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

/// Granularity a metric is measured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricScope {
    Team,
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricCategory {
    Possession,
    Passes,
    Events,
    Combinations,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricDataType {
    Int,
    Float,
    Percent,
}

/// Whether a team-scope value describes the team's own performance or the
/// opposition's against it. Player-scope metrics carry `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricSide {
    Own,
    Opponent,
    None,
}

impl MetricScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricScope::Team => "TEAM",
            MetricScope::Player => "PLAYER",
        }
    }
}

impl MetricCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Possession => "POSSESSION",
            MetricCategory::Passes => "PASSES",
            MetricCategory::Events => "EVENTS",
            MetricCategory::Combinations => "COMBINATIONS",
            MetricCategory::General => "GENERAL",
        }
    }
}

impl MetricDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricDataType::Int => "INT",
            MetricDataType::Float => "FLOAT",
            MetricDataType::Percent => "PERCENT",
        }
    }
}

impl MetricSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricSide::Own => "OWN",
            MetricSide::Opponent => "OPPONENT",
            MetricSide::None => "NONE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "OWN" => Some(MetricSide::Own),
            "OPPONENT" => Some(MetricSide::Opponent),
            "NONE" => Some(MetricSide::None),
            _ => None,
        }
    }
}

/// One metric definition. A metric is either raw (values are stored per
/// match) or derived (values are always computed, never stored).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub slug: String,
    pub label: String,
    pub scope: MetricScope,
    pub category: MetricCategory,
    pub datatype: MetricDataType,
    pub unit: Option<String>,
    pub side: MetricSide,
    pub is_derived: bool,
    /// Display-only description of the derivation. The computations that
    /// actually run live in the formula registry.
    pub formula: Option<String>,
}

/// Slug-keyed lookup over a fixed definition set, preserving seed order.
#[derive(Debug, Clone, Default)]
pub struct MetricCatalog {
    defs: Vec<MetricDefinition>,
    by_slug: HashMap<String, usize>,
}

impl MetricCatalog {
    pub fn new(defs: Vec<MetricDefinition>) -> Self {
        let mut by_slug = HashMap::with_capacity(defs.len());
        for (idx, def) in defs.iter().enumerate() {
            if by_slug.insert(def.slug.clone(), idx).is_some() {
                warn!("duplicate metric slug '{}', later definition wins", def.slug);
            }
        }
        Self { defs, by_slug }
    }

    /// The seeded definition set shared by the whole process.
    pub fn builtin() -> &'static MetricCatalog {
        &BUILTIN
    }

    pub fn get(&self, slug: &str) -> Option<&MetricDefinition> {
        self.by_slug.get(slug).map(|idx| &self.defs[*idx])
    }

    pub fn list(
        &self,
        scope: Option<MetricScope>,
        category: Option<MetricCategory>,
        derived: Option<bool>,
    ) -> Vec<&MetricDefinition> {
        self.defs
            .iter()
            .filter(|def| scope.is_none_or(|s| def.scope == s))
            .filter(|def| category.is_none_or(|c| def.category == c))
            .filter(|def| derived.is_none_or(|d| def.is_derived == d))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Defensive re-validation of a value about to be stored. The persistence
    /// schema cannot express these rules, so writers go through here.
    pub fn check_value(&self, slug: &str, value: f64) -> Result<()> {
        let Some(def) = self.get(slug) else {
            return Err(EngineError::InvalidValue {
                slug: slug.to_string(),
                reason: "unknown metric".to_string(),
            });
        };
        if def.is_derived {
            return Err(EngineError::InvalidValue {
                slug: slug.to_string(),
                reason: "derived metrics have no stored values".to_string(),
            });
        }
        if !value.is_finite() {
            return Err(EngineError::InvalidValue {
                slug: slug.to_string(),
                reason: "value must be finite".to_string(),
            });
        }
        if def.datatype == MetricDataType::Percent && !(0.0..=100.0).contains(&value) {
            return Err(EngineError::InvalidValue {
                slug: slug.to_string(),
                reason: format!("PERCENT value {value} outside [0, 100]"),
            });
        }
        Ok(())
    }
}

static BUILTIN: Lazy<MetricCatalog> = Lazy::new(|| MetricCatalog::new(builtin_defs()));

fn raw(
    slug: &str,
    label: &str,
    scope: MetricScope,
    category: MetricCategory,
    datatype: MetricDataType,
    unit: &str,
    side: MetricSide,
) -> MetricDefinition {
    MetricDefinition {
        slug: slug.to_string(),
        label: label.to_string(),
        scope,
        category,
        datatype,
        unit: Some(unit.to_string()),
        side,
        is_derived: false,
        formula: None,
    }
}

fn derived(
    slug: &str,
    label: &str,
    scope: MetricScope,
    datatype: MetricDataType,
    unit: &str,
    side: MetricSide,
    formula: &str,
) -> MetricDefinition {
    MetricDefinition {
        slug: slug.to_string(),
        label: label.to_string(),
        scope,
        category: MetricCategory::Combinations,
        datatype,
        unit: Some(unit.to_string()),
        side,
        is_derived: true,
        formula: Some(formula.to_string()),
    }
}

fn builtin_defs() -> Vec<MetricDefinition> {
    use MetricCategory::{Events, General, Passes, Possession};
    use MetricDataType::{Float, Int, Percent};
    use MetricScope::{Player, Team};
    use MetricSide::{None, Opponent, Own};

    vec![
        // Player, general
        raw("player_matches", "Matches played", Player, General, Int, "count", None),
        raw("player_starts", "Starts", Player, General, Int, "count", None),
        raw("player_captaincies", "Captain appearances", Player, General, Int, "count", None),
        raw("player_motm", "Player of the match", Player, General, Int, "count", None),
        // Player, events
        raw("player_total_events", "Total events", Player, Events, Int, "count", None),
        raw("player_goals", "Goals", Player, Events, Int, "count", None),
        raw("player_shots", "Shots", Player, Events, Int, "count", None),
        raw("player_corners", "Corners", Player, Events, Int, "count", None),
        raw("player_free_kicks", "Free kicks", Player, Events, Int, "count", None),
        raw("player_goal_kicks", "Goal kicks", Player, Events, Int, "count", None),
        raw("player_penalties", "Penalties", Player, Events, Int, "count", None),
        raw("player_goal_assists", "Assists", Player, Events, Int, "count", None),
        raw("player_throw_ins", "Throw-ins", Player, Events, Int, "count", None),
        // Player, derived
        derived("player_attempts", "Attempts", Player, Int, "count", None, "goals + shots"),
        derived(
            "player_conversion_rate",
            "Conversion rate",
            Player,
            Percent,
            "%",
            None,
            "goals / attempts * 100",
        ),
        derived(
            "player_goal_involvements",
            "Goal involvements",
            Player,
            Int,
            "count",
            None,
            "goals + assists",
        ),
        // Team, possession
        raw("team_possession_pct", "Possession (%)", Team, Possession, Percent, "%", Own),
        raw(
            "team_possession_minutes",
            "Possession (minutes)",
            Team,
            Possession,
            Float,
            "minutes",
            Own,
        ),
        raw("team_possession_won", "Possessions won", Team, Possession, Int, "count", Own),
        raw(
            "team_possession_third_def_pct",
            "Possession, defensive third (%)",
            Team,
            Possession,
            Percent,
            "%",
            Own,
        ),
        raw(
            "team_possession_third_mid_pct",
            "Possession, middle third (%)",
            Team,
            Possession,
            Percent,
            "%",
            Own,
        ),
        raw(
            "team_possession_third_att_pct",
            "Possession, attacking third (%)",
            Team,
            Possession,
            Percent,
            "%",
            Own,
        ),
        // Team, passes
        raw(
            "team_pass_zone_def_pct",
            "Passes, defensive zone (%)",
            Team,
            Passes,
            Percent,
            "%",
            Own,
        ),
        raw("team_pass_zone_mid_pct", "Passes, middle zone (%)", Team, Passes, Percent, "%", Own),
        raw(
            "team_pass_zone_att_pct",
            "Passes, attacking zone (%)",
            Team,
            Passes,
            Percent,
            "%",
            Own,
        ),
        raw("team_passes_completed", "Completed passes", Team, Passes, Int, "count", Own),
        raw("team_sequences_3_5", "Sequences of 3-5 passes", Team, Passes, Int, "count", Own),
        raw("team_sequences_6_plus", "Sequences of 6+ passes", Team, Passes, Int, "count", Own),
        raw("team_longest_sequence", "Longest pass sequence", Team, Passes, Int, "count", Own),
        // Team, events
        raw("team_goals_scored", "Goals scored", Team, Events, Int, "count", Own),
        raw("team_goals_conceded", "Goals conceded", Team, Events, Int, "count", Opponent),
        raw("team_free_kicks", "Free kicks", Team, Events, Int, "count", Own),
        raw("team_shots", "Shots", Team, Events, Int, "count", Own),
        raw("team_shots_conceded", "Shots conceded", Team, Events, Int, "count", Opponent),
        raw("team_corners", "Corners", Team, Events, Int, "count", Own),
        raw("team_goal_kicks", "Goal kicks", Team, Events, Int, "count", Own),
        raw("team_throw_ins", "Throw-ins", Team, Events, Int, "count", Own),
        // Team, derived
        derived("team_attempts", "Total attempts", Team, Int, "count", Own, "goals_scored + shots"),
        derived(
            "team_conversion_rate",
            "Conversion rate",
            Team,
            Percent,
            "%",
            Own,
            "goals_scored / attempts * 100",
        ),
        derived(
            "team_attempts_conceded",
            "Attempts conceded",
            Team,
            Int,
            "count",
            Opponent,
            "goals_conceded + shots_conceded",
        ),
        derived(
            "team_offensive_events",
            "Offensive events",
            Team,
            Int,
            "count",
            Own,
            "goals_scored + corners + free_kicks + shots",
        ),
        derived(
            "team_defensive_events",
            "Defensive events",
            Team,
            Int,
            "count",
            Opponent,
            "goals_conceded + shots_conceded",
        ),
        derived(
            "team_win_rate",
            "Win rate",
            Team,
            Percent,
            "%",
            Own,
            "wins / total_matches * 100",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_known_slugs() {
        let catalog = MetricCatalog::builtin();
        let goals = catalog.get("team_goals_scored").expect("seeded");
        assert_eq!(goals.scope, MetricScope::Team);
        assert_eq!(goals.side, MetricSide::Own);
        assert!(!goals.is_derived);

        let conversion = catalog.get("player_conversion_rate").expect("seeded");
        assert!(conversion.is_derived);
        assert_eq!(conversion.datatype, MetricDataType::Percent);

        assert!(catalog.get("team_expected_goals").is_none());
    }

    #[test]
    fn list_filters_by_scope_and_derived() {
        let catalog = MetricCatalog::builtin();
        let derived_player = catalog.list(Some(MetricScope::Player), None, Some(true));
        let slugs: Vec<&str> = derived_player.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec!["player_attempts", "player_conversion_rate", "player_goal_involvements"]
        );
    }

    #[test]
    fn check_value_rejects_out_of_range_percent() {
        let catalog = MetricCatalog::builtin();
        assert!(catalog.check_value("team_possession_pct", 54.5).is_ok());
        assert!(catalog.check_value("team_possession_pct", 104.0).is_err());
        assert!(catalog.check_value("team_possession_pct", -1.0).is_err());
    }

    #[test]
    fn check_value_rejects_derived_writes() {
        let catalog = MetricCatalog::builtin();
        let err = catalog.check_value("team_attempts", 3.0).unwrap_err();
        assert!(matches!(err, crate::EngineError::InvalidValue { .. }));
    }
}
