//! Executable formula registry for derived metrics.
//!
//! The catalog's free-text `formula` strings are documentation; what actually
//! runs is the typed expression registered here per slug. Keeping the table
//! separate from the catalog lets the dependency graph be validated and
//! evaluated in isolation.

use once_cell::sync::Lazy;

use crate::catalog::{MetricCatalog, MetricSide};
use crate::{EngineError, Result};

/// Reference to another metric inside a formula. The referenced slug may be
/// raw or itself derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricRef {
    pub slug: &'static str,
    pub side: MetricSide,
}

impl MetricRef {
    pub const fn own(slug: &'static str) -> Self {
        Self { slug, side: MetricSide::Own }
    }

    pub const fn opponent(slug: &'static str) -> Self {
        Self { slug, side: MetricSide::Opponent }
    }

    /// Player-scope reference; side is not meaningful there.
    pub const fn plain(slug: &'static str) -> Self {
        Self { slug, side: MetricSide::None }
    }
}

/// A derived metric's computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    /// Sum of the referenced per-match values.
    Sum(&'static [MetricRef]),
    /// `num / den * 100`, or 0 when the denominator is 0.
    PercentRatio { num: MetricRef, den: MetricRef },
}

impl Formula {
    pub fn refs(&self) -> Vec<MetricRef> {
        match self {
            Formula::Sum(refs) => refs.to_vec(),
            Formula::PercentRatio { num, den } => vec![*num, *den],
        }
    }
}

/// Slug -> formula table.
#[derive(Debug, Clone, Default)]
pub struct FormulaSet {
    entries: Vec<(&'static str, Formula)>,
}

impl FormulaSet {
    pub fn new(entries: Vec<(&'static str, Formula)>) -> Self {
        Self { entries }
    }

    /// The fixed computations shipped with the builtin catalog.
    pub fn builtin() -> &'static FormulaSet {
        &BUILTIN
    }

    pub fn get(&self, slug: &str) -> Option<&Formula> {
        self.entries
            .iter()
            .find(|(entry_slug, _)| *entry_slug == slug)
            .map(|(_, formula)| formula)
    }

    /// Walk every registered formula and verify the graph is acyclic and
    /// closed over `catalog`. Run at startup or in tests; evaluation repeats
    /// the same checks lazily.
    pub fn validate(&self, catalog: &MetricCatalog) -> Result<()> {
        for (slug, _) in &self.entries {
            self.check_from(catalog, slug, &mut Vec::new())?;
        }
        Ok(())
    }

    fn check_from(&self, catalog: &MetricCatalog, slug: &str, stack: &mut Vec<String>) -> Result<()> {
        if stack.iter().any(|seen| seen == slug) {
            return Err(EngineError::FormulaCycle(slug.to_string()));
        }
        let Some(formula) = self.get(slug) else {
            return Ok(());
        };
        stack.push(slug.to_string());
        for reference in formula.refs() {
            if catalog.get(reference.slug).is_none() {
                return Err(EngineError::UnknownFormulaRef {
                    formula: slug.to_string(),
                    reference: reference.slug.to_string(),
                });
            }
            self.check_from(catalog, reference.slug, stack)?;
        }
        stack.pop();
        Ok(())
    }
}

// team_win_rate is intentionally absent: it is a whole-period quantity
// computed from match results, not a per-match formula.
const BUILTIN_ENTRIES: &[(&str, Formula)] = &[
    (
        "team_attempts",
        Formula::Sum(&[MetricRef::own("team_goals_scored"), MetricRef::own("team_shots")]),
    ),
    (
        "team_conversion_rate",
        Formula::PercentRatio {
            num: MetricRef::own("team_goals_scored"),
            den: MetricRef::own("team_attempts"),
        },
    ),
    (
        "team_attempts_conceded",
        Formula::Sum(&[
            MetricRef::opponent("team_goals_conceded"),
            MetricRef::opponent("team_shots_conceded"),
        ]),
    ),
    (
        "team_offensive_events",
        Formula::Sum(&[
            MetricRef::own("team_goals_scored"),
            MetricRef::own("team_corners"),
            MetricRef::own("team_free_kicks"),
            MetricRef::own("team_shots"),
        ]),
    ),
    (
        "team_defensive_events",
        Formula::Sum(&[
            MetricRef::opponent("team_goals_conceded"),
            MetricRef::opponent("team_shots_conceded"),
        ]),
    ),
    (
        "player_attempts",
        Formula::Sum(&[MetricRef::plain("player_goals"), MetricRef::plain("player_shots")]),
    ),
    (
        "player_conversion_rate",
        Formula::PercentRatio {
            num: MetricRef::plain("player_goals"),
            den: MetricRef::plain("player_attempts"),
        },
    ),
    (
        "player_goal_involvements",
        Formula::Sum(&[
            MetricRef::plain("player_goals"),
            MetricRef::plain("player_goal_assists"),
        ]),
    ),
];

static BUILTIN: Lazy<FormulaSet> = Lazy::new(|| FormulaSet::new(BUILTIN_ENTRIES.to_vec()));
