//! Derived metric resolution over the formula graph.
//!
//! Resolution is a pure function of the stored values for one match: missing
//! raw rows read as 0.0, sub-metrics are memoized within one call, and a slug
//! that depends on itself fails instead of recursing forever.

use std::collections::HashMap;

use crate::catalog::{MetricCatalog, MetricSide};
use crate::formula::{Formula, FormulaSet};
use crate::store::{RawValueStore, ValueLookup};
use crate::{EngineError, MatchId, PlayerId, Result};

/// Immutable copy of the value rows for a match set. Lookups never touch the
/// database, so evaluation can fan out across threads.
#[derive(Debug, Clone, Default)]
pub struct ValueSnapshot {
    team: HashMap<MatchId, Vec<(String, MetricSide, f64)>>,
    player: HashMap<(MatchId, PlayerId), Vec<(String, f64)>>,
}

impl ValueSnapshot {
    /// Team-scope rows for the given matches.
    pub fn for_team_matches(store: &dyn RawValueStore, match_ids: &[MatchId]) -> Result<Self> {
        let mut snapshot = Self::default();
        for row in store.team_values_for_matches(match_ids)? {
            snapshot
                .team
                .entry(row.match_id)
                .or_default()
                .push((row.metric_slug, row.side, row.value));
        }
        Ok(snapshot)
    }

    /// Player-scope rows for the given matches.
    pub fn for_player_matches(store: &dyn RawValueStore, match_ids: &[MatchId]) -> Result<Self> {
        let mut snapshot = Self::default();
        for row in store.player_values_for_matches(match_ids)? {
            snapshot
                .player
                .entry((row.match_id, row.player_id))
                .or_default()
                .push((row.metric_slug, row.value));
        }
        Ok(snapshot)
    }

    /// Both scopes for a single match.
    pub fn for_match(store: &dyn RawValueStore, match_id: MatchId) -> Result<Self> {
        let ids = [match_id];
        let mut snapshot = Self::for_team_matches(store, &ids)?;
        for row in store.player_values_for_matches(&ids)? {
            snapshot
                .player
                .entry((row.match_id, row.player_id))
                .or_default()
                .push((row.metric_slug, row.value));
        }
        Ok(snapshot)
    }
}

impl ValueLookup for ValueSnapshot {
    fn team_value(&self, match_id: MatchId, slug: &str, side: MetricSide) -> Result<Option<f64>> {
        Ok(self.team.get(&match_id).and_then(|rows| {
            rows.iter()
                .find(|(row_slug, row_side, _)| row_slug == slug && *row_side == side)
                .map(|(_, _, value)| *value)
        }))
    }

    fn player_value(
        &self,
        match_id: MatchId,
        player_id: PlayerId,
        slug: &str,
    ) -> Result<Option<f64>> {
        Ok(self.player.get(&(match_id, player_id)).and_then(|rows| {
            rows.iter()
                .find(|(row_slug, _)| row_slug == slug)
                .map(|(_, value)| *value)
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum Subject {
    Team(MatchId),
    Player(MatchId, PlayerId),
}

/// Evaluator for one catalog + formula registry over some value source.
pub struct Resolver<'a, L: ValueLookup + ?Sized> {
    catalog: &'a MetricCatalog,
    formulas: &'a FormulaSet,
    values: &'a L,
}

impl<'a, L: ValueLookup + ?Sized> Resolver<'a, L> {
    pub fn new(catalog: &'a MetricCatalog, values: &'a L) -> Self {
        Self { catalog, formulas: FormulaSet::builtin(), values }
    }

    pub fn with_formulas(catalog: &'a MetricCatalog, formulas: &'a FormulaSet, values: &'a L) -> Self {
        Self { catalog, formulas, values }
    }

    /// Value of a team metric for one match. Raw slugs read their stored row
    /// for the definition's own side; derived slugs evaluate their formula.
    pub fn team_metric(&self, match_id: MatchId, slug: &str) -> Result<f64> {
        let side = self.catalog.get(slug).map(|def| def.side).unwrap_or(MetricSide::Own);
        let mut memo = HashMap::new();
        let mut stack = Vec::new();
        self.eval(Subject::Team(match_id), slug, side, &mut memo, &mut stack)
    }

    /// Value of a player metric for one match.
    pub fn player_metric(&self, match_id: MatchId, player_id: PlayerId, slug: &str) -> Result<f64> {
        let mut memo = HashMap::new();
        let mut stack = Vec::new();
        self.eval(
            Subject::Player(match_id, player_id),
            slug,
            MetricSide::None,
            &mut memo,
            &mut stack,
        )
    }

    fn eval(
        &self,
        subject: Subject,
        slug: &str,
        side: MetricSide,
        memo: &mut HashMap<(String, MetricSide), f64>,
        stack: &mut Vec<String>,
    ) -> Result<f64> {
        if let Some(cached) = memo.get(&(slug.to_string(), side)) {
            return Ok(*cached);
        }

        let Some(def) = self.catalog.get(slug) else {
            // At the top level an unknown slug is the caller's concern; inside
            // a formula it is a broken registry.
            if let Some(parent) = stack.last() {
                return Err(EngineError::UnknownFormulaRef {
                    formula: parent.clone(),
                    reference: slug.to_string(),
                });
            }
            return Ok(0.0);
        };

        let value = if def.is_derived {
            if stack.iter().any(|seen| seen == slug) {
                return Err(EngineError::FormulaCycle(slug.to_string()));
            }
            match self.formulas.get(slug) {
                // Derived without a per-match formula (whole-period metrics
                // such as win rate) contributes nothing at match granularity.
                None => 0.0,
                Some(Formula::Sum(refs)) => {
                    stack.push(slug.to_string());
                    let mut total = 0.0;
                    for reference in *refs {
                        total += self.eval(subject, reference.slug, reference.side, memo, stack)?;
                    }
                    stack.pop();
                    total
                }
                Some(Formula::PercentRatio { num, den }) => {
                    stack.push(slug.to_string());
                    let denominator = self.eval(subject, den.slug, den.side, memo, stack)?;
                    let ratio = if denominator == 0.0 {
                        0.0
                    } else {
                        self.eval(subject, num.slug, num.side, memo, stack)? / denominator * 100.0
                    };
                    stack.pop();
                    ratio
                }
            }
        } else {
            match subject {
                Subject::Team(match_id) => {
                    self.values.team_value(match_id, slug, side)?.unwrap_or(0.0)
                }
                Subject::Player(match_id, player_id) => {
                    self.values.player_value(match_id, player_id, slug)?.unwrap_or(0.0)
                }
            }
        };

        memo.insert((slug.to_string(), side), value);
        Ok(value)
    }
}
