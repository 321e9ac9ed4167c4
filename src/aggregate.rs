//! Datatype-sensitive aggregation of metrics over a filtered match set.
//!
//! Sums for counting metrics, means for PERCENT metrics, with a
//! previous-period delta on request. The PERCENT mean runs over matches where
//! the metric has a defined value: derived metrics are defined for every
//! match (absence reads as zero), raw metrics only where a row exists.

use chrono::{Duration, NaiveDate};
use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::catalog::{MetricCatalog, MetricDataType};
use crate::resolver::{Resolver, ValueSnapshot};
use crate::store::{Match, RawValueStore};
use crate::{MatchId, Result, SeasonId, TeamId};

/// Whole-period metric computed from match results rather than value rows.
pub const WIN_RATE_SLUG: &str = "team_win_rate";

/// Engine facade pairing the raw value store with the metric catalog. Every
/// operation is read-only and independently invokable.
pub struct Analytics<'a> {
    pub(crate) store: &'a dyn RawValueStore,
    pub(crate) catalog: &'a MetricCatalog,
}

#[derive(Debug, Clone, Serialize)]
pub struct Kpi {
    pub metric_slug: String,
    pub metric_label: String,
    pub value: f64,
    pub unit: Option<String>,
    /// Relative change vs. the immediately preceding window of equal length,
    /// in percent. Absent unless the previous aggregate is strictly positive.
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeseriesPoint {
    pub match_id: MatchId,
    pub match_date: NaiveDate,
    pub opponent_name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Timeseries {
    pub metric_slug: String,
    pub metric_label: Option<String>,
    pub unit: Option<String>,
    /// Chronologically ascending, at most the requested number of matches.
    pub points: Vec<TimeseriesPoint>,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn win_rate(matches: &[Match]) -> f64 {
    if matches.is_empty() {
        return 0.0;
    }
    let wins = matches.iter().filter(|m| m.is_win()).count();
    wins as f64 / matches.len() as f64 * 100.0
}

impl<'a> Analytics<'a> {
    pub fn new(store: &'a dyn RawValueStore, catalog: &'a MetricCatalog) -> Self {
        Self { store, catalog }
    }

    /// Aggregated KPIs for a team over its filtered match set, one entry per
    /// requested slug in caller order. Slugs the catalog does not know are
    /// skipped so callers can batch-request optimistic lists.
    pub fn team_kpis(
        &self,
        team_id: TeamId,
        metric_slugs: &[&str],
        season_id: Option<SeasonId>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        compute_delta: bool,
    ) -> Result<Vec<Kpi>> {
        let matches = self.store.list_matches(team_id, season_id, date_from, date_to)?;
        if matches.is_empty() {
            return Ok(Vec::new());
        }
        let match_ids: Vec<MatchId> = matches.iter().map(|m| m.id).collect();

        let needs_resolver = metric_slugs.iter().any(|slug| {
            *slug != WIN_RATE_SLUG
                && self.catalog.get(slug).is_some_and(|def| def.is_derived)
        });
        let snapshot = if needs_resolver {
            ValueSnapshot::for_team_matches(self.store, &match_ids)?
        } else {
            ValueSnapshot::default()
        };
        debug!(
            "aggregating {} slugs over {} matches for team {team_id}",
            metric_slugs.len(),
            match_ids.len()
        );

        let mut results = Vec::new();
        for slug in metric_slugs {
            let Some(def) = self.catalog.get(slug) else {
                continue;
            };

            let value = if *slug == WIN_RATE_SLUG {
                win_rate(&matches)
            } else if def.is_derived {
                let resolver = Resolver::new(self.catalog, &snapshot);
                let per_match: Vec<f64> = match_ids
                    .par_iter()
                    .map(|id| resolver.team_metric(*id, slug))
                    .collect::<Result<Vec<_>>>()?;
                let total: f64 = per_match.iter().sum();
                if def.datatype == MetricDataType::Percent {
                    total / match_ids.len() as f64
                } else {
                    total
                }
            } else if def.datatype == MetricDataType::Percent {
                self.store
                    .mean_team_values(&match_ids, slug, def.side)?
                    .unwrap_or(0.0)
            } else {
                self.store.sum_team_values(&match_ids, slug, def.side)?
            };

            let mut delta = None;
            if compute_delta
                && let (Some(from), Some(to)) = (date_from, date_to)
            {
                delta = self.kpi_delta(team_id, slug, season_id, from, to, value)?;
            }

            results.push(Kpi {
                metric_slug: slug.to_string(),
                metric_label: def.label.clone(),
                value: round2(value),
                unit: def.unit.clone(),
                delta: delta.map(round2),
            });
        }
        Ok(results)
    }

    /// Same KPI over the preceding window of equal length in days. Delta is
    /// reported only against a strictly positive base.
    fn kpi_delta(
        &self,
        team_id: TeamId,
        slug: &str,
        season_id: Option<SeasonId>,
        from: NaiveDate,
        to: NaiveDate,
        current: f64,
    ) -> Result<Option<f64>> {
        let period_days = (to - from).num_days();
        let prev_from = from - Duration::days(period_days);
        let prev_to = from - Duration::days(1);
        let previous = self.team_kpis(
            team_id,
            &[slug],
            season_id,
            Some(prev_from),
            Some(prev_to),
            false,
        )?;
        let Some(previous) = previous.first() else {
            return Ok(None);
        };
        if previous.value > 0.0 {
            Ok(Some((current - previous.value) / previous.value * 100.0))
        } else {
            Ok(None)
        }
    }

    /// Per-match values of one metric for the team's most recent matches,
    /// reordered chronologically. An unknown slug yields an empty series.
    pub fn team_timeseries(
        &self,
        team_id: TeamId,
        metric_slug: &str,
        last_n: usize,
    ) -> Result<Timeseries> {
        let Some(def) = self.catalog.get(metric_slug) else {
            return Ok(Timeseries {
                metric_slug: metric_slug.to_string(),
                metric_label: None,
                unit: None,
                points: Vec::new(),
            });
        };

        let all = self.store.list_matches(team_id, None, None, None)?;
        let recent = &all[all.len().saturating_sub(last_n)..];

        let points = if def.is_derived {
            let match_ids: Vec<MatchId> = recent.iter().map(|m| m.id).collect();
            let snapshot = ValueSnapshot::for_team_matches(self.store, &match_ids)?;
            let resolver = Resolver::new(self.catalog, &snapshot);
            recent
                .iter()
                .map(|m| {
                    Ok(TimeseriesPoint {
                        match_id: m.id,
                        match_date: m.date,
                        opponent_name: m.opponent_name.clone(),
                        value: round2(resolver.team_metric(m.id, metric_slug)?),
                    })
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            recent
                .iter()
                .map(|m| {
                    let value = self
                        .store
                        .team_value(m.id, metric_slug, def.side)?
                        .unwrap_or(0.0);
                    Ok(TimeseriesPoint {
                        match_id: m.id,
                        match_date: m.date,
                        opponent_name: m.opponent_name.clone(),
                        value: round2(value),
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Timeseries {
            metric_slug: metric_slug.to_string(),
            metric_label: Some(def.label.clone()),
            unit: def.unit.clone(),
            points,
        })
    }

    /// Share of matches won over the filtered set, in percent; 0.0 for an
    /// empty set.
    pub fn team_win_rate(
        &self,
        team_id: TeamId,
        season_id: Option<SeasonId>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<f64> {
        let matches = self.store.list_matches(team_id, season_id, date_from, date_to)?;
        Ok(win_rate(&matches))
    }
}
