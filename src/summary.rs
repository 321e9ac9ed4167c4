//! Single-match summary: participations, side-split team metrics and the
//! player x metric grid.
//!
//! Values are exactly as stored, nothing is derived here, so the payload
//! stays a stable, export-ready contract over raw data.

use std::collections::BTreeMap;

use log::warn;
use serde::Serialize;

use crate::aggregate::Analytics;
use crate::catalog::MetricSide;
use crate::store::Match;
use crate::{EngineError, MatchId, PlayerId, Result};

#[derive(Debug, Clone, Serialize)]
pub struct ParticipationRow {
    pub player_id: PlayerId,
    pub player_name: String,
    pub main_position: String,
    pub is_starter: bool,
    pub is_captain: bool,
    pub minutes_played: Option<i32>,
    pub position_played: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMetricCell {
    pub metric_slug: String,
    pub metric_label: String,
    pub side: MetricSide,
    pub value: f64,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamMetricsBlock {
    pub own: Vec<TeamMetricCell>,
    pub opponent: Vec<TeamMetricCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridPlayer {
    pub id: PlayerId,
    pub name: String,
    pub main_position: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridColumn {
    pub slug: String,
    pub label: String,
    pub unit: Option<String>,
    pub category: String,
}

/// Pivot of the raw player metric rows of one match. Rows and columns come
/// from the value rows themselves, not from the participation list; the value
/// matrix is a complete cross product with explicit gaps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerGrid {
    /// Sorted by name, case-insensitively.
    pub players: Vec<GridPlayer>,
    /// Sorted by slug.
    pub columns: Vec<GridColumn>,
    /// player id (stringified) -> column slug -> stored value or explicit gap.
    pub values: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub match_info: Match,
    pub participations: Vec<ParticipationRow>,
    pub team_metrics: TeamMetricsBlock,
    pub player_grid: PlayerGrid,
}

impl Analytics<'_> {
    /// Full summary payload for one match. Fails when the match id does not
    /// exist; every other gap shows up as an empty list or a `None` cell.
    pub fn match_summary(&self, match_id: MatchId) -> Result<MatchSummary> {
        let Some(match_info) = self.store.match_by_id(match_id)? else {
            return Err(EngineError::MatchNotFound(match_id));
        };

        let participations = self
            .store
            .participations_with_players(match_id)?
            .into_iter()
            .map(|(participation, player)| ParticipationRow {
                player_id: player.id,
                player_name: player.full_name(),
                main_position: player.main_position,
                is_starter: participation.is_starter,
                is_captain: participation.is_captain,
                minutes_played: participation.minutes_played,
                position_played: participation.position_played,
            })
            .collect();

        Ok(MatchSummary {
            match_info,
            participations,
            team_metrics: self.team_metrics_block(match_id)?,
            player_grid: self.player_grid(match_id)?,
        })
    }

    fn team_metrics_block(&self, match_id: MatchId) -> Result<TeamMetricsBlock> {
        let mut rows = self.store.team_metric_rows(match_id)?;
        rows.sort_by(|a, b| {
            self.metric_category(&a.metric_slug)
                .cmp(self.metric_category(&b.metric_slug))
                .then_with(|| a.metric_slug.cmp(&b.metric_slug))
        });

        let mut block = TeamMetricsBlock::default();
        for row in rows {
            let (label, unit) = self.metric_display(&row.metric_slug);
            let cell = TeamMetricCell {
                metric_slug: row.metric_slug.clone(),
                metric_label: label,
                side: row.side,
                value: row.value,
                unit,
            };
            match row.side {
                MetricSide::Own => block.own.push(cell),
                MetricSide::Opponent => block.opponent.push(cell),
                MetricSide::None => {
                    // Team rows must carry a real side; keep malformed data
                    // visible instead of dropping it.
                    warn!(
                        "team metric row '{}' for match {match_id} has side NONE",
                        row.metric_slug
                    );
                    block.own.push(cell);
                }
            }
        }
        Ok(block)
    }

    fn player_grid(&self, match_id: MatchId) -> Result<PlayerGrid> {
        let rows = self.store.player_metric_rows(match_id)?;

        let mut players: Vec<GridPlayer> = Vec::new();
        let mut columns: BTreeMap<String, GridColumn> = BTreeMap::new();
        let mut values: BTreeMap<String, BTreeMap<String, Option<f64>>> = BTreeMap::new();

        for (row, player) in &rows {
            if !players.iter().any(|p| p.id == player.id) {
                players.push(GridPlayer {
                    id: player.id,
                    name: player.full_name(),
                    main_position: player.main_position.clone(),
                });
            }
            if !columns.contains_key(&row.metric_slug) {
                let (label, unit) = self.metric_display(&row.metric_slug);
                columns.insert(
                    row.metric_slug.clone(),
                    GridColumn {
                        slug: row.metric_slug.clone(),
                        label,
                        unit,
                        category: self.metric_category(&row.metric_slug).to_string(),
                    },
                );
            }
            values
                .entry(player.id.to_string())
                .or_default()
                .insert(row.metric_slug.clone(), Some(row.value));
        }

        players.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        let columns: Vec<GridColumn> = columns.into_values().collect();

        // Every player row gets an entry for every column, recorded or not.
        for player in &players {
            let row = values.entry(player.id.to_string()).or_default();
            for column in &columns {
                row.entry(column.slug.clone()).or_insert(None);
            }
        }

        Ok(PlayerGrid { players, columns, values })
    }

    fn metric_display(&self, slug: &str) -> (String, Option<String>) {
        match self.catalog.get(slug) {
            Some(def) => (def.label.clone(), def.unit.clone()),
            // Rows for slugs missing from the catalog still render, under
            // their slug.
            None => (slug.to_string(), None),
        }
    }

    fn metric_category(&self, slug: &str) -> &'static str {
        self.catalog
            .get(slug)
            .map(|def| def.category.as_str())
            .unwrap_or("GENERAL")
    }
}
