//! Player rankings for one metric over a filtered match set.

use rayon::prelude::*;
use serde::Serialize;

use crate::aggregate::{Analytics, round2};
use crate::catalog::MetricScope;
use crate::resolver::{Resolver, ValueSnapshot};
use crate::store::Player;
use crate::{MatchId, PlayerId, Result, SeasonId, TeamId};

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub player_name: String,
    pub value: f64,
    /// Participation rows in the filtered match set, independent of whether
    /// any value rows exist for the player.
    pub matches_played: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub metric_slug: String,
    pub metric_label: Option<String>,
    pub unit: Option<String>,
    pub entries: Vec<LeaderboardEntry>,
}

impl Analytics<'_> {
    /// Top players of a team by an aggregated player metric. Requesting a
    /// slug that is unknown or not PLAYER-scoped yields an empty board rather
    /// than an error, keeping the interface total.
    pub fn player_leaderboard(
        &self,
        team_id: TeamId,
        metric_slug: &str,
        season_id: Option<SeasonId>,
        top_n: usize,
    ) -> Result<Leaderboard> {
        let def = match self.catalog.get(metric_slug) {
            Some(def) if def.scope == MetricScope::Player => def,
            _ => {
                return Ok(Leaderboard {
                    metric_slug: metric_slug.to_string(),
                    metric_label: None,
                    unit: None,
                    entries: Vec::new(),
                });
            }
        };

        let board = |entries| Leaderboard {
            metric_slug: metric_slug.to_string(),
            metric_label: Some(def.label.clone()),
            unit: def.unit.clone(),
            entries,
        };

        let matches = self.store.list_matches(team_id, season_id, None, None)?;
        if matches.is_empty() {
            return Ok(board(Vec::new()));
        }
        let match_ids: Vec<MatchId> = matches.iter().map(|m| m.id).collect();

        // Participation gate first: a player with no appearance in the window
        // never enters the board, whatever value rows exist for them.
        let mut contenders: Vec<(Player, usize)> = Vec::new();
        for player in self.store.players_for_team(team_id)? {
            let played = self.store.count_participations(player.id, &match_ids)?;
            if played > 0 {
                contenders.push((player, played));
            }
        }

        let mut entries: Vec<LeaderboardEntry> = if def.is_derived {
            let snapshot = ValueSnapshot::for_player_matches(self.store, &match_ids)?;
            let resolver = Resolver::new(self.catalog, &snapshot);
            contenders
                .par_iter()
                .map(|(player, played)| {
                    let mut total = 0.0;
                    for match_id in &match_ids {
                        total += resolver.player_metric(*match_id, player.id, metric_slug)?;
                    }
                    Ok(LeaderboardEntry {
                        player_id: player.id,
                        player_name: player.full_name(),
                        value: round2(total),
                        matches_played: *played,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            let mut out = Vec::with_capacity(contenders.len());
            for (player, played) in &contenders {
                let total = self.store.sum_player_values(&match_ids, player.id, metric_slug)?;
                out.push(LeaderboardEntry {
                    player_id: player.id,
                    player_name: player.full_name(),
                    value: round2(total),
                    matches_played: *played,
                });
            }
            out
        };

        // Value descending; name ascending so equal totals rank the same way
        // on every run.
        entries.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.player_name.cmp(&b.player_name))
        });
        entries.truncate(top_n);

        Ok(board(entries))
    }
}
