//! XLSX export of a match summary.
//!
//! One workbook per match: match header, participations, side-split team
//! metrics and the player grid, each on its own sheet.

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::catalog::MetricSide;
use crate::summary::{MatchSummary, TeamMetricCell};

pub struct ExportReport {
    pub participations: usize,
    pub team_metric_rows: usize,
    pub grid_rows: usize,
}

pub fn export_match_summary(path: &Path, summary: &MatchSummary) -> Result<ExportReport> {
    let match_rows = match_rows(summary);
    let participation_rows = participation_rows(summary);
    let team_rows = team_metric_rows(summary);
    let grid_rows = grid_rows(summary);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Match")?;
        write_rows(sheet, &match_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Participations")?;
        write_rows(sheet, &participation_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("TeamMetrics")?;
        write_rows(sheet, &team_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("PlayerGrid")?;
        write_rows(sheet, &grid_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;

    Ok(ExportReport {
        participations: participation_rows.len().saturating_sub(1),
        team_metric_rows: team_rows.len().saturating_sub(1),
        grid_rows: grid_rows.len().saturating_sub(1),
    })
}

fn match_rows(summary: &MatchSummary) -> Vec<Vec<String>> {
    let info = &summary.match_info;
    vec![
        vec![
            "Match ID".to_string(),
            "Date".to_string(),
            "Opponent".to_string(),
            "Home".to_string(),
            "Type".to_string(),
            "Competition".to_string(),
            "Score For".to_string(),
            "Score Against".to_string(),
        ],
        vec![
            info.id.to_string(),
            info.date.to_string(),
            info.opponent_name.clone(),
            if info.is_home { "yes" } else { "no" }.to_string(),
            info.match_type.as_str().to_string(),
            info.competition.clone().unwrap_or_default(),
            opt_to_string(info.score_for),
            opt_to_string(info.score_against),
        ],
    ]
}

fn participation_rows(summary: &MatchSummary) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Player ID".to_string(),
        "Player".to_string(),
        "Position".to_string(),
        "Starter".to_string(),
        "Captain".to_string(),
        "Minutes".to_string(),
        "Position Played".to_string(),
    ]];
    for p in &summary.participations {
        rows.push(vec![
            p.player_id.to_string(),
            p.player_name.clone(),
            p.main_position.clone(),
            if p.is_starter { "yes" } else { "no" }.to_string(),
            if p.is_captain { "yes" } else { "no" }.to_string(),
            opt_to_string(p.minutes_played),
            p.position_played.clone().unwrap_or_default(),
        ]);
    }
    rows
}

fn team_metric_rows(summary: &MatchSummary) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Side".to_string(),
        "Metric".to_string(),
        "Label".to_string(),
        "Value".to_string(),
        "Unit".to_string(),
    ]];
    let cells = summary
        .team_metrics
        .own
        .iter()
        .chain(summary.team_metrics.opponent.iter());
    for cell in cells {
        rows.push(team_metric_row(cell));
    }
    rows
}

fn team_metric_row(cell: &TeamMetricCell) -> Vec<String> {
    let side = match cell.side {
        MetricSide::Own => "OWN",
        MetricSide::Opponent => "OPPONENT",
        MetricSide::None => "OWN",
    };
    vec![
        side.to_string(),
        cell.metric_slug.clone(),
        cell.metric_label.clone(),
        cell.value.to_string(),
        cell.unit.clone().unwrap_or_default(),
    ]
}

fn grid_rows(summary: &MatchSummary) -> Vec<Vec<String>> {
    let grid = &summary.player_grid;
    let mut header = vec!["Player".to_string(), "Position".to_string()];
    header.extend(grid.columns.iter().map(|c| c.slug.clone()));

    let mut rows = vec![header];
    for player in &grid.players {
        let mut row = vec![player.name.clone(), player.main_position.clone()];
        let player_values = grid.values.get(&player.id.to_string());
        for column in &grid.columns {
            let cell = player_values
                .and_then(|values| values.get(&column.slug).copied().flatten())
                .map(|value| value.to_string())
                .unwrap_or_default();
            row.push(cell);
        }
        rows.push(row);
    }
    rows
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Analytics;
    use crate::catalog::MetricCatalog;
    use crate::store::{Match, MatchType, MemoryStore, Player};
    use crate::{MatchId, PlayerId, SeasonId, TeamId};
    use chrono::NaiveDate;

    #[test]
    fn grid_rows_cover_every_player_and_column() {
        let mut store = MemoryStore::new();
        store.add_match(Match {
            id: MatchId(1),
            team_id: TeamId(1),
            season_id: SeasonId(1),
            date: NaiveDate::from_ymd_opt(2025, 9, 6).expect("valid date"),
            opponent_name: "Opp".to_string(),
            is_home: true,
            match_type: MatchType::League,
            competition: None,
            score_for: Some(1),
            score_against: Some(0),
        });
        for (id, first, last) in [(1, "Ada", "Moss"), (2, "Ben", "Cole")] {
            store.add_player(Player {
                id: PlayerId(id),
                team_id: TeamId(1),
                first_name: first.to_string(),
                last_name: last.to_string(),
                main_position: "MF".to_string(),
            });
        }
        store.add_player_value(MatchId(1), PlayerId(1), "player_goals", 1.0);
        store.add_player_value(MatchId(1), PlayerId(2), "player_shots", 3.0);

        let analytics = Analytics::new(&store, MetricCatalog::builtin());
        let summary = analytics.match_summary(MatchId(1)).unwrap();
        let rows = grid_rows(&summary);

        // header + 2 players, each with 2 metric columns
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 4);
        for row in &rows[1..] {
            assert_eq!(row.len(), 4);
        }
        // Ben Cole never recorded player_goals: blank cell, not a zero.
        let ben = rows.iter().find(|r| r[0] == "Ben Cole").unwrap();
        assert_eq!(ben[2], "");
        assert_eq!(ben[3], "3");
    }
}
