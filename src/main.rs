use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use squadmetrics::aggregate::Analytics;
use squadmetrics::catalog::{MetricCatalog, MetricScope};
use squadmetrics::compare::Period;
use squadmetrics::demo;
use squadmetrics::export;
use squadmetrics::store::SqliteStore;
use squadmetrics::{MatchId, SeasonId, TeamId};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.iter().find(|arg| !arg.starts_with("--")).cloned() else {
        print_usage();
        return Ok(());
    };

    let db_path = flag_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(default_db_path)
        .context("unable to resolve sqlite path")?;
    let store = SqliteStore::open(&db_path)?;
    let catalog = MetricCatalog::builtin();
    let analytics = Analytics::new(&store, catalog);

    match command.as_str() {
        "metrics" => {
            let scope = match flag_value(&args, "--scope").as_deref() {
                Some("team") => Some(MetricScope::Team),
                Some("player") => Some(MetricScope::Player),
                _ => None,
            };
            let derived = has_flag(&args, "--derived").then_some(true);
            for def in catalog.list(scope, None, derived) {
                println!(
                    "{:<32} {:<7} {:<13} {:<8} {:<5} {}",
                    def.slug,
                    def.scope.as_str(),
                    def.category.as_str(),
                    def.datatype.as_str(),
                    if def.is_derived { "calc" } else { "raw" },
                    def.unit.as_deref().unwrap_or("")
                );
            }
        }
        "seed-demo" => {
            let seed = flag_value(&args, "--seed")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(42);
            let report = demo::seed_demo(&store, catalog, seed)?;
            println!("Demo dataset seeded");
            println!("DB: {}", db_path.display());
            println!("Team: {} Season: {}", report.team_id, report.season_id);
            println!("Matches: {} Players: {}", report.matches, report.players);
            println!(
                "Values: {} team rows, {} player rows",
                report.team_values, report.player_values
            );
        }
        "kpis" => {
            let team_id = team_flag(&args)?;
            let metrics_raw = flag_value(&args, "--metrics").context("--metrics is required")?;
            let slugs: Vec<&str> = metrics_raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            let season_id = season_flag(&args)?;
            let from = date_flag(&args, "--from")?;
            let to = date_flag(&args, "--to")?;
            let compute_delta = has_flag(&args, "--delta");

            let kpis = analytics.team_kpis(team_id, &slugs, season_id, from, to, compute_delta)?;
            if has_flag(&args, "--json") {
                println!("{}", serde_json::to_string_pretty(&kpis)?);
                return Ok(());
            }
            if kpis.is_empty() {
                println!("No matches in range");
                return Ok(());
            }
            for kpi in &kpis {
                let unit = kpi.unit.as_deref().unwrap_or("");
                match kpi.delta {
                    Some(delta) => println!(
                        "{:<28} {:>10.2} {:<8} delta {:+.2}%",
                        kpi.metric_slug, kpi.value, unit, delta
                    ),
                    None => println!("{:<28} {:>10.2} {:<8}", kpi.metric_slug, kpi.value, unit),
                }
            }
        }
        "timeseries" => {
            let team_id = team_flag(&args)?;
            let metric = flag_value(&args, "--metric").context("--metric is required")?;
            let last_n = flag_value(&args, "--last")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(10);

            let series = analytics.team_timeseries(team_id, &metric, last_n)?;
            if has_flag(&args, "--json") {
                println!("{}", serde_json::to_string_pretty(&series)?);
                return Ok(());
            }
            if series.points.is_empty() {
                println!("No data for '{metric}'");
                return Ok(());
            }
            println!(
                "{} ({})",
                series.metric_label.as_deref().unwrap_or(&metric),
                series.unit.as_deref().unwrap_or("-")
            );
            for point in &series.points {
                println!(
                    "{}  vs {:<24} {:>8.2}",
                    point.match_date, point.opponent_name, point.value
                );
            }
        }
        "radar" => {
            let team_id = team_flag(&args)?;
            let metrics_raw = flag_value(&args, "--metrics").context("--metrics is required")?;
            let slugs: Vec<&str> = metrics_raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            let period_a = Period::new(
                required_date(&args, "--from-a")?,
                required_date(&args, "--to-a")?,
            );
            let period_b = Period::new(
                required_date(&args, "--from-b")?,
                required_date(&args, "--to-b")?,
            );

            let radar = analytics.team_radar(team_id, &slugs, period_a, period_b)?;
            if has_flag(&args, "--json") {
                println!("{}", serde_json::to_string_pretty(&radar)?);
                return Ok(());
            }
            println!("A: {}   B: {}", radar.label_a, radar.label_b);
            for metric in &radar.metrics {
                println!(
                    "{:<28} A {:>10.2}   B {:>10.2}",
                    metric.metric_slug, metric.value_a, metric.value_b
                );
            }
        }
        "leaderboard" => {
            let team_id = team_flag(&args)?;
            let metric = flag_value(&args, "--metric").context("--metric is required")?;
            let season_id = season_flag(&args)?;
            let top_n = flag_value(&args, "--top")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(10);

            let board = analytics.player_leaderboard(team_id, &metric, season_id, top_n)?;
            if has_flag(&args, "--json") {
                println!("{}", serde_json::to_string_pretty(&board)?);
                return Ok(());
            }
            if board.entries.is_empty() {
                println!("No leaderboard for '{metric}'");
                return Ok(());
            }
            println!("{}", board.metric_label.as_deref().unwrap_or(&metric));
            for (rank, entry) in board.entries.iter().enumerate() {
                println!(
                    "{:>2}. {:<24} {:>8.2}  ({} matches)",
                    rank + 1,
                    entry.player_name,
                    entry.value,
                    entry.matches_played
                );
            }
        }
        "summary" => {
            let match_id = flag_value(&args, "--match")
                .and_then(|raw| raw.parse::<i64>().ok())
                .map(MatchId)
                .context("--match is required")?;

            let summary = analytics.match_summary(match_id)?;
            if let Some(path) = flag_value(&args, "--xlsx") {
                let report = export::export_match_summary(&PathBuf::from(&path), &summary)?;
                println!("Workbook written to {path}");
                println!(
                    "Rows: {} participations, {} team metrics, {} grid",
                    report.participations, report.team_metric_rows, report.grid_rows
                );
                return Ok(());
            }
            if has_flag(&args, "--json") {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            let info = &summary.match_info;
            println!(
                "Match {} on {}: vs {} ({})",
                info.id,
                info.date,
                info.opponent_name,
                if info.is_home { "home" } else { "away" }
            );
            if let (Some(score_for), Some(score_against)) = (info.score_for, info.score_against) {
                println!("Score: {score_for}-{score_against}");
            }
            println!("-- Participations ({})", summary.participations.len());
            for p in &summary.participations {
                println!(
                    "   {:<24} {:<4} {}{}",
                    p.player_name,
                    p.main_position,
                    if p.is_starter { "starter" } else { "sub" },
                    if p.is_captain { " (c)" } else { "" }
                );
            }
            println!(
                "-- Team metrics: {} own, {} opponent",
                summary.team_metrics.own.len(),
                summary.team_metrics.opponent.len()
            );
            println!(
                "-- Player grid: {} players x {} metrics",
                summary.player_grid.players.len(),
                summary.player_grid.columns.len()
            );
        }
        other => bail!("unknown command '{other}'"),
    }

    Ok(())
}

fn print_usage() {
    println!("squadmetrics <command> [--db=PATH] [flags]");
    println!();
    println!("Commands:");
    println!("  metrics      [--scope=team|player] [--derived]");
    println!("  seed-demo    [--seed=N]");
    println!(
        "  kpis         --team=ID --metrics=a,b,c [--season=ID] [--from=DATE] [--to=DATE] [--delta]"
    );
    println!("  timeseries   --team=ID --metric=SLUG [--last=N]");
    println!("  radar        --team=ID --metrics=a,b --from-a= --to-a= --from-b= --to-b=");
    println!("  leaderboard  --team=ID --metric=SLUG [--season=ID] [--top=N]");
    println!("  summary      --match=ID [--xlsx=PATH]");
    println!();
    println!("Add --json to print any result as JSON.");
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

fn team_flag(args: &[String]) -> Result<TeamId> {
    flag_value(args, "--team")
        .and_then(|raw| raw.parse::<i64>().ok())
        .map(TeamId)
        .context("--team is required")
}

fn season_flag(args: &[String]) -> Result<Option<SeasonId>> {
    let Some(raw) = flag_value(args, "--season") else {
        return Ok(None);
    };
    let id = raw
        .parse::<i64>()
        .with_context(|| format!("bad --season value '{raw}'"))?;
    Ok(Some(SeasonId(id)))
}

fn date_flag(args: &[String], name: &str) -> Result<Option<NaiveDate>> {
    let Some(raw) = flag_value(args, name) else {
        return Ok(None);
    };
    let date = raw
        .parse::<NaiveDate>()
        .with_context(|| format!("bad {name} value '{raw}', expected YYYY-MM-DD"))?;
    Ok(Some(date))
}

fn required_date(args: &[String], name: &str) -> Result<NaiveDate> {
    date_flag(args, name)?.with_context(|| format!("{name} is required"))
}

fn default_db_path() -> Option<PathBuf> {
    // Prefer the XDG data dir, fall back to ~/.local/share.
    if let Ok(base) = std::env::var("XDG_DATA_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join("squadmetrics").join("store.sqlite"));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("squadmetrics")
            .join("store.sqlite"),
    )
}
