//! Two-period comparison of the same KPI set, for radar views.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::Analytics;
use crate::{Result, TeamId};

/// Inclusive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Period {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    fn label(&self) -> String {
        format!("{} to {}", self.from, self.to)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RadarMetric {
    pub metric_slug: String,
    pub metric_label: String,
    pub value_a: f64,
    pub value_b: f64,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Radar {
    pub label_a: String,
    pub label_b: String,
    pub metrics: Vec<RadarMetric>,
}

impl Analytics<'_> {
    /// KPI values for the same metrics over two date windows, joined by slug
    /// in caller order; unknown slugs are skipped. Capping the metric count
    /// for chart legibility is the caller's concern.
    pub fn team_radar(
        &self,
        team_id: TeamId,
        metric_slugs: &[&str],
        period_a: Period,
        period_b: Period,
    ) -> Result<Radar> {
        let kpis_a =
            self.team_kpis(team_id, metric_slugs, None, Some(period_a.from), Some(period_a.to), false)?;
        let kpis_b =
            self.team_kpis(team_id, metric_slugs, None, Some(period_b.from), Some(period_b.to), false)?;

        let values_a: HashMap<&str, f64> =
            kpis_a.iter().map(|k| (k.metric_slug.as_str(), k.value)).collect();
        let values_b: HashMap<&str, f64> =
            kpis_b.iter().map(|k| (k.metric_slug.as_str(), k.value)).collect();

        let mut metrics = Vec::new();
        for slug in metric_slugs {
            let Some(def) = self.catalog.get(slug) else {
                continue;
            };
            metrics.push(RadarMetric {
                metric_slug: slug.to_string(),
                metric_label: def.label.clone(),
                value_a: values_a.get(*slug).copied().unwrap_or(0.0),
                value_b: values_b.get(*slug).copied().unwrap_or(0.0),
                unit: def.unit.clone(),
            });
        }

        Ok(Radar { label_a: period_a.label(), label_b: period_b.label(), metrics })
    }
}
