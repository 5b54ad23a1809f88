use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::error::AutomationError;
use crate::core::storage;
use crate::types::{Replay, UploadJob, UploadStatus};

/// Rows requested from an analytics source.
pub const RECENT_DAYS: usize = 7;

const FALLBACK_TOTAL_VIEWS: u64 = 164_520;
const DAY_LABELS: [&str; 7] = ["Sun", "Sat", "Fri", "Thu", "Wed", "Tue", "Mon"];
const CHAMPION_PALETTE: [&str; 5] = ["#463714", "#0F2027", "#1E2328", "#3C3C41", "#5BC0DE"];
const OTHERS_COLOR: &str = "#463714";

struct FallbackDay {
    day: &'static str,
    divisor: f64,
    replays: u64,
    uploads: u64,
    views: u64,
}

const FALLBACK_WEEK: [FallbackDay; 7] = [
    FallbackDay { day: "Mon", divisor: 7.0, replays: 12, uploads: 8, views: 15420 },
    FallbackDay { day: "Tue", divisor: 6.0, replays: 15, uploads: 11, views: 18750 },
    FallbackDay { day: "Wed", divisor: 8.0, replays: 8, uploads: 6, views: 12300 },
    FallbackDay { day: "Thu", divisor: 5.0, replays: 18, uploads: 14, views: 22180 },
    FallbackDay { day: "Fri", divisor: 4.0, replays: 22, uploads: 16, views: 28900 },
    FallbackDay { day: "Sat", divisor: 3.0, replays: 25, uploads: 19, views: 35200 },
    FallbackDay { day: "Sun", divisor: 3.5, replays: 20, uploads: 15, views: 31500 },
];

const FALLBACK_CHAMPIONS: [(&str, u64, &str); 6] = [
    ("Azir", 24, "#463714"),
    ("Yasuo", 18, "#0F2027"),
    ("Lee Sin", 16, "#1E2328"),
    ("Zed", 14, "#3C3C41"),
    ("Orianna", 12, "#5BC0DE"),
    ("Others", 35, "#463714"),
];

const PERFORMANCE_TREND: [(&str, u32, u64); 4] = [
    ("Oct", 94, 18500),
    ("Nov", 96, 22300),
    ("Dec", 91, 19800),
    ("Jan", 98, 25700),
];

/// One day of stored metrics. Missing or null numbers read as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsRow {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub date: String,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub replays_discovered: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub videos_uploaded: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub total_views: u64,
}

fn text_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn count_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    Ok(if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    })
}

pub trait AnalyticsSource {
    /// Up to `limit` rows, newest date first.
    fn recent_days(&self, limit: usize) -> Result<Vec<AnalyticsRow>, AutomationError>;
}

pub struct SqliteAnalyticsSource {
    data_dir: PathBuf,
}

impl SqliteAnalyticsSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl AnalyticsSource for SqliteAnalyticsSource {
    fn recent_days(&self, limit: usize) -> Result<Vec<AnalyticsRow>, AutomationError> {
        storage::query_recent_analytics(&self.data_dir, limit).map_err(AutomationError::Query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStat {
    pub day: String,
    pub replays: u64,
    pub uploads: u64,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricCard {
    pub title: String,
    pub value: String,
    pub change: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChampionSlice {
    pub name: String,
    pub count: u64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformancePoint {
    pub month: String,
    pub success_rate: u32,
    pub avg_views: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesSource {
    /// Daily series built from analytics rows.
    Query,
    /// No rows were available; the series is derived or literal.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDashboard {
    pub total_replays: u64,
    pub total_uploads: u64,
    pub total_views: u64,
    pub success_rate: u32,
    pub metrics: Vec<MetricCard>,
    pub daily: Vec<DailyStat>,
    pub champions: Vec<ChampionSlice>,
    pub performance: Vec<PerformancePoint>,
    pub source: SeriesSource,
    /// Set when the analytics source could not be read.
    pub status: Option<String>,
}

pub fn success_rate(total_replays: u64, total_uploads: u64) -> u32 {
    if total_replays == 0 {
        return 0;
    }
    (100.0 * total_uploads as f64 / total_replays as f64).round() as u32
}

/// Thousands with one decimal; ties round up, so 1250 reads "1.3K".
pub fn format_views(views: u64) -> String {
    let thousands = (views as f64 / 100.0).round() / 10.0;
    format!("{thousands:.1}K")
}

fn day_label(index: usize) -> String {
    DAY_LABELS
        .get(index)
        .map(|label| label.to_string())
        .unwrap_or_else(|| format!("Day {}", index + 1))
}

fn daily_from_rows(rows: &[AnalyticsRow]) -> Vec<DailyStat> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| DailyStat {
            day: day_label(index),
            replays: row.replays_discovered,
            uploads: row.videos_uploaded,
            views: row.total_views,
        })
        .collect()
}

fn fallback_daily(total_replays: u64, total_uploads: u64) -> Vec<DailyStat> {
    FALLBACK_WEEK
        .iter()
        .map(|entry| {
            let replays = if total_replays > 0 {
                (total_replays as f64 / entry.divisor).floor() as u64
            } else {
                entry.replays
            };
            let uploads = match (total_uploads as f64 / entry.divisor).floor() as u64 {
                0 => entry.uploads,
                derived => derived,
            };
            DailyStat {
                day: entry.day.to_string(),
                replays,
                uploads,
                views: entry.views,
            }
        })
        .collect()
}

fn champion_slices(replays: &[Replay]) -> Vec<ChampionSlice> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for champion in replays
        .iter()
        .filter_map(|replay| replay.champion.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        *counts.entry(champion).or_default() += 1;
    }

    if counts.is_empty() {
        return FALLBACK_CHAMPIONS
            .iter()
            .map(|(name, count, color)| ChampionSlice {
                name: name.to_string(),
                count: *count,
                color: color.to_string(),
            })
            .collect();
    }

    let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let others: u64 = ranked.iter().skip(CHAMPION_PALETTE.len()).map(|(_, n)| n).sum();
    let mut slices: Vec<ChampionSlice> = ranked
        .iter()
        .zip(CHAMPION_PALETTE.iter())
        .map(|((name, count), color)| ChampionSlice {
            name: name.to_string(),
            count: *count,
            color: color.to_string(),
        })
        .collect();
    if others > 0 {
        slices.push(ChampionSlice {
            name: "Others".to_string(),
            count: others,
            color: OTHERS_COLOR.to_string(),
        });
    }
    slices
}

fn performance_trend() -> Vec<PerformancePoint> {
    PERFORMANCE_TREND
        .iter()
        .map(|(month, success_rate, avg_views)| PerformancePoint {
            month: month.to_string(),
            success_rate: *success_rate,
            avg_views: *avg_views,
        })
        .collect()
}

/// Builds every figure the analytics view shows. Pure over its inputs.
pub fn build_dashboard(
    rows: &[AnalyticsRow],
    replays: &[Replay],
    jobs: &[UploadJob],
) -> AnalyticsDashboard {
    let total_replays = replays.len() as u64;
    let total_uploads = jobs
        .iter()
        .filter(|job| job.status == UploadStatus::Completed)
        .count() as u64;
    let total_views = match rows.iter().map(|row| row.total_views).sum::<u64>() {
        0 => FALLBACK_TOTAL_VIEWS,
        summed => summed,
    };
    let rate = success_rate(total_replays, total_uploads);

    let (daily, source) = if rows.is_empty() {
        (fallback_daily(total_replays, total_uploads), SeriesSource::Fallback)
    } else {
        (daily_from_rows(rows), SeriesSource::Query)
    };

    let metrics = vec![
        MetricCard {
            title: "Total Replays".to_string(),
            value: total_replays.to_string(),
            change: "+12%".to_string(),
        },
        MetricCard {
            title: "Successful Uploads".to_string(),
            value: total_uploads.to_string(),
            change: "+8%".to_string(),
        },
        MetricCard {
            title: "Total Views".to_string(),
            value: format_views(total_views),
            change: "+15%".to_string(),
        },
        MetricCard {
            title: "Success Rate".to_string(),
            value: format!("{rate}%"),
            change: "+2%".to_string(),
        },
    ];

    AnalyticsDashboard {
        total_replays,
        total_uploads,
        total_views,
        success_rate: rate,
        metrics,
        daily,
        champions: champion_slices(replays),
        performance: performance_trend(),
        source,
        status: None,
    }
}

/// Reads the source once and builds the dashboard. A failing source degrades to
/// derived values and the error is kept in `status`.
pub fn load_dashboard(
    source: &dyn AnalyticsSource,
    replays: &[Replay],
    jobs: &[UploadJob],
) -> AnalyticsDashboard {
    match source.recent_days(RECENT_DAYS) {
        Ok(rows) => build_dashboard(&rows, replays, jobs),
        Err(err) => {
            log::warn!("Error loading analytics: {err}");
            let mut dashboard = build_dashboard(&[], replays, jobs);
            dashboard.status = Some(err.to_string());
            dashboard
        }
    }
}
