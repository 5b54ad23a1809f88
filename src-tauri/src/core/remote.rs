use std::time::Duration;

use crate::core::analytics::{AnalyticsRow, AnalyticsSource};
use crate::core::error::AutomationError;

pub const ANALYTICS_URL_ENV: &str = "RIFTCAST_ANALYTICS_URL";
pub const ANALYTICS_KEY_ENV: &str = "RIFTCAST_ANALYTICS_KEY";

/// Reads the `analytics` table from a PostgREST-style endpoint.
pub struct RemoteAnalyticsSource {
    base_url: String,
    api_key: Option<String>,
}

impl RemoteAnalyticsSource {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Built from the environment; `None` when no URL is configured.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(ANALYTICS_URL_ENV).ok()?;
        if url.trim().is_empty() {
            return None;
        }
        let key = std::env::var(ANALYTICS_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Some(Self::new(url.trim(), key))
    }

    fn endpoint(&self, limit: usize) -> String {
        format!(
            "{}/rest/v1/analytics?select=*&order=date.desc&limit={limit}",
            self.base_url.trim_end_matches('/')
        )
    }
}

pub fn parse_rows(body: &str) -> Result<Vec<AnalyticsRow>, AutomationError> {
    serde_json::from_str::<Vec<AnalyticsRow>>(body)
        .map_err(|err| AutomationError::Query(format!("unexpected analytics payload: {err}")))
}

impl AnalyticsSource for RemoteAnalyticsSource {
    fn recent_days(&self, limit: usize) -> Result<Vec<AnalyticsRow>, AutomationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| AutomationError::Query(err.to_string()))?;

        let mut request = client
            .get(self.endpoint(limit))
            .header(reqwest::header::USER_AGENT, "riftcast")
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .header(reqwest::header::AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request
            .send()
            .map_err(|err| AutomationError::Query(err.to_string()))?;
        if !response.status().is_success() {
            return Err(AutomationError::Query(format!(
                "analytics request failed with status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .map_err(|err| AutomationError::Query(err.to_string()))?;
        let mut rows = parse_rows(&body)?;
        rows.truncate(limit);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_orders_newest_first() {
        let source = RemoteAnalyticsSource::new("https://example.supabase.co/", None);
        assert_eq!(
            source.endpoint(7),
            "https://example.supabase.co/rest/v1/analytics?select=*&order=date.desc&limit=7"
        );
    }

    #[test]
    fn parse_rows_defaults_missing_fields() {
        let rows = parse_rows(
            r#"[
                {"id":"a1","date":"2026-10-14","replays_discovered":5,"videos_uploaded":4,"total_views":1200,"created_at":"2026-10-14T00:00:00Z"},
                {"date":"2026-10-13","replays_discovered":2}
            ]"#,
        )
        .expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_views, 1200);
        assert_eq!(rows[1].videos_uploaded, 0);
        assert_eq!(rows[1].total_views, 0);
    }

    #[test]
    fn parse_rows_rejects_non_array() {
        assert!(matches!(
            parse_rows(r#"{"message":"JWT expired"}"#),
            Err(AutomationError::Query(_))
        ));
    }
}
