use crate::models::contract::Contract;
use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;

#[derive(Serialize, JsonSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow, JsonSchema)]
pub struct HealthMetric {
    pub id: Uuid,
    pub user_id: Uuid,
    pub metric_type: String,
    pub value: f64,
    pub unit: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow, JsonSchema)]
pub struct HealthRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub record_type: String,
    pub title: String,
    pub summary: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Latest reading per metric type.
#[derive(Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct MetricSnapshot {
    pub metric_type: String,
    pub value: f64,
    pub unit: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct DashboardResponse {
    pub display_name: String,
    pub latest_metrics: Vec<MetricSnapshot>,
    pub recent_records: Vec<HealthRecord>,
    pub active_contracts: Vec<Contract>,
    pub connected_providers: usize,
    pub upcoming_appointments: usize,
}

/// Keeps the newest reading of every metric type, sorted by type name.
pub fn latest_metrics(metrics: &[HealthMetric]) -> Vec<MetricSnapshot> {
    let mut latest: std::collections::BTreeMap<&str, &HealthMetric> = std::collections::BTreeMap::new();
    for metric in metrics {
        latest
            .entry(metric.metric_type.as_str())
            .and_modify(|current| {
                if metric.recorded_at > current.recorded_at {
                    *current = metric;
                }
            })
            .or_insert(metric);
    }

    latest
        .into_values()
        .map(|m| MetricSnapshot {
            metric_type: m.metric_type.clone(),
            value: m.value,
            unit: m.unit.clone(),
            recorded_at: m.recorded_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(kind: &str, value: f64, minutes_ago: i64) -> HealthMetric {
        HealthMetric {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            metric_type: kind.to_string(),
            value,
            unit: "bpm".to_string(),
            recorded_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn keeps_newest_reading_per_type() {
        let metrics = vec![metric("heart_rate", 60.0, 30), metric("heart_rate", 72.0, 5), metric("steps", 4000.0, 10)];
        let latest = latest_metrics(&metrics);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].metric_type, "heart_rate");
        assert_eq!(latest[0].value, 72.0);
        assert_eq!(latest[1].metric_type, "steps");
    }
}
