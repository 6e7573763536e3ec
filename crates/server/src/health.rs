//! Liveness endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use herald_trigger::SharedStatus;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub occurrences: usize,
    pub notified: usize,
    pub next: Option<String>,
    pub last_tick: Option<DateTime<Utc>>,
    pub last_reload: Option<DateTime<Utc>>,
    pub ticks: u64,
    pub failed_ticks: u64,
    pub reminders_sent: u64,
}

pub async fn health(State(status): State<SharedStatus>) -> Json<HealthResponse> {
    let s = status.read().await;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        occurrences: s.occurrences,
        notified: s.notified,
        next: s.next_key.clone(),
        last_tick: s.last_tick,
        last_reload: s.last_reload,
        ticks: s.ticks,
        failed_ticks: s.failed_ticks,
        reminders_sent: s.reminders_sent,
    })
}

pub fn router(status: SharedStatus) -> Router {
    Router::new().route("/health", get(health)).with_state(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::TimeZone;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_loop_snapshot() {
        let status = SharedStatus::default();
        {
            let mut s = status.write().await;
            s.occurrences = 12;
            s.notified = 3;
            s.ticks = 40;
            s.next_key = Some("ruins:2025-02-03T18:00:00Z".to_string());
            s.last_tick = Some(Utc.with_ymd_and_hms(2025, 2, 3, 17, 0, 0).unwrap());
        }

        let response = router(status)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["occurrences"], 12);
        assert_eq!(json["notified"], 3);
        assert_eq!(json["ticks"], 40);
        assert_eq!(json["next"], "ruins:2025-02-03T18:00:00Z");
        assert_eq!(json["last_tick"], "2025-02-03T17:00:00Z");
        assert!(json["last_reload"].is_null());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = router(SharedStatus::default())
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
