//! Gateway health endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
}

/// Handler for `GET /api/health`.
pub async fn get_health() -> Json<HealthReport> {
    Json(HealthReport { status: "healthy" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_wire_format() {
        let report = HealthReport { status: "healthy" };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"status":"healthy"}"#
        );
    }
}
