use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{AvailabilityStore, BookingStore, StoreError};
use crate::models::{AvailabilityRecord, Booking, BookingRecord, Freelancer};

const PROFILES: &str = "profiles";
const RULES: &str = "availability";
const BOOKINGS: &str = "bookings";
const QUERY_TS: &str = "%Y-%m-%dT%H:%M:%S";

/// Store backed by a hosted PostgREST-style API.
pub struct RestStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ProfileRow {
    id: String,
    #[serde(default, alias = "full_name")]
    display_name: Option<String>,
}

impl RestStore {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let response = self
            .authed(self.client.get(self.table_url(table)))
            .query(query)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("GET {table}: {e}")))?
            .error_for_status()
            .map_err(|e| StoreError::Unavailable(format!("GET {table}: {e}")))?;

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::Malformed(format!("{table}: {e}")))
    }
}

#[async_trait]
impl AvailabilityStore for RestStore {
    async fn get_freelancer(&self, id: &str) -> Result<Option<Freelancer>, StoreError> {
        let rows: Vec<ProfileRow> = self
            .select(
                PROFILES,
                &[
                    ("select", "*".to_string()),
                    ("id", format!("eq.{id}")),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().next().map(|row| Freelancer {
            display_name: row.display_name.unwrap_or_default(),
            id: row.id,
        }))
    }

    async fn list_rules(
        &self,
        freelancer_id: &str,
        category_id: Option<&str>,
    ) -> Result<Vec<AvailabilityRecord>, StoreError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("freelancer_id", format!("eq.{freelancer_id}")),
            ("order", "start_time.asc".to_string()),
        ];
        if let Some(category) = category_id {
            query.push(("or", format!("(category_id.eq.{category},category_id.is.null)")));
        }
        self.select(RULES, &query).await
    }
}

#[async_trait]
impl BookingStore for RestStore {
    async fn list_blocking_bookings(
        &self,
        freelancer_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Booking>, StoreError> {
        let records: Vec<BookingRecord> = self
            .select(
                BOOKINGS,
                &[
                    ("select", "*".to_string()),
                    ("freelancer_id", format!("eq.{freelancer_id}")),
                    ("status", "in.(pending,confirmed)".to_string()),
                    ("start_time", format!("lt.{}", to.format(QUERY_TS))),
                    ("end_time", format!("gt.{}", from.format(QUERY_TS))),
                ],
            )
            .await?;

        records
            .into_iter()
            .map(|r| Booking::try_from(r).map_err(StoreError::Malformed))
            .collect()
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        self.authed(self.client.post(self.table_url(BOOKINGS)))
            .header("Prefer", "return=minimal")
            .json(&BookingRecord::from(booking))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("POST {BOOKINGS}: {e}")))?
            .error_for_status()
            .map_err(|e| StoreError::Unavailable(format!("POST {BOOKINGS}: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn rules_handler(
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        assert_eq!(headers.get("apikey").unwrap(), "secret");
        assert_eq!(params.get("freelancer_id").unwrap(), "eq.fl-1");
        assert_eq!(
            params.get("or").unwrap(),
            "(category_id.eq.design,category_id.is.null)"
        );
        Json(serde_json::json!([{
            "id": "r-1",
            "freelancer_id": "fl-1",
            "category_id": null,
            "start_time": "2025-06-16T09:00:00+00:00",
            "end_time": "2025-06-16T17:00:00+00:00",
            "is_recurring": true,
            "recurrence_pattern": "weekly",
            "recurrence_end_date": null,
            "certainty_level": "guaranteed",
            "created_at": "2025-06-01T10:00:00+00:00"
        }]))
    }

    async fn bookings_handler(
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        assert_eq!(params.get("status").unwrap(), "in.(pending,confirmed)");
        assert_eq!(params.get("start_time").unwrap(), "lt.2025-06-17T00:00:00");
        assert_eq!(params.get("end_time").unwrap(), "gt.2025-06-16T00:00:00");
        Json(serde_json::json!([{
            "id": "b-1",
            "freelancer_id": "fl-1",
            "start_time": "2025-06-16T11:00:00",
            "end_time": "2025-06-16T12:00:00",
            "status": "confirmed"
        }]))
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[tokio::test]
    async fn test_reads_rules_and_bookings() {
        let app = Router::new()
            .route("/rest/v1/availability", get(rules_handler))
            .route("/rest/v1/bookings", get(bookings_handler))
            .route(
                "/rest/v1/profiles",
                get(|| async { Json(serde_json::json!([{"id": "fl-1", "full_name": "Sam"}])) }),
            );
        let base = serve(app).await;
        let store = RestStore::new(base, "secret".to_string(), Duration::from_secs(5)).unwrap();

        let rules = store.list_rules("fl-1", Some("design")).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].recurrence_pattern.as_deref(), Some("weekly"));

        let bookings = store
            .list_blocking_bookings("fl-1", dt("2025-06-16 00:00"), dt("2025-06-17 00:00"))
            .await
            .unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].start_time, dt("2025-06-16 11:00"));

        let freelancer = store.get_freelancer("fl-1").await.unwrap().unwrap();
        assert_eq!(freelancer.display_name, "Sam");
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let app = Router::new().route(
            "/rest/v1/availability",
            get(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let base = serve(app).await;
        let store = RestStore::new(base, "secret".to_string(), Duration::from_secs(5)).unwrap();

        let err = store.list_rules("fl-1", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        let store = RestStore::new(
            "http://127.0.0.1:1".to_string(),
            "secret".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = store.get_freelancer("fl-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
