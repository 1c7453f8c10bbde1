//! HTTP API Server
//!
//! REST surface over the document store: health check, per-collection CRUD,
//! weekly-fee payment routes, and the gallery top-five endpoints that drive
//! the hero-slide cascade.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, put},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::model::{
    Activity, Doc, Donation, Expense, Experience, GalleryItem, HealthStatus, HeroSlide, Member,
    Payment, ReorderRequest, Validate, WeeklyFeeRecord,
};
use crate::store::{Store, Stored, StoreSlot};

/// HTTP API server
pub struct HttpServer {
    config: ServerConfig,
    store: Arc<Store>,
}

impl HttpServer {
    /// Create a new HTTP server over a store
    pub fn new(config: ServerConfig, store: Arc<Store>) -> Self {
        Self { config, store }
    }

    /// Get the store for sharing with other components
    pub fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    /// Create the router
    pub(crate) fn create_router(store: Arc<Store>, cors_enabled: bool) -> Router {
        let mut router = Router::new()
            .route("/api/health-check", get(handle_health))
            // Plain collections
            .route(
                "/api/hero-slides",
                get(list_docs::<HeroSlide>).post(upsert_doc::<HeroSlide>),
            )
            .route("/api/hero-slides/:id", delete(delete_doc::<HeroSlide>))
            .route(
                "/api/activities",
                get(list_docs::<Activity>).post(upsert_doc::<Activity>),
            )
            .route("/api/activities/:id", delete(delete_doc::<Activity>))
            .route(
                "/api/donations",
                get(list_docs::<Donation>).post(upsert_doc::<Donation>),
            )
            .route("/api/donations/:id", delete(delete_doc::<Donation>))
            .route(
                "/api/expenses",
                get(list_docs::<Expense>).post(upsert_doc::<Expense>),
            )
            .route("/api/expenses/:id", delete(delete_doc::<Expense>))
            .route(
                "/api/experiences",
                get(list_docs::<Experience>).post(upsert_doc::<Experience>),
            )
            .route("/api/experiences/:id", delete(delete_doc::<Experience>))
            // Members own their weekly fee record's lifecycle
            .route(
                "/api/members",
                get(list_docs::<Member>).post(handle_member_upsert),
            )
            .route("/api/members/:id", delete(handle_member_delete))
            // Weekly fees
            .route("/api/weekly-fees", get(list_docs::<WeeklyFeeRecord>))
            .route(
                "/api/weekly-fees/:member_id",
                get(handle_member_fees).post(handle_add_payment),
            )
            .route(
                "/api/weekly-fees/:member_id/:payment_id",
                put(handle_update_payment).delete(handle_delete_payment),
            )
            // Gallery, including the top-five cascade endpoints
            .route(
                "/api/gallery",
                get(list_docs::<GalleryItem>).post(upsert_doc::<GalleryItem>),
            )
            .route("/api/gallery/top5", get(handle_top_five))
            .route("/api/gallery/toggle-top5/:id", put(handle_toggle_top_five))
            .route("/api/gallery/update-order", put(handle_update_order))
            .route("/api/gallery/:id", delete(handle_gallery_delete))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(store);

        if cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        router
    }

    /// Start the HTTP server
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            tracing::info!("HTTP API disabled");
            return Ok(());
        }

        let app = Self::create_router(Arc::clone(&self.store), self.config.cors_enabled);

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address).await?;
        tracing::info!("HTTP API listening on {}", self.config.bind_address);

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {e}")))?;

        Ok(())
    }
}

// ============ Response Types ============

/// Message response, used by delete and reorder endpoints
#[derive(Debug, Serialize)]
struct MsgResponse {
    msg: String,
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    msg: String,
}

/// Error wrapper mapping store errors onto HTTP status codes
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse { msg: self.0.to_string() })).into_response()
    }
}

// ============ Handlers ============

async fn handle_health(State(store): State<Arc<Store>>) -> Json<HealthStatus> {
    Json(store.health())
}

async fn list_docs<T: StoreSlot>(State(store): State<Arc<Store>>) -> Json<Vec<Stored<T>>> {
    Json(store.list::<T>().await)
}

async fn upsert_doc<T: StoreSlot + Validate>(
    State(store): State<Arc<Store>>,
    Json(doc): Json<Doc<T>>,
) -> std::result::Result<Json<Stored<T>>, ApiError> {
    doc.data.validate()?;
    let stored = T::slot(&store).upsert(doc).await?;
    Ok(Json(stored))
}

async fn delete_doc<T: StoreSlot>(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
) -> std::result::Result<Json<MsgResponse>, ApiError> {
    T::slot(&store)
        .remove(&id)
        .await
        .ok_or_else(|| Error::NotFound(format!("{} {} not found", T::COLLECTION, id)))?;
    Ok(Json(MsgResponse {
        msg: "removed".to_string(),
    }))
}

async fn handle_member_upsert(
    State(store): State<Arc<Store>>,
    Json(doc): Json<Doc<Member>>,
) -> std::result::Result<Json<Stored<Member>>, ApiError> {
    doc.data.validate()?;
    let stored = store.upsert_member(doc).await?;
    Ok(Json(stored))
}

async fn handle_member_delete(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
) -> std::result::Result<Json<MsgResponse>, ApiError> {
    store.delete_member(&id).await?;
    Ok(Json(MsgResponse {
        msg: "Member removed".to_string(),
    }))
}

async fn handle_member_fees(
    State(store): State<Arc<Store>>,
    Path(member_id): Path<String>,
) -> std::result::Result<Json<Stored<WeeklyFeeRecord>>, ApiError> {
    Ok(Json(store.member_fees(&member_id).await?))
}

async fn handle_add_payment(
    State(store): State<Arc<Store>>,
    Path(member_id): Path<String>,
    Json(payment): Json<Payment>,
) -> std::result::Result<Json<Stored<WeeklyFeeRecord>>, ApiError> {
    payment.validate()?;
    Ok(Json(store.add_payment(&member_id, payment).await?))
}

async fn handle_update_payment(
    State(store): State<Arc<Store>>,
    Path((member_id, payment_id)): Path<(String, String)>,
    Json(payment): Json<Payment>,
) -> std::result::Result<Json<Stored<WeeklyFeeRecord>>, ApiError> {
    payment.validate()?;
    Ok(Json(
        store.update_payment(&member_id, &payment_id, payment).await?,
    ))
}

async fn handle_delete_payment(
    State(store): State<Arc<Store>>,
    Path((member_id, payment_id)): Path<(String, String)>,
) -> std::result::Result<Json<Stored<WeeklyFeeRecord>>, ApiError> {
    Ok(Json(store.delete_payment(&member_id, &payment_id).await?))
}

async fn handle_top_five(State(store): State<Arc<Store>>) -> Json<Vec<Stored<GalleryItem>>> {
    Json(store.top_five().await)
}

async fn handle_toggle_top_five(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
) -> std::result::Result<Json<Stored<GalleryItem>>, ApiError> {
    Ok(Json(store.toggle_top_five(&id).await?))
}

async fn handle_update_order(
    State(store): State<Arc<Store>>,
    Json(req): Json<ReorderRequest>,
) -> std::result::Result<Json<MsgResponse>, ApiError> {
    store.reorder_gallery(&req.items).await?;
    Ok(Json(MsgResponse {
        msg: "Order updated successfully".to_string(),
    }))
}

async fn handle_gallery_delete(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
) -> std::result::Result<Json<MsgResponse>, ApiError> {
    store.delete_gallery_item(&id).await?;
    Ok(Json(MsgResponse {
        msg: "Gallery item removed".to_string(),
    }))
}

/// Bind a router over the given store on an ephemeral port.
#[cfg(test)]
pub(crate) async fn spawn_test_server(store: Arc<Store>) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = HttpServer::create_router(store, false);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn setup() -> (String, Arc<Store>) {
        let store = Arc::new(Store::new());
        let addr = spawn_test_server(Arc::clone(&store)).await;
        (format!("http://{addr}"), store)
    }

    #[tokio::test]
    async fn test_health_check_reports_database_state() {
        let (base, store) = setup().await;
        let client = reqwest::Client::new();

        let health: HealthStatus = client
            .get(format!("{base}/api/health-check"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health.server, "running");
        assert!(health.database_connected());

        store.set_connected(false);
        let health: HealthStatus = client
            .get(format!("{base}/api/health-check"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health.database, "disconnected");
        assert_eq!(health.db_state, 0);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_payload() {
        let (base, _store) = setup().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/gallery"))
            .json(&json!({ "title": "", "imageUrl": "x.jpg" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_404() {
        let (base, _store) = setup().await;
        let client = reqwest::Client::new();

        let resp = client
            .delete(format!("{base}/api/donations/no-such-id"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_member_create_then_payment_roundtrip() {
        let (base, _store) = setup().await;
        let client = reqwest::Client::new();

        let member: serde_json::Value = client
            .post(format!("{base}/api/members"))
            .json(&json!({
                "name": "John Doe",
                "contact": "john.doe@example.com",
                "phone": "+1-555-0100",
                "joinDate": "2024-01-15",
                "role": "Student",
                "image": ""
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let member_id = member["_id"].as_str().unwrap().to_string();

        // The fee record was created with the member.
        let fees: serde_json::Value = client
            .get(format!("{base}/api/weekly-fees/{member_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fees["memberName"], "John Doe");

        // Add, update, then delete a payment.
        let record: serde_json::Value = client
            .post(format!("{base}/api/weekly-fees/{member_id}"))
            .json(&json!({ "date": "2024-08-05", "amount": 20.0, "status": "paid" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let payment_id = record["payments"][0]["_id"].as_str().unwrap().to_string();

        let resp = client
            .put(format!("{base}/api/weekly-fees/{member_id}/{payment_id}"))
            .json(&json!({ "date": "2024-08-05", "amount": 25.0, "status": "overdue" }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());

        let resp = client
            .delete(format!("{base}/api/weekly-fees/{member_id}/{payment_id}"))
            .send()
            .await
            .unwrap();
        let record: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(record["payments"].as_array().unwrap().len(), 0);

        // Deleting the member removes the fee record too.
        client
            .delete(format!("{base}/api/members/{member_id}"))
            .send()
            .await
            .unwrap();
        let resp = client
            .get(format!("{base}/api/weekly-fees/{member_id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_payment_for_unknown_member_is_404() {
        let (base, _store) = setup().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/weekly-fees/no-such-member"))
            .json(&json!({ "date": "2024-08-05", "amount": 20.0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_gallery_toggle_rebuilds_hero_slides() {
        let (base, _store) = setup().await;
        let client = reqwest::Client::new();

        let item: serde_json::Value = client
            .post(format!("{base}/api/gallery"))
            .json(&json!({ "title": "Finals", "imageUrl": "finals.jpg" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = item["_id"].as_str().unwrap();

        let toggled: serde_json::Value = client
            .put(format!("{base}/api/gallery/toggle-top5/{id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(toggled["isTop5"], true);
        assert_eq!(toggled["top5Order"], 1);

        let slides: serde_json::Value = client
            .get(format!("{base}/api/hero-slides"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let slides = slides.as_array().unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0]["title"], "Finals");
        assert_eq!(slides[0]["backgroundImage"], "finals.jpg");

        let top: serde_json::Value = client
            .get(format!("{base}/api/gallery/top5"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(top.as_array().unwrap().len(), 1);
    }
}
