use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use super::form::ContactForm;
use super::notification::ContactNotifier;
use super::service::{ContactError, ContactService};
use super::storage::ContactStore;
use super::verification::HumanVerifier;

/// Router exposing the contact endpoint. Rate limiting is composed around
/// this router by the caller; it is not a concern of the handler itself.
pub fn contact_router<V, S, N>(service: Arc<ContactService<V, S, N>>) -> Router
where
    V: HumanVerifier + 'static,
    S: ContactStore + 'static,
    N: ContactNotifier + 'static,
{
    Router::new()
        .route("/api/contact", post(submit_handler::<V, S, N>))
        .with_state(service)
}

pub(crate) async fn submit_handler<V, S, N>(
    State(service): State<Arc<ContactService<V, S, N>>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(form): Json<ContactForm>,
) -> Response
where
    V: HumanVerifier + 'static,
    S: ContactStore + 'static,
    N: ContactNotifier + 'static,
{
    match service.submit(form, addr.ip()).await {
        Ok(receipt) => {
            let payload = json!({ "message": receipt.message });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err @ (ContactError::Validation(_) | ContactError::Verification)) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        Err(err @ ContactError::Storage) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
