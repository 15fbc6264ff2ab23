use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use crate::error::{FilterError, FilterResult};
use crate::filter::ImageFilter;
use crate::s3::ImageStore;
use crate::types::{FilteredImageQuery, FilteredImageResponse};

/// Usage text served at `/`
pub const USAGE: &str = "Try GET /filteredimage?image_url={{}}";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub filter: Arc<dyn ImageFilter>,
    pub store: Arc<dyn ImageStore>,
    pub bucket_name: Option<String>,
}

impl AppState {
    pub fn new(
        filter: Arc<dyn ImageFilter>,
        store: Arc<dyn ImageStore>,
        bucket_name: Option<String>,
    ) -> Self {
        Self {
            filter,
            store,
            bucket_name,
        }
    }
}

/// Create the HTTP router.
///
/// `/filteredimage` is only routed when `state` is present; `/` always is.
pub fn create_router(state: Option<AppState>) -> Router {
    let router = Router::new().route("/", get(usage));

    let router = match state {
        Some(state) => router.merge(
            Router::new()
                .route("/filteredimage", get(filtered_image))
                .with_state(state),
        ),
        None => router,
    };

    router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Root endpoint
async fn usage() -> impl IntoResponse {
    USAGE
}

/// Filter the image at `image_url` and upload the result
async fn filtered_image(
    State(state): State<AppState>,
    query: Result<Query<FilteredImageQuery>, QueryRejection>,
) -> FilterResult<Json<FilteredImageResponse>> {
    // A repeated image_url cannot name a single image
    let Query(query) = query.map_err(|e| {
        error!("Rejected query string: {}", e);
        FilterError::ImageProcessing(e.body_text())
    })?;

    let image_url = query
        .image_url()
        .ok_or_else(|| FilterError::Validation("missing image_url".to_string()))?;

    let image_url = process_image(&state, image_url).await.map_err(|e| {
        error!("Error processing image: {}", e);
        e
    })?;

    Ok(Json(FilteredImageResponse { image_url }))
}

#[instrument(skip(state))]
async fn process_image(state: &AppState, image_url: &str) -> FilterResult<String> {
    // Error paths leave the temp file to `image`'s drop
    let image = state.filter.filter_image_from_url(image_url).await?;
    let buffer = image.read().await?;

    let bucket_name = state
        .bucket_name
        .as_deref()
        .ok_or_else(|| FilterError::Upload("S3_BUCKET_NAME is not set".to_string()))?;

    let url = state.store.upload(buffer, bucket_name).await?;
    image.remove().await;

    info!("Filtered image available at {}", url);
    Ok(url)
}
