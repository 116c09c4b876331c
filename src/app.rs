use crate::error::PipelineError;
use crate::metrics;
use crate::models;
use crate::squares;
use crate::validated_json::ValidatedJson;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Returns the router of the sum of squares service.
pub fn router() -> Router {
    Router::new()
        .route("/sum_of_squares", post(sum_of_squares))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .on_request(metrics::request_counter)
                    .on_response(metrics::record_response_metrics::<axum::body::BoxBody>),
            ),
        )
}

/// Handler for the sum of squares endpoint.
///
/// The graph runs on a blocking thread since it fans out to the rayon thread pool.
async fn sum_of_squares(
    ValidatedJson(request): ValidatedJson<models::SumOfSquaresRequest>,
) -> Result<Json<models::SumOfSquaresResponse>, PipelineError> {
    let length = request.length;
    let sum = tokio::task::spawn_blocking(move || {
        squares::sum_of_squares(length, &mut rand::thread_rng())
    })
    .await?;
    tracing::debug!(length, sum, "computed sum of squares");
    Ok(Json(models::SumOfSquaresResponse {
        sum_of_squares: sum,
    }))
}
