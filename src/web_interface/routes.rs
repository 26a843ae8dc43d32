use log::{error, info, warn};
use rust_embed::RustEmbed;
use std::sync::Arc;
use warp::{http::StatusCode, path::Tail, reply, Filter, Rejection, Reply};

use super::types::{ApiError, InsertResponse, ListQuery, StatusResponse};
use crate::storage::storage_trait::Storage;
use crate::storage::types::NewAttempt;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

const INTERNAL_ERROR: &str = "Internal server error";

/// Static dashboard files, compiled into the binary.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/assets/"]
struct DashboardAssets;

fn internal_error() -> reply::WithStatus<reply::Json> {
    reply::with_status(
        reply::json(&ApiError::new(INTERNAL_ERROR)),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
}

/// GET /
pub fn root_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).map(|| {
        reply::json(&StatusResponse {
            status: "ok".to_string(),
            message: Some("Snare capture API is running".to_string()),
        })
    })
}

/// GET /health
///
/// Answers `503` when the database does not respond.
pub fn health_route(
    storage: Arc<dyn Storage>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let storage = storage.clone();
            async move {
                match storage.ping().await {
                    Ok(()) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&StatusResponse {
                            status: "ok".to_string(),
                            message: None,
                        }),
                        StatusCode::OK,
                    )),
                    Err(e) => {
                        error!("Health check failed: {}", e);
                        Ok::<_, Rejection>(reply::with_status(
                            reply::json(&StatusResponse {
                                status: "unavailable".to_string(),
                                message: Some(e.to_string()),
                            }),
                            StatusCode::SERVICE_UNAVAILABLE,
                        ))
                    }
                }
            }
        })
}

/// POST /attempts/
pub fn create_attempt_route(
    storage: Arc<dyn Storage>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("attempts")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and_then(move |candidate: NewAttempt| {
            let storage = storage.clone();
            async move {
                let attempt = match candidate.validate() {
                    Ok(a) => a,
                    Err(e) => {
                        warn!("Rejected attempt: {}", e);
                        return Ok::<_, Rejection>(reply::with_status(
                            reply::json(&ApiError::new(e.to_string())),
                            StatusCode::UNPROCESSABLE_ENTITY,
                        ));
                    }
                };

                match storage.insert(attempt).await {
                    Ok(stored) => {
                        info!(
                            "New attempt logged: {} - {}",
                            stored.ip,
                            stored.data.as_deref().unwrap_or("")
                        );
                        Ok::<_, Rejection>(reply::with_status(
                            reply::json(&InsertResponse {
                                status: "success".to_string(),
                                id: stored.id,
                            }),
                            StatusCode::CREATED,
                        ))
                    }
                    Err(e) => {
                        error!("Error logging attempt: {}", e);
                        Ok::<_, Rejection>(internal_error())
                    }
                }
            }
        })
}

/// GET /attempts/?skip=&limit=
pub fn list_attempts_route(
    storage: Arc<dyn Storage>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("attempts")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<ListQuery>())
        .and_then(move |query: ListQuery| {
            let storage = storage.clone();
            async move {
                match storage.list(query.skip, query.limit).await {
                    Ok(list) => {
                        Ok::<_, Rejection>(reply::with_status(reply::json(&list), StatusCode::OK))
                    }
                    Err(e) => {
                        error!("Error fetching attempts: {}", e);
                        Ok::<_, Rejection>(internal_error())
                    }
                }
            }
        })
}

/// GET /stats/
pub fn stats_route(
    storage: Arc<dyn Storage>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("stats")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let storage = storage.clone();
            async move {
                match storage.stats().await {
                    Ok(stats) => {
                        Ok::<_, Rejection>(reply::with_status(reply::json(&stats), StatusCode::OK))
                    }
                    Err(e) => {
                        error!("Error fetching stats: {}", e);
                        Ok::<_, Rejection>(internal_error())
                    }
                }
            }
        })
}

/// GET /dashboard and its static files
pub fn dashboard_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("dashboard")
        .and(warp::path::tail())
        .and(warp::get())
        .and_then(|tail: Tail| async move {
            let path = match tail.as_str() {
                "" => "index.html",
                other => other,
            };

            match DashboardAssets::get(path) {
                Some(file) => {
                    let mime = mime_guess::from_path(path).first_or_octet_stream();
                    let res = reply::with_header(
                        file.data.into_owned(),
                        "Content-Type",
                        mime.as_ref(),
                    )
                    .into_response();
                    Ok::<_, Rejection>(res)
                }
                None => Err(warp::reject::not_found()),
            }
        })
}
