use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use log::debug;
use warp::body::BodyDeserializeError;
use warp::{http::Method, http::StatusCode, reject, reply, Filter, Rejection, Reply};

use super::routes::{
    create_attempt_route, dashboard_route, health_route, list_attempts_route, root_route,
    stats_route,
};
use super::types::ApiError;
use crate::error_handling::types::WebError;
use crate::storage::storage_trait::Storage;

/// HTTP front of the attempt storage: capture API and dashboard.
pub struct WebServer {
    storage: Arc<dyn Storage>,
}

impl WebServer {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// All routes, with JSON rejections and permissive CORS.
    pub fn routes(&self) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
        let cors = warp::cors()
            .allow_any_origin()
            .allow_methods(vec![Method::GET, Method::POST])
            .allow_headers(vec!["content-type"]);

        root_route()
            .or(health_route(self.storage.clone()))
            .or(create_attempt_route(self.storage.clone()))
            .or(list_attempts_route(self.storage.clone()))
            .or(stats_route(self.storage.clone()))
            .or(dashboard_route())
            .recover(handle_rejection)
            .with(cors)
    }

    /// Binds `addr` and returns the bound address with the serving future, which must be
    /// polled for requests to be answered.
    pub fn bind(
        &self,
        addr: SocketAddr,
    ) -> Result<(SocketAddr, impl std::future::Future<Output = ()> + 'static), WebError> {
        warp::serve(self.routes())
            .try_bind_ephemeral(addr)
            .map_err(|e| WebError::BindFailed(format!("{}: {}", addr, e)))
    }
}

/// Turns warp rejections into `{"message": ...}` replies.
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body too large".to_string(),
        )
    } else if err.find::<reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            "Content-Length header required".to_string(),
        )
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected application/json".to_string(),
        )
    } else if err.find::<reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    } else {
        debug!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(reply::with_status(
        reply::json(&ApiError::new(message)),
        code,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use crate::web_interface::routes::MAX_BODY_BYTES;
    use serde_json::json;
    use tempfile::TempDir;

    async fn server() -> (WebServer, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open_file(dir.path().join("attempts.db"))
            .await
            .unwrap();
        (WebServer::new(Arc::new(storage)), dir)
    }

    fn message(body: &[u8]) -> String {
        serde_json::from_slice::<ApiError>(body).unwrap().message
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let (server, _dir) = server().await;

        let res = warp::test::request()
            .method("GET")
            .path("/nope")
            .reply(&server.routes())
            .await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(message(res.body()), "Not found");
    }

    #[tokio::test]
    async fn test_bad_json_is_400() {
        let (server, _dir) = server().await;

        let res = warp::test::request()
            .method("POST")
            .path("/attempts/")
            .header("content-type", "application/json")
            .body(r#"{"ip": 12}"#)
            .reply(&server.routes())
            .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(message(res.body()).starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let (server, _dir) = server().await;
        let data = "a".repeat(MAX_BODY_BYTES as usize + 1);

        let res = warp::test::request()
            .method("POST")
            .path("/attempts/")
            .json(&json!({"ip": "10.0.0.1", "data": data}))
            .reply(&server.routes())
            .await;

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_invalid_ip_is_422() {
        let (server, _dir) = server().await;

        let res = warp::test::request()
            .method("POST")
            .path("/attempts/")
            .json(&json!({"ip": "not-an-ip", "data": null}))
            .reply(&server.routes())
            .await;

        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(message(res.body()).contains("not-an-ip"));
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let (server, _dir) = server().await;

        let res = warp::test::request()
            .method("DELETE")
            .path("/attempts/")
            .reply(&server.routes())
            .await;

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_invalid_query_is_400() {
        let (server, _dir) = server().await;

        let res = warp::test::request()
            .method("GET")
            .path("/attempts/?skip=-1")
            .reply(&server.routes())
            .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(message(res.body()), "Invalid query string");
    }

    #[tokio::test]
    async fn test_cors_headers_for_any_origin() {
        let (server, _dir) = server().await;

        let res = warp::test::request()
            .method("GET")
            .path("/stats/")
            .header("origin", "http://dashboard.example")
            .reply(&server.routes())
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res
            .headers()
            .contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_bind_reports_address_in_use() {
        let (server, _dir) = server().await;
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = occupied.local_addr().unwrap();

        assert!(matches!(server.bind(addr), Err(WebError::BindFailed(_))));
    }
}
