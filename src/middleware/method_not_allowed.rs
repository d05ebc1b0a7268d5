use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// Replaces the router's bodyless 405 with the JSON error body used by every
/// other error, keeping the `Allow` header.
pub async fn method_not_allowed_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let response = next.run(request).await;
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    tracing::debug!(method = %method, "Method not allowed");

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut json = AppError::MethodNotAllowed.into_response();
    if let Some(allow) = allow {
        json.headers_mut().insert(header::ALLOW, allow);
    }
    json
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::post, Router};
    use axum_test::TestServer;
    use serde_json::json;

    #[tokio::test]
    async fn test_wrong_method_gets_json_body() {
        let app = Router::new()
            .route("/recommend", post(|| async { "ok" }))
            .layer(middleware::from_fn(method_not_allowed_middleware));
        let server = TestServer::new(app).unwrap();

        let response = server.get("/recommend").await;

        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
        response.assert_json(&json!({"detail": "Method Not Allowed"}));
        assert_eq!(response.header("allow"), "POST");
    }

    #[tokio::test]
    async fn test_other_responses_pass_through() {
        let app = Router::new()
            .route("/recommend", post(|| async { "ok" }))
            .layer(middleware::from_fn(method_not_allowed_middleware));
        let server = TestServer::new(app).unwrap();

        let response = server.post("/recommend").await;

        response.assert_status_ok();
        response.assert_text("ok");
    }
}
