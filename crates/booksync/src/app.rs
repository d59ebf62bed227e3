use std::time::Duration;

use axum::{
    http::{header, Method, StatusCode},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{
        books::{create_book, delete_book, get_book, list_books, update_book},
        health::{livez, readyz},
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    // CORS configuration for API endpoints
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .layer(cors);

    Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn body_json(response: Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_livez() {
        let app = create_app(AppState::default());

        let response = app.oneshot(get_request("/livez")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readyz_reports_bus_states() {
        let app = create_app(AppState::default());

        let response = app.oneshot(get_request("/readyz")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "publisher": "disconnected", "subscriber": "disconnected" })
        );
    }

    #[tokio::test]
    async fn test_list_books_empty() {
        let app = create_app(AppState::default());

        let response = app.oneshot(get_request("/api/books")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_create_and_get_book() {
        let app = create_app(AppState::default());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/books",
                json!({ "title": "Dune", "author": "Herbert", "publishedYear": 1965 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let book = body_json(response).await;
        assert_eq!(book["title"], "Dune");
        assert_eq!(book["publishedYear"], 1965);

        let book_id = book["id"].as_str().unwrap();
        assert!(!book_id.is_empty());
        let response = app
            .oneshot(get_request(&format!("/api/books/{book_id}")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, book);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_fields() {
        let app = create_app(AppState::default());

        for body in [
            json!({ "title": "  ", "author": "Herbert" }),
            json!({ "title": "Dune", "author": "Herbert", "publishedYear": -1 }),
            json!({ "title": "Dune", "author": "Herbert", "publishedYear": 19.5 }),
            json!({ "title": "Dune" }),
        ] {
            let response = app
                .clone()
                .oneshot(json_request("POST", "/api/books", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_get_nonexistent_book() {
        let app = create_app(AppState::default());

        let response = app
            .oneshot(get_request("/api/books/does-not-exist"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_book_changes_only_given_fields() {
        let app = create_app(AppState::default());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/books",
                json!({ "title": "Dune", "author": "Herbert", "publishedYear": 1965 }),
            ))
            .await
            .unwrap();
        let book = body_json(response).await;
        let uri = format!("/api/books/{}", book["id"].as_str().unwrap());

        let response = app
            .clone()
            .oneshot(json_request("PUT", &uri, json!({ "publishedYear": 1966 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["publishedYear"], 1966);
        assert_eq!(updated["title"], "Dune");

        let response = app.oneshot(get_request(&uri)).await.unwrap();
        assert_eq!(body_json(response).await, updated);
    }

    #[tokio::test]
    async fn test_update_validates_and_reports_missing() {
        let app = create_app(AppState::default());

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/books/missing",
                json!({ "author": "" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(json_request(
                "PUT",
                "/api/books/missing",
                json!({ "title": "Dune" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_book() {
        let app = create_app(AppState::default());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/books",
                json!({ "title": "Dune", "author": "Herbert" }),
            ))
            .await
            .unwrap();
        let book = body_json(response).await;
        let uri = format!("/api/books/{}", book["id"].as_str().unwrap());

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, book);

        let response = app.clone().oneshot(get_request(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
