use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{
    get_stats_handler, health_handler, list_urls_handler, redirect_handler, shorten_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/shorten", post(shorten_handler))
            .route("/urls", get(list_urls_handler))
            .route("/stats/{short_key}", get(get_stats_handler))
            .route("/{short_key}", get(redirect_handler))
            .with_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use snaplink_shortener::{RandomKeyGenerator, ShortenerService};
    use snaplink_store::MemoryTables;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router() -> (Router, Arc<MemoryTables>) {
        let tables = Arc::new(MemoryTables::new());
        let shortener = Arc::new(ShortenerService::new(
            tables.clone(),
            RandomKeyGenerator::default(),
        ));
        let state = AppState::new(shortener, tables.clone(), "http://localhost:3000");
        (App::router(state), tables)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _) = test_router();
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn shorten_then_redirect() {
        let (router, _) = test_router();

        let response = router
            .clone()
            .oneshot(
                Request::post("/shorten")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"url":"https://example.com/page"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        let short_key = body["shortKey"].as_str().unwrap().to_string();
        assert_eq!(short_key.len(), 6);
        assert_eq!(body["longUrl"], "https://example.com/page");
        assert_eq!(
            body["shortUrl"],
            format!("http://localhost:3000/{short_key}")
        );

        let response = router
            .oneshot(
                Request::get(format!("/{short_key}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://example.com/page"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    }

    #[tokio::test]
    async fn shorten_rejects_a_bad_url() {
        let (router, _) = test_router();
        let response = router
            .oneshot(
                Request::post("/shorten")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"url":"not-a-url"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let (router, _) = test_router();
        let response = router
            .oneshot(Request::get("/nosuch").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Short URL not found");
    }

    #[tokio::test]
    async fn redirect_records_the_click() {
        use snaplink_core::{ClickEventStore, ShortKey, UrlStore};

        let (router, tables) = test_router();

        let response = router
            .clone()
            .oneshot(
                Request::post("/shorten")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"url":"https://example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let short_key = body_json(response).await["shortKey"]
            .as_str()
            .unwrap()
            .to_string();

        router
            .oneshot(
                Request::get(format!("/{short_key}"))
                    .header(header::USER_AGENT, "test-agent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let key = ShortKey::new_unchecked(&short_key);
        let record = tables.get(&key).await.unwrap().unwrap();
        assert_eq!(record.click_count, 1);
        assert_eq!(tables.count_for(&key).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_includes_click_totals_and_favicon() {
        use snaplink_core::{ShortKey, UrlStore};

        let (router, tables) = test_router();

        let response = router
            .clone()
            .oneshot(
                Request::post("/shorten")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"url":"https://example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let short_key = body_json(response).await["shortKey"]
            .as_str()
            .unwrap()
            .to_string();
        tables
            .set_favicon_path(
                &ShortKey::new_unchecked(&short_key),
                &format!("favicons/{short_key}.ico"),
            )
            .await
            .unwrap();

        router
            .clone()
            .oneshot(
                Request::get(format!("/{short_key}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = router
            .oneshot(Request::get("/urls").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let listed = body.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["shortKey"], short_key.as_str());
        assert_eq!(listed[0]["totalClicks"], 1);
        assert_eq!(
            listed[0]["favicon"],
            format!("favicons/{short_key}.ico").as_str()
        );
    }

    #[tokio::test]
    async fn stats_for_an_untracked_key_are_empty() {
        let (router, _) = test_router();
        let response = router
            .oneshot(Request::get("/stats/abc123").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["shortKey"], "abc123");
        assert_eq!(body["stats"].as_array().unwrap().len(), 0);
    }
}
