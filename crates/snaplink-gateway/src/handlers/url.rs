use crate::error::{AppError, Result};
use crate::model::{ListedUrl, ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jiff::Timestamp;
use snaplink_core::{ClickEvent, ClickEventStore, ShortKey, UrlStore};
use tracing::warn;

pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(request): Json<ShortenRequest>,
) -> Result<Response> {
    let (key, record) = state.shortener.shorten(&request.url).await?;

    let response = ShortenResponse {
        short_url: key.to_url(&state.base_url),
        short_key: key.as_str().to_string(),
        long_url: record.long_url,
        created_at: record.created_at.as_millisecond(),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

pub async fn redirect_handler(
    Path(short_key): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    let key = ShortKey::new(short_key)?;

    let Some(record) = state.tables.get(&key).await? else {
        return Err(AppError::NotFound("Short URL not found".to_string()));
    };

    // Click tracking is best effort; a failure here must not block the
    // redirect.
    if let Err(err) = state.tables.increment_clicks(&key).await {
        warn!(short_key = key.as_str(), error = %err, "failed to increment click count");
    }
    let event = ClickEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        short_key: key.clone(),
        clicked_at: Timestamp::now(),
        user_agent: header_or_unknown(&headers, header::USER_AGENT),
        ip_address: header_or_unknown(&headers, header::HeaderName::from_static("x-forwarded-for")),
    };
    if let Err(err) = state.tables.append(event).await {
        warn!(short_key = key.as_str(), error = %err, "failed to record click event");
    }

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, record.long_url),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
    )
        .into_response())
}

pub async fn list_urls_handler(State(state): State<AppState>) -> Result<Json<Vec<ListedUrl>>> {
    let mut listed = Vec::new();
    for (key, record) in state.tables.scan().await? {
        // Prefer the exact event count; fall back to the denormalized
        // counter while no events have been recorded yet.
        let counted = state.tables.count_for(&key).await?;
        let total_clicks = if counted > 0 {
            counted
        } else {
            record.click_count
        };

        listed.push(ListedUrl {
            short_key: key.as_str().to_string(),
            long_url: record.long_url,
            total_clicks,
            favicon: record.favicon_path,
        });
    }
    Ok(Json(listed))
}

fn header_or_unknown(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(&name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
