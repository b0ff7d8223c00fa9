use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use bytes::Bytes;
use chrono::Utc;
use lapse_db::Database;
use lapse_jobs::media::media_url;
use lapse_storage::StorageError;
use lapse_types::api::{CreateMessageRequest, CreatePostRequest, HealthResponse, UploadResponse};
use lapse_types::events::StoreEvent;
use lapse_types::models::{Message, Post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes;

    Router::new()
        .route("/chatrooms/{chat_room_id}/messages", post(create_message))
        .route("/chatrooms/{chat_room_id}/messages/{message_id}", get(get_message))
        .route("/posts", post(create_post))
        .route("/posts/{post_id}", get(get_post))
        .route("/v0/b/{bucket}/o/{object}", get(download_media).put(upload_media))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, StatusCode>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    state.store.blocking(f).await.map_err(|e| {
        error!("Database error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ── Messages ────────────────────────────────────────────────────────────

/// POST /chatrooms/{chat_room_id}/messages — store a message and fire the
/// record-created trigger with its snapshot.
pub async fn create_message(
    State(state): State<AppState>,
    Path(chat_room_id): Path<String>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if chat_room_id.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let message = Message {
        id: Uuid::new_v4(),
        chat_room_id,
        status: req.status,
        body: req.body,
        created_at: Utc::now(),
    };

    let row = message.clone();
    with_db(&state, move |db| db.insert_message(&row)).await?;

    state.publish(StoreEvent::MessageCreated(message.clone()));

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path((chat_room_id, message_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = with_db(&state, move |db| {
        db.get_message(&chat_room_id, &message_id.to_string())
    })
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;

    let message = row.into_message().map_err(|e| {
        error!("Corrupt message row: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(message))
}

// ── Posts ───────────────────────────────────────────────────────────────

pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let post = Post {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        media_url: req.media_url,
    };

    let row = post.clone();
    with_db(&state, move |db| db.insert_post(&row)).await?;

    info!("Post {} created", post.id);
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = with_db(&state, move |db| db.get_post(&post_id.to_string()))
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;

    let post = row.into_post().map_err(|e| {
        error!("Corrupt post row: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(post))
}

// ── Media ───────────────────────────────────────────────────────────────

/// PUT /v0/b/{bucket}/o/{object} — store a blob. `object` is the
/// percent-encoded blob path (`images%2Fabc.jpg`).
pub async fn upload_media(
    State(state): State<AppState>,
    Path((bucket, object)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    if bucket != state.config.bucket {
        return Err(StatusCode::NOT_FOUND);
    }
    if body.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let size = state
        .storage
        .put(&object, &body)
        .await
        .map_err(storage_status)?;

    info!("Stored media {} ({} bytes)", object, size);
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            media_url: media_url(&state.config.public_url, &bucket, &object),
            path: object,
            size,
        }),
    ))
}

pub async fn download_media(
    State(state): State<AppState>,
    Path((bucket, object)): Path<(String, String)>,
) -> Result<impl IntoResponse, StatusCode> {
    if bucket != state.config.bucket {
        return Err(StatusCode::NOT_FOUND);
    }

    let bytes = state.storage.read(&object).await.map_err(storage_status)?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

fn storage_status(err: StorageError) -> StatusCode {
    match err {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::InvalidPath(path) => {
            warn!("Rejected blob path {:?}", path);
            StatusCode::BAD_REQUEST
        }
        StorageError::Io(e) => {
            error!("Blob storage error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use lapse_jobs::SqliteStore;
    use lapse_storage::Storage;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::state::AppStateInner;

    async fn test_state() -> (
        tempfile::TempDir,
        AppState,
        mpsc::UnboundedReceiver<StoreEvent>,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("blobs")).await.unwrap();
        let (events, rx) = mpsc::unbounded_channel();
        let state = Arc::new(AppStateInner {
            store: SqliteStore::new(Arc::new(Database::open_in_memory().unwrap())),
            storage: Arc::new(storage),
            config: Config::from_lookup(|_| None).unwrap(),
            events,
        });
        (dir, state, rx)
    }

    async fn send(app: Router, method: Method, uri: &str, body: Body) -> (StatusCode, Bytes) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes)
    }

    #[tokio::test]
    async fn creating_a_message_fires_the_trigger() {
        let (_dir, state, mut rx) = test_state().await;
        let app = router(state);

        let (status, body) = send(
            app,
            Method::POST,
            "/chatrooms/room-7/messages",
            Body::from(r#"{"body":"hello"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let created: Message = serde_json::from_slice(&body).unwrap();
        assert_eq!(created.chat_room_id, "room-7");

        let StoreEvent::MessageCreated(snapshot) = rx.try_recv().unwrap();
        assert_eq!(snapshot, created);
    }

    #[tokio::test]
    async fn uploaded_media_url_resolves_back_to_the_blob() {
        let (_dir, state, _rx) = test_state().await;
        let app = router(state.clone());

        let (status, body) = send(
            app.clone(),
            Method::PUT,
            "/v0/b/lapse-media/o/images%2Fabc.jpg",
            Body::from("jpeg"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let upload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(upload["path"], "images/abc.jpg");
        let url = upload["media_url"].as_str().unwrap();
        assert_eq!(
            lapse_jobs::media::blob_path_from_url(url).unwrap(),
            "images/abc.jpg"
        );
        assert!(state.storage.exists("images/abc.jpg").await.unwrap());

        let (status, body) = send(
            app.clone(),
            Method::GET,
            "/v0/b/lapse-media/o/images%2Fabc.jpg",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"jpeg");

        let (status, _) = send(app, Method::GET, "/v0/b/other/o/x.jpg", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn escaping_blob_paths_are_rejected() {
        let (_dir, state, _rx) = test_state().await;
        let app = router(state);

        let (status, _) = send(
            app,
            Method::PUT,
            "/v0/b/lapse-media/o/..%2Fsecret",
            Body::from("x"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn posts_roundtrip() {
        let (_dir, state, _rx) = test_state().await;
        let app = router(state);

        let (status, body) = send(
            app.clone(),
            Method::POST,
            "/posts",
            Body::from(r#"{"media_url":"http://localhost:3300/v0/b/lapse-media/o/a.jpg"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Post = serde_json::from_slice(&body).unwrap();

        let (status, body) =
            send(app, Method::GET, &format!("/posts/{}", created.id), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: Post = serde_json::from_slice(&body).unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.media_url, created.media_url);
    }
}
