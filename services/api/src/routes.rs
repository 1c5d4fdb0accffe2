//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{Field, MultipartError},
    },
    http::{HeaderMap, StatusCode, header::CONTENT_LENGTH},
    middleware,
    response::IntoResponse,
    routing::get,
};
use bytes::Bytes;
use media::{
    CatalogEntry, CatalogListing, Envelope, MediaError, Principal, UploadReceipt, UploadRequest,
    VideoBlob,
};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    middleware::auth_middleware,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let videos = Router::new()
        .route("/videos", get(list_videos).post(upload_video))
        .route("/videos/:id", get(get_video))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(videos)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db_pool {
        Some(pool) => match common::database::health_check(pool).await {
            Ok(_) => "ok",
            Err(e) if e.is_unavailable() => {
                tracing::warn!("Database unreachable: {}", e);
                "unavailable"
            }
            Err(e) => {
                tracing::error!("Database health check failed: {}", e);
                "error"
            }
        },
        None => "not_configured",
    };

    Json(json!({
        "status": "ok",
        "service": "api-service",
        "database": database,
    }))
}

/// List every video, newest first
pub async fn list_videos(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<CatalogListing>>> {
    let listing = state.catalog.list_all().await?;
    Ok(Json(Envelope::ok(listing)))
}

/// Get a video by ID
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Envelope<CatalogEntry>>> {
    let entry = state.catalog.get_by_id(id).await?;
    Ok(Json(Envelope::ok(entry)))
}

/// Upload a video from a multipart form with `file`, `title`,
/// `description` and optional `duration_seconds` fields
pub async fn upload_video(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let limits = FormLimits {
        max_upload_bytes: state.pipeline.policy().max_upload_bytes,
        content_length: headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok()),
    };
    let request = read_upload_form(multipart, &limits).await?;
    let principal = principal.map(|Extension(p)| p);

    let file_name = request.blob.file_name.clone();
    let on_progress = |percent: u8| debug!("Upload of {}: {}%", file_name, percent);

    let receipt: UploadReceipt = state
        .pipeline
        .upload(request, principal.as_ref(), Some(&on_progress))
        .await?;

    info!("Video {} available at {}", receipt.asset_id, receipt.public_url);

    Ok((StatusCode::CREATED, Json(Envelope::ok(receipt))))
}

/// What the upload form is measured against when the body limit cuts it off.
struct FormLimits {
    max_upload_bytes: u64,
    content_length: Option<u64>,
}

impl FormLimits {
    /// A body cut off by the request limit is an oversized file, not a
    /// malformed form.
    fn reject(&self, err: MultipartError, context: &str) -> ApiError {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            warn!("Upload body exceeded the request limit: {}", err);
            let size_bytes = self
                .content_length
                .unwrap_or(self.max_upload_bytes.saturating_add(1))
                .max(self.max_upload_bytes.saturating_add(1));

            return ApiError::Media(MediaError::FileTooLarge {
                size_bytes,
                limit_bytes: self.max_upload_bytes,
            });
        }

        ApiError::BadRequest(format!("{}: {}", context, err))
    }
}

async fn read_upload_form(
    mut multipart: Multipart,
    limits: &FormLimits,
) -> ApiResult<UploadRequest> {
    let mut blob = None;
    let mut title = String::new();
    let mut description = String::new();
    let mut duration_seconds = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| limits.reject(e, "Malformed upload form"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data: Bytes = field
                    .bytes()
                    .await
                    .map_err(|e| limits.reject(e, "Failed to read file"))?;

                blob = Some(match content_type {
                    Some(mime) if mime != "application/octet-stream" => {
                        VideoBlob::new(file_name, mime, data)
                    }
                    _ => VideoBlob::guessed(file_name, data),
                });
            }
            "title" => title = read_text(field, limits).await?,
            "description" => description = read_text(field, limits).await?,
            "duration_seconds" => {
                let raw = read_text(field, limits).await?;
                let seconds = raw.trim().parse::<f64>().map_err(|_| {
                    ApiError::BadRequest(format!("Invalid duration_seconds `{}`", raw))
                })?;
                duration_seconds = Some(seconds);
            }
            other => debug!("Ignoring upload form field {}", other),
        }
    }

    let blob = blob.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;

    let mut request = UploadRequest::new(blob, title, description);
    if let Some(seconds) = duration_seconds {
        request = request.with_duration(seconds);
    }
    Ok(request)
}

async fn read_text(field: Field<'_>, limits: &FormLimits) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| limits.reject(e, "Failed to read form field"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Claims, JwtVerifier, TokenType};
    use crate::settings::body_limit_for;
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use http_body_util::BodyExt;
    use jsonwebtoken::{EncodingKey, Header};
    use media::backend::Backend;
    use media::config::MediaConfig;
    use media::ports::StaticIdentity;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tower::ServiceExt;

    const SECRET: &[u8] = b"router-test-secret";
    const BOUNDARY: &str = "X-VIDEO-BOUNDARY";

    fn app() -> Router {
        app_with(MediaConfig::default(), 1024 * 1024)
    }

    fn app_with(config: MediaConfig, max_body_bytes: usize) -> Router {
        let backend = Backend::in_memory(&config);
        let state = AppState {
            db_pool: None,
            pipeline: Arc::new(
                backend.upload_pipeline(&config, Arc::new(StaticIdentity::default())),
            ),
            catalog: Arc::new(backend.catalog_reader()),
            jwt: Some(JwtVerifier::from_secret(SECRET)),
            max_body_bytes,
        };
        create_router(state)
    }

    fn token(token_type: TokenType) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: Some("uploader@example.com".to_string()),
            iat: now,
            exp: now + 600,
            token_type,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET))
            .unwrap()
    }

    fn upload_body(file_name: &str, mime: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nHoliday\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(bearer: Option<&str>, body: Vec<u8>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/videos")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn empty_catalog_lists_nothing() {
        let response = app()
            .oneshot(Request::get("/videos").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["entries"], serde_json::json!([]));
        assert_eq!(json["data"]["enrichment"]["status"], "complete");
    }

    #[tokio::test]
    async fn unknown_video_is_not_found() {
        let response = app()
            .oneshot(
                Request::get(format!("/videos/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["error"], "Video not found");
    }

    #[tokio::test]
    async fn anonymous_upload_is_unauthenticated() {
        let body = upload_body("clip.mp4", "video/mp4", b"frames");
        let response = app().oneshot(upload_request(None, body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await;
        assert_eq!(json["kind"], "unauthenticated");
        assert_eq!(json["error"], "You must be logged in to upload videos");
    }

    #[tokio::test]
    async fn invalid_bearer_token_is_rejected() {
        let body = upload_body("clip.mp4", "video/mp4", b"frames");
        let response = app()
            .oneshot(upload_request(Some("not-a-jwt"), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn refresh_tokens_cannot_upload() {
        let body = upload_body("clip.mp4", "video/mp4", b"frames");
        let refresh = token(TokenType::Refresh);
        let response = app()
            .oneshot(upload_request(Some(&refresh), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_mime_type_is_unsupported() {
        let body = upload_body("clip.webm", "video/webm", b"frames");
        let access = token(TokenType::Access);
        let response = app()
            .oneshot(upload_request(Some(&access), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let json = json_body(response).await;
        assert_eq!(json["kind"], "invalid_file_type");
    }

    #[tokio::test]
    async fn body_over_the_request_limit_is_file_too_large() {
        let config = MediaConfig {
            max_upload_bytes: 1024,
            ..MediaConfig::default()
        };
        let app = app_with(config, body_limit_for(1024));
        let access = token(TokenType::Access);
        let body = upload_body("big.mp4", "video/mp4", &vec![0u8; 2 * 1024 * 1024]);

        let response = app
            .oneshot(upload_request(Some(&access), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "file_too_large");
        assert_eq!(json["error"], "File size must be less than 1 KB");
    }

    #[tokio::test]
    async fn file_over_the_upload_limit_within_the_body_limit_is_rejected() {
        let config = MediaConfig {
            max_upload_bytes: 1024,
            ..MediaConfig::default()
        };
        let app = app_with(config, body_limit_for(1024));
        let access = token(TokenType::Access);
        let body = upload_body("big.mp4", "video/mp4", &[0u8; 2048]);

        let response = app
            .oneshot(upload_request(Some(&access), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = json_body(response).await;
        assert_eq!(json["kind"], "file_too_large");
    }

    #[tokio::test]
    async fn authenticated_upload_appears_in_listing() {
        let app = app();
        let access = token(TokenType::Access);
        let body = upload_body("clip.mp4", "video/mp4", b"frames");

        let response = app
            .clone()
            .oneshot(upload_request(Some(&access), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let receipt = json_body(response).await;
        assert_eq!(receipt["success"], true);
        let asset_id = receipt["data"]["asset_id"].as_str().unwrap().to_string();
        assert!(
            receipt["data"]["storage_path"]
                .as_str()
                .unwrap()
                .ends_with(".mp4")
        );

        let response = app
            .clone()
            .oneshot(Request::get("/videos").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listing = json_body(response).await;
        let entries = listing["data"]["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["id"], asset_id.as_str());
        assert_eq!(entries[0]["title"], "Holiday");
        assert_eq!(entries[0]["file_size_bytes"], 6);

        let response = app
            .oneshot(
                Request::get(format!("/videos/{asset_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_missing_database() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["database"], "not_configured");
    }
}
