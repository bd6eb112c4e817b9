//! Post endpoints.
//!
//! ## Endpoints
//!
//! - POST /posts/add - Create a post with up to four images (multipart)
//! - GET /posts/feed - Posts by the caller, their connections and followed users
//! - POST /posts/like - Toggle the caller's like on a post

use axum::{
    Json, Router, debug_handler,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use futures_util::future::try_join_all;
use garde::Validate;
use shared::api::{
    LikePostPayload, MAX_POST_IMAGES, MessageResponse, PostFields, PostType, PostsResponse,
};

use crate::{
    error::AppError,
    handlers::non_empty,
    middleware::auth::AuthUser,
    models::NewPost,
    repos::scope_set,
    services::UploadRequest,
    state::AppState,
    stories::MediaFile,
};

const POST_IMAGE_FOLDER: &str = "posts";
const POST_IMAGE_WIDTH: u32 = 1280;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_post))
        .route("/feed", get(get_feed))
        .route("/like", post(like_post))
}

#[debug_handler]
async fn add_post(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(mut multipart, _): WithRejection<Multipart, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let mut fields = PostFields::default();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" => fields.content = non_empty(field.text().await?),
            "post_type" => {
                let value = field.text().await?;
                let post_type = value
                    .parse::<PostType>()
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                fields.post_type = Some(post_type);
            }
            "images" => {
                // Stop buffering once the cap is exceeded; validation rejects it below.
                fields.image_count += 1;
                if fields.image_count > MAX_POST_IMAGES {
                    continue;
                }
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    return Err(AppError::invalid_upload());
                }
                images.push(MediaFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    fields
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let post_type = fields
        .post_type
        .ok_or_else(|| AppError::Validation("post_type is required".to_string()))?;

    if fields.content.is_none() && images.is_empty() {
        return Err(AppError::Validation(
            "Post must have either content or images".to_string(),
        ));
    }
    if post_type != PostType::Text && images.is_empty() {
        return Err(AppError::Validation(format!(
            "{} posts must include at least one image",
            post_type
        )));
    }

    let now_ms = Utc::now().timestamp_millis();
    let uploads = images.into_iter().map(|image| {
        let media = state.media.clone();
        let original = image
            .file_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "image".to_string());
        let request = UploadRequest {
            bytes: image.bytes,
            file_name: format!("post_{}_{}_{}", user.id, now_ms, original),
            folder: Some(POST_IMAGE_FOLDER.to_string()),
        };
        async move {
            let uploaded = media.upload(request).await?;
            Ok::<_, anyhow::Error>(media.optimized_url(&uploaded.file_path, POST_IMAGE_WIDTH))
        }
    });
    let image_urls = try_join_all(uploads)
        .await
        .map_err(|e| AppError::upload_failed(format!("{:#}", e)))?;

    let post = state
        .repos
        .posts
        .create(&NewPost {
            author_id: user.id,
            content: fields.content,
            image_urls,
            post_type,
        })
        .await?;

    tracing::info!(post_id = %post.id, author_id = %post.author_id, "post created");

    Ok(Json(MessageResponse::ok("Post added successfully")))
}

#[debug_handler]
async fn get_feed(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state
        .repos
        .users
        .find_by_id(&user.id)
        .await?
        .ok_or_else(AppError::user_not_found)?;

    let scope = scope_set(state.repos.relationships.as_ref(), &user.id).await?;
    let posts = state.repos.posts.list_by_authors(&scope).await?;

    Ok(Json(PostsResponse {
        success: true,
        posts: posts.into_iter().map(Into::into).collect(),
    }))
}

#[debug_handler]
async fn like_post(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LikePostPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let liked = state
        .repos
        .posts
        .toggle_like(payload.post_id, &user.id)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "Post not found"))?;

    let message = if liked { "Post liked" } else { "Post unliked" };
    Ok(Json(MessageResponse::ok(message)))
}
