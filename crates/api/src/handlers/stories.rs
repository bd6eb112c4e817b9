//! Story endpoints.
//!
//! ## Endpoints
//!
//! - POST /stories/create - Create a story (multipart, optional media file)
//! - GET /stories - Stories visible to the caller
//! - GET /stories/get - Same listing, at the path the web client calls

use axum::{
    Json, Router, debug_handler,
    extract::{Multipart, State},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use garde::Validate;
use shared::api::{CreateStoryResponse, MediaType, StoriesResponse, StoryFields};

use crate::{
    error::AppError,
    handlers::non_empty,
    middleware::auth::AuthUser,
    state::AppState,
    stories::{CreateStory, MediaFile},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_story))
        .route("/", get(list_stories))
        .route("/get", get(list_stories))
}

#[debug_handler]
async fn create_story(
    user: AuthUser,
    State(state): State<AppState>,
    WithRejection(mut multipart, _): WithRejection<Multipart, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let mut fields = StoryFields::default();
    let mut media = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" => fields.content = non_empty(field.text().await?),
            "media_type" => {
                let value = field.text().await?;
                let media_type = value
                    .parse::<MediaType>()
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                fields.media_type = Some(media_type);
            }
            "background_color" => {
                fields.background_color = non_empty(field.text().await?)
            }
            "media" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                media = Some(MediaFile {
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
    let media_type = fields
        .media_type
        .ok_or_else(|| AppError::Validation("media_type is required".to_string()))?;

    let story_id = state
        .stories
        .create(CreateStory {
            author_id: user.id,
            content: fields.content,
            media_type,
            media,
            background_color: fields.background_color,
        })
        .await?;

    Ok(Json(CreateStoryResponse {
        success: true,
        story_id,
    }))
}

#[debug_handler]
async fn list_stories(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let stories = state.stories.list_visible(&user.id).await?;

    Ok(Json(StoriesResponse {
        success: true,
        stories: stories.into_iter().map(Into::into).collect(),
    }))
}
