use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use chirpy_db::SortOrder;
use chirpy_types::api::PostMessageRequest;

use crate::auth::{AppState, with_db};
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub const MAX_BODY_CHARS: usize = 140;

const PROFANE_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub author_id: Option<u64>,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Mask whole words from the blocklist, case-insensitively. Words with
/// attached punctuation are left as written.
pub fn clean_body(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            if PROFANE_WORDS.contains(&word.to_lowercase().as_str()) {
                "****"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn post_message(
    State(state): State<AppState>,
    Extension(CurrentUser(author_id)): Extension<CurrentUser>,
    Json(req): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.body.chars().count() > MAX_BODY_CHARS {
        return Err(ApiError::BadRequest("Chirp is too long".into()));
    }

    let body = clean_body(&req.body);
    let message = with_db(&state, move |db| db.create_message(&body, author_id)).await?;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let messages =
        with_db(&state, move |db| db.list_messages(query.author_id, query.sort)).await?;
    Ok(Json(messages))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(message_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let message = with_db(&state, move |db| db.get_message(message_id)).await?;
    Ok(Json(message))
}

/// Only the author may delete. The existence and ownership checks happen here;
/// the store's delete itself is idempotent.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<u64>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let message = with_db(&state, move |db| db.get_message(message_id)).await?;
    if message.author_id != user_id {
        return Err(ApiError::Forbidden("not the author of this chirp".into()));
    }

    with_db(&state, move |db| db.delete_message(message_id)).await?;

    info!(message_id, user_id, "message deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_blocklisted_words() {
        assert_eq!(
            clean_body("I had something interesting for breakfast"),
            "I had something interesting for breakfast"
        );
        assert_eq!(
            clean_body("I hear Mastodon is better than Chirpy. sharbert I need to migrate"),
            "I hear Mastodon is better than Chirpy. **** I need to migrate"
        );
        assert_eq!(
            clean_body("I really need a kerfuffle to go to bed sooner, Fornax !"),
            "I really need a **** to go to bed sooner, **** !"
        );
    }

    #[test]
    fn punctuation_attached_words_survive() {
        assert_eq!(clean_body("Sharbert! yes"), "Sharbert! yes");
    }

    #[test]
    fn repeated_words_all_masked() {
        assert_eq!(clean_body("fornax fornax"), "**** ****");
    }
}
