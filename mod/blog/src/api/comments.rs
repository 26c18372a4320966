use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use byline_core::{Actor, Pagination};

use super::{ApiError, AppState, created_json, ok_json, page_params};
use crate::model::{CommentView, CreateComment, UpdateComment};
use crate::service::engagement::LikeState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/posts/{id}/comments",
            get(list_comments).post(create_comment),
        )
        .route("/comments/{id}", put(update_comment).delete(delete_comment))
        .route("/comments/{id}/like", post(toggle_like))
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct CommentList {
    comments: Vec<CommentView>,
    pagination: Pagination,
}

async fn list_comments(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<PageQuery>,
) -> Result<Json<CommentList>, ApiError> {
    ok_json(
        svc.list_comments(&id, page_params(q.page, q.limit))
            .map(|(comments, pagination)| CommentList { comments, pagination }),
    )
}

async fn create_comment(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(input): Json<CreateComment>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    created_json(svc.create_comment(&id, &actor.id, input))
}

async fn update_comment(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(input): Json<UpdateComment>,
) -> Result<Json<CommentView>, ApiError> {
    ok_json(svc.update_comment(&id, &actor, input))
}

async fn delete_comment(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> Result<StatusCode, ApiError> {
    svc.delete_comment(&id, &actor)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_like(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> Result<Json<LikeState>, ApiError> {
    ok_json(svc.toggle_comment_like(&id, &actor.id))
}
