use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use byline_core::{Actor, Pagination};

use super::{ApiError, AppState, created_json, ok_json, page_params};
use crate::model::{CreatePost, PostDetail, PostSummary, TagCount, UpdatePost};
use crate::service::engagement::{BookmarkState, LikeState};
use crate::service::query::{PostQuery, PostSort};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/featured", get(featured_posts))
        .route("/posts/categories", get(list_categories))
        .route("/posts/tags", get(popular_tags))
        .route("/posts/my-posts", get(my_posts))
        .route("/posts/user/{username}", get(posts_by_author))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/{id}/like", post(toggle_like))
        .route("/posts/{id}/bookmark", post(toggle_bookmark))
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<usize>,
    limit: Option<usize>,
    category: Option<String>,
    tags: Option<String>,
    search: Option<String>,
    sort: Option<String>,
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct MyPostsQuery {
    page: Option<usize>,
    limit: Option<usize>,
    status: Option<String>,
}

#[derive(Serialize)]
struct PostList {
    posts: Vec<PostSummary>,
    pagination: Pagination,
}

async fn list_posts(
    State(svc): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<PostList>, ApiError> {
    let query = PostQuery {
        page: page_params(q.page, q.limit),
        category: q.category,
        tags: q.tags,
        search: q.search,
        sort: q.sort.as_deref().and_then(PostSort::parse).unwrap_or_default(),
    };
    ok_json(
        svc.list_posts(&query)
            .map(|(posts, pagination)| PostList { posts, pagination }),
    )
}

async fn create_post(
    State(svc): State<AppState>,
    actor: Actor,
    Json(input): Json<CreatePost>,
) -> Result<(StatusCode, Json<PostDetail>), ApiError> {
    created_json(svc.create_post(&actor.id, input))
}

/// Single-post reads are addressed by slug, not id.
async fn get_post(
    State(svc): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetail>, ApiError> {
    ok_json(svc.get_post_by_slug(&slug))
}

async fn update_post(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(patch): Json<UpdatePost>,
) -> Result<Json<PostDetail>, ApiError> {
    ok_json(svc.update_post(&id, &actor, patch))
}

async fn delete_post(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> Result<StatusCode, ApiError> {
    svc.delete_post(&id, &actor)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn featured_posts(
    State(svc): State<AppState>,
) -> Result<Json<Vec<PostSummary>>, ApiError> {
    ok_json(svc.featured_posts())
}

async fn list_categories(State(svc): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    ok_json(svc.categories())
}

async fn popular_tags(State(svc): State<AppState>) -> Result<Json<Vec<TagCount>>, ApiError> {
    ok_json(svc.popular_tags())
}

async fn my_posts(
    State(svc): State<AppState>,
    actor: Actor,
    Query(q): Query<MyPostsQuery>,
) -> Result<Json<PostList>, ApiError> {
    ok_json(
        svc.my_posts(&actor, q.status.as_deref(), page_params(q.page, q.limit))
            .map(|(posts, pagination)| PostList { posts, pagination }),
    )
}

async fn posts_by_author(
    State(svc): State<AppState>,
    Path(username): Path<String>,
    Query(q): Query<PageQuery>,
) -> Result<Json<PostList>, ApiError> {
    ok_json(
        svc.posts_by_author(&username, page_params(q.page, q.limit))
            .map(|(posts, pagination)| PostList { posts, pagination }),
    )
}

async fn toggle_like(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> Result<Json<LikeState>, ApiError> {
    ok_json(svc.toggle_post_like(&id, &actor.id))
}

async fn toggle_bookmark(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> Result<Json<BookmarkState>, ApiError> {
    ok_json(svc.toggle_bookmark(&id, &actor.id))
}
