use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use byline_core::{Actor, Pagination};

use super::{ApiError, AppState, created_json, ok_json, page_params};
use crate::model::{Account, CreateAccount, OwnProfile, PublicProfile, UpdateProfile};
use crate::service::engagement::FollowState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/profile", get(own_profile).put(update_profile))
        .route("/accounts/{username}", get(public_profile))
        .route("/accounts/{username}/follow", post(toggle_follow))
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct AccountList {
    accounts: Vec<Account>,
    pagination: Pagination,
}

async fn create_account(
    State(svc): State<AppState>,
    Json(input): Json<CreateAccount>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    created_json(svc.create_account(input))
}

async fn list_accounts(
    State(svc): State<AppState>,
    actor: Actor,
    Query(q): Query<PageQuery>,
) -> Result<Json<AccountList>, ApiError> {
    ok_json(
        svc.list_accounts(&actor, page_params(q.page, q.limit))
            .map(|(accounts, pagination)| AccountList { accounts, pagination }),
    )
}

async fn own_profile(
    State(svc): State<AppState>,
    actor: Actor,
) -> Result<Json<OwnProfile>, ApiError> {
    ok_json(svc.own_profile(&actor.id))
}

async fn update_profile(
    State(svc): State<AppState>,
    actor: Actor,
    Json(patch): Json<UpdateProfile>,
) -> Result<Json<OwnProfile>, ApiError> {
    ok_json(svc.update_profile(&actor.id, patch))
}

async fn public_profile(
    State(svc): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PublicProfile>, ApiError> {
    ok_json(svc.public_profile(&username))
}

/// Follow targets are addressed by username like every other account
/// route; the handle resolves to an id before the toggle.
async fn toggle_follow(
    State(svc): State<AppState>,
    Path(username): Path<String>,
    actor: Actor,
) -> Result<Json<FollowState>, ApiError> {
    let target = svc.account_by_username(&username).map_err(ApiError::from)?;
    ok_json(svc.toggle_follow(&actor.id, &target.id))
}
