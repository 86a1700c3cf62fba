use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::friends::{MutationResult, SearchFriendRequest, SendFriendRequest, SendOutcome},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{FriendshipView, UserSummary},
    response::{ApiResponse, Meta},
    services::{auth_service, friendship_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(friendship_view))
        .route("/search", post(search_friend))
        .route("/requests", post(send_request))
        .route("/requests/{id}/accept", post(accept_request))
        .route("/requests/{id}/reject", post(reject_request))
        .route("/requests/{id}/cancel", post(cancel_request))
        .route("/{user_id}", delete(remove_friend))
}

#[utoipa::path(
    get,
    path = "/api/friends",
    responses(
        (status = 200, description = "Incoming requests, friends and outgoing requests", body = ApiResponse<FriendshipView>)
    ),
    security(("bearer_auth" = [])),
    tag = "Friends"
)]
pub async fn friendship_view(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<FriendshipView>>> {
    let view = friendship_service::get_friendship_view(&state, user.user_id).await?;
    let total = view.friends.len();
    Ok(Json(ApiResponse::success("Friends", view, Some(Meta::total(total)))))
}

#[utoipa::path(
    post,
    path = "/api/friends/search",
    request_body = SearchFriendRequest,
    responses(
        (status = 200, description = "User with exactly this username", body = ApiResponse<UserSummary>),
        (status = 404, description = "No such user")
    ),
    security(("bearer_auth" = [])),
    tag = "Friends"
)]
pub async fn search_friend(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<SearchFriendRequest>,
) -> AppResult<Json<ApiResponse<UserSummary>>> {
    let found = auth_service::find_by_username(&state, &payload.username).await?;
    Ok(Json(ApiResponse::success("User found", found, None)))
}

#[utoipa::path(
    post,
    path = "/api/friends/requests",
    request_body = SendFriendRequest,
    responses(
        (status = 201, description = "Request sent, or reciprocal request accepted", body = ApiResponse<SendOutcome>),
        (status = 400, description = "Request to oneself"),
        (status = 404, description = "Target user not found"),
        (status = 409, description = "Already friends or request already pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Friends"
)]
pub async fn send_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SendFriendRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<SendOutcome>>)> {
    let message = payload.message.unwrap_or_default();
    let outcome =
        friendship_service::send_request(&state, user.user_id, payload.to_user_id, &message)
            .await?;
    let text = match outcome {
        SendOutcome::Pending { .. } => "Friendship request sent",
        SendOutcome::Accepted { .. } => "Friendship request accepted",
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(text, outcome, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/friends/requests/{id}/accept",
    params(("id" = Uuid, Path, description = "Friendship request ID")),
    responses(
        (status = 200, description = "Request accepted", body = ApiResponse<MutationResult>),
        (status = 403, description = "Request is addressed to someone else"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Friends"
)]
pub async fn accept_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MutationResult>>> {
    friendship_service::accept(&state, id, user.user_id).await?;
    Ok(Json(ApiResponse::success(
        "Friendship request accepted",
        MutationResult { changed: true },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/friends/requests/{id}/reject",
    params(("id" = Uuid, Path, description = "Friendship request ID")),
    responses(
        (status = 200, description = "Request rejected, or already gone", body = ApiResponse<MutationResult>),
        (status = 403, description = "Request is addressed to someone else")
    ),
    security(("bearer_auth" = [])),
    tag = "Friends"
)]
pub async fn reject_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MutationResult>>> {
    let changed = friendship_service::reject(&state, id, user.user_id).await?;
    Ok(Json(ApiResponse::success(
        "Friendship request rejected",
        MutationResult { changed },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/friends/requests/{id}/cancel",
    params(("id" = Uuid, Path, description = "Friendship request ID")),
    responses(
        (status = 200, description = "Request cancelled, or already gone", body = ApiResponse<MutationResult>),
        (status = 403, description = "Request was sent by someone else")
    ),
    security(("bearer_auth" = [])),
    tag = "Friends"
)]
pub async fn cancel_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MutationResult>>> {
    let changed = friendship_service::cancel(&state, id, user.user_id).await?;
    Ok(Json(ApiResponse::success(
        "Friendship request cancelled",
        MutationResult { changed },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/friends/{user_id}",
    params(("user_id" = Uuid, Path, description = "Friend's user ID")),
    responses(
        (status = 200, description = "Friendship removed, or none existed", body = ApiResponse<MutationResult>)
    ),
    security(("bearer_auth" = [])),
    tag = "Friends"
)]
pub async fn remove_friend(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MutationResult>>> {
    let changed = friendship_service::remove(&state, user.user_id, user_id).await?;
    Ok(Json(ApiResponse::success(
        "Friendship removed",
        MutationResult { changed },
        Some(Meta::empty()),
    )))
}
