//! Friendship ledger: pending requests and the two-row mutual friendships
//! they turn into, plus the per-user read model built from both tables.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
    ActiveValue::NotSet,
    sea_query::{LockType, OnConflict},
};
use uuid::Uuid;

use crate::{
    audit::{AuditAction, record},
    dto::friends::SendOutcome,
    entity::{
        friendship_requests::{
            ActiveModel as RequestActive, Column as RequestCol, Entity as FriendshipRequests,
            Model as RequestModel,
        },
        friendships::{ActiveModel as FriendshipActive, Column as FriendshipCol, Entity as Friendships},
        users::{Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    models::{Friend, FriendshipRequest, FriendshipView, IncomingRequest, OutgoingRequest, UserSummary},
    state::AppState,
};

/// Which side of a request may withdraw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestSide {
    Addressee,
    Sender,
}

pub async fn send_request(
    state: &AppState,
    from: Uuid,
    to: Uuid,
    message: &str,
) -> AppResult<SendOutcome> {
    if from == to {
        return Err(AppError::InvalidTarget(
            "cannot send a friendship request to yourself".into(),
        ));
    }

    let txn = state.orm.begin().await?;
    let users = lock_pair(&txn, from, to).await?;
    let target = users
        .into_iter()
        .find(|u| u.id == to)
        .ok_or(AppError::NotFound)?;

    if are_friends(&txn, from, to).await? {
        return Err(AppError::DuplicateRequest);
    }

    if find_request(&txn, from, to).await?.is_some() {
        return Err(AppError::DuplicateRequest);
    }

    // The target already asked us: treat this request as the answer.
    if let Some(reciprocal) = find_request(&txn, to, from).await? {
        let request_id = reciprocal.id;
        insert_friendship_pair(&txn, to, from).await?;
        reciprocal.delete(&txn).await?;
        txn.commit().await?;

        record(
            &state.pool,
            from,
            AuditAction::FriendRequestAccepted,
            serde_json::json!({ "request_id": request_id, "friend_id": to }),
        )
        .await;
        tracing::info!(%request_id, user_id = %from, friend_id = %to, "reciprocal request accepted");

        return Ok(SendOutcome::Accepted {
            friend: UserSummary {
                id: target.id,
                username: target.username,
            },
        });
    }

    let request = RequestActive {
        id: Set(Uuid::new_v4()),
        from_user_id: Set(from),
        to_user_id: Set(to),
        message: Set(message.trim().to_string()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateRequest,
        _ => AppError::from(err),
    })?;
    txn.commit().await?;

    record(
        &state.pool,
        from,
        AuditAction::FriendRequestSent,
        serde_json::json!({ "request_id": request.id, "to_user_id": to }),
    )
    .await;

    Ok(SendOutcome::Pending {
        request: FriendshipRequest::from(request),
    })
}

/// Turn a pending request into a friendship. Only the addressee may accept.
pub async fn accept(state: &AppState, request_id: Uuid, acting_user: Uuid) -> AppResult<()> {
    let txn = state.orm.begin().await?;

    let request = FriendshipRequests::find_by_id(request_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if request.to_user_id != acting_user {
        return Err(AppError::NotAuthorized);
    }

    let requester = request.from_user_id;
    insert_friendship_pair(&txn, requester, acting_user).await?;
    request.delete(&txn).await?;
    txn.commit().await?;

    record(
        &state.pool,
        acting_user,
        AuditAction::FriendRequestAccepted,
        serde_json::json!({ "request_id": request_id, "friend_id": requester }),
    )
    .await;
    tracing::info!(%request_id, user_id = %acting_user, friend_id = %requester, "friend request accepted");

    Ok(())
}

/// Decline a request addressed to `acting_user`. A missing request is not an error.
pub async fn reject(state: &AppState, request_id: Uuid, acting_user: Uuid) -> AppResult<bool> {
    let deleted = delete_request(state, request_id, acting_user, RequestSide::Addressee).await?;
    if deleted {
        record(
            &state.pool,
            acting_user,
            AuditAction::FriendRequestRejected,
            serde_json::json!({ "request_id": request_id }),
        )
        .await;
    }
    Ok(deleted)
}

/// Withdraw a request sent by `acting_user`. A missing request is not an error.
pub async fn cancel(state: &AppState, request_id: Uuid, acting_user: Uuid) -> AppResult<bool> {
    let deleted = delete_request(state, request_id, acting_user, RequestSide::Sender).await?;
    if deleted {
        record(
            &state.pool,
            acting_user,
            AuditAction::FriendRequestCancelled,
            serde_json::json!({ "request_id": request_id }),
        )
        .await;
    }
    Ok(deleted)
}

/// Drop both directions of the friendship between two users.
pub async fn remove(state: &AppState, user_a: Uuid, user_b: Uuid) -> AppResult<bool> {
    let txn = state.orm.begin().await?;
    let result = Friendships::delete_many()
        .filter(pair_condition(user_a, user_b))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    let removed = result.rows_affected > 0;
    if removed {
        record(
            &state.pool,
            user_a,
            AuditAction::FriendRemoved,
            serde_json::json!({ "friend_id": user_b }),
        )
        .await;
    }
    Ok(removed)
}

pub async fn get_friendship_view(state: &AppState, user_id: Uuid) -> AppResult<FriendshipView> {
    // Inner joins drop rows whose counterpart account no longer exists.
    let pending_incoming = sqlx::query_as::<_, IncomingRequest>(
        r#"
        SELECT fr.id AS request_id, fr.message, u.id AS requester_id,
               u.username AS requester_username, fr.created_at
        FROM friendship_requests fr
        JOIN users u ON u.id = fr.from_user_id
        WHERE fr.to_user_id = $1
        ORDER BY fr.created_at, fr.id
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    let friends = sqlx::query_as::<_, Friend>(
        r#"
        SELECT u.id AS friend_id, u.username AS friend_username
        FROM friendships f
        JOIN users u ON u.id = f.from_user_id
        WHERE f.to_user_id = $1
        ORDER BY f.created_at, f.id
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    let pending_outgoing = sqlx::query_as::<_, OutgoingRequest>(
        r#"
        SELECT fr.id AS request_id, u.id AS target_id,
               u.username AS target_username, fr.created_at
        FROM friendship_requests fr
        JOIN users u ON u.id = fr.to_user_id
        WHERE fr.from_user_id = $1
        ORDER BY fr.created_at, fr.id
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(FriendshipView {
        pending_incoming,
        friends,
        pending_outgoing,
    })
}

async fn delete_request(
    state: &AppState,
    request_id: Uuid,
    acting_user: Uuid,
    side: RequestSide,
) -> AppResult<bool> {
    let txn = state.orm.begin().await?;
    let Some(request) = FriendshipRequests::find_by_id(request_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
    else {
        return Ok(false);
    };

    let owner = match side {
        RequestSide::Addressee => request.to_user_id,
        RequestSide::Sender => request.from_user_id,
    };
    if owner != acting_user {
        return Err(AppError::NotAuthorized);
    }

    request.delete(&txn).await?;
    txn.commit().await?;
    Ok(true)
}

/// Lock both user rows in id order so concurrent mutations on one pair queue up.
async fn lock_pair(txn: &DatabaseTransaction, a: Uuid, b: Uuid) -> AppResult<Vec<UserModel>> {
    let users = Users::find()
        .filter(UserCol::Id.is_in([a, b]))
        .order_by_asc(UserCol::Id)
        .lock(LockType::Update)
        .all(txn)
        .await?;
    Ok(users)
}

async fn are_friends(txn: &DatabaseTransaction, a: Uuid, b: Uuid) -> AppResult<bool> {
    let existing = Friendships::find()
        .filter(pair_condition(a, b))
        .one(txn)
        .await?;
    Ok(existing.is_some())
}

async fn find_request(
    txn: &DatabaseTransaction,
    from: Uuid,
    to: Uuid,
) -> AppResult<Option<RequestModel>> {
    let request = FriendshipRequests::find()
        .filter(RequestCol::FromUserId.eq(from))
        .filter(RequestCol::ToUserId.eq(to))
        .lock(LockType::Update)
        .one(txn)
        .await?;
    Ok(request)
}

async fn insert_friendship_pair(txn: &DatabaseTransaction, a: Uuid, b: Uuid) -> AppResult<()> {
    let rows = [(a, b), (b, a)].map(|(from, to)| FriendshipActive {
        id: Set(Uuid::new_v4()),
        from_user_id: Set(from),
        to_user_id: Set(to),
        created_at: NotSet,
    });
    Friendships::insert_many(rows)
        .on_conflict(
            OnConflict::columns([FriendshipCol::FromUserId, FriendshipCol::ToUserId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(txn)
        .await?;
    Ok(())
}

fn pair_condition(a: Uuid, b: Uuid) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(FriendshipCol::FromUserId.eq(a))
                .add(FriendshipCol::ToUserId.eq(b)),
        )
        .add(
            Condition::all()
                .add(FriendshipCol::FromUserId.eq(b))
                .add(FriendshipCol::ToUserId.eq(a)),
        )
}
