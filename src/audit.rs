use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// User-visible mutations that leave a trace in `audit_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserSignup,
    UserLogin,
    FriendRequestSent,
    FriendRequestAccepted,
    FriendRequestRejected,
    FriendRequestCancelled,
    FriendRemoved,
    ProductSaved,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserSignup => "user_signup",
            AuditAction::UserLogin => "user_login",
            AuditAction::FriendRequestSent => "friend_request_sent",
            AuditAction::FriendRequestAccepted => "friend_request_accepted",
            AuditAction::FriendRequestRejected => "friend_request_rejected",
            AuditAction::FriendRequestCancelled => "friend_request_cancelled",
            AuditAction::FriendRemoved => "friend_removed",
            AuditAction::ProductSaved => "product_saved",
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            AuditAction::UserSignup | AuditAction::UserLogin => "users",
            AuditAction::FriendRequestSent
            | AuditAction::FriendRequestAccepted
            | AuditAction::FriendRequestRejected
            | AuditAction::FriendRequestCancelled => "friendship_requests",
            AuditAction::FriendRemoved => "friendships",
            AuditAction::ProductSaved => "backup_products",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    metadata: Option<Value>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Like [`log_audit`], but a failed write is only logged.
pub async fn record(pool: &DbPool, user_id: Uuid, action: AuditAction, metadata: Value) {
    if let Err(err) = log_audit(pool, Some(user_id), action, Some(metadata)).await {
        tracing::warn!(error = %err, action = action.as_str(), "audit log failed");
    }
}
