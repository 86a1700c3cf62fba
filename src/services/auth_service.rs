use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr,
    ActiveValue::NotSet,
};
use uuid::Uuid;

use crate::{
    audit::{AuditAction, record},
    config::AppConfig,
    dto::auth::{Claims, LoginRequest, LoginResponse, SignupRequest, SignupResponse},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult, FieldError},
    middleware::auth::AuthUser,
    models::{User, UserSummary},
    state::AppState,
};

const USERNAME_MAX_LEN: usize = 150;
const EMAIL_MAX_LEN: usize = 254;
const PASSWORD_MIN_LEN: usize = 8;

/// Field-level checks that need no database access.
pub fn validate_signup(payload: &SignupRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let username = payload.username.trim();
    if username.is_empty() {
        errors.push(FieldError::new("username", "This field is required."));
    } else if username.chars().count() > USERNAME_MAX_LEN {
        errors.push(FieldError::new(
            "username",
            format!("Ensure this value has at most {USERNAME_MAX_LEN} characters."),
        ));
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        errors.push(FieldError::new(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }

    let email = payload.email.trim();
    if email.is_empty() {
        errors.push(FieldError::new("email", "This field is required."));
    } else if email.len() > EMAIL_MAX_LEN || !is_valid_email(email) {
        errors.push(FieldError::new("email", "Enter a valid email address."));
    }

    if payload.password1.chars().count() < PASSWORD_MIN_LEN {
        errors.push(FieldError::new(
            "password1",
            format!("This password is too short. It must contain at least {PASSWORD_MIN_LEN} characters."),
        ));
    }
    if payload.password1 != payload.password2 {
        errors.push(FieldError::new(
            "password2",
            "The two password fields didn't match.",
        ));
    }

    errors
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

pub async fn signup(state: &AppState, payload: SignupRequest) -> AppResult<SignupResponse> {
    let mut errors = validate_signup(&payload);
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    if errors.iter().all(|e| e.field != "username")
        && Users::find()
            .filter(UserCol::Username.eq(username.as_str()))
            .one(&state.orm)
            .await?
            .is_some()
    {
        errors.push(FieldError::new(
            "username",
            "A user with that username already exists.",
        ));
    }
    if errors.iter().all(|e| e.field != "email")
        && Users::find()
            .filter(UserCol::Email.eq(email.as_str()))
            .one(&state.orm)
            .await?
            .is_some()
    {
        errors.push(FieldError::new("email", "This email address is already in use."));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let password_hash = hash_password(&payload.password1)?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        email: Set(email),
        password_hash: Set(password_hash),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::validation("username", "A user with that username or email already exists.")
        }
        _ => AppError::from(err),
    })?;

    record(
        &state.pool,
        user.id,
        AuditAction::UserSignup,
        serde_json::json!({ "user_id": user.id }),
    )
    .await;
    tracing::info!(user_id = %user.id, "user signed up");

    let token = issue_token(&state.config, user.id, &user.username)?;
    Ok(SignupResponse {
        user: User::from(user),
        token,
    })
}

pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<LoginResponse> {
    let LoginRequest { email, password } = payload;
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::validation("email", "This field is required."));
    }

    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::validation("email", "The email address is not valid."))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::validation("password", "Incorrect password."));
    }

    let token = issue_token(&state.config, user.id, &user.username)?;

    record(
        &state.pool,
        user.id,
        AuditAction::UserLogin,
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(LoginResponse { token })
}

pub async fn profile(state: &AppState, user: &AuthUser) -> AppResult<User> {
    Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .map(User::from)
        .ok_or(AppError::NotFound)
}

/// Exact, case-sensitive username lookup.
pub async fn find_by_username(state: &AppState, username: &str) -> AppResult<UserSummary> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::validation("username", "This field is required."));
    }
    Users::find()
        .filter(UserCol::Username.eq(username))
        .one(&state.orm)
        .await?
        .map(|user| UserSummary {
            id: user.id,
            username: user.username,
        })
        .ok_or(AppError::NotFound)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, username: &str) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(format!("Bearer {}", token))
}
