use sqlx::PgPool;

use crate::database::manager::{log_query_error, DatabaseError};
use crate::database::models::user::{NewUser, User, UserChanges};
use crate::database::patch::{self, fetch_by_id};

pub async fn list(pool: &PgPool) -> Result<Vec<User>, DatabaseError> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(|e| log_query_error("users", e))
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<User>, DatabaseError> {
    fetch_by_id(pool, "users", id).await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, DatabaseError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| log_query_error("users", e))
}

pub async fn create(pool: &PgPool, user: NewUser) -> Result<User, DatabaseError> {
    let created = sqlx::query_as::<_, User>(
        "INSERT INTO users (
            email, password, full_name, signup_type, gender, mobile_no,
            is_mobile_verified, is_email_verified
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.full_name)
    .bind(&user.signup_type)
    .bind(user.gender.as_str())
    .bind(&user.mobile_no)
    .bind(user.is_mobile_verified)
    .bind(user.is_email_verified)
    .fetch_one(pool)
    .await
    .map_err(|e| log_query_error("users", e))?;

    tracing::info!("User created: {} (id {})", created.email, created.id);
    Ok(created)
}

/// Apply `changes` to the user; `None` when no such user exists.
pub async fn update(pool: &PgPool, id: i32, changes: UserChanges) -> Result<Option<User>, DatabaseError> {
    patch::apply(pool, id, changes).await
}

/// Hard delete. Cascades to the user's company profile and its jobs.
pub async fn delete(pool: &PgPool, id: i32) -> Result<Option<User>, DatabaseError> {
    sqlx::query_as::<_, User>("DELETE FROM users WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| log_query_error("users", e))
}
