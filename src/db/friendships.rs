use sqlx::PgPool;
use uuid::Uuid;

use crate::core::AppError;
use crate::models::friendships::{Friendship, FriendshipStatus, FriendshipView};

/// Which side of a user's friendships to list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FriendshipList {
    Accepted,
    SentPending,
    ReceivedPending,
}

/// The friendship between two users, whichever of them asked.
pub async fn find_between(
    pool: &PgPool,
    first: Uuid,
    second: Uuid,
) -> Result<Option<Friendship>, AppError> {
    let friendship = sqlx::query_as::<_, Friendship>(
        r#"
        SELECT * FROM tbl_friendships
        WHERE (requester_id = $1 AND recipient_id = $2)
           OR (requester_id = $2 AND recipient_id = $1)
        "#,
    )
    .bind(first)
    .bind(second)
    .fetch_optional(pool)
    .await?;
    Ok(friendship)
}

#[tracing::instrument(name = "Insert friend request", skip(pool))]
pub async fn insert_request(
    pool: &PgPool,
    requester_id: Uuid,
    recipient_id: Uuid,
) -> Result<Friendship, AppError> {
    if find_between(pool, requester_id, recipient_id).await?.is_some() {
        return Err(AppError::conflict("Friend request already exists"));
    }

    let friendship = sqlx::query_as::<_, Friendship>(
        r#"
        INSERT INTO tbl_friendships (id, requester_id, recipient_id, status)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(requester_id)
    .bind(recipient_id)
    .bind(FriendshipStatus::Pending)
    .fetch_one(pool)
    .await?;
    Ok(friendship)
}

pub async fn get_friendship(pool: &PgPool, id: Uuid) -> Result<Friendship, AppError> {
    sqlx::query_as::<_, Friendship>("SELECT * FROM tbl_friendships WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Friend request not found"))
}

/// Answers a pending request; `None` once it has already been answered.
pub async fn respond(
    pool: &PgPool,
    id: Uuid,
    status: FriendshipStatus,
) -> Result<Option<Friendship>, AppError> {
    let friendship = sqlx::query_as::<_, Friendship>(
        r#"
        UPDATE tbl_friendships
        SET status = $2, responded_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await?;
    Ok(friendship)
}

pub async fn delete_friendship(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM tbl_friendships WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
    list: FriendshipList,
) -> Result<Vec<FriendshipView>, AppError> {
    let condition = match list {
        FriendshipList::Accepted => {
            "(f.requester_id = $1 OR f.recipient_id = $1) AND f.status = 'accepted'"
        }
        FriendshipList::SentPending => "f.requester_id = $1 AND f.status = 'pending'",
        FriendshipList::ReceivedPending => "f.recipient_id = $1 AND f.status = 'pending'",
    };

    let query = format!(
        r#"
        SELECT f.id, f.status, f.requested_at, f.responded_at,
               u.id AS friend_id, u.name AS friend_name, u.email AS friend_email,
               u.role AS friend_role
        FROM tbl_friendships f
        JOIN tbl_users u
          ON u.id = CASE WHEN f.requester_id = $1 THEN f.recipient_id ELSE f.requester_id END
        WHERE {condition}
        ORDER BY COALESCE(f.responded_at, f.requested_at) DESC
        "#
    );

    let friendships = sqlx::query_as::<_, FriendshipView>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(friendships)
}
