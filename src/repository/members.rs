//! Members repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::unique_violation_or;
use crate::{
    error::{AppError, AppResult},
    models::member::{Member, MemberChanges, NewMember},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembersRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Member>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Member>;

    /// Case-insensitive lookup used by login
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Member>>;

    async fn create(&self, data: &NewMember) -> AppResult<Member>;

    async fn update(&self, id: i32, data: &MemberChanges) -> AppResult<Member>;

    /// Delete a member. Rejected with Conflict while the member has open loans.
    async fn delete(&self, id: i32) -> AppResult<()>;
}

pub(crate) fn member_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Member with id {} not found", id))
}

pub(crate) fn duplicate_email(email: &str) -> AppError {
    AppError::Conflict(format!("A member with email {} already exists", email))
}

#[derive(Clone)]
pub struct PgMembersRepository {
    pool: Pool<Postgres>,
}

impl PgMembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembersRepository for PgMembersRepository {
    async fn list(&self) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>("SELECT * FROM members ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| member_not_found(id))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            "SELECT * FROM members WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn create(&self, data: &NewMember) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (name, email, password_hash, membership_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(data.membership_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation_or(e, || duplicate_email(&data.email)))
    }

    async fn update(&self, id: i32, data: &MemberChanges) -> AppResult<Member> {
        let mut sets: Vec<String> = Vec::new();

        // $1 is the id, so placeholders for the SET list start at $2.
        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, sets.len() + 2));
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.email, "email");
        add_field!(data.password_hash, "password_hash");
        add_field!(data.membership_date, "membership_date");

        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        let query = format!(
            "UPDATE members SET {} WHERE id = $1 RETURNING *",
            sets.join(", ")
        );
        let mut builder = sqlx::query_as::<_, Member>(&query).bind(id);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.email);
        bind_field!(data.password_hash);
        bind_field!(data.membership_date);

        builder
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                unique_violation_or(e, || duplicate_email(data.email.as_deref().unwrap_or_default()))
            })?
            .ok_or_else(|| member_not_found(id))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Conflicts with the share lock a loan takes on its member, so a loan
        // being opened is either visible below or sees the member gone.
        let locked: Option<i32> =
            sqlx::query_scalar("SELECT id FROM members WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(member_not_found(id));
        }

        let open_loans: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE member_id = $1 AND status = 'open')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if open_loans {
            return Err(AppError::Conflict(format!("Member {} still has open loans", id)));
        }

        sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
