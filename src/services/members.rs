//! Member management service

use crate::{
    error::{AppError, AppResult},
    models::member::{CreateMember, Member, MemberChanges, NewMember, UpdateMember},
    repository::Repository,
};

use super::auth::hash_password;

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_members(&self) -> AppResult<Vec<Member>> {
        self.repository.members.list().await
    }

    pub async fn get_member(&self, id: i32) -> AppResult<Member> {
        self.repository.members.get_by_id(id).await
    }

    /// Register a member, hashing the password
    pub async fn create_member(&self, member: CreateMember) -> AppResult<Member> {
        let row = NewMember {
            name: member.name,
            email: member.email,
            password_hash: hash_password(&member.password)?,
            membership_date: member.membership_date,
        };
        let created = self.repository.members.create(&row).await?;
        tracing::info!("Member {} registered", created.id);
        Ok(created)
    }

    pub async fn update_member(&self, id: i32, changes: UpdateMember) -> AppResult<Member> {
        if changes.is_empty() {
            return Err(AppError::validation("At least one field must be provided"));
        }
        let password_hash = changes.password.as_deref().map(hash_password).transpose()?;
        let row = MemberChanges {
            name: changes.name,
            email: changes.email,
            password_hash,
            membership_date: changes.membership_date,
        };
        self.repository.members.update(id, &row).await
    }

    pub async fn delete_member(&self, id: i32) -> AppResult<()> {
        self.repository.members.delete(id).await?;
        tracing::info!("Member {} deleted", id);
        Ok(())
    }
}
