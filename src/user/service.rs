use crate::error::AppResult;
use crate::ids::UserId;
use crate::user::domain::{NewUser, User, UserError, UserPatch};
use crate::user::repository::DynUserRepository;

/// User registry: account CRUD on top of the user store.
pub struct UserService {
    users: DynUserRepository,
}

impl UserService {
    pub fn new(users: DynUserRepository) -> Self {
        Self { users }
    }

    pub async fn create(&self, user: NewUser) -> AppResult<User> {
        let created = self.users.create(&user).await?;
        tracing::info!(user_id = %created.id, "User registered");
        Ok(created)
    }

    pub async fn get(&self, id: UserId) -> AppResult<User> {
        let user = self.users.fetch(id).await?.ok_or(UserError::NotFound(id))?;
        Ok(user)
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.users.list().await?)
    }

    pub async fn update(&self, id: UserId, patch: UserPatch) -> AppResult<User> {
        let updated = self.get(id).await?.apply(patch);
        if !self.users.update(&updated).await? {
            return Err(UserError::NotFound(id).into());
        }
        Ok(updated)
    }

    /// Removing an unknown user is not an error.
    pub async fn delete(&self, id: UserId) -> AppResult<()> {
        if self.users.delete(id).await? {
            tracing::info!(user_id = %id, "User deleted");
        }
        Ok(())
    }
}
