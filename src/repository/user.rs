//! User repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::pool::{AsyncSqlitePool, DieselError};
use super::records::UserRecord;
use super::fmt_datetime;
use crate::models::User;
use crate::schema::users;

#[derive(Clone)]
pub struct UserRepository {
    pool: AsyncSqlitePool,
}

impl UserRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by id.
    pub async fn get(&self, id: Uuid) -> Result<Option<User>, DieselError> {
        let mut conn = self.pool.get().await?;

        users::table
            .find(id.to_string())
            .first::<UserRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(User::from))
    }

    /// Insert a user.
    pub async fn insert(&self, user: &User) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(users::table)
            .values((
                users::id.eq(user.id.to_string()),
                users::email.eq(&user.email),
                users::full_name.eq(&user.full_name),
                users::is_active.eq(user.is_active as i32),
                users::created_at.eq(fmt_datetime(user.created_at)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::migrations;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_user_insert_and_get() {
        let dir = tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));
        migrations::run(&pool).await.unwrap();

        let repo = UserRepository::new(pool);
        let user = User::new("ada@example.com".to_string(), "Ada Lovelace".to_string());
        repo.insert(&user).await.unwrap();

        let fetched = repo.get(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "ada@example.com");
        assert!(fetched.is_active);

        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }
}
