use async_trait::async_trait;
use chrono::Utc;
use database::BaseRepository;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, ExprTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::{
    entity,
    error::{UserError, UserResult},
    models::{NewUser, User, UserFilter},
    repository::UserRepository,
};

/// PostgreSQL implementation of UserRepository using SeaORM
pub struct PgUserRepository {
    base: BaseRepository<entity::Entity>,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn filtered_query(filter: &UserFilter) -> sea_orm::Select<entity::Entity> {
        let mut query = entity::Entity::find();

        if let Some(ref search) = filter.search {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            entity::Entity,
                            entity::Column::Name,
                        ))))
                        .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            entity::Entity,
                            entity::Column::Email,
                        ))))
                        .like(pattern),
                    ),
            );
        }

        if let Some(is_active) = filter.is_active {
            query = query.filter(entity::Column::IsActive.eq(is_active));
        }

        query
    }
}

fn internal(e: DbErr) -> UserError {
    UserError::Internal(format!("Database error: {}", e))
}

/// Classify a write error: the unique index on email is the authoritative
/// duplicate arbiter, so its violations become the duplicate-email error
/// rather than a 500.
fn map_write_err(email: &str, e: DbErr) -> UserError {
    let message = e.to_string();
    if message.contains("duplicate key") || message.contains("unique constraint") {
        UserError::DuplicateEmail(email.to_string())
    } else {
        internal(e)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, input: NewUser) -> UserResult<User> {
        let email = input.email.clone();
        let active_model: entity::ActiveModel = input.into();

        let model = self
            .base
            .insert(active_model)
            .await
            .map_err(|e| map_write_err(&email, e))?;

        tracing::info!(user_id = model.id, "Created user");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let model = self.base.find_by_id(id).await.map_err(internal)?;
        Ok(model.map(Into::into))
    }

    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        let models = Self::filtered_query(&filter)
            .order_by_asc(entity::Column::Id)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(self.base.db())
            .await
            .map_err(internal)?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn count(&self, filter: UserFilter) -> UserResult<u64> {
        Self::filtered_query(&filter)
            .count(self.base.db())
            .await
            .map_err(internal)
    }

    async fn list_active(&self) -> UserResult<Vec<User>> {
        let models = entity::Entity::find()
            .filter(entity::Column::IsActive.eq(true))
            .order_by_asc(entity::Column::Id)
            .all(self.base.db())
            .await
            .map_err(internal)?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let model = self
            .base
            .find_by_id(user.id)
            .await
            .map_err(internal)?
            .ok_or(UserError::NotFound(user.id))?;

        let email = user.email.clone();
        let active_model = entity::ActiveModel {
            id: Set(user.id),
            name: Set(user.name),
            email: Set(user.email),
            is_active: Set(user.is_active),
            created_at: Set(model.created_at),
            updated_at: Set(Utc::now().into()),
        };

        let updated = self
            .base
            .update(active_model)
            .await
            .map_err(|e| map_write_err(&email, e))?;

        tracing::info!(user_id = updated.id, "Updated user");
        Ok(updated.into())
    }

    async fn delete(&self, id: i64) -> UserResult<bool> {
        let rows_affected = self.base.delete_by_id(id).await.map_err(internal)?;

        if rows_affected > 0 {
            tracing::info!(user_id = id, "Deleted user");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> UserResult<bool> {
        let mut query = entity::Entity::find().filter(entity::Column::Email.eq(email));

        if let Some(id) = exclude_id {
            query = query.filter(entity::Column::Id.ne(id));
        }

        let exists = query
            .one(self.base.db())
            .await
            .map_err(internal)?
            .is_some();

        Ok(exists)
    }
}
