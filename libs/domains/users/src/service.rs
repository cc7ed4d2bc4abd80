use std::sync::Arc;

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, User, UserFilter, UserPayload, PAGE_SIZE};
use crate::repository::UserRepository;
use crate::validation::{self, MSG_DUPLICATE_EMAIL};

/// Service layer for User business logic
#[derive(Clone)]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a user.
    ///
    /// Every failing field is reported together in one error, including
    /// uniqueness — which is only looked up when the email's syntax
    /// passed, so a malformed address never triggers the lookup.
    pub async fn create_user(&self, payload: UserPayload) -> UserResult<User> {
        let mut checked = validation::check_create(&payload);

        if let Some(ref email) = checked.email {
            if self.repository.email_exists(email, None).await? {
                checked.errors.add("email", MSG_DUPLICATE_EMAIL);
            }
        }

        match (checked.name, checked.email, checked.errors.is_empty()) {
            (Some(name), Some(email), true) => {
                self.repository
                    .create(NewUser {
                        name,
                        email,
                        is_active: checked.is_active.unwrap_or(true),
                    })
                    .await
            }
            (_, _, _) => Err(UserError::Validation(checked.errors)),
        }
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: i64) -> UserResult<User> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    /// List one page of users plus the filtered total.
    ///
    /// Pages are 1-based and validated against the total: a page past the
    /// end is an error, not an empty result.
    pub async fn list_users(
        &self,
        search: Option<String>,
        is_active: Option<bool>,
        page: u64,
    ) -> UserResult<(Vec<User>, u64)> {
        if page == 0 {
            return Err(UserError::InvalidPage);
        }

        let filter = UserFilter {
            search,
            is_active,
            limit: PAGE_SIZE,
            offset: (page - 1) * PAGE_SIZE,
        };

        let count = self.repository.count(filter.clone()).await?;

        let total_pages = count.div_ceil(PAGE_SIZE).max(1);
        if page > total_pages {
            return Err(UserError::InvalidPage);
        }

        let users = self.repository.list(filter).await?;
        Ok((users, count))
    }

    /// Update a user. `partial` distinguishes PATCH from PUT.
    ///
    /// The record is fetched first so an absent id is NotFound even when
    /// the payload is also invalid. The uniqueness check excludes the
    /// record being updated.
    pub async fn update_user(
        &self,
        id: i64,
        payload: UserPayload,
        partial: bool,
    ) -> UserResult<User> {
        let mut user = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        let mut checked = validation::check_update(&payload, partial);

        if let Some(ref email) = checked.email {
            if !email.eq_ignore_ascii_case(&user.email)
                && self.repository.email_exists(email, Some(id)).await?
            {
                checked.errors.add("email", MSG_DUPLICATE_EMAIL);
            }
        }

        if !checked.errors.is_empty() {
            return Err(UserError::Validation(checked.errors));
        }

        user.apply_changes(checked.into_changes());
        self.repository.update(user).await
    }

    /// Delete a user
    pub async fn delete_user(&self, id: i64) -> UserResult<()> {
        let deleted = self.repository.delete(id).await?;

        if !deleted {
            return Err(UserError::NotFound(id));
        }

        Ok(())
    }

    /// Set the active flag. Idempotent: a user already in the requested
    /// state is returned without a write.
    pub async fn set_active(&self, id: i64, active: bool) -> UserResult<User> {
        let mut user = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        if user.is_active == active {
            return Ok(user);
        }

        user.is_active = active;
        self.repository.update(user).await
    }

    /// All active users, unpaginated
    pub async fn list_active_users(&self) -> UserResult<Vec<User>> {
        self.repository.list_active().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;
    use crate::validation::{MSG_BLANK, MSG_INVALID_EMAIL, MSG_REQUIRED};
    use mockall::predicate;

    fn payload(name: Option<&str>, email: Option<&str>, is_active: Option<bool>) -> UserPayload {
        UserPayload {
            name: name.map(str::to_string),
            email: email.map(str::to_string),
            is_active,
        }
    }

    fn stored_user(id: i64, name: &str, email: &str, is_active: bool) -> User {
        User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            is_active,
        }
    }

    fn errors_json(result: UserResult<User>) -> serde_json::Value {
        match result {
            Err(UserError::Validation(errors)) => serde_json::to_value(&errors).unwrap(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_defaults_is_active_to_true() {
        let mut mock_repo = MockUserRepository::new();

        mock_repo
            .expect_email_exists()
            .with(predicate::eq("john@example.com"), predicate::eq(None))
            .returning(|_, _| Ok(false));
        mock_repo
            .expect_create()
            .withf(|input| input.is_active && input.email == "john@example.com")
            .returning(|input| {
                Ok(User {
                    id: 1,
                    name: input.name,
                    email: input.email,
                    is_active: input.is_active,
                })
            });

        let service = UserService::new(mock_repo);
        let user = service
            .create_user(payload(Some("John Doe"), Some("JOHN@EXAMPLE.COM"), None))
            .await
            .unwrap();

        assert!(user.is_active);
        assert_eq!(user.email, "john@example.com");
    }

    #[tokio::test]
    async fn test_create_skips_uniqueness_lookup_on_bad_syntax() {
        // No email_exists expectation: the lookup must not happen
        let mock_repo = MockUserRepository::new();

        let service = UserService::new(mock_repo);
        let result = service
            .create_user(payload(Some("John"), Some("not-an-email"), None))
            .await;

        let value = errors_json(result);
        assert_eq!(value["email"][0], MSG_INVALID_EMAIL);
    }

    #[tokio::test]
    async fn test_create_reports_blank_name_and_duplicate_email_together() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_email_exists()
            .returning(|_, _| Ok(true));

        let service = UserService::new(mock_repo);
        let result = service
            .create_user(payload(Some(""), Some("taken@example.com"), None))
            .await;

        let value = errors_json(result);
        assert_eq!(value["name"][0], MSG_BLANK);
        assert_eq!(value["email"][0], MSG_DUPLICATE_EMAIL);
    }

    #[tokio::test]
    async fn test_create_missing_fields() {
        let mock_repo = MockUserRepository::new();

        let service = UserService::new(mock_repo);
        let result = service.create_user(payload(None, None, None)).await;

        let value = errors_json(result);
        assert_eq!(value["name"][0], MSG_REQUIRED);
        assert_eq!(value["email"][0], MSG_REQUIRED);
    }

    #[tokio::test]
    async fn test_update_keeping_own_email_skips_uniqueness_lookup() {
        let mut mock_repo = MockUserRepository::new();

        mock_repo
            .expect_get_by_id()
            .with(predicate::eq(1))
            .returning(|_| Ok(Some(stored_user(1, "John", "john@example.com", true))));
        // No email_exists expectation: same email must not trigger it
        mock_repo
            .expect_update()
            .returning(|user| Ok(user));

        let service = UserService::new(mock_repo);
        let user = service
            .update_user(
                1,
                payload(Some("Johnny"), Some("john@example.com"), Some(true)),
                false,
            )
            .await
            .unwrap();

        assert_eq!(user.name, "Johnny");
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found_before_validation() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo.expect_get_by_id().returning(|_| Ok(None));

        let service = UserService::new(mock_repo);
        // Payload is invalid too; NotFound must win
        let result = service.update_user(99, payload(Some(""), None, None), true).await;

        assert!(matches!(result, Err(UserError::NotFound(99))));
    }

    #[tokio::test]
    async fn test_full_update_requires_is_active() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_get_by_id()
            .returning(|_| Ok(Some(stored_user(1, "John", "john@example.com", true))));
        mock_repo.expect_email_exists().returning(|_, _| Ok(false));

        let service = UserService::new(mock_repo);
        let result = service
            .update_user(1, payload(Some("John"), Some("new@example.com"), None), false)
            .await;

        let value = errors_json(result);
        assert_eq!(value["is_active"][0], MSG_REQUIRED);
    }

    #[tokio::test]
    async fn test_set_active_is_idempotent() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_get_by_id()
            .returning(|_| Ok(Some(stored_user(1, "John", "john@example.com", true))));
        // No update expectation: an already-active user must not be written

        let service = UserService::new(mock_repo);
        let user = service.set_active(1, true).await.unwrap();

        assert!(user.is_active);
    }

    #[tokio::test]
    async fn test_set_active_writes_on_transition() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_get_by_id()
            .returning(|_| Ok(Some(stored_user(1, "John", "john@example.com", true))));
        mock_repo
            .expect_update()
            .withf(|user| !user.is_active)
            .returning(|user| Ok(user));

        let service = UserService::new(mock_repo);
        let user = service.set_active(1, false).await.unwrap();

        assert!(!user.is_active);
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo.expect_delete().returning(|_| Ok(false));

        let service = UserService::new(mock_repo);
        let result = service.delete_user(99).await;

        assert!(matches!(result, Err(UserError::NotFound(99))));
    }

    #[tokio::test]
    async fn test_list_rejects_page_past_the_end() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo.expect_count().returning(|_| Ok(5));

        let service = UserService::new(mock_repo);
        let result = service.list_users(None, None, 2).await;

        assert!(matches!(result, Err(UserError::InvalidPage)));
    }

    #[tokio::test]
    async fn test_list_rejects_page_zero() {
        let mock_repo = MockUserRepository::new();

        let service = UserService::new(mock_repo);
        let result = service.list_users(None, None, 0).await;

        assert!(matches!(result, Err(UserError::InvalidPage)));
    }

    #[tokio::test]
    async fn test_list_page_one_of_empty_table_is_valid() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo.expect_count().returning(|_| Ok(0));
        mock_repo.expect_list().returning(|_| Ok(vec![]));

        let service = UserService::new(mock_repo);
        let (users, count) = service.list_users(None, None, 1).await.unwrap();

        assert!(users.is_empty());
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_list_passes_offset_for_requested_page() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo.expect_count().returning(|_| Ok(25));
        mock_repo
            .expect_list()
            .withf(|filter| filter.offset == 10 && filter.limit == PAGE_SIZE)
            .returning(|_| Ok(vec![]));

        let service = UserService::new(mock_repo);
        service.list_users(None, None, 2).await.unwrap();
    }
}
