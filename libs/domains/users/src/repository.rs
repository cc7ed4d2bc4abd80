use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, User, UserFilter};

/// Repository trait for User persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user, assigning its id
    async fn create(&self, input: NewUser) -> UserResult<User>;

    /// Get a user by ID
    async fn get_by_id(&self, id: i64) -> UserResult<Option<User>>;

    /// List users matching the filter, ordered by ascending id
    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>>;

    /// Count users matching the filter (limit/offset are ignored)
    async fn count(&self, filter: UserFilter) -> UserResult<u64>;

    /// All active users, unpaginated, ordered by ascending id
    async fn list_active(&self) -> UserResult<Vec<User>>;

    /// Store the given state for an existing user
    async fn update(&self, user: User) -> UserResult<User>;

    /// Delete a user by ID; false when no such row existed
    async fn delete(&self, id: i64) -> UserResult<bool>;

    /// Check whether an email is taken, optionally ignoring one record
    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> UserResult<bool>;
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<i64, User>>>,
    // Monotonic, so ids are never reused even after deletes
    next_id: Arc<AtomicI64>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_filter(user: &User, filter: &UserFilter) -> bool {
    if let Some(ref search) = filter.search {
        let needle = search.to_lowercase();
        if !user.name.to_lowercase().contains(&needle)
            && !user.email.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    if let Some(is_active) = filter.is_active {
        if user.is_active != is_active {
            return false;
        }
    }
    true
}

fn sorted_by_id(users: impl Iterator<Item = User>) -> Vec<User> {
    let mut result: Vec<User> = users.collect();
    result.sort_by_key(|u| u.id);
    result
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, input: NewUser) -> UserResult<User> {
        let mut users = self.users.write().await;

        let email_taken = users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&input.email));
        if email_taken {
            return Err(UserError::DuplicateEmail(input.email));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id,
            name: input.name,
            email: input.email,
            is_active: input.is_active,
        };
        users.insert(id, user.clone());

        tracing::info!(user_id = id, email = %user.email, "Created user");
        Ok(user)
    }

    async fn get_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        let users = self.users.read().await;

        let result = sorted_by_id(
            users
                .values()
                .filter(|u| matches_filter(u, &filter))
                .cloned(),
        );

        Ok(result
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn count(&self, filter: UserFilter) -> UserResult<u64> {
        let users = self.users.read().await;

        Ok(users.values().filter(|u| matches_filter(u, &filter)).count() as u64)
    }

    async fn list_active(&self) -> UserResult<Vec<User>> {
        let users = self.users.read().await;

        Ok(sorted_by_id(
            users.values().filter(|u| u.is_active).cloned(),
        ))
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        if !users.contains_key(&user.id) {
            return Err(UserError::NotFound(user.id));
        }

        let email_taken = users
            .values()
            .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email));
        if email_taken {
            return Err(UserError::DuplicateEmail(user.email));
        }

        users.insert(user.id, user.clone());

        tracing::info!(user_id = user.id, "Updated user");
        Ok(user)
    }

    async fn delete(&self, id: i64) -> UserResult<bool> {
        let mut users = self.users.write().await;

        if users.remove(&id).is_some() {
            tracing::info!(user_id = id, "Deleted user");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> UserResult<bool> {
        let users = self.users.read().await;

        let exists = users
            .values()
            .any(|u| Some(u.id) != exclude_id && u.email.eq_ignore_ascii_case(email));
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let repo = InMemoryUserRepository::new();

        let first = repo.create(new_user("John", "john@example.com")).await.unwrap();
        let second = repo.create(new_user("Jane", "jane@example.com")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let repo = InMemoryUserRepository::new();

        let first = repo.create(new_user("John", "john@example.com")).await.unwrap();
        assert!(repo.delete(first.id).await.unwrap());

        let second = repo.create(new_user("Jane", "jane@example.com")).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_case_insensitively() {
        let repo = InMemoryUserRepository::new();

        repo.create(new_user("John", "john@example.com")).await.unwrap();

        let result = repo.create(new_user("Johnny", "JOHN@example.com")).await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_email_exists_excluding_self() {
        let repo = InMemoryUserRepository::new();

        let user = repo.create(new_user("John", "john@example.com")).await.unwrap();

        assert!(repo.email_exists("john@example.com", None).await.unwrap());
        assert!(!repo
            .email_exists("john@example.com", Some(user.id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_rejects_email_of_another_user() {
        let repo = InMemoryUserRepository::new();

        repo.create(new_user("John", "john@example.com")).await.unwrap();
        let mut jane = repo.create(new_user("Jane", "jane@example.com")).await.unwrap();

        jane.email = "john@example.com".to_string();
        let result = repo.update(jane).await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_list_search_matches_name_and_email() {
        let repo = InMemoryUserRepository::new();

        repo.create(new_user("John Doe", "john@example.com")).await.unwrap();
        repo.create(new_user("Jane Smith", "jane@other.org")).await.unwrap();

        let filter = UserFilter {
            search: Some("john".to_string()),
            limit: 10,
            ..Default::default()
        };
        let results = repo.list(filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "John Doe");

        // Matches the email domain of both users
        let filter = UserFilter {
            search: Some("OTHER".to_string()),
            limit: 10,
            ..Default::default()
        };
        let results = repo.list(filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Jane Smith");
    }

    #[tokio::test]
    async fn test_list_orders_by_id_with_pagination() {
        let repo = InMemoryUserRepository::new();

        for i in 0..5 {
            repo.create(new_user(&format!("User {i}"), &format!("user{i}@example.com")))
                .await
                .unwrap();
        }

        let page = repo
            .list(UserFilter {
                limit: 2,
                offset: 2,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.iter().map(|u| u.id).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[tokio::test]
    async fn test_list_active_excludes_inactive() {
        let repo = InMemoryUserRepository::new();

        let active = repo.create(new_user("John", "john@example.com")).await.unwrap();
        let mut inactive = repo.create(new_user("Jane", "jane@example.com")).await.unwrap();
        inactive.is_active = false;
        repo.update(inactive).await.unwrap();

        let result = repo.list_active().await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, active.id);
    }
}
