use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Fixed page size for the paginated list endpoint
pub const PAGE_SIZE: u64 = 10;

/// User entity as exposed on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Storage-assigned identifier, never reused
    pub id: i64,
    /// Display name, stored with surrounding whitespace removed
    pub name: String,
    /// Address, stored lowercase; unique across all users
    pub email: String,
    /// Whether the account is active
    pub is_active: bool,
}

/// Request body shared by create (POST), full update (PUT), and partial
/// update (PATCH).
///
/// Which fields are required is decided by the validation mode, not the
/// JSON shape, so absent fields must be representable here.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UserPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

/// Validated input for creating a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub is_active: bool,
}

/// Validated field changes for an update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

/// Repository-level filters for listing users
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Case-insensitive substring match over name and email
    pub search: Option<String>,
    /// Exact match on the active flag
    pub is_active: Option<bool>,
    pub limit: u64,
    pub offset: u64,
}

/// Query parameters accepted by the list endpoint
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListParams {
    /// Case-insensitive substring match over name and email
    pub search: Option<String>,
    /// Active-status filter; truthy values are "true", "1", "yes"
    pub is_active: Option<String>,
    /// 1-based page number
    pub page: Option<String>,
}

impl ListParams {
    /// Interpret the raw `is_active` query value.
    ///
    /// "true", "1", and "yes" (any case) select active users; any other
    /// value selects inactive ones.
    pub fn is_active_filter(&self) -> Option<bool> {
        self.is_active
            .as_deref()
            .map(|raw| matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes"))
    }
}

/// Page envelope returned by the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPage {
    /// Total number of users matching the filters
    pub count: u64,
    /// Link to the next page, if any
    pub next: Option<String>,
    /// Link to the previous page, if any
    pub previous: Option<String>,
    pub results: Vec<User>,
}

/// Response wrapper for the activate/deactivate actions
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub user: User,
}

impl User {
    /// Apply validated changes, leaving unset fields as they were
    pub fn apply_changes(&mut self, changes: UserChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 1,
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_apply_changes_partial() {
        let mut user = sample_user();
        user.apply_changes(UserChanges {
            name: Some("Johnny".to_string()),
            ..Default::default()
        });

        assert_eq!(user.name, "Johnny");
        assert_eq!(user.email, "john@example.com");
        assert!(user.is_active);
    }

    #[test]
    fn test_apply_changes_all_fields() {
        let mut user = sample_user();
        user.apply_changes(UserChanges {
            name: Some("Jane".to_string()),
            email: Some("jane@example.com".to_string()),
            is_active: Some(false),
        });

        assert_eq!(user.name, "Jane");
        assert_eq!(user.email, "jane@example.com");
        assert!(!user.is_active);
    }

    #[test]
    fn test_is_active_filter_truthy_values() {
        for raw in ["true", "True", "1", "yes", "YES"] {
            let params = ListParams {
                is_active: Some(raw.to_string()),
                ..Default::default()
            };
            assert_eq!(params.is_active_filter(), Some(true), "value: {raw}");
        }
    }

    #[test]
    fn test_is_active_filter_falsy_values() {
        for raw in ["false", "0", "no", "anything"] {
            let params = ListParams {
                is_active: Some(raw.to_string()),
                ..Default::default()
            };
            assert_eq!(params.is_active_filter(), Some(false), "value: {raw}");
        }
    }

    #[test]
    fn test_is_active_filter_absent() {
        assert_eq!(ListParams::default().is_active_filter(), None);
    }
}
