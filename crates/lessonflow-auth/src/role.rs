//! Staff roles and what each may do

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Role carried in a session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

#[derive(Debug, Error)]
#[error("Unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    /// Create and edit programs, terms, lessons, topics and assets
    pub fn can_edit_content(&self) -> bool {
        matches!(self, Role::Admin | Role::Editor)
    }

    /// Delete content rows
    pub fn can_delete(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_by_role() {
        assert!(Role::Admin.can_edit_content());
        assert!(Role::Admin.can_delete());
        assert!(Role::Admin.can_manage_users());

        assert!(Role::Editor.can_edit_content());
        assert!(!Role::Editor.can_delete());
        assert!(!Role::Editor.can_manage_users());

        assert!(!Role::Viewer.can_edit_content());
        assert!(!Role::Viewer.can_delete());
        assert!(!Role::Viewer.can_manage_users());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Editor".parse::<Role>().unwrap(), Role::Editor);
        assert!("owner".parse::<Role>().is_err());
        assert_eq!(Role::Viewer.to_string(), "viewer");
    }
}
