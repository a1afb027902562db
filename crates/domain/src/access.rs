use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One system-level permission of the reviewed user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPermissionRow {
    /// Display name with underscores replaced by spaces.
    pub permission: String,
    /// Whether the permission is granted.
    pub enabled: bool,
}

impl SystemPermissionRow {
    /// Returns the status label for the row.
    #[must_use]
    pub fn status(&self) -> &'static str {
        if self.enabled { "Enabled" } else { "Disabled" }
    }

    /// Builds display rows from a `permission name -> granted` map, sorted by
    /// the raw permission name.
    #[must_use]
    pub fn from_map(permissions: &BTreeMap<String, bool>) -> Vec<Self> {
        permissions
            .iter()
            .map(|(name, enabled)| Self {
                permission: name.replace('_', " "),
                enabled: *enabled,
            })
            .collect()
    }
}

/// Record access granted to the user through a sharing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharingRuleAccess {
    /// Shared object.
    pub object_name: String,
    /// Owner-based, criteria-based or manual.
    pub sharing_type: String,
    /// Read, edit or full access.
    pub access_level: String,
    /// Group or role the rule shares with.
    pub shared_with: String,
}

/// One role on the user's path through the role hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleHierarchyEntry {
    /// Role name.
    pub role_name: String,
    /// Parent role name, absent at the top.
    #[serde(default)]
    pub parent_role: Option<String>,
    /// Access the role grants over subordinate records.
    pub access_level: String,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::SystemPermissionRow;

    #[test]
    fn rows_are_sorted_and_humanized() {
        let permissions = BTreeMap::from([
            ("View_All_Data".to_owned(), false),
            ("Modify_All_Data".to_owned(), true),
        ]);

        let rows = SystemPermissionRow::from_map(&permissions);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].permission, "Modify All Data");
        assert_eq!(rows[0].status(), "Enabled");
        assert_eq!(rows[1].permission, "View All Data");
        assert_eq!(rows[1].status(), "Disabled");
    }
}
