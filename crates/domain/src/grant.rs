use std::str::FromStr;

use grantlens_core::AppError;
use serde::{Deserialize, Serialize};

/// Upstream source that produced a raw grant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSourceType {
    /// Grant inherited from the user's profile.
    Profile,
    /// Grant contributed by an assigned permission set.
    PermissionSet,
    /// Grant contributed by an installed package license.
    Package,
}

impl GrantSourceType {
    /// Returns a stable transport value for this source type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::PermissionSet => "permission_set",
            Self::Package => "package",
        }
    }
}

impl FromStr for GrantSourceType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "profile" => Ok(Self::Profile),
            "permission_set" => Ok(Self::PermissionSet),
            "package" => Ok(Self::Package),
            _ => Err(AppError::Validation(format!(
                "unknown grant source type '{value}'"
            ))),
        }
    }
}

/// One raw access-assignment row from a single upstream source.
///
/// Missing permission flags decode as `false`; create and delete only carry
/// meaning for object-level rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Upstream source category.
    pub source_type: GrantSourceType,
    /// Name of the profile, permission set or package.
    pub source_name: String,
    /// Object API name as reported by the source.
    pub object_name: String,
    /// Field API name for field-level rows, possibly dotted.
    #[serde(default)]
    pub field_name: Option<String>,
    /// Read access.
    #[serde(default)]
    pub can_read: bool,
    /// Create access.
    #[serde(default)]
    pub can_create: bool,
    /// Edit access.
    #[serde(default)]
    pub can_edit: bool,
    /// Delete access.
    #[serde(default)]
    pub can_delete: bool,
    /// Who assigned the source to the user, when known.
    #[serde(default)]
    pub assigned_by: Option<String>,
    /// How the source was assigned (direct, group, license).
    #[serde(default)]
    pub assignment_method: Option<String>,
}

impl Grant {
    /// Creates an object-level grant with every flag cleared.
    #[must_use]
    pub fn object(
        source_type: GrantSourceType,
        source_name: impl Into<String>,
        object_name: impl Into<String>,
    ) -> Self {
        Self {
            source_type,
            source_name: source_name.into(),
            object_name: object_name.into(),
            field_name: None,
            can_read: false,
            can_create: false,
            can_edit: false,
            can_delete: false,
            assigned_by: None,
            assignment_method: None,
        }
    }

    /// Creates a field-level grant with every flag cleared.
    #[must_use]
    pub fn field(
        source_type: GrantSourceType,
        source_name: impl Into<String>,
        object_name: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Self {
        Self {
            field_name: Some(field_name.into()),
            ..Self::object(source_type, source_name, object_name)
        }
    }

    /// Returns the grant with the given flags set.
    #[must_use]
    pub fn with_flags(mut self, flags: AccessFlags) -> Self {
        self.can_read = flags.read;
        self.can_create = flags.create;
        self.can_edit = flags.edit;
        self.can_delete = flags.delete;
        self
    }

    /// Returns the grant with assignment provenance attached.
    #[must_use]
    pub fn assigned(
        mut self,
        assigned_by: impl Into<String>,
        assignment_method: impl Into<String>,
    ) -> Self {
        self.assigned_by = Some(assigned_by.into());
        self.assignment_method = Some(assignment_method.into());
        self
    }

    /// Returns the permission flags carried by this row.
    #[must_use]
    pub fn flags(&self) -> AccessFlags {
        AccessFlags {
            read: self.can_read,
            create: self.can_create,
            edit: self.can_edit,
            delete: self.can_delete,
        }
    }

    /// Returns whether the row describes field-level access.
    #[must_use]
    pub fn is_field_level(&self) -> bool {
        self.field_name.is_some()
    }
}

/// Permission flags combined across grant rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessFlags {
    /// Read access.
    pub read: bool,
    /// Create access.
    pub create: bool,
    /// Edit access.
    pub edit: bool,
    /// Delete access.
    pub delete: bool,
}

impl AccessFlags {
    /// Flags with only read set.
    pub const READ: Self = Self {
        read: true,
        create: false,
        edit: false,
        delete: false,
    };

    /// Returns the logical OR of both flag sets.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            read: self.read || other.read,
            create: self.create || other.create,
            edit: self.edit || other.edit,
            delete: self.delete || other.delete,
        }
    }

    /// Returns whether every flag set in `self` is also set in `other`.
    #[must_use]
    pub fn is_subset_of(self, other: Self) -> bool {
        (!self.read || other.read)
            && (!self.create || other.create)
            && (!self.edit || other.edit)
            && (!self.delete || other.delete)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{AccessFlags, Grant, GrantSourceType};

    #[test]
    fn source_type_roundtrip_transport_value() {
        let source_type = GrantSourceType::PermissionSet;
        let restored = GrantSourceType::from_str(source_type.as_str());
        assert_eq!(restored.ok(), Some(source_type));
    }

    #[test]
    fn unknown_source_type_is_rejected() {
        assert!(GrantSourceType::from_str("role").is_err());
    }

    #[test]
    fn missing_flags_decode_as_false() {
        let decoded = serde_json::from_str::<Grant>(
            r#"{"source_type":"profile","source_name":"Standard","object_name":"Account","can_read":true}"#,
        );

        let Ok(grant) = decoded else {
            panic!("grant payload should decode");
        };
        assert_eq!(grant.flags(), AccessFlags::READ);
        assert!(!grant.is_field_level());
    }

    #[test]
    fn union_is_logical_or() {
        let read = AccessFlags::READ;
        let edit = AccessFlags {
            edit: true,
            ..AccessFlags::default()
        };

        let combined = read.union(edit);

        assert!(combined.read && combined.edit);
        assert!(!combined.create && !combined.delete);
        assert!(read.is_subset_of(combined));
        assert!(!combined.is_subset_of(read));
    }
}
