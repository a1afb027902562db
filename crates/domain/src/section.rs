use std::collections::BTreeSet;
use std::str::FromStr;

use grantlens_core::AppError;
use serde::{Deserialize, Serialize};

/// Collapsible section of the access review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Record type assignments.
    RecordTypes,
    /// Object-level grants.
    Objects,
    /// Field-level grants.
    Fields,
    /// System-level permissions.
    SystemPermissions,
    /// Sharing rule access.
    SharingRules,
    /// Role hierarchy position.
    RoleHierarchy,
}

impl Section {
    /// Returns a stable transport value for this section.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecordTypes => "record_types",
            Self::Objects => "objects",
            Self::Fields => "fields",
            Self::SystemPermissions => "system_permissions",
            Self::SharingRules => "sharing_rules",
            Self::RoleHierarchy => "role_hierarchy",
        }
    }

    /// Returns all known sections in display order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Section] = &[
            Section::RecordTypes,
            Section::Objects,
            Section::Fields,
            Section::SystemPermissions,
            Section::SharingRules,
            Section::RoleHierarchy,
        ];

        ALL
    }
}

impl FromStr for Section {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|section| section.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown section '{value}'")))
    }
}

/// Set of sections currently expanded on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisibleSections(BTreeSet<Section>);

impl VisibleSections {
    /// Creates a set with every section collapsed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `section` is expanded.
    #[must_use]
    pub fn contains(&self, section: Section) -> bool {
        self.0.contains(&section)
    }

    /// Expands or collapses `section`.
    pub fn set(&mut self, section: Section, visible: bool) {
        if visible {
            self.0.insert(section);
        } else {
            self.0.remove(&section);
        }
    }

    /// Flips `section` and returns whether it is now expanded.
    pub fn toggle(&mut self, section: Section) -> bool {
        let visible = !self.contains(section);
        self.set(section, visible);
        visible
    }

    /// Iterates expanded sections in display order.
    pub fn iter(&self) -> impl Iterator<Item = Section> + '_ {
        self.0.iter().copied()
    }
}
