use super::*;

/// Fetch routine behind a collapsible section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionLoader {
    ObjectGrants,
    FieldGrants,
    SystemPermissions,
    SharingRules,
    RoleHierarchy,
}

impl SectionLoader {
    fn for_section(section: Section) -> Option<Self> {
        match section {
            Section::RecordTypes => None,
            Section::Objects => Some(Self::ObjectGrants),
            Section::Fields => Some(Self::FieldGrants),
            Section::SystemPermissions => Some(Self::SystemPermissions),
            Section::SharingRules => Some(Self::SharingRules),
            Section::RoleHierarchy => Some(Self::RoleHierarchy),
        }
    }
}

impl AccessReviewSession {
    /// Flips a section's visibility and returns whether it is now visible.
    ///
    /// A section becoming visible is loaded once per selection.
    pub async fn toggle_section(&mut self, section: Section) -> bool {
        let visible = self.visible_sections.toggle(section);
        if visible {
            self.ensure_section_loaded(section).await;
        }

        visible
    }

    /// Shows or hides a section, loading it when it becomes visible.
    pub async fn set_section_visible(&mut self, section: Section, visible: bool) {
        self.visible_sections.set(section, visible);
        if visible {
            self.ensure_section_loaded(section).await;
        }
    }

    /// Returns the visible sections.
    #[must_use]
    pub fn visible_sections(&self) -> &VisibleSections {
        &self.visible_sections
    }

    /// Returns whether a section's data was loaded for the current selection.
    #[must_use]
    pub fn is_section_loaded(&self, section: Section) -> bool {
        self.loaded_sections.contains(&section)
    }

    /// Returns the sharing rules section rows.
    #[must_use]
    pub fn sharing_rules(&self) -> &[SharingRuleAccess] {
        self.sharing_rules.as_slice()
    }

    /// Returns the role hierarchy section rows.
    #[must_use]
    pub fn role_hierarchy(&self) -> &[RoleHierarchyEntry] {
        self.role_hierarchy.as_slice()
    }

    pub(super) async fn load_visible_sections(&mut self, skip: &BTreeSet<Section>) {
        let pending = self
            .visible_sections
            .iter()
            .filter(|section| {
                !self.loaded_sections.contains(section) && !skip.contains(section)
            })
            .collect::<Vec<_>>();

        for section in pending {
            self.ensure_section_loaded(section).await;
        }
    }

    async fn ensure_section_loaded(&mut self, section: Section) {
        if self.loaded_sections.contains(&section) {
            return;
        }

        let Some(loader) = SectionLoader::for_section(section) else {
            return;
        };

        let Some(user_id) = self.selected_user.clone() else {
            return;
        };

        if self.run_loader(loader, &user_id).await {
            self.loaded_sections.insert(section);
        }
    }

    async fn run_loader(&mut self, loader: SectionLoader, user_id: &UserId) -> bool {
        debug!(
            session_id = %self.session_id,
            user_id = %user_id,
            loader = ?loader,
            "loading review section"
        );

        match loader {
            SectionLoader::ObjectGrants => match self.object_grants.fetch_page().await {
                Ok(()) => true,
                Err(error) => {
                    self.note_failure("Object Grants", &error);
                    false
                }
            },
            SectionLoader::FieldGrants => match self.field_grants.reload().await {
                Ok(_) => true,
                Err(error) => {
                    self.note_failure("Field Grants", &error);
                    false
                }
            },
            SectionLoader::SystemPermissions => {
                match self
                    .ports
                    .system_permissions
                    .fetch_system_permissions(user_id)
                    .await
                {
                    Ok(permissions) => {
                        self.system_permissions = SystemPermissionRow::from_map(&permissions);
                        true
                    }
                    Err(error) => {
                        self.system_permissions.clear();
                        self.note_failure("System Permissions", &error);
                        false
                    }
                }
            }
            SectionLoader::SharingRules => {
                match self.ports.sharing.fetch_sharing_rules(user_id).await {
                    Ok(rules) => {
                        self.sharing_rules = rules;
                        true
                    }
                    Err(error) => {
                        self.sharing_rules.clear();
                        self.note_failure("Sharing Rules", &error);
                        false
                    }
                }
            }
            SectionLoader::RoleHierarchy => {
                match self.ports.sharing.fetch_role_hierarchy(user_id).await {
                    Ok(entries) => {
                        self.role_hierarchy = entries;
                        true
                    }
                    Err(error) => {
                        self.role_hierarchy.clear();
                        self.note_failure("Role Hierarchy", &error);
                        false
                    }
                }
            }
        }
    }
}
