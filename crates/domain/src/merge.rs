//! Deduplication of raw grant rows into one record per entity.
//!
//! Rows are keyed by normalized object name, plus the normalized field name
//! for field-level rows. Flags combine by logical OR, so a flag that was
//! granted by any source stays granted. Provenance is taken from the first
//! row seen for a key and never replaced.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::grant::{AccessFlags, Grant, GrantSourceType};

/// Internal namespace token some sources prefix object names with.
pub const INTERNAL_NAMESPACE_TOKEN: &str = "SA_Audit__";

/// Custom object suffix stripped for display and keying.
pub const CUSTOM_OBJECT_SUFFIX: &str = "__c";

/// Strips source-specific decoration from an object name.
#[must_use]
pub fn normalize_object_name(object_name: &str) -> String {
    object_name
        .trim()
        .replace(INTERNAL_NAMESPACE_TOKEN, "")
        .replace(CUSTOM_OBJECT_SUFFIX, "")
}

/// Reduces a dotted field path to its trailing segment.
#[must_use]
pub fn normalize_field_name(field_name: &str) -> String {
    let trimmed = field_name.trim();
    trimmed
        .rsplit_once('.')
        .map_or(trimmed, |(_, field)| field)
        .to_owned()
}

/// Entity key of a merged grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantKey(String);

impl GrantKey {
    /// Key for object-level access on an already normalized object name.
    #[must_use]
    pub fn object(object_name: &str) -> Self {
        Self(object_name.to_owned())
    }

    /// Key for field-level access on already normalized names.
    #[must_use]
    pub fn field(object_name: &str, field_name: &str) -> Self {
        Self(format!("{object_name}.{field_name}"))
    }

    /// Derives the key a raw grant row merges under.
    #[must_use]
    pub fn for_grant(grant: &Grant) -> Self {
        let object_name = normalize_object_name(grant.object_name.as_str());
        match grant.field_name.as_deref() {
            Some(field_name) => Self::field(
                object_name.as_str(),
                normalize_field_name(field_name).as_str(),
            ),
            None => Self(object_name),
        }
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for GrantKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Source retained for display on a merged grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantProvenance {
    /// Source category of the first row seen.
    pub source_type: GrantSourceType,
    /// Source name of the first row seen.
    pub source_name: String,
    /// Assigner of the first row seen.
    pub assigned_by: Option<String>,
    /// Assignment method of the first row seen.
    pub assignment_method: Option<String>,
}

/// Deduplicated, flag-combined view of all grants sharing a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedGrant {
    /// Entity key.
    pub key: GrantKey,
    /// Normalized object name.
    pub object_name: String,
    /// Normalized field name for field-level grants.
    pub field_name: Option<String>,
    /// OR-combination of every contributing row.
    pub flags: AccessFlags,
    /// First-seen source.
    pub provenance: GrantProvenance,
    /// Distinct source names that contributed rows.
    pub contributing_sources: BTreeSet<String>,
}

impl MergedGrant {
    /// Returns whether the object or field name contains `needle`, ignoring case.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        self.object_name.to_lowercase().contains(needle.as_str())
            || self
                .field_name
                .as_deref()
                .is_some_and(|field| field.to_lowercase().contains(needle.as_str()))
    }

    fn seed(incoming: &Grant) -> Self {
        let object_name = normalize_object_name(incoming.object_name.as_str());
        let field_name = incoming.field_name.as_deref().map(normalize_field_name);
        let key = match field_name.as_deref() {
            Some(field_name) => GrantKey::field(object_name.as_str(), field_name),
            None => GrantKey::object(object_name.as_str()),
        };

        Self {
            key,
            object_name,
            field_name,
            flags: incoming.flags(),
            provenance: GrantProvenance {
                source_type: incoming.source_type,
                source_name: incoming.source_name.clone(),
                assigned_by: incoming.assigned_by.clone(),
                assignment_method: incoming.assignment_method.clone(),
            },
            contributing_sources: BTreeSet::from([incoming.source_name.clone()]),
        }
    }

    fn absorb(&mut self, incoming: &Grant) {
        self.flags = self.flags.union(incoming.flags());
        self.contributing_sources
            .insert(incoming.source_name.clone());
    }
}

/// Folds one raw grant into an optional existing merged record.
///
/// The caller is responsible for only pairing rows with the record of the
/// same [`GrantKey`].
#[must_use]
pub fn merge(existing: Option<MergedGrant>, incoming: &Grant) -> MergedGrant {
    match existing {
        Some(mut merged) => {
            merged.absorb(incoming);
            merged
        }
        None => MergedGrant::seed(incoming),
    }
}

/// Merges a batch of raw rows into first-seen order.
#[must_use]
pub fn merge_batch<'a>(grants: impl IntoIterator<Item = &'a Grant>) -> Vec<MergedGrant> {
    let mut buffer = MergedGrantBuffer::new();
    buffer.extend(grants);
    buffer.into_vec()
}

/// Insertion-ordered keyed collection of merged grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedGrantBuffer {
    entries: Vec<MergedGrant>,
    positions: HashMap<GrantKey, usize>,
}

impl MergedGrantBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one raw row, appending a new entry for unseen keys.
    pub fn merge_grant(&mut self, grant: &Grant) {
        let key = GrantKey::for_grant(grant);
        match self.positions.get(&key) {
            Some(&position) => self.entries[position].absorb(grant),
            None => {
                self.positions.insert(key, self.entries.len());
                self.entries.push(MergedGrant::seed(grant));
            }
        }
    }

    /// Merges every row of a batch.
    pub fn extend<'a>(&mut self, grants: impl IntoIterator<Item = &'a Grant>) {
        for grant in grants {
            self.merge_grant(grant);
        }
    }

    /// Returns the merged entry for a key.
    #[must_use]
    pub fn get(&self, key: &GrantKey) -> Option<&MergedGrant> {
        self.positions
            .get(key)
            .and_then(|position| self.entries.get(*position))
    }

    /// Returns entries in first-seen order.
    #[must_use]
    pub fn as_slice(&self) -> &[MergedGrant] {
        self.entries.as_slice()
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the buffer holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }

    /// Consumes the buffer into its ordered entries.
    #[must_use]
    pub fn into_vec(self) -> Vec<MergedGrant> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{
        GrantKey, MergedGrantBuffer, merge, merge_batch, normalize_field_name,
        normalize_object_name,
    };
    use crate::grant::{AccessFlags, Grant, GrantSourceType};

    fn object_grant(source_name: &str, object_name: &str, flags: AccessFlags) -> Grant {
        let source_type = if source_name.starts_with("Profile") {
            GrantSourceType::Profile
        } else {
            GrantSourceType::PermissionSet
        };
        Grant::object(source_type, source_name, object_name).with_flags(flags)
    }

    #[test]
    fn object_name_loses_namespace_and_suffix() {
        assert_eq!(normalize_object_name("SA_Audit__Invoice__c"), "Invoice");
        assert_eq!(normalize_object_name("Account"), "Account");
    }

    #[test]
    fn field_path_keeps_trailing_segment() {
        assert_eq!(normalize_field_name("Contact.OtherPhone"), "OtherPhone");
        assert_eq!(normalize_field_name("Name"), "Name");
    }

    #[test]
    fn duplicate_object_rows_collapse_into_one() {
        let merged = merge_batch(&[
            object_grant("ProfileA", "Account", AccessFlags::READ),
            object_grant(
                "PermSetB",
                "Account",
                AccessFlags {
                    create: true,
                    ..AccessFlags::default()
                },
            ),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].key, GrantKey::object("Account"));
        assert_eq!(
            merged[0].flags,
            AccessFlags {
                read: true,
                create: true,
                edit: false,
                delete: false,
            }
        );
    }

    #[test]
    fn later_sources_keep_first_provenance() {
        let first = merge(
            None,
            &object_grant("ProfileA", "Account", AccessFlags::default())
                .assigned("admin", "direct"),
        );
        let second = merge(
            Some(first),
            &object_grant("PermSetB", "Account", AccessFlags::READ).assigned("ops", "group"),
        );

        assert_eq!(second.provenance.source_name, "ProfileA");
        assert_eq!(second.provenance.assigned_by.as_deref(), Some("admin"));
        assert!(second.flags.read);
        assert_eq!(second.contributing_sources.len(), 2);
    }

    #[test]
    fn decorated_field_rows_share_a_key() {
        let mut buffer = MergedGrantBuffer::new();
        buffer.merge_grant(
            &Grant::field(
                GrantSourceType::Profile,
                "ProfileA",
                "SA_Audit__Contact__c",
                "Contact.OtherPhone",
            )
            .with_flags(AccessFlags::READ),
        );
        buffer.merge_grant(
            &Grant::field(
                GrantSourceType::Package,
                "PackageC",
                "Contact",
                "OtherPhone",
            )
            .with_flags(AccessFlags {
                edit: true,
                ..AccessFlags::default()
            }),
        );

        assert_eq!(buffer.len(), 1);
        let Some(merged) = buffer.get(&GrantKey::field("Contact", "OtherPhone")) else {
            panic!("merged field grant should exist");
        };
        assert!(merged.flags.read && merged.flags.edit);
        assert_eq!(merged.field_name.as_deref(), Some("OtherPhone"));
    }

    #[test]
    fn object_and_field_rows_do_not_collide() {
        let merged = merge_batch(&[
            Grant::object(GrantSourceType::Profile, "ProfileA", "Account"),
            Grant::field(GrantSourceType::Profile, "ProfileA", "Account", "Name"),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].key.as_str(), "Account.Name");
    }

    #[test]
    fn matches_object_or_field_ignoring_case() {
        let merged = merge(
            None,
            &Grant::field(GrantSourceType::Profile, "ProfileA", "Contact", "OtherPhone"),
        );

        assert!(merged.matches("contact"));
        assert!(merged.matches("PHONE"));
        assert!(merged.matches(""));
        assert!(!merged.matches("account"));
    }

    fn arb_flags() -> impl Strategy<Value = AccessFlags> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(read, create, edit, delete)| AccessFlags {
                read,
                create,
                edit,
                delete,
            },
        )
    }

    fn arb_grant() -> impl Strategy<Value = Grant> {
        (
            prop_oneof![
                Just(GrantSourceType::Profile),
                Just(GrantSourceType::PermissionSet),
                Just(GrantSourceType::Package),
            ],
            "[A-Za-z]{1,8}",
            prop_oneof![
                Just("Account".to_owned()),
                Just("SA_Audit__Invoice__c".to_owned()),
                "[A-Z][a-z]{2,8}",
            ],
            prop::option::of("([A-Z][a-z]{1,6}\\.)?[A-Z][a-z]{1,8}"),
            arb_flags(),
        )
            .prop_map(|(source_type, source_name, object_name, field_name, flags)| {
                Grant {
                    field_name,
                    ..Grant::object(source_type, source_name, object_name)
                }
                .with_flags(flags)
            })
    }

    proptest! {
        #[test]
        fn merging_the_same_row_twice_is_idempotent(grant in arb_grant()) {
            let once = merge(None, &grant);
            let twice = merge(Some(once.clone()), &grant);
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn merged_flags_never_decrease(first in arb_grant(), flags in arb_flags()) {
            let existing = merge(None, &first);
            let incoming = Grant { source_name: "Other".to_owned(), ..first.clone() }.with_flags(flags);
            let merged = merge(Some(existing.clone()), &incoming);

            prop_assert!(existing.flags.is_subset_of(merged.flags));
            prop_assert_eq!(merged.provenance, existing.provenance);
        }

        #[test]
        fn buffer_keys_stay_unique(grants in prop::collection::vec(arb_grant(), 0..40)) {
            let merged = merge_batch(&grants);
            let mut keys: Vec<_> = merged.iter().map(|grant| grant.key.clone()).collect();
            let total = keys.len();
            keys.sort();
            keys.dedup();
            prop_assert_eq!(keys.len(), total);
        }
    }
}
