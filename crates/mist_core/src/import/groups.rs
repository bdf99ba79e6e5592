//! Group reconciliation for contact imports.

use std::collections::HashSet;

use mist_store::Filter;
use tracing::debug;

use crate::dao::Dao;
use crate::error::CoreResult;
use crate::model::{ContactEntry, Group, STARRED_GROUP};

/// Field telling a group document apart from a contact.
const GROUP_NAME_FIELD: &str = "name";

/// Tracks the group names an owner already has and completes import
/// batches with the groups they are missing.
#[derive(Debug, Clone)]
pub struct GroupReconciler {
    known: HashSet<String>,
}

impl GroupReconciler {
    /// Creates a reconciler knowing `existing` plus the built-in
    /// [`STARRED_GROUP`].
    pub fn new<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut known: HashSet<String> = existing.into_iter().map(Into::into).collect();
        known.insert(STARRED_GROUP.to_string());
        Self { known }
    }

    /// Returns true if the group name is known.
    #[must_use]
    pub fn knows(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Completes a batch in place, returning how many groups were added.
    ///
    /// 1. Group entries whose name is already known are removed, so an
    ///    import never duplicates a group. The others become known.
    /// 2. Contacts are walked in batch order; every group name they use
    ///    that is still unknown becomes known and a new [`Group`] is
    ///    appended to the batch.
    pub fn reconcile(&mut self, batch: &mut Vec<ContactEntry>) -> usize {
        batch.retain(|entry| match entry.group_name() {
            Some(name) => self.known.insert(name.to_string()),
            None => true,
        });

        let mut created = Vec::new();
        for entry in batch.iter() {
            let ContactEntry::Contact(contact) = entry else {
                continue;
            };
            for name in &contact.groups {
                if self.known.insert(name.clone()) {
                    created.push(ContactEntry::Group(Group::new(name.clone())));
                }
            }
        }

        let count = created.len();
        batch.extend(created);
        count
    }
}

/// Returns the names of the groups `owner` already has.
///
/// # Errors
///
/// Returns an error if the store is unavailable or the read fails.
pub fn existing_groups(dao: &Dao, owner: &str) -> CoreResult<Vec<String>> {
    Ok(dao
        .find(owner, Filter::all().exists(GROUP_NAME_FIELD))?
        .iter()
        .filter_map(|doc| doc.get_str(GROUP_NAME_FIELD).map(ToString::to_string))
        .collect())
}

/// Reconciles an import batch against the groups stored for `owner`.
///
/// # Errors
///
/// Returns an error if the existing groups cannot be read.
pub fn reconcile(dao: &Dao, owner: &str, batch: &mut Vec<ContactEntry>) -> CoreResult<()> {
    let mut reconciler = GroupReconciler::new(existing_groups(dao, owner)?);
    let created = reconciler.reconcile(batch);
    debug!(created, "groups reconciled");
    Ok(())
}
