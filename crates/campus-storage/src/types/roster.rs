//! Ordered membership roster with a uniqueness invariant.

use serde::{Deserialize, Serialize};

use super::StudentId;

/// An ordered sequence of student ids in which each id appears at most once.
///
/// Both `members` and `admins` of a group are rosters. Order is meaningful
/// for admins (the first entry is the primary admin), so this is a vector
/// with uniqueness enforced at the mutation point rather than a hash set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(Vec<StudentId>);

impl Roster {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append `id` unless it is already present. Returns whether the roster
    /// changed.
    pub fn insert(&mut self, id: StudentId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    /// Remove `id` wherever it appears. Returns whether the roster changed.
    pub fn remove(&mut self, id: &StudentId) -> bool {
        let before = self.0.len();
        self.0.retain(|entry| entry != id);
        self.0.len() != before
    }

    pub fn contains(&self, id: &StudentId) -> bool {
        self.0.iter().any(|entry| entry == id)
    }

    /// The first entry, if any. For admin rosters this is the primary admin.
    pub fn first(&self) -> Option<&StudentId> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StudentId> {
        self.0.iter()
    }
}

impl From<Vec<StudentId>> for Roster {
    /// Builds a roster from a vector, dropping duplicate ids while keeping
    /// first-occurrence order.
    fn from(ids: Vec<StudentId>) -> Self {
        let mut roster = Roster::new();
        for id in ids {
            roster.insert(id);
        }
        roster
    }
}

impl FromIterator<StudentId> for Roster {
    fn from_iter<I: IntoIterator<Item = StudentId>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a StudentId;
    type IntoIter = std::slice::Iter<'a, StudentId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
