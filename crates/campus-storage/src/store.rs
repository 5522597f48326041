//! The Store trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The storage trait the server depends on.
///
/// Groups are aggregate documents: the whole record (rosters and request
/// queue included) is read with [`Store::get_group`] and written back with
/// [`Store::save_group`].
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ──────────────────────────────── Students ────────────────────────────────

    /// Register a student (returns the generated ID).
    async fn create_student(&self, params: &CreateStudentParams) -> Result<StudentId, StoreError>;

    /// Get student by ID.
    async fn get_student(&self, id: &StudentId) -> Result<Student, StoreError>;

    /// Get student by email.
    async fn get_student_by_email(&self, email: &str) -> Result<Student, StoreError>;

    /// Apply a partial profile update and return the updated record.
    async fn update_student(
        &self,
        id: &StudentId,
        params: &UpdateStudentParams,
    ) -> Result<Student, StoreError>;

    // ──────────────────────────────── Groups ──────────────────────────────────

    /// Insert a new group.
    async fn create_group(&self, group: &Group) -> Result<(), StoreError>;

    /// Get a group (with its embedded rosters and join requests).
    async fn get_group(&self, id: &GroupId) -> Result<Group, StoreError>;

    /// List all groups.
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    /// Overwrite the stored group with `group`, whole-document style.
    ///
    /// There is no version check or row lock: two callers that loaded the
    /// same group and save concurrently race, and the last writer wins,
    /// silently discarding the other's effect.
    async fn save_group(&self, group: &Group) -> Result<(), StoreError>;

    /// Hard-delete a group.
    async fn delete_group(&self, id: &GroupId) -> Result<(), StoreError>;
}
