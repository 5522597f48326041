//! Group membership and role decision logic.
//!
//! Every operation is a pure function over an in-memory [`Group`]: the
//! caller loads the group, applies an operation, and persists the result.
//! No I/O happens here and the clock is passed in, so the rules are
//! testable in isolation.
//!
//! Role model:
//! - *admin*: any id in `group.admins`; may approve/reject requests, remove
//!   members and promote new admins.
//! - *primary admin*: `group.admins.first()`; alone may demote other admins.
//! - *owner*: `group.owner`; alone may transfer ownership. The owner and
//!   the primary admin can diverge once ownership has been transferred,
//!   since a transfer does not reorder `admins`.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use campus_storage::{Group, GroupType, JoinRequest, RequestId, RequestStatus, StudentId};

/// The role a caller was missing when an operation failed with
/// [`MembershipError::Forbidden`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Admin,
    PrimaryAdmin,
    Owner,
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Requirement::Admin => "an admin",
            Requirement::PrimaryAdmin => "the primary admin",
            Requirement::Owner => "the group owner",
        };
        write!(f, "{}", s)
    }
}

/// Typed failures of membership operations. Never a silent no-op: every
/// rejected transition reports why.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MembershipError {
    /// The referenced join request or member is not in this group.
    #[error("not found in this group")]
    NotFound,
    #[error("access denied: you are not {0}")]
    Forbidden(Requirement),
    #[error("you are already a member of this group")]
    AlreadyMember,
    #[error("join request already sent")]
    DuplicateRequest,
    #[error("request has already been processed")]
    AlreadyProcessed,
    #[error("this member is already an admin")]
    AlreadyAdmin,
    #[error("this member is not an admin")]
    NotAdmin,
    #[error("you are not a member of this group")]
    NotMember,
    #[error("you are the only admin; transfer ownership or promote another member first")]
    SoleAdmin,
    #[error("this action is only for private groups")]
    WrongGroupType,
}

/// What happened on a successful [`join_group`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Public group: the caller is now a member.
    Joined,
    /// Private group: a join request was filed.
    Requested(RequestId),
}

/// Fails with `Forbidden` unless `caller` is an admin of `group`.
pub fn require_admin(group: &Group, caller: &StudentId) -> Result<(), MembershipError> {
    if group.admins.contains(caller) {
        Ok(())
    } else {
        Err(MembershipError::Forbidden(Requirement::Admin))
    }
}

fn require_primary_admin(group: &Group, caller: &StudentId) -> Result<(), MembershipError> {
    match group.admins.first() {
        Some(primary) if primary == caller => Ok(()),
        _ => Err(MembershipError::Forbidden(Requirement::PrimaryAdmin)),
    }
}

/// Join a public group directly, or file a join request on a private one.
pub fn join_group(
    group: &mut Group,
    caller: StudentId,
    now: DateTime<Utc>,
) -> Result<JoinOutcome, MembershipError> {
    if group.members.contains(&caller) {
        return Err(MembershipError::AlreadyMember);
    }

    match group.group_type {
        GroupType::Private => {
            let pending_exists = group
                .requests
                .iter()
                .any(|r| r.student_id == caller && r.status == RequestStatus::Pending);
            if pending_exists {
                return Err(MembershipError::DuplicateRequest);
            }
            let request = JoinRequest {
                id: RequestId(Uuid::now_v7()),
                student_id: caller,
                status: RequestStatus::Pending,
                requested_at: now,
            };
            let id = request.id;
            group.requests.push(request);
            Ok(JoinOutcome::Requested(id))
        }
        GroupType::Public => {
            group.members.insert(caller);
            Ok(JoinOutcome::Joined)
        }
    }
}

/// Withdraw the caller's own pending request. Private groups only; the
/// record is removed entirely, not marked.
pub fn cancel_join_request(
    group: &mut Group,
    caller: StudentId,
    request_id: &RequestId,
) -> Result<(), MembershipError> {
    if group.group_type != GroupType::Private {
        return Err(MembershipError::WrongGroupType);
    }

    let request = group
        .requests
        .iter()
        .find(|r| r.id == *request_id && r.student_id == caller)
        .ok_or(MembershipError::NotFound)?;

    if request.status != RequestStatus::Pending {
        return Err(MembershipError::AlreadyProcessed);
    }

    group.requests.retain(|r| r.id != *request_id);
    Ok(())
}

/// Accept a pending request and add its student to the members roster.
/// Admin-only; private groups only. Returns the admitted student.
pub fn approve_join_request(
    group: &mut Group,
    caller: StudentId,
    request_id: &RequestId,
) -> Result<StudentId, MembershipError> {
    if group.group_type != GroupType::Private {
        return Err(MembershipError::WrongGroupType);
    }
    require_admin(group, &caller)?;

    let request = group
        .request_mut(request_id)
        .ok_or(MembershipError::NotFound)?;
    if request.status != RequestStatus::Pending {
        return Err(MembershipError::AlreadyProcessed);
    }

    request.status = RequestStatus::Accepted;
    let student = request.student_id;
    group.members.insert(student);
    Ok(student)
}

/// Reject a pending request; membership is unchanged. Admin-only. Unlike
/// approval there is no group-type guard. Returns the rejected student.
pub fn reject_join_request(
    group: &mut Group,
    caller: StudentId,
    request_id: &RequestId,
) -> Result<StudentId, MembershipError> {
    require_admin(group, &caller)?;

    let request = group
        .request_mut(request_id)
        .ok_or(MembershipError::NotFound)?;
    if request.status != RequestStatus::Pending {
        return Err(MembershipError::AlreadyProcessed);
    }

    request.status = RequestStatus::Rejected;
    Ok(request.student_id)
}

/// Leave the group. Only the members roster changes: an admin who leaves
/// stays listed in `admins`.
pub fn leave_group(group: &mut Group, caller: StudentId) -> Result<(), MembershipError> {
    if !group.members.remove(&caller) {
        return Err(MembershipError::NotMember);
    }
    Ok(())
}

/// The pending slice of the request queue. Admin-only.
pub fn pending_requests<'a>(
    group: &'a Group,
    caller: &StudentId,
) -> Result<Vec<&'a JoinRequest>, MembershipError> {
    require_admin(group, caller)?;
    Ok(group
        .requests
        .iter()
        .filter(|r| r.status == RequestStatus::Pending)
        .collect())
}

/// Remove a member from the group. Admin-only.
pub fn remove_member(
    group: &mut Group,
    caller: StudentId,
    member: &StudentId,
) -> Result<(), MembershipError> {
    require_admin(group, &caller)?;
    if !group.members.remove(member) {
        return Err(MembershipError::NotFound);
    }
    Ok(())
}

/// Grant admin rights. Admin-only. Membership is NOT required of the
/// promoted id: a non-member can be made admin.
pub fn promote_member(
    group: &mut Group,
    caller: StudentId,
    member: StudentId,
) -> Result<(), MembershipError> {
    require_admin(group, &caller)?;
    if group.admins.contains(&member) {
        return Err(MembershipError::AlreadyAdmin);
    }
    group.admins.insert(member);
    Ok(())
}

/// Revoke another admin's rights. Restricted to the primary admin
/// (`admins.first()`), not any admin.
pub fn demote_member(
    group: &mut Group,
    caller: StudentId,
    member: &StudentId,
) -> Result<(), MembershipError> {
    require_primary_admin(group, &caller)?;
    if !group.admins.contains(member) {
        return Err(MembershipError::NotAdmin);
    }
    group.admins.remove(member);
    Ok(())
}

/// Step down from admin. Any admin may demote themself, except the last
/// one: `admins` must never empty out through self-demotion.
pub fn demote_self(group: &mut Group, caller: StudentId) -> Result<(), MembershipError> {
    require_admin(group, &caller)?;
    if group.admins.len() == 1 {
        return Err(MembershipError::SoleAdmin);
    }
    group.admins.remove(&caller);
    Ok(())
}

/// Hand the group to another member. Owner-only; the new owner must
/// already be a member. `admins` is left untouched, so the primary admin
/// and the owner may diverge from here on.
pub fn transfer_ownership(
    group: &mut Group,
    caller: StudentId,
    new_owner: StudentId,
) -> Result<(), MembershipError> {
    if group.owner != caller {
        return Err(MembershipError::Forbidden(Requirement::Owner));
    }
    if !group.members.contains(&new_owner) {
        return Err(MembershipError::NotMember);
    }
    group.owner = new_owner;
    Ok(())
}
