//! Handler modules for gRPC service implementation
//!
//! This module contains handler functions organized by domain:
//! - auth: register
//! - students: profile get/update
//! - groups: group CRUD + invite code
//! - membership: join/leave, request queue, roles, ownership

pub mod auth;
pub mod groups;
pub mod membership;
pub mod students;

use tonic::{Request, Response, Status};
use uuid::Uuid;

use campus_membership::MembershipError;
use campus_proto::campus_service_server::CampusService;
use campus_proto::*;
use campus_storage::{GroupId, RequestId, StudentId};

use crate::server::CampusServer;

pub(crate) fn parse_group_id(raw: &str) -> Result<GroupId, Status> {
    Uuid::parse_str(raw)
        .map(GroupId)
        .map_err(|_| Status::invalid_argument("Invalid group id"))
}

pub(crate) fn parse_student_id(raw: &str) -> Result<StudentId, Status> {
    Uuid::parse_str(raw)
        .map(StudentId)
        .map_err(|_| Status::invalid_argument("Invalid student id"))
}

pub(crate) fn parse_request_id(raw: &str) -> Result<RequestId, Status> {
    Uuid::parse_str(raw)
        .map(RequestId)
        .map_err(|_| Status::invalid_argument("Invalid request id"))
}

/// Map an engine failure to the transport. Missing things are not_found,
/// missing roles are permission_denied, and everything else is a state
/// conflict (failed_precondition), not malformed input.
pub(crate) fn membership_status(err: MembershipError) -> Status {
    match &err {
        MembershipError::NotFound => Status::not_found(err.to_string()),
        MembershipError::Forbidden(_) => Status::permission_denied(err.to_string()),
        _ => Status::failed_precondition(err.to_string()),
    }
}

#[tonic::async_trait]
impl CampusService for CampusServer {
    // ───────────────────────────────────── Auth ─────────────────────────────────────

    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        auth::register(self, request).await
    }

    // ───────────────────────────────────── Students ─────────────────────────────────

    async fn get_student(
        &self,
        request: Request<GetStudentRequest>,
    ) -> Result<Response<Student>, Status> {
        students::get_student(self, request).await
    }

    async fn update_student(
        &self,
        request: Request<UpdateStudentRequest>,
    ) -> Result<Response<Student>, Status> {
        students::update_student(self, request).await
    }

    // ───────────────────────────────────── Groups ───────────────────────────────────

    async fn create_group(
        &self,
        request: Request<CreateGroupRequest>,
    ) -> Result<Response<Group>, Status> {
        groups::create_group(self, request).await
    }

    async fn get_group(
        &self,
        request: Request<GetGroupRequest>,
    ) -> Result<Response<Group>, Status> {
        groups::get_group(self, request).await
    }

    async fn list_groups(&self, request: Request<Empty>) -> Result<Response<GroupList>, Status> {
        groups::list_groups(self, request).await
    }

    async fn update_group(
        &self,
        request: Request<UpdateGroupRequest>,
    ) -> Result<Response<Group>, Status> {
        groups::update_group(self, request).await
    }

    async fn delete_group(
        &self,
        request: Request<DeleteGroupRequest>,
    ) -> Result<Response<Empty>, Status> {
        groups::delete_group(self, request).await
    }

    async fn regenerate_invite_code(
        &self,
        request: Request<RegenerateInviteCodeRequest>,
    ) -> Result<Response<InviteCode>, Status> {
        groups::regenerate_invite_code(self, request).await
    }

    // ───────────────────────────────────── Membership ───────────────────────────────

    async fn join_group(
        &self,
        request: Request<JoinGroupRequest>,
    ) -> Result<Response<JoinGroupResponse>, Status> {
        membership::join_group(self, request).await
    }

    async fn cancel_join_request(
        &self,
        request: Request<CancelJoinRequestRequest>,
    ) -> Result<Response<Empty>, Status> {
        membership::cancel_join_request(self, request).await
    }

    async fn approve_join_request(
        &self,
        request: Request<ApproveJoinRequestRequest>,
    ) -> Result<Response<Empty>, Status> {
        membership::approve_join_request(self, request).await
    }

    async fn reject_join_request(
        &self,
        request: Request<RejectJoinRequestRequest>,
    ) -> Result<Response<Empty>, Status> {
        membership::reject_join_request(self, request).await
    }

    async fn leave_group(
        &self,
        request: Request<LeaveGroupRequest>,
    ) -> Result<Response<Empty>, Status> {
        membership::leave_group(self, request).await
    }

    async fn list_group_members(
        &self,
        request: Request<ListGroupMembersRequest>,
    ) -> Result<Response<MemberList>, Status> {
        membership::list_group_members(self, request).await
    }

    async fn list_pending_requests(
        &self,
        request: Request<ListPendingRequestsRequest>,
    ) -> Result<Response<JoinRequestList>, Status> {
        membership::list_pending_requests(self, request).await
    }

    async fn remove_group_member(
        &self,
        request: Request<RemoveGroupMemberRequest>,
    ) -> Result<Response<Empty>, Status> {
        membership::remove_group_member(self, request).await
    }

    async fn promote_member(
        &self,
        request: Request<PromoteMemberRequest>,
    ) -> Result<Response<Empty>, Status> {
        membership::promote_member(self, request).await
    }

    async fn demote_member(
        &self,
        request: Request<DemoteMemberRequest>,
    ) -> Result<Response<Empty>, Status> {
        membership::demote_member(self, request).await
    }

    async fn demote_self(
        &self,
        request: Request<DemoteSelfRequest>,
    ) -> Result<Response<Empty>, Status> {
        membership::demote_self(self, request).await
    }

    async fn transfer_ownership(
        &self,
        request: Request<TransferOwnershipRequest>,
    ) -> Result<Response<Empty>, Status> {
        membership::transfer_ownership(self, request).await
    }
}
