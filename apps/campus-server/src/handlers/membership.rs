//! Membership handlers: join/leave, request queue, roles, ownership.
//!
//! Each handler is one read-modify-write round-trip: load the group, apply
//! the engine operation, persist the whole record. There is no version
//! check between the read and the write (see `Store::save_group`).

use chrono::Utc;
use tonic::{Request, Response, Status};

use campus_membership as engine;
use campus_membership::JoinOutcome;
use campus_proto::Empty;
use campus_storage::{Group, GroupId, JoinRequest, Store, StoreError};

use crate::handlers::{membership_status, parse_group_id, parse_request_id, parse_student_id};
use crate::metrics;
use crate::server::{extract_signature, internal_error, CampusServer};

async fn load_group(server: &CampusServer, group_id: &GroupId) -> Result<Group, Status> {
    server.store.get_group(group_id).await.map_err(|e| match e {
        StoreError::NotFound => Status::not_found("Group not found"),
        e => internal_error("Failed to get group", e),
    })
}

async fn persist(server: &CampusServer, group: &Group) -> Result<(), Status> {
    server
        .store
        .save_group(group)
        .await
        .map_err(|e| internal_error("Failed to save group", e))
}

fn request_to_proto(request: &JoinRequest) -> campus_proto::JoinRequestRecord {
    campus_proto::JoinRequestRecord {
        id: request.id.to_string(),
        student_id: request.student_id.to_string(),
        status: request.status.as_str().to_string(),
        requested_at: request.requested_at.to_rfc3339(),
    }
}

pub async fn join_group(
    server: &CampusServer,
    request: Request<campus_proto::JoinGroupRequest>,
) -> Result<Response<campus_proto::JoinGroupResponse>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/JoinGroup",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let mut group = load_group(server, &group_id).await?;

    let outcome =
        engine::join_group(&mut group, caller.id, Utc::now()).map_err(membership_status)?;

    persist(server, &group).await?;

    match outcome {
        JoinOutcome::Joined => {
            metrics::record_membership_transition("join");
            Ok(Response::new(campus_proto::JoinGroupResponse {
                joined: true,
                request_id: None,
            }))
        }
        JoinOutcome::Requested(request_id) => {
            metrics::record_membership_transition("request");
            Ok(Response::new(campus_proto::JoinGroupResponse {
                joined: false,
                request_id: Some(request_id.to_string()),
            }))
        }
    }
}

pub async fn cancel_join_request(
    server: &CampusServer,
    request: Request<campus_proto::CancelJoinRequestRequest>,
) -> Result<Response<Empty>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/CancelJoinRequest",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let request_id = parse_request_id(&req.request_id)?;
    let mut group = load_group(server, &group_id).await?;

    engine::cancel_join_request(&mut group, caller.id, &request_id).map_err(membership_status)?;

    persist(server, &group).await?;
    metrics::record_membership_transition("cancel");

    Ok(Response::new(Empty {}))
}

pub async fn approve_join_request(
    server: &CampusServer,
    request: Request<campus_proto::ApproveJoinRequestRequest>,
) -> Result<Response<Empty>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/ApproveJoinRequest",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let request_id = parse_request_id(&req.request_id)?;
    let mut group = load_group(server, &group_id).await?;

    engine::approve_join_request(&mut group, caller.id, &request_id)
        .map_err(membership_status)?;

    persist(server, &group).await?;
    metrics::record_membership_transition("approve");

    Ok(Response::new(Empty {}))
}

pub async fn reject_join_request(
    server: &CampusServer,
    request: Request<campus_proto::RejectJoinRequestRequest>,
) -> Result<Response<Empty>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/RejectJoinRequest",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let request_id = parse_request_id(&req.request_id)?;
    let mut group = load_group(server, &group_id).await?;

    engine::reject_join_request(&mut group, caller.id, &request_id)
        .map_err(membership_status)?;

    persist(server, &group).await?;
    metrics::record_membership_transition("reject");

    Ok(Response::new(Empty {}))
}

pub async fn leave_group(
    server: &CampusServer,
    request: Request<campus_proto::LeaveGroupRequest>,
) -> Result<Response<Empty>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/LeaveGroup",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let mut group = load_group(server, &group_id).await?;

    engine::leave_group(&mut group, caller.id).map_err(membership_status)?;

    persist(server, &group).await?;
    metrics::record_membership_transition("leave");

    Ok(Response::new(Empty {}))
}

pub async fn list_group_members(
    server: &CampusServer,
    request: Request<campus_proto::ListGroupMembersRequest>,
) -> Result<Response<campus_proto::MemberList>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/ListGroupMembers",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let group = load_group(server, &group_id).await?;

    let mut members = Vec::with_capacity(group.members.len());
    for member_id in group.members.iter() {
        match server.store.get_student(member_id).await {
            Ok(student) => members.push(campus_proto::Member {
                id: student.id.to_string(),
                first_name: student.first_name,
                last_name: student.last_name,
                email: student.email,
            }),
            // A roster id without a student record (e.g. deleted account)
            // is skipped rather than failing the whole listing.
            Err(StoreError::NotFound) => continue,
            Err(e) => return Err(internal_error("Failed to resolve group member", e)),
        }
    }

    Ok(Response::new(campus_proto::MemberList { members }))
}

pub async fn list_pending_requests(
    server: &CampusServer,
    request: Request<campus_proto::ListPendingRequestsRequest>,
) -> Result<Response<campus_proto::JoinRequestList>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/ListPendingRequests",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let group = load_group(server, &group_id).await?;

    let pending = engine::pending_requests(&group, &caller.id).map_err(membership_status)?;

    Ok(Response::new(campus_proto::JoinRequestList {
        requests: pending.into_iter().map(request_to_proto).collect(),
    }))
}

pub async fn remove_group_member(
    server: &CampusServer,
    request: Request<campus_proto::RemoveGroupMemberRequest>,
) -> Result<Response<Empty>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/RemoveGroupMember",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let member_id = parse_student_id(&req.member_id)?;
    let mut group = load_group(server, &group_id).await?;

    engine::remove_member(&mut group, caller.id, &member_id).map_err(|e| match e {
        engine::MembershipError::NotFound => {
            Status::not_found("Member not found in this group")
        }
        e => membership_status(e),
    })?;

    persist(server, &group).await?;
    metrics::record_membership_transition("remove");

    Ok(Response::new(Empty {}))
}

pub async fn promote_member(
    server: &CampusServer,
    request: Request<campus_proto::PromoteMemberRequest>,
) -> Result<Response<Empty>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/PromoteMember",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let member_id = parse_student_id(&req.member_id)?;
    let mut group = load_group(server, &group_id).await?;

    engine::promote_member(&mut group, caller.id, member_id).map_err(membership_status)?;

    persist(server, &group).await?;
    metrics::record_membership_transition("promote");

    Ok(Response::new(Empty {}))
}

pub async fn demote_member(
    server: &CampusServer,
    request: Request<campus_proto::DemoteMemberRequest>,
) -> Result<Response<Empty>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/DemoteMember",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let member_id = parse_student_id(&req.member_id)?;
    let mut group = load_group(server, &group_id).await?;

    engine::demote_member(&mut group, caller.id, &member_id).map_err(membership_status)?;

    persist(server, &group).await?;
    metrics::record_membership_transition("demote");

    Ok(Response::new(Empty {}))
}

pub async fn demote_self(
    server: &CampusServer,
    request: Request<campus_proto::DemoteSelfRequest>,
) -> Result<Response<Empty>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/DemoteSelf",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let mut group = load_group(server, &group_id).await?;

    engine::demote_self(&mut group, caller.id).map_err(membership_status)?;

    persist(server, &group).await?;
    metrics::record_membership_transition("demote_self");

    Ok(Response::new(Empty {}))
}

pub async fn transfer_ownership(
    server: &CampusServer,
    request: Request<campus_proto::TransferOwnershipRequest>,
) -> Result<Response<Empty>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/TransferOwnership",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;
    let new_owner = parse_student_id(&req.new_owner_id)?;
    let mut group = load_group(server, &group_id).await?;

    engine::transfer_ownership(&mut group, caller.id, new_owner).map_err(membership_status)?;

    persist(server, &group).await?;
    metrics::record_membership_transition("transfer_ownership");

    Ok(Response::new(Empty {}))
}
