//! Group handlers: create, get, list, update, delete, invite code.

use chrono::Utc;
use tonic::{Request, Response, Status};
use uuid::Uuid;

use campus_membership::require_admin;
use campus_proto::Empty;
use campus_storage::{
    CreateGroupParams, Group, GroupId, GroupSettings, GroupType, Privacy, Store, StoreError,
};

use crate::handlers::{membership_status, parse_group_id};
use crate::metrics;
use crate::server::{extract_signature, internal_error, CampusServer};

/// 8-character invite code from 4 random bytes.
fn generate_invite_code() -> String {
    let mut bytes = [0u8; 4];
    rand_core::RngCore::fill_bytes(&mut rand_core::OsRng, &mut bytes);
    hex::encode(bytes)
}

fn settings_from_proto(settings: campus_proto::GroupSettings) -> GroupSettings {
    GroupSettings {
        allow_file_sharing: settings.allow_file_sharing,
        allow_chat: settings.allow_chat,
    }
}

fn settings_to_proto(settings: GroupSettings) -> campus_proto::GroupSettings {
    campus_proto::GroupSettings {
        allow_file_sharing: settings.allow_file_sharing,
        allow_chat: settings.allow_chat,
    }
}

pub(crate) fn group_to_proto(group: &Group) -> campus_proto::Group {
    campus_proto::Group {
        id: group.id.to_string(),
        name: group.name.clone(),
        description: group.description.clone().unwrap_or_default(),
        group_type: group.group_type.as_str().to_string(),
        privacy: group.privacy.as_str().to_string(),
        owner: group.owner.to_string(),
        admins: group.admins.iter().map(|id| id.to_string()).collect(),
        members: group.members.iter().map(|id| id.to_string()).collect(),
        invite_code: group.invite_code.clone(),
        settings: Some(settings_to_proto(group.settings)),
        created_at: group.created_at.to_rfc3339(),
    }
}

fn parse_group_type(raw: &str) -> Result<GroupType, Status> {
    if raw.is_empty() {
        return Ok(GroupType::Public);
    }
    raw.parse::<GroupType>()
        .map_err(|_| Status::invalid_argument("group_type must be \"public\" or \"private\""))
}

fn parse_privacy(raw: &str) -> Result<Privacy, Status> {
    if raw.is_empty() {
        return Ok(Privacy::Public);
    }
    raw.parse::<Privacy>()
        .map_err(|_| Status::invalid_argument("privacy must be \"public\" or \"private\""))
}

pub async fn create_group(
    server: &CampusServer,
    request: Request<campus_proto::CreateGroupRequest>,
) -> Result<Response<campus_proto::Group>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let creator = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/CreateGroup",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();

    if req.name.trim().is_empty() {
        return Err(Status::invalid_argument("Group name is required"));
    }
    let group_type = parse_group_type(&req.group_type)?;
    let privacy = parse_privacy(&req.privacy)?;

    let group = Group::create(
        GroupId(Uuid::now_v7()),
        CreateGroupParams {
            name: req.name.trim().to_string(),
            description: if req.description.is_empty() {
                None
            } else {
                Some(req.description)
            },
            group_type,
            privacy,
            settings: req.settings.map(settings_from_proto).unwrap_or_default(),
        },
        creator.id,
        generate_invite_code(),
        Utc::now(),
    );

    server.store.create_group(&group).await.map_err(|e| match e {
        StoreError::AlreadyExists => Status::already_exists("Group already exists"),
        e => internal_error("Failed to create group", e),
    })?;
    metrics::record_group_created();

    Ok(Response::new(group_to_proto(&group)))
}

pub async fn get_group(
    server: &CampusServer,
    request: Request<campus_proto::GetGroupRequest>,
) -> Result<Response<campus_proto::Group>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/GetGroup",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;

    let group = server.store.get_group(&group_id).await.map_err(|e| match e {
        StoreError::NotFound => Status::not_found("Group not found"),
        e => internal_error("Failed to get group", e),
    })?;

    Ok(Response::new(group_to_proto(&group)))
}

pub async fn list_groups(
    server: &CampusServer,
    request: Request<Empty>,
) -> Result<Response<campus_proto::GroupList>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/ListGroups",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let groups = server
        .store
        .list_groups()
        .await
        .map_err(|e| internal_error("Failed to list groups", e))?;

    Ok(Response::new(campus_proto::GroupList {
        groups: groups.iter().map(group_to_proto).collect(),
    }))
}

pub async fn update_group(
    server: &CampusServer,
    request: Request<campus_proto::UpdateGroupRequest>,
) -> Result<Response<campus_proto::Group>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/UpdateGroup",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;

    let mut group = server.store.get_group(&group_id).await.map_err(|e| match e {
        StoreError::NotFound => Status::not_found("Group not found"),
        e => internal_error("Failed to get group", e),
    })?;

    require_admin(&group, &caller.id).map_err(membership_status)?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(Status::invalid_argument("Group name cannot be empty"));
        }
        group.name = name.trim().to_string();
    }
    if let Some(description) = req.description {
        group.description = if description.is_empty() {
            None
        } else {
            Some(description)
        };
    }
    if let Some(group_type) = req.group_type {
        group.group_type = group_type
            .parse::<GroupType>()
            .map_err(|_| Status::invalid_argument("group_type must be \"public\" or \"private\""))?;
    }
    if let Some(privacy) = req.privacy {
        group.privacy = privacy
            .parse::<Privacy>()
            .map_err(|_| Status::invalid_argument("privacy must be \"public\" or \"private\""))?;
    }
    if let Some(settings) = req.settings {
        group.settings = settings_from_proto(settings);
    }

    server
        .store
        .save_group(&group)
        .await
        .map_err(|e| internal_error("Failed to save group", e))?;

    Ok(Response::new(group_to_proto(&group)))
}

pub async fn delete_group(
    server: &CampusServer,
    request: Request<campus_proto::DeleteGroupRequest>,
) -> Result<Response<Empty>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/DeleteGroup",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;

    let group = server.store.get_group(&group_id).await.map_err(|e| match e {
        StoreError::NotFound => Status::not_found("Group not found"),
        e => internal_error("Failed to get group", e),
    })?;

    require_admin(&group, &caller.id).map_err(membership_status)?;

    // Hard removal; there is no tombstone to resurrect from.
    server
        .store
        .delete_group(&group_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => Status::not_found("Group not found"),
            e => internal_error("Failed to delete group", e),
        })?;

    Ok(Response::new(Empty {}))
}

pub async fn regenerate_invite_code(
    server: &CampusServer,
    request: Request<campus_proto::RegenerateInviteCodeRequest>,
) -> Result<Response<campus_proto::InviteCode>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/RegenerateInviteCode",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let group_id = parse_group_id(&req.group_id)?;

    let mut group = server.store.get_group(&group_id).await.map_err(|e| match e {
        StoreError::NotFound => Status::not_found("Group not found"),
        e => internal_error("Failed to get group", e),
    })?;

    require_admin(&group, &caller.id).map_err(membership_status)?;

    group.invite_code = generate_invite_code();
    server
        .store
        .save_group(&group)
        .await
        .map_err(|e| internal_error("Failed to save group", e))?;

    Ok(Response::new(campus_proto::InviteCode {
        invite_code: group.invite_code,
    }))
}
