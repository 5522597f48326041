//! Group CRUD handler tests.

use tonic::Code;

use campus_proto::campus_service_server::CampusService;
use campus_storage::{GroupType, Store};

use super::common::*;

#[tokio::test]
async fn handler_group_create_and_list() {
    let server = create_test_server().await;
    let (creator_id, signing_key) = create_test_student(&server, "creator@example.edu").await;

    let request = create_signed_request(
        &creator_id,
        &signing_key,
        "/campus.CampusService/CreateGroup",
        campus_proto::CreateGroupRequest {
            name: "robotics society".to_string(),
            description: "build and race robots".to_string(),
            group_type: "private".to_string(),
            privacy: "public".to_string(),
            settings: None,
        },
    );

    let group = server.create_group(request).await.unwrap().into_inner();
    assert_eq!(group.name, "robotics society");
    assert_eq!(group.group_type, "private");
    assert_eq!(group.owner, creator_id.to_string());
    assert_eq!(group.admins, vec![creator_id.to_string()]);
    assert!(group.members.is_empty());
    assert_eq!(group.invite_code.len(), 8);
    assert!(group.settings.unwrap().allow_chat);

    let list_request = create_signed_request(
        &creator_id,
        &signing_key,
        "/campus.CampusService/ListGroups",
        campus_proto::Empty {},
    );
    let list = server.list_groups(list_request).await.unwrap().into_inner();
    assert_eq!(list.groups.len(), 1);
    assert_eq!(list.groups[0].name, "robotics society");
}

#[tokio::test]
async fn create_group_rejects_unknown_group_type() {
    let server = create_test_server().await;
    let (creator_id, signing_key) = create_test_student(&server, "creator@example.edu").await;

    let request = create_signed_request(
        &creator_id,
        &signing_key,
        "/campus.CampusService/CreateGroup",
        campus_proto::CreateGroupRequest {
            name: "chess club".to_string(),
            description: String::new(),
            group_type: "invite-only".to_string(),
            privacy: String::new(),
            settings: None,
        },
    );

    let err = server.create_group(request).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn update_group_is_admin_only_and_partial() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_student(&server, "admin@example.edu").await;
    let (other_id, other_key) = create_test_student(&server, "other@example.edu").await;
    let group_id = create_test_group(&server, admin_id, "chess club", GroupType::Public).await;

    // Non-admin may not update
    let request = create_signed_request(
        &other_id,
        &other_key,
        "/campus.CampusService/UpdateGroup",
        campus_proto::UpdateGroupRequest {
            group_id: group_id.to_string(),
            name: Some("hostile takeover".to_string()),
            ..Default::default()
        },
    );
    let err = server.update_group(request).await.unwrap_err();
    assert_eq!(err.code(), Code::PermissionDenied);

    // Admin updates only the provided fields
    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/campus.CampusService/UpdateGroup",
        campus_proto::UpdateGroupRequest {
            group_id: group_id.to_string(),
            description: Some("blitz on fridays".to_string()),
            group_type: Some("private".to_string()),
            settings: Some(campus_proto::GroupSettings {
                allow_file_sharing: false,
                allow_chat: true,
            }),
            ..Default::default()
        },
    );
    let updated = server.update_group(request).await.unwrap().into_inner();
    assert_eq!(updated.name, "chess club");
    assert_eq!(updated.description, "blitz on fridays");
    assert_eq!(updated.group_type, "private");
    assert!(!updated.settings.unwrap().allow_file_sharing);
}

#[tokio::test]
async fn delete_group_is_admin_only_and_hard() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_student(&server, "admin@example.edu").await;
    let (other_id, other_key) = create_test_student(&server, "other@example.edu").await;
    let group_id = create_test_group(&server, admin_id, "film circle", GroupType::Public).await;

    let request = create_signed_request(
        &other_id,
        &other_key,
        "/campus.CampusService/DeleteGroup",
        campus_proto::DeleteGroupRequest {
            group_id: group_id.to_string(),
        },
    );
    let err = server.delete_group(request).await.unwrap_err();
    assert_eq!(err.code(), Code::PermissionDenied);

    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/campus.CampusService/DeleteGroup",
        campus_proto::DeleteGroupRequest {
            group_id: group_id.to_string(),
        },
    );
    server.delete_group(request).await.unwrap();

    // Gone for real
    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/campus.CampusService/GetGroup",
        campus_proto::GetGroupRequest {
            group_id: group_id.to_string(),
        },
    );
    let err = server.get_group(request).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn regenerate_invite_code_replaces_the_token() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_student(&server, "admin@example.edu").await;
    let (other_id, other_key) = create_test_student(&server, "other@example.edu").await;
    let group_id = create_test_group(&server, admin_id, "debate team", GroupType::Private).await;

    let before = server.store.get_group(&group_id).await.unwrap().invite_code;

    let request = create_signed_request(
        &other_id,
        &other_key,
        "/campus.CampusService/RegenerateInviteCode",
        campus_proto::RegenerateInviteCodeRequest {
            group_id: group_id.to_string(),
        },
    );
    let err = server.regenerate_invite_code(request).await.unwrap_err();
    assert_eq!(err.code(), Code::PermissionDenied);

    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/campus.CampusService/RegenerateInviteCode",
        campus_proto::RegenerateInviteCodeRequest {
            group_id: group_id.to_string(),
        },
    );
    let response = server
        .regenerate_invite_code(request)
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.invite_code.len(), 8);
    assert_ne!(response.invite_code, before);

    let stored = server.store.get_group(&group_id).await.unwrap();
    assert_eq!(stored.invite_code, response.invite_code);
}

#[tokio::test]
async fn get_group_not_found() {
    let server = create_test_server().await;
    let (student_id, signing_key) = create_test_student(&server, "someone@example.edu").await;

    let request = create_signed_request(
        &student_id,
        &signing_key,
        "/campus.CampusService/GetGroup",
        campus_proto::GetGroupRequest {
            group_id: uuid::Uuid::now_v7().to_string(),
        },
    );
    let err = server.get_group(request).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}
