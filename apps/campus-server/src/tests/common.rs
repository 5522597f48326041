//! Shared test helpers for server tests using a real SQLite in-memory
//! database.

use std::sync::Arc;

use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey};
use prost::Message;
use sha2::{Digest, Sha256};
use tonic::metadata::MetadataValue;
use tonic::Request;
use uuid::Uuid;

use campus_storage::{
    CreateGroupParams, CreateStudentParams, Group, GroupId, GroupSettings, GroupType, Privacy,
    RequestId, Store, StudentId,
};
use campus_store_sqlite::SqliteStore;

use crate::server::CampusServer;

/// Test helper: Create a CampusServer with in-memory SQLite
pub async fn create_test_server() -> CampusServer {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    CampusServer::new(store)
}

/// Test helper: Generate a random Ed25519 keypair and return (public_key, signing_key)
pub fn generate_keypair() -> (Vec<u8>, SigningKey) {
    let signing_key = SigningKey::generate(&mut rand_core::OsRng);
    let public_key = signing_key.verifying_key().to_bytes().to_vec();
    (public_key, signing_key)
}

/// Test helper: Register a student directly in the store
pub async fn create_test_student(server: &CampusServer, email: &str) -> (StudentId, SigningKey) {
    let (public_key, signing_key) = generate_keypair();
    let student_id = server
        .store
        .create_student(&CreateStudentParams {
            email: email.to_string(),
            first_name: "Asha".to_string(),
            last_name: "Naidu".to_string(),
            department: "Computer Science".to_string(),
            public_key,
        })
        .await
        .unwrap();
    (student_id, signing_key)
}

/// Test helper: Create a group the way the create handler does (creator is
/// sole admin and owner, not a member)
pub async fn create_test_group(
    server: &CampusServer,
    creator: StudentId,
    name: &str,
    group_type: GroupType,
) -> GroupId {
    let group = Group::create(
        GroupId(Uuid::now_v7()),
        CreateGroupParams {
            name: name.to_string(),
            description: None,
            group_type,
            privacy: Privacy::Public,
            settings: GroupSettings::default(),
        },
        creator,
        hex::encode(&Uuid::new_v4().as_bytes()[..4]),
        Utc::now(),
    );
    server.store.create_group(&group).await.unwrap();
    group.id
}

/// Test helper: Put a student on the members roster directly
pub async fn add_member_directly(server: &CampusServer, group_id: &GroupId, member: StudentId) {
    let mut group = server.store.get_group(group_id).await.unwrap();
    group.members.insert(member);
    server.store.save_group(&group).await.unwrap();
}

/// Test helper: Build a signed request the way a real client would
pub fn create_signed_request<T: Message + Default>(
    student_id: &StudentId,
    signing_key: &SigningKey,
    method: &str,
    request_body: T,
) -> Request<T> {
    create_signed_request_at(student_id, signing_key, method, request_body, Utc::now().timestamp())
}

/// Same as [`create_signed_request`] but with a caller-chosen timestamp,
/// for freshness-window tests.
pub fn create_signed_request_at<T: Message + Default>(
    student_id: &StudentId,
    signing_key: &SigningKey,
    method: &str,
    request_body: T,
    timestamp: i64,
) -> Request<T> {
    let body_bytes = request_body.encode_to_vec();
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(&body_bytes);
    let request_hash = hasher.finalize().to_vec();

    // Build message: method + hash + timestamp
    let mut message = Vec::new();
    message.extend_from_slice(method.as_bytes());
    message.extend_from_slice(&request_hash);
    message.extend_from_slice(&timestamp.to_le_bytes());

    let signature = signing_key.sign(&message);

    let mut request = Request::new(request_body);
    request.metadata_mut().insert(
        "student-id",
        MetadataValue::try_from(student_id.to_string()).unwrap(),
    );
    request.metadata_mut().insert(
        "timestamp",
        MetadataValue::try_from(timestamp.to_string()).unwrap(),
    );
    request.metadata_mut().insert(
        "signature",
        MetadataValue::try_from(hex::encode(signature.to_bytes())).unwrap(),
    );
    request.metadata_mut().insert(
        "request-hash",
        MetadataValue::try_from(hex::encode(&request_hash)).unwrap(),
    );
    request
}

pub fn rid(raw: &str) -> RequestId {
    RequestId(Uuid::parse_str(raw).unwrap())
}
