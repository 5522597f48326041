use std::sync::Arc;

use chrono::Utc;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use prost::Message;
use sha2::{Digest, Sha256};
use tonic::Status;

use campus_storage::{Store, StoreError, Student, StudentId};

/// Shared state handed to every handler: just the storage handle. No
/// process-wide singletons; collaborators travel explicitly.
#[derive(Clone)]
pub struct CampusServer {
    pub store: Arc<dyn Store>,
}

impl CampusServer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Authenticate a signed request and resolve the caller.
    ///
    /// The client signs `method || sha256(method || body) || timestamp_le`
    /// with the Ed25519 key registered for the student. Timestamps older
    /// than 60s (or more than 30s in the future) are rejected to bound
    /// replays.
    pub async fn verify_signature_and_get_student<T: Message>(
        &self,
        student_id: &StudentId,
        timestamp: i64,
        signature: &[u8],
        method: &str,
        request: &T,
        provided_hash: &[u8],
    ) -> Result<Student, Status> {
        let now = Utc::now().timestamp();
        let age = now - timestamp;

        if age > 60 {
            return Err(Status::unauthenticated(
                "Request timestamp too old (>60s), possible replay attack",
            ));
        }
        if age < -30 {
            return Err(Status::unauthenticated(
                "Request timestamp too far in future (>30s), check clock sync",
            ));
        }

        // Compute expected hash and verify it matches the provided one
        let body_bytes = request.encode_to_vec();
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(&body_bytes);
        let expected_hash = hasher.finalize();

        if &expected_hash[..] != provided_hash {
            return Err(Status::unauthenticated(
                "Request hash mismatch - body may have been tampered",
            ));
        }

        let student = self
            .store
            .get_student(student_id)
            .await
            .map_err(|_| Status::unauthenticated("Unknown student"))?;

        let verifying_key = VerifyingKey::from_bytes(
            student
                .public_key
                .as_slice()
                .try_into()
                .map_err(|_| Status::unauthenticated("Invalid public key length"))?,
        )
        .map_err(|_| Status::unauthenticated("Invalid public key"))?;

        let sig = Signature::from_bytes(
            signature
                .try_into()
                .map_err(|_| Status::unauthenticated("Invalid signature length"))?,
        );

        // Build the expected signed message: method + hash + timestamp
        let mut message = Vec::new();
        message.extend_from_slice(method.as_bytes());
        message.extend_from_slice(provided_hash);
        message.extend_from_slice(&timestamp.to_le_bytes());

        verifying_key
            .verify(&message, &sig)
            .map_err(|_| Status::unauthenticated("Invalid signature"))?;

        Ok(student)
    }
}

/// Pull the signed-request metadata off an incoming call.
pub fn extract_signature<T>(
    request: &tonic::Request<T>,
) -> Result<(StudentId, i64, Vec<u8>, Vec<u8>), Status> {
    let metadata = request.metadata();

    let student_id_str = metadata
        .get("student-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Status::unauthenticated("Missing student-id metadata"))?;

    let student_id = uuid::Uuid::parse_str(student_id_str)
        .map(StudentId)
        .map_err(|_| Status::unauthenticated("Invalid student-id format"))?;

    let timestamp_str = metadata
        .get("timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Status::unauthenticated("Missing timestamp metadata"))?;

    let timestamp = timestamp_str
        .parse::<i64>()
        .map_err(|_| Status::unauthenticated("Invalid timestamp format"))?;

    let signature_str = metadata
        .get("signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Status::unauthenticated("Missing signature metadata"))?;

    let signature = hex::decode(signature_str)
        .map_err(|_| Status::unauthenticated("Invalid signature format"))?;

    let request_hash_str = metadata
        .get("request-hash")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Status::unauthenticated("Missing request-hash metadata"))?;

    let request_hash = hex::decode(request_hash_str)
        .map_err(|_| Status::unauthenticated("Invalid request-hash format"))?;

    Ok((student_id, timestamp, signature, request_hash))
}

/// Log a storage failure and surface a generic server error. The backend
/// detail stays in the logs, never in the response.
pub fn internal_error(context: &'static str, err: StoreError) -> Status {
    tracing::error!(error = %err, "{}", context);
    Status::internal(context)
}
