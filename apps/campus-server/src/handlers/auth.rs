//! Registration handler.
//!
//! There is no password or session flow: a student registers an Ed25519
//! verifying key and every subsequent call is authenticated by signature
//! (see `server::verify_signature_and_get_student`).

use tonic::{Request, Response, Status};

use campus_proto::{RegisterRequest, RegisterResponse};
use campus_storage::{CreateStudentParams, Store, StoreError};

use crate::server::{internal_error, CampusServer};

pub async fn register(
    server: &CampusServer,
    request: Request<RegisterRequest>,
) -> Result<Response<RegisterResponse>, Status> {
    let req = request.into_inner();

    // Normalize email to lowercase for consistent comparison
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Status::invalid_argument("A valid email is required"));
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(Status::invalid_argument("First and last name are required"));
    }
    if req.department.trim().is_empty() {
        return Err(Status::invalid_argument("Department is required"));
    }
    if req.public_key.len() != 32 {
        return Err(Status::invalid_argument(
            "public_key must be a 32-byte Ed25519 verifying key",
        ));
    }

    let student_id = server
        .store
        .create_student(&CreateStudentParams {
            email,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            department: req.department.trim().to_string(),
            public_key: req.public_key,
        })
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => {
                Status::already_exists("A student with this email already exists")
            }
            e => internal_error("Failed to register student", e),
        })?;

    Ok(Response::new(RegisterResponse {
        student_id: student_id.to_string(),
    }))
}
