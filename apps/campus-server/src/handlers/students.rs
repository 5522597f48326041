//! Student profile handlers: get, update.

use tonic::{Request, Response, Status};

use campus_storage::{SocialLink, Store, StoreError, Student, UpdateStudentParams};

use crate::handlers::parse_student_id;
use crate::server::{extract_signature, internal_error, CampusServer};

pub(crate) fn student_to_proto(student: &Student) -> campus_proto::Student {
    campus_proto::Student {
        id: student.id.to_string(),
        first_name: student.first_name.clone(),
        last_name: student.last_name.clone(),
        email: student.email.clone(),
        department: student.department.clone(),
        profile_picture: student.profile_picture.clone().unwrap_or_default(),
        bio: student.bio.clone().unwrap_or_default(),
        interests: student.interests.clone(),
        social_links: student
            .social_links
            .iter()
            .map(|link| campus_proto::SocialLink {
                platform: link.platform.clone(),
                url: link.url.clone(),
            })
            .collect(),
        created_at: student.created_at.to_rfc3339(),
        updated_at: student.updated_at.to_rfc3339(),
    }
}

pub async fn get_student(
    server: &CampusServer,
    request: Request<campus_proto::GetStudentRequest>,
) -> Result<Response<campus_proto::Student>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/GetStudent",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();
    let target = parse_student_id(&req.student_id)?;

    let student = server.store.get_student(&target).await.map_err(|e| match e {
        StoreError::NotFound => Status::not_found("Student not found"),
        e => internal_error("Failed to get student", e),
    })?;

    Ok(Response::new(student_to_proto(&student)))
}

/// Update the caller's own profile. Absent fields keep their values; email
/// and the registered key cannot be changed here.
pub async fn update_student(
    server: &CampusServer,
    request: Request<campus_proto::UpdateStudentRequest>,
) -> Result<Response<campus_proto::Student>, Status> {
    let (student_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_student(
            &student_id,
            timestamp,
            &signature,
            "/campus.CampusService/UpdateStudent",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let req = request.into_inner();

    let params = UpdateStudentParams {
        first_name: req.first_name,
        last_name: req.last_name,
        profile_picture: req.profile_picture,
        department: req.department,
        bio: req.bio,
        interests: if req.interests.is_empty() {
            None
        } else {
            Some(req.interests)
        },
        social_links: if req.social_links.is_empty() {
            None
        } else {
            Some(
                req.social_links
                    .into_iter()
                    .map(|link| SocialLink {
                        platform: link.platform,
                        url: link.url,
                    })
                    .collect(),
            )
        },
    };

    let updated = server
        .store
        .update_student(&caller.id, &params)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => Status::not_found("Student not found"),
            e => internal_error("Failed to update student", e),
        })?;

    Ok(Response::new(student_to_proto(&updated)))
}
