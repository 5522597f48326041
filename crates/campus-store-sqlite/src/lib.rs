//! SQLite backend for campus storage.
//!
//! Group rows carry their rosters, request queue and settings as JSON
//! columns; [`Store::save_group`] overwrites the whole row without any
//! version check, so concurrent writers race last-write-wins (see the
//! trait documentation).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

use campus_storage::{
    CreateStudentParams, Group, GroupId, GroupSettings, GroupType, JoinRequest, Privacy, Roster,
    Store, StoreError, Student, StudentId, UpdateStudentParams,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// `~/.campus/store.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".campus");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("store.db");
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

fn backend_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn unique_or_backend(e: sqlx::Error) -> StoreError {
    let s = e.to_string();
    if s.contains("UNIQUE") {
        StoreError::AlreadyExists
    } else {
        StoreError::Backend(s)
    }
}

fn json_encode<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(backend_err)
}

fn json_decode<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(backend_err)
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(raw).map_err(backend_err)
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Backend(format!("timestamp out of range: {}", secs)))
}

type StudentRow = (
    String,         // id
    String,         // email
    String,         // first_name
    String,         // last_name
    String,         // department
    Option<String>, // profile_picture
    Option<String>, // bio
    String,         // interests (JSON)
    String,         // social_links (JSON)
    Vec<u8>,        // public_key
    i64,            // created_at
    i64,            // updated_at
);

const STUDENT_COLUMNS: &str = "id,email,first_name,last_name,department,profile_picture,bio,\
     interests,social_links,public_key,created_at,updated_at";

fn student_from_row(row: StudentRow) -> Result<Student, StoreError> {
    let (id, email, first_name, last_name, department, profile_picture, bio, interests, links, public_key, created, updated) =
        row;
    Ok(Student {
        id: StudentId(parse_uuid(&id)?),
        email,
        first_name,
        last_name,
        department,
        profile_picture,
        bio,
        interests: json_decode(&interests)?,
        social_links: json_decode(&links)?,
        public_key,
        created_at: timestamp(created)?,
        updated_at: timestamp(updated)?,
    })
}

type GroupRow = (
    String,         // id
    String,         // name
    Option<String>, // description
    String,         // group_type
    String,         // privacy
    String,         // owner
    String,         // admins (JSON)
    String,         // members (JSON)
    String,         // requests (JSON)
    String,         // invite_code
    String,         // settings (JSON)
    i64,            // created_at
);

const GROUP_COLUMNS: &str =
    "id,name,description,group_type,privacy,owner,admins,members,requests,invite_code,settings,created_at";

fn group_from_row(row: GroupRow) -> Result<Group, StoreError> {
    let (id, name, description, group_type, privacy, owner, admins, members, requests, invite_code, settings, created) =
        row;
    Ok(Group {
        id: GroupId(parse_uuid(&id)?),
        name,
        description,
        group_type: group_type.parse::<GroupType>().map_err(backend_err)?,
        privacy: privacy.parse::<Privacy>().map_err(backend_err)?,
        owner: StudentId(parse_uuid(&owner)?),
        admins: json_decode::<Roster>(&admins)?,
        members: json_decode::<Roster>(&members)?,
        requests: json_decode::<Vec<JoinRequest>>(&requests)?,
        invite_code,
        settings: json_decode::<GroupSettings>(&settings)?,
        created_at: timestamp(created)?,
    })
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────── Students ─────────────────────────────

    async fn create_student(&self, p: &CreateStudentParams) -> Result<StudentId, StoreError> {
        let id = Uuid::now_v7();
        let now = Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO students(id,email,first_name,last_name,department,interests,social_links,public_key,created_at,updated_at)
             VALUES(?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(&p.email)
        .bind(&p.first_name)
        .bind(&p.last_name)
        .bind(&p.department)
        .bind("[]")
        .bind("[]")
        .bind(&p.public_key)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?;
        Ok(StudentId(id))
    }

    async fn get_student(&self, id: &StudentId) -> Result<Student, StoreError> {
        let sql = format!("SELECT {} FROM students WHERE id=?", STUDENT_COLUMNS);
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => student_from_row(row),
        }
    }

    async fn get_student_by_email(&self, email: &str) -> Result<Student, StoreError> {
        let sql = format!("SELECT {} FROM students WHERE email=?", STUDENT_COLUMNS);
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => student_from_row(row),
        }
    }

    async fn update_student(
        &self,
        id: &StudentId,
        p: &UpdateStudentParams,
    ) -> Result<Student, StoreError> {
        let mut student = self.get_student(id).await?;

        if let Some(v) = &p.first_name {
            student.first_name = v.clone();
        }
        if let Some(v) = &p.last_name {
            student.last_name = v.clone();
        }
        if let Some(v) = &p.profile_picture {
            student.profile_picture = Some(v.clone());
        }
        if let Some(v) = &p.department {
            student.department = v.clone();
        }
        if let Some(v) = &p.bio {
            student.bio = Some(v.clone());
        }
        if let Some(v) = &p.interests {
            student.interests = v.clone();
        }
        if let Some(v) = &p.social_links {
            student.social_links = v.clone();
        }
        student.updated_at = Utc::now();

        sqlx::query(
            "UPDATE students SET first_name=?,last_name=?,department=?,profile_picture=?,bio=?,
             interests=?,social_links=?,updated_at=? WHERE id=?",
        )
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.department)
        .bind(&student.profile_picture)
        .bind(&student.bio)
        .bind(json_encode(&student.interests)?)
        .bind(json_encode(&student.social_links)?)
        .bind(student.updated_at.timestamp())
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(student)
    }

    // ───────────────────────────── Groups ───────────────────────────────

    async fn create_group(&self, group: &Group) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO groups({}) VALUES(?,?,?,?,?,?,?,?,?,?,?,?)",
            GROUP_COLUMNS
        );
        sqlx::query(&sql)
            .bind(group.id.0.to_string())
            .bind(&group.name)
            .bind(&group.description)
            .bind(group.group_type.as_str())
            .bind(group.privacy.as_str())
            .bind(group.owner.0.to_string())
            .bind(json_encode(&group.admins)?)
            .bind(json_encode(&group.members)?)
            .bind(json_encode(&group.requests)?)
            .bind(&group.invite_code)
            .bind(json_encode(&group.settings)?)
            .bind(group.created_at.timestamp())
            .execute(&self.pool)
            .await
            .map_err(unique_or_backend)?;
        Ok(())
    }

    async fn get_group(&self, id: &GroupId) -> Result<Group, StoreError> {
        let sql = format!("SELECT {} FROM groups WHERE id=?", GROUP_COLUMNS);
        let row = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => group_from_row(row),
        }
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let sql = format!("SELECT {} FROM groups ORDER BY created_at", GROUP_COLUMNS);
        let rows = sqlx::query_as::<_, GroupRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;

        rows.into_iter().map(group_from_row).collect()
    }

    async fn save_group(&self, group: &Group) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE groups SET name=?,description=?,group_type=?,privacy=?,owner=?,admins=?,
             members=?,requests=?,invite_code=?,settings=? WHERE id=?",
        )
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.group_type.as_str())
        .bind(group.privacy.as_str())
        .bind(group.owner.0.to_string())
        .bind(json_encode(&group.admins)?)
        .bind(json_encode(&group.members)?)
        .bind(json_encode(&group.requests)?)
        .bind(&group.invite_code)
        .bind(json_encode(&group.settings)?)
        .bind(group.id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_group(&self, id: &GroupId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM groups WHERE id=?")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_storage::{CreateGroupParams, SocialLink};

    fn student_params(email: &str) -> CreateStudentParams {
        CreateStudentParams {
            email: email.to_string(),
            first_name: "Maya".to_string(),
            last_name: "Okafor".to_string(),
            department: "Computer Science".to_string(),
            public_key: vec![7u8; 32],
        }
    }

    fn sample_group(owner: StudentId, group_type: GroupType, invite_code: &str) -> Group {
        Group::create(
            GroupId(Uuid::now_v7()),
            CreateGroupParams {
                name: "compilers reading group".to_string(),
                description: Some("weekly paper discussions".to_string()),
                group_type,
                privacy: Privacy::Private,
                settings: GroupSettings::default(),
            },
            owner,
            invite_code.to_string(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn student_round_trip_and_unique_email() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        let id = store.create_student(&student_params("maya@example.edu")).await.unwrap();
        let student = store.get_student(&id).await.unwrap();
        assert_eq!(student.email, "maya@example.edu");
        assert_eq!(student.public_key, vec![7u8; 32]);
        assert!(student.interests.is_empty());

        let by_email = store.get_student_by_email("maya@example.edu").await.unwrap();
        assert_eq!(by_email.id, id);

        let err = store
            .create_student(&student_params("maya@example.edu"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn update_student_touches_only_provided_fields() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let id = store.create_student(&student_params("maya@example.edu")).await.unwrap();

        let updated = store
            .update_student(
                &id,
                &UpdateStudentParams {
                    bio: Some("systems + distributed computing".to_string()),
                    interests: Some(vec!["rust".to_string(), "databases".to_string()]),
                    social_links: Some(vec![SocialLink {
                        platform: "GitHub".to_string(),
                        url: "https://github.com/mayaokafor".to_string(),
                    }]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.first_name, "Maya");
        assert_eq!(updated.bio.as_deref(), Some("systems + distributed computing"));
        assert_eq!(updated.interests.len(), 2);

        let reread = store.get_student(&id).await.unwrap();
        assert_eq!(reread.social_links[0].platform, "GitHub");
    }

    #[tokio::test]
    async fn group_aggregate_round_trip() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let owner = store.create_student(&student_params("owner@example.edu")).await.unwrap();

        let mut group = sample_group(owner, GroupType::Private, "a1b2c3d4");
        group.requests.push(JoinRequest {
            id: campus_storage::RequestId(Uuid::now_v7()),
            student_id: StudentId(Uuid::now_v7()),
            status: campus_storage::RequestStatus::Pending,
            requested_at: Utc::now(),
        });
        store.create_group(&group).await.unwrap();

        let loaded = store.get_group(&group.id).await.unwrap();
        assert_eq!(loaded.name, group.name);
        assert_eq!(loaded.group_type, GroupType::Private);
        assert_eq!(loaded.owner, owner);
        assert_eq!(loaded.admins.first(), Some(&owner));
        assert_eq!(loaded.requests.len(), 1);
        assert_eq!(loaded.requests[0].status, campus_storage::RequestStatus::Pending);
        assert!(loaded.settings.allow_chat);

        store.delete_group(&group.id).await.unwrap();
        assert!(matches!(
            store.get_group(&group.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn save_unknown_group_is_not_found() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let group = sample_group(StudentId(Uuid::now_v7()), GroupType::Public, "ffffffff");
        assert!(matches!(
            store.save_group(&group).await,
            Err(StoreError::NotFound)
        ));
    }

    /// Whole-row saves have no version check: two writers that loaded the
    /// same group race, and the loser's effect silently disappears. This
    /// test pins that behavior down so the limitation stays detectable.
    #[tokio::test]
    async fn concurrent_approvals_last_write_wins() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let admin = store.create_student(&student_params("admin@example.edu")).await.unwrap();

        let mut group = sample_group(admin, GroupType::Private, "0b5eface");
        group.members.insert(admin);
        let (alice, bob) = (StudentId(Uuid::now_v7()), StudentId(Uuid::now_v7()));
        let now = Utc::now();
        let first = campus_membership::join_group(&mut group, alice, now).unwrap();
        let second = campus_membership::join_group(&mut group, bob, now).unwrap();
        let (campus_membership::JoinOutcome::Requested(first_id), campus_membership::JoinOutcome::Requested(second_id)) =
            (first, second)
        else {
            panic!("expected filed requests");
        };
        store.create_group(&group).await.unwrap();

        // Two handlers load the same group independently...
        let mut copy_a = store.get_group(&group.id).await.unwrap();
        let mut copy_b = store.get_group(&group.id).await.unwrap();

        // ...and each approves a different pending request.
        campus_membership::approve_join_request(&mut copy_a, admin, &first_id).unwrap();
        store.save_group(&copy_a).await.unwrap();
        campus_membership::approve_join_request(&mut copy_b, admin, &second_id).unwrap();
        store.save_group(&copy_b).await.unwrap();

        // The second save overwrote the first: Alice's approval is gone.
        let final_state = store.get_group(&group.id).await.unwrap();
        assert!(!final_state.members.contains(&alice));
        assert!(final_state.members.contains(&bob));
        assert_eq!(
            final_state.request(&first_id).unwrap().status,
            campus_storage::RequestStatus::Pending
        );
    }
}
