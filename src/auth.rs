use crate::db::now_rfc3339;
use crate::nav::Role;
use crate::session::AuthContext;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("{0}")]
    Invalid(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "unauthenticated",
            AuthError::EmailTaken(_) => "conflict",
            AuthError::Invalid(_) => "bad_params",
            AuthError::Hash(_) => "internal",
            AuthError::Db(_) => "db_query_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub district: Option<String>,
    pub institution_id: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub district: Option<String>,
    pub institution_id: Option<String>,
    pub company_name: Option<String>,
    pub created_at: String,
}

impl UserRecord {
    pub fn into_context(self) -> AuthContext {
        AuthContext {
            user_id: self.id,
            email: self.email,
            role: self.role,
            district: self.district,
            company_name: self.company_name,
            institution_id: self.institution_id,
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn validate(user: &NewUser) -> Result<(), AuthError> {
    let email = normalize_email(&user.email);
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Invalid("email must be an address".to_string()));
    }
    if user.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::Invalid(format!(
            "password must have at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    match user.role {
        Role::DistrictAdmin | Role::Institution | Role::Trainee if non_empty(&user.district).is_none() => {
            Err(AuthError::Invalid(format!(
                "{} accounts need a district",
                user.role.as_str()
            )))
        }
        Role::Institution if non_empty(&user.institution_id).is_none() => Err(AuthError::Invalid(
            "institution accounts need an institutionId".to_string(),
        )),
        Role::Company if non_empty(&user.company_name).is_none() => Err(AuthError::Invalid(
            "company accounts need a companyName".to_string(),
        )),
        _ => Ok(()),
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(UserRecord, String)> {
    let role: String = row.get(2)?;
    let role = Role::parse(&role).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown role {role}").into(),
        )
    })?;
    Ok((
        UserRecord {
            id: row.get(0)?,
            email: row.get(1)?,
            role,
            district: row.get(3)?,
            institution_id: row.get(4)?,
            company_name: row.get(5)?,
            created_at: row.get(6)?,
        },
        row.get(7)?,
    ))
}

const USER_COLUMNS: &str =
    "id, email, role, district, institution_id, company_name, created_at, password_hash";

pub fn count_users(conn: &Connection) -> Result<i64, AuthError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?)
}

pub fn create_user(conn: &Connection, user: &NewUser) -> Result<UserRecord, AuthError> {
    validate(user)?;
    let email = normalize_email(&user.email);
    let taken: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE email = ?", [&email], |r| r.get(0))
        .optional()?;
    if taken.is_some() {
        return Err(AuthError::EmailTaken(email));
    }

    let record = UserRecord {
        id: Uuid::new_v4().to_string(),
        email,
        role: user.role,
        district: non_empty(&user.district),
        institution_id: non_empty(&user.institution_id),
        company_name: non_empty(&user.company_name),
        created_at: now_rfc3339(),
    };
    conn.execute(
        "INSERT INTO users(id, email, password_hash, role, district, institution_id, company_name, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            record.id,
            record.email,
            hash_password(&user.password)?,
            record.role.as_str(),
            record.district,
            record.institution_id,
            record.company_name,
            record.created_at,
        ],
    )?;
    Ok(record)
}

pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<UserRecord, AuthError> {
    let found = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"),
            [normalize_email(email)],
            user_from_row,
        )
        .optional()?;
    match found {
        Some((user, hash)) if verify_password(password, &hash) => Ok(user),
        _ => Err(AuthError::InvalidCredentials),
    }
}

pub fn list_users(conn: &Connection) -> Result<Vec<UserRecord>, AuthError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY role, email"
    ))?;
    let rows = stmt
        .query_map([], user_from_row)?
        .map(|r| r.map(|(user, _)| user))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete_user(conn: &Connection, id: &str) -> Result<bool, AuthError> {
    Ok(conn.execute("DELETE FROM users WHERE id = ?", [id])? > 0)
}

pub fn reset_password(conn: &Connection, id: &str, password: &str) -> Result<bool, AuthError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::Invalid(format!(
            "password must have at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    let n = conn.execute(
        "UPDATE users SET password_hash = ? WHERE id = ?",
        (hash_password(password)?, id),
    )?;
    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "correct horse".to_string(),
            role,
            district: Some("Udupi".to_string()),
            institution_id: None,
            company_name: None,
        }
    }

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("s3cret-pass").expect("hash");
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("s3cret-pasS", &hash));
        assert!(!verify_password("s3cret-pass", "not-a-phc-string"));
    }

    #[test]
    fn create_then_authenticate() {
        let ws = std::env::temp_dir().join(format!("districtd-auth-{}", Uuid::new_v4()));
        let conn = db::open_db(&ws).expect("open");

        let created = create_user(&conn, &new_user(" Admin@Udupi.gov.in ", Role::DistrictAdmin))
            .expect("create");
        assert_eq!(created.email, "admin@udupi.gov.in");

        let dup = create_user(&conn, &new_user("admin@udupi.gov.in", Role::DistrictAdmin));
        assert!(matches!(dup, Err(AuthError::EmailTaken(_))));

        let user = authenticate(&conn, "ADMIN@udupi.gov.in", "correct horse").expect("login");
        assert_eq!(user.role, Role::DistrictAdmin);
        assert!(matches!(
            authenticate(&conn, "admin@udupi.gov.in", "wrong horse"),
            Err(AuthError::InvalidCredentials)
        ));

        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn role_specific_fields_are_required() {
        let mut company = new_user("hr@acme.in", Role::Company);
        assert!(matches!(validate(&company), Err(AuthError::Invalid(_))));
        company.company_name = Some("Acme".to_string());
        assert!(validate(&company).is_ok());

        let mut admin = new_user("a@b.in", Role::DistrictAdmin);
        admin.district = Some("  ".to_string());
        assert!(validate(&admin).is_err());

        let mut short = new_user("a@b.in", Role::SuperAdmin);
        short.password = "short".to_string();
        assert!(validate(&short).is_err());
    }
}
