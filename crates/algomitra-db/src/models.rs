//! Row types map directly to SQLite rows and are converted into the shared
//! `algomitra-types` models at the edge of this crate.

use algomitra_types::models::{Difficulty, Role, TestCase, User};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{DbError, Result};

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// A user together with the stored password hash. Only the login path
/// should ever see one of these.
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

pub struct NewProblem {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub test_cases: Vec<TestCase>,
    pub created_by: Uuid,
}

pub(crate) struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub badges: String,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    pub fn into_record(self) -> Result<UserRecord> {
        let user = User {
            id: parse_uuid(&self.id)?,
            role: self
                .role
                .parse()
                .map_err(|e: algomitra_types::models::ParseRoleError| DbError::Corrupt(e.to_string()))?,
            badges: serde_json::from_str(&self.badges)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            name: self.name,
            email: self.email,
            bio: self.bio,
            photo_url: self.photo_url,
        };
        Ok(UserRecord {
            user,
            password_hash: self.password,
        })
    }
}

pub(crate) struct ProblemRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub created_by: String,
    pub created_at: String,
}

pub(crate) struct TestCaseRow {
    pub problem_id: String,
    pub input: String,
    pub output: String,
    pub is_sample: bool,
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    s.parse()
        .map_err(|e| DbError::Corrupt(format!("bad uuid '{}': {}", s, e)))
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty> {
    s.parse().map_err(|e: algomitra_types::models::ParseDifficultyError| DbError::Corrupt(e.to_string()))
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand through sqlite3 use datetime('now'),
            // which has no timezone suffix.
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| DbError::Corrupt(format!("bad timestamp '{}': {}", s, e)))
}

/// Fixed-width RFC 3339 so lexical order in SQL matches time order.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
