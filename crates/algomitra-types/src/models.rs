use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Roles --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid role '{0}': must be \"student\" or \"teacher\"")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

// -- Problems --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid difficulty '{0}'")]
pub struct ParseDifficultyError(pub String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Self::Easy),
            "Medium" => Ok(Self::Medium),
            "Hard" => Ok(Self::Hard),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}

/// An input/output pair. Sample cases are shown to solvers, hidden ones are
/// kept for grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub is_sample: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub test_cases: Vec<TestCase>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Problem {
    /// Render the problem for `viewer`. Anyone but the author gets every
    /// test case with its expected output stripped.
    pub fn view_for(&self, viewer: Uuid) -> ProblemView {
        let owner = viewer == self.created_by;
        ProblemView {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            difficulty: self.difficulty,
            test_cases: self
                .test_cases
                .iter()
                .map(|tc| TestCaseView {
                    input: tc.input.clone(),
                    output: owner.then(|| tc.output.clone()),
                    is_sample: tc.is_sample,
                })
                .collect(),
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseView {
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub is_sample: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub test_cases: Vec<TestCaseView>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Owner listing entry, test cases left out to keep the list light.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSummary {
    pub id: Uuid,
    pub title: String,
    pub difficulty: Difficulty,
    pub test_case_count: u32,
    pub created_at: DateTime<Utc>,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub badges: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submissions per UTC day, keyed "YYYY-MM-DD".
pub type SubmissionActivity = BTreeMap<String, u32>;

/// Full profile as the client renders it. The role-specific part is a
/// tagged union flattened next to the common fields, so the JSON still
/// carries a plain `role` string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: ProfileDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ProfileDetails {
    Student {
        badges: Vec<String>,
        submission_activity: SubmissionActivity,
    },
    Teacher {
        problems_authored: u32,
    },
}

impl UserProfile {
    pub fn role(&self) -> Role {
        match self.details {
            ProfileDetails::Student { .. } => Role::Student,
            ProfileDetails::Teacher { .. } => Role::Teacher,
        }
    }
}
