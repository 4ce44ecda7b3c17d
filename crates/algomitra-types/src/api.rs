use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Difficulty, ProblemSummary, ProblemView, Role, SubmissionActivity, TestCase, UserProfile,
};

// -- JWT Claims --

/// Bearer token payload. Carries the role so clients can route without a
/// round trip, but the server always re-reads the user on each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

// -- Envelope --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

// -- Auth --

// Fields default to empty so a missing field reaches the handler's
// validation and gets the same 400 message as a blank one.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: AuthUser,
    pub message: String,
}

// -- Profile --

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub success: bool,
    pub submission_activity: SubmissionActivity,
}

// -- Problems --

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateProblemRequest {
    pub title: String,
    pub description: String,
    pub difficulty: Option<Difficulty>,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProblemResponse {
    pub success: bool,
    pub problem: ProblemView,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProblemListResponse {
    pub success: bool,
    pub problems: Vec<ProblemView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MyProblemsResponse {
    pub success: bool,
    pub problems: Vec<ProblemSummary>,
}

// -- AI generation --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateProblemRequest {
    pub prompt: String,
    pub difficulty: Option<Difficulty>,
}

/// A problem drafted by the generator. Not persisted until a teacher
/// submits it through the normal create route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProblem {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateProblemResponse {
    pub success: bool,
    pub problem: GeneratedProblem,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateTestCasesRequest {
    pub description: String,
    pub test_cases: Option<Vec<TestCase>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTestCasesResponse {
    pub success: bool,
    pub test_cases: Vec<TestCase>,
}
