//! Turning loosely-typed model output into checked domain values.
//!
//! The upstream schema asks for strings everywhere, but models still emit
//! `[1, 2, 3]` or `5` now and then. Those are coerced to their JSON text
//! instead of failing the whole generation.

use std::collections::HashSet;

use algomitra_types::api::GeneratedProblem;
use algomitra_types::models::{Difficulty, TestCase};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::gemini::GenerationError;

/// A generated problem must ship at least this many test cases.
pub const MIN_PROBLEM_CASES: usize = 5;
/// Upper bound on supplementary cases returned in one call. The prompt asks
/// for at least ten, but a shorter list after duplicate filtering is still
/// returned.
pub const MAX_GENERATED_CASES: usize = 15;
/// Leading cases of a generated problem that may be visible samples.
pub const MAX_SAMPLE_CASES: usize = 2;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTestCase {
    #[serde(deserialize_with = "stringify")]
    input: String,
    #[serde(deserialize_with = "stringify")]
    output: String,
    #[serde(default)]
    is_sample: bool,
}

impl From<RawTestCase> for TestCase {
    fn from(raw: RawTestCase) -> Self {
        Self {
            input: raw.input,
            output: raw.output,
            is_sample: raw.is_sample,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProblem {
    title: String,
    description: String,
    difficulty: Difficulty,
    test_cases: Vec<RawTestCase>,
}

fn stringify<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

pub fn parse_problem(value: Value) -> Result<GeneratedProblem, GenerationError> {
    let raw: RawProblem = serde_json::from_value(value)
        .map_err(|e| GenerationError::Malformed(format!("problem did not match schema: {}", e)))?;

    if raw.title.trim().is_empty() || raw.description.trim().is_empty() {
        return Err(GenerationError::Malformed("empty title or description".into()));
    }
    if raw.test_cases.len() < MIN_PROBLEM_CASES {
        return Err(GenerationError::Malformed(format!(
            "expected at least {} test cases, got {}",
            MIN_PROBLEM_CASES,
            raw.test_cases.len()
        )));
    }

    Ok(GeneratedProblem {
        title: raw.title.trim().to_string(),
        description: raw.description,
        difficulty: raw.difficulty,
        test_cases: flag_samples(raw.test_cases.into_iter().map(TestCase::from).collect()),
    })
}

/// The first case is always a sample, the second keeps the model's choice,
/// and everything after that is hidden.
fn flag_samples(mut cases: Vec<TestCase>) -> Vec<TestCase> {
    for (i, tc) in cases.iter_mut().enumerate() {
        match i {
            0 => tc.is_sample = true,
            i if i >= MAX_SAMPLE_CASES => tc.is_sample = false,
            _ => {}
        }
    }
    cases
}

/// Parse supplementary cases. Every result is hidden, and anything whose
/// input repeats one of `existing` (or an earlier generated case) is dropped.
pub fn parse_test_cases(value: Value, existing: &[TestCase]) -> Result<Vec<TestCase>, GenerationError> {
    // Some models wrap the array in an object despite the schema.
    let value = match value {
        Value::Object(mut map) if map.contains_key("testCases") => map.remove("testCases").unwrap_or(Value::Null),
        other => other,
    };

    let raw: Vec<RawTestCase> = serde_json::from_value(value)
        .map_err(|e| GenerationError::Malformed(format!("test cases did not match schema: {}", e)))?;

    let mut seen: HashSet<String> = existing.iter().map(|tc| fingerprint(&tc.input)).collect();
    let cases: Vec<TestCase> = raw
        .into_iter()
        .filter(|tc| seen.insert(fingerprint(&tc.input)))
        .map(|tc| TestCase {
            is_sample: false,
            ..TestCase::from(tc)
        })
        .take(MAX_GENERATED_CASES)
        .collect();

    if cases.is_empty() {
        return Err(GenerationError::Malformed("no new test cases in response".into()));
    }
    Ok(cases)
}

/// Comparison form for duplicate detection: trimmed, with each run of
/// whitespace collapsed to one space. `a b` and `ab` stay distinct.
fn fingerprint(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
