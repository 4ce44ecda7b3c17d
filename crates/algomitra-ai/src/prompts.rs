use algomitra_types::models::{Difficulty, TestCase};
use serde_json::{Value, json};

pub const PROBLEM_SYSTEM_PROMPT: &str = "\
You write problems for competitive-programming practice sites.
Produce one complete coding problem for the request that follows, as JSON matching the response schema.
- 'description' is markdown: a problem statement, the constraints, and at least one worked example.
- 'difficulty' is exactly one of \"Easy\", \"Medium\" or \"Hard\".
- 'testCases' holds at least 5 objects.
- Mix visible samples, hidden basic cases, and hidden edge cases (empty input, a single element, large input).
- Set 'isSample' to true on the first one or two cases only, false on the rest.
- Every 'input' and 'output' is a string: write the array [1, 2, 3] as \"[1, 2, 3]\" and the number 5 as \"5\".";

pub const TEST_CASES_SYSTEM_PROMPT: &str = "\
You are a QA engineer with a competitive-programming background.
Given a problem description and its existing test cases, produce 10 to 15 additional hidden test cases.
Never repeat any of the existing cases.
Cover edge cases first (empty input, null, 0, 1, very large input, duplicates, a single element, input already sorted or reverse sorted), then a few straightforward cases.
Return only a JSON array of test case objects.
- 'isSample' is false on every case.
- Every 'input' and 'output' is a string.";

fn test_case_schema(sample_flag: Value) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "input": { "type": "STRING" },
            "output": { "type": "STRING" },
            "isSample": sample_flag
        },
        "required": ["input", "output", "isSample"]
    })
}

pub fn problem_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "difficulty": { "type": "STRING", "enum": ["Easy", "Medium", "Hard"] },
            "testCases": {
                "type": "ARRAY",
                "items": test_case_schema(json!({ "type": "BOOLEAN" }))
            }
        },
        "required": ["title", "description", "difficulty", "testCases"]
    })
}

pub fn test_cases_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": test_case_schema(json!({ "type": "BOOLEAN", "const": false }))
    })
}

pub fn problem_prompt(prompt: &str, difficulty: Option<Difficulty>) -> String {
    match difficulty {
        Some(d) => format!("{}\n\nTarget difficulty: {}", prompt.trim(), d),
        None => prompt.trim().to_string(),
    }
}

pub fn test_cases_prompt(description: &str, existing: &[TestCase]) -> String {
    // Serializing a Vec of plain structs cannot fail
    let existing_json = serde_json::to_string_pretty(existing).unwrap_or_else(|_| "[]".into());
    format!(
        "Problem description:\n{}\n\nExisting test cases (do not repeat these):\n{}",
        description.trim(),
        existing_json
    )
}
