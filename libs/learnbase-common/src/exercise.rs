// Deterministic exercise content used when no generation backend is configured

use crate::types::{Difficulty, ExerciseContent, TestCase};

pub const DEFAULT_TOPIC: &str = "General Programming";

/// Build the built-in exercise for a topic and free-form level.
///
/// Same inputs always produce the same content, and every exercise ships test
/// cases that a correct `solve()` passes under exact output comparison.
pub fn fallback_exercise(topic: &str, level: &str) -> ExerciseContent {
    let topic = match topic.trim() {
        "" => DEFAULT_TOPIC,
        t => t,
    };

    match Difficulty::from_level(level) {
        Difficulty::Basic => ExerciseContent {
            question: format!("List two key concepts in {}.", topic),
            exercise: "Write a function solve() that reads a single line and prints it in uppercase."
                .to_string(),
            hints: vec!["Use input() to read.".to_string(), "Use .upper().".to_string()],
            test_cases: vec![
                TestCase::new("hello\n", "HELLO\n"),
                TestCase::new("Learnbase\n", "LEARNBASE\n"),
            ],
            progress: None,
        },
        Difficulty::Intermediate => ExerciseContent {
            question: format!("Explain how you'd structure a module for {}.", topic),
            exercise:
                "Implement solve() reading a CSV line of ints, print sum of unique numbers."
                    .to_string(),
            hints: vec![
                "Split by comma and convert to int.".to_string(),
                "Use set() to deduplicate.".to_string(),
            ],
            test_cases: vec![
                TestCase::new("1,2,2,3\n", "6\n"),
                TestCase::new("10,10,10\n", "10\n"),
            ],
            progress: None,
        },
        Difficulty::Advanced => ExerciseContent {
            question: format!("Describe an edge case in {} and how to mitigate it.", topic),
            exercise: "Implement solve() reading JSON with key 'nums', print median as float with one decimal."
                .to_string(),
            hints: vec![
                "json.loads for parsing.".to_string(),
                "Handle even/odd lengths.".to_string(),
            ],
            test_cases: vec![
                TestCase::new(
                    format!("{}\n", serde_json::json!({ "nums": [1, 2, 3] })),
                    "2.0\n",
                ),
                TestCase::new(
                    format!("{}\n", serde_json::json!({ "nums": [1, 2, 3, 4] })),
                    "2.5\n",
                ),
            ],
            progress: None,
        },
    }
}
