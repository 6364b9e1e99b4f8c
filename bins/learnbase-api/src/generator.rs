// Exercise generation: OpenAI-compatible chat endpoint with a deterministic fallback

use learnbase_common::config::OpenAiSettings;
use learnbase_common::exercise::fallback_exercise;
use learnbase_common::types::{ExerciseContent, TestCase};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "You are an AI coding tutor. Given a topic and level, produce a JSON with keys: \
question, exercise, hints (array), test_cases (array of {input, output}).";

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response contained no content")]
    EmptyResponse,

    #[error("content is not a valid exercise: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// Shape the model is asked to produce. Missing keys default to empty.
#[derive(Deserialize)]
struct GeneratedExercise {
    #[serde(default)]
    question: String,
    #[serde(default)]
    exercise: String,
    #[serde(default)]
    hints: Vec<String>,
    #[serde(default)]
    test_cases: Vec<TestCase>,
}

/// Where an exercise came from, for logs and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseSource {
    Remote,
    Fallback,
}

impl ExerciseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseSource::Remote => "remote",
            ExerciseSource::Fallback => "fallback",
        }
    }
}

#[derive(Clone)]
pub struct ExerciseGenerator {
    client: Client,
    openai: Option<OpenAiSettings>,
}

impl ExerciseGenerator {
    pub fn new(openai: Option<OpenAiSettings>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, openai }
    }

    pub fn is_remote(&self) -> bool {
        self.openai.is_some()
    }

    /// Produce an exercise for `topic` at `level`. Any remote failure falls back
    /// to the built-in content, so this never fails.
    pub async fn generate(&self, topic: &str, level: &str) -> (ExerciseContent, ExerciseSource) {
        let Some(settings) = &self.openai else {
            return (fallback_exercise(topic, level), ExerciseSource::Fallback);
        };

        match self.request(settings, topic, level).await {
            Ok(content) => (content, ExerciseSource::Remote),
            Err(e) => {
                warn!(topic, level, error = %e, "Exercise generation failed, using fallback");
                (fallback_exercise(topic, level), ExerciseSource::Fallback)
            }
        }
    }

    async fn request(
        &self,
        settings: &OpenAiSettings,
        topic: &str,
        level: &str,
    ) -> Result<ExerciseContent, GeneratorError> {
        let url = format!("{}/chat/completions", settings.api_base.trim_end_matches('/'));
        let user = format!("topic={}\nlevel={}", topic, level);

        let body = ChatRequest {
            model: &settings.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.3,
        };

        let start = Instant::now();
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&settings.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        debug!(%url, status = status.as_u16(), latency_ms = start.elapsed().as_millis() as u64, "Exercise generation response");

        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = resp.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GeneratorError::EmptyResponse)?;

        parse_content(&content)
    }
}

/// Strip an optional markdown code fence around the model's JSON
fn strip_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_content(content: &str) -> Result<ExerciseContent, GeneratorError> {
    let generated: GeneratedExercise = serde_json::from_str(strip_fence(content))?;
    Ok(ExerciseContent {
        question: generated.question,
        exercise: generated.exercise,
        hints: generated.hints,
        test_cases: generated.test_cases,
        progress: None,
    })
}
