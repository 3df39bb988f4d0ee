use std::fs;
use std::path::Path;

use crate::error::ConfigError;

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an assistant that helps students find and evaluate computer science \
professors at UC Davis. Each of your answers draws on a vector database holding \
every professor's name, star rating, classes taught and student reviews; the \
most relevant entries are attached to the student's latest message.

Your responsibilities:
1. Interpret student questions about UC Davis computer science professors.
2. Use the attached database results to answer them.
3. Describe teaching style, course difficulty and overall student satisfaction.
4. Keep a neutral, objective tone when discussing professors and their ratings.
5. Never share personal information about the students who wrote the reviews.

When answering:
- Base every answer on the information in the database results.
- If a professor or course is not in the results, tell the student you do not have information on it.
- Summarize the most relevant facts: the professor's name, rating, classes taught and a short overview of review sentiment.
- Offer specific review quotes or further details when the student asks for more.
- Encourage students to weigh several factors when choosing a professor, not only the rating.
";

/// The system instruction sent ahead of every conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemPrompt(String);

impl SystemPrompt {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::PromptFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        if text.trim().is_empty() {
            return Err(ConfigError::PromptFile {
                path: path.display().to_string(),
                reason: "file is empty".to_string(),
            });
        }

        Ok(Self(text))
    }

    /// The override file when one is configured, otherwise the built-in prompt.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self(DEFAULT_SYSTEM_PROMPT.to_string())
    }
}
