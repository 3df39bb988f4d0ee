use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label placed in front of the rendered records.
pub const CONTEXT_LABEL: &str = "\n\nReturned results from vector db (done automatically): ";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstructorMetadata {
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub stars: f64,
}

impl InstructorMetadata {
    /// Reads metadata field by field, tolerating whatever shape the upserting
    /// script left behind. Wrong types fall back to defaults; `stars` may
    /// also be a numeric string.
    pub fn from_fields<'a, F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<&'a Value>,
    {
        let review = get("review").and_then(Value::as_str).unwrap_or_default().to_string();

        let classes = get("classes")
            .and_then(Value::as_array)
            .map(|classes| {
                classes
                    .iter()
                    .filter_map(|c| c.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let stars = match get("stars") {
            Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
            Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
            _ => 0.0,
        };

        Self { review, classes, stars }
    }
}

/// One match from the vector index. `id` is the instructor's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedRecord {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: InstructorMetadata,
}

impl RetrievedRecord {
    pub fn new(id: impl Into<String>, score: f32, metadata: InstructorMetadata) -> Self {
        Self {
            id: id.into(),
            score,
            metadata,
        }
    }
}

/// Renders records, in the given order, behind [`CONTEXT_LABEL`]. Duplicate
/// instructors are rendered once per record.
pub fn format_results(records: &[RetrievedRecord]) -> String {
    let mut formatted = String::from(CONTEXT_LABEL);

    for record in records {
        formatted.push_str(&format!(
            "\nProfessor: {}\nReview: {}\nClasses: {}\nStars: {}\n\n",
            record.id,
            record.metadata.review,
            record.metadata.classes.join(", "),
            record.metadata.stars
        ));
    }

    formatted
}

/// The last user message with the retrieved context appended after it.
pub fn augment(content: &str, records: &[RetrievedRecord]) -> String {
    let mut augmented = String::with_capacity(content.len() + 128 * records.len());
    augmented.push_str(content);
    augmented.push_str(&format_results(records));
    augmented
}
