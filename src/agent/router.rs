//! Keyword heuristic that decides whether a chat message asks for a script.

/// Routing decision for one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Run the generate → persist → execute pipeline.
    Trigger,
    /// Reply with the clarification template.
    Clarify,
}

/// Substrings whose presence selects `Intent::Trigger`.
///
/// A message triggers when it contains every `required` keyword and at least
/// one `any_of` keyword. Matching is case-insensitive; an empty `any_of`
/// list places no constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerKeywords {
    required: Vec<String>,
    any_of: Vec<String>,
}

impl TriggerKeywords {
    pub fn new(required: Vec<String>, any_of: Vec<String>) -> Self {
        Self {
            required: required.into_iter().map(|k| k.to_lowercase()).collect(),
            any_of: any_of.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn any_of(&self) -> &[String] {
        &self.any_of
    }
}

impl Default for TriggerKeywords {
    fn default() -> Self {
        Self::new(
            vec!["python".to_string()],
            vec!["create".to_string(), "作成".to_string(), "作って".to_string()],
        )
    }
}

/// Classify a message against the configured keywords. Pure; no I/O.
pub fn classify(message: &str, keywords: &TriggerKeywords) -> Intent {
    let normalized = message.to_lowercase();

    let has_required = keywords
        .required
        .iter()
        .all(|k| normalized.contains(k.as_str()));
    let has_any = keywords.any_of.is_empty()
        || keywords
            .any_of
            .iter()
            .any(|k| normalized.contains(k.as_str()));

    if has_required && has_any {
        Intent::Trigger
    } else {
        Intent::Clarify
    }
}
