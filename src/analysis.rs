use serde::Serialize;

use crate::llm::{
    extract_translation, translation_prompt, vulnerability_prompt, ChatMessage, ChatModel,
    LlmError,
};
use crate::relevance::is_relevant;
use crate::render::{render, RenderedDocument};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Please enter code to analyze.")]
    Empty,
    #[error("The input does not appear to be valid code. Please check your input.")]
    NotCode,
    #[error("Unsupported target language '{0}' (available: {1})")]
    UnsupportedLanguage(String, String),
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Model(#[from] LlmError),
}

/// Rendered answers from the analysis conversation.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis: RenderedDocument,
    pub vulnerabilities: RenderedDocument,
}

/// Drives the model conversations for one piece of source code.
pub struct Analyzer<M> {
    model: M,
    languages: Vec<String>,
}

impl<M: ChatModel> Analyzer<M> {
    pub fn new(model: M, languages: Vec<String>) -> Self {
        Self { model, languages }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn resolve_language(&self, language: &str) -> Result<&str, InputError> {
        resolve_language(&self.languages, language)
    }

    /// Ask for an analysis, then for a vulnerability review in the same conversation.
    pub async fn analyze(&self, code: &str) -> Result<AnalysisReport, AnalysisError> {
        let code = check_input(code)?;

        let mut conversation = vec![ChatMessage::user(code)];
        let analysis = self.model.send(&conversation).await?;
        tracing::debug!(chars = analysis.len(), "Received analysis");

        let rendered = render(&analysis);
        conversation.push(ChatMessage::model(analysis));
        conversation.push(ChatMessage::user(vulnerability_prompt(code)));
        let vulnerabilities = self.model.send(&conversation).await?;
        tracing::debug!(chars = vulnerabilities.len(), "Received vulnerability review");

        Ok(AnalysisReport {
            analysis: rendered,
            vulnerabilities: render(&vulnerabilities),
        })
    }

    /// Translate `code` in a fresh conversation and keep only the code body of the reply.
    pub async fn translate(&self, code: &str, language: &str) -> Result<String, AnalysisError> {
        let code = check_input(code)?;
        let language = self.resolve_language(language)?;

        let conversation = [ChatMessage::user(translation_prompt(code, language))];
        let reply = self.model.send(&conversation).await?;
        Ok(extract_translation(&reply))
    }
}

/// Canonical name of a configured target language, matched case-insensitively.
pub fn resolve_language<'a>(
    languages: &'a [String],
    language: &str,
) -> Result<&'a str, InputError> {
    let wanted = language.trim();
    languages
        .iter()
        .find(|l| l.eq_ignore_ascii_case(wanted))
        .map(String::as_str)
        .ok_or_else(|| InputError::UnsupportedLanguage(wanted.to_string(), languages.join(", ")))
}

/// Trim user input and reject what should never reach the model.
pub fn check_input(code: &str) -> Result<&str, InputError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(InputError::Empty);
    }
    if !is_relevant(code) {
        return Err(InputError::NotCode);
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_input_trims() {
        assert_eq!(check_input("  x = 1\n"), Ok("x = 1"));
    }

    #[test]
    fn test_check_input_rejects_blank_and_prose() {
        assert_eq!(check_input(""), Err(InputError::Empty));
        assert_eq!(check_input(" \n\t "), Err(InputError::Empty));
        assert_eq!(check_input("hello there"), Err(InputError::NotCode));
    }

    #[test]
    fn test_resolve_language_is_case_insensitive() {
        let languages = vec!["C++".to_string(), "JavaScript".to_string()];
        assert_eq!(resolve_language(&languages, "javascript"), Ok("JavaScript"));
        assert_eq!(resolve_language(&languages, " c++ "), Ok("C++"));
        assert_eq!(
            resolve_language(&languages, "Cobol"),
            Err(InputError::UnsupportedLanguage("Cobol".into(), "C++, JavaScript".into()))
        );
    }
}
