pub mod analysis;
pub mod cli;
pub mod config;
pub mod llm;
pub mod logging;
pub mod relevance;
pub mod render;

pub use analysis::{AnalysisError, AnalysisReport, Analyzer, InputError};
pub use llm::extract_translation;
pub use relevance::{assess, is_relevant, RelevanceSignal};
pub use render::{render, Fragment, RenderedDocument};
