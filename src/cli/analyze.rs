use std::process::ExitCode;

use crate::analysis::{check_input, resolve_language, AnalysisError, AnalysisReport, Analyzer, InputError};
use crate::config::Config;
use crate::llm::LlmClient;
use crate::logging::{HistoryAction, HistoryEntry, HistoryLogger, HistoryOutcome};
use crate::render::{render, RenderedDocument};

pub(super) async fn analyze(
    config: &Config,
    source: &str,
    translate_to: Option<&str>,
    json: bool,
    history: Option<&HistoryLogger>,
) -> anyhow::Result<ExitCode> {
    let checked = check_input(source).and_then(|_| match translate_to {
        Some(language) => resolve_language(&config.translate.languages, language).map(|_| ()),
        None => Ok(()),
    });
    if let Err(e) = checked {
        return Ok(reject(HistoryAction::Analyze, source, translate_to, &e, history));
    }
    let Some(analyzer) = build_analyzer(config) else {
        return Ok(ExitCode::FAILURE);
    };

    let report = match analyzer.analyze(source).await {
        Ok(report) => report,
        Err(e) => {
            print_error(&format!("An error occurred: {e}"));
            let entry = HistoryEntry::new(HistoryAction::Analyze, source, outcome_of(&e));
            log(history, entry.with_error(&e));
            return Ok(ExitCode::FAILURE);
        }
    };
    log(history, HistoryEntry::new(HistoryAction::Analyze, source, HistoryOutcome::Ok));

    // A failed translation still shows the finished analysis.
    let (translation, status) = match translate_to {
        Some(language) => match run_translation(&analyzer, source, language, history).await {
            Some(code) => (Some(code), ExitCode::SUCCESS),
            None => (None, ExitCode::FAILURE),
        },
        None => (None, ExitCode::SUCCESS),
    };

    if json {
        print_json(&report, translation.as_deref())?;
    } else {
        print_report(&report, translation.as_deref());
    }

    Ok(status)
}

pub(super) async fn translate(
    config: &Config,
    source: &str,
    language: &str,
    history: Option<&HistoryLogger>,
) -> anyhow::Result<ExitCode> {
    let checked = check_input(source)
        .and_then(|_| resolve_language(&config.translate.languages, language));
    if let Err(e) = checked {
        return Ok(reject(HistoryAction::Translate, source, Some(language), &e, history));
    }
    let Some(analyzer) = build_analyzer(config) else {
        return Ok(ExitCode::FAILURE);
    };

    match run_translation(&analyzer, source, language, history).await {
        Some(code) => {
            println!("{code}");
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}

fn build_analyzer(config: &Config) -> Option<Analyzer<LlmClient>> {
    match LlmClient::from_config(&config.llm) {
        Some(client) => {
            tracing::info!(model = client.model(), "Model client ready");
            Some(Analyzer::new(client, config.translate.languages.clone()))
        }
        None => {
            print_error(&format!(
                "Model client not configured (set llm.enabled and the {} environment variable)",
                config.llm.api_key_env
            ));
            None
        }
    }
}

async fn run_translation(
    analyzer: &Analyzer<LlmClient>,
    source: &str,
    language: &str,
    history: Option<&HistoryLogger>,
) -> Option<String> {
    let entry = |outcome: HistoryOutcome| {
        HistoryEntry::new(HistoryAction::Translate, source, outcome).with_language(language)
    };

    match analyzer.translate(source, language).await {
        Ok(code) => {
            log(history, entry(HistoryOutcome::Ok));
            Some(code)
        }
        Err(e) => {
            print_error(&format!("An error occurred during translation: {e}"));
            log(history, entry(outcome_of(&e)).with_error(&e));
            None
        }
    }
}

fn reject(
    action: HistoryAction,
    source: &str,
    language: Option<&str>,
    error: &InputError,
    history: Option<&HistoryLogger>,
) -> ExitCode {
    print_error(&error.to_string());
    let mut entry = HistoryEntry::new(action, source, HistoryOutcome::Rejected).with_error(error);
    if let Some(language) = language {
        entry = entry.with_language(language);
    }
    log(history, entry);
    ExitCode::FAILURE
}

fn outcome_of(error: &AnalysisError) -> HistoryOutcome {
    match error {
        AnalysisError::Input(_) => HistoryOutcome::Rejected,
        AnalysisError::Model(_) => HistoryOutcome::Error,
    }
}

fn log(history: Option<&HistoryLogger>, entry: HistoryEntry) {
    if let Some(history) = history {
        history.log(entry);
    }
}

fn print_report(report: &AnalysisReport, translation: Option<&str>) {
    print_section("Analysis Result", &report.analysis);
    println!();
    print_section("Vulnerabilities & Suggestions", &report.vulnerabilities);
    if let Some(code) = translation {
        println!();
        print_heading("Translated Code");
        println!("{code}");
    }
}

fn print_section(title: &str, body: &RenderedDocument) {
    print_heading(title);
    print_document(body);
}

fn print_heading(title: &str) {
    print_document(&render(&format!("**{title}**")));
}

fn print_document(doc: &RenderedDocument) {
    if super::use_color() {
        println!("{}", doc.to_ansi());
    } else {
        println!("{}", doc.to_plain());
    }
}

fn print_json(report: &AnalysisReport, translation: Option<&str>) -> anyhow::Result<()> {
    let value = serde_json::json!({
        "analysis": report.analysis,
        "vulnerabilities": report.vulnerabilities,
        "translation": translation,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_error(msg: &str) {
    eprintln!("[codescope] {msg}");
}
