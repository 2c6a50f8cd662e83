use std::process::ExitCode;

use crate::config::Config;
use crate::logging::{HistoryAction, HistoryEntry, HistoryLogger, HistoryOutcome};
use crate::relevance::assess;

/// Print the classifier verdict for `source` and the signals behind it.
pub(super) fn check(source: &str, history: Option<&HistoryLogger>) -> ExitCode {
    let signals = assess(source.trim());

    if signals.is_empty() {
        println!("not code");
    } else {
        let names: Vec<&str> = signals.iter().map(|s| s.as_str()).collect();
        println!("code\t{}", names.join(","));
    }

    if let Some(history) = history {
        let outcome = if signals.is_empty() {
            HistoryOutcome::Rejected
        } else {
            HistoryOutcome::Ok
        };
        history.log(HistoryEntry::new(HistoryAction::Check, source.trim(), outcome));
    }

    ExitCode::SUCCESS
}

pub(super) fn languages(config: &Config) {
    for language in &config.translate.languages {
        println!("{language}");
    }
}
