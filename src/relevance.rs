use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// A pattern family that made a piece of text look like source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceSignal {
    Keyword,
    Assignment,
    Call,
    ShortAssignment,
    IntegerLiteral,
    StringLiteral,
    FloatLiteral,
}

impl RelevanceSignal {
    pub const ALL: [RelevanceSignal; 7] = [
        RelevanceSignal::Keyword,
        RelevanceSignal::Assignment,
        RelevanceSignal::Call,
        RelevanceSignal::ShortAssignment,
        RelevanceSignal::IntegerLiteral,
        RelevanceSignal::StringLiteral,
        RelevanceSignal::FloatLiteral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelevanceSignal::Keyword => "keyword",
            RelevanceSignal::Assignment => "assignment",
            RelevanceSignal::Call => "call",
            RelevanceSignal::ShortAssignment => "short_assignment",
            RelevanceSignal::IntegerLiteral => "integer_literal",
            RelevanceSignal::StringLiteral => "string_literal",
            RelevanceSignal::FloatLiteral => "float_literal",
        }
    }

    fn matches(self, text: &str) -> bool {
        static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                r"\b(?:def|function|class|import|for|while|if|else|return|try|catch|async|await|var|let|const|#|print|int|str|float|bool|list|dict|set|tuple)\b",
            )
            .unwrap()
        });
        static CALL_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\b(?:print|input|len|range)\s*\(").unwrap());
        // No lookbehind in `regex`: the leading group stands in for "not after a word char".
        static SHORT_ASSIGN_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?:^|\W)[a-z]\s*=").unwrap());
        static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\b").unwrap());
        static STRING_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r#"".*?"|'[^']*'"#).unwrap());
        static FLOAT_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\b\d+\.\d+\b").unwrap());

        match self {
            RelevanceSignal::Keyword => KEYWORD_RE.is_match(text),
            RelevanceSignal::Assignment => has_assignment(text),
            RelevanceSignal::Call => CALL_RE.is_match(text),
            RelevanceSignal::ShortAssignment => SHORT_ASSIGN_RE.is_match(text),
            RelevanceSignal::IntegerLiteral => INTEGER_RE.is_match(text),
            RelevanceSignal::StringLiteral => STRING_RE.is_match(text),
            RelevanceSignal::FloatLiteral => FLOAT_RE.is_match(text),
        }
    }
}

impl fmt::Display for RelevanceSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cheap gate deciding whether `text` plausibly contains source code.
///
/// Any single signal accepts. This is meant to turn away plain prose before
/// a model call is spent on it, so false positives are expected.
pub fn is_relevant(text: &str) -> bool {
    RelevanceSignal::ALL.iter().any(|signal| signal.matches(text))
}

/// Every signal that matches `text`, in evaluation order.
pub fn assess(text: &str) -> Vec<RelevanceSignal> {
    RelevanceSignal::ALL
        .into_iter()
        .filter(|signal| signal.matches(text))
        .collect()
}

/// A lone `=` (not `==`, `!=`, `<=`, `>=`) with a word somewhere in the
/// run of word/space characters right before it and some non-`=` character
/// right after it.
fn has_assignment(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();

    chars.iter().enumerate().any(|(i, &ch)| {
        if ch != '=' {
            return false;
        }
        let prev = i.checked_sub(1).map(|p| chars[p]);
        if matches!(prev, Some('=' | '!' | '<' | '>')) {
            return false;
        }
        match chars.get(i + 1) {
            Some('=') | None => return false,
            Some(_) => {}
        }

        chars[..i]
            .iter()
            .rev()
            .take_while(|c| is_word_char(**c) || c.is_whitespace())
            .any(|c| is_word_char(*c))
    })
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
