use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";

/// One run of display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Fragment {
    Plain(String),
    Bold(String),
}

impl Fragment {
    pub fn text(&self) -> &str {
        match self {
            Fragment::Plain(text) | Fragment::Bold(text) => text,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, Fragment::Bold(_))
    }
}

/// Model output split into plain and bold runs, in document order.
///
/// Fragments alternate plain/bold and always start and end with a plain
/// fragment, which may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RenderedDocument {
    fragments: Vec<Fragment>,
}

impl RenderedDocument {
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn into_fragments(self) -> Vec<Fragment> {
        self.fragments
    }

    /// Fragment texts concatenated, without any styling.
    pub fn to_plain(&self) -> String {
        self.fragments.iter().map(Fragment::text).collect()
    }

    /// Bold fragments wrapped in ANSI bold escapes for terminal output.
    pub fn to_ansi(&self) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Plain(text) => out.push_str(text),
                Fragment::Bold(text) => {
                    out.push_str(ANSI_BOLD);
                    out.push_str(text);
                    out.push_str(ANSI_RESET);
                }
            }
        }
        out
    }
}

/// Convert `**bold**` markers and `*`/`-` bullet lines into display fragments.
///
/// Only bold and bullets are handled; there is no nesting and no other
/// markdown. Bullets inside bold runs are left alone.
pub fn render(text: &str) -> RenderedDocument {
    static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

    let mut fragments = Vec::new();
    let mut last = 0;
    for caps in BOLD_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        fragments.push(Fragment::Plain(bulletize(&text[last..whole.start()])));
        fragments.push(Fragment::Bold(inner.as_str().to_string()));
        last = whole.end();
    }
    fragments.push(Fragment::Plain(bulletize(&text[last..])));

    RenderedDocument { fragments }
}

fn bulletize(text: &str) -> String {
    static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(^|\n)[*-]\s").unwrap());

    BULLET_RE.replace_all(text, "${1}• ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> Fragment {
        Fragment::Plain(text.into())
    }

    fn bold(text: &str) -> Fragment {
        Fragment::Bold(text.into())
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render("").fragments(), &[plain("")]);
    }

    #[test]
    fn test_text_without_markers_is_one_plain_fragment() {
        let text = "The function adds two numbers.\nNothing else.";
        assert_eq!(render(text).fragments(), &[plain(text)]);
    }

    #[test]
    fn test_leading_bold_heading() {
        assert_eq!(
            render("**Warning**: check this").into_fragments(),
            vec![plain(""), bold("Warning"), plain(": check this")]
        );
    }

    #[test]
    fn test_bullets_are_rewritten() {
        assert_eq!(
            render("- item one\n- item two").into_fragments(),
            vec![plain("• item one\n• item two")]
        );
        assert_eq!(
            render("Issues:\n* unused import").into_fragments(),
            vec![plain("Issues:\n• unused import")]
        );
    }

    #[test]
    fn test_bullet_marker_mid_line_is_kept() {
        let text = "a - b * c";
        assert_eq!(render(text).to_plain(), text);
    }

    #[test]
    fn test_bold_is_not_bulletized() {
        let doc = render("Intro\n**- not a bullet**\n- bullet");
        assert_eq!(
            doc.into_fragments(),
            vec![plain("Intro\n"), bold("- not a bullet"), plain("\n• bullet")]
        );
    }

    #[test]
    fn test_bullet_after_bold_on_new_line() {
        let doc = render("**Summary**\n* first\n* second");
        assert_eq!(
            doc.into_fragments(),
            vec![plain(""), bold("Summary"), plain("\n• first\n• second")]
        );
    }

    #[test]
    fn test_unclosed_bold_stays_literal() {
        let text = "**dangling emphasis";
        assert_eq!(render(text).fragments(), &[plain(text)]);
    }

    #[test]
    fn test_bold_does_not_span_lines() {
        let text = "**first\nsecond**";
        assert_eq!(render(text).fragments(), &[plain(text)]);
    }

    #[test]
    fn test_fragments_alternate() {
        let doc = render("**a** mid **b** end **c**");
        let kinds: Vec<bool> = doc.fragments().iter().map(Fragment::is_bold).collect();
        assert_eq!(kinds, vec![false, true, false, true, false, true, false]);
        assert_eq!(doc.to_plain(), "a mid b end c");
    }

    #[test]
    fn test_to_ansi_wraps_bold() {
        let doc = render("**Note** done");
        assert_eq!(doc.to_ansi(), "\x1b[1mNote\x1b[0m done");
    }

    #[test]
    fn test_serializes_kind_and_text() {
        let json = serde_json::to_string(&render("**Hi** there")).unwrap();
        assert_eq!(
            json,
            r#"[{"kind":"plain","text":""},{"kind":"bold","text":"Hi"},{"kind":"plain","text":" there"}]"#
        );
    }
}
