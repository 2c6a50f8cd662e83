mod common;

use codescope::llm::{ChatMessage, ChatRole, LlmError};
use codescope::{AnalysisError, Analyzer, Fragment, InputError};

use common::{default_languages, ScriptedModel};

const CODE: &str = "def add(a, b):\n    return a + b";

#[tokio::test]
async fn test_analyze_runs_one_conversation() {
    let model = ScriptedModel::replying(&[
        "**Purpose**\n- adds two numbers",
        "**Issues**\n* no type checks",
    ]);
    let analyzer = Analyzer::new(model, default_languages());

    let report = analyzer.analyze(&format!("  {CODE}\n\n")).await.unwrap();

    assert_eq!(
        report.analysis.fragments(),
        &[
            Fragment::Plain(String::new()),
            Fragment::Bold("Purpose".into()),
            Fragment::Plain("\n• adds two numbers".into()),
        ]
    );
    assert_eq!(report.vulnerabilities.to_plain(), "Issues\n• no type checks");
}

#[tokio::test]
async fn test_vulnerability_turn_carries_history() {
    let analyzer = Analyzer::new(
        ScriptedModel::replying(&["first answer", "second answer"]),
        default_languages(),
    );
    analyzer.analyze(CODE).await.unwrap();

    let model = analyzer_model_calls(&analyzer);
    assert_eq!(model.len(), 2);
    assert_eq!(model[0], vec![ChatMessage::user(CODE)]);

    let second = &model[1];
    assert_eq!(second.len(), 3);
    assert_eq!(second[1], ChatMessage::model("first answer"));
    assert_eq!(second[2].role, ChatRole::User);
    assert!(second[2]
        .content
        .starts_with("Analyze the following code for vulnerabilities and improvement suggestions:"));
    assert!(second[2].content.ends_with(CODE));
}

#[tokio::test]
async fn test_translate_extracts_code_in_fresh_conversation() {
    let analyzer = Analyzer::new(
        ScriptedModel::replying(&[
            "Here is the JavaScript version:\n```javascript\nfunction add(a, b) {\n  return a + b;\n}\n```\nLet me know!",
        ]),
        default_languages(),
    );

    let code = analyzer.translate(CODE, "javascript").await.unwrap();
    assert_eq!(code, "function add(a, b) {\n  return a + b;\n}");

    let calls = analyzer_model_calls(&analyzer);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 1);
    assert!(calls[0][0]
        .content
        .starts_with("Translate this code to JavaScript:\n\n"));
}

#[tokio::test]
async fn test_translate_without_fence_returns_reply() {
    let analyzer = Analyzer::new(
        ScriptedModel::replying(&["  puts a + b \n"]),
        default_languages(),
    );
    let code = analyzer.translate(CODE, "Ruby").await.unwrap();
    assert_eq!(code, "puts a + b");
}

#[tokio::test]
async fn test_rejected_input_never_reaches_model() {
    let analyzer = Analyzer::new(ScriptedModel::replying(&["unused"]), default_languages());

    let err = analyzer.analyze("   ").await.unwrap_err();
    assert!(matches!(err, AnalysisError::Input(InputError::Empty)));

    let err = analyzer.analyze("hello there").await.unwrap_err();
    assert!(matches!(err, AnalysisError::Input(InputError::NotCode)));

    let err = analyzer.translate(CODE, "Klingon").await.unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Input(InputError::UnsupportedLanguage(..))
    ));

    assert!(analyzer_model_calls(&analyzer).is_empty());
}

#[tokio::test]
async fn test_model_failure_is_surfaced() {
    let analyzer = Analyzer::new(
        ScriptedModel::new(vec![
            Ok("analysis".into()),
            Err(LlmError::Api {
                status: 500,
                body: "boom".into(),
            }),
        ]),
        default_languages(),
    );

    let err = analyzer.analyze(CODE).await.unwrap_err();
    assert_eq!(err.to_string(), "API error (500): boom");
}

fn analyzer_model_calls(analyzer: &Analyzer<ScriptedModel>) -> Vec<Vec<ChatMessage>> {
    analyzer.model().calls()
}
