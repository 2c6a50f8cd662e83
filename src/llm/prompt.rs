/// Follow-up turn asking for a security and quality review of `code`.
pub fn vulnerability_prompt(code: &str) -> String {
    format!(
        "Analyze the following code for vulnerabilities and improvement suggestions:\n\n{code}"
    )
}

/// Single-turn request to rewrite `code` in `language`.
pub fn translation_prompt(code: &str, language: &str) -> String {
    format!("Translate this code to {language}:\n\n{code}")
}
