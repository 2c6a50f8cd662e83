/// Pull the translated code out of a model reply.
///
/// Takes the body of the first fenced block: everything after the line that
/// opens the fence (so a language tag is dropped) up to the next fence. A
/// reply with no complete fenced block is returned trimmed, as is.
pub fn extract_translation(response: &str) -> String {
    extract_fenced_block(response)
        .unwrap_or(response)
        .trim()
        .to_string()
}

fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_backticks = start + 3;
    let content_start = after_backticks + text[after_backticks..].find('\n')? + 1;
    let end = text[content_start..].find("```")?;
    Some(&text[content_start..content_start + end])
}
