use regex::Regex;
use std::collections::HashSet;

const CODE_FENCE_PATTERN: &str = r"(?s)```.*?```";

/// Escapes HTML in markdown content while leaving fenced code blocks
/// (```) untouched. Entities are decoded first so already-escaped input
/// is not escaped twice.
pub fn sanitize_markdown_content(markdown_input: &str) -> String {
    let code_block_regex = match Regex::new(CODE_FENCE_PATTERN) {
        Ok(re) => re,
        Err(e) => {
            log::error!("Code fence pattern failed to compile: {}", e);
            return escape_text(markdown_input);
        }
    };

    let mut code_blocks: Vec<String> = Vec::new();
    let with_placeholders = code_block_regex.replace_all(markdown_input, |caps: &regex::Captures| {
        code_blocks.push(caps[0].to_string());
        format!("__CODE_BLOCK_PLACEHOLDER_{}__", code_blocks.len() - 1)
    });

    let mut final_output = escape_text(&with_placeholders);
    for (i, block) in code_blocks.iter().enumerate() {
        let placeholder = format!("__CODE_BLOCK_PLACEHOLDER_{}__", i);
        final_output = final_output.replacen(&placeholder, block, 1);
    }

    final_output
}

fn escape_text(input: &str) -> String {
    let decoded = html_escape::decode_html_entities(input);
    html_escape::encode_text(&decoded).to_string()
}

/// Removes every HTML tag, for single-line fields like titles and excerpts.
pub fn strip_all_html(input: &str) -> String {
    ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

/// `strip_all_html` plus surrounding whitespace.
pub fn clean_plain_text(input: &str) -> String {
    strip_all_html(input).trim().to_string()
}
