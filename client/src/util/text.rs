//! Text helpers for blog content: slugs, reading time, excerpts.

#[cfg(test)]
#[path = "text_test.rs"]
mod text_test;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

const WORDS_PER_MINUTE: usize = 200;
const MARKDOWN_NOISE: &[char] = &['#', '*', '_', '`', '>', '~', '[', ']'];

/// Convert a title into a URL slug: lowercase ASCII letters and digits joined
/// by single hyphens. Diacritics are stripped (`Đặc` becomes `dac`) and any
/// other punctuation is dropped. Applying it twice yields the same result.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_sep = false;

    for ch in input.nfd().filter(|c| !is_combining_mark(*c)) {
        let ch = match ch {
            'đ' | 'Đ' => 'd',
            other => other.to_ascii_lowercase(),
        };
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_sep = true;
        }
    }
    slug
}

/// Estimated minutes to read `content`, never less than one.
#[must_use]
pub fn reading_time_minutes(content: &str) -> usize {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

/// Plain-text preview of a markdown body, at most `max_chars` characters plus
/// a trailing ellipsis when truncated.
#[must_use]
pub fn excerpt(markdown: &str, max_chars: usize) -> String {
    let plain = strip_markdown(markdown);
    let collapsed = plain.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let cut: String = collapsed.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(' ') {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end_matches([',', '.', ';', ':', ' ']))
}

/// Drop emphasis/heading markers and link targets, keeping link text.
fn strip_markdown(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut chars = markdown.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ']' && chars.peek() == Some(&'(') {
            for skipped in chars.by_ref() {
                if skipped == ')' {
                    break;
                }
            }
            continue;
        }
        if ch == '!' && chars.peek() == Some(&'[') {
            continue;
        }
        if !MARKDOWN_NOISE.contains(&ch) {
            out.push(ch);
        }
    }
    out
}
