//! Answer and code extraction from model output.
//!
//! Every extractor resolves ambiguity with the same deterministic tie-break:
//! the first match wins. Extraction failure is reported as `None`, never as
//! an error; scoring degrades to 0.0 instead of stalling a batch.

use regex::Regex;

/// Content of the first `\boxed{...}` in `text`, with nested braces kept
/// balanced (`\boxed{\frac{1}{2}}` yields `\frac{1}{2}`).
pub fn extract_boxed_answer(text: &str) -> Option<String> {
    let start = text.find("\\boxed{")? + "\\boxed{".len();
    let mut depth = 1usize;
    for (i, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + i].trim().to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Trailer of the first `#### ` marker (the gsm8k gold-answer format),
/// with thousands separators stripped.
pub fn extract_hash_answer(text: &str) -> Option<String> {
    let idx = text.find("####")?;
    let tail = text[idx + "####".len()..].trim();
    if tail.is_empty() {
        return None;
    }
    // The gold value is the remainder of the line the marker sits on.
    let value = tail.lines().next().unwrap_or(tail).trim();
    if value.is_empty() {
        return None;
    }
    Some(value.replace(',', ""))
}

/// Body of the first fenced code block. The language tag is optional and
/// discarded.
pub fn extract_code_block(text: &str) -> Option<String> {
    let re = Regex::new(r"(?s)```[a-zA-Z0-9_+-]*\n(.*?)```").ok()?;
    let caps = re.captures(text)?;
    let body = caps.get(1)?.as_str().trim();
    if body.is_empty() {
        return None;
    }
    Some(body.to_string())
}

/// First token in a judge reply that looks like a score between 0 and 1,
/// optionally with a fractional part. `"The score is 0.8 out of 1.0"`
/// yields `0.8`; a reply with no such token yields `None`.
pub fn extract_judge_score(text: &str) -> Option<f32> {
    let re = Regex::new(r"([0-1](?:\.\d+)?)").ok()?;
    let caps = re.captures(text)?;
    caps.get(1)?.as_str().parse::<f32>().ok()
}

/// Canonical form used for string comparison of answers: trimmed,
/// lowercased, currency/thousands markup and a trailing period removed.
pub fn normalize_answer(text: &str) -> String {
    text.trim()
        .trim_end_matches('.')
        .replace([',', '$'], "")
        .to_lowercase()
}

/// Numeric-tolerant equality. `None` when either side does not parse as a
/// number after normalization.
pub fn numeric_equal(a: &str, b: &str) -> Option<bool> {
    let x: f64 = normalize_answer(a).parse().ok()?;
    let y: f64 = normalize_answer(b).parse().ok()?;
    Some((x - y).abs() <= 1e-6 * y.abs().max(1.0))
}

/// Gold-answer comparison used by the math rewards: numeric equality first,
/// normalized string equality as the fallback.
pub fn answers_match(got: &str, want: &str) -> bool {
    match numeric_equal(got, want) {
        Some(eq) => eq,
        None => normalize_answer(got) == normalize_answer(want),
    }
}
