//! Deterministic cleanup of recognizer output.

use std::borrow::Cow;

use super::patterns::*;

/// Punctuation that gets a trailing space before following text.
const SPACED_PUNCTUATION: [char; 6] = [',', '.', ';', ':', '!', '?'];

/// Upper bound on cleanup passes over one text.
const MAX_PASSES: usize = 8;

/// Rewrites OCR text into a stable form for pattern matching.
///
/// Line breaks are kept so that paragraphs survive; all other whitespace
/// runs are collapsed. The transformation is idempotent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a page of recognized text.
    pub fn normalize(&self, text: &str) -> String {
        // A rule can expose new matches for an earlier one; repeat until stable
        let mut current = normalize_pass(text);
        for _ in 1..MAX_PASSES {
            let next = normalize_pass(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

fn normalize_pass(text: &str) -> String {
    let text = text
        .replace("\r\n", "\n")
        .replace('_', " ")
        .replace('\u{000C}', " ");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");

    let text = fix_lone_tokens(&text);
    let text = fix_vocabulary(&text);

    let text = MONTH_DATE.replace_all(&text, "$1/$2/$3");
    let text = MERIDIEM.replace_all(&text, "$1 $2");

    let text = text.replace('[', "(").replace(']', ")");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");

    text.split('\n')
        .map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn normalize_line(line: &str) -> String {
    let line = line.trim();
    if line.is_empty() {
        return String::new();
    }

    let line = MERGED_WORDS.replace_all(line, "$1 $2");
    let line = SPACE_BEFORE_PUNCT.replace_all(&line, "$1");
    let line = CURRENCY_AMOUNT.replace_all(&line, "RD$$ ${1}");
    let line = SPACED_DATE.replace_all(&line, "$1/$2/$3");

    // Splitting merged words can expose new standalone tokens.
    // Punctuation spacing runs last: its digit exemption depends on them.
    let line = fix_lone_tokens(&line);
    space_after_punctuation(&line).trim().to_string()
}

fn fix_lone_tokens(text: &str) -> String {
    let text = LONE_ZERO.replace_all(text, "O");
    let text = LONE_CAPITAL_I.replace_all(&text, "1");
    LONE_LOWER_L.replace_all(&text, "1").into_owned()
}

fn fix_vocabulary(text: &str) -> String {
    let text = INSCRIPTION_WORD.replace_all(text, "Inscrip$1");
    let text = NUMBER_SIGN.replace_all(&text, "No. ");
    let text = CEDULA_WORD.replace_all(&text, "CÉDULA");
    let text = NUMERO_WORD.replace_all(&text, "Número");
    REGISTRO_WORD.replace_all(&text, "REGISTR$1").into_owned()
}

/// Insert a space after punctuation glued to the next word.
///
/// Decimal separators and times (digit, punctuation, digit) are left
/// alone, as are punctuation runs.
fn space_after_punctuation(line: &str) -> Cow<'_, str> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len() + 8);
    let mut changed = false;

    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        if !SPACED_PUNCTUATION.contains(&c) {
            continue;
        }

        let Some(&next) = chars.get(i + 1) else {
            continue;
        };
        if next.is_whitespace() || SPACED_PUNCTUATION.contains(&next) || next == ')' || next == ']' {
            continue;
        }
        let between_digits = i > 0 && chars[i - 1].is_ascii_digit() && next.is_ascii_digit();
        if !between_digits {
            out.push(' ');
            changed = true;
        }
    }

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(line)
    }
}
