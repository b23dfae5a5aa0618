//! Answer extraction from raw inbound messages.
//!
//! A reply such as `"2. Yes, all good"` carries the question index as its first
//! all-digit word and the answer after the first period.
//!
//! Known ambiguity: a free-text answer that starts with a number (`"3 branches
//! visited"` sent without an index) is read as an answer to question 3. The
//! heuristic is kept as-is for compatibility with the respondents' reply format.

/// Question index and answer text pulled from one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<'a> {
    /// First standalone digit token, if any. Not range-checked.
    pub index: Option<usize>,
    pub answer: &'a str,
}

/// Run both extractors over `message`.
pub fn extract(message: &str) -> Extracted<'_> {
    Extracted {
        index: extract_question_index(message),
        answer: extract_answer_text(message),
    }
}

/// First whitespace-separated word made only of decimal digits once a single
/// trailing `.` is stripped.
///
/// Any Unicode decimal digit counts (`२`, `٣`, `３`), and scripts may mix within
/// a word. Digits inside a longer word (`abc123`, `2a`) never qualify, nor do
/// superscripts or other non-decimal numerals. Values too large for `usize`
/// saturate, which the caller rejects as out of range.
pub fn extract_question_index(message: &str) -> Option<usize> {
    message.split_whitespace().find_map(|word| {
        let word = word.strip_suffix('.').unwrap_or(word);
        if word.is_empty() {
            return None;
        }
        word.chars().try_fold(0usize, |acc, c| {
            let digit = decimal_digit_value(c)?;
            Some(
                acc.checked_mul(10)
                    .and_then(|v| v.checked_add(digit as usize))
                    .unwrap_or(usize::MAX),
            )
        })
    })
}

/// Code points of `0` for every run of ten decimal digits (general category Nd).
const DECIMAL_ZEROS: &[u32] = &[
    0x0030, 0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6,
    0x0C66, 0x0CE6, 0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0,
    0x1810, 0x1946, 0x19D0, 0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620,
    0xA8D0, 0xA900, 0xA9D0, 0xA9F0, 0xAA50, 0xABF0, 0xFF10, 0x104A0, 0x10D30, 0x11066,
    0x110F0, 0x11136, 0x111D0, 0x112F0, 0x11450, 0x114D0, 0x11650, 0x116C0, 0x11730,
    0x118E0, 0x11950, 0x11C50, 0x11D50, 0x11DA0, 0x11F50, 0x16A60, 0x16AC0, 0x16B50,
    0x1D7CE, 0x1D7D8, 0x1D7E2, 0x1D7EC, 0x1D7F6, 0x1E140, 0x1E2F0, 0x1E4F0, 0x1E950,
    0x1FBF0,
];

/// Numeric value of a decimal digit in any script.
fn decimal_digit_value(c: char) -> Option<u32> {
    let cp = c as u32;
    DECIMAL_ZEROS
        .iter()
        .find(|&&zero| (zero..zero + 10).contains(&cp))
        .map(|&zero| cp - zero)
}

/// Text after the first `.`, trimmed; the whole message trimmed when there is none.
pub fn extract_answer_text(message: &str) -> &str {
    match message.split_once('.') {
        Some((_, rest)) => rest.trim(),
        None => message.trim(),
    }
}
