use regex::Regex;
use std::sync::OnceLock;

/// Value transform applied after whitespace trimming
///
/// Transforms are selected by name in configuration. A transform that cannot
/// produce a value (regex without a match, text without a number) yields
/// `None`, which the extractor records as a miss.
#[derive(Debug, Clone, Default)]
pub enum Transform {
    /// Keep the trimmed text as-is
    #[default]
    Trim,

    /// Replace internal whitespace runs with a single space
    CollapseWhitespace,

    /// Capture group 1 if the pattern has one, otherwise the whole match
    ///
    /// When the pattern has groups but group 1 did not take part in the
    /// match, there is no value.
    Regex(Regex),

    /// First numeric token, rendered in canonical decimal form
    Number,
}

impl Transform {
    /// Names accepted in configuration
    pub const NAMES: &'static [&'static str] = &["trim", "collapse-whitespace", "regex", "number"];

    /// Applies the transform to already-trimmed text
    pub fn apply(&self, text: &str) -> Option<String> {
        let value = match self {
            Self::Trim => text.to_string(),
            Self::CollapseWhitespace => text.split_whitespace().collect::<Vec<_>>().join(" "),
            Self::Regex(re) => {
                let captures = re.captures(text)?;
                let group = if re.captures_len() > 1 { 1 } else { 0 };
                captures.get(group)?.as_str().trim().to_string()
            }
            Self::Number => parse_number(text)?,
        };

        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"-?\d[\d,]*(?:\.\d+)?").expect("number pattern is valid")
    })
}

/// Extracts the first number in `text`, dropping thousands separators
///
/// The token's digits are kept as written, so integers of any length
/// survive. Leading zeros of the integer part and trailing zeros of the
/// fraction are dropped, and a zero fraction is dropped entirely.
fn parse_number(text: &str) -> Option<String> {
    let token = number_pattern().find(text)?.as_str().replace(',', "");
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.as_str()),
    };

    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let integer = match integer.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let fraction = fraction.trim_end_matches('0');

    let mut number = String::with_capacity(token.len());
    if negative && (integer != "0" || !fraction.is_empty()) {
        number.push('-');
    }
    number.push_str(integer);
    if !fraction.is_empty() {
        number.push('.');
        number.push_str(fraction);
    }
    Some(number)
}
