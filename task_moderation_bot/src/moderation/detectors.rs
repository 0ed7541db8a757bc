//! Heuristics that don't need word lists: phone numbers and characters
//! that have no business in a task description.

use std::sync::LazyLock;

use regex::Regex;

/// Finds phone numbers, including ones people try to sneak past a filter:
/// `8 (999) 123-45-67`, `8оо 1 2 3`, `восемь девять 1 2 3` and so on.
///
/// Errs on the side of finding too much; a missed number is worse than a
/// refused message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhoneFinder {
    /// Digits, give or take noise, that make a phone number.
    pub min_digits: usize,
    /// Non-digit characters allowed between two digits of one number.
    pub max_gap: usize,
}

impl Default for PhoneFinder {
    fn default() -> Self {
        PhoneFinder {
            min_digits: 5,
            max_gap: 3,
        }
    }
}

impl PhoneFinder {
    pub fn contains_phone(&self, text: &str) -> bool {
        let mut digits = 0;
        let mut gap = 0;

        for word in text.split_whitespace() {
            // Look-alike letters only count in words that are otherwise digits,
            // or every "о" in a sentence would be a zero.
            let lookalikes_count = word.chars().any(|c| digit_value(c).is_some())
                && word.chars().all(|c| {
                    digit_value(c).is_some() || lookalike_digit(c).is_some() || is_separator(c)
                });

            // "восемь-девять" is two digits, same as "восемь девять".
            for piece in word.split(is_separator).filter(|piece| !piece.is_empty()) {
                let bare = piece
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase();
                if spelled_digit(&bare).is_some() {
                    digits += 1;
                    gap = 0;
                    if digits >= self.min_digits {
                        return true;
                    }
                    continue;
                }

                for c in piece.chars() {
                    let is_digit = digit_value(c).is_some()
                        || (lookalikes_count && lookalike_digit(c).is_some());
                    if is_digit {
                        digits += 1;
                        gap = 0;
                        if digits >= self.min_digits {
                            return true;
                        }
                    } else {
                        gap += 1;
                        if gap > self.max_gap {
                            digits = 0;
                        }
                    }
                }
            }
        }

        false
    }
}

/// [`PhoneFinder::contains_phone`] with default settings.
pub fn phone_finder(text: &str) -> bool {
    PhoneFinder::default().contains_phone(text)
}

/// Value of a character that is a digit in any of the forms people
/// actually type: plain, fullwidth, mathematical, circled, superscript.
fn digit_value(c: char) -> Option<u32> {
    let code = c as u32;
    match c {
        '0'..='9' => c.to_digit(10),
        '０'..='９' => Some(code - '０' as u32),
        '\u{1D7CE}'..='\u{1D7FF}' => Some((code - 0x1D7CE) % 10),
        '①'..='⑨' => Some(code - '①' as u32 + 1),
        '⓪' => Some(0),
        '⁰' => Some(0),
        '¹' => Some(1),
        '²' => Some(2),
        '³' => Some(3),
        '⁴'..='⁹' => Some(code - '⁴' as u32 + 4),
        _ => None,
    }
}

/// Letters that pass for digits, latin and cyrillic alike.
fn lookalike_digit(c: char) -> Option<u32> {
    match c {
        'o' | 'O' | 'о' | 'О' => Some(0),
        'l' | 'I' | 'і' | 'І' | '|' => Some(1),
        'з' | 'З' => Some(3),
        'ч' | 'Ч' => Some(4),
        'б' | 'Б' => Some(6),
        'B' | 'В' | 'в' => Some(8),
        _ => None,
    }
}

fn is_separator(c: char) -> bool {
    matches!(
        c,
        '-' | '–' | '—' | '.' | ',' | '(' | ')' | '+' | '_' | '/' | '\\' | '*' | ':'
    ) || c.is_whitespace()
}

fn spelled_digit(word: &str) -> Option<u32> {
    Some(match word {
        "ноль" | "нуль" | "zero" => 0,
        "один" | "одна" | "one" => 1,
        "два" | "две" | "two" => 2,
        "три" | "three" => 3,
        "четыре" | "four" => 4,
        "пять" | "five" => 5,
        "шесть" | "six" => 6,
        "семь" | "seven" => 7,
        "восемь" | "eight" => 8,
        "девять" | "nine" => 9,
        _ => return None,
    })
}

/// Typographic variants people use to slip past word lists: zero-width
/// and formatting characters, combining marks, letterlike and enclosed
/// symbols, fullwidth forms and mathematical alphanumerics.
static DISALLOWED_SYMBOLS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        r"\x{200B}-\x{200F}\x{2060}-\x{2064}\x{FEFF}\x{00AD}",
        r"\x{0300}-\x{036F}",
        r"\x{1D00}-\x{1DBF}",
        // Letter-shaped letterlike symbols only; №, ℃, ™ and friends are
        // ordinary punctuation here.
        r"\x{2102}\x{2107}\x{210A}-\x{2113}\x{2115}\x{2119}-\x{211D}\x{2124}",
        r"\x{2128}\x{212A}-\x{212D}\x{212F}-\x{2139}\x{213C}-\x{213F}\x{2145}-\x{2149}",
        r"\x{2460}-\x{24FF}",
        r"\x{FF01}-\x{FF5E}",
        r"\x{1D400}-\x{1D7FF}",
        r"\x{1F100}-\x{1F1FF}",
        "]"
    ))
    .expect("Regex will always be valid")
});

/// Flags latin letters and disguised characters in text that is supposed
/// to be written in cyrillic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidCharsDetector {
    /// Lowercase latin letters that are fine to use.
    allowed_latin: String,
}

impl InvalidCharsDetector {
    pub fn new(allowed_latin: &str) -> Self {
        InvalidCharsDetector {
            allowed_latin: allowed_latin.to_lowercase(),
        }
    }

    pub fn contains_invalid_chars(&self, text: &str) -> bool {
        text.chars().any(|c| {
            is_latin_letter(c)
                && !c
                    .to_lowercase()
                    .all(|lower| self.allowed_latin.contains(lower))
        }) || DISALLOWED_SYMBOLS.is_match(text)
    }
}

/// [`InvalidCharsDetector::contains_invalid_chars`] with no latin letters allowed.
pub fn contains_invalid_chars(text: &str) -> bool {
    InvalidCharsDetector::default().contains_invalid_chars(text)
}

fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
        || (c.is_alphabetic() && matches!(c, '\u{00C0}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}'))
}
