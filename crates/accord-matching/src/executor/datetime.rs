//! Date and time validation against `yyyy-MM-dd` style patterns.
//!
//! Patterns use the letter conventions of contract files and are translated into chrono
//! [`Item`]s. Only validation is needed, so a value is accepted when chrono can consume all of it
//! and the fields it read are consistent.

use chrono::format::{parse, Fixed, Item, Numeric, Pad, ParseErrorKind, Parsed};

/// Translate a pattern into chrono format items.
pub fn pattern_items(pattern: &str) -> Result<Vec<Item<'static>>, String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut items = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            let mut literal = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err(format!("unterminated quote in pattern '{pattern}'")),
                    Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                        literal.push('\'');
                        i += 2;
                    }
                    Some('\'') => {
                        i += 1;
                        break;
                    }
                    Some(other) => {
                        literal.push(*other);
                        i += 1;
                    }
                }
            }
            if literal.is_empty() {
                literal.push('\'');
            }
            items.push(Item::OwnedLiteral(literal.into_boxed_str()));
            continue;
        }

        if c.is_ascii_alphabetic() {
            let start = i;
            while i < chars.len() && chars[i] == c {
                i += 1;
            }
            items.push(letter_item(c, i - start, pattern)?);
            continue;
        }

        if c.is_whitespace() {
            items.push(Item::OwnedSpace(c.to_string().into_boxed_str()));
        } else {
            items.push(Item::OwnedLiteral(c.to_string().into_boxed_str()));
        }
        i += 1;
    }

    Ok(items)
}

fn letter_item(letter: char, count: usize, pattern: &str) -> Result<Item<'static>, String> {
    let numeric = |n: Numeric| Ok(Item::Numeric(n, Pad::Zero));
    let fixed = |f: Fixed| Ok(Item::Fixed(f));
    match letter {
        'y' | 'u' if count == 2 => numeric(Numeric::YearMod100),
        'y' | 'u' => numeric(Numeric::Year),
        'Y' => numeric(Numeric::IsoYear),
        'M' | 'L' if count <= 2 => numeric(Numeric::Month),
        'M' | 'L' if count == 3 => fixed(Fixed::ShortMonthName),
        'M' | 'L' => fixed(Fixed::LongMonthName),
        'd' => numeric(Numeric::Day),
        'D' => numeric(Numeric::Ordinal),
        'w' => numeric(Numeric::IsoWeek),
        'E' if count <= 3 => fixed(Fixed::ShortWeekdayName),
        'E' => fixed(Fixed::LongWeekdayName),
        'e' | 'c' => numeric(Numeric::WeekdayFromMon),
        'a' => fixed(Fixed::UpperAmPm),
        'H' | 'k' => numeric(Numeric::Hour),
        'h' | 'K' => numeric(Numeric::Hour12),
        'm' => numeric(Numeric::Minute),
        's' => numeric(Numeric::Second),
        'S' | 'n' => numeric(Numeric::Nanosecond),
        'X' => fixed(Fixed::TimezoneOffsetColonZ),
        'x' => fixed(Fixed::TimezoneOffsetColon),
        'Z' if count >= 5 => fixed(Fixed::TimezoneOffsetColonZ),
        'Z' => fixed(Fixed::TimezoneOffset),
        'z' | 'V' | 'G' | 'O' => fixed(Fixed::TimezoneName),
        other => Err(format!(
            "unsupported pattern letter '{other}' in pattern '{pattern}'"
        )),
    }
}

/// Check `value` against `pattern`, returning a reason when it does not conform.
pub fn validate(value: &str, pattern: &str) -> Result<(), String> {
    let items = pattern_items(pattern)?;
    let mut parsed = Parsed::new();
    parse(&mut parsed, value, items.iter())
        .map_err(|e| format!("Unable to parse the date: {value} ({e})"))?;

    for check in [
        parsed.to_naive_date().map(|_| ()),
        parsed.to_naive_time().map(|_| ()),
    ] {
        if let Err(e) = check {
            if e.kind() != ParseErrorKind::NotEnough {
                return Err(format!("Unable to parse the date: {value} ({e})"));
            }
        }
    }
    Ok(())
}
