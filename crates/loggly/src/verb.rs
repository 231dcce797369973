// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! printf-style rendering of JSON values.
//!
//! Template tokens may carry a verb such as `%04d`, `%-8s`, `%.2f` or `%#x`.
//! A verb is made of optional flags (`#`, `+`, `-`, `0`), an optional width,
//! an optional `.precision` and a single conversion letter. A space always ends
//! a template token, so there is no space flag.

use std::fmt;
use std::str::FromStr;

use serde_json::{Number, Value};

/// Conversion used when a token carries no verb.
pub const DEFAULT_CONVERSION: char = 'v';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// `#`: alternate form (`0x`, `0b`, leading `0`, quoted strings for `%#v`).
    pub alternate: bool,
    /// `+`: always print a sign for numbers.
    pub plus: bool,
    /// `-`: pad on the right.
    pub left: bool,
    /// `0`: pad numbers with leading zeros after the sign.
    pub zero: bool,
}

/// A parsed printf verb such as `04d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verb {
    pub flags: Flags,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub conversion: char,
}

impl Default for Verb {
    fn default() -> Self {
        Verb {
            flags: Flags::default(),
            width: None,
            precision: None,
            conversion: DEFAULT_CONVERSION,
        }
    }
}

impl FromStr for Verb {
    type Err = String;

    /// Parses the part of a verb that follows `%`, e.g. `04d`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars().peekable();
        let mut flags = Flags::default();

        while let Some(&c) = chars.peek() {
            match c {
                '#' => flags.alternate = true,
                '+' => flags.plus = true,
                '-' => flags.left = true,
                '0' => flags.zero = true,
                _ => break,
            }
            chars.next();
        }

        let width = take_number(&mut chars);

        let precision = if chars.peek() == Some(&'.') {
            chars.next();
            Some(take_number(&mut chars).unwrap_or(0))
        } else {
            None
        };

        let conversion = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => c,
            Some(c) => return Err(format!("invalid conversion '{c}' in verb '%{s}'")),
            None => return Err(format!("missing conversion in verb '%{s}'")),
        };

        if let Some(rest) = chars.next() {
            return Err(format!("unexpected '{rest}' after verb '%{s}'"));
        }

        Ok(Verb {
            flags,
            width,
            precision,
            conversion,
        })
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("%")?;
        if self.flags.alternate {
            f.write_str("#")?;
        }
        if self.flags.plus {
            f.write_str("+")?;
        }
        if self.flags.left {
            f.write_str("-")?;
        }
        if self.flags.zero {
            f.write_str("0")?;
        }
        if let Some(width) = self.width {
            write!(f, "{width}")?;
        }
        if let Some(precision) = self.precision {
            write!(f, ".{precision}")?;
        }
        write!(f, "{}", self.conversion)
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits.parse().ok()
}

/// The "default string form" of a value, i.e. what `%v` prints.
///
/// Strings are printed raw, `null` as `<nil>`, arrays and objects as compact JSON.
#[must_use]
pub fn default_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "<nil>".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Renders `value` according to `verb`.
///
/// A verb that does not apply to the value's kind renders as
/// `%!<conversion>(<default form>)`.
#[must_use]
pub fn render(value: &Value, verb: &Verb) -> String {
    let rendered = match verb.conversion {
        'v' => Some(render_default(value, verb)),
        's' => render_string(value, verb),
        'q' => render_quoted(value),
        't' => value.as_bool().map(|b| b.to_string()),
        'd' | 'b' | 'o' | 'x' | 'X' => render_integer(value, verb),
        'e' | 'E' | 'f' | 'F' | 'g' | 'G' => render_float(value, verb),
        _ => None,
    };

    match rendered {
        Some(body) => pad(body, verb),
        None => format!("%!{}({})", verb.conversion, default_form(value)),
    }
}

fn render_default(value: &Value, verb: &Verb) -> String {
    match value {
        Value::String(s) if verb.flags.alternate => quote(s),
        Value::Number(n) => with_sign(n.to_string(), n.as_f64().is_some_and(|f| f < 0.0), verb),
        _ => default_form(value),
    }
}

fn render_string(value: &Value, verb: &Verb) -> Option<String> {
    let s = match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
        _ => return None,
    };
    Some(match verb.precision {
        Some(precision) => s.chars().take(precision).collect(),
        None => s,
    })
}

fn render_quoted(value: &Value) -> Option<String> {
    value.as_str().map(quote)
}

fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn integer_parts(n: &Number) -> Option<(bool, u128)> {
    if let Some(u) = n.as_u64() {
        return Some((false, u128::from(u)));
    }
    n.as_i64()
        .map(|i| (i < 0, u128::from(i.unsigned_abs())))
}

fn render_integer(value: &Value, verb: &Verb) -> Option<String> {
    if let (Value::String(s), 'x' | 'X') = (value, verb.conversion) {
        let hex: String = s.bytes().map(|b| format!("{b:02x}")).collect();
        return Some(if verb.conversion == 'X' {
            hex.to_uppercase()
        } else {
            hex
        });
    }

    let (negative, magnitude) = integer_parts(value.as_number()?)?;

    let (digits, prefix) = match verb.conversion {
        'd' => (magnitude.to_string(), ""),
        'b' => (format!("{magnitude:b}"), "0b"),
        'o' => (format!("{magnitude:o}"), "0"),
        'x' => (format!("{magnitude:x}"), "0x"),
        'X' => (format!("{magnitude:X}"), "0X"),
        _ => return None,
    };

    let body = if verb.flags.alternate && !(prefix == "0" && digits == "0") {
        format!("{prefix}{digits}")
    } else {
        digits
    };

    Some(with_sign(body, negative, verb))
}

fn render_float(value: &Value, verb: &Verb) -> Option<String> {
    let f = value.as_number()?.as_f64()?;
    let negative = f.is_sign_negative() && f != 0.0;
    let magnitude = f.abs();

    let body = match verb.conversion {
        'f' | 'F' => format!("{:.*}", verb.precision.unwrap_or(6), magnitude),
        'e' => exponent_form(magnitude, verb.precision.unwrap_or(6)),
        'E' => exponent_form(magnitude, verb.precision.unwrap_or(6)).to_uppercase(),
        'g' => general_form(magnitude, verb.precision),
        'G' => general_form(magnitude, verb.precision).to_uppercase(),
        _ => return None,
    };

    Some(with_sign(body, negative, verb))
}

/// `1.500000e+00` style, two exponent digits minimum.
fn exponent_form(magnitude: f64, precision: usize) -> String {
    let raw = format!("{magnitude:.precision$e}");
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.abs())
        }
        None => raw,
    }
}

fn general_form(magnitude: f64, precision: Option<usize>) -> String {
    let Some(precision) = precision else {
        return magnitude.to_string();
    };
    let significant = precision.max(1);
    if magnitude == 0.0 {
        return "0".to_string();
    }

    let exponent = magnitude.log10().floor() as i32;
    if exponent < -4 || exponent >= significant as i32 {
        let form = exponent_form(magnitude, significant - 1);
        match form.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{exp}", trim_fraction(mantissa)),
            None => form,
        }
    } else {
        let decimals = (significant as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{magnitude:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn with_sign(body: String, negative: bool, verb: &Verb) -> String {
    let body = body.trim_start_matches('-').to_string();
    if negative {
        format!("-{body}")
    } else if verb.flags.plus {
        format!("+{body}")
    } else {
        body
    }
}

fn is_numeric_conversion(conversion: char) -> bool {
    matches!(
        conversion,
        'd' | 'b' | 'o' | 'x' | 'X' | 'e' | 'E' | 'f' | 'F' | 'g' | 'G' | 'v'
    )
}

fn pad(body: String, verb: &Verb) -> String {
    let Some(width) = verb.width else {
        return body;
    };
    let len = body.chars().count();
    if len >= width {
        return body;
    }
    let fill = width - len;

    if verb.flags.left {
        return format!("{body}{}", " ".repeat(fill));
    }

    let numeric = is_numeric_conversion(verb.conversion)
        && body
            .trim_start_matches(['-', '+'])
            .starts_with(|c: char| c.is_ascii_hexdigit());
    if verb.flags.zero && numeric {
        let sign_len = usize::from(body.starts_with(['-', '+']));
        let prefix_len = sign_len
            + ["0x", "0X", "0b"]
                .iter()
                .find(|p| body[sign_len..].starts_with(*p))
                .map_or(0, |p| p.len());
        let (head, tail) = body.split_at(prefix_len);
        return format!("{head}{}{tail}", "0".repeat(fill));
    }

    format!("{}{body}", " ".repeat(fill))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn r(value: Value, verb: &str) -> String {
        render(&value, &verb.parse().unwrap())
    }

    #[test]
    fn test_parse_verb() {
        let verb: Verb = "04d".parse().unwrap();
        assert!(verb.flags.zero);
        assert_eq!(verb.width, Some(4));
        assert_eq!(verb.precision, None);
        assert_eq!(verb.conversion, 'd');

        let verb: Verb = "-8.3f".parse().unwrap();
        assert!(verb.flags.left);
        assert_eq!(verb.width, Some(8));
        assert_eq!(verb.precision, Some(3));
        assert_eq!(verb.to_string(), "%-8.3f");
    }

    #[test]
    fn test_parse_invalid_verb() {
        assert!("".parse::<Verb>().is_err());
        assert!("04".parse::<Verb>().is_err());
        assert!("dd".parse::<Verb>().is_err());
        assert!(" d".parse::<Verb>().is_err());
    }

    #[test]
    fn test_default_form() {
        assert_eq!(default_form(&json!("<USERID>")), "<USERID>");
        assert_eq!(default_form(&json!(5)), "5");
        assert_eq!(default_form(&json!(1.5)), "1.5");
        assert_eq!(default_form(&json!(true)), "true");
        assert_eq!(default_form(&Value::Null), "<nil>");
        assert_eq!(default_form(&json!([1, "a"])), r#"[1,"a"]"#);
    }

    #[test]
    fn test_integers() {
        assert_eq!(r(json!(15), "04d"), "0015");
        assert_eq!(r(json!(-15), "05d"), "-0015");
        assert_eq!(r(json!(15), "+d"), "+15");
        assert_eq!(r(json!(15), "4d"), "  15");
        assert_eq!(r(json!(15), "-4d"), "15  ");
        assert_eq!(r(json!(255), "x"), "ff");
        assert_eq!(r(json!(255), "#X"), "0XFF");
        assert_eq!(r(json!(5), "b"), "101");
        assert_eq!(r(json!(8), "#o"), "010");
        assert_eq!(r(json!(255), "#06x"), "0x00ff");
    }

    #[test]
    fn test_floats() {
        assert_eq!(r(json!(1.23456), ".2f"), "1.23");
        assert_eq!(r(json!(2), "f"), "2.000000");
        assert_eq!(r(json!(-2.5), "08.2f"), "-0002.50");
        assert_eq!(r(json!(1234.5678), "e"), "1.234568e+03");
        assert_eq!(r(json!(0.00012), ".2E"), "1.20E-04");
        assert_eq!(r(json!(1234.5678), ".3g"), "1.23e+03");
        assert_eq!(r(json!(0.5), ".3g"), "0.5");
    }

    #[test]
    fn test_strings() {
        assert_eq!(r(json!("abc"), "s"), "abc");
        assert_eq!(r(json!("abcdef"), ".3s"), "abc");
        assert_eq!(r(json!("ab"), "5s"), "   ab");
        assert_eq!(r(json!("ab"), "-5s"), "ab   ");
        assert_eq!(r(json!("say \"hi\""), "q"), r#""say \"hi\"""#);
        assert_eq!(r(json!("hi"), "#v"), r#""hi""#);
        assert_eq!(r(json!("hi"), "x"), "6869");
    }

    #[test]
    fn test_bools() {
        assert_eq!(r(json!(true), "t"), "true");
        assert_eq!(r(json!(false), "v"), "false");
    }

    #[test]
    fn test_wrong_kind() {
        assert_eq!(r(json!(1.5), "d"), "%!d(1.5)");
        assert_eq!(r(json!("abc"), "d"), "%!d(abc)");
        assert_eq!(r(json!(5), "t"), "%!t(5)");
        assert_eq!(r(json!(5), "z"), "%!z(5)");
    }
}
