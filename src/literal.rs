//! Decodificación de literales y clases de caracteres.
//!
//! El scanner valida las secuencias de escape al construir cada token,
//! por lo cual estas funciones reciben texto que en principio es
//! correcto. Aun así, cualquier defecto se reporta como error en vez de
//! asumirse imposible.
//!
//! # Secuencias de escape
//! `\a \b \f \n \r \t \v \\`, la comilla del literal, octal de tres
//! dígitos (hasta 255), `\x` con dos dígitos hexadecimales, `\u` con
//! cuatro y `\U` con ocho. Las secuencias `\x` y octales denotan la runa
//! con ese valor. Dentro de clases también se admiten `\]` y las clases
//! Unicode `\pL` y `\p{Nombre}`.

use std::{iter::Peekable, str::Chars};
use thiserror::Error;

/// Defecto en el contenido de un literal.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("literal is not quoted")]
    NotQuoted,

    #[error("unknown escape sequence")]
    UnknownEscape,

    #[error("escape sequence not terminated")]
    EscapeNotTerminated,

    #[error("escape sequence is invalid Unicode code point")]
    InvalidCodePoint,

    #[error("invalid range in character class: {0:?}-{1:?}")]
    InvalidRange(char, char),
}

/// Contenido de una clase de caracteres.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Class {
    pub chars: Vec<char>,
    pub ranges: Vec<(char, char)>,
    pub unicode_classes: Vec<String>,
    pub inverted: bool,
    pub ignore_case: bool,
}

/// Resultado de decodificar una sola runa.
enum Unit {
    Char(char),
    UnicodeClass(String),
}

/// Decodifica un literal entre comillas dobles, simples o acentos graves,
/// sin el sufijo `i`.
pub fn unquote(literal: &str) -> Result<String, LiteralError> {
    let mut chars = literal.chars();
    let quote = chars.next().ok_or(LiteralError::NotQuoted)?;
    if chars.next_back() != Some(quote) || !matches!(quote, '"' | '\'' | '`') {
        return Err(LiteralError::NotQuoted);
    }

    let body = chars.as_str();
    if quote == '`' {
        return Ok(body.replace('\r', ""));
    }

    let mut output = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match escape(&mut chars, quote)? {
                Unit::Char(c) => output.push(c),
                Unit::UnicodeClass(_) => return Err(LiteralError::UnknownEscape),
            },

            c => output.push(c),
        }
    }

    Ok(output)
}

/// Decodifica una clase `[...]`, con sufijo `i` opcional.
pub fn class(raw: &str) -> Result<Class, LiteralError> {
    let mut class = Class::default();

    let mut body = raw;
    if let Some(stripped) = body.strip_suffix('i') {
        class.ignore_case = true;
        body = stripped;
    }

    let body = body
        .strip_prefix('[')
        .and_then(|body| body.strip_suffix(']'))
        .ok_or(LiteralError::NotQuoted)?;

    let body = match body.strip_prefix('^') {
        Some(body) => {
            class.inverted = true;
            body
        }

        None => body,
    };

    let mut runes = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match escape(&mut chars, ']')? {
                Unit::Char(c) => runes.push(c),
                Unit::UnicodeClass(name) => class.unicode_classes.push(name),
            },

            c => runes.push(c),
        }
    }

    // Un `-` entre dos runas forma un rango, salvo al inicio, al final o
    // inmediatamente después de otro rango
    let mut was_range = false;
    let mut i = 0;

    while i < runes.len() {
        let c = runes[i];
        let opens_range = c == '-' && !was_range && !class.chars.is_empty() && i + 1 < runes.len();

        if opens_range {
            let low = class.chars.pop().unwrap_or(c);
            let high = runes[i + 1];
            if low > high {
                return Err(LiteralError::InvalidRange(low, high));
            }

            class.ranges.push((low, high));
            was_range = true;
            i += 2;
        } else {
            class.chars.push(c);
            was_range = false;
            i += 1;
        }
    }

    Ok(class)
}

/// Decodifica una secuencia de escape cuyo `\` ya fue consumido.
fn escape(chars: &mut Peekable<Chars<'_>>, quote: char) -> Result<Unit, LiteralError> {
    let c = chars.next().ok_or(LiteralError::EscapeNotTerminated)?;

    let (digits, radix, max) = match c {
        'a' => return Ok(Unit::Char('\x07')),
        'b' => return Ok(Unit::Char('\x08')),
        'f' => return Ok(Unit::Char('\x0c')),
        'n' => return Ok(Unit::Char('\n')),
        'r' => return Ok(Unit::Char('\r')),
        't' => return Ok(Unit::Char('\t')),
        'v' => return Ok(Unit::Char('\x0b')),
        '\\' => return Ok(Unit::Char('\\')),
        c if c == quote => return Ok(Unit::Char(c)),

        'p' if quote == ']' => return unicode_class(chars),

        '0'..='7' => {
            let mut value = c.to_digit(8).unwrap_or(0);
            for _ in 0..2 {
                let digit = chars
                    .next()
                    .and_then(|c| c.to_digit(8))
                    .ok_or(LiteralError::EscapeNotTerminated)?;

                value = value * 8 + digit;
            }

            return code_point(value, 255);
        }

        'x' => (2, 16, 255),
        'u' => (4, 16, char::MAX as u32),
        'U' => (8, 16, char::MAX as u32),
        _ => return Err(LiteralError::UnknownEscape),
    };

    let mut value = 0u32;
    for _ in 0..digits {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(radix))
            .ok_or(LiteralError::EscapeNotTerminated)?;

        value = value.checked_mul(radix).ok_or(LiteralError::InvalidCodePoint)? + digit;
    }

    code_point(value, max)
}

fn code_point(value: u32, max: u32) -> Result<Unit, LiteralError> {
    if value > max {
        return Err(LiteralError::InvalidCodePoint);
    }

    char::from_u32(value)
        .map(Unit::Char)
        .ok_or(LiteralError::InvalidCodePoint)
}

/// `\pL` o `\p{Nombre}`, con `\p` ya consumido.
fn unicode_class(chars: &mut Peekable<Chars<'_>>) -> Result<Unit, LiteralError> {
    match chars.next() {
        Some('{') => {
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => name.push(c),
                    None => return Err(LiteralError::EscapeNotTerminated),
                }
            }

            Ok(Unit::UnicodeClass(name))
        }

        Some(letter) => Ok(Unit::UnicodeClass(letter.to_string())),
        None => Err(LiteralError::EscapeNotTerminated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquotes_escapes() {
        assert_eq!(unquote(r#""a\tb\\c""#).unwrap(), "a\tb\\c");
        assert_eq!(unquote(r#""\x41\101ñ\U0001F600""#).unwrap(), "AAñ😀");
        assert_eq!(unquote(r#"'\''"#).unwrap(), "'");
        assert_eq!(unquote(r#""\"""#).unwrap(), "\"");
        assert_eq!(unquote("`a\\n\r\nb`").unwrap(), "a\\n\nb");
    }

    #[test]
    fn rejects_bad_escapes() {
        assert_eq!(unquote(r#""\q""#), Err(LiteralError::UnknownEscape));
        assert_eq!(unquote(r#""\'""#), Err(LiteralError::UnknownEscape));
        assert_eq!(unquote(r#""\ud800""#), Err(LiteralError::InvalidCodePoint));
        assert_eq!(unquote(r#""\x4""#), Err(LiteralError::EscapeNotTerminated));
        assert_eq!(unquote("abc"), Err(LiteralError::NotQuoted));
    }

    #[test]
    fn splits_chars_and_ranges() {
        let class = class("[a-z_0-9-]").unwrap();
        assert_eq!(class.chars, vec!['_', '-']);
        assert_eq!(class.ranges, vec![('a', 'z'), ('0', '9')]);
        assert!(!class.inverted && !class.ignore_case);
    }

    #[test]
    fn leading_dash_and_chained_dash_are_chars() {
        let class = class("[-a-c-e]").unwrap();
        assert_eq!(class.chars, vec!['-', '-', 'e']);
        assert_eq!(class.ranges, vec![('a', 'c')]);
    }

    #[test]
    fn reads_inversion_case_and_unicode_classes() {
        let class = class(r"[^\pL\p{Greek}\]x]i").unwrap();
        assert!(class.inverted);
        assert!(class.ignore_case);
        assert_eq!(class.unicode_classes, vec!["L", "Greek"]);
        assert_eq!(class.chars, vec![']', 'x']);
    }

    #[test]
    fn rejects_inverted_ranges() {
        assert_eq!(class("[z-a]"), Err(LiteralError::InvalidRange('z', 'a')));
    }
}
