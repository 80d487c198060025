//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del generador. Descompone el texto de una
//! gramática en unidades léxicas denominadas tokens. Los espacios y
//! tabuladores se descartan, pero los saltos de línea y los comentarios
//! se emiten como tokens: los saltos de línea pueden separar reglas y el
//! parser decide qué hacer con los comentarios.
//!
//! # Contenido de un token
//! Todo token conserva su lexema original. Los literales no se
//! decodifican aquí, pero sus secuencias de escape sí se validan, de
//! forma que fases posteriores pueden decodificarlos con [`crate::literal`]
//! sin más verificaciones.
//!
//! # Errores
//! El scanner nunca se detiene ante un error. Cada error se reporta a un
//! [`ErrorSink`] con su ubicación y el escaneo continúa, posiblemente con
//! un token parcial o de tipo [`TokenKind::Invalid`].

use crate::{
    literal::{self, LiteralError},
    source::{Located, Location, Position, Source},
};

use std::{
    fmt::{self, Display},
    rc::Rc,
};

use thiserror::Error;

/// Identificadores que no se pueden usar como nombres.
const RESERVED: &[&str] = &["code", "false", "nil", "true"];

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("illegal identifier {0:?}")]
    IllegalIdentifier(String),

    #[error("rule definition not terminated")]
    RuleDefNotTerminated,

    #[error("rune literal not terminated")]
    CharNotTerminated,

    #[error("rune literal is not a single rune")]
    NotSingleRune,

    #[error("string literal not terminated")]
    StringNotTerminated,

    #[error("raw string literal not terminated")]
    RawStringNotTerminated,

    #[error("character class not terminated")]
    ClassNotTerminated,

    #[error("code block not terminated")]
    CodeNotTerminated,

    #[error("comment not terminated")]
    CommentNotTerminated,

    #[error("escape sequence not terminated")]
    EscapeNotTerminated,

    #[error("unknown escape sequence")]
    UnknownEscape,

    #[error("escape sequence is invalid Unicode code point")]
    InvalidCodePoint,

    #[error("illegal character {} in escape sequence", describe(*.0))]
    IllegalEscapeChar(char),

    #[error("empty Unicode character class escape sequence")]
    EmptyUnicodeClass,

    /// Un rango de clase cuyo inicio es mayor a su fin, como `[z-a]`.
    #[error(transparent)]
    InvalidRange(LiteralError),

    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("invalid character {}", describe(*.0))]
    InvalidChar(char),
}

/// Tipo de token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Invalid,
    Eof,
    Ident,

    /// `=`, `<-`, `←` o `⟵`.
    RuleDef,

    Char,
    Str,
    RawStr,
    Class,
    Code,
    LineComment,
    MultilineComment,

    /// `:`
    Colon,

    /// `;`
    Semicolon,

    /// `(`
    LParen,

    /// `)`
    RParen,

    /// `.`
    Dot,

    /// `&`
    Ampersand,

    /// `!`
    Exclamation,

    /// `?`
    Question,

    /// `+`
    Plus,

    /// `*`
    Star,

    /// `/`
    Slash,

    Eol,
}

impl TokenKind {
    /// Tipo de un token de puntuación.
    fn punctuation(c: char) -> Option<Self> {
        use TokenKind::*;

        let kind = match c {
            ':' => Colon,
            ';' => Semicolon,
            '(' => LParen,
            ')' => RParen,
            '.' => Dot,
            '&' => Ampersand,
            '!' => Exclamation,
            '?' => Question,
            '+' => Plus,
            '*' => Star,
            '/' => Slash,
            '\n' => Eol,
            _ => return None,
        };

        Some(kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;

        let string = match self {
            Invalid => "invalid token",
            Eof => "end of file",
            Ident => "identifier",
            RuleDef => "rule definition",
            Char => "character literal",
            Str => "string literal",
            RawStr => "raw string literal",
            Class => "character class",
            Code => "code block",
            LineComment => "comment",
            MultilineComment => "multiline comment",
            Colon => "`:`",
            Semicolon => "`;`",
            LParen => "`(`",
            RParen => "`)`",
            Dot => "`.`",
            Ampersand => "`&`",
            Exclamation => "`!`",
            Question => "`?`",
            Plus => "`+`",
            Star => "`*`",
            Slash => "`/`",
            Eol => "end of line",
        };

        fmt.write_str(string)
    }
}

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Ident | TokenKind::Invalid => write!(fmt, "{} `{}`", self.kind, self.literal),
            kind => kind.fmt(fmt),
        }
    }
}

/// Destino de los errores de escaneo.
pub trait ErrorSink {
    fn report(&mut self, error: Located<ScanError>);
}

impl ErrorSink for Vec<Located<ScanError>> {
    fn report(&mut self, error: Located<ScanError>) {
        self.push(error);
    }
}

impl<S: ErrorSink> ErrorSink for &mut S {
    fn report(&mut self, error: Located<ScanError>) {
        (**self).report(error);
    }
}

/// Scanner de gramáticas PEG.
///
/// El scanner avanza runa por runa sobre el texto completo de un
/// [`Source`]. La posición del scanner es siempre la de la runa actual.
pub struct Scanner<S: ErrorSink> {
    source: Rc<Source>,
    sink: S,
    cur: Option<char>,
    width: usize,
    pos: Position,
    started: bool,
    finished: bool,
    errors: usize,
    tok: String,
}

impl<S: ErrorSink> Scanner<S> {
    /// Crea un scanner al inicio de un origen.
    pub fn new(source: Rc<Source>, sink: S) -> Self {
        Scanner {
            source,
            sink,
            cur: None,
            width: 0,
            pos: Position::default(),
            started: false,
            finished: false,
            errors: 0,
            tok: String::new(),
        }
    }

    /// Recupera el destino de errores.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Obtiene el siguiente token. El segundo elemento es falso una vez
    /// que se emite [`TokenKind::Eof`].
    pub fn scan(&mut self) -> (Located<Token>, bool) {
        use TokenKind::*;

        if !self.started {
            self.started = true;
            self.read();
        }

        self.skip_whitespace();
        let start = self.pos;

        let (kind, literal) = match self.cur {
            None => (Eof, String::new()),

            Some(c) if is_letter(c) => {
                let literal = self.scan_identifier();
                if RESERVED.contains(&literal.as_str()) {
                    self.error_at(start, ScanError::IllegalIdentifier(literal.clone()));
                }

                (Ident, literal)
            }

            Some('=' | '<' | '←' | '⟵') => (RuleDef, self.scan_rule_def()),
            Some('\'') => (Char, self.scan_char()),
            Some('"') => (Str, self.scan_string()),
            Some('`') => (RawStr, self.scan_raw_string()),
            Some('[') => (Class, self.scan_class(start)),
            Some('{') => (Code, self.scan_code()),

            Some(c) => {
                self.read();
                match (c, self.cur) {
                    ('/', Some('*' | '/')) => self.scan_comment(),
                    (c, _) => match TokenKind::punctuation(c) {
                        Some(kind) => (kind, c.to_string()),
                        None => {
                            self.error_at(start, ScanError::InvalidChar(c));
                            (Invalid, c.to_string())
                        }
                    },
                }
            }
        };

        let token = Token { kind, literal };
        let location = Location::new(Rc::clone(&self.source), start);

        (Located::at(token, location), kind != Eof)
    }

    /// Avanza a la siguiente runa.
    fn read(&mut self) {
        let offset = self.pos.offset() + self.width;
        let (line, column) = (self.pos.line(), self.pos.column());

        self.cur = self.source.text()[offset..].chars().next();
        self.width = self.cur.map_or(0, char::len_utf8);

        self.pos = match self.cur {
            Some('\n') => Position::new(line + 1, 0, offset),
            Some(_) => Position::new(line, column + 1, offset),
            None => Position::new(line, column, offset),
        };
    }

    fn skip_whitespace(&mut self) {
        while let Some(' ' | '\t' | '\r') = self.cur {
            self.read();
        }
    }

    /// Escribe la runa actual en el token.
    fn push_cur(&mut self) {
        if let Some(c) = self.cur {
            self.tok.push(c);
        }
    }

    fn take_tok(&mut self) -> String {
        std::mem::take(&mut self.tok)
    }

    fn scan_identifier(&mut self) -> String {
        while let Some(c) = self.cur.filter(|&c| is_letter(c) || is_digit(c)) {
            self.tok.push(c);
            self.read();
        }

        self.take_tok()
    }

    fn scan_rule_def(&mut self) -> String {
        let first = self.cur;
        self.push_cur();
        self.read();

        if first == Some('<') {
            self.push_cur();
            if self.cur != Some('-') {
                self.error(ScanError::RuleDefNotTerminated);
            }

            self.read();
        }

        self.take_tok()
    }

    fn scan_char(&mut self) -> String {
        self.push_cur();

        let mut count = 0;
        let mut noread = false;
        loop {
            if !noread {
                self.read();
            }

            noread = false;
            match self.cur {
                Some('\\') => {
                    count += 1;
                    noread = !self.scan_escape('\'');
                }

                None | Some('\n') => {
                    self.error(ScanError::CharNotTerminated);
                    break;
                }

                Some('\'') => {
                    self.push_cur();
                    self.read();
                    if count != 1 {
                        self.error(ScanError::NotSingleRune);
                    }

                    self.scan_ignore_case();
                    break;
                }

                Some(c) => {
                    count += 1;
                    self.tok.push(c);
                }
            }
        }

        self.take_tok()
    }

    fn scan_string(&mut self) -> String {
        self.push_cur();

        let mut noread = false;
        loop {
            if !noread {
                self.read();
            }

            noread = false;
            match self.cur {
                Some('\\') => noread = !self.scan_escape('"'),
                None | Some('\n') => {
                    self.error(ScanError::StringNotTerminated);
                    break;
                }

                Some('"') => {
                    self.push_cur();
                    self.read();
                    self.scan_ignore_case();
                    break;
                }

                Some(c) => self.tok.push(c),
            }
        }

        self.take_tok()
    }

    fn scan_raw_string(&mut self) -> String {
        self.push_cur();

        loop {
            self.read();
            match self.cur {
                None => {
                    self.error(ScanError::RawStringNotTerminated);
                    break;
                }

                Some('`') => {
                    self.push_cur();
                    self.read();
                    self.scan_ignore_case();
                    break;
                }

                Some('\r') => (),
                Some(c) => self.tok.push(c),
            }
        }

        self.take_tok()
    }

    fn scan_class(&mut self, start: Position) -> String {
        let errors = self.errors;
        self.push_cur();

        let mut noread = false;
        loop {
            if !noread {
                self.read();
            }

            noread = false;
            match self.cur {
                Some('\\') => noread = !self.scan_escape(']'),
                None | Some('\n') => {
                    self.error(ScanError::ClassNotTerminated);
                    break;
                }

                Some(']') => {
                    self.push_cur();
                    self.read();
                    self.scan_ignore_case();

                    // Los escapes ya son válidos, solo resta validar rangos
                    if self.errors == errors {
                        if let Err(error @ LiteralError::InvalidRange(..)) = literal::class(&self.tok) {
                            self.error_at(start, ScanError::InvalidRange(error));
                        }
                    }

                    break;
                }

                Some(c) => self.tok.push(c),
            }
        }

        self.take_tok()
    }

    fn scan_code(&mut self) -> String {
        self.push_cur();

        let mut depth = 1;
        loop {
            self.read();
            self.push_cur();

            match self.cur {
                None => {
                    self.error(ScanError::CodeNotTerminated);
                    break;
                }

                Some('{') => depth += 1,
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        self.read();
                        break;
                    }
                }

                Some(_) => (),
            }
        }

        self.take_tok()
    }

    /// Comentario de línea o multilínea. El `/` inicial ya fue consumido.
    fn scan_comment(&mut self) -> (TokenKind, String) {
        self.tok.push('/');

        let multiline = self.cur == Some('*');
        let mut closing = false;

        loop {
            self.push_cur();
            self.read();

            match self.cur {
                Some('\n') if !multiline => return (TokenKind::LineComment, self.take_tok()),
                None if multiline => {
                    self.error(ScanError::CommentNotTerminated);
                    return (TokenKind::MultilineComment, self.take_tok());
                }

                None => return (TokenKind::LineComment, self.take_tok()),
                Some('/') if closing => {
                    self.push_cur();
                    self.read();
                    return (TokenKind::MultilineComment, self.take_tok());
                }

                Some(c) => closing = multiline && c == '*',
            }
        }
    }

    /// Sufijo `i` opcional de literales y clases.
    fn scan_ignore_case(&mut self) {
        if self.cur == Some('i') {
            self.push_cur();
            self.read();
        }
    }

    /// Valida una secuencia de escape que inicia en la runa actual (`\`).
    ///
    /// Si retorna verdadero, la runa actual es la última del escape. Si
    /// retorna falso, la runa actual aún no ha sido procesada.
    fn scan_escape(&mut self, quote: char) -> bool {
        self.push_cur();
        self.read();

        let (mut digits, radix, max) = match self.cur {
            Some(c @ ('a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '\\')) => {
                self.tok.push(c);
                return true;
            }

            Some(c) if c == quote => {
                self.tok.push(c);
                return true;
            }

            Some('0'..='7') => (3, 8, 255),
            Some(c @ ('x' | 'u' | 'U')) => {
                self.tok.push(c);
                self.read();

                match c {
                    'x' => (2, 16, 255),
                    'u' => (4, 16, char::MAX as u32),
                    _ => (8, 16, char::MAX as u32),
                }
            }

            Some('p') if quote == ']' => {
                self.push_cur();
                self.read();
                return self.scan_unicode_class();
            }

            None | Some('\n') => {
                self.error(ScanError::EscapeNotTerminated);
                return false;
            }

            Some(c) => {
                self.tok.push(c);
                self.error(ScanError::UnknownEscape);
                self.read();
                return false;
            }
        };

        let mut value: u32 = 0;
        while digits > 0 {
            match self.cur {
                Some(c) if c.is_digit(radix) => {
                    self.tok.push(c);
                    value = value * radix + c.to_digit(radix).unwrap_or(0);
                }

                None | Some('\n') => {
                    self.error(ScanError::EscapeNotTerminated);
                    return false;
                }

                Some(c) => {
                    self.tok.push(c);
                    self.error(ScanError::IllegalEscapeChar(c));
                    self.read();
                    return false;
                }
            }

            digits -= 1;
            if digits > 0 {
                self.read();
            }
        }

        if value > max || (0xd800..=0xdfff).contains(&value) {
            self.error(ScanError::InvalidCodePoint);
            self.read();
            return false;
        }

        true
    }

    /// Nombre de clase Unicode luego de `\p`.
    fn scan_unicode_class(&mut self) -> bool {
        match self.cur {
            None | Some('\n') => {
                self.error(ScanError::EscapeNotTerminated);
                false
            }

            Some('{') => {
                let mut count = 0;
                loop {
                    self.push_cur();
                    self.read();
                    count += 1;

                    match self.cur {
                        None | Some('\n') => {
                            self.error(ScanError::EscapeNotTerminated);
                            return false;
                        }

                        Some('}') => {
                            if count < 2 {
                                self.error(ScanError::EmptyUnicodeClass);
                            }

                            self.push_cur();
                            return true;
                        }

                        Some(_) => (),
                    }
                }
            }

            Some(c) => {
                self.tok.push(c);
                true
            }
        }
    }

    fn error(&mut self, error: ScanError) {
        self.error_at(self.pos, error);
    }

    fn error_at(&mut self, position: Position, error: ScanError) {
        self.errors += 1;

        let location = Location::new(Rc::clone(&self.source), position);
        self.sink.report(Located::at(error, location));
    }
}

impl<S: ErrorSink> Iterator for Scanner<S> {
    type Item = Located<Token>;

    /// Emite tokens hasta [`TokenKind::Eof`], inclusive.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let (token, more) = self.scan();
        self.finished = !more;

        Some(token)
    }
}

/// Determina si una runa puede iniciar un identificador.
fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || (c >= '\u{80}' && c.is_alphabetic())
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || (c >= '\u{80}' && c.is_numeric())
}

/// Describe una runa como `U+0041 'A'`.
fn describe(c: char) -> String {
    format!("U+{:04X} {:?}", c as u32, c)
}
