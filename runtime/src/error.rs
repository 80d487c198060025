use crate::position::Position;
use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    io,
};

use thiserror::Error;

/// Causa de un error de parsing.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("grammar has no rule")]
    NoRule,

    #[error("invalid entrypoint")]
    InvalidEntrypoint,

    #[error("invalid encoding")]
    InvalidEncoding,

    #[error("max number of expressions parsed")]
    MaxExpressions,

    #[error("undefined rule: {0}")]
    UndefinedRule(String),

    /// La regla de entrada falló; se incluye lo que se esperaba en la
    /// posición más lejana alcanzada.
    #[error("no match found, expected: {}", list_join(.0))]
    NoMatch(Vec<String>),

    /// Una acción o predicado retornó un error.
    #[error("{0:#}")]
    Action(anyhow::Error),

    /// El código del usuario entró en pánico y la recuperación estaba activa.
    #[error("{0}")]
    Panic(String),
}

/// Un error ubicado en la entrada.
#[derive(Debug)]
pub struct ParseError {
    pub filename: String,
    pub pos: Position,

    /// Regla en ejecución al ocurrir el error, si la hay.
    pub rule: Option<String>,

    /// Pila de reglas al ocurrir el error, desde la de entrada.
    pub rule_stack: Vec<String>,

    /// Descriptores esperados, ordenados y sin repetir. Solo
    /// [`ErrorKind::NoMatch`] los incluye.
    pub expected: Vec<String>,
    pub kind: ErrorKind,
}

impl Display for ParseError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        if !self.filename.is_empty() {
            write!(fmt, "{}:", self.filename)?;
        }

        write!(fmt, "{}: ", self.pos)?;
        if let Some(rule) = &self.rule {
            write!(fmt, "rule {}: ", rule)?;
        }

        write!(fmt, "{}", self.kind)
    }
}

impl StdError for ParseError {}

/// Lista de errores de una ejecución, sin mensajes repetidos.
#[derive(Debug, Default)]
pub struct Errors(Vec<ParseError>);

impl Errors {
    pub(crate) fn push(&mut self, error: ParseError) {
        let message = error.to_string();
        if !self.0.iter().any(|known| known.to_string() == message) {
            self.0.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParseError> {
        self.0.iter()
    }

    /// Obtiene el primer error.
    pub fn first(&self) -> Option<&ParseError> {
        self.0.first()
    }
}

impl IntoIterator for Errors {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a ParseError;
    type IntoIter = std::slice::Iter<'a, ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for Errors {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(fmt)?;
            }

            write!(fmt, "{}", error)?;
        }

        Ok(())
    }
}

impl StdError for Errors {}

/// Error de los puntos de entrada que leen su entrada.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Parse(#[from] Errors),
}

/// Une descriptores como `a, b or c`.
fn list_join(list: &[String]) -> String {
    match list {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}
