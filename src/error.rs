//! Reporte de errores con ubicación.
//!
//! Las fases del generador no se detienen ante el primer error. Cada una
//! acumula errores ubicados y al final se presentan todos juntos como
//! [`Diagnostics`], ordenados por posición.

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Debug, Display},
};

mod sealed {
    pub trait Sealed {}
}

/// Un error cualquiera con una ubicación en la gramática.
pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Lista de errores de una o más fases.
///
/// Se imprime un error por línea con la forma
/// `ARCHIVO:LÍNEA:COLUMNA (DESPLAZAMIENTO): MENSAJE`.
#[derive(Default)]
pub struct Diagnostics {
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn push<E: 'static + LocatedError>(&mut self, error: E) {
        self.errors.push(Box::new(error));
    }

    /// Ordena por posición. El orden entre errores de una misma posición
    /// se preserva.
    pub fn sort(&mut self) {
        self.errors.sort_by_key(|error| error.location().position());
    }

    /// Mensajes en orden, sin ubicaciones.
    pub fn messages(&self) -> impl Iterator<Item = String> + '_ {
        self.errors.iter().map(|error| error.source().to_string())
    }
}

impl<E: 'static + LocatedError> Extend<E> for Diagnostics {
    fn extend<I: IntoIterator<Item = E>>(&mut self, errors: I) {
        for error in errors {
            self.push(error);
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
        }
    }
}

impl<E: 'static + LocatedError> From<Vec<E>> for Diagnostics {
    fn from(errors: Vec<E>) -> Self {
        let mut diagnostics = Diagnostics::default();
        diagnostics.extend(errors);

        diagnostics
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(fmt, "{}: {}", error.location(), error.source())?;
        }

        Ok(())
    }
}

impl Debug for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, fmt)
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}
