//! Biblioteca de soporte para parsers generados por `pegc`.
//!
//! # Propósito
//! Cada parser que emite `pegc` describe su gramática como una tabla de
//! reglas y expresiones ([`Grammar`]) junto con las funciones que
//! implementan sus acciones y predicados. Esta biblioteca implementa el
//! intérprete que recorre esa tabla sobre una entrada concreta: cursor,
//! memoización packrat, registro del fallo más lejano, pila de etiquetas
//! y estado del usuario.
//!
//! # Uso
//! El código emitido expone `grammar()`, `parse()`, `parse_reader()` y
//! `parse_file()`, que delegan a las funciones homónimas de este crate.
//! La configuración de cada ejecución se describe con [`Options`].
//!
//! # Acciones
//! Las acciones reciben un [`Current`] y las etiquetas visibles en su
//! sitio, y retornan un [`ActionResult`]. Un error retornado por una
//! acción se registra con el nombre de la regla y la posición donde
//! inicia lo reconocido, pero el parsing continúa.

pub mod grammar;

mod error;
mod input;
mod options;
mod parser;
mod position;
mod value;

pub use crate::{
    error::{Error, ErrorKind, Errors, ParseError},
    grammar::Grammar,
    options::{Options, ParseFlags},
    parser::{parse, Current, Stats},
    position::Position,
    value::Value,
};

// Reexportados para el código emitido
pub use anyhow;
pub use lazy_static;

use std::{collections::HashMap, fs::File, io::Read, path::Path};

/// Almacén de valores por nombre.
pub type Store = HashMap<String, Value>;

/// Resultado de una acción.
pub type ActionResult = anyhow::Result<Value>;

/// Función que implementa una acción.
pub type ActionFn = fn(&mut Current<'_>) -> ActionResult;

/// Función que implementa un predicado `&{}` o `!{}`.
pub type PredicateFn = fn(&mut Current<'_>) -> anyhow::Result<bool>;

/// Lee `reader` por completo y luego lo parsea.
pub fn parse_reader<R: Read>(
    grammar: &Grammar,
    filename: &str,
    mut reader: R,
    options: Options,
) -> Result<Value, Error> {
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;

    Ok(parse(grammar, filename, input, options)?)
}

/// Parsea el contenido de un archivo.
pub fn parse_file<P: AsRef<Path>>(
    grammar: &Grammar,
    path: P,
    options: Options,
) -> Result<Value, Error> {
    let path = path.as_ref();
    let file = File::open(path)?;

    parse_reader(grammar, &path.to_string_lossy(), file, options)
}

/// Minúscula de una runa para comparaciones sin distinción de mayúsculas.
///
/// Las runas cuya minúscula ocupa más de una runa se conservan.
pub fn fold_case(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(lower), None) => lower,
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::fold_case;

    #[test]
    fn folds_single_runes_only() {
        assert_eq!(fold_case('A'), 'a');
        assert_eq!(fold_case('Ñ'), 'ñ');
        assert_eq!(fold_case('x'), 'x');
        assert_eq!(fold_case('İ'), 'İ');
    }
}
