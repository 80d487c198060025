//! Generador de parsers PEG.
//!
//! # Front end
//! Cada parser deriva de un único archivo de gramática. Este archivo se
//! somete primero a análisis léxico en [`lex`], de lo cual se obtiene un
//! flujo de tokens. El flujo de tokens se dispone en un AST, descrito en
//! [`ast`], por medio de análisis sintáctico en [`parse`]. Los literales
//! y las clases de caracteres se decodifican con [`literal`].
//!
//! # Back end
//! A partir del AST, [`codegen`] emite el código fuente de un parser en
//! Rust. Ese código solo contiene la tabla de la gramática y las
//! funciones del usuario; el intérprete que la recorre vive en el crate
//! `pegc_runtime`. Opcionalmente, [`format`] entrega el resultado a
//! `rustfmt`.
//!
//! # Errores
//! Ninguna fase se detiene en el primer error. Los errores de todas las
//! fases se presentan juntos como [`error::Diagnostics`].

#[macro_use]
mod macros;

pub mod ast;
pub mod codegen;
pub mod error;
pub mod format;
pub mod lex;
pub mod literal;
pub mod parse;
pub mod source;

use crate::{error::Diagnostics, lex::Scanner, source::Source};
use std::rc::Rc;

/// Analiza una gramática completa.
///
/// Los errores léxicos y sintácticos se reportan juntos, ordenados por
/// posición.
pub fn read_grammar(source: &Rc<Source>) -> Result<ast::Grammar, Diagnostics> {
    let mut errors = Vec::new();
    let tokens: Vec<_> = Scanner::new(Rc::clone(source), &mut errors).collect();

    let parsed = parse::parse(tokens);

    let mut diagnostics = Diagnostics::from(errors);
    diagnostics.extend(parsed.errors);

    if diagnostics.is_empty() {
        Ok(parsed.grammar)
    } else {
        diagnostics.sort();
        Err(diagnostics)
    }
}

/// Genera el parser de una gramática en memoria.
///
/// `name` solo se usa para ubicar errores.
pub fn generate(name: &str, text: &str, options: &codegen::Options) -> Result<String, Diagnostics> {
    let source = Source::new(name, text);
    let grammar = read_grammar(&source)?;

    match codegen::build(&grammar, &source, options) {
        Ok(code) => Ok(code),
        Err(codegen::EmitError::Invalid(diagnostics)) => Err(diagnostics),
        Err(error) => {
            let location = source::Location::new(source, source::Position::default());
            Err(Diagnostics::from(source::Located::at(error, location)))
        }
    }
}
