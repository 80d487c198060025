//! Parsers generados a partir de las gramáticas en `grammars/`.
//!
//! Cada módulo incluye el código que emite `pegc` durante la compilación
//! (ver `build.rs`) y expone `grammar()`, `parse()`, `parse_reader()` y
//! `parse_file()`.

/// Aritmética entera con `+ - * /` y paréntesis.
pub mod calculator {
    include!(concat!(env!("OUT_DIR"), "/calculator.rs"));
}

/// Documentos JSON, evaluados a [`pegc_runtime::Value`].
pub mod json {
    include!(concat!(env!("OUT_DIR"), "/json.rs"));
}

/// Secuencias de `a` y `b` que terminan en `b`.
pub mod andnot {
    include!(concat!(env!("OUT_DIR"), "/andnot.rs"));
}

/// Predicados de código y uso de los almacenes `state` y `global`.
pub mod predicates {
    include!(concat!(env!("OUT_DIR"), "/predicates.rs"));
}

/// La sintaxis de gramáticas de `pegc`, descrita en sí misma.
///
/// El resultado es un [`pegc::ast::Grammar`] opaco. Las ubicaciones se
/// resuelven contra el [`pegc::source::Source`] que se indique en la
/// entrada `"source"` del almacén global.
pub mod peg {
    include!(concat!(env!("OUT_DIR"), "/peg.rs"));
}
