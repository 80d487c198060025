use crate::{parser::Stats, Store, Value};
use bitflags::bitflags;
use std::{cell::RefCell, rc::Rc};

bitflags! {
    /// Interruptores de comportamiento del parser.
    pub struct ParseFlags: u32 {
        /// Memoiza resultados por (regla, desplazamiento).
        ///
        /// Una regla memoizada no vuelve a ejecutar sus acciones al ser
        /// reutilizada, por lo cual las mutaciones que esas acciones
        /// hagan sobre el estado no se repiten. Las gramáticas cuyas
        /// acciones modifican el estado deberían desactivar memoización.
        const MEMOIZE = 0x01;

        /// Traza la entrada y salida de cada regla en stderr.
        const DEBUG = 0x02;

        /// Convierte pánicos del código de usuario en errores.
        const RECOVER = 0x04;

        /// Acepta bytes que no son UTF-8 como `U+FFFD` de ancho 1.
        const ALLOW_INVALID_UTF8 = 0x08;
    }
}

impl Default for ParseFlags {
    fn default() -> Self {
        ParseFlags::RECOVER
    }
}

/// Configuración de una ejecución del parser.
///
/// Las opciones se fijan antes de iniciar y no cambian durante el parsing.
#[derive(Clone, Default)]
pub struct Options {
    pub(crate) flags: ParseFlags,
    pub(crate) entrypoint: Option<String>,
    pub(crate) max_expressions: Option<u64>,
    pub(crate) state: Store,
    pub(crate) global: Store,
    pub(crate) stats: Option<(Rc<RefCell<Stats>>, String)>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inicia el parsing desde otra regla que no sea la primera.
    pub fn entrypoint(mut self, rule: &str) -> Self {
        self.entrypoint = Some(rule.to_owned());
        self
    }

    pub fn memoize(self, enable: bool) -> Self {
        self.flag(ParseFlags::MEMOIZE, enable)
    }

    pub fn debug(self, enable: bool) -> Self {
        self.flag(ParseFlags::DEBUG, enable)
    }

    pub fn recover(self, enable: bool) -> Self {
        self.flag(ParseFlags::RECOVER, enable)
    }

    pub fn allow_invalid_utf8(self, enable: bool) -> Self {
        self.flag(ParseFlags::ALLOW_INVALID_UTF8, enable)
    }

    /// Limita la cantidad total de expresiones evaluadas. Cero desactiva
    /// el límite.
    pub fn max_expressions(mut self, max: u64) -> Self {
        self.max_expressions = (max > 0).then(|| max);
        self
    }

    /// Valor inicial de una clave del estado que se restaura al retroceder.
    pub fn init_state<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.state.insert(key.to_owned(), value.into());
        self
    }

    /// Valor inicial de una clave del almacén global, que no se restaura.
    pub fn global_store<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.global.insert(key.to_owned(), value.into());
        self
    }

    /// Recolecta estadísticas en `stats`. Las alternativas de una
    /// elección que no reconoce nada se cuentan bajo `no_match`.
    pub fn statistics(mut self, stats: Rc<RefCell<Stats>>, no_match: &str) -> Self {
        self.stats = Some((stats, no_match.to_owned()));
        self
    }

    pub fn flags(&self) -> ParseFlags {
        self.flags
    }

    fn flag(mut self, flag: ParseFlags, enable: bool) -> Self {
        self.flags.set(flag, enable);
        self
    }
}
