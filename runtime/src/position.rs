use std::fmt::{self, Display, Formatter};

/// Una posición en la entrada: línea, columna y desplazamiento en bytes.
///
/// Las líneas cuentan desde 1 y las columnas cuentan runas desde 1. Una
/// posición en columna 0 corresponde a un salto de línea recién leído.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Position {
    /// Construye una posición. Es la forma en que el código emitido
    /// describe el origen de cada regla y expresión.
    pub const fn new(line: u32, column: u32, offset: usize) -> Self {
        Position {
            line,
            column,
            offset,
        }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{} ({})", self.line, self.column, self.offset)
    }
}
