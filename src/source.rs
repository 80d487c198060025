//! Ubicaciones dentro de archivos de gramática.
//!
//! Los distintos objetos internos que el generador construye deben
//! llevar cuenta de la posición en la gramática original de la que
//! provienen, lo cual permite señalar con exactitud en dónde ocurre un
//! error y también emitir esas posiciones en el parser generado.

use std::{
    fmt::{self, Debug, Display, Formatter},
    io::{self, Read},
    rc::Rc,
};

/// Un valor junto con el punto de la gramática del que proviene.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    pub fn val(&self) -> &T {
        &self.value
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Separa ubicación y valor.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Ubica un valor.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Reemplaza el valor conservando la ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Dos valores ubicados son iguales si sus valores lo son. La ubicación
/// no participa, lo cual permite comparar árboles de orígenes distintos.
impl<T: PartialEq> PartialEq for Located<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Una ubicación está conformada por un origen y una posición.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    position: Position,
}

impl Location {
    pub fn new(from: Rc<Source>, position: Position) -> Self {
        Location { from, position }
    }

    /// Obtiene el origen.
    pub fn source(&self) -> &Rc<Source> {
        &self.from
    }

    /// Obtiene la posición.
    pub fn position(&self) -> Position {
        self.position
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        if !self.from.name.is_empty() {
            write!(formatter, "{}:", self.from.name)?;
        }

        write!(formatter, "{}", self.position)
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna-desplazamiento en un archivo.
///
/// Las líneas cuentan desde 1, las columnas cuentan runas desde 1 y el
/// desplazamiento cuenta bytes desde 0. Un salto de línea se ubica en la
/// columna 0 de la línea que inicia.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Position {
    offset: usize,
    line: u32,
    column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Position {
            offset,
            line,
            column,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new(1, 0, 0)
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{} ({})", self.line, self.column, self.offset)
    }
}

/// Nombre de origen y contenido completo.
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    /// Lee todo un flujo de entrada.
    ///
    /// Los bytes que no son UTF-8 válido se reemplazan por `U+FFFD`, lo
    /// cual el scanner reporta como caracteres inválidos.
    pub fn read<R, S>(mut reader: R, name: S) -> io::Result<Rc<Source>>
    where
        R: Read,
        S: Into<String>,
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Source::new(name, text))
    }

    /// Construye un origen a partir de texto en memoria.
    pub fn new<S, T>(name: S, text: T) -> Rc<Source>
    where
        S: Into<String>,
        T: Into<String>,
    {
        Rc::new(Source {
            name: name.into(),
            text: text.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
