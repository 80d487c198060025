//! Búfer de entrada y cursor.

use crate::position::Position;
use std::borrow::Cow;

/// Entrada completa en memoria.
pub(crate) struct Input {
    data: Vec<u8>,
}

/// Cursor sobre la entrada: posición de la runa actual, la runa en sí
/// (`None` en fin de archivo) y su ancho en bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Savepoint {
    pub pos: Position,
    pub rune: Option<char>,
    pub width: usize,
}

impl Savepoint {
    /// Cursor anterior a la primera lectura.
    pub fn start() -> Self {
        Savepoint {
            pos: Position::new(1, 0, 0),
            rune: None,
            width: 0,
        }
    }
}

impl Input {
    /// Valida la entrada. Si no es UTF-8 válido y no se permiten bytes
    /// inválidos, retorna la posición del primer byte inválido.
    pub fn new(data: Vec<u8>, allow_invalid: bool) -> Result<Self, Position> {
        if !allow_invalid {
            if let Err(error) = std::str::from_utf8(&data) {
                let offset = error.valid_up_to();
                let prefix = String::from_utf8_lossy(&data[..offset]);

                let line = 1 + prefix.matches('\n').count() as u32;
                let column = 1 + prefix
                    .rsplit('\n')
                    .next()
                    .map_or(0, |last| last.chars().count()) as u32;

                return Err(Position::new(line, column, offset));
            }
        }

        Ok(Input { data })
    }

    /// Avanza el cursor a la siguiente runa.
    ///
    /// Alcanzar el fin de archivo también avanza la columna, de modo que
    /// un fallo en EOF se reporta una columna después de la última runa.
    pub fn read(&self, pt: &mut Savepoint) {
        pt.pos.offset += pt.width;
        pt.pos.column += 1;

        let (rune, width) = match self.decode(pt.pos.offset) {
            Some(decoded) => decoded,
            None => {
                pt.rune = None;
                pt.width = 0;
                return;
            }
        };

        pt.rune = Some(rune);
        pt.width = width;

        if rune == '\n' {
            pt.pos.line += 1;
            pt.pos.column = 0;
        }
    }

    /// Texto entre dos desplazamientos.
    pub fn slice(&self, from: usize, to: usize) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data[from..to])
    }

    /// Decodifica la runa en `offset`.
    ///
    /// Un byte que no inicia una secuencia UTF-8 válida se lee como
    /// `U+FFFD` de ancho 1.
    fn decode(&self, offset: usize) -> Option<(char, usize)> {
        let rest = self.data.get(offset..).filter(|rest| !rest.is_empty())?;

        let width = match rest[0] {
            0x00..=0x7f => 1,
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => 0,
        };

        let decoded = rest
            .get(..width)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .and_then(|text| text.chars().next());

        match decoded {
            Some(rune) => Some((rune, width)),
            None => Some((char::REPLACEMENT_CHARACTER, 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runes(input: &Input) -> Vec<(char, usize, Position)> {
        let mut pt = Savepoint::start();
        let mut runes = Vec::new();

        input.read(&mut pt);
        while let Some(rune) = pt.rune {
            runes.push((rune, pt.width, pt.pos));
            input.read(&mut pt);
        }

        runes
    }

    #[test]
    fn rejects_invalid_utf8_at_offset() {
        fn offset(data: &[u8]) -> Option<Position> {
            Input::new(data.to_vec(), false).err()
        }

        assert_eq!(offset(b"a\xffb"), Some(Position::new(1, 2, 1)));
        assert_eq!(offset("añb".as_bytes()), None);
        assert_eq!(offset(b"x\nab\xe2\x82"), Some(Position::new(2, 3, 4)));
    }

    #[test]
    fn invalid_bytes_are_replacement_runes_of_width_one() {
        let input = Input::new(b"a\xffb".to_vec(), true).unwrap();
        let runes: Vec<_> = runes(&input).into_iter().map(|(c, w, _)| (c, w)).collect();

        assert_eq!(runes, vec![('a', 1), ('\u{fffd}', 1), ('b', 1)]);
    }

    #[test]
    fn tracks_lines_and_columns() {
        let input = Input::new("añ\nb".as_bytes().to_vec(), false).unwrap();
        let positions: Vec<_> = runes(&input).into_iter().map(|(_, _, pos)| pos).collect();

        assert_eq!(
            positions,
            vec![
                Position::new(1, 1, 0),
                Position::new(1, 2, 1),
                Position::new(2, 0, 3),
                Position::new(2, 1, 4),
            ]
        );
    }

    #[test]
    fn end_of_input_is_one_column_past_the_last_rune() {
        let at_eof = |text: &str| {
            let input = Input::new(text.as_bytes().to_vec(), false).unwrap();
            let mut pt = Savepoint::start();

            input.read(&mut pt);
            while pt.rune.is_some() {
                input.read(&mut pt);
            }

            pt.pos
        };

        assert_eq!(at_eof(""), Position::new(1, 1, 0));
        assert_eq!(at_eof("["), Position::new(1, 2, 1));
        assert_eq!(at_eof("añ"), Position::new(1, 3, 3));
        assert_eq!(at_eof("a\n"), Position::new(2, 1, 2));
    }
}
