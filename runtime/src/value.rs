//! Valores semánticos.
//!
//! Cada expresión que reconoce entrada produce un [`Value`]. Los
//! reconocedores terminales producen el texto reconocido, las
//! secuencias y repeticiones producen listas y las acciones producen
//! lo que retorne el código del usuario.

use std::{
    any::Any,
    collections::BTreeMap,
    fmt::{self, Debug, Formatter},
    rc::Rc,
};

/// Valor dinámico que fluye entre expresiones y acciones.
#[derive(Clone, Default)]
pub enum Value {
    /// Ausencia de valor, como el de un `?` que no reconoció nada.
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),

    /// Un valor arbitrario del usuario. Clonar un valor opaco comparte
    /// la misma instancia.
    Opaque(Rc<dyn Any>),
}

impl Value {
    /// Construye un valor opaco.
    pub fn opaque<T: Any>(value: T) -> Self {
        Value::Opaque(Rc::new(value))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(boolean) => Some(*boolean),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(integer) => Some(*integer),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(float) => Some(*float),
            Value::Int(integer) => Some(*integer as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(string) => Some(string),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Intenta tomar prestado el valor opaco con un tipo concreto.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Opaque(any) => any.downcast_ref(),
            _ => None,
        }
    }

    /// Toma ownership de una lista.
    ///
    /// `Nil` resulta en una lista vacía y cualquier otro valor que no
    /// sea lista resulta en una lista de un elemento.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Value::List(list) => list,
            Value::Nil => Vec::new(),
            other => vec![other],
        }
    }

    /// Obtiene el `index`-ésimo elemento de una lista, o `Nil`.
    pub fn at(&self, index: usize) -> &Value {
        const NIL: &Value = &Value::Nil;
        self.as_list()
            .and_then(|list| list.get(index))
            .unwrap_or(NIL)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;

        match (self, other) {
            (Nil, Nil) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Opaque(a), Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => fmt.write_str("nil"),
            Value::Bool(boolean) => Debug::fmt(boolean, fmt),
            Value::Int(integer) => Debug::fmt(integer, fmt),
            Value::Float(float) => Debug::fmt(float, fmt),
            Value::Str(string) => Debug::fmt(string, fmt),
            Value::List(list) => fmt.debug_list().entries(list).finish(),
            Value::Map(map) => fmt.debug_map().entries(map).finish(),
            Value::Opaque(_) => fmt.write_str("<opaque>"),
        }
    }
}

impl From<bool> for Value {
    fn from(boolean: bool) -> Self {
        Value::Bool(boolean)
    }
}

impl From<i64> for Value {
    fn from(integer: i64) -> Self {
        Value::Int(integer)
    }
}

impl From<f64> for Value {
    fn from(float: f64) -> Self {
        Value::Float(float)
    }
}

impl From<&str> for Value {
    fn from(string: &str) -> Self {
        Value::Str(string.to_owned())
    }
}

impl From<String> for Value {
    fn from(string: String) -> Self {
        Value::Str(string)
    }
}

impl From<Vec<Value>> for Value {
    fn from(list: Vec<Value>) -> Self {
        Value::List(list)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Self {
        option.map_or(Value::Nil, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_becomes_empty_list() {
        assert!(Value::Nil.into_list().is_empty());
        assert_eq!(Value::Int(3).into_list(), vec![Value::Int(3)]);
    }

    #[test]
    fn opaque_values_compare_by_identity() {
        let value = Value::opaque(vec![1, 2, 3]);
        let shared = value.clone();

        assert_eq!(value, shared);
        assert_ne!(value, Value::opaque(vec![1, 2, 3]));
        assert_eq!(shared.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn out_of_range_index_is_nil() {
        let list = Value::from(vec![Value::from("a")]);
        assert_eq!(list.at(0).as_str(), Some("a"));
        assert!(list.at(4).is_nil());
        assert!(Value::Int(1).at(0).is_nil());
    }
}
