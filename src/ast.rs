//! Árbol de sintaxis abstracta de una gramática.
//!
//! El árbol conserva los lexemas originales de literales, clases y
//! bloques de código junto con su forma decodificada. La implementación
//! de [`Display`] produce texto de gramática que el parser lee de vuelta
//! como un árbol igual, salvo ubicaciones.

use crate::{
    literal::{self, Class, LiteralError},
    source::Located,
};

use std::fmt::{self, Display};

/// Raíz del árbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grammar {
    pub init: Option<Located<Code>>,
    pub rules: Vec<Rule>,
}

/// Definición de una regla.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: Located<String>,
    pub display_name: Option<Located<Lit>>,
    pub expr: Located<Expr>,
}

/// Una expresión de parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Choice(Vec<Located<Expr>>),

    Action {
        expr: Box<Located<Expr>>,
        code: Located<Code>,
    },

    Seq(Vec<Located<Expr>>),

    Labeled {
        label: Located<String>,
        expr: Box<Located<Expr>>,
    },

    And(Box<Located<Expr>>),
    Not(Box<Located<Expr>>),
    ZeroOrOne(Box<Located<Expr>>),
    ZeroOrMore(Box<Located<Expr>>),
    OneOrMore(Box<Located<Expr>>),
    RuleRef(String),
    AndCode(Code),
    NotCode(Code),
    Lit(Lit),
    CharClass(CharClass),
    Any,
}

/// Literal de runa, de string o de string crudo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lit {
    pub raw: String,
    pub value: String,
    pub ignore_case: bool,
}

/// Clase de caracteres.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    pub raw: String,
    pub class: Class,
}

/// Bloque de código de usuario, con llaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code(pub String);

impl Lit {
    /// Decodifica el lexema de un literal, incluyendo su sufijo `i`.
    pub fn parse(raw: &str) -> Result<Self, LiteralError> {
        let (quoted, ignore_case) = match raw.strip_suffix('i') {
            Some(quoted) => (quoted, true),
            None => (raw, false),
        };

        Ok(Lit {
            raw: raw.to_owned(),
            value: literal::unquote(quoted)?,
            ignore_case,
        })
    }
}

impl CharClass {
    pub fn parse(raw: &str) -> Result<Self, LiteralError> {
        Ok(CharClass {
            raw: raw.to_owned(),
            class: literal::class(raw)?,
        })
    }
}

impl Code {
    /// Texto del bloque sin las llaves exteriores.
    pub fn body(&self) -> &str {
        let code = self.0.as_str();
        let code = code.strip_prefix('{').unwrap_or(code);
        code.strip_suffix('}').unwrap_or(code)
    }
}

impl Expr {
    /// Nivel de precedencia. Un operando de nivel inferior al requerido
    /// por su padre debe imprimirse entre paréntesis.
    fn precedence(&self) -> u8 {
        use Expr::*;

        match self {
            Choice(_) => 0,
            Action { .. } => 1,
            Seq(_) => 2,
            Labeled { .. } => 3,
            And(_) | Not(_) | AndCode(_) | NotCode(_) => 4,
            ZeroOrOne(_) | ZeroOrMore(_) | OneOrMore(_) => 5,
            RuleRef(_) | Lit(_) | CharClass(_) | Any => 6,
        }
    }
}

/// Imprime un operando, entre paréntesis si su precedencia es menor.
struct Operand<'a>(&'a Expr, u8);

impl Display for Operand<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Operand(expr, min) = *self;
        if expr.precedence() < min {
            write!(fmt, "({})", expr)
        } else {
            write!(fmt, "{}", expr)
        }
    }
}

impl Display for Expr {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Expr::*;

        let join = |fmt: &mut fmt::Formatter<'_>, exprs: &[Located<Expr>], sep, min| {
            for (i, expr) in exprs.iter().enumerate() {
                if i > 0 {
                    fmt.write_str(sep)?;
                }

                write!(fmt, "{}", Operand(expr.val(), min))?;
            }

            Ok(())
        };

        match self {
            Choice(alternatives) => join(fmt, alternatives, " / ", 1),
            Action { expr, code } => write!(fmt, "{} {}", Operand(expr.val(), 2), code.val()),
            Seq(exprs) => join(fmt, exprs, " ", 3),
            Labeled { label, expr } => write!(fmt, "{}:{}", label.val(), Operand(expr.val(), 4)),
            And(expr) => write!(fmt, "&{}", Operand(expr.val(), 5)),
            Not(expr) => write!(fmt, "!{}", Operand(expr.val(), 5)),
            ZeroOrOne(expr) => write!(fmt, "{}?", Operand(expr.val(), 6)),
            ZeroOrMore(expr) => write!(fmt, "{}*", Operand(expr.val(), 6)),
            OneOrMore(expr) => write!(fmt, "{}+", Operand(expr.val(), 6)),
            RuleRef(name) => fmt.write_str(name),
            AndCode(code) => write!(fmt, "&{}", code),
            NotCode(code) => write!(fmt, "!{}", code),
            Lit(lit) => fmt.write_str(&lit.raw),
            CharClass(class) => fmt.write_str(&class.raw),
            Any => fmt.write_str("."),
        }
    }
}

impl Display for Code {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

impl Display for Rule {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.name.val())?;
        if let Some(display_name) = &self.display_name {
            write!(fmt, " {}", display_name.val().raw)?;
        }

        write!(fmt, " <- {}", self.expr.val())
    }
}

impl Display for Grammar {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(init) = &self.init {
            writeln!(fmt, "{}", init.val())?;
            writeln!(fmt)?;
        }

        for rule in &self.rules {
            writeln!(fmt, "{}", rule)?;
        }

        Ok(())
    }
}
