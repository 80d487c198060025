//! Representación recorrible de una gramática.
//!
//! Los parsers emitidos construyen una única instancia de [`Grammar`]
//! con literales de estas estructuras; el intérprete en
//! [`crate::parser`] la recorre sin modificarla. Toda cadena es
//! `'static` porque proviene del código emitido.

use crate::{position::Position, ActionFn, PredicateFn};
use regex_syntax::hir::{Class, HirKind};

/// Gramática completa, con reglas en orden de definición.
///
/// La primera regla es el punto de entrada por omisión.
pub struct Grammar {
    pub pos: Position,
    pub rules: Vec<Rule>,
}

impl Grammar {
    pub fn new(pos: Position, rules: Vec<Rule>) -> Self {
        Grammar { pos, rules }
    }

    /// Busca el índice de una regla por nombre.
    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.name == name)
    }
}

pub struct Rule {
    pub pos: Position,
    pub name: &'static str,
    pub display_name: Option<&'static str>,
    pub expr: Expr,
}

impl Rule {
    /// Nombre que se usa en diagnósticos.
    pub fn display(&self) -> &'static str {
        self.display_name.unwrap_or(self.name)
    }
}

/// Nodo de expresión.
pub enum Expr {
    Choice(ChoiceExpr),
    Action(ActionExpr),
    Seq(SeqExpr),
    Labeled(LabeledExpr),
    And(PrefixExpr),
    Not(PrefixExpr),
    ZeroOrOne(SuffixExpr),
    ZeroOrMore(SuffixExpr),
    OneOrMore(SuffixExpr),
    RuleRef(RuleRefExpr),
    AndCode(CodeExpr),
    NotCode(CodeExpr),
    Lit(LitMatcher),
    CharClass(CharClassMatcher),
    Any(AnyMatcher),
}

impl Expr {
    pub fn pos(&self) -> Position {
        match self {
            Expr::Choice(expr) => expr.pos,
            Expr::Action(expr) => expr.pos,
            Expr::Seq(expr) => expr.pos,
            Expr::Labeled(expr) => expr.pos,
            Expr::And(expr) | Expr::Not(expr) => expr.pos,
            Expr::ZeroOrOne(expr) | Expr::ZeroOrMore(expr) | Expr::OneOrMore(expr) => expr.pos,
            Expr::RuleRef(expr) => expr.pos,
            Expr::AndCode(expr) | Expr::NotCode(expr) => expr.pos,
            Expr::Lit(expr) => expr.pos,
            Expr::CharClass(expr) => expr.pos,
            Expr::Any(expr) => expr.pos,
        }
    }
}

pub struct ChoiceExpr {
    pub pos: Position,
    pub alternatives: Vec<Expr>,
}

pub struct ActionExpr {
    pub pos: Position,
    pub expr: Box<Expr>,
    pub run: ActionFn,
}

pub struct SeqExpr {
    pub pos: Position,
    pub exprs: Vec<Expr>,
}

pub struct LabeledExpr {
    pub pos: Position,
    pub label: &'static str,
    pub expr: Box<Expr>,
}

/// `&e` o `!e`.
pub struct PrefixExpr {
    pub pos: Position,
    pub expr: Box<Expr>,
}

/// `e?`, `e*` o `e+`.
pub struct SuffixExpr {
    pub pos: Position,
    pub expr: Box<Expr>,
}

/// Referencia a otra regla.
///
/// El índice de la regla objetivo se resuelve al emitir el parser, por
/// lo cual la evaluación no busca nombres.
pub struct RuleRefExpr {
    pub pos: Position,
    pub name: &'static str,
    pub index: usize,
}

/// `&{ ... }` o `!{ ... }`.
pub struct CodeExpr {
    pub pos: Position,
    pub run: PredicateFn,
}

pub struct LitMatcher {
    pub pos: Position,
    /// En minúsculas si `ignore_case`.
    pub val: &'static str,
    pub ignore_case: bool,
}

pub struct CharClassMatcher {
    pub pos: Position,
    /// Texto original de la clase, incluyendo corchetes.
    pub val: &'static str,
    pub chars: Vec<char>,
    pub ranges: Vec<(char, char)>,
    pub classes: Vec<UnicodeClass>,
    pub ignore_case: bool,
    pub inverted: bool,
}

impl CharClassMatcher {
    /// Determina si una runa pertenece a la clase, antes de invertir.
    pub fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
            || self.ranges.iter().any(|&(low, high)| low <= c && c <= high)
            || self.classes.iter().any(|class| class.contains(c))
    }
}

pub struct AnyMatcher {
    pub pos: Position,
}

/// Tabla de rangos de una clase Unicode, como `L` o `Greek`.
#[derive(Clone, Debug)]
pub struct UnicodeClass {
    pub name: &'static str,
    ranges: Vec<(char, char)>,
}

impl UnicodeClass {
    /// Resuelve una clase Unicode por nombre.
    ///
    /// Un nombre desconocido resulta en una tabla vacía; `pegc` rechaza
    /// estos nombres antes de emitir un parser, ver [`UnicodeClass::lookup`].
    pub fn named(name: &'static str) -> Self {
        let ranges = Self::lookup(name).unwrap_or_default();
        UnicodeClass { name, ranges }
    }

    /// Obtiene los rangos de una categoría general o escritura Unicode.
    pub fn lookup(name: &str) -> Option<Vec<(char, char)>> {
        if name.is_empty() || name.contains(|c: char| c == '{' || c == '}' || c == '\\') {
            return None;
        }

        let pattern = format!("\\p{{{}}}", name);
        let hir = regex_syntax::Parser::new().parse(&pattern).ok()?;

        match hir.kind() {
            HirKind::Class(Class::Unicode(class)) => Some(
                class
                    .iter()
                    .map(|range| (range.start(), range.end()))
                    .collect(),
            ),

            _ => None,
        }
    }

    pub fn contains(&self, c: char) -> bool {
        self.ranges
            .binary_search_by(|&(low, high)| {
                if high < c {
                    std::cmp::Ordering::Less
                } else if low > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }
}
