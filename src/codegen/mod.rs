//! Generación de código.
//!
//! # Código emitido
//! El parser generado es un archivo de Rust con cuatro regiones, en este
//! orden:
//! 1. El bloque inicial de la gramática, sin llaves.
//! 2. `build_grammar()`, que construye la tabla de reglas y expresiones
//!    de [`pegc_runtime::grammar`] con literales de estructuras.
//! 3. Por cada acción o predicado, una función `on<Regla><Índice>` con el
//!    código del usuario y un trampolín `callon<Regla><Índice>` que extrae
//!    las etiquetas visibles y la invoca.
//! 4. Puntos de entrada que delegan a `pegc_runtime`.
//!
//! # Índices
//! Las expresiones de cada regla se numeran en preorden desde 1, donde 1
//! es la raíz de la regla. El índice de una acción o predicado forma
//! parte del nombre de su función, por lo cual los nombres son estables
//! mientras la regla no cambie.
//!
//! # Etiquetas
//! Las etiquetas visibles en una acción son las de su alcance léxico. Una
//! regla, cada alternativa de una elección, el operando de una etiqueta,
//! de `&`, de `!` y de los sufijos abren un alcance nuevo; una secuencia
//! no lo hace. El intérprete replica exactamente esta disciplina.

use std::{
    collections::HashMap,
    fmt::{self, Write as _},
    io,
    rc::Rc,
};

use bitflags::bitflags;
use pegc_runtime::{fold_case, grammar::UnicodeClass};
use thiserror::Error;

use crate::{
    ast::{Code, Expr, Grammar, Rule},
    error::Diagnostics,
    source::{Located, Location, Position, Source},
};

bitflags! {
    /// Regiones opcionales del código emitido.
    pub struct EmitFlags: u32 {
        /// Comentario inicial que identifica al archivo como generado.
        const HEADER = 0x01;

        /// `grammar()`, `parse()`, `parse_reader()` y `parse_file()`.
        ///
        /// Sin esta región, el código del usuario debe construir la
        /// gramática con `build_grammar()` e invocar `pegc_runtime`.
        const ENTRYPOINTS = 0x02;
    }
}

/// Configuración del generador.
#[derive(Clone, Debug)]
pub struct Options {
    /// Ruta bajo la cual el código emitido alcanza al crate de soporte.
    pub runtime: String,

    /// Nombre del argumento [`pegc_runtime::Current`] de las funciones
    /// del usuario.
    pub receiver: String,

    pub flags: EmitFlags,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            runtime: String::from("::pegc_runtime"),
            receiver: String::from("c"),
            flags: EmitFlags::all(),
        }
    }
}

/// Defecto de una gramática que impide emitir su parser.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("grammar has no rule")]
    NoRules,

    #[error("rule {0} redefined")]
    DuplicateRule(String),

    #[error("undefined rule: {0}")]
    UndefinedRule(String),

    #[error("invalid Unicode class: {0}")]
    UnknownUnicodeClass(String),

    #[error("label {0} redefined in the same scope")]
    DuplicateLabel(String),

    #[error("label {0} is not a valid identifier")]
    InvalidLabel(String),
}

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("grammar has {} error(s)", .0.len())]
    Invalid(Diagnostics),

    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("formatting error")]
    Format(#[from] fmt::Error),
}

/// Palabras reservadas que sí admiten la forma `r#nombre`.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn", "else",
    "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in", "let", "loop", "macro", "match", "mod",
    "move", "mut", "override", "priv", "pub", "ref", "return", "static", "struct", "trait", "true", "try",
    "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Nombres que no pueden ser identificadores, ni siquiera crudos.
const FORBIDDEN: &[&str] = &["_", "crate", "self", "Self", "super"];

/// Emite el parser de una gramática en `output`.
pub fn emit<W: io::Write>(
    grammar: &Grammar,
    source: &Rc<Source>,
    options: &Options,
    output: &mut W,
) -> Result<(), EmitError> {
    let code = build(grammar, source, options)?;
    output.write_all(code.as_bytes())?;

    Ok(())
}

/// Construye el código del parser de una gramática.
///
/// Todos los defectos de la gramática se reportan juntos. `source` es el
/// origen de la gramática, en el cual se ubican los errores que no
/// corresponden a ningún nodo.
pub fn build(grammar: &Grammar, source: &Rc<Source>, options: &Options) -> Result<String, EmitError> {
    let mut builder = Builder {
        output: String::new(),
        options,
        errors: Vec::new(),
        rules: HashMap::new(),
        depth: 0,
        rule: "",
        index: 0,
        scopes: Vec::new(),
        functions: Vec::new(),
    };

    if grammar.rules.is_empty() {
        let location = Location::new(Rc::clone(source), Position::default());
        builder.errors.push(Located::at(BuildError::NoRules, location));
    }

    builder.index_rules(grammar);
    builder.grammar(grammar)?;

    if builder.errors.is_empty() {
        Ok(builder.output)
    } else {
        let mut diagnostics = Diagnostics::from(builder.errors);
        diagnostics.sort();

        Err(EmitError::Invalid(diagnostics))
    }
}

struct Builder<'a> {
    output: String,
    options: &'a Options,
    errors: Vec<Located<BuildError>>,
    rules: HashMap<&'a str, usize>,
    depth: usize,
    rule: &'a str,
    index: usize,
    scopes: Vec<Vec<&'a str>>,
    functions: Vec<Function<'a>>,
}

/// Función de usuario pendiente de emitir.
struct Function<'a> {
    name: String,
    code: &'a Code,
    args: Vec<&'a str>,
    predicate: bool,
}

impl<'a> Builder<'a> {
    fn index_rules(&mut self, grammar: &'a Grammar) {
        for (index, rule) in grammar.rules.iter().enumerate() {
            let name = rule.name.val().as_str();
            if self.rules.contains_key(name) {
                let error = BuildError::DuplicateRule(name.to_owned());
                self.errors.push(Located::at(error, rule.name.location().clone()));
            } else {
                self.rules.insert(name, index);
            }
        }
    }

    fn grammar(&mut self, grammar: &'a Grammar) -> fmt::Result {
        let options = self.options;
        let runtime = options.runtime.as_str();

        if options.flags.contains(EmitFlags::HEADER) {
            emit!(self, "// Code generated by pegc {}; DO NOT EDIT.", env!("CARGO_PKG_VERSION"))?;
            emit!(self)?;
        }

        if let Some(init) = &grammar.init {
            emit!(self, "{}", trim_code(init.val()))?;
            emit!(self)?;
        }

        emit!(self, "pub fn build_grammar() -> {}::Grammar {{", runtime)?;
        self.depth += 1;

        emit!(self, "use {}::{{grammar::*, Position}};", runtime)?;
        emit!(self)?;
        emit!(self, "Grammar::new(")?;
        self.depth += 1;

        emit!(self, "Position::new(1, 0, 0),")?;
        emit!(self, "vec![")?;
        self.depth += 1;

        for rule in &grammar.rules {
            self.rule(rule)?;
        }

        self.depth -= 1;
        emit!(self, "],")?;

        self.depth -= 1;
        emit!(self, ")")?;

        self.depth -= 1;
        emit!(self, "}}")?;

        for function in std::mem::take(&mut self.functions) {
            self.function(&function)?;
        }

        if options.flags.contains(EmitFlags::ENTRYPOINTS) {
            self.entrypoints()?;
        }

        Ok(())
    }

    fn rule(&mut self, rule: &'a Rule) -> fmt::Result {
        self.rule = rule.name.val();
        self.index = 0;

        emit!(self, "Rule {{")?;
        self.depth += 1;

        emit!(self, "pos: {},", position(rule.name.location()))?;
        emit!(self, "name: {},", quote(rule.name.val()))?;

        match &rule.display_name {
            Some(display_name) => emit!(self, "display_name: Some({}),", quote(&display_name.val().value))?,
            None => emit!(self, "display_name: None,")?,
        }

        self.scopes.push(Vec::new());
        self.expr(&rule.expr, "expr: ", "}),")?;
        self.scopes.pop();

        self.depth -= 1;
        emit!(self, "}},")
    }

    /// Emite un nodo como `{open}Expr::Tipo(Estructura { ... }{close}`.
    fn expr(&mut self, expr: &'a Located<Expr>, open: &str, close: &str) -> fmt::Result {
        self.index += 1;
        let index = self.index;
        let pos = position(expr.location());

        let (variant, structure) = match expr.val() {
            Expr::Choice(_) => ("Choice", "ChoiceExpr"),
            Expr::Action { .. } => ("Action", "ActionExpr"),
            Expr::Seq(_) => ("Seq", "SeqExpr"),
            Expr::Labeled { .. } => ("Labeled", "LabeledExpr"),
            Expr::And(_) => ("And", "PrefixExpr"),
            Expr::Not(_) => ("Not", "PrefixExpr"),
            Expr::ZeroOrOne(_) => ("ZeroOrOne", "SuffixExpr"),
            Expr::ZeroOrMore(_) => ("ZeroOrMore", "SuffixExpr"),
            Expr::OneOrMore(_) => ("OneOrMore", "SuffixExpr"),
            Expr::RuleRef(_) => ("RuleRef", "RuleRefExpr"),
            Expr::AndCode(_) => ("AndCode", "CodeExpr"),
            Expr::NotCode(_) => ("NotCode", "CodeExpr"),
            Expr::Lit(_) => ("Lit", "LitMatcher"),
            Expr::CharClass(_) => ("CharClass", "CharClassMatcher"),
            Expr::Any => ("Any", "AnyMatcher"),
        };

        emit!(self, "{}Expr::{}({} {{", open, variant, structure)?;
        self.depth += 1;
        emit!(self, "pos: {},", pos)?;

        match expr.val() {
            Expr::Choice(alternatives) => {
                emit!(self, "alternatives: vec![")?;
                self.depth += 1;

                for alternative in alternatives {
                    self.scoped(alternative, "", "}),")?;
                }

                self.depth -= 1;
                emit!(self, "],")?;
            }

            Expr::Action { expr, code } => {
                let name = self.function_name(index);
                emit!(self, "run: call{},", name)?;

                self.expr(expr, "expr: Box::new(", "})),")?;
                self.record(name, code.val(), false);
            }

            Expr::Seq(exprs) => {
                emit!(self, "exprs: vec![")?;
                self.depth += 1;

                for expr in exprs {
                    self.expr(expr, "", "}),")?;
                }

                self.depth -= 1;
                emit!(self, "],")?;
            }

            Expr::Labeled { label, expr } => {
                self.bind(label);
                emit!(self, "label: {},", quote(label.val()))?;

                self.scoped(expr, "expr: Box::new(", "})),")?;
            }

            Expr::And(expr)
            | Expr::Not(expr)
            | Expr::ZeroOrOne(expr)
            | Expr::ZeroOrMore(expr)
            | Expr::OneOrMore(expr) => self.scoped(expr, "expr: Box::new(", "})),")?,

            Expr::RuleRef(name) => {
                let target = match self.rules.get(name.as_str()) {
                    Some(&target) => target,
                    None => {
                        let error = BuildError::UndefinedRule(name.clone());
                        self.errors.push(Located::at(error, expr.location().clone()));

                        usize::MAX
                    }
                };

                emit!(self, "name: {},", quote(name))?;
                emit!(self, "index: {},", target)?;
            }

            Expr::AndCode(code) | Expr::NotCode(code) => {
                let name = self.function_name(index);
                emit!(self, "run: call{},", name)?;

                self.record(name, code, true);
            }

            Expr::Lit(lit) => {
                let value = match lit.ignore_case {
                    true => lit.value.chars().map(fold_case).collect(),
                    false => lit.value.clone(),
                };

                emit!(self, "val: {},", quote(&value))?;
                emit!(self, "ignore_case: {},", lit.ignore_case)?;
            }

            Expr::CharClass(class) => {
                let fold = |c: char| if class.class.ignore_case { fold_case(c) } else { c };

                let chars = list(class.class.chars.iter(), |&c| quote_char(fold(c)));
                let ranges = list(class.class.ranges.iter(), |&(low, high)| {
                    format!("({}, {})", quote_char(fold(low)), quote_char(fold(high)))
                });

                for name in &class.class.unicode_classes {
                    if UnicodeClass::lookup(name).is_none() {
                        let error = BuildError::UnknownUnicodeClass(name.clone());
                        self.errors.push(Located::at(error, expr.location().clone()));
                    }
                }

                let classes = list(class.class.unicode_classes.iter(), |name| {
                    format!("UnicodeClass::named({})", quote(name))
                });

                emit!(self, "val: {},", quote(&class.raw))?;
                emit!(self, "chars: vec![{}],", chars)?;
                emit!(self, "ranges: vec![{}],", ranges)?;
                emit!(self, "classes: vec![{}],", classes)?;
                emit!(self, "ignore_case: {},", class.class.ignore_case)?;
                emit!(self, "inverted: {},", class.class.inverted)?;
            }

            Expr::Any => (),
        }

        self.depth -= 1;
        emit!(self, "{}", close)
    }

    /// Emite una subexpresión dentro de un alcance de etiquetas nuevo.
    fn scoped(&mut self, expr: &'a Located<Expr>, open: &str, close: &str) -> fmt::Result {
        self.scopes.push(Vec::new());
        let result = self.expr(expr, open, close);
        self.scopes.pop();

        result
    }

    /// Agrega una etiqueta al alcance actual.
    fn bind(&mut self, label: &'a Located<String>) {
        let name = label.val().as_str();

        let error = if FORBIDDEN.contains(&name) || name == self.options.receiver {
            Some(BuildError::InvalidLabel(name.to_owned()))
        } else if self.scopes.last().map_or(false, |scope| scope.contains(&name)) {
            Some(BuildError::DuplicateLabel(name.to_owned()))
        } else {
            None
        };

        match error {
            Some(error) => self.errors.push(Located::at(error, label.location().clone())),
            None => {
                if let Some(scope) = self.scopes.last_mut() {
                    scope.push(name);
                }
            }
        }
    }

    fn function_name(&self, index: usize) -> String {
        format!("on{}{}", self.rule, index)
    }

    /// Registra una función de usuario con las etiquetas visibles.
    fn record(&mut self, name: String, code: &'a Code, predicate: bool) {
        let args = self.scopes.last().cloned().unwrap_or_default();
        self.functions.push(Function {
            name,
            code,
            args,
            predicate,
        });
    }

    fn function(&mut self, function: &Function<'a>) -> fmt::Result {
        let options = self.options;
        let (runtime, receiver) = (options.runtime.as_str(), options.receiver.as_str());

        let output = match function.predicate {
            false => format!("{}::ActionResult", runtime),
            true => format!("{}::anyhow::Result<bool>", runtime),
        };

        let params: String = function
            .args
            .iter()
            .map(|arg| format!(", {}: {}::Value", ident(arg), runtime))
            .collect();

        let args: String = function.args.iter().map(|arg| format!(", {}", ident(arg))).collect();

        emit!(self)?;
        emit!(self, "#[allow(non_snake_case, unused_variables)]")?;
        emit!(
            self,
            "fn {}({}: &mut {}::Current<'_>{}) -> {} {{",
            function.name,
            receiver,
            runtime,
            params,
            output
        )?;

        emit!(self, "{}", trim_code(function.code))?;
        emit!(self, "}}")?;
        emit!(self)?;

        emit!(self, "#[allow(non_snake_case)]")?;
        emit!(self, "fn call{}({}: &mut {}::Current<'_>) -> {} {{", function.name, receiver, runtime, output)?;
        self.depth += 1;

        for arg in &function.args {
            emit!(self, "let {} = {}.label({});", ident(arg), receiver, quote(arg))?;
        }

        emit!(self, "{}({}{})", function.name, receiver, args)?;

        self.depth -= 1;
        emit!(self, "}}")
    }

    fn entrypoints(&mut self) -> fmt::Result {
        let runtime = self.options.runtime.as_str();

        emit!(self)?;
        emit!(self, "{}::lazy_static::lazy_static! {{", runtime)?;
        emit!(self, "    static ref GRAMMAR: {}::Grammar = build_grammar();", runtime)?;
        emit!(self, "}}")?;
        emit!(self)?;

        emit!(self, "pub fn grammar() -> &'static {}::Grammar {{", runtime)?;
        emit!(self, "    &GRAMMAR")?;
        emit!(self, "}}")?;
        emit!(self)?;

        emit!(self, "pub fn parse<I: Into<Vec<u8>>>(")?;
        emit!(self, "    filename: &str,")?;
        emit!(self, "    input: I,")?;
        emit!(self, "    options: {}::Options,", runtime)?;
        emit!(self, ") -> Result<{0}::Value, {0}::Errors> {{", runtime)?;
        emit!(self, "    {}::parse(&GRAMMAR, filename, input, options)", runtime)?;
        emit!(self, "}}")?;
        emit!(self)?;

        emit!(self, "pub fn parse_reader<R: ::std::io::Read>(")?;
        emit!(self, "    filename: &str,")?;
        emit!(self, "    reader: R,")?;
        emit!(self, "    options: {}::Options,", runtime)?;
        emit!(self, ") -> Result<{0}::Value, {0}::Error> {{", runtime)?;
        emit!(self, "    {}::parse_reader(&GRAMMAR, filename, reader, options)", runtime)?;
        emit!(self, "}}")?;
        emit!(self)?;

        emit!(self, "pub fn parse_file<P: AsRef<::std::path::Path>>(")?;
        emit!(self, "    path: P,")?;
        emit!(self, "    options: {}::Options,", runtime)?;
        emit!(self, ") -> Result<{0}::Value, {0}::Error> {{", runtime)?;
        emit!(self, "    {}::parse_file(&GRAMMAR, path, options)", runtime)?;
        emit!(self, "}}")
    }

    fn indent(&mut self) -> fmt::Result {
        write!(self.output, "{:1$}", "", self.depth * 4)
    }
}

/// Contenido de un bloque sin llaves ni saltos de línea en los extremos.
fn trim_code(code: &Code) -> &str {
    let body = code.body();
    let body = body.strip_prefix('\n').unwrap_or(body);
    body.strip_suffix('\n').unwrap_or(body)
}

fn position(location: &Location) -> String {
    let position = location.position();
    format!(
        "Position::new({}, {}, {})",
        position.line(),
        position.column(),
        position.offset()
    )
}

/// Identificador de Rust para una etiqueta.
fn ident(label: &str) -> String {
    if KEYWORDS.contains(&label) {
        format!("r#{}", label)
    } else {
        label.to_owned()
    }
}

fn list<T, I, F>(items: I, format: F) -> String
where
    I: Iterator<Item = T>,
    F: FnMut(T) -> String,
{
    items.map(format).collect::<Vec<_>>().join(", ")
}

/// Literal de string en ASCII.
fn quote(string: &str) -> String {
    let mut quoted = String::with_capacity(string.len() + 2);
    quoted.push('"');

    for c in string.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            c => escape(c, &mut quoted),
        }
    }

    quoted.push('"');
    quoted
}

/// Literal de carácter en ASCII.
fn quote_char(c: char) -> String {
    let mut quoted = String::from("'");
    match c {
        '\'' => quoted.push_str("\\'"),
        c => escape(c, &mut quoted),
    }

    quoted.push('\'');
    quoted
}

fn escape(c: char, output: &mut String) {
    match c {
        '\\' => output.push_str("\\\\"),
        '\n' => output.push_str("\\n"),
        '\r' => output.push_str("\\r"),
        '\t' => output.push_str("\\t"),
        '\0' => output.push_str("\\0"),
        ' '..='~' => output.push(c),
        c => output.push_str(&format!("\\u{{{:x}}}", c as u32)),
    }
}
