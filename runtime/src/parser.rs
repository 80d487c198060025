//! Intérprete de gramáticas.
//!
//! # Evaluación
//! Cada expresión se evalúa a partir del cursor actual y resulta en
//! `Some(valor)` si reconoce entrada o `None` si no. Una expresión que
//! falla siempre deja el cursor donde lo encontró. Los errores fatales
//! (límite de expresiones, pánicos recuperados, reglas inexistentes) se
//! registran y se propagan como [`Halt`], lo cual termina el parsing.
//!
//! # Fallo más lejano
//! Los reconocedores terminales y las reglas que fallan reportan lo que
//! esperaban en su posición. Solo se conserva lo esperado en el mayor
//! desplazamiento alcanzado; si la regla de entrada falla, esa lista
//! forma el mensaje de error.
//!
//! # Estado
//! El estado (`Current::state`) se respalda antes de cada alternativa,
//! secuencia y lookahead, y se restaura si estas fallan. El almacén
//! global (`Current::global`) nunca se restaura. Con memoización activa,
//! reutilizar el resultado de una regla no repite las mutaciones que sus
//! acciones hicieron sobre el estado.

use crate::{
    error::{ErrorKind, Errors, ParseError},
    grammar::*,
    input::{Input, Savepoint},
    options::{Options, ParseFlags},
    position::Position,
    Store, Value,
};

use std::{
    any::Any,
    borrow::Cow,
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    fmt::Display,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
};

/// Etiquetas visibles en un alcance.
type Labels = HashMap<&'static str, Value>;

/// Estadísticas de una ejecución.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Cantidad de expresiones evaluadas.
    pub expr_cnt: u64,

    /// Por cada elección (`"<regla> <línea>:<columna>"`), cuántas veces
    /// reconoció cada alternativa (índice desde 1) o ninguna.
    pub choice_alt_cnt: BTreeMap<String, BTreeMap<String, usize>>,
}

/// Contexto que recibe el código del usuario.
pub struct Current<'p> {
    /// Posición donde inicia lo reconocido.
    pub pos: Position,

    /// Estado que se restaura al retroceder.
    pub state: &'p mut Store,

    /// Almacén que persiste durante todo el parsing.
    pub global: &'p mut Store,

    text: Cow<'p, str>,
    labels: Option<&'p Labels>,
}

impl Current<'_> {
    /// Texto reconocido por la expresión de la acción. Los predicados
    /// no reconocen texto.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Obtiene el valor de una etiqueta visible, o `Nil`.
    pub fn label(&self, name: &str) -> Value {
        self.labels
            .and_then(|labels| labels.get(name))
            .cloned()
            .unwrap_or_default()
    }
}

/// Interrupción por un error fatal ya registrado.
#[derive(Debug)]
pub(crate) struct Halt;

type Eval = Result<Option<Value>, Halt>;

struct Memoized {
    value: Option<Value>,
    end: Savepoint,
}

/// Parsea `input` con `grammar`.
pub fn parse<I>(grammar: &Grammar, filename: &str, input: I, options: Options) -> Result<Value, Errors>
where
    I: Into<Vec<u8>>,
{
    let allow_invalid = options.flags.contains(ParseFlags::ALLOW_INVALID_UTF8);
    match Input::new(input.into(), allow_invalid) {
        Ok(input) => Parser::new(grammar, filename, input, options).run(),
        Err(pos) => {
            let mut errors = Errors::default();
            errors.push(ParseError {
                filename: filename.to_owned(),
                pos,
                rule: None,
                rule_stack: Vec::new(),
                expected: Vec::new(),
                kind: ErrorKind::InvalidEncoding,
            });

            Err(errors)
        }
    }
}

pub(crate) struct Parser<'g> {
    grammar: &'g Grammar,
    filename: String,
    input: Input,
    pt: Savepoint,
    flags: ParseFlags,
    entrypoint: Option<String>,
    max_expressions: Option<u64>,

    state: Store,
    global: Store,
    vstack: Vec<Labels>,
    rstack: Vec<&'g Rule>,
    memo: HashMap<(usize, usize), Memoized>,

    errors: Errors,
    max_fail_pos: Position,
    max_fail_expected: Vec<String>,
    max_fail_rules: Vec<String>,
    max_fail_invert_expected: bool,

    depth: usize,
    stats: Stats,
    stats_out: Option<(Rc<RefCell<Stats>>, String)>,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar, filename: &str, input: Input, options: Options) -> Self {
        let Options {
            flags,
            entrypoint,
            max_expressions,
            state,
            global,
            stats,
        } = options;

        Parser {
            grammar,
            filename: filename.to_owned(),
            input,
            pt: Savepoint::start(),
            flags,
            entrypoint,
            max_expressions,
            state,
            global,
            vstack: Vec::new(),
            rstack: Vec::new(),
            memo: HashMap::new(),
            errors: Errors::default(),
            max_fail_pos: Position::new(1, 1, 0),
            max_fail_expected: Vec::new(),
            max_fail_rules: Vec::new(),
            max_fail_invert_expected: false,
            depth: 0,
            stats: Stats::default(),
            stats_out: stats,
        }
    }

    pub fn run(mut self) -> Result<Value, Errors> {
        if self.grammar.rules.is_empty() {
            self.add_err(ErrorKind::NoRule);
            return Err(self.errors);
        }

        let start = match &self.entrypoint {
            None => 0,
            Some(name) => match self.grammar.rule_index(name) {
                Some(index) => index,
                None => {
                    self.add_err(ErrorKind::InvalidEntrypoint);
                    return Err(self.errors);
                }
            },
        };

        self.input.read(&mut self.pt);
        let result = self.parse_rule(start, "");

        if let Some((stats, _)) = &self.stats_out {
            *stats.borrow_mut() = std::mem::take(&mut self.stats);
        }

        match result {
            Err(Halt) => Err(self.errors),

            Ok(None) => {
                if self.errors.is_empty() {
                    self.add_no_match();
                }

                Err(self.errors)
            }

            Ok(Some(value)) if self.errors.is_empty() => Ok(value),
            Ok(Some(_)) => Err(self.errors),
        }
    }

    fn parse_rule(&mut self, index: usize, name: &str) -> Eval {
        let grammar = self.grammar;
        let rule = match grammar.rules.get(index) {
            Some(rule) => rule,
            None => {
                self.add_err(ErrorKind::UndefinedRule(name.to_owned()));
                return Err(Halt);
            }
        };

        self.trace_in(rule);

        let start = self.pt;
        let memoize = self.flags.contains(ParseFlags::MEMOIZE);
        let key = (index, start.pos.offset);

        if memoize {
            if let Some(memo) = self.memo.get(&key) {
                let value = memo.value.clone();
                self.pt = memo.end;

                self.trace_out(rule, start, value.is_some());
                return Ok(value);
            }
        }

        self.rstack.push(rule);
        self.vstack.push(Labels::new());

        let result = self.parse_expr(&rule.expr);

        self.vstack.pop();
        let value = result?;

        if value.is_none() {
            self.fail_at(false, start.pos, rule.display());
        }

        self.rstack.pop();

        if memoize {
            let memo = Memoized {
                value: value.clone(),
                end: self.pt,
            };

            self.memo.insert(key, memo);
        }

        self.trace_out(rule, start, value.is_some());
        Ok(value)
    }

    fn parse_expr(&mut self, expr: &'g Expr) -> Eval {
        self.stats.expr_cnt += 1;
        if let Some(max) = self.max_expressions {
            if self.stats.expr_cnt > max {
                self.add_err(ErrorKind::MaxExpressions);
                return Err(Halt);
            }
        }

        match expr {
            Expr::Choice(choice) => self.parse_choice(choice),
            Expr::Action(action) => self.parse_action(action),
            Expr::Seq(seq) => self.parse_seq(seq),
            Expr::Labeled(labeled) => self.parse_labeled(labeled),
            Expr::And(and) => self.parse_lookahead(and, false),
            Expr::Not(not) => self.parse_lookahead(not, true),
            Expr::ZeroOrOne(optional) => self.parse_zero_or_one(optional),
            Expr::ZeroOrMore(repeat) => self.parse_repeat(repeat, 0),
            Expr::OneOrMore(repeat) => self.parse_repeat(repeat, 1),
            Expr::RuleRef(rule_ref) => self.parse_rule(rule_ref.index, rule_ref.name),
            Expr::AndCode(code) => self.parse_code(code, false),
            Expr::NotCode(code) => self.parse_code(code, true),
            Expr::Lit(lit) => self.parse_lit(lit),
            Expr::CharClass(class) => self.parse_char_class(class),
            Expr::Any(_) => self.parse_any(),
        }
    }

    fn parse_choice(&mut self, choice: &'g ChoiceExpr) -> Eval {
        for (alt, expr) in choice.alternatives.iter().enumerate() {
            let state = self.state.clone();

            self.vstack.push(Labels::new());
            let result = self.parse_expr(expr);
            self.vstack.pop();

            if let Some(value) = result? {
                self.count_choice(choice, Some(alt + 1));
                return Ok(Some(value));
            }

            self.state = state;
        }

        self.count_choice(choice, None);
        Ok(None)
    }

    fn parse_action(&mut self, action: &'g ActionExpr) -> Eval {
        let start = self.pt;
        if self.parse_expr(&action.expr)?.is_none() {
            return Ok(None);
        }

        let recover = self.flags.contains(ParseFlags::RECOVER);
        let result = {
            let mut current = Current {
                pos: start.pos,
                state: &mut self.state,
                global: &mut self.global,
                text: self.input.slice(start.pos.offset, self.pt.pos.offset),
                labels: self.vstack.last(),
            };

            call_user(recover, || (action.run)(&mut current))
        };

        match result {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(error)) => {
                self.add_err_at(ErrorKind::Action(error), start.pos);
                Ok(Some(Value::Nil))
            }

            Err(message) => {
                self.add_err(ErrorKind::Panic(message));
                Err(Halt)
            }
        }
    }

    fn parse_code(&mut self, code: &'g CodeExpr, not: bool) -> Eval {
        let pos = self.pt.pos;
        let recover = self.flags.contains(ParseFlags::RECOVER);

        let result = {
            let mut current = Current {
                pos,
                state: &mut self.state,
                global: &mut self.global,
                text: Cow::Borrowed(""),
                labels: self.vstack.last(),
            };

            call_user(recover, || (code.run)(&mut current))
        };

        let ok = match result {
            Ok(Ok(ok)) => ok,
            Ok(Err(error)) => {
                self.add_err_at(ErrorKind::Action(error), pos);
                false
            }

            Err(message) => {
                self.add_err(ErrorKind::Panic(message));
                return Err(Halt);
            }
        };

        Ok((ok != not).then(|| Value::Nil))
    }

    fn parse_seq(&mut self, seq: &'g SeqExpr) -> Eval {
        let start = self.pt;
        let state = self.state.clone();

        let mut values = Vec::with_capacity(seq.exprs.len());
        for expr in &seq.exprs {
            match self.parse_expr(expr)? {
                Some(value) => values.push(value),
                None => {
                    self.state = state;
                    self.pt = start;
                    return Ok(None);
                }
            }
        }

        Ok(Some(Value::List(values)))
    }

    fn parse_labeled(&mut self, labeled: &'g LabeledExpr) -> Eval {
        let value = self.scoped(&labeled.expr)?;

        if let (Some(value), Some(labels)) = (&value, self.vstack.last_mut()) {
            labels.insert(labeled.label, value.clone());
        }

        Ok(value)
    }

    fn parse_lookahead(&mut self, prefix: &'g PrefixExpr, not: bool) -> Eval {
        let pt = self.pt;
        let state = self.state.clone();

        if not {
            self.max_fail_invert_expected = !self.max_fail_invert_expected;
        }

        let matched = self.scoped(&prefix.expr)?.is_some();

        if not {
            self.max_fail_invert_expected = !self.max_fail_invert_expected;
        }

        self.state = state;
        self.pt = pt;

        Ok((matched != not).then(|| Value::Nil))
    }

    fn parse_zero_or_one(&mut self, suffix: &'g SuffixExpr) -> Eval {
        let value = self.scoped(&suffix.expr)?;
        Ok(Some(value.unwrap_or_default()))
    }

    fn parse_repeat(&mut self, suffix: &'g SuffixExpr, min: usize) -> Eval {
        let mut values = Vec::new();

        loop {
            let before = self.pt.pos.offset;
            match self.scoped(&suffix.expr)? {
                None => break,
                Some(value) => {
                    values.push(value);

                    // Una repetición que no avanza terminaría en un ciclo infinito
                    if self.pt.pos.offset == before {
                        break;
                    }
                }
            }
        }

        Ok((values.len() >= min).then(|| Value::List(values)))
    }

    fn parse_lit(&mut self, lit: &'g LitMatcher) -> Eval {
        let start = self.pt;
        let suffix = if lit.ignore_case { "i" } else { "" };

        for want in lit.val.chars() {
            let rune = self.pt.rune.map(|rune| {
                if lit.ignore_case {
                    crate::fold_case(rune)
                } else {
                    rune
                }
            });

            if rune != Some(want) {
                self.fail_at(false, start.pos, format_args!("{:?}{}", lit.val, suffix));
                self.pt = start;
                return Ok(None);
            }

            self.input.read(&mut self.pt);
        }

        self.fail_at(true, start.pos, format_args!("{:?}{}", lit.val, suffix));
        Ok(Some(self.text_from(start)))
    }

    fn parse_char_class(&mut self, class: &'g CharClassMatcher) -> Eval {
        let start = self.pt;
        let rune = match start.rune {
            Some(rune) if class.ignore_case => crate::fold_case(rune),
            Some(rune) => rune,
            None => {
                self.fail_at(false, start.pos, class.val);
                return Ok(None);
            }
        };

        if class.contains(rune) == class.inverted {
            self.fail_at(false, start.pos, class.val);
            return Ok(None);
        }

        self.fail_at(true, start.pos, class.val);
        self.input.read(&mut self.pt);

        Ok(Some(self.text_from(start)))
    }

    fn parse_any(&mut self) -> Eval {
        let start = self.pt;
        if start.rune.is_none() {
            self.fail_at(false, start.pos, ".");
            return Ok(None);
        }

        self.fail_at(true, start.pos, ".");
        self.input.read(&mut self.pt);

        Ok(Some(self.text_from(start)))
    }

    /// Evalúa una subexpresión en su propio alcance de etiquetas.
    fn scoped(&mut self, expr: &'g Expr) -> Eval {
        self.vstack.push(Labels::new());
        let result = self.parse_expr(expr);
        self.vstack.pop();

        result
    }

    fn text_from(&self, start: Savepoint) -> Value {
        let text = self.input.slice(start.pos.offset, self.pt.pos.offset);
        Value::Str(text.into_owned())
    }

    /// Registra lo esperado en `pos`.
    ///
    /// Se registran los fallos fuera de un `!` y los éxitos dentro de uno,
    /// en cuyo caso lo esperado lleva el prefijo `!`.
    fn fail_at(&mut self, fail: bool, pos: Position, want: impl Display) {
        if fail != self.max_fail_invert_expected || pos.offset < self.max_fail_pos.offset {
            return;
        }

        if pos.offset > self.max_fail_pos.offset {
            self.max_fail_pos = pos;
            self.max_fail_expected.clear();
            self.max_fail_rules = self.rule_stack();
        }

        let want = if self.max_fail_invert_expected {
            format!("!{}", want)
        } else {
            want.to_string()
        };

        self.max_fail_expected.push(want);
    }

    fn add_no_match(&mut self) {
        let mut expected = std::mem::take(&mut self.max_fail_expected);
        expected.sort();
        expected.dedup();

        if let Some(eof) = expected.iter().position(|want| want == "!.") {
            expected.remove(eof);
            expected.push(String::from("EOF"));
        }

        self.errors.push(ParseError {
            filename: self.filename.clone(),
            pos: self.max_fail_pos,
            rule: None,
            rule_stack: std::mem::take(&mut self.max_fail_rules),
            expected: expected.clone(),
            kind: ErrorKind::NoMatch(expected),
        });
    }

    fn add_err(&mut self, kind: ErrorKind) {
        self.add_err_at(kind, self.pt.pos);
    }

    fn add_err_at(&mut self, kind: ErrorKind, pos: Position) {
        let rule = self.rstack.last().map(|rule| rule.display().to_owned());
        let rule_stack = self.rule_stack();

        self.errors.push(ParseError {
            filename: self.filename.clone(),
            pos,
            rule,
            rule_stack,
            expected: Vec::new(),
            kind,
        });
    }

    fn rule_stack(&self) -> Vec<String> {
        self.rstack.iter().map(|rule| rule.name.to_owned()).collect()
    }

    fn count_choice(&mut self, choice: &ChoiceExpr, alt: Option<usize>) {
        let no_match = match &self.stats_out {
            Some((_, no_match)) => no_match,
            None => return,
        };

        let rule = self.rstack.last().map_or("", |rule| rule.name);
        let ident = format!("{} {}:{}", rule, choice.pos.line, choice.pos.column);
        let alt = alt.map_or_else(|| no_match.clone(), |alt| alt.to_string());

        *self
            .stats
            .choice_alt_cnt
            .entry(ident)
            .or_default()
            .entry(alt)
            .or_default() += 1;
    }

    fn trace_in(&mut self, rule: &Rule) {
        if self.flags.contains(ParseFlags::DEBUG) {
            eprintln!("{} {:depth$}> {}", self.pt.pos, "", rule.name, depth = self.depth);
            self.depth += 1;
        }
    }

    fn trace_out(&mut self, rule: &Rule, start: Savepoint, matched: bool) {
        if self.flags.contains(ParseFlags::DEBUG) {
            self.depth = self.depth.saturating_sub(1);

            let status = if matched {
                let text = self.input.slice(start.pos.offset, self.pt.pos.offset);
                format!("MATCH {:?}", text)
            } else {
                String::from("FAIL")
            };

            eprintln!(
                "{} {:depth$}< {} {}",
                self.pt.pos,
                "",
                rule.name,
                status,
                depth = self.depth
            );
        }
    }
}

/// Invoca código del usuario, atrapando pánicos si se pide recuperación.
fn call_user<T>(recover: bool, run: impl FnOnce() -> T) -> Result<T, String> {
    if !recover {
        return Ok(run());
    }

    panic::catch_unwind(AssertUnwindSafe(run)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        String::from(*message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("panic in user code")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AT: Position = Position::new(1, 1, 0);

    fn parser<'g>(grammar: &'g Grammar, input: &str) -> Parser<'g> {
        let input = Input::new(input.as_bytes().to_vec(), false).unwrap();
        let mut parser = Parser::new(grammar, "", input, Options::new());
        parser.input.read(&mut parser.pt);
        parser
    }

    fn empty() -> Grammar {
        Grammar::new(AT, Vec::new())
    }

    fn lit(val: &'static str, ignore_case: bool) -> Expr {
        Expr::Lit(LitMatcher {
            pos: AT,
            val,
            ignore_case,
        })
    }

    fn class(inverted: bool) -> CharClassMatcher {
        CharClassMatcher {
            pos: AT,
            val: "[a-c_]",
            chars: vec!['_'],
            ranges: vec![('a', 'c')],
            classes: Vec::new(),
            ignore_case: false,
            inverted,
        }
    }

    #[test]
    fn literals_are_prefix_tests() {
        let grammar = empty();
        let cases = [
            ("abc", "abcd", true),
            ("abc", "abc", true),
            ("abc", "ab", false),
            ("abc", "abd", false),
            ("", "xyz", true),
        ];

        for (val, input, matches) in cases {
            let mut parser = parser(&grammar, input);
            let result = parser.parse_expr(Box::leak(Box::new(lit(val, false)))).unwrap();

            assert_eq!(result.is_some(), matches, "{:?} on {:?}", val, input);
            let expected = if matches { val.len() } else { 0 };
            assert_eq!(parser.pt.pos.offset, expected);
        }
    }

    #[test]
    fn ignore_case_literals_fold_input() {
        let grammar = empty();
        let expr = Box::leak(Box::new(lit("select", true)));

        let mut parser = parser(&grammar, "SeLeCt *");
        let value = parser.parse_expr(expr).unwrap();
        assert_eq!(value, Some(Value::from("SeLeCt")));
    }

    #[test]
    fn inverted_class_is_complement() {
        let grammar = empty();
        let plain = Box::leak(Box::new(Expr::CharClass(class(false))));
        let inverted = Box::leak(Box::new(Expr::CharClass(class(true))));

        for c in ['a', 'b', 'c', '_', 'd', 'A', 'ñ', '\n'] {
            let input = c.to_string();
            let accepted = parser(&grammar, &input).parse_expr(plain).unwrap().is_some();
            let rejected = parser(&grammar, &input).parse_expr(inverted).unwrap().is_none();
            assert_eq!(accepted, rejected, "{:?}", c);
        }

        assert!(parser(&grammar, "").parse_expr(inverted).unwrap().is_none());
    }

    #[test]
    fn lookahead_never_moves_cursor() {
        let grammar = empty();
        let child = || Box::new(lit("ab", false));
        let and = Box::leak(Box::new(Expr::And(PrefixExpr { pos: AT, expr: child() })));
        let not = Box::leak(Box::new(Expr::Not(PrefixExpr { pos: AT, expr: child() })));

        for input in ["abc", "xyz", ""] {
            let mut parser = parser(&grammar, input);
            let and_matched = parser.parse_expr(and).unwrap().is_some();
            assert_eq!(parser.pt.pos.offset, 0);

            let not_matched = parser.parse_expr(not).unwrap().is_some();
            assert_eq!(parser.pt.pos.offset, 0);
            assert_ne!(and_matched, not_matched);
        }
    }

    #[test]
    fn repetition_stops_without_progress() {
        let grammar = empty();
        let optional = Expr::ZeroOrOne(SuffixExpr {
            pos: AT,
            expr: Box::new(lit("x", false)),
        });

        let star = Box::leak(Box::new(Expr::ZeroOrMore(SuffixExpr {
            pos: AT,
            expr: Box::new(optional),
        })));

        let mut parser = parser(&grammar, "xxy");
        let value = parser.parse_expr(star).unwrap();

        // Dos `x` y luego un `?` vacío que no avanza
        assert_eq!(value.map(Value::into_list).map(|list| list.len()), Some(3));
        assert_eq!(parser.pt.pos.offset, 2);
    }

    #[test]
    fn failed_sequence_restores_cursor() {
        let grammar = empty();
        let seq = Box::leak(Box::new(Expr::Seq(SeqExpr {
            pos: AT,
            exprs: vec![lit("a", false), lit("b", false), lit("c", false)],
        })));

        let mut parser = parser(&grammar, "abd");
        assert!(parser.parse_expr(seq).unwrap().is_none());
        assert_eq!(parser.pt, {
            let mut pt = Savepoint::start();
            parser.input.read(&mut pt);
            pt
        });

        assert_eq!(parser.max_fail_pos.offset, 2);
        assert_eq!(parser.max_fail_expected, vec!["\"c\""]);
    }

    #[test]
    fn panic_messages_are_extracted() {
        let message = panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(message), "boom 1");

        let message = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(message), "static");
    }
}
