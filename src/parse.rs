//! Análisis sintáctico.
//!
//! Parser descendente recursivo escrito a mano para la gramática de PEG.
//! Consume la secuencia de tokens producida por [`crate::lex`] y
//! construye un [`Grammar`].
//!
//! # Fin de regla
//! Una regla termina con `;`, con el fin del archivo o con un salto de
//! línea seguido del encabezado de otra regla (`Nombre ["display"] <-`).
//! Cualquier otro salto de línea se ignora, por lo cual una expresión
//! puede extenderse por varias líneas.
//!
//! # Recuperación
//! Ante un error, el parser lo registra y descarta tokens hasta el
//! siguiente encabezado de regla al inicio de una línea. Las reglas
//! reconocidas se conservan, lo cual permite reportar también errores de
//! fases posteriores.

use thiserror::Error;

use crate::{
    ast::{CharClass, Code, Expr, Grammar, Lit, Rule},
    lex::{Token, TokenKind},
    literal::LiteralError,
    source::{Located, Location},
};

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("expected {0}, got {1}")]
    UnexpectedToken(TokenKind, Token),

    #[error("missing expression")]
    MissingExpr,

    #[error("no expression in choice")]
    EmptyChoice,

    #[error("no expression in sequence")]
    EmptySeq,

    #[error("label without expression")]
    LabelWithoutExpr,

    #[error("prefix operator without expression")]
    PrefixWithoutExpr,

    #[error("suffix operator without expression")]
    SuffixWithoutExpr,

    #[error("missing expression inside parenthesis")]
    EmptyParens,

    #[error("rule not terminated")]
    RuleNotTerminated,

    #[error("display name cannot be case-insensitive")]
    CaseInsensitiveDisplayName,

    #[error(transparent)]
    Literal(#[from] LiteralError),
}

/// Resultado del análisis: el árbol parcial y los errores encontrados.
#[derive(Debug, Default)]
pub struct Parsed {
    pub grammar: Grammar,
    pub errors: Vec<Located<ParserError>>,
}

impl Parsed {
    /// Retorna el árbol solo si no hubo errores.
    pub fn into_result(self) -> Result<Grammar, Vec<Located<ParserError>>> {
        if self.errors.is_empty() {
            Ok(self.grammar)
        } else {
            Err(self.errors)
        }
    }
}

/// Construye el árbol de una gramática.
///
/// La secuencia de tokens debe terminar en [`TokenKind::Eof`], como la
/// que produce [`crate::lex::Scanner`]. Los comentarios se descartan.
pub fn parse<I>(tokens: I) -> Parsed
where
    I: IntoIterator<Item = Located<Token>>,
{
    let tokens: Vec<_> = tokens
        .into_iter()
        .filter(|token| !matches!(token.val().kind, TokenKind::LineComment | TokenKind::MultilineComment))
        .collect();

    if tokens.is_empty() {
        return Parsed::default();
    }

    let mut parser = Parser { tokens: &tokens, at: 0 };
    let mut parsed = Parsed::default();

    parser.skip_separators();
    if parser.peek_kind() == TokenKind::Code {
        match parser.code() {
            Ok(code) => parsed.grammar.init = Some(code),
            Err(failure) => parsed.errors.push(failure.coerce()),
        }
    }

    loop {
        parser.skip_separators();
        if parser.peek_kind() == TokenKind::Eof {
            break parsed;
        }

        match parser.rule() {
            Ok(rule) => parsed.grammar.rules.push(rule),
            Err(failure) => {
                parsed.errors.push(failure.coerce());
                parser.resync();
            }
        }
    }
}

#[derive(Clone)]
struct Parser<'a> {
    tokens: &'a [Located<Token>],
    at: usize,
}

/// Una falla débil indica que ninguna producción aplica en este punto y
/// no se consumió nada relevante. Una falla estricta es un error.
enum Failure {
    Weak(Located<ParserError>),
    Strict(Located<ParserError>),
}

impl Failure {
    fn strict(self) -> Self {
        Failure::Strict(self.coerce())
    }

    fn coerce(self) -> Located<ParserError> {
        match self {
            Failure::Weak(error) => error,
            Failure::Strict(error) => error,
        }
    }
}

type Parse<T> = Result<T, Failure>;

impl<'a> Parser<'a> {
    fn rule(&mut self) -> Parse<Rule> {
        let name = self.expect(TokenKind::Ident)?.map(|token| token.literal);

        let display_name = match self.peek_kind() {
            TokenKind::Str | TokenKind::RawStr | TokenKind::Char => {
                let lit = self.lit()?;
                if lit.val().ignore_case {
                    return Err(Failure::Strict(Located::at(
                        ParserError::CaseInsensitiveDisplayName,
                        lit.location().clone(),
                    )));
                }

                Some(lit)
            }

            _ => None,
        };

        self.expect(TokenKind::RuleDef)?;
        let expr = self.choice().map_err(Failure::strict)?;

        match self.peek_kind() {
            TokenKind::Eol | TokenKind::Semicolon => {
                self.next();
            }

            TokenKind::Eof => (),
            _ => return self.fail(ParserError::RuleNotTerminated),
        }

        Ok(Rule {
            name,
            display_name,
            expr,
        })
    }

    fn choice(&mut self) -> Parse<Located<Expr>> {
        let first = self.action_seq()?;
        if self.peek_kind() != TokenKind::Slash {
            return Ok(first);
        }

        let location = first.location().clone();
        let mut alternatives = vec![first];

        while self.peek_kind() == TokenKind::Slash {
            self.next();

            let alternative = match self.action_seq() {
                Err(Failure::Weak(_)) => return self.fail(ParserError::EmptyChoice),
                result => result?,
            };

            alternatives.push(alternative);
        }

        Ok(Located::at(Expr::Choice(alternatives), location))
    }

    fn action_seq(&mut self) -> Parse<Located<Expr>> {
        let seq = match self.seq() {
            Err(Failure::Weak(_)) if self.peek_kind() == TokenKind::Code => {
                return self.fail(ParserError::EmptySeq);
            }

            result => result?,
        };

        if self.peek_kind() != TokenKind::Code {
            return Ok(seq);
        }

        let code = self.code()?;
        let location = seq.location().clone();

        Ok(Located::at(
            Expr::Action {
                expr: Box::new(seq),
                code,
            },
            location,
        ))
    }

    fn seq(&mut self) -> Parse<Located<Expr>> {
        let first = self.labeled()?;

        let mut exprs = vec![first];
        loop {
            match self.labeled() {
                Err(Failure::Weak(_)) => break,
                expr => exprs.push(expr?),
            }
        }

        if exprs.len() == 1 {
            return Ok(exprs.remove(0));
        }

        let location = exprs[0].location().clone();
        Ok(Located::at(Expr::Seq(exprs), location))
    }

    fn labeled(&mut self) -> Parse<Located<Expr>> {
        let is_label = self.lookahead(|s| {
            s.expect(TokenKind::Ident)?;
            s.expect(TokenKind::Colon)
        });

        if is_label.is_err() {
            return self.prefixed();
        }

        let label = self.expect(TokenKind::Ident)?.map(|token| token.literal);
        self.next();

        let expr = match self.prefixed() {
            Err(Failure::Weak(_)) => return self.fail(ParserError::LabelWithoutExpr),
            result => result?,
        };

        let location = label.location().clone();
        let expr = Box::new(expr);

        Ok(Located::at(Expr::Labeled { label, expr }, location))
    }

    fn prefixed(&mut self) -> Parse<Located<Expr>> {
        let negated = match self.peek_kind() {
            TokenKind::Ampersand => false,
            TokenKind::Exclamation => true,
            _ => return self.suffixed(),
        };

        let location = self.next().location().clone();

        let expr = if self.peek_kind() == TokenKind::Code {
            let code = self.code()?.into_inner();
            match negated {
                false => Expr::AndCode(code),
                true => Expr::NotCode(code),
            }
        } else {
            let expr = match self.suffixed() {
                Err(Failure::Weak(_)) => return self.fail(ParserError::PrefixWithoutExpr),
                result => Box::new(result?),
            };

            match negated {
                false => Expr::And(expr),
                true => Expr::Not(expr),
            }
        };

        Ok(Located::at(expr, location))
    }

    fn suffixed(&mut self) -> Parse<Located<Expr>> {
        let is_suffix = |kind| matches!(kind, TokenKind::Question | TokenKind::Star | TokenKind::Plus);

        let primary = match self.primary() {
            Err(Failure::Weak(_)) if is_suffix(self.peek_kind()) => {
                return self.fail(ParserError::SuffixWithoutExpr);
            }

            result => result?,
        };

        let kind = self.peek_kind();
        if !is_suffix(kind) {
            return Ok(primary);
        }

        self.next();

        let location = primary.location().clone();
        let primary = Box::new(primary);

        let expr = match kind {
            TokenKind::Question => Expr::ZeroOrOne(primary),
            TokenKind::Star => Expr::ZeroOrMore(primary),
            _ => Expr::OneOrMore(primary),
        };

        Ok(Located::at(expr, location))
    }

    fn primary(&mut self) -> Parse<Located<Expr>> {
        match self.peek_kind() {
            TokenKind::Ident if !self.at_rule_header(self.position()) => {
                let (location, token) = self.next().clone().split();
                Ok(Located::at(Expr::RuleRef(token.literal), location))
            }

            TokenKind::Str | TokenKind::RawStr | TokenKind::Char => Ok(self.lit()?.map(Expr::Lit)),

            TokenKind::Class => {
                let (location, token) = self.next().clone().split();
                match CharClass::parse(&token.literal) {
                    Ok(class) => Ok(Located::at(Expr::CharClass(class), location)),
                    Err(error) => Err(Failure::Strict(Located::at(error.into(), location))),
                }
            }

            TokenKind::Dot => Ok(Located::at(Expr::Any, self.next().location().clone())),

            TokenKind::LParen => {
                self.next();

                let expr = match self.choice() {
                    Err(Failure::Weak(_)) => return self.fail(ParserError::EmptyParens),
                    result => result?,
                };

                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }

            _ => Err(Failure::Weak(self.error_here(ParserError::MissingExpr))),
        }
    }

    fn lit(&mut self) -> Parse<Located<Lit>> {
        let (location, token) = self.next().clone().split();
        match Lit::parse(&token.literal) {
            Ok(lit) => Ok(Located::at(lit, location)),
            Err(error) => Err(Failure::Strict(Located::at(error.into(), location))),
        }
    }

    fn code(&mut self) -> Parse<Located<Code>> {
        Ok(self.expect(TokenKind::Code)?.map(|token| Code(token.literal)))
    }

    /// Descarta tokens hasta el siguiente encabezado de regla al inicio de
    /// una línea, o hasta el fin del archivo.
    fn resync(&mut self) {
        loop {
            let kind = self.token(self.at).val().kind;
            if kind == TokenKind::Eof {
                break;
            }

            self.at += 1;
            if kind == TokenKind::Eol && self.at_rule_header(self.at) {
                break;
            }
        }
    }

    /// Saltos de línea y `;` entre reglas.
    fn skip_separators(&mut self) {
        while let TokenKind::Eol | TokenKind::Semicolon = self.token(self.at).val().kind {
            self.at += 1;
        }
    }

    /// Determina si en un índice inicia `Nombre ["display"] <-`.
    fn at_rule_header(&self, mut index: usize) -> bool {
        let kind = |index: usize| self.token(index).val().kind;

        if kind(index) != TokenKind::Ident {
            return false;
        }

        index += 1;
        if let TokenKind::Str | TokenKind::RawStr | TokenKind::Char = kind(index) {
            index += 1;
        }

        kind(index) == TokenKind::RuleDef
    }

    /// Índice del siguiente token significativo.
    ///
    /// Un salto de línea solo es significativo si termina la regla actual,
    /// es decir, si le sigue un encabezado de regla o el fin del archivo.
    fn position(&self) -> usize {
        let mut index = self.at;
        while self.token(index).val().kind == TokenKind::Eol {
            let mut after = index;
            while self.token(after).val().kind == TokenKind::Eol {
                after += 1;
            }

            if self.token(after).val().kind == TokenKind::Eof || self.at_rule_header(after) {
                return index;
            }

            index = after;
        }

        index
    }

    fn token(&self, index: usize) -> &'a Located<Token> {
        let last = self.tokens.len() - 1;
        &self.tokens[index.min(last)]
    }

    fn peek(&self) -> &'a Located<Token> {
        self.token(self.position())
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().val().kind
    }

    fn next(&mut self) -> &'a Located<Token> {
        let index = self.position();
        self.at = index + 1;

        self.token(index)
    }

    fn expect(&mut self, kind: TokenKind) -> Parse<Located<Token>> {
        let found = self.peek();
        if found.val().kind != kind {
            let error = ParserError::UnexpectedToken(kind, found.val().clone());
            return Err(Failure::Strict(Located::at(error, found.location().clone())));
        }

        Ok(self.next().clone())
    }

    fn lookahead<T, F>(&self, rule: F) -> Parse<T>
    where
        F: FnOnce(&mut Self) -> Parse<T>,
    {
        rule(&mut self.clone())
    }

    fn error_here(&self, error: ParserError) -> Located<ParserError> {
        let location: Location = self.peek().location().clone();
        Located::at(error, location)
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        Err(Failure::Strict(self.error_here(error)))
    }
}
