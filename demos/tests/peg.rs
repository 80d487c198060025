use pegc::{ast::Grammar, source::Source};
use pegc_demos::peg;
use pegc_runtime::{Options, Value};
use std::rc::Rc;

const GRAMMARS: &[(&str, &str)] = &[
    ("andnot.peg", include_str!("../grammars/andnot.peg")),
    ("calculator.peg", include_str!("../grammars/calculator.peg")),
    ("json.peg", include_str!("../grammars/json.peg")),
    ("peg.peg", include_str!("../grammars/peg.peg")),
    ("predicates.peg", include_str!("../grammars/predicates.peg")),
];

fn self_hosted(name: &str, text: &str) -> Grammar {
    let source = Source::new(name, text);
    let options = Options::new()
        .memoize(true)
        .global_store("source", Value::opaque(Rc::clone(&source)));

    let value = match peg::parse(name, text, options) {
        Ok(value) => value,
        Err(errors) => panic!("{}", errors),
    };

    value.downcast_ref::<Grammar>().cloned().unwrap()
}

#[test]
fn reproduces_the_bootstrap_tree() {
    for &(name, text) in GRAMMARS {
        let expected = pegc::read_grammar(&Source::new(name, text)).unwrap();
        let parsed = self_hosted(name, text);

        assert!(!parsed.rules.is_empty(), "{}", name);
        assert_eq!(parsed, expected, "{}", name);
    }
}

#[test]
fn reads_printed_grammars() {
    for &(name, text) in GRAMMARS {
        let printed = pegc::read_grammar(&Source::new(name, text)).unwrap().to_string();
        assert_eq!(self_hosted(name, &printed).to_string(), printed, "{}", name);
    }
}

#[test]
fn handles_every_operator() {
    let text = "
        {
            init()
        }

        A \"a rule\" <- x:'a'i B* / !C &D? E+ { act() } ; B = ( 'b' / [^b-d\\pL] ) .
        C ← &{ yes() } !{ no() }
        D <- `raw` // comentario
        E <- \"e\" /* otro */ 'f'
    ";

    let expected = pegc::read_grammar(&Source::new("ops.peg", text)).unwrap();
    assert_eq!(expected.rules.len(), 5);
    assert_eq!(self_hosted("ops.peg", text), expected);
}

#[test]
fn rejects_invalid_grammars() {
    for text in ["A <-", "A <- (", "<- 'a'", "A <- 'a' B <-", "A <- [z-a]"] {
        let options = Options::new().global_store("source", Value::opaque(Source::new("", text)));
        assert!(peg::parse("", text, options).is_err(), "{:?}", text);
    }
}
