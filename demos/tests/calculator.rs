use pegc_demos::calculator;
use pegc_runtime::{ErrorKind, Options, Position, Stats, Value};
use std::{cell::RefCell, rc::Rc};

const LONG: &str = "18 + 3 - 27012 * ( (1234 - 43) / 7 ) + -4 * 8129";

fn eval(input: &str) -> Result<Value, pegc_runtime::Errors> {
    calculator::parse("", input, Options::new())
}

#[test]
fn evaluates_with_precedence() {
    let cases = [
        ("0", 0),
        ("1", 1),
        ("-1", -1),
        ("1 + 2", 3),
        ("2 * 3 + 4", 10),
        ("2 * (3 + 4)", 14),
        ("10 - 2 - 3", 5),
        ("100 / 10 / 5", 2),
        (" ( 5 ) ", 5),
        ("18 + 3 - 27012 * ((1234 - 43) / 7) + -4 * 8129", -4624535),
        (LONG, -4624535),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input).unwrap(), Value::Int(expected), "{:?}", input);
    }
}

#[test]
fn rejects_malformed_expressions() {
    for input in ["", "1 +", "(1", "1 2", "* 3", "1 + x"] {
        assert!(eval(input).is_err(), "{:?}", input);
    }
}

#[test]
fn reports_farthest_failure() {
    let errors = eval("1 + (2 * 3").unwrap_err();
    let error = errors.first().unwrap();

    assert_eq!(errors.len(), 1);
    assert_eq!(error.pos, Position::new(1, 11, 10));
    assert!(matches!(error.kind, ErrorKind::NoMatch(_)));
    assert!(error.expected.contains(&String::from("\")\"")));
    assert!(error.to_string().starts_with("1:11 (10): no match found, expected: "));
}

#[test]
fn recovers_from_division_by_zero() {
    let errors = eval("3 + 10 / 0").unwrap_err();
    let error = errors.first().unwrap();

    assert!(matches!(error.kind, ErrorKind::Panic(_)));
    assert_eq!(error.rule.as_deref(), Some("Term"));
    assert!(error.to_string().contains("rule Term: attempt to divide by zero"));
}

#[test]
fn reports_panics_where_the_rule_match_ends() {
    let errors = eval("1/0").unwrap_err();
    let error = errors.first().unwrap();

    assert_eq!(errors.len(), 1);
    assert_eq!(error.pos, Position::new(1, 4, 3));
    assert_eq!(error.to_string(), "1:4 (3): rule Term: attempt to divide by zero");

    let errors = eval("2 * 3 / 0 + 1").unwrap_err();
    assert_eq!(errors.first().unwrap().pos, Position::new(1, 10, 9));
}

#[test]
#[should_panic(expected = "attempt to divide by zero")]
fn panics_without_recovery() {
    let _ = calculator::parse("", "10 / 0", Options::new().recover(false));
}

#[test]
fn memoization_preserves_results_and_saves_work() {
    let count = |memoize| {
        let stats = Rc::new(RefCell::new(Stats::default()));
        let options = Options::new()
            .memoize(memoize)
            .statistics(Rc::clone(&stats), "no match");

        let value = calculator::parse("", LONG, options).unwrap();
        assert_eq!(value, Value::Int(-4624535));

        let stats = stats.borrow().clone();
        stats
    };

    let plain = count(false);
    let memoized = count(true);

    assert!(memoized.expr_cnt > 0);
    assert!(memoized.expr_cnt < plain.expr_cnt);
}

#[test]
fn counts_choice_alternatives() {
    let stats = Rc::new(RefCell::new(Stats::default()));
    let options = Options::new().statistics(Rc::clone(&stats), "no match");
    calculator::parse("", "(1)", options).unwrap();

    let stats = stats.borrow();
    let factor = stats
        .choice_alt_cnt
        .iter()
        .find(|(choice, _)| choice.starts_with("Factor "))
        .map(|(_, alternatives)| alternatives)
        .unwrap();

    // El paréntesis y luego el entero
    assert_eq!(factor.get("1"), Some(&1));
    assert_eq!(factor.get("2"), Some(&1));
    assert!(stats.choice_alt_cnt.keys().any(|choice| choice.starts_with("AddOp ")));
}

#[test]
fn limits_evaluated_expressions() {
    let errors = calculator::parse("", "1 + 1", Options::new().max_expressions(5)).unwrap_err();
    let error = errors.first().unwrap();

    assert!(matches!(error.kind, ErrorKind::MaxExpressions));
    assert!(error.to_string().ends_with("max number of expressions parsed"));

    assert!(calculator::parse("", "1 + 1", Options::new().max_expressions(0)).is_ok());
}

#[test]
fn starts_at_another_rule() {
    let options = || Options::new().entrypoint("Integer");
    assert_eq!(calculator::parse("", "-42", options()).unwrap(), Value::Int(-42));

    let errors = calculator::parse("", "1", Options::new().entrypoint("Nope")).unwrap_err();
    assert!(matches!(errors.first().unwrap().kind, ErrorKind::InvalidEntrypoint));
}

#[test]
fn reads_from_files_and_readers() {
    let value = calculator::parse_reader("in", "6 * 7".as_bytes(), Options::new()).unwrap();
    assert_eq!(value, Value::Int(42));

    let error = calculator::parse_file("/nonexistent/calculator.txt", Options::new()).unwrap_err();
    assert!(matches!(error, pegc_runtime::Error::Io(_)));
}

#[test]
fn memoization_keeps_the_error_list() {
    for input in ["", "1 +", "1 + (2 * 3", "(", ")", "1 2", "--1", "1 * * 2", "(1 + 2))", "a"] {
        let plain = eval(input).unwrap_err();
        let memoized = calculator::parse("", input, Options::new().memoize(true)).unwrap_err();

        assert_eq!(plain.to_string(), memoized.to_string(), "{:?}", input);
    }
}
