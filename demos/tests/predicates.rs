use pegc_demos::predicates;
use pegc_runtime::{Options, Value};

fn field(value: &Value, key: &str) -> Value {
    value.as_map().unwrap()[key].clone()
}

#[test]
fn code_predicates_filter_numbers() {
    let value = predicates::parse("", "1 22 333", Options::new()).unwrap();
    let values = field(&value, "values");

    assert_eq!(values, Value::from(vec![Value::Int(1), Value::Int(22), Value::Int(333)]));

    // Más de tres dígitos, o exactamente 13
    for input in ["4444", "12 13", "13"] {
        assert!(predicates::parse("", input, Options::new()).is_err(), "{:?}", input);
    }

    assert!(predicates::parse("", "130 113", Options::new()).is_ok());
}

#[test]
fn state_is_restored_on_backtracking() {
    let value = predicates::parse("", "ab?", Options::new()).unwrap();

    // La primera alternativa se descarta junto con su marca
    assert_eq!(field(&value, "marks"), Value::Int(1));
    assert_eq!(field(&value, "calls"), Value::Int(2));

    let value = predicates::parse("", "ab; cd? ef;", Options::new()).unwrap();
    assert_eq!(field(&value, "marks"), Value::Int(3));
    assert_eq!(field(&value, "calls"), Value::Int(4));
}

#[test]
fn memoized_rules_do_not_rerun_actions() {
    let value = predicates::parse("", "ab?", Options::new().memoize(true)).unwrap();

    assert_eq!(field(&value, "marks"), Value::Nil);
    assert_eq!(field(&value, "calls"), Value::Int(1));
}

#[test]
fn stores_start_from_options() {
    let options = Options::new()
        .init_state("marks", 10i64)
        .global_store("calls", 100i64);

    let value = predicates::parse("", "ab;", options).unwrap();

    assert_eq!(field(&value, "marks"), Value::Int(11));
    assert_eq!(field(&value, "calls"), Value::Int(101));
}
