use pegc_demos::json;
use pegc_runtime::{ErrorKind, Options, Position, Value};

/// Traduce un documento de `serde_json` a la forma que produce la gramática.
fn from_serde(value: serde_json::Value) -> Value {
    use serde_json::Value as Json;

    match value {
        Json::Null => Value::Nil,
        Json::Bool(boolean) => Value::Bool(boolean),
        Json::Number(number) => Value::Float(number.as_f64().unwrap()),
        Json::String(string) => Value::Str(string),
        Json::Array(array) => Value::List(array.into_iter().map(from_serde).collect()),
        Json::Object(object) => Value::Map(
            object
                .into_iter()
                .map(|(key, value)| (key, from_serde(value)))
                .collect(),
        ),
    }
}

#[test]
fn agrees_with_serde_json() {
    let documents = [
        "null",
        "true",
        " false ",
        "0",
        "-0.5",
        "1e3",
        "2.5E-2",
        "123456",
        r#""""#,
        r#""plain""#,
        r#""esc\"aped\\ \/ \b\f\n\r\t""#,
        r#""\u00e9\u00F1""#,
        "\"ñandú\"",
        "[]",
        "[ 1, 2 ,3 ]",
        "{}",
        r#"{"a":1}"#,
        r#"{ "a" : [true, null, {"b": "c"}], "d": -1.25e+2 }"#,
        "[[[[]]], {\"x\": {\"y\": []}}]\n",
    ];

    for document in documents {
        let expected = from_serde(serde_json::from_str(document).unwrap());
        let parsed = json::parse("", document, Options::new()).unwrap();

        assert_eq!(parsed, expected, "{}", document);
    }
}

#[test]
fn agrees_with_serde_json_when_memoized() {
    let document = r#"{"list": [1, 2, {"deep": [3, "4"]}], "flag": false}"#;
    let expected = from_serde(serde_json::from_str(document).unwrap());

    let parsed = json::parse("", document, Options::new().memoize(true)).unwrap();
    assert_eq!(parsed, expected);
}

#[test]
fn decodes_objects_as_maps() {
    let value = json::parse("", r#"{"a":1}"#, Options::new()).unwrap();
    let map = value.as_map().unwrap();

    assert_eq!(map.len(), 1);
    assert_eq!(map["a"].as_float(), Some(1.0));
}

#[test]
fn rejects_what_serde_json_rejects() {
    let documents = ["", "[", "{", "[1,]", "{\"a\"}", "01", "\"\\x\"", "tru", "[1] 2", "\"a\nb\""];

    for document in documents {
        assert!(serde_json::from_str::<serde_json::Value>(document).is_err(), "{:?}", document);
        assert!(json::parse("", document, Options::new()).is_err(), "{:?}", document);
    }
}

#[test]
fn lists_what_was_expected() {
    let errors = json::parse("in.json", "[", Options::new()).unwrap_err();
    let error = errors.first().unwrap();

    assert_eq!(error.pos, Position::new(1, 2, 1));
    assert!(matches!(error.kind, ErrorKind::NoMatch(_)));

    let wanted = [
        r#""-""#,
        r#""0""#,
        r#""[""#,
        r#""\"""#,
        r#""]""#,
        r#""false""#,
        r#""null""#,
        r#""true""#,
        r#""{""#,
        r"[ \t\r\n]",
        "[1-9]",
    ];

    for want in wanted {
        assert!(error.expected.iter().any(|expected| expected == want), "{} in {:?}", want, error.expected);
    }

    assert!(error.to_string().starts_with("in.json:1:2 (1): no match found, expected: "));
}

#[test]
fn memoization_keeps_the_error_list() {
    let documents = ["", "[", "{", "[1,]", "{\"a\"}", "01", "\"\\x\"", "tru", "[1] 2", "{\"a\": [1, {\"b\" 2}]}"];

    for document in documents {
        let plain = json::parse("", document, Options::new()).unwrap_err();
        let memoized = json::parse("", document, Options::new().memoize(true)).unwrap_err();

        assert_eq!(plain.to_string(), memoized.to_string(), "{:?}", document);
    }
}

#[test]
fn checks_encoding() {
    let input = b"\"a\xffb\"".to_vec();

    let errors = json::parse("", input.clone(), Options::new()).unwrap_err();
    let error = errors.first().unwrap();
    assert!(matches!(error.kind, ErrorKind::InvalidEncoding));
    assert_eq!(error.pos.offset, 2);
    assert!(error.to_string().ends_with("invalid encoding"));

    let value = json::parse("", input, Options::new().allow_invalid_utf8(true)).unwrap();
    assert_eq!(value, Value::from("a\u{fffd}b"));
}
