use pegc_demos::andnot;
use pegc_runtime::{Options, Position};

#[test]
fn accepts_sequences_ending_in_b() {
    for input in ["b", "ab", "bb", "aab", "bbaabaaabbbb"] {
        let result = andnot::parse("", input, Options::new());
        assert!(result.is_ok(), "{:?}: {}", input, result.unwrap_err());
    }
}

#[test]
fn rejects_other_sequences() {
    let cases = [("", 0), ("a", 1), ("ba", 2), ("abc", 2), ("c", 0)];

    for (input, offset) in cases {
        let errors = andnot::parse("", input, Options::new()).unwrap_err();
        assert_eq!(errors.first().unwrap().pos.offset, offset, "{:?}", input);
    }
}

#[test]
fn memoization_does_not_change_the_language() {
    for input in ["", "b", "ab", "ba", "bbaabaaabbbb", "abab", "abba"] {
        let plain = andnot::parse("", input, Options::new()).is_ok();
        let memoized = andnot::parse("", input, Options::new().memoize(true)).is_ok();

        assert_eq!(plain, memoized, "{:?}", input);
    }
}

#[test]
fn memoization_keeps_the_error_list() {
    for input in ["", "a", "ba", "abc", "c", "abba", "aaaa", "bbaabaaabbba"] {
        let plain = andnot::parse("", input, Options::new()).unwrap_err();
        let memoized = andnot::parse("", input, Options::new().memoize(true)).unwrap_err();

        assert_eq!(plain.to_string(), memoized.to_string(), "{:?}", input);
    }
}

#[test]
fn reports_end_of_input_past_the_last_rune() {
    let errors = andnot::parse("", "ba", Options::new()).unwrap_err();
    let error = errors.first().unwrap();

    assert_eq!(error.pos, Position::new(1, 3, 2));
    assert!(error.to_string().starts_with("1:3 (2): no match found"), "{}", error);
}
