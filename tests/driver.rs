use std::{
    fs,
    io::Write,
    path::Path,
    process::{Command, Output, Stdio},
};

use tempfile::tempdir;

const GRAMMAR: &str = "Start <- x:'a'+ EOF {\n    Ok(x)\n}\n\nEOF <- !.\n";

fn pegc(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_pegc"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

fn write_grammar(dir: &Path, text: &str) -> String {
    let path = dir.join("g.peg");
    fs::write(&path, text).unwrap();

    path.to_string_lossy().into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn generates_to_stdout() {
    let dir = tempdir().unwrap();
    let path = write_grammar(dir.path(), GRAMMAR);

    let output = pegc(&[&path], "");
    let code = stdout(&output);

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    assert!(code.starts_with("// Code generated by pegc "));
    assert!(code.contains("pub fn parse<I: Into<Vec<u8>>>("));
    assert!(code.contains("fn onStart1(c: &mut ::pegc_runtime::Current<'_>, x: ::pegc_runtime::Value)"));
}

#[test]
fn reads_grammar_from_stdin() {
    for args in [&[][..], &["-"][..]] {
        let output = pegc(args, GRAMMAR);

        assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
        assert!(stdout(&output).contains("name: \"Start\","));
    }
}

#[test]
fn writes_output_file() {
    let dir = tempdir().unwrap();
    let path = write_grammar(dir.path(), GRAMMAR);
    let target = dir.path().join("parser.rs");

    let output = pegc(&[&path, "-o", &target.to_string_lossy()], "");
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    assert!(output.stdout.is_empty());

    let code = fs::read_to_string(&target).unwrap();
    assert!(code.starts_with("// Code generated by pegc "));
}

#[test]
fn honors_runtime_path_and_receiver() {
    let output = pegc(&["--runtime", "crate::rt", "--receiver-name", "ctx"], GRAMMAR);
    let code = stdout(&output);

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    assert!(code.contains("fn onStart1(ctx: &mut crate::rt::Current<'_>, x: crate::rt::Value)"));
    assert!(!code.contains("pegc_runtime"));
}

#[test]
fn checks_without_emitting() {
    let output = pegc(&["-x"], GRAMMAR);

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    assert!(output.stdout.is_empty());

    // Las referencias a reglas no se validan sin emitir
    let output = pegc(&["--parse-only"], "A <- B\n");
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
}

#[test]
fn prints_debug_listing() {
    let output = pegc(&["-x", "--debug"], "A <- 'a' / \"b\"i\n");
    let listing = stderr(&output);

    assert_eq!(output.status.code(), Some(0), "{}", listing);
    assert!(listing.contains("A <- 'a' / \"b\"i"));
}

#[test]
fn exit_codes_identify_failed_stage() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.peg");

    // Uso
    let output = pegc(&["--no-such-flag"], "");
    assert_eq!(output.status.code(), Some(1));

    let output = pegc(&["--help"], "");
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("--parse-only"));

    // E/S
    let output = pegc(&[&missing.to_string_lossy()], "");
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).starts_with("error: Failed to read grammar: "));

    // Análisis léxico y sintáctico, todos los errores juntos
    let path = write_grammar(dir.path(), "A <- 'ab'\nB <- (\nC <- 'c'\n");
    let output = pegc(&[&path], "");
    let errors = stderr(&output);

    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
    assert!(errors.starts_with(&path), "{}", errors);
    assert!(errors.contains("rune literal is not a single rune"), "{}", errors);
    assert!(errors.contains("missing expression inside parenthesis"), "{}", errors);

    // Emisión
    let output = pegc(&[], "A <- B C\nA <- 'a'\n");
    let errors = stderr(&output);

    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty());
    assert!(errors.contains("<stdin>:1:6 (5): undefined rule: B"), "{}", errors);
    assert!(errors.contains("undefined rule: C"), "{}", errors);
    assert!(errors.contains("rule A redefined"), "{}", errors);
}

#[test]
fn unwritable_output_is_an_io_error() {
    let dir = tempdir().unwrap();
    let path = write_grammar(dir.path(), GRAMMAR);
    let target = dir.path().join("no-such-dir").join("out.rs");
    let target = target.to_string_lossy();

    for format in [false, true] {
        let mut args = vec![&path[..], "-o", &target];
        if format {
            args.push("--format");
        }

        let output = pegc(&args, "");
        let errors = stderr(&output);

        assert_eq!(output.status.code(), Some(2), "{}", errors);
        assert!(errors.starts_with("error: Failed to open for writing: "), "{}", errors);
    }
}
