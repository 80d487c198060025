//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases de la generación y expone
//! una CLI. El código de salida identifica la fase que falló: 1 para
//! uso incorrecto, 2 para E/S, 3 para errores léxicos o sintácticos y 4
//! para errores de emisión.

use anyhow::{self, Context};
use clap::{self, crate_version, Arg, Command};
use pegc::{
    codegen::{self, EmitError},
    error::Diagnostics,
    format::Rustfmt,
    lex::Scanner,
    parse,
    source::Source,
};

use std::{
    fmt::Display,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    process,
    rc::Rc,
};

const EXIT_USAGE: i32 = 1;
const EXIT_IO: i32 = 2;
const EXIT_PARSE: i32 = 3;
const EXIT_EMIT: i32 = 4;

/// Terminación anormal con un código de salida.
struct Exit {
    code: i32,
    message: String,
}

impl Exit {
    fn new(code: i32, message: impl Display) -> Self {
        Exit {
            code,
            message: message.to_string(),
        }
    }
}

trait OrExit<T> {
    fn or_exit(self, code: i32) -> Result<T, Exit>;
}

impl<T> OrExit<T> for anyhow::Result<T> {
    fn or_exit(self, code: i32) -> Result<T, Exit> {
        self.map_err(|error| Exit::new(code, format!("error: {:#}", error)))
    }
}

fn main() {
    if let Err(exit) = run() {
        eprint!("{}", exit.message);
        if !exit.message.ends_with('\n') {
            eprintln!();
        }

        process::exit(exit.code);
    }
}

fn run() -> Result<(), Exit> {
    // Parsing de CLI
    let command = Command::new("pegc")
        .version(crate_version!())
        .about("PEG parser generator")
        .arg(
            Arg::new("grammar")
                .value_name("GRAMMAR")
                .help("Grammar file ('-' or none for stdin)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .help("Output file (stdout by default)"),
        )
        .arg(
            Arg::new("parse-only")
                .short('x')
                .long("parse-only")
                .help("Check the grammar without emitting code"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Print tokens and the parsed grammar to stderr"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .help("Pipe the generated code through rustfmt"),
        )
        .arg(
            Arg::new("runtime")
                .long("runtime")
                .takes_value(true)
                .value_name("PATH")
                .default_value("::pegc_runtime")
                .help("Path of the runtime crate in generated code"),
        )
        .arg(
            Arg::new("receiver")
                .long("receiver-name")
                .takes_value(true)
                .value_name("NAME")
                .default_value("c")
                .help("Name of the context argument of generated functions"),
        );

    let args = match command.try_get_matches() {
        Ok(args) => args,
        Err(error) => {
            // --help y --version no son errores
            let code = if error.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = error.print();

            process::exit(code);
        }
    };

    let debug = args.is_present("debug");
    let options = codegen::Options {
        runtime: args.value_of("runtime").unwrap_or("::pegc_runtime").to_owned(),
        receiver: args.value_of("receiver").unwrap_or("c").to_owned(),
        ..Default::default()
    };

    // Lectura de la gramática
    let source = match args.value_of("grammar") {
        None | Some("-") => Source::read(io::stdin(), "<stdin>").context("Failed to read stdin"),
        Some(path) => File::open(path)
            .and_then(|file| Source::read(file, path))
            .with_context(|| format!("Failed to read grammar: {}", path)),
    }
    .or_exit(EXIT_IO)?;

    // Front end
    let mut scan_errors = Vec::new();
    let tokens: Vec<_> = Scanner::new(Rc::clone(&source), &mut scan_errors).collect();

    if debug {
        for token in &tokens {
            eprintln!("{}: {:?} {:?}", token.location(), token.val().kind, token.val().literal);
        }
    }

    let parsed = parse::parse(tokens);
    if debug {
        eprint!("{}", parsed.grammar);
    }

    let mut diagnostics = Diagnostics::from(scan_errors);
    diagnostics.extend(parsed.errors);

    if !diagnostics.is_empty() {
        diagnostics.sort();
        return Err(Exit::new(EXIT_PARSE, diagnostics));
    }

    if args.is_present("parse-only") {
        return Ok(());
    }

    // Back end
    let code = match codegen::build(&parsed.grammar, &source, &options) {
        Ok(code) => code,
        Err(EmitError::Invalid(diagnostics)) => return Err(Exit::new(EXIT_EMIT, diagnostics)),
        Err(error) => return Err(Exit::new(EXIT_EMIT, format!("error: {}", error))),
    };

    let output = args.value_of("output").map(Path::new);
    if args.is_present("format") {
        let file = output
            .map(|path| {
                File::create(path).with_context(|| format!("Failed to open for writing: {}", path.display()))
            })
            .transpose()
            .or_exit(EXIT_IO)?;

        let mut rustfmt = Rustfmt::spawn(file)
            .context("Failed to start rustfmt")
            .or_exit(EXIT_EMIT)?;

        rustfmt
            .stdin()
            .write_all(code.as_bytes())
            .context("Failed to write to rustfmt")
            .or_exit(EXIT_IO)?;

        return rustfmt.finish().context("Failed to format output").or_exit(EXIT_EMIT);
    }

    match output {
        // Salida a archivo
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path.display()))
                .or_exit(EXIT_IO)?;

            write_all(BufWriter::new(file), &code)
                .with_context(|| format!("Failed to write to file: {}", path.display()))
                .or_exit(EXIT_IO)
        }

        // Salida a stdout
        None => write_all(io::stdout().lock(), &code)
            .context("Failed to write to stdout")
            .or_exit(EXIT_IO),
    }
}

fn write_all<W: Write>(mut output: W, code: &str) -> anyhow::Result<()> {
    output.write_all(code.as_bytes())?;
    output.flush()?;

    Ok(())
}
