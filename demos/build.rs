//! Compila las gramáticas de `grammars/` a `OUT_DIR`.

use anyhow::{anyhow, Context};
use std::{env, fs, path::PathBuf};

const GRAMMARS: &[&str] = &["andnot", "calculator", "json", "peg", "predicates"];

fn main() -> anyhow::Result<()> {
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").context("OUT_DIR is not set")?);
    let options = pegc::codegen::Options::default();

    for name in GRAMMARS {
        let path = format!("grammars/{}.peg", name);
        println!("cargo:rerun-if-changed={}", path);

        let text = fs::read_to_string(&path).with_context(|| format!("Failed to read grammar: {}", path))?;

        // `Diagnostics` no es `Send`, se reporta como texto
        let code = pegc::generate(&path, &text, &options).map_err(|diagnostics| anyhow!("{}", diagnostics))?;

        let output = out_dir.join(format!("{}.rs", name));
        fs::write(&output, code).with_context(|| format!("Failed to write: {}", output.display()))?;
    }

    Ok(())
}
