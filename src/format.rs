//! Formato del código emitido.
//!
//! El código que emite [`crate::codegen`] es correcto pero no está
//! formateado. Opcionalmente se entrega a `rustfmt`, que lo lee de su
//! entrada estándar y escribe el resultado al destino final.

use std::{
    fs::File,
    io::{self, BufWriter},
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
};

use thiserror::Error;

/// Un error de formateo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FormatError {
    /// Ocurrió un evento de error de E/S durante la invocación
    /// de `rustfmt`.
    #[error("I/O error")]
    Io(#[from] io::Error),

    /// `rustfmt` inició su ejecución, pero falló en formatear.
    #[error("rustfmt exited with status code {0:?}")]
    Failed(ExitStatus),
}

/// Instancia de `rustfmt` para un destino definido.
pub struct Rustfmt {
    child: Child,
    stdin: BufWriter<ChildStdin>,
}

impl Rustfmt {
    /// Inicia una instancia de `rustfmt`.
    ///
    /// El resultado se escribe a `output`, o a la salida estándar si no
    /// se indica un archivo. Abrir el archivo es responsabilidad de quien
    /// invoca.
    pub fn spawn(output: Option<File>) -> Result<Self, FormatError> {
        let stdout = match output {
            Some(file) => Stdio::from(file),
            None => Stdio::inherit(),
        };

        let mut command = Command::new("rustfmt");
        command
            .args(&["--emit", "stdout", "--edition", "2021"])
            .stdin(Stdio::piped())
            .stdout(stdout);

        let mut child = command.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "rustfmt has no stdin"))?;

        Ok(Rustfmt {
            child,
            stdin: BufWriter::new(stdin),
        })
    }

    /// Obtiene la entrada estándar del proceso, que espera el código
    /// emitido.
    pub fn stdin(&mut self) -> &mut BufWriter<ChildStdin> {
        &mut self.stdin
    }

    /// Indica el fin del código y espera a que termine el formateo.
    pub fn finish(mut self) -> Result<(), FormatError> {
        // Cerrar stdin es lo que indica el fin del código
        let stdin = self.stdin.into_inner().map_err(|error| error.into_error())?;
        drop(stdin);

        let status = self.child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(FormatError::Failed(status))
        }
    }
}
