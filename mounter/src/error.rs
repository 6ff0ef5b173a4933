//! Error types for host mount operations.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to read mount table {}: {source}", path.display())]
    ReadTable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::Spawn { source, .. } | Error::ReadTable { source, .. } => source.kind(),
            Error::Failed { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
