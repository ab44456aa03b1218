use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while loading configuration or dispatching a title.
///
/// A cancelled pick is not an error: the selector reports it as `Ok(None)`.
/// Likewise the launched command's own failure is only observed and logged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config file \"{}\" not found", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("unable to read file \"{}\"", .path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}: unterminated section header", .file.display())]
    ConfigSyntax { file: PathBuf, line: usize },

    #[error("title \"{0}\" not found")]
    TitleNotFound(String),

    #[error("unable to run picker \"{tool}\": {source}")]
    Picker {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        match err {
            dialoguer::Error::IO(e) if e.kind() == io::ErrorKind::Interrupted => Error::Interrupted,
            dialoguer::Error::IO(e) => Error::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_interrupt_maps_to_interrupted() {
        let err = Error::from(dialoguer::Error::IO(io::Error::from(
            io::ErrorKind::Interrupted,
        )));
        assert!(matches!(err, Error::Interrupted));
    }

    #[test]
    fn test_prompt_io_failure_maps_to_io() {
        let err = Error::from(dialoguer::Error::IO(io::Error::from(io::ErrorKind::BrokenPipe)));
        match err {
            Error::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
