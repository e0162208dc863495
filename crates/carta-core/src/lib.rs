mod error;

pub use error::{CartaError, CartaResult, ErrorKind, ExitCode};
