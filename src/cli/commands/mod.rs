pub mod auth;
pub mod todo;

use std::io::{self, BufRead, Write};

use crate::error::TodoError;
use crate::screen::Notice;

/// Use the flag value, or read one line from stdin.
pub(crate) fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// A screen action that failed, as reported by its error notice.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CommandFailure {
    pub message: String,
    pub code: Option<&'static str>,
}

/// Turn the first error notice of a failed screen action into a command error.
pub(crate) fn failure(notices: &[Notice]) -> anyhow::Error {
    let failure = match notices.iter().find(|n| n.is_error()) {
        Some(notice) => CommandFailure {
            message: notice.description.clone(),
            code: notice.code,
        },
        None => CommandFailure {
            message: "Request failed".to_string(),
            code: None,
        },
    };
    failure.into()
}

/// Machine code for a command error, when it came from the library.
pub(crate) fn error_code(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(failure) = err.downcast_ref::<CommandFailure>() {
        return failure.code;
    }
    err.downcast_ref::<TodoError>().map(TodoError::code)
}
