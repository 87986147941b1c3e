pub mod hash;
pub mod verify;

// Internal "interpreter" for `Action`.
mod run;

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use std::io::BufRead;
use zeroize::Zeroizing;

#[derive(Debug)]
pub enum Action {
    Hash(hash::Args),
    Verify(verify::Args),
}

impl Action {
    /// Execute the action, returning the process exit code.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<i32> {
        run::execute(self).await
    }
}

/// Use the password given on the command line, or read the first line of
/// `input` without its line terminator.
pub(crate) fn resolve_password<R: BufRead>(
    password: Option<SecretString>,
    mut input: R,
) -> Result<SecretString> {
    if let Some(password) = password {
        return Ok(password);
    }

    let mut line = Zeroizing::new(String::new());
    let read = input
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    if read == 0 {
        bail!("no password given: use --password, ARGONBOX_PASSWORD or stdin");
    }

    let trimmed = line.trim_end_matches(['\n', '\r']);
    Ok(SecretString::from(trimmed.to_string()))
}
