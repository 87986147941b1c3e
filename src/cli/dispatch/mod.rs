//! Map parsed CLI arguments to an [`Action`].

use crate::cli::{
    actions::{hash, verify, Action},
    commands::{hashing, ARG_DIGEST, ARG_PASSWORD, ARG_SALT, CMD_HASH, CMD_VERIFY},
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing or the subcommand is unknown.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let options = hashing::Options::parse(matches)?;

    let password = |sub: &clap::ArgMatches| {
        sub.get_one::<String>(ARG_PASSWORD)
            .cloned()
            .map(SecretString::from)
    };

    match matches.subcommand() {
        Some((CMD_HASH, sub)) => Ok(Action::Hash(hash::Args {
            options,
            password: password(sub),
            salt: sub
                .get_one::<String>(ARG_SALT)
                .cloned()
                .filter(|v| !v.trim().is_empty()),
        })),
        Some((CMD_VERIFY, sub)) => Ok(Action::Verify(verify::Args {
            options,
            password: password(sub),
            salt: sub
                .get_one::<String>(ARG_SALT)
                .cloned()
                .context("missing required argument: --salt")?,
            digest: sub
                .get_one::<String>(ARG_DIGEST)
                .cloned()
                .context("missing required argument: --digest")?,
        })),
        Some((name, _)) => Err(anyhow!("unknown subcommand: {name}")),
        None => Err(anyhow!("missing subcommand")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;
    use std::time::Duration;

    #[test]
    fn hash_action() {
        temp_env::with_vars(
            [
                ("ARGONBOX_PASSWORD", Some("Str0ngPassw0rd!")),
                ("ARGONBOX_TIMEOUT", Some("5")),
                ("ARGONBOX_SALT_LENGTH", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["argonbox", "hash"]);
                let Action::Hash(args) = handler(&matches).unwrap() else {
                    panic!("expected hash action");
                };
                assert_eq!(args.options.config.salt_length, 16);
                assert_eq!(args.options.timeout, Some(Duration::from_secs(5)));
                assert_eq!(
                    args.password.as_ref().map(|p| p.expose_secret().to_string()),
                    Some("Str0ngPassw0rd!".to_string())
                );
                assert!(args.salt.is_none());
            },
        );
    }

    #[test]
    fn blank_salt_means_generate() {
        let matches =
            commands::new().get_matches_from(vec!["argonbox", "hash", "--salt", "  "]);
        let Action::Hash(args) = handler(&matches).unwrap() else {
            panic!("expected hash action");
        };
        assert!(args.salt.is_none());
    }

    #[test]
    fn verify_action() {
        temp_env::with_vars([("ARGONBOX_PASSWORD", None::<&str>)], || {
            let matches = commands::new().get_matches_from(vec![
                "argonbox",
                "--iterations",
                "3",
                "verify",
                "--salt",
                "c2FsdHNhbHQ=",
                "--digest",
                "ZGlnZXN0",
            ]);
            let Action::Verify(args) = handler(&matches).unwrap() else {
                panic!("expected verify action");
            };
            assert_eq!(args.options.module.costs.iterations, 3);
            assert_eq!(args.salt, "c2FsdHNhbHQ=");
            assert_eq!(args.digest, "ZGlnZXN0");
            assert!(args.password.is_none());
        });
    }
}
