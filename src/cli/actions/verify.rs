use crate::{
    cli::{actions::resolve_password, commands::hashing::Options},
    hasher::{offload, Engine},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde_json::json;
use std::{io, sync::Arc};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub options: Options,
    pub password: Option<SecretString>,
    pub salt: String,
    pub digest: String,
}

/// Verify the password and print `{"valid": bool}`; exit code 1 on mismatch.
/// # Errors
/// Returns an error if the configuration is rejected or the salt is invalid.
pub async fn execute(args: Args) -> Result<i32> {
    let password = resolve_password(args.password, io::stdin().lock())?;

    let engine = Engine::initialize_with(args.options.config, args.options.module)
        .context("invalid hashing configuration")?;

    let valid = offload::verify_with_timeout(
        Arc::new(engine),
        password,
        args.salt,
        args.digest,
        args.options.timeout,
    )
    .await
    .context("failed to verify password")?;

    info!(valid, "password verified");
    println!("{}", json!({ "valid": valid }));

    Ok(i32::from(!valid))
}
