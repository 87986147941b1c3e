use crate::{
    cli::{actions::resolve_password, commands::hashing::Options},
    hasher::{offload, Engine},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{io, sync::Arc};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub options: Options,
    pub password: Option<SecretString>,
    pub salt: Option<String>,
}

/// Hash the password and print `{"digest": ..., "salt": ...}`.
/// # Errors
/// Returns an error if the configuration is rejected or hashing fails.
pub async fn execute(args: Args) -> Result<i32> {
    let password = resolve_password(args.password, io::stdin().lock())?;

    let engine = Engine::initialize_with(args.options.config, args.options.module)
        .context("invalid hashing configuration")?;
    debug!(config = ?engine.config(), "engine initialized");

    let output = offload::hash_with_timeout(
        Arc::new(engine),
        password,
        args.salt,
        args.options.timeout,
    )
    .await
    .context("failed to hash password")?;

    info!("password hashed");
    println!("{}", serde_json::to_string(&output)?);

    Ok(0)
}
