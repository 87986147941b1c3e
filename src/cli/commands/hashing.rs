use crate::{
    arena::{CostParams, LinearOptions},
    hasher::HashConfig,
};
use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_SALT_LENGTH: &str = "salt-length";
pub const ARG_OUTPUT_LENGTH: &str = "output-length";
pub const ARG_MEMORY_KIB: &str = "memory-kib";
pub const ARG_ITERATIONS: &str = "iterations";
pub const ARG_LANES: &str = "lanes";
pub const ARG_TIMEOUT: &str = "timeout";

/// Engine settings shared by every subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub config: HashConfig,
    pub module: LinearOptions,
    pub timeout: Option<Duration>,
}

impl Options {
    /// Parse hashing arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let number = |id: &str| {
            matches
                .get_one::<u64>(id)
                .copied()
                .with_context(|| format!("missing required argument: --{id}"))
        };
        let cost = |id: &str| {
            matches
                .get_one::<u32>(id)
                .copied()
                .with_context(|| format!("missing required argument: --{id}"))
        };

        Ok(Self {
            config: HashConfig::new(number(ARG_SALT_LENGTH)?, number(ARG_OUTPUT_LENGTH)?),
            module: LinearOptions {
                costs: CostParams {
                    memory_kib: cost(ARG_MEMORY_KIB)?,
                    iterations: cost(ARG_ITERATIONS)?,
                    lanes: cost(ARG_LANES)?,
                },
                ..LinearOptions::default()
            },
            timeout: matches
                .get_one::<u64>(ARG_TIMEOUT)
                .copied()
                .map(Duration::from_secs),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    // Cost defaults mirror the argon2 crate's `Params` defaults.
    command
        .arg(
            Arg::new(ARG_SALT_LENGTH)
                .long(ARG_SALT_LENGTH)
                .help("Salt length in bytes (8 to 4294967295)")
                .env("ARGONBOX_SALT_LENGTH")
                .global(true)
                .default_value("16")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_OUTPUT_LENGTH)
                .long(ARG_OUTPUT_LENGTH)
                .help("Digest length in bytes (4 to 4294967295)")
                .env("ARGONBOX_OUTPUT_LENGTH")
                .global(true)
                .default_value("32")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_MEMORY_KIB)
                .long(ARG_MEMORY_KIB)
                .help("Argon2 memory cost in KiB")
                .env("ARGONBOX_MEMORY_KIB")
                .global(true)
                .default_value("19456")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_ITERATIONS)
                .long(ARG_ITERATIONS)
                .help("Argon2 iteration count")
                .env("ARGONBOX_ITERATIONS")
                .global(true)
                .default_value("2")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_LANES)
                .long(ARG_LANES)
                .help("Argon2 parallelism (lanes)")
                .env("ARGONBOX_LANES")
                .global(true)
                .default_value("1")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Give up waiting for a hash after this many seconds")
                .env("ARGONBOX_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
