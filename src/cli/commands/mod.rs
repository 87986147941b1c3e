pub mod hashing;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const CMD_HASH: &str = "hash";
pub const CMD_VERIFY: &str = "verify";

pub const ARG_PASSWORD: &str = "password";
pub const ARG_SALT: &str = "salt";
pub const ARG_DIGEST: &str = "digest";

fn password_arg() -> Arg {
    Arg::new(ARG_PASSWORD)
        .long(ARG_PASSWORD)
        .help("Password to hash; read from the first line of stdin when omitted")
        .env("ARGONBOX_PASSWORD")
        .hide_env_values(true)
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("argonbox")
        .about("Argon2 password hashing over an in-process linear-memory arena")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_HASH)
                .about("Hash a password, printing the base64 digest and salt as JSON")
                .arg(password_arg())
                .arg(
                    Arg::new(ARG_SALT)
                        .long(ARG_SALT)
                        .help("Base64 salt to reuse instead of generating one"),
                ),
        )
        .subcommand(
            Command::new(CMD_VERIFY)
                .about("Check a password against a stored digest and salt")
                .arg(password_arg())
                .arg(
                    Arg::new(ARG_SALT)
                        .long(ARG_SALT)
                        .help("Stored base64 salt")
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_DIGEST)
                        .long(ARG_DIGEST)
                        .help("Stored base64 digest")
                        .required(true),
                ),
        );

    let command = hashing::with_args(command);
    logging::with_args(command)
}
