//! # Argonbox (password hashing engine)
//!
//! `argonbox` turns user passwords into salted Argon2id digests suitable for
//! storage, and checks login attempts against them.
//!
//! ## Native module
//!
//! The Argon2 primitive is reached through a foreign memory arena: inputs are
//! allocated inside the module, written, hashed, read back and freed. Every
//! buffer is zeroed before release, and the engine never leaks an allocation on
//! an error path. See [`arena`].
//!
//! ## Text and storage formats
//!
//! - **Passwords** are encoded as UTF-16LE before hashing, two bytes per code
//!   unit, with no BOM and no terminator.
//! - **Digests and salts** cross the API boundary as padded standard base64.
//!
//! ## Usage
//!
//! ```no_run
//! use argonbox::{Engine, HashConfig, PasswordHasher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::initialize(HashConfig::new(16, 32))?;
//! let stored = engine.hash("Str0ngPassw0rd!", None)?;
//! assert!(engine.verify("Str0ngPassw0rd!", &stored.salt, &stored.digest)?);
//! # Ok(())
//! # }
//! ```

pub mod arena;
pub mod cli;
pub mod codec;
pub mod encoding;
pub mod hasher;

pub use self::hasher::{
    ConfigError, Engine, HashConfig, HashError, HashOutput, PasswordHasher, ValidatedConfig,
};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
