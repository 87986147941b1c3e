//! Hashing engine: one native module instance and its long-lived context.
//!
//! Every call runs the same sequence under the engine lock: encode the
//! password, check any supplied salt, allocate and fill the password and salt
//! buffers, invoke the primitive, copy the digest out, then zero and free all
//! three buffers. Buffers are held by [`ArenaBuffer`] guards so early returns
//! release them too.

use super::{
    config::{ConfigError, HashConfig, ValidatedConfig},
    error::HashError,
    HashOutput, PasswordHasher,
};
use crate::{
    arena::{host_buffer, ArenaBuffer, ContextHandle, LinearModule, LinearOptions, NativeModule},
    codec, encoding,
};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready(ContextHandle),
    Destroyed,
}

pub struct Engine<M: NativeModule = LinearModule> {
    module: M,
    config: ValidatedConfig,
    state: Mutex<State>,
}

impl Engine<LinearModule> {
    /// Validate `config` and start an engine on a default [`LinearModule`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] before any module is created when a bound is
    /// violated.
    pub fn initialize(config: HashConfig) -> Result<Self, ConfigError> {
        Self::initialize_with(config, LinearOptions::default())
    }

    /// Like [`Engine::initialize`] with explicit cost parameters and arena
    /// ceiling.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for bound violations or rejected costs.
    pub fn initialize_with(config: HashConfig, options: LinearOptions) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        Self::start(config, LinearModule::new(options))
    }
}

impl<M: NativeModule> Engine<M> {
    /// Start an engine on a caller-provided module.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for bound violations or when the module
    /// cannot create its hashing context.
    pub fn with_module(config: HashConfig, module: M) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        Self::start(config, module)
    }

    fn start(config: ValidatedConfig, module: M) -> Result<Self, ConfigError> {
        let context = module
            .create_context()
            .map_err(ConfigError::Instantiation)?;

        debug!(
            salt_length = config.salt_length,
            output_length = config.output_length,
            "hashing engine ready"
        );

        Ok(Self {
            module,
            config,
            state: Mutex::new(State::Ready(context)),
        })
    }

    #[must_use]
    pub fn config(&self) -> ValidatedConfig {
        self.config
    }

    #[must_use]
    pub fn module(&self) -> &M {
        &self.module
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        *self.state() == State::Destroyed
    }

    /// Release the hashing context. Later calls fail with
    /// [`HashError::EngineDestroyed`]; destroying twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the module error if the context could not be released. The
    /// engine is destroyed either way.
    pub fn destroy(&self) -> Result<(), HashError> {
        let mut state = self.state();
        if let State::Ready(context) = *state {
            *state = State::Destroyed;
            self.module.release_context(context)?;
            debug!("hashing engine destroyed");
        }
        Ok(())
    }

    /// [`PasswordHasher::hash`] with an explicit random source for generated
    /// salts.
    ///
    /// # Errors
    ///
    /// See [`PasswordHasher::hash`].
    pub fn hash_with_rng<R>(
        &self,
        password: &str,
        salt: Option<&str>,
        rng: &mut R,
    ) -> Result<HashOutput, HashError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let (digest, salt) = self.derive(password, salt, rng)?;
        Ok(HashOutput {
            digest: encoding::encode(&digest),
            salt,
        })
    }

    #[instrument(skip_all, fields(salt_supplied = salt.is_some()))]
    fn derive<R>(
        &self,
        password: &str,
        salt: Option<&str>,
        rng: &mut R,
    ) -> Result<(Zeroizing<Vec<u8>>, String), HashError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let state = self.state();
        let State::Ready(context) = *state else {
            return Err(HashError::EngineDestroyed);
        };

        let password_bytes = Zeroizing::new(codec::text_to_bytes(password));
        let password_len = u32::try_from(password_bytes.len()).map_err(|_| {
            HashError::PasswordTooLong {
                length: password_bytes.len(),
            }
        })?;

        // Salt problems are caller errors and must not reach the module.
        let supplied = salt
            .map(|text| self.decode_salt(text).map(|bytes| (text, bytes)))
            .transpose()?;

        let password_buf = ArenaBuffer::allocate(&self.module, password_len)?;
        password_buf.write(&password_bytes)?;

        let salt_buf = ArenaBuffer::allocate(&self.module, self.config.salt_length)?;
        let salt_text = match supplied {
            Some((text, bytes)) => {
                salt_buf.write(&bytes)?;
                text.to_owned()
            }
            None => {
                let mut generated = host_buffer(self.config.salt_length as usize)?;
                rng.fill_bytes(generated.as_mut_slice());
                salt_buf.write(&generated)?;
                // Copy out before the module call can touch the buffer.
                encoding::encode(&salt_buf.read()?)
            }
        };

        let digest_buf = ArenaBuffer::adopt(
            &self.module,
            self.module.compute_hash(
                context,
                password_buf.allocation(),
                salt_buf.allocation(),
                self.config.output_length,
            )?,
        );
        let digest = digest_buf.read()?;

        digest_buf.release()?;
        salt_buf.release()?;
        password_buf.release()?;

        debug!(
            password_bytes = password_len,
            digest_bytes = digest.len(),
            "password hashed"
        );

        Ok((digest, salt_text))
    }

    fn decode_salt(&self, text: &str) -> Result<Zeroizing<Vec<u8>>, HashError> {
        let bytes = Zeroizing::new(encoding::decode(text).map_err(HashError::InvalidSalt)?);
        if bytes.len() != self.config.salt_length as usize {
            return Err(HashError::SaltLengthMismatch {
                expected: self.config.salt_length,
                actual: bytes.len(),
            });
        }
        Ok(bytes)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M: NativeModule> PasswordHasher for Engine<M> {
    fn hash(&self, password: &str, salt: Option<&str>) -> Result<HashOutput, HashError> {
        self.hash_with_rng(password, salt, &mut OsRng)
    }

    #[instrument(skip_all)]
    fn verify(&self, password: &str, salt: &str, digest: &str) -> Result<bool, HashError> {
        let (computed, _) = self.derive(password, Some(salt), &mut OsRng)?;

        let Ok(expected) = encoding::decode(digest) else {
            debug!("stored digest is not valid base64");
            return Ok(false);
        };
        let expected = Zeroizing::new(expected);

        let matched = bool::from(computed.as_slice().ct_eq(expected.as_slice()));
        debug!(matched, "password verified");

        Ok(matched)
    }
}

impl<M: NativeModule> fmt::Debug for Engine<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

impl<M: NativeModule> Drop for Engine<M> {
    fn drop(&mut self) {
        if let Err(err) = self.destroy() {
            warn!("failed to release hashing context: {err}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arena::CostParams;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn engine(salt_length: u64, output_length: u64) -> Engine {
        Engine::initialize_with(
            HashConfig::new(salt_length, output_length),
            LinearOptions {
                max_pages: 4,
                costs: CostParams::minimal(),
            },
        )
        .unwrap()
    }

    #[test]
    fn config_errors_stop_construction() {
        assert_eq!(
            Engine::initialize(HashConfig::new(7, 32)).unwrap_err(),
            ConfigError::SaltTooShort
        );
        assert_eq!(
            Engine::initialize(HashConfig::new(16, 3)).unwrap_err(),
            ConfigError::OutputTooShort
        );
    }

    #[test]
    fn rejected_costs_surface_as_instantiation_error() {
        let err = Engine::initialize_with(
            HashConfig::new(16, 32),
            LinearOptions {
                max_pages: 1,
                costs: CostParams {
                    memory_kib: 8,
                    iterations: 0,
                    lanes: 1,
                },
            },
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Instantiation(_)));
    }

    #[test]
    fn generated_salt_has_configured_length() {
        let engine = engine(16, 32);
        let output = engine.hash("Str0ngPassw0rd!", None).unwrap();
        assert_eq!(encoding::decode(&output.salt).unwrap().len(), 16);
        assert_eq!(encoding::decode(&output.digest).unwrap().len(), 32);
        assert_eq!(engine.module().live_allocations(), 0);
    }

    #[test]
    fn supplied_salt_is_returned_unchanged() {
        let engine = engine(8, 16);
        let salt = encoding::encode(b"saltsalt");
        let output = engine.hash("pw", Some(&salt)).unwrap();
        assert_eq!(output.salt, salt);
    }

    #[test]
    fn seeded_rng_makes_generated_salts_reproducible() {
        let engine = engine(16, 32);
        let first = engine
            .hash_with_rng("pw", None, &mut StdRng::seed_from_u64(7))
            .unwrap();
        let second = engine
            .hash_with_rng("pw", None, &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_password_is_hashable() {
        let engine = engine(16, 32);
        let output = engine.hash("", None).unwrap();
        assert!(engine.verify("", &output.salt, &output.digest).unwrap());
        assert!(!engine.verify(" ", &output.salt, &output.digest).unwrap());
    }

    #[test]
    fn salt_length_mismatch() {
        let engine = engine(16, 32);
        let salt = encoding::encode(&[0u8; 8]);
        assert_eq!(
            engine.hash("x", Some(&salt)).unwrap_err(),
            HashError::SaltLengthMismatch {
                expected: 16,
                actual: 8
            }
        );
    }

    #[test]
    fn explicit_empty_salt_is_a_mismatch() {
        let engine = engine(16, 32);
        assert_eq!(
            engine.hash("x", Some("")).unwrap_err(),
            HashError::SaltLengthMismatch {
                expected: 16,
                actual: 0
            }
        );
    }

    #[test]
    fn undecodable_salt() {
        let engine = engine(16, 32);
        assert!(matches!(
            engine.hash("x", Some("%%%")).unwrap_err(),
            HashError::InvalidSalt(_)
        ));
    }

    #[test]
    fn verify_treats_bad_digest_text_as_mismatch() {
        let engine = engine(16, 32);
        let output = engine.hash("pw", None).unwrap();
        assert!(!engine.verify("pw", &output.salt, "***").unwrap());
        assert!(!engine
            .verify("pw", &output.salt, &encoding::encode(&[0u8; 31]))
            .unwrap());
    }

    #[test]
    fn unicode_passwords_are_distinct() {
        let engine = engine(16, 32);
        let salt = encoding::encode(&[9u8; 16]);
        let accented = engine.hash("p\u{e4}ssword", Some(&salt)).unwrap();
        let plain = engine.hash("password", Some(&salt)).unwrap();
        assert_ne!(accented.digest, plain.digest);
        assert!(engine
            .verify("p\u{e4}ssword", &salt, &accented.digest)
            .unwrap());
    }

    #[test]
    fn destroy_is_terminal_and_idempotent() {
        let engine = engine(16, 32);
        assert!(!engine.is_destroyed());
        engine.destroy().unwrap();
        engine.destroy().unwrap();
        assert!(engine.is_destroyed());
        assert_eq!(engine.hash("pw", None).unwrap_err(), HashError::EngineDestroyed);
        assert_eq!(
            engine.verify("pw", "AAAAAAAAAAAAAAAAAAAAAA==", "AAAA").unwrap_err(),
            HashError::EngineDestroyed
        );
    }

    #[test]
    fn host_exhaustion_is_an_allocation_failure() {
        let err = host_buffer(usize::MAX).map_err(HashError::from).unwrap_err();
        assert_eq!(
            err,
            HashError::AllocationFailed {
                requested: u32::MAX
            }
        );
    }

    #[test]
    fn large_digest_is_backed_or_reported() {
        let engine = Engine::initialize_with(
            HashConfig::new(16, 1 << 24),
            LinearOptions {
                max_pages: 1 << 10,
                costs: CostParams::minimal(),
            },
        )
        .unwrap();
        match engine.hash("pw", None) {
            Ok(output) => assert_eq!(encoding::decode(&output.digest).unwrap().len(), 1 << 24),
            Err(err) => assert!(matches!(err, HashError::AllocationFailed { .. })),
        }
        assert_eq!(engine.module().live_allocations(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn verify_accepts_exactly_the_hashed_password(
            password in any::<String>(),
            other in any::<String>(),
            salt in prop::array::uniform16(any::<u8>()),
        ) {
            prop_assume!(password != other);
            let engine = engine(16, 32);
            let salt = encoding::encode(&salt);

            let stored = engine.hash(&password, Some(&salt)).unwrap();
            let foreign = engine.hash(&other, Some(&salt)).unwrap();

            prop_assert!(engine.verify(&password, &salt, &stored.digest).unwrap());
            prop_assert!(!engine.verify(&password, &salt, &foreign.digest).unwrap());
            prop_assert!(!engine.verify(&other, &salt, &stored.digest).unwrap());
        }
    }

    #[test]
    fn debug_output_hides_module_state() {
        let engine = engine(16, 32);
        let rendered = format!("{engine:?}");
        assert!(rendered.contains("salt_length: 16"));
        assert!(!rendered.contains("memory"));
    }
}
