#![allow(clippy::unwrap_used)]

use argonbox::{
    arena::{CostParams, LinearOptions},
    encoding, Engine, HashConfig, HashError, PasswordHasher,
};
use std::{collections::HashSet, sync::Arc, thread};

fn engine(salt_length: u64, output_length: u64) -> Engine {
    Engine::initialize_with(
        HashConfig::new(salt_length, output_length),
        LinearOptions {
            max_pages: 16,
            costs: CostParams::minimal(),
        },
    )
    .unwrap()
}

#[test]
fn signup_then_login() {
    let engine = engine(16, 32);

    let stored = engine.hash("Str0ngPassw0rd!", None).unwrap();
    assert_eq!(encoding::decode(&stored.salt).unwrap().len(), 16);
    assert_eq!(encoding::decode(&stored.digest).unwrap().len(), 32);

    assert!(engine
        .verify("Str0ngPassw0rd!", &stored.salt, &stored.digest)
        .unwrap());
    assert!(!engine
        .verify("wrongpassword", &stored.salt, &stored.digest)
        .unwrap());
    assert_eq!(engine.module().live_allocations(), 0);
}

#[test]
fn same_password_and_salt_give_same_digest() {
    let engine = engine(16, 32);
    let first = engine.hash("correct horse", None).unwrap();
    let second = engine.hash("correct horse", Some(&first.salt)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn separate_engines_agree_on_digests() {
    let first = engine(16, 32);
    let second = engine(16, 32);
    let stored = first.hash("battery staple", None).unwrap();
    assert!(second
        .verify("battery staple", &stored.salt, &stored.digest)
        .unwrap());
}

#[test]
fn generated_salts_are_unique() {
    let engine = engine(16, 32);
    let salts: HashSet<String> = (0..1000)
        .map(|_| engine.hash("same password", None).unwrap().salt)
        .collect();
    assert_eq!(salts.len(), 1000);
}

#[test]
fn different_salts_give_different_digests() {
    let engine = engine(16, 32);
    let first = engine.hash("pw", Some(&encoding::encode(&[1u8; 16]))).unwrap();
    let second = engine.hash("pw", Some(&encoding::encode(&[2u8; 16]))).unwrap();
    assert_ne!(first.digest, second.digest);
}

#[test]
fn verify_with_wrong_length_salt_is_an_error() {
    let engine = engine(16, 32);
    let stored = engine.hash("pw", None).unwrap();
    assert_eq!(
        engine
            .verify("pw", &encoding::encode(&[0u8; 12]), &stored.digest)
            .unwrap_err(),
        HashError::SaltLengthMismatch {
            expected: 16,
            actual: 12
        }
    );
}

#[test]
fn concurrent_calls_share_one_engine() {
    let engine = Arc::new(engine(16, 32));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let password = format!("password-{i}");
                let stored = engine.hash(&password, None).unwrap();
                assert!(engine
                    .verify(&password, &stored.salt, &stored.digest)
                    .unwrap());
                stored
            })
        })
        .collect();

    let digests: HashSet<String> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().digest)
        .collect();
    assert_eq!(digests.len(), 8);
    assert_eq!(engine.module().live_allocations(), 0);
}

#[test]
fn destroyed_engine_rejects_calls() {
    let engine = engine(16, 32);
    let stored = engine.hash("pw", None).unwrap();

    engine.destroy().unwrap();
    engine.destroy().unwrap();

    assert_eq!(
        engine.hash("pw", None).unwrap_err(),
        HashError::EngineDestroyed
    );
    assert_eq!(
        engine.verify("pw", &stored.salt, &stored.digest).unwrap_err(),
        HashError::EngineDestroyed
    );
}
