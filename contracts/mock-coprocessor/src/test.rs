#![cfg(test)]

//! Unit tests for the mock coprocessor: handle lifecycle, operation
//! semantics, ACL enforcement, and input-proof binding.

use crate::{MockCoprocessor, MockCoprocessorClient, CIPHERTEXT_LEN};
use soroban_sdk::testutils::{Address as _, Ledger as _};
use soroban_sdk::{Address, Bytes, BytesN, Env};

// ════════════════════════════════════════════════════════════════════════════
//  Helpers
// ════════════════════════════════════════════════════════════════════════════

fn setup() -> (Env, MockCoprocessorClient<'static>, Address) {
    let env = Env::default();
    env.mock_all_auths();

    env.ledger().set(soroban_sdk::testutils::LedgerInfo {
        timestamp: 1_700_000_000,
        protocol_version: 25,
        sequence_number: 100,
        network_id: Default::default(),
        base_reserve: 10,
        min_temp_entry_ttl: u32::MAX / 2,
        min_persistent_entry_ttl: u32::MAX / 2,
        max_entry_ttl: u32::MAX / 2,
    });

    let contract_id = env.register(MockCoprocessor, ());
    let client = MockCoprocessorClient::new(&env, &contract_id);

    let user = Address::generate(&env);
    (env, client, user)
}

/// Build a simulated input ciphertext and its binding proof, the same way a
/// client SDK would: value || randomness, proof over (ciphertext, owner,
/// target).
fn encrypt_input(env: &Env, value: u32, owner: &Address, target: &Address) -> (Bytes, Bytes) {
    let mut ciphertext = Bytes::from_array(env, &value.to_be_bytes());
    ciphertext.append(&Bytes::from_array(env, &[0x5Au8; 32]));

    let mut preimage = ciphertext.clone();
    preimage.append(&owner.to_string().to_bytes());
    preimage.append(&target.to_string().to_bytes());
    let proof: BytesN<32> = env.crypto().keccak256(&preimage).into();

    (ciphertext, Bytes::from_array(env, &proof.to_array()))
}

// ════════════════════════════════════════════════════════════════════════════
//  Tests: Handle lifecycle
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn trivial_encrypt_decrypt_roundtrip() {
    let (_env, client, user) = setup();

    let handle = client.trivial_encrypt(&user, &1000);
    assert_eq!(client.decrypt(&user, &handle), 1000);
}

#[test]
fn handles_are_unique_per_creation() {
    let (_env, client, user) = setup();

    let a = client.trivial_encrypt(&user, &5);
    let b = client.trivial_encrypt(&user, &5);
    assert_ne!(a, b);
    assert_eq!(client.decrypt(&user, &a), 5);
    assert_eq!(client.decrypt(&user, &b), 5);
}

#[test]
fn unknown_handle_rejected() {
    let (env, client, user) = setup();

    let bogus = BytesN::<32>::from_array(&env, &[0xFFu8; 32]);
    assert!(client.try_decrypt(&user, &bogus).is_err());
    assert!(!client.is_allowed(&bogus, &user));
}

// ════════════════════════════════════════════════════════════════════════════
//  Tests: Access control
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn decrypt_requires_grant() {
    let (env, client, user) = setup();
    let stranger = Address::generate(&env);

    let handle = client.trivial_encrypt(&user, &42);
    assert!(client.try_decrypt(&stranger, &handle).is_err());

    client.allow(&user, &handle, &stranger);
    assert_eq!(client.decrypt(&stranger, &handle), 42);
}

#[test]
fn allow_requires_existing_access() {
    let (env, client, user) = setup();
    let stranger = Address::generate(&env);

    let handle = client.trivial_encrypt(&user, &42);
    // A stranger cannot grant themselves access.
    assert!(client.try_allow(&stranger, &handle, &stranger).is_err());
    assert!(!client.is_allowed(&handle, &stranger));
}

#[test]
fn allow_unknown_handle_rejected() {
    let (env, client, user) = setup();

    let bogus = BytesN::<32>::from_array(&env, &[0u8; 32]);
    assert!(client.try_allow(&user, &bogus, &user).is_err());
}

#[test]
fn operations_require_operand_access() {
    let (env, client, user) = setup();
    let other = Address::generate(&env);

    let mine = client.trivial_encrypt(&user, &1);
    let theirs = client.trivial_encrypt(&other, &2);

    // `user` holds no access on `theirs`.
    assert!(client.try_eq(&user, &mine, &theirs).is_err());
    assert!(client.try_sub(&user, &theirs, &mine).is_err());

    client.allow(&other, &theirs, &user);
    assert_eq!(client.decrypt(&user, &client.eq(&user, &mine, &theirs)), 0);
}

#[test]
fn creator_of_result_gets_access() {
    let (_env, client, user) = setup();

    let a = client.trivial_encrypt(&user, &7);
    let b = client.trivial_encrypt(&user, &7);
    let result = client.eq(&user, &a, &b);

    assert!(client.is_allowed(&result, &user));
    assert_eq!(client.decrypt(&user, &result), 1);
}

// ════════════════════════════════════════════════════════════════════════════
//  Tests: Operation semantics
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn eq_produces_boolean_handles() {
    let (_env, client, user) = setup();

    let a = client.trivial_encrypt(&user, &3);
    let b = client.trivial_encrypt(&user, &3);
    let c = client.trivial_encrypt(&user, &4);

    assert_eq!(client.decrypt(&user, &client.eq(&user, &a, &b)), 1);
    assert_eq!(client.decrypt(&user, &client.eq(&user, &a, &c)), 0);
}

#[test]
fn ge_is_inclusive() {
    let (_env, client, user) = setup();

    let hundred = client.trivial_encrypt(&user, &100);
    let hundred_again = client.trivial_encrypt(&user, &100);
    let ninety_nine = client.trivial_encrypt(&user, &99);

    assert_eq!(
        client.decrypt(&user, &client.ge(&user, &hundred, &hundred_again)),
        1
    );
    assert_eq!(
        client.decrypt(&user, &client.ge(&user, &hundred, &ninety_nine)),
        1
    );
    assert_eq!(
        client.decrypt(&user, &client.ge(&user, &ninety_nine, &hundred)),
        0
    );
}

#[test]
fn sub_is_modular() {
    let (_env, client, user) = setup();

    let small = client.trivial_encrypt(&user, &0);
    let one = client.trivial_encrypt(&user, &1);

    let wrapped = client.sub(&user, &small, &one);
    assert_eq!(client.decrypt(&user, &wrapped), u32::MAX);

    let big = client.trivial_encrypt(&user, &1000);
    let cost = client.trivial_encrypt(&user, &200);
    assert_eq!(client.decrypt(&user, &client.sub(&user, &big, &cost)), 800);
}

#[test]
fn boolean_connectives() {
    let (_env, client, user) = setup();

    let t = client.trivial_encrypt(&user, &1);
    let f = client.trivial_encrypt(&user, &0);

    assert_eq!(client.decrypt(&user, &client.and(&user, &t, &t)), 1);
    assert_eq!(client.decrypt(&user, &client.and(&user, &t, &f)), 0);
    assert_eq!(client.decrypt(&user, &client.or(&user, &f, &t)), 1);
    assert_eq!(client.decrypt(&user, &client.or(&user, &f, &f)), 0);
}

#[test]
fn select_picks_by_condition() {
    let (_env, client, user) = setup();

    let t = client.trivial_encrypt(&user, &1);
    let f = client.trivial_encrypt(&user, &0);
    let yes = client.trivial_encrypt(&user, &111);
    let no = client.trivial_encrypt(&user, &222);

    assert_eq!(
        client.decrypt(&user, &client.select(&user, &t, &yes, &no)),
        111
    );
    assert_eq!(
        client.decrypt(&user, &client.select(&user, &f, &yes, &no)),
        222
    );
}

#[test]
fn select_result_is_a_fresh_handle() {
    let (_env, client, user) = setup();

    let t = client.trivial_encrypt(&user, &1);
    let yes = client.trivial_encrypt(&user, &111);
    let no = client.trivial_encrypt(&user, &222);

    // The chosen arm must not be recognizable by handle identity.
    let picked = client.select(&user, &t, &yes, &no);
    assert_ne!(picked, yes);
    assert_ne!(picked, no);
    assert_eq!(client.decrypt(&user, &picked), 111);
}

// ════════════════════════════════════════════════════════════════════════════
//  Tests: Input verification
// ════════════════════════════════════════════════════════════════════════════

#[test]
fn verify_input_accepts_bound_proof() {
    let (env, client, user) = setup();
    let target = Address::generate(&env);

    let (ciphertext, proof) = encrypt_input(&env, 3, &user, &target);
    let handle = client.verify_input(&target, &user, &ciphertext, &proof);

    let handle = handle.unwrap();
    // Access lands on the target contract, not the owner; the target is
    // responsible for any further grants.
    assert!(client.is_allowed(&handle, &target));
    assert!(!client.is_allowed(&handle, &user));
    assert_eq!(client.decrypt(&target, &handle), 3);
}

#[test]
fn verify_input_rejects_tampered_proof() {
    let (env, client, user) = setup();
    let target = Address::generate(&env);

    let (ciphertext, _proof) = encrypt_input(&env, 3, &user, &target);
    let bad_proof = Bytes::from_array(&env, &[9u8; 32]);

    assert_eq!(
        client.verify_input(&target, &user, &ciphertext, &bad_proof),
        None
    );
}

#[test]
fn verify_input_rejects_wrong_owner() {
    let (env, client, user) = setup();
    let other = Address::generate(&env);
    let target = Address::generate(&env);

    let (ciphertext, proof) = encrypt_input(&env, 3, &user, &target);
    // Proof was minted for `user`; replaying it under `other` must fail.
    assert_eq!(
        client.verify_input(&target, &other, &ciphertext, &proof),
        None
    );
}

#[test]
fn verify_input_rejects_wrong_target() {
    let (env, client, user) = setup();
    let target = Address::generate(&env);
    let other_target = Address::generate(&env);

    let (ciphertext, proof) = encrypt_input(&env, 3, &user, &target);
    assert_eq!(
        client.verify_input(&other_target, &user, &ciphertext, &proof),
        None
    );
}

#[test]
fn verify_input_rejects_malformed_ciphertext() {
    let (env, client, user) = setup();
    let target = Address::generate(&env);

    let short = Bytes::from_array(&env, &[1u8; 4]);
    let proof = Bytes::from_array(&env, &[0u8; 32]);
    assert_eq!(client.verify_input(&target, &user, &short, &proof), None);

    // Correct length is CIPHERTEXT_LEN exactly.
    let long = Bytes::from_array(&env, &[1u8; (CIPHERTEXT_LEN + 1) as usize]);
    assert_eq!(client.verify_input(&target, &user, &long, &proof), None);
}
