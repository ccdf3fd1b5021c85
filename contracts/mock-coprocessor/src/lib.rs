#![no_std]

//! # Mock FHE Coprocessor
//!
//! A handle-based simulation of an FHE coprocessor for development and
//! testing. Contracts hold opaque 32-byte ciphertext handles; this contract
//! maps each handle to its backing value and enforces a per-handle access
//! control list. On a production network the same interface is served by a
//! threshold-FHE coprocessor and the backing values never exist in the
//! clear — here they live in contract storage, which is what makes the
//! simulation cheap to run inside `soroban-sdk` test environments.
//!
//! ## Handle model
//!
//! Every operation that produces a ciphertext mints a **fresh** handle
//! (`keccak256(tag || counter || value)`), including `select`: the result
//! handle never aliases either input arm, so observers cannot tell which
//! arm was chosen by comparing handles.
//!
//! ## Access control
//!
//! - The identity that creates a handle is granted access to it.
//! - `allow` extends access; the caller must already hold access.
//! - Every operation that reads operand handles requires the caller to hold
//!   access on each operand.
//! - `decrypt` is the only way back to plaintext and is ACL-gated. It
//!   stands in for the off-chain threshold decryption + signature flow.
//!
//! ## Boolean convention
//!
//! Comparison results are handles holding 0 or 1. `and`/`or`/`select`
//! treat any nonzero value as true.
//!
//! ## Input wire format (simulation only)
//!
//! `verify_input` accepts `value:u32 BE || 32 bytes client randomness`
//! (36 bytes) together with a 32-byte proof
//! `keccak256(ciphertext || owner || target)`. The proof binds the
//! ciphertext to the submitting owner and the target contract so a blob
//! minted for one contract cannot be replayed into another.

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, panic_with_error, Address, Bytes,
    BytesN, Env,
};

// ═══════════════════════════════════════════════════════════════════════════════
//  Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum CoprocessorError {
    UnknownHandle = 1,
    AccessDenied = 2,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Storage keys
// ═══════════════════════════════════════════════════════════════════════════════

#[contracttype]
#[derive(Clone)]
enum DataKey {
    /// Backing value of a ciphertext handle.
    Value(BytesN<32>),
    /// ACL entry: (handle, identity) → granted.
    Access(BytesN<32>, Address),
    /// Monotonic counter mixed into handle derivation for uniqueness.
    HandleCounter,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Wire length of a simulated input ciphertext: u32 BE value + 32 bytes of
/// client randomness.
pub const CIPHERTEXT_LEN: u32 = 36;

/// Domain tag mixed into every handle derivation ("CTX1").
const HANDLE_TAG: [u8; 4] = [0x43, 0x54, 0x58, 0x31];

// Ledger rate is approximately 5 seconds per ledger on Stellar
const LEDGER_RATE_SECS: u32 = 5;

// Handles live as long as the game records that reference them (120 days)
const HANDLE_TTL_SECONDS: u32 = 120 * 24 * 60 * 60; // 10,368,000 seconds
const HANDLE_TTL_LEDGERS: u32 = HANDLE_TTL_SECONDS / LEDGER_RATE_SECS; // 2,073,600 ledgers

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract
// ═══════════════════════════════════════════════════════════════════════════════

#[contract]
pub struct MockCoprocessor;

#[contractimpl]
impl MockCoprocessor {
    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Input verification
    // ───────────────────────────────────────────────────────────────────────────

    /// Verify an externally produced ciphertext/proof pair and register it.
    ///
    /// `caller` is the target contract the input was minted for; `owner` is
    /// the identity that encrypted it. Returns `None` on any malformed or
    /// mis-bound input so callers can map rejection into their own error
    /// taxonomy. On success the fresh handle is access-granted to `caller`.
    pub fn verify_input(
        env: Env,
        caller: Address,
        owner: Address,
        ciphertext: Bytes,
        proof: Bytes,
    ) -> Option<BytesN<32>> {
        caller.require_auth();

        if ciphertext.len() != CIPHERTEXT_LEN || proof.len() != 32 {
            return None;
        }

        let mut preimage = ciphertext.clone();
        preimage.append(&owner.to_string().to_bytes());
        preimage.append(&caller.to_string().to_bytes());
        let expected: BytesN<32> = env.crypto().keccak256(&preimage).into();
        if proof != Bytes::from_array(&env, &expected.to_array()) {
            return None;
        }

        let mut value_be = [0u8; 4];
        let mut i = 0u32;
        while i < 4 {
            value_be[i as usize] = ciphertext.get(i).unwrap_or(0);
            i += 1;
        }
        let value = u32::from_be_bytes(value_be);

        Some(Self::mint_handle(&env, &caller, value))
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Ciphertext operations
    // ───────────────────────────────────────────────────────────────────────────

    /// Encrypt a public constant. The value is not secret; the handle exists
    /// so constants can participate in ciphertext arithmetic.
    pub fn trivial_encrypt(env: Env, caller: Address, value: u32) -> BytesN<32> {
        caller.require_auth();
        Self::mint_handle(&env, &caller, value)
    }

    /// Equality test. Boolean-typed result handle (0 or 1).
    pub fn eq(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32> {
        caller.require_auth();
        let a = Self::read_operand(&env, &caller, &lhs);
        let b = Self::read_operand(&env, &caller, &rhs);
        Self::mint_handle(&env, &caller, if a == b { 1 } else { 0 })
    }

    /// Greater-or-equal test (inclusive). Boolean-typed result handle.
    pub fn ge(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32> {
        caller.require_auth();
        let a = Self::read_operand(&env, &caller, &lhs);
        let b = Self::read_operand(&env, &caller, &rhs);
        Self::mint_handle(&env, &caller, if a >= b { 1 } else { 0 })
    }

    /// Subtraction. Ciphertext arithmetic is modular, so this wraps.
    pub fn sub(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32> {
        caller.require_auth();
        let a = Self::read_operand(&env, &caller, &lhs);
        let b = Self::read_operand(&env, &caller, &rhs);
        Self::mint_handle(&env, &caller, a.wrapping_sub(b))
    }

    /// Boolean and. Any nonzero operand reads as true.
    pub fn and(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32> {
        caller.require_auth();
        let a = Self::read_operand(&env, &caller, &lhs);
        let b = Self::read_operand(&env, &caller, &rhs);
        Self::mint_handle(&env, &caller, if a != 0 && b != 0 { 1 } else { 0 })
    }

    /// Boolean or. Any nonzero operand reads as true.
    pub fn or(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32> {
        caller.require_auth();
        let a = Self::read_operand(&env, &caller, &lhs);
        let b = Self::read_operand(&env, &caller, &rhs);
        Self::mint_handle(&env, &caller, if a != 0 || b != 0 { 1 } else { 0 })
    }

    /// Oblivious ternary: pick `if_true` or `if_false` by `cond` without
    /// revealing which. Both arms are read and the result is always a fresh
    /// handle, so the choice is not observable from the outside.
    pub fn select(
        env: Env,
        caller: Address,
        cond: BytesN<32>,
        if_true: BytesN<32>,
        if_false: BytesN<32>,
    ) -> BytesN<32> {
        caller.require_auth();
        let c = Self::read_operand(&env, &caller, &cond);
        let t = Self::read_operand(&env, &caller, &if_true);
        let f = Self::read_operand(&env, &caller, &if_false);
        Self::mint_handle(&env, &caller, if c != 0 { t } else { f })
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Access control & decryption gate
    // ───────────────────────────────────────────────────────────────────────────

    /// Grant `grantee` access to `handle`. The caller must already hold
    /// access on the handle.
    pub fn allow(env: Env, caller: Address, handle: BytesN<32>, grantee: Address) {
        caller.require_auth();

        if !env.storage().persistent().has(&DataKey::Value(handle.clone())) {
            panic_with_error!(&env, CoprocessorError::UnknownHandle);
        }
        if !Self::has_access(&env, &handle, &caller) {
            panic_with_error!(&env, CoprocessorError::AccessDenied);
        }

        let key = DataKey::Access(handle, grantee);
        env.storage().persistent().set(&key, &true);
        env.storage()
            .persistent()
            .extend_ttl(&key, HANDLE_TTL_LEDGERS, HANDLE_TTL_LEDGERS);
    }

    /// ACL introspection. Never fails; an unknown handle reads as
    /// "no access".
    pub fn is_allowed(env: Env, handle: BytesN<32>, who: Address) -> bool {
        Self::has_access(&env, &handle, &who)
    }

    /// Return the plaintext behind a handle. ACL-gated: only identities
    /// granted on the handle may decrypt it.
    pub fn decrypt(env: Env, caller: Address, handle: BytesN<32>) -> u32 {
        caller.require_auth();
        Self::read_operand(&env, &caller, &handle)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    //  Internal
    // ═══════════════════════════════════════════════════════════════════════════

    /// Mint a fresh handle backed by `value` and grant `creator` access.
    fn mint_handle(env: &Env, creator: &Address, value: u32) -> BytesN<32> {
        let counter: u64 = env
            .storage()
            .instance()
            .get(&DataKey::HandleCounter)
            .unwrap_or(0);
        env.storage()
            .instance()
            .set(&DataKey::HandleCounter, &(counter + 1));

        let mut preimage = Bytes::from_array(env, &HANDLE_TAG);
        preimage.append(&Bytes::from_array(env, &counter.to_be_bytes()));
        preimage.append(&Bytes::from_array(env, &value.to_be_bytes()));
        let handle: BytesN<32> = env.crypto().keccak256(&preimage).into();

        let value_key = DataKey::Value(handle.clone());
        env.storage().persistent().set(&value_key, &value);
        env.storage()
            .persistent()
            .extend_ttl(&value_key, HANDLE_TTL_LEDGERS, HANDLE_TTL_LEDGERS);

        let access_key = DataKey::Access(handle.clone(), creator.clone());
        env.storage().persistent().set(&access_key, &true);
        env.storage()
            .persistent()
            .extend_ttl(&access_key, HANDLE_TTL_LEDGERS, HANDLE_TTL_LEDGERS);

        env.storage()
            .instance()
            .extend_ttl(HANDLE_TTL_LEDGERS, HANDLE_TTL_LEDGERS);

        handle
    }

    /// Resolve an operand handle, enforcing existence and caller access.
    fn read_operand(env: &Env, caller: &Address, handle: &BytesN<32>) -> u32 {
        if !env.storage().persistent().has(&DataKey::Value(handle.clone())) {
            panic_with_error!(env, CoprocessorError::UnknownHandle);
        }
        if !Self::has_access(env, handle, caller) {
            panic_with_error!(env, CoprocessorError::AccessDenied);
        }
        env.storage()
            .persistent()
            .get(&DataKey::Value(handle.clone()))
            .unwrap_or(0)
    }

    fn has_access(env: &Env, handle: &BytesN<32>, who: &Address) -> bool {
        env.storage()
            .persistent()
            .get(&DataKey::Access(handle.clone(), who.clone()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod test;
