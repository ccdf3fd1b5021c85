#![no_std]

//! # Cipherhold
//!
//! A kingdom-builder game whose per-player state is encrypted end to end.
//! Each player holds a gold balance and a last-constructed building, both
//! stored as opaque ciphertext handles managed by an FHE coprocessor
//! contract. The registry never sees a plaintext balance: construction
//! attempts are resolved entirely in ciphertext space and only the player
//! (and this contract) can decrypt the outcome.
//!
//! ## Game flow
//! 1. A player joins once and receives an encrypted starting allocation of
//!    1000 gold and an encrypted "no building" marker.
//! 2. The player encrypts a building id client-side and submits it together
//!    with an input proof binding the ciphertext to the player and to this
//!    contract.
//! 3. The contract re-prices the request obliviously: every catalog entry
//!    is probed with `eq`, the matching cost is folded in with `select`,
//!    affordability is checked with an inclusive `ge`, and the update is
//!    applied with `select`/`sub`. No plaintext branch depends on the
//!    requested id.
//! 4. An unknown id or an unaffordable request is a **silent no-op**: the
//!    call succeeds, gold and building are unchanged, and only decrypting
//!    the post-state reveals what happened. Failing the call instead would
//!    leak the plaintext of the encrypted request.
//!
//! ## Access control
//! Every ciphertext handle written into a record is granted to the
//! registry itself (so it can recompute on the next call) and to the owning
//! player (so they can decrypt client-side). Nobody else is ever granted.
//!
//! ## Building catalog
//! Fixed at compile time: Barracks=100, Farm=200, Factory=300, Wall=400,
//! ids 1–4. Id 0 is the "nothing built yet" sentinel.

use soroban_sdk::{
    contract, contractclient, contracterror, contractevent, contractimpl, contracttype,
    symbol_short, Address, Bytes, BytesN, Env, Symbol, Vec,
};

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract Events
// ═══════════════════════════════════════════════════════════════════════════════

#[contractevent]
pub struct EvPlayerJoined {
    pub player: Address,
}

/// Emitted for every construction attempt, applied or silently rejected.
/// The event deliberately carries no outcome: its presence must not reveal
/// whether the encrypted request went through.
#[contractevent]
pub struct EvBuildingAttempted {
    pub player: Address,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  External trait interfaces
// ═══════════════════════════════════════════════════════════════════════════════

/// Encrypted arithmetic coprocessor.
///
/// Handles are opaque 32-byte ciphertext identifiers. Comparison results
/// are boolean-typed handles (0 or 1). Operations enforce per-handle access
/// control: the caller must hold access on every operand, and every created
/// handle is access-granted to its creator.
///
/// `verify_input` validates that an externally produced ciphertext/proof
/// pair was minted for `owner` and for the calling contract; it returns
/// `None` on rejection so callers can surface their own error.
#[contractclient(name = "CoprocessorClient")]
pub trait FheCoprocessor {
    fn verify_input(
        env: Env,
        caller: Address,
        owner: Address,
        ciphertext: Bytes,
        proof: Bytes,
    ) -> Option<BytesN<32>>;

    fn trivial_encrypt(env: Env, caller: Address, value: u32) -> BytesN<32>;

    fn eq(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32>;

    fn ge(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32>;

    fn sub(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32>;

    fn and(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32>;

    fn or(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32>;

    fn select(
        env: Env,
        caller: Address,
        cond: BytesN<32>,
        if_true: BytesN<32>,
        if_false: BytesN<32>,
    ) -> BytesN<32>;

    fn allow(env: Env, caller: Address, handle: BytesN<32>, grantee: Address);

    fn is_allowed(env: Env, handle: BytesN<32>, who: Address) -> bool;

    fn decrypt(env: Env, caller: Address, handle: BytesN<32>) -> u32;
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum KingdomError {
    AlreadyRegistered = 1,
    NotRegistered = 2,
    InvalidProof = 3,
    AdminNotSet = 4,
    CoprocessorNotSet = 5,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Player record & storage keys
// ═══════════════════════════════════════════════════════════════════════════════

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayerRecord {
    /// Encrypted 32-bit gold balance (ciphertext handle).
    pub gold: BytesN<32>,
    /// Encrypted id of the last constructed building; 0 = none yet.
    pub last_building: BytesN<32>,
    /// Set exactly once, on join. There is no unregister.
    pub registered: bool,
}

/// One catalog entry, as returned by `get_building_catalog`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Building {
    pub id: u32,
    pub name: Symbol,
    pub cost: u32,
}

#[contracttype]
#[derive(Clone)]
enum StorageKey {
    Admin,
    CoprocessorAddress,
    Player(Address),
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Gold allocated to every player on join.
pub const STARTING_GOLD: u32 = 1000;

/// Sentinel id meaning "nothing built yet".
pub const BUILDING_NONE: u32 = 0;

// Catalog order is fixed; the construction fold walks it deterministically.
const BUILDING_IDS: [u32; 4] = [1, 2, 3, 4];
const BUILDING_COSTS: [u32; 4] = [100, 200, 300, 400];
const CATALOG_SIZE: usize = 4;

// Ledger rate is approximately 5 seconds per ledger on Stellar
const LEDGER_RATE_SECS: u32 = 5;

// Player records are long-lived persistent state (120 days per extension)
const PLAYER_TTL_SECONDS: u32 = 120 * 24 * 60 * 60; // 10,368,000 seconds
const PLAYER_TTL_LEDGERS: u32 = PLAYER_TTL_SECONDS / LEDGER_RATE_SECS; // 2,073,600 ledgers

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract
// ═══════════════════════════════════════════════════════════════════════════════

#[contract]
pub struct KingdomContract;

#[contractimpl]
impl KingdomContract {
    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Constructor
    // ───────────────────────────────────────────────────────────────────────────

    pub fn __constructor(env: Env, admin: Address, coprocessor: Address) {
        env.storage().instance().set(&StorageKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&StorageKey::CoprocessorAddress, &coprocessor);
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Registry lifecycle
    // ───────────────────────────────────────────────────────────────────────────

    /// Register the caller and allocate their encrypted starting state.
    pub fn join(env: Env, player: Address) -> Result<(), KingdomError> {
        player.require_auth();

        let key = StorageKey::Player(player.clone());
        let existing: Option<PlayerRecord> = env.storage().persistent().get(&key);
        if let Some(record) = existing {
            if record.registered {
                return Err(KingdomError::AlreadyRegistered);
            }
        }

        let cop = Self::coprocessor(&env)?;
        let registry = env.current_contract_address();

        let record = PlayerRecord {
            gold: cop.trivial_encrypt(&registry, &STARTING_GOLD),
            last_building: cop.trivial_encrypt(&registry, &BUILDING_NONE),
            registered: true,
        };

        Self::grant_record_access(&cop, &registry, &player, &record);
        Self::write_player(&env, &player, &record);

        EvPlayerJoined { player }.publish(&env);
        Ok(())
    }

    /// Attempt to construct a building from an encrypted building id.
    ///
    /// `encrypted_building_id` is the client-encrypted request;
    /// `input_proof` binds it to `player` and to this contract instance.
    /// The call fails only for unregistered players or rejected proofs —
    /// an unknown id or an unaffordable cost is absorbed obliviously and
    /// leaves the record's plaintext unchanged.
    pub fn construct_building(
        env: Env,
        player: Address,
        encrypted_building_id: Bytes,
        input_proof: Bytes,
    ) -> Result<(), KingdomError> {
        player.require_auth();

        let mut record = Self::read_player(&env, &player)?;

        let cop = Self::coprocessor(&env)?;
        let registry = env.current_contract_address();

        // Proof rejection is the capability's verdict, surfaced as ours.
        // Nothing has been written yet, so the record is untouched.
        let requested = cop
            .verify_input(&registry, &player, &encrypted_building_id, &input_proof)
            .ok_or(KingdomError::InvalidProof)?;

        let (new_gold, new_building) = Self::run_construction(
            &cop,
            &registry,
            &record.gold,
            &record.last_building,
            &requested,
        );

        // Gold and building move together as one transition, never apart.
        record.gold = new_gold;
        record.last_building = new_building;

        Self::grant_record_access(&cop, &registry, &player, &record);
        Self::write_player(&env, &player, &record);

        EvBuildingAttempted { player }.publish(&env);
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Reads
    // ───────────────────────────────────────────────────────────────────────────

    /// Full record: ciphertext handles plus the plaintext registered flag.
    pub fn get_player_state(env: Env, player: Address) -> Result<PlayerRecord, KingdomError> {
        Self::read_player(&env, &player)
    }

    pub fn get_player_gold(env: Env, player: Address) -> Result<BytesN<32>, KingdomError> {
        Ok(Self::read_player(&env, &player)?.gold)
    }

    pub fn get_player_last_building(
        env: Env,
        player: Address,
    ) -> Result<BytesN<32>, KingdomError> {
        Ok(Self::read_player(&env, &player)?.last_building)
    }

    /// Absence of a record is a valid "false", not an error.
    pub fn is_player_registered(env: Env, player: Address) -> bool {
        let record: Option<PlayerRecord> = env
            .storage()
            .persistent()
            .get(&StorageKey::Player(player));
        match record {
            Some(r) => r.registered,
            None => false,
        }
    }

    /// Catalog costs in catalog order. Pure; no state access.
    pub fn get_building_prices(env: Env) -> Vec<u32> {
        let mut prices = Vec::new(&env);
        for i in 0..CATALOG_SIZE {
            prices.push_back(BUILDING_COSTS[i]);
        }
        prices
    }

    /// Full catalog with names, in catalog order.
    pub fn get_building_catalog(env: Env) -> Vec<Building> {
        let mut catalog = Vec::new(&env);
        for i in 0..CATALOG_SIZE {
            catalog.push_back(Building {
                id: BUILDING_IDS[i],
                name: Self::building_name(i),
                cost: BUILDING_COSTS[i],
            });
        }
        catalog
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Admin
    // ───────────────────────────────────────────────────────────────────────────

    pub fn get_admin(env: Env) -> Result<Address, KingdomError> {
        Self::load_admin(&env)
    }

    pub fn set_admin(env: Env, new_admin: Address) -> Result<(), KingdomError> {
        let admin = Self::load_admin(&env)?;
        admin.require_auth();
        env.storage().instance().set(&StorageKey::Admin, &new_admin);
        Ok(())
    }

    pub fn get_coprocessor(env: Env) -> Result<Address, KingdomError> {
        Self::load_coprocessor(&env)
    }

    pub fn set_coprocessor(env: Env, new_coprocessor: Address) -> Result<(), KingdomError> {
        let admin = Self::load_admin(&env)?;
        admin.require_auth();
        env.storage()
            .instance()
            .set(&StorageKey::CoprocessorAddress, &new_coprocessor);
        Ok(())
    }

    pub fn upgrade(env: Env, new_wasm_hash: BytesN<32>) -> Result<(), KingdomError> {
        let admin = Self::load_admin(&env)?;
        admin.require_auth();
        env.deployer().update_current_contract_wasm(new_wasm_hash);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    //  Internal: Construction state machine
    // ═══════════════════════════════════════════════════════════════════════════

    /// Resolve a construction attempt entirely in ciphertext space.
    ///
    /// Every catalog entry is probed and every candidate outcome is
    /// computed; the real one is picked with `select`. The requested id
    /// therefore never influences which operations run, only which results
    /// survive — the oblivious-evaluation constraint that makes invalid ids
    /// and unaffordable requests indistinguishable from successes at the
    /// call level.
    fn run_construction(
        cop: &CoprocessorClient,
        registry: &Address,
        gold: &BytesN<32>,
        last_building: &BytesN<32>,
        requested: &BytesN<32>,
    ) -> (BytesN<32>, BytesN<32>) {
        let zero = cop.trivial_encrypt(registry, &0);

        // Fold the catalog in its fixed order: ids are unique, so at most
        // one probe matches and the fold order cannot change the result —
        // but it keeps every run reproducible.
        let mut is_known = zero.clone();
        let mut selected_cost = zero.clone();
        for i in 0..CATALOG_SIZE {
            let id_ct = cop.trivial_encrypt(registry, &BUILDING_IDS[i]);
            let cost_ct = cop.trivial_encrypt(registry, &BUILDING_COSTS[i]);

            let is_match = cop.eq(registry, requested, &id_ct);
            is_known = cop.or(registry, &is_known, &is_match);
            selected_cost = cop.select(registry, &is_match, &cost_ct, &selected_cost);
        }

        // Inclusive comparison: an exactly-affordable request applies.
        let can_afford = cop.ge(registry, gold, &selected_cost);
        let should_apply = cop.and(registry, &is_known, &can_afford);

        // A rejected attempt pays zero, so gold never increases and the
        // subtraction can never underflow.
        let applied_cost = cop.select(registry, &should_apply, &selected_cost, &zero);
        let new_gold = cop.sub(registry, gold, &applied_cost);
        let new_building = cop.select(registry, &should_apply, requested, last_building);

        (new_gold, new_building)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    //  Internal: Access grants & storage
    // ═══════════════════════════════════════════════════════════════════════════

    /// Grant decrypt rights on both record handles to the registry (for
    /// recomputation) and the owning player (for client-side decryption).
    /// Runs on every write; nobody else is ever granted.
    fn grant_record_access(
        cop: &CoprocessorClient,
        registry: &Address,
        owner: &Address,
        record: &PlayerRecord,
    ) {
        cop.allow(registry, &record.gold, registry);
        cop.allow(registry, &record.gold, owner);
        cop.allow(registry, &record.last_building, registry);
        cop.allow(registry, &record.last_building, owner);
    }

    fn read_player(env: &Env, player: &Address) -> Result<PlayerRecord, KingdomError> {
        let record: Option<PlayerRecord> = env
            .storage()
            .persistent()
            .get(&StorageKey::Player(player.clone()));
        match record {
            Some(r) if r.registered => Ok(r),
            _ => Err(KingdomError::NotRegistered),
        }
    }

    fn write_player(env: &Env, player: &Address, record: &PlayerRecord) {
        let key = StorageKey::Player(player.clone());
        env.storage().persistent().set(&key, record);
        env.storage()
            .persistent()
            .extend_ttl(&key, PLAYER_TTL_LEDGERS, PLAYER_TTL_LEDGERS);
        // Keep instance storage (admin, coprocessor address) alive
        env.storage()
            .instance()
            .extend_ttl(PLAYER_TTL_LEDGERS, PLAYER_TTL_LEDGERS);
    }

    fn coprocessor(env: &Env) -> Result<CoprocessorClient<'static>, KingdomError> {
        let addr = Self::load_coprocessor(env)?;
        Ok(CoprocessorClient::new(env, &addr))
    }

    fn building_name(index: usize) -> Symbol {
        match index {
            0 => symbol_short!("Barracks"),
            1 => symbol_short!("Farm"),
            2 => symbol_short!("Factory"),
            _ => symbol_short!("Wall"),
        }
    }

    fn load_admin(env: &Env) -> Result<Address, KingdomError> {
        env.storage()
            .instance()
            .get(&StorageKey::Admin)
            .ok_or(KingdomError::AdminNotSet)
    }

    fn load_coprocessor(env: &Env) -> Result<Address, KingdomError> {
        env.storage()
            .instance()
            .get(&StorageKey::CoprocessorAddress)
            .ok_or(KingdomError::CoprocessorNotSet)
    }
}
