#![forbid(unsafe_code)]

//! Collision-free random tokens.
//!
//! Every token handed out is remembered for the life of the process, and a
//! freshly drawn token that matches an earlier one is discarded and redrawn.
//! Tokens are 11 base-36 characters, drawn from the OS entropy source.

use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use ahash::{AHashSet, RandomState};

const TOKEN_LEN: usize = 11;
const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static ISSUED: OnceLock<Mutex<AHashSet<String>>> = OnceLock::new();

static FALLBACK_STATE: OnceLock<RandomState> = OnceLock::new();
static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

fn issued() -> &'static Mutex<AHashSet<String>> {
    ISSUED.get_or_init(|| Mutex::new(AHashSet::new()))
}

/// Return a token that has never been returned before in this process.
#[must_use]
pub fn new_token() -> String {
    fresh_token(random_token)
}

/// Number of tokens issued so far.
#[must_use]
pub fn issued_count() -> usize {
    issued().lock().unwrap_or_else(PoisonError::into_inner).len()
}

fn fresh_token(mut draw: impl FnMut() -> String) -> String {
    let mut issued = issued().lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        let candidate = draw();
        if issued.insert(candidate.clone()) {
            return candidate;
        }
        tracing::debug!(message = "token.collision", token = %candidate);
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    if let Err(err) = getrandom::fill(&mut bytes) {
        tracing::warn!(message = "token.entropy_fallback", error = %err);
        fallback_bytes(&mut bytes);
    }
    bytes
        .iter()
        .map(|b| char::from(ALPHABET[usize::from(*b) % ALPHABET.len()]))
        .collect()
}

/// Keyed hash of a counter. Only used when the OS source is unavailable.
fn fallback_bytes(out: &mut [u8]) {
    let state = FALLBACK_STATE.get_or_init(RandomState::new);
    for chunk in out.chunks_mut(8) {
        let n = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
        let word = state.hash_one(n).to_le_bytes();
        chunk.copy_from_slice(&word[..chunk.len()]);
    }
}
