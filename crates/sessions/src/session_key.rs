//! Storage key derivation.
//!
//! Key template: `_session_id:<sessionId>:<subsessionId>`
//!
//! The format is the wire contract with the backing store.  Changing it
//! orphans every stored session.

/// Namespace prefix shared by every session record.
pub const KEY_PREFIX: &str = "_session_id";

/// Subsession id used when the request carries none.
pub const NO_SUBSESSION: &str = "no_subsession";

/// Glob pattern matching every key under [`KEY_PREFIX`].
pub const KEY_PATTERN: &str = "_session_id:*";

/// Compute the storage key for a (session, subsession) pair.
pub fn derive_key(session_id: &str, subsession_id: Option<&str>) -> String {
    let subsession = subsession_id.unwrap_or(NO_SUBSESSION);
    format!("{KEY_PREFIX}:{session_id}:{subsession}")
}
