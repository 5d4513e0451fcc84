//! The disclosure boundary.
//!
//! Values computed from witness secrets start out as [`Private`]. The ledger
//! only accepts plain values, and the functions in this module are the only
//! way to turn one into the other. Every place a secret-derived value becomes
//! ledger-visible therefore passes through here.

use crate::id::HashKey;
use log::trace;
use std::fmt;

/// A value derived from witness secrets that has not been disclosed yet.
///
/// Has no public accessor and is neither comparable nor serializable.
#[derive(Clone)]
pub struct Private<T>(T);

impl<T> Private<T> {
    pub fn new(value: T) -> Self {
        Private(value)
    }
}

impl<T> fmt::Debug for Private<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Private(<undisclosed>)")
    }
}

/// Disclose a derived owner, recipient or approved-party key
pub fn hash_key(value: &Private<HashKey>) -> HashKey {
    trace!("disclosing hash key {}", value.0);
    value.0
}

/// Disclose a combined owner/operator key used for the operator-approval set
pub fn operator_key(value: &Private<HashKey>) -> HashKey {
    trace!("disclosing operator key {}", value.0);
    value.0
}

/// Disclose the approval flag chosen by a caller for an operator
pub fn approval_flag(value: Private<bool>) -> bool {
    trace!("disclosing approval flag {}", value.0);
    value.0
}
