//! Stable identifiers for generated build descriptions
//!
//! Backends that emit IDE solutions need a GUID per project and per group.
//! They are derived from names so regenerating the same workspace yields the
//! same identifiers.

use sha2::{Digest, Sha256};

/// GUID-formatted digest of `namespace:key`
pub fn stable_guid(namespace: &str, key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(key.as_bytes());
    let hex: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect();

    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Identifier of a project node
pub fn project_guid(name: &str) -> String {
    stable_guid("project", name)
}

/// Identifier of a group, keyed by its full path
pub fn group_guid(path: &str) -> String {
    stable_guid("group", path)
}
