//! Name-Derived UUIDs
//!
//! Every record kind and the stream itself are identified by a UUID that is
//! derived from a human-readable name, so independent implementations agree
//! on identifiers without a shared registry.

use uuid::Uuid;

/// Namespace all Teeworlds/DDNet name-based UUIDs are derived in.
pub const TEEWORLDS_NAMESPACE: Uuid = Uuid::from_bytes([
    0xe0, 0x5d, 0xda, 0xaa, 0xc4, 0xe6, 0x4c, 0xfb, 0xb6, 0x42, 0x5d, 0x48, 0xe8, 0x0c, 0x00, 0x29,
]);

/// Derive the stable identifier for `name`.
///
/// MD5 over namespace and name with version/variant bits set (RFC 4122
/// version 3).
pub fn calculate_uuid(name: &str) -> Uuid {
    Uuid::new_v3(&TEEWORLDS_NAMESPACE, name.as_bytes())
}

/// Names registered for dynamic message/extension ids during a session.
///
/// Registration order is significant: the header lists names in the order
/// they were registered, and readers map ids by that position.
#[derive(Clone, Debug, Default)]
pub struct UuidRegistry {
    entries: Vec<(String, Uuid)>,
}

impl UuidRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, returning its derived UUID.
    ///
    /// Registering the same name twice keeps the first position.
    pub fn register(&mut self, name: &str) -> Uuid {
        let uuid = calculate_uuid(name);
        if !self.entries.iter().any(|(existing, _)| existing == name) {
            self.entries.push((name.to_string(), uuid));
        }
        uuid
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Look up the UUID of a registered name.
    pub fn lookup(&self, name: &str) -> Option<Uuid> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, uuid)| *uuid)
    }
}
