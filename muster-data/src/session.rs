//! The authenticated session the facade acts on behalf of.

use muster_crypto::DerivedKey;
use muster_types::{Role, Section};

/// Identity, role, section grants and cache key for the signed-in user.
/// Produced by the authentication collaborator once per login; the facade
/// stamps every audit entry with `email` from here, never from caller input.
#[derive(Clone)]
pub struct Session {
    pub email: String,
    pub role: Role,
    pub sections: Vec<Section>,
    pub key: DerivedKey,
}

impl Session {
    pub fn new(
        email: impl Into<String>,
        role: Role,
        sections: Vec<Section>,
        key: DerivedKey,
    ) -> Self {
        Self {
            email: email.into(),
            role,
            sections,
            key,
        }
    }

    /// Whether the session may act on the given section. Admins hold every
    /// grant.
    pub fn grants(&self, section: Section) -> bool {
        self.role == Role::Admin || self.sections.contains(&section)
    }
}
