//! Opaque identifier newtypes for the program supervisor.
//!
//! The inner `String` of each identifier is private so that all
//! construction goes through the constructors below, which enforce the
//! formats spec'd for the supervisor: `ProgramId` is
//! `"{user}-{build}-{uuid}"`, `BuildId` is `"build-{sha256[:12]}"`.

use std::fmt;

use sha2::{Digest, Sha256};

/// Opaque user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    /// Wrap an existing user identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Build identifier, `"build-{sha256[:12]}"` over the build's source
/// digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildId(String);

impl BuildId {
    /// Derive a `BuildId` from arbitrary build-input bytes (e.g. a
    /// tarball of the source tree plus the Dockerfile contents).
    #[must_use]
    pub fn from_digest_input(input: &[u8]) -> Self {
        let digest = Sha256::digest(input);
        let hex_digest = hex::encode(digest);
        Self(format!("build-{}", &hex_digest[..12]))
    }

    /// Wrap an already-formatted build id (used when deserializing or in
    /// tests).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Program identifier, `"{user}-{build}-{uuid}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramId(String);

impl ProgramId {
    /// Mint a fresh `ProgramId` for a given user and build.
    #[must_use]
    pub fn generate(user: &UserId, build: &BuildId) -> Self {
        Self(format!("{user}-{build}-{}", uuid::Uuid::new_v4()))
    }

    /// Wrap an already-formatted program id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split `"{user}-{build}-{uuid}"` back into its three segments, for
    /// diagnostics. The trailing `uuid` segment is itself hyphenated
    /// (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`), so this cannot split on
    /// the last `-`; instead it relies on `BuildId`'s fixed
    /// `"build-{12 hex chars}"` shape to find the boundary between the
    /// build hash and the uuid.
    #[must_use]
    pub fn parse(&self) -> Option<(&str, &str, &str)> {
        let rest = self.0.splitn(2, '-').collect::<Vec<_>>();
        let user = *rest.first()?;
        let after_user = rest.get(1)?;
        let build_start = after_user.find("build-")?;
        let build_and_uuid = &after_user[build_start..];
        let mut parts = build_and_uuid.splitn(2, '-');
        let _build_prefix = parts.next()?;
        let remainder = parts.next()?;

        const BUILD_HASH_LEN: usize = 12;
        if remainder.len() < BUILD_HASH_LEN + 1 {
            return None;
        }
        let (build_hash, rest_with_sep) = remainder.split_at(BUILD_HASH_LEN);
        let uuid_part = rest_with_sep.strip_prefix('-')?;
        Some((user, build_hash, uuid_part))
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_id_from_digest_is_twelve_hex_chars_after_prefix() {
        let id = BuildId::from_digest_input(b"dockerfile contents");
        assert!(id.as_str().starts_with("build-"));
        assert_eq!(id.as_str().len(), "build-".len() + 12);
    }

    #[test]
    fn build_id_is_deterministic() {
        let a = BuildId::from_digest_input(b"same input");
        let b = BuildId::from_digest_input(b"same input");
        assert_eq!(a, b);
    }

    #[test]
    fn program_id_generate_embeds_user_and_build() {
        let user = UserId::new("alice");
        let build = BuildId::from_digest_input(b"x");
        let program = ProgramId::generate(&user, &build);
        assert!(program.as_str().starts_with("alice-build-"));
    }

    #[test]
    fn program_id_round_trips_through_display() {
        let program = ProgramId::new("alice-build-abc123abc123-uuid-goes-here");
        assert_eq!(format!("{program}"), "alice-build-abc123abc123-uuid-goes-here");
    }

    #[test]
    fn program_id_parse_recovers_segments_from_a_generated_id() {
        let user = UserId::new("alice");
        let build = BuildId::from_digest_input(b"x");
        let program = ProgramId::generate(&user, &build);

        let (parsed_user, parsed_build_hash, parsed_uuid) = program.parse().unwrap();
        assert_eq!(parsed_user, "alice");
        assert_eq!(build.as_str(), format!("build-{parsed_build_hash}"));
        assert_eq!(parsed_uuid.len(), 36);
        assert_eq!(parsed_uuid.matches('-').count(), 4);
    }
}
