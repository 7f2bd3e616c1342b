// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes for runs, tool calls, and sessions.
//!
//! Ids are plain strings on the wire (journal payloads, socket messages,
//! directory names); the newtypes keep them from being mixed up across
//! signatures. Fresh call and session ids are uuid-backed hex minted here;
//! run ids are sortable timestamps minted in `delta-journal`, next to the
//! run directory layout.

/// Define a string-backed identifier type.
///
/// Generates the surface the ids actually need: `new()`, `as_str()`,
/// `Display`, `From<String>`/`From<&str>`, and `PartialEq` against string
/// types for lookups and assertions. The inner string is private; ids are
/// read through `as_str` and never restructured.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_id! {
    /// Identifier of one execution attempt of one agent against one workspace.
    ///
    /// Run ids are monotonically sortable: a compact UTC timestamp followed by
    /// a short random suffix (`20260801T120000123_a3f9c1`). Generation lives
    /// in `delta-journal`, next to the run directory layout.
    pub struct RunId;
}

define_id! {
    /// Logical call id tying an `ACTION_REQUEST` to its eventual `ACTION_RESULT`.
    pub struct CallId;
}

define_id! {
    /// Identifier for a persistent interactive session (`sess_<hex>`).
    ///
    /// Sessions are owned by a holder process that outlives the CLI which
    /// created them; the workspace references the session by this id.
    pub struct SessionId;
}

impl CallId {
    /// Mint a fresh call id: `call_` + 8 hex chars.
    pub fn generate() -> Self {
        Self(format!("call_{}", short_hex()))
    }
}

impl SessionId {
    /// Mint a fresh session id: `sess_` + 8 hex chars.
    pub fn generate() -> Self {
        Self(format!("sess_{}", short_hex()))
    }
}

/// Eight hex chars of uuid randomness — enough to never collide within one
/// run or workspace, short enough for socket paths and file names.
fn short_hex() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    hex[..8].to_string()
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
