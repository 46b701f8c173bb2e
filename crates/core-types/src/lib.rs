//! Identifier newtypes shared by every layer of the interaction runtime.
//!
//! Session and observation ids are opaque random strings. Action ids are short, ordinal and
//! only meaningful together with the observation that minted them.

use std::fmt;

use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde-full", serde(transparent))]
        #[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifies one open browser session in a session store.
    SessionId
);
string_id!(
    /// Identifies one observe call; superseded by the next observe on the same session.
    ObservationId
);
string_id!(
    /// Page-ordinal handle (`a_1`, `a_2`, ...) scoped to a single observation.
    ActionId
);
string_id!(FrameId);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservationId {
    pub fn new() -> Self {
        Self(format!("obs_{}", Uuid::new_v4().simple()))
    }
}

impl Default for ObservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionId {
    /// Builds the action id for a 1-based position in a page.
    pub fn ordinal(position: usize) -> Self {
        Self(format!("a_{position}"))
    }
}
