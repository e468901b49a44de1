// SPDX-License-Identifier: MIT

//! Thin newtypes over `String` for the two identifier spaces in the data
//! model: conversation threads and supervised backend names. Grounded in the
//! teacher's `IdBuf`/`AgentId` newtype pattern — `Display`, `Hash`, and
//! `Borrow<str>` so callers can look values up in a `HashMap` by `&str`
//! without allocating.

use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[derive(serde::Serialize, serde::Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(ThreadId, "Opaque key for one conversation's agent thread (§3 Agent thread state).");
string_id!(BackendName, "Unique name for a supervised backend process (§3 Backend descriptor).");

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn looks_up_by_borrowed_str() {
        let mut map: HashMap<ThreadId, u32> = HashMap::new();
        map.insert(ThreadId::new("conv-1"), 42);
        assert_eq!(map.get("conv-1"), Some(&42));
    }

    #[test]
    fn display_round_trips() {
        let id = BackendName::new("css");
        assert_eq!(id.to_string(), "css");
        assert_eq!(id.as_str(), "css");
    }
}
