//! Type-safe identifier wrappers.
//!
//! Graph entities (nodes, trees, owners) use [`Uuid`] newtypes so that a node
//! id can never be passed where an owner id is expected. Resource pools and
//! gameplay attributes are designer-facing names and use string newtypes.
//!
//! Node ids are normally generated with UUID v7. When a tree is authored from
//! a definition file, [`NodeId::from_key`] derives a stable UUID v5 from the
//! designer key so that save data keeps matching across reloads.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Generates a newtype wrapper around a designer-facing [`String`] key.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Create a key from anything string-like.
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Borrow the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(String::from(key))
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a node in a skill tree.
    NodeId
}

define_id! {
    /// Unique identifier for a skill tree definition.
    TreeId
}

define_id! {
    /// Identity of the actor (character) that owns a tree instance.
    OwnerId
}

define_key! {
    /// Name of a resource pool, e.g. `"SkillPoint"`.
    PoolId
}

define_key! {
    /// Name of a live gameplay attribute, e.g. `"Strength"`.
    AttributeId
}

impl NodeId {
    /// Derive a stable node id from a designer key (UUID v5, OID namespace).
    ///
    /// The same key always yields the same id, which keeps save data valid
    /// when a tree is rebuilt from its definition file.
    pub fn from_key(key: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
    }
}

impl TreeId {
    /// Derive a stable tree id from a designer key (UUID v5, OID namespace).
    pub fn from_key(key: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
    }
}

impl OwnerId {
    /// Derive a stable owner id from a name, e.g. a character slot.
    pub fn from_key(key: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()))
    }
}
