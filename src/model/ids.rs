//! Stable identifiers for objects that other objects refer to.
//!
//! Cross references in the object graph (bookmark targets, reply chains,
//! widget placements, layer membership) are ids looked up in the owning
//! collection, never owning pointers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a page.
    PageId
);
define_id!(
    /// Identity of an annotation.
    AnnotationId
);
define_id!(
    /// Identity of an optional content layer.
    LayerId
);
define_id!(
    /// Identity of a structure element; content segments sharing a key
    /// belong to the same element.
    TagKey
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(PageId::new(), PageId::new());
        let id = AnnotationId::new();
        let copy = id;
        assert_eq!(id, copy);
        assert_eq!(id.to_string().len(), 36);
    }
}
