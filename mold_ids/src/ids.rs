//! Type-safe generational identifiers for the node arena.
//! u64 = index (low 32 bits) | generation (high 32 bits). Index 0 = nil.
//! Slot reuse bumps the generation, so an id held across a removal stops resolving.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines a generational ID type. All such IDs use index + generation for safe slot reuse.
macro_rules! define_generational_id {
    ($type_name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $type_name(pub u64);

        impl $type_name {
            #[inline]
            pub const fn nil() -> Self {
                Self(0)
            }

            #[inline]
            pub const fn index(self) -> u32 {
                (self.0 & 0xFFFF_FFFF) as u32
            }

            #[inline]
            pub const fn generation(self) -> u32 {
                (self.0 >> 32) as u32
            }

            #[inline]
            pub const fn from_parts(index: u32, generation: u32) -> Self {
                Self((index as u64) | ((generation as u64) << 32))
            }

            #[inline]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            #[inline]
            pub const fn from_u64(value: u64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn is_nil(self) -> bool {
                self.0 == 0
            }
        }

        impl Default for $type_name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Debug for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    concat!(stringify!($type_name), "({}:{})"),
                    self.index(),
                    self.generation()
                )
            }
        }

        impl fmt::Display for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", self.index(), self.generation())
            }
        }
    };
}

define_generational_id!(
    NodeID,
    "Node ID allocated by NodeArena: index plus generation."
);

impl NodeID {
    /// Parse `index:generation` (the Display form) or a bare index with generation 0.
    pub fn parse_str(s: &str) -> Result<Self, String> {
        let s = s.trim();
        match s.split_once(':') {
            Some((index, generation)) => {
                let index = index
                    .parse::<u32>()
                    .map_err(|e| format!("Invalid NodeID index `{index}`: {e}"))?;
                let generation = generation
                    .parse::<u32>()
                    .map_err(|e| format!("Invalid NodeID generation `{generation}`: {e}"))?;
                Ok(Self::from_parts(index, generation))
            }
            None => s
                .parse::<u32>()
                .map(|index| Self::from_parts(index, 0))
                .map_err(|e| format!("Invalid NodeID string `{s}`: {e}")),
        }
    }
}

/// One per mutation batch, handed out in increasing order by the engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionID(pub u64);

impl TransactionID {
    pub const fn first() -> Self {
        Self(1)
    }

    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for TransactionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}
