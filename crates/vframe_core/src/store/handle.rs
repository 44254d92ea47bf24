//! # Handles
//!
//! A handle is an opaque `u64`:
//! - Lower 32 bits: slot index inside the object buffer
//! - Bits 32..56: generation of the slot when the object was created
//! - Upper 8 bits: object kind tag
//!
//! The zero value is the null handle. Generations start at 1 and kinds start
//! at 1, so no live object ever encodes to zero.

use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Largest generation a slot may reach. A slot at this generation is retired
/// once destroyed, so a handle value is never issued twice.
pub const MAX_GENERATION: u32 = (1 << 24) - 1;

/// Object kind encoded in a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectKind {
    /// Position / rotation / scale node.
    Transform = 1,
    /// Axis-aligned collision rectangle.
    Bound = 2,
    /// Visual-only object.
    Particle = 3,
    /// Physics-enabled composite object.
    Entity = 4,
}

impl ObjectKind {
    /// Every kind, in tag order.
    pub const ALL: [Self; 4] = [Self::Transform, Self::Bound, Self::Particle, Self::Entity];

    /// Decodes a tag.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Transform),
            2 => Some(Self::Bound),
            3 => Some(Self::Particle),
            4 => Some(Self::Entity),
            _ => None,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Transform => "transform",
            Self::Bound => "bound",
            Self::Particle => "particle",
            Self::Entity => "entity",
        }
    }
}

/// Opaque, stable identifier of a stored object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[repr(transparent)]
pub struct Handle(u64);

impl Handle {
    /// Null/invalid handle.
    pub const NULL: Self = Self(0);

    /// Packs kind, slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(kind: ObjectKind, index: u32, generation: u32) -> Self {
        Self(
            ((kind as u64) << 56)
                | (((generation & MAX_GENERATION) as u64) << 32)
                | index as u64,
        )
    }

    /// Rebuilds a handle from its raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value, suitable for storing outside the scene.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        ((self.0 >> 32) as u32) & MAX_GENERATION
    }

    /// Kind tag, or `None` for null and malformed handles.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> Option<ObjectKind> {
        ObjectKind::from_tag((self.0 >> 56) as u8)
    }

    /// Checks if this handle is null.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// `None` for the null handle.
    #[inline]
    #[must_use]
    pub const fn non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<Option<Handle>> for Handle {
    fn from(handle: Option<Handle>) -> Self {
        handle.unwrap_or(Self::NULL)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{}#{}v{}", kind.name(), self.index(), self.generation()),
            None if self.is_null() => f.write_str("null"),
            None => write!(f, "invalid({:#x})", self.0),
        }
    }
}
