//! AML name segments and absolute paths.
//!
//! ACPI names are composed of 4-byte segments. An [`AmlPath`] is a resolved,
//! absolute chain of segments, as produced when walking a tree upward from a
//! namespace node.

use alloc::vec::Vec;

use crate::AmlError;
use crate::namestring::{self, NAME_SEG_SIZE};

/// A 4-byte AML name segment (e.g., `_SB_`, `PCI0`, `_HID`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameSeg(pub [u8; 4]);

impl NameSeg {
    /// Create a `NameSeg` from the first 4 bytes of a slice.
    ///
    /// Returns `None` if the slice is shorter than 4 bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let seg: [u8; 4] = bytes.get(..NAME_SEG_SIZE)?.try_into().ok()?;
        Some(Self(seg))
    }

    /// Build a segment from a 1-4 character ASL name, upper-casing it and
    /// padding it with `_`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `name` is not a single valid
    /// ASL NameSeg.
    pub fn from_asl(name: &str) -> Result<Self, AmlError> {
        let bytes = name.as_bytes();
        let len = namestring::asl_name_seg_length(bytes).ok_or(AmlError::InvalidArgument)?;
        if len != bytes.len() {
            return Err(AmlError::InvalidArgument);
        }
        let mut seg = [b'_'; 4];
        for (dst, src) in seg.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        Ok(Self(seg))
    }

    /// Returns `true` if this is a well-formed AML NameSeg.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        namestring::aml_is_name_seg(&self.0)
    }

    /// Returns the name as a UTF-8 string (ACPI names are always ASCII).
    #[must_use]
    pub fn as_str(&self) -> &str {
        // ACPI names are ASCII; fallback to empty on invalid UTF-8 (shouldn't happen).
        core::str::from_utf8(&self.0).unwrap_or("")
    }
}

impl core::fmt::Debug for NameSeg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NameSeg(\"{}\")", self.as_str())
    }
}

impl core::fmt::Display for NameSeg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An absolute AML namespace path.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AmlPath {
    segments: Vec<NameSeg>,
}

impl AmlPath {
    /// Creates the root path (`\`).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Appends a name segment to the path.
    pub fn push(&mut self, seg: NameSeg) {
        self.segments.push(seg);
    }

    /// Removes and returns the last name segment from the path.
    pub fn pop(&mut self) -> Option<NameSeg> {
        self.segments.pop()
    }

    /// Resets the path to the root.
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Applies an AML NameString relative to this path.
    ///
    /// A root prefix restarts from `\`, each parent prefix drops one
    /// segment, then the name's segments are appended.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `aml` is malformed or climbs
    /// above the root.
    pub fn apply(&mut self, aml: &[u8]) -> Result<(), AmlError> {
        let info = namestring::parse_aml_name_string_info(aml)?;
        if info.root {
            self.clear();
        }
        for _ in 0..info.parent_prefix {
            self.pop().ok_or(AmlError::InvalidArgument)?;
        }
        let segs = namestring::first_name_seg(aml, info.root, info.parent_prefix);
        for chunk in segs.chunks_exact(NAME_SEG_SIZE).take(usize::from(info.seg_count)) {
            self.push(NameSeg::from_bytes(chunk).ok_or(AmlError::InvalidArgument)?);
        }
        Ok(())
    }

    /// Returns the segments of this path.
    #[must_use]
    pub fn segments(&self) -> &[NameSeg] {
        &self.segments
    }

    /// Returns the number of segments (depth) in this path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl core::fmt::Debug for AmlPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AmlPath({self})")
    }
}

impl core::fmt::Display for AmlPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "\\")?;
        for (i, seg) in self.segments().iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}
