//! NameString codec.
//!
//! Object paths exist in two forms. ASL text uses `\` for the root, a run of
//! `^` to climb scopes, and `.` between segments of 1 to 4 characters. AML
//! bytecode uses the same prefix characters followed by one of:
//!
//! - a single 4-byte NameSeg,
//! - `DualNamePrefix` and two NameSegs,
//! - `MultiNamePrefix`, a count byte and that many NameSegs,
//! - a lone `NullName` byte (no segments).
//!
//! The functions here parse, size, compare and convert both forms. They never
//! allocate except when producing a converted path.

use alloc::string::String;
use alloc::vec::Vec;

use crate::AmlError;

/// Root prefix (`\`).
pub const ROOT_CHAR: u8 = b'\\';
/// Parent prefix (`^`).
pub const PARENT_PREFIX_CHAR: u8 = b'^';
/// Segment separator in ASL paths.
pub const NAME_SEPARATOR: u8 = b'.';
/// AML prefix announcing exactly two NameSegs.
pub const DUAL_NAME_PREFIX: u8 = 0x2E;
/// AML prefix announcing a count byte followed by that many NameSegs.
pub const MULTI_NAME_PREFIX: u8 = 0x2F;
/// AML encoding of a path with no segments.
pub const NULL_NAME: u8 = 0x00;
/// Size of an AML NameSeg in bytes.
pub const NAME_SEG_SIZE: usize = 4;

/// Shape of a NameString: root marker, parent prefix count, segment count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameStringInfo {
    /// The path starts at the namespace root.
    pub root: bool,
    /// Number of `^` prefixes.
    pub parent_prefix: u8,
    /// Number of NameSegs.
    pub seg_count: u8,
}

impl NameStringInfo {
    /// Creates a descriptor. Use [`NameStringInfo::is_valid`] to check it.
    #[must_use]
    pub const fn new(root: bool, parent_prefix: u8, seg_count: u8) -> Self {
        Self {
            root,
            parent_prefix,
            seg_count,
        }
    }

    /// See [`is_valid_name_string`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        is_valid_name_string(self.root, self.parent_prefix, self.seg_count)
    }

    /// See [`asl_path_size`].
    #[must_use]
    pub const fn asl_size(&self) -> usize {
        asl_path_size(self.root, self.parent_prefix, self.seg_count)
    }

    /// See [`aml_path_size`].
    #[must_use]
    pub const fn aml_size(&self) -> usize {
        aml_path_size(self.root, self.parent_prefix, self.seg_count)
    }
}

/// A NameString in either of its two forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStringRef<'a> {
    /// ASL text, e.g. `\_SB.PCI0`.
    Asl(&'a str),
    /// AML bytes, e.g. `\ . _SB_ PCI0`.
    Aml(&'a [u8]),
}

/// Returns `true` if the descriptor is a legal NameString shape.
///
/// An empty descriptor is illegal, and a path cannot be both absolute and
/// relative to a parent scope.
#[must_use]
pub const fn is_valid_name_string(root: bool, parent_prefix: u8, seg_count: u8) -> bool {
    if !root && parent_prefix == 0 && seg_count == 0 {
        return false;
    }
    !(root && parent_prefix != 0)
}

/// `A-Z`, `a-z` or `_`.
#[must_use]
pub const fn is_lead_name_char(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

/// A lead name character or `0-9`.
#[must_use]
pub const fn is_name_char(ch: u8) -> bool {
    is_lead_name_char(ch) || ch.is_ascii_digit()
}

/// AML lead characters are upper-case only. Lower-case bytes are opcodes
/// (`Local0`..`Arg6` live at `0x60..=0x6E`).
#[must_use]
pub const fn is_aml_lead_name_char(ch: u8) -> bool {
    ch.is_ascii_uppercase() || ch == b'_'
}

const fn is_aml_name_char(ch: u8) -> bool {
    is_aml_lead_name_char(ch) || ch.is_ascii_digit()
}

/// Returns the length of the ASL NameSeg at the start of `buf`.
///
/// Scans at most 4 bytes. A `.`, a NUL or the end of `buf` ends the segment
/// early. Returns `None` if the segment is empty or contains a byte that is
/// not a name character.
#[must_use]
pub fn asl_name_seg_length(buf: &[u8]) -> Option<usize> {
    let mut len = 0;
    while len < NAME_SEG_SIZE {
        match buf.get(len) {
            None | Some(&NAME_SEPARATOR | &0) => break,
            Some(&ch) => {
                let ok = if len == 0 {
                    is_lead_name_char(ch)
                } else {
                    is_name_char(ch)
                };
                if !ok {
                    return None;
                }
            }
        }
        len += 1;
    }
    (len != 0).then_some(len)
}

/// Returns `true` if `buf` starts with a full 4-byte AML NameSeg.
#[must_use]
pub fn aml_is_name_seg(buf: &[u8]) -> bool {
    match buf.get(..NAME_SEG_SIZE) {
        Some(seg) => is_aml_lead_name_char(seg[0]) && seg[1..].iter().all(|&c| is_aml_name_char(c)),
        None => false,
    }
}

/// Size of an ASL path with this shape, including the NUL terminator.
///
/// Segments are counted at their full 4 characters, so this is exact for
/// paths produced by [`aml_to_asl`] and an upper bound otherwise.
#[must_use]
pub const fn asl_path_size(root: bool, parent_prefix: u8, seg_count: u8) -> usize {
    let segs = seg_count as usize;
    let separators = segs.saturating_sub(1);
    root as usize + parent_prefix as usize + NAME_SEG_SIZE * segs + separators + 1
}

/// Size in bytes of an AML NameString with this shape.
#[must_use]
pub const fn aml_path_size(root: bool, parent_prefix: u8, seg_count: u8) -> usize {
    let segs = seg_count as usize;
    let body = if segs == 0 { 1 } else { NAME_SEG_SIZE * segs };
    let prefix = if segs > 2 {
        2
    } else if segs == 2 {
        1
    } else {
        0
    };
    root as usize + parent_prefix as usize + body + prefix
}

/// Consumes the root or parent prefix characters at the start of `buf`.
///
/// Returns the partially filled descriptor and the index of the first byte
/// after the prefix.
fn parse_prefix(buf: &[u8]) -> Result<(NameStringInfo, usize), AmlError> {
    let mut info = NameStringInfo::default();
    let mut pos = 0;
    if buf.first() == Some(&ROOT_CHAR) {
        info.root = true;
        pos = 1;
    } else {
        while buf.get(pos) == Some(&PARENT_PREFIX_CHAR) {
            info.parent_prefix = info
                .parent_prefix
                .checked_add(1)
                .ok_or(AmlError::InvalidArgument)?;
            pos += 1;
        }
    }
    Ok((info, pos))
}

fn at_asl_end(buf: &[u8], pos: usize) -> bool {
    matches!(buf.get(pos), None | Some(&0))
}

/// Parses the shape of an ASL NameString.
///
/// # Errors
///
/// Returns [`AmlError::InvalidArgument`] on a malformed segment, trailing
/// characters, or an invalid resulting descriptor.
pub fn parse_asl_name_string_info(asl: &str) -> Result<NameStringInfo, AmlError> {
    let buf = asl.as_bytes();
    let (mut info, mut pos) = parse_prefix(buf)?;

    if !at_asl_end(buf, pos) {
        loop {
            let rest = buf.get(pos..).unwrap_or(&[]);
            let len = asl_name_seg_length(rest).ok_or(AmlError::InvalidArgument)?;
            pos += len;
            info.seg_count = info
                .seg_count
                .checked_add(1)
                .ok_or(AmlError::InvalidArgument)?;
            match buf.get(pos) {
                None | Some(&0) => break,
                Some(&NAME_SEPARATOR) => pos += 1,
                Some(_) => return Err(AmlError::InvalidArgument),
            }
        }
    }

    if !info.is_valid() {
        return Err(AmlError::InvalidArgument);
    }
    Ok(info)
}

/// Parses the shape of an AML NameString.
///
/// Only the bytes of the name itself are examined; anything after it is
/// ignored, so `aml` may be a slice into a larger bytestream.
///
/// # Errors
///
/// Returns [`AmlError::InvalidArgument`] if the bytes after the prefix are not
/// a NullName, a valid NameSeg, or a well-formed dual/multi-name path.
pub fn parse_aml_name_string_info(aml: &[u8]) -> Result<NameStringInfo, AmlError> {
    let (mut info, pos) = parse_prefix(aml)?;

    let (seg_count, segs_start) = match aml.get(pos) {
        Some(&NULL_NAME) => (0, pos + 1),
        Some(&DUAL_NAME_PREFIX) => (2, pos + 1),
        Some(&MULTI_NAME_PREFIX) => {
            let count = *aml.get(pos + 1).ok_or(AmlError::InvalidArgument)?;
            if count < 3 {
                return Err(AmlError::InvalidArgument);
            }
            (count, pos + 2)
        }
        Some(_) => (1, pos),
        None => return Err(AmlError::InvalidArgument),
    };

    for i in 0..usize::from(seg_count) {
        let start = segs_start + i * NAME_SEG_SIZE;
        if !aml_is_name_seg(aml.get(start..).unwrap_or(&[])) {
            return Err(AmlError::InvalidArgument);
        }
    }

    info.seg_count = seg_count;
    if !info.is_valid() {
        return Err(AmlError::InvalidArgument);
    }
    Ok(info)
}

/// Returns the number of bytes the AML NameString at the start of `aml`
/// occupies.
///
/// # Errors
///
/// Same as [`parse_aml_name_string_info`].
pub fn aml_name_string_size(aml: &[u8]) -> Result<usize, AmlError> {
    parse_aml_name_string_info(aml).map(|info| info.aml_size())
}

/// Converts an ASL path to its AML encoding.
///
/// Segments are upper-cased and right-padded with `_` to 4 bytes.
///
/// # Errors
///
/// Returns [`AmlError::InvalidArgument`] if `asl` is malformed or if the
/// conversion does not consume the input to exactly the computed size, and
/// [`AmlError::OutOfMemory`] if the output cannot be allocated.
pub fn asl_to_aml(asl: &str) -> Result<Vec<u8>, AmlError> {
    let info = parse_asl_name_string_info(asl)?;
    let size = info.aml_size();
    let buf = asl.as_bytes();

    let mut out = Vec::new();
    out.try_reserve_exact(size)?;

    let mut pos = 0;
    if info.root {
        out.push(ROOT_CHAR);
        pos += 1;
    }
    for _ in 0..info.parent_prefix {
        out.push(PARENT_PREFIX_CHAR);
        pos += 1;
    }

    match info.seg_count {
        0 => out.push(NULL_NAME),
        1 => {}
        2 => out.push(DUAL_NAME_PREFIX),
        n => {
            out.push(MULTI_NAME_PREFIX);
            out.push(n);
        }
    }

    for i in 0..info.seg_count {
        if i > 0 {
            if buf.get(pos) != Some(&NAME_SEPARATOR) {
                return Err(AmlError::InvalidArgument);
            }
            pos += 1;
        }
        let rest = buf.get(pos..).unwrap_or(&[]);
        let len = asl_name_seg_length(rest).ok_or(AmlError::InvalidArgument)?;
        for j in 0..NAME_SEG_SIZE {
            out.push(if j < len { rest[j].to_ascii_uppercase() } else { b'_' });
        }
        pos += len;
    }

    if out.len() != size || !at_asl_end(buf, pos) {
        return Err(AmlError::InvalidArgument);
    }
    Ok(out)
}

fn aml_to_asl_inner(aml: &[u8], trim_padding: bool) -> Result<String, AmlError> {
    let info = parse_aml_name_string_info(aml)?;

    let mut out = String::new();
    out.try_reserve_exact(info.asl_size())?;

    if info.root {
        out.push('\\');
    }
    for _ in 0..info.parent_prefix {
        out.push('^');
    }

    let segs = first_name_seg(aml, info.root, info.parent_prefix);
    for (i, seg) in segs
        .chunks_exact(NAME_SEG_SIZE)
        .take(usize::from(info.seg_count))
        .enumerate()
    {
        if i > 0 {
            out.push('.');
        }
        let seg = if trim_padding { trim_name_seg(seg) } else { seg };
        out.extend(seg.iter().map(|&b| char::from(b)));
    }

    if out.len() + 1 > info.asl_size() {
        return Err(AmlError::InvalidArgument);
    }
    Ok(out)
}

/// Converts an AML NameString to ASL text.
///
/// Each NameSeg is copied verbatim, padding included, and segments are joined
/// with `.`. The result has no NUL terminator, so its length plus one equals
/// [`asl_path_size`] for the same shape.
///
/// # Errors
///
/// Returns [`AmlError::InvalidArgument`] if `aml` is not a valid NameString.
pub fn aml_to_asl(aml: &[u8]) -> Result<String, AmlError> {
    aml_to_asl_inner(aml, false)
}

/// Like [`aml_to_asl`], but strips trailing `_` padding from every segment
/// (`DEV_` becomes `DEV`, `____` becomes `_`).
///
/// # Errors
///
/// Returns [`AmlError::InvalidArgument`] if `aml` is not a valid NameString.
pub fn aml_to_asl_compact(aml: &[u8]) -> Result<String, AmlError> {
    aml_to_asl_inner(aml, true)
}

/// Strips trailing `_` padding from a NameSeg, keeping at least one byte.
#[must_use]
pub fn trim_name_seg(seg: &[u8]) -> &[u8] {
    let mut end = seg.len();
    while end > 1 && seg[end - 1] == b'_' {
        end -= 1;
    }
    &seg[..end]
}

/// Returns the slice of `aml` starting at its first NameSeg.
///
/// Skips the root or parent prefix bytes and, if present, the dual-name
/// prefix (1 byte) or multi-name prefix and count (2 bytes).
#[must_use]
pub fn first_name_seg(aml: &[u8], root: bool, parent_prefix: u8) -> &[u8] {
    let mut pos = root as usize + parent_prefix as usize;
    match aml.get(pos) {
        Some(&DUAL_NAME_PREFIX) => pos += 1,
        Some(&MULTI_NAME_PREFIX) => pos += 2,
        _ => {}
    }
    aml.get(pos..).unwrap_or(&[])
}

fn asl_bytes(asl: &str) -> &[u8] {
    let buf = asl.as_bytes();
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}

/// Compares two NameStrings.
///
/// Two strings of the same form are equal only if they have the same length
/// and identical bytes; ASL segments are not case-folded. For mixed forms the
/// ASL operand is first converted to AML (upper-casing and padding short
/// segments), then compared exactly.
///
/// # Errors
///
/// Returns [`AmlError::InvalidArgument`] if either operand is malformed.
pub fn compare_name_strings(a: NameStringRef<'_>, b: NameStringRef<'_>) -> Result<bool, AmlError> {
    match (a, b) {
        (NameStringRef::Asl(x), NameStringRef::Asl(y)) => {
            parse_asl_name_string_info(x)?;
            parse_asl_name_string_info(y)?;
            Ok(asl_bytes(x) == asl_bytes(y))
        }
        (NameStringRef::Aml(x), NameStringRef::Aml(y)) => {
            let x_len = aml_name_string_size(x)?;
            let y_len = aml_name_string_size(y)?;
            Ok(x_len == y_len && x[..x_len] == y[..y_len])
        }
        (NameStringRef::Asl(asl), NameStringRef::Aml(aml))
        | (NameStringRef::Aml(aml), NameStringRef::Asl(asl)) => {
            let converted = asl_to_aml(asl)?;
            let aml_len = aml_name_string_size(aml)?;
            Ok(converted[..] == aml[..aml_len])
        }
    }
}
