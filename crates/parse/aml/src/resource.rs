//! ACPI resource descriptors.
//!
//! Resource templates (the byte lists of `_CRS`, `_PRS` and similar buffers)
//! are sequences of small (1-byte tag) and large (3-byte tag) descriptors
//! ending with an End Tag, as defined in ACPI 6.5 §6.4. The tree stores each
//! descriptor as its own resource data node; this module frames, identifies,
//! decodes and encodes them.

use alloc::vec::Vec;

use crate::AmlError;

/// End Tag descriptor byte (small type 0x0F, length 1).
pub const END_TAG_BYTE: u8 = 0x79;

/// Identifier of a resource descriptor type.
///
/// For small descriptors this is the tag byte with the length bits cleared;
/// for large descriptors it is the tag byte itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceDescriptorId(pub u8);

impl ResourceDescriptorId {
    /// Small IRQ descriptor.
    pub const IRQ: Self = Self(0x20);
    /// Small DMA descriptor.
    pub const DMA: Self = Self(0x28);
    /// Small I/O port descriptor.
    pub const IO: Self = Self(0x40);
    /// Small fixed I/O port descriptor.
    pub const FIXED_IO: Self = Self(0x48);
    /// Small vendor-defined descriptor.
    pub const VENDOR_SMALL: Self = Self(0x70);
    /// End Tag.
    pub const END_TAG: Self = Self(0x78);
    /// Large 24-bit memory range descriptor.
    pub const MEMORY24: Self = Self(0x81);
    /// Large generic register descriptor.
    pub const GENERIC_REGISTER: Self = Self(0x82);
    /// Large 32-bit memory range descriptor.
    pub const MEMORY32: Self = Self(0x85);
    /// Large 32-bit fixed memory range descriptor.
    pub const FIXED_MEMORY32: Self = Self(0x86);
    /// Large DWord address space descriptor.
    pub const DWORD_ADDRESS: Self = Self(0x87);
    /// Large Word address space descriptor.
    pub const WORD_ADDRESS: Self = Self(0x88);
    /// Large extended interrupt descriptor.
    pub const EXTENDED_IRQ: Self = Self(0x89);
    /// Large QWord address space descriptor.
    pub const QWORD_ADDRESS: Self = Self(0x8A);

    /// Derives the identifier from a descriptor's first byte.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Self {
        if tag & 0x80 != 0 { Self(tag) } else { Self(tag & 0x78) }
    }

    /// `true` for large descriptors.
    #[must_use]
    pub const fn is_large(self) -> bool {
        self.0 & 0x80 != 0
    }
}

/// Returns the total size of the descriptor at the start of `data`, header
/// included, if `data` holds all of it.
#[must_use]
pub fn descriptor_size(data: &[u8]) -> Option<usize> {
    let tag = *data.first()?;
    let size = if tag & 0x80 != 0 {
        let len = u16::from_le_bytes([*data.get(1)?, *data.get(2)?]);
        3 + usize::from(len)
    } else {
        1 + usize::from(tag & 0x07)
    };
    (size <= data.len()).then_some(size)
}

/// Checks that `data` is exactly one descriptor and returns its identifier.
///
/// # Errors
///
/// Returns [`AmlError::InvalidArgument`] if `data` is empty, truncated, or
/// longer than the descriptor its header announces.
pub fn validate_descriptor(data: &[u8]) -> Result<ResourceDescriptorId, AmlError> {
    match descriptor_size(data) {
        Some(size) if size == data.len() => Ok(ResourceDescriptorId::from_tag(data[0])),
        _ => Err(AmlError::InvalidArgument),
    }
}

/// Splits a byte list into its descriptors if it is a well-formed resource
/// template: descriptors tile the list exactly and the last one, and only the
/// last one, is an End Tag.
#[must_use]
pub fn frame_template(data: &[u8]) -> Option<Vec<&[u8]>> {
    let mut items = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let size = descriptor_size(rest)?;
        let (item, tail) = rest.split_at(size);
        let is_end = ResourceDescriptorId::from_tag(item[0]) == ResourceDescriptorId::END_TAG;
        if is_end != tail.is_empty() {
            return None;
        }
        if is_end && item.len() != 2 {
            return None;
        }
        items.push(item);
        rest = tail;
    }
    (!items.is_empty()).then_some(items)
}

/// A decoded ACPI resource descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcpiResource {
    /// I/O port range (small resource tag 0x47).
    Io {
        /// Base I/O port address.
        base: u16,
        /// Number of ports.
        length: u16,
    },
    /// Fixed I/O port range (small resource tag 0x4B).
    FixedIo {
        /// Base I/O port address.
        base: u16,
        /// Number of ports.
        length: u8,
    },
    /// Interrupt line from small IRQ descriptor (tags 0x22/0x23).
    Irq {
        /// IRQ number (0-15).
        irq: u8,
        /// Whether the interrupt is edge-triggered (vs level-triggered).
        edge_triggered: bool,
        /// Whether the interrupt is active-low (vs active-high).
        active_low: bool,
    },
    /// 32-bit memory range (large resource tag 0x85).
    Memory32 {
        /// Base physical address.
        base: u32,
        /// Length in bytes.
        length: u32,
        /// Whether the region is writable.
        writable: bool,
    },
    /// 32-bit fixed memory range (large resource tag 0x86).
    FixedMemory32 {
        /// Base physical address.
        base: u32,
        /// Length in bytes.
        length: u32,
        /// Whether the region is writable.
        writable: bool,
    },
    /// 64-bit memory region from QWord address space (large resource tag 0x8A).
    Memory64 {
        /// Base physical address.
        base: u64,
        /// Length in bytes.
        length: u64,
        /// Whether the region is writable.
        writable: bool,
    },
    /// Extended IRQ descriptor (large resource tag 0x89).
    ExtendedIrq {
        /// Global System Interrupt number.
        gsi: u32,
        /// Whether the interrupt is edge-triggered.
        edge_triggered: bool,
        /// Whether the interrupt is active-low.
        active_low: bool,
    },
    /// DMA channel (small resource tag 0x2A).
    Dma {
        /// DMA channel number (0-7).
        channel: u8,
        /// Whether the channel supports bus mastering.
        bus_master: bool,
    },
}

/// Little-endian reader over one descriptor's body.
struct BodyReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BodyReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn u8(&mut self) -> Option<u8> {
        let v = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    fn u16(&mut self) -> Option<u16> {
        let b = self.data.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Option<u32> {
        let b = self.data.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Option<u64> {
        let b = self.data.get(self.pos..self.pos + 8)?;
        self.pos += 8;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Some(u64::from_le_bytes(raw))
    }
}

fn decode_small(id: ResourceDescriptorId, body: &[u8]) -> Option<AcpiResource> {
    let mut r = BodyReader::new(body);
    match id {
        ResourceDescriptorId::IRQ => {
            let mask = r.u16()?;
            // No flags byte: edge-triggered, active-high (ISA default).
            let (edge_triggered, active_low) = match r.u8() {
                Some(flags) => ((flags & 0x01) != 0, (flags & 0x08) != 0),
                None => (true, false),
            };
            let irq = mask.trailing_zeros();
            (irq < 16).then_some(AcpiResource::Irq {
                irq: irq as u8,
                edge_triggered,
                active_low,
            })
        }
        ResourceDescriptorId::DMA => {
            let channel_mask = r.u8()?;
            let flags = r.u8()?;
            let channel = channel_mask.trailing_zeros();
            (channel < 8).then_some(AcpiResource::Dma {
                channel: channel as u8,
                bus_master: (flags & 0x04) != 0,
            })
        }
        ResourceDescriptorId::IO => {
            let _decode = r.u8()?;
            let min_base = r.u16()?;
            let _max_base = r.u16()?;
            let _alignment = r.u8()?;
            let range_len = r.u8()?;
            Some(AcpiResource::Io {
                base: min_base,
                length: u16::from(range_len),
            })
        }
        ResourceDescriptorId::FIXED_IO => {
            let base = r.u16()?;
            let length = r.u8()?;
            Some(AcpiResource::FixedIo { base, length })
        }
        _ => None,
    }
}

fn decode_large(id: ResourceDescriptorId, body: &[u8]) -> Option<AcpiResource> {
    let mut r = BodyReader::new(body);
    match id {
        ResourceDescriptorId::MEMORY32 => {
            let flags = r.u8()?;
            let min = r.u32()?;
            let _max = r.u32()?;
            let _alignment = r.u32()?;
            let length = r.u32()?;
            Some(AcpiResource::Memory32 {
                base: min,
                length,
                writable: (flags & 0x01) != 0,
            })
        }
        ResourceDescriptorId::FIXED_MEMORY32 => {
            let flags = r.u8()?;
            let base = r.u32()?;
            let length = r.u32()?;
            Some(AcpiResource::FixedMemory32 {
                base,
                length,
                writable: (flags & 0x01) != 0,
            })
        }
        ResourceDescriptorId::DWORD_ADDRESS => {
            let resource_type = r.u8()?;
            let _general_flags = r.u8()?;
            let type_flags = r.u8()?;
            let _granularity = r.u32()?;
            let min = r.u32()?;
            let _max = r.u32()?;
            let _translation = r.u32()?;
            let length = r.u32()?;
            match resource_type {
                0 => Some(AcpiResource::Memory32 {
                    base: min,
                    length,
                    writable: (type_flags & 0x01) != 0,
                }),
                1 => Some(AcpiResource::Io {
                    base: min as u16,
                    length: length as u16,
                }),
                _ => None,
            }
        }
        ResourceDescriptorId::EXTENDED_IRQ => {
            let flags = r.u8()?;
            let count = r.u8()?;
            if count == 0 {
                return None;
            }
            let gsi = r.u32()?;
            Some(AcpiResource::ExtendedIrq {
                gsi,
                edge_triggered: (flags & 0x02) != 0,
                active_low: (flags & 0x04) != 0,
            })
        }
        ResourceDescriptorId::QWORD_ADDRESS => {
            let resource_type = r.u8()?;
            let _general_flags = r.u8()?;
            let type_flags = r.u8()?;
            let _granularity = r.u64()?;
            let min = r.u64()?;
            let _max = r.u64()?;
            let _translation = r.u64()?;
            let length = r.u64()?;
            (resource_type == 0).then_some(AcpiResource::Memory64 {
                base: min,
                length,
                writable: (type_flags & 0x01) != 0,
            })
        }
        _ => None,
    }
}

/// Decodes one descriptor. Returns `None` for End Tags, descriptor types
/// that are not modelled, and malformed bodies.
#[must_use]
pub fn decode_descriptor(data: &[u8]) -> Option<AcpiResource> {
    let size = descriptor_size(data)?;
    let id = ResourceDescriptorId::from_tag(data[0]);
    if id.is_large() {
        decode_large(id, &data[3..size])
    } else {
        decode_small(id, &data[1..size])
    }
}

/// Encodes an End Tag with the given checksum byte (0 means "ignored").
#[must_use]
pub const fn encode_end_tag(checksum: u8) -> [u8; 2] {
    [END_TAG_BYTE, checksum]
}

/// Encodes a 32-bit fixed memory range descriptor.
#[must_use]
pub fn encode_fixed_memory32(writable: bool, base: u32, length: u32) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[0] = ResourceDescriptorId::FIXED_MEMORY32.0;
    out[1..3].copy_from_slice(&9u16.to_le_bytes());
    out[3] = u8::from(writable);
    out[4..8].copy_from_slice(&base.to_le_bytes());
    out[8..12].copy_from_slice(&length.to_le_bytes());
    out
}

/// Encodes an extended interrupt descriptor with one interrupt number.
#[must_use]
pub fn encode_extended_irq(consumer: bool, edge_triggered: bool, active_low: bool, shared: bool, gsi: u32) -> [u8; 9] {
    let flags = u8::from(consumer)
        | (u8::from(edge_triggered) << 1)
        | (u8::from(active_low) << 2)
        | (u8::from(shared) << 3);
    let mut out = [0u8; 9];
    out[0] = ResourceDescriptorId::EXTENDED_IRQ.0;
    out[1..3].copy_from_slice(&6u16.to_le_bytes());
    out[3] = flags;
    out[4] = 1;
    out[5..9].copy_from_slice(&gsi.to_le_bytes());
    out
}

/// Encodes a small I/O port descriptor.
#[must_use]
pub fn encode_io(decode16: bool, min: u16, max: u16, alignment: u8, length: u8) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[0] = ResourceDescriptorId::IO.0 | 0x07;
    out[1] = u8::from(decode16);
    out[2..4].copy_from_slice(&min.to_le_bytes());
    out[4..6].copy_from_slice(&max.to_le_bytes());
    out[6] = alignment;
    out[7] = length;
    out
}
