use std::fmt;

use zerocopy::little_endian::{F32, U16, U32};
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

pub const MAGIC: [u8; 4] = *b"SOG2";
pub const VERSION: u32 = 2;
pub const FLAG_ANTIALIASED: u8 = 0x1;

pub const HEADER_SIZE: usize = size_of::<RawHeader>();
pub const DESCRIPTOR_SIZE: usize = size_of::<RawPlaneDescriptor>();

/// Splats per position chunk for [`Encoding::ChunkedU16`].
pub const CHUNK_SIZE: usize = 256;
/// Entries in a [`Encoding::CodebookU8`] or [`Encoding::ShPalette`] lookup table.
pub const CODEBOOK_LEN: usize = 256;
/// Largest palette an [`Encoding::ShPalette`] plane can address with u16 labels.
pub const MAX_PALETTE_LEN: usize = 1 << 16;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, Unaligned)]
pub struct RawHeader {
    pub magic: [u8; 4],
    pub version: U32,
    pub num_splats: U32,
    pub plane_count: u8,
    pub flags: u8,
    pub reserved: U16,
}

const _: () = assert!(size_of::<RawHeader>() == 16);

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, Unaligned)]
pub struct RawPlaneDescriptor {
    pub family: u8,
    pub encoding: u8,
    pub compression: u8,
    pub layout: u8,
    pub channels: u8,
    pub reserved: [u8; 3],
    pub offset: U32,
    pub length: U32,
    pub params: [F32; 6],
}

const _: () = assert!(size_of::<RawPlaneDescriptor>() == 40);

/// Container format revision, selected by the header's version field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    V2,
}

impl FormatVersion {
    pub fn from_raw(version: u32) -> Option<Self> {
        match version {
            VERSION => Some(Self::V2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeFamily {
    Position,
    Scale,
    Rotation,
    Color,
    Opacity,
    ShRest,
}

impl AttributeFamily {
    pub const ALL: [Self; 6] = [
        Self::Position,
        Self::Scale,
        Self::Rotation,
        Self::Color,
        Self::Opacity,
        Self::ShRest,
    ];

    pub fn from_raw(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AttributeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Position => "position",
            Self::Scale => "scale",
            Self::Rotation => "rotation",
            Self::Color => "color",
            Self::Opacity => "opacity",
            Self::ShRest => "sh_rest",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    F32,
    F16,
    U8,
    U16,
    LogU8,
    SymLogU16,
    ChunkedU16,
    CodebookU8,
    QuatSmallest3,
    QuatXyzU8,
    QuatU8,
    /// Per-splat u16 label into a palette of SH centroids.
    ShPalette,
}

impl Encoding {
    pub fn from_raw(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::F32,
            1 => Self::F16,
            2 => Self::U8,
            3 => Self::U16,
            4 => Self::LogU8,
            5 => Self::SymLogU16,
            6 => Self::ChunkedU16,
            7 => Self::CodebookU8,
            8 => Self::QuatSmallest3,
            9 => Self::QuatXyzU8,
            10 => Self::QuatU8,
            11 => Self::ShPalette,
            _ => return None,
        })
    }

    /// Stored bytes per word. Every encoding stores one word per channel except
    /// [`Encoding::ShPalette`], which stores one label per splat.
    pub const fn word_size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F16 | Self::U16 | Self::SymLogU16 | Self::ChunkedU16 | Self::ShPalette => 2,
            Self::U8
            | Self::LogU8
            | Self::CodebookU8
            | Self::QuatSmallest3
            | Self::QuatXyzU8
            | Self::QuatU8 => 1,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zstd,
}

impl Compression {
    pub fn from_raw(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::None),
            1 => Some(Self::Zstd),
            _ => None,
        }
    }
}

/// How the channels of a multi-channel plane are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `s0c0 s0c1 s0c2 s1c0 ...`
    Interleaved,
    /// `s0c0 s1c0 ... s0c1 s1c1 ...`
    Planar,
}

impl Layout {
    pub fn from_raw(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Interleaved),
            1 => Some(Self::Planar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaneDescriptor {
    pub family: AttributeFamily,
    pub encoding: Encoding,
    pub compression: Compression,
    pub layout: Layout,
    pub channels: usize,
    pub offset: usize,
    pub length: usize,
    pub params: [f32; 6],
}

impl PlaneDescriptor {
    #[inline]
    pub fn step(&self, channel: usize) -> f32 {
        self.params[channel]
    }

    #[inline]
    pub fn bias(&self, channel: usize) -> f32 {
        self.params[3 + channel]
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub version: FormatVersion,
    pub num_splats: u32,
    pub antialiased: bool,
    pub plane_count: usize,
}
