//! Structural pass over a SOG container.
//!
//! Nothing here dequantizes anything. The unpacker checks that the header and
//! plane table describe a well formed container and hands out borrowed views
//! of each plane's bytes.

use zerocopy::FromBytes;

use crate::error::{SogError, SogResult};
use crate::structures::{
    AttributeFamily, Compression, ContainerHeader, Encoding, FormatVersion, Layout,
    PlaneDescriptor, RawHeader, RawPlaneDescriptor, DESCRIPTOR_SIZE, FLAG_ANTIALIASED,
    HEADER_SIZE, MAGIC,
};

/// One attribute family's still-quantized bytes.
#[derive(Debug)]
pub struct QuantizedPlane<'a> {
    pub descriptor: PlaneDescriptor,
    pub bytes: &'a [u8],
}

/// The result of [`unpack`]. Borrows the caller's buffer and may be decoded once.
#[derive(Debug)]
pub struct ParsedContainer<'a> {
    header: ContainerHeader,
    planes: [Option<QuantizedPlane<'a>>; AttributeFamily::ALL.len()],
    consumed: bool,
}

impl<'a> ParsedContainer<'a> {
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn num_splats(&self) -> usize {
        self.header.num_splats as usize
    }

    pub fn plane(&self, family: AttributeFamily) -> Option<&QuantizedPlane<'a>> {
        self.planes[family.index()].as_ref()
    }

    pub fn planes(&self) -> impl Iterator<Item = &QuantizedPlane<'a>> {
        self.planes.iter().flatten()
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Marks the container as used. Fails if it already was.
    pub(crate) fn consume(&mut self) -> SogResult<()> {
        if self.consumed {
            return Err(SogError::InvalidState);
        }
        self.consumed = true;
        Ok(())
    }
}

fn parse_descriptor(index: usize, raw: &RawPlaneDescriptor) -> SogResult<PlaneDescriptor> {
    let malformed =
        |what: &str, id: u8| SogError::MalformedTable(format!("plane {index}: unknown {what} {id}"));

    let family = AttributeFamily::from_raw(raw.family).ok_or_else(|| malformed("family", raw.family))?;
    let encoding =
        Encoding::from_raw(raw.encoding).ok_or_else(|| malformed("encoding", raw.encoding))?;
    let compression = Compression::from_raw(raw.compression)
        .ok_or_else(|| malformed("compression", raw.compression))?;
    let layout = Layout::from_raw(raw.layout).ok_or_else(|| malformed("layout", raw.layout))?;

    Ok(PlaneDescriptor {
        family,
        encoding,
        compression,
        layout,
        channels: raw.channels as usize,
        offset: raw.offset.get() as usize,
        length: raw.length.get() as usize,
        params: raw.params.map(|p| p.get()),
    })
}

/// Parses the header and plane table of a SOG v2 container.
///
/// The returned container borrows `bytes`; no plane data is copied.
pub fn unpack(bytes: &[u8]) -> SogResult<ParsedContainer<'_>> {
    let _span = tracing::trace_span!("unpack", len = bytes.len()).entered();

    let (raw, rest) = RawHeader::ref_from_prefix(bytes).map_err(|_| SogError::TruncatedInput {
        needed: HEADER_SIZE,
        available: bytes.len(),
    })?;

    if raw.magic != MAGIC {
        return Err(SogError::InvalidMagic(raw.magic));
    }
    let version = raw.version.get();
    let version = FormatVersion::from_raw(version).ok_or(SogError::UnsupportedVersion(version))?;

    match version {
        FormatVersion::V2 => unpack_v2(bytes, raw, rest, version),
    }
}

fn unpack_v2<'a>(
    bytes: &'a [u8],
    raw: &RawHeader,
    rest: &'a [u8],
    version: FormatVersion,
) -> SogResult<ParsedContainer<'a>> {
    let plane_count = raw.plane_count as usize;
    let table_end = HEADER_SIZE + plane_count * DESCRIPTOR_SIZE;
    let (raw_planes, _) = <[RawPlaneDescriptor]>::ref_from_prefix_with_elems(rest, plane_count)
        .map_err(|_| SogError::TruncatedInput {
            needed: table_end,
            available: bytes.len(),
        })?;

    let mut planes: [Option<QuantizedPlane<'a>>; AttributeFamily::ALL.len()] = Default::default();
    let mut ranges = Vec::with_capacity(plane_count);

    for (index, raw_plane) in raw_planes.iter().enumerate() {
        let descriptor = parse_descriptor(index, raw_plane)?;
        let family = descriptor.family;

        if planes[family.index()].is_some() {
            return Err(SogError::MalformedTable(format!(
                "plane {index}: duplicate '{family}' plane"
            )));
        }
        let end = descriptor
            .offset
            .checked_add(descriptor.length)
            .ok_or_else(|| {
                SogError::MalformedTable(format!("plane {index}: byte range overflows"))
            })?;
        if descriptor.offset < table_end {
            return Err(SogError::MalformedTable(format!(
                "plane {index}: offset {} lies inside the header or plane table",
                descriptor.offset
            )));
        }
        if end > bytes.len() {
            return Err(SogError::TruncatedInput {
                needed: end,
                available: bytes.len(),
            });
        }

        ranges.push((descriptor.offset, end, family));
        planes[family.index()] = Some(QuantizedPlane {
            bytes: &bytes[descriptor.offset..end],
            descriptor,
        });
    }

    ranges.sort_unstable_by_key(|&(start, end, _)| (start, end));
    for pair in ranges.windows(2) {
        let (_, prev_end, prev_family) = pair[0];
        let (next_start, _, next_family) = pair[1];
        if prev_end > next_start {
            return Err(SogError::MalformedTable(format!(
                "planes '{prev_family}' and '{next_family}' overlap"
            )));
        }
    }

    let header = ContainerHeader {
        version,
        num_splats: raw.num_splats.get(),
        antialiased: raw.flags & FLAG_ANTIALIASED != 0,
        plane_count,
    };

    if header.num_splats > 0 && planes[AttributeFamily::Position.index()].is_none() {
        return Err(SogError::MissingAttribute(AttributeFamily::Position));
    }

    Ok(ParsedContainer {
        header,
        planes,
        consumed: false,
    })
}
