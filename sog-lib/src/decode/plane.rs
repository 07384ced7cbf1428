use std::borrow::Cow;

use crate::common::{read_f32, read_u16, read_u32};
use crate::error::{SogError, SogResult};
use crate::structures::{
    AttributeFamily, Compression, Encoding, Layout, PlaneDescriptor, CHUNK_SIZE, CODEBOOK_LEN,
    MAX_PALETTE_LEN,
};
use crate::unpack::QuantizedPlane;

const CHUNK_BOUNDS_BYTES: usize = 6 * 4;
const CODEBOOK_BYTES: usize = CODEBOOK_LEN * 4;
const PALETTE_LEN_BYTES: usize = 4;

fn body_len(desc: &PlaneDescriptor, count: usize) -> Option<usize> {
    let words = match desc.encoding {
        Encoding::ShPalette => Some(count),
        _ => count.checked_mul(desc.channels),
    }?;
    words.checked_mul(desc.encoding.word_size())
}

fn aux_len(desc: &PlaneDescriptor, count: usize, palette_len: usize) -> Option<usize> {
    match desc.encoding {
        Encoding::ChunkedU16 => count.div_ceil(CHUNK_SIZE).checked_mul(CHUNK_BOUNDS_BYTES),
        Encoding::CodebookU8 => Some(CODEBOOK_BYTES),
        // Palette size, centroid codebook indices, codebook.
        Encoding::ShPalette => palette_len
            .checked_mul(desc.channels)?
            .checked_add(PALETTE_LEN_BYTES + CODEBOOK_BYTES),
        _ => Some(0),
    }
}

fn plane_len(desc: &PlaneDescriptor, count: usize, palette_len: usize) -> usize {
    body_len(desc, count)
        .zip(aux_len(desc, count, palette_len))
        .and_then(|(body, aux)| body.checked_add(aux))
        .unwrap_or(usize::MAX)
}

/// Palette size stored right after the labels of a palette plane.
fn stored_palette_len(desc: &PlaneDescriptor, count: usize, data: &[u8]) -> Option<usize> {
    let at = body_len(desc, count)?;
    let word = data.get(at..at.checked_add(PALETTE_LEN_BYTES)?)?;
    Some(read_u32(word, 0) as usize)
}

/// Bytes `data` must hold for `count` splats, auxiliary tables included.
///
/// Only palette planes depend on `data`, which carries their palette size.
pub(crate) fn expected_len(desc: &PlaneDescriptor, count: usize, data: &[u8]) -> usize {
    let palette_len = match desc.encoding {
        Encoding::ShPalette => stored_palette_len(desc, count, data).unwrap_or(0),
        _ => 0,
    };
    plane_len(desc, count, palette_len)
}

/// Inflates a frame that declared `size` bytes into a buffer reserved up front.
fn decompress_exact(family: AttributeFamily, bytes: &[u8], size: usize) -> SogResult<Vec<u8>> {
    let mut inflated = Vec::new();
    inflated
        .try_reserve_exact(size)
        .map_err(|_| SogError::AllocationFailed { requested: size })?;
    zstd::bulk::decompress_to_buffer(bytes, &mut inflated).map_err(|e| {
        SogError::PlaneDecompression {
            family,
            reason: e.to_string(),
        }
    })?;
    Ok(inflated)
}

/// Returns the plane's decompressed bytes, checking them against the expected length.
pub(crate) fn inflate<'a>(plane: &QuantizedPlane<'a>, count: usize) -> SogResult<Cow<'a, [u8]>> {
    let desc = &plane.descriptor;
    let mismatch = |expected: usize, actual: usize| SogError::AttributeSizeMismatch {
        family: desc.family,
        expected,
        actual,
    };

    let data = match desc.compression {
        Compression::None => Cow::Borrowed(plane.bytes),
        Compression::Zstd => {
            let failed = |reason: String| SogError::PlaneDecompression {
                family: desc.family,
                reason,
            };
            // Check the frame's declared size before allocating anything for it.
            let declared = zstd::zstd_safe::get_frame_content_size(plane.bytes)
                .map_err(|_| failed("invalid zstd frame header".to_string()))?
                .ok_or_else(|| failed("zstd frame does not declare its size".to_string()))?;
            let declared = usize::try_from(declared).unwrap_or(usize::MAX);
            let fits = match desc.encoding {
                Encoding::ShPalette => declared <= plane_len(desc, count, MAX_PALETTE_LEN),
                _ => declared == plane_len(desc, count, 0),
            };
            if !fits {
                return Err(mismatch(plane_len(desc, count, 0), declared));
            }
            Cow::Owned(decompress_exact(desc.family, plane.bytes, declared)?)
        }
    };

    let expected = expected_len(desc, count, &data);
    if data.len() != expected {
        return Err(mismatch(expected, data.len()));
    }
    Ok(data)
}

/// Random access to the words of a size-checked plane.
pub(crate) struct PlaneReader<'p> {
    pub desc: &'p PlaneDescriptor,
    data: &'p [u8],
    count: usize,
}

impl<'p> PlaneReader<'p> {
    pub(crate) fn new(desc: &'p PlaneDescriptor, data: &'p [u8], count: usize) -> Self {
        debug_assert_eq!(data.len(), expected_len(desc, count, data));
        Self { desc, data, count }
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    #[inline]
    fn word_offset(&self, splat: usize, channel: usize) -> usize {
        let word = self.desc.encoding.word_size();
        match self.desc.layout {
            Layout::Interleaved => (splat * self.desc.channels + channel) * word,
            Layout::Planar => (channel * self.count + splat) * word,
        }
    }

    #[inline]
    pub(crate) fn u8(&self, splat: usize, channel: usize) -> u8 {
        self.data[self.word_offset(splat, channel)]
    }

    #[inline]
    pub(crate) fn u16(&self, splat: usize, channel: usize) -> u16 {
        read_u16(self.data, self.word_offset(splat, channel))
    }

    #[inline]
    pub(crate) fn f32(&self, splat: usize, channel: usize) -> f32 {
        read_f32(self.data, self.word_offset(splat, channel))
    }

    fn aux(&self) -> &'p [u8] {
        let body = body_len(self.desc, self.count).unwrap_or(self.data.len());
        &self.data[body..]
    }

    /// The 256-entry table that always ends codebook and palette planes.
    pub(crate) fn codebook(&self) -> [f32; CODEBOOK_LEN] {
        let table = &self.data[self.data.len().saturating_sub(CODEBOOK_BYTES)..];
        std::array::from_fn(|i| read_f32(table, i * 4))
    }

    /// Palette index of one splat.
    #[inline]
    pub(crate) fn label(&self, splat: usize) -> u16 {
        read_u16(self.data, splat * 2)
    }

    /// Number of palette centroids.
    pub(crate) fn palette_len(&self) -> usize {
        read_u32(self.aux(), 0) as usize
    }

    /// Codebook indices of every centroid, `channels` per centroid.
    pub(crate) fn palette(&self) -> &'p [u8] {
        let aux = self.aux();
        &aux[PALETTE_LEN_BYTES..aux.len() - CODEBOOK_BYTES]
    }

    /// Min and max corners of one position chunk.
    pub(crate) fn chunk_bounds(&self, chunk: usize) -> ([f32; 3], [f32; 3]) {
        let aux = &self.aux()[chunk * CHUNK_BOUNDS_BYTES..];
        let min = std::array::from_fn(|c| read_f32(aux, c * 4));
        let max = std::array::from_fn(|c| read_f32(aux, 12 + c * 4));
        (min, max)
    }
}
