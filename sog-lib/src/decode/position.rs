//! Splat centers.

use crate::common::{half_to_float, sym_exp};
use crate::error::SogResult;
use crate::structures::{Encoding, CHUNK_SIZE};

use super::plane::PlaneReader;
use super::{fill_channels, unsupported_encoding};

/// Fills `out` with xyz per splat.
pub(crate) fn decode_positions(plane: &PlaneReader, out: &mut [f32]) -> SogResult<()> {
    let desc = plane.desc;
    let n = plane.count();

    match desc.encoding {
        Encoding::F32 => fill_channels(out, 3, |i, c| plane.f32(i, c)),
        Encoding::F16 => fill_channels(out, 3, |i, c| half_to_float(plane.u16(i, c))),
        Encoding::U8 => fill_channels(out, 3, |i, c| {
            plane.u8(i, c) as f32 * desc.step(c) + desc.bias(c)
        }),
        Encoding::U16 => fill_channels(out, 3, |i, c| {
            plane.u16(i, c) as f32 * desc.step(c) + desc.bias(c)
        }),
        // Means are stored as log(|x| + 1) with the sign kept.
        Encoding::SymLogU16 => fill_channels(out, 3, |i, c| {
            sym_exp(plane.u16(i, c) as f32 * desc.step(c) + desc.bias(c))
        }),
        Encoding::ChunkedU16 => {
            for chunk in 0..n.div_ceil(CHUNK_SIZE) {
                let (min, max) = plane.chunk_bounds(chunk);
                let first = chunk * CHUNK_SIZE;
                let last = (first + CHUNK_SIZE).min(n);
                for i in first..last {
                    for c in 0..3 {
                        let t = plane.u16(i, c) as f32 / 65535.0;
                        out[i * 3 + c] = min[c] + t * (max[c] - min[c]);
                    }
                }
            }
        }
        _ => return Err(unsupported_encoding(desc)),
    }
    Ok(())
}
