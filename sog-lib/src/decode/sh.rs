//! Higher order spherical harmonics, stored per splat as `dim` RGB triples.

use crate::common::unquantize_sh;
use crate::error::{SogError, SogResult};
use crate::structures::Encoding;

use super::plane::PlaneReader;
use super::{fill_channels, unsupported_encoding};

pub(crate) fn decode_sh(plane: &PlaneReader, out: &mut [f32]) -> SogResult<()> {
    let desc = plane.desc;
    let channels = desc.channels;

    match desc.encoding {
        Encoding::U8 => fill_channels(out, channels, |i, k| unquantize_sh(plane.u8(i, k))),
        Encoding::CodebookU8 => {
            let codebook = plane.codebook();
            fill_channels(out, channels, |i, k| codebook[plane.u8(i, k) as usize]);
        }
        Encoding::ShPalette => {
            let codebook = plane.codebook();
            let palette = plane.palette();
            let palette_len = plane.palette_len();
            for (i, splat) in out.chunks_exact_mut(channels).enumerate() {
                let label = plane.label(i) as usize;
                if label >= palette_len {
                    return Err(SogError::ArithmeticRangeError {
                        family: desc.family,
                        index: i * channels,
                    });
                }
                let centroid = &palette[label * channels..(label + 1) * channels];
                for (v, &q) in splat.iter_mut().zip(centroid) {
                    *v = codebook[q as usize];
                }
            }
        }
        _ => return Err(unsupported_encoding(desc)),
    }
    Ok(())
}
