//! Base color and opacity. Both always land in `[0, 1]`; no gamma conversion is applied.

use crate::common::{sh_dc_to_color, unorm16, unorm8};
use crate::error::SogResult;
use crate::structures::Encoding;

use super::plane::PlaneReader;
use super::{fill_channels, unsupported_encoding};

/// Writes RGBA per splat. A 3-channel plane leaves the alpha slot untouched.
pub(crate) fn decode_colors(plane: &PlaneReader, out: &mut [f32]) -> SogResult<()> {
    let desc = plane.desc;
    let channels = desc.channels;

    match desc.encoding {
        Encoding::U8 => {
            for (i, rgba) in out.chunks_exact_mut(4).enumerate() {
                for (c, v) in rgba.iter_mut().take(channels).enumerate() {
                    *v = unorm8(plane.u8(i, c));
                }
            }
        }
        // Codebook entries are DC spherical harmonic terms; alpha stays a plain byte.
        Encoding::CodebookU8 => {
            let codebook = plane.codebook();
            for (i, rgba) in out.chunks_exact_mut(4).enumerate() {
                for (c, v) in rgba.iter_mut().take(channels).enumerate() {
                    let raw = plane.u8(i, c);
                    *v = if c < 3 {
                        sh_dc_to_color(codebook[raw as usize])
                    } else {
                        unorm8(raw)
                    };
                }
            }
        }
        _ => return Err(unsupported_encoding(desc)),
    }
    Ok(())
}

pub(crate) fn decode_opacities(plane: &PlaneReader, out: &mut [f32]) -> SogResult<()> {
    let desc = plane.desc;
    match desc.encoding {
        Encoding::U8 => fill_channels(out, 1, |i, _| unorm8(plane.u8(i, 0))),
        Encoding::U16 => fill_channels(out, 1, |i, _| unorm16(plane.u16(i, 0))),
        _ => return Err(unsupported_encoding(desc)),
    }
    Ok(())
}
