//! Splat scales. Log-quantized encodings are exponentiated, so the output is always linear.

use crate::common::half_to_float;
use crate::error::SogResult;
use crate::structures::Encoding;

use super::plane::PlaneReader;
use super::{fill_channels, unsupported_encoding};

pub(crate) fn decode_scales(plane: &PlaneReader, out: &mut [f32]) -> SogResult<()> {
    let desc = plane.desc;

    match desc.encoding {
        Encoding::LogU8 => fill_channels(out, 3, |i, c| {
            (plane.u8(i, c) as f32 * desc.step(c) + desc.bias(c)).exp()
        }),
        Encoding::CodebookU8 => {
            let codebook = plane.codebook();
            fill_channels(out, 3, |i, c| codebook[plane.u8(i, c) as usize].exp());
        }
        Encoding::U8 => fill_channels(out, 3, |i, c| {
            plane.u8(i, c) as f32 * desc.step(c) + desc.bias(c)
        }),
        Encoding::F16 => fill_channels(out, 3, |i, c| half_to_float(plane.u16(i, c))),
        Encoding::F32 => fill_channels(out, 3, |i, c| plane.f32(i, c)),
        _ => return Err(unsupported_encoding(desc)),
    }
    Ok(())
}
