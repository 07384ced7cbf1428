//! Splat orientations.
//!
//! Every encoding is re-normalized after unpacking: 8-bit components leave the
//! quaternion slightly off unit length. Output order is (x, y, z, w).

use std::f32::consts::SQRT_2;

use glam::Vec4;

use crate::error::{SogError, SogResult};
use crate::structures::Encoding;

use super::plane::PlaneReader;
use super::unsupported_encoding;

/// Marker added to the index of the dropped component in smallest-three packing.
const SMALLEST3_MARKER: u8 = 252;

type Unpacker = fn(&PlaneReader, usize) -> Option<Vec4>;

pub(crate) fn decode_rotations(plane: &PlaneReader, out: &mut [f32]) -> SogResult<()> {
    let desc = plane.desc;
    let unpack: Unpacker = match desc.encoding {
        Encoding::QuatSmallest3 => smallest_three,
        Encoding::QuatXyzU8 => implicit_w,
        Encoding::QuatU8 => full_u8,
        _ => return Err(unsupported_encoding(desc)),
    };

    for (i, q) in out.chunks_exact_mut(4).enumerate() {
        let out_of_range = || SogError::ArithmeticRangeError {
            family: desc.family,
            index: i,
        };
        let raw = unpack(plane, i).ok_or_else(out_of_range)?;
        let len = raw.length();
        if !len.is_finite() || len <= f32::EPSILON {
            return Err(out_of_range());
        }
        (raw / len).write_to_slice(q);
    }
    Ok(())
}

/// Three smallest components of (w, x, y, z) in `[-1/√2, 1/√2]`, 4th byte names the largest.
fn smallest_three(plane: &PlaneReader, i: usize) -> Option<Vec4> {
    let largest = plane.u8(i, 3).checked_sub(SMALLEST3_MARKER).filter(|&m| m < 4)? as usize;
    let small: [f32; 3] =
        std::array::from_fn(|c| (plane.u8(i, c) as f32 / 255.0 - 0.5) * SQRT_2);
    let rest = small.iter().map(|v| v * v).sum::<f32>();
    let big = (1.0 - rest).max(0.0).sqrt();

    let mut wxyz = [0.0; 4];
    let mut next = small.into_iter();
    for (j, v) in wxyz.iter_mut().enumerate() {
        *v = if j == largest { big } else { next.next()? };
    }
    Some(Vec4::new(wxyz[1], wxyz[2], wxyz[3], wxyz[0]))
}

/// x, y, z in `[-1, 1]` with w reconstructed as the non-negative root.
fn implicit_w(plane: &PlaneReader, i: usize) -> Option<Vec4> {
    let rotation_scale = 1.0 / 127.5;
    let x = plane.u8(i, 0) as f32 * rotation_scale - 1.0;
    let y = plane.u8(i, 1) as f32 * rotation_scale - 1.0;
    let z = plane.u8(i, 2) as f32 * rotation_scale - 1.0;

    let rr = 1.0 - (x * x + y * y + z * z);
    let w = if rr < 0.0 { 0.0 } else { rr.sqrt() };
    Some(Vec4::new(x, y, z, w))
}

fn full_u8(plane: &PlaneReader, i: usize) -> Option<Vec4> {
    let rotation_scale = 1.0 / 127.5;
    Some(Vec4::from_array(std::array::from_fn(|c| {
        plane.u8(i, c) as f32 * rotation_scale - 1.0
    })))
}
