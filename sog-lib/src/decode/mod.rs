//! Dequantization of a [`ParsedContainer`] into a [`SogDataV2`].
//!
//! Each attribute family has its own module. Families that are absent from
//! the container are filled with the `DEFAULT_*` values below. That is part of
//! the decoded result, not an error.
//!
//! Decoding is all-or-nothing: on any error the partially filled arena is
//! dropped and only the error is returned.

mod color;
mod plane;
mod position;
mod rotation;
mod scale;
mod sh;

use std::borrow::Cow;

use crate::common::degree_for_dim;
use crate::error::{SogError, SogResult};
use crate::splats::{SogDataV2, SplatArena};
use crate::structures::{AttributeFamily, Encoding, PlaneDescriptor};
use crate::unpack::ParsedContainer;

use plane::{inflate, PlaneReader};

/// Scale used when the container has no scale plane.
pub const DEFAULT_SCALE: [f32; 3] = [1.0, 1.0, 1.0];
/// Identity rotation (x, y, z, w) used when the container has no rotation plane.
pub const DEFAULT_ROTATION: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
/// Mid-gray RGB used when the container has no color plane.
pub const DEFAULT_COLOR: [f32; 3] = [0.5, 0.5, 0.5];
/// Opacity used when neither an opacity plane nor a color alpha channel exists.
pub const DEFAULT_OPACITY: f32 = 1.0;

pub(crate) fn unsupported_encoding(desc: &PlaneDescriptor) -> SogError {
    SogError::UnsupportedEncoding {
        family: desc.family,
        encoding: format!("{} x{}", desc.encoding, desc.channels),
    }
}

/// Writes `value(splat, channel)` into every slot of `out`.
#[inline]
pub(crate) fn fill_channels(out: &mut [f32], channels: usize, value: impl Fn(usize, usize) -> f32) {
    out.chunks_exact_mut(channels)
        .enumerate()
        .for_each(|(i, splat)| {
            for (c, v) in splat.iter_mut().enumerate() {
                *v = value(i, c);
            }
        });
}

fn check_plane(desc: &PlaneDescriptor) -> SogResult<()> {
    let channels = desc.channels;
    let supported = match desc.family {
        AttributeFamily::Position => {
            channels == 3
                && matches!(
                    desc.encoding,
                    Encoding::F32
                        | Encoding::F16
                        | Encoding::U8
                        | Encoding::U16
                        | Encoding::SymLogU16
                        | Encoding::ChunkedU16
                )
        }
        AttributeFamily::Scale => {
            channels == 3
                && matches!(
                    desc.encoding,
                    Encoding::LogU8
                        | Encoding::CodebookU8
                        | Encoding::U8
                        | Encoding::F16
                        | Encoding::F32
                )
        }
        AttributeFamily::Rotation => match desc.encoding {
            Encoding::QuatSmallest3 | Encoding::QuatU8 => channels == 4,
            Encoding::QuatXyzU8 => channels == 3,
            _ => false,
        },
        AttributeFamily::Color => {
            (channels == 3 || channels == 4)
                && matches!(desc.encoding, Encoding::U8 | Encoding::CodebookU8)
        }
        AttributeFamily::Opacity => {
            channels == 1 && matches!(desc.encoding, Encoding::U8 | Encoding::U16)
        }
        AttributeFamily::ShRest => {
            channels % 3 == 0
                && degree_for_dim(channels / 3).is_some_and(|degree| degree > 0)
                && matches!(
                    desc.encoding,
                    Encoding::U8 | Encoding::CodebookU8 | Encoding::ShPalette
                )
        }
    };

    if supported {
        Ok(())
    } else {
        Err(unsupported_encoding(desc))
    }
}

fn ensure_finite(family: AttributeFamily, values: &[f32]) -> SogResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(SogError::ArithmeticRangeError { family, index }),
        None => Ok(()),
    }
}

struct InflatedPlane<'p> {
    desc: &'p PlaneDescriptor,
    data: Cow<'p, [u8]>,
}

impl InflatedPlane<'_> {
    fn reader(&self, count: usize) -> PlaneReader<'_> {
        PlaneReader::new(self.desc, &self.data, count)
    }
}

/// Dequantizes every plane of `container` into a new [`SogDataV2`].
///
/// The container is consumed by the first call, successful or not. Calling
/// this again on the same container returns [`SogError::InvalidState`].
pub fn decode(container: &mut ParsedContainer<'_>) -> SogResult<SogDataV2> {
    container.consume()?;
    let n = container.num_splats();
    let _span = tracing::trace_span!("decode", splats = n).entered();

    let mut planes: [Option<InflatedPlane<'_>>; AttributeFamily::ALL.len()] = Default::default();
    for plane in container.planes() {
        let desc = &plane.descriptor;
        check_plane(desc)?;
        planes[desc.family.index()] = Some(InflatedPlane {
            desc,
            data: inflate(plane, n)?,
        });
    }
    let get = |family: AttributeFamily| planes[family.index()].as_ref();

    let sh_coeffs = get(AttributeFamily::ShRest).map_or(0, |p| p.desc.channels);
    let sh_degree = degree_for_dim(sh_coeffs / 3).unwrap_or(0);

    let mut arena = SplatArena::new(n, sh_coeffs)?;
    let out = arena.slices_mut();

    if let Some(p) = get(AttributeFamily::Position) {
        position::decode_positions(&p.reader(n), out.positions)?;
        ensure_finite(AttributeFamily::Position, out.positions)?;
    }

    match get(AttributeFamily::Scale) {
        Some(p) => {
            scale::decode_scales(&p.reader(n), out.scales)?;
            ensure_finite(AttributeFamily::Scale, out.scales)?;
        }
        None => fill_channels(out.scales, 3, |_, c| DEFAULT_SCALE[c]),
    }

    match get(AttributeFamily::Rotation) {
        Some(p) => rotation::decode_rotations(&p.reader(n), out.rotations)?,
        None => fill_channels(out.rotations, 4, |_, c| DEFAULT_ROTATION[c]),
    }

    let color_plane = get(AttributeFamily::Color);
    let color_has_alpha = color_plane.is_some_and(|p| p.desc.channels == 4);
    match color_plane {
        Some(p) => {
            color::decode_colors(&p.reader(n), out.colors)?;
            ensure_finite(AttributeFamily::Color, out.colors)?;
        }
        None => fill_channels(out.colors, 4, |_, c| DEFAULT_COLOR.get(c).copied().unwrap_or(0.0)),
    }

    match get(AttributeFamily::Opacity) {
        Some(p) => color::decode_opacities(&p.reader(n), out.opacities)?,
        None if color_has_alpha => out
            .opacities
            .iter_mut()
            .zip(out.colors.chunks_exact(4))
            .for_each(|(o, rgba)| *o = rgba[3]),
        None => out.opacities.fill(DEFAULT_OPACITY),
    }
    if !color_has_alpha {
        out.colors
            .chunks_exact_mut(4)
            .zip(out.opacities.iter())
            .for_each(|(rgba, &o)| rgba[3] = o);
    }

    if let Some(p) = get(AttributeFamily::ShRest) {
        sh::decode_sh(&p.reader(n), out.sh)?;
        ensure_finite(AttributeFamily::ShRest, out.sh)?;
    }

    Ok(SogDataV2::from_arena(
        arena,
        sh_degree,
        container.header().antialiased,
    ))
}
