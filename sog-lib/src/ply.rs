//! Export of a decoded collection as a binary little-endian 3DGS `.ply`.

use std::io::Write;

use crate::common::{color_to_sh_dc, dim_for_degree, inv_sigmoid};
use crate::error::SogResult;
use crate::splats::SplatView;

/// Keeps the logit of a saturated opacity finite.
const OPACITY_EPSILON: f32 = 1e-6;
/// Smallest scale written, so a zero scale keeps a finite log.
const SCALE_FLOOR: f32 = 1e-12;

fn write_header(
    output: &mut Vec<u8>,
    count: usize,
    sh_coeffs: usize,
    include_normals: bool,
) -> SogResult<()> {
    output.extend_from_slice(b"ply\nformat binary_little_endian 1.0\n");
    writeln!(output, "element vertex {}", count)?;
    output.extend_from_slice(b"property float x\nproperty float y\nproperty float z\n");
    if include_normals {
        output.extend_from_slice(b"property float nx\nproperty float ny\nproperty float nz\n");
    }
    output.extend_from_slice(
        b"property float f_dc_0\nproperty float f_dc_1\nproperty float f_dc_2\n",
    );
    for i in 0..sh_coeffs {
        writeln!(output, "property float f_rest_{}", i)?;
    }
    output.extend_from_slice(
        b"property float opacity\n\
          property float scale_0\nproperty float scale_1\nproperty float scale_2\n\
          property float rot_0\nproperty float rot_1\nproperty float rot_2\nproperty float rot_3\n\
          end_header\n",
    );
    Ok(())
}

/// Replaces `output` with a PLY file holding every splat of `view`.
///
/// Values are written in the usual training-space conventions: log scale,
/// logit opacity, DC color as an SH coefficient and rotation as (w, x, y, z).
/// Higher order SH is written channel-major (`f_rest_0..dim` is red).
pub fn write_ply(output: &mut Vec<u8>, view: &SplatView<'_>, include_normals: bool) -> SogResult<()> {
    let num_points = view.count;
    let sh_dim = dim_for_degree(view.sh_degree);
    let sh_coeffs = sh_dim * 3;

    output.clear();
    write_header(output, num_points, sh_coeffs, include_normals)?;

    let point_size = (3 + if include_normals { 3 } else { 0 } + 3 + sh_coeffs + 1 + 3 + 4) * 4;
    output.reserve(num_points * point_size);

    let normals: &[u8] = bytemuck::bytes_of(&[0.0f32; 3]);
    let mut sh_rest = Vec::with_capacity(sh_coeffs);
    for i in 0..num_points {
        output.extend_from_slice(bytemuck::cast_slice(&view.positions[i * 3..i * 3 + 3]));

        if include_normals {
            output.extend_from_slice(normals);
        }

        let rgba = &view.colors[i * 4..i * 4 + 4];
        let dc = [
            color_to_sh_dc(rgba[0]),
            color_to_sh_dc(rgba[1]),
            color_to_sh_dc(rgba[2]),
        ];
        output.extend_from_slice(bytemuck::cast_slice(&dc));

        sh_rest.clear();
        let sh = view.sh_of(i).unwrap_or_default();
        for channel in 0..3 {
            sh_rest.extend((0..sh_dim).map(|j| sh[j * 3 + channel]));
        }
        output.extend_from_slice(bytemuck::cast_slice(&sh_rest));

        let opacity = view.opacities[i].clamp(OPACITY_EPSILON, 1.0 - OPACITY_EPSILON);
        output.extend_from_slice(bytemuck::bytes_of(&inv_sigmoid(opacity)));

        let scales = &view.scales[i * 3..i * 3 + 3];
        let log_scales = [
            scales[0].max(SCALE_FLOOR).ln(),
            scales[1].max(SCALE_FLOOR).ln(),
            scales[2].max(SCALE_FLOOR).ln(),
        ];
        output.extend_from_slice(bytemuck::cast_slice(&log_scales));

        let q = &view.rotations[i * 4..i * 4 + 4];
        output.extend_from_slice(bytemuck::cast_slice(&[q[3], q[0], q[1], q[2]]));
    }
    Ok(())
}
