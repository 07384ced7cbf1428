use half::f16;

/// Zeroth-order spherical harmonic basis constant.
pub const SH_C0: f32 = 0.282_094_8;

#[inline]
pub(crate) fn unorm8(x: u8) -> f32 {
    x as f32 / 255.0
}

#[inline]
pub(crate) fn unorm16(x: u16) -> f32 {
    x as f32 / 65535.0
}

#[inline]
pub(crate) fn unquantize_sh(x: u8) -> f32 {
    (x as f32 - 128.0) / 128.0
}

#[inline]
pub(crate) fn sh_dc_to_color(dc: f32) -> f32 {
    (0.5 + SH_C0 * dc).clamp(0.0, 1.0)
}

#[inline]
pub(crate) fn color_to_sh_dc(c: f32) -> f32 {
    (c - 0.5) / SH_C0
}

#[inline]
pub(crate) fn inv_sigmoid(x: f32) -> f32 {
    (x / (1.0 - x)).ln()
}

/// Inverse of the log transform applied to SOG means.
#[inline]
pub(crate) fn sym_exp(x: f32) -> f32 {
    x.signum() * (x.abs().exp() - 1.0)
}

#[inline]
pub(crate) fn dim_for_degree(deg: u32) -> usize {
    match deg {
        0 => 0,
        1 => 3,
        2 => 8,
        3 => 15,
        _ => 0,
    }
}

#[inline]
pub(crate) const fn degree_for_dim(dim: usize) -> Option<u32> {
    match dim {
        0 => Some(0),
        3 => Some(1),
        8 => Some(2),
        15 => Some(3),
        _ => None,
    }
}

#[inline]
pub(crate) fn half_to_float(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

#[inline]
pub(crate) fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
pub(crate) fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
pub(crate) fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
