//! Fixture encoder used by the tests. Not part of the public API.

use crate::common::color_to_sh_dc;
use crate::structures::{
    AttributeFamily, Compression, Encoding, Layout, CHUNK_SIZE, CODEBOOK_LEN, DESCRIPTOR_SIZE,
    FLAG_ANTIALIASED, HEADER_SIZE, MAGIC, VERSION,
};

#[inline]
pub(crate) fn clamp_u8(x: f32) -> u8 {
    x.round().clamp(0.0, 255.0) as u8
}

#[inline]
pub(crate) fn clamp_u16(x: f32) -> u16 {
    x.round().clamp(0.0, 65535.0) as u16
}

pub(crate) struct PlaneFixture {
    family: AttributeFamily,
    encoding: Encoding,
    compression: Compression,
    layout: Layout,
    channels: u8,
    params: [f32; 6],
    data: Vec<u8>,
}

impl PlaneFixture {
    /// `data` is interleaved; `planar()` reorders it when building.
    pub(crate) fn raw(
        family: AttributeFamily,
        encoding: Encoding,
        channels: u8,
        data: Vec<u8>,
    ) -> Self {
        Self {
            family,
            encoding,
            compression: Compression::None,
            layout: Layout::Interleaved,
            channels,
            params: [0.0; 6],
            data,
        }
    }

    pub(crate) fn params(mut self, params: [f32; 6]) -> Self {
        self.params = params;
        self
    }

    pub(crate) fn zstd(mut self) -> Self {
        self.compression = Compression::Zstd;
        self
    }

    pub(crate) fn planar(mut self, num_splats: usize) -> Self {
        let word = self.encoding.word_size();
        let channels = self.channels as usize;
        let body = num_splats * channels * word;
        let mut reordered = vec![0u8; body];
        for i in 0..num_splats {
            for c in 0..channels {
                let src = (i * channels + c) * word;
                let dst = (c * num_splats + i) * word;
                reordered[dst..dst + word].copy_from_slice(&self.data[src..src + word]);
            }
        }
        reordered.extend_from_slice(&self.data[body..]);
        self.data = reordered;
        self.layout = Layout::Planar;
        self
    }
}

pub(crate) struct ContainerBuilder {
    num_splats: u32,
    flags: u8,
    planes: Vec<PlaneFixture>,
}

impl ContainerBuilder {
    pub(crate) fn new(num_splats: u32) -> Self {
        Self {
            num_splats,
            flags: 0,
            planes: Vec::new(),
        }
    }

    pub(crate) fn antialiased(mut self, on: bool) -> Self {
        self.flags = if on { FLAG_ANTIALIASED } else { 0 };
        self
    }

    pub(crate) fn plane(mut self, plane: PlaneFixture) -> Self {
        self.planes.push(plane);
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let bodies: Vec<Vec<u8>> = self
            .planes
            .iter()
            .map(|p| match p.compression {
                Compression::None => p.data.clone(),
                Compression::Zstd => zstd::bulk::compress(&p.data, 3).expect("zstd compress"),
            })
            .collect();

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&self.num_splats.to_le_bytes());
        out.push(self.planes.len() as u8);
        out.push(self.flags);
        out.extend_from_slice(&0u16.to_le_bytes());

        let mut offset = HEADER_SIZE + self.planes.len() * DESCRIPTOR_SIZE;
        for (plane, body) in self.planes.iter().zip(&bodies) {
            out.push(plane.family as u8);
            out.push(encoding_id(plane.encoding));
            out.push(match plane.compression {
                Compression::None => 0,
                Compression::Zstd => 1,
            });
            out.push(match plane.layout {
                Layout::Interleaved => 0,
                Layout::Planar => 1,
            });
            out.push(plane.channels);
            out.extend_from_slice(&[0; 3]);
            out.extend_from_slice(&(offset as u32).to_le_bytes());
            out.extend_from_slice(&(body.len() as u32).to_le_bytes());
            for p in plane.params {
                out.extend_from_slice(&p.to_le_bytes());
            }
            offset += body.len();
        }
        for body in &bodies {
            out.extend_from_slice(body);
        }
        out
    }
}

fn encoding_id(encoding: Encoding) -> u8 {
    (0..=u8::MAX)
        .find(|&id| Encoding::from_raw(id) == Some(encoding))
        .expect("every encoding has an id")
}

pub(crate) fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn channel_ranges(values: &[f32], channels: usize) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for chunk in values.chunks_exact(channels) {
        for (c, &v) in chunk.iter().enumerate() {
            min[c] = min[c].min(v);
            max[c] = max[c].max(v);
        }
    }
    (min, max)
}

fn affine_params(min: [f32; 3], max: [f32; 3], levels: f32) -> [f32; 6] {
    let mut params = [0.0; 6];
    for c in 0..3 {
        let span = max[c] - min[c];
        params[c] = if span > 0.0 { span / levels } else { 1.0 };
        params[3 + c] = min[c];
    }
    params
}

/// Per-channel affine quantization of interleaved 3-channel values.
pub(crate) fn quantize_u8(values: &[f32]) -> (Vec<u8>, [f32; 6]) {
    let (min, max) = channel_ranges(values, 3);
    let params = affine_params(min, max, 255.0);
    let data = values
        .chunks_exact(3)
        .flat_map(|v| (0..3).map(move |c| clamp_u8((v[c] - params[3 + c]) / params[c])))
        .collect();
    (data, params)
}

pub(crate) fn quantize_u16(values: &[f32]) -> (Vec<u8>, [f32; 6]) {
    let (min, max) = channel_ranges(values, 3);
    let params = affine_params(min, max, 65535.0);
    let data = values
        .chunks_exact(3)
        .flat_map(|v| {
            (0..3).flat_map(move |c| {
                clamp_u16((v[c] - params[3 + c]) / params[c]).to_le_bytes()
            })
        })
        .collect();
    (data, params)
}

/// Log-quantizes linear scales into one byte per channel.
pub(crate) fn quantize_log_u8(scales: &[f32]) -> (Vec<u8>, [f32; 6]) {
    let logs: Vec<f32> = scales.iter().map(|s| s.ln()).collect();
    quantize_u8(&logs)
}

pub(crate) fn quantize_sym_log_u16(values: &[f32]) -> (Vec<u8>, [f32; 6]) {
    let logs: Vec<f32> = values
        .iter()
        .map(|v| v.signum() * (v.abs() + 1.0).ln())
        .collect();
    quantize_u16(&logs)
}

/// Positions as 16-bit offsets inside per-chunk bounding boxes, followed by the chunk table.
pub(crate) fn quantize_chunked_u16(positions: &[f32]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut aux = Vec::new();
    for chunk in positions.chunks(CHUNK_SIZE * 3) {
        let (min, max) = channel_ranges(chunk, 3);
        for v in chunk.chunks_exact(3) {
            for c in 0..3 {
                let span = max[c] - min[c];
                let t = if span > 0.0 { (v[c] - min[c]) / span } else { 0.0 };
                body.extend_from_slice(&clamp_u16(t * 65535.0).to_le_bytes());
            }
        }
        aux.extend(f32_bytes(&min));
        aux.extend(f32_bytes(&max));
    }
    body.extend(aux);
    body
}

/// Nearest-entry lookup into an evenly spaced codebook over `[min, max]`.
pub(crate) fn quantize_codebook(values: &[f32]) -> (Vec<u8>, Vec<f32>) {
    let min = values.iter().copied().fold(f32::MAX, f32::min);
    let max = values.iter().copied().fold(f32::MIN, f32::max);
    let step = if max > min {
        (max - min) / (CODEBOOK_LEN - 1) as f32
    } else {
        1.0
    };
    let codebook: Vec<f32> = (0..CODEBOOK_LEN).map(|i| min + step * i as f32).collect();
    let data = values.iter().map(|&v| clamp_u8((v - min) / step)).collect();
    (data, codebook)
}

pub(crate) fn with_codebook(mut data: Vec<u8>, codebook: &[f32]) -> Vec<u8> {
    data.extend(f32_bytes(codebook));
    data
}

/// Codebook-quantized RGB colors stored as SH DC terms.
pub(crate) fn quantize_sh0_colors(rgb: &[f32]) -> (Vec<u8>, Vec<f32>) {
    let dc: Vec<f32> = rgb.iter().map(|&c| color_to_sh_dc(c)).collect();
    quantize_codebook(&dc)
}

/// Palette SH plane: u16 labels, then the palette size, the codebook indices
/// of every centroid and the codebook.
pub(crate) fn sh_palette_plane(labels: &[u16], centroids: &[f32], channels: usize) -> Vec<u8> {
    let (indices, codebook) = quantize_codebook(centroids);
    let mut out: Vec<u8> = labels.iter().flat_map(|l| l.to_le_bytes()).collect();
    out.extend_from_slice(&((centroids.len() / channels) as u32).to_le_bytes());
    out.extend(indices);
    with_codebook(out, &codebook)
}

/// `q` is (x, y, z, w). Output bytes carry the three smallest of (w, x, y, z).
pub(crate) fn pack_quat_smallest3(q: [f32; 4]) -> [u8; 4] {
    let norm = q.iter().map(|v| v * v).sum::<f32>().sqrt();
    let wxyz = [q[3] / norm, q[0] / norm, q[1] / norm, q[2] / norm];
    let largest = (0..4)
        .max_by(|&a, &b| wxyz[a].abs().total_cmp(&wxyz[b].abs()))
        .unwrap_or(0);
    let sign = if wxyz[largest] < 0.0 { -1.0 } else { 1.0 };
    let mut out = [0u8; 4];
    let mut k = 0;
    for (i, v) in wxyz.iter().enumerate() {
        if i != largest {
            out[k] = clamp_u8((v * sign * std::f32::consts::FRAC_1_SQRT_2 + 0.5) * 255.0);
            k += 1;
        }
    }
    out[3] = 252 + largest as u8;
    out
}

/// `q` is (x, y, z, w). Flips the quaternion so that w is non-negative.
pub(crate) fn pack_quat_xyz(q: [f32; 4]) -> [u8; 3] {
    let norm = q.iter().map(|v| v * v).sum::<f32>().sqrt();
    let sign = if q[3] < 0.0 { -1.0 } else { 1.0 };
    let scale = sign * 127.5 / norm;
    [
        clamp_u8(q[0] * scale + 127.5),
        clamp_u8(q[1] * scale + 127.5),
        clamp_u8(q[2] * scale + 127.5),
    ]
}

pub(crate) fn pack_quat_u8(q: [f32; 4]) -> [u8; 4] {
    q.map(|v| clamp_u8(v * 127.5 + 127.5))
}
