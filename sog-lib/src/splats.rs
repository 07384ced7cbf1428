//! The decoded splat collection and its lifetime rules.
//!
//! All attribute arrays live in one arena owned by [`SogDataV2`]. The arena is
//! released by [`SogDataV2::dispose`] (or by [`SogDataV2::scoped`] on scope
//! exit). Reads after disposal and a second disposal are errors.

use glam::{Quat, Vec3, Vec4};

use crate::error::{SogError, SogResult};

const POSITION_DIM: usize = 3;
const SCALE_DIM: usize = 3;
const ROTATION_DIM: usize = 4;
const COLOR_DIM: usize = 4;
const OPACITY_DIM: usize = 1;
const FIXED_DIM: usize = POSITION_DIM + SCALE_DIM + ROTATION_DIM + COLOR_DIM + OPACITY_DIM;

/// Start of each attribute inside the arena, in floats.
#[derive(Debug, Clone, Copy)]
struct ArenaLayout {
    count: usize,
    sh_coeffs: usize,
}

impl ArenaLayout {
    fn total(self) -> Option<usize> {
        self.count.checked_mul(FIXED_DIM.checked_add(self.sh_coeffs)?)
    }

    fn split(self, data: &[f32]) -> [&[f32]; 6] {
        let n = self.count;
        let (positions, rest) = data.split_at(n * POSITION_DIM);
        let (scales, rest) = rest.split_at(n * SCALE_DIM);
        let (rotations, rest) = rest.split_at(n * ROTATION_DIM);
        let (colors, rest) = rest.split_at(n * COLOR_DIM);
        let (opacities, sh) = rest.split_at(n * OPACITY_DIM);
        [positions, scales, rotations, colors, opacities, sh]
    }

    fn split_mut(self, data: &mut [f32]) -> SplatSlicesMut<'_> {
        let n = self.count;
        let (positions, rest) = data.split_at_mut(n * POSITION_DIM);
        let (scales, rest) = rest.split_at_mut(n * SCALE_DIM);
        let (rotations, rest) = rest.split_at_mut(n * ROTATION_DIM);
        let (colors, rest) = rest.split_at_mut(n * COLOR_DIM);
        let (opacities, sh) = rest.split_at_mut(n * OPACITY_DIM);
        SplatSlicesMut {
            positions,
            scales,
            rotations,
            colors,
            opacities,
            sh,
        }
    }
}

pub(crate) struct SplatSlicesMut<'a> {
    pub positions: &'a mut [f32],
    pub scales: &'a mut [f32],
    pub rotations: &'a mut [f32],
    pub colors: &'a mut [f32],
    pub opacities: &'a mut [f32],
    pub sh: &'a mut [f32],
}

/// Scratch storage the decoder fills before handing it over as a [`SogDataV2`].
pub(crate) struct SplatArena {
    layout: ArenaLayout,
    data: Box<[f32]>,
}

impl SplatArena {
    /// Zeroed storage for `count` splats. Fails instead of aborting when the
    /// allocation cannot be made.
    pub(crate) fn new(count: usize, sh_coeffs: usize) -> SogResult<Self> {
        let layout = ArenaLayout { count, sh_coeffs };
        let total = layout.total().ok_or(SogError::AllocationFailed {
            requested: usize::MAX,
        })?;
        let mut data = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|_| SogError::AllocationFailed {
                requested: total.saturating_mul(std::mem::size_of::<f32>()),
            })?;
        data.resize(total, 0.0);
        Ok(Self {
            layout,
            data: data.into_boxed_slice(),
        })
    }

    pub(crate) fn slices_mut(&mut self) -> SplatSlicesMut<'_> {
        self.layout.split_mut(&mut self.data)
    }
}

/// A decoded SOG v2 scene.
///
/// Must be released with [`dispose`](Self::dispose) exactly once. Prefer
/// [`scoped`](Self::scoped), which releases it on every exit path.
#[derive(Debug)]
pub struct SogDataV2 {
    layout: ArenaLayout,
    sh_degree: u32,
    antialiased: bool,
    arena: Option<Box<[f32]>>,
}

/// Borrowed, index-aligned attribute arrays of a live [`SogDataV2`].
#[derive(Debug, Clone, Copy)]
pub struct SplatView<'a> {
    pub count: usize,
    pub sh_degree: u32,
    pub antialiased: bool,
    /// xyz per splat.
    pub positions: &'a [f32],
    /// Linear xyz scale per splat.
    pub scales: &'a [f32],
    /// Unit quaternion per splat, stored (x, y, z, w).
    pub rotations: &'a [f32],
    /// RGBA in `[0, 1]` per splat.
    pub colors: &'a [f32],
    /// Opacity in `[0, 1]` per splat.
    pub opacities: &'a [f32],
    /// Higher order SH coefficients, `sh_coeffs_per_splat()` floats per splat.
    pub sh: &'a [f32],
}

/// One splat's attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splat {
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: Quat,
    pub color: Vec4,
    pub opacity: f32,
}

impl<'a> SplatView<'a> {
    pub fn sh_coeffs_per_splat(&self) -> usize {
        if self.count == 0 {
            0
        } else {
            self.sh.len() / self.count
        }
    }

    pub fn splat(&self, i: usize) -> Option<Splat> {
        if i >= self.count {
            return None;
        }
        Some(Splat {
            position: Vec3::from_slice(&self.positions[i * POSITION_DIM..]),
            scale: Vec3::from_slice(&self.scales[i * SCALE_DIM..]),
            rotation: Quat::from_slice(&self.rotations[i * ROTATION_DIM..]),
            color: Vec4::from_slice(&self.colors[i * COLOR_DIM..]),
            opacity: self.opacities[i],
        })
    }

    pub fn splats(&self) -> impl Iterator<Item = Splat> + 'a {
        let view = *self;
        (0..view.count).filter_map(move |i| view.splat(i))
    }

    /// Higher order SH of splat `i`, or `None` past the end.
    pub fn sh_of(&self, i: usize) -> Option<&'a [f32]> {
        if i >= self.count {
            return None;
        }
        let per = self.sh_coeffs_per_splat();
        self.sh.get(i * per..(i + 1) * per)
    }
}

impl SogDataV2 {
    pub(crate) fn from_arena(arena: SplatArena, sh_degree: u32, antialiased: bool) -> Self {
        Self {
            layout: arena.layout,
            sh_degree,
            antialiased,
            arena: Some(arena.data),
        }
    }

    pub fn count(&self) -> SogResult<usize> {
        self.live()?;
        Ok(self.layout.count)
    }

    pub fn sh_degree(&self) -> SogResult<u32> {
        self.live()?;
        Ok(self.sh_degree)
    }

    pub fn antialiased(&self) -> SogResult<bool> {
        self.live()?;
        Ok(self.antialiased)
    }

    pub fn is_disposed(&self) -> bool {
        self.arena.is_none()
    }

    pub fn view(&self) -> SogResult<SplatView<'_>> {
        let data = self.live()?;
        let [positions, scales, rotations, colors, opacities, sh] = self.layout.split(data);
        Ok(SplatView {
            count: self.layout.count,
            sh_degree: self.sh_degree,
            antialiased: self.antialiased,
            positions,
            scales,
            rotations,
            colors,
            opacities,
            sh,
        })
    }

    pub fn positions(&self) -> SogResult<&[f32]> {
        Ok(self.view()?.positions)
    }

    pub fn scales(&self) -> SogResult<&[f32]> {
        Ok(self.view()?.scales)
    }

    pub fn rotations(&self) -> SogResult<&[f32]> {
        Ok(self.view()?.rotations)
    }

    pub fn colors(&self) -> SogResult<&[f32]> {
        Ok(self.view()?.colors)
    }

    pub fn opacities(&self) -> SogResult<&[f32]> {
        Ok(self.view()?.opacities)
    }

    pub fn sh(&self) -> SogResult<&[f32]> {
        Ok(self.view()?.sh)
    }

    /// Frees the backing arena. Calling it again returns [`SogError::DoubleDispose`].
    pub fn dispose(&mut self) -> SogResult<()> {
        match self.arena.take() {
            Some(arena) => {
                drop(arena);
                Ok(())
            }
            None => Err(SogError::DoubleDispose),
        }
    }

    /// Runs `f` on the live data and disposes it afterwards, including when `f` panics.
    pub fn scoped<R>(self, f: impl FnOnce(SplatView<'_>) -> R) -> SogResult<R> {
        let guard = DisposeOnExit(self);
        let view = guard.0.view()?;
        Ok(f(view))
    }

    fn live(&self) -> SogResult<&[f32]> {
        self.arena.as_deref().ok_or(SogError::UseAfterDispose)
    }
}

impl Drop for SogDataV2 {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && self.arena.is_some() {
            tracing::warn!(
                count = self.layout.count,
                "SogDataV2 dropped without dispose(), releasing it implicitly"
            );
        }
    }
}

struct DisposeOnExit(SogDataV2);

impl Drop for DisposeOnExit {
    fn drop(&mut self) {
        if !self.0.is_disposed() {
            let _ = self.0.dispose();
        }
    }
}
