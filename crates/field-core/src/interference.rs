use crate::error::{FieldError, Result};
use crate::{sampling, Field, GridPoint};
use ndarray::{s, Array2};
use num_complex::Complex64;
use std::f64::consts::PI;
use tracing::{debug, trace};

/// Pressure grids over the `(2r + 1) × (2r + 1)` box around a disc,
/// indexed by offset from the box corner `(cx − r, cy − r)`. Cells outside
/// the disc or the field are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfInterference {
    /// Sum of `combined` over the box.
    pub residual: Complex64,
    /// `positive + negative`.
    pub combined: Array2<Complex64>,
    /// Field at phase 0.
    pub positive: Array2<Complex64>,
    /// Field at phase π, mirrored along x.
    pub negative: Array2<Complex64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cancellation {
    pub residual: Complex64,
    pub combined: Array2<Complex64>,
    /// `|residual| / |Σ positive|`.
    ///
    /// The mirror only reorders the box, so `Σ negative = −Σ positive` and
    /// the ratio sits at rounding level for every field. How well a
    /// particular observer cancels is read from `combined`.
    pub ratio: f64,
}

impl Field {
    /// Superpose the field with its phase-inverted mirror image over the
    /// disc of `radius` around `center`.
    ///
    /// The anti-field is the field at phase π mirrored across the box's x
    /// axis, so the observer at box row `i` is paired with row `2r − i`.
    /// Existing transfer tables are used; none are built.
    pub fn self_interference(&self, center: GridPoint, radius: usize) -> Result<SelfInterference> {
        interfere(center, radius, self.size(), |point, phase| {
            self.total_pressure(point, phase)
        })
    }

    /// [`Field::self_interference`], building transfer tables for every
    /// source depth the disc needs first.
    pub fn self_interference_building_cache(
        &mut self,
        center: GridPoint,
        radius: usize,
    ) -> Result<SelfInterference> {
        let size = self.size();
        interfere(center, radius, size, |point, phase| {
            self.total_pressure_building_cache(point, phase)
        })
    }

    /// Residual of [`Field::self_interference`] relative to the
    /// uninterfered field over the same disc.
    pub fn cancellation(&self, center: GridPoint, radius: usize) -> Result<Cancellation> {
        let SelfInterference {
            residual,
            combined,
            positive,
            ..
        } = self.self_interference(center, radius)?;

        let reference = positive.sum().norm();
        if reference == 0.0 {
            return Err(FieldError::NoReferencePressure);
        }
        Ok(Cancellation {
            residual,
            combined,
            ratio: residual.norm() / reference,
        })
    }
}

/// Side of the observer box, if a `side × side` grid of pressures can be
/// addressed at all.
fn box_side(radius: usize) -> Option<usize> {
    let side = radius.checked_mul(2)?.checked_add(1)?;
    let bytes = side
        .checked_mul(side)?
        .checked_mul(std::mem::size_of::<Complex64>())?;
    (bytes <= isize::MAX as usize).then_some(side)
}

fn interfere(
    center: GridPoint,
    radius: usize,
    size: [usize; 3],
    mut pressure: impl FnMut(GridPoint, f64) -> Complex64,
) -> Result<SelfInterference> {
    let side = box_side(radius).ok_or(FieldError::RadiusTooLarge { radius })?;
    let observers = sampling::filled_disc(center, radius, size);
    let mut positive = Array2::<Complex64>::zeros((side, side));
    let mut negative = Array2::<Complex64>::zeros((side, side));

    // box_side bounds the radius well inside i64.
    let origin_x = center.x as i64 - radius as i64;
    let origin_y = center.y as i64 - radius as i64;
    for &point in &observers {
        let ix = (point.x as i64 - origin_x) as usize;
        let iy = (point.y as i64 - origin_y) as usize;
        let (p, n) = (pressure(point, 0.0), pressure(point, PI));
        trace!(?point, positive = %p, negative = %n, "observer sampled");
        positive[[ix, iy]] = p;
        negative[[ix, iy]] = n;
    }

    let negative = negative.slice(s![..;-1, ..]).to_owned();
    let combined = &positive + &negative;
    let residual = combined.sum();
    debug!(?center, radius, observers = observers.len(), residual = %residual, "self interference");

    Ok(SelfInterference {
        residual,
        combined,
        positive,
        negative,
    })
}
