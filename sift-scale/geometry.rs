use nalgebra::{Matrix3, Vector3};

use crate::dog::DogPyramid;
use crate::error::{SiftError, SiftResult};

/// First and second order finite differences of the DoG response at one sample.
///
/// Axes are ordered `(x, y, s)`: column, row and interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalGeometry {
    pub value: f64,
    pub gradient: Vector3<f64>,
    pub hessian: Matrix3<f64>,
}

impl LocalGeometry {
    /// Central differences around `(interval, row, col)`.
    ///
    /// The sample needs a neighbour on both sides along every axis, otherwise
    /// `OutOfBounds` is returned.
    pub fn at(
        dog: &DogPyramid,
        octave: usize,
        interval: usize,
        row: usize,
        col: usize,
    ) -> SiftResult<Self> {
        let out_of_bounds = SiftError::OutOfBounds {
            octave,
            interval,
            row,
            col,
        };
        if octave >= dog.octave_count() {
            return Err(out_of_bounds);
        }
        let (w, h) = dog.dimensions(octave);
        if interval < 1
            || interval + 1 >= dog.interval_count()
            || row < 1
            || row + 1 >= h
            || col < 1
            || col + 1 >= w
        {
            return Err(out_of_bounds);
        }

        let d = |ds: isize, dr: isize, dc: isize| -> f64 {
            dog.value(
                octave,
                (interval as isize + ds) as usize,
                (row as isize + dr) as usize,
                (col as isize + dc) as usize,
            ) as f64
        };

        let v = d(0, 0, 0);

        let dx = (d(0, 0, 1) - d(0, 0, -1)) / 2.0;
        let dy = (d(0, 1, 0) - d(0, -1, 0)) / 2.0;
        let ds = (d(1, 0, 0) - d(-1, 0, 0)) / 2.0;

        let dxx = d(0, 0, 1) + d(0, 0, -1) - 2.0 * v;
        let dyy = d(0, 1, 0) + d(0, -1, 0) - 2.0 * v;
        let dss = d(1, 0, 0) + d(-1, 0, 0) - 2.0 * v;
        let dxy = (d(0, 1, 1) - d(0, 1, -1) - d(0, -1, 1) + d(0, -1, -1)) / 4.0;
        let dxs = (d(1, 0, 1) - d(1, 0, -1) - d(-1, 0, 1) + d(-1, 0, -1)) / 4.0;
        let dys = (d(1, 1, 0) - d(1, -1, 0) - d(-1, 1, 0) + d(-1, -1, 0)) / 4.0;

        #[rustfmt::skip]
        let hessian = Matrix3::new(
            dxx, dxy, dxs,
            dxy, dyy, dys,
            dxs, dys, dss,
        );

        Ok(Self {
            value: v,
            gradient: Vector3::new(dx, dy, ds),
            hessian,
        })
    }

    /// Offset `x` to the extremum of the quadratic fit, solving `H x = -g`.
    ///
    /// `None` when the Hessian is singular.
    pub fn offset(&self) -> Option<Vector3<f64>> {
        let inv = self.hessian.try_inverse()?;
        let x = -(inv * self.gradient);
        x.iter().all(|v| v.is_finite()).then_some(x)
    }

    /// Taylor estimate of the response at `value + offset`
    pub fn interpolated_contrast(&self, offset: &Vector3<f64>) -> f64 {
        self.value + 0.5 * self.gradient.dot(offset)
    }

    /// Principal curvature ratio test on the spatial 2x2 block.
    ///
    /// Passes when the curvatures share a sign and `tr^2 / det < (r + 1)^2 / r`.
    pub fn passes_edge_test(&self, curvature_threshold: f64) -> bool {
        let dxx = self.hessian[(0, 0)];
        let dyy = self.hessian[(1, 1)];
        let dxy = self.hessian[(0, 1)];

        let tr = dxx + dyy;
        let det = dxx * dyy - dxy * dxy;
        if det <= 0.0 {
            return false;
        }
        let r = curvature_threshold;
        tr * tr / det < (r + 1.0) * (r + 1.0) / r
    }
}
