/*
    Argus: filter-based visual-inertial state estimation
    Copyright (C) 2026 Argus Contributors

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::linalg::DVector;

/// Pinhole camera model exposed to the measurement builders.
///
/// Not a state variable: when online intrinsic calibration is enabled, the
/// manager mirrors the freshly-estimated calibration vector
/// `[fx, fy, cx, cy, d1, d2, d3, d4]` into this object after every update.
#[derive(Debug, Clone)]
pub struct PinholeCamera {
    width: u32,
    height: u32,
    values: DVector<f64>,
}

impl PinholeCamera {
    /// A camera with the given image size and intrinsics vector.
    pub fn new(width: u32, height: u32, values: DVector<f64>) -> Self {
        assert_eq!(values.nrows(), 8);
        Self {
            width,
            height,
            values,
        }
    }

    /// Overwrites the intrinsics vector.
    pub fn set_value(&mut self, values: &DVector<f64>) {
        assert_eq!(values.nrows(), 8);
        self.values.copy_from(values);
    }

    /// The intrinsics vector `[fx, fy, cx, cy, d1, d2, d3, d4]`.
    pub fn value(&self) -> &DVector<f64> {
        &self.values
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}
