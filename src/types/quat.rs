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

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{VarRef, Variable};
use crate::linalg::{DVector, Matrix3, Vector3, Vector4};
use crate::utils::{quat_multiply, quat_normalize, rot_from_quat, small_angle_quat};

/// JPL-convention unit quaternion, stored `[x, y, z, w]`.
///
/// The error state is the 3-dof small-angle rotation; `update` composes the
/// correction on the left, `q ← δq(dx) ⊗ q`.
#[derive(Debug, Clone)]
pub struct QuatJpl {
    id: Option<usize>,
    value: Vector4<f64>,
}

impl QuatJpl {
    /// The identity rotation.
    pub fn new() -> Self {
        Self {
            id: None,
            value: Vector4::new(0.0, 0.0, 0.0, 1.0),
        }
    }

    /// A quaternion variable from a (not necessarily normalized) `[x, y, z, w]`.
    pub fn from_value(value: Vector4<f64>) -> Self {
        Self {
            id: None,
            value: quat_normalize(&value),
        }
    }

    /// The quaternion as `[x, y, z, w]`.
    pub fn quat(&self) -> Vector4<f64> {
        self.value
    }

    /// The equivalent rotation matrix.
    pub fn rot(&self) -> Matrix3<f64> {
        rot_from_quat(&self.value)
    }
}

impl Default for QuatJpl {
    fn default() -> Self {
        Self::new()
    }
}

impl Variable for QuatJpl {
    fn id(&self) -> Option<usize> {
        self.id
    }

    fn set_local_id(&mut self, id: Option<usize>) {
        self.id = id;
    }

    fn size(&self) -> usize {
        3
    }

    fn value(&self) -> DVector<f64> {
        DVector::from_column_slice(self.value.as_slice())
    }

    fn set_value(&mut self, value: &DVector<f64>) {
        assert_eq!(value.nrows(), 4);
        self.value = Vector4::new(value[0], value[1], value[2], value[3]);
    }

    fn update(&mut self, dx: &DVector<f64>) {
        assert_eq!(dx.nrows(), self.size());
        let dq = small_angle_quat(&Vector3::new(dx[0], dx[1], dx[2]));
        self.value = quat_multiply(&dq, &self.value);
    }

    fn clone_variable(&self) -> VarRef {
        Arc::new(RwLock::new(Self {
            id: None,
            value: self.value,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
