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
use crate::linalg::{DVector, Vector3};

/// SLAM landmark: a 3-dof global position with feature bookkeeping.
#[derive(Debug, Clone)]
pub struct Landmark {
    id: Option<usize>,
    value: DVector<f64>,
    /// Feature id assigned by the tracker.
    pub feat_id: usize,
    /// Set by the SLAM manager once the landmark should leave the state.
    pub should_marg: bool,
}

impl Landmark {
    /// A landmark at the origin.
    pub fn new(feat_id: usize) -> Self {
        Self {
            id: None,
            value: DVector::zeros(3),
            feat_id,
            should_marg: false,
        }
    }

    /// A landmark at the given global position.
    pub fn from_xyz(feat_id: usize, xyz: Vector3<f64>) -> Self {
        Self {
            id: None,
            value: DVector::from_column_slice(xyz.as_slice()),
            feat_id,
            should_marg: false,
        }
    }

    /// The global position.
    pub fn xyz(&self) -> Vector3<f64> {
        Vector3::new(self.value[0], self.value[1], self.value[2])
    }
}

impl Variable for Landmark {
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
        self.value.clone()
    }

    fn set_value(&mut self, value: &DVector<f64>) {
        assert_eq!(value.nrows(), 3);
        self.value.copy_from(value);
    }

    fn update(&mut self, dx: &DVector<f64>) {
        assert_eq!(dx.nrows(), self.size());
        self.value += dx;
    }

    fn clone_variable(&self) -> VarRef {
        Arc::new(RwLock::new(Self {
            id: None,
            value: self.value.clone(),
            feat_id: self.feat_id,
            should_marg: self.should_marg,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
