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
use crate::linalg::DVector;

/// Plain vector variable: positions, velocities, biases, time offsets.
///
/// The error state and the value coincide, so the boxplus is addition.
#[derive(Debug, Clone)]
pub struct VectorVar {
    id: Option<usize>,
    value: DVector<f64>,
}

impl VectorVar {
    /// A zero vector variable of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self {
            id: None,
            value: DVector::zeros(dim),
        }
    }

    /// A vector variable initialized to `value`.
    pub fn from_value(value: DVector<f64>) -> Self {
        Self { id: None, value }
    }
}

impl Variable for VectorVar {
    fn id(&self) -> Option<usize> {
        self.id
    }

    fn set_local_id(&mut self, id: Option<usize>) {
        self.id = id;
    }

    fn size(&self) -> usize {
        self.value.nrows()
    }

    fn value(&self) -> DVector<f64> {
        self.value.clone()
    }

    fn set_value(&mut self, value: &DVector<f64>) {
        assert_eq!(value.nrows(), self.value.nrows());
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
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
