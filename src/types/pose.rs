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

use super::{QuatJpl, VarRef, Variable, VectorVar};
use crate::linalg::{DVector, Matrix3, Vector3, Vector4};

/// 6-dof pose: a JPL orientation followed by a position.
///
/// The components are variables in their own right so that measurement
/// orderings can reference the orientation or the position alone; their
/// covariance offsets track the pose offset (`q` at `id`, `p` at `id + 3`).
#[derive(Debug)]
pub struct PoseJpl {
    id: Option<usize>,
    q: Arc<RwLock<QuatJpl>>,
    p: Arc<RwLock<VectorVar>>,
}

impl PoseJpl {
    /// The identity pose.
    pub fn new() -> Self {
        Self {
            id: None,
            q: Arc::new(RwLock::new(QuatJpl::new())),
            p: Arc::new(RwLock::new(VectorVar::new(3))),
        }
    }

    /// A pose from an `[x, y, z, w]` orientation and a position.
    pub fn from_parts(quat: Vector4<f64>, pos: Vector3<f64>) -> Self {
        Self {
            id: None,
            q: Arc::new(RwLock::new(QuatJpl::from_value(quat))),
            p: Arc::new(RwLock::new(VectorVar::from_value(
                DVector::from_column_slice(pos.as_slice()),
            ))),
        }
    }

    /// Handle to the orientation component.
    pub fn q(&self) -> Arc<RwLock<QuatJpl>> {
        Arc::clone(&self.q)
    }

    /// Handle to the position component.
    pub fn p(&self) -> Arc<RwLock<VectorVar>> {
        Arc::clone(&self.p)
    }

    /// The orientation as `[x, y, z, w]`.
    pub fn quat(&self) -> Vector4<f64> {
        self.q.read().quat()
    }

    /// The position.
    pub fn pos(&self) -> Vector3<f64> {
        let p = self.p.read().value();
        Vector3::new(p[0], p[1], p[2])
    }

    /// The rotation matrix of the orientation.
    pub fn rot(&self) -> Matrix3<f64> {
        self.q.read().rot()
    }
}

impl Default for PoseJpl {
    fn default() -> Self {
        Self::new()
    }
}

impl Variable for PoseJpl {
    fn id(&self) -> Option<usize> {
        self.id
    }

    fn set_local_id(&mut self, id: Option<usize>) {
        self.id = id;
        self.q.write().set_local_id(id);
        self.p.write().set_local_id(id.map(|i| i + 3));
    }

    fn size(&self) -> usize {
        6
    }

    fn value(&self) -> DVector<f64> {
        let q = self.q.read().value();
        let p = self.p.read().value();
        let mut value = DVector::zeros(7);
        value.rows_mut(0, 4).copy_from(&q);
        value.rows_mut(4, 3).copy_from(&p);
        value
    }

    fn set_value(&mut self, value: &DVector<f64>) {
        assert_eq!(value.nrows(), 7);
        self.q.write().set_value(&value.rows(0, 4).into_owned());
        self.p.write().set_value(&value.rows(4, 3).into_owned());
    }

    fn update(&mut self, dx: &DVector<f64>) {
        assert_eq!(dx.nrows(), self.size());
        self.q.write().update(&dx.rows(0, 3).into_owned());
        self.p.write().update(&dx.rows(3, 3).into_owned());
    }

    fn clone_variable(&self) -> VarRef {
        let mut cloned = PoseJpl::new();
        cloned.set_value(&self.value());
        Arc::new(RwLock::new(cloned))
    }

    fn check_if_subvariable(&self, check: &VarRef) -> Option<VarRef> {
        let q: VarRef = self.q.clone();
        if Arc::ptr_eq(&q, check) {
            return Some(q);
        }
        let p: VarRef = self.p.clone();
        if Arc::ptr_eq(&p, check) {
            return Some(p);
        }
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod ut_pose {
    use super::*;

    #[test]
    fn components_track_the_pose_offset() {
        let mut pose = PoseJpl::new();
        pose.set_local_id(Some(12));
        assert_eq!(pose.q().read().id(), Some(12));
        assert_eq!(pose.p().read().id(), Some(15));
        pose.set_local_id(None);
        assert_eq!(pose.q().read().id(), None);
        assert_eq!(pose.p().read().id(), None);
    }

    #[test]
    fn clone_copies_the_value_but_not_the_handles() {
        let pose = PoseJpl::from_parts(
            Vector4::new(0.0, 0.0, 0.0, 1.0),
            Vector3::new(1.0, 2.0, 3.0),
        );
        let cloned = pose.clone_variable();
        assert_eq!(cloned.read().value(), pose.value());
        assert_eq!(cloned.read().id(), None);

        let original_q: VarRef = pose.q();
        assert!(cloned.read().check_if_subvariable(&original_q).is_none());
    }

    #[test]
    fn subvariable_lookup_finds_both_components() {
        let pose = PoseJpl::new();
        let q: VarRef = pose.q();
        let p: VarRef = pose.p();
        assert!(pose.check_if_subvariable(&q).is_some());
        assert!(pose.check_if_subvariable(&p).is_some());

        let other: VarRef = PoseJpl::new().q();
        assert!(pose.check_if_subvariable(&other).is_none());
    }
}
