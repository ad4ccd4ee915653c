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

use super::{PoseJpl, VarRef, Variable, VectorVar};
use crate::linalg::{DVector, Matrix3, Vector3, Vector4};

/// The active inertial error-state: pose, velocity, gyro and accel biases.
///
/// 15 error-state dof over a 16-dimensional value
/// `[q(4); p(3); v(3); bg(3); ba(3)]`. The pose (and through it the
/// orientation and position) stays addressable as a sub-variable so clones
/// and measurement orderings can reference it directly.
#[derive(Debug)]
pub struct ImuState {
    id: Option<usize>,
    pose: Arc<RwLock<PoseJpl>>,
    v: Arc<RwLock<VectorVar>>,
    bg: Arc<RwLock<VectorVar>>,
    ba: Arc<RwLock<VectorVar>>,
}

impl ImuState {
    /// Identity pose, zero velocity and zero biases.
    pub fn new() -> Self {
        Self {
            id: None,
            pose: Arc::new(RwLock::new(PoseJpl::new())),
            v: Arc::new(RwLock::new(VectorVar::new(3))),
            bg: Arc::new(RwLock::new(VectorVar::new(3))),
            ba: Arc::new(RwLock::new(VectorVar::new(3))),
        }
    }

    /// Handle to the pose sub-variable.
    pub fn pose(&self) -> Arc<RwLock<PoseJpl>> {
        Arc::clone(&self.pose)
    }

    /// Handle to the velocity sub-variable.
    pub fn v(&self) -> Arc<RwLock<VectorVar>> {
        Arc::clone(&self.v)
    }

    /// Handle to the gyro bias sub-variable.
    pub fn bg(&self) -> Arc<RwLock<VectorVar>> {
        Arc::clone(&self.bg)
    }

    /// Handle to the accel bias sub-variable.
    pub fn ba(&self) -> Arc<RwLock<VectorVar>> {
        Arc::clone(&self.ba)
    }

    /// The orientation as `[x, y, z, w]`.
    pub fn quat(&self) -> Vector4<f64> {
        self.pose.read().quat()
    }

    /// The position.
    pub fn pos(&self) -> Vector3<f64> {
        self.pose.read().pos()
    }

    /// The linear velocity.
    pub fn vel(&self) -> Vector3<f64> {
        let v = self.v.read().value();
        Vector3::new(v[0], v[1], v[2])
    }

    /// The gyro bias.
    pub fn bias_g(&self) -> Vector3<f64> {
        let bg = self.bg.read().value();
        Vector3::new(bg[0], bg[1], bg[2])
    }

    /// The accel bias.
    pub fn bias_a(&self) -> Vector3<f64> {
        let ba = self.ba.read().value();
        Vector3::new(ba[0], ba[1], ba[2])
    }

    /// The rotation matrix of the orientation.
    pub fn rot(&self) -> Matrix3<f64> {
        self.pose.read().rot()
    }
}

impl Default for ImuState {
    fn default() -> Self {
        Self::new()
    }
}

impl Variable for ImuState {
    fn id(&self) -> Option<usize> {
        self.id
    }

    fn set_local_id(&mut self, id: Option<usize>) {
        self.id = id;
        self.pose.write().set_local_id(id);
        self.v.write().set_local_id(id.map(|i| i + 6));
        self.bg.write().set_local_id(id.map(|i| i + 9));
        self.ba.write().set_local_id(id.map(|i| i + 12));
    }

    fn size(&self) -> usize {
        15
    }

    fn value(&self) -> DVector<f64> {
        let mut value = DVector::zeros(16);
        value.rows_mut(0, 7).copy_from(&self.pose.read().value());
        value.rows_mut(7, 3).copy_from(&self.v.read().value());
        value.rows_mut(10, 3).copy_from(&self.bg.read().value());
        value.rows_mut(13, 3).copy_from(&self.ba.read().value());
        value
    }

    fn set_value(&mut self, value: &DVector<f64>) {
        assert_eq!(value.nrows(), 16);
        self.pose.write().set_value(&value.rows(0, 7).into_owned());
        self.v.write().set_value(&value.rows(7, 3).into_owned());
        self.bg.write().set_value(&value.rows(10, 3).into_owned());
        self.ba.write().set_value(&value.rows(13, 3).into_owned());
    }

    fn update(&mut self, dx: &DVector<f64>) {
        assert_eq!(dx.nrows(), self.size());
        self.pose.write().update(&dx.rows(0, 6).into_owned());
        self.v.write().update(&dx.rows(6, 3).into_owned());
        self.bg.write().update(&dx.rows(9, 3).into_owned());
        self.ba.write().update(&dx.rows(12, 3).into_owned());
    }

    fn clone_variable(&self) -> VarRef {
        let mut cloned = ImuState::new();
        cloned.set_value(&self.value());
        Arc::new(RwLock::new(cloned))
    }

    fn check_if_subvariable(&self, check: &VarRef) -> Option<VarRef> {
        let pose: VarRef = self.pose.clone();
        if Arc::ptr_eq(&pose, check) {
            return Some(pose);
        }
        if let Some(sub) = self.pose.read().check_if_subvariable(check) {
            return Some(sub);
        }
        for component in [&self.v, &self.bg, &self.ba] {
            let var: VarRef = component.clone();
            if Arc::ptr_eq(&var, check) {
                return Some(var);
            }
        }
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod ut_imu {
    use super::*;

    #[test]
    fn component_offsets_follow_the_block_layout() {
        let mut imu = ImuState::new();
        imu.set_local_id(Some(0));
        assert_eq!(imu.pose().read().id(), Some(0));
        assert_eq!(imu.pose().read().p().read().id(), Some(3));
        assert_eq!(imu.v().read().id(), Some(6));
        assert_eq!(imu.bg().read().id(), Some(9));
        assert_eq!(imu.ba().read().id(), Some(12));
    }

    #[test]
    fn subvariable_lookup_reaches_nested_components() {
        let imu = ImuState::new();
        let pose: VarRef = imu.pose();
        let q: VarRef = imu.pose().read().q();
        let ba: VarRef = imu.ba();
        assert!(imu.check_if_subvariable(&pose).is_some());
        assert!(imu.check_if_subvariable(&q).is_some());
        assert!(imu.check_if_subvariable(&ba).is_some());

        let foreign: VarRef = ImuState::new().v();
        assert!(imu.check_if_subvariable(&foreign).is_none());
    }
}
