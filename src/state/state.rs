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

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::StateOptions;
use crate::linalg::DMatrix;
use crate::time::Epoch;
use crate::types::{ImuState, Landmark, PinholeCamera, VarRef, Variable, VectorVar};

/// The aggregate error state of the filter.
///
/// Owns the ordered variables, the dense covariance, the sliding window of
/// pose clones and the SLAM landmarks. Layout invariant: the variables tile
/// the covariance contiguously, `variables[0]` at row 0 and each next one
/// starting where the previous ended.
///
/// Only structural events (cloning, initialization, marginalization) change
/// the layout; propagation and updates touch values and covariance only.
pub struct State {
    /// Current estimator time.
    pub timestamp: Epoch,
    /// Manager options.
    pub options: StateOptions,
    /// The active inertial error-state, always the first variable.
    pub imu: Arc<RwLock<ImuState>>,
    /// Ordered variables tiling the covariance.
    pub variables: Vec<VarRef>,
    /// Dense covariance of the error state.
    pub cov: DMatrix<f64>,
    /// Sliding window of cloned IMU poses keyed by their clone time.
    pub clones_imu: BTreeMap<Epoch, VarRef>,
    /// SLAM landmarks keyed by feature id.
    pub features_slam: BTreeMap<usize, Arc<RwLock<Landmark>>>,
    /// Camera-to-IMU time offset in seconds; attached iff being calibrated.
    pub calib_dt_imu_cam: Arc<RwLock<VectorVar>>,
    /// Per-camera intrinsic calibration vectors; attached iff being calibrated.
    pub calib_cam_intrinsics: BTreeMap<usize, Arc<RwLock<VectorVar>>>,
    /// Camera models kept in sync with the calibration vectors after updates.
    pub cam_intrinsics_cameras: BTreeMap<usize, Arc<RwLock<PinholeCamera>>>,
    /// Serializes structural mutations against external readers of the maps.
    pub mutex_state: Arc<Mutex<()>>,
}

impl State {
    /// Initializes a state with the inertial error-state first, followed by
    /// whichever calibration variables the options put online.
    pub fn new(options: StateOptions) -> Self {
        let mut variables: Vec<VarRef> = Vec::new();
        let mut current_id = 0;

        let imu = Arc::new(RwLock::new(ImuState::new()));
        imu.write().set_local_id(Some(current_id));
        current_id += imu.read().size();
        let imu_var: VarRef = imu.clone();
        variables.push(imu_var);

        let calib_dt_imu_cam = Arc::new(RwLock::new(VectorVar::new(1)));
        if options.do_calib_camera_timeoffset {
            calib_dt_imu_cam.write().set_local_id(Some(current_id));
            current_id += calib_dt_imu_cam.read().size();
            let dt_var: VarRef = calib_dt_imu_cam.clone();
            variables.push(dt_var);
        }

        let mut calib_cam_intrinsics = BTreeMap::new();
        for cam_id in 0..options.num_cameras {
            let intrinsics = Arc::new(RwLock::new(VectorVar::new(8)));
            if options.do_calib_camera_intrinsics {
                intrinsics.write().set_local_id(Some(current_id));
                current_id += intrinsics.read().size();
                let intrinsics_var: VarRef = intrinsics.clone();
                variables.push(intrinsics_var);
            }
            calib_cam_intrinsics.insert(cam_id, intrinsics);
        }

        // Small prior; real priors arrive through set_initial_covariance.
        let cov = DMatrix::<f64>::identity(current_id, current_id) * 1e-3;

        Self {
            timestamp: Epoch::from_tai_seconds(0.0),
            options,
            imu,
            variables,
            cov,
            clones_imu: BTreeMap::new(),
            features_slam: BTreeMap::new(),
            calib_dt_imu_cam,
            calib_cam_intrinsics,
            cam_intrinsics_cameras: BTreeMap::new(),
            mutex_state: Arc::new(Mutex::new(())),
        }
    }

    /// The clone time that should be marginalized next: the oldest one.
    pub fn margtimestep(&self) -> Option<Epoch> {
        self.clones_imu.keys().next().copied()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "State at {} with {} variables ({} clones, {} SLAM features), covariance {}x{}",
            self.timestamp,
            self.variables.len(),
            self.clones_imu.len(),
            self.features_slam.len(),
            self.cov.nrows(),
            self.cov.ncols()
        )
    }
}

#[cfg(test)]
mod ut_state {
    use super::*;

    #[test]
    fn layout_is_contiguous_for_every_option_mix() {
        for (timeoffset, intrinsics, expected) in [
            (false, false, 15),
            (true, false, 16),
            (false, true, 23),
            (true, true, 24),
        ] {
            let state = State::new(StateOptions {
                do_calib_camera_timeoffset: timeoffset,
                do_calib_camera_intrinsics: intrinsics,
                ..Default::default()
            });
            assert_eq!(state.cov.nrows(), expected);
            let mut next_id = 0;
            for var in &state.variables {
                assert_eq!(var.read().id(), Some(next_id));
                next_id += var.read().size();
            }
            assert_eq!(next_id, state.cov.nrows());
        }
    }

    #[test]
    fn margtimestep_is_the_oldest_clone() {
        let mut state = State::new(StateOptions::default());
        assert_eq!(state.margtimestep(), None);
        let late: VarRef = Arc::new(RwLock::new(crate::types::PoseJpl::new()));
        let early: VarRef = Arc::new(RwLock::new(crate::types::PoseJpl::new()));
        state.clones_imu.insert(Epoch::from_tai_seconds(2.0), late);
        state.clones_imu.insert(Epoch::from_tai_seconds(1.0), early);
        assert_eq!(state.margtimestep(), Some(Epoch::from_tai_seconds(1.0)));
    }
}
