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

/*! # argus

[Argus](https://en.wikipedia.org/wiki/Argus_Panoptes): the state-manager core
of a sliding-window visual-inertial extended Kalman filter.

The crate owns the aggregate error state and its covariance, and provides the
algebraic primitives every EKF-based estimator is built from: propagation,
compressed measurement updates, pose cloning (stochastic augmentation),
marginalization, and delayed initialization of new variables with a
Mahalanobis gate. IMU integration, feature tracking and Jacobian construction
live upstream and hand this crate their matrices.
*/

/// State variable kinds addressable inside the error-state vector.
pub mod types;

/// The aggregate filter state and the manager primitives that mutate it.
pub mod state;

/// Statistics support for measurement gating.
pub mod stats;

/// Utility functions shared by different modules, and which may be useful to estimator authors.
pub mod utils;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub mod prelude {
    pub use crate::state::helper;
    pub use crate::state::{State, StateError, StateOptions};
    pub use crate::types::*;

    pub use crate::time::Epoch;
}
