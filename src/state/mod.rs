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

//! The aggregate filter state and the manager primitives over it.

use snafu::prelude::*;

use crate::time::Epoch;

/// The manager primitives: propagation, update, cloning, marginalization
/// and delayed initialization.
pub mod helper;

mod options;
mod state;

pub use options::{ConfigError, StateOptions};
pub use state::State;

/// Errors raised by the state manager.
///
/// Every variant except the Mahalanobis gate (which reports through the
/// boolean returned by [`helper::initialize`]) is fatal to the filter: there
/// is no local recovery, the caller decides whether to reset.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StateError {
    /// A propagation or update was requested with an empty variable ordering.
    #[snafu(display("called with an empty variable ordering"))]
    EmptyOrdering,

    /// The propagated block must be laid out in state order.
    #[snafu(display("propagation ordering is not contiguous in the covariance"))]
    NonContiguousOrdering,

    /// An ordering referenced a variable that is not attached to the state.
    #[snafu(display("ordering references a detached variable"))]
    DetachedVariable,

    /// The covariance lost positive semi-definiteness.
    #[snafu(display(
        "covariance diagonal entry {index} is negative ({value:.2e}) after {action}"
    ))]
    CovarianceNotPsd {
        action: &'static str,
        index: usize,
        value: f64,
    },

    /// The residual covariance could not be factorized.
    #[snafu(display("residual covariance is singular, cannot compute the gain"))]
    SingularResidualCovariance,

    /// The variable to clone is neither a state variable nor a sub-variable
    /// of one.
    #[snafu(display("variable to clone is not in the state"))]
    CloneSourceMissing,

    /// A pose clone already exists at this timestamp.
    #[snafu(display("a clone already exists at {epoch}"))]
    DuplicateClone { epoch: Epoch },

    /// The cloned variable did not come back as a pose.
    #[snafu(display("cloned variable is not a pose"))]
    CloneNotAPose,

    /// The variable to initialize is already part of the state.
    #[snafu(display("variable is already initialized in the state"))]
    AlreadyInState,

    /// Delayed initialization requires `R = sigma^2 * I`.
    #[snafu(display(
        "measurement noise is not isotropic: found {found:.2e} at ({row}, {col}), expected {expected:.2e}"
    ))]
    NoiseNotIsotropic {
        row: usize,
        col: usize,
        found: f64,
        expected: f64,
    },

    /// The new-variable Jacobian of an invertible initialization was singular.
    #[snafu(display("initialization Jacobian of the new variable is singular"))]
    SingularInitJacobian,

    /// Marginalization only removes top-level state variables.
    #[snafu(display(
        "variable is not a top-level state variable (sub-variable marginalization is unsupported)"
    ))]
    NotInState,
}
