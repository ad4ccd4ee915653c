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

//! State variable kinds.
//!
//! Each kind is an addressable block of the error-state vector: it knows its
//! covariance offset, its minimal dimension, and how a minimal-dimension
//! correction maps onto its (possibly over-parameterized) value.

mod camera;
mod imu;
mod landmark;
mod pose;
mod quat;
mod variable;
mod vec;

pub use camera::PinholeCamera;
pub use imu::ImuState;
pub use landmark::Landmark;
pub use pose::PoseJpl;
pub use quat::QuatJpl;
pub use variable::{VarRef, Variable};
pub use vec::VectorVar;
