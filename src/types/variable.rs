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
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::linalg::DVector;

/// Shared handle to a state variable.
///
/// Variables are aliased between the ordered state vector, the clone and
/// feature maps, and ephemeral Jacobian orderings; the
/// [`State`](crate::state::State) remains the single lifecycle authority.
/// Identity is pointer identity (`Arc::ptr_eq`).
pub type VarRef = Arc<RwLock<dyn Variable>>;

/// A named, addressable block inside the global error-state vector.
pub trait Variable: Debug + Send + Sync + 'static {
    /// Starting row/column of this variable in the covariance, `None` once
    /// detached (never inserted, or marginalized out).
    fn id(&self) -> Option<usize>;

    /// Moves this variable, and recursively its sub-variables, to a new
    /// covariance offset.
    fn set_local_id(&mut self, id: Option<usize>);

    /// Minimal dimension of this variable in the error state.
    fn size(&self) -> usize;

    /// Over-parameterized value, opaque to the state manager.
    fn value(&self) -> DVector<f64>;

    /// Overwrites the value. Panics on a dimension mismatch.
    fn set_value(&mut self, value: &DVector<f64>);

    /// Applies a minimal-dimension correction (generalized boxplus).
    fn update(&mut self, dx: &DVector<f64>);

    /// Allocates an independent, detached copy of the same kind and value.
    fn clone_variable(&self) -> VarRef;

    /// Returns the sub-variable identical to `check`, if this variable is a
    /// composite containing it.
    fn check_if_subvariable(&self, _check: &VarRef) -> Option<VarRef> {
        None
    }

    /// Supports explicit kind checks after generic cloning.
    fn as_any(&self) -> &dyn Any;
}
