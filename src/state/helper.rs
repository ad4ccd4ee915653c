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

//! Stateless manager primitives over a [`State`].
//!
//! Everything here assumes exclusive access to the state for the duration of
//! the call; callers arrange that externally. The structural mutex inside the
//! state is only taken around mutations that erase entries from the clone and
//! feature maps, so concurrent readers of those maps never observe a
//! half-removed variable.
//!
//! Symmetry of the covariance is maintained by writing the upper triangle
//! and reflecting it, never by averaging with the transpose.

use std::mem;
use std::sync::Arc;

use snafu::prelude::*;

use super::{
    AlreadyInStateSnafu, CloneNotAPoseSnafu, CloneSourceMissingSnafu, CovarianceNotPsdSnafu,
    DetachedVariableSnafu, DuplicateCloneSnafu, EmptyOrderingSnafu, NoiseNotIsotropicSnafu,
    NonContiguousOrderingSnafu, NotInStateSnafu, SingularInitJacobianSnafu,
    SingularResidualCovarianceSnafu, State, StateError,
};
use crate::linalg::{DMatrix, DVector, Vector3};
use crate::stats::chi_squared_quantile_95;
use crate::types::{PoseJpl, VarRef, Variable};
use crate::utils::{apply_givens, givens_rotation, reflect_upper};

/// Resolves an ordering into `(offset, size)` pairs, taking each lock once.
fn resolve_blocks(order: &[VarRef]) -> Result<Vec<(usize, usize)>, StateError> {
    let mut blocks = Vec::with_capacity(order.len());
    for var in order {
        let guard = var.read();
        let id = guard.id().context(DetachedVariableSnafu)?;
        blocks.push((id, guard.size()));
    }
    Ok(blocks)
}

/// Offsets of each block inside a stacked Jacobian's columns.
fn stacked_offsets(blocks: &[(usize, usize)]) -> (Vec<usize>, usize) {
    let mut offsets = Vec::with_capacity(blocks.len());
    let mut current_it = 0;
    for &(_, size) in blocks {
        offsets.push(current_it);
        current_it += size;
    }
    (offsets, current_it)
}

/// A negative diagonal entry means the covariance is no longer a covariance.
fn check_diagonal(cov: &DMatrix<f64>, action: &'static str) -> Result<(), StateError> {
    let mut worst: Option<(usize, f64)> = None;
    for index in 0..cov.nrows() {
        let value = cov[(index, index)];
        if value < 0.0 {
            warn!(
                "{} left a negative covariance diagonal at {}: {:.2e}",
                action, index, value
            );
            if worst.map_or(true, |(_, w)| value < w) {
                worst = Some((index, value));
            }
        }
    }
    match worst {
        Some((index, value)) => CovarianceNotPsdSnafu {
            action,
            index,
            value,
        }
        .fail(),
        None => Ok(()),
    }
}

/// The QR split of delayed initialization only commutes with the noise when
/// `R = sigma^2 * I`.
fn check_isotropic(r: &DMatrix<f64>) -> Result<(), StateError> {
    assert_eq!(r.nrows(), r.ncols());
    assert!(r.nrows() > 0);
    let expected = r[(0, 0)];
    for row in 0..r.nrows() {
        for col in 0..r.ncols() {
            if row == col && r[(row, col)] != expected {
                return NoiseNotIsotropicSnafu {
                    row,
                    col,
                    found: r[(row, col)],
                    expected,
                }
                .fail();
            } else if row != col && r[(row, col)] != 0.0 {
                return NoiseNotIsotropicSnafu {
                    row,
                    col,
                    found: r[(row, col)],
                    expected: 0.0,
                }
                .fail();
            }
        }
    }
    Ok(())
}

/// EKF covariance propagation (time update).
///
/// `order_new` is the contiguous block of variables whose rows `phi`
/// predicts, typically the active inertial state; `order_old` lists the
/// variables its columns reference and need not be contiguous. The value
/// propagation itself happens upstream in the integrator: this maps the
/// covariance through `phi` and adds the discrete process noise `q`.
pub fn propagate(
    state: &mut State,
    order_new: &[VarRef],
    order_old: &[VarRef],
    phi: &DMatrix<f64>,
    q: &DMatrix<f64>,
) -> Result<(), StateError> {
    ensure!(!order_new.is_empty() && !order_old.is_empty(), EmptyOrderingSnafu);
    let new_blocks = resolve_blocks(order_new)?;
    let old_blocks = resolve_blocks(order_old)?;

    // The state transition has to be in the same order as the state itself.
    let mut size_order_new = new_blocks[0].1;
    for pair in new_blocks.windows(2) {
        ensure!(
            pair[0].0 + pair[0].1 == pair[1].0,
            NonContiguousOrderingSnafu
        );
        size_order_new += pair[1].1;
    }
    let (phi_id, size_order_old) = stacked_offsets(&old_blocks);
    assert_eq!(size_order_new, phi.nrows());
    assert_eq!(size_order_old, phi.ncols());
    assert_eq!(phi.nrows(), q.nrows());
    assert_eq!(q.nrows(), q.ncols());

    let n = state.cov.nrows();
    let phi_size = phi.nrows();

    // Cov * Phi^T, accumulated block-wise over the old ordering so each
    // column slice of Phi^T only meets the rows it actually references.
    let mut cov_phi_t = DMatrix::<f64>::zeros(n, phi_size);
    for (i, &(id, size)) in old_blocks.iter().enumerate() {
        cov_phi_t += state.cov.columns(id, size) * phi.columns(phi_id[i], size).transpose();
    }

    // Phi * Cov * Phi^T + Q; Q is supplied symmetric, trust its upper triangle.
    let mut phi_cov_phi_t = q.clone();
    reflect_upper(&mut phi_cov_phi_t);
    for (i, &(id, size)) in old_blocks.iter().enumerate() {
        phi_cov_phi_t += phi.columns(phi_id[i], size) * cov_phi_t.rows(id, size);
    }

    let start_id = new_blocks[0].0;
    state
        .cov
        .view_mut((start_id, 0), (phi_size, n))
        .copy_from(&cov_phi_t.transpose());
    state
        .cov
        .view_mut((0, start_id), (n, phi_size))
        .copy_from(&cov_phi_t);
    state
        .cov
        .view_mut((start_id, start_id), (phi_size, phi_size))
        .copy_from(&phi_cov_phi_t);

    check_diagonal(&state.cov, "propagation")
}

/// Compressed EKF measurement update.
///
/// `h` is the stacked Jacobian over the variables in `h_order` only; the
/// gain is built block-sparsely against the covariance so the full-state
/// Jacobian is never formed.
pub fn update(
    state: &mut State,
    h_order: &[VarRef],
    h: &DMatrix<f64>,
    res: &DVector<f64>,
    r: &DMatrix<f64>,
) -> Result<(), StateError> {
    ensure!(!h_order.is_empty(), EmptyOrderingSnafu);
    assert_eq!(res.nrows(), r.nrows());
    assert_eq!(h.nrows(), res.nrows());
    let meas_blocks = resolve_blocks(h_order)?;
    let (h_id, total_meas_size) = stacked_offsets(&meas_blocks);
    assert_eq!(h.ncols(), total_meas_size);

    let n = state.cov.nrows();

    // M = Cov * H^T, one block row per state variable.
    let state_blocks = resolve_blocks(&state.variables)?;
    let mut m_a = DMatrix::<f64>::zeros(n, res.nrows());
    for &(var_id, var_size) in &state_blocks {
        let mut m_i = DMatrix::<f64>::zeros(var_size, res.nrows());
        for (i, &(meas_id, meas_size)) in meas_blocks.iter().enumerate() {
            m_i += state.cov.view((var_id, meas_id), (var_size, meas_size))
                * h.columns(h_id[i], meas_size).transpose();
        }
        m_a.view_mut((var_id, 0), (var_size, res.nrows()))
            .copy_from(&m_i);
    }

    // Residual covariance S = H * P_small * H^T + R.
    let p_small = get_marginal_covariance(state, h_order)?;
    let mut s = h * &p_small * h.transpose();
    s += r;

    // Invert through the Cholesky factorization; S losing positive
    // definiteness means the filter is beyond recovery.
    let s_inv = s
        .cholesky()
        .context(SingularResidualCovarianceSnafu)?
        .inverse();
    let gain = &m_a * s_inv;

    // P' = P - K * M^T, upper triangle first, then reflected.
    state.cov -= &gain * m_a.transpose();
    reflect_upper(&mut state.cov);
    check_diagonal(&state.cov, "update")?;

    // dx = K * r, applied through each variable's boxplus.
    let dx = gain * res;
    for (var, &(id, size)) in state.variables.iter().zip(&state_blocks) {
        var.write().update(&dx.rows(id, size).into_owned());
    }

    // Keep the exposed camera models in sync while calibrating intrinsics.
    if state.options.do_calib_camera_intrinsics {
        for (cam_id, calib) in &state.calib_cam_intrinsics {
            if let Some(cam) = state.cam_intrinsics_cameras.get(cam_id) {
                cam.write().set_value(&calib.read().value());
            }
        }
    }
    Ok(())
}

/// Overwrites the covariance blocks of the listed variables with
/// `covariance`, then restores symmetry from the upper triangle.
///
/// The caller asserts block-diagonal separation between the listed variables
/// and everything else, which is the usual situation at startup.
pub fn set_initial_covariance(
    state: &mut State,
    covariance: &DMatrix<f64>,
    order: &[VarRef],
) -> Result<(), StateError> {
    let blocks = resolve_blocks(order)?;
    let total: usize = blocks.iter().map(|b| b.1).sum();
    assert_eq!(covariance.nrows(), total);
    assert_eq!(covariance.ncols(), total);

    let mut i_index = 0;
    for &(id_i, size_i) in &blocks {
        let mut k_index = 0;
        for &(id_k, size_k) in &blocks {
            state
                .cov
                .view_mut((id_i, id_k), (size_i, size_k))
                .copy_from(&covariance.view((i_index, k_index), (size_i, size_k)));
            k_index += size_k;
        }
        i_index += size_i;
    }
    reflect_upper(&mut state.cov);
    Ok(())
}

/// Covariance of an ordered subset of variables, blocks copied as-is.
pub fn get_marginal_covariance(
    state: &State,
    small_variables: &[VarRef],
) -> Result<DMatrix<f64>, StateError> {
    let blocks = resolve_blocks(small_variables)?;
    let cov_size: usize = blocks.iter().map(|b| b.1).sum();
    let mut small_cov = DMatrix::<f64>::zeros(cov_size, cov_size);

    let mut i_index = 0;
    for &(id_i, size_i) in &blocks {
        let mut k_index = 0;
        for &(id_k, size_k) in &blocks {
            small_cov
                .view_mut((i_index, k_index), (size_i, size_k))
                .copy_from(&state.cov.view((id_i, id_k), (size_i, size_k)));
            k_index += size_k;
        }
        i_index += size_i;
    }
    Ok(small_cov)
}

/// The full covariance, copied.
pub fn get_full_covariance(state: &State) -> DMatrix<f64> {
    state.cov.clone()
}

/// Removes a top-level variable and its covariance rows/columns.
///
/// The removed variable keeps its value but is detached; the variables
/// beyond it slide forward. For `x = [x_1, x_m, x_2]`, the new covariance is
/// the old one with the `x_m` rows and columns deleted.
pub fn marginalize(state: &mut State, marg: &VarRef) -> Result<(), StateError> {
    ensure!(
        state.variables.iter().any(|v| Arc::ptr_eq(v, marg)),
        NotInStateSnafu
    );

    let (marg_id, marg_size) = {
        let guard = marg.read();
        (guard.id().context(DetachedVariableSnafu)?, guard.size())
    };
    let n = state.cov.nrows();
    let x2_size = n - marg_id - marg_size;

    let mut cov_new = DMatrix::<f64>::zeros(n - marg_size, n - marg_size);
    cov_new
        .view_mut((0, 0), (marg_id, marg_id))
        .copy_from(&state.cov.view((0, 0), (marg_id, marg_id)));
    cov_new
        .view_mut((0, marg_id), (marg_id, x2_size))
        .copy_from(&state.cov.view((0, marg_id + marg_size), (marg_id, x2_size)));
    let cross = cov_new.view((0, marg_id), (marg_id, x2_size)).clone_owned();
    cov_new
        .view_mut((marg_id, 0), (x2_size, marg_id))
        .copy_from(&cross.transpose());
    cov_new
        .view_mut((marg_id, marg_id), (x2_size, x2_size))
        .copy_from(&state.cov.view(
            (marg_id + marg_size, marg_id + marg_size),
            (x2_size, x2_size),
        ));
    state.cov = cov_new;

    // Keep the remaining variables and slide the ones beyond the hole.
    let mut remaining = Vec::with_capacity(state.variables.len().saturating_sub(1));
    for var in mem::take(&mut state.variables) {
        if Arc::ptr_eq(&var, marg) {
            continue;
        }
        {
            let mut guard = var.write();
            if let Some(id) = guard.id() {
                if id > marg_id {
                    guard.set_local_id(Some(id - marg_size));
                }
            }
        }
        remaining.push(var);
    }
    state.variables = remaining;
    marg.write().set_local_id(None);
    Ok(())
}

/// Duplicates a variable (or a sub-variable of one) into the end of the
/// state, covariance stripes included, and returns the new clone.
pub fn clone_variable(
    state: &mut State,
    variable_to_clone: &VarRef,
) -> Result<VarRef, StateError> {
    let total_size = variable_to_clone.read().size();
    let old_size = state.cov.nrows();
    let new_loc = old_size;

    let cov = mem::replace(&mut state.cov, DMatrix::zeros(0, 0));
    state.cov = cov.resize(old_size + total_size, old_size + total_size, 0.0);

    let mut new_clone: Option<VarRef> = None;
    for var in &state.variables {
        // The top-level variable itself, or one of its components.
        let source = if Arc::ptr_eq(var, variable_to_clone) {
            Some(Arc::clone(variable_to_clone))
        } else {
            var.read().check_if_subvariable(variable_to_clone)
        };
        let Some(source) = source else { continue };
        let old_loc = source.read().id().context(DetachedVariableSnafu)?;

        let diag = state
            .cov
            .view((old_loc, old_loc), (total_size, total_size))
            .clone_owned();
        state
            .cov
            .view_mut((new_loc, new_loc), (total_size, total_size))
            .copy_from(&diag);
        let col_stripe = state
            .cov
            .view((0, old_loc), (old_size, total_size))
            .clone_owned();
        state
            .cov
            .view_mut((0, new_loc), (old_size, total_size))
            .copy_from(&col_stripe);
        let row_stripe = state
            .cov
            .view((old_loc, 0), (total_size, old_size))
            .clone_owned();
        state
            .cov
            .view_mut((new_loc, 0), (total_size, old_size))
            .copy_from(&row_stripe);

        let cloned = source.read().clone_variable();
        cloned.write().set_local_id(Some(new_loc));
        new_clone = Some(cloned);
        break;
    }

    let new_clone = new_clone.context(CloneSourceMissingSnafu)?;
    state.variables.push(Arc::clone(&new_clone));
    Ok(new_clone)
}

/// Clones the active IMU pose and registers it at the current timestamp.
///
/// `last_w` is the angular velocity at the end of the last propagation,
/// needed for the time-offset Jacobian when that calibration is active.
pub fn augment_clone(state: &mut State, last_w: Vector3<f64>) -> Result<VarRef, StateError> {
    ensure!(
        !state.clones_imu.contains_key(&state.timestamp),
        DuplicateCloneSnafu {
            epoch: state.timestamp
        }
    );

    let imu_pose: VarRef = state.imu.read().pose();
    let pose = clone_variable(state, &imu_pose)?;
    ensure!(pose.read().as_any().is::<PoseJpl>(), CloneNotAPoseSnafu);
    state.clones_imu.insert(state.timestamp, Arc::clone(&pose));

    // To first order the clone is a function of the estimated time offset,
    // through the angular and linear velocity at the clone time
    // (Li and Mourikis, IJRR 2014).
    if state.options.do_calib_camera_timeoffset {
        let mut dnc_dt = DVector::<f64>::zeros(6);
        dnc_dt.rows_mut(0, 3).copy_from(&last_w);
        dnc_dt.rows_mut(3, 3).copy_from(&state.imu.read().vel());

        let dt_id = state
            .calib_dt_imu_cam
            .read()
            .id()
            .context(DetachedVariableSnafu)?;
        let pose_id = pose.read().id().context(DetachedVariableSnafu)?;
        let n = state.cov.nrows();

        let dt_col = state.cov.view((0, dt_id), (n, 1)).clone_owned();
        let mut pose_cols = state.cov.view_mut((0, pose_id), (n, 6));
        pose_cols += &dt_col * dnc_dt.transpose();
        let dt_row = state.cov.view((dt_id, 0), (1, n)).clone_owned();
        let mut pose_rows = state.cov.view_mut((pose_id, 0), (6, n));
        pose_rows += &dnc_dt * dt_row;
    }
    Ok(pose)
}

/// Delayed initialization of a new variable.
///
/// The measurement Jacobian splits into `[h_r | h_l]`, `h_l` the part with
/// respect to the new variable. A bottom-up Givens QR separates an
/// invertible initializing system from a nullspace-projected update that no
/// longer depends on the new variable; the projected residual is gated with
/// a Mahalanobis test before anything touches the state.
///
/// Returns `Ok(false)` if the gate rejects the measurement: the state is
/// untouched and the variable stays detached.
#[allow(clippy::too_many_arguments)]
pub fn initialize(
    state: &mut State,
    new_variable: &VarRef,
    h_order: &[VarRef],
    mut h_r: DMatrix<f64>,
    mut h_l: DMatrix<f64>,
    r: DMatrix<f64>,
    mut res: DVector<f64>,
    chi_2_mult: f64,
) -> Result<bool, StateError> {
    ensure!(
        !state.variables.iter().any(|v| Arc::ptr_eq(v, new_variable)),
        AlreadyInStateSnafu
    );
    check_isotropic(&r)?;

    let new_var_size = new_variable.read().size();
    assert_eq!(new_var_size, h_l.ncols());
    assert_eq!(res.nrows(), r.nrows());
    assert_eq!(h_l.nrows(), res.nrows());
    assert_eq!(h_l.nrows(), h_r.nrows());

    // Givens QR from the bottom of h_l up: the top rows keep the
    // new-variable dependence, everything below loses it.
    for col in 0..h_l.ncols() {
        for row in ((col + 1)..h_l.nrows()).rev() {
            let (c, s) = givens_rotation(h_l[(row - 1, col)], h_l[(row, col)]);
            apply_givens(&mut h_l, c, s, row, col);
            apply_givens(&mut res, c, s, row, 0);
            apply_givens(&mut h_r, c, s, row, 0);
        }
    }

    // Invertible initializing portion.
    let hx_init = h_r.rows(0, new_var_size).into_owned();
    let h_f_init = h_l.view((0, 0), (new_var_size, new_var_size)).into_owned();
    let res_init = res.rows(0, new_var_size).into_owned();
    let r_init = r.view((0, 0), (new_var_size, new_var_size)).into_owned();

    // Nullspace-projected updating portion.
    let up_rows = h_r.nrows() - new_var_size;
    let h_up = h_r.rows(new_var_size, up_rows).into_owned();
    let res_up = res.rows(new_var_size, up_rows).into_owned();
    let r_up = r
        .view((new_var_size, new_var_size), (up_rows, up_rows))
        .into_owned();

    // Mahalanobis gate on the projected system.
    let p_up = get_marginal_covariance(state, h_order)?;
    assert_eq!(r_up.nrows(), h_up.nrows());
    assert_eq!(h_up.ncols(), p_up.ncols());
    let s = &h_up * &p_up * h_up.transpose() + &r_up;
    let chol = s.cholesky().context(SingularResidualCovarianceSnafu)?;
    let chi2 = res_up.dot(&chol.solve(&res_up));

    let chi2_check = chi_squared_quantile_95(res.nrows());
    if chi2 > chi_2_mult * chi2_check {
        debug!(
            "delayed initialization rejected: chi2 {:.3} above {:.3}",
            chi2,
            chi_2_mult * chi2_check
        );
        return Ok(false);
    }

    initialize_invertible(
        state,
        new_variable,
        h_order,
        &hx_init,
        &h_f_init,
        &r_init,
        &res_init,
    )?;

    if h_up.nrows() > 0 {
        update(state, h_order, &h_up, &res_up, &r_up)?;
    }
    Ok(true)
}

/// Direct initialization when the new-variable Jacobian is square and
/// invertible; the delayed path lands here with the top of its QR split.
pub fn initialize_invertible(
    state: &mut State,
    new_variable: &VarRef,
    h_order: &[VarRef],
    h_r: &DMatrix<f64>,
    h_l: &DMatrix<f64>,
    r: &DMatrix<f64>,
    res: &DVector<f64>,
) -> Result<(), StateError> {
    ensure!(
        !state.variables.iter().any(|v| Arc::ptr_eq(v, new_variable)),
        AlreadyInStateSnafu
    );
    check_isotropic(r)?;

    assert_eq!(res.nrows(), r.nrows());
    assert_eq!(h_l.nrows(), res.nrows());
    assert_eq!(h_l.nrows(), h_r.nrows());
    let meas_blocks = resolve_blocks(h_order)?;
    let (h_id, total_meas_size) = stacked_offsets(&meas_blocks);
    assert_eq!(h_r.ncols(), total_meas_size);

    let n = state.cov.nrows();

    // M = Cov * H_R^T, as in the update.
    let state_blocks = resolve_blocks(&state.variables)?;
    let mut m_a = DMatrix::<f64>::zeros(n, res.nrows());
    for &(var_id, var_size) in &state_blocks {
        let mut m_i = DMatrix::<f64>::zeros(var_size, res.nrows());
        for (i, &(meas_id, meas_size)) in meas_blocks.iter().enumerate() {
            m_i += state.cov.view((var_id, meas_id), (var_size, meas_size))
                * h_r.columns(h_id[i], meas_size).transpose();
        }
        m_a.view_mut((var_id, 0), (var_size, res.nrows()))
            .copy_from(&m_i);
    }

    let p_small = get_marginal_covariance(state, h_order)?;
    let mut m = h_r * &p_small * h_r.transpose();
    m += r;

    // Covariance of the variable that is being initialized.
    assert_eq!(h_l.nrows(), h_l.ncols());
    let new_var_size = new_variable.read().size();
    assert_eq!(h_l.nrows(), new_var_size);
    let h_l_inv = h_l
        .clone()
        .try_inverse()
        .context(SingularInitJacobianSnafu)?;
    let p_ll = &h_l_inv * m * h_l_inv.transpose();

    // Augment the covariance with the cross terms and the new block.
    let cov = mem::replace(&mut state.cov, DMatrix::zeros(0, 0));
    state.cov = cov.resize(n + new_var_size, n + new_var_size, 0.0);
    let cross = -(&m_a * h_l_inv.transpose());
    state
        .cov
        .view_mut((0, n), (n, new_var_size))
        .copy_from(&cross);
    state
        .cov
        .view_mut((n, 0), (new_var_size, n))
        .copy_from(&cross.transpose());
    state
        .cov
        .view_mut((n, n), (new_var_size, new_var_size))
        .copy_from(&p_ll);

    // Invertible systems only correct the new variable itself; the
    // correction is near zero when the initial guess came from a solver.
    new_variable.write().update(&(&h_l_inv * res));
    new_variable.write().set_local_id(Some(n));
    state.variables.push(Arc::clone(new_variable));
    Ok(())
}

/// Marginalizes the oldest clone once the window exceeds its configured size.
pub fn marginalize_old_clone(state: &mut State) -> Result<(), StateError> {
    if state.clones_imu.len() > state.options.max_clone_size {
        let mutex = Arc::clone(&state.mutex_state);
        let _lock = mutex.lock();
        // The window is non-empty here, so there is always a target.
        if let Some(marginal_time) = state.margtimestep() {
            if let Some(clone) = state.clones_imu.get(&marginal_time).map(Arc::clone) {
                marginalize(state, &clone)?;
                state.clones_imu.remove(&marginal_time);
            }
        }
    }
    Ok(())
}

/// Marginalizes every SLAM feature flagged for removal, protecting the
/// ArUco landmark id range. Returns how many features left the state.
pub fn marginalize_slam(state: &mut State) -> Result<usize, StateError> {
    let protected = 4 * state.options.max_aruco_features;
    let marked: Vec<usize> = state
        .features_slam
        .iter()
        .filter(|(feat_id, landmark)| landmark.read().should_marg && **feat_id > protected)
        .map(|(feat_id, _)| *feat_id)
        .collect();
    if marked.is_empty() {
        return Ok(0);
    }

    let mutex = Arc::clone(&state.mutex_state);
    let _lock = mutex.lock();
    let mut ct_marginalized = 0;
    for feat_id in marked {
        if let Some(landmark) = state.features_slam.get(&feat_id).map(Arc::clone) {
            let as_variable: VarRef = landmark;
            marginalize(state, &as_variable)?;
            state.features_slam.remove(&feat_id);
            ct_marginalized += 1;
        }
    }
    debug!("marginalized {} SLAM features", ct_marginalized);
    Ok(ct_marginalized)
}
