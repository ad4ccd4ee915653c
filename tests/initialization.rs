extern crate argus;
extern crate pretty_env_logger;

use std::sync::Arc;

use parking_lot::RwLock;

use argus::linalg::{DMatrix, DVector};
use argus::prelude::*;

/// Single-variable state holding the given covariance.
fn anchor_state(cov: DMatrix<f64>) -> (State, Vec<VarRef>) {
    let mut state = State::new(StateOptions::default());
    let var: VarRef = Arc::new(RwLock::new(VectorVar::new(cov.nrows())));
    var.write().set_local_id(Some(0));
    state.variables = vec![Arc::clone(&var)];
    state.cov = cov;
    (state, vec![var])
}

fn max_asymmetry(m: &DMatrix<f64>) -> f64 {
    (m - m.transpose()).abs().max()
}

#[test]
fn invertible_init_of_an_unconnected_variable() {
    let _ = pretty_env_logger::try_init();
    let cov = DMatrix::from_row_slice(3, 3, &[2.0, 0.1, 0.0, 0.1, 3.0, 0.2, 0.0, 0.2, 4.0]);
    let (mut state, vars) = anchor_state(cov.clone());

    let landmark: VarRef = Arc::new(RwLock::new(Landmark::new(42)));
    let h_r = DMatrix::<f64>::zeros(3, 3);
    let h_l = DMatrix::<f64>::identity(3, 3);
    let r = DMatrix::<f64>::identity(3, 3) * 0.25;
    let res = DVector::from_row_slice(&[0.3, -0.2, 0.1]);
    helper::initialize_invertible(&mut state, &landmark, &vars, &h_r, &h_l, &r, &res).unwrap();

    assert_eq!(state.cov.nrows(), 6);
    assert_eq!(landmark.read().id(), Some(3));
    assert_eq!(state.variables.len(), 2);

    // With H_R = 0 the cross terms vanish and the new block is exactly R.
    assert!(state.cov.view((0, 3), (3, 3)).abs().max() < 1e-14);
    let new_block = state.cov.view((3, 3), (3, 3)).into_owned();
    assert!((new_block - &r).abs().max() < 1e-14);
    // The old block is untouched and the new value is H_L^-1 * res.
    assert!((state.cov.view((0, 0), (3, 3)).into_owned() - cov).abs().max() < 1e-14);
    assert!((landmark.read().value() - res).abs().max() < 1e-14);
}

#[test]
fn invertible_init_matches_the_closed_form() {
    let cov = DMatrix::from_row_slice(3, 3, &[1.5, 0.2, 0.1, 0.2, 2.5, 0.0, 0.1, 0.0, 1.0]);
    let (mut state, vars) = anchor_state(cov.clone());

    let landmark: VarRef = Arc::new(RwLock::new(Landmark::new(7)));
    let h_r = DMatrix::from_row_slice(3, 3, &[1.0, 0.5, 0.0, 0.0, 1.0, 0.2, 0.3, 0.0, 1.0]);
    let h_l = DMatrix::<f64>::identity(3, 3) * 2.0;
    let r = DMatrix::<f64>::identity(3, 3) * 0.09;
    let res = DVector::from_row_slice(&[0.4, 0.0, -0.6]);
    helper::initialize_invertible(&mut state, &landmark, &vars, &h_r, &h_l, &r, &res).unwrap();

    let h_l_inv = DMatrix::<f64>::identity(3, 3) * 0.5;
    let expected_cross = -(&cov * h_r.transpose()) * h_l_inv.transpose();
    let expected_block = &h_l_inv * (&h_r * &cov * h_r.transpose() + &r) * h_l_inv.transpose();

    assert!(
        (state.cov.view((0, 3), (3, 3)).into_owned() - expected_cross)
            .abs()
            .max()
            < 1e-12
    );
    assert!(
        (state.cov.view((3, 3), (3, 3)).into_owned() - expected_block)
            .abs()
            .max()
            < 1e-12
    );
    assert!(max_asymmetry(&state.cov) < 1e-12);
    assert!((landmark.read().value() - h_l_inv * res).abs().max() < 1e-12);
}

#[test]
fn invertible_init_rejects_contract_violations() {
    let (mut state, vars) = anchor_state(DMatrix::identity(3, 3));
    let landmark: VarRef = Arc::new(RwLock::new(Landmark::new(1)));
    let h_r = DMatrix::<f64>::zeros(3, 3);
    let h_l = DMatrix::<f64>::identity(3, 3);
    let res = DVector::zeros(3);

    // Anisotropic noise.
    let bad_r = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0]);
    let err = helper::initialize_invertible(&mut state, &landmark, &vars, &h_r, &h_l, &bad_r, &res)
        .unwrap_err();
    assert!(matches!(err, StateError::NoiseNotIsotropic { .. }));

    // Doubly-initialized variable.
    let r = DMatrix::<f64>::identity(3, 3);
    helper::initialize_invertible(&mut state, &landmark, &vars, &h_r, &h_l, &r, &res).unwrap();
    let err = helper::initialize_invertible(&mut state, &landmark, &vars, &h_r, &h_l, &r, &res)
        .unwrap_err();
    assert!(matches!(err, StateError::AlreadyInState));

    // Singular new-variable Jacobian.
    let other: VarRef = Arc::new(RwLock::new(Landmark::new(2)));
    let singular = DMatrix::<f64>::zeros(3, 3);
    let err =
        helper::initialize_invertible(&mut state, &other, &vars, &h_r, &singular, &r, &res)
            .unwrap_err();
    assert!(matches!(err, StateError::SingularInitJacobian));
}

#[test]
fn delayed_init_rejects_an_inconsistent_residual() {
    let _ = pretty_env_logger::try_init();
    // Tight prior and tiny noise: a large projected residual cannot pass.
    let (mut state, vars) = anchor_state(DMatrix::identity(3, 3) * 1e-4);
    let before = state.cov.clone();

    let landmark: VarRef = Arc::new(RwLock::new(Landmark::new(5)));
    let h_r = DMatrix::from_row_slice(
        4,
        3,
        &[0.5, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.5, 0.4, 0.4, 0.4],
    );
    let h_l = DMatrix::from_row_slice(
        4,
        3,
        &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
    );
    let r = DMatrix::<f64>::identity(4, 4) * 1e-4;
    let res = DVector::from_row_slice(&[5.0, 5.0, 5.0, 5.0]);

    let accepted =
        helper::initialize(&mut state, &landmark, &vars, h_r, h_l, r, res, 1.0).unwrap();
    assert!(!accepted);

    // Gating left no trace: same covariance, same layout, detached variable.
    assert_eq!(state.cov, before);
    assert_eq!(state.variables.len(), 1);
    assert_eq!(landmark.read().id(), None);
}

#[test]
fn delayed_init_accepts_a_consistent_measurement() {
    let (mut state, vars) = anchor_state(DMatrix::identity(3, 3) * 0.1);

    let landmark: VarRef = Arc::new(RwLock::new(Landmark::new(6)));
    let h_r = DMatrix::from_row_slice(
        4,
        3,
        &[0.5, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.5, 0.1, 0.2, 0.3],
    );
    let h_l = DMatrix::from_row_slice(
        4,
        3,
        &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.5, 0.5, 0.5],
    );
    let r = DMatrix::<f64>::identity(4, 4) * 0.01;
    let res = DVector::from_row_slice(&[0.02, -0.01, 0.015, 0.01]);

    let accepted =
        helper::initialize(&mut state, &landmark, &vars, h_r, h_l, r, res, 1.0).unwrap();
    assert!(accepted);

    assert_eq!(state.cov.nrows(), 6);
    assert_eq!(landmark.read().id(), Some(3));
    assert_eq!(state.variables.len(), 2);
    assert!(max_asymmetry(&state.cov) < 1e-12);
    assert!(state.cov.diagonal().min() >= 0.0);
}

#[test]
fn delayed_init_with_a_square_system_skips_the_update() {
    let (mut state, vars) = anchor_state(DMatrix::identity(3, 3) * 0.1);
    let before_marginal = state.cov.clone();

    let landmark: VarRef = Arc::new(RwLock::new(Landmark::new(9)));
    let h_r = DMatrix::<f64>::zeros(3, 3);
    let h_l = DMatrix::<f64>::identity(3, 3);
    let r = DMatrix::<f64>::identity(3, 3) * 0.04;
    let res = DVector::from_row_slice(&[0.1, 0.0, -0.1]);

    let accepted =
        helper::initialize(&mut state, &landmark, &vars, h_r, h_l, r, res, 1.0).unwrap();
    assert!(accepted);

    // No rows were left for the nullspace update, the prior is untouched.
    assert_eq!(state.cov.nrows(), 6);
    assert!(
        (state.cov.view((0, 0), (3, 3)).into_owned() - before_marginal)
            .abs()
            .max()
            < 1e-14
    );
    assert!((landmark.read().value() - DVector::from_row_slice(&[0.1, 0.0, -0.1])).abs().max() < 1e-14);
}
