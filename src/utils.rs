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

use crate::linalg::storage::StorageMut;
use crate::linalg::{DMatrix, Dim, Matrix, Matrix3, Vector3, Vector4};

/// Returns the tilde (skew-symmetric) matrix from the provided Vector3.
pub fn tilde_matrix(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v[2], v[1], v[2], 0.0, -v[0], -v[1], v[0], 0.0)
}

/// Copies the upper triangle onto the lower triangle, in place.
///
/// This is how symmetry is restored everywhere in the filter: never by
/// averaging a matrix with its transpose.
pub fn reflect_upper(mat: &mut DMatrix<f64>) {
    assert_eq!(mat.nrows(), mat.ncols());
    for j in 0..mat.ncols() {
        for i in (j + 1)..mat.nrows() {
            mat[(i, j)] = mat[(j, i)];
        }
    }
}

/// Builds the Givens rotation `(c, s)` whose adjoint, applied from the left
/// to the row pair `[p; q]`, zeroes the second entry.
pub fn givens_rotation(p: f64, q: f64) -> (f64, f64) {
    if q == 0.0 {
        (1.0, 0.0)
    } else {
        let r = p.hypot(q);
        (p / r, -q / r)
    }
}

/// Applies the adjoint of a Givens rotation to rows `row - 1` and `row`,
/// starting at `col_start`.
pub fn apply_givens<R, C, S>(
    mat: &mut Matrix<f64, R, C, S>,
    c: f64,
    s: f64,
    row: usize,
    col_start: usize,
) where
    R: Dim,
    C: Dim,
    S: StorageMut<f64, R, C>,
{
    for j in col_start..mat.ncols() {
        let a = mat[(row - 1, j)];
        let b = mat[(row, j)];
        mat[(row - 1, j)] = c * a - s * b;
        mat[(row, j)] = s * a + c * b;
    }
}

/// JPL-convention quaternion product `q ⊗ p`, both stored as `[x, y, z, w]`.
pub fn quat_multiply(q: &Vector4<f64>, p: &Vector4<f64>) -> Vector4<f64> {
    let qv = Vector3::new(q[0], q[1], q[2]);
    let pv = Vector3::new(p[0], p[1], p[2]);
    let xyz = q[3] * pv + p[3] * qv - qv.cross(&pv);
    let w = q[3] * p[3] - qv.dot(&pv);
    quat_normalize(&Vector4::new(xyz[0], xyz[1], xyz[2], w))
}

/// Normalizes a JPL quaternion, enforcing a non-negative scalar part.
pub fn quat_normalize(q: &Vector4<f64>) -> Vector4<f64> {
    let flipped = if q[3] < 0.0 { -q } else { *q };
    let norm = flipped.norm();
    flipped / norm
}

/// Rotation matrix of a JPL quaternion `[x, y, z, w]`.
pub fn rot_from_quat(q: &Vector4<f64>) -> Matrix3<f64> {
    let qv = Vector3::new(q[0], q[1], q[2]);
    let w = q[3];
    Matrix3::identity() * (2.0 * w * w - 1.0) - tilde_matrix(&qv) * 2.0 * w
        + qv * qv.transpose() * 2.0
}

/// Quaternion of a small-angle rotation, `[0.5 * dtheta; 1]` normalized.
pub fn small_angle_quat(dtheta: &Vector3<f64>) -> Vector4<f64> {
    quat_normalize(&Vector4::new(
        0.5 * dtheta[0],
        0.5 * dtheta[1],
        0.5 * dtheta[2],
        1.0,
    ))
}

#[cfg(test)]
mod ut_utils {
    use super::*;
    use crate::linalg::DVector;

    #[test]
    fn tilde_is_antisymmetric() {
        let v = Vector3::new(0.3, -1.2, 2.5);
        let t = tilde_matrix(&v);
        assert_eq!(t.transpose(), -t);
        assert!((t * v).norm() < 1e-15);
    }

    #[test]
    fn reflect_upper_symmetrizes() {
        let mut m = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 9.0, 4.0, 5.0, 9.0, 9.0, 6.0]);
        reflect_upper(&mut m);
        assert_eq!(m, m.transpose());
        assert_eq!(m[(1, 0)], 2.0);
        assert_eq!(m[(2, 1)], 5.0);
    }

    #[test]
    fn givens_zeroes_the_lower_entry() {
        let mut m = DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 4.0, 2.0]);
        let mut r = DVector::from_row_slice(&[1.0, -1.0]);
        let (c, s) = givens_rotation(m[(0, 0)], m[(1, 0)]);
        apply_givens(&mut m, c, s, 1, 0);
        apply_givens(&mut r, c, s, 1, 0);
        assert!(m[(1, 0)].abs() < 1e-14);
        assert!((m[(0, 0)] - 5.0).abs() < 1e-14);
        // Rotations preserve column norms and the residual norm.
        assert!((m.column(1).norm() - 5.0_f64.sqrt()).abs() < 1e-14);
        assert!((r.norm() - 2.0_f64.sqrt()).abs() < 1e-14);
    }

    #[test]
    fn quat_identity_is_neutral() {
        let identity = Vector4::new(0.0, 0.0, 0.0, 1.0);
        let q = quat_normalize(&Vector4::new(0.1, -0.2, 0.3, 0.9));
        assert!((quat_multiply(&identity, &q) - q).norm() < 1e-15);
        assert!((quat_multiply(&q, &identity) - q).norm() < 1e-15);
    }

    #[test]
    fn rot_from_quat_is_orthonormal() {
        let q = quat_normalize(&Vector4::new(0.2, 0.4, -0.1, 0.8));
        let rot = rot_from_quat(&q);
        assert!((rot * rot.transpose() - Matrix3::identity()).norm() < 1e-12);
        assert!((rot.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn small_angle_of_zero_is_identity() {
        let dq = small_angle_quat(&Vector3::zeros());
        assert!((dq - Vector4::new(0.0, 0.0, 0.0, 1.0)).norm() < 1e-15);
    }
}
