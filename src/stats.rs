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

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Returns the 0.95 quantile of the chi-squared distribution with `dof`
/// degrees of freedom, the threshold the Mahalanobis gate compares against.
pub fn chi_squared_quantile_95(dof: usize) -> f64 {
    assert!(
        dof > 0,
        "chi-squared quantile requires at least one degree of freedom"
    );
    ChiSquared::new(dof as f64).unwrap().inverse_cdf(0.95)
}

#[cfg(test)]
mod ut_stats {
    use super::chi_squared_quantile_95;

    #[test]
    fn matches_tabulated_values() {
        // Standard 95% critical values.
        assert!((chi_squared_quantile_95(1) - 3.841).abs() < 5e-3);
        assert!((chi_squared_quantile_95(2) - 5.991).abs() < 5e-3);
        assert!((chi_squared_quantile_95(3) - 7.815).abs() < 5e-3);
        assert!((chi_squared_quantile_95(6) - 12.592).abs() < 5e-3);
        assert!((chi_squared_quantile_95(10) - 18.307).abs() < 5e-3);
    }

    #[test]
    fn grows_with_the_degrees_of_freedom() {
        let mut prev = 0.0;
        for dof in 1..50 {
            let quantile = chi_squared_quantile_95(dof);
            assert!(quantile > prev);
            prev = quantile;
        }
    }
}
