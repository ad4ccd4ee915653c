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

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Configuration file errors.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("failed to read the configuration: {source}"))]
    ReadError { source: std::io::Error },
    #[snafu(display("failed to parse the configuration: {source}"))]
    ParseError { source: serde_yaml::Error },
}

/// Manager options of the state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateOptions {
    /// Maximum number of pose clones kept in the sliding window.
    pub max_clone_size: usize,
    /// ArUco landmarks occupy feature ids up to four times this count and
    /// are never marginalized.
    pub max_aruco_features: usize,
    /// Number of cameras carrying calibration entries.
    pub num_cameras: usize,
    /// Estimate the camera-to-IMU time offset online.
    pub do_calib_camera_timeoffset: bool,
    /// Estimate the camera intrinsics online.
    pub do_calib_camera_intrinsics: bool,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            max_clone_size: 11,
            max_aruco_features: 1024,
            num_cameras: 1,
            do_calib_camera_timeoffset: false,
            do_calib_camera_intrinsics: false,
        }
    }
}

impl StateOptions {
    /// Loads the options from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Loads the options from a YAML string.
    pub fn loads(data: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(data).context(ParseSnafu)
    }
}

#[cfg(test)]
mod ut_options {
    use super::StateOptions;

    #[test]
    fn defaults_match_a_stereo_ready_window() {
        let opts = StateOptions::default();
        assert_eq!(opts.max_clone_size, 11);
        assert_eq!(opts.num_cameras, 1);
        assert!(!opts.do_calib_camera_timeoffset);
        assert!(!opts.do_calib_camera_intrinsics);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let opts = StateOptions::loads("max_clone_size: 5\ndo_calib_camera_timeoffset: true\n")
            .unwrap();
        assert_eq!(opts.max_clone_size, 5);
        assert!(opts.do_calib_camera_timeoffset);
        assert_eq!(opts.max_aruco_features, 1024);
    }
}
