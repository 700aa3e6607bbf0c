//! Common helpers for the simulator integration tests.
//!
//! Provides a standard scenario configuration and policy construction
//! shortcuts shared by the test files.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use rohc_pomdp::{
    AugmentedState, ChannelParams, DecisionKind, PolicyPiece, PolicySet, SimConfig,
};
use tempfile::NamedTempFile;

/// Window capacity of the standard test scenario.
pub const TEST_WINDOW: usize = 8;

/// Symmetric channel used by most scenarios: pGB = pBG = 0.125.
pub fn symmetric_config(seed: u64, steps: usize) -> SimConfig {
    SimConfig {
        seed,
        steps,
        window_capacity: TEST_WINDOW,
        channel: ChannelParams::Transition {
            p_good_to_bad: 0.125,
            p_bad_to_good: 0.125,
        },
        ..Default::default()
    }
}

/// Policy with a single all-ones piece recommending `decision`.
pub fn constant_policy(decision: DecisionKind, window_capacity: usize) -> PolicySet {
    let dimension = AugmentedState::dimension(window_capacity);
    PolicySet::new(vec![PolicyPiece::new(vec![1.0; dimension], decision)], dimension)
        .expect("constant policy is valid")
}

/// Policy that sends Full while the receiver likely lacks context and
/// Minimal once FullContext dominates.
pub fn context_aware_policy(window_capacity: usize) -> PolicySet {
    let dimension = AugmentedState::dimension(window_capacity);
    let mut full = vec![0.0; dimension];
    full[..4].iter_mut().for_each(|value| *value = 1.0);
    let mut minimal = vec![0.0; dimension];
    minimal[4..].iter_mut().for_each(|value| *value = 1.0);
    PolicySet::new(
        vec![
            PolicyPiece::new(full, DecisionKind::Full),
            PolicyPiece::new(minimal, DecisionKind::Minimal),
        ],
        dimension,
    )
    .expect("context-aware policy is valid")
}

/// Writes `contents` to a temporary policy file kept alive by the returned handle.
pub fn write_policy_file(contents: &str) -> (NamedTempFile, PathBuf) {
    let mut file = NamedTempFile::new().expect("Failed to create temporary policy file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temporary policy file");
    file.flush().expect("Failed to flush temporary policy file");
    let path = file.path().to_path_buf();
    (file, path)
}
