#![cfg(feature = "__test_data")]

use std::path::PathBuf;

use super::{Segmenter, DEFAULT_LIMIT};

#[test]
fn test_data() {
    crate::test_cases::run(&segmenter(crate_data_dir()));
}

/// Load the `small` model from `dir`
pub fn segmenter(dir: PathBuf) -> Segmenter {
    let segmenter = Segmenter::from_model_dir(&dir, "small", DEFAULT_LIMIT);
    assert!(
        !segmenter.unigrams().is_empty() && !segmenter.bigrams().is_empty(),
        "no model data found in {:?}",
        dir
    );
    segmenter
}

pub fn crate_data_dir() -> PathBuf {
    PathBuf::from(format!("{}/../data", env!("CARGO_MANIFEST_DIR")))
}
