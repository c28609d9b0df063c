use std::path::PathBuf;

use once_cell::sync::Lazy;
use rayon::prelude::*;

use bigram_segment::{Search, Segmenter, DEFAULT_LIMIT};

macro_rules! assert_segments {
    ($list:expr) => {
        let mut search = Search::default();
        let words = SEGMENTER
            .segment(&$list.join(""), &mut search)
            .collect::<Vec<_>>();
        assert_eq!(words, $list);
    };
}

#[test]
fn test_segment_0() {
    assert_segments!(&["the", "boy", "who", "lived"]);
}

#[test]
fn test_segment_1() {
    assert_segments!(&["this", "is", "a", "test"]);
}

#[test]
fn test_segment_2() {
    assert_segments!(&["choose", "spain"]);
}

#[test]
fn test_segment_3() {
    assert_segments!(&["who", "represents"]);
}

#[test]
fn test_segment_4() {
    assert_segments!(&["experts", "exchange"]);
}

#[test]
fn test_segment_5() {
    assert_segments!(&["speed", "of", "art"]);
}

#[test]
fn test_segment_6() {
    assert_segments!(&["now", "is", "the", "time", "for", "all", "good"]);
}

#[test]
fn empty() {
    let mut search = Search::default();
    let words = SEGMENTER.segment("", &mut search);
    assert_eq!(words.score(), 0.0);
    assert_eq!(words.count(), 0);
}

#[test]
fn preserves_text() {
    let mut search = Search::default();
    for text in &[
        "theboywholived",
        "The Boy, who lived!",
        "xyzzy",
        "日本語のテキスト",
        "naïvecafé",
        "thisisatestthatgoesonandonandonandonandonandonandonwithoutend",
    ] {
        let words = SEGMENTER.segment(text, &mut search).collect::<Vec<_>>();
        assert!(!words.is_empty());
        assert!(words.iter().all(|w| !w.is_empty()));
        assert!(words.iter().all(|w| w.chars().count() <= DEFAULT_LIMIT));
        assert_eq!(words.concat(), *text);
    }
}

#[test]
fn long_text() {
    let text = "theboywholived".repeat(8_000);
    let mut search = Search::default();
    let words = SEGMENTER.segment(&text, &mut search).collect::<Vec<_>>();
    assert_eq!(words.concat(), text);
}

#[test]
fn unknown_text() {
    let mut search = Search::default();
    let words = SEGMENTER.segment("xqz", &mut search).collect::<Vec<_>>();
    assert_eq!(words, vec!["x", "q", "z"]);
}

#[test]
fn limit() {
    let mut segmenter = (*SEGMENTER).clone();
    segmenter.set_limit(3);
    let mut search = Search::default();
    let words = segmenter
        .segment("theboywholived", &mut search)
        .collect::<Vec<_>>();
    assert!(words.iter().all(|w| w.chars().count() <= 3));
    assert_eq!(words.concat(), "theboywholived");
}

#[test]
fn deterministic() {
    let mut search = Search::default();
    let (first, score) = {
        let words = SEGMENTER.segment("theboywholived", &mut search);
        let score = words.score();
        (words.map(String::from).collect::<Vec<_>>(), score)
    };

    // Interleave a different text to make sure nothing leaks through the reused buffers
    SEGMENTER.segment("whorepresents", &mut search);

    let words = SEGMENTER.segment("theboywholived", &mut search);
    assert_eq!(words.score(), score);
    assert_eq!(words.collect::<Vec<_>>(), first);

    let mut fresh = Search::default();
    let words = SEGMENTER.segment("theboywholived", &mut fresh);
    assert_eq!(words.collect::<Vec<_>>(), first);
}

#[test]
fn concurrent() {
    let cases: [&[&str]; 4] = [
        &["the", "boy", "who", "lived"],
        &["choose", "spain"],
        &["speed", "of", "art"],
        &["now", "is", "the", "time", "for", "all", "good"],
    ];
    let texts = cases.iter().cycle().take(64).collect::<Vec<_>>();

    let results = texts
        .par_iter()
        .map_init(Search::default, |search, words| {
            SEGMENTER
                .segment(&words.join(""), search)
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    for (words, result) in texts.into_iter().zip(results) {
        assert_eq!(result, *words);
    }
}

#[cfg(feature = "with-serde")]
#[test]
fn snapshot() {
    let bytes = bincode::serialize(&*SEGMENTER).unwrap();
    let segmenter = bincode::deserialize::<Segmenter>(&bytes).unwrap();
    assert_eq!(segmenter.limit(), SEGMENTER.limit());
    assert_eq!(
        segmenter.unigram_log_prob("the"),
        SEGMENTER.unigram_log_prob("the")
    );

    let mut search = Search::default();
    let words = segmenter
        .segment("theboywholived", &mut search)
        .collect::<Vec<_>>();
    assert_eq!(words, vec!["the", "boy", "who", "lived"]);
}

static SEGMENTER: Lazy<Segmenter> = Lazy::new(|| {
    Segmenter::from_model_dir(
        PathBuf::from(format!("{}/../data", env!("CARGO_MANIFEST_DIR"))),
        "small",
        DEFAULT_LIMIT,
    )
});
