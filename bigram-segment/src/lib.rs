use std::cmp::Ordering;
use std::path::Path;
use std::str::CharIndices;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};
use smartstring::alias::String;

mod table;
pub use table::{ProbabilityTable, DEFAULT_LOG_TOTAL};

#[cfg(feature = "test-cases")]
pub mod test_cases;
#[cfg(feature = "__test_data")]
pub mod test_data;

/// Central data structure used to find the most probable segmentation of a text
///
/// Holds one unigram and one bigram [`ProbabilityTable`]. Both are read-only after
/// construction, so a single `Segmenter` can serve many threads as long as each of them uses
/// its own [`Search`].
#[cfg_attr(feature = "with-serde", derive(Deserialize, Serialize))]
#[derive(Clone, Debug)]
pub struct Segmenter {
    unigrams: ProbabilityTable,
    bigrams: ProbabilityTable,
    limit: usize,
}

impl Segmenter {
    /// Create a `Segmenter` from the given tables, using the default word length limit
    pub fn new(unigrams: ProbabilityTable, bigrams: ProbabilityTable) -> Self {
        Self {
            unigrams,
            bigrams,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Create a `Segmenter` from the total and frequency files of both tables
    ///
    /// Missing or malformed files never fail construction; see [`ProbabilityTable::from_files`].
    pub fn from_files<P: AsRef<Path>>(
        unigram_total: P,
        unigram_frequencies: P,
        bigram_total: P,
        bigram_frequencies: P,
        limit: usize,
    ) -> Self {
        let mut segmenter = Self::new(
            ProbabilityTable::from_files(unigram_total, unigram_frequencies),
            ProbabilityTable::from_files(bigram_total, bigram_frequencies),
        );
        segmenter.set_limit(limit);
        segmenter
    }

    /// Load the model called `name` from the `path` directory
    ///
    /// The model directory contains `total.tsv` and `frequencies.tsv` for unigrams, and the
    /// same files with a `2_` prefix for bigrams.
    pub fn from_model_dir(path: impl AsRef<Path>, name: &str, limit: usize) -> Self {
        let dir = path.as_ref().join(name);
        Self::from_files(
            dir.join(TOTAL_FILE),
            dir.join(FREQUENCIES_FILE),
            dir.join(format!("{}{}", BIGRAM_PREFIX, TOTAL_FILE)),
            dir.join(format!("{}{}", BIGRAM_PREFIX, FREQUENCIES_FILE)),
            limit,
        )
    }

    /// Segment the text in `input`
    ///
    /// The `search` parameter contains the buffers used during segmentation. Passing it in
    /// allows callers to reuse its allocations; its contents are reset first, so nothing carries
    /// over from earlier calls.
    pub fn segment<'a>(&self, input: &str, search: &'a mut Search) -> Segmentation<'a> {
        search.clear();
        search.bounds.extend(input.char_indices().map(|(idx, _)| idx));
        search.bounds.push(input.len());

        // `best[start]` holds the score of the best segmentation of the suffix starting at code
        // point `start`, and the code point where its first word ends
        let len = search.bounds.len() - 1;
        search.best.resize(len + 1, (0.0, len));
        for start in (0..len).rev() {
            let previous = context(input, &search.bounds, start, SENTENCE_START);
            let from = search.bounds[start];
            let mut best = None;
            for end in start + 1..=len.min(start + self.limit) {
                let head = &input[from..search.bounds[end]];
                let score = self
                    .conditional_log_prob(head, previous)
                    .unwrap_or(UNKNOWN_LOG_PROB)
                    + search.best[end].0;

                // All candidates concatenate to the same suffix, so ties keep the shortest head
                match best {
                    Some((top, _)) if score.total_cmp(&top) != Ordering::Greater => {}
                    _ => best = Some((score, end)),
                }
            }

            search.best[start] = match best {
                Some(best) => best,
                None => unreachable!("{} for non-empty text {:?}", NoCandidates, input),
            };
        }

        let mut start = 0;
        while start < len {
            let end = search.best[start].1;
            let word = &input[search.bounds[start]..search.bounds[end]];
            search.result.push(word.into());
            start = end;
        }

        search.score = search.best[0].0;
        Segmentation {
            words: search.result.iter(),
            score: search.score,
        }
    }

    /// Best segmentation of `text` when it follows the word `previous`
    ///
    /// Fills `memo` with the best segmentation of every suffix of `text`, from the shortest to
    /// the longest. Entries are keyed by the suffix only: each suffix is scored once, in the
    /// context of the code point before it (or `previous` for `text` itself), and reused
    /// whatever word precedes it later. Suffixes already in `memo` are not recomputed.
    ///
    /// [`Segmenter::segment()`] finds the same result without keeping every suffix's words.
    pub fn segment_recurse(&self, text: &str, previous: &str, memo: &mut Memo) -> ProbTuple {
        if text.is_empty() {
            return ProbTuple::default();
        }

        if let Some(best) = memo.get(text) {
            return best.clone();
        }

        let bounds = text.char_indices().map(|(idx, _)| idx).collect::<Vec<_>>();
        for start in (0..bounds.len()).rev() {
            let suffix = &text[bounds[start]..];
            if memo.contains_key(suffix) {
                continue;
            }

            let previous = context(text, &bounds, start, previous);
            let candidates = split(suffix, self.limit).map(|(head, tail)| {
                let log_prob = self
                    .conditional_log_prob(head, previous)
                    .unwrap_or(UNKNOWN_LOG_PROB);
                match memo.get(tail) {
                    Some(best) => best.combine(log_prob, head),
                    None => ProbTuple::default().combine(log_prob, head),
                }
            });

            let best = match ProbTuple::max_of(candidates) {
                Ok(best) => best,
                Err(e) => unreachable!("{} for non-empty text {:?}", e, suffix),
            };

            memo.insert(suffix.into(), best);
        }

        memo[text].clone()
    }

    /// Log₂ probability of `word` on its own
    pub fn unigram_log_prob(&self, word: &str) -> Option<f64> {
        self.unigrams.log_prob(word)
    }

    /// Log₂ probability of `word` following `previous`
    ///
    /// Backs off to the unigram probability if the pair is not in the bigram table. Returns
    /// `None` only if `word` is unknown to both tables.
    pub fn conditional_log_prob(&self, word: &str, previous: &str) -> Option<f64> {
        let mut key = String::new();
        key.push_str(previous);
        key.push(' ');
        key.push_str(word);

        match self.bigrams.log_prob(&key) {
            Some(log_prob) => Some(log_prob),
            None => self.unigram_log_prob(word),
        }
    }

    /// Returns the sentence's score
    ///
    /// Sums the log₂ probability of each word given the one before it, starting from the
    /// sentence start. Will return `None` iff given an empty iterator argument.
    pub fn score_sentence<'a>(&self, mut words: impl Iterator<Item = &'a str>) -> Option<f64> {
        let mut previous = words.next()?;
        let mut score = self
            .conditional_log_prob(previous, SENTENCE_START)
            .unwrap_or(UNKNOWN_LOG_PROB);
        for word in words {
            score += self
                .conditional_log_prob(word, previous)
                .unwrap_or(UNKNOWN_LOG_PROB);
            previous = word;
        }

        Some(score)
    }

    pub fn unigrams(&self) -> &ProbabilityTable {
        &self.unigrams
    }

    pub fn bigrams(&self) -> &ProbabilityTable {
        &self.bigrams
    }

    /// Maximum word length, in Unicode code points
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Customize the word length `limit`, which is at least 1
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
    }
}

/// Iterator over the words found by [`Segmenter::segment()`]
pub struct Segmentation<'a> {
    words: std::slice::Iter<'a, String>,
    score: f64,
}

impl<'a> Segmentation<'a> {
    /// Log₂ probability of the segmentation
    pub fn score(&self) -> f64 {
        self.score
    }
}

impl<'a> Iterator for Segmentation<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.words.next().map(|word| word.as_str())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.words.size_hint()
    }
}

impl<'a> ExactSizeIterator for Segmentation<'a> {}

/// Buffers for a single segmentation
#[derive(Clone, Default)]
pub struct Search {
    bounds: Vec<usize>,
    best: Vec<(f64, usize)>,
    result: Vec<String>,
    score: f64,
}

impl Search {
    fn clear(&mut self) {
        self.bounds.clear();
        self.best.clear();
        self.result.clear();
        self.score = 0.0;
    }

    /// Get the word at `idx` from the most recent search result
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.result.get(idx).map(|word| word.as_str())
    }
}

/// Best segmentations found so far, keyed by the remaining text
pub type Memo = HashMap<String, ProbTuple>;

/// A candidate segmentation and its cumulative log₂ probability
#[derive(Clone, Debug, PartialEq)]
pub struct ProbTuple {
    pub log_prob: f64,
    pub tokens: Vec<String>,
}

impl ProbTuple {
    /// Prepend `first` with probability `log_prob` to this tuple
    pub fn combine(&self, log_prob: f64, first: &str) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.push(first.into());
        tokens.extend(self.tokens.iter().cloned());
        Self {
            log_prob: log_prob + self.log_prob,
            tokens,
        }
    }

    /// Order by log₂ probability, ranking the smaller concatenation higher on ties
    pub fn cmp_score(&self, other: &Self) -> Ordering {
        self.log_prob
            .total_cmp(&other.log_prob)
            .then_with(|| other.chars().cmp(self.chars()))
    }

    /// Select the best candidate; on a complete tie the earliest one wins
    pub fn max_of<I>(candidates: I) -> Result<Self, NoCandidates>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut candidates = candidates.into_iter();
        let mut best = candidates.next().ok_or(NoCandidates)?;
        for candidate in candidates {
            if candidate.cmp_score(&best) == Ordering::Greater {
                best = candidate;
            }
        }

        Ok(best)
    }

    fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.tokens.iter().flat_map(|token| token.chars())
    }
}

impl Default for ProbTuple {
    /// The segmentation of the empty string: no tokens, with probability 1
    fn default() -> Self {
        Self {
            log_prob: 0.0,
            tokens: Vec::new(),
        }
    }
}

/// Returns all `(head, tail)` splits of `text` with a head of at most `limit` code points
///
/// Splits are yielded in order of increasing head length.
pub fn split(text: &str, limit: usize) -> Splits<'_> {
    Splits {
        text,
        chars: text.char_indices(),
        remaining: text.chars().count().min(limit),
    }
}

pub struct Splits<'a> {
    text: &'a str,
    chars: CharIndices<'a>,
    remaining: usize,
}

impl<'a> Iterator for Splits<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let (idx, c) = self.chars.next()?;
        self.remaining -= 1;
        let end = idx + c.len_utf8();
        Some((&self.text[..end], &self.text[end..]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a> ExactSizeIterator for Splits<'a> {}

#[derive(Debug)]
pub struct NoCandidates;

impl std::error::Error for NoCandidates {}

impl std::fmt::Display for NoCandidates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("no candidate segmentations")
    }
}

/// Word preceding the suffix at code point `start`, as first seen by a depth-first search
///
/// A depth-first search reaches every suffix first through single code point words, so the
/// context is the code point just before it, or `first` for the whole text.
fn context<'t>(text: &'t str, bounds: &[usize], start: usize, first: &'t str) -> &'t str {
    match start {
        0 => first,
        _ => &text[bounds[start - 1]..bounds[start]],
    }
}

type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;

/// Previous word for the first word of every text
///
/// Bigram tables may contain pairs starting with this marker, e.g. `<S> the`.
pub const SENTENCE_START: &str = "<S>";
/// Log₂ probability of words that neither table knows about
pub const UNKNOWN_LOG_PROB: f64 = f64::NEG_INFINITY;
pub const DEFAULT_LIMIT: usize = 20;

const TOTAL_FILE: &str = "total.tsv";
const FREQUENCIES_FILE: &str = "frequencies.tsv";
const BIGRAM_PREFIX: &str = "2_";
