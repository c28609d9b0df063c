use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};
#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};
use smartstring::alias::String;

use crate::HashMap;

/// Log₂ probabilities for exact keys, derived from raw frequency counts
///
/// Keys are single words for unigram tables and `"previous word"` pairs (joined by a single
/// space) for bigram tables. Tables are built once and never modified afterwards.
#[cfg_attr(feature = "with-serde", derive(Deserialize, Serialize))]
#[derive(Clone, Debug)]
pub struct ProbabilityTable {
    log_total: f64,
    entries: HashMap<String, f64>,
}

impl ProbabilityTable {
    /// Load a table from a total-count file and a frequency file
    ///
    /// Neither file has to exist. A missing total is replaced by [`DEFAULT_LOG_TOTAL`], a
    /// missing frequency file yields an empty table.
    pub fn from_files(total: impl AsRef<Path>, frequencies: impl AsRef<Path>) -> Self {
        let (total, frequencies) = (total.as_ref(), frequencies.as_ref());
        let table = Self::from_readers(open(total), open(frequencies));
        debug!(
            "loaded {} entries from {:?} (log total {})",
            table.len(),
            frequencies,
            table.log_total
        );
        table
    }

    /// Build a table from two line sources
    ///
    /// The first line of `total` that parses as a number is the total count. Every line of
    /// `frequencies` holds whitespace-separated fields: the last one is the raw frequency, all
    /// others make up the key. Lines with fewer than two fields are skipped, while the first
    /// frequency that fails to parse ends the scan.
    pub fn from_readers<T, F>(total: Option<T>, frequencies: Option<F>) -> Self
    where
        T: BufRead,
        F: BufRead,
    {
        let log_total = log_total(total.map_or(0.0, read_total));
        let mut entries = HashMap::default();
        if let Some(reader) = frequencies {
            read_frequencies(reader, |key, freq| {
                entries.insert(key, freq.log2() - log_total);
            });
        }

        Self { log_total, entries }
    }

    /// Build a table from in-memory counts
    ///
    /// Note: the `String` type used in this API is defined in the `smartstring` crate. Any
    /// `&str` or `String` can be converted into it by calling `into()` on it.
    pub fn from_counts<I>(total: f64, counts: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let log_total = log_total(total);
        Self {
            entries: counts
                .into_iter()
                .map(|(key, freq)| (key, freq.log2() - log_total))
                .collect(),
            log_total,
        }
    }

    /// Log₂ probability of `key`, or `None` if the table doesn't contain it
    pub fn log_prob(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// Log₂ of the total count used as the denominator for all entries
    pub fn log_total(&self) -> f64 {
        self.log_total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ProbabilityTable {
    fn default() -> Self {
        Self {
            log_total: DEFAULT_LOG_TOTAL,
            entries: HashMap::default(),
        }
    }
}

fn open(path: &Path) -> Option<BufReader<File>> {
    match File::open(path) {
        Ok(f) => Some(BufReader::new(f)),
        Err(e) => {
            info!("unable to open {:?}: {}", path, e);
            None
        }
    }
}

fn log_total(total: f64) -> f64 {
    match total == 0.0 {
        true => DEFAULT_LOG_TOTAL,
        false => total.log2(),
    }
}

/// Returns the first line of `reader` that parses as a number, or 0
fn read_total(mut reader: impl BufRead) -> f64 {
    let mut buf = Vec::new();
    while let Some(ln) = next_line(&mut reader, &mut buf) {
        if let Ok(total) = f64::from_str(ln.trim()) {
            return total;
        }
    }

    info!("no total count found");
    0.0
}

fn read_frequencies(mut reader: impl BufRead, mut insert: impl FnMut(String, f64)) {
    let mut buf = Vec::new();
    let mut i = 0;
    while let Some(ln) = next_line(&mut reader, &mut buf) {
        i += 1;
        let fields = ln.split_whitespace().collect::<Vec<_>>();
        let (last, key) = match fields.split_last() {
            Some((last, key)) if !key.is_empty() => (*last, key),
            _ => continue,
        };

        let freq = match f64::from_str(last) {
            Ok(freq) => freq,
            Err(e) => {
                info!("stopped reading frequencies at line {}: {}", i, e);
                break;
            }
        };

        let mut joined = String::new();
        for (j, field) in key.iter().enumerate() {
            if j > 0 {
                joined.push(' ');
            }
            joined.push_str(field);
        }

        insert(joined, freq);
    }
}

/// Read the next line into `buf`, returning `None` at the end of the stream
///
/// Invalid UTF-8 is replaced with U+FFFD. Read errors are treated as the end of the stream.
fn next_line<'b>(reader: &mut impl BufRead, buf: &'b mut Vec<u8>) -> Option<Cow<'b, str>> {
    buf.clear();
    match reader.read_until(b'\n', buf) {
        Ok(0) => None,
        Ok(_) => Some(std::string::String::from_utf8_lossy(buf)),
        Err(e) => {
            info!("read error: {}", e);
            None
        }
    }
}

/// Log₂ total used when no total count is available
///
/// This stands in for an astronomically large corpus, so that every entry in the table gets a
/// very low probability.
pub const DEFAULT_LOG_TOTAL: f64 = 32.0;
