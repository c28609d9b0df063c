use bigram_segment::{ProbabilityTable, Search, Segmenter, SENTENCE_START};

fn main() {
    let unigrams = ProbabilityTable::from_counts(
        100.0,
        vec![
            ("choose".into(), 50.0),
            ("chooses".into(), 10.0),
            ("spain".into(), 50.0),
            ("pain".into(), 10.0),
        ],
    );

    let bigrams = ProbabilityTable::from_counts(
        50.0,
        vec![
            (format!("{} choose", SENTENCE_START).into(), 10.0),
            ("choose spain".into(), 10.0),
            ("chooses pain".into(), 10.0),
        ],
    );

    let segmenter = Segmenter::new(unigrams, bigrams);
    let mut search = Search::default();

    let words = segmenter.segment("choosespain", &mut search);
    let score = words.score();
    println!("{:.2}: {:?}", score, words.collect::<Vec<&str>>());
}
