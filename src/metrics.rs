/**
This module compares the aligned signature bags and computes the metrics (precision, recall,
f-score, exact match). The scores are micro-averaged: they are computed from the counts summed over
the whole corpus, never averaged over sentences.
*/
use crate::align::AlignedSentence;
use crate::config::ParameterSpec;
use crate::filter::NodeFilter;
use crate::reporter::{Report, Scores, SentenceScore};
use crate::signature::SentenceSignatures;
use itertools::multizip;
use ndarray::{prelude::*, ScalarOperand};
use num::{Float, NumCast};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{debug, warn};

/// Internal extension trait for Num's Float trait
pub trait FloatExt: Float + ScalarOperand + Debug {}

impl<T: Float + ScalarOperand + Debug> FloatExt for T {}

/// Divides element-wise, and replaces by `0` every result whose denominator is `0`.
fn prf_divide<F: FloatExt, D: Dimension>(
    numerator: ArrayView<F, D>,
    mut denominator: Array<F, D>,
) -> Array<F, D> {
    let zero_mask = denominator.mapv(|d| if d == F::zero() { F::zero() } else { F::one() });
    denominator.mapv_inplace(|d| if d == F::zero() { F::one() } else { d });
    (&numerator / &denominator) * zero_mask
}

/// Precision, recall and F1 of every entry of the count arrays.
///
/// * `matched`: Number of signatures found in both bags
/// * `gold`: Size of the gold bags
/// * `candidate`: Size of the candidate bags
fn precision_recall_fscore<F: FloatExt>(
    matched: ArrayView1<F>,
    gold: ArrayView1<F>,
    candidate: ArrayView1<F>,
) -> (Array1<F>, Array1<F>, Array1<F>) {
    let precision = prf_divide(matched, candidate.to_owned());
    let recall = prf_divide(matched, gold.to_owned());
    let two = F::one() + F::one();
    let numerator = &precision * &recall * two;
    let fscore = prf_divide(numerator.view(), &precision + &recall);
    (precision, recall, fscore)
}

fn to_array<F: FloatExt, I: IntoIterator<Item = usize>>(counts: I) -> Array1<F> {
    counts
        .into_iter()
        .map(|c| <F as NumCast>::from(c).unwrap_or_else(F::nan))
        .collect()
}

/// Counts of a single aligned sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceCounts {
    pub number: u32,
    /// Size of the labeled bag intersection.
    pub matched: usize,
    /// Size of the unlabeled bag intersection.
    pub matched_unlabeled: usize,
    pub gold: usize,
    pub candidate: usize,
    /// Both bags are equal, and the candidate sentence exists.
    pub exact: bool,
    pub missing: bool,
}

impl SentenceCounts {
    /// Compares the bags of one sentence. A missing candidate compares as an empty bag and is never
    /// an exact match.
    pub fn compare(
        number: u32,
        gold: &SentenceSignatures,
        candidate: Option<&SentenceSignatures>,
    ) -> Self {
        match candidate {
            Some(candidate) => Self {
                number,
                matched: gold.labeled.intersection_len(&candidate.labeled),
                matched_unlabeled: gold.unlabeled.intersection_len(&candidate.unlabeled),
                gold: gold.labeled.len(),
                candidate: candidate.labeled.len(),
                exact: gold.labeled == candidate.labeled,
                missing: false,
            },
            None => Self {
                number,
                matched: 0,
                matched_unlabeled: 0,
                gold: gold.labeled.len(),
                candidate: 0,
                exact: false,
                missing: true,
            },
        }
    }
}

/// Running totals over the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreAccumulator {
    pub matched: usize,
    pub matched_unlabeled: usize,
    pub total_gold: usize,
    pub total_candidate: usize,
    pub exact_matches: usize,
    /// Gold sentences that were evaluated, missing ones included.
    pub gold_sentences: usize,
    pub missing_sentences: usize,
    /// Gold sentences longer than the cutoff length.
    pub skipped_sentences: usize,
}

impl ScoreAccumulator {
    pub fn add(&mut self, counts: &SentenceCounts) {
        self.matched += counts.matched;
        self.matched_unlabeled += counts.matched_unlabeled;
        self.total_gold += counts.gold;
        self.total_candidate += counts.candidate;
        self.exact_matches += counts.exact as usize;
        self.gold_sentences += 1;
        self.missing_sentences += counts.missing as usize;
    }

    pub fn skip(&mut self) {
        self.skipped_sentences += 1;
    }

    /// Labeled scores, unlabeled scores and exact match rate of the corpus.
    pub fn scores(&self) -> (Scores, Scores, f64) {
        let gold = to_array::<f64, _>([self.total_gold]);
        let candidate = to_array::<f64, _>([self.total_candidate]);
        let labeled = to_array::<f64, _>([self.matched]);
        let unlabeled = to_array::<f64, _>([self.matched_unlabeled]);
        let (p, r, f) = precision_recall_fscore(labeled.view(), gold.view(), candidate.view());
        let (up, ur, uf) = precision_recall_fscore(unlabeled.view(), gold.view(), candidate.view());
        let exact = prf_divide(
            to_array::<f64, _>([self.exact_matches]).view(),
            to_array([self.gold_sentences]),
        );
        (
            Scores::new(p[0], r[0], f[0]),
            Scores::new(up[0], ur[0], uf[0]),
            exact[0],
        )
    }
}

/// Accumulates the aligned sentences one at a time, then produces the `Report` exactly once.
#[derive(Debug, Clone)]
pub struct Evaluator<'p> {
    filter: NodeFilter<'p>,
    accumulator: ScoreAccumulator,
    sentences: Vec<SentenceCounts>,
    missing: Vec<u32>,
}

impl<'p> Evaluator<'p> {
    pub fn new(params: &'p ParameterSpec) -> Self {
        Self {
            filter: NodeFilter::new(params),
            accumulator: ScoreAccumulator::default(),
            sentences: vec![],
            missing: vec![],
        }
    }

    /// Extracts and compares the signatures of an aligned sentence. Returns `None` when the gold
    /// sentence is longer than the cutoff length.
    pub fn add(&mut self, aligned: AlignedSentence<'_>) -> Option<SentenceCounts> {
        if !self.filter.admits_sentence(aligned.gold) {
            debug!(sentence = aligned.number, "skipped, longer than the cutoff length");
            self.accumulator.skip();
            return None;
        }
        if let Some(candidate) = aligned.candidate {
            if candidate.len() != aligned.gold.len() {
                warn!(
                    sentence = aligned.number,
                    gold = aligned.gold.len(),
                    candidate = candidate.len(),
                    "gold and candidate sentences have different lengths"
                );
            }
        }
        let params = self.filter.params();
        let gold = SentenceSignatures::extract(aligned.gold, params);
        let candidate = aligned
            .candidate
            .map(|c| SentenceSignatures::extract(c, params));
        Some(self.add_signatures(aligned.number, &gold, candidate.as_ref()))
    }

    /// Folds the bags of one sentence into the totals.
    pub fn add_signatures(
        &mut self,
        number: u32,
        gold: &SentenceSignatures,
        candidate: Option<&SentenceSignatures>,
    ) -> SentenceCounts {
        let counts = SentenceCounts::compare(number, gold, candidate);
        if counts.missing {
            warn!(sentence = number, "sentence missing in candidate");
            self.missing.push(number);
        }
        debug!(
            sentence = number,
            matched = counts.matched,
            gold = counts.gold,
            candidate = counts.candidate,
            exact = counts.exact,
            "scored sentence"
        );
        self.accumulator.add(&counts);
        self.sentences.push(counts);
        counts
    }

    pub fn accumulator(&self) -> &ScoreAccumulator {
        &self.accumulator
    }

    /// Computes the corpus scores and the per-sentence rows.
    ///
    /// * `ignored`: Candidate sentence numbers unknown to gold, listed in the report.
    pub fn finalize(self, ignored: Vec<u32>) -> Report {
        let (labeled, unlabeled, exact_match) = self.accumulator.scores();
        let matched: Array1<f64> = to_array(self.sentences.iter().map(|s| s.matched));
        let matched_unlabeled: Array1<f64> =
            to_array(self.sentences.iter().map(|s| s.matched_unlabeled));
        let gold: Array1<f64> = to_array(self.sentences.iter().map(|s| s.gold));
        let candidate: Array1<f64> = to_array(self.sentences.iter().map(|s| s.candidate));
        let (p, r, f) = precision_recall_fscore(matched.view(), gold.view(), candidate.view());
        let (up, ur, uf) =
            precision_recall_fscore(matched_unlabeled.view(), gold.view(), candidate.view());
        let sentences = multizip((
            self.sentences.iter(),
            multizip((p.iter(), r.iter(), f.iter())),
            multizip((up.iter(), ur.iter(), uf.iter())),
        ))
        .map(|(counts, (p, r, f), (up, ur, uf))| SentenceScore {
            counts: *counts,
            labeled: Scores::new(*p, *r, *f),
            unlabeled: Scores::new(*up, *ur, *uf),
        })
        .collect();
        Report {
            labeled,
            unlabeled,
            exact_match,
            counts: self.accumulator,
            missing: self.missing,
            ignored,
            sentences,
            show_sentences: self.filter.params().debug(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructure::Yield;
    use crate::signature::Signature;
    use rstest::rstest;

    pub trait CloseEnough {
        fn are_close(&self, other: &Self, eps: f64) -> bool;
    }

    impl CloseEnough for Scores {
        fn are_close(&self, other: &Self, eps: f64) -> bool {
            f64::abs(self.precision - other.precision) < eps
                && f64::abs(self.recall - other.recall) < eps
                && f64::abs(self.fscore - other.fscore) < eps
        }
    }

    fn bags(signatures: &[(&str, &[usize])]) -> SentenceSignatures {
        let mut bags = SentenceSignatures::default();
        for (label, positions) in signatures {
            let terminals = Yield::new(positions.iter().copied());
            bags.unlabeled.insert(terminals.clone());
            bags.labeled.insert(Signature::new(*label, terminals));
        }
        bags
    }

    #[test]
    fn test_prf_divide_masks_zero_denominators() {
        let numerator = array![1., 2., 0., 3.];
        let denominator = array![2., 0., 0., 3.];
        let actual = prf_divide(numerator.view(), denominator);
        assert_eq!(actual, array![0.5, 0., 0., 1.]);
    }

    #[test]
    fn test_precision_recall_fscore() {
        let matched = array![2., 0., 0.];
        let gold = array![4., 0., 3.];
        let candidate = array![2., 0., 0.];
        let (p, r, f) = precision_recall_fscore(matched.view(), gold.view(), candidate.view());
        assert_eq!(p, array![1., 0., 0.]);
        assert_eq!(r, array![0.5, 0., 0.]);
        assert!(f64::abs(f[0] - 2. / 3.) < 1e-12);
        assert_eq!(f[1], 0.);
        assert_eq!(f[2], 0.);
    }

    #[test]
    fn test_multiplicity_rule() {
        let gold = bags(&[("NP", &[1, 2]), ("NP", &[1, 2])]);
        let candidate = bags(&[("NP", &[1, 2]), ("NP", &[1, 2]), ("NP", &[1, 2])]);
        let counts = SentenceCounts::compare(1, &gold, Some(&candidate));
        assert_eq!(counts.matched, 2);
        assert_eq!(counts.gold, 2);
        assert_eq!(counts.candidate, 3);
        assert!(!counts.exact);
    }

    #[test]
    fn test_unlabeled_matching_ignores_labels() {
        let gold = bags(&[("NP", &[0, 1]), ("VP", &[0, 2])]);
        let candidate = bags(&[("PP", &[0, 1]), ("VP", &[0, 1, 2])]);
        let counts = SentenceCounts::compare(1, &gold, Some(&candidate));
        assert_eq!(counts.matched, 0);
        assert_eq!(counts.matched_unlabeled, 1);
    }

    #[rstest]
    #[case(&[("VP", &[0, 2][..])], 1, true)]
    #[case(&[("VP", &[0, 1, 2][..])], 0, false)]
    fn test_discontinuous_match(
        #[case] candidate: &[(&str, &[usize])],
        #[case] matched: usize,
        #[case] exact: bool,
    ) {
        let gold = bags(&[("VP", &[0, 2])]);
        let counts = SentenceCounts::compare(1, &gold, Some(&bags(candidate)));
        assert_eq!(counts.matched, matched);
        assert_eq!(counts.exact, exact);
    }

    #[test]
    fn test_missing_sentence_counts() {
        let gold = bags(&[("S", &[0, 1])]);
        let counts = SentenceCounts::compare(2, &gold, None);
        assert!(counts.missing);
        assert!(!counts.exact);
        assert_eq!((counts.matched, counts.gold, counts.candidate), (0, 1, 0));
        let empty = SentenceCounts::compare(3, &SentenceSignatures::default(), None);
        assert!(!empty.exact);
        let both_empty = SentenceCounts::compare(
            4,
            &SentenceSignatures::default(),
            Some(&SentenceSignatures::default()),
        );
        assert!(both_empty.exact);
    }

    #[test]
    fn test_scores_are_micro_averaged() {
        let params = ParameterSpec::new();
        let mut evaluator = Evaluator::new(&params);
        // 1/1 correct on a short sentence, 0/3 on a long one.
        evaluator.add_signatures(1, &bags(&[("S", &[0])]), Some(&bags(&[("S", &[0])])));
        evaluator.add_signatures(
            2,
            &bags(&[("S", &[0, 1, 2]), ("NP", &[0, 1]), ("VP", &[2])]),
            Some(&bags(&[("S", &[0, 1]), ("NP", &[0]), ("VP", &[1, 2])])),
        );
        let report = evaluator.finalize(vec![]);
        let expected = Scores::new(0.25, 0.25, 0.25);
        assert!(report.labeled.are_close(&expected, 1e-12));
        assert_eq!(report.exact_match, 0.5);
        assert_eq!(report.sentences[0].labeled, Scores::new(1., 1., 1.));
        assert_eq!(report.sentences[1].labeled, Scores::new(0., 0., 0.));
    }

    #[test]
    fn test_empty_accumulator_scores_zero() {
        let (labeled, unlabeled, exact) = ScoreAccumulator::default().scores();
        assert_eq!(labeled, Scores::new(0., 0., 0.));
        assert_eq!(unlabeled, Scores::new(0., 0., 0.));
        assert_eq!(exact, 0.);
    }

    #[test]
    fn test_accumulator_is_order_independent() {
        let rows = [
            SentenceCounts::compare(1, &bags(&[("S", &[0])]), None),
            SentenceCounts::compare(
                2,
                &bags(&[("S", &[0, 1]), ("NP", &[0])]),
                Some(&bags(&[("S", &[0, 1])])),
            ),
        ];
        let mut forward = ScoreAccumulator::default();
        rows.iter().for_each(|r| forward.add(r));
        let mut backward = ScoreAccumulator::default();
        rows.iter().rev().for_each(|r| backward.add(r));
        assert_eq!(forward, backward);
        assert_eq!(forward.missing_sentences, 1);
        assert_eq!(forward.total_gold, 3);
    }
}
