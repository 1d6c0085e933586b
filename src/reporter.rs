/**
This modules holds the result of an evaluation and prettyprints it: an optional per-sentence table
followed by the corpus summary.
*/
use crate::metrics::{ScoreAccumulator, SentenceCounts};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Precision, recall and F1, as fractions between 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub fscore: f64,
}

impl Scores {
    pub fn new(precision: f64, recall: f64, fscore: f64) -> Self {
        Self {
            precision,
            recall,
            fscore,
        }
    }
}

impl Display for Scores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}, {:.2}, {:.2}",
            percent(self.precision),
            percent(self.recall),
            percent(self.fscore)
        )
    }
}

fn percent(x: f64) -> f64 {
    x * 100.
}

/// One row of the per-sentence table. These scores are informative only: the corpus scores are
/// never derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentenceScore {
    #[serde(flatten)]
    pub counts: SentenceCounts,
    pub labeled: Scores,
    pub unlabeled: Scores,
}

impl Display for SentenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>6} {:>7.2} {:>7.2} {:>7.2} {:>7.2} {:>7.2} {:>7.2} {:>6} {:>6} {:>5} {:>5}",
            self.counts.number,
            percent(self.labeled.precision),
            percent(self.labeled.recall),
            percent(self.labeled.fscore),
            percent(self.unlabeled.precision),
            percent(self.unlabeled.recall),
            percent(self.unlabeled.fscore),
            self.counts.matched,
            self.counts.matched_unlabeled,
            self.counts.gold,
            self.counts.candidate,
        )?;
        if self.counts.missing {
            write!(f, " missing")?;
        }
        Ok(())
    }
}

/// Result of an evaluation. The scores are computed once, from the counts summed over the whole
/// corpus. The report can be displayed or serialized.
///
/// # Example
///
/// ```rust
/// use disceval::{evaluate, Corpus, ParameterSpec};
///
/// let gold = Corpus::parse("gold", "\
/// #BOS 1
/// Peter   NE    --  SB  500
/// lacht   VVFIN --  HD  500
/// #500    S     --  --  0
/// #EOS 1
/// ").unwrap();
///
/// let report = evaluate(&gold, &gold, &ParameterSpec::new());
/// assert_eq!(report.labeled.fscore, 1.0);
/// assert_eq!(report.exact_match, 1.0);
/// assert!(report.to_string().contains("LF1 : 100.00"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub labeled: Scores,
    pub unlabeled: Scores,
    /// Fraction of the gold sentences whose bags are equal to the candidate ones.
    pub exact_match: f64,
    pub counts: ScoreAccumulator,
    /// Gold sentences absent from the candidate corpus.
    pub missing: Vec<u32>,
    /// Candidate sentences absent from the gold corpus.
    pub ignored: Vec<u32>,
    pub sentences: Vec<SentenceScore>,
    #[serde(skip)]
    pub(crate) show_sentences: bool,
}

impl Report {
    /// Displays the per-sentence table before the summary.
    pub fn with_sentence_table(mut self, show: bool) -> Self {
        self.show_sentences = show;
        self
    }

    pub fn shows_sentence_table(&self) -> bool {
        self.show_sentences
    }
}

fn summary_line(f: &mut fmt::Formatter<'_>, name: &str, value: impl Display) -> fmt::Result {
    writeln!(f, "{name:<31}: {value}")
}

fn metric_line(f: &mut fmt::Formatter<'_>, name: &str, value: f64) -> fmt::Result {
    writeln!(f, "{name:<4}: {:6.2}", percent(value))
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.show_sentences {
            writeln!(
                f,
                "{:>6} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>6} {:>6} {:>5} {:>5}",
                "sent.",
                "prec.",
                "rec.",
                "fb1",
                "uprec.",
                "urec.",
                "ufb1",
                "match",
                "umatch",
                "gold",
                "test"
            )?;
            writeln!(f, "{}", "-".repeat(80))?;
            for sentence in self.sentences.iter() {
                writeln!(f, "{}", sentence)?
            }
            writeln!(f)?;
        }
        writeln!(f, "Summary")?;
        writeln!(f, "=======")?;
        let counts = &self.counts;
        summary_line(f, "Sentences in key", counts.gold_sentences)?;
        summary_line(f, "Sentences missing in answer", counts.missing_sentences)?;
        summary_line(f, "Sentences skipped (length)", counts.skipped_sentences)?;
        summary_line(f, "Sentences ignored in answer", self.ignored.len())?;
        writeln!(f)?;
        summary_line(f, "Total edges in key", counts.total_gold)?;
        summary_line(f, "Total edges in answer", counts.total_candidate)?;
        summary_line(f, "Total matching edges (labeled)", counts.matched)?;
        summary_line(f, "Total matching edges (unlab.)", counts.matched_unlabeled)?;
        writeln!(f)?;
        metric_line(f, "LP", self.labeled.precision)?;
        metric_line(f, "LR", self.labeled.recall)?;
        metric_line(f, "LF1", self.labeled.fscore)?;
        metric_line(f, "UP", self.unlabeled.precision)?;
        metric_line(f, "UR", self.unlabeled.recall)?;
        metric_line(f, "UF1", self.unlabeled.fscore)?;
        metric_line(f, "EX", self.exact_match)?;
        if !self.missing.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "Sentences missing in answer: {}",
                self.missing.iter().join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(show_sentences: bool) -> Report {
        let rows = [
            SentenceCounts {
                number: 1,
                matched: 2,
                matched_unlabeled: 3,
                gold: 3,
                candidate: 4,
                exact: false,
                missing: false,
            },
            SentenceCounts {
                number: 2,
                matched: 0,
                matched_unlabeled: 0,
                gold: 1,
                candidate: 0,
                exact: false,
                missing: true,
            },
        ];
        let mut counts = ScoreAccumulator::default();
        rows.iter().for_each(|r| counts.add(r));
        Report {
            labeled: Scores::new(0.5, 0.5, 0.5),
            unlabeled: Scores::new(0.75, 0.75, 0.75),
            exact_match: 0.,
            counts,
            missing: vec![2],
            ignored: vec![],
            sentences: vec![
                SentenceScore {
                    counts: rows[0],
                    labeled: Scores::new(0.5, 2. / 3., 4. / 7.),
                    unlabeled: Scores::new(0.75, 1., 6. / 7.),
                },
                SentenceScore {
                    counts: rows[1],
                    labeled: Scores::default(),
                    unlabeled: Scores::default(),
                },
            ],
            show_sentences,
        }
    }

    #[test]
    fn test_summary() {
        let expected = "\
Summary
=======
Sentences in key               : 2
Sentences missing in answer    : 1
Sentences skipped (length)     : 0
Sentences ignored in answer    : 0

Total edges in key             : 4
Total edges in answer          : 4
Total matching edges (labeled) : 2
Total matching edges (unlab.)  : 3

LP  :  50.00
LR  :  50.00
LF1 :  50.00
UP  :  75.00
UR  :  75.00
UF1 :  75.00
EX  :   0.00

Sentences missing in answer: 2
";
        assert_eq!(report(false).to_string(), expected);
    }

    #[test]
    fn test_sentence_table() {
        let actual = report(true).to_string();
        let mut lines = actual.lines();
        assert_eq!(
            lines.next(),
            Some(" sent.   prec.    rec.     fb1  uprec.   urec.    ufb1  match umatch  gold  test")
        );
        lines.next();
        assert_eq!(
            lines.next(),
            Some("     1   50.00   66.67   57.14   75.00  100.00   85.71      2      3     3     4")
        );
        assert_eq!(
            lines.next(),
            Some("     2    0.00    0.00    0.00    0.00    0.00    0.00      0      0     1     0 missing")
        );
        assert!(actual.contains("\nSummary\n"));
    }

    #[test]
    fn test_table_is_hidden_by_default() {
        let report = report(false);
        assert!(!report.shows_sentence_table());
        assert!(report.to_string().starts_with("Summary"));
        assert!(report.with_sentence_table(true).shows_sentence_table());
    }

    #[test]
    fn test_scores_display() {
        assert_eq!(Scores::new(1., 0.5, 2. / 3.).to_string(), "100.00, 50.00, 66.67");
    }
}
