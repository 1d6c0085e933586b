/*!
This library scores discontinuous constituency trees in the manner of EVALB. A gold corpus and a
candidate corpus, both in export format, are compared bracket by bracket and the library reports
the labeled and unlabeled precision, recall and F1 of the candidate, and its exact match rate.

# Terminology
* A terminal is a token of a sentence, identified by its 0-based position.
* A non-terminal (or node) is a constituent. Its identifier is `#500` or greater in export format,
    and the identifiers only matter inside their sentence.
* The yield of a node is the set of terminal positions it dominates. In a discontinuous tree the
    yield can have gaps, such as `{0,2}` for a verb phrase interrupted by a finite verb.
* A signature is the pair of a label and a yield. Sentences are reduced to bags (multisets) of
    signatures, and two bags are compared by their multiset intersection.
* The parameters (`ParameterSpec`) decide which labels and tags are ignored, which labels are
    equivalent and which sentences are too long to be evaluated.

# Scores
The scores are micro-averaged: matched, gold and candidate counts are summed over the corpus and
the metrics are computed once at the end. A gold sentence absent from the candidate corpus counts
as a candidate without any bracket. Candidate sentences absent from gold are ignored.

```rust
use disceval::{evaluate, Corpus, ParameterSpec, Profile};

let gold = Corpus::parse("gold", "\
#BOS 1
Darüber      PROAV  --  MO  501
muss         VMFIN  --  HD  502
nachgedacht  VVPP   --  HD  501
werden       VAINF  --  HD  500
.            $.     --  --  0
#500         VP     --  OC  502
#501         VP     --  OC  500
#502         S      --  --  0
#EOS 1
").unwrap();
let candidate = Corpus::parse("candidate", "\
#BOS 1
Darüber      PROAV  --  MO  501
muss         VMFIN  --  HD  502
nachgedacht  VVPP   --  HD  501
werden       VAINF  --  HD  502
.            $.     --  --  0
#501         VP     --  OC  502
#502         S      --  --  0
#EOS 1
").unwrap();

let report = evaluate(&gold, &candidate, &ParameterSpec::from(Profile::Punctuation));
assert_eq!(report.counts.matched, 2);
assert_eq!(report.labeled.precision, 1.0);
assert!((report.labeled.recall - 2. / 3.).abs() < 1e-12);
assert_eq!(report.exact_match, 0.0);
```
*/

mod align;
mod config;
mod datastructure;
mod error;
mod export;
mod filter;
mod metrics;
mod reporter;
mod signature;

// The public api starts here
pub use align::{AlignedSentence, Alignment};

pub use config::{
    ParameterError, ParameterErrorKind, ParameterSpec, ParameterSpecBuilder, Profile,
};

pub use datastructure::{Child, Node, Yield, NONTERMINAL_THRESHOLD, ROOT_ID, ROOT_LABEL};

pub use error::{EvalError, Result};

pub use export::{Corpus, FormatError, FormatErrorKind, Sentence, Terminal};

pub use filter::NodeFilter;

pub use metrics::{Evaluator, ScoreAccumulator, SentenceCounts};

pub use reporter::{Report, Scores, SentenceScore};

pub use signature::{BracketMultiset, Multiset, SentenceSignatures, Signature, SignatureMultiset};

use either::Either;
use std::fs;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Main entrypoint of the library. Every gold sentence is aligned with the candidate sentence of
/// the same number, reduced to its signatures and compared. The result is computed once all the
/// sentences are accumulated.
///
/// * `gold`: The reference corpus, it decides which sentences exist
/// * `candidate`: The corpus to be scored
/// * `params`: Filtering and equivalence rules
pub fn evaluate(gold: &Corpus, candidate: &Corpus, params: &ParameterSpec) -> Report {
    let alignment = Alignment::new(gold, candidate);
    let ignored = alignment.ignored();
    if !ignored.is_empty() {
        warn!(
            count = ignored.len(),
            "candidate sentences absent from gold are ignored"
        );
    }
    let mut evaluator = Evaluator::new(params);
    for aligned in alignment {
        evaluator.add(aligned);
    }
    evaluator.finalize(ignored)
}

/// Reads an export file. A file that is not valid UTF-8 is decoded as Latin-1, the historical
/// encoding of the export treebanks.
fn read_input(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| EvalError::resource(path, e))?;
    match String::from_utf8(bytes) {
        Ok(input) => Ok(input),
        Err(e) => {
            warn!(path = %path.display(), "not valid UTF-8, decoding as Latin-1");
            Ok(e.into_bytes().into_iter().map(char::from).collect())
        }
    }
}

fn parse_input(path: &Path, input: &str) -> Result<Corpus> {
    let corpus = Corpus::parse(path.display().to_string(), input)?;
    info!(path = %path.display(), sentences = corpus.len(), "read corpus");
    Ok(corpus)
}

/// Reads and parses an export file. The corpus is named after its path.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn read_corpus<P: AsRef<Path>>(path: P) -> Result<Corpus> {
    let path = path.as_ref();
    let input = read_input(path)?;
    parse_input(path, &input)
}

/// Builds the parameters from a parameter file or from a built-in profile. Without any source, the
/// default profile is used.
pub fn load_parameters<P: AsRef<Path>>(source: Option<Either<P, Profile>>) -> Result<ParameterSpec> {
    match source {
        Some(Either::Left(path)) => {
            let path = path.as_ref();
            let content =
                fs::read_to_string(path).map_err(|e| EvalError::resource(path, e))?;
            let params: ParameterSpec = content.parse()?;
            info!(path = %path.display(), "read parameter file");
            Ok(params)
        }
        Some(Either::Right(profile)) => Ok(ParameterSpec::from(profile)),
        None => Ok(ParameterSpec::from(Profile::default())),
    }
}

/// Reads both corpora and evaluates the candidate. Both files are read before either is parsed, so
/// an unreadable file is reported even when the other one is malformed. No score is produced on
/// error.
#[instrument(skip_all, fields(gold = %gold.as_ref().display(), candidate = %candidate.as_ref().display()))]
pub fn evaluate_files<P: AsRef<Path>, Q: AsRef<Path>>(
    gold: P,
    candidate: Q,
    params: &ParameterSpec,
) -> Result<Report> {
    let (gold, candidate) = (gold.as_ref(), candidate.as_ref());
    let gold_input = read_input(gold)?;
    let candidate_input = read_input(candidate)?;
    let gold = parse_input(gold, &gold_input)?;
    let candidate = parse_input(candidate, &candidate_input)?;
    Ok(evaluate(&gold, &candidate, params))
}
