/*!
Reduces a sentence to the bags of signatures that are compared between gold and candidate.
*/
use crate::config::ParameterSpec;
use crate::datastructure::Yield;
use crate::export::Sentence;
use crate::filter::NodeFilter;
use ahash::HashMap as AHashMap;
use serde::{Deserialize, Serialize};
use std::cmp;
use std::fmt::{self, Display};
use std::hash::Hash;

/// The unit of comparison: a label and the exact set of terminal positions it dominates. Two
/// nodes with the same label and the same yield have the same signature, whatever their
/// identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub label: String,
    pub terminals: Yield,
}

impl Signature {
    pub fn new<S: Into<String>, Y: Into<Yield>>(label: S, terminals: Y) -> Self {
        Self {
            label: label.into(),
            terminals: terminals.into(),
        }
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.label, self.terminals)
    }
}

/// A bag: every value is stored with its multiplicity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multiset<T: Hash + Eq> {
    counts: AHashMap<T, usize>,
    len: usize,
}

/// Bag of labeled signatures.
pub type SignatureMultiset = Multiset<Signature>;
/// Bag of yields, used for the unlabeled scores.
pub type BracketMultiset = Multiset<Yield>;

impl<T: Hash + Eq> Default for Multiset<T> {
    fn default() -> Self {
        Self {
            counts: AHashMap::default(),
            len: 0,
        }
    }
}

impl<T: Hash + Eq> Multiset<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) {
        *self.counts.entry(value).or_default() += 1;
        self.len += 1;
    }

    /// Number of elements, counting multiplicities.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct values.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn count(&self, value: &T) -> usize {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// Iterates over the distinct values with their multiplicity, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, usize)> {
        self.counts.iter().map(|(v, c)| (v, *c))
    }

    /// Size of the multiset intersection: for every value, the smaller of its two
    /// multiplicities.
    pub fn intersection_len(&self, other: &Self) -> usize {
        let (small, large) = if self.distinct() <= other.distinct() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .iter()
            .map(|(value, count)| cmp::min(count, large.count(value)))
            .sum()
    }
}

impl<T: Hash + Eq> FromIterator<T> for Multiset<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut multiset = Self::new();
        for value in iter {
            multiset.insert(value);
        }
        multiset
    }
}

/// The labeled and unlabeled bags of one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SentenceSignatures {
    pub labeled: SignatureMultiset,
    pub unlabeled: BracketMultiset,
}

impl SentenceSignatures {
    /// Every admitted non-terminal gives one signature, its label mapped through the label
    /// equivalences and its yield restricted to the admitted terminals. A node left with an empty
    /// yield gives none.
    pub fn extract(sentence: &Sentence, params: &ParameterSpec) -> Self {
        let filter = NodeFilter::new(params);
        let mut signatures = Self::default();
        for node in sentence.nonterminals().filter(|n| filter.admits_node(n)) {
            let terminals = filter.scored_yield(sentence, node);
            if terminals.is_empty() {
                continue;
            }
            let label = params.canonical_label(&node.label);
            signatures.unlabeled.insert(terminals.clone());
            signatures.labeled.insert(Signature::new(label, terminals));
        }
        signatures
    }

    pub fn len(&self) -> usize {
        self.labeled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labeled.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{ParameterSpecBuilder, Profile};
    use crate::export::tests::DISCONTINUOUS;
    use crate::export::Corpus;

    fn sentence() -> Sentence {
        Corpus::parse("gold", DISCONTINUOUS)
            .unwrap()
            .get(1)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_extract_minimal() {
        let actual = SentenceSignatures::extract(&sentence(), &ParameterSpec::new());
        let expected: SignatureMultiset = [
            Signature::new("VP", [0, 2, 3]),
            Signature::new("VP", [0, 2]),
            Signature::new("S", [0, 1, 2, 3]),
        ]
        .into_iter()
        .collect();
        assert_eq!(actual.labeled, expected);
        assert_eq!(actual.unlabeled.len(), 3);
        assert_eq!(actual.labeled.count(&Signature::new("VROOT", [0, 1, 2, 3, 4])), 0);
    }

    #[test]
    fn test_extract_drops_nodes_with_empty_yield() {
        let input = "\
#BOS 1
Er      PPER  --  SB  500
lacht   VVFIN --  HD  500
,       $,    --  --  501
.       $.    --  --  501
#500    S     --  --  0
#501    PUNCT --  --  0
#EOS 1
";
        let corpus = Corpus::parse("gold", input).unwrap();
        let sentence = corpus.get(1).unwrap();
        let minimal = SentenceSignatures::extract(sentence, &ParameterSpec::new());
        assert_eq!(minimal.len(), 2);
        let params = ParameterSpec::from(Profile::Punctuation);
        let punctuation = SentenceSignatures::extract(sentence, &params);
        assert_eq!(punctuation.len(), 1);
        assert_eq!(punctuation.labeled.count(&Signature::new("S", [0, 1])), 1);
    }

    #[test]
    fn test_extract_keeps_multiplicities() {
        // A unary chain: both nodes dominate the same terminals.
        let input = "\
#BOS 1
Peter   NE    --  --  500
#500    NP    --  --  501
#501    NP    --  --  0
#EOS 1
";
        let corpus = Corpus::parse("gold", input).unwrap();
        let actual = SentenceSignatures::extract(corpus.get(1).unwrap(), &ParameterSpec::new());
        assert_eq!(actual.labeled.len(), 2);
        assert_eq!(actual.labeled.distinct(), 1);
        assert_eq!(actual.labeled.count(&Signature::new("NP", [0])), 2);
    }

    #[test]
    fn test_extract_uses_equivalent_labels() {
        let params = ParameterSpecBuilder::new()
            .equivalent_label("S", "VP")
            .build();
        let actual = SentenceSignatures::extract(&sentence(), &params);
        assert_eq!(actual.labeled.count(&Signature::new("VP", [0, 1, 2, 3])), 1);
        assert_eq!(actual.labeled.count(&Signature::new("S", [0, 1, 2, 3])), 0);
    }

    #[test]
    fn test_intersection_len_takes_minimum() {
        let np = Signature::new("NP", [1, 2]);
        let gold: SignatureMultiset = vec![np.clone(), np.clone()].into_iter().collect();
        let candidate: SignatureMultiset = vec![np.clone(), np.clone(), np.clone()]
            .into_iter()
            .collect();
        assert_eq!(gold.intersection_len(&candidate), 2);
        assert_eq!(candidate.intersection_len(&gold), 2);
        assert_ne!(gold, candidate);
    }

    #[test]
    fn test_intersection_len_requires_exact_yield() {
        let gold: SignatureMultiset = [Signature::new("VP", [1, 3, 5])].into_iter().collect();
        let candidate: SignatureMultiset =
            [Signature::new("VP", [1, 3, 4, 5])].into_iter().collect();
        assert_eq!(gold.intersection_len(&candidate), 0);
    }

    #[test]
    fn test_multiset_equality_ignores_insertion_order() {
        let a: SignatureMultiset = [Signature::new("A", [0]), Signature::new("B", [1])]
            .into_iter()
            .collect();
        let b: SignatureMultiset = [Signature::new("B", [1]), Signature::new("A", [0])]
            .into_iter()
            .collect();
        assert_eq!(a, b);
        assert_eq!(Signature::new("VP", [2, 0]).to_string(), "(VP, {0,2})");
    }
}
