/*!
Pairs the gold and candidate sentences. The sentence number is the only join key: gold decides
which sentences exist, candidate sentences unknown to gold play no role.
*/
use crate::export::{Corpus, Sentence};

/// A gold sentence and its candidate counterpart. `candidate` is `None` when the candidate corpus
/// does not contain the sentence.
#[derive(Debug, Clone, Copy)]
pub struct AlignedSentence<'a> {
    pub number: u32,
    pub gold: &'a Sentence,
    pub candidate: Option<&'a Sentence>,
}

impl AlignedSentence<'_> {
    pub fn is_missing(&self) -> bool {
        self.candidate.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Alignment<'a> {
    gold: &'a Corpus,
    candidate: &'a Corpus,
}

impl<'a> Alignment<'a> {
    pub fn new(gold: &'a Corpus, candidate: &'a Corpus) -> Self {
        Self { gold, candidate }
    }

    /// Iterates over the gold sentences in ascending sentence number.
    pub fn iter(&self) -> impl Iterator<Item = AlignedSentence<'a>> + 'a {
        let candidate = self.candidate;
        self.gold.iter().map(move |gold| AlignedSentence {
            number: gold.number,
            gold,
            candidate: candidate.get(gold.number),
        })
    }

    /// Gold sentence numbers absent from the candidate corpus, ascending.
    pub fn missing(&self) -> Vec<u32> {
        self.gold
            .numbers()
            .filter(|n| !self.candidate.contains(*n))
            .collect()
    }

    /// Candidate sentence numbers absent from the gold corpus, ascending. They are ignored.
    pub fn ignored(&self) -> Vec<u32> {
        self.candidate
            .numbers()
            .filter(|n| !self.gold.contains(*n))
            .collect()
    }
}

impl<'a> IntoIterator for Alignment<'a> {
    type Item = AlignedSentence<'a>;
    type IntoIter = Box<dyn Iterator<Item = AlignedSentence<'a>> + 'a>;
    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
