/*!
Decides which nodes and terminals take part in the scoring.
*/
use crate::config::ParameterSpec;
use crate::datastructure::{Node, Yield};
use crate::export::{Sentence, Terminal};

/// Applies a `ParameterSpec` to the nodes of a sentence. The rules are independent:
/// * the topmost node never takes part,
/// * a non-terminal with a deleted label does not take part,
/// * a terminal with a deleted tag is removed from every scored yield, but keeps its position.
#[derive(Debug, Clone, Copy)]
pub struct NodeFilter<'p> {
    params: &'p ParameterSpec,
}

impl<'p> NodeFilter<'p> {
    pub fn new(params: &'p ParameterSpec) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &'p ParameterSpec {
        self.params
    }

    pub fn admits_node(&self, node: &Node) -> bool {
        !node.is_root() && !self.params.is_deleted_label(&node.label)
    }

    pub fn admits_terminal(&self, terminal: &Terminal) -> bool {
        !self.params.is_deleted_tag(&terminal.tag)
    }

    /// The yield of `node` restricted to the admitted terminals. It can be empty.
    pub fn scored_yield(&self, sentence: &Sentence, node: &Node) -> Yield {
        node.terminals
            .retain(|p| self.admits_terminal(&sentence.terminals[p]))
    }

    /// Length of the sentence, ignoring the terminals exempted from length.
    pub fn length(&self, sentence: &Sentence) -> usize {
        sentence
            .terminals
            .iter()
            .filter(|t| !self.params.is_length_exempt(&t.tag))
            .count()
    }

    /// Whether the sentence is short enough to be evaluated.
    pub fn admits_sentence(&self, sentence: &Sentence) -> bool {
        self.params
            .cutoff_len()
            .map_or(true, |cutoff| self.length(sentence) <= cutoff)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{ParameterSpecBuilder, Profile};
    use crate::export::tests::DISCONTINUOUS;
    use crate::export::Corpus;
    use rstest::rstest;

    fn sentence() -> Sentence {
        Corpus::parse("gold", DISCONTINUOUS)
            .unwrap()
            .get(1)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_root_is_never_admitted() {
        let sentence = sentence();
        for params in [
            ParameterSpec::new(),
            ParameterSpec::from(Profile::Punctuation),
        ] {
            let filter = NodeFilter::new(&params);
            assert!(!filter.admits_node(sentence.root()));
            assert!(sentence.nonterminals().all(|n| filter.admits_node(n)));
        }
    }

    #[test]
    fn test_deleted_label() {
        let sentence = sentence();
        let params = ParameterSpecBuilder::new().delete_label("VP").build();
        let filter = NodeFilter::new(&params);
        let admitted: Vec<u32> = sentence
            .nonterminals()
            .filter(|n| filter.admits_node(n))
            .map(|n| n.id)
            .collect();
        assert_eq!(admitted, vec![502]);
    }

    #[test]
    fn test_deleted_tag_keeps_positions() {
        let sentence = sentence();
        let params = ParameterSpec::from(Profile::Punctuation);
        let filter = NodeFilter::new(&params);
        assert_eq!(
            filter.scored_yield(&sentence, sentence.root()),
            Yield::from([0, 1, 2, 3])
        );
        let params = ParameterSpecBuilder::new().delete_tag("VMFIN").build();
        let filter = NodeFilter::new(&params);
        let s = sentence.node(502).unwrap();
        assert_eq!(filter.scored_yield(&sentence, s), Yield::from([0, 2, 3]));
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some(5), true)]
    #[case(Some(4), false)]
    fn test_cutoff(#[case] cutoff: Option<usize>, #[case] expected: bool) {
        let builder = ParameterSpecBuilder::new();
        let params = match cutoff {
            Some(n) => builder.cutoff_len(n),
            None => builder,
        }
        .build();
        assert_eq!(NodeFilter::new(&params).admits_sentence(&sentence()), expected);
    }

    #[test]
    fn test_length_exempt_tags() {
        let params = ParameterSpecBuilder::new()
            .exempt_from_length("$.")
            .cutoff_len(4)
            .build();
        let filter = NodeFilter::new(&params);
        assert_eq!(filter.length(&sentence()), 4);
        assert!(filter.admits_sentence(&sentence()));
    }
}
