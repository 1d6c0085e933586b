/*!
Reader for the export format (Brants 1997), version 3 without lemma field. A corpus is a sequence
of blocks opened by `#BOS <n>` and closed by `#EOS <n>`. Inside a block every line is either a
terminal record

```text
word    tag    morph    edge    parent
```

or a non-terminal record whose first field is `#<id>` with `id >= 500`:

```text
#500    NP     --       --      0
```

Terminals receive their position from their order in the block. Lines outside of blocks (format
header, origin and edge tables) are ignored.
*/
#[cfg(test)]
use crate::datastructure::Yield;
use crate::datastructure::{Child, EdgeTable, Node, TableError, NONTERMINAL_THRESHOLD, ROOT_ID};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap, Entry};
use thiserror::Error;
use tracing::debug;

/// Minimal number of whitespace separated fields of a node record.
const MIN_FIELDS: usize = 5;
const PARENT_FIELD: usize = 4;

/// A word of a sentence, with its position, part-of-speech tag and morphological tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminal {
    pub position: usize,
    pub word: String,
    pub tag: String,
    pub morph: String,
    pub parent: u32,
}

/// A sentence with its terminals and its fully resolved nodes. The first node is always the
/// implicit root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub number: u32,
    pub terminals: Vec<Terminal>,
    pub nodes: Vec<Node>,
}

impl Sentence {
    /// The topmost node of the sentence.
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Every node except the root.
    pub fn nonterminals(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.is_root())
    }

    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }

    /// The node with the given identifier, if any.
    pub fn node(&self, id: u32) -> Option<&Node> {
        self.nodes
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|i| &self.nodes[i])
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.terminals.iter().map(|t| t.word.as_str())
    }
}

/// All the sentences of one treebank file, keyed by their sentence number.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub name: String,
    sentences: BTreeMap<u32, Sentence>,
}

impl Corpus {
    /// Parses a whole corpus. The parsing is atomic: the first defect aborts it and no partial
    /// corpus is returned.
    pub fn parse<S: Into<String>>(name: S, input: &str) -> Result<Self, FormatError> {
        let name = name.into();
        let mut reader = ExportReader::new(&name);
        let mut sentences = BTreeMap::new();
        for (index, line) in input.lines().enumerate() {
            if let Some((sentence, eos_line)) = reader.feed(index + 1, line)? {
                match sentences.entry(sentence.number) {
                    Entry::Occupied(_) => {
                        return Err(FormatError::new(
                            &name,
                            FormatErrorKind::DuplicateSentence {
                                sentence: sentence.number,
                                line: eos_line,
                            },
                        ))
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(sentence);
                    }
                }
            }
        }
        reader.finish()?;
        debug!(corpus = %name, sentences = sentences.len(), "parsed corpus");
        Ok(Self { name, sentences })
    }

    pub fn get(&self, number: u32) -> Option<&Sentence> {
        self.sentences.get(&number)
    }

    pub fn contains(&self, number: u32) -> bool {
        self.sentences.contains_key(&number)
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Iterates over the sentences in ascending sentence number.
    pub fn iter(&self) -> btree_map::Values<'_, u32, Sentence> {
        self.sentences.values()
    }

    pub fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.sentences.keys().copied()
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Sentence;
    type IntoIter = btree_map::Values<'a, u32, Sentence>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A structural defect of a corpus. It always names the corpus; the kind names the sentence and
/// the line or node at fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{corpus}: {kind}")]
pub struct FormatError {
    pub corpus: String,
    pub kind: FormatErrorKind,
}

impl FormatError {
    fn new(corpus: &str, kind: FormatErrorKind) -> Self {
        Self {
            corpus: String::from(corpus),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatErrorKind {
    #[error("line {line}: malformed sentence marker `{marker}`")]
    MalformedMarker { line: usize, marker: String },
    #[error("line {line}: malformed record in sentence {sentence}: {reason}")]
    MalformedRecord {
        sentence: u32,
        line: usize,
        reason: String,
    },
    #[error("line {line}: #EOS {found} closes sentence {sentence}")]
    MismatchedEos {
        sentence: u32,
        found: u32,
        line: usize,
    },
    #[error("line {line}: #BOS found inside sentence {sentence}")]
    NestedBos { sentence: u32, line: usize },
    #[error("sentence {sentence} opened on line {line} is never closed")]
    Unterminated { sentence: u32, line: usize },
    #[error("line {line}: duplicate sentence number {sentence}")]
    DuplicateSentence { sentence: u32, line: usize },
    #[error("line {line}: node #{node} is defined twice in sentence {sentence}")]
    DuplicateNode { sentence: u32, node: u32, line: usize },
    #[error("line {line}: {child} of sentence {sentence} refers to undefined parent #{parent}")]
    UnresolvedParent {
        sentence: u32,
        child: Child,
        parent: u32,
        line: usize,
    },
    #[error("line {line}: cyclic parent chain through node #{node} in sentence {sentence}")]
    Cycle { sentence: u32, node: u32, line: usize },
    #[error("line {line}: node #{node} of sentence {sentence} dominates no terminal")]
    Childless { sentence: u32, node: u32, line: usize },
}

impl FormatErrorKind {
    fn from_table(sentence: u32, value: TableError) -> Self {
        match value {
            TableError::DuplicateNode { id, line } => Self::DuplicateNode {
                sentence,
                node: id,
                line,
            },
            TableError::UnresolvedParent {
                child,
                parent,
                line,
            } => Self::UnresolvedParent {
                sentence,
                child,
                parent,
                line,
            },
            TableError::Cycle { id, line } => Self::Cycle {
                sentence,
                node: id,
                line,
            },
            TableError::Childless { id, line } => Self::Childless {
                sentence,
                node: id,
                line,
            },
        }
    }
}

/// The block currently being read.
struct OpenBlock {
    number: u32,
    bos_line: usize,
    table: EdgeTable,
    terminals: Vec<Terminal>,
}

/// Line-by-line state machine. It only holds the block being read, so a corpus could be streamed.
struct ExportReader<'a> {
    corpus: &'a str,
    block: Option<OpenBlock>,
}

enum Record<'l> {
    Terminal {
        word: &'l str,
        tag: &'l str,
        morph: &'l str,
        parent: u32,
    },
    NonTerminal {
        id: u32,
        label: &'l str,
        parent: u32,
    },
}

impl<'a> ExportReader<'a> {
    fn new(corpus: &'a str) -> Self {
        Self {
            corpus,
            block: None,
        }
    }

    fn error(&self, kind: FormatErrorKind) -> FormatError {
        FormatError::new(self.corpus, kind)
    }

    /// Consumes one line. Returns the sentence and the line of its `#EOS` once a block is closed.
    fn feed(&mut self, line_no: usize, line: &str) -> Result<Option<(Sentence, usize)>, FormatError> {
        let line = line.trim();
        let Some(block) = self.block.as_mut() else {
            if line.starts_with("#BOS") {
                let number = self.marker_number(line_no, line)?;
                self.block = Some(OpenBlock {
                    number,
                    bos_line: line_no,
                    table: EdgeTable::new(),
                    terminals: vec![],
                });
            }
            return Ok(None);
        };
        let sentence = block.number;
        if line.starts_with("#BOS") {
            return Err(self.error(FormatErrorKind::NestedBos {
                sentence,
                line: line_no,
            }));
        }
        if line.starts_with("#EOS") {
            let found = self.marker_number(line_no, line)?;
            if found != sentence {
                return Err(self.error(FormatErrorKind::MismatchedEos {
                    sentence,
                    found,
                    line: line_no,
                }));
            }
            return match self.block.take() {
                Some(block) => self.close(block).map(|s| Some((s, line_no))),
                None => Ok(None),
            };
        }
        let content = strip_comment(line);
        if content.is_empty() {
            return Ok(None);
        }
        let record = parse_record(content).map_err(|reason| {
            FormatError::new(
                self.corpus,
                FormatErrorKind::MalformedRecord {
                    sentence,
                    line: line_no,
                    reason,
                },
            )
        })?;
        match record {
            Record::Terminal {
                word,
                tag,
                morph,
                parent,
            } => {
                let position = block.table.push_terminal(parent, line_no);
                block.terminals.push(Terminal {
                    position,
                    word: String::from(word),
                    tag: String::from(tag),
                    morph: String::from(morph),
                    parent,
                });
            }
            Record::NonTerminal { id, label, parent } => block
                .table
                .insert_nonterminal(id, String::from(label), parent, line_no)
                .map_err(|e| {
                    FormatError::new(self.corpus, FormatErrorKind::from_table(sentence, e))
                })?,
        }
        Ok(None)
    }

    /// Fails when the input ended inside a block.
    fn finish(self) -> Result<(), FormatError> {
        match &self.block {
            Some(block) => Err(self.error(FormatErrorKind::Unterminated {
                sentence: block.number,
                line: block.bos_line,
            })),
            None => Ok(()),
        }
    }

    fn marker_number(&self, line_no: usize, line: &str) -> Result<u32, FormatError> {
        line.split_whitespace()
            .nth(1)
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| {
                self.error(FormatErrorKind::MalformedMarker {
                    line: line_no,
                    marker: String::from(line),
                })
            })
    }

    fn close(&self, block: OpenBlock) -> Result<Sentence, FormatError> {
        debug_assert_eq!(block.table.terminal_count(), block.terminals.len());
        let nodes = block
            .table
            .resolve()
            .map_err(|e| self.error(FormatErrorKind::from_table(block.number, e)))?;
        Ok(Sentence {
            number: block.number,
            terminals: block.terminals,
            nodes,
        })
    }
}

/// Removes a trailing `%%` comment.
fn strip_comment(line: &str) -> &str {
    match line.find("%%") {
        Some(start) => line[..start].trim_end(),
        None => line,
    }
}

fn parse_record(line: &str) -> Result<Record<'_>, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return Err(format!(
            "expected at least {} fields, found {}",
            MIN_FIELDS,
            fields.len()
        ));
    }
    let parent: u32 = fields[PARENT_FIELD]
        .parse()
        .map_err(|_| format!("parent `{}` is not a number", fields[PARENT_FIELD]))?;
    if parent != ROOT_ID && parent < NONTERMINAL_THRESHOLD {
        return Err(format!(
            "parent must be {} or at least {}, got {}",
            ROOT_ID, NONTERMINAL_THRESHOLD, parent
        ));
    }
    match node_id(fields[0])? {
        Some(id) if id < NONTERMINAL_THRESHOLD => Err(format!(
            "non-terminal identifier must be at least {}, got {}",
            NONTERMINAL_THRESHOLD, id
        )),
        Some(id) => Ok(Record::NonTerminal {
            id,
            label: fields[1],
            parent,
        }),
        None => Ok(Record::Terminal {
            word: fields[0],
            tag: fields[1],
            morph: fields[2],
            parent,
        }),
    }
}

/// `#` followed by digits only. A lone `#` or `#foo` is a word. An identifier that does not fit
/// in a `u32` is an error.
fn node_id(field: &str) -> Result<Option<u32>, String> {
    let Some(digits) = field.strip_prefix('#') else {
        return Ok(None);
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    digits
        .parse()
        .map(Some)
        .map_err(|_| format!("non-terminal identifier `{}` is out of range", field))
}

/// This method allocates. It should only be used in the testing environment.
#[cfg(test)]
impl From<&Sentence> for Vec<(String, Yield)> {
    fn from(value: &Sentence) -> Self {
        value
            .nodes
            .iter()
            .map(|n| (n.label.clone(), n.terminals.clone()))
            .collect()
    }
}
