/*
 * This module contains the evaluation parameters. `ParameterSpec` is an immutable value that is
 * passed by reference to the filter and the extractor. It is either parsed from a parameter file
 * written in the classic EVALB syntax, taken from one of the embedded `Profile`s, or built with
 * the `ParameterSpecBuilder`.
*/
use enum_iterator::{all, Sequence};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Punctuation tags of the export treebanks (NeGra, TIGER).
const EXPORT_PUNCTUATION: [&str; 3] = ["$,", "$.", "$("];
/// Punctuation and trace tags deleted by the `COLLINS.prm` file shipped with EVALB.
const PTB_PUNCTUATION: [&str; 6] = [",", ":", "``", "''", ".", "-NONE-"];
/// Explicit top labels of treebanks that wrap each tree in an extra node. `COLLINS.prm` deletes
/// them too.
const TOP_LABELS: [&str; 1] = ["TOP"];

#[derive(Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
/// The evaluation parameters. The topmost node of a sentence is always excluded, whatever the
/// parameters say.
pub struct ParameterSpec {
    /// Non-terminals with one of these labels produce no signature.
    deleted_labels: BTreeSet<String>,
    /// Terminals with one of these tags are removed from every yield.
    deleted_tags: BTreeSet<String>,
    /// Terminals with one of these tags do not count toward the length of a sentence.
    length_exempt_tags: BTreeSet<String>,
    /// Maps a label to the label it is scored as.
    equivalent_labels: BTreeMap<String, String>,
    /// Gold sentences longer than this are not evaluated.
    cutoff_len: Option<usize>,
    /// Shows the per-sentence table in the report.
    debug: bool,
}

impl ParameterSpec {
    /// Only the topmost node is excluded.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_deleted_label(&self, label: &str) -> bool {
        self.deleted_labels.contains(label)
    }

    pub fn is_deleted_tag(&self, tag: &str) -> bool {
        self.deleted_tags.contains(tag)
    }

    pub fn is_length_exempt(&self, tag: &str) -> bool {
        self.length_exempt_tags.contains(tag)
    }

    /// The label under which `label` is scored.
    pub fn canonical_label<'a>(&'a self, label: &'a str) -> &'a str {
        self.equivalent_labels
            .get(label)
            .map(String::as_str)
            .unwrap_or(label)
    }

    pub fn cutoff_len(&self) -> Option<usize> {
        self.cutoff_len
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn deleted_labels(&self) -> impl Iterator<Item = &str> {
        self.deleted_labels.iter().map(String::as_str)
    }

    pub fn deleted_tags(&self) -> impl Iterator<Item = &str> {
        self.deleted_tags.iter().map(String::as_str)
    }
}

impl Display for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Deleted labels: {}", self.deleted_labels.iter().join(" "))?;
        writeln!(f, "Deleted tags: {}", self.deleted_tags.iter().join(" "))?;
        writeln!(
            f,
            "Tags not counted in length: {}",
            self.length_exempt_tags.iter().join(" ")
        )?;
        writeln!(
            f,
            "Equivalent labels: {}",
            self.equivalent_labels
                .iter()
                .map(|(from, to)| format!("{}={}", from, to))
                .join(" ")
        )?;
        match self.cutoff_len {
            Some(n) => writeln!(f, "Cutoff length: {}", n)?,
            None => writeln!(f, "Cutoff length: none")?,
        }
        write!(f, "Debug: {}", self.debug)
    }
}

/// Embedded parameter profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence, Default, Serialize, Deserialize)]
pub enum Profile {
    /// Only the topmost node is excluded. This is what an absent parameter file means.
    #[default]
    Minimal,
    /// The topmost node, and the usual punctuation and trace tags.
    Punctuation,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Punctuation => "punctuation",
        }
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ParameterError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all::<Profile>()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParameterError {
                line: 0,
                content: String::from(s),
                kind: ParameterErrorKind::UnknownProfile {
                    expected: all::<Profile>().map(|p| p.as_str()).join(", "),
                },
            })
    }
}

impl From<Profile> for ParameterSpec {
    fn from(value: Profile) -> Self {
        match value {
            Profile::Minimal => ParameterSpec::default(),
            Profile::Punctuation => EXPORT_PUNCTUATION
                .into_iter()
                .chain(PTB_PUNCTUATION)
                .chain(TOP_LABELS)
                .fold(ParameterSpecBuilder::new(), |b, tag| {
                    b.delete_label(tag).delete_tag(tag)
                })
                .build(),
        }
    }
}

/// The declarations understood in a parameter file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
enum Keyword {
    DeleteLabel,
    DeleteLabelForLength,
    EqLabel,
    CutoffLen,
    Debug,
    Labeled,
    MaxError,
    EqWord,
}

impl Keyword {
    fn as_str(&self) -> &'static str {
        match self {
            Self::DeleteLabel => "DELETE_LABEL",
            Self::DeleteLabelForLength => "DELETE_LABEL_FOR_LENGTH",
            Self::EqLabel => "EQ_LABEL",
            Self::CutoffLen => "CUTOFF_LEN",
            Self::Debug => "DEBUG",
            Self::Labeled => "LABELED",
            Self::MaxError => "MAX_ERROR",
            Self::EqWord => "EQ_WORD",
        }
    }
}

impl FromStr for Keyword {
    type Err = ParameterErrorKind;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all::<Keyword>()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParameterErrorKind::UnknownKeyword {
                keyword: String::from(s),
                expected: all::<Keyword>().map(|k| k.as_str()).join(", "),
            })
    }
}

/// A declaration of a parameter file that could not be understood. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parameter file, line {line} (`{content}`): {kind}")]
pub struct ParameterError {
    pub line: usize,
    pub content: String,
    pub kind: ParameterErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterErrorKind {
    #[error("unknown declaration `{keyword}`, expected one of {expected}")]
    UnknownKeyword { keyword: String, expected: String },
    #[error("{keyword} expects {expected} value(s), found {found}")]
    WrongArity {
        keyword: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("{keyword} expects a non-negative integer, found `{value}`")]
    NotAnInteger { keyword: &'static str, value: String },
    #[error("unknown profile, expected one of {expected}")]
    UnknownProfile { expected: String },
}

/// Parses the content of a parameter file. Blank lines and lines starting with `#` or `%` are
/// skipped.
impl FromStr for ParameterSpec {
    type Err = ParameterError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut builder = ParameterSpecBuilder::new();
        for (index, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('%') {
                continue;
            }
            builder = declare(builder, line).map_err(|kind| ParameterError {
                line: index + 1,
                content: String::from(line),
                kind,
            })?;
        }
        Ok(builder.build())
    }
}

fn declare(
    builder: ParameterSpecBuilder,
    line: &str,
) -> Result<ParameterSpecBuilder, ParameterErrorKind> {
    let mut fields = line.split_whitespace();
    let keyword: Keyword = fields.next().unwrap_or_default().parse()?;
    let values: Vec<&str> = fields.collect();
    let builder = match keyword {
        Keyword::DeleteLabel => {
            let label = exactly_one(keyword, &values)?;
            builder.delete_label(label).delete_tag(label)
        }
        Keyword::DeleteLabelForLength => builder.exempt_from_length(exactly_one(keyword, &values)?),
        Keyword::EqLabel => {
            at_least_two(keyword, &values)?;
            values[1..]
                .iter()
                .fold(builder, |b, label| b.equivalent_label(*label, values[0]))
        }
        Keyword::CutoffLen => builder.cutoff_len(integer(keyword, exactly_one(keyword, &values)?)?),
        Keyword::Debug => builder.debug(integer(keyword, exactly_one(keyword, &values)?)? != 0),
        Keyword::Labeled | Keyword::MaxError => {
            integer(keyword, exactly_one(keyword, &values)?)?;
            warn!(
                keyword = keyword.as_str(),
                "declaration has no effect: labeled and unlabeled scores are always reported and every error is fatal"
            );
            builder
        }
        Keyword::EqWord => {
            at_least_two(keyword, &values)?;
            warn!(
                keyword = keyword.as_str(),
                "declaration has no effect: words are not compared"
            );
            builder
        }
    };
    Ok(builder)
}

fn exactly_one<'l>(keyword: Keyword, values: &[&'l str]) -> Result<&'l str, ParameterErrorKind> {
    match values {
        [value] => Ok(*value),
        _ => Err(ParameterErrorKind::WrongArity {
            keyword: keyword.as_str(),
            expected: "1",
            found: values.len(),
        }),
    }
}

fn at_least_two(keyword: Keyword, values: &[&str]) -> Result<(), ParameterErrorKind> {
    if values.len() < 2 {
        return Err(ParameterErrorKind::WrongArity {
            keyword: keyword.as_str(),
            expected: "at least 2",
            found: values.len(),
        });
    }
    Ok(())
}

fn integer(keyword: Keyword, value: &str) -> Result<usize, ParameterErrorKind> {
    value
        .parse()
        .map_err(|_| ParameterErrorKind::NotAnInteger {
            keyword: keyword.as_str(),
            value: String::from(value),
        })
}

/// This builder can be used to build and customize a `ParameterSpec` structure.
#[derive(Clone, Debug, Default)]
pub struct ParameterSpecBuilder {
    spec: ParameterSpec,
}

impl ParameterSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    /// Excludes the non-terminals labeled `label`.
    pub fn delete_label<S: Into<String>>(mut self, label: S) -> Self {
        self.spec.deleted_labels.insert(label.into());
        self
    }
    /// Removes the terminals tagged `tag` from every yield.
    pub fn delete_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.spec.deleted_tags.insert(tag.into());
        self
    }
    pub fn exempt_from_length<S: Into<String>>(mut self, tag: S) -> Self {
        self.spec.length_exempt_tags.insert(tag.into());
        self
    }
    /// Scores `label` as `as_label`.
    pub fn equivalent_label<S: Into<String>, T: Into<String>>(mut self, label: S, as_label: T) -> Self {
        self.spec
            .equivalent_labels
            .insert(label.into(), as_label.into());
        self
    }
    pub fn cutoff_len(mut self, cutoff_len: usize) -> Self {
        self.spec.cutoff_len = Some(cutoff_len);
        self
    }
    pub fn debug(mut self, debug: bool) -> Self {
        self.spec.debug = debug;
        self
    }
    pub fn build(self) -> ParameterSpec {
        self.spec
    }
}

impl From<ParameterSpec> for ParameterSpecBuilder {
    fn from(value: ParameterSpec) -> Self {
        Self { spec: value }
    }
}
