use std::fmt;
use std::mem;

/// Category of the root node of every parse.
pub const ROOT_LABEL: &str = "S1";

/// Category of empty (trace) preterminals.
pub const NONE_LABEL: &str = "-NONE-";

static PUNCTUATION: &[&str] = &["''", ":", "#", ",", ".", "``", "-LRB-", "-RRB-"];

static CONJUNCTION: &[&str] = &["CC", "CONJP"];

static CLOSED_CLASS: &[&str] = &[
    "CC", "DT", "EX", "IN", "MD", "PDT", "POS", "PRP", "PRP$", "PRT", "RP", "TO", "UH", "WDT",
    "WP", "WP$",
];

static FUNCTIONAL: &[&str] = &[
    "CC", "DT", "EX", "IN", "MD", "POS", "PRP", "PRP$", "RP", "TO", "WDT", "WP", "WP$",
];

/// Node in a constituency tree.
///
/// A `Node` only carries its category label. Whether it is a terminal, a preterminal or a
/// nonterminal is determined by its position in the tree, see `Navigate`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Node {
    label: String,
}

impl Node {
    /// Construct a new `Node`.
    pub fn new(label: impl Into<String>) -> Self {
        Node {
            label: label.into(),
        }
    }

    /// Get the node's label.
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Set the node's label.
    ///
    /// Returns the replaced label.
    pub fn set_label(&mut self, label: impl Into<String>) -> String {
        mem::replace(&mut self.label, label.into())
    }

    /// Returns whether the label is the root category.
    pub fn is_root_label(&self) -> bool {
        self.label == ROOT_LABEL
    }

    /// Returns whether the label marks an empty element.
    pub fn is_none_label(&self) -> bool {
        self.label == NONE_LABEL
    }

    /// Returns whether the label is a punctuation category.
    pub fn is_punctuation_label(&self) -> bool {
        PUNCTUATION.contains(&self.label.as_str())
    }

    /// Returns whether the label is a conjunction category.
    pub fn is_conjunction_label(&self) -> bool {
        CONJUNCTION.contains(&self.label.as_str())
    }

    /// Returns whether the label is a closed class part of speech.
    pub fn is_closed_class_label(&self) -> bool {
        CLOSED_CLASS.contains(&self.label.as_str())
    }

    /// Returns whether the label is a function word part of speech.
    pub fn is_functional_label(&self) -> bool {
        FUNCTIONAL.contains(&self.label.as_str())
    }

    /// Get the label without function tags.
    ///
    /// The label is cut at the first `-`, `=`, `|` or `^` that is neither the first nor the last
    /// character, `NP-SBJ-2` becomes `NP` while `-NONE-` and `-LRB-` are kept.
    pub fn simplified_label(&self) -> &str {
        simplified_label(&self.label)
    }
}

/// Strip function tags from a category label.
pub fn simplified_label(label: &str) -> &str {
    let cut = label
        .char_indices()
        .skip(1)
        .find(|(_, c)| ['-', '=', '|', '^'].contains(c));
    match cut {
        Some((idx, c)) if idx + c.len_utf8() < label.len() => &label[..idx],
        _ => label,
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl<'a> From<&'a str> for Node {
    fn from(label: &'a str) -> Self {
        Node::new(label)
    }
}
