use std::borrow::Cow;

use failure::Error;
use pest::iterators::Pair;
use pest::Parser;
use petgraph::prelude::NodeIndex;

use crate::io::sstring::{quote, unquote};
use crate::io::{ReadTree, WriteTree};
use crate::tree::TreeBuilder;
use crate::{Navigate, Tree};

/// `PTBFormat`
///
/// Bracketed trees `(LABEL child child ...)`, terminals are bare tokens. Both variants read
/// double-quoted tokens as serializable strings, they differ in how labels are written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PTBFormat {
    /// Labels are written as they are.
    ///
    /// E.g. the terminal `50%` is written as `50%`. This is the format of parser output and of
    /// tree fragments in feature keys.
    Plain,
    /// Labels containing reserved characters are quoted.
    ///
    /// E.g. the terminal `50%` is written as `"50%"`. Every tree written in this format reads
    /// back to an equal tree.
    Quoted,
}

impl WriteTree for PTBFormat {
    fn tree_to_string(&self, tree: &impl Navigate) -> String {
        self.subtree_to_string(tree, tree.root())
    }
}

// dummy struct required by pest
#[derive(Parser)]
#[grammar = "io/ptb.pest"]
struct PTBParser;

impl ReadTree for PTBFormat {
    fn string_to_tree(&self, string: &str) -> Result<Tree, Error> {
        let mut parsed = PTBParser::parse(Rule::tree, string)?;
        let top = parsed
            .next()
            .and_then(|tree| tree.into_inner().next())
            .ok_or_else(|| format_err!("Empty tree: {}", string))?;
        let mut builder = TreeBuilder::new();
        parse_value(top, &mut builder, None)?;
        builder
            .finish()
            .ok_or_else(|| format_err!("Empty tree: {}", string))
    }
}

impl PTBFormat {
    pub fn try_from_str(s: &str) -> Result<PTBFormat, Error> {
        let s = s.to_lowercase();
        match s.as_str() {
            "plain" => Ok(PTBFormat::Plain),
            "quoted" => Ok(PTBFormat::Quoted),
            _ => Err(format_err!("Unknown format: {}", s)),
        }
    }

    /// Linearize the subtree rooted at `node`.
    pub fn subtree_to_string(&self, tree: &impl Navigate, node: NodeIndex) -> String {
        let mut representation = String::new();
        self.format_sub_tree(tree, node, &mut representation);
        representation
    }

    fn format_sub_tree(&self, tree: &impl Navigate, node: NodeIndex, out: &mut String) {
        let label = match self {
            PTBFormat::Plain => Cow::Borrowed(tree.label(node)),
            PTBFormat::Quoted => quote(tree.label(node)),
        };
        let children = tree.children(node);
        if children.is_empty() {
            out.push_str(&label);
            return;
        }
        out.push('(');
        out.push_str(&label);
        for &child in children.iter() {
            out.push(' ');
            self.format_sub_tree(tree, child, out);
        }
        out.push(')');
    }
}

// this method traverses the linearized tree and builds the tree top-down
fn parse_value(
    pair: Pair<Rule>,
    builder: &mut TreeBuilder,
    parent: Option<NodeIndex>,
) -> Result<(), Error> {
    match pair.as_rule() {
        Rule::nonterminal => {
            let mut pairs = pair.into_inner().peekable();
            // a missing label is only legal on the root, ((S ...)) reads as an unlabeled root
            let label = match pairs.peek().map(Pair::as_rule) {
                Some(Rule::node_label) => pairs
                    .next()
                    .map(|label| unquote(label.as_str()).into_owned())
                    .unwrap_or_default(),
                _ => String::new(),
            };
            let idx = builder
                .add(parent, label)
                .ok_or_else(|| format_err!("Tree has more than one root"))?;
            for inner_pair in pairs {
                parse_value(inner_pair, builder, Some(idx))?;
            }
            Ok(())
        }
        Rule::terminal => {
            builder
                .add(parent, unquote(pair.as_str()).into_owned())
                .ok_or_else(|| format_err!("Tree has more than one root"))?;
            Ok(())
        }
        _ => Err(format_err!("Unexpected input: {}", pair.as_str())),
    }
}

/// S-expression.
///
/// Feature keys are serialized as s-expressions over serializable strings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    /// Parse an s-expression.
    pub fn parse(s: &str) -> Result<SExpr, Error> {
        let mut parsed = PTBParser::parse(Rule::sexp, s)?;
        let top = parsed
            .next()
            .and_then(|sexp| sexp.into_inner().next())
            .ok_or_else(|| format_err!("Empty s-expression: {}", s))?;
        sexpr_value(top)
    }

    /// Get the atom's string.
    pub fn atom(&self) -> Result<&str, Error> {
        match self {
            SExpr::Atom(atom) => Ok(atom.as_str()),
            SExpr::List(_) => Err(format_err!("Expected an atom, found a list")),
        }
    }

    /// Get the list's elements.
    pub fn list(&self) -> Result<&[SExpr], Error> {
        match self {
            SExpr::List(list) => Ok(list.as_slice()),
            SExpr::Atom(atom) => Err(format_err!("Expected a list, found: {}", atom)),
        }
    }
}

fn sexpr_value(pair: Pair<Rule>) -> Result<SExpr, Error> {
    match pair.as_rule() {
        Rule::atom => Ok(SExpr::Atom(unquote(pair.as_str()).into_owned())),
        Rule::list => pair
            .into_inner()
            .map(sexpr_value)
            .collect::<Result<Vec<_>, _>>()
            .map(SExpr::List),
        _ => Err(format_err!("Unexpected input: {}", pair.as_str())),
    }
}
