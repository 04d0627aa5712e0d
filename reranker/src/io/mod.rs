mod corpus;
pub use crate::io::corpus::{
    CorpusReader, GoldReader, NBestFormat, NBestList, NBestReader, PairedReader,
};
mod ptb;
pub use crate::io::ptb::{PTBFormat, SExpr};
pub mod sstring;
mod tokens;
pub use crate::io::tokens::TokenReader;

use failure::Error;

use crate::{Navigate, Tree};

/// Trait to read a `Tree` from a string.
pub trait ReadTree {
    fn string_to_tree(&self, string: &str) -> Result<Tree, Error>;
}

/// Trait to linearize a tree.
pub trait WriteTree {
    fn tree_to_string(&self, tree: &impl Navigate) -> String;
}
