#[macro_use]
extern crate failure;

#[macro_use]
extern crate pest_derive;

pub mod io;
pub use io::{CorpusReader, PTBFormat, PairedReader, ReadTree, WriteTree};

mod annotated;
pub use annotated::{AnnotatedTree, Annotator};

mod config;
pub use config::Config;

mod corpus;
pub use corpus::{Parse, Sentence};

mod edge;
pub use edge::{Edge, Edges};

pub mod features;

pub mod heads;
pub use heads::{HeadFinder, HeadKind, HeadRules, HeadType, Language};

mod node;
pub use node::Node;

mod precrec;
pub use precrec::PrecRec;

mod registry;
pub use registry::FeatureClasses;

mod scorer;
pub use scorer::{Reranker, Weights};

mod span;
pub use span::Span;

mod tree;
pub use tree::{Navigate, Tree};

mod tree_modification;
pub use tree_modification::TreeOps;

pub mod util;
