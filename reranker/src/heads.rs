//! Head finding.
//!
//! Head rules map the category of a nonterminal to a head type. Each head type lists priority
//! classes of child categories; the children are matched against the classes in order.

use std::collections::HashMap;

use failure::Error;
use petgraph::prelude::NodeIndex;

use crate::util::LabelSet;
use crate::Navigate;

/// Head type of a category.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HeadType {
    Adjective,
    Conjunction,
    Interjection,
    Noun,
    Preposition,
    Unknown,
    Verb,
}

/// Kind of heads.
///
/// Syntactic heads prefer function words (determiners, auxiliaries, prepositions), semantic
/// heads prefer content words.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HeadKind {
    Syntactic,
    Semantic,
}

/// Language of the head tables.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Language {
    /// Penn Treebank categories.
    English,
    /// Negra categories.
    German,
}

impl Language {
    pub fn try_from_str(s: &str) -> Result<Language, Error> {
        let s = s.to_lowercase();
        match s.as_str() {
            "english" | "en" => Ok(Language::English),
            "german" | "de" => Ok(Language::German),
            _ => Err(format_err!("Unknown language: {}", s)),
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}

static ENGLISH_CATEGORIES: &[(&str, HeadType)] = &[
    ("ADJP", HeadType::Adjective),
    ("ADVP", HeadType::Verb),
    ("CONJP", HeadType::Conjunction),
    ("FRAG", HeadType::Noun),
    ("INTJ", HeadType::Interjection),
    ("LST", HeadType::Noun),
    ("NAC", HeadType::Noun),
    ("NP", HeadType::Noun),
    ("NX", HeadType::Noun),
    ("PP", HeadType::Preposition),
    ("PRN", HeadType::Noun),
    ("PRT", HeadType::Preposition),
    ("QP", HeadType::Noun),
    ("ROOT", HeadType::Verb),
    ("RRC", HeadType::Verb),
    ("S", HeadType::Verb),
    ("SBAR", HeadType::Verb),
    ("SBARQ", HeadType::Verb),
    ("SINV", HeadType::Verb),
    ("SQ", HeadType::Verb),
    ("S1", HeadType::Verb),
    ("UCP", HeadType::Adjective),
    ("VP", HeadType::Verb),
    ("WHADJP", HeadType::Adjective),
    ("WHADVP", HeadType::Adjective),
    ("WHNP", HeadType::Noun),
    ("WHPP", HeadType::Preposition),
    ("X", HeadType::Unknown),
];

static ENGLISH_SHARED_CLASSES: &[(HeadType, &[&str])] = &[
    (
        HeadType::Adjective,
        &["$ CD JJ JJR JJS RB RBR RBS WRB", "ADJP ADVP"],
    ),
    (HeadType::Conjunction, &["CC"]),
    (HeadType::Interjection, &["INTJ UH"]),
    (HeadType::Preposition, &["IN RP TO", "PP"]),
];

static ENGLISH_SYNTACTIC_CLASSES: &[(HeadType, &[&str])] = &[
    (
        HeadType::Noun,
        &[
            "POS",
            "DT WDT WP$ WP PRP EX",
            "NN NNS",
            "$ NNP NNPS",
            "-NONE- QP NP NP$ WHNP",
            "CD IN JJ JJR JJS PDT RB PP",
        ],
    ),
    (
        HeadType::Verb,
        &[
            "AUX AUXG MD",
            "VB VBD VBG VBN VBP VBZ",
            "VP",
            "ADJP JJ S SINV SQ TO",
        ],
    ),
];

static ENGLISH_SEMANTIC_CLASSES: &[(HeadType, &[&str])] = &[
    (
        HeadType::Noun,
        &[
            "EX NN NNS PRP WP",
            "$ NNP NNPS",
            "QP NP WP$",
            "CD DT IN JJ JJR JJS PDT POS RB WDT",
        ],
    ),
    (
        HeadType::Verb,
        &[
            "VP",
            "VB VBD VBG VBN VBP VBZ",
            "ADJP JJ S SINV SQ TO",
            "AUX AUXG MD",
        ],
    ),
];

static ENGLISH_RIGHTHEADED_NOMINALS: &str = "NN NNS NNP NNPS $";

static GERMAN_CATEGORIES: &[(&str, HeadType)] = &[
    ("--", HeadType::Noun),
    ("AA", HeadType::Adjective),
    ("AP", HeadType::Adjective),
    ("AVP", HeadType::Adjective),
    ("CAC", HeadType::Conjunction),
    ("CAP", HeadType::Conjunction),
    ("CAVP", HeadType::Conjunction),
    ("CCP", HeadType::Conjunction),
    ("CH", HeadType::Verb),
    ("CNP", HeadType::Conjunction),
    ("CO", HeadType::Conjunction),
    ("CPP", HeadType::Conjunction),
    ("CS", HeadType::Conjunction),
    ("CVP", HeadType::Conjunction),
    ("CVZ", HeadType::Conjunction),
    ("DL", HeadType::Unknown),
    ("ISU", HeadType::Unknown),
    ("MPN", HeadType::Noun),
    ("MTA", HeadType::Adjective),
    ("NM", HeadType::Noun),
    ("NP", HeadType::Noun),
    ("PP", HeadType::Preposition),
    ("QL", HeadType::Noun),
    ("S", HeadType::Verb),
    ("S1", HeadType::Verb),
    ("VP", HeadType::Verb),
    ("VZ", HeadType::Verb),
];

static GERMAN_CLASSES: &[(HeadType, &[&str])] = &[
    (
        HeadType::Adjective,
        &["CARD ORD ADJA ADJD ADV PAV PROAV", "AA AP AVP"],
    ),
    (HeadType::Conjunction, &["KOUI KOUS KON KOKOM"]),
    (HeadType::Interjection, &["ITJ"]),
    (
        HeadType::Noun,
        &[
            "ART",
            "CARD ORD FM",
            "NN NE",
            "PDS PDAT PIS PIAT PIDAT PPER PPOSS PPOSAT",
            "PRELS PRELAT PRF",
            "PWS PWAT PWAV",
            "XY SGML SPELL TRUNC --",
            "NP",
        ],
    ),
    (
        HeadType::Preposition,
        &[
            "APPR APPRART",
            "APPO",
            "APZR",
            "PTKZU PTKNEG PTKVZ PTKANT PTKA",
            "PP",
        ],
    ),
    (
        HeadType::Verb,
        &[
            "VAFIN VAIMP VAINF VAPP VMFIN VMINF VMPP",
            "VVFIN VVIMP VVINF VVIZU VVPP",
            "VP",
            "S S1 VZ",
        ],
    ),
];

/// Head rules of one kind for one language.
#[derive(Clone, Debug)]
pub struct HeadRules {
    kind: HeadKind,
    classes: HashMap<HeadType, Vec<LabelSet>>,
    head_types: HashMap<String, HeadType>,
    // The scan over a noun class stops at the first match unless the match is in this set.
    // `None` never stops on nouns.
    rightheaded_nominals: Option<LabelSet>,
}

impl HeadRules {
    fn from_tables(
        kind: HeadKind,
        categories: &[(&str, HeadType)],
        tables: &[&[(HeadType, &[&str])]],
        rightheaded_nominals: Option<LabelSet>,
    ) -> Self {
        let classes = tables
            .iter()
            .flat_map(|table| table.iter())
            .map(|(head_type, classes)| {
                let sets = classes.iter().map(|&class| LabelSet::from(class)).collect();
                (*head_type, sets)
            })
            .collect();
        let head_types = categories
            .iter()
            .map(|(category, head_type)| (category.to_string(), *head_type))
            .collect();
        HeadRules {
            kind,
            classes,
            head_types,
            rightheaded_nominals,
        }
    }

    /// Construct the English head rules of the given kind.
    pub fn english(kind: HeadKind) -> Self {
        match kind {
            HeadKind::Syntactic => HeadRules::from_tables(
                kind,
                ENGLISH_CATEGORIES,
                &[ENGLISH_SHARED_CLASSES, ENGLISH_SYNTACTIC_CLASSES],
                Some(LabelSet::from(ENGLISH_RIGHTHEADED_NOMINALS)),
            ),
            HeadKind::Semantic => HeadRules::from_tables(
                kind,
                ENGLISH_CATEGORIES,
                &[ENGLISH_SHARED_CLASSES, ENGLISH_SEMANTIC_CLASSES],
                None,
            ),
        }
    }

    /// Construct the German head rules of the given kind.
    ///
    /// Both kinds share their tables. Syntactic heads stop at the first nominal match.
    pub fn german(kind: HeadKind) -> Self {
        let rightheaded_nominals = match kind {
            HeadKind::Syntactic => Some(LabelSet::default()),
            HeadKind::Semantic => None,
        };
        HeadRules::from_tables(kind, GERMAN_CATEGORIES, &[GERMAN_CLASSES], rightheaded_nominals)
    }

    /// Get the kind of heads these rules find.
    pub fn kind(&self) -> HeadKind {
        self.kind
    }

    /// Get the head type of a category.
    ///
    /// Categories without an entry have type `HeadType::Unknown`.
    pub fn head_type(&self, category: &str) -> HeadType {
        self.head_types
            .get(category)
            .cloned()
            .unwrap_or(HeadType::Unknown)
    }

    fn stops_scan(&self, head_type: HeadType, category: &str) -> bool {
        match head_type {
            HeadType::Verb | HeadType::Preposition => true,
            HeadType::Noun => self
                .rightheaded_nominals
                .as_ref()
                .map(|nominals| !nominals.matches(category))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Get the head child of `node`.
    ///
    /// Only nonterminals have head children. Within a priority class the last matching child
    /// is the head, verbal and prepositional classes (and nominal classes, depending on the
    /// rules) take the first match instead. If no class matches, the rightmost
    /// non-punctuation preterminal is the head, then the rightmost non-punctuation child.
    pub fn head_child(&self, tree: &impl Navigate, node: NodeIndex) -> Option<NodeIndex> {
        if !tree.is_nonterminal(node) {
            return None;
        }
        let children = tree.children(node);
        if children.len() == 1 && tree.node(children[0]).is_none_label() {
            return Some(children[0]);
        }

        let head_type = self.head_type(tree.label(node));
        if let Some(classes) = self.classes.get(&head_type) {
            for class in classes {
                let mut head = None;
                for &child in children.iter() {
                    let category = tree.label(child);
                    if class.matches(category) {
                        head = Some(child);
                        if self.stops_scan(head_type, category) {
                            break;
                        }
                    }
                }
                if head.is_some() {
                    return head;
                }
            }
        }

        children
            .iter()
            .rev()
            .find(|&&child| tree.is_preterminal(child) && !tree.is_punctuation(child))
            .or_else(|| {
                children
                    .iter()
                    .rev()
                    .find(|&&child| !tree.is_punctuation(child))
            })
            .cloned()
    }

    /// Get the lexical head of `node`.
    ///
    /// Follows head children down to a preterminal, which may be an empty preterminal.
    /// Returns `None` if the chain of head children does not end in a preterminal.
    pub fn lexical_head(&self, tree: &impl Navigate, node: NodeIndex) -> Option<NodeIndex> {
        let mut node = node;
        while let Some(head) = self.head_child(tree, node) {
            node = head;
        }
        if tree.is_preterminal(node) {
            Some(node)
        } else {
            None
        }
    }
}

/// Syntactic and semantic head rules of a language.
#[derive(Clone, Debug)]
pub struct HeadFinder {
    syntactic: HeadRules,
    semantic: HeadRules,
}

impl HeadFinder {
    /// Construct the head finder for `language`.
    pub fn new(language: Language) -> Self {
        match language {
            Language::English => HeadFinder {
                syntactic: HeadRules::english(HeadKind::Syntactic),
                semantic: HeadRules::english(HeadKind::Semantic),
            },
            Language::German => HeadFinder {
                syntactic: HeadRules::german(HeadKind::Syntactic),
                semantic: HeadRules::german(HeadKind::Semantic),
            },
        }
    }

    /// Get the rules of the given kind.
    pub fn rules(&self, kind: HeadKind) -> &HeadRules {
        match kind {
            HeadKind::Syntactic => &self.syntactic,
            HeadKind::Semantic => &self.semantic,
        }
    }
}

#[cfg(test)]
mod tests {
    use petgraph::prelude::NodeIndex;

    use super::{HeadFinder, HeadKind, HeadRules, HeadType, Language};
    use crate::io::{PTBFormat, ReadTree};
    use crate::{Navigate, Tree};

    fn tree(s: &str) -> Tree {
        PTBFormat::Plain.string_to_tree(s).unwrap()
    }

    fn top(tree: &Tree) -> NodeIndex {
        tree.first_child(tree.root()).unwrap()
    }

    fn head_label<'a>(rules: &HeadRules, tree: &'a Tree, node: NodeIndex) -> Option<&'a str> {
        rules.head_child(tree, node).map(|head| tree.label(head))
    }

    #[test]
    fn syntactic_and_semantic_np() {
        let syntactic = HeadRules::english(HeadKind::Syntactic);
        let semantic = HeadRules::english(HeadKind::Semantic);
        let t = tree("(S1 (NP (DT the) (JJ big) (NN dog)))");
        assert_eq!(head_label(&syntactic, &t, top(&t)), Some("DT"));
        assert_eq!(head_label(&semantic, &t, top(&t)), Some("NN"));
    }

    #[test]
    fn rightheaded_nominals() {
        let syntactic = HeadRules::english(HeadKind::Syntactic);
        let t = tree("(S1 (NP (NN stock) (NN market) (NNS prices)))");
        assert_eq!(head_label(&syntactic, &t, top(&t)), Some("NNS"));
        let np = top(&t);
        let head = syntactic.head_child(&t, np).unwrap();
        assert_eq!(head, t.children(np)[2]);
    }

    #[test]
    fn verbal_heads_take_first_match() {
        let syntactic = HeadRules::english(HeadKind::Syntactic);
        let semantic = HeadRules::english(HeadKind::Semantic);
        let t = tree("(S1 (VP (MD will) (VP (VB go) (ADVP (RB home)))))");
        assert_eq!(head_label(&syntactic, &t, top(&t)), Some("MD"));
        assert_eq!(head_label(&semantic, &t, top(&t)), Some("VP"));
        let lexhead = semantic.lexical_head(&t, top(&t)).unwrap();
        assert_eq!(t.label(lexhead), "VB");
        let lexhead = syntactic.lexical_head(&t, top(&t)).unwrap();
        assert_eq!(t.label(lexhead), "MD");
    }

    #[test]
    fn fallbacks() {
        let syntactic = HeadRules::english(HeadKind::Syntactic);
        // X has no priority classes
        let t = tree("(S1 (X (NN a) (NN b) (. .)))");
        assert_eq!(head_label(&syntactic, &t, top(&t)), Some("NN"));
        assert_eq!(syntactic.head_child(&t, top(&t)), Some(t.children(top(&t))[1]));
        // unknown categories fall back as well
        let t = tree("(S1 (FOO (ADJP (JJ red)) (, ,)))");
        assert_eq!(syntactic.head_type("FOO"), HeadType::Unknown);
        assert_eq!(head_label(&syntactic, &t, top(&t)), Some("ADJP"));
        let t = tree("(S1 (FOO (, ,)))");
        assert_eq!(head_label(&syntactic, &t, top(&t)), None);
    }

    #[test]
    fn empty_only_child() {
        let syntactic = HeadRules::english(HeadKind::Syntactic);
        let t = tree("(S1 (S (NP (-NONE- *)) (VP (VBZ is))))");
        let np = t.first_child(top(&t)).unwrap();
        let head = syntactic.head_child(&t, np).unwrap();
        assert_eq!(t.label(head), "-NONE-");
        assert_eq!(syntactic.lexical_head(&t, np), Some(head));
    }

    #[test]
    fn preterminals_and_terminals() {
        let syntactic = HeadRules::english(HeadKind::Syntactic);
        let t = tree("(S1 (NP (NN dog)))");
        let nn = t.first_child(top(&t)).unwrap();
        assert_eq!(syntactic.head_child(&t, nn), None);
        assert_eq!(syntactic.lexical_head(&t, nn), Some(nn));
        let word = t.first_child(nn).unwrap();
        assert_eq!(syntactic.lexical_head(&t, word), None);
    }

    #[test]
    fn german_heads() {
        let finder = HeadFinder::new(Language::German);
        let t = tree("(S1 (NP (ART die) (ADJA grosse) (NN Stadt)))");
        let syntactic = finder.rules(HeadKind::Syntactic);
        let semantic = finder.rules(HeadKind::Semantic);
        assert_eq!(head_label(syntactic, &t, top(&t)), Some("ART"));
        assert_eq!(head_label(semantic, &t, top(&t)), Some("ART"));
        let t = tree("(S1 (PP (APPR in) (NP (NN Berlin))))");
        assert_eq!(head_label(syntactic, &t, top(&t)), Some("APPR"));
        assert_eq!(syntactic.head_type("CNP"), HeadType::Conjunction);
    }

    #[test]
    fn languages() {
        assert_eq!(Language::try_from_str("German").unwrap(), Language::German);
        assert_eq!(Language::try_from_str("en").unwrap(), Language::English);
        assert!(Language::try_from_str("klingon").is_err());
    }
}
