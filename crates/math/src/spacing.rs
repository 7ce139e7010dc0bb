//! Inter-atom spacing
//!
//! TeX's inter-element spacing table: the space between two adjacent atoms
//! depends only on their classes and on whether the style is a script style.

use crate::model::{Atom, AtomKind, LineStyle};

/// Spacing class of an atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomClass {
    Ordinary,
    Operator,
    Binary,
    Relation,
    Open,
    Close,
    Punctuation,
    Inner,
}

impl AtomClass {
    /// Class of an atom, or `None` for atoms that take no part in spacing
    pub fn of(atom: &Atom) -> Option<Self> {
        let class = match atom.kind {
            AtomKind::LargeOperator { .. } => AtomClass::Operator,
            AtomKind::BinaryOperator => AtomClass::Binary,
            AtomKind::Relation => AtomClass::Relation,
            AtomKind::Open => AtomClass::Open,
            AtomKind::Close => AtomClass::Close,
            AtomKind::Punctuation => AtomClass::Punctuation,
            AtomKind::Fraction { .. } | AtomKind::Inner { .. } => AtomClass::Inner,
            AtomKind::Space { .. } | AtomKind::Style { .. } => return None,
            _ => AtomClass::Ordinary,
        };
        Some(class)
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    Thin,
    /// Thin, display and text styles only
    NsThin,
    /// Medium, display and text styles only
    NsMedium,
    /// Thick, display and text styles only
    NsThick,
}

use Gap::{None as NO, NsMedium as NM, NsThick as NK, NsThin as NT, Thin as TH};

// Rows: left class, columns: right class (Ord Op Bin Rel Open Close Punct Inner).
// Impossible pairs (binary next to binary etc.) are zero.
const TABLE: [[Gap; 8]; 8] = [
    [NO, TH, NM, NK, NO, NO, NO, NT],
    [TH, TH, NO, NK, NO, NO, NO, NT],
    [NM, NM, NO, NO, NM, NO, NO, NM],
    [NK, NK, NO, NO, NK, NO, NO, NK],
    [NO, NO, NO, NO, NO, NO, NO, NO],
    [NO, TH, NM, NK, NO, NO, NO, NT],
    [NT, NT, NO, NT, NT, NT, NT, NT],
    [NT, TH, NM, NK, NT, NO, NT, NT],
];

/// Space between two adjacent classes, in mu (1/18 em)
pub fn space_between(left: AtomClass, right: AtomClass, style: LineStyle) -> f32 {
    let gap = TABLE[left.index()][right.index()];
    let script = style.is_script();
    match gap {
        Gap::None => 0.0,
        Gap::Thin => 3.0,
        Gap::NsThin if !script => 3.0,
        Gap::NsMedium if !script => 4.0,
        Gap::NsThick if !script => 5.0,
        _ => 0.0,
    }
}
