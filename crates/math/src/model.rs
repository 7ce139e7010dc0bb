//! Atom model - the expression tree handed to layout
//!
//! An expression is an [`AtomList`] of [`Atom`]s in reading order. Lists are
//! freely editable while a parser builds them; [`AtomList::finalize`] produces
//! a normalized, immutable [`FinalizedList`], the only form the typesetter and
//! line breaker accept.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Nucleus used for placeholder atoms (an empty square)
pub const PLACEHOLDER_GLYPH: &str = "\u{25A1}";

// =============================================================================
// Atom
// =============================================================================

/// A node in the expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// Kind and kind-specific payload
    pub kind: AtomKind,
    /// Glyph string of the atom (operator symbol, digits, text run, accent glyph)
    pub nucleus: String,
    pub superscript: Option<AtomList>,
    pub subscript: Option<AtomList>,
}

/// Kind of an atom, with its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AtomKind {
    /// Upright symbol
    Ordinary,
    /// Italic variable
    Variable,
    /// Digits, possibly with a decimal separator
    Number,
    BinaryOperator,
    UnaryOperator,
    Relation,
    Open,
    Close,
    Punctuation,
    /// Marker for missing content
    Placeholder,
    /// Big operator (sum, product, integral) or a named operator (lim)
    LargeOperator {
        /// Place scripts above/below in display style
        limits: bool,
    },
    Fraction {
        numerator: AtomList,
        denominator: AtomList,
        /// `false` for stacked (`\atop`, binomial) fractions
        has_rule: bool,
        left_delimiter: Option<String>,
        right_delimiter: Option<String>,
    },
    Radical {
        radicand: AtomList,
        degree: Option<AtomList>,
    },
    /// `\left ... \right` group
    Inner {
        left: Option<String>,
        right: Option<String>,
        inner: AtomList,
    },
    Overline {
        inner: AtomList,
    },
    Underline {
        inner: AtomList,
    },
    /// Accent over `inner`; the accent glyph is the nucleus
    Accent {
        inner: AtomList,
    },
    Color {
        color: Color,
        inner: AtomList,
    },
    TextColor {
        color: Color,
        inner: AtomList,
    },
    /// Explicit horizontal space in points (may be negative)
    Space {
        width: f32,
    },
    /// Style change for the remainder of the list
    Style {
        style: LineStyle,
    },
    /// Run of upright text; the text is the nucleus
    Text,
    /// Unrecognized node kept for fidelity
    Unknown {
        tag: String,
    },
}

impl Atom {
    /// Create an atom without scripts
    pub fn new(kind: AtomKind, nucleus: impl Into<String>) -> Self {
        Self {
            kind,
            nucleus: nucleus.into(),
            superscript: None,
            subscript: None,
        }
    }

    pub fn ordinary(nucleus: impl Into<String>) -> Self {
        Self::new(AtomKind::Ordinary, nucleus)
    }

    pub fn variable(nucleus: impl Into<String>) -> Self {
        Self::new(AtomKind::Variable, nucleus)
    }

    pub fn number(nucleus: impl Into<String>) -> Self {
        Self::new(AtomKind::Number, nucleus)
    }

    pub fn binary(nucleus: impl Into<String>) -> Self {
        Self::new(AtomKind::BinaryOperator, nucleus)
    }

    pub fn relation(nucleus: impl Into<String>) -> Self {
        Self::new(AtomKind::Relation, nucleus)
    }

    pub fn open(nucleus: impl Into<String>) -> Self {
        Self::new(AtomKind::Open, nucleus)
    }

    pub fn close(nucleus: impl Into<String>) -> Self {
        Self::new(AtomKind::Close, nucleus)
    }

    pub fn punctuation(nucleus: impl Into<String>) -> Self {
        Self::new(AtomKind::Punctuation, nucleus)
    }

    pub fn placeholder() -> Self {
        Self::new(AtomKind::Placeholder, PLACEHOLDER_GLYPH)
    }

    /// Create a big operator (e.g. '\u{2211}' with limits)
    pub fn large_operator(nucleus: impl Into<String>, limits: bool) -> Self {
        Self::new(AtomKind::LargeOperator { limits }, nucleus)
    }

    /// Create a fraction with a rule
    pub fn fraction(numerator: AtomList, denominator: AtomList) -> Self {
        Self::new(
            AtomKind::Fraction {
                numerator,
                denominator,
                has_rule: true,
                left_delimiter: None,
                right_delimiter: None,
            },
            "",
        )
    }

    /// Create a stacked fraction without a rule
    pub fn stack(numerator: AtomList, denominator: AtomList) -> Self {
        Self::new(
            AtomKind::Fraction {
                numerator,
                denominator,
                has_rule: false,
                left_delimiter: None,
                right_delimiter: None,
            },
            "",
        )
    }

    /// Create a binomial coefficient
    pub fn binomial(top: AtomList, bottom: AtomList) -> Self {
        Self::new(
            AtomKind::Fraction {
                numerator: top,
                denominator: bottom,
                has_rule: false,
                left_delimiter: Some("(".into()),
                right_delimiter: Some(")".into()),
            },
            "",
        )
    }

    /// Create a square root
    pub fn sqrt(radicand: AtomList) -> Self {
        Self::new(
            AtomKind::Radical {
                radicand,
                degree: None,
            },
            "\u{221A}",
        )
    }

    /// Create an nth root
    pub fn nth_root(degree: AtomList, radicand: AtomList) -> Self {
        Self::new(
            AtomKind::Radical {
                radicand,
                degree: Some(degree),
            },
            "\u{221A}",
        )
    }

    /// Create a `\left ... \right` group; `None` is an invisible delimiter
    pub fn inner(left: Option<&str>, inner: AtomList, right: Option<&str>) -> Self {
        Self::new(
            AtomKind::Inner {
                left: left.map(str::to_string),
                right: right.map(str::to_string),
                inner,
            },
            "",
        )
    }

    pub fn overline(inner: AtomList) -> Self {
        Self::new(AtomKind::Overline { inner }, "")
    }

    pub fn underline(inner: AtomList) -> Self {
        Self::new(AtomKind::Underline { inner }, "")
    }

    /// Create an accent (e.g. '\u{0302}' for a hat) over `inner`
    pub fn accent(accent: impl Into<String>, inner: AtomList) -> Self {
        Self::new(AtomKind::Accent { inner }, accent)
    }

    pub fn color(color: Color, inner: AtomList) -> Self {
        Self::new(AtomKind::Color { color, inner }, "")
    }

    pub fn text_color(color: Color, inner: AtomList) -> Self {
        Self::new(AtomKind::TextColor { color, inner }, "")
    }

    /// Create an explicit space of `width` points
    pub fn space(width: f32) -> Self {
        Self::new(AtomKind::Space { width }, "")
    }

    pub fn style(style: LineStyle) -> Self {
        Self::new(AtomKind::Style { style }, "")
    }

    /// Create a run of upright text
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(AtomKind::Text, text)
    }

    pub fn with_superscript(mut self, superscript: AtomList) -> Self {
        self.superscript = Some(superscript);
        self
    }

    pub fn with_subscript(mut self, subscript: AtomList) -> Self {
        self.subscript = Some(subscript);
        self
    }

    /// Whether the atom carries a superscript or subscript
    pub fn has_scripts(&self) -> bool {
        self.superscript.is_some() || self.subscript.is_some()
    }

    /// Short name of the atom kind, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            AtomKind::Ordinary => "ordinary",
            AtomKind::Variable => "variable",
            AtomKind::Number => "number",
            AtomKind::BinaryOperator => "binary operator",
            AtomKind::UnaryOperator => "unary operator",
            AtomKind::Relation => "relation",
            AtomKind::Open => "open",
            AtomKind::Close => "close",
            AtomKind::Punctuation => "punctuation",
            AtomKind::Placeholder => "placeholder",
            AtomKind::LargeOperator { .. } => "large operator",
            AtomKind::Fraction { .. } => "fraction",
            AtomKind::Radical { .. } => "radical",
            AtomKind::Inner { .. } => "inner",
            AtomKind::Overline { .. } => "overline",
            AtomKind::Underline { .. } => "underline",
            AtomKind::Accent { .. } => "accent",
            AtomKind::Color { .. } => "color",
            AtomKind::TextColor { .. } => "text color",
            AtomKind::Space { .. } => "space",
            AtomKind::Style { .. } => "style",
            AtomKind::Text => "text",
            AtomKind::Unknown { .. } => "unknown",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, AtomKind::Text)
    }
}

// =============================================================================
// Atom lists
// =============================================================================

/// An editable list of atoms in reading order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomList {
    pub atoms: Vec<Atom>,
}

impl AtomList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from plain symbols, one atom per character
    ///
    /// Digits and '.' become numbers, letters variables, `+ - * ±` binary
    /// operators, `= < > ≤ ≥` relations, brackets open/close atoms, `, ; :`
    /// punctuation. Whitespace is skipped. Meant for simple content built
    /// without a parser.
    pub fn from_symbols(symbols: &str) -> Self {
        symbols
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| {
                let nucleus = ch.to_string();
                match ch {
                    '0'..='9' | '.' => Atom::number(nucleus),
                    '+' | '-' | '*' | '\u{00B1}' | '\u{00D7}' | '\u{2212}' => Atom::binary(nucleus),
                    '=' | '<' | '>' | '\u{2264}' | '\u{2265}' => Atom::relation(nucleus),
                    '(' | '[' | '{' => Atom::open(nucleus),
                    ')' | ']' | '}' => Atom::close(nucleus),
                    ',' | ';' | ':' => Atom::punctuation(nucleus),
                    c if c.is_alphabetic() => Atom::variable(nucleus),
                    _ => Atom::ordinary(nucleus),
                }
            })
            .collect()
    }

    pub fn push(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    /// Produce the normalized, immutable form of this list
    ///
    /// Never mutates `self`. Nested lists are finalized recursively; empty
    /// required lists become placeholders, empty optional lists and empty
    /// color spans are dropped, binary operators that cannot be binary become
    /// unary, and adjacent numbers without scripts are fused.
    pub fn finalize(&self) -> FinalizedList {
        FinalizedList {
            atoms: finalize_atoms(&self.atoms).into(),
        }
    }
}

impl From<Vec<Atom>> for AtomList {
    fn from(atoms: Vec<Atom>) -> Self {
        Self { atoms }
    }
}

impl FromIterator<Atom> for AtomList {
    fn from_iter<I: IntoIterator<Item = Atom>>(iter: I) -> Self {
        Self {
            atoms: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a AtomList {
    type Item = &'a Atom;
    type IntoIter = std::slice::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.atoms.iter()
    }
}

/// A finalized, read-only atom list ready for layout
///
/// Cloning is cheap; the atoms are shared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinalizedList {
    atoms: Arc<[Atom]>,
}

impl FinalizedList {
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    /// An editable copy, e.g. to splice finalized content into a new list
    pub fn to_list(&self) -> AtomList {
        AtomList {
            atoms: self.atoms.to_vec(),
        }
    }

    /// Finalizing an already finalized list yields the same list
    pub fn finalize(&self) -> FinalizedList {
        self.to_list().finalize()
    }
}

fn finalize_atoms(atoms: &[Atom]) -> Vec<Atom> {
    let mut out: Vec<Atom> = Vec::with_capacity(atoms.len());
    for atom in atoms {
        let Some(mut atom) = finalize_atom(atom) else {
            continue;
        };

        match atom.kind {
            AtomKind::BinaryOperator if forces_unary(out.last()) => {
                atom.kind = AtomKind::UnaryOperator;
            }
            AtomKind::Relation | AtomKind::Close | AtomKind::Punctuation => {
                if let Some(prev) = out.last_mut() {
                    if prev.kind == AtomKind::BinaryOperator {
                        prev.kind = AtomKind::UnaryOperator;
                    }
                }
            }
            AtomKind::Number => {
                if let Some(prev) = out.last_mut() {
                    if prev.kind == AtomKind::Number && !prev.has_scripts() {
                        prev.nucleus.push_str(&atom.nucleus);
                        prev.superscript = atom.superscript;
                        prev.subscript = atom.subscript;
                        continue;
                    }
                }
            }
            _ => {}
        }
        out.push(atom);
    }

    if let Some(last) = out.last_mut() {
        if last.kind == AtomKind::BinaryOperator {
            last.kind = AtomKind::UnaryOperator;
        }
    }
    out
}

/// Whether a binary operator following `prev` must be read as unary
fn forces_unary(prev: Option<&Atom>) -> bool {
    match prev {
        None => true,
        Some(prev) => matches!(
            prev.kind,
            AtomKind::BinaryOperator
                | AtomKind::Relation
                | AtomKind::Open
                | AtomKind::Punctuation
                | AtomKind::LargeOperator { .. }
        ),
    }
}

fn finalize_list(list: &AtomList) -> AtomList {
    AtomList {
        atoms: finalize_atoms(&list.atoms),
    }
}

fn finalize_optional(list: Option<&AtomList>) -> Option<AtomList> {
    list.map(finalize_list).filter(|l| !l.is_empty())
}

fn finalize_required(list: &AtomList) -> AtomList {
    let list = finalize_list(list);
    if list.is_empty() {
        AtomList::from(vec![Atom::placeholder()])
    } else {
        list
    }
}

/// Finalize one atom; `None` when the atom is dropped
fn finalize_atom(atom: &Atom) -> Option<Atom> {
    let kind = match &atom.kind {
        AtomKind::Fraction {
            numerator,
            denominator,
            has_rule,
            left_delimiter,
            right_delimiter,
        } => AtomKind::Fraction {
            numerator: finalize_required(numerator),
            denominator: finalize_required(denominator),
            has_rule: *has_rule,
            left_delimiter: left_delimiter.clone(),
            right_delimiter: right_delimiter.clone(),
        },
        AtomKind::Radical { radicand, degree } => AtomKind::Radical {
            radicand: finalize_required(radicand),
            degree: finalize_optional(degree.as_ref()),
        },
        AtomKind::Inner { left, right, inner } => AtomKind::Inner {
            left: left.clone(),
            right: right.clone(),
            inner: finalize_list(inner),
        },
        AtomKind::Overline { inner } => AtomKind::Overline {
            inner: finalize_required(inner),
        },
        AtomKind::Underline { inner } => AtomKind::Underline {
            inner: finalize_required(inner),
        },
        AtomKind::Accent { inner } => AtomKind::Accent {
            inner: finalize_required(inner),
        },
        AtomKind::Color { color, inner } => {
            let inner = finalize_list(inner);
            if inner.is_empty() {
                return None;
            }
            AtomKind::Color { color: *color, inner }
        }
        AtomKind::TextColor { color, inner } => {
            let inner = finalize_list(inner);
            if inner.is_empty() {
                return None;
            }
            AtomKind::TextColor { color: *color, inner }
        }
        other => other.clone(),
    };

    Some(Atom {
        kind,
        nucleus: atom.nucleus.clone(),
        superscript: finalize_optional(atom.superscript.as_ref()),
        subscript: finalize_optional(atom.subscript.as_ref()),
    })
}

// =============================================================================
// Supporting Types
// =============================================================================

/// Typesetting style, from largest to smallest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum LineStyle {
    Display,
    #[default]
    Text,
    Script,
    ScriptScript,
}

impl LineStyle {
    /// Style of superscripts and subscripts
    pub fn script(self) -> Self {
        match self {
            LineStyle::Display | LineStyle::Text => LineStyle::Script,
            LineStyle::Script | LineStyle::ScriptScript => LineStyle::ScriptScript,
        }
    }

    /// Style of fraction numerators and denominators
    pub fn fraction(self) -> Self {
        match self {
            LineStyle::Display => LineStyle::Text,
            LineStyle::Text => LineStyle::Script,
            LineStyle::Script | LineStyle::ScriptScript => LineStyle::ScriptScript,
        }
    }

    pub fn is_display(self) -> bool {
        self == LineStyle::Display
    }

    /// Whether this is a script or scriptscript style
    pub fn is_script(self) -> bool {
        self >= LineStyle::Script
    }

    fn command(self) -> &'static str {
        match self {
            LineStyle::Display => "\\displaystyle",
            LineStyle::Text => "\\textstyle",
            LineStyle::Script => "\\scriptstyle",
            LineStyle::ScriptScript => "\\scriptscriptstyle",
        }
    }
}

/// A color in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    /// Parse `#rrggbb` or `#rrggbbaa`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

// =============================================================================
// Description
// =============================================================================

impl fmt::Display for AtomList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for atom in &self.atoms {
            write!(f, "{atom}")?;
        }
        Ok(())
    }
}

impl fmt::Display for FinalizedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for atom in self.atoms.iter() {
            write!(f, "{atom}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AtomKind::Fraction {
                numerator,
                denominator,
                has_rule,
                left_delimiter,
                right_delimiter,
            } => {
                let binomial = !has_rule
                    && left_delimiter.as_deref() == Some("(")
                    && right_delimiter.as_deref() == Some(")");
                if binomial {
                    write!(f, "\\binom{{{numerator}}}{{{denominator}}}")?;
                } else if *has_rule {
                    write!(f, "\\frac{{{numerator}}}{{{denominator}}}")?;
                } else {
                    write!(f, "{{{numerator} \\atop {denominator}}}")?;
                }
            }
            AtomKind::Radical { radicand, degree } => match degree {
                Some(degree) => write!(f, "\\sqrt[{degree}]{{{radicand}}}")?,
                None => write!(f, "\\sqrt{{{radicand}}}")?,
            },
            AtomKind::Inner { left, right, inner } => write!(
                f,
                "\\left{}{inner}\\right{}",
                left.as_deref().unwrap_or("."),
                right.as_deref().unwrap_or(".")
            )?,
            AtomKind::Overline { inner } => write!(f, "\\overline{{{inner}}}")?,
            AtomKind::Underline { inner } => write!(f, "\\underline{{{inner}}}")?,
            AtomKind::Accent { inner } => {
                let command = match self.nucleus.as_str() {
                    "\u{0302}" => "hat",
                    "\u{0303}" => "tilde",
                    "\u{0304}" => "bar",
                    "\u{20D7}" => "vec",
                    _ => "accent",
                };
                write!(f, "\\{command}{{{inner}}}")?;
            }
            AtomKind::Color { color, inner } => write!(f, "\\color{{{}}}{{{inner}}}", color.to_hex())?,
            AtomKind::TextColor { color, inner } => {
                write!(f, "\\textcolor{{{}}}{{{inner}}}", color.to_hex())?
            }
            AtomKind::Space { width } => write!(f, "\\hspace{{{width}pt}}")?,
            AtomKind::Style { style } => write!(f, "{} ", style.command())?,
            AtomKind::Text => write!(f, "\\text{{{}}}", self.nucleus)?,
            AtomKind::Placeholder => write!(f, "\\square ")?,
            AtomKind::Unknown { tag } => write!(f, "\\{tag} ")?,
            _ => write!(f, "{}", self.nucleus)?,
        }

        if let Some(sup) = &self.superscript {
            write!(f, "^{{{sup}}}")?;
        }
        if let Some(sub) = &self.subscript {
            write!(f, "_{{{sub}}}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
