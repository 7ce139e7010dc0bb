//! Line Breaking for math expressions
//!
//! The algorithm follows a greedy approach:
//! 1. Split the finalized list into indivisible units (one per atom, with
//!    text runs split further by a [`TextSegmenter`])
//! 2. Fill lines greedily, measuring each candidate line by typesetting it
//! 3. Typeset every line and stack the lines top-down without overlap

use crate::{LayoutError, Result, TextSegmenter, UnicodeSegmenter};
use math::{typeset, Atom, AtomKind, AtomList, DisplayBox, DrawList, FinalizedList, LineStyle, MathError, Point, Rect, Size};
use math_font::{MathConstant, MathFontMetrics};
use serde::{Deserialize, Serialize};

/// Slack allowed when comparing a measured width against the limit
const WIDTH_TOLERANCE: f32 = 1e-3;

/// Configuration for line breaking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineBreakConfig {
    /// Maximum line width in points
    pub max_width: f32,
    /// Style every line is typeset in
    pub style: LineStyle,
    /// White space between lines; the font's `MathLeading` when unset
    pub line_gap: Option<f32>,
}

impl Default for LineBreakConfig {
    fn default() -> Self {
        Self {
            max_width: 468.0, // 6.5 inches at 72 dpi
            style: LineStyle::Text,
            line_gap: None,
        }
    }
}

impl LineBreakConfig {
    pub fn new(max_width: f32) -> Self {
        Self {
            max_width,
            ..Self::default()
        }
    }

    pub fn with_style(mut self, style: LineStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_line_gap(mut self, line_gap: f32) -> Self {
        self.line_gap = Some(line_gap);
        self
    }

    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_width.is_nan() {
            return Err(LayoutError::InvalidConfig("max_width must be a number".to_string()));
        }
        if let Some(gap) = self.line_gap {
            if !gap.is_finite() || gap < 0.0 {
                return Err(LayoutError::InvalidConfig(format!(
                    "line_gap must be a non-negative number, got {gap}"
                )));
            }
        }
        Ok(())
    }

    /// Width limit actually applied; negative or NaN limits admit one unit per line
    fn width_limit(&self) -> f32 {
        if self.max_width.is_nan() || self.max_width < 0.0 {
            0.0
        } else {
            self.max_width
        }
    }
}

/// One laid-out line
#[derive(Debug, Clone, PartialEq)]
pub struct MathLine {
    /// Atoms on this line (text fragments of one run merged back)
    pub atoms: FinalizedList,
    /// Placed display tree of the line
    pub display: DisplayBox,
    /// Absolute y of the line's baseline (the first line's top is at 0)
    pub baseline: f32,
}

impl MathLine {
    pub fn width(&self) -> f32 {
        self.display.width
    }

    pub fn top(&self) -> f32 {
        self.baseline + self.display.ascent
    }

    pub fn bottom(&self) -> f32 {
        self.baseline - self.display.descent
    }
}

/// Result of breaking an expression into lines
#[derive(Debug)]
pub struct BrokenMath {
    /// Lines from top to bottom
    pub lines: Vec<MathLine>,
    /// Width of the widest line; height of the whole stack including gaps
    pub size: Size,
    /// Atoms that could not be laid out
    pub issues: Vec<MathError>,
}

impl BrokenMath {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Draw commands for every line
    pub fn draw_list(&self) -> Result<DrawList> {
        let mut commands = Vec::new();
        let mut bounds: Option<Rect> = None;
        for line in &self.lines {
            let list = DrawList::from_box(&line.display)?;
            bounds = Some(match bounds {
                Some(b) => b.union(&list.bounds),
                None => list.bounds,
            });
            commands.extend(list.commands);
        }
        Ok(DrawList {
            commands,
            bounds: bounds.unwrap_or_default(),
        })
    }
}

/// An atom together with the index of the atom it came from
#[derive(Debug, Clone)]
struct Piece {
    atom: Atom,
    source: usize,
}

impl Piece {
    fn new(atom: Atom, source: usize) -> Self {
        Self { atom, source }
    }
}

/// Atoms that must stay on one line
#[derive(Debug, Clone, Default)]
struct Unit {
    pieces: Vec<Piece>,
}

impl Unit {
    fn last_style(&self) -> Option<&Atom> {
        self.pieces
            .iter()
            .rev()
            .map(|p| &p.atom)
            .find(|a| matches!(a.kind, AtomKind::Style { .. }))
    }
}

/// A line being filled
#[derive(Debug, Default)]
struct PendingLine {
    /// Style carried over from earlier lines
    prefix: Option<Atom>,
    units: Vec<Unit>,
}

impl PendingLine {
    fn new(prefix: Option<Atom>) -> Self {
        Self {
            prefix,
            units: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Breaks expressions into lines no wider than a limit
#[derive(Debug, Clone)]
pub struct LineBreaker<'a, S = UnicodeSegmenter> {
    font: &'a MathFontMetrics,
    segmenter: S,
}

impl<'a> LineBreaker<'a> {
    /// Line breaker using Unicode segmentation for text runs
    pub fn new(font: &'a MathFontMetrics) -> Self {
        Self {
            font,
            segmenter: UnicodeSegmenter,
        }
    }
}

impl<'a, S: TextSegmenter> LineBreaker<'a, S> {
    pub fn with_segmenter(font: &'a MathFontMetrics, segmenter: S) -> Self {
        Self { font, segmenter }
    }

    /// Break `list` into lines of at most `config.max_width`
    ///
    /// A unit wider than the limit sits alone on its own line. An empty list
    /// produces a single empty line.
    pub fn break_lines(&self, list: &FinalizedList, config: &LineBreakConfig) -> BrokenMath {
        let limit = config.width_limit();
        let units = self.build_units(list);
        tracing::trace!(
            target: "layout_engine::line_breaker",
            units = units.len(),
            max_width = limit,
            "breaking expression"
        );

        let mut pending = Vec::new();
        let mut current = PendingLine::default();
        let mut active_style: Option<Atom> = None;

        for unit in units {
            if !current.is_empty() {
                let width = self.measure(&current, Some(&unit), config.style);
                if width > limit + WIDTH_TOLERANCE {
                    let next = PendingLine::new(active_style.clone());
                    pending.push(std::mem::replace(&mut current, next));
                }
            }
            if let Some(style) = unit.last_style() {
                active_style = Some(style.clone());
            }
            current.units.push(unit);
        }
        pending.push(current);

        self.stack(&pending, config)
    }

    /// Size of `list` when broken at `proposed_width` (`None`: unconstrained)
    pub fn intrinsic_size(
        &self,
        list: &FinalizedList,
        config: &LineBreakConfig,
        proposed_width: Option<f32>,
    ) -> Size {
        let config = LineBreakConfig {
            max_width: proposed_width.unwrap_or(f32::INFINITY),
            ..config.clone()
        };
        self.break_lines(list, &config).size
    }

    fn build_units(&self, list: &FinalizedList) -> Vec<Unit> {
        let atoms = list.atoms();
        let mut units: Vec<Unit> = Vec::with_capacity(atoms.len());
        let mut glued: Vec<Piece> = Vec::new();
        let mut idx = 0;

        while idx < atoms.len() {
            let atom = &atoms[idx];
            match atom.kind {
                AtomKind::Style { .. } => {
                    glued.push(Piece::new(atom.clone(), idx));
                    idx += 1;
                }
                // A kern stays with what it follows and never starts a line.
                AtomKind::Space { .. } if glued.is_empty() && !units.is_empty() => {
                    if let Some(unit) = units.last_mut() {
                        unit.pieces.push(Piece::new(atom.clone(), idx));
                    }
                    idx += 1;
                }
                AtomKind::Text => {
                    let fragments = self.segmenter.units(&atom.nucleus);
                    if fragments.len() <= 1 {
                        let mut pieces = std::mem::take(&mut glued);
                        pieces.push(Piece::new(atom.clone(), idx));
                        units.push(Unit { pieces });
                    } else {
                        let last = fragments.len() - 1;
                        for (k, fragment) in fragments.into_iter().enumerate() {
                            let mut piece = Atom::text(fragment);
                            // Scripts belong to the end of the run.
                            if k == last {
                                piece.superscript = atom.superscript.clone();
                                piece.subscript = atom.subscript.clone();
                            }
                            let mut pieces = std::mem::take(&mut glued);
                            pieces.push(Piece::new(piece, idx));
                            units.push(Unit { pieces });
                        }
                    }
                    idx += 1;
                }
                _ => {
                    let end = number_run_end(atoms, idx);
                    let mut pieces = std::mem::take(&mut glued);
                    pieces.extend(
                        atoms[idx..end]
                            .iter()
                            .enumerate()
                            .map(|(k, a)| Piece::new(a.clone(), idx + k)),
                    );
                    units.push(Unit { pieces });
                    idx = end;
                }
            }
        }

        if !glued.is_empty() {
            match units.last_mut() {
                Some(unit) => unit.pieces.extend(glued),
                None => units.push(Unit { pieces: glued }),
            }
        }
        units
    }

    fn measure(&self, line: &PendingLine, extra: Option<&Unit>, style: LineStyle) -> f32 {
        let atoms = assemble(line.prefix.as_ref(), line.units.iter().chain(extra));
        typeset(&atoms.finalize(), self.font, style).root.width
    }

    fn stack(&self, pending: &[PendingLine], config: &LineBreakConfig) -> BrokenMath {
        // Lines never overlap, whatever the configured or font-supplied gap.
        let gap = config
            .line_gap
            .unwrap_or_else(|| self.font.constant(MathConstant::MathLeading))
            .max(0.0);
        let mut lines = Vec::with_capacity(pending.len());
        let mut issues = Vec::new();
        let mut width: f32 = 0.0;
        let mut bottom: f32 = 0.0;

        for (index, line) in pending.iter().enumerate() {
            let atoms = assemble(line.prefix.as_ref(), &line.units).finalize();
            let result = typeset(&atoms, self.font, config.style);
            issues.extend(result.issues);

            let mut line_box = result.root;
            let top = if index == 0 { 0.0 } else { bottom - gap };
            let baseline = top - line_box.ascent;
            line_box.place(Point::new(0.0, baseline));
            bottom = baseline - line_box.descent;
            width = width.max(line_box.width);

            let (line_width, line_height) = (line_box.width, line_box.height());
            tracing::debug!(
                target: "layout_engine::line_breaker",
                line = index,
                units = line.units.len(),
                width = line_width,
                height = line_height,
                "line produced"
            );
            lines.push(MathLine {
                atoms,
                display: line_box,
                baseline,
            });
        }

        BrokenMath {
            lines,
            size: Size::new(width, -bottom),
            issues,
        }
    }
}

/// Break `list` with the default segmenter
pub fn break_math(list: &FinalizedList, font: &MathFontMetrics, config: &LineBreakConfig) -> BrokenMath {
    LineBreaker::new(font).break_lines(list, config)
}

/// Size of `list` at `proposed_width` (`None`: unconstrained)
pub fn intrinsic_size(
    list: &FinalizedList,
    font: &MathFontMetrics,
    config: &LineBreakConfig,
    proposed_width: Option<f32>,
) -> Size {
    LineBreaker::new(font).intrinsic_size(list, config, proposed_width)
}

/// Rebuild an atom list from units, merging text fragments of the same run
/// and dropping trailing whitespace
fn assemble<'u>(prefix: Option<&Atom>, units: impl IntoIterator<Item = &'u Unit>) -> AtomList {
    let mut atoms: Vec<Atom> = prefix.cloned().into_iter().collect();
    let mut last_source: Option<usize> = None;

    for piece in units.into_iter().flat_map(|u| &u.pieces) {
        let continues = piece.atom.is_text() && last_source == Some(piece.source);
        match atoms.last_mut() {
            Some(prev) if continues && prev.is_text() => {
                prev.nucleus.push_str(&piece.atom.nucleus);
                prev.superscript = piece.atom.superscript.clone();
                prev.subscript = piece.atom.subscript.clone();
            }
            _ => atoms.push(piece.atom.clone()),
        }
        last_source = Some(piece.source);
    }

    if let Some(last) = atoms.last_mut() {
        if last.is_text() && !last.has_scripts() {
            let trimmed = last.nucleus.trim_end().len();
            last.nucleus.truncate(trimmed);
            if last.nucleus.is_empty() {
                atoms.pop();
            }
        }
    }
    AtomList::from(atoms)
}

/// End (exclusive) of a `number (separator number)*` run starting at `start`
fn number_run_end(atoms: &[Atom], start: usize) -> usize {
    let mut end = start + 1;
    if atoms[start].kind != AtomKind::Number {
        return end;
    }
    while end + 1 < atoms.len()
        && !atoms[end - 1].has_scripts()
        && is_number_separator(&atoms[end])
        && atoms[end + 1].kind == AtomKind::Number
    {
        end += 2;
    }
    end
}

fn is_number_separator(atom: &Atom) -> bool {
    atom.kind == AtomKind::Punctuation && !atom.has_scripts() && matches!(atom.nucleus.as_str(), "." | ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> MathFontMetrics {
        MathFontMetrics::builtin(10.0)
    }

    fn line_texts(broken: &BrokenMath) -> Vec<String> {
        broken.lines.iter().map(|l| l.atoms.to_string()).collect()
    }

    #[test]
    fn test_config_defaults() {
        let config = LineBreakConfig::default();
        assert_eq!(config.max_width, 468.0);
        assert_eq!(config.style, LineStyle::Text);
        assert!(config.line_gap.is_none());
    }

    #[test]
    fn test_config_from_json() {
        let config = LineBreakConfig::from_json(r#"{"max_width": 120.0, "style": "Display"}"#).unwrap();
        assert_eq!(config.max_width, 120.0);
        assert_eq!(config.style, LineStyle::Display);
        assert!(config.line_gap.is_none());

        let err = LineBreakConfig::from_json(r#"{"line_gap": -2.0}"#).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidConfig(_)));
        let err = LineBreakConfig::from_json("{").unwrap_err();
        assert!(matches!(err, LayoutError::Json(_)));
    }

    #[test]
    fn test_number_runs_form_one_unit() {
        let f = font();
        let list = AtomList::from(vec![
            Atom::number("3"),
            Atom::punctuation(","),
            Atom::number("14"),
            Atom::variable("x"),
        ])
        .finalize();
        let units = LineBreaker::new(&f).build_units(&list);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].pieces.len(), 3);
    }

    #[test]
    fn test_number_with_script_ends_run() {
        let f = font();
        let list = AtomList::from(vec![
            Atom::number("3").with_superscript(AtomList::from_symbols("2")),
            Atom::punctuation(","),
            Atom::number("4"),
        ])
        .finalize();
        assert_eq!(LineBreaker::new(&f).build_units(&list).len(), 3);
    }

    #[test]
    fn test_text_scripts_stay_on_last_fragment() {
        let f = font();
        let list = AtomList::from(vec![Atom::text("alpha beta").with_superscript(AtomList::from_symbols("2"))]).finalize();
        let units = LineBreaker::new(&f).build_units(&list);
        assert_eq!(units.len(), 2);
        assert!(units[0].pieces[0].atom.superscript.is_none());
        assert!(units[1].pieces[0].atom.superscript.is_some());
    }

    #[test]
    fn test_assemble_merges_fragments_and_trims() {
        let f = font();
        let list = AtomList::from(vec![Atom::text("one two "), Atom::text("three")]).finalize();
        let units = LineBreaker::new(&f).build_units(&list);
        assert_eq!(units.len(), 3);

        let assembled = assemble(None, &units[..2]);
        assert_eq!(assembled.atoms.len(), 1);
        assert_eq!(assembled.atoms[0].nucleus, "one two");

        let all = assemble(None, &units);
        assert_eq!(all.atoms.len(), 2);
    }

    #[test]
    fn test_style_glued_and_reapplied() {
        let f = font();
        let list = AtomList::from(vec![
            Atom::style(LineStyle::Display),
            Atom::fraction(AtomList::from_symbols("1"), AtomList::from_symbols("2")),
            Atom::fraction(AtomList::from_symbols("3"), AtomList::from_symbols("4")),
        ])
        .finalize();
        let broken = LineBreaker::new(&f).break_lines(&list, &LineBreakConfig::new(1.0));
        assert_eq!(broken.line_count(), 2);
        for line in &broken.lines {
            assert!(matches!(
                line.atoms.atoms()[0].kind,
                AtomKind::Style {
                    style: LineStyle::Display
                }
            ));
        }
        // Both lines are typeset identically.
        assert_eq!(broken.lines[0].display.width, broken.lines[1].display.width);
    }

    #[test]
    fn test_empty_list_is_one_empty_line() {
        let f = font();
        let broken = LineBreaker::new(&f).break_lines(&AtomList::new().finalize(), &LineBreakConfig::default());
        assert_eq!(broken.line_count(), 1);
        assert_eq!(broken.size, Size::zero());
        assert!(broken.draw_list().unwrap().is_empty());
    }

    #[test]
    fn test_negative_width_puts_each_unit_alone() {
        let f = font();
        let list = AtomList::from_symbols("a+b").finalize();
        let broken = LineBreaker::new(&f).break_lines(&list, &LineBreakConfig::new(-5.0));
        assert_eq!(line_texts(&broken), vec!["a", "+", "b"]);
    }

    #[test]
    fn test_line_gap_is_applied() {
        let f = font();
        let list = AtomList::from_symbols("ab").finalize();
        let config = LineBreakConfig::new(0.0).with_line_gap(3.0);
        let broken = LineBreaker::new(&f).break_lines(&list, &config);
        assert_eq!(broken.line_count(), 2);
        let gap = broken.lines[0].bottom() - broken.lines[1].top();
        assert!((gap - 3.0).abs() < 1e-4);
        assert!((broken.lines[0].top()).abs() < 1e-6);
        let heights: f32 = broken.lines.iter().map(|l| l.display.height()).sum();
        assert!((broken.size.height - (heights + 3.0)).abs() < 1e-4);
    }

    #[test]
    fn test_negative_gap_is_clamped() {
        let f = font();
        let list = AtomList::from_symbols("ab").finalize();
        let config = LineBreakConfig::new(0.0).with_line_gap(-3.0);
        let broken = LineBreaker::new(&f).break_lines(&list, &config);
        assert_eq!(broken.line_count(), 2);
        let (upper, lower) = (&broken.lines[0], &broken.lines[1]);
        assert!(upper.bottom() >= lower.top() - 1e-4);
        assert!((upper.bottom() - lower.top()).abs() < 1e-4);
    }

    #[test]
    fn test_space_stays_with_preceding_unit() {
        let f = font();
        let list = AtomList::from(vec![Atom::variable("x"), Atom::space(-2.0), Atom::variable("y")]).finalize();
        let units = LineBreaker::new(&f).build_units(&list);
        assert_eq!(units.len(), 2);
        assert!(matches!(units[0].pieces[1].atom.kind, AtomKind::Space { .. }));

        let broken = LineBreaker::new(&f).break_lines(&list, &LineBreakConfig::new(0.0));
        assert_eq!(line_texts(&broken), vec!["x\\hspace{-2pt}", "y"]);
    }

    #[test]
    fn test_default_gap_is_math_leading() {
        let f = font();
        let list = AtomList::from_symbols("ab").finalize();
        let broken = LineBreaker::new(&f).break_lines(&list, &LineBreakConfig::new(0.0));
        let gap = broken.lines[0].bottom() - broken.lines[1].top();
        assert!((gap - f.constant(MathConstant::MathLeading)).abs() < 1e-4);
    }

    #[test]
    fn test_issues_are_collected() {
        let f = font();
        let list = AtomList::from(vec![Atom::variable(""), Atom::variable("x")]).finalize();
        let broken = LineBreaker::new(&f).break_lines(&list, &LineBreakConfig::default());
        assert_eq!(broken.issues.len(), 1);
    }

    #[test]
    fn test_draw_list_covers_all_lines() {
        let f = font();
        let list = AtomList::from(vec![Atom::text("one two three")]).finalize();
        let broken = LineBreaker::new(&f).break_lines(&list, &LineBreakConfig::new(20.0));
        assert_eq!(broken.line_count(), 3);
        let draw = broken.draw_list().unwrap();
        assert_eq!(draw.len(), 3);
        assert!((draw.bounds.height() - broken.size.height).abs() < 1e-3);
    }
}
