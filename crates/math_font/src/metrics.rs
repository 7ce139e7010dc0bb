//! Point-size metric queries over a math font table
//!
//! [`MathFontMetrics`] pairs a shared [`FontMetricsTable`] with a font size and
//! answers every query in points. All queries are pure; anything the table
//! does not define degrades to a documented fallback instead of an error.

use crate::{FontCache, FontMetricsTable, GlyphPart, MathConstant};
use std::sync::Arc;

/// Upper bound on extender repeats when assembling a glyph
const MAX_EXTENDER_REPEATS: usize = 256;

/// Glyph metrics converted to points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphBox {
    pub advance: f32,
    pub ascent: f32,
    pub descent: f32,
}

impl GlyphBox {
    /// Total height (ascent + descent)
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// A part of an assembled glyph, positioned from the bottom of the assembly
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPart {
    pub glyph: String,
    /// Distance from the bottom of the assembly to the bottom of this part
    pub offset: f32,
    pub advance: f32,
}

/// A vertically assembled glyph, in points
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphAssembly {
    pub parts: Vec<AssembledPart>,
    pub width: f32,
    pub height: f32,
}

/// A math font at a given size
#[derive(Debug, Clone)]
pub struct MathFontMetrics {
    table: Arc<FontMetricsTable>,
    font_size: f32,
}

impl MathFontMetrics {
    /// Create metrics over a shared table
    pub fn new(table: Arc<FontMetricsTable>, font_size: f32) -> Self {
        Self { table, font_size }
    }

    /// Metrics over the built-in table, shared through the global cache
    pub fn builtin(font_size: f32) -> Self {
        Self::new(FontCache::global().builtin(), font_size)
    }

    /// The same font at another size
    pub fn with_size(&self, font_size: f32) -> Self {
        Self {
            table: Arc::clone(&self.table),
            font_size,
        }
    }

    pub fn table(&self) -> &FontMetricsTable {
        &self.table
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn units_per_em(&self) -> u16 {
        self.table.units_per_em
    }

    /// Convert font design units to points
    pub fn units_to_points(&self, units: f32) -> f32 {
        units * self.font_size / f32::from(self.table.units_per_em)
    }

    /// A constant in points, 0 when the font does not define it
    pub fn constant(&self, constant: MathConstant) -> f32 {
        self.constant_named(constant.name())
    }

    /// A constant by raw name, in points, 0 when undefined
    pub fn constant_named(&self, name: &str) -> f32 {
        self.table
            .constant(name)
            .map(|units| self.units_to_points(units as f32))
            .unwrap_or(0.0)
    }

    /// A percentage constant as a fraction (70 -> 0.7), 0 when undefined
    pub fn percent_constant(&self, constant: MathConstant) -> f32 {
        self.table
            .constant(constant.name())
            .map(|value| value as f32 / 100.0)
            .unwrap_or(0.0)
    }

    /// Font ascender in points
    pub fn ascent(&self) -> f32 {
        self.units_to_points(self.table.ascender as f32)
    }

    /// Font descender in points (positive)
    pub fn descent(&self) -> f32 {
        self.units_to_points(self.table.descender.unsigned_abs() as f32)
    }

    /// Glyph advance and vertical extent in points
    pub fn glyph_metrics(&self, glyph: &str) -> GlyphBox {
        let m = self.table.glyph_metrics(glyph);
        GlyphBox {
            advance: self.units_to_points(m.advance as f32),
            ascent: self.units_to_points(m.ascent as f32),
            descent: self.units_to_points(m.descent as f32),
        }
    }

    /// Italic correction in points, 0 when undefined
    pub fn italic_correction(&self, glyph: &str) -> f32 {
        self.table
            .italic_corrections
            .get(glyph)
            .map(|&units| self.units_to_points(units as f32))
            .unwrap_or(0.0)
    }

    /// Top accent attachment in points, half the advance when undefined
    pub fn accent_position(&self, glyph: &str) -> f32 {
        match self.table.accent_positions.get(glyph) {
            Some(&units) => self.units_to_points(units as f32),
            None => self.glyph_metrics(glyph).advance / 2.0,
        }
    }

    /// Increasingly tall alternates of a glyph, or the glyph itself
    pub fn vertical_variants<'a>(&'a self, glyph: &'a str) -> Vec<&'a str> {
        variants_or_self(self.table.vertical_variants.get(glyph), glyph)
    }

    /// Increasingly wide alternates of a glyph, or the glyph itself
    pub fn horizontal_variants<'a>(&'a self, glyph: &'a str) -> Vec<&'a str> {
        variants_or_self(self.table.horizontal_variants.get(glyph), glyph)
    }

    /// The next larger vertical variant, or the glyph itself
    pub fn larger_variant<'a>(&'a self, glyph: &'a str) -> &'a str {
        let Some(variants) = self.table.vertical_variants.get(glyph) else {
            return glyph;
        };
        match variants.iter().position(|v| v == glyph) {
            Some(idx) => variants.get(idx + 1).map(String::as_str).unwrap_or(glyph),
            // The base glyph is usually not listed; its first listed variant is larger.
            None => variants.first().map(String::as_str).unwrap_or(glyph),
        }
    }

    /// Assembly parts of a glyph, bottom to top; empty when there is none
    pub fn vertical_assembly(&self, glyph: &str) -> &[GlyphPart] {
        self.table
            .vertical_assemblies
            .get(glyph)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Build an assembly at least `target_height` points tall
    ///
    /// Extenders are repeated until the assembly can reach the target; the
    /// overlap between neighbouring parts never drops below
    /// `MinConnectorOverlap` and never exceeds the shorter connector. When the
    /// target falls between the tightest and loosest arrangement the slack is
    /// spread across every join so the result is exactly `target_height`.
    pub fn assemble_vertical(&self, glyph: &str, target_height: f32) -> Option<GlyphAssembly> {
        let parts = self.vertical_assembly(glyph);
        if parts.is_empty() {
            return None;
        }
        let min_overlap = self.constant(MathConstant::MinConnectorOverlap);
        let has_extender = parts.iter().any(|p| p.is_extender);

        for repeats in 0..=MAX_EXTENDER_REPEATS {
            let sequence: Vec<&GlyphPart> = parts
                .iter()
                .flat_map(|p| {
                    let count = if p.is_extender { repeats } else { 1 };
                    std::iter::repeat(p).take(count)
                })
                .collect();
            let Some(first) = sequence.first() else {
                continue;
            };

            let mut overlaps = Vec::with_capacity(sequence.len().saturating_sub(1));
            let mut tight_height = self.units_to_points(first.full_advance as f32);
            let mut slack = 0.0;
            for pair in sequence.windows(2) {
                let connector = pair[0].end_connector_length.min(pair[1].start_connector_length);
                let max_overlap = self.units_to_points(connector as f32).max(min_overlap);
                tight_height += self.units_to_points(pair[1].full_advance as f32) - max_overlap;
                slack += max_overlap - min_overlap;
                overlaps.push((max_overlap, max_overlap - min_overlap));
            }

            let loose_height = tight_height + slack;
            let last_try = !has_extender || repeats == MAX_EXTENDER_REPEATS;
            if loose_height < target_height && !last_try {
                continue;
            }

            let needed = (target_height - tight_height).max(0.0);
            let ratio = if slack > 0.0 { (needed / slack).min(1.0) } else { 0.0 };

            let mut placed = Vec::with_capacity(sequence.len());
            let mut offset = 0.0;
            let mut width: f32 = 0.0;
            for (idx, part) in sequence.iter().enumerate() {
                if idx > 0 {
                    let (max_overlap, part_slack) = overlaps[idx - 1];
                    offset -= max_overlap - part_slack * ratio;
                }
                let advance = self.units_to_points(part.full_advance as f32);
                width = width.max(self.glyph_metrics(&part.glyph).advance);
                placed.push(AssembledPart {
                    glyph: part.glyph.clone(),
                    offset,
                    advance,
                });
                offset += advance;
            }

            return Some(GlyphAssembly {
                parts: placed,
                width,
                height: offset,
            });
        }
        None
    }
}

fn variants_or_self<'a>(variants: Option<&'a Vec<String>>, glyph: &'a str) -> Vec<&'a str> {
    match variants {
        Some(list) if !list.is_empty() => list.iter().map(String::as_str).collect(),
        _ => vec![glyph],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn metrics() -> MathFontMetrics {
        MathFontMetrics::new(Arc::new(FontMetricsTable::builtin()), 10.0)
    }

    #[test]
    fn test_constant_conversion() {
        let m = metrics();
        // AxisHeight = 250 units at 1000 upem, 10pt
        assert!((m.constant(MathConstant::AxisHeight) - 2.5).abs() < 1e-6);
        assert_eq!(m.percent_constant(MathConstant::ScriptPercentScaleDown), 0.7);
    }

    #[test]
    fn test_missing_constant_is_zero() {
        let m = MathFontMetrics::new(Arc::new(FontMetricsTable::default()), 12.0);
        assert_eq!(m.constant(MathConstant::FractionRuleThickness), 0.0);
        assert_eq!(m.constant_named("NoSuchConstant"), 0.0);
        assert_eq!(m.percent_constant(MathConstant::ScriptPercentScaleDown), 0.0);
    }

    #[test]
    fn test_italic_and_accent_fallbacks() {
        let m = metrics();
        assert!(m.italic_correction("f") > 0.0);
        assert_eq!(m.italic_correction("x"), 0.0);
        assert!((m.accent_position("A") - 3.89).abs() < 1e-5);
        assert!((m.accent_position("x") - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_variants() {
        let m = metrics();
        assert_eq!(m.vertical_variants("x"), vec!["x"]);
        assert_eq!(m.horizontal_variants("x"), vec!["x"]);
        assert_eq!(m.vertical_variants("(").len(), 5);
        assert_eq!(m.larger_variant("\u{2211}"), "\u{2211}.display");
        assert_eq!(m.larger_variant("\u{2211}.display"), "\u{2211}.display");
        assert_eq!(m.larger_variant("x"), "x");
    }

    #[test]
    fn test_assembly_reaches_target() {
        let m = metrics();
        for target in [5.0, 20.0, 45.0, 120.0] {
            let assembly = m.assemble_vertical("(", target).unwrap();
            assert!(assembly.height >= target - 1e-3, "{} < {}", assembly.height, target);
            assert!(assembly.parts.len() >= 2);
        }
        assert!(m.assemble_vertical("x", 10.0).is_none());
    }

    #[test]
    fn test_assembly_respects_min_overlap() {
        let m = metrics();
        let min_overlap = m.constant(MathConstant::MinConnectorOverlap);
        let assembly = m.assemble_vertical("\u{221A}", 60.0).unwrap();
        for pair in assembly.parts.windows(2) {
            let overlap = pair[0].offset + pair[0].advance - pair[1].offset;
            assert!(overlap >= min_overlap - 1e-4);
        }
    }

    #[test]
    fn test_with_size_shares_table() {
        let m = metrics();
        let small = m.with_size(5.0);
        assert_eq!(small.font_size(), 5.0);
        assert!((small.constant(MathConstant::AxisHeight) * 2.0 - m.constant(MathConstant::AxisHeight)).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_units_to_points_linear(units in -5000.0f32..5000.0, size in 1.0f32..72.0) {
            let m = MathFontMetrics::new(Arc::new(FontMetricsTable::builtin()), size);
            prop_assert_eq!(m.units_to_points(0.0), 0.0);
            let doubled = m.with_size(size * 2.0).units_to_points(units);
            prop_assert!((doubled - 2.0 * m.units_to_points(units)).abs() <= 1e-3 * (1.0 + units.abs()));
        }
    }
}
