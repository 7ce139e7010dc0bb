//! Math font metric tables
//!
//! A [`FontMetricsTable`] is the immutable, font-unit view of a math font: its
//! MATH constants, per-glyph metrics, italic corrections, accent attachment
//! points, size variants, and vertical glyph assemblies. Tables are built once
//! (from JSON or [`FontMetricsTable::builtin`]) and shared behind an `Arc`.

use crate::{FontError, MathConstant, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-glyph metrics in font design units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphMetrics {
    /// Horizontal advance
    pub advance: i32,
    /// Extent above the baseline
    pub ascent: i32,
    /// Extent below the baseline (positive downwards)
    pub descent: i32,
}

impl GlyphMetrics {
    pub const fn new(advance: i32, ascent: i32, descent: i32) -> Self {
        Self {
            advance,
            ascent,
            descent,
        }
    }
}

/// One piece of a vertical glyph assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphPart {
    /// Glyph name of the piece
    pub glyph: String,
    /// Full advance of the piece along the stretch direction
    pub full_advance: i32,
    /// Connector length at the start (bottom) of the piece
    pub start_connector_length: i32,
    /// Connector length at the end (top) of the piece
    pub end_connector_length: i32,
    /// Whether the piece may be repeated to grow the assembly
    pub is_extender: bool,
}

impl GlyphPart {
    pub fn new(
        glyph: impl Into<String>,
        full_advance: i32,
        start_connector_length: i32,
        end_connector_length: i32,
        is_extender: bool,
    ) -> Self {
        Self {
            glyph: glyph.into(),
            full_advance,
            start_connector_length,
            end_connector_length,
            is_extender,
        }
    }
}

/// Immutable metric table of a math font
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontMetricsTable {
    /// Font design units per em
    pub units_per_em: u16,
    /// Font ascender (positive)
    pub ascender: i32,
    /// Font descender (negative)
    pub descender: i32,
    /// Advance used for glyphs missing from `glyphs`
    pub default_advance: i32,
    /// MATH constants keyed by OpenType name
    #[serde(default)]
    pub constants: HashMap<String, i32>,
    /// Glyph metrics keyed by glyph name
    #[serde(default)]
    pub glyphs: HashMap<String, GlyphMetrics>,
    /// Italic corrections keyed by glyph name
    #[serde(default)]
    pub italic_corrections: HashMap<String, i32>,
    /// Top accent attachment points keyed by glyph name
    #[serde(default)]
    pub accent_positions: HashMap<String, i32>,
    /// Increasingly tall alternates keyed by glyph name
    #[serde(default)]
    pub vertical_variants: HashMap<String, Vec<String>>,
    /// Increasingly wide alternates keyed by glyph name
    #[serde(default)]
    pub horizontal_variants: HashMap<String, Vec<String>>,
    /// Vertical assemblies keyed by glyph name, parts ordered bottom to top
    #[serde(default)]
    pub vertical_assemblies: HashMap<String, Vec<GlyphPart>>,
}

impl Default for FontMetricsTable {
    fn default() -> Self {
        Self {
            units_per_em: 1000,
            ascender: 800,
            descender: -200,
            default_advance: 500,
            constants: HashMap::new(),
            glyphs: HashMap::new(),
            italic_corrections: HashMap::new(),
            accent_positions: HashMap::new(),
            vertical_variants: HashMap::new(),
            horizontal_variants: HashMap::new(),
            vertical_assemblies: HashMap::new(),
        }
    }
}

impl FontMetricsTable {
    /// Parse and validate a table from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        let table: FontMetricsTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Serialize the table to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check the structural requirements a table must meet before use
    pub fn validate(&self) -> Result<()> {
        if self.units_per_em == 0 {
            return Err(FontError::InvalidTable("units_per_em is zero".into()));
        }
        if let Some(leading) = self.constant(MathConstant::MathLeading.name()) {
            if leading < 0 {
                return Err(FontError::InvalidTable(format!("MathLeading is negative ({leading})")));
            }
        }
        for (glyph, parts) in &self.vertical_assemblies {
            if parts.iter().any(|p| p.full_advance <= 0) {
                return Err(FontError::InvalidTable(format!(
                    "assembly for {glyph} has a part with non-positive advance"
                )));
            }
        }
        Ok(())
    }

    /// Set a constant (builder style)
    pub fn with_constant(mut self, constant: MathConstant, value: i32) -> Self {
        self.constants.insert(constant.name().to_string(), value);
        self
    }

    /// Set a glyph's metrics (builder style)
    pub fn with_glyph(mut self, glyph: impl Into<String>, metrics: GlyphMetrics) -> Self {
        self.glyphs.insert(glyph.into(), metrics);
        self
    }

    /// Raw constant value in design units
    pub fn constant(&self, name: &str) -> Option<i32> {
        self.constants.get(name).copied()
    }

    /// Metrics of a glyph, falling back to the table defaults
    ///
    /// Wide East Asian characters fall back to a full em advance.
    pub fn glyph_metrics(&self, glyph: &str) -> GlyphMetrics {
        if let Some(metrics) = self.glyphs.get(glyph) {
            return *metrics;
        }
        let advance = match glyph.chars().next() {
            Some(ch) if is_wide(ch) => i32::from(self.units_per_em),
            _ => self.default_advance,
        };
        GlyphMetrics::new(advance, self.ascender, -self.descender)
    }

    /// The built-in Latin-Modern-like table
    ///
    /// Constants are the Latin Modern Math values; glyph metrics cover ASCII,
    /// the usual operators, and the stretchy glyphs the typesetter needs.
    pub fn builtin() -> Self {
        let mut table = FontMetricsTable {
            units_per_em: 1000,
            ascender: 750,
            descender: -250,
            default_advance: 500,
            ..Default::default()
        };

        for (constant, value) in LATIN_MODERN_CONSTANTS {
            table.constants.insert(constant.name().to_string(), *value);
        }

        for ch in 'a'..='z' {
            let ascent = if "bdfhklt".contains(ch) { 694 } else { 431 };
            let descent = if "gjpqy".contains(ch) { 194 } else { 0 };
            let advance = match ch {
                'i' | 'j' | 'l' => 278,
                'm' | 'w' => 833,
                _ => 500,
            };
            table.glyphs.insert(ch.to_string(), GlyphMetrics::new(advance, ascent, descent));
        }
        for ch in 'A'..='Z' {
            table.glyphs.insert(ch.to_string(), GlyphMetrics::new(722, 683, 0));
        }
        for ch in '0'..='9' {
            table.glyphs.insert(ch.to_string(), GlyphMetrics::new(500, 666, 22));
        }

        let symbols: &[(&str, GlyphMetrics)] = &[
            (" ", GlyphMetrics::new(333, 0, 0)),
            (".", GlyphMetrics::new(278, 106, 0)),
            (",", GlyphMetrics::new(278, 106, 194)),
            (";", GlyphMetrics::new(278, 431, 194)),
            (":", GlyphMetrics::new(278, 431, 0)),
            ("!", GlyphMetrics::new(278, 716, 0)),
            ("?", GlyphMetrics::new(472, 705, 0)),
            ("'", GlyphMetrics::new(278, 694, 0)),
            ("+", GlyphMetrics::new(778, 583, 83)),
            ("-", GlyphMetrics::new(778, 583, 83)),
            ("\u{2212}", GlyphMetrics::new(778, 583, 83)),
            ("=", GlyphMetrics::new(778, 367, 0)),
            ("<", GlyphMetrics::new(778, 540, 40)),
            (">", GlyphMetrics::new(778, 540, 40)),
            ("\u{00D7}", GlyphMetrics::new(778, 491, 0)),
            ("\u{00B1}", GlyphMetrics::new(778, 666, 0)),
            ("\u{2264}", GlyphMetrics::new(778, 636, 136)),
            ("\u{2265}", GlyphMetrics::new(778, 636, 136)),
            ("\u{221E}", GlyphMetrics::new(1000, 442, 11)),
            ("\u{25A1}", GlyphMetrics::new(667, 600, 0)),
        ];
        for (glyph, metrics) in symbols {
            table.glyphs.insert((*glyph).to_string(), *metrics);
        }

        for greek in '\u{03B1}'..='\u{03C9}' {
            table.glyphs.insert(greek.to_string(), GlyphMetrics::new(550, 442, 11));
        }

        table.italic_corrections.insert("f".into(), 108);
        table.italic_corrections.insert("j".into(), 57);
        table.italic_corrections.insert("V".into(), 222);
        table.italic_corrections.insert("\u{222B}".into(), 200);
        table.accent_positions.insert("A".into(), 389);

        add_stretchy(&mut table, "\u{221A}", 833, 1056, &[1200, 1400, 1800, 2400]);
        add_stretchy(&mut table, "(", 389, 458, &[1200, 1800, 2400, 3000]);
        add_stretchy(&mut table, ")", 389, 458, &[1200, 1800, 2400, 3000]);
        add_stretchy(&mut table, "[", 278, 472, &[1200, 1800, 2400, 3000]);
        add_stretchy(&mut table, "]", 278, 472, &[1200, 1800, 2400, 3000]);
        add_stretchy(&mut table, "|", 278, 278, &[1200, 1800, 2400, 3000]);
        add_stretchy(&mut table, "{", 500, 667, &[1200, 1800, 2400, 3000]);
        add_stretchy(&mut table, "}", 500, 667, &[1200, 1800, 2400, 3000]);

        for (op, text, display) in [
            ("\u{2211}", GlyphMetrics::new(1056, 750, 250), GlyphMetrics::new(1444, 1000, 400)),
            ("\u{220F}", GlyphMetrics::new(944, 750, 250), GlyphMetrics::new(1278, 1000, 400)),
            ("\u{222B}", GlyphMetrics::new(556, 805, 306), GlyphMetrics::new(944, 1360, 862)),
        ] {
            let display_name = format!("{op}.display");
            table.glyphs.insert(op.to_string(), text);
            table.glyphs.insert(display_name.clone(), display);
            table
                .vertical_variants
                .insert(op.to_string(), vec![op.to_string(), display_name]);
        }
        table.italic_corrections.insert("\u{222B}.display".into(), 444);

        for (accent, base_advance) in [("\u{0302}", 300), ("\u{0303}", 300), ("\u{20D7}", 400), ("\u{0304}", 300)] {
            let mut variants = vec![accent.to_string()];
            table
                .glyphs
                .insert(accent.to_string(), GlyphMetrics::new(base_advance, 700, 0));
            for (i, advance) in [560, 1000, 1500].into_iter().enumerate() {
                let name = format!("{accent}.h{}", i + 1);
                table.glyphs.insert(name.clone(), GlyphMetrics::new(advance, 720, 0));
                variants.push(name);
            }
            table.horizontal_variants.insert(accent.to_string(), variants);
        }

        table
    }
}

/// Register a delimiter-like glyph with size variants and an assembly
fn add_stretchy(table: &mut FontMetricsTable, glyph: &str, advance: i32, assembly_advance: i32, sizes: &[i32]) {
    // The base glyph is one em tall, split the way a parenthesis is.
    table
        .glyphs
        .insert(glyph.to_string(), GlyphMetrics::new(advance, 750, 250));

    let mut variants = vec![glyph.to_string()];
    for (i, size) in sizes.iter().enumerate() {
        let name = format!("{glyph}.v{}", i + 1);
        let descent = size / 2 - 250;
        table
            .glyphs
            .insert(name.clone(), GlyphMetrics::new(advance + 60 * (i as i32 + 1), size - descent, descent));
        variants.push(name);
    }
    table.vertical_variants.insert(glyph.to_string(), variants);

    let bottom = format!("{glyph}.bt");
    let extender = format!("{glyph}.ex");
    let top = format!("{glyph}.tp");
    table.glyphs.insert(bottom.clone(), GlyphMetrics::new(assembly_advance, 1010, 0));
    table.glyphs.insert(extender.clone(), GlyphMetrics::new(assembly_advance, 606, 0));
    table.glyphs.insert(top.clone(), GlyphMetrics::new(assembly_advance, 1010, 0));
    table.vertical_assemblies.insert(
        glyph.to_string(),
        vec![
            GlyphPart::new(bottom, 1010, 0, 200, false),
            GlyphPart::new(extender, 606, 200, 200, true),
            GlyphPart::new(top, 1010, 200, 0, false),
        ],
    );
}

/// Whether a character occupies a full em (CJK ideographs, kana, hangul, fullwidth forms)
pub fn is_wide(ch: char) -> bool {
    matches!(ch,
        '\u{1100}'..='\u{115F}'
        | '\u{2E80}'..='\u{303E}'
        | '\u{3041}'..='\u{33FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{A960}'..='\u{A97F}'
        | '\u{AC00}'..='\u{D7A3}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FE30}'..='\u{FE4F}'
        | '\u{FF00}'..='\u{FF60}'
        | '\u{FFE0}'..='\u{FFE6}'
        | '\u{1F300}'..='\u{1F64F}'
        | '\u{1F900}'..='\u{1F9FF}'
        | '\u{20000}'..='\u{2FFFD}'
    )
}

const LATIN_MODERN_CONSTANTS: &[(MathConstant, i32)] = &[
    (MathConstant::ScriptPercentScaleDown, 70),
    (MathConstant::ScriptScriptPercentScaleDown, 50),
    (MathConstant::DelimitedSubFormulaMinHeight, 1300),
    (MathConstant::DisplayOperatorMinHeight, 1300),
    (MathConstant::MathLeading, 154),
    (MathConstant::AxisHeight, 250),
    (MathConstant::AccentBaseHeight, 450),
    (MathConstant::FlattenedAccentBaseHeight, 664),
    (MathConstant::SubscriptShiftDown, 247),
    (MathConstant::SubscriptTopMax, 344),
    (MathConstant::SubscriptBaselineDropMin, 200),
    (MathConstant::SuperscriptShiftUp, 363),
    (MathConstant::SuperscriptShiftUpCramped, 289),
    (MathConstant::SuperscriptBottomMin, 108),
    (MathConstant::SuperscriptBaselineDropMax, 250),
    (MathConstant::SubSuperscriptGapMin, 160),
    (MathConstant::SuperscriptBottomMaxWithSubscript, 344),
    (MathConstant::SpaceAfterScript, 56),
    (MathConstant::UpperLimitGapMin, 200),
    (MathConstant::UpperLimitBaselineRiseMin, 111),
    (MathConstant::LowerLimitGapMin, 167),
    (MathConstant::LowerLimitBaselineDropMin, 600),
    (MathConstant::StackTopShiftUp, 444),
    (MathConstant::StackTopDisplayStyleShiftUp, 677),
    (MathConstant::StackBottomShiftDown, 345),
    (MathConstant::StackBottomDisplayStyleShiftDown, 686),
    (MathConstant::StackGapMin, 120),
    (MathConstant::StackDisplayStyleGapMin, 280),
    (MathConstant::FractionNumeratorShiftUp, 394),
    (MathConstant::FractionNumeratorDisplayStyleShiftUp, 677),
    (MathConstant::FractionDenominatorShiftDown, 345),
    (MathConstant::FractionDenominatorDisplayStyleShiftDown, 686),
    (MathConstant::FractionNumeratorGapMin, 40),
    (MathConstant::FractionNumDisplayStyleGapMin, 120),
    (MathConstant::FractionRuleThickness, 40),
    (MathConstant::FractionDenominatorGapMin, 40),
    (MathConstant::FractionDenomDisplayStyleGapMin, 120),
    (MathConstant::OverbarVerticalGap, 120),
    (MathConstant::OverbarRuleThickness, 40),
    (MathConstant::OverbarExtraAscender, 40),
    (MathConstant::UnderbarVerticalGap, 120),
    (MathConstant::UnderbarRuleThickness, 40),
    (MathConstant::UnderbarExtraDescender, 40),
    (MathConstant::RadicalVerticalGap, 50),
    (MathConstant::RadicalDisplayStyleVerticalGap, 148),
    (MathConstant::RadicalRuleThickness, 40),
    (MathConstant::RadicalExtraAscender, 40),
    (MathConstant::RadicalKernBeforeDegree, 278),
    (MathConstant::RadicalKernAfterDegree, -556),
    (MathConstant::RadicalDegreeBottomRaisePercent, 60),
    (MathConstant::MinConnectorOverlap, 20),
];
