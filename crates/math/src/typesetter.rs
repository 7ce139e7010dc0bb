//! Typesetter - lays a finalized atom list out into a display tree
//!
//! Layout follows the TeX rules as parameterized by the OpenType MATH
//! constants: every nested list is laid out first, then positioned relative
//! to its parent's baseline. Nothing here fails; atoms that cannot be laid
//! out become empty boxes and are reported in [`Typeset::issues`].

use crate::display::DisplayBox;
use crate::error::MathError;
use crate::model::{Atom, AtomKind, AtomList, FinalizedList, LineStyle, PLACEHOLDER_GLYPH};
use crate::spacing::{space_between, AtomClass};
use math_font::{MathConstant, MathFontMetrics};
use unicode_segmentation::UnicodeSegmentation;

/// Script scale-downs used when the font does not define them
const DEFAULT_SCRIPT_SCALE: f32 = 0.7;
const DEFAULT_SCRIPT_SCRIPT_SCALE: f32 = 0.5;
/// Minimum fraction of the content a delimiter must cover
const DELIMITER_FACTOR: f32 = 0.901;
/// Maximum amount a delimiter may fall short of the content, in em
const DELIMITER_SHORTFALL: f32 = 0.5;
/// Width of an invisible delimiter, in em
const NULL_DELIMITER_SPACE: f32 = 0.12;

/// Result of typesetting a list
#[derive(Debug)]
pub struct Typeset {
    /// Root box; its width, ascent and descent summarize the whole list
    pub root: DisplayBox,
    /// Atoms that could not be laid out
    pub issues: Vec<MathError>,
}

/// Typeset `list` in `style` with `font`
pub fn typeset(list: &FinalizedList, font: &MathFontMetrics, style: LineStyle) -> Typeset {
    Typesetter::new(font, style).typeset(list)
}

/// Lays out atom lists with one font
#[derive(Debug)]
pub struct Typesetter<'a> {
    font: &'a MathFontMetrics,
    style: LineStyle,
    issues: Vec<MathError>,
}

impl<'a> Typesetter<'a> {
    pub fn new(font: &'a MathFontMetrics, style: LineStyle) -> Self {
        Self {
            font,
            style,
            issues: Vec::new(),
        }
    }

    /// Lay out a finalized list
    pub fn typeset(mut self, list: &FinalizedList) -> Typeset {
        tracing::trace!(
            target: "math::typesetter",
            atoms = list.len(),
            style = ?self.style,
            font_size = self.font.font_size(),
            "typesetting list"
        );
        let root = self.layout_list(list.atoms(), self.style, false);
        Typeset {
            root,
            issues: self.issues,
        }
    }

    /// The base font scaled for `style`
    fn font_for(&self, style: LineStyle) -> MathFontMetrics {
        let scale = match style {
            LineStyle::Display | LineStyle::Text => 1.0,
            LineStyle::Script => {
                scale_or(self.font.percent_constant(MathConstant::ScriptPercentScaleDown), DEFAULT_SCRIPT_SCALE)
            }
            LineStyle::ScriptScript => scale_or(
                self.font.percent_constant(MathConstant::ScriptScriptPercentScaleDown),
                DEFAULT_SCRIPT_SCRIPT_SCALE,
            ),
        };
        self.font.with_size(self.font.font_size() * scale)
    }

    fn malformed(&mut self, atom: &Atom, reason: &str) -> DisplayBox {
        tracing::warn!(
            target: "math::typesetter",
            kind = atom.kind_name(),
            reason,
            "malformed atom replaced by an empty box"
        );
        self.issues.push(MathError::malformed(atom.kind_name(), reason));
        DisplayBox::empty()
    }

    // =========================================================================
    // Lists
    // =========================================================================

    fn layout_list(&mut self, atoms: &[Atom], style: LineStyle, cramped: bool) -> DisplayBox {
        let mut style = style;
        let mut children = Vec::with_capacity(atoms.len());
        let mut x = 0.0;
        let mut prev_class: Option<AtomClass> = None;
        let mut pending_italic = 0.0;

        for (idx, atom) in atoms.iter().enumerate() {
            if let AtomKind::Style { style: next } = atom.kind {
                style = next;
                continue;
            }
            let font = self.font_for(style);

            if let Some(class) = effective_class(atoms, idx, prev_class) {
                if let Some(prev) = prev_class {
                    x += space_between(prev, class, style) * mu(&font);
                }
                prev_class = Some(class);
            }
            // Italic correction only kerns before upright material.
            if atom.kind != AtomKind::Variable {
                x += pending_italic;
            }

            let (mut bx, italic) = self.layout_atom(atom, style, cramped, &font);
            pending_italic = italic;
            bx.offset.x += x;
            x += bx.width;
            children.push(bx);
        }

        // A trailing negative kern moves the pen back but not the ink.
        let mut list = DisplayBox::group(children);
        list.width = list.width.max(x);
        list
    }

    /// Lay out one atom with its scripts; returns the box and the italic
    /// correction still owed to whatever follows
    fn layout_atom(
        &mut self,
        atom: &Atom,
        style: LineStyle,
        cramped: bool,
        font: &MathFontMetrics,
    ) -> (DisplayBox, f32) {
        let (nucleus, italic, is_glyph) = match &atom.kind {
            AtomKind::LargeOperator { limits } => {
                return self.layout_large_operator(atom, *limits, style, cramped, font);
            }
            AtomKind::Ordinary | AtomKind::Text => (self.glyph_run(&atom.nucleus, font), 0.0, true),
            AtomKind::Placeholder => {
                let glyph = if atom.nucleus.is_empty() {
                    PLACEHOLDER_GLYPH
                } else {
                    atom.nucleus.as_str()
                };
                (self.glyph_run(glyph, font), 0.0, true)
            }
            AtomKind::Variable
            | AtomKind::Number
            | AtomKind::BinaryOperator
            | AtomKind::UnaryOperator
            | AtomKind::Relation
            | AtomKind::Open
            | AtomKind::Close
            | AtomKind::Punctuation => {
                if atom.nucleus.is_empty() {
                    (self.malformed(atom, "empty nucleus"), 0.0, true)
                } else {
                    let italic = if atom.kind == AtomKind::Variable {
                        atom.nucleus
                            .graphemes(true)
                            .last()
                            .map(|g| font.italic_correction(g))
                            .unwrap_or(0.0)
                    } else {
                        0.0
                    };
                    (self.glyph_run(&atom.nucleus, font), italic, true)
                }
            }
            AtomKind::Fraction {
                numerator,
                denominator,
                has_rule,
                left_delimiter,
                right_delimiter,
            } => {
                let fraction = self.layout_fraction(numerator, denominator, *has_rule, style, cramped, font);
                let bx = if left_delimiter.is_some() || right_delimiter.is_some() {
                    self.delimited(fraction, left_delimiter.as_deref(), right_delimiter.as_deref(), font)
                } else {
                    fraction
                };
                (bx, 0.0, false)
            }
            AtomKind::Radical { radicand, degree } => {
                let glyph = if atom.nucleus.is_empty() {
                    "\u{221A}"
                } else {
                    atom.nucleus.as_str()
                };
                (self.layout_radical(glyph, radicand, degree.as_ref(), style, font), 0.0, false)
            }
            AtomKind::Inner { left, right, inner } => {
                let body = self.layout_list(&inner.atoms, style, cramped);
                (self.delimited(body, left.as_deref(), right.as_deref(), font), 0.0, false)
            }
            AtomKind::Overline { inner } => (self.layout_overline(inner, style, font), 0.0, false),
            AtomKind::Underline { inner } => (self.layout_underline(inner, style, cramped, font), 0.0, false),
            AtomKind::Accent { inner } => {
                if atom.nucleus.is_empty() {
                    (self.malformed(atom, "accent without a glyph"), 0.0, false)
                } else {
                    (self.layout_accent(&atom.nucleus, inner, style, font), 0.0, false)
                }
            }
            AtomKind::Color { color, inner } | AtomKind::TextColor { color, inner } => {
                let body = self.layout_list(&inner.atoms, style, cramped).with_color(*color);
                (body, 0.0, false)
            }
            AtomKind::Space { width } => (DisplayBox::space(*width), 0.0, true),
            AtomKind::Style { .. } => (DisplayBox::empty(), 0.0, true),
            AtomKind::Unknown { tag } => {
                let reason = format!("unrecognized node '{tag}'");
                (self.malformed(atom, &reason), 0.0, true)
            }
        };

        if atom.has_scripts() {
            let scripted = self.attach_scripts(nucleus, atom, italic, is_glyph, style, cramped, font);
            (scripted, 0.0)
        } else {
            (nucleus, italic)
        }
    }

    /// Run of glyphs, one per grapheme cluster
    fn glyph_run(&self, text: &str, font: &MathFontMetrics) -> DisplayBox {
        let mut glyphs = Vec::new();
        let (mut width, mut ascent, mut descent) = (0.0f32, 0.0f32, 0.0f32);
        for grapheme in text.graphemes(true) {
            let metrics = font.glyph_metrics(grapheme);
            width += metrics.advance;
            ascent = ascent.max(metrics.ascent);
            descent = descent.max(metrics.descent);
            glyphs.push(grapheme.to_string());
        }
        DisplayBox::glyph_run(glyphs, font.font_size(), width, ascent, descent)
    }

    fn single_glyph(&self, glyph: &str, font: &MathFontMetrics) -> DisplayBox {
        let metrics = font.glyph_metrics(glyph);
        DisplayBox::glyph_run(
            vec![glyph.to_string()],
            font.font_size(),
            metrics.advance,
            metrics.ascent,
            metrics.descent,
        )
    }

    // =========================================================================
    // Scripts and limits
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    fn attach_scripts(
        &mut self,
        nucleus: DisplayBox,
        atom: &Atom,
        italic: f32,
        is_glyph: bool,
        style: LineStyle,
        cramped: bool,
        font: &MathFontMetrics,
    ) -> DisplayBox {
        let script_style = style.script();
        let script_font = self.font_for(script_style);
        let sup = atom
            .superscript
            .as_ref()
            .map(|list| self.layout_list(&list.atoms, script_style, cramped));
        let sub = atom
            .subscript
            .as_ref()
            .map(|list| self.layout_list(&list.atoms, script_style, true));

        // Glyph nuclei start from the baseline; boxes hang scripts off their edges.
        let (mut sup_shift, mut sub_shift) = if is_glyph {
            (0.0, 0.0)
        } else {
            (
                nucleus.ascent - script_font.constant(MathConstant::SuperscriptBaselineDropMax),
                nucleus.descent + script_font.constant(MathConstant::SubscriptBaselineDropMin),
            )
        };
        let sup_shift_up = if cramped {
            font.constant(MathConstant::SuperscriptShiftUpCramped)
        } else {
            font.constant(MathConstant::SuperscriptShiftUp)
        };

        match (&sup, &sub) {
            (None, Some(sub)) => {
                sub_shift = sub_shift
                    .max(font.constant(MathConstant::SubscriptShiftDown))
                    .max(sub.ascent - font.constant(MathConstant::SubscriptTopMax));
            }
            (Some(sup), None) => {
                sup_shift = sup_shift
                    .max(sup_shift_up)
                    .max(sup.descent + font.constant(MathConstant::SuperscriptBottomMin));
            }
            (Some(sup), Some(sub)) => {
                sup_shift = sup_shift
                    .max(sup_shift_up)
                    .max(sup.descent + font.constant(MathConstant::SuperscriptBottomMin));
                sub_shift = sub_shift.max(font.constant(MathConstant::SubscriptShiftDown));

                let gap = (sup_shift - sup.descent) - (sub.ascent - sub_shift);
                let gap_min = font.constant(MathConstant::SubSuperscriptGapMin);
                if gap < gap_min {
                    sub_shift += gap_min - gap;
                    let bottom_delta = font.constant(MathConstant::SuperscriptBottomMaxWithSubscript)
                        - (sup_shift - sup.descent);
                    if bottom_delta > 0.0 {
                        sup_shift += bottom_delta;
                        sub_shift -= bottom_delta;
                    }
                }
            }
            (None, None) => {}
        }

        let base_width = nucleus.width;
        let mut end = base_width;
        let mut children = vec![nucleus];
        if let Some(sup) = sup {
            let x = base_width + italic;
            end = end.max(x + sup.width);
            children.push(sup.with_offset(x, sup_shift));
        }
        if let Some(sub) = sub {
            end = end.max(base_width + sub.width);
            children.push(sub.with_offset(base_width, -sub_shift));
        }

        let mut scripted = DisplayBox::group(children);
        scripted.width = end + font.constant(MathConstant::SpaceAfterScript);
        scripted
    }

    fn layout_large_operator(
        &mut self,
        atom: &Atom,
        limits: bool,
        style: LineStyle,
        cramped: bool,
        font: &MathFontMetrics,
    ) -> (DisplayBox, f32) {
        if atom.nucleus.is_empty() {
            return (self.malformed(atom, "empty nucleus"), 0.0);
        }

        let (mut op, italic, is_glyph) = if atom.nucleus.graphemes(true).count() == 1 {
            let glyph = if style.is_display() {
                display_operator_glyph(&atom.nucleus, font)
            } else {
                atom.nucleus.clone()
            };
            let italic = font.italic_correction(&glyph);
            let run = self.single_glyph(&glyph, font);
            let shift = (run.ascent - run.descent) / 2.0 - font.constant(MathConstant::AxisHeight);
            (DisplayBox::group(vec![run.with_offset(0.0, -shift)]), italic, false)
        } else {
            // Named operators such as "lim" sit on the baseline like text.
            (self.glyph_run(&atom.nucleus, font), 0.0, true)
        };

        if !atom.has_scripts() {
            op.width += italic;
            return (op, 0.0);
        }
        if limits && style.is_display() {
            (self.attach_limits(op, atom, italic, style, cramped), 0.0)
        } else {
            (self.attach_scripts(op, atom, italic, is_glyph, style, cramped, font), 0.0)
        }
    }

    fn attach_limits(
        &mut self,
        op: DisplayBox,
        atom: &Atom,
        italic: f32,
        style: LineStyle,
        cramped: bool,
    ) -> DisplayBox {
        let font = self.font_for(style);
        let script_style = style.script();
        let sup = atom
            .superscript
            .as_ref()
            .map(|list| self.layout_list(&list.atoms, script_style, cramped));
        let sub = atom
            .subscript
            .as_ref()
            .map(|list| self.layout_list(&list.atoms, script_style, true));

        let width = [Some(&op), sup.as_ref(), sub.as_ref()]
            .into_iter()
            .flatten()
            .map(|b| b.width)
            .fold(0.0f32, f32::max);

        let (op_ascent, op_descent, op_width) = (op.ascent, op.descent, op.width);
        let mut children = vec![op.with_offset((width - op_width) / 2.0, 0.0)];
        if let Some(sup) = sup {
            let gap = (font.constant(MathConstant::UpperLimitBaselineRiseMin) - sup.descent)
                .max(font.constant(MathConstant::UpperLimitGapMin));
            let x = ((width - sup.width) / 2.0 + italic / 2.0).max(0.0);
            let y = op_ascent + gap + sup.descent;
            children.push(sup.with_offset(x, y));
        }
        if let Some(sub) = sub {
            let gap = (font.constant(MathConstant::LowerLimitBaselineDropMin) - sub.ascent)
                .max(font.constant(MathConstant::LowerLimitGapMin));
            let x = ((width - sub.width) / 2.0 - italic / 2.0).max(0.0);
            let y = -(op_descent + gap + sub.ascent);
            children.push(sub.with_offset(x, y));
        }

        let mut limited = DisplayBox::group(children);
        limited.width = limited.width.max(width);
        limited
    }

    // =========================================================================
    // Fractions, radicals, lines, accents
    // =========================================================================

    fn layout_fraction(
        &mut self,
        numerator: &AtomList,
        denominator: &AtomList,
        has_rule: bool,
        style: LineStyle,
        cramped: bool,
        font: &MathFontMetrics,
    ) -> DisplayBox {
        let inner_style = style.fraction();
        let num = self.layout_list(&numerator.atoms, inner_style, cramped);
        let den = self.layout_list(&denominator.atoms, inner_style, true);
        let display = style.is_display();
        let c = |constant| font.constant(constant);

        let (mut shift_up, mut shift_down) = match (has_rule, display) {
            (true, true) => (
                c(MathConstant::FractionNumeratorDisplayStyleShiftUp),
                c(MathConstant::FractionDenominatorDisplayStyleShiftDown),
            ),
            (true, false) => (
                c(MathConstant::FractionNumeratorShiftUp),
                c(MathConstant::FractionDenominatorShiftDown),
            ),
            (false, true) => (
                c(MathConstant::StackTopDisplayStyleShiftUp),
                c(MathConstant::StackBottomDisplayStyleShiftDown),
            ),
            (false, false) => (c(MathConstant::StackTopShiftUp), c(MathConstant::StackBottomShiftDown)),
        };

        let axis = c(MathConstant::AxisHeight);
        let thickness = c(MathConstant::FractionRuleThickness);
        if has_rule {
            let (num_gap, den_gap) = if display {
                (
                    c(MathConstant::FractionNumDisplayStyleGapMin),
                    c(MathConstant::FractionDenomDisplayStyleGapMin),
                )
            } else {
                (
                    c(MathConstant::FractionNumeratorGapMin),
                    c(MathConstant::FractionDenominatorGapMin),
                )
            };
            let above = (shift_up - num.descent) - (axis + thickness / 2.0);
            if above < num_gap {
                shift_up += num_gap - above;
            }
            let below = (axis - thickness / 2.0) - (den.ascent - shift_down);
            if below < den_gap {
                shift_down += den_gap - below;
            }
        } else {
            let gap_min = if display {
                c(MathConstant::StackDisplayStyleGapMin)
            } else {
                c(MathConstant::StackGapMin)
            };
            let gap = (shift_up - num.descent) - (den.ascent - shift_down);
            if gap < gap_min {
                let half = (gap_min - gap) / 2.0;
                shift_up += half;
                shift_down += half;
            }
        }

        let width = num.width.max(den.width);
        let num_x = (width - num.width) / 2.0;
        let den_x = (width - den.width) / 2.0;
        let mut children = vec![num.with_offset(num_x, shift_up), den.with_offset(den_x, -shift_down)];
        if has_rule {
            children.push(DisplayBox::rule(width, thickness).with_offset(0.0, axis - thickness / 2.0));
        }

        let mut fraction = DisplayBox::group(children);
        fraction.width = width;
        fraction
    }

    fn layout_radical(
        &mut self,
        glyph: &str,
        radicand: &AtomList,
        degree: Option<&AtomList>,
        style: LineStyle,
        font: &MathFontMetrics,
    ) -> DisplayBox {
        let radicand = self.layout_list(&radicand.atoms, style, true);
        let thickness = font.constant(MathConstant::RadicalRuleThickness);
        let mut clearance = if style.is_display() {
            font.constant(MathConstant::RadicalDisplayStyleVerticalGap)
        } else {
            font.constant(MathConstant::RadicalVerticalGap)
        };

        let target = radicand.height() + clearance + thickness;
        let sign = self.stretched_glyph(glyph, target, font);
        if sign.height() > target {
            clearance += (sign.height() - target) / 2.0;
        }

        let rule_top = radicand.ascent + clearance + thickness;
        let sign_width = sign.width;
        let sign_y = rule_top - sign.ascent;
        let rule = DisplayBox::rule(radicand.width, thickness).with_offset(sign_width, rule_top - thickness);
        let body_width = sign_width + radicand.width;
        let mut body = DisplayBox::group(vec![
            sign.with_offset(0.0, sign_y),
            rule,
            radicand.with_offset(sign_width, 0.0),
        ]);
        body.width = body_width;
        body.ascent = body
            .ascent
            .max(rule_top + font.constant(MathConstant::RadicalExtraAscender));

        let Some(degree) = degree else {
            return body;
        };

        let degree = self.layout_list(&degree.atoms, LineStyle::ScriptScript, false);
        let raise = font.percent_constant(MathConstant::RadicalDegreeBottomRaisePercent)
            * (body.ascent - body.descent);
        let mut kern_before = font.constant(MathConstant::RadicalKernBeforeDegree);
        let mut shift = kern_before + degree.width + font.constant(MathConstant::RadicalKernAfterDegree);
        if shift < 0.0 {
            kern_before -= shift;
            shift = 0.0;
        }

        let mut radical = DisplayBox::group(vec![
            degree.with_offset(kern_before, raise),
            body.with_offset(shift, 0.0),
        ]);
        radical.width = radical.width.max(shift + body_width);
        radical
    }

    fn layout_overline(&mut self, inner: &AtomList, style: LineStyle, font: &MathFontMetrics) -> DisplayBox {
        let inner = self.layout_list(&inner.atoms, style, true);
        let gap = font.constant(MathConstant::OverbarVerticalGap);
        let thickness = font.constant(MathConstant::OverbarRuleThickness);
        let (width, top) = (inner.width, inner.ascent + gap);

        let mut over = DisplayBox::group(vec![inner, DisplayBox::rule(width, thickness).with_offset(0.0, top)]);
        over.ascent = over
            .ascent
            .max(top + thickness + font.constant(MathConstant::OverbarExtraAscender));
        over.width = width;
        over
    }

    fn layout_underline(
        &mut self,
        inner: &AtomList,
        style: LineStyle,
        cramped: bool,
        font: &MathFontMetrics,
    ) -> DisplayBox {
        let inner = self.layout_list(&inner.atoms, style, cramped);
        let gap = font.constant(MathConstant::UnderbarVerticalGap);
        let thickness = font.constant(MathConstant::UnderbarRuleThickness);
        let (width, bottom) = (inner.width, inner.descent + gap + thickness);

        let mut under = DisplayBox::group(vec![inner, DisplayBox::rule(width, thickness).with_offset(0.0, -bottom)]);
        under.descent = under
            .descent
            .max(bottom + font.constant(MathConstant::UnderbarExtraDescender));
        under.width = width;
        under
    }

    fn layout_accent(
        &mut self,
        accent: &str,
        inner: &AtomList,
        style: LineStyle,
        font: &MathFontMetrics,
    ) -> DisplayBox {
        let base = self.layout_list(&inner.atoms, style, true);

        // Widest variant that still fits over the base.
        let variants = font.horizontal_variants(accent);
        let mut glyph = variants.first().copied().unwrap_or(accent);
        for variant in &variants {
            if font.glyph_metrics(variant).advance <= base.width {
                glyph = *variant;
            } else {
                break;
            }
        }

        let skew = match single_base_glyph(inner) {
            Some(base_glyph) => font.accent_position(base_glyph),
            None => base.width / 2.0,
        };
        let x = skew - font.accent_position(glyph);
        let lowered = base.ascent.min(font.constant(MathConstant::AccentBaseHeight));
        let y = base.ascent - lowered;

        let width = base.width;
        let accent_box = self.single_glyph(glyph, font).with_offset(x, y);
        let mut accented = DisplayBox::group(vec![base, accent_box]);
        accented.width = width;
        accented
    }

    // =========================================================================
    // Delimiters
    // =========================================================================

    /// Surround `body` with delimiters covering it symmetrically about the axis
    fn delimited(
        &mut self,
        body: DisplayBox,
        left: Option<&str>,
        right: Option<&str>,
        font: &MathFontMetrics,
    ) -> DisplayBox {
        let axis = font.constant(MathConstant::AxisHeight);
        let target = if body.height() < font.constant(MathConstant::DelimitedSubFormulaMinHeight) {
            0.0
        } else {
            let delta = (body.ascent - axis).max(body.descent + axis);
            (2.0 * delta * DELIMITER_FACTOR).max(2.0 * delta - DELIMITER_SHORTFALL * font.font_size())
        };

        let mut x = 0.0;
        let mut children = Vec::with_capacity(3);
        let left = self.delimiter(left, target, font);
        let left_width = left.width;
        children.push(left);
        x += left_width;

        let body_width = body.width;
        children.push(body.with_offset(x, 0.0));
        x += body_width;

        let right = self.delimiter(right, target, font);
        let right_width = right.width;
        children.push(right.with_offset(x, 0.0));
        x += right_width;

        let mut delimited = DisplayBox::group(children);
        delimited.width = x;
        delimited
    }

    fn delimiter(&mut self, glyph: Option<&str>, target: f32, font: &MathFontMetrics) -> DisplayBox {
        let Some(glyph) = glyph.filter(|g| !g.is_empty() && *g != ".") else {
            return DisplayBox::space(NULL_DELIMITER_SPACE * font.font_size());
        };
        let axis = font.constant(MathConstant::AxisHeight);
        let glyph_box = self.stretched_glyph(glyph, target, font);
        let shift = (glyph_box.ascent - glyph_box.descent) / 2.0 - axis;
        DisplayBox::group(vec![glyph_box.with_offset(0.0, -shift)])
    }

    /// Smallest variant at least `target` tall, else an assembly, else the largest variant
    fn stretched_glyph(&self, glyph: &str, target: f32, font: &MathFontMetrics) -> DisplayBox {
        let variants = font.vertical_variants(glyph);
        for variant in &variants {
            if font.glyph_metrics(variant).height() >= target {
                return self.single_glyph(variant, font);
            }
        }
        if let Some(assembly) = font.assemble_vertical(glyph, target) {
            return DisplayBox::assembly(&assembly.parts, font.font_size(), assembly.width, assembly.height);
        }
        let largest = variants.last().copied().unwrap_or(glyph);
        self.single_glyph(largest, font)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// One math unit (1/18 em) in points
fn mu(font: &MathFontMetrics) -> f32 {
    font.font_size() / 18.0
}

fn scale_or(scale: f32, default: f32) -> f32 {
    if scale > 0.0 {
        scale
    } else {
        default
    }
}

/// Spacing class of `atoms[idx]`, with binary operators that cannot be
/// binary here treated as ordinary
fn effective_class(atoms: &[Atom], idx: usize, prev: Option<AtomClass>) -> Option<AtomClass> {
    let class = AtomClass::of(&atoms[idx])?;
    if class != AtomClass::Binary {
        return Some(class);
    }
    let prev_blocks = matches!(
        prev,
        None | Some(
            AtomClass::Binary
                | AtomClass::Operator
                | AtomClass::Relation
                | AtomClass::Open
                | AtomClass::Punctuation
        )
    );
    let next = atoms[idx + 1..].iter().find_map(AtomClass::of);
    let next_blocks = matches!(
        next,
        None | Some(AtomClass::Relation | AtomClass::Close | AtomClass::Punctuation)
    );
    if prev_blocks || next_blocks {
        Some(AtomClass::Ordinary)
    } else {
        Some(AtomClass::Binary)
    }
}

/// Largest variant of a big operator meeting the display minimum height
fn display_operator_glyph(glyph: &str, font: &MathFontMetrics) -> String {
    let min_height = font.constant(MathConstant::DisplayOperatorMinHeight);
    let variants = font.vertical_variants(glyph);
    variants
        .iter()
        .find(|v| font.glyph_metrics(v).height() >= min_height)
        .or(variants.last())
        .map(|v| v.to_string())
        .unwrap_or_else(|| glyph.to_string())
}

/// The base glyph when an accent sits over a single plain glyph
fn single_base_glyph(inner: &AtomList) -> Option<&str> {
    let [atom] = inner.atoms.as_slice() else {
        return None;
    };
    let plain = matches!(
        atom.kind,
        AtomKind::Ordinary | AtomKind::Variable | AtomKind::Number | AtomKind::Placeholder
    );
    (plain && !atom.has_scripts() && atom.nucleus.graphemes(true).count() == 1).then_some(atom.nucleus.as_str())
}

// =============================================================================
// Tests
// =============================================================================
