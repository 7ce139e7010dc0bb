//! Display tree - positioned boxes produced by the typesetter
//!
//! Boxes are laid out relative to their parent: every [`DisplayBox`] carries
//! an `offset` from the parent's baseline origin, with y growing upward.
//! Absolute positions are only assigned by [`DisplayBox::place`] on the root.

use crate::model::Color;
use math_font::AssembledPart;
use serde::{Deserialize, Serialize};

// =============================================================================
// Geometry
// =============================================================================

/// A position in 2D space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// A size with width and height
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// A rectangle; `origin` is the bottom-left corner (y grows upward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn top(&self) -> f32 {
        self.origin.y + self.size.height
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.origin.x.min(other.origin.x);
        let y = self.bottom().min(other.bottom());
        let right = self.right().max(other.right());
        let top = self.top().max(other.top());
        Rect::new(x, y, right - x, top - y)
    }
}

// =============================================================================
// Boxes
// =============================================================================

/// What a box draws
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DisplayContent {
    /// Glyphs drawn left to right on the box baseline
    GlyphRun { glyphs: Vec<String>, font_size: f32 },
    /// Filled rule covering the box (thickness = ascent)
    Rule,
    /// Stretched glyph; one glyph-run child per part
    Assembly,
    /// Nothing of its own; only children
    Group,
}

/// A laid-out box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayBox {
    /// Offset of this box's baseline origin from the parent's
    pub offset: Point,
    /// Absolute baseline origin, assigned by [`DisplayBox::place`]
    pub position: Option<Point>,
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
    /// Color for this box and its descendants
    pub color: Option<Color>,
    pub content: DisplayContent,
    pub children: Vec<DisplayBox>,
}

impl DisplayBox {
    /// Create a box without children
    pub fn new(content: DisplayContent, width: f32, ascent: f32, descent: f32) -> Self {
        debug_assert!(ascent >= 0.0 && descent >= 0.0, "negative box extent");
        Self {
            offset: Point::origin(),
            position: None,
            width,
            ascent,
            descent,
            color: None,
            content,
            children: Vec::new(),
        }
    }

    /// Zero-size box
    pub fn empty() -> Self {
        Self::new(DisplayContent::Group, 0.0, 0.0, 0.0)
    }

    /// Zero-height box of the given width
    pub fn space(width: f32) -> Self {
        Self::new(DisplayContent::Group, width, 0.0, 0.0)
    }

    /// Horizontal rule whose bottom edge sits on the box baseline
    pub fn rule(width: f32, thickness: f32) -> Self {
        Self::new(DisplayContent::Rule, width, thickness.max(0.0), 0.0)
    }

    pub fn glyph_run(glyphs: Vec<String>, font_size: f32, width: f32, ascent: f32, descent: f32) -> Self {
        Self::new(
            DisplayContent::GlyphRun { glyphs, font_size },
            width,
            ascent.max(0.0),
            descent.max(0.0),
        )
    }

    /// Assembled glyph sitting on the baseline, parts stacked upward
    pub fn assembly(parts: &[AssembledPart], font_size: f32, width: f32, height: f32) -> Self {
        let children = parts
            .iter()
            .map(|part| {
                Self::glyph_run(vec![part.glyph.clone()], font_size, width, part.advance, 0.0)
                    .with_offset(0.0, part.offset)
            })
            .collect();
        Self {
            children,
            ..Self::new(DisplayContent::Assembly, width, height.max(0.0), 0.0)
        }
    }

    /// Group of positioned children; extent covers every child
    pub fn group(children: Vec<DisplayBox>) -> Self {
        let mut width: f32 = 0.0;
        let mut ascent: f32 = 0.0;
        let mut descent: f32 = 0.0;
        for child in &children {
            width = width.max(child.offset.x + child.width);
            ascent = ascent.max(child.offset.y + child.ascent);
            descent = descent.max(child.descent - child.offset.y);
        }
        Self {
            children,
            ..Self::new(DisplayContent::Group, width, ascent, descent)
        }
    }

    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        self.offset = Point::new(x, y);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Total height (ascent + descent)
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height())
    }

    /// Assign absolute positions to this box and every descendant
    pub fn place(&mut self, origin: Point) {
        self.position = Some(origin);
        for child in &mut self.children {
            let child_origin = origin.offset(child.offset.x, child.offset.y);
            child.place(child_origin);
        }
    }

    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }

    /// Absolute bounds, if placed
    pub fn bounds(&self) -> Option<Rect> {
        self.position
            .map(|p| Rect::new(p.x, p.y - self.descent, self.width, self.height()))
    }

    /// Absolute y of the top edge, if placed
    pub fn top(&self) -> Option<f32> {
        self.position.map(|p| p.y + self.ascent)
    }

    /// Absolute y of the bottom edge, if placed
    pub fn bottom(&self) -> Option<f32> {
        self.position.map(|p| p.y - self.descent)
    }

    /// Visit this box and its descendants depth-first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a DisplayBox)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}
