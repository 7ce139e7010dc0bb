//! Math Rendering - Flatten a placed display tree into draw commands
//!
//! Renderers consume a [`DrawList`]: glyph runs positioned at their baseline
//! origin and filled rules, all in absolute y-up coordinates with colors
//! already resolved.

use crate::display::{DisplayBox, DisplayContent, Point, Rect};
use crate::error::{MathError, MathResult};
use crate::model::Color;
use serde::{Deserialize, Serialize};

/// A single drawing operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    /// Draw glyphs left to right starting at a baseline origin
    Glyphs {
        glyphs: Vec<String>,
        origin: Point,
        font_size: f32,
        color: Color,
    },
    /// Fill a rectangle (fraction bars, radical overbars, over/underlines)
    Rule { rect: Rect, color: Color },
}

/// Draw commands for a whole display tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
    /// Bounds of the root box
    pub bounds: Rect,
}

impl DrawList {
    /// Flatten a placed tree; uncolored boxes draw in black
    pub fn from_box(root: &DisplayBox) -> MathResult<Self> {
        Self::from_box_with_color(root, Color::BLACK)
    }

    /// Flatten a placed tree with a default color for uncolored boxes
    pub fn from_box_with_color(root: &DisplayBox, color: Color) -> MathResult<Self> {
        let bounds = root.bounds().ok_or_else(not_placed)?;
        let mut commands = Vec::new();
        collect(root, color, &mut commands)?;
        tracing::trace!(target: "math::render", commands = commands.len(), "display tree flattened");
        Ok(Self { commands, bounds })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn not_placed() -> MathError {
    MathError::InvalidStructure("display tree has not been placed".to_string())
}

fn collect(bx: &DisplayBox, inherited: Color, commands: &mut Vec<DrawCommand>) -> MathResult<()> {
    let origin = bx.position.ok_or_else(not_placed)?;
    let color = bx.color.unwrap_or(inherited);

    match &bx.content {
        DisplayContent::GlyphRun { glyphs, font_size } => {
            if !glyphs.is_empty() {
                commands.push(DrawCommand::Glyphs {
                    glyphs: glyphs.clone(),
                    origin,
                    font_size: *font_size,
                    color,
                });
            }
        }
        DisplayContent::Rule => {
            if bx.width > 0.0 && bx.height() > 0.0 {
                commands.push(DrawCommand::Rule {
                    rect: Rect::new(origin.x, origin.y - bx.descent, bx.width, bx.height()),
                    color,
                });
            }
        }
        DisplayContent::Assembly | DisplayContent::Group => {}
    }

    for child in &bx.children {
        collect(child, color, commands)?;
    }
    Ok(())
}
