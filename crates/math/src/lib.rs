//! Math Crate - Math typesetting for the layout engine
//!
//! This crate provides:
//! - An atom model for math expressions, with a finalize step that normalizes
//!   parser output into an immutable list
//! - A typesetter that lays finalized lists out with OpenType MATH metrics
//! - A display tree of baseline-relative boxes and its placement
//! - Flattening of placed trees into draw commands for renderers

pub mod display;
pub mod error;
pub mod model;
pub mod render;
pub mod spacing;
pub mod typesetter;

pub use display::{DisplayBox, DisplayContent, Point, Rect, Size};
pub use error::*;
pub use model::*;
pub use render::{DrawCommand, DrawList};
pub use spacing::{space_between, AtomClass};
pub use typesetter::{typeset, Typeset, Typesetter};

#[cfg(test)]
mod tests {
    use super::*;
    use math_font::MathFontMetrics;

    // =============================================================================
    // Integration Tests
    // =============================================================================

    #[test]
    fn test_finalize_typeset_render_pipeline() {
        let list = AtomList::from(vec![
            Atom::fraction(AtomList::from_symbols("a"), AtomList::from_symbols("b")),
            Atom::binary("+"),
            Atom::sqrt(AtomList::from_symbols("x")),
        ]);

        let font = MathFontMetrics::builtin(12.0);
        let mut result = typeset(&list.finalize(), &font, LineStyle::Display);
        assert!(result.issues.is_empty());
        assert!(result.root.width > 0.0);
        assert!(result.root.height() > 0.0);

        result.root.place(Point::new(0.0, 100.0));
        let draw = DrawList::from_box(&result.root).unwrap();

        let rules = draw
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Rule { .. }))
            .count();
        // Fraction bar and radical overbar.
        assert_eq!(rules, 2);
        assert!(draw.bounds.top() > 100.0);
        assert!(draw.bounds.bottom() < 100.0);
    }

    #[test]
    fn test_atom_list_json_roundtrip_typesets_identically() {
        let list = AtomList::from(vec![Atom::variable("x")
            .with_superscript(AtomList::from_symbols("2"))
            .with_subscript(AtomList::from_symbols("i"))]);
        let json = serde_json::to_string(&list).unwrap();
        let parsed: AtomList = serde_json::from_str(&json).unwrap();

        let font = MathFontMetrics::builtin(10.0);
        let a = typeset(&list.finalize(), &font, LineStyle::Text);
        let b = typeset(&parsed.finalize(), &font, LineStyle::Text);
        assert_eq!(a.root, b.root);
    }
}
