//! Integration tests for math line breaking
//!
//! Each test builds an expression, breaks it at a width and checks the
//! geometric guarantees of the result: lines fit, nothing is split that must
//! stay together, and lines never overlap.

use layout_engine::{intrinsic_size, BrokenMath, LineBreakConfig, LineBreaker, TextSegmenter, UnicodeSegmenter};
use math::{Atom, AtomKind, AtomList, FinalizedList, LineStyle};
use math_font::{FontCache, MathConstant, MathFontMetrics};
use proptest::prelude::*;
use std::sync::Once;

const TOLERANCE: f32 = 1e-3;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Shared setup for breaking expressions with the built-in font
struct BreakHarness {
    font: MathFontMetrics,
}

impl BreakHarness {
    fn new() -> Self {
        init_tracing();
        Self {
            font: MathFontMetrics::builtin(10.0),
        }
    }

    fn break_at(&self, list: &FinalizedList, width: f32) -> BrokenMath {
        LineBreaker::new(&self.font).break_lines(list, &LineBreakConfig::new(width))
    }

    fn gap(&self) -> f32 {
        self.font.constant(MathConstant::MathLeading)
    }

    /// Lines are stacked top-down with exactly the line gap between them
    fn assert_stacked(&self, broken: &BrokenMath) {
        let gap = self.gap();
        let first = &broken.lines[0];
        assert!(first.top().abs() < TOLERANCE, "first line must start at y = 0");
        for pair in broken.lines.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            assert!(
                upper.bottom() >= lower.top() - TOLERANCE,
                "lines overlap: {} below {}",
                lower.top(),
                upper.bottom()
            );
            assert!((upper.bottom() - lower.top() - gap).abs() < TOLERANCE);
            assert!(lower.baseline < upper.baseline);
        }
        let last = broken.lines.last().unwrap();
        assert!((broken.size.height + last.bottom()).abs() < TOLERANCE);
    }
}

fn text_of(broken: &BrokenMath) -> Vec<String> {
    broken
        .lines
        .iter()
        .map(|line| {
            line.atoms
                .iter()
                .filter(|a| a.is_text())
                .map(|a| a.nucleus.clone())
                .collect::<String>()
        })
        .collect()
}

fn nuclei(atoms: &[Atom]) -> String {
    atoms.iter().map(|a| a.nucleus.as_str()).collect()
}

#[test]
fn test_fraction_fits_at_natural_width() {
    let h = BreakHarness::new();
    let list = AtomList::from(vec![Atom::fraction(
        AtomList::from_symbols("1"),
        AtomList::from_symbols("2"),
    )])
    .finalize();

    let natural = h.break_at(&list, f32::INFINITY);
    assert_eq!(natural.line_count(), 1);

    let exact = h.break_at(&list, natural.size.width);
    assert_eq!(exact.line_count(), 1);
    assert_eq!(exact.size, natural.size);
}

#[test]
fn test_fraction_wider_than_limit_overflows_alone() {
    let h = BreakHarness::new();
    let list = AtomList::from(vec![Atom::fraction(
        AtomList::from_symbols("1"),
        AtomList::from_symbols("2"),
    )])
    .finalize();

    let broken = h.break_at(&list, 1.0);
    assert_eq!(broken.line_count(), 1);
    assert!(broken.size.width > 1.0);
    assert!(broken.issues.is_empty());
}

#[test]
fn test_words_wrap_in_order() {
    let h = BreakHarness::new();
    let sentence = "Word1 Word2 Word3 Word4 Word5";
    let list = AtomList::from(vec![Atom::text(sentence)]).finalize();
    let width = 40.0;

    let broken = h.break_at(&list, width);
    assert!(broken.line_count() > 1);

    let lines = text_of(&broken);
    let words: Vec<&str> = lines.iter().flat_map(|l| l.split_whitespace()).collect();
    assert_eq!(words, vec!["Word1", "Word2", "Word3", "Word4", "Word5"]);
    for (line, text) in broken.lines.iter().zip(&lines) {
        assert_eq!(text.trim_end(), text.as_str(), "trailing space kept on {text:?}");
        if text.split_whitespace().count() > 1 {
            assert!(line.width() <= width + TOLERANCE);
        }
    }
    h.assert_stacked(&broken);
}

#[test]
fn test_decimal_comma_never_splits() {
    let h = BreakHarness::new();

    let text = AtomList::from(vec![Atom::text("3,14")]).finalize();
    assert_eq!(text_of(&h.break_at(&text, 0.0)), vec!["3,14"]);

    let atoms = AtomList::from(vec![
        Atom::number("1"),
        Atom::punctuation(","),
        Atom::number("000"),
        Atom::punctuation(","),
        Atom::number("000"),
    ])
    .finalize();
    let broken = h.break_at(&atoms, 0.0);
    assert_eq!(broken.line_count(), 1);
    assert_eq!(nuclei(broken.lines[0].atoms.atoms()), "1,000,000");
}

#[test]
fn test_number_separated_from_next_atom() {
    let h = BreakHarness::new();
    let list = AtomList::from(vec![
        Atom::number("2"),
        Atom::punctuation("."),
        Atom::number("5"),
        Atom::punctuation(","),
        Atom::variable("x"),
    ])
    .finalize();
    let broken = h.break_at(&list, 0.0);
    let lines: Vec<String> = broken.lines.iter().map(|l| nuclei(l.atoms.atoms())).collect();
    assert_eq!(lines, vec!["2.5", ",", "x"]);
}

#[test]
fn test_cjk_wraps_between_characters() {
    let h = BreakHarness::new();
    let list = AtomList::from(vec![Atom::text("数学公式排版")]).finalize();
    let width = 25.0;

    let broken = h.break_at(&list, width);
    assert!(broken.line_count() >= 3);
    assert_eq!(text_of(&broken).concat(), "数学公式排版");
    for line in &broken.lines {
        assert!(line.width() <= width + TOLERANCE);
    }
}

#[test]
fn test_tall_lines_do_not_overlap() {
    let h = BreakHarness::new();
    let tall = Atom::fraction(
        AtomList::from(vec![Atom::fraction(
            AtomList::from_symbols("a"),
            AtomList::from_symbols("b"),
        )]),
        AtomList::from_symbols("c"),
    );
    let root = Atom::nth_root(
        AtomList::from_symbols("3"),
        AtomList::from(vec![Atom::fraction(
            AtomList::from_symbols("x"),
            AtomList::from_symbols("y"),
        )]),
    );
    let list = AtomList::from(vec![
        tall.clone(),
        Atom::binary("+"),
        root.clone(),
        Atom::relation("="),
        Atom::sqrt(AtomList::from_symbols("2")),
        Atom::binary("+"),
        tall,
        Atom::binary("-"),
        root,
    ])
    .finalize();

    let broken = h.break_at(&list, 30.0);
    assert!(broken.line_count() > 1);
    h.assert_stacked(&broken);

    let draw = broken.draw_list().unwrap();
    assert!(draw.bounds.height() >= broken.size.height - TOLERANCE);
}

#[test]
fn test_display_style_survives_breaks() {
    let h = BreakHarness::new();
    let sum = Atom::large_operator("\u{2211}", true)
        .with_subscript(AtomList::from_symbols("i"))
        .with_superscript(AtomList::from_symbols("n"));
    let list = AtomList::from(vec![
        Atom::style(LineStyle::Display),
        sum.clone(),
        Atom::variable("x"),
        sum,
        Atom::variable("y"),
    ])
    .finalize();

    let broken = h.break_at(&list, 15.0);
    assert!(broken.line_count() >= 2);
    let operator_lines: Vec<_> = broken
        .lines
        .iter()
        .filter(|l| l.atoms.iter().any(|a| matches!(a.kind, AtomKind::LargeOperator { .. })))
        .collect();
    assert_eq!(operator_lines.len(), 2);
    for line in &operator_lines {
        assert!(matches!(
            line.atoms.atoms()[0].kind,
            AtomKind::Style {
                style: LineStyle::Display
            }
        ));
    }
    // Both operators are set in display style, so their lines match.
    let heights: Vec<f32> = operator_lines.iter().map(|l| l.display.height()).collect();
    assert!((heights[0] - heights[1]).abs() < TOLERANCE);
    h.assert_stacked(&broken);
}

#[test]
fn test_intrinsic_size_trades_width_for_height() {
    let h = BreakHarness::new();
    let list = AtomList::from(vec![
        Atom::text("energy "),
        Atom::variable("E"),
        Atom::relation("="),
        Atom::variable("m"),
        Atom::variable("c").with_superscript(AtomList::from_symbols("2")),
    ])
    .finalize();
    let config = LineBreakConfig::default();

    let unconstrained = intrinsic_size(&list, &h.font, &config, None);
    let constrained = intrinsic_size(&list, &h.font, &config, Some(unconstrained.width / 2.0));

    assert!(constrained.width <= unconstrained.width + TOLERANCE);
    assert!(constrained.height >= unconstrained.height - TOLERANCE);
    assert!(constrained.height > unconstrained.height);
}

#[test]
fn test_trailing_kern_does_not_widen_wrapped_size() {
    let h = BreakHarness::new();
    let list = AtomList::from(vec![Atom::text("aaaa bbbb"), Atom::space(-40.0)]).finalize();
    let config = LineBreakConfig::default();

    let unconstrained = intrinsic_size(&list, &h.font, &config, None);
    let constrained = intrinsic_size(&list, &h.font, &config, Some(30.0));

    assert!(constrained.width <= unconstrained.width + TOLERANCE);
    assert!(constrained.height > unconstrained.height);

    let broken = h.break_at(&list, 30.0);
    let last = broken.lines.last().unwrap();
    assert!(matches!(
        last.atoms.atoms().last().map(|a| &a.kind),
        Some(AtomKind::Space { .. })
    ));
}

#[test]
fn test_config_file_drives_breaking() {
    let h = BreakHarness::new();
    let config = LineBreakConfig::from_json(r#"{"max_width": 0.0, "line_gap": 2.0}"#).unwrap();
    let list = AtomList::from_symbols("x+y").finalize();

    let broken = LineBreaker::new(&h.font).break_lines(&list, &config);
    assert_eq!(broken.line_count(), 3);
    let gap = broken.lines[0].bottom() - broken.lines[1].top();
    assert!((gap - 2.0).abs() < TOLERANCE);
}

#[test]
fn test_concurrent_breaking_shares_font() {
    init_tracing();
    let table = FontCache::global().builtin();
    let font = MathFontMetrics::new(table, 12.0);
    let list = AtomList::from(vec![
        Atom::text("alpha beta gamma delta"),
        Atom::relation("="),
        Atom::fraction(AtomList::from_symbols("a+b"), AtomList::from_symbols("c")),
    ])
    .finalize();
    let config = LineBreakConfig::new(50.0);

    let expected = LineBreaker::new(&font).break_lines(&list, &config);
    let results: Vec<BrokenMath> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| LineBreaker::new(&font).break_lines(&list, &config)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in results {
        assert_eq!(result.size, expected.size);
        assert_eq!(result.lines, expected.lines);
    }
}

fn symbol_string() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!["a", "b", "x", "1", "2", "+", "-", "=", "(", ")"]), 0..24)
        .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn prop_lines_fit_and_preserve_order(symbols in symbol_string(), width in 0.0f32..80.0) {
        let h = BreakHarness::new();
        let list = AtomList::from_symbols(&symbols).finalize();
        let broken = h.break_at(&list, width);

        let joined: String = broken.lines.iter().map(|l| nuclei(l.atoms.atoms())).collect();
        prop_assert_eq!(joined, nuclei(list.atoms()));

        for line in &broken.lines {
            let atoms = line.atoms.atoms().iter().filter(|a| !matches!(a.kind, AtomKind::Style { .. })).count();
            prop_assert!(line.width() <= width + TOLERANCE || atoms <= 1);
        }
        prop_assert!(broken.size.width >= 0.0);
    }

    #[test]
    fn prop_text_units_never_split(text in mixed_text(), width in 0.0f32..120.0) {
        let h = BreakHarness::new();
        let list = AtomList::from(vec![Atom::text(text.as_str())]).finalize();
        let broken = h.break_at(&list, width);
        let units = UnicodeSegmenter.units(&text);

        let mut next = 0;
        for (line, line_text) in broken.lines.iter().zip(text_of(&broken)) {
            let first = next;
            let mut consumed = String::new();
            loop {
                prop_assert!(next < units.len(), "line {:?} runs past the last unit", line_text);
                let unit = units[next];
                next += 1;
                if format!("{consumed}{}", unit.trim_end()) == line_text {
                    break;
                }
                consumed.push_str(unit);
                prop_assert!(line_text.starts_with(&consumed), "unit {:?} split on line {:?}", unit, line_text);
            }
            prop_assert!(line.width() <= width + TOLERANCE || next - first == 1);
        }
        prop_assert_eq!(next, units.len());
        h.assert_stacked(&broken);
    }
}

/// Text mixing words, grouped numerals, CJK and emoji sequences
fn mixed_text() -> impl Strategy<Value = String> {
    let token = prop::sample::select(vec![
        "alpha",
        "beta",
        "x",
        "1,000,000",
        "3,14",
        "2.5",
        "数学",
        "公式排版",
        "カタカナ",
        "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}",
        "e\u{0301}",
    ]);
    let separator = prop::sample::select(vec![" ", " ", ""]);
    prop::collection::vec((token, separator), 1..12).prop_map(|parts| {
        parts
            .into_iter()
            .flat_map(|(token, separator)| [token, separator])
            .collect()
    })
}
