//! Named layout constants of an OpenType MATH table
//!
//! Constants are stored in a [`FontMetricsTable`](crate::FontMetricsTable) under
//! their OpenType names so that tables exported from real fonts can be loaded
//! as-is. [`MathConstant`] gives the typesetter a typed handle on each of them.

use serde::{Deserialize, Serialize};

macro_rules! math_constants {
    ($($(#[$doc:meta])* $variant:ident,)*) => {
        /// A named math layout constant
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum MathConstant {
            $($(#[$doc])* $variant,)*
        }

        impl MathConstant {
            /// Every constant, in table order
            pub const ALL: &'static [MathConstant] = &[$(MathConstant::$variant,)*];

            /// The OpenType name under which the constant is stored
            pub fn name(self) -> &'static str {
                match self {
                    $(MathConstant::$variant => stringify!($variant),)*
                }
            }

            /// Look a constant up by its OpenType name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($variant) => Some(MathConstant::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

math_constants! {
    /// Scale-down for the first script level, in percent
    ScriptPercentScaleDown,
    /// Scale-down for the second script level, in percent
    ScriptScriptPercentScaleDown,
    DelimitedSubFormulaMinHeight,
    DisplayOperatorMinHeight,
    /// White space between consecutive lines
    MathLeading,
    /// Height of the math axis above the baseline
    AxisHeight,
    AccentBaseHeight,
    FlattenedAccentBaseHeight,
    SubscriptShiftDown,
    SubscriptTopMax,
    SubscriptBaselineDropMin,
    SuperscriptShiftUp,
    SuperscriptShiftUpCramped,
    SuperscriptBottomMin,
    SuperscriptBaselineDropMax,
    SubSuperscriptGapMin,
    SuperscriptBottomMaxWithSubscript,
    SpaceAfterScript,
    UpperLimitGapMin,
    UpperLimitBaselineRiseMin,
    LowerLimitGapMin,
    LowerLimitBaselineDropMin,
    StackTopShiftUp,
    StackTopDisplayStyleShiftUp,
    StackBottomShiftDown,
    StackBottomDisplayStyleShiftDown,
    StackGapMin,
    StackDisplayStyleGapMin,
    FractionNumeratorShiftUp,
    FractionNumeratorDisplayStyleShiftUp,
    FractionDenominatorShiftDown,
    FractionDenominatorDisplayStyleShiftDown,
    FractionNumeratorGapMin,
    FractionNumDisplayStyleGapMin,
    FractionRuleThickness,
    FractionDenominatorGapMin,
    FractionDenomDisplayStyleGapMin,
    OverbarVerticalGap,
    OverbarRuleThickness,
    OverbarExtraAscender,
    UnderbarVerticalGap,
    UnderbarRuleThickness,
    UnderbarExtraDescender,
    RadicalVerticalGap,
    RadicalDisplayStyleVerticalGap,
    RadicalRuleThickness,
    RadicalExtraAscender,
    RadicalKernBeforeDegree,
    RadicalKernAfterDegree,
    /// Raise of the radical degree, in percent of the radical height
    RadicalDegreeBottomRaisePercent,
    /// Minimum overlap of connecting glyphs in a glyph assembly
    MinConnectorOverlap,
}
