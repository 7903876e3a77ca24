//! Market-structure classification.
//!
//! Swing points are labelled against the previous swing of the same kind
//! (HH/LH for highs, HL/LL for lows) in one left-to-right fold. The last
//! three labels give the structural pattern; break-of-structure and
//! change-of-character flags accumulated over the whole walk then adjust
//! the final state.

use serde::Deserialize;

use super::swing::SwingAnnotation;
use crate::types::{StructurePattern, SwingKind, SwingPoint, TrendLabel, TrendState};

/// Number of trailing labels that form the pattern.
const PATTERN_LEN: usize = 3;

/// How to label a candle that is both a swing high and a swing low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DualSwingPolicy {
    /// Label the high only; the low side of the candle is ignored.
    #[default]
    HighOnly,
    /// Label the high, then the low, as two separate swings.
    Both,
}

/// A swing point with its structural label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelledSwing {
    pub point: SwingPoint,
    pub label: TrendLabel,
}

/// Output of the labelling fold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwingLabels {
    pub labels: Vec<LabelledSwing>,
    /// A swing extended the previous same-kind swing (HH after a high,
    /// LL after a low).
    pub break_of_structure: bool,
    /// A swing contradicted the previous same-kind swing (LH or HL).
    pub change_of_character: bool,
}

impl SwingLabels {
    pub fn label_sequence(&self) -> Vec<TrendLabel> {
        self.labels.iter().map(|l| l.label).collect()
    }
}

/// Full classification of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureAnalysis {
    pub swings: SwingLabels,
    /// Pattern read from the last three labels, before adjustment.
    pub pattern: StructurePattern,
    pub state: TrendState,
}

#[derive(Debug, Default)]
struct LabelState {
    last_high: Option<f64>,
    last_low: Option<f64>,
    out: SwingLabels,
}

impl LabelState {
    fn push(mut self, point: SwingPoint) -> Self {
        let label = match point.kind {
            SwingKind::High => {
                let label = match self.last_high {
                    Some(prev) if point.price <= prev => TrendLabel::LH,
                    _ => TrendLabel::HH,
                };
                if self.last_high.is_some() {
                    match label {
                        TrendLabel::HH => self.out.break_of_structure = true,
                        _ => self.out.change_of_character = true,
                    }
                }
                self.last_high = Some(point.price);
                label
            }
            SwingKind::Low => {
                let label = match self.last_low {
                    Some(prev) if point.price <= prev => TrendLabel::LL,
                    _ => TrendLabel::HL,
                };
                if self.last_low.is_some() {
                    match label {
                        TrendLabel::LL => self.out.break_of_structure = true,
                        _ => self.out.change_of_character = true,
                    }
                }
                self.last_low = Some(point.price);
                label
            }
        };
        self.out.labels.push(LabelledSwing { point, label });
        self
    }
}

/// Label swing points in order. Points must be in index order.
pub fn label_swings<I>(points: I) -> SwingLabels
where
    I: IntoIterator<Item = SwingPoint>,
{
    points
        .into_iter()
        .fold(LabelState::default(), LabelState::push)
        .out
}

/// Swing points of an annotation under the given dual-flag policy.
pub fn structural_points(
    annotation: &SwingAnnotation<'_>,
    policy: DualSwingPolicy,
) -> Vec<SwingPoint> {
    let points = annotation.swing_points();
    match policy {
        DualSwingPolicy::Both => points,
        DualSwingPolicy::HighOnly => {
            let mut kept: Vec<SwingPoint> = Vec::with_capacity(points.len());
            for p in points {
                // A Low sharing its index with the preceding High is dropped.
                let shadowed = p.kind == SwingKind::Low
                    && kept
                        .last()
                        .is_some_and(|prev| prev.index == p.index && prev.kind == SwingKind::High);
                if !shadowed {
                    kept.push(p);
                }
            }
            kept
        }
    }
}

/// Read the structural pattern from the most recent labels.
pub fn classify_pattern(labels: &[TrendLabel]) -> StructurePattern {
    use crate::types::TrendLabel::*;

    if labels.len() < PATTERN_LEN {
        return StructurePattern::NoTrend;
    }
    match &labels[labels.len() - PATTERN_LEN..] {
        [HH, HL, HH] | [HL, HH, HL] => StructurePattern::Uptrend,
        [LL, LH, LL] | [LH, LL, LH] => StructurePattern::Downtrend,
        _ => StructurePattern::TrendBroken,
    }
}

/// Apply the whole-series BoS/CHoCH flags to a pattern.
pub fn adjust_state(pattern: StructurePattern, bos: bool, choch: bool) -> TrendState {
    match (bos, choch) {
        (false, true) => TrendState::ChangeOfCharacter,
        (true, false) => TrendState::with_bos(pattern),
        _ => TrendState::plain(pattern),
    }
}

/// Classify the structure of an annotated series.
pub fn classify_structure(
    annotation: &SwingAnnotation<'_>,
    policy: DualSwingPolicy,
) -> StructureAnalysis {
    let swings = label_swings(structural_points(annotation, policy));
    let pattern = classify_pattern(&swings.label_sequence());
    let state = adjust_state(pattern, swings.break_of_structure, swings.change_of_character);
    StructureAnalysis {
        swings,
        pattern,
        state,
    }
}
