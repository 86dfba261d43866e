//! Incremental merge of sparse updates into the cumulative chart.
//!
//! Merge rules: list fields extend (append-only), scalar fields are
//! last-write-wins but only for values the update actually carries.
//! An update can therefore add to the chart but never erase from it.

use crate::chart::record::{ChartRecord, ChartUpdate, ToothRecord, ToothUpdate};
use crate::defaults::{TOOTH_MAX, TOOTH_MIN};

/// Result of one merge pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Teeth that received at least one new value.
    pub applied_teeth: Vec<u8>,
    /// Human-readable notes for skipped entries (e.g. out-of-range teeth).
    pub skipped: Vec<String>,
}

impl MergeOutcome {
    /// True when at least one tooth changed.
    pub fn changed(&self) -> bool {
        !self.applied_teeth.is_empty()
    }
}

/// Applies sparse updates to a `ChartRecord`.
#[derive(Debug, Default)]
pub struct ChartMerger;

impl ChartMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merges `update` into `chart`, returning which teeth changed and
    /// which entries were skipped.
    ///
    /// Tooth numbers outside 1..=32 are skipped rather than rejected:
    /// one bad entry from the extractor must not discard the good ones.
    pub fn merge(&self, chart: &mut ChartRecord, update: &ChartUpdate) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for (&tooth, tooth_update) in &update.teeth {
            if !(TOOTH_MIN..=TOOTH_MAX).contains(&tooth) {
                outcome
                    .skipped
                    .push(format!("tooth {tooth} out of range (1-32)"));
                continue;
            }
            if tooth_update.is_empty() {
                continue;
            }

            let record = chart.teeth.entry(tooth).or_default();
            merge_tooth(record, tooth_update);
            outcome.applied_teeth.push(tooth);
        }

        outcome
    }
}

fn merge_tooth(record: &mut ToothRecord, update: &ToothUpdate) {
    record.pocket_depths.extend_from_slice(&update.pocket_depths);
    record
        .gingival_margin
        .extend_from_slice(&update.gingival_margin);

    if let Some(bleeding) = &update.bleeding {
        record.bleeding = Some(bleeding.clone());
    }
    if let Some(mobility) = update.mobility {
        record.mobility = Some(mobility);
    }
    if let Some(furcation) = &update.furcation_involvement {
        record.furcation_involvement = Some(furcation.clone());
    }
}
