//! Chart record types.
//!
//! `ChartRecord` is the cumulative session document; `ChartUpdate` is the
//! sparse partial update extracted from one transcript line. Both serialize
//! to the same JSON shape (`{"teeth": {"8": {...}}}`), with tooth numbers
//! as string keys.

use crate::defaults::{TOOTH_MAX, TOOTH_MIN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-tooth clinical findings.
///
/// List-valued fields are append-only (repeated measurements are
/// legitimate); scalar fields hold the latest recorded value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToothRecord {
    /// Probing depths in millimeters, in recording order.
    pub pocket_depths: Vec<i32>,
    /// Gingival margin measurements in millimeters, in recording order.
    pub gingival_margin: Vec<i32>,
    /// Bleeding-on-probing surfaces (e.g. "buccal", "mesial").
    pub bleeding: Option<String>,
    /// Mobility grade (0-3).
    pub mobility: Option<i32>,
    /// Furcation involvement class (e.g. "class II").
    pub furcation_involvement: Option<String>,
}

impl ToothRecord {
    /// True when nothing has been recorded for this tooth.
    pub fn is_empty(&self) -> bool {
        self.pocket_depths.is_empty()
            && self.gingival_margin.is_empty()
            && self.bleeding.is_none()
            && self.mobility.is_none()
            && self.furcation_involvement.is_none()
    }
}

/// The cumulative, session-scoped chart document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartRecord {
    pub teeth: BTreeMap<u8, ToothRecord>,
}

impl ChartRecord {
    /// An empty chart: teeth appear as findings come in.
    pub fn new() -> Self {
        Self::default()
    }

    /// A chart pre-populated with every tooth (1..=32), all fields empty.
    pub fn full_arch() -> Self {
        let teeth = (TOOTH_MIN..=TOOTH_MAX)
            .map(|n| (n, ToothRecord::default()))
            .collect();
        Self { teeth }
    }

    /// Number of teeth with at least one recorded finding.
    pub fn charted_teeth(&self) -> usize {
        self.teeth.values().filter(|t| !t.is_empty()).count()
    }
}

/// A sparse per-tooth change set from one transcript line.
///
/// Absent and explicit-null scalar fields both deserialize to `None` and
/// never clear existing chart values on merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToothUpdate {
    pub pocket_depths: Vec<i32>,
    pub gingival_margin: Vec<i32>,
    pub bleeding: Option<String>,
    pub mobility: Option<i32>,
    pub furcation_involvement: Option<String>,
}

impl ToothUpdate {
    /// True when this update carries no actionable data.
    pub fn is_empty(&self) -> bool {
        self.pocket_depths.is_empty()
            && self.gingival_margin.is_empty()
            && self.bleeding.is_none()
            && self.mobility.is_none()
            && self.furcation_involvement.is_none()
    }
}

/// A partial update covering zero or more teeth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartUpdate {
    pub teeth: BTreeMap<u8, ToothUpdate>,
}

impl ChartUpdate {
    /// True when no tooth in the update carries actionable data.
    pub fn is_empty(&self) -> bool {
        self.teeth.values().all(|t| t.is_empty())
    }
}
