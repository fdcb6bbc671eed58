use crate::fields::NumericPolicy;
use crate::{FeedRate, Mm};

// Lift after zeroing Z, before homing. Z was just redefined as 0 wherever the nozzle sits on the
// part, so this is relative to the top of the print, not the bed.
pub const LIFT_HEIGHT_DEFAULT: Mm = 5.0;
pub const LIFT_FEED_RATE_DEFAULT: FeedRate = 3000;
// Added to the recovered Z for the first move back over the part, so the nozzle doesn't drag
// across the last printed layer on the way to X/Y.
pub const RESUME_Z_OFFSET_DEFAULT: Mm = 2.0;
pub const RESUME_Z_FEED_RATE_DEFAULT: FeedRate = 3000;

/// Header lines containing any of these are not replayed; the preamble sets temperatures and
/// homes on its own.
pub const SKIP_LIST_DEFAULT: [&str; 6] = ["M140", "M190", "M104", "M109", "G28 X0 Y0", "G28 Z0"];

#[derive(Debug, Clone, PartialEq)]
pub struct ResumeConfig {
    pub lift_height: Mm,
    pub lift_feed_rate: FeedRate,
    pub resume_z_offset: Mm,
    pub resume_z_feed_rate: FeedRate,
    pub skip_list: Vec<String>,
    pub numeric_policy: NumericPolicy,
    /// Also heat the bed (M140 + M190 with the header's M190 value) before the nozzle.
    pub heat_bed: bool,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        ResumeConfig {
            lift_height: LIFT_HEIGHT_DEFAULT,
            lift_feed_rate: LIFT_FEED_RATE_DEFAULT,
            resume_z_offset: RESUME_Z_OFFSET_DEFAULT,
            resume_z_feed_rate: RESUME_Z_FEED_RATE_DEFAULT,
            skip_list: SKIP_LIST_DEFAULT.iter().map(|s| s.to_string()).collect(),
            numeric_policy: NumericPolicy::default(),
            heat_bed: false,
        }
    }
}

impl ResumeConfig {
    pub fn is_skipped(&self, line: &str) -> bool {
        self.skip_list.iter().any(|s| line.contains(s.as_str()))
    }
}
