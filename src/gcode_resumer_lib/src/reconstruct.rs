use std::time::Instant;

use tracing::{debug, info};

use crate::document::GcodeDocument;
use crate::error::{Axis, ResumeError};
use crate::fields::{AxisValue, Fields};
use crate::locate::LayerBounds;
use crate::Celsius;

/// Machine state as it was just before the resumed layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    pub e: AxisValue,
    pub z: AxisValue,
    pub x: AxisValue,
    pub y: AxisValue,
    pub nozzle_temp: Celsius,
    pub bed_temp: Celsius,
}

#[derive(Debug, Default)]
struct Recovered {
    e: Option<AxisValue>,
    z: Option<AxisValue>,
    x: Option<AxisValue>,
    y: Option<AxisValue>,
}

impl Recovered {
    fn slot(&mut self, axis: Axis) -> &mut Option<AxisValue> {
        match axis {
            Axis::E => &mut self.e,
            Axis::Z => &mut self.z,
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }

    fn is_complete(&self) -> bool {
        self.e.is_some() && self.z.is_some() && self.x.is_some() && self.y.is_some()
    }

    fn missing(&self) -> Vec<Axis> {
        [
            (Axis::E, &self.e),
            (Axis::Z, &self.z),
            (Axis::X, &self.x),
            (Axis::Y, &self.y),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(axis, _)| axis)
        .collect()
    }
}

const AXES: [Axis; 4] = [Axis::E, Axis::Z, Axis::X, Axis::Y];

/// Walks back from the line before the layer marker down to the header end (inclusive), taking
/// the first value found for each axis, then reads the temperatures out of the header.
pub fn reconstruct_state(
    document: &GcodeDocument,
    bounds: &LayerBounds,
    fields: &Fields,
) -> Result<MachineState, ResumeError> {
    let before_scan = Instant::now();
    let mut recovered = Recovered::default();

    for index in (bounds.header_end..bounds.layer_start).rev() {
        let line = document.line(index);
        for axis in AXES {
            let slot = recovered.slot(axis);
            if slot.is_none() {
                *slot = fields.axis(axis, line, index)?;
            }
        }
        if recovered.is_complete() {
            debug!(stopped_at = index, "recovered all axes");
            break;
        }
    }

    let missing = recovered.missing();
    let (Some(e), Some(z), Some(x), Some(y)) = (recovered.e, recovered.z, recovered.x, recovered.y)
    else {
        return Err(ResumeError::IncompleteStateRecovery { missing });
    };

    let mut nozzle_temp: Option<Celsius> = None;
    let mut bed_temp: Option<Celsius> = None;
    for index in 0..bounds.header_end {
        let line = document.line(index);
        if nozzle_temp.is_none() {
            nozzle_temp = fields.nozzle_temp(line, index)?;
        }
        if bed_temp.is_none() {
            bed_temp = fields.bed_temp(line, index)?;
        }
        if nozzle_temp.is_some() && bed_temp.is_some() {
            break;
        }
    }

    let state = MachineState {
        e,
        z,
        x,
        y,
        nozzle_temp: nozzle_temp.unwrap_or(0),
        bed_temp: bed_temp.unwrap_or(0),
    };
    info!(
        e = %state.e.literal,
        z = %state.z.literal,
        x = %state.x.literal,
        y = %state.y.literal,
        nozzle_temp = state.nozzle_temp,
        bed_temp = state.bed_temp,
        elapsed = ?before_scan.elapsed(),
        "recovered machine state"
    );
    Ok(state)
}
