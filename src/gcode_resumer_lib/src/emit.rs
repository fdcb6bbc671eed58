use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::config::ResumeConfig;
use crate::document::GcodeDocument;
use crate::locate::LayerBounds;
use crate::reconstruct::MachineState;

// How often the tail copy checks for cancel and reports progress.
const TAIL_PROGRESS_INTERVAL: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Copied {
    Complete,
    Cancelled,
}

/// Heat, zero Z, lift, home, replay the filtered header, then move back to where the print
/// stopped and redefine E. Everything up to (not including) the resumed layer marker.
pub fn write_preamble<W: Write>(
    w: &mut W,
    document: &GcodeDocument,
    bounds: &LayerBounds,
    state: &MachineState,
    config: &ResumeConfig,
) -> io::Result<()> {
    writeln!(w, "M117 Start heating ...")?;
    if config.heat_bed {
        writeln!(w, "M140 S{} ; Set the bed temperature", state.bed_temp)?;
        writeln!(w, "M190 S{} ; Wait for the bed temperature to reach the target", state.bed_temp)?;
    }
    writeln!(w, "M104 S{} ; Set the nozzle temperature", state.nozzle_temp)?;
    writeln!(w, "M109 S{} ; Wait for the nozzle temperature to reach the target", state.nozzle_temp)?;

    writeln!(w, "M117 Unstuck Extruder")?;
    writeln!(w, "G92 Z0 ; Set the current Z position as zero")?;
    writeln!(w, "G1 Z{} F{} ; Lift the nozzle", config.lift_height, config.lift_feed_rate)?;

    writeln!(w, "M117 Homing X/Y ...")?;
    writeln!(w, "G28 X Y ; Home the X and Y axes")?;
    writeln!(w, "M117 Homing Z ...")?;
    writeln!(w, "G28 Z ; Home the Z axis")?;

    let mut skipped = 0usize;
    for raw in document.raw_lines(0..bounds.header_end + 1) {
        if config.is_skipped(raw) {
            skipped += 1;
            continue;
        }
        w.write_all(raw.as_bytes())?;
        // an unterminated last header line would otherwise run into the next command
        if !raw.ends_with('\n') {
            writeln!(w)?;
        }
    }
    debug!(replayed = bounds.header_end + 1 - skipped, skipped, "header replayed");

    writeln!(w, "M117 Resuming Z ...")?;
    writeln!(
        w,
        "G0 Z{} F{}; Move the extruder Z to the last position before the specified layer",
        state.z.value + config.resume_z_offset,
        config.resume_z_feed_rate
    )?;
    writeln!(w, "M117 Resuming X/Y ...")?;
    writeln!(
        w,
        "G0 X{} Y{}; Move the extruder X Y to the last position before the specified layer",
        state.x.literal, state.y.literal
    )?;
    writeln!(w, "M117 Resuming Extruder ...")?;
    writeln!(w, "G92 E{} ; Set the current extruder value", state.e.literal)?;
    writeln!(w, "M117 Resuming from {}...", bounds.layer)?;
    Ok(())
}

/// Copies the source verbatim from the layer marker to the end.
pub fn write_tail<W: Write>(
    w: &mut W,
    document: &GcodeDocument,
    bounds: &LayerBounds,
    cancel: Option<&AtomicBool>,
) -> io::Result<Copied> {
    let total = document.len() - bounds.layer_start;
    for (copied, raw) in document.raw_lines(bounds.layer_start..document.len()).enumerate() {
        if copied % TAIL_PROGRESS_INTERVAL == 0 {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return Ok(Copied::Cancelled);
            }
            if copied > 0 {
                debug!(copied, total, "copying tail");
            }
        }
        w.write_all(raw.as_bytes())?;
    }
    Ok(Copied::Complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Fields;
    use crate::locate::locate_layer;
    use crate::reconstruct::reconstruct_state;

    const SOURCE: &str = "\
;FLAVOR:Marlin
M140 S60
M104 S210
M190 S60
M109 S210
G28 X0 Y0
G28 Z0
M82 ;absolute extrusion mode
G92 E0
;LAYER_COUNT:3
;LAYER:0
G1 X10.5 Y20.25 Z0.2 E1.5
;LAYER:1
G1 X11.0 Y21.0 Z0.4 E2.5
;LAYER:2
G1 X12.0 E3.0
M84
";

    fn render(config: &ResumeConfig, layer: u32) -> String {
        let document = GcodeDocument::from_text(SOURCE);
        let bounds = locate_layer(&document, layer).unwrap();
        let fields = Fields::new(config.numeric_policy);
        let state = reconstruct_state(&document, &bounds, &fields).unwrap();
        let mut out = Vec::new();
        write_preamble(&mut out, &document, &bounds, &state, config).unwrap();
        assert_eq!(write_tail(&mut out, &document, &bounds, None).unwrap(), Copied::Complete);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn full_output() {
        let expected = "\
M117 Start heating ...
M104 S210 ; Set the nozzle temperature
M109 S210 ; Wait for the nozzle temperature to reach the target
M117 Unstuck Extruder
G92 Z0 ; Set the current Z position as zero
G1 Z5 F3000 ; Lift the nozzle
M117 Homing X/Y ...
G28 X Y ; Home the X and Y axes
M117 Homing Z ...
G28 Z ; Home the Z axis
;FLAVOR:Marlin
M82 ;absolute extrusion mode
G92 E0
;LAYER_COUNT:3
M117 Resuming Z ...
G0 Z2.4 F3000; Move the extruder Z to the last position before the specified layer
M117 Resuming X/Y ...
G0 X11.0 Y21.0; Move the extruder X Y to the last position before the specified layer
M117 Resuming Extruder ...
G92 E2.5 ; Set the current extruder value
M117 Resuming from 2...
;LAYER:2
G1 X12.0 E3.0
M84
";
        assert_eq!(render(&ResumeConfig::default(), 2), expected);
    }

    #[test]
    fn replay_has_no_skipped_commands() {
        let config = ResumeConfig::default();
        let out = render(&config, 1);
        let replay_start = out.find("G28 Z ; Home the Z axis\n").unwrap();
        let replay_end = out.find("M117 Resuming Z ...").unwrap();
        for line in out[replay_start..replay_end].lines().skip(1) {
            assert!(!config.is_skipped(line), "{}", line);
        }
    }

    #[test]
    fn tail_is_verbatim_suffix() {
        let out = render(&ResumeConfig::default(), 1);
        let marker = SOURCE.find(";LAYER:1\n").unwrap();
        assert!(out.ends_with(&SOURCE[marker..]));
    }

    #[test]
    fn heat_bed_adds_bed_commands_first() {
        let config = ResumeConfig {
            heat_bed: true,
            ..ResumeConfig::default()
        };
        let out = render(&config, 1);
        let lines: Vec<&str> = out.lines().take(4).collect();
        assert_eq!(
            lines,
            [
                "M117 Start heating ...",
                "M140 S60 ; Set the bed temperature",
                "M190 S60 ; Wait for the bed temperature to reach the target",
                "M104 S210 ; Set the nozzle temperature",
            ]
        );
    }

    #[test]
    fn custom_lift_and_offset() {
        let config = ResumeConfig {
            lift_height: 10.0,
            lift_feed_rate: 1200,
            resume_z_offset: 1.5,
            resume_z_feed_rate: 600,
            ..ResumeConfig::default()
        };
        let out = render(&config, 1);
        assert!(out.contains("G1 Z10 F1200 ; Lift the nozzle\n"));
        assert!(out.contains("G0 Z1.7 F600;"));
    }

    #[test]
    fn cancelled_before_first_line() {
        let document = GcodeDocument::from_text(SOURCE);
        let bounds = locate_layer(&document, 1).unwrap();
        let cancel = AtomicBool::new(true);
        let mut out = Vec::new();
        let copied = write_tail(&mut out, &document, &bounds, Some(&cancel)).unwrap();
        assert_eq!(copied, Copied::Cancelled);
        assert!(out.is_empty());
    }
}
