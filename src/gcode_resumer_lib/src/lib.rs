use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use tracing::{info, warn};

pub mod config;
pub mod document;
pub mod emit;
pub mod error;
pub mod fields;
pub mod locate;
pub mod reconstruct;

pub use config::ResumeConfig;
pub use document::GcodeDocument;
pub use error::{Axis, ResumeError};
pub use fields::{AxisValue, NumericPolicy};
pub use locate::{locate_layer, LayerBounds};
pub use reconstruct::{reconstruct_state, MachineState};

pub use emit::Copied;
use fields::Fields;

// Kept as plain aliases so a switch to f32 (or to newtypes) stays a one-line change.
pub type Mm = f64;
pub type Celsius = u32;
// mm/min
pub type FeedRate = u32;
pub type LineIndex = usize;

const OUTPUT_EXTENSION_CHARS: usize = 6;

/// `print.gcode` resumed at layer 42 becomes `print_start42.gcode`.
///
/// The suffix goes in before the last six characters, which is the extension for `.gcode`
/// files. Names shorter than that get the suffix in front.
pub fn output_path_for(source: &Path, layer: u32) -> PathBuf {
    let source = source.to_string_lossy();
    let char_count = source.chars().count();
    let split = source
        .char_indices()
        .nth(char_count.saturating_sub(OUTPUT_EXTENSION_CHARS))
        .map_or(source.len(), |(i, _)| i);
    let (stem, extension) = if char_count < OUTPUT_EXTENSION_CHARS {
        ("", source.as_ref())
    } else {
        source.split_at(split)
    };
    PathBuf::from(format!("{}_start{}{}", stem, layer, extension))
}

/// Everything the writer needs, worked out before any output exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumePlan {
    pub bounds: LayerBounds,
    pub state: MachineState,
}

pub fn plan_resume(
    document: &GcodeDocument,
    layer: u32,
    config: &ResumeConfig,
) -> Result<ResumePlan, ResumeError> {
    let fields = Fields::new(config.numeric_policy);
    let bounds = locate_layer(document, layer)?;
    let state = reconstruct_state(document, &bounds, &fields)?;
    Ok(ResumePlan { bounds, state })
}

/// Preamble plus tail into any writer. Returns `Cancelled` if `cancel` gets set mid-copy.
pub fn write_resumed<W: Write>(
    w: &mut W,
    document: &GcodeDocument,
    plan: &ResumePlan,
    config: &ResumeConfig,
    cancel: Option<&AtomicBool>,
) -> io::Result<Copied> {
    emit::write_preamble(w, document, &plan.bounds, &plan.state, config)?;
    let copied = emit::write_tail(w, document, &plan.bounds, cancel)?;
    w.flush()?;
    Ok(copied)
}

pub fn resume_file(
    source: &Path,
    layer: u32,
    destination: &Path,
    config: &ResumeConfig,
) -> Result<(), ResumeError> {
    resume_file_inner(source, layer, destination, config, None)
}

pub fn resume_file_with_cancel(
    source: &Path,
    layer: u32,
    destination: &Path,
    config: &ResumeConfig,
    cancel: &AtomicBool,
) -> Result<(), ResumeError> {
    resume_file_inner(source, layer, destination, config, Some(cancel))
}

// destination can be the same path as source, so nothing replaces it until the output is
// complete
fn resume_file_inner(
    source: &Path,
    layer: u32,
    destination: &Path,
    config: &ResumeConfig,
    cancel: Option<&AtomicBool>,
) -> Result<(), ResumeError> {
    let before_resume = Instant::now();
    info!(source = %source.display(), layer, "reading source");
    let document = GcodeDocument::load(source)?;
    let plan = plan_resume(&document, layer, config)?;

    let tmp_destination = tmp_path(destination);
    let write_failure = |source: io::Error| ResumeError::OutputWriteFailure {
        path: destination.to_path_buf(),
        source,
    };

    let copied = fs::File::create(&tmp_destination)
        .and_then(|file| {
            let mut buf_writer = io::BufWriter::with_capacity(64 * 1024, file);
            write_resumed(&mut buf_writer, &document, &plan, config, cancel)
        })
        .map_err(|e| {
            remove_partial(&tmp_destination);
            write_failure(e)
        })?;

    if copied == Copied::Cancelled {
        remove_partial(&tmp_destination);
        warn!(destination = %destination.display(), "cancelled, partial output removed");
        return Err(ResumeError::Cancelled);
    }

    fs::rename(&tmp_destination, destination).map_err(|e| {
        remove_partial(&tmp_destination);
        write_failure(e)
    })?;

    info!(
        destination = %destination.display(),
        lines = document.len() - plan.bounds.layer_start,
        elapsed = ?before_resume.elapsed(),
        "done writing resumed gcode"
    );
    Ok(())
}

fn tmp_path(destination: &Path) -> PathBuf {
    let mut tmp = destination.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove partial output");
        }
    }
}
