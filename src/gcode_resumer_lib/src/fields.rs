use regex::Regex;

use crate::error::{Axis, ResumeError};
use crate::{Celsius, LineIndex, Mm};

pub const LAYER_COUNT_MARKER: &str = ";LAYER_COUNT";
pub const LAYER_MARKER: &str = ";LAYER:";

/// Which number tokens count as a coordinate.
///
/// Scientific notation is never accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericPolicy {
    /// Accept a leading `-`, so `X-5.2` is recovered instead of skipped.
    pub allow_sign: bool,
    /// Accept `X10` as well as `X10.0`. With this off only `digits.digits` matches.
    pub allow_integer: bool,
}

impl Default for NumericPolicy {
    fn default() -> Self {
        NumericPolicy {
            allow_sign: false,
            allow_integer: true,
        }
    }
}

impl NumericPolicy {
    fn pattern(&self) -> String {
        let sign = if self.allow_sign { "-?" } else { "" };
        let digits = if self.allow_integer {
            r"\d+(?:\.\d+)?"
        } else {
            r"\d+\.\d+"
        };
        format!("{}{}", sign, digits)
    }
}

/// A positional value as it appeared in the source, plus what it parses to.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisValue {
    pub literal: String,
    pub value: Mm,
}

/// All the line matchers one conversion run needs, compiled once.
#[derive(Debug)]
pub struct Fields {
    extrusion_move: Regex,
    e: Regex,
    z: Regex,
    x: Regex,
    y: Regex,
    set_nozzle_temp: Regex,
    wait_bed_temp: Regex,
}

fn axis_regex(letter: char, number: &str) -> Regex {
    Regex::new(&format!("{}(?<value>{})", letter, number)).expect("axis pattern is valid")
}

impl Fields {
    pub fn new(policy: NumericPolicy) -> Fields {
        let number = policy.pattern();
        Fields {
            extrusion_move: Regex::new(r"^G1(?:\s|$)").expect("G1 pattern is valid"),
            e: axis_regex('E', &number),
            z: axis_regex('Z', &number),
            x: axis_regex('X', &number),
            y: axis_regex('Y', &number),
            set_nozzle_temp: Regex::new(r"M104 S(?<value>\d+)").expect("M104 pattern is valid"),
            wait_bed_temp: Regex::new(r"M190 S(?<value>\d+)").expect("M190 pattern is valid"),
        }
    }

    pub fn is_layer_count(line: &str) -> bool {
        line.starts_with(LAYER_COUNT_MARKER)
    }

    // Literal prefix, so layer 1 also matches ";LAYER:10". Layers appear in order, so the first
    // hit is still layer 1.
    pub fn is_layer_start(line: &str, layer: u32) -> bool {
        line.strip_prefix(LAYER_MARKER)
            .is_some_and(|rest| rest.starts_with(&layer.to_string()))
    }

    pub fn is_extrusion_move(&self, line: &str) -> bool {
        self.extrusion_move.is_match(line)
    }

    /// First value for `axis` on the line. E only counts on an extrusion move.
    pub fn axis(
        &self,
        axis: Axis,
        line: &str,
        index: LineIndex,
    ) -> Result<Option<AxisValue>, ResumeError> {
        let re = match axis {
            Axis::E => {
                if !self.is_extrusion_move(line) {
                    return Ok(None);
                }
                &self.e
            }
            Axis::Z => &self.z,
            Axis::X => &self.x,
            Axis::Y => &self.y,
        };
        let Some(captures) = re.captures(line) else {
            return Ok(None);
        };
        let literal = &captures["value"];
        let value = literal.parse::<Mm>().map_err(|_| malformed(axis.letter().to_string(), line, index))?;
        Ok(Some(AxisValue {
            literal: literal.to_owned(),
            value,
        }))
    }

    pub fn nozzle_temp(&self, line: &str, index: LineIndex) -> Result<Option<Celsius>, ResumeError> {
        temperature(&self.set_nozzle_temp, "M104 S", line, index)
    }

    pub fn bed_temp(&self, line: &str, index: LineIndex) -> Result<Option<Celsius>, ResumeError> {
        temperature(&self.wait_bed_temp, "M190 S", line, index)
    }
}

fn temperature(
    re: &Regex,
    field: &str,
    line: &str,
    index: LineIndex,
) -> Result<Option<Celsius>, ResumeError> {
    let Some(captures) = re.captures(line) else {
        return Ok(None);
    };
    captures["value"]
        .parse::<Celsius>()
        .map(Some)
        .map_err(|_| malformed(field.to_owned(), line, index))
}

fn malformed(field: String, line: &str, index: LineIndex) -> ResumeError {
    ResumeError::MalformedNumericField {
        line_number: index + 1,
        line: line.to_owned(),
        field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(fields: &Fields, axis: Axis, line: &str) -> Option<String> {
        fields.axis(axis, line, 0).unwrap().map(|v| v.literal)
    }

    #[test]
    fn layer_markers() {
        assert!(Fields::is_layer_count(";LAYER_COUNT:120"));
        assert!(!Fields::is_layer_count(";LAYER:0"));
        assert!(Fields::is_layer_start(";LAYER:12", 12));
        assert!(!Fields::is_layer_start(";LAYER:012", 12));
        assert!(!Fields::is_layer_start("; LAYER:12", 12));
        assert!(!Fields::is_layer_start(";LAYER_COUNT:12", 12));
    }

    #[test]
    fn extrusion_value_needs_g1() {
        let fields = Fields::new(NumericPolicy::default());
        assert_eq!(literal(&fields, Axis::E, "G1 X1.0 E3.25"), Some("3.25".into()));
        assert_eq!(literal(&fields, Axis::E, "G0 X1.0 E3.25"), None);
        assert_eq!(literal(&fields, Axis::E, "G10 E3.25"), None);
        assert_eq!(literal(&fields, Axis::E, "G92 E0"), None);
    }

    #[test]
    fn position_on_any_command() {
        let fields = Fields::new(NumericPolicy::default());
        assert_eq!(literal(&fields, Axis::Z, "G0 F9000 Z1.4"), Some("1.4".into()));
        assert_eq!(literal(&fields, Axis::X, "G0 X105.2 Y88.7"), Some("105.2".into()));
        assert_eq!(literal(&fields, Axis::Y, "G0 X105.2 Y88.7"), Some("88.7".into()));
        assert_eq!(literal(&fields, Axis::X, "G1 Y2.0"), None);
    }

    #[test]
    fn decimal_only_policy_skips_integers() {
        let fields = Fields::new(NumericPolicy {
            allow_sign: false,
            allow_integer: false,
        });
        assert_eq!(literal(&fields, Axis::X, "G1 X10 Y10.5"), None);
        assert_eq!(literal(&fields, Axis::Y, "G1 X10 Y10.5"), Some("10.5".into()));
    }

    #[test]
    fn sign_policy() {
        let unsigned = Fields::new(NumericPolicy::default());
        // "-5.2" is not a number token, so nothing follows the X directly
        assert_eq!(literal(&unsigned, Axis::X, "G1 X-5.2"), None);

        let signed = Fields::new(NumericPolicy {
            allow_sign: true,
            allow_integer: true,
        });
        let x = signed.axis(Axis::X, "G1 X-5.2", 0).unwrap().unwrap();
        assert_eq!(x.literal, "-5.2");
        assert_eq!(x.value, -5.2);
    }

    #[test]
    fn temperatures() {
        let fields = Fields::new(NumericPolicy::default());
        assert_eq!(fields.nozzle_temp("M104 S215", 0).unwrap(), Some(215));
        assert_eq!(fields.nozzle_temp("M109 S215", 0).unwrap(), None);
        assert_eq!(fields.bed_temp("M190 S60 ; wait", 0).unwrap(), Some(60));
        assert_eq!(fields.bed_temp("M140 S60", 0).unwrap(), None);
    }

    #[test]
    fn oversized_temperature_is_malformed() {
        let fields = Fields::new(NumericPolicy::default());
        let err = fields.nozzle_temp("M104 S99999999999", 4).unwrap_err();
        match err {
            ResumeError::MalformedNumericField { line_number, field, .. } => {
                assert_eq!(line_number, 5);
                assert_eq!(field, "M104 S");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
