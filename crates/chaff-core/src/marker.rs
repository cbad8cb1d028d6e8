//! The generated-functions marker protocol.
//!
//! The upstream compiler stamps its output with a comment line naming every
//! function it emitted; only those functions are safe to optimize. The
//! payload is a JSON string array, and the line is reproduced verbatim at
//! the end of our own output so it stays self-describing.

use crate::error::Error;

pub const GENERATED_FUNCTIONS_MARKER: &str = "// EMSCRIPTEN_GENERATED_FUNCTIONS:";

/// Find the marker line and parse its function list. `Ok(None)` when the
/// source carries no marker.
pub fn find(source: &str) -> Result<Option<Vec<String>>, Error> {
    for line in source.lines() {
        if let Some(payload) = line.trim_start().strip_prefix(GENERATED_FUNCTIONS_MARKER) {
            let names: Vec<String> = serde_json::from_str(payload.trim())?;
            return Ok(Some(names));
        }
    }
    Ok(None)
}

/// Render the marker line (without a trailing newline).
pub fn format(names: &[String]) -> String {
    let payload =
        serde_json::to_string(names).expect("a string list always serializes");
    format!("{GENERATED_FUNCTIONS_MARKER} {payload}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_marker_anywhere_in_the_file() {
        let source = "function f() {}\n// EMSCRIPTEN_GENERATED_FUNCTIONS: [\"f\", \"g\"]\n";
        let names = find(source).unwrap().unwrap();
        assert_eq!(names, vec!["f".to_string(), "g".to_string()]);
    }

    #[test]
    fn missing_marker_is_not_an_error() {
        assert!(find("function f() {}\n").unwrap().is_none());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let source = "// EMSCRIPTEN_GENERATED_FUNCTIONS: [\"f\",\n";
        assert!(matches!(find(source), Err(Error::Marker(_))));
    }

    #[test]
    fn format_round_trips_through_find() {
        let names = vec!["f".to_string(), "g$1".to_string()];
        let line = format(&names);
        assert_eq!(find(&line).unwrap().unwrap(), names);
    }
}
