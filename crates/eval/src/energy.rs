use crate::errors::{EvalError, Result};

/// Words of the label preceding the energy value in the mission log
const ENERGY_LABEL: [&str; 3] = ["total", "energy", "consumption"];

/// Extracts the energy value of the first line matching
/// `Total energy consumption: <number>` in the given text.
///
/// The label is matched ignoring ASCII case and tolerating any amount of
/// whitespace between its words and around the colon. The number is a
/// non-negative decimal (`42`, `42.`, `42.5`), anything following it
/// (typically a unit) is ignored.
///
/// ```
/// use ubtune_eval::parse_energy;
///
/// let log = "Mission starts...\nTotal energy consumption: 42.5 kWh\n";
/// assert_eq!(42.5, parse_energy(log).unwrap());
/// ```
pub fn parse_energy(text: &str) -> Result<f64> {
    let lowered = text.to_ascii_lowercase();
    let bytes = lowered.as_bytes();
    let mut start = 0;
    while let Some(found) = lowered[start..].find(ENERGY_LABEL[0]) {
        let pos = start + found;
        if let Some(number) = match_at(bytes, pos) {
            // the label is ASCII so positions are the same in the original text
            let value: f64 = text[number.0..number.1]
                .parse()
                .map_err(|_| EvalError::InvalidValue(text[number.0..number.1].to_string()))?;
            if !value.is_finite() {
                return Err(EvalError::InvalidValue(text[number.0..number.1].to_string()));
            }
            return Ok(value);
        }
        start = pos + ENERGY_LABEL[0].len();
    }
    Err(EvalError::PatternNotFound(excerpt(text)))
}

/// Tries to match the label then a number at `pos`,
/// returns the byte range of the number.
fn match_at(bytes: &[u8], pos: usize) -> Option<(usize, usize)> {
    let mut i = pos;
    for (k, word) in ENERGY_LABEL.iter().enumerate() {
        if k > 0 {
            let skipped = skip_whitespace(bytes, i);
            if skipped == i {
                return None;
            }
            i = skipped;
        }
        if !bytes[i..].starts_with(word.as_bytes()) {
            return None;
        }
        i += word.len();
    }
    i = skip_whitespace(bytes, i);
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    i = skip_whitespace(bytes, i + 1);

    let begin = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    if i == begin {
        return None;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
    }
    Some((begin, i))
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    i
}

fn excerpt(text: &str) -> String {
    const MAX_CHARS: usize = 80;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        format!("{trimmed:?}")
    } else {
        let head: String = trimmed.chars().take(MAX_CHARS).collect();
        format!("{head:?}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_parse_energy() {
        let log = "New MAV connected with ID: 1\n...Total energy consumption: 42.5 kWh...";
        assert_abs_diff_eq!(42.5, parse_energy(log).unwrap());
    }

    #[test]
    fn test_parse_energy_variants() {
        assert_abs_diff_eq!(12.0, parse_energy("Total energy consumption:12").unwrap());
        assert_abs_diff_eq!(3.0, parse_energy("Total energy consumption: 3.").unwrap());
        assert_abs_diff_eq!(
            0.125,
            parse_energy("TOTAL  ENERGY\tconsumption :\n 0.125 J").unwrap()
        );
    }

    #[test]
    fn test_parse_first_valid_occurrence() {
        let log = "total energy consumption: n/a\nTotal energy consumption: 7.25\n\
                   Total energy consumption: 9.0\n";
        assert_abs_diff_eq!(7.25, parse_energy(log).unwrap());
    }

    #[test]
    fn test_pattern_not_found() {
        for log in [
            "",
            "Energy consumed: 0.000001 joules",
            "Total energy consumption: -3.0",
            "Total energy consumption: .5",
            "Totalenergy consumption: 1.0",
        ] {
            assert!(
                matches!(parse_energy(log), Err(EvalError::PatternNotFound(_))),
                "{log:?} should not match"
            );
        }
    }

    #[test]
    fn test_invalid_value() {
        let huge = format!("Total energy consumption: 1{}", "0".repeat(400));
        assert!(matches!(
            parse_energy(&huge),
            Err(EvalError::InvalidValue(_))
        ));
    }
}
