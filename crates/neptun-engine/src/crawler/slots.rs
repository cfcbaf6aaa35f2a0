//! Classification of slot card text into observations versus "no data".

use std::sync::LazyLock;

use regex::Regex;

/// Full-text phrases meaning the portal published no data for the slot.
/// These are skipped entirely: emitting them as zero capacity would
/// misrepresent "no data" as "zero spots left".
const NO_AVAILABILITY_PHRASES: [&str; 4] = [
    "nu sunt locuri disponibile",
    "nu mai sunt locuri disponibile",
    "nu exista locuri disponibile",
    "indisponibil",
];

/// Canonical `HH:MM - HH:MM` time range, optionally preceded on its line by
/// a group-label token.
static TIME_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}:\d{2})\s*-\s*(\d{1,2}:\d{2})").unwrap());

/// The available-count marker line.
static SPOTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)locuri\s+disponibile\s*:\s*(\d+)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSlot {
    pub time_label: String,
    pub spots_available: u32,
}

/// Parse one slot card's text blob.
///
/// Lines are scanned independently: the first line carrying a time range
/// sets the label (normalized to `HH:MM - HH:MM`), the first line carrying
/// the available-count marker sets the count (0 when absent or
/// unparsable). A blob matching a known no-availability phrase yields
/// `None`, as does a blob with no time range at all.
pub fn parse_slot_text(text: &str) -> Option<ParsedSlot> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_lowercase();
    if NO_AVAILABILITY_PHRASES.iter().any(|p| lower == *p) {
        return None;
    }

    let mut time_label = None;
    let mut spots = 0u32;
    for line in trimmed.lines() {
        if time_label.is_none()
            && let Some(caps) = TIME_RANGE_RE.captures(line)
        {
            time_label = Some(format!("{} - {}", &caps[1], &caps[2]));
        }
        if let Some(caps) = SPOTS_RE.captures(line) {
            spots = caps[1].parse().unwrap_or(0);
        }
    }

    time_label.map(|time_label| ParsedSlot {
        time_label,
        spots_available: spots,
    })
}
