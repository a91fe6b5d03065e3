//! the equal tempered note table and closest-note quantizer
//!
//! Built once at startup from A4 = 440 Hz and shared by every session.  The
//! labels are the solfège names the original scoring data was recorded with
//! ("La3", "Do5", ...), laid out octave by octave until the octave base runs
//! past the top of the vocal range.
use once_cell::sync::Lazy;

pub const CONCERT_A: f64 = 440.0;
/// Highest octave base frequency the table generator will start an octave at.
const TOP_OCTAVE_BASE: f64 = 900.0;

const NOTE_NAMES: [&str; 7] = ["La", "Si", "Do", "Re", "Mi", "Fa", "Sol"];

/// Label returned for a frequency that carries no pitch.
pub const UNKNOWN_NOTE: &str = "Unknown";

/// Process wide table, generated on first use and never rebuilt.
pub static NOTE_TABLE: Lazy<NoteFrequencyTable> = Lazy::new(NoteFrequencyTable::generate);

/// Ordered (label, frequency) pairs, ascending in frequency.
pub struct NoteFrequencyTable {
    notes: Vec<(String, f64)>,
}

impl NoteFrequencyTable {
    pub fn generate() -> NoteFrequencyTable {
        let c0 = CONCERT_A * 2.0f64.powf(-4.75);
        let mut notes = vec![];
        let mut octave = 0;
        let mut base = c0;
        while base <= TOP_OCTAVE_BASE {
            for (index, name) in NOTE_NAMES.iter().enumerate() {
                notes.push((
                    format!("{}{}", name, octave),
                    base * 2.0f64.powf(index as f64 / 12.0),
                ));
            }
            base *= 2.0;
            octave += 1;
        }
        NoteFrequencyTable { notes }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Frequency for a label, if the label exists.
    pub fn frequency_of(&self, label: &str) -> Option<f64> {
        self.notes
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, freq)| *freq)
    }

    pub fn notes(&self) -> &[(String, f64)] {
        &self.notes
    }

    /// Label whose frequency is closest to the input.  Ties go to the lower
    /// frequency (table iteration order).  Anything without a positive
    /// frequency quantizes to [`UNKNOWN_NOTE`].
    pub fn quantize(&self, frequency: f64) -> &str {
        if frequency <= 0.0 {
            return UNKNOWN_NOTE;
        }
        let mut best: &str = UNKNOWN_NOTE;
        let mut best_diff = f64::INFINITY;
        for (name, freq) in &self.notes {
            let diff = (freq - frequency).abs();
            if diff < best_diff {
                best_diff = diff;
                best = name;
            }
        }
        best
    }
}
