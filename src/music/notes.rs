use std::fmt;
use std::str::FromStr;

/// Lowest frequency kept in the note table (Hz).
pub const MIN_FREQ: f32 = 20.0;
/// Octaves 0..=9 are generated.
pub const OCTAVES: u32 = 10;

const A4_HZ: f32 = 440.0;
const A4_MIDI: i32 = 69;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Semitones above C.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_sharp(self) -> bool {
        self.name().ends_with('#')
    }

    /// Lenient lookup used for user input: unknown names mean "no pitch class".
    pub fn parse_lenient(s: &str) -> Option<PitchClass> {
        s.trim().parse().ok()
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PitchClass::ALL
            .iter()
            .copied()
            .find(|pc| pc.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown pitch class '{}'", s))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    /// Scientific pitch name, e.g. "C#4"
    pub name: String,
    pub frequency_hz: f32,
    pub pitch_class: PitchClass,
    /// 12·log2(frequency / floor); the vertical logical coordinate
    pub semitone_offset: f32,
}

/// Equal-tempered reference notes, ordered by increasing frequency.
#[derive(Clone, Debug)]
pub struct NoteTable {
    notes: Vec<Note>,
    min_freq: f32,
}

impl NoteTable {
    pub fn new(min_freq: f32, octaves: u32) -> Self {
        let mut notes = Vec::with_capacity(octaves as usize * 12);
        for octave in 0..octaves as i32 {
            for pc in PitchClass::ALL {
                let midi = pc.index() as i32 + (octave + 1) * 12;
                let frequency_hz = A4_HZ * 2f32.powf((midi - A4_MIDI) as f32 / 12.0);
                if frequency_hz < min_freq {
                    continue;
                }
                notes.push(Note {
                    name: format!("{}{}", pc.name(), octave),
                    frequency_hz,
                    pitch_class: pc,
                    semitone_offset: semitone_offset(frequency_hz, min_freq),
                });
            }
        }
        Self { notes, min_freq }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn min_freq(&self) -> f32 {
        self.min_freq
    }
}

impl Default for NoteTable {
    fn default() -> Self {
        Self::new(MIN_FREQ, OCTAVES)
    }
}

pub fn semitone_offset(frequency_hz: f32, min_freq: f32) -> f32 {
    12.0 * (frequency_hz / min_freq).log2()
}
