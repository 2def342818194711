//! Cell status codes in engine output.

use std::fmt;

/// What the engine decided about a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellStatus {
    Safe,
    /// Primary unsafe: failed a safety rule.
    Unsafe,
    Protected,
    /// Suppressed to protect another cell.
    SecondaryUnsafe,
    Empty,
    Unknown,
}

impl CellStatus {
    pub const ALL: [CellStatus; 6] = [
        Self::Safe,
        Self::Unsafe,
        Self::Protected,
        Self::SecondaryUnsafe,
        Self::Empty,
        Self::Unknown,
    ];

    pub fn letter(self) -> &'static str {
        match self {
            Self::Safe => "S",
            Self::Unsafe => "U",
            Self::Protected => "P",
            Self::SecondaryUnsafe => "M",
            Self::Empty => "Z",
            Self::Unknown => "?",
        }
    }

    /// Cells whose value must not be published.
    pub fn is_suppressed(self) -> bool {
        matches!(self, Self::Unsafe | Self::SecondaryUnsafe)
    }
}

impl fmt::Display for CellStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Safe => "safe",
            Self::Unsafe => "unsafe",
            Self::Protected => "protected",
            Self::SecondaryUnsafe => "secondary unsafe",
            Self::Empty => "empty",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Maps a numeric status code; codes outside the known ranges are
/// [`CellStatus::Unknown`].
pub fn decode_status(code: i64) -> CellStatus {
    match code {
        1 | 2 => CellStatus::Safe,
        3..=6 | 9 => CellStatus::Unsafe,
        10 => CellStatus::Protected,
        11 | 12 => CellStatus::SecondaryUnsafe,
        13 | 14 => CellStatus::Empty,
        _ => CellStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(decode_status(1), CellStatus::Safe);
        assert_eq!(decode_status(2), CellStatus::Safe);
        assert_eq!(decode_status(9), CellStatus::Unsafe);
        assert_eq!(decode_status(10), CellStatus::Protected);
        assert_eq!(decode_status(11), CellStatus::SecondaryUnsafe);
        assert_eq!(decode_status(13), CellStatus::Empty);
    }

    #[test]
    fn gaps_and_out_of_range_are_unknown() {
        for code in [0, 7, 8, 15, 77, -1] {
            assert_eq!(decode_status(code), CellStatus::Unknown, "code {code}");
        }
    }

    #[test]
    fn letters() {
        let letters: Vec<&str> = CellStatus::ALL.iter().copied().map(CellStatus::letter).collect();
        assert_eq!(letters, vec!["S", "U", "P", "M", "Z", "?"]);
    }
}
