use serde::{Deserialize, Serialize};

/// Business-line segments a lead can belong to. The set is fixed at startup;
/// the wire value doubles as the callback-data suffix (`seg_<segment>`) and as
/// the `segment` column value on persisted leads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Specialist,
    Business,
    Event,
    Teambuilding,
}

impl Segment {
    pub const ALL: [Segment; 4] =
        [Self::Specialist, Self::Business, Self::Event, Self::Teambuilding];

    /// Segment used when a brief completes without an explicit selection.
    pub const FALLBACK: Segment = Segment::Specialist;

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "specialist" => Some(Self::Specialist),
            "business" => Some(Self::Business),
            "event" => Some(Self::Event),
            "teambuilding" => Some(Self::Teambuilding),
            _ => None,
        }
    }

    pub fn is_known(raw: &str) -> bool {
        Self::parse(raw).is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Specialist => "specialist",
            Self::Business => "business",
            Self::Event => "event",
            Self::Teambuilding => "teambuilding",
        }
    }

    /// Operator-facing display title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Specialist => "Specialist / Expert",
            Self::Business => "Business",
            Self::Event => "Event",
            Self::Teambuilding => "Team building",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Segment;

    #[test]
    fn parse_accepts_all_wire_values() {
        for segment in Segment::ALL {
            assert_eq!(Segment::parse(segment.as_str()), Some(segment));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(Segment::parse("  Teambuilding "), Some(Segment::Teambuilding));
        assert_eq!(Segment::parse("BUSINESS"), Some(Segment::Business));
    }

    #[test]
    fn unknown_values_are_rejected_without_panicking() {
        assert!(!Segment::is_known("consulting"));
        assert!(!Segment::is_known(""));
        assert_eq!(Segment::parse("seg_business"), None);
    }

    #[test]
    fn titles_are_human_readable() {
        assert_eq!(Segment::Specialist.title(), "Specialist / Expert");
        assert_eq!(Segment::Teambuilding.title(), "Team building");
    }
}
