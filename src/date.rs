use std::fmt;
use std::str::FromStr;

/// Month of a monthly dump file (`RC_YYYY-MM`), ordered chronologically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: u16,
    pub month: u8, // 1..=12
}

impl YearMonth {
    pub fn new(year: u16, month: u8) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Inclusive range check; open ends are unbounded.
    pub fn within(self, start: Option<YearMonth>, end: Option<YearMonth>) -> bool {
        start.map_or(true, |s| self >= s) && end.map_or(true, |e| self <= e)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s.split_once('-').ok_or("expected YYYY-MM")?;
        let year: u16 = y.parse().map_err(|_| "invalid year")?;
        let month: u8 = m.parse().map_err(|_| "invalid month")?;
        YearMonth::new(year, month).ok_or_else(|| "month must be 01..12".to_string())
    }
}
