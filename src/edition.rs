//! Edition identifiers: the date-derived key for one day's issue.
//!
//! The reader service addresses everything by edition id — the manifest URL,
//! and by convention the staging directory and both storage object names.
//! The id is `prefix + DDMMYY` of the *publishing* date, which is the
//! current UTC time shifted back by a fixed cutoff offset: the paper that
//! goes out at 03:00 UTC still belongs to the previous day's issue.
//!
//! Everything here is pure — [`Edition::at`] takes the timestamp explicitly
//! so the id can be computed (and tested) for any instant; only
//! [`Edition::today`] reads the clock.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::fmt;

/// One day's issue, identified by its date-derived string key.
///
/// ```rust
/// use paperboy::Edition;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
/// let edition = Edition::for_date("mundo", date);
/// assert_eq!(edition.as_str(), "mundo050324");
/// assert_eq!(edition.pdf_object(), "mundo050324.pdf");
/// assert_eq!(edition.cover_object(), "cover_mundo050324.jpg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Edition(String);

impl Edition {
    /// Edition for an explicit publication date.
    pub fn for_date(prefix: &str, date: NaiveDate) -> Self {
        Edition(format!("{}{}", prefix, date.format("%d%m%y")))
    }

    /// Edition for an explicit instant, applying the publishing cutoff.
    ///
    /// The instant is shifted back by `cutoff_hours` before taking the date,
    /// so early-morning runs resolve to the previous day's issue.
    pub fn at(prefix: &str, instant: DateTime<Utc>, cutoff_hours: i64) -> Self {
        let shifted = instant - Duration::hours(cutoff_hours);
        Self::for_date(prefix, shifted.date_naive())
    }

    /// Today's edition, per the wall clock and the publishing cutoff.
    pub fn today(prefix: &str, cutoff_hours: i64) -> Self {
        Self::at(prefix, Utc::now(), cutoff_hours)
    }

    /// Wrap an already-known identifier (e.g. from a `--edition` flag).
    pub fn from_id(id: impl Into<String>) -> Self {
        Edition(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage object name for the full PDF.
    pub fn pdf_object(&self) -> String {
        format!("{}.pdf", self.0)
    }

    /// Storage object name for the cover thumbnail.
    pub fn cover_object(&self) -> String {
        format!("cover_{}.jpg", self.0)
    }

    /// Local filename of the bound PDF inside the staging directory.
    pub fn pdf_filename(&self) -> String {
        format!("{}.pdf", self.0)
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn id_is_prefix_plus_ddmmyy() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(Edition::for_date("mundo", date).as_str(), "mundo050324");
    }

    #[test]
    fn cutoff_shifts_early_morning_to_previous_day() {
        // 03:00 UTC on March 5th, 6 hour cutoff → still the March 4th issue.
        let instant = Utc.with_ymd_and_hms(2024, 3, 5, 3, 0, 0).unwrap();
        assert_eq!(Edition::at("mundo", instant, 6).as_str(), "mundo040324");
    }

    #[test]
    fn cutoff_keeps_midday_on_same_day() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(Edition::at("mundo", instant, 6).as_str(), "mundo050324");
    }

    #[test]
    fn cutoff_crosses_month_and_year_boundaries() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        assert_eq!(Edition::at("mundo", instant, 6).as_str(), "mundo311223");
    }

    #[test]
    fn object_names_derive_from_id() {
        let e = Edition::from_id("mundo050324");
        assert_eq!(e.pdf_object(), "mundo050324.pdf");
        assert_eq!(e.cover_object(), "cover_mundo050324.jpg");
        assert_eq!(e.pdf_filename(), "mundo050324.pdf");
    }
}
