use std::fmt::Display;

use chrono::{Datelike, Local, Months, NaiveDate};

use crate::types::DevelopmentApplication;

/// One calendar month of lodgement dates.
///
/// The portal's search only behaves for windows of about a month. Anything
/// wider comes back empty instead of truncated, so runs always search a
/// single month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    first: NaiveDate,
    last: NaiveDate,
}

impl MonthRange {
    pub fn containing(date: NaiveDate) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self { first, last }
    }

    pub fn first(&self) -> NaiveDate {
        self.first
    }

    pub fn last(&self) -> NaiveDate {
        self.last
    }

    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    pub fn for_month(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self::containing)
    }

    /// Fields the portal's own search page sends for a lodgement date search.
    pub fn form_fields(&self) -> [(&'static str, String); 4] {
        [
            (
                "dateFrom",
                self.first.format(crate::PORTAL_DATE_FORMAT).to_string(),
            ),
            (
                "dateTo",
                self.last.format(crate::PORTAL_DATE_FORMAT).to_string(),
            ),
            ("lodgeRangeType", "on".to_string()),
            ("searchMode", "A".to_string()),
        ]
    }
}

impl Display for MonthRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.first, self.last)
    }
}

pub fn comment_url(feedback_url: &str, council_reference: &str) -> String {
    let subject = format!("Development Application Enquiry: {}", council_reference);
    format!("{}?subject={}", feedback_url, urlencoding::encode(&subject))
}

/// Outcome of fetching every detail page of one search.
#[derive(Debug, Default)]
pub struct RunReport {
    pub applications: Vec<DevelopmentApplication>,
    /// Pages that parsed but carried no council reference.
    pub skipped: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.applications.len() + self.skipped + self.failed
    }
}

impl Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nSummary:")?;
        writeln!(f, "  Applications:  {}", self.applications.len())?;
        writeln!(f, "  Skipped pages: {}", self.skipped)?;
        writeln!(f, "  Failed pages:  {}", self.failed)?;
        writeln!(f, "  Total pages:   {}", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_range_covers_whole_month() {
        let range = MonthRange::containing(date(2024, 3, 17));
        assert_eq!(range.first(), date(2024, 3, 1));
        assert_eq!(range.last(), date(2024, 3, 31));
    }

    #[test]
    fn test_month_range_month_lengths() {
        let cases = [
            (date(2023, 2, 14), date(2023, 2, 28)),
            (date(2024, 2, 1), date(2024, 2, 29)),
            (date(1900, 2, 10), date(1900, 2, 28)),
            (date(2000, 2, 29), date(2000, 2, 29)),
            (date(2024, 4, 30), date(2024, 4, 30)),
            (date(2024, 9, 1), date(2024, 9, 30)),
            (date(2024, 12, 25), date(2024, 12, 31)),
            (date(2025, 1, 31), date(2025, 1, 31)),
        ];
        for (day, expected_last) in cases {
            let range = MonthRange::containing(day);
            assert_eq!(range.last(), expected_last, "last day for {}", day);
            assert_eq!(range.first().month(), day.month());
            assert_eq!(range.first().day(), 1);
        }
    }

    #[test]
    fn test_month_range_end_is_last_day_for_every_day_of_a_leap_year() {
        let mut day = date(2024, 1, 1);
        while day.year() == 2024 {
            let range = MonthRange::containing(day);
            assert_eq!(range.last().month(), day.month());
            assert_ne!(range.last().succ_opt().unwrap().month(), day.month());
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_month_range_never_spans_two_months() {
        let mut day = date(2023, 11, 15);
        while day < date(2024, 4, 1) {
            let range = MonthRange::containing(day);
            assert_eq!(range.first().month(), range.last().month());
            assert_eq!(range.first().year(), range.last().year());
            assert_eq!(MonthRange::containing(range.last()), range);
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_for_month_rejects_invalid_month() {
        assert!(MonthRange::for_month(2024, 13).is_none());
        assert_eq!(
            MonthRange::for_month(2024, 2).unwrap().last(),
            date(2024, 2, 29)
        );
    }

    #[test]
    fn test_form_fields_use_portal_date_format() {
        let fields = MonthRange::containing(date(2024, 3, 5)).form_fields();
        assert_eq!(
            fields,
            [
                ("dateFrom", "01/03/2024".to_string()),
                ("dateTo", "31/03/2024".to_string()),
                ("lodgeRangeType", "on".to_string()),
                ("searchMode", "A".to_string()),
            ]
        );
    }

    #[test]
    fn test_comment_url_percent_encodes_subject() {
        assert_eq!(
            comment_url("mailto:townplanner@cairns.qld.gov.au", "8/2024/123"),
            "mailto:townplanner@cairns.qld.gov.au?subject=Development%20Application%20Enquiry%3A%208%2F2024%2F123"
        );
    }

    #[test]
    fn test_run_report_totals() {
        let report = RunReport {
            applications: Vec::new(),
            skipped: 2,
            failed: 1,
        };
        assert_eq!(report.total(), 3);
        assert!(report.to_string().contains("Failed pages:  1"));
    }
}
