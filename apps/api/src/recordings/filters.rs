use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::models::recording::{Recording, RecordingStatus};
use crate::models::review::{Decision, ReviewWithRecording};

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    #[default]
    All,
    Today,
    Week,
    Month,
    Quarter,
}

impl DateRange {
    /// `today` means the same calendar day as `now`; the others are rolling
    /// windows of 7, 30 and 90 days.
    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let window = match self {
            DateRange::All => return true,
            DateRange::Today => return at.date_naive() == now.date_naive(),
            DateRange::Week => Duration::days(7),
            DateRange::Month => Duration::days(30),
            DateRange::Quarter => Duration::days(90),
        };
        at >= now - window
    }
}

/// Dashboard tab. `submitted` shows everything the user sent.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    All,
    Submitted,
    Approved,
    Rejected,
}

/// `all` or one concrete status/decision.
#[derive(Debug, Clone)]
pub struct StatusFilter(pub Option<String>);

impl StatusFilter {
    fn matches(&self, value: &str) -> bool {
        match self.0.as_deref() {
            None | Some("") | Some("all") => true,
            Some(wanted) => wanted == value,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardFilter {
    #[serde(default)]
    pub tab: Tab,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub range: DateRange,
    #[serde(default)]
    pub search: Option<String>,
}

impl DashboardFilter {
    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// The status filter only applies on the `all` tab.
    fn status_filter(&self) -> StatusFilter {
        match self.tab {
            Tab::All => StatusFilter(self.status.clone()),
            _ => StatusFilter(None),
        }
    }

    pub fn apply_to_recordings(&self, recordings: Vec<Recording>, now: DateTime<Utc>) -> Vec<Recording> {
        let status = self.status_filter();
        let search = self.search_term();
        recordings
            .into_iter()
            .filter(|r| match self.tab {
                Tab::Approved => r.status == RecordingStatus::Approved,
                Tab::Rejected => r.status == RecordingStatus::Rejected,
                Tab::All | Tab::Submitted => true,
            })
            .filter(|r| status.matches(r.status.as_str()))
            .filter(|r| self.range.contains(r.created_at, now))
            .filter(|r| match &search {
                Some(term) => {
                    r.sentence.to_lowercase().contains(term)
                        || r.status.as_str().contains(term.as_str())
                        || r.quality.as_str().contains(term.as_str())
                }
                None => true,
            })
            .collect()
    }

    /// Same rules over a reviewer's history, keyed on the decision.
    pub fn apply_to_reviews(
        &self,
        reviews: Vec<ReviewWithRecording>,
        now: DateTime<Utc>,
    ) -> Vec<ReviewWithRecording> {
        let status = self.status_filter();
        let search = self.search_term();
        reviews
            .into_iter()
            .filter(|r| match self.tab {
                Tab::Approved => r.review.decision == Decision::Approved,
                Tab::Rejected => r.review.decision == Decision::Rejected,
                Tab::All | Tab::Submitted => true,
            })
            .filter(|r| status.matches(r.review.decision.as_str()))
            .filter(|r| self.range.contains(r.review.created_at, now))
            .filter(|r| match &search {
                Some(term) => {
                    r.recording
                        .as_ref()
                        .is_some_and(|rec| rec.sentence.to_lowercase().contains(term))
                        || r.review.decision.as_str().contains(term.as_str())
                        || r.review
                            .notes
                            .as_deref()
                            .is_some_and(|n| n.to_lowercase().contains(term))
                }
                None => true,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recording::fixtures::recording;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn sample() -> Vec<Recording> {
        let user = Uuid::new_v4();
        let mut today = recording(user, "Oganda maduong", RecordingStatus::Approved);
        today.created_at = now() - Duration::hours(2);
        let mut last_week = recording(user, "Chiemo ni mit", RecordingStatus::Rejected);
        last_week.created_at = now() - Duration::days(5);
        let mut last_month = recording(user, "Koth biro", RecordingStatus::Pending);
        last_month.created_at = now() - Duration::days(20);
        let mut old = recording(user, "Nyathi ringo", RecordingStatus::Approved);
        old.created_at = now() - Duration::days(60);
        vec![today, last_week, last_month, old]
    }

    fn sentences(recordings: &[Recording]) -> Vec<&str> {
        recordings.iter().map(|r| r.sentence.as_str()).collect()
    }

    #[test]
    fn test_date_ranges() {
        let at = now() - Duration::days(8);
        assert!(DateRange::All.contains(at, now()));
        assert!(!DateRange::Week.contains(at, now()));
        assert!(DateRange::Month.contains(at, now()));
        assert!(DateRange::Today.contains(now() - Duration::hours(11), now()));
        assert!(!DateRange::Today.contains(now() - Duration::hours(13), now()));
    }

    #[test]
    fn test_tab_filters() {
        let filter = DashboardFilter {
            tab: Tab::Approved,
            ..Default::default()
        };
        assert_eq!(
            sentences(&filter.apply_to_recordings(sample(), now())),
            vec!["Oganda maduong", "Nyathi ringo"]
        );

        let submitted = DashboardFilter {
            tab: Tab::Submitted,
            ..Default::default()
        };
        assert_eq!(submitted.apply_to_recordings(sample(), now()).len(), 4);
    }

    #[test]
    fn test_status_only_applies_on_all_tab() {
        let on_all = DashboardFilter {
            status: Some("pending".to_string()),
            ..Default::default()
        };
        assert_eq!(
            sentences(&on_all.apply_to_recordings(sample(), now())),
            vec!["Koth biro"]
        );

        let on_rejected = DashboardFilter {
            tab: Tab::Rejected,
            status: Some("pending".to_string()),
            ..Default::default()
        };
        assert_eq!(
            sentences(&on_rejected.apply_to_recordings(sample(), now())),
            vec!["Chiemo ni mit"]
        );
    }

    #[test]
    fn test_range_and_search() {
        let filter = DashboardFilter {
            range: DateRange::Month,
            search: Some("  KOTH ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            sentences(&filter.apply_to_recordings(sample(), now())),
            vec!["Koth biro"]
        );
    }

    #[test]
    fn test_query_string_parsing() {
        let filter: DashboardFilter =
            serde_json::from_value(serde_json::json!({ "tab": "rejected", "range": "quarter" }))
                .unwrap();
        assert_eq!(filter.tab, Tab::Rejected);
        assert_eq!(filter.range, DateRange::Quarter);
        assert!(filter.status.is_none());
    }
}
