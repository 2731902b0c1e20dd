use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::recording::Recording;
use crate::models::user::User;
use crate::stats::compute::UserWithStats;

const NA: &str = "N/A";

pub const USER_HEADERS: [&str; 21] = [
    "Name",
    "Email",
    "Role",
    "Status",
    "Join Date",
    "Profile Complete",
    "Age",
    "Gender",
    "Phone Number",
    "Location",
    "Educational Background",
    "Employment Status",
    "Language Dialect",
    "Languages",
    "Total Recordings",
    "Approved Recordings",
    "Rejected Recordings",
    "Total Reviews",
    "Approved Reviews",
    "Rejected Reviews",
    "Accuracy Rate",
];

pub const RECORDING_HEADERS: [&str; 10] = [
    "Contributor",
    "Contributor Email",
    "Sentence",
    "Duration (s)",
    "Status",
    "Reviewer",
    "Review Date",
    "Created Date",
    "Quality",
    "Audio URL",
];

/// Quotes a field containing a comma, quote or line break, doubling quotes.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let line: Vec<String> = fields.iter().map(|f| escape_field(f.as_ref())).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn or_na(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NA.to_string(),
    }
}

fn date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

pub fn users_csv(rows: &[UserWithStats]) -> String {
    let mut out = String::new();
    write_row(&mut out, &USER_HEADERS);
    for UserWithStats { user, stats } in rows {
        let languages = match &user.languages {
            Some(langs) if !langs.is_empty() => langs.join("; "),
            _ => NA.to_string(),
        };
        write_row(
            &mut out,
            &[
                or_na(user.name.as_deref()),
                user.email.clone(),
                user.role.as_str().to_string(),
                user.status.as_str().to_string(),
                date(user.created_at),
                yes_no(user.profile_complete),
                or_na(user.age.as_deref()),
                or_na(user.gender.as_deref()),
                or_na(user.phone_number.as_deref()),
                or_na(user.location.as_deref()),
                or_na(user.educational_background.as_deref()),
                or_na(user.employment_status.as_deref()),
                or_na(user.language_dialect.as_deref()),
                languages,
                stats.total_recordings.to_string(),
                stats.approved_recordings.to_string(),
                stats.rejected_recordings.to_string(),
                stats.total_reviews.to_string(),
                stats.approved_reviews.to_string(),
                stats.rejected_reviews.to_string(),
                format!("{:.1}%", stats.accuracy_rate),
            ],
        );
    }
    out
}

pub fn recordings_csv(recordings: &[Recording], users: &HashMap<Uuid, &User>) -> String {
    let mut out = String::new();
    write_row(&mut out, &RECORDING_HEADERS);
    for recording in recordings {
        let contributor = users.get(&recording.user_id);
        let reviewer = recording
            .reviewed_by
            .and_then(|id| users.get(&id))
            .map(|u| u.display_name().to_string())
            .unwrap_or_else(|| "Not reviewed".to_string());
        write_row(
            &mut out,
            &[
                or_na(contributor.and_then(|u| u.name.as_deref())),
                or_na(contributor.map(|u| u.email.as_str())),
                recording.sentence.clone(),
                format!("{:.1}", recording.duration),
                recording.status.as_str().to_string(),
                reviewer,
                recording.reviewed_at.map(date).unwrap_or_else(|| NA.to_string()),
                date(recording.created_at),
                recording.quality.as_str().to_string(),
                yes_no(!recording.audio_url.is_empty()),
            ],
        );
    }
    out
}

pub fn export_filename(kind: &str, today: NaiveDate) -> String {
    format!("{kind}_export_{}.csv", today.format("%Y-%m-%d"))
}
