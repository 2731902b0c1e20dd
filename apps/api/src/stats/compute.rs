//! Pure statistics over wholesale-fetched rows. Every function takes "now"
//! explicitly so results are reproducible in tests.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::recording::{Recording, RecordingStatus};
use crate::models::review::{Decision, Review};
use crate::models::user::{Role, User, UserStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_users: usize,
    pub contributors: usize,
    /// Approved reviewers only.
    pub reviewers: usize,
    pub pending_reviewers: usize,
    pub total_recordings: usize,
    pub pending_recordings: usize,
    pub approved_recordings: usize,
    pub rejected_recordings: usize,
    pub total_reviews: usize,
    pub active_users: usize,
    /// Seconds.
    pub average_recording_duration: f64,
    /// Seconds.
    pub average_review_time: f64,
    pub total_recording_time: f64,
    pub total_review_time: f64,
    pub total_system_time: f64,
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

pub fn system_stats(users: &[User], recordings: &[Recording], reviews: &[Review]) -> SystemStats {
    let count_recordings =
        |status: RecordingStatus| recordings.iter().filter(|r| r.status == status).count();
    let total_recording_time: f64 = recordings.iter().map(|r| r.duration).sum();
    let total_review_time: f64 = reviews.iter().map(|r| r.time_spent as f64).sum();

    SystemStats {
        total_users: users.len(),
        contributors: users.iter().filter(|u| u.role == Role::Contributor).count(),
        reviewers: users.iter().filter(|u| u.is_approved_reviewer()).count(),
        pending_reviewers: users
            .iter()
            .filter(|u| u.role == Role::Reviewer && u.status == UserStatus::Pending)
            .count(),
        total_recordings: recordings.len(),
        pending_recordings: count_recordings(RecordingStatus::Pending),
        approved_recordings: count_recordings(RecordingStatus::Approved),
        rejected_recordings: count_recordings(RecordingStatus::Rejected),
        total_reviews: reviews.len(),
        active_users: users.iter().filter(|u| u.is_active).count(),
        average_recording_duration: mean(total_recording_time, recordings.len()),
        average_review_time: mean(total_review_time, reviews.len()),
        total_recording_time,
        total_review_time,
        total_system_time: total_recording_time + total_review_time,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: Uuid,
    pub total_recordings: usize,
    pub approved_recordings: usize,
    pub rejected_recordings: usize,
    pub pending_recordings: usize,
    pub total_reviews: usize,
    pub approved_reviews: usize,
    pub rejected_reviews: usize,
    pub average_review_time: f64,
    /// Percentage of reviews given with confidence above 80.
    pub accuracy_rate: f64,
    pub streak_days: u32,
    /// Minutes.
    pub total_time_contributed: f64,
    pub last_activity_at: DateTime<Utc>,
}

/// `recordings` are the ones the user made, `reviews` the ones they wrote.
pub fn user_stats(
    user_id: Uuid,
    recordings: &[&Recording],
    reviews: &[&Review],
    now: DateTime<Utc>,
) -> UserStats {
    let count_recordings =
        |status: RecordingStatus| recordings.iter().filter(|r| r.status == status).count();
    let count_reviews =
        |decision: Decision| reviews.iter().filter(|r| r.decision == decision).count();
    let confident = reviews.iter().filter(|r| r.confidence > 80).count();
    let review_time: f64 = reviews.iter().map(|r| r.time_spent as f64).sum();
    let seconds: f64 = recordings.iter().map(|r| r.duration).sum();

    UserStats {
        user_id,
        total_recordings: recordings.len(),
        approved_recordings: count_recordings(RecordingStatus::Approved),
        rejected_recordings: count_recordings(RecordingStatus::Rejected),
        pending_recordings: count_recordings(RecordingStatus::Pending),
        total_reviews: reviews.len(),
        approved_reviews: count_reviews(Decision::Approved),
        rejected_reviews: count_reviews(Decision::Rejected),
        average_review_time: mean(review_time, reviews.len()),
        accuracy_rate: mean(confident as f64 * 100.0, reviews.len()),
        streak_days: streak_days(recordings.iter().map(|r| r.created_at), now),
        total_time_contributed: seconds / 60.0,
        last_activity_at: now,
    }
}

/// Consecutive UTC days with at least one recording, counting back from the
/// day of `now`. Zero when nothing was recorded today.
pub fn streak_days(timestamps: impl IntoIterator<Item = DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    let days: HashSet<NaiveDate> =
        timestamps.into_iter().map(|t| t.date_naive()).collect();
    let mut day = now.date_naive();
    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Groups the rows per user once so stats for every user cost one pass.
pub struct StatsIndex<'a> {
    recordings: HashMap<Uuid, Vec<&'a Recording>>,
    reviews: HashMap<Uuid, Vec<&'a Review>>,
}

impl<'a> StatsIndex<'a> {
    pub fn build(recordings: &'a [Recording], reviews: &'a [Review]) -> Self {
        let mut by_user: HashMap<Uuid, Vec<&Recording>> = HashMap::new();
        for r in recordings {
            by_user.entry(r.user_id).or_default().push(r);
        }
        let mut by_reviewer: HashMap<Uuid, Vec<&Review>> = HashMap::new();
        for r in reviews {
            by_reviewer.entry(r.reviewer_id).or_default().push(r);
        }
        Self {
            recordings: by_user,
            reviews: by_reviewer,
        }
    }

    pub fn for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> UserStats {
        let recordings = self.recordings.get(&user_id).map(Vec::as_slice).unwrap_or(&[]);
        let reviews = self.reviews.get(&user_id).map(Vec::as_slice).unwrap_or(&[]);
        user_stats(user_id, recordings, reviews, now)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserWithStats {
    #[serde(flatten)]
    pub user: User,
    pub stats: UserStats,
}

pub fn top_contributors(
    users: Vec<User>,
    index: &StatsIndex<'_>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<UserWithStats> {
    let mut ranked: Vec<UserWithStats> = users
        .into_iter()
        .filter(|u| u.role == Role::Contributor)
        .map(|user| UserWithStats {
            stats: index.for_user(user.id, now),
            user,
        })
        .collect();
    ranked.sort_by(|a, b| b.stats.total_recordings.cmp(&a.stats.total_recordings));
    ranked.truncate(limit);
    ranked
}

/// Approved reviewers ranked by number of reviews.
pub fn top_reviewers(
    users: Vec<User>,
    index: &StatsIndex<'_>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<UserWithStats> {
    let mut ranked: Vec<UserWithStats> = users
        .into_iter()
        .filter(User::is_approved_reviewer)
        .map(|user| UserWithStats {
            stats: index.for_user(user.id, now),
            user,
        })
        .collect();
    ranked.sort_by(|a, b| b.stats.total_reviews.cmp(&a.stats.total_reviews));
    ranked.truncate(limit);
    ranked
}

// ──────────────────────────────────────────────────────────────
// Recent activity
// ──────────────────────────────────────────────────────────────

const ACTIVITY_PER_SOURCE: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ActivityData {
    Recording(Recording),
    Review(Review),
    UserJoined,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    #[serde(flatten)]
    pub data: ActivityData,
    pub user: User,
    pub timestamp: DateTime<Utc>,
}

/// Merges the newest recordings, reviews and non-admin signups, newest first.
/// All inputs must be sorted newest first. Entries whose user is gone are dropped.
pub fn recent_activity(
    users: &[User],
    recordings: &[Recording],
    reviews: &[Review],
    limit: usize,
) -> Vec<ActivityEntry> {
    let by_id: HashMap<Uuid, &User> = users.iter().map(|u| (u.id, u)).collect();
    let mut entries = Vec::new();

    for recording in recordings.iter().take(ACTIVITY_PER_SOURCE) {
        if let Some(user) = by_id.get(&recording.user_id) {
            entries.push(ActivityEntry {
                data: ActivityData::Recording(recording.clone()),
                user: (*user).clone(),
                timestamp: recording.created_at,
            });
        }
    }
    for review in reviews.iter().take(ACTIVITY_PER_SOURCE) {
        if let Some(user) = by_id.get(&review.reviewer_id) {
            entries.push(ActivityEntry {
                data: ActivityData::Review(review.clone()),
                user: (*user).clone(),
                timestamp: review.created_at,
            });
        }
    }
    for user in users.iter().take(ACTIVITY_PER_SOURCE) {
        if user.role != Role::Admin {
            entries.push(ActivityEntry {
                data: ActivityData::UserJoined,
                user: user.clone(),
                timestamp: user.created_at,
            });
        }
    }

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries.truncate(limit);
    entries
}

// ──────────────────────────────────────────────────────────────
// 7-day dashboard activity
// ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayActivity {
    pub date: NaiveDate,
    pub day_name: String,
    pub contributions: usize,
    pub max_contributions: usize,
    pub percentage: u32,
    pub trend: Trend,
}

/// Daily target shown against each role's activity.
pub fn daily_target(role: Role) -> usize {
    match role {
        Role::Contributor => 10,
        Role::Reviewer => 20,
        Role::Admin => 15,
    }
}

/// Activity for the 7 days ending on the day of `now`, oldest first.
/// Contributors count their recordings, reviewers their reviews and admins
/// everything.
pub fn weekly_activity(
    user: &User,
    recordings: &[Recording],
    reviews: &[Review],
    now: DateTime<Utc>,
) -> Vec<DayActivity> {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    let mut bump = |at: DateTime<Utc>| *per_day.entry(at.date_naive()).or_default() += 1;

    match user.role {
        Role::Contributor => recordings
            .iter()
            .filter(|r| r.user_id == user.id)
            .for_each(|r| bump(r.created_at)),
        Role::Reviewer => reviews
            .iter()
            .filter(|r| r.reviewer_id == user.id)
            .for_each(|r| bump(r.created_at)),
        Role::Admin => {
            recordings.iter().for_each(|r| bump(r.created_at));
            reviews.iter().for_each(|r| bump(r.created_at));
        }
    }

    let max = daily_target(user.role);
    let today = now.date_naive();
    let count = |day: NaiveDate| per_day.get(&day).copied().unwrap_or(0);

    (0..7)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let contributions = count(date);
            let trend = if offset == 6 || contributions >= count(date - Duration::days(1)) {
                Trend::Up
            } else {
                Trend::Down
            };
            DayActivity {
                date,
                day_name: date.format("%a").to_string(),
                contributions,
                max_contributions: max,
                percentage: ((contributions as f64 / max as f64) * 100.0).round() as u32,
                trend,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recording::fixtures::recording;
    use crate::models::review::fixtures::review;
    use crate::models::user::fixtures::user;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 14, 15, 30, 0).unwrap()
    }

    #[test]
    fn test_system_stats() {
        let contributor = user(Role::Contributor, UserStatus::Active);
        let reviewer = user(Role::Reviewer, UserStatus::Active);
        let pending = user(Role::Reviewer, UserStatus::Pending);
        let mut inactive = user(Role::Contributor, UserStatus::Active);
        inactive.is_active = false;

        let mut a = recording(contributor.id, "a", RecordingStatus::Approved);
        a.duration = 4.0;
        let mut b = recording(contributor.id, "b", RecordingStatus::Pending);
        b.duration = 6.0;
        let mut r = review(a.id, reviewer.id, Decision::Approved);
        r.time_spent = 10;

        let stats = system_stats(
            &[contributor, reviewer, pending, inactive],
            &[a, b],
            &[r],
        );
        assert_eq!(stats.total_users, 4);
        assert_eq!(stats.contributors, 2);
        assert_eq!(stats.reviewers, 1);
        assert_eq!(stats.pending_reviewers, 1);
        assert_eq!(stats.active_users, 3);
        assert_eq!(stats.pending_recordings, 1);
        assert_eq!(stats.approved_recordings, 1);
        assert_eq!(stats.average_recording_duration, 5.0);
        assert_eq!(stats.total_system_time, 20.0);
    }

    #[test]
    fn test_empty_system_stats_are_zero() {
        assert_eq!(system_stats(&[], &[], &[]), SystemStats::default());
    }

    #[test]
    fn test_user_stats_accuracy_and_minutes() {
        let uid = Uuid::new_v4();
        let mut r1 = recording(uid, "a", RecordingStatus::Approved);
        r1.duration = 90.0;
        let mut r2 = recording(uid, "b", RecordingStatus::Rejected);
        r2.duration = 30.0;
        let mut v1 = review(Uuid::new_v4(), uid, Decision::Approved);
        v1.confidence = 95;
        let mut v2 = review(Uuid::new_v4(), uid, Decision::Rejected);
        v2.confidence = 80;

        let stats = user_stats(uid, &[&r1, &r2], &[&v1, &v2], now());
        assert_eq!(stats.total_time_contributed, 2.0);
        assert_eq!(stats.accuracy_rate, 50.0);
        assert_eq!(stats.approved_reviews, 1);
        assert_eq!(stats.rejected_recordings, 1);
        assert_eq!(stats.last_activity_at, now());
    }

    #[test]
    fn test_streak_counts_back_from_today() {
        let days_ago = |d: i64| now() - Duration::days(d);
        assert_eq!(streak_days([days_ago(0), days_ago(1), days_ago(2)], now()), 3);
        assert_eq!(streak_days([days_ago(0), days_ago(0), days_ago(2)], now()), 1);
        assert_eq!(streak_days([days_ago(1), days_ago(2)], now()), 0);
        assert_eq!(streak_days(Vec::new(), now()), 0);
    }

    #[test]
    fn test_top_contributors_ranked_and_limited() {
        let low = user(Role::Contributor, UserStatus::Active);
        let high = user(Role::Contributor, UserStatus::Active);
        let reviewer = user(Role::Reviewer, UserStatus::Active);
        let recordings = vec![
            recording(high.id, "a", RecordingStatus::Pending),
            recording(high.id, "b", RecordingStatus::Pending),
            recording(low.id, "c", RecordingStatus::Pending),
        ];
        let index = StatsIndex::build(&recordings, &[]);

        let top = top_contributors(vec![low.clone(), high.clone(), reviewer], &index, 1, now());
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].user.id, high.id);
        assert_eq!(top[0].stats.total_recordings, 2);
    }

    #[test]
    fn test_top_reviewers_skip_pending() {
        let active = user(Role::Reviewer, UserStatus::Active);
        let pending = user(Role::Reviewer, UserStatus::Pending);
        let reviews = vec![review(Uuid::new_v4(), pending.id, Decision::Approved)];
        let index = StatsIndex::build(&[], &reviews);
        let top = top_reviewers(vec![active.clone(), pending], &index, 10, now());
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].user.id, active.id);
    }

    #[test]
    fn test_recent_activity_merges_and_skips_missing_users() {
        let contributor = user(Role::Contributor, UserStatus::Active);
        let admin = user(Role::Admin, UserStatus::Active);
        let mut rec = recording(contributor.id, "a", RecordingStatus::Pending);
        rec.created_at = now();
        let mut orphan = recording(Uuid::new_v4(), "b", RecordingStatus::Pending);
        orphan.created_at = now();
        let mut contributor = contributor;
        contributor.created_at = now() - Duration::days(1);

        let activity = recent_activity(&[contributor, admin], &[rec, orphan], &[], 20);
        assert_eq!(activity.len(), 2);
        assert!(matches!(activity[0].data, ActivityData::Recording(_)));
        assert!(matches!(activity[1].data, ActivityData::UserJoined));
    }

    #[test]
    fn test_weekly_activity_for_contributor() {
        let contributor = user(Role::Contributor, UserStatus::Active);
        let mut today = recording(contributor.id, "a", RecordingStatus::Pending);
        today.created_at = now();
        let mut yesterday_1 = recording(contributor.id, "b", RecordingStatus::Pending);
        yesterday_1.created_at = now() - Duration::days(1);
        let mut yesterday_2 = recording(contributor.id, "c", RecordingStatus::Pending);
        yesterday_2.created_at = now() - Duration::days(1);
        let someone_else = recording(Uuid::new_v4(), "d", RecordingStatus::Pending);

        let week = weekly_activity(
            &contributor,
            &[today, yesterday_1, yesterday_2, someone_else],
            &[],
            now(),
        );
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].trend, Trend::Up);
        assert_eq!(week[5].contributions, 2);
        assert_eq!(week[5].percentage, 20);
        assert_eq!(week[6].contributions, 1);
        assert_eq!(week[6].trend, Trend::Down);
        assert_eq!(week[6].max_contributions, 10);
        assert_eq!(week[6].day_name, "Wed");
    }

    #[test]
    fn test_weekly_activity_for_admin_counts_everything() {
        let admin = user(Role::Admin, UserStatus::Active);
        let mut rec = recording(Uuid::new_v4(), "a", RecordingStatus::Pending);
        rec.created_at = now();
        let mut rev = review(rec.id, Uuid::new_v4(), Decision::Approved);
        rev.created_at = now();

        let week = weekly_activity(&admin, &[rec], &[rev], now());
        assert_eq!(week[6].contributions, 2);
        assert_eq!(week[6].max_contributions, 15);
    }
}
