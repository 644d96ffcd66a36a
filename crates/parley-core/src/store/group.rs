//! Calendar-day bucketing for chat listings.

use chrono::{DateTime, Local, NaiveDate, Utc};
use parley_types::chat::ChatEntry;
use parley_types::config::DayBoundary;

use super::ChatGroup;

fn day_of(ts: DateTime<Utc>, boundary: DayBoundary) -> NaiveDate {
    match boundary {
        DayBoundary::Utc => ts.date_naive(),
        DayBoundary::Local => ts.with_timezone(&Local).date_naive(),
    }
}

/// Bucket an ordered chat list into named calendar-day groups.
///
/// Labels are "Today", "Yesterday", or `YYYY-MM-DD`, relative to `now` under
/// the configured day boundary. Input order is preserved within each group,
/// and groups appear in the order their first chat does, so a list sorted by
/// `created_at` yields groups in the same direction.
pub fn group_by_day(
    chats: Vec<ChatEntry>,
    boundary: DayBoundary,
    now: DateTime<Utc>,
) -> Vec<ChatGroup> {
    let today = day_of(now, boundary);
    let yesterday = today.pred_opt();

    let mut groups: Vec<ChatGroup> = Vec::new();
    for chat in chats {
        let day = day_of(chat.created_at, boundary);
        let label = if day == today {
            "Today".to_string()
        } else if Some(day) == yesterday {
            "Yesterday".to_string()
        } else {
            day.format("%Y-%m-%d").to_string()
        };

        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.chats.push(chat),
            None => groups.push(ChatGroup {
                label,
                chats: vec![chat],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn make_chat(chat_id: &str, created_at: DateTime<Utc>) -> ChatEntry {
        ChatEntry {
            id: 0,
            chat_id: chat_id.to_string(),
            title: Some(format!("Chat {chat_id}")),
            sid: "s1".to_string(),
            created_at,
            updated_at: None,
        }
    }

    #[test]
    fn test_today_yesterday_and_dated_buckets() {
        // Noon avoids the day boundary regardless of small clock skew.
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let chats = vec![
            make_chat("a", now),
            make_chat("b", now - Duration::days(1)),
            make_chat("c", now - Duration::days(7)),
        ];

        let groups = group_by_day(chats, DayBoundary::Utc, now);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].label, "Today");
        assert_eq!(groups[1].label, "Yesterday");
        assert_eq!(groups[2].label, "2024-06-08");
        assert_eq!(groups[2].chats[0].chat_id, "c");
    }

    #[test]
    fn test_same_day_chats_share_a_bucket_in_order() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let chats = vec![
            make_chat("late", now),
            make_chat("early", now - Duration::hours(3)),
        ];

        let groups = group_by_day(chats, DayBoundary::Utc, now);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "Today");
        let ids: Vec<&str> = groups[0].chats.iter().map(|c| c.chat_id.as_str()).collect();
        assert_eq!(ids, vec!["late", "early"]);
    }

    #[test]
    fn test_group_order_follows_input_order() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        // Ascending input: oldest day first.
        let chats = vec![
            make_chat("old", now - Duration::days(3)),
            make_chat("new", now),
        ];

        let groups = group_by_day(chats, DayBoundary::Utc, now);
        assert_eq!(groups[0].label, "2024-06-12");
        assert_eq!(groups[1].label, "Today");
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        let groups = group_by_day(Vec::new(), DayBoundary::Utc, Utc::now());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_local_boundary_keeps_now_in_today() {
        // Whatever the host timezone, "now" is always part of today.
        let now = Utc::now();
        let groups = group_by_day(vec![make_chat("a", now)], DayBoundary::Local, now);
        assert_eq!(groups[0].label, "Today");
    }

    #[test]
    fn test_utc_boundary_splits_days_at_midnight_utc() {
        // 00:30 UTC and 23:30 UTC the previous day are different buckets.
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 30, 0).unwrap();
        let chats = vec![
            make_chat("after", now),
            make_chat("before", now - Duration::hours(1)),
        ];

        let groups = group_by_day(chats, DayBoundary::Utc, now);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "Today");
        assert_eq!(groups[1].label, "Yesterday");
    }
}
