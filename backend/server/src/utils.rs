use std::collections::BTreeSet;

use crate::{
    error::AppError,
    models::{ArticleLog, READING_PING_SECONDS, ReadingTimeResponse},
};

/// Absent and empty are both rejected; any other string is accepted as is.
pub fn required(field: Option<String>) -> Result<String, AppError> {
    field
        .filter(|value| !value.is_empty())
        .ok_or(AppError::InvalidRequest)
}

/// Each article once, sorted ascending.
pub fn distinct_article_ids(logs: &[ArticleLog]) -> Vec<String> {
    logs.iter()
        .map(|log| log.article_id.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn reading_time(article_id: String, pings: usize) -> ReadingTimeResponse {
    let interaction_count = pings as u64;
    let reading_time_sec = interaction_count * READING_PING_SECONDS;

    ReadingTimeResponse {
        article_id,
        reading_time_sec,
        reading_time_min: reading_time_sec / 60,
        interaction_count,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Action;

    fn log(id: i64, article_id: &str) -> ArticleLog {
        ArticleLog {
            id,
            user_id: "u1".to_string(),
            article_id: article_id.to_string(),
            action: Action::Click,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn required_rejects_absent_and_empty() {
        assert!(matches!(required(None), Err(AppError::InvalidRequest)));
        assert!(matches!(
            required(Some(String::new())),
            Err(AppError::InvalidRequest)
        ));
        assert_eq!(required(Some(" ".to_string())).unwrap(), " ");
        assert_eq!(required(Some("a1".to_string())).unwrap(), "a1");
    }

    #[test]
    fn distinct_ids_are_unique_and_sorted() {
        let logs = vec![log(1, "b"), log(2, "a"), log(3, "b"), log(4, "c"), log(5, "a")];
        assert_eq!(distinct_article_ids(&logs), vec!["a", "b", "c"]);
        assert!(distinct_article_ids(&[]).is_empty());
    }

    #[test]
    fn reading_time_is_ten_seconds_per_ping() {
        for pings in [0usize, 1, 3, 5, 6, 7, 12, 61] {
            let result = reading_time("a1".to_string(), pings);
            let seconds = pings as u64 * 10;
            assert_eq!(result.interaction_count, pings as u64);
            assert_eq!(result.reading_time_sec, seconds);
            assert_eq!(result.reading_time_min, seconds / 60);
        }
    }

    #[test]
    fn reading_minutes_round_down() {
        assert_eq!(reading_time("a1".to_string(), 5).reading_time_min, 0);
        assert_eq!(reading_time("a1".to_string(), 6).reading_time_min, 1);
        assert_eq!(reading_time("a1".to_string(), 11).reading_time_min, 1);
        assert_eq!(reading_time("a1".to_string(), 12).reading_time_min, 2);
    }
}
