use chrono::{DateTime, Duration, Utc};

pub fn day_key(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d").to_string()
}

pub fn hour_key(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:00").to_string()
}

pub fn bucket_key(timestamp: &DateTime<Utc>, hourly: bool) -> String {
    if hourly {
        hour_key(timestamp)
    } else {
        day_key(timestamp)
    }
}

pub fn bucket_width(hourly: bool) -> Duration {
    if hourly {
        Duration::hours(1)
    } else {
        Duration::days(1)
    }
}

pub fn short_sha(sha: &str) -> &str {
    &sha[..sha.len().min(8)]
}
