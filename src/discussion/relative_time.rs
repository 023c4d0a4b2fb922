//! Human-readable comment ages ("3 minutes ago", "about 2 hours ago").

const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_ALMOST_TWO_DAYS: i64 = 2520;
const MINUTES_IN_MONTH: i64 = 43200;
const MINUTES_IN_TWO_MONTHS: i64 = 86400;

/// Distance between two Unix-second timestamps, with an "ago"/"in" suffix
/// depending on which one is later.
pub fn format_relative(timestamp: i64, now: i64) -> String {
    let distance = distance_words((now - timestamp).abs());
    if timestamp > now {
        format!("in {}", distance)
    } else {
        format!("{} ago", distance)
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

fn distance_words(seconds: i64) -> String {
    let minutes = (seconds + 30) / 60;

    if minutes == 0 {
        return "less than a minute".to_string();
    }
    if minutes < 45 {
        return plural(minutes, "minute");
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        let hours = (minutes + 30) / 60;
        return format!("about {}", plural(hours, "hour"));
    }
    if minutes < MINUTES_IN_ALMOST_TWO_DAYS {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        let days = (minutes + MINUTES_IN_DAY / 2) / MINUTES_IN_DAY;
        return plural(days, "day");
    }
    if minutes < MINUTES_IN_TWO_MONTHS {
        let months = (minutes + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH;
        return format!("about {}", plural(months, "month"));
    }

    let months = minutes / MINUTES_IN_MONTH;
    if months < 12 {
        let nearest = (minutes + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH;
        return plural(nearest, "month");
    }

    let years = months / 12;
    match months % 12 {
        0..=2 => format!("about {}", plural(years, "year")),
        3..=8 => format!("over {}", plural(years, "year")),
        _ => format!("almost {}", plural(years + 1, "year")),
    }
}
