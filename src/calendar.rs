use crate::locator::{has_class, Locator, LocatorChain};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate};

/// Days ahead of today that the runner books by default.
pub const DEFAULT_DAY_OFFSET: u32 = 5;

pub fn target_date(now: DateTime<Local>, day_offset: u32) -> NaiveDate {
    now.date_naive() + Duration::days(i64::from(day_offset))
}

/// Ways to pick `date` in the date picker, most specific first.
pub fn date_cell(date: NaiveDate) -> LocatorChain {
    let day = date.day().to_string();
    LocatorChain::new(
        "calendar date",
        vec![
            Locator::css(format!(r#"[data-date="{}"]"#, date.format("%Y-%m-%d"))),
            Locator::exact_text(
                "td",
                &day,
                Some(&format!("not({})", has_class("other-month"))),
            ),
            Locator::exact_text("*", &day, Some(&has_class("calendar-day"))),
            Locator::exact_text("button", &day, None),
        ],
    )
}
