/*
 * gitlab-export
 *
 * Copyright (C) 2025 gitlab-export contributors
 * gitlab-export is free software; you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation; either version 2 of the License, or
 * (at your option) any later version.
 *
 * gitlab-export is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with gitlab-export.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

use chrono::{
    Datelike, Days, Local, LocalResult, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone,
};
use std::error::Error;

/// Computes the [start, end] timestamps for the requested time range.
///
/// `week`, `month` and `year` cover the calendar period containing today, in
/// local time; weeks start on Sunday. `custom` takes explicit MM-DD-YYYY
/// bounds. Both timestamps are RFC 3339 strings carrying the local offset,
/// widened to start-of-day and end-of-day respectively.
pub fn date_range(
    time_range: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<(String, String), Box<dyn Error>> {
    if time_range == "custom" {
        let (Some(start), Some(end)) = (start_date, end_date) else {
            return Err(
                "both a start date and an end date must be provided with the custom time range"
                    .into(),
            );
        };
        let start = parse_custom_date(start)?;
        let end = parse_custom_date(end)?;
        return Ok((start_of_day(start)?, end_of_day(end)?));
    }

    let today = Local::now().date_naive();
    let (start, end) = match time_range {
        "week" => {
            let start = today - Days::new(today.weekday().num_days_from_sunday() as u64);
            (start, start + Days::new(6))
        }
        "month" => {
            let start = today.with_day(1).ok_or("invalid start of month")?;
            (start, start + Months::new(1) - Days::new(1))
        }
        "year" => {
            let start = today.with_ordinal(1).ok_or("invalid start of year")?;
            let end =
                NaiveDate::from_ymd_opt(today.year(), 12, 31).ok_or("invalid end of year")?;
            (start, end)
        }
        other => return Err(format!("invalid time range: {:?}", other).into()),
    };

    Ok((start_of_day(start)?, end_of_day(end)?))
}

fn parse_custom_date(s: &str) -> Result<NaiveDate, Box<dyn Error>> {
    NaiveDate::parse_from_str(s, "%m-%d-%Y").map_err(|_| {
        format!(
            "invalid date {:?}, expected the MM-DD-YYYY format (e.g. 12-25-2023)",
            s
        )
        .into()
    })
}

fn start_of_day(date: NaiveDate) -> Result<String, Box<dyn Error>> {
    let dt = date.and_hms_opt(0, 0, 0).ok_or("invalid start of day")?;
    format_local(dt)
}

fn end_of_day(date: NaiveDate) -> Result<String, Box<dyn Error>> {
    let dt = date.and_hms_opt(23, 59, 59).ok_or("invalid end of day")?;
    format_local(dt)
}

fn format_local(dt: NaiveDateTime) -> Result<String, Box<dyn Error>> {
    let local = match Local.from_local_datetime(&dt) {
        LocalResult::Single(t) => t,
        // DST transition; take the earlier interpretation.
        LocalResult::Ambiguous(t, _) => t,
        LocalResult::None => {
            return Err(format!("time {} does not exist in the local timezone", dt).into());
        }
    };
    Ok(local.to_rfc3339_opts(SecondsFormat::Secs, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn custom_range_widens_to_full_days() {
        let (start, end) =
            date_range("custom", Some("01-15-2024"), Some("01-20-2024")).unwrap();
        assert!(start.starts_with("2024-01-15T00:00:00"));
        assert!(end.starts_with("2024-01-20T23:59:59"));
    }

    #[test]
    fn custom_range_requires_both_bounds() {
        assert!(date_range("custom", Some("01-15-2024"), None).is_err());
        assert!(date_range("custom", None, Some("01-20-2024")).is_err());
        assert!(date_range("custom", None, None).is_err());
    }

    #[test]
    fn custom_range_rejects_bad_formats() {
        assert!(date_range("custom", Some("2024-01-15"), Some("01-20-2024")).is_err());
        assert!(date_range("custom", Some("01-15-2024"), Some("15/01/2024")).is_err());
        assert!(date_range("custom", Some("13-40-2024"), Some("01-20-2024")).is_err());
    }

    #[test]
    fn unknown_time_range_is_rejected() {
        assert!(date_range("fortnight", None, None).is_err());
    }

    #[test]
    fn week_range_starts_on_sunday_and_contains_today() {
        let (start, end) = date_range("week", None, None).unwrap();
        let start_day = NaiveDate::parse_from_str(&start[..10], "%Y-%m-%d").unwrap();
        let end_day = NaiveDate::parse_from_str(&end[..10], "%Y-%m-%d").unwrap();
        let today = Local::now().date_naive();

        assert_eq!(start_day.weekday(), Weekday::Sun);
        assert_eq!(end_day, start_day + Days::new(6));
        assert!(start_day <= today && today <= end_day);
    }

    #[test]
    fn month_range_covers_the_whole_month() {
        let (start, end) = date_range("month", None, None).unwrap();
        let start_day = NaiveDate::parse_from_str(&start[..10], "%Y-%m-%d").unwrap();
        let end_day = NaiveDate::parse_from_str(&end[..10], "%Y-%m-%d").unwrap();

        assert_eq!(start_day.day(), 1);
        assert_eq!((end_day + Days::new(1)).day(), 1);
        assert_eq!(start_day.month(), Local::now().date_naive().month());
    }

    #[test]
    fn year_range_spans_january_to_december() {
        let (start, end) = date_range("year", None, None).unwrap();
        let year = Local::now().date_naive().year();
        assert!(start.starts_with(&format!("{}-01-01T00:00:00", year)));
        assert!(end.starts_with(&format!("{}-12-31T23:59:59", year)));
    }
}
