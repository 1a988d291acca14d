use crate::error::{Result, StatementError};
use crate::schema::HeaderPeriod;
use chrono::{Datelike, Days, NaiveDate};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Substring marking a forecast column; such headers are never ingested.
const ESTIMATE_MARKER: &str = "(E)";

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .checked_sub_days(Days::new(1))
        .unwrap()
}

pub fn validate_fiscal_year_end_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(StatementError::InvalidFiscalYearEndMonth(month));
    }
    Ok(())
}

/// Parses a raw period header into a [`HeaderPeriod`], or `None` when the
/// header cannot be trusted (estimates, quarters, free text).
///
/// Accepted forms:
/// - `"LTM"` / `"TTM"` (exact after trimming) for a trailing-twelve-month column
/// - `"Mon 'YY"` such as `"Dec '24"`; month abbreviation is case-insensitive,
///   two-digit years below 50 land in 20xx, the rest in 19xx
/// - a bare 4-digit year such as `"2015"` (month resolved later from the
///   company's fiscal year end)
pub fn parse_period_header(raw: &str) -> Option<HeaderPeriod> {
    let header = raw.trim();
    if header.is_empty() || header.contains(ESTIMATE_MARKER) {
        return None;
    }

    if header == "LTM" || header == "TTM" {
        return Some(HeaderPeriod::Ltm);
    }

    if header.len() == 4 {
        if let Ok(year) = header.parse::<i32>() {
            if (1000..=9999).contains(&year) {
                return Some(HeaderPeriod::YearOnly { year });
            }
        }
    }

    parse_month_year(header)
}

fn parse_month_year(header: &str) -> Option<HeaderPeriod> {
    // "Dec '24": three letters, space, apostrophe, two digits.
    let (month_part, rest) = header.split_once(' ')?;
    let month = month_number(month_part)?;

    let year_part = rest.trim().strip_prefix('\'')?;
    if year_part.len() != 2 || !year_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let yy: i32 = year_part.parse().ok()?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };

    Some(HeaderPeriod::MonthYear { month, year })
}

fn month_number(abbreviation: &str) -> Option<u32> {
    MONTH_ABBREVIATIONS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(abbreviation))
        .map(|idx| idx as u32 + 1)
}

/// Resolves the period end of an LTM column relative to the most recent
/// annual period in the same table.
///
/// Annual columns end on the fiscal year end; the trailing-twelve-month
/// column ends at the half-year point after the latest annual column, so the
/// label shifts by six months: for FYE months past June the LTM period ends
/// in the following calendar year.
pub fn resolve_ltm_period(latest_annual_year: i32, fye_month: u32) -> NaiveDate {
    let (year, month) = if fye_month > 6 {
        (latest_annual_year + 1, fye_month - 6)
    } else {
        (latest_annual_year, fye_month + 6)
    };
    last_day_of_month(year, month)
}

/// Display label for a period column, e.g. `"Dec 2024"`. Uniform across
/// sources regardless of how the raw header was spelled.
pub fn period_label(date: NaiveDate) -> String {
    format!(
        "{} {}",
        MONTH_ABBREVIATIONS[date.month0() as usize],
        date.year()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_year_headers() {
        assert_eq!(
            parse_period_header("Dec '24"),
            Some(HeaderPeriod::MonthYear {
                month: 12,
                year: 2024
            })
        );
        assert_eq!(
            parse_period_header("Jan '99"),
            Some(HeaderPeriod::MonthYear {
                month: 1,
                year: 1999
            })
        );
        assert_eq!(
            parse_period_header("mar '07"),
            Some(HeaderPeriod::MonthYear {
                month: 3,
                year: 2007
            })
        );
    }

    #[test]
    fn test_century_boundary() {
        assert_eq!(
            parse_period_header("Jan '49"),
            Some(HeaderPeriod::MonthYear {
                month: 1,
                year: 2049
            })
        );
        assert_eq!(
            parse_period_header("Jan '50"),
            Some(HeaderPeriod::MonthYear {
                month: 1,
                year: 1950
            })
        );
    }

    #[test]
    fn test_estimate_headers_rejected() {
        assert_eq!(parse_period_header("Dec '27 (E)"), None);
        assert_eq!(parse_period_header("LTM (E)"), None);
        assert_eq!(parse_period_header("2027 (E)"), None);
    }

    #[test]
    fn test_ltm_and_ttm_tokens() {
        assert_eq!(parse_period_header("LTM"), Some(HeaderPeriod::Ltm));
        assert_eq!(parse_period_header("TTM"), Some(HeaderPeriod::Ltm));
        assert_eq!(parse_period_header(" LTM "), Some(HeaderPeriod::Ltm));
        // Case-sensitive tokens; lowercase comes from nothing we ingest.
        assert_eq!(parse_period_header("ltm"), None);
    }

    #[test]
    fn test_bare_year_headers() {
        assert_eq!(
            parse_period_header("2015"),
            Some(HeaderPeriod::YearOnly { year: 2015 })
        );
        assert_eq!(parse_period_header("15"), None);
    }

    #[test]
    fn test_unparseable_headers() {
        assert_eq!(parse_period_header(""), None);
        assert_eq!(parse_period_header("   "), None);
        assert_eq!(parse_period_header("Q1 2024"), None);
        assert_eq!(parse_period_header("Dec 24"), None);
        assert_eq!(parse_period_header("December '24"), None);
        assert_eq!(parse_period_header("Dec '2"), None);
        assert_eq!(parse_period_header("Dec '2a"), None);
    }

    #[test]
    fn test_round_trip_all_months_and_years() {
        for year in 1950..=2049 {
            for (idx, abbrev) in MONTH_ABBREVIATIONS.iter().enumerate() {
                let header = format!("{} '{:02}", abbrev, year % 100);
                assert_eq!(
                    parse_period_header(&header),
                    Some(HeaderPeriod::MonthYear {
                        month: idx as u32 + 1,
                        year
                    }),
                    "failed for {}",
                    header
                );
            }
        }
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2023, 2),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day_of_month(2023, 12),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_resolve_ltm_period() {
        // December year end: LTM ends the following June.
        assert_eq!(
            resolve_ltm_period(2024, 12),
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
        );
        // March year end: LTM ends the same September.
        assert_eq!(
            resolve_ltm_period(2024, 3),
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
        );
    }

    #[test]
    fn test_period_label() {
        assert_eq!(
            period_label(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
            "Dec 2024"
        );
        assert_eq!(
            period_label(NaiveDate::from_ymd_opt(1999, 1, 31).unwrap()),
            "Jan 1999"
        );
    }
}
