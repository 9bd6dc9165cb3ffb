use crate::entities::months::{month_alternation, month_number};
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fmt;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// inclusive calendar range; the end covers its whole day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn start_timestamp(&self) -> NaiveDateTime {
        self.start.and_time(chrono::NaiveTime::MIN)
    }

    pub fn end_timestamp(&self) -> NaiveDateTime {
        self.end
            .and_hms_opt(23, 59, 59)
            .expect("23:59:59 is a valid time of day")
    }

    /// sql timestamp literals, quoted
    pub fn sql_bounds(&self) -> (String, String) {
        (
            format!("'{}'", self.start_timestamp().format(TIMESTAMP_FORMAT)),
            format!("'{}'", self.end_timestamp().format(TIMESTAMP_FORMAT)),
        )
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = self.sql_bounds();
        write!(f, "{} e {}", start, end)
    }
}

type Resolver = fn(&Regex, &str, NaiveDate) -> Option<DateRange>;

/// one temporal expression: a pattern and how to turn its match into a range
pub struct DateRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub resolve: Resolver,
}

impl DateRule {
    pub fn new(name: &'static str, pattern: &str, resolve: Resolver) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("date rule pattern must compile"),
            resolve,
        }
    }
}

/// tries each rule in order; the first one that resolves wins
pub struct DateExtractor {
    rules: Vec<DateRule>,
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DateExtractor {
    pub fn new() -> Self {
        let day_of_month = format!(
            r"(?i)\b(\d{{1,2}})(?:º|°)?\s+de\s+({})\b",
            month_alternation()
        );

        Self {
            rules: vec![
                DateRule::new("day_of_month", &day_of_month, resolve_day_mentions),
                DateRule::new("this_week", r"(?i)\b(?:n?esta|n?essa)\s+semana\b", resolve_this_week),
                DateRule::new("last_month", r"(?i)\bm[êe]s\s+passado\b", resolve_last_month),
                DateRule::new("today", r"(?i)\bhoje\b", |_, _, today| Some(DateRange::single(today))),
                DateRule::new("yesterday", r"(?i)\bontem\b", |_, _, today| {
                    today.pred_opt().map(DateRange::single)
                }),
            ],
        }
    }

    /// append a rule with the lowest priority
    pub fn push_rule(&mut self, rule: DateRule) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    pub fn extract_dates(&self, question: &str) -> Option<DateRange> {
        self.extract_dates_on(question, Local::now().date_naive())
    }

    #[tracing::instrument(skip(self, question))]
    pub fn extract_dates_on(&self, question: &str, today: NaiveDate) -> Option<DateRange> {
        for rule in &self.rules {
            if !rule.pattern.is_match(question) {
                continue;
            }
            if let Some(range) = (rule.resolve)(&rule.pattern, question, today) {
                tracing::debug!(rule = rule.name, %range, "resolved date range");
                return Some(range);
            }
        }
        None
    }
}

/// "15 de março" alone, or "15 de março a 20 de abril" as a range
fn resolve_day_mentions(pattern: &Regex, question: &str, today: NaiveDate) -> Option<DateRange> {
    let mut dates = pattern
        .captures_iter(question)
        .filter_map(|caps| {
            let day: u32 = caps.get(1)?.as_str().parse().ok()?;
            let month = month_number(caps.get(2)?.as_str())?;
            NaiveDate::from_ymd_opt(today.year(), month, day)
        })
        .take(2);

    let start = dates.next()?;
    let end = dates.next().unwrap_or(start);
    Some(DateRange::new(start, end))
}

fn resolve_this_week(_: &Regex, _: &str, today: NaiveDate) -> Option<DateRange> {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    Some(DateRange::new(monday, monday + Duration::days(6)))
}

fn resolve_last_month(_: &Regex, _: &str, today: NaiveDate) -> Option<DateRange> {
    let last = today.with_day(1)?.pred_opt()?;
    Some(DateRange::new(last.with_day(1)?, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // a friday
    fn today() -> NaiveDate {
        date(2026, 10, 16)
    }

    #[test]
    fn test_single_day_mention() {
        let extractor = DateExtractor::new();
        let range = extractor
            .extract_dates_on("quantas consultas no dia 5 de março?", today())
            .unwrap();
        assert_eq!(range, DateRange::single(date(2026, 3, 5)));
    }

    #[test]
    fn test_two_mentions_keep_mention_order() {
        let extractor = DateExtractor::new();
        let range = extractor
            .extract_dates_on("agendamentos entre 10 de Janeiro e 20 de FEVEREIRO", today())
            .unwrap();
        assert_eq!(range.start(), date(2026, 1, 10));
        assert_eq!(range.end(), date(2026, 2, 20));

        let reversed = extractor
            .extract_dates_on("de 20 de fevereiro até 10 de janeiro", today())
            .unwrap();
        assert_eq!(reversed.start(), date(2026, 2, 20));
        assert_eq!(reversed.end(), date(2026, 1, 10));
    }

    #[test]
    fn test_month_without_cedilla_and_ordinal() {
        let extractor = DateExtractor::new();
        let range = extractor
            .extract_dates_on("consultas em 1º de marco", today())
            .unwrap();
        assert_eq!(range, DateRange::single(date(2026, 3, 1)));
    }

    #[test]
    fn test_invalid_day_is_skipped() {
        let extractor = DateExtractor::new();
        assert_eq!(extractor.extract_dates_on("31 de fevereiro", today()), None);

        let range = extractor
            .extract_dates_on("31 de fevereiro ou 3 de abril", today())
            .unwrap();
        assert_eq!(range, DateRange::single(date(2026, 4, 3)));
    }

    #[test]
    fn test_this_week_spans_monday_to_sunday() {
        let extractor = DateExtractor::new();
        let range = extractor
            .extract_dates_on("quantos pacientes esta semana", today())
            .unwrap();
        assert_eq!(range.start(), date(2026, 10, 12));
        assert_eq!(range.end(), date(2026, 10, 18));

        // a sunday belongs to the week that started six days earlier
        let sunday = extractor
            .extract_dates_on("consultas nessa semana", date(2026, 10, 18))
            .unwrap();
        assert_eq!(sunday.start(), date(2026, 10, 12));
    }

    #[test]
    fn test_day_mentions_take_priority_over_week() {
        let extractor = DateExtractor::new();
        let range = extractor
            .extract_dates_on("esta semana ou 2 de maio", today())
            .unwrap();
        assert_eq!(range, DateRange::single(date(2026, 5, 2)));
    }

    #[test]
    fn test_last_month_crosses_year() {
        let extractor = DateExtractor::new();
        let range = extractor
            .extract_dates_on("faturamento do mês passado", date(2026, 1, 10))
            .unwrap();
        assert_eq!(range.start(), date(2025, 12, 1));
        assert_eq!(range.end(), date(2025, 12, 31));
    }

    #[test]
    fn test_today_and_yesterday() {
        let extractor = DateExtractor::new();
        assert_eq!(
            extractor.extract_dates_on("consultas de hoje", today()),
            Some(DateRange::single(today()))
        );
        assert_eq!(
            extractor.extract_dates_on("consultas de ontem", today()),
            Some(DateRange::single(date(2026, 10, 15)))
        );
    }

    #[test]
    fn test_no_temporal_expression() {
        let extractor = DateExtractor::new();
        assert_eq!(extractor.extract_dates_on("quantos pacientes temos?", today()), None);
        // "semana" alone is not enough
        assert_eq!(extractor.extract_dates_on("qual a semana mais cheia", today()), None);
    }

    #[test]
    fn test_end_is_end_of_day() {
        let range = DateRange::new(date(2026, 3, 1), date(2026, 3, 28));
        assert_eq!(
            range.sql_bounds(),
            ("'2026-03-01 00:00:00'".to_string(), "'2026-03-28 23:59:59'".to_string())
        );
        assert_eq!(range.to_string(), "'2026-03-01 00:00:00' e '2026-03-28 23:59:59'");
    }

    #[test]
    fn test_custom_rule_is_appended() {
        let mut extractor = DateExtractor::new();
        extractor.push_rule(DateRule::new("christmas", r"(?i)\bnatal\b", |_, _, today| {
            NaiveDate::from_ymd_opt(today.year(), 12, 25).map(DateRange::single)
        }));

        assert_eq!(extractor.rule_names().last(), Some(&"christmas"));
        assert_eq!(
            extractor.extract_dates_on("consultas no natal", today()),
            Some(DateRange::single(date(2026, 12, 25)))
        );
    }
}
