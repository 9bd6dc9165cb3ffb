use chrono::NaiveDate;

/// portuguese month names, january first
pub const MONTH_NAMES: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

fn fold(name: &str) -> String {
    name.to_lowercase().replace('ç', "c")
}

/// 1-based month number, case-insensitive, cedilla optional
pub fn month_number(name: &str) -> Option<u32> {
    let folded = fold(name);
    MONTH_NAMES
        .iter()
        .position(|m| fold(m) == folded)
        .map(|idx| idx as u32 + 1)
}

/// regex alternation matching any month name
pub(crate) fn month_alternation() -> String {
    MONTH_NAMES
        .iter()
        .map(|m| regex::escape(m).replace('ç', "[çc]"))
        .collect::<Vec<_>>()
        .join("|")
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}
