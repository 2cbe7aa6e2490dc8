//! Read-only aggregates over the application list. Nothing here touches
//! storage; callers recompute whenever the list changes.

use chrono::{DateTime, Datelike, NaiveDate};

use crate::models::{ApplicationRecord, Status};

const DATE_FORMATS: &[&str] = &["%b %d, %Y", "%B %d, %Y", "%m/%d/%y", "%m/%d/%Y"];

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse a stored date. ISO `YYYY-MM-DD` first, then the looser formats
/// people type into the form. `None` means "no date".
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn applied_on(record: &ApplicationRecord) -> Option<NaiveDate> {
    record.applied_date.as_deref().and_then(parse_date)
}

fn offered_on(record: &ApplicationRecord) -> Option<NaiveDate> {
    record.offered_date.as_deref().and_then(parse_date)
}

// --- Status counts ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub applied: usize,
    pub shortlisted: usize,
    pub interview: usize,
    pub offered: usize,
    pub rejected: usize,
    pub other: usize,
}

impl StatusCounts {
    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::Applied => self.applied,
            Status::Shortlisted => self.shortlisted,
            Status::Interview => self.interview,
            Status::Offered => self.offered,
            Status::Rejected => self.rejected,
        }
    }

    pub fn total(&self) -> usize {
        self.applied + self.shortlisted + self.interview + self.offered + self.rejected + self.other
    }
}

pub fn status_counts(records: &[ApplicationRecord]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for record in records {
        let slot = match record.recognized_status() {
            Some(Status::Applied) => &mut counts.applied,
            Some(Status::Shortlisted) => &mut counts.shortlisted,
            Some(Status::Interview) => &mut counts.interview,
            Some(Status::Offered) => &mut counts.offered,
            Some(Status::Rejected) => &mut counts.rejected,
            None => &mut counts.other,
        };
        *slot += 1;
    }
    counts
}

// --- Kanban ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KanbanBoard {
    columns: [Vec<ApplicationRecord>; 5],
}

impl KanbanBoard {
    pub fn column(&self, status: Status) -> &[ApplicationRecord] {
        &self.columns[status.index()]
    }

    /// Columns in board order.
    pub fn columns(&self) -> impl Iterator<Item = (Status, &[ApplicationRecord])> {
        Status::ALL
            .into_iter()
            .map(move |status| (status, self.column(status)))
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group records into one column per status, keeping list order.
///
/// Unrecognized statuses land in `Applied`, not in a separate bucket; the
/// status counts put the same records under `other`.
pub fn kanban(records: &[ApplicationRecord]) -> KanbanBoard {
    let mut board = KanbanBoard::default();
    for record in records {
        let status = record.recognized_status().unwrap_or(Status::Applied);
        board.columns[status.index()].push(record.clone());
    }
    board
}

// --- Histograms ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    pub count: usize,
}

impl MonthBucket {
    pub fn label(&self) -> &'static str {
        MONTH_LABELS[(self.month - 1) as usize]
    }

    pub fn key(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// Applications per calendar month for the `months` months ending with the
/// month containing `today`, oldest first.
pub fn monthly_histogram(records: &[ApplicationRecord], today: NaiveDate, months: u16) -> Vec<MonthBucket> {
    let current = today.year() * 12 + today.month0() as i32;
    let mut buckets: Vec<MonthBucket> = (0..i32::from(months))
        .rev()
        .map(|back| {
            let index = current - back;
            MonthBucket {
                year: index.div_euclid(12),
                month: index.rem_euclid(12) as u32 + 1,
                count: 0,
            }
        })
        .collect();

    for date in records.iter().filter_map(applied_on) {
        if let Some(bucket) = buckets
            .iter_mut()
            .find(|b| b.year == date.year() && b.month == date.month())
        {
            bucket.count += 1;
        }
    }
    buckets
}

/// Count per platform in first-seen order. Blank platforms are `Unknown`.
pub fn platform_histogram(records: &[ApplicationRecord]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for record in records {
        let platform = record.normalized_platform();
        match counts.iter_mut().find(|(name, _)| *name == platform) {
            Some((_, count)) => *count += 1,
            None => counts.push((platform, 1)),
        }
    }
    counts
}

pub fn platform_options(records: &[ApplicationRecord]) -> Vec<String> {
    platform_histogram(records)
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

// --- Rates ---

/// Mean days from application to offer, rounded half up. `None` when no
/// record has both dates.
pub fn average_time_to_offer(records: &[ApplicationRecord]) -> Option<i64> {
    let diffs: Vec<i64> = records
        .iter()
        .filter_map(|r| Some((offered_on(r)? - applied_on(r)?).num_days()))
        .collect();
    if diffs.is_empty() {
        return None;
    }
    let n = diffs.len() as i64;
    let sum: i64 = diffs.iter().sum();
    Some((2 * sum + n).div_euclid(2 * n))
}

/// Share of applications that reached `Offered`, in percent.
pub fn success_rate(records: &[ApplicationRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    status_counts(records).offered as f64 / records.len() as f64 * 100.0
}

/// Everything not rejected.
pub fn active_count(records: &[ApplicationRecord]) -> usize {
    records.len() - status_counts(records).rejected
}

/// Whole percent, rounded half up; 0 for an empty total.
pub fn percent_of(value: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (200 * value + total) / (2 * total)
}

// --- Filtering ---

/// List filter. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub platform: Option<String>,
}

impl Filter {
    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        if let Some(query) = self.search.as_deref().map(str::trim) {
            if !query.is_empty() {
                let haystack = format!(
                    "{} {} {}",
                    record.job_title,
                    record.company,
                    record.notes.as_deref().unwrap_or("")
                )
                .to_lowercase();
                if !haystack.contains(&query.to_lowercase()) {
                    return false;
                }
            }
        }
        if let Some(status) = &self.status {
            if record.effective_status() != status {
                return false;
            }
        }
        if let Some(platform) = &self.platform {
            if record.normalized_platform() != *platform {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, records: &[ApplicationRecord]) -> Vec<ApplicationRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationPatch;

    fn record(id: i64, status: Option<&str>) -> ApplicationRecord {
        let mut patch = ApplicationPatch::new(format!("Company {id}"), "Engineer");
        patch.status = status.map(str::to_string);
        patch.into_record(id)
    }

    fn applied_on_date(id: i64, date: &str) -> ApplicationRecord {
        ApplicationPatch::new("Acme", "Engineer")
            .applied_date(date)
            .into_record(id)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date(" 2024-01-15 "), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("Oct 26, 2023"), Some(ymd(2023, 10, 26)));
        assert_eq!(parse_date("October 26, 2023"), Some(ymd(2023, 10, 26)));
        assert_eq!(parse_date("11/01/12"), Some(ymd(2012, 11, 1)));
        assert_eq!(parse_date("11/01/2012"), Some(ymd(2012, 11, 1)));
        assert_eq!(parse_date("2024-03-05T10:00:00Z"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("next tuesday"), None);
        assert_eq!(parse_date("2024-13-40"), None);
    }

    #[test]
    fn test_status_counts_bucket_unknown_as_other() {
        let records = vec![
            record(1, Some("Applied")),
            record(2, Some("Interview")),
            record(3, Some("Wishlist")),
            record(4, None),
            record(5, Some("Offered")),
        ];
        let counts = status_counts(&records);
        assert_eq!(counts.applied, 2);
        assert_eq!(counts.interview, 1);
        assert_eq!(counts.offered, 1);
        assert_eq!(counts.other, 1);
        assert_eq!(counts.get(Status::Shortlisted), 0);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn test_kanban_is_complete_partition() {
        let records = vec![
            record(1, Some("Rejected")),
            record(2, Some("Wishlist")),
            record(3, Some("Applied")),
            record(4, Some("Interview")),
            record(5, None),
            record(6, Some("Rejected")),
        ];
        let board = kanban(&records);
        assert_eq!(board.len(), records.len());

        let applied: Vec<i64> = board.column(Status::Applied).iter().map(|r| r.id).collect();
        assert_eq!(applied, vec![2, 3, 5]);
        let rejected: Vec<i64> = board.column(Status::Rejected).iter().map(|r| r.id).collect();
        assert_eq!(rejected, vec![1, 6]);

        let mut all: Vec<i64> = board
            .columns()
            .flat_map(|(_, column)| column.iter().map(|r| r.id))
            .collect();
        assert_eq!(all, vec![2, 3, 5, 4, 1, 6]);
        all.sort();
        assert_eq!(all, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_kanban_column_order() {
        let board = kanban(&[]);
        let order: Vec<Status> = board.columns().map(|(status, _)| status).collect();
        assert_eq!(order, Status::ALL.to_vec());
        assert!(board.is_empty());
    }

    #[test]
    fn test_monthly_histogram_trailing_window() {
        let records = vec![
            applied_on_date(1, "2024-01-15"),
            applied_on_date(2, "2024-01-20"),
            applied_on_date(3, "2024-02-01"),
            applied_on_date(4, "garbage"),
            ApplicationPatch::new("Acme", "Engineer").into_record(5),
        ];
        let buckets = monthly_histogram(&records, ymd(2024, 3, 10), 3);
        let summary: Vec<(&str, usize)> = buckets.iter().map(|b| (b.label(), b.count)).collect();
        assert_eq!(summary, vec![("Jan", 2), ("Feb", 1), ("Mar", 0)]);
    }

    #[test]
    fn test_monthly_histogram_crosses_year_boundary() {
        let records = vec![
            applied_on_date(1, "2023-09-30"),
            applied_on_date(2, "2023-10-01"),
            applied_on_date(3, "2023-12-31"),
            applied_on_date(4, "2024-02-29"),
            applied_on_date(5, "2024-04-01"),
        ];
        let buckets = monthly_histogram(&records, ymd(2024, 3, 1), 6);
        let keys: Vec<String> = buckets.iter().map(MonthBucket::key).collect();
        assert_eq!(
            keys,
            vec!["2023-10", "2023-11", "2023-12", "2024-01", "2024-02", "2024-03"]
        );
        let counts: Vec<usize> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_monthly_histogram_window_size() {
        let records = vec![applied_on_date(1, "2024-03-02")];
        assert!(monthly_histogram(&records, ymd(2024, 3, 10), 0).is_empty());

        let buckets = monthly_histogram(&records, ymd(2024, 3, 10), u16::MAX);
        assert_eq!(buckets.len(), usize::from(u16::MAX));
        assert_eq!(buckets.last().map(|b| (b.year, b.month, b.count)), Some((2024, 3, 1)));
    }

    #[test]
    fn test_platform_histogram_first_seen_order() {
        let mut records: Vec<ApplicationRecord> = ["LinkedIn", " Referral ", "LinkedIn", ""]
            .iter()
            .zip(1..)
            .map(|(p, id)| ApplicationPatch::new("Acme", "Engineer").platform(*p).into_record(id))
            .collect();
        records.push(ApplicationPatch::new("Acme", "Engineer").into_record(5));

        assert_eq!(
            platform_histogram(&records),
            vec![
                ("LinkedIn".to_string(), 2),
                ("Referral".to_string(), 1),
                ("Unknown".to_string(), 2),
            ]
        );
        assert_eq!(platform_options(&records), vec!["LinkedIn", "Referral", "Unknown"]);
    }

    #[test]
    fn test_average_time_to_offer_rounds_half_up() {
        let records = vec![
            ApplicationPatch::new("A", "X")
                .applied_date("2024-01-01")
                .offered_date("2024-01-11")
                .into_record(1),
            ApplicationPatch::new("B", "Y")
                .applied_date("2024-02-01")
                .offered_date("2024-02-06")
                .into_record(2),
            // only one date: ignored
            ApplicationPatch::new("C", "Z").applied_date("2024-02-01").into_record(3),
        ];
        assert_eq!(average_time_to_offer(&records), Some(8));
    }

    #[test]
    fn test_average_time_to_offer_none_without_pairs() {
        let records = vec![
            ApplicationPatch::new("A", "X")
                .applied_date("someday")
                .offered_date("2024-01-11")
                .into_record(1),
        ];
        assert_eq!(average_time_to_offer(&records), None);
        assert_eq!(average_time_to_offer(&[]), None);
    }

    #[test]
    fn test_rates() {
        let records = vec![
            record(1, Some("Offered")),
            record(2, Some("Rejected")),
            record(3, Some("Applied")),
            record(4, Some("Interview")),
        ];
        assert_eq!(success_rate(&records), 25.0);
        assert_eq!(success_rate(&[]), 0.0);
        assert_eq!(active_count(&records), 3);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(1, 8), 13);
        assert_eq!(percent_of(5, 0), 0);
    }

    #[test]
    fn test_filter() {
        let records = vec![
            ApplicationPatch::new("Acme", "Backend Engineer")
                .platform("LinkedIn")
                .into_record(1),
            ApplicationPatch::new("Globex", "Designer")
                .platform("Referral")
                .status("Interview")
                .notes("ask about remote BACKEND work")
                .into_record(2),
            ApplicationPatch::new("Initech", "Analyst").into_record(3),
        ];

        let search = Filter {
            search: Some("  backend ".to_string()),
            ..Default::default()
        };
        let ids: Vec<i64> = search.apply(&records).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let applied = Filter {
            status: Some("Applied".to_string()),
            ..Default::default()
        };
        let ids: Vec<i64> = applied.apply(&records).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let unknown = Filter {
            platform: Some("Unknown".to_string()),
            ..Default::default()
        };
        let ids: Vec<i64> = unknown.apply(&records).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3]);

        assert_eq!(Filter::default().apply(&records).len(), 3);
    }
}
