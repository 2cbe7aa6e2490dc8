use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Pipeline stages an application can sit in. Records keep whatever status
/// string they were given; this set is only used when building views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Applied,
    Shortlisted,
    Interview,
    Offered,
    Rejected,
}

impl Status {
    /// Board column order.
    pub const ALL: [Status; 5] = [
        Status::Applied,
        Status::Shortlisted,
        Status::Interview,
        Status::Offered,
        Status::Rejected,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::Shortlisted => "Shortlisted",
            Status::Interview => "Interview",
            Status::Offered => "Offered",
            Status::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|status| status.label() == s)
    }

    pub fn index(self) -> usize {
        match self {
            Status::Applied => 0,
            Status::Shortlisted => 1,
            Status::Interview => 2,
            Status::Offered => 3,
            Status::Rejected => 4,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One tracked application. Written with `id`; read leniently through
/// `StoredRecord`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredRecord")]
pub struct ApplicationRecord {
    pub id: i64,
    pub company: String,
    pub job_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offered_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Keys written by other clients that we don't model, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A record as other clients may have written it: numbers or nulls where we
/// keep text, and the legacy `uniqueNo` in place of (or next to) `id`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    unique_no: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    company: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    job_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    platform: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    applied_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    offered_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    location: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    salary: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    resume: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    notes: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<StoredRecord> for ApplicationRecord {
    fn from(stored: StoredRecord) -> Self {
        ApplicationRecord {
            id: stored.id.or(stored.unique_no).unwrap_or(0),
            company: stored.company.unwrap_or_default(),
            job_title: stored.job_title.unwrap_or_default(),
            platform: stored.platform,
            status: stored.status,
            applied_date: stored.applied_date,
            offered_date: stored.offered_date,
            location: stored.location,
            salary: stored.salary,
            resume: stored.resume,
            notes: stored.notes,
            extra: stored.extra,
        }
    }
}

/// Text field: strings as-is, numbers and booleans in their JSON spelling,
/// null as absent. Arrays and objects are rejected.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!("expected text, found {}", other))),
    }
}

/// Id field: integers, whole floats and integer strings.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("id {} is not a whole number", n))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("id {:?} is not a whole number", s))),
        other => Err(de::Error::custom(format!("expected an id, found {}", other))),
    }
}

impl ApplicationRecord {
    /// Status as the views see it: absent or empty means `Applied`,
    /// `None` means the value is not one of the known stages.
    pub fn recognized_status(&self) -> Option<Status> {
        match self.status.as_deref() {
            None | Some("") => Some(Status::Applied),
            Some(s) => Status::parse(s),
        }
    }

    /// Status label used for filtering, with the same `Applied` default.
    pub fn effective_status(&self) -> &str {
        match self.status.as_deref() {
            None | Some("") => Status::Applied.label(),
            Some(s) => s,
        }
    }

    pub fn normalized_platform(&self) -> String {
        match self.platform.as_deref().map(str::trim) {
            None | Some("") => "Unknown".to_string(),
            Some(p) => p.to_string(),
        }
    }
}

/// Field changes for add/edit. `Some` overwrites, `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationPatch {
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub platform: Option<String>,
    pub status: Option<String>,
    pub applied_date: Option<String>,
    pub offered_date: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub resume: Option<String>,
    pub notes: Option<String>,
    pub extra: Map<String, Value>,
}

impl ApplicationPatch {
    pub fn new(company: impl Into<String>, job_title: impl Into<String>) -> Self {
        Self {
            company: Some(company.into()),
            job_title: Some(job_title.into()),
            ..Default::default()
        }
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn applied_date(mut self, date: impl Into<String>) -> Self {
        self.applied_date = Some(date.into());
        self
    }

    pub fn offered_date(mut self, date: impl Into<String>) -> Self {
        self.offered_date = Some(date.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into an existing record. The id is never touched.
    pub fn apply_to(&self, record: &mut ApplicationRecord) {
        fn merge(slot: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        if let Some(company) = &self.company {
            record.company = company.clone();
        }
        if let Some(title) = &self.job_title {
            record.job_title = title.clone();
        }
        merge(&mut record.platform, &self.platform);
        merge(&mut record.status, &self.status);
        merge(&mut record.applied_date, &self.applied_date);
        merge(&mut record.offered_date, &self.offered_date);
        merge(&mut record.location, &self.location);
        merge(&mut record.salary, &self.salary);
        merge(&mut record.resume, &self.resume);
        merge(&mut record.notes, &self.notes);
        for (key, value) in &self.extra {
            record.extra.insert(key.clone(), value.clone());
        }
    }

    pub fn into_record(self, id: i64) -> ApplicationRecord {
        let mut record = ApplicationRecord {
            id,
            ..Default::default()
        };
        self.apply_to(&mut record);
        record
    }
}

/// First-run demonstration data for an empty slot.
pub fn sample_applications() -> Vec<ApplicationRecord> {
    let rows = [
        ("Innovate Inc.", "Senior Product Designer", "LinkedIn", "Oct 26, 2023", "Applied", "Remote", "$120k"),
        ("Tech Solutions", "Full-Stack Engineer", "Company Website", "Oct 24, 2023", "Applied", "", ""),
        ("Creative Minds", "Product Manager", "LinkedIn", "Oct 20, 2023", "Shortlisted", "", ""),
        ("NextGen Systems", "Lead Backend Engineer", "AngelList", "Oct 18, 2023", "Interview", "", ""),
        ("Growth Co.", "Marketing Director", "Company Website", "Oct 12, 2023", "Offered", "", ""),
        ("Digital Narratives", "Content Strategist", "LinkedIn", "Oct 10, 2023", "Rejected", "", ""),
    ];

    rows.iter()
        .zip(1..)
        .map(|(&(company, title, platform, applied, status, location, salary), id)| {
            let mut patch = ApplicationPatch::new(company, title)
                .platform(platform)
                .applied_date(applied)
                .status(status);
            if !location.is_empty() {
                patch.location = Some(location.to_string());
            }
            if !salary.is_empty() {
                patch.salary = Some(salary.to_string());
            }
            patch.into_record(id)
        })
        .collect()
}
