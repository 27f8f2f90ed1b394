use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

/// Calendar-ordered weekday categorical (Monday first). Anything that is not
/// one of the seven names parses to `None`, so downstream sorts always follow
/// calendar order, never lexical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn parse(raw: &str) -> Option<Weekday> {
        match raw.trim() {
            "Monday" => Some(Weekday::Monday),
            "Tuesday" => Some(Weekday::Tuesday),
            "Wednesday" => Some(Weekday::Wednesday),
            "Thursday" => Some(Weekday::Thursday),
            "Friday" => Some(Weekday::Friday),
            "Saturday" => Some(Weekday::Saturday),
            "Sunday" => Some(Weekday::Sunday),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl Serialize for Weekday {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One scheduled class occurrence. Every parsed field is an `Option`: a cell
/// that fails to parse becomes `None` and the row is kept. Filters and
/// aggregates treat `None` as excluded, never as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRecord {
    pub start: Option<NaiveDateTime>,
    pub date: Option<NaiveDate>,
    pub weekday: Option<Weekday>,
    pub hour: Option<u32>,
    pub discipline: Option<String>,
    pub instructor: Option<String>,
    pub capacity: Option<i64>,
    pub bookings: Option<i64>,
    pub attended: Option<i64>,
    pub no_shows: Option<i64>,
    pub capacity_utilization: Option<f64>,
    pub booking_rate: Option<f64>,
    pub no_show_rate: Option<f64>,
}

/// The class snapshot, loaded once per process. There is no invalidation
/// trigger; the handle lives in the app state for the rest of the run.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: PathBuf,
    rows: Vec<SessionRecord>,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    parse_datetime(raw).map(|dt| dt.date())
}

pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Integer cells may be serialized as "12" or "12.0" depending on how the
/// snapshot was exported; both parse, anything else is missing.
fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
        _ => None,
    }
}

fn parse_hour(raw: &str) -> Option<u32> {
    parse_int(raw).and_then(|v| u32::try_from(v).ok())
}

fn parse_ratio(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Header positions for the snapshot columns. A column that is absent from
/// the file resolves to `None` and every row reads it as missing.
struct ColumnIndex {
    date: Option<usize>,
    start: Option<usize>,
    weekday: Option<usize>,
    hour: Option<usize>,
    discipline: Option<usize>,
    instructor: Option<usize>,
    capacity: Option<usize>,
    bookings: Option<usize>,
    attended: Option<usize>,
    no_shows: Option<usize>,
    capacity_utilization: Option<usize>,
    booking_rate: Option<usize>,
    no_show_rate: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord) -> ColumnIndex {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        ColumnIndex {
            date: position("Date"),
            start: position("StartDateTime"),
            weekday: position("Weekday"),
            hour: position("Hour"),
            discipline: position("Disciplina"),
            instructor: position("Entrenador"),
            capacity: position("Capacity"),
            bookings: position("Bookings"),
            attended: position("Attended"),
            no_shows: position("NoShows"),
            capacity_utilization: position("CapacityUtilization"),
            booking_rate: position("BookingRate"),
            no_show_rate: position("NoShowRate"),
        }
    }
}

fn field<'a>(record: &'a csv::StringRecord, idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_row(cols: &ColumnIndex, record: &csv::StringRecord) -> SessionRecord {
    SessionRecord {
        start: field(record, cols.start).and_then(parse_datetime),
        date: field(record, cols.date).and_then(parse_date),
        weekday: field(record, cols.weekday).and_then(Weekday::parse),
        hour: field(record, cols.hour).and_then(parse_hour),
        discipline: field(record, cols.discipline).map(str::to_string),
        instructor: field(record, cols.instructor).map(str::to_string),
        capacity: field(record, cols.capacity).and_then(parse_int),
        bookings: field(record, cols.bookings).and_then(parse_int),
        attended: field(record, cols.attended).and_then(parse_int),
        no_shows: field(record, cols.no_shows).and_then(parse_int),
        capacity_utilization: field(record, cols.capacity_utilization).and_then(parse_ratio),
        booking_rate: field(record, cols.booking_rate).and_then(parse_ratio),
        no_show_rate: field(record, cols.no_show_rate).and_then(parse_ratio),
    }
}

impl Dataset {
    /// Reads the snapshot in source order. A missing or unreadable file is
    /// fatal for the load; bad cells inside the file are not.
    pub fn load(path: &Path) -> anyhow::Result<Dataset> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("open class snapshot {}", path.display()))?;
        let cols = ColumnIndex::resolve(
            reader
                .headers()
                .with_context(|| format!("read headers of {}", path.display()))?,
        );
        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.with_context(|| format!("read row from {}", path.display()))?;
            rows.push(parse_row(&cols, &record));
        }
        Ok(Dataset {
            source: path.to_path_buf(),
            rows,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn rows(&self) -> &[SessionRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Min/max of the parsed `Date` column; `None` when no row has a date.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut span: Option<(NaiveDate, NaiveDate)> = None;
        for date in self.rows.iter().filter_map(|r| r.date) {
            span = Some(match span {
                None => (date, date),
                Some((min, max)) => (min.min(date), max.max(date)),
            });
        }
        span
    }

    /// Distinct non-missing disciplines, sorted ascending.
    pub fn disciplines(&self) -> Vec<String> {
        distinct(self.rows.iter().filter_map(|r| r.discipline.as_deref()))
    }

    /// Distinct non-missing instructors, sorted ascending.
    pub fn instructors(&self) -> Vec<String> {
        distinct(self.rows.iter().filter_map(|r| r.instructor.as_deref()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let set: BTreeSet<&str> = values.collect();
    set.into_iter().map(str::to_string).collect()
}
