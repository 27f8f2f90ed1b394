use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dataset::{Dataset, SessionRecord, Weekday};

/// Heatmap cells below this supporting-row count are hidden by default.
pub const DEFAULT_MIN_CLASSES: usize = 3;

/// Selector value meaning "no restriction" for discipline and instructor.
pub const ALL_SENTINEL: &str = "All";

/// The active filter controls. `None` on either date bound means "use the
/// dataset's observed min/max"; `None` (or the `"All"` sentinel) on the
/// categorical predicates means no restriction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub discipline: Option<String>,
    pub instructor: Option<String>,
}

fn restriction(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ALL_SENTINEL)
}

impl Selection {
    /// Collapses empty strings and the `"All"` sentinel into `None`.
    pub fn normalized(self) -> Selection {
        Selection {
            discipline: restriction(self.discipline.as_deref()).map(str::to_string),
            instructor: restriction(self.instructor.as_deref()).map(str::to_string),
            ..self
        }
    }
}

/// A fresh copy of the rows matching the selection, plus the date bounds
/// that were actually applied. Mutating it never touches the dataset.
#[derive(Debug, Clone)]
pub struct FilteredView {
    pub rows: Vec<SessionRecord>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

/// The three predicates AND together. Rows whose date failed to parse never
/// pass the inclusive range test, whatever the bounds are.
pub fn filter_rows(dataset: &Dataset, selection: &Selection) -> FilteredView {
    let span = dataset.date_span();
    let date_start = selection.date_start.or(span.map(|(min, _)| min));
    let date_end = selection.date_end.or(span.map(|(_, max)| max));
    let discipline = restriction(selection.discipline.as_deref());
    let instructor = restriction(selection.instructor.as_deref());

    let rows = dataset
        .rows()
        .iter()
        .filter(|row| {
            let Some(date) = row.date else {
                return false;
            };
            if let Some(start) = date_start {
                if date < start {
                    return false;
                }
            }
            if let Some(end) = date_end {
                if date > end {
                    return false;
                }
            }
            if let Some(want) = discipline {
                if row.discipline.as_deref() != Some(want) {
                    return false;
                }
            }
            if let Some(want) = instructor {
                if row.instructor.as_deref() != Some(want) {
                    return false;
                }
            }
            true
        })
        .cloned()
        .collect();

    FilteredView {
        rows,
        date_start,
        date_end,
    }
}

/// Running mean over an optional metric: `rows` counts every contributing
/// record, `samples` only the non-missing values the mean is taken over.
#[derive(Debug, Clone, Copy, Default)]
struct MetricAcc {
    sum: f64,
    samples: usize,
    rows: usize,
}

impl MetricAcc {
    fn push(&mut self, value: Option<f64>) {
        self.rows += 1;
        if let Some(v) = value {
            self.sum += v;
            self.samples += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.samples == 0 {
            None
        } else {
            Some(self.sum / self.samples as f64)
        }
    }
}

/// Groups rows by an optional key; rows with a missing key are excluded from
/// this grouping only. `BTreeMap` gives the key's natural ascending order.
fn group_metric<K: Ord>(
    rows: &[SessionRecord],
    key: impl Fn(&SessionRecord) -> Option<K>,
    metric: impl Fn(&SessionRecord) -> Option<f64>,
) -> BTreeMap<K, MetricAcc> {
    let mut buckets: BTreeMap<K, MetricAcc> = BTreeMap::new();
    for row in rows {
        let Some(k) = key(row) else {
            continue;
        };
        buckets.entry(k).or_default().push(metric(row));
    }
    buckets
}

/// Descending order on optional means; groups with no samples sort last.
fn cmp_mean_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub total_classes: usize,
    pub avg_occupancy: Option<f64>,
    pub avg_booking_rate: Option<f64>,
    pub avg_no_show_rate: Option<f64>,
}

/// Headline numbers for the filtered view. Means ignore missing values; an
/// empty view reports `None`, which the frontend renders as "no data".
pub fn kpi_summary(rows: &[SessionRecord]) -> KpiSummary {
    let mut occupancy = MetricAcc::default();
    let mut booking = MetricAcc::default();
    let mut no_show = MetricAcc::default();
    for row in rows {
        occupancy.push(row.capacity_utilization);
        booking.push(row.booking_rate);
        no_show.push(row.no_show_rate);
    }
    KpiSummary {
        total_classes: rows.len(),
        avg_occupancy: occupancy.mean(),
        avg_booking_rate: booking.mean(),
        avg_no_show_rate: no_show.mean(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisciplineOccupancy {
    pub discipline: String,
    pub avg_occupancy: Option<f64>,
    pub class_count: usize,
}

/// Mean occupancy per discipline, sorted by discipline name.
pub fn occupancy_by_discipline(rows: &[SessionRecord]) -> Vec<DisciplineOccupancy> {
    group_metric(rows, |r| r.discipline.clone(), |r| r.capacity_utilization)
        .into_iter()
        .map(|(discipline, acc)| DisciplineOccupancy {
            discipline,
            avg_occupancy: acc.mean(),
            class_count: acc.rows,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorOccupancy {
    pub instructor: String,
    pub avg_occupancy: Option<f64>,
    pub class_count: usize,
}

/// Mean occupancy per instructor, best first (the worst/best ranking).
pub fn instructor_ranking(rows: &[SessionRecord]) -> Vec<InstructorOccupancy> {
    let mut ranking: Vec<InstructorOccupancy> =
        group_metric(rows, |r| r.instructor.clone(), |r| r.capacity_utilization)
            .into_iter()
            .map(|(instructor, acc)| InstructorOccupancy {
                instructor,
                avg_occupancy: acc.mean(),
                class_count: acc.rows,
            })
            .collect();
    ranking.sort_by(|a, b| {
        cmp_mean_desc(a.avg_occupancy, b.avg_occupancy)
            .then_with(|| a.instructor.cmp(&b.instructor))
    });
    ranking
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourOccupancy {
    pub hour: u32,
    pub avg_occupancy: Option<f64>,
    pub class_count: usize,
}

/// Mean occupancy per hour of day, hours ascending.
pub fn occupancy_by_hour(rows: &[SessionRecord]) -> Vec<HourOccupancy> {
    group_metric(rows, |r| r.hour, |r| r.capacity_utilization)
        .into_iter()
        .map(|(hour, acc)| HourOccupancy {
            hour,
            avg_occupancy: acc.mean(),
            class_count: acc.rows,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayOccupancy {
    pub weekday: Weekday,
    pub avg_occupancy: Option<f64>,
    pub class_count: usize,
}

/// Mean occupancy per weekday, Monday..Sunday.
pub fn occupancy_by_weekday(rows: &[SessionRecord]) -> Vec<WeekdayOccupancy> {
    group_metric(rows, |r| r.weekday, |r| r.capacity_utilization)
        .into_iter()
        .map(|(weekday, acc)| WeekdayOccupancy {
            weekday,
            avg_occupancy: acc.mean(),
            class_count: acc.rows,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorecardRow {
    pub instructor: String,
    pub avg_occupancy: Option<f64>,
    pub avg_no_show_rate: Option<f64>,
    pub class_count: usize,
}

/// Per-instructor scorecard ordered by (occupancy desc, class count desc);
/// ties in occupancy break toward the larger sample.
pub fn instructor_scorecard(rows: &[SessionRecord]) -> Vec<ScorecardRow> {
    #[derive(Default)]
    struct Acc {
        occupancy: MetricAcc,
        no_show: MetricAcc,
    }

    let mut buckets: BTreeMap<String, Acc> = BTreeMap::new();
    for row in rows {
        let Some(instructor) = row.instructor.clone() else {
            continue;
        };
        let acc = buckets.entry(instructor).or_default();
        acc.occupancy.push(row.capacity_utilization);
        acc.no_show.push(row.no_show_rate);
    }

    let mut scorecard: Vec<ScorecardRow> = buckets
        .into_iter()
        .map(|(instructor, acc)| ScorecardRow {
            instructor,
            avg_occupancy: acc.occupancy.mean(),
            avg_no_show_rate: acc.no_show.mean(),
            class_count: acc.occupancy.rows,
        })
        .collect();
    scorecard.sort_by(|a, b| {
        cmp_mean_desc(a.avg_occupancy, b.avg_occupancy)
            .then_with(|| b.class_count.cmp(&a.class_count))
            .then_with(|| a.instructor.cmp(&b.instructor))
    });
    scorecard
}

/// Metric column a heatmap aggregates; both instances share the same logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatmapMetric {
    Occupancy,
    NoShowRate,
}

impl HeatmapMetric {
    fn extract(self, row: &SessionRecord) -> Option<f64> {
        match self {
            HeatmapMetric::Occupancy => row.capacity_utilization,
            HeatmapMetric::NoShowRate => row.no_show_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    pub weekday: Weekday,
    pub hour: u32,
    pub avg_value: Option<f64>,
    pub class_count: usize,
}

/// (weekday, hour) cells with at least `min_classes` supporting rows, in
/// calendar-major, hour-ascending order. The threshold floor is 1; the cell
/// count is the number of rows, so a surviving cell can still carry a `None`
/// mean when the metric itself is all-missing.
pub fn heatmap(
    rows: &[SessionRecord],
    metric: HeatmapMetric,
    min_classes: usize,
) -> Vec<HeatmapCell> {
    let min_classes = min_classes.max(1);
    group_metric(
        rows,
        |r| match (r.weekday, r.hour) {
            (Some(weekday), Some(hour)) => Some((weekday, hour)),
            _ => None,
        },
        |r| metric.extract(r),
    )
    .into_iter()
    .filter(|(_, acc)| acc.rows >= min_classes)
    .map(|((weekday, hour), acc)| HeatmapCell {
        weekday,
        hour,
        avg_value: acc.mean(),
        class_count: acc.rows,
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub date: Option<NaiveDate>,
    pub start: Option<chrono::NaiveDateTime>,
    pub discipline: Option<String>,
    pub instructor: Option<String>,
    pub hour: Option<u32>,
    pub capacity: Option<i64>,
    pub bookings: Option<i64>,
    pub attended: Option<i64>,
    pub no_shows: Option<i64>,
    pub capacity_utilization: Option<f64>,
    pub booking_rate: Option<f64>,
    pub no_show_rate: Option<f64>,
}

/// The detail table preview: one row per filtered record, in source order.
/// Rounding is left to the frontend.
pub fn detail_rows(rows: &[SessionRecord]) -> Vec<TableRow> {
    rows.iter()
        .map(|row| TableRow {
            date: row.date,
            start: row.start,
            discipline: row.discipline.clone(),
            instructor: row.instructor.clone(),
            hour: row.hour,
            capacity: row.capacity,
            bookings: row.bookings,
            attended: row.attended,
            no_shows: row.no_shows,
            capacity_utilization: row.capacity_utilization,
            booking_rate: row.booking_rate,
            no_show_rate: row.no_show_rate,
        })
        .collect()
}
