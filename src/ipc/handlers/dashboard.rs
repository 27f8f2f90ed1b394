use chrono::NaiveDate;
use serde_json::json;

use crate::calc::{self, HeatmapMetric, Selection, ALL_SENTINEL, DEFAULT_MIN_CLASSES};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

fn optional_date(req: &Request, key: &str) -> Result<Option<NaiveDate>, serde_json::Value> {
    let Some(value) = req.params.get(key) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let parsed = value
        .as_str()
        .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok());
    match parsed {
        Some(date) => Ok(Some(date)),
        None => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a YYYY-MM-DD string", key),
            Some(json!({ key: value.clone() })),
        )),
    }
}

/// Threshold control: default 3, floor 1.
fn min_classes_param(req: &Request) -> Result<usize, serde_json::Value> {
    let Some(value) = req.params.get("minClasses") else {
        return Ok(DEFAULT_MIN_CLASSES);
    };
    if value.is_null() {
        return Ok(DEFAULT_MIN_CLASSES);
    }
    match value.as_u64() {
        Some(n) => Ok((n as usize).max(1)),
        None => Err(err(
            &req.id,
            "bad_params",
            "minClasses must be a non-negative integer",
            Some(json!({ "minClasses": value.clone() })),
        )),
    }
}

fn selection_from(req: &Request) -> Result<Selection, serde_json::Value> {
    Ok(Selection {
        date_start: optional_date(req, "dateStart")?,
        date_end: optional_date(req, "dateEnd")?,
        discipline: optional_str(req, "discipline"),
        instructor: optional_str(req, "instructor"),
    }
    .normalized())
}

fn handle_filter_options(state: &mut AppState, req: &Request) -> serde_json::Value {
    if !state.session.authenticated {
        return err(
            &req.id,
            "not_authenticated",
            "log in before reading filter options",
            None,
        );
    }
    let Some(dataset) = &state.dataset else {
        return err(&req.id, "no_dataset", "load the class snapshot first", None);
    };

    let mut disciplines = vec![ALL_SENTINEL.to_string()];
    disciplines.extend(dataset.disciplines());
    let mut instructors = vec![ALL_SENTINEL.to_string()];
    instructors.extend(dataset.instructors());
    let span = dataset.date_span();

    ok(
        &req.id,
        json!({
            "disciplines": disciplines,
            "instructors": instructors,
            "dateStart": span.map(|(start, _)| start),
            "dateEnd": span.map(|(_, end)| end),
            "defaultMinClasses": DEFAULT_MIN_CLASSES,
        }),
    )
}

/// One full render cycle: guard, filter, aggregate. Unauthenticated sessions
/// get the prompt view back and nothing downstream runs.
fn handle_render(state: &mut AppState, req: &Request) -> serde_json::Value {
    if !state.session.authenticated {
        return ok(
            &req.id,
            json!({
                "view": "prompt",
                "message": "enter the studio passcode to view the dashboard",
                "authError": state.session.auth_error.clone(),
                "pendingInput": state.session.pending_input.clone(),
            }),
        );
    }
    let selection = match selection_from(req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let min_classes = match min_classes_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(dataset) = &state.dataset else {
        return err(&req.id, "no_dataset", "load the class snapshot first", None);
    };

    let view = calc::filter_rows(dataset, &selection);
    let payload = json!({
        "view": "dashboard",
        "selection": {
            "dateStart": view.date_start,
            "dateEnd": view.date_end,
            "discipline": selection.discipline.clone(),
            "instructor": selection.instructor.clone(),
        },
        "minClasses": min_classes,
        "kpis": calc::kpi_summary(&view.rows),
        "occupancyByDiscipline": calc::occupancy_by_discipline(&view.rows),
        "instructorRanking": calc::instructor_ranking(&view.rows),
        "occupancyByHour": calc::occupancy_by_hour(&view.rows),
        "occupancyByWeekday": calc::occupancy_by_weekday(&view.rows),
        "scorecard": calc::instructor_scorecard(&view.rows),
        "occupancyHeatmap": calc::heatmap(&view.rows, HeatmapMetric::Occupancy, min_classes),
        "noShowHeatmap": calc::heatmap(&view.rows, HeatmapMetric::NoShowRate, min_classes),
        "rows": calc::detail_rows(&view.rows),
    });
    state.session.remember_selection(selection, min_classes);
    ok(&req.id, payload)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "filters.options" => Some(handle_filter_options(state, req)),
        "dashboard.render" => Some(handle_render(state, req)),
        _ => None,
    }
}
