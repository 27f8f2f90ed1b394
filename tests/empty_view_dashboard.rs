
use serde_json::json;
use test_support::{load_snapshot, login, request_ok, spawn_sidecar, temp_dir, write_snapshot};

#[test]
fn a_filter_matching_nothing_is_a_success_with_explicit_missing_values() {
    let dir = temp_dir("studiod-empty");
    let data = write_snapshot(
        &dir,
        &["2024-01-01,2024-01-01 09:00:00,Monday,9,Yoga,Ana,20,18,16,2,0.8,0.9,0.1"],
    );
    let (_child, mut stdin, mut reader) = spawn_sidecar(&data);
    login(&mut stdin, &mut reader, "1");
    load_snapshot(&mut stdin, &mut reader, "2");

    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "dashboard.render",
        json!({ "dateStart": "2030-01-01", "dateEnd": "2030-12-31" }),
    );
    assert_eq!(empty["view"], json!("dashboard"));
    assert_eq!(empty["kpis"]["totalClasses"], json!(0));
    // Means are missing, not zero.
    assert!(empty["kpis"]["avgOccupancy"].is_null());
    assert!(empty["kpis"]["avgBookingRate"].is_null());
    assert!(empty["kpis"]["avgNoShowRate"].is_null());

    for key in [
        "occupancyByDiscipline",
        "instructorRanking",
        "occupancyByHour",
        "occupancyByWeekday",
        "scorecard",
        "occupancyHeatmap",
        "noShowHeatmap",
        "rows",
    ] {
        assert_eq!(
            empty[key],
            json!([]),
            "{key} must be an empty list for an empty view"
        );
    }
}

#[test]
fn an_empty_snapshot_renders_the_same_way() {
    let dir = temp_dir("studiod-empty-snapshot");
    let data = write_snapshot(&dir, &[]);
    let (_child, mut stdin, mut reader) = spawn_sidecar(&data);
    login(&mut stdin, &mut reader, "1");
    load_snapshot(&mut stdin, &mut reader, "2");

    let rendered = request_ok(&mut stdin, &mut reader, "3", "dashboard.render", json!({}));
    assert_eq!(rendered["view"], json!("dashboard"));
    assert_eq!(rendered["kpis"]["totalClasses"], json!(0));
    assert!(rendered["kpis"]["avgOccupancy"].is_null());
    assert!(rendered["selection"]["dateStart"].is_null());
    assert_eq!(rendered["rows"], json!([]));
}
