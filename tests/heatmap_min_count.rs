
use serde_json::json;
use test_support::{load_snapshot, login, request_ok, spawn_sidecar, temp_dir, write_snapshot};

#[test]
fn cells_below_the_threshold_are_dropped_and_threshold_one_keeps_all() {
    let dir = temp_dir("studiod-heatmap");
    // Three Monday-09 classes, one Tuesday-18 class.
    let data = write_snapshot(
        &dir,
        &[
            "2024-01-01,2024-01-01 09:00:00,Monday,9,Yoga,Ana,20,18,16,2,0.8,0.9,0.1",
            "2024-01-08,2024-01-08 09:00:00,Monday,9,Yoga,Ana,20,16,15,1,0.75,0.8,0.06",
            "2024-01-15,2024-01-15 09:00:00,Monday,9,Yoga,Ana,20,17,15,2,0.75,0.85,0.12",
            "2024-01-02,2024-01-02 18:00:00,Tuesday,18,Spin,Bea,24,24,22,2,0.92,1.0,0.08",
        ],
    );
    let (_child, mut stdin, mut reader) = spawn_sidecar(&data);
    login(&mut stdin, &mut reader, "1");
    load_snapshot(&mut stdin, &mut reader, "2");

    // Default threshold 3: only the Monday-09 cell survives, on both maps.
    let dashboard = request_ok(&mut stdin, &mut reader, "3", "dashboard.render", json!({}));
    for key in ["occupancyHeatmap", "noShowHeatmap"] {
        let cells = dashboard[key].as_array().expect("heatmap array");
        assert_eq!(cells.len(), 1, "{key} should keep one cell");
        assert_eq!(cells[0]["weekday"], json!("Monday"));
        assert_eq!(cells[0]["hour"], json!(9));
        assert_eq!(cells[0]["classCount"], json!(3));
    }

    // Threshold 1 keeps every non-empty (weekday, hour) combination.
    let loose = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "dashboard.render",
        json!({ "minClasses": 1 }),
    );
    let cells = loose["occupancyHeatmap"].as_array().expect("heatmap array");
    assert_eq!(cells.len(), 2);
    // Calendar-major layout: Monday before Tuesday.
    assert_eq!(cells[0]["weekday"], json!("Monday"));
    assert_eq!(cells[1]["weekday"], json!("Tuesday"));
    assert_eq!(cells[1]["avgValue"], json!(0.92));

    // No returned cell is ever below the configured threshold.
    for resp in [&dashboard, &loose] {
        let min = resp["minClasses"].as_u64().expect("minClasses");
        for cell in resp["occupancyHeatmap"].as_array().expect("cells") {
            assert!(cell["classCount"].as_u64().expect("count") >= min);
        }
    }

    // Zero clamps to the floor of one instead of admitting empty cells.
    let clamped = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "dashboard.render",
        json!({ "minClasses": 0 }),
    );
    assert_eq!(clamped["minClasses"], json!(1));
    assert_eq!(
        clamped["occupancyHeatmap"].as_array().expect("cells").len(),
        2
    );
}
