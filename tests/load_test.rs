use std::path::Path;
use std::time::{Duration, Instant};

use wcon_canon::model::{Attribute, CellValue, ColumnKey, SubjectId};
use wcon_canon::{load_file, load_str, CanonicalTable, LoadOptions, WconError};

fn col(id: i64, key: Attribute, aspect: usize) -> ColumnKey {
    ColumnKey::new(SubjectId::from(id), key, aspect)
}

fn value(table: &CanonicalTable, t: f64, column: &ColumnKey) -> Option<f64> {
    table.get(t, column).and_then(CellValue::as_f64)
}

fn wcon(data: &str) -> String {
    format!(r#"{{"tracker-commons":true,"units":{{"t":"s","x":"mm","y":"mm"}},"data":{data}}}"#)
}

fn table_of_text(text: &str) -> CanonicalTable {
    load_str(text).unwrap().worm.table().cloned().unwrap()
}

fn table_of(data: &str) -> CanonicalTable {
    table_of_text(&wcon(data))
}

#[test]
fn single_scalar_time_record() {
    let table = table_of(r#"[{"id":1,"t":1.3,"x":[7.2,5],"y":[0.5,0.86]}]"#);
    assert_eq!(table.num_rows(), 1);
    assert_eq!(
        table.columns(),
        &[
            col(1, Attribute::X, 0),
            col(1, Attribute::X, 1),
            col(1, Attribute::Y, 0),
            col(1, Attribute::Y, 1),
        ]
    );
    assert_eq!(value(&table, 1.3, &col(1, Attribute::X, 0)), Some(7.2));
    assert_eq!(value(&table, 1.3, &col(1, Attribute::X, 1)), Some(5.0));
    assert_eq!(value(&table, 1.3, &col(1, Attribute::Y, 0)), Some(0.5));
    assert_eq!(value(&table, 1.3, &col(1, Attribute::Y, 1)), Some(0.86));
}

#[test]
fn equal_resampling_merges() {
    let table = table_of(r#"[{"id":1,"t":2.0,"x":[3.1]},{"id":1,"t":2.0,"x":[3.1]}]"#);
    assert_eq!(table.num_rows(), 1);
    assert_eq!(value(&table, 2.0, &col(1, Attribute::X, 0)), Some(3.1));
}

#[test]
fn contradicting_resampling_fails() {
    let data = r#"[{"id":1,"t":2.0,"x":[3.1]},{"id":1,"t":2.0,"x":[3.2]}]"#;
    let err = load_str(&wcon(data)).unwrap_err();
    match err {
        WconError::DataConflict(report) => {
            assert_eq!(report.cells.len(), 1);
            assert_eq!(report.cells[0].column, col(1, Attribute::X, 0));
            assert_eq!(report.cells[0].t.get(), 2.0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn disjoint_subjects_stay_absent_not_zero() {
    let table = table_of(r#"[{"id":1,"t":[0,1],"x":[[1],[2]]},{"id":2,"t":[5,6],"x":[[3],[4]]}]"#);
    assert_eq!(table.num_rows(), 4);
    for t in [5.0, 6.0] {
        assert_eq!(table.get(t, &col(1, Attribute::X, 0)), None);
    }
    for t in [0.0, 1.0] {
        assert_eq!(table.get(t, &col(2, Attribute::X, 0)), None);
    }
}

#[test]
fn broadcast_scalar_fills_every_time_point() {
    let table = table_of(r#"[{"id":1,"t":[0,1,2,3],"head":"L","ventral":"CW"}]"#);
    for t in 0..4 {
        assert_eq!(
            table.get(t as f64, &col(1, Attribute::Head, 0)),
            Some(&CellValue::Label("L".into()))
        );
    }
}

#[test]
fn origin_offsets_fold_into_positions() {
    let table = table_of(r#"[{"id":1,"t":[0,1],"x":[[1],[2]],"ox":5}]"#);
    assert_eq!(value(&table, 0.0, &col(1, Attribute::X, 0)), Some(6.0));
    assert_eq!(value(&table, 1.0, &col(1, Attribute::X, 0)), Some(7.0));
    assert_eq!(value(&table, 0.0, &col(1, Attribute::Ox, 0)), Some(0.0));
    assert_eq!(value(&table, 1.0, &col(1, Attribute::Ox, 0)), Some(0.0));
}

#[test]
fn offset_column_is_zeroed_on_every_row() {
    let table = table_of(
        r#"[{"id":1,"t":[0,1],"x":[[1],[2]]},{"id":1,"t":1,"ox":3},{"id":2,"t":4,"x":[0]}]"#,
    );
    assert_eq!(value(&table, 0.0, &col(1, Attribute::X, 0)), Some(1.0));
    assert_eq!(value(&table, 1.0, &col(1, Attribute::X, 0)), Some(5.0));
    for t in [0.0, 1.0, 4.0] {
        assert_eq!(value(&table, t, &col(1, Attribute::Ox, 0)), Some(0.0));
    }
    assert_eq!(table.get(4.0, &col(1, Attribute::X, 0)), None);
}

#[test]
fn offset_from_another_segment_applies_after_merge() {
    let table = table_of(r#"[{"id":1,"t":[0,1],"y":[[1,2],[3,4]]},{"id":1,"t":1,"oy":-1}]"#);
    assert_eq!(value(&table, 0.0, &col(1, Attribute::Y, 0)), Some(1.0));
    assert_eq!(value(&table, 1.0, &col(1, Attribute::Y, 0)), Some(2.0));
    assert_eq!(value(&table, 1.0, &col(1, Attribute::Y, 1)), Some(3.0));
}

#[test]
fn segment_permutations_give_identical_tables() {
    let records = [
        r#"{"id":1,"t":[0,1],"x":[[1,2],[3,4]],"y":[[5,6],[7,8]]}"#,
        r#"{"id":1,"t":[1,2],"x":[[3,4],[9,9]],"ox":[0.5]}"#,
        r#"{"id":"w2","t":1,"x":[0]}"#,
        r#"{"id":2,"t":[0,3],"y":[[1],[2]]}"#,
    ];
    let orders = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]];
    let tables: Vec<CanonicalTable> = orders
        .iter()
        .map(|order| {
            let data: Vec<&str> = order.iter().map(|&i| records[i]).collect();
            table_of(&format!("[{}]", data.join(",")))
        })
        .collect();
    for t in &tables[1..] {
        assert_eq!(t, &tables[0]);
    }
}

#[test]
fn conflict_is_reported_in_every_order() {
    let a = r#"{"id":1,"t":[0,1],"x":[[1],[2]]}"#;
    let b = r#"{"id":2,"t":[0],"x":[[7]]}"#;
    let c = r#"{"id":1,"t":[1],"x":[[2.5]]}"#;
    for data in [format!("[{a},{b},{c}]"), format!("[{c},{b},{a}]"), format!("[{b},{c},{a}]")] {
        assert!(matches!(load_str(&wcon(&data)), Err(WconError::DataConflict(_))));
    }
}

#[test]
fn thousands_of_single_frame_records_load_quickly() {
    let aspects: Vec<String> = (0..20).map(|a| a.to_string()).collect();
    let aspects = aspects.join(",");
    let records: Vec<String> = (0..4000)
        .map(|i| format!(r#"{{"id":1,"t":{i},"x":[{aspects}],"y":[{aspects}]}}"#))
        .collect();
    let text = wcon(&format!("[{}]", records.join(",")));

    let started = Instant::now();
    let table = table_of_text(&text);
    assert!(started.elapsed() < Duration::from_secs(20), "took {:?}", started.elapsed());
    assert_eq!(table.num_rows(), 4000);
    assert_eq!(table.num_columns(), 40);
}

#[test]
fn canonical_text_round_trips() {
    let text = wcon(
        r#"[{"id":1,"t":[0.1,0.2],"x":[[1,2,3],[4,5,6]],"y":[[0,0,0],[1,1,1]],"oy":[2,3]},
            {"id":2,"t":0.2,"x":[8],"head":"R"}]"#,
    );
    let first = load_str(&text).unwrap().worm;
    let second = load_str(&first.to_canonical_string().unwrap()).unwrap().worm;
    assert_eq!(first.table(), second.table());
    assert_eq!(first.units(), second.units());
}

#[test]
fn duplicate_keys_are_fatal_at_any_depth() {
    let nested =
        r#"{"tracker-commons":true,"units":{},"metadata":{"lab":{"a":1,"a":2}},"data":[]}"#;
    assert!(matches!(load_str(nested), Err(WconError::DuplicateKey { .. })));
}

#[test]
fn unknown_unit_is_fatal() {
    let text = r#"{"tracker-commons":true,"units":{"x":"parsecs-ish"},"data":[]}"#;
    assert!(matches!(load_str(text), Err(WconError::UnknownUnit { .. })));
}

// ---------------------------------------------------------------------------
// Chunked files
// ---------------------------------------------------------------------------

fn write_chunk(
    dir: &Path,
    name: &str,
    this: &str,
    prev: Option<&str>,
    next: Option<&str>,
    data: &str,
) {
    let link = |l: Option<&str>| l.map_or("null".to_string(), |s| format!("[\"{s}\"]"));
    let text = format!(
        r#"{{"tracker-commons":true,"units":{{"t":"s"}},
            "files":{{"this":"{this}","prev":{},"next":{}}},
            "data":{data}}}"#,
        link(prev),
        link(next)
    );
    std::fs::write(dir.join(name), text).unwrap();
}

fn three_chunks(dir: &Path) {
    let first = r#"[{"id":1,"t":[0,1],"x":[[1],[2]]}]"#;
    let second = r#"[{"id":1,"t":[1,2],"x":[[2],[3]],"ox":[10]}]"#;
    let third = r#"[{"id":1,"t":[3],"x":[[4]]}]"#;
    write_chunk(dir, "run_1.wcon", "_1", None, Some("_2"), first);
    write_chunk(dir, "run_2.wcon", "_2", Some("_1"), Some("_3"), second);
    write_chunk(dir, "run_3.wcon", "_3", Some("_2"), None, third);
}

#[test]
fn loading_any_chunk_gives_the_same_table() {
    let dir = tempfile::tempdir().unwrap();
    three_chunks(dir.path());
    let tables: Vec<CanonicalTable> = ["run_1.wcon", "run_2.wcon", "run_3.wcon"]
        .iter()
        .map(|name| {
            load_file(&dir.path().join(name), &LoadOptions::default())
                .unwrap()
                .worm
                .table()
                .cloned()
                .unwrap()
        })
        .collect();
    assert_eq!(tables[0], tables[1]);
    assert_eq!(tables[1], tables[2]);
    assert_eq!(tables[0].num_rows(), 4);
}

#[test]
fn offsets_from_a_later_chunk_reach_earlier_positions() {
    let dir = tempfile::tempdir().unwrap();
    three_chunks(dir.path());
    let table = load_file(&dir.path().join("run_1.wcon"), &LoadOptions::default())
        .unwrap()
        .worm
        .table()
        .cloned()
        .unwrap();
    // ox=10 from chunk 2 covers t=1 and t=2; t=1 is also reported by chunk 1.
    assert_eq!(value(&table, 0.0, &col(1, Attribute::X, 0)), Some(1.0));
    assert_eq!(value(&table, 1.0, &col(1, Attribute::X, 0)), Some(12.0));
    assert_eq!(value(&table, 2.0, &col(1, Attribute::X, 0)), Some(13.0));
    assert_eq!(value(&table, 3.0, &col(1, Attribute::X, 0)), Some(4.0));
}

#[test]
fn single_file_option_ignores_links() {
    let dir = tempfile::tempdir().unwrap();
    three_chunks(dir.path());
    let loaded = load_file(&dir.path().join("run_2.wcon"), &LoadOptions::single_file()).unwrap();
    assert_eq!(loaded.worm.table().unwrap().num_rows(), 2);
}

#[test]
fn conflicting_chunks_fail_the_whole_load() {
    let dir = tempfile::tempdir().unwrap();
    write_chunk(dir.path(), "a_1.wcon", "_1", None, Some("_2"), r#"[{"id":1,"t":[0],"x":[[1]]}]"#);
    write_chunk(dir.path(), "a_2.wcon", "_2", Some("_1"), None, r#"[{"id":1,"t":[0],"x":[[9]]}]"#);
    let err = load_file(&dir.path().join("a_1.wcon"), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, WconError::DataConflict(_)));
}

#[test]
fn missing_chunk_is_a_link_error() {
    let dir = tempfile::tempdir().unwrap();
    write_chunk(dir.path(), "b_1.wcon", "_1", None, Some("_2"), r#"[{"id":1,"t":[0],"x":[[1]]}]"#);
    let err = load_file(&dir.path().join("b_1.wcon"), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, WconError::ChunkLink { .. }));
}

#[test]
fn chunk_link_cycle_is_a_link_error() {
    let dir = tempfile::tempdir().unwrap();
    write_chunk(dir.path(), "c_1.wcon", "_1", Some("_2"), None, r#"[{"id":1,"t":[0],"x":[[1]]}]"#);
    write_chunk(dir.path(), "c_2.wcon", "_2", Some("_1"), None, r#"[{"id":1,"t":[1],"x":[[2]]}]"#);
    let err = load_file(&dir.path().join("c_1.wcon"), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, WconError::ChunkLink { .. }));
}

#[test]
fn worm_merge_is_order_independent() {
    let a = load_str(&wcon(r#"[{"id":1,"t":[0,1],"x":[[1],[2]]}]"#)).unwrap().worm;
    let b = load_str(&wcon(r#"[{"id":2,"t":[1,2],"y":[[1],[2]]}]"#)).unwrap().worm;
    let c = load_str(&wcon(r#"[{"id":1,"t":[1],"x":[[2]]}]"#)).unwrap().worm;
    let abc = a.merge(&b).unwrap().merge(&c).unwrap();
    let cba = c.merge(&b).unwrap().merge(&a).unwrap();
    assert_eq!(abc.table(), cba.table());
}
