use nbg_check::{CellRecord, DryRun, IssueKind, RepairEngine, Validator};
use nbg_schema::{CellType, SeededIds};
use nbg_test_utils::{record, tests_json};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn flag() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        Just(Some(json!(true))),
        Just(Some(json!(false))),
        Just(Some(json!("yes"))),
        Just(Some(Value::Null)),
    ]
}

fn points() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        (-10i64..10).prop_map(|p| Some(json!(p))),
        (0.0f64..5.0).prop_map(|p| Some(json!(p))),
        (0u8..5).prop_map(|p| Some(json!(f64::from(p)))),
        Just(Some(json!("3"))),
        Just(Some(json!("many"))),
    ]
}

fn grade_id() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        Just(Some(json!("shared"))),
        Just(Some(json!("cell-aaaaaaaaaaaa"))),
        Just(Some(json!("with space"))),
        Just(Some(json!("with_space"))),
        Just(Some(json!(""))),
        Just(Some(json!(12))),
        "[a-z]{1,3}".prop_map(|s| Some(json!(s))),
    ]
}

fn version() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        Just(Some(json!(3))),
        Just(Some(json!(3.0))),
        Just(Some(json!(1))),
        Just(Some(json!("3"))),
    ]
}

/// Keys nbgrader's own tooling writes next to the schema fields
fn toolchain_keys() -> impl Strategy<Value = Map<String, Value>> {
    prop_oneof![
        Just(Map::new()),
        "[0-9a-f]{8}".prop_map(|checksum| {
            let mut map = Map::new();
            map.insert("checksum".to_string(), json!(checksum));
            map.insert("cell_type".to_string(), json!("code"));
            map
        }),
    ]
}

fn raw_record() -> impl Strategy<Value = Value> {
    (
        (version(), grade_id(), flag(), flag()),
        (flag(), flag(), points(), toolchain_keys()),
    )
        .prop_map(|((version, id, grade, solution), (locked, task, points, extra))| {
            let mut map = extra;
            let fields = [
                ("schema_version", version),
                ("grade_id", id),
                ("grade", grade),
                ("solution", solution),
                ("locked", locked),
                ("task", task),
                ("points", points),
            ];
            for (key, value) in fields {
                if let Some(value) = value {
                    map.insert(key.to_string(), value);
                }
            }
            Value::Object(map)
        })
}

fn document() -> impl Strategy<Value = Vec<CellRecord>> {
    proptest::collection::vec((any::<bool>(), proptest::option::of(raw_record())), 0..12).prop_map(
        |cells| {
            cells
                .into_iter()
                .enumerate()
                .map(|(index, (is_code, raw))| CellRecord::from_raw(index, is_code, raw))
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn prop_repair_is_idempotent(mut cells in document(), seed in any::<u64>()) {
        let mut engine = RepairEngine::with_id_source(SeededIds::new(seed));
        engine.repair(&mut cells, &mut DryRun);
        let snapshot = cells.clone();

        let second = engine.repair(&mut cells, &mut DryRun);
        prop_assert!(second.is_clean());
        prop_assert_eq!(cells, snapshot);
    }

    #[test]
    fn prop_repaired_documents_validate(mut cells in document(), seed in any::<u64>()) {
        let mut engine = RepairEngine::with_id_source(SeededIds::new(seed));
        engine.repair(&mut cells, &mut DryRun);

        let report = Validator::new().validate(&cells);
        prop_assert!(report.is_valid(), "errors after repair: {:?}", report.error_messages());
    }

    #[test]
    fn prop_repair_never_adds_or_drops_records(mut cells in document()) {
        let before: Vec<bool> = cells.iter().map(|c| c.record.is_some()).collect();
        RepairEngine::new().repair(&mut cells, &mut DryRun);
        let after: Vec<bool> = cells.iter().map(|c| c.record.is_some()).collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn prop_repair_keeps_keys_outside_the_schema(mut cells in document()) {
        let checksums = |cells: &[CellRecord]| -> Vec<Option<Value>> {
            cells
                .iter()
                .map(|c| c.raw.as_ref().and_then(|raw| raw.get("checksum")).cloned())
                .collect()
        };
        let before = checksums(&cells);
        RepairEngine::new().repair(&mut cells, &mut DryRun);
        prop_assert_eq!(before, checksums(&cells));
    }

    #[test]
    fn prop_validator_is_deterministic(cells in document()) {
        let validator = Validator::new();
        prop_assert_eq!(validator.validate(&cells), validator.validate(&cells));
    }
}

#[test]
fn already_valid_document_needs_no_fixes() {
    let mut cells = vec![
        CellRecord::new(0, false, Some(record(CellType::Manual, 5.0, "answer-1"))),
        CellRecord::new(1, true, Some(record(CellType::Solution, 0.0, "impl-1"))),
        CellRecord::new(2, true, Some(record(CellType::Tests, 2.0, "tests-1"))),
        CellRecord::new(3, false, Some(record(CellType::Task, 1.0, "task-1"))),
        CellRecord::new(4, false, Some(record(CellType::Readonly, 0.0, "intro"))),
        CellRecord::new(5, true, None),
    ];

    assert!(Validator::new().validate(&cells).is_valid());
    let report = RepairEngine::new().repair(&mut cells, &mut DryRun);
    assert!(report.is_clean());
}

#[test]
fn released_notebook_records_are_not_rewritten() {
    let stored = json!({
        "cell_type": "code",
        "checksum": "8a4f2d0c",
        "grade": true,
        "grade_id": "test1",
        "locked": true,
        "points": 2.0,
        "schema_version": 3,
        "solution": false,
        "task": false
    });
    let mut cells = vec![CellRecord::from_raw(0, true, Some(stored.clone()))];

    let report = Validator::new().validate(&cells);
    assert!(report.errors.is_empty() && report.warnings.is_empty());

    let fix = RepairEngine::new().repair(&mut cells, &mut DryRun);
    assert!(fix.fixed.is_empty());
    assert_eq!(cells[0].raw, Some(stored));
}

#[test]
fn duplicate_id_scenario() {
    let mut cells = vec![
        CellRecord::new(0, true, None),
        CellRecord::from_raw(1, true, Some(tests_json("cell-aaaaaaaaaaaa", 1.0))),
        CellRecord::new(2, false, None),
        CellRecord::from_raw(3, true, Some(tests_json("cell-aaaaaaaaaaaa", 2.0))),
    ];

    let report = Validator::new().validate(&cells);
    let duplicates: Vec<_> = report
        .errors
        .iter()
        .filter(|e| matches!(e.kind, IssueKind::DuplicateGradeId { .. }))
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].cells, vec![1, 3]);

    let fix = RepairEngine::with_id_source(SeededIds::new(1)).repair(&mut cells, &mut DryRun);
    assert_eq!(fix.fixed, vec![3]);

    let id = |i: usize| cells[i].record.as_ref().and_then(|r| r.grade_id.clone());
    assert_eq!(id(1).as_deref(), Some("cell-aaaaaaaaaaaa"));
    assert_ne!(id(3), id(1));
    assert!(Validator::new().validate(&cells).is_valid());
}

#[test]
fn missing_points_scenario() {
    let raw = json!({
        "schema_version": 3,
        "grade": true,
        "solution": false,
        "locked": false,
        "grade_id": "cell-000000000000"
    });
    let mut cells = vec![CellRecord::from_raw(0, true, Some(raw))];

    let report = Validator::new().validate(&cells);
    assert!(report.errors.iter().any(|e| e.kind == IssueKind::MissingPoints));

    RepairEngine::new().repair(&mut cells, &mut DryRun);
    assert_eq!(cells[0].record.as_ref().and_then(|r| r.points), Some(0.0));
}
