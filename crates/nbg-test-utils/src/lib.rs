//! Testing utilities for nbg workspace
//!
//! Shared record builders, metadata bags and `.ipynb` fixtures.

#![allow(missing_docs)]

use nbg_metadata::{MetadataBag, NamespaceMode};
use nbg_schema::{build_record, CellType, GradeId, GradingRecord};
use serde_json::{json, Map, Value};

pub fn grade_id(id: &str) -> GradeId {
    GradeId::parse(id).unwrap()
}

pub fn record(cell_type: CellType, points: f64, id: &str) -> GradingRecord {
    build_record(cell_type, points, &grade_id(id)).unwrap()
}

/// Full autograded-tests record as raw JSON
pub fn tests_json(id: &str, points: f64) -> Value {
    record(CellType::Tests, points, id).to_value()
}

/// Bag holding `raw` at the record location of `mode`
pub fn bag_with_record(mode: NamespaceMode, raw: Value) -> MetadataBag {
    let mut bag = MetadataBag::new();
    bag.set_path(&mode.record_path(), raw).unwrap();
    bag
}

/// A fixture cell for [`notebook_json`]
#[derive(Debug, Clone)]
pub struct FixtureCell {
    pub cell_type: &'static str,
    pub nbgrader: Option<Value>,
}

pub fn code(nbgrader: Option<Value>) -> FixtureCell {
    FixtureCell {
        cell_type: "code",
        nbgrader,
    }
}

pub fn markdown(nbgrader: Option<Value>) -> FixtureCell {
    FixtureCell {
        cell_type: "markdown",
        nbgrader,
    }
}

/// Minimal nbformat 4 document with records at `cells[i].metadata.nbgrader`
pub fn notebook_json(cells: &[FixtureCell]) -> Value {
    let cells: Vec<Value> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let mut metadata = Map::new();
            if let Some(raw) = &cell.nbgrader {
                metadata.insert("nbgrader".to_string(), raw.clone());
            }
            let mut value = json!({
                "cell_type": cell.cell_type,
                "metadata": Value::Object(metadata),
                "source": [format!("# cell {i}\n")],
            });
            if cell.cell_type == "code" {
                value["execution_count"] = Value::Null;
                value["outputs"] = json!([]);
            }
            value
        })
        .collect();

    json!({
        "cells": cells,
        "metadata": {"kernelspec": {"name": "python3", "display_name": "Python 3"}},
        "nbformat": 4,
        "nbformat_minor": 5
    })
}

pub fn notebook_text(cells: &[FixtureCell]) -> String {
    serde_json::to_string_pretty(&notebook_json(cells)).unwrap()
}
