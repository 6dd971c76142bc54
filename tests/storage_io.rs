use datavis::models::Record;
use datavis::storage;
use datavis::viz::bar::{self, BarOptions};
use std::fs;

fn sample(n: usize) -> Vec<Record> {
    let head = ["Entity", "Code", "Year", "Value"];
    (0..n)
        .map(|i| {
            let year = (2000 + i).to_string();
            let value = format!("{:.1}", 5.0 + i as f64);
            Record::from_parts(head, ["Germany", "DEU", year.as_str(), value.as_str()])
        })
        .collect()
}

#[test]
fn save_csv_and_json() {
    let rows = sample(3);
    let dir = tempfile::tempdir().unwrap();

    let csv_path = dir.path().join("rows.csv");
    storage::save_csv(&rows, &csv_path).unwrap();
    let csv_txt = fs::read_to_string(&csv_path).unwrap();
    assert!(csv_txt.starts_with("Entity,Code,Year,Value\n"));
    assert_eq!(csv_txt.lines().count(), 1 + rows.len());

    let json_path = dir.path().join("rows.json");
    storage::save_json(&rows, &json_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    let arr = v.as_array().unwrap();
    assert_eq!(arr.len(), rows.len());
    assert_eq!(arr[2]["Year"], "2002");
    assert_eq!(arr[2]["Value"], "7.0");
}

#[test]
fn saved_scene_lists_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let rendered = bar::draw(&["Italy".to_string()], &[2.0], &BarOptions::default()).unwrap();
    let path = dir.path().join("scene.json");
    storage::save_scene_json(rendered.scene(), &path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(v["width"], 820.0);
    let nodes = v["nodes"].as_array().unwrap();
    assert!(nodes.iter().any(|n| n["class"] == "bar" && n["shape"]["type"] == "rect"));
}
