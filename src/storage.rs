use crate::models::Record;
use crate::viz::Scene;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Header of a record set: every column in first-seen order.
pub fn header(records: &[Record]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for c in records.iter().flat_map(|r| r.columns()) {
        if !out.iter().any(|o| o == c) {
            out.push(c.to_string());
        }
    }
    out
}

/// Neutralize spreadsheet formulas: text starting with `=`, `+`, `-` or `@`
/// gets a leading `'`. Numbers are left alone.
fn sanitize(v: &str) -> String {
    let risky = v.starts_with(['=', '+', '-', '@']);
    if risky && v.trim().parse::<f64>().is_err() {
        format!("'{}", v)
    } else {
        v.to_string()
    }
}

/// Save records as CSV with header.
pub fn save_csv<P: AsRef<Path>>(records: &[Record], path: P) -> Result<()> {
    let path = path.as_ref();
    let columns = header(records);
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    wtr.write_record(&columns)?;
    for r in records {
        wtr.write_record(columns.iter().map(|c| sanitize(r.str(c))))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save records as a pretty JSON array of objects.
pub fn save_json<P: AsRef<Path>>(records: &[Record], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let rows: Vec<serde_json::Value> = records.iter().map(Record::to_json).collect();
    let s = serde_json::to_string_pretty(&rows)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Save a drawn scene (nodes, geometry, paint) as pretty JSON.
pub fn save_scene_json<P: AsRef<Path>>(scene: &Scene, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let s = serde_json::to_string_pretty(scene)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_csv_and_json() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        let rows = vec![
            Record::from_parts(["geo", "obs_value"], ["Italy", "1.23"]),
            Record::from_parts(["geo", "obs_value", "note"], ["=SUM(A1)", "-4", "@x"]),
        ];
        save_csv(&rows, &csvp).unwrap();
        save_json(&rows, &jsonp).unwrap();
        let text = std::fs::read_to_string(&csvp).unwrap();
        assert_eq!(text, "geo,obs_value,note\nItaly,1.23,\n'=SUM(A1),-4,'@x\n");
        let back: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&jsonp).unwrap()).unwrap();
        assert_eq!(back[0]["geo"], "Italy");
    }
}
