use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const SKILLS: &str = "\
geo,time_period,indic_is,ind_type,obs_value
Italy,2023,Basic skills,All,45.8
France,2023,Basic skills,All,59.7
Italy,2023,Basic skills,Young,58.2
France,2023,Basic skills,Young,71.0
Italy,2021,Basic skills,All,45.6
";

const OUTLINES: &str = r#"{"type": "FeatureCollection", "features": [
    {"type": "Feature", "properties": {"NAME": "Italy"},
     "geometry": {"type": "Polygon", "coordinates": [[[10, 40], [14, 40], [14, 44], [10, 44], [10, 40]]]}},
    {"type": "Feature", "properties": {"NAME": "France"},
     "geometry": {"type": "Polygon", "coordinates": [[[0, 44], [4, 44], [4, 48], [0, 48], [0, 44]]]}}
]}"#;

fn dataset(dir: &Path) -> PathBuf {
    let p = dir.join("skills.csv");
    fs::write(&p, SKILLS).unwrap();
    p
}

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("datavis").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn render_writes_svg() {
    let dir = tempfile::tempdir().unwrap();
    let data = dataset(dir.path());
    let out = dir.path().join("skills.svg");
    let mut cmd = Command::cargo_bin("datavis").unwrap();
    cmd.arg("render")
        .arg("stacked")
        .arg("--data")
        .arg(&data)
        .args(["--category", "ind_type", "--percentage"])
        .arg("--out")
        .arg(&out);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Wrote stacked chart"));
    let svg = fs::read_to_string(&out).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("France"));
}

#[test]
fn alluvial_needs_a_category() {
    let dir = tempfile::tempdir().unwrap();
    let data = dataset(dir.path());
    let mut cmd = Command::cargo_bin("datavis").unwrap();
    cmd.arg("render")
        .arg("alluvial")
        .arg("--data")
        .arg(&data)
        .arg("--out")
        .arg(dir.path().join("a.png"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--category"));
}

#[test]
fn map_needs_region_outlines() {
    let dir = tempfile::tempdir().unwrap();
    let data = dataset(dir.path());
    let mut cmd = Command::cargo_bin("datavis").unwrap();
    cmd.arg("render")
        .arg("map")
        .arg("--data")
        .arg(&data)
        .arg("--out")
        .arg(dir.path().join("m.svg"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--geojson"));
}

#[test]
fn render_map_with_outlines() {
    let dir = tempfile::tempdir().unwrap();
    let data = dataset(dir.path());
    let geo = dir.path().join("europe.geojson");
    fs::write(&geo, OUTLINES).unwrap();
    let out = dir.path().join("map.svg");
    let mut cmd = Command::cargo_bin("datavis").unwrap();
    cmd.arg("render")
        .arg("map")
        .arg("--data")
        .arg(&data)
        .arg("--geojson")
        .arg(&geo)
        .args(["--zoom", "1.5"])
        .arg("--out")
        .arg(&out);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Wrote map chart"));
    let svg = fs::read_to_string(&out).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains('%'));
}

#[test]
fn export_infers_json_from_extension() {
    let dir = tempfile::tempdir().unwrap();
    let data = dataset(dir.path());
    let out = dir.path().join("skills.json");
    let mut cmd = Command::cargo_bin("datavis").unwrap();
    cmd.arg("export").arg("--data").arg(&data).arg("--out").arg(&out);
    cmd.assert().success();
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(v.as_array().unwrap().len(), 5);
}

// Live test (opt-in): cargo test --features online
#[cfg(feature = "online")]
#[test]
fn render_from_a_served_dataset() {
    use std::net::TcpListener;
    use std::time::Duration;

    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("datasets")).unwrap();
    fs::write(dir.path().join("datasets/skills.csv"), SKILLS).unwrap();
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let addr = format!("127.0.0.1:{}", port);

    let mut server = Command::cargo_bin("datavis")
        .unwrap()
        .args(["serve", "--addr", &addr, "--root"])
        .arg(dir.path())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(500));

    let out = dir.path().join("remote.svg");
    let mut cmd = Command::cargo_bin("datavis").unwrap();
    cmd.args(["render", "bar", "--data", "skills.csv", "--base-url"])
        .arg(format!("http://{}", addr))
        .arg("--out")
        .arg(&out);
    let result = cmd.assert();
    server.kill().ok();
    result.success();
    assert!(fs::read_to_string(&out).unwrap().contains("Italy"));
}
