use datavis::dataset::{DatasetHandle, DatasetSource, LoadState, load_blocking};
use datavis::models::Record;
use datavis::select::{self, ColumnMap, Page, Selection};
use std::fs;
use std::path::Path;

const SKILLS: &str = "\
geo,time_period,indic_is,ind_type,obs_value
Italy,2021,Basic skills,All,45.6
France,2021,Basic skills,All,62.0
Spain,2021,Basic skills,All,64.2
Italy,2023,Basic skills,All,45.8
France,2023,Basic skills,All,59.7
Spain,2023,Basic skills,All,66.2
Italy,2023,Online banking,All,48.1
";

fn write_dataset(dir: &Path) {
    let sub = dir.join("digital-skills");
    fs::create_dir_all(&sub).unwrap();
    fs::write(sub.join("skills.csv"), SKILLS).unwrap();
}

#[test]
fn blocking_load_maps_rows_and_reports_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let source = DatasetSource::local(dir.path());

    let state = load_blocking(&source, "digital-skills/skills.csv", |r, _| {
        (r.str("indic_is") == "Basic skills").then(|| r.num("obs_value"))
    });
    assert_eq!(state.rows().unwrap().len(), 6);

    let missing: LoadState<Record> = load_blocking(&source, "digital-skills/nope.csv", |r, _| Some(r.clone()));
    assert!(missing.error().is_some());
    assert!(missing.rows().is_none());
}

#[test]
fn page_picks_defaults_and_recomputes_on_selection() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let mut handle = DatasetHandle::spawn(DatasetSource::local(dir.path()), "digital-skills/skills.csv", |r, _| {
        Some(r.clone())
    });

    let columns = ColumnMap::default();
    let cols = columns.clone();
    let mut page = Page::new(move |rows: &[Record], sel: &Selection| select::bar_input(rows, sel, &cols))
        .with_defaults(|rows: &[Record]| {
            let mut sel = Selection::defaults(rows, &ColumnMap::default(), Some("Basic skills"));
            sel.countries.clear();
            sel
        });
    assert!(page.chart_input().is_none());

    handle.wait();
    assert!(page.sync(&mut handle));
    assert_eq!(page.selection().year.as_deref(), Some("2023"));
    assert_eq!(page.selection().metric.as_deref(), Some("Basic skills"));
    let (labels, values) = page.chart_input().unwrap().clone();
    assert_eq!(labels, vec!["Spain", "France", "Italy"]);
    assert_eq!(values, vec![66.2, 59.7, 45.8]);

    assert!(page.update_selection(|s| s.set_year("2021")));
    let (labels, _) = page.chart_input().unwrap();
    assert_eq!(labels, &vec!["Spain".to_string(), "France".into(), "Italy".into()]);

    assert!(!page.update_selection(|s| s.set_year("2021")));
    assert!(page.update_selection(|s| s.set_metric("Online banking")));
    let (labels, _) = page.chart_input().unwrap();
    assert!(labels.is_empty());
}

#[test]
fn cancelled_load_never_reaches_the_page() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let mut handle = DatasetHandle::spawn(DatasetSource::local(dir.path()), "digital-skills/skills.csv", |r, _| {
        Some(r.clone())
    });
    handle.cancel();
    let mut page = Page::new(|rows: &[Record], _: &Selection| rows.len());
    assert!(!page.sync(&mut handle));
    assert!(page.state().is_loading());
    assert!(page.chart_input().is_none());
}
