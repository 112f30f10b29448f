//! Drives the `expcat` binary against fixture archives.

use assert_cmd::Command;
use expcat_testing::{CatalogWorld, TimeSeriesFixture};
use predicates::prelude::*;

const CFG: &str = "01deg_jra55v13";
const EXP: &str = "ryf9091";

/// Three monthly files, one year each from 1900.
fn three_years() -> CatalogWorld {
    let world = CatalogWorld::new();
    for k in 0..3 {
        world
            .add_file(
                CFG,
                EXP,
                &format!("output{:03}", k),
                "ocean_month.nc",
                &TimeSeriesFixture::monthly(1900 + k as i64, 1),
            )
            .unwrap();
    }
    world
}

fn indexed(world: CatalogWorld) -> CatalogWorld {
    let result = world.run(&["index"]).unwrap();
    assert!(result.success(), "index failed: {}", result.stderr());
    world
}

#[allow(deprecated)]
fn expcat(world: &CatalogWorld) -> Command {
    let mut cmd = Command::cargo_bin("expcat").unwrap();
    world.configure_command(&mut cmd);
    cmd
}

#[test]
fn test_index_then_list_experiments() {
    let world = indexed(three_years());

    let result = world.run(&["experiments", "--format", "json"]).unwrap();
    assert!(result.success(), "{}", result.stderr());
    let experiments = result.json().unwrap();
    let experiments = experiments.as_array().unwrap();
    assert_eq!(experiments.len(), 1);
    assert_eq!(experiments[0]["name"], EXP);
    assert_eq!(experiments[0]["configuration"], CFG);
    assert_eq!(experiments[0]["file_count"], 3);

    let plain = world.run(&["experiments"]).unwrap();
    assert!(plain.stdout().contains(EXP));
    assert!(plain.stdout().contains(CFG));
}

#[test]
fn test_index_json_report() {
    let world = three_years();
    let root = world.root().to_string_lossy().to_string();

    let first = world.run(&["index", &root, "--format", "json"]).unwrap();
    assert!(first.success(), "{}", first.stderr());
    let report = first.json().unwrap();
    assert_eq!(report["inserted"], 3);
    assert_eq!(report["failures"].as_array().unwrap().len(), 0);

    let second = world.run(&["index", &root, "--format", "json"]).unwrap();
    let report = second.json().unwrap();
    assert_eq!(report["inserted"], 0);
    assert_eq!(report["skipped"], 3);

    let forced = world
        .run(&["index", &root, "--force", "--format", "json"])
        .unwrap();
    assert_eq!(forced.json().unwrap()["replaced"], 3);
}

#[test]
fn test_corrupt_file_is_reported_and_skipped() {
    let world = three_years();
    let broken = world
        .add_corrupt_file(CFG, EXP, "output003", "ocean_month.nc")
        .unwrap();

    let result = world.run(&["index"]).unwrap();
    assert!(result.success(), "{}", result.stderr());
    assert!(result.stdout().contains("failed"));
    assert!(result.stdout().contains(&broken.display().to_string()));
    assert!(result.stdout().contains("Indexed 3 files"));

    let files = world.run(&["files", EXP, "--format", "json"]).unwrap();
    assert_eq!(files.json().unwrap().as_array().unwrap().len(), 3);
}

#[test]
fn test_files_are_listed_in_time_order() {
    let world = CatalogWorld::new();
    for (dir, year) in [("output000", 1950), ("output001", 1930), ("output002", 1940)] {
        world
            .add_file(CFG, EXP, dir, "ocean_month.nc", &TimeSeriesFixture::monthly(year, 1))
            .unwrap();
    }
    let world = indexed(world);

    let result = world.run(&["files", EXP, "--format", "json"]).unwrap();
    let files = result.json().unwrap();
    let dirs: Vec<&str> = files
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["output_dir"].as_str().unwrap())
        .collect();
    assert_eq!(dirs, vec!["output001", "output002", "output000"]);
}

#[test]
fn test_variables_with_detail() {
    let world = indexed(three_years());

    let names = world.run(&["variables", EXP, "--format", "json"]).unwrap();
    let names: Vec<String> = serde_json::from_value(names.json().unwrap()).unwrap();
    assert!(names.contains(&"temp".to_string()));
    assert!(names.contains(&"area_t".to_string()));

    let detail = world
        .run(&["variables", EXP, "--detail", "--frequency", "monthly", "--format", "json"])
        .unwrap();
    let detail = detail.json().unwrap();
    let temp = detail
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["name"] == "temp")
        .unwrap();
    assert_eq!(temp["frequency"], "1 monthly");
    assert_eq!(temp["units"], "degC");
    assert_eq!(temp["file_count"], 3);
    assert!(
        detail
            .as_array()
            .unwrap()
            .iter()
            .all(|v| v["name"] != "area_t")
    );
}

#[test]
fn test_frequencies_and_resolve() {
    let world = indexed(three_years());

    let frequencies = world.run(&["frequencies", "--format", "json"]).unwrap();
    assert_eq!(
        frequencies.json().unwrap(),
        serde_json::json!(["static", "1 monthly"])
    );

    let resolved = world
        .run(&["resolve", EXP, "temp", "--format", "json"])
        .unwrap();
    assert!(resolved.success(), "{}", resolved.stderr());
    assert_eq!(resolved.json().unwrap().as_array().unwrap().len(), 3);
}

#[test]
fn test_getvar_tail_selection() {
    let world = indexed(three_years());

    let result = world
        .run(&["getvar", EXP, "temp", "-n", "-2", "--format", "json"])
        .unwrap();
    assert!(result.success(), "{}", result.stderr());
    let summary = result.json().unwrap();
    assert_eq!(summary["dims"], serde_json::json!(["time", "yt", "xt"]));
    assert_eq!(summary["shape"], serde_json::json!([24, 2, 3]));
    assert_eq!(summary["files"].as_array().unwrap().len(), 2);
    assert!(summary["start"].as_str().unwrap().starts_with("1901-01-01"));
    assert!(summary["end"].as_str().unwrap().starts_with("1902-12-01"));
    assert!(summary.get("stats").is_none());
}

#[test]
fn test_getvar_window_and_compute() {
    let world = indexed(three_years());

    let result = world
        .run(&[
            "getvar", EXP, "temp", "--start", "1901-01-01", "--end", "1901-12-31", "--compute",
            "--format", "json",
        ])
        .unwrap();
    assert!(result.success(), "{}", result.stderr());
    let summary = result.json().unwrap();
    assert_eq!(summary["shape"][0], 12);
    assert_eq!(summary["files"].as_array().unwrap().len(), 1);
    assert_eq!(summary["stats"]["count"], 12 * 2 * 3);
    assert_eq!(summary["stats"]["missing"], 0);
}

#[test]
fn test_getvar_chunks() {
    let world = indexed(three_years());

    let result = world
        .run(&["getvar", EXP, "temp", "--chunks", "time=10,xt=2", "--format", "json"])
        .unwrap();
    assert!(result.success(), "{}", result.stderr());
    let summary = result.json().unwrap();
    assert_eq!(summary["chunks"], serde_json::json!([[10, 10, 10, 6], [2], [2, 1]]));
}

#[test]
fn test_getvar_plain_output() {
    let world = indexed(three_years());

    let result = world.run(&["getvar", EXP, "salt", "--compute"]).unwrap();
    assert!(result.success(), "{}", result.stderr());
    let stdout = result.stdout();
    assert!(stdout.contains("salt (time: 36, yt: 2, xt: 3)"));
    assert!(stdout.contains("3 files"));
    assert!(stdout.contains("mean"));
}

#[test]
fn test_getvar_outside_coverage_fails() {
    let world = indexed(three_years());

    expcat(&world)
        .args(["getvar", EXP, "temp", "--start", "1990-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_unknown_variable_names_experiment() {
    let world = indexed(three_years());

    expcat(&world)
        .args(["getvar", EXP, "nope"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("variable 'nope' not found"))
        .stderr(predicate::str::contains(EXP));
}

#[test]
fn test_invalid_options_are_rejected() {
    let world = indexed(three_years());

    expcat(&world)
        .args(["getvar", EXP, "temp", "-n", "0"])
        .assert()
        .failure()
        .code(5);

    expcat(&world)
        .args(["getvar", EXP, "temp", "--chunks", "time"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dim=size"));

    expcat(&world)
        .args(["getvar", EXP, "temp", "--frequency", "fortnightly"])
        .assert()
        .failure();
}

#[test]
fn test_query_without_catalog_fails() {
    let world = three_years();

    expcat(&world)
        .args(["experiments"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("catalog unavailable"));
    assert!(!world.db_path().exists());
}

#[test]
fn test_index_uses_configured_roots() {
    let world = three_years();
    let config = world.temp_dir().join("config.toml");
    std::fs::write(
        &config,
        format!("roots = [{:?}]\n", world.root().to_string_lossy()),
    )
    .unwrap();

    let result = world
        .run(&["--config", &config.to_string_lossy(), "index"])
        .unwrap();
    assert!(result.success(), "{}", result.stderr());
    assert!(result.stdout().contains("Indexed 3 files"));
}

#[test]
fn test_index_without_roots_fails() {
    let world = CatalogWorld::new();
    let config = world.temp_dir().join("missing.toml");

    expcat(&world)
        .args(["--config", &config.to_string_lossy(), "index"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no archive roots"));
}

#[test]
fn test_info_reports_counts() {
    let world = indexed(three_years());

    let result = world.run(&["info", "--format", "json"]).unwrap();
    let info = result.json().unwrap();
    assert_eq!(info["exists"], true);
    assert_eq!(info["counts"]["experiments"], 1);
    assert_eq!(info["counts"]["files"], 3);
}
