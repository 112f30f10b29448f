//! End-to-end behaviour of index building, sessions and getvar over
//! fixture archives.

use std::path::PathBuf;

use expcat_engine::Error as EngineError;
use expcat_index::{Database, Error as IndexError};
use expcat_runtime::{
    Error, GetVarOptions, IndexOptions, IndexProgress, IndexReport, IndexService, Session,
    build_index,
};
use expcat_testing::{CatalogWorld, TimeSeriesFixture};
use expcat_types::{CalendarDate, Frequency};
use ndarray::IxDyn;

const CFG: &str = "025deg_jra55";
const EXP: &str = "ryf9091";

fn index(world: &CatalogWorld, options: IndexOptions) -> IndexReport {
    let db = Database::open(world.db_path()).unwrap();
    build_index(&db, &[world.root().to_path_buf()], options).unwrap()
}

fn session(world: &CatalogWorld) -> Session {
    Session::open(world.db_path()).unwrap()
}

/// One monthly file per year, in `output000`, `output001`, ...
fn yearly_outputs(world: &CatalogWorld, first_year: i64, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|k| {
            world
                .add_file(
                    CFG,
                    EXP,
                    &format!("output{:03}", k),
                    "ocean_month.nc",
                    &TimeSeriesFixture::monthly(first_year + k as i64, 1),
                )
                .unwrap()
        })
        .collect()
}

#[test]
fn test_list_files_is_time_ordered_and_non_overlapping() {
    let world = CatalogWorld::new();
    // Directory order disagrees with time order.
    for (dir, year) in [("output000", 1920), ("output001", 1900), ("output002", 1910)] {
        world
            .add_file(CFG, EXP, dir, "ocean_month.nc", &TimeSeriesFixture::monthly(year, 10))
            .unwrap();
    }
    let report = index(&world, IndexOptions::default());
    assert_eq!(report.inserted, 3);
    assert!(report.failures.is_empty());

    let files = session(&world).list_files(EXP).unwrap();
    let starts: Vec<i64> = files
        .iter()
        .map(|f| f.coverage.unwrap().start.year)
        .collect();
    assert_eq!(starts, vec![1900, 1910, 1920]);
    for pair in files.windows(2) {
        assert!(pair[0].coverage.unwrap().end < pair[1].coverage.unwrap().start);
    }
}

#[test]
fn test_reindex_is_idempotent() {
    let world = CatalogWorld::new();
    yearly_outputs(&world, 1958, 3);

    index(&world, IndexOptions::default());
    let before = session(&world).list_files(EXP).unwrap();
    let counts = session(&world).counts().unwrap();

    let again = index(&world, IndexOptions::default());
    assert_eq!(again.skipped, 3);
    assert_eq!(again.indexed(), 0);
    assert_eq!(session(&world).list_files(EXP).unwrap(), before);
    assert_eq!(session(&world).counts().unwrap(), counts);

    let forced = index(
        &world,
        IndexOptions {
            force: true,
            ..Default::default()
        },
    );
    assert_eq!(forced.replaced, 3);
    assert_eq!(forced.skipped, 0);
    assert_eq!(session(&world).counts().unwrap(), counts);
}

#[test]
fn test_changed_mtime_is_rescanned() {
    let world = CatalogWorld::new();
    let paths = yearly_outputs(&world, 1958, 3);
    index(&world, IndexOptions::default());

    world.set_mtime(&paths[1], 1_700_000_000).unwrap();
    let report = index(&world, IndexOptions::default());
    assert_eq!(report.skipped, 2);
    assert_eq!(report.replaced, 1);
}

#[test]
fn test_corrupt_file_is_reported_not_catalogued() {
    let world = CatalogWorld::new();
    yearly_outputs(&world, 1900, 5);
    let corrupt = world
        .add_corrupt_file(CFG, EXP, "output002", "ocean_broken.nc")
        .unwrap();

    let mut failed = Vec::new();
    let db = Database::open(world.db_path()).unwrap();
    let report = IndexService::new(&db, vec![world.root().to_path_buf()], IndexOptions::default())
        .run(|event| {
            if let IndexProgress::FileFailed { path, .. } = event {
                failed.push(path);
            }
        })
        .unwrap();

    assert_eq!(report.inserted, 5);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, corrupt);
    assert_eq!(failed, vec![corrupt.clone()]);
    assert_eq!(db.counts().unwrap().files, 5);
    assert!(
        db.list_files(EXP)
            .unwrap()
            .iter()
            .all(|f| PathBuf::from(&f.path) != corrupt)
    );
}

#[test]
fn test_oversized_header_fails_alone() {
    let world = CatalogWorld::new();
    yearly_outputs(&world, 1900, 3);
    let oversized = world
        .add_oversized_file(CFG, EXP, "output001", "ocean_daily.nc")
        .unwrap();

    let report = index(&world, IndexOptions::default());

    assert_eq!(report.inserted, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, oversized);
    assert_eq!(session(&world).list_files(EXP).unwrap().len(), 3);
}

#[test]
fn test_files_sharing_a_time_axis_are_both_catalogued() {
    let world = CatalogWorld::new();
    let period = TimeSeriesFixture::monthly(1900, 1);
    for (name, variable) in [("ocean.nc", "temp"), ("ocean_month.nc", "salt")] {
        world
            .add_file(CFG, EXP, "output000", name, &period.clone().only_variables(&[variable]))
            .unwrap();
    }
    let repeat = world
        .add_file(
            CFG,
            EXP,
            "output001",
            "ocean.nc",
            &period.clone().only_variables(&["temp"]),
        )
        .unwrap();

    let report = index(&world, IndexOptions::default());
    assert_eq!(report.inserted, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, repeat);

    let s = session(&world);
    let monthly = s.list_variables(EXP, Some(Frequency::monthly())).unwrap();
    assert!(monthly.contains(&"temp".to_string()));
    assert!(monthly.contains(&"salt".to_string()));
    for variable in ["temp", "salt"] {
        let lazy = s.getvar(EXP, variable, &GetVarOptions::default()).unwrap();
        assert_eq!(lazy.shape, vec![12, 2, 3]);
        assert_eq!(lazy.files().len(), 1);
    }
    assert_eq!(s.resolve(EXP, "time", None).unwrap().len(), 1);
    let time = s.getvar(EXP, "time", &GetVarOptions::default()).unwrap();
    assert_eq!(time.shape, vec![12]);
}

#[test]
fn test_prune_and_missing_root() {
    let world = CatalogWorld::new();
    let paths = yearly_outputs(&world, 1900, 3);
    index(&world, IndexOptions::default());

    std::fs::remove_file(&paths[2]).unwrap();
    let kept = index(&world, IndexOptions::default());
    assert!(kept.pruned.is_empty());
    assert_eq!(session(&world).list_files(EXP).unwrap().len(), 3);

    let pruned = index(
        &world,
        IndexOptions {
            prune: true,
            ..Default::default()
        },
    );
    assert_eq!(pruned.pruned, vec![paths[2].clone()]);
    assert_eq!(session(&world).list_files(EXP).unwrap().len(), 2);

    let db = Database::open(world.db_path()).unwrap();
    let mut missing = Vec::new();
    let missing_root = world.temp_dir().join("nowhere");
    IndexService::new(&db, vec![missing_root.clone()], IndexOptions::default())
        .run(|event| {
            if let IndexProgress::RootMissing { root } = event {
                missing.push(root);
            }
        })
        .unwrap();
    assert_eq!(missing, vec![missing_root]);
}

#[test]
fn test_metadata_keywords_filter_experiments() {
    let world = CatalogWorld::new()
        .with_metadata(
            CFG,
            EXP,
            "contact: A. Modeller\nkeywords: [RYF, Spinup]\ndescription: repeat-year forcing\n",
        )
        .with_file(CFG, EXP, "output000", "ocean_month.nc", &TimeSeriesFixture::monthly(1900, 1))
        .with_file(CFG, "iaf_cycle1", "output000", "ocean_month.nc", &TimeSeriesFixture::monthly(1958, 1));
    index(&world, IndexOptions::default());

    let s = session(&world);
    let all: Vec<String> = s.list_experiments(None).unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(all, vec!["iaf_cycle1", EXP]);

    let tagged = s.list_experiments(Some("ryf")).unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].name, EXP);
    assert_eq!(tagged[0].metadata.contact.as_deref(), Some("A. Modeller"));
    assert_eq!(tagged[0].metadata.keywords, vec!["ryf", "spinup"]);

    assert_eq!(s.list_frequencies(Some(EXP)).unwrap(), vec![Frequency::Static, Frequency::monthly()]);
    assert_eq!(
        s.list_variables(EXP, Some(Frequency::monthly())).unwrap(),
        vec!["salt", "temp", "time", "time_bnds"]
    );
    assert!(s.list_variables(EXP, Some(Frequency::Static)).unwrap().contains(&"area_t".to_string()));
}

#[test]
fn test_getvar_tail_selects_last_files() {
    let world = CatalogWorld::new();
    yearly_outputs(&world, 1900, 12);
    index(&world, IndexOptions::default());
    let s = session(&world);

    let resolved: Vec<PathBuf> = s
        .resolve(EXP, "temp", None)
        .unwrap()
        .into_iter()
        .map(|r| PathBuf::from(r.file.path))
        .collect();
    let lazy = s.getvar(EXP, "temp", &GetVarOptions::default().n(-10)).unwrap();

    let files: Vec<PathBuf> = lazy.files().into_iter().map(PathBuf::from).collect();
    assert_eq!(files, resolved[2..].to_vec());
    assert_eq!(lazy.shape, vec![120, 2, 3]);
    assert_eq!(lazy.time().unwrap()[0], CalendarDate::ymd(1902, 1, 1));

    let head = s.getvar(EXP, "temp", &GetVarOptions::default().n(2)).unwrap();
    assert_eq!(head.files().len(), 2);
    assert_eq!(head.time().unwrap().last(), Some(&CalendarDate::ymd(1901, 12, 1)));
}

#[test]
fn test_getvar_window_is_strict_subset() {
    let world = CatalogWorld::new();
    yearly_outputs(&world, 1900, 3);
    index(&world, IndexOptions::default());
    let s = session(&world);

    let full = s.getvar(EXP, "temp", &GetVarOptions::default()).unwrap();
    let opts = GetVarOptions::default()
        .start_time(CalendarDate::ymd(1900, 7, 1))
        .end_time(CalendarDate::ymd(1901, 6, 1));
    let window = s.getvar(EXP, "temp", &opts).unwrap();

    let all = full.time().unwrap();
    let part = window.time().unwrap();
    assert_eq!(part.len(), 12);
    assert!(part.len() < all.len());
    assert!(part.iter().all(|d| all.contains(d)));
    assert!(part.iter().all(|d| opts.in_window(d)));

    let outside = GetVarOptions::default()
        .start_time(CalendarDate::ymd(2100, 1, 1))
        .end_time(CalendarDate::ymd(2101, 1, 1));
    assert!(matches!(
        s.getvar(EXP, "temp", &outside),
        Err(Error::Engine(EngineError::EmptyRange { .. }))
    ));
}

#[test]
fn test_getvar_offset_shifts_timestamps_only() {
    let world = CatalogWorld::new();
    world
        .add_file(
            CFG,
            EXP,
            "output000",
            "ocean_daily.nc",
            &TimeSeriesFixture::daily(CalendarDate::ymd(1900, 1, 1), 20),
        )
        .unwrap();
    index(&world, IndexOptions::default());
    let s = session(&world);

    let d = 7;
    let plain = s.getvar(EXP, "salt", &GetVarOptions::default()).unwrap();
    let shifted = s.getvar(EXP, "salt", &GetVarOptions::default().offset(d)).unwrap();

    let before = plain.time().unwrap();
    let after = shifted.time().unwrap();
    assert_eq!(before[0], CalendarDate::ymd(1900, 1, 1));
    assert_eq!(after[0], CalendarDate::ymd(1900, 1, 8));
    assert_eq!(after[12], CalendarDate::ymd(1900, 1, 20));
    assert_eq!(before.len(), after.len());
    assert_eq!(plain.force().unwrap().data, shifted.force().unwrap().data);
}

#[test]
fn test_three_files_form_contiguous_series() {
    let world = CatalogWorld::new();
    let parts = [
        ("output000", TimeSeriesFixture::yearly(1900, 51)),
        ("output001", TimeSeriesFixture::yearly(1951, 50)),
        ("output002", TimeSeriesFixture::yearly(2001, 50)),
    ];
    for (dir, fixture) in &parts {
        world.add_file(CFG, EXP, dir, "ocean_annual.nc", fixture).unwrap();
    }
    let report = index(&world, IndexOptions::default());
    assert_eq!(report.inserted, 3);

    let lazy = session(&world)
        .getvar(EXP, "temp", &GetVarOptions::default())
        .unwrap();
    let time = lazy.time().unwrap();
    assert_eq!(time.len(), 151);
    for (i, date) in time.iter().enumerate() {
        assert_eq!(*date, CalendarDate::ymd(1900 + i as i64, 1, 1));
    }
    assert_eq!(lazy.chunks.sizes(0), vec![51, 50, 50]);

    let data = lazy.force().unwrap().data;
    for (i, (fixture, step)) in [(&parts[0].1, 50), (&parts[1].1, 0), (&parts[2].1, 49)]
        .into_iter()
        .enumerate()
    {
        let global = [50, 51, 150][i];
        let expected = fixture.expected_value("temp", fixture.times[step], 1, 1).unwrap();
        assert_eq!(data[IxDyn(&[global, 1, 1])], expected);
    }
}

#[test]
fn test_getvar_errors_carry_context() {
    let world = CatalogWorld::new();
    yearly_outputs(&world, 1900, 2);
    index(&world, IndexOptions::default());
    let s = session(&world);

    match s.getvar(EXP, "u", &GetVarOptions::default()) {
        Err(Error::Index(IndexError::VariableNotFound {
            experiment,
            variable,
            ..
        })) => {
            assert_eq!(experiment, EXP);
            assert_eq!(variable, "u");
        }
        other => panic!("expected VariableNotFound, got {:?}", other.map(|a| a.shape)),
    }

    assert!(matches!(
        s.getvar(EXP, "temp", &GetVarOptions::default().n(0)),
        Err(Error::Engine(EngineError::InvalidOptions(_)))
    ));

    let area = s.getvar(EXP, "area_t", &GetVarOptions::default()).unwrap();
    assert_eq!(area.dims, vec!["yt", "xt"]);
    assert_eq!(area.files().len(), 1);
}
