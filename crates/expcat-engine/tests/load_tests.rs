//! Planning and forcing lazy arrays over fixture files.

use std::path::PathBuf;

use expcat_engine::{Coordinate, Error, GetVarOptions, open_variable};
use expcat_netcdf::{AttrValue, FileBuilder, NcType};
use expcat_testing::TimeSeriesFixture;
use expcat_types::{Calendar, CalendarDate};
use ndarray::{IxDyn, s};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, fixture: &TimeSeriesFixture) -> PathBuf {
    let path = dir.path().join(name);
    fixture.write(&path).unwrap();
    path
}

#[test]
fn test_concatenates_files_in_order() {
    let dir = TempDir::new().unwrap();
    let a = TimeSeriesFixture::monthly(1900, 1);
    let b = TimeSeriesFixture::monthly(1901, 1);
    let paths = vec![write(&dir, "a.nc", &a), write(&dir, "b.nc", &b)];

    let lazy = open_variable("temp", &paths, &GetVarOptions::default()).unwrap();
    assert_eq!(lazy.dims, vec!["time", "yt", "xt"]);
    assert_eq!(lazy.shape, vec![24, 2, 3]);
    assert_eq!(lazy.chunks.shape(), vec![2, 1, 1]);
    assert_eq!(lazy.files(), vec![paths[0].as_path(), paths[1].as_path()]);
    assert_eq!(lazy.attrs.get("units").map(String::as_str), Some("degC"));
    assert_eq!(lazy.attrs.get("calendar").map(String::as_str), Some("noleap"));

    let time = lazy.time().unwrap();
    assert_eq!(time[0], CalendarDate::ymd(1900, 1, 1));
    assert_eq!(time[11], CalendarDate::ymd(1900, 12, 1));
    assert_eq!(time[12], CalendarDate::ymd(1901, 1, 1));
    assert!(time.windows(2).all(|w| w[0] < w[1]));

    let yt = lazy.coord("yt").unwrap();
    assert!(matches!(yt, Coordinate::Values { values, .. } if values == &vec![-80.0, -79.0]));

    let forced = lazy.force().unwrap();
    assert_eq!(forced.data.shape(), &[24, 2, 3]);
    assert_eq!(
        forced.data[IxDyn(&[13, 1, 2])],
        b.expected_value("temp", b.times[1], 1, 2).unwrap()
    );
    assert_eq!(
        forced.data[IxDyn(&[0, 0, 0])],
        a.expected_value("temp", a.times[0], 0, 0).unwrap()
    );
}

#[test]
fn test_later_file_is_rebased_to_first_units() {
    let dir = TempDir::new().unwrap();
    let a = TimeSeriesFixture::monthly(1900, 1);
    let b = TimeSeriesFixture::monthly(1901, 1).with_units("hours since 1901-01-01 00:00:00");
    let paths = vec![write(&dir, "a.nc", &a), write(&dir, "b.nc", &b)];

    let lazy = open_variable("temp", &paths, &GetVarOptions::default()).unwrap();
    let Some(Coordinate::Time { values, dates, units, .. }) = lazy.coord("time") else {
        panic!("time coordinate missing");
    };
    assert_eq!(units, "days since 1900-01-01 00:00:00");
    assert_eq!(values[12], 365.0);
    assert_eq!(values[13], 365.0 + 31.0);
    assert_eq!(dates[12], CalendarDate::ymd(1901, 1, 1));
}

#[test]
fn test_mismatched_files_are_incompatible() {
    let dir = TempDir::new().unwrap();
    let first = write(&dir, "a.nc", &TimeSeriesFixture::monthly(1900, 1));

    let mut kelvin = TimeSeriesFixture::monthly(1901, 1);
    kelvin.variables[0].units = "K".to_string();
    let wider = TimeSeriesFixture::monthly(1901, 1).with_grid(2, 4);
    let julian = TimeSeriesFixture::monthly_in(Calendar::Julian, 1901, 1);

    for (name, fixture) in [("k.nc", kelvin), ("w.nc", wider), ("j.nc", julian)] {
        let second = write(&dir, name, &fixture);
        let err = open_variable("temp", &[first.clone(), second.clone()], &GetVarOptions::default())
            .unwrap_err();
        match err {
            Error::IncompatibleFile { path, .. } => assert_eq!(path, second),
            other => panic!("expected IncompatibleFile for {}, got {:?}", name, other),
        }
    }
}

#[test]
fn test_window_selects_inclusive_subset() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(&dir, "a.nc", &TimeSeriesFixture::monthly(1900, 1)),
        write(&dir, "b.nc", &TimeSeriesFixture::monthly(1901, 1)),
    ];

    let opts = GetVarOptions::default()
        .start_time(CalendarDate::ymd(1900, 11, 1))
        .end_time(CalendarDate::ymd(1901, 2, 1));
    let lazy = open_variable("salt", &paths, &opts).unwrap();
    assert_eq!(lazy.shape[0], 4);
    assert_eq!(lazy.time().unwrap().first(), Some(&CalendarDate::ymd(1900, 11, 1)));
    assert_eq!(lazy.time().unwrap().last(), Some(&CalendarDate::ymd(1901, 2, 1)));
    assert_eq!(lazy.chunks.sizes(0), vec![2, 2]);

    let full = open_variable("salt", &paths, &GetVarOptions::default())
        .unwrap()
        .force()
        .unwrap();
    let windowed = lazy.force().unwrap();
    assert_eq!(windowed.data, full.data.slice(s![10..14, .., ..]).into_dyn().to_owned());

    let outside = GetVarOptions::default().start_time(CalendarDate::ymd(1950, 1, 1));
    assert!(matches!(
        open_variable("salt", &paths, &outside),
        Err(Error::EmptyRange { .. })
    ));
}

#[test]
fn test_window_touching_one_file_skips_the_other() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(&dir, "a.nc", &TimeSeriesFixture::monthly(1900, 1)),
        write(&dir, "b.nc", &TimeSeriesFixture::monthly(1901, 1)),
    ];
    let opts = GetVarOptions::default().end_time(CalendarDate::ymd(1900, 6, 15));
    let lazy = open_variable("temp", &paths, &opts).unwrap();
    assert_eq!(lazy.shape[0], 6);
    assert_eq!(lazy.files(), vec![paths[0].as_path()]);
}

#[test]
fn test_offset_shifts_dates_not_values() {
    let dir = TempDir::new().unwrap();
    let paths = vec![write(&dir, "a.nc", &TimeSeriesFixture::monthly(1900, 1))];

    let plain = open_variable("temp", &paths, &GetVarOptions::default()).unwrap();
    let shifted = open_variable("temp", &paths, &GetVarOptions::default().offset(365)).unwrap();

    let before = plain.time().unwrap();
    let after = shifted.time().unwrap();
    for (b, a) in before.iter().zip(after) {
        assert_eq!(a.year, b.year + 1);
        assert!(a.same_day_and_time(b));
        assert_eq!(a.month, b.month);
    }
    assert_eq!(plain.force().unwrap().data, shifted.force().unwrap().data);
}

#[test]
fn test_static_variable_loads_from_first_file() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(&dir, "a.nc", &TimeSeriesFixture::monthly(1900, 1)),
        write(&dir, "b.nc", &TimeSeriesFixture::monthly(1901, 1)),
    ];

    let lazy = open_variable("area_t", &paths, &GetVarOptions::default()).unwrap();
    assert_eq!(lazy.dims, vec!["yt", "xt"]);
    assert!(lazy.time().is_none());
    assert_eq!(lazy.files(), vec![paths[0].as_path()]);
    let data = lazy.force().unwrap().data;
    assert_eq!(data[IxDyn(&[1, 2])], 1.0e6 + 5.0);

    let windowed = GetVarOptions::default().start_time(CalendarDate::ymd(1900, 1, 1));
    assert!(matches!(
        open_variable("area_t", &paths, &windowed),
        Err(Error::InvalidOptions(_))
    ));
}

#[test]
fn test_force_chunk_matches_full_array() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(&dir, "a.nc", &TimeSeriesFixture::monthly(1900, 1)),
        write(&dir, "b.nc", &TimeSeriesFixture::monthly(1901, 1)),
    ];
    let opts = GetVarOptions::default().chunk("time", 5).chunk("xt", 2);
    let lazy = open_variable("temp", &paths, &opts).unwrap();
    assert_eq!(lazy.chunks.shape(), vec![5, 1, 2]);

    let full = lazy.force().unwrap().data;
    let block = lazy.force_chunk(&[2, 0, 1]).unwrap();
    assert_eq!(block.shape(), &[5, 2, 1]);
    assert_eq!(block, full.slice(s![10..15, 0..2, 2..3]).into_dyn().to_owned());

    assert!(matches!(
        lazy.force_chunk(&[5, 0, 0]),
        Err(Error::ChunkOutOfRange { .. })
    ));
    assert!(matches!(
        open_variable("temp", &paths, &GetVarOptions::default().chunk("depth", 1)),
        Err(Error::InvalidOptions(_))
    ));
}

#[test]
fn test_packed_values_are_unpacked_with_fill_as_nan() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("packed.nc");
    let mut b = FileBuilder::new();
    b.unlimited_dimension("time", 3);
    b.add_variable("time", NcType::Double, &["time"], vec![0.0, 1.0, 2.0])
        .unwrap()
        .add_variable_attribute("time", "units", AttrValue::text("days since 2000-01-01"))
        .unwrap();
    b.add_variable("eta_t", NcType::Short, &["time"], vec![100.0, -999.0, -50.0])
        .unwrap()
        .add_variable_attribute("eta_t", "scale_factor", AttrValue::double(0.01))
        .unwrap()
        .add_variable_attribute("eta_t", "add_offset", AttrValue::double(1.0))
        .unwrap()
        .add_variable_attribute(
            "eta_t",
            "_FillValue",
            AttrValue::Numbers(NcType::Short, vec![-999.0]),
        )
        .unwrap();
    b.write(&path).unwrap();

    let lazy = open_variable("eta_t", &[path], &GetVarOptions::default()).unwrap();
    let data = lazy.force().unwrap().data;
    assert!((data[IxDyn(&[0])] - 2.0).abs() < 1e-12);
    assert!(data[IxDyn(&[1])].is_nan());
    assert!((data[IxDyn(&[2])] - 0.5).abs() < 1e-12);
    assert_eq!(lazy.force().unwrap().stats().unwrap().missing, 1);
}

#[test]
fn test_missing_file_surfaces_path() {
    let missing = PathBuf::from("/nonexistent/expcat/a.nc");
    match open_variable("temp", &[missing.clone()], &GetVarOptions::default()) {
        Err(Error::Netcdf { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected Netcdf error, got {:?}", other.map(|a| a.shape)),
    }
}
