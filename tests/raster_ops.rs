//! Single-raster operations against small GeoTIFF fixtures written through
//! GDAL. Fixture inputs carry Sentinel-2 style `.jp2` names; GDAL picks the
//! driver from the file content.

mod common;

use approx::assert_relative_eq;
use gdal::Metadata;

use common::{
    Fixture, UTM_32N, metadata_item, read_band, set_band_nodata, temp_leftovers,
};
use s2prep::api::{RasterJob, clip_raster, convert_raster, reproject_raster, resample_raster};
use s2prep::{BoundingBox, Error, OpOutcome, RasterError, RasterHandle, WarpResampling};

fn written(outcome: OpOutcome) -> std::path::PathBuf {
    match outcome {
        OpOutcome::Written(path) => path,
        OpOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
    }
}

// ---------------------------------------------------------------------------
// 2x resample
// ---------------------------------------------------------------------------

#[test]
fn resample_duplicates_pixels_and_halves_pixel_size() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("T32TQM_B05_20m.jp2");
    let output = dir.path().join("T32TQM_B05_10m.tif");
    Fixture::single(
        3,
        2,
        vec![1u16, 2, 3, 4, 5, 6],
        [300000.0, 20.0, 0.0, 5000040.0, 0.0, -20.0],
    )
    .write(&input);

    // one source row per strip exercises the strip offsets
    let job = RasterJob {
        strip_rows: 1,
        ..Default::default()
    };
    let out = written(resample_raster(&input, &output, &job).unwrap());
    assert_eq!(out, output);

    let raster = RasterHandle::open(&output).unwrap();
    assert_eq!(raster.size(), (6, 4));
    let gt = raster.geo_transform().unwrap();
    assert_eq!(gt, [300000.0, 10.0, 0.0, 5000040.0, 0.0, -10.0]);
    assert_eq!(
        read_band::<u16>(&raster, 1),
        vec![
            1, 1, 2, 2, 3, 3, //
            1, 1, 2, 2, 3, 3, //
            4, 4, 5, 5, 6, 6, //
            4, 4, 5, 5, 6, 6,
        ]
    );
    assert_eq!(
        metadata_item(raster.dataset(), "OPERATION").as_deref(),
        Some("resample_2x")
    );
    assert_eq!(
        metadata_item(raster.dataset(), "SOURCE_FILE").as_deref(),
        Some("T32TQM_B05_20m.jp2")
    );
    assert!(raster.projection().contains("32632"));
    assert!(temp_leftovers(dir.path()).is_empty());
}

#[test]
fn resample_of_true_colour_composite_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("T32TQM_TCI_20m.jp2");
    let output = dir.path().join("T32TQM_TCI_10m.tif");
    Fixture::single(2, 2, vec![1u8, 2, 3, 4], [0.0, 20.0, 0.0, 40.0, 0.0, -20.0]).write(&input);

    let outcome = resample_raster(&input, &output, &RasterJob::default()).unwrap();
    assert!(matches!(outcome, OpOutcome::Skipped { .. }));
    assert!(!output.exists());
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

#[test]
fn convert_preserves_values_nodata_and_records_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("T32TQM_B02_10m.jp2");
    let output = dir.path().join("T32TQM_B02_10m.tif");
    let mut fixture = Fixture::single(
        2,
        2,
        vec![-9999i16, 10, 20, 30],
        [500000.0, 10.0, 0.0, 4800000.0, 0.0, -10.0],
    );
    fixture.nodata = Some(-9999.0);
    fixture.write(&input);

    written(convert_raster(&input, &output, &RasterJob::default()).unwrap());

    let raster = RasterHandle::open(&output).unwrap();
    assert_eq!(raster.size(), (2, 2));
    assert_eq!(raster.geo_transform().unwrap(), fixture.geo_transform.unwrap());
    assert_eq!(read_band::<i16>(&raster, 1), vec![-9999, 10, 20, 30]);
    assert_eq!(raster.nodata(1).unwrap(), Some(-9999.0));

    let band = raster.band(1).unwrap();
    let stat = |key: &str| -> f64 { band.metadata_item(key, "").unwrap().parse().unwrap() };
    assert_relative_eq!(stat("STATISTICS_MINIMUM"), 10.0);
    assert_relative_eq!(stat("STATISTICS_MAXIMUM"), 30.0);
    assert_relative_eq!(stat("STATISTICS_MEAN"), 20.0);
    assert_relative_eq!(stat("STATISTICS_VALID_PERCENT"), 75.0);
    assert_eq!(
        metadata_item(raster.dataset(), "OPERATION").as_deref(),
        Some("convert")
    );
}

#[test]
fn convert_copies_every_band_of_a_composite() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("T32TQM_TCI_10m.jp2");
    let output = dir.path().join("T32TQM_TCI_10m.tif");
    let fixture = Fixture {
        cols: 2,
        rows: 1,
        bands: vec![vec![10u8, 11], vec![20, 21], vec![30, 31]],
        geo_transform: Some([500000.0, 10.0, 0.0, 4800000.0, 0.0, -10.0]),
        epsg: Some(UTM_32N),
        nodata: None,
    };
    fixture.write(&input);

    written(convert_raster(&input, &output, &RasterJob::default()).unwrap());

    let raster = RasterHandle::open(&output).unwrap();
    assert_eq!(raster.band_count(), 3);
    for (index, expected) in fixture.bands.iter().enumerate() {
        assert_eq!(&read_band::<u8>(&raster, index + 1), expected);
    }
}

#[test]
fn ungeoreferenced_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plain_B02_10m.jp2");
    let output = dir.path().join("plain_B02_10m.tif");
    let mut fixture = Fixture::single(2, 2, vec![1u16, 2, 3, 4], [0.0; 6]);
    fixture.geo_transform = None;
    fixture.epsg = None;
    fixture.write(&input);

    let err = convert_raster(&input, &output, &RasterJob::default()).unwrap_err();
    assert!(matches!(err, Error::Raster(RasterError::Ungeoreferenced(_))));
    assert!(!output.exists());
}

#[test]
fn missing_input_is_an_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert_raster(
        &dir.path().join("absent_B02_10m.jp2"),
        &dir.path().join("absent_B02_10m.tif"),
        &RasterJob::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Raster(RasterError::Open { .. })));
}

// ---------------------------------------------------------------------------
// Clip
// ---------------------------------------------------------------------------

fn ramp_fixture() -> Fixture<i32> {
    let data = (0..20)
        .flat_map(|r| (0..20).map(move |c| r * 100 + c))
        .collect();
    Fixture::single(20, 20, data, [500000.0, 10.0, 0.0, 4800000.0, 0.0, -10.0])
}

#[test]
fn clip_extracts_the_covering_window() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("T32TQM_B04_10m.tif");
    let output = dir.path().join("T32TQM_B04_10m_clip.tif");
    ramp_fixture().write(&input);

    // corners fall at pixel centres: columns 2..=5, rows 5..=9
    let bbox = BoundingBox::new(500025.0, 4799905.0, 500055.0, 4799945.0);
    written(clip_raster(&input, &output, &bbox, &RasterJob::default()).unwrap());

    let raster = RasterHandle::open(&output).unwrap();
    assert_eq!(raster.size(), (4, 5));
    assert_eq!(
        raster.geo_transform().unwrap(),
        [500020.0, 10.0, 0.0, 4799950.0, 0.0, -10.0]
    );
    let values = read_band::<i32>(&raster, 1);
    assert_eq!(&values[..4], &[502, 503, 504, 505]);
    assert_eq!(&values[16..], &[902, 903, 904, 905]);
    assert_eq!(
        metadata_item(raster.dataset(), "OPERATION").as_deref(),
        Some("clip")
    );
}

#[test]
fn clip_outside_the_raster_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("T32TQM_B04_10m.tif");
    let output = dir.path().join("T32TQM_B04_10m_clip.tif");
    ramp_fixture().write(&input);

    let bbox = BoundingBox::new(400000.0, 4700000.0, 400100.0, 4700100.0);
    let err = clip_raster(&input, &output, &bbox, &RasterJob::default()).unwrap_err();
    assert!(matches!(err, Error::Window(_)));
    assert!(!output.exists());
    assert!(temp_leftovers(dir.path()).is_empty());
}

// ---------------------------------------------------------------------------
// Reprojection
// ---------------------------------------------------------------------------

#[test]
fn reproject_into_the_same_system_keeps_the_grid() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("T32TQM_B04_10m.tif");
    let output = dir.path().join("T32TQM_B04_10m_prj.tif");
    let data: Vec<u16> = (1..=16).collect();
    Fixture::single(4, 4, data.clone(), [500000.0, 10.0, 0.0, 4800000.0, 0.0, -10.0])
        .write(&input);

    written(
        reproject_raster(
            &input,
            &output,
            UTM_32N,
            WarpResampling::Bilinear,
            &RasterJob::default(),
        )
        .unwrap(),
    );

    let raster = RasterHandle::open(&output).unwrap();
    assert_eq!(raster.size(), (4, 4));
    let gt = raster.geo_transform().unwrap();
    assert_relative_eq!(gt[0], 500000.0, epsilon = 1e-6);
    assert_relative_eq!(gt[1], 10.0, epsilon = 1e-6);
    assert_relative_eq!(gt[3], 4800000.0, epsilon = 1e-6);
    assert_relative_eq!(gt[5], -10.0, epsilon = 1e-6);
    assert_eq!(read_band::<u16>(&raster, 1), data);
    assert_eq!(raster.nodata(1).unwrap(), Some(0.0));
    assert_eq!(
        metadata_item(raster.dataset(), "OPERATION").as_deref(),
        Some("reproject")
    );
}

#[test]
fn reproject_keeps_each_band_nodata() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("T32TQM_TCI_10m.tif");
    let output = dir.path().join("T32TQM_TCI_10m_prj.tif");
    let values = vec![-1.0f32, 10.0, 20.0, 30.0];
    let mut fixture = Fixture::single(
        2,
        2,
        values.clone(),
        [500000.0, 10.0, 0.0, 4800000.0, 0.0, -10.0],
    );
    fixture.bands.push(values.clone());
    fixture.nodata = Some(-1.0);
    fixture.write(&input);
    set_band_nodata(&input, 2, 0.0);

    written(
        reproject_raster(
            &input,
            &output,
            UTM_32N,
            WarpResampling::Nearest,
            &RasterJob::default(),
        )
        .unwrap(),
    );

    let raster = RasterHandle::open(&output).unwrap();
    assert_eq!(raster.size(), (2, 2));
    assert_eq!(raster.nodata(1).unwrap(), Some(-1.0));
    assert_eq!(raster.nodata(2).unwrap(), Some(0.0));
    // -1 is a valid sample in band 2
    assert_eq!(read_band::<f32>(&raster, 2), values);
}

#[test]
fn reproject_to_geographic_produces_north_up_grid() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("T32TQM_B04_10m.tif");
    let output = dir.path().join("T32TQM_B04_10m_prj.tif");
    ramp_fixture().write(&input);

    written(
        reproject_raster(
            &input,
            &output,
            4326,
            WarpResampling::Nearest,
            &RasterJob::default(),
        )
        .unwrap(),
    );

    let raster = RasterHandle::open(&output).unwrap();
    let gt = raster.geo_transform().unwrap();
    assert!(gt[1] > 0.0);
    assert!(gt[5] < 0.0);
    // UTM 32N easting 500000 lies on the 9 degree east central meridian
    assert!(gt[0] > 8.9 && gt[0] < 9.1, "origin x {}", gt[0]);
    assert!(raster.projection().contains("4326"));
    let (cols, rows) = raster.size();
    assert!(cols >= 1 && rows >= 1);
}
