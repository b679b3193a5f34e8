//! End-to-end segmentation on a synthetic Sentinel-2-like image directory.
//!
//! Each image has 12 bands over a 24×32 scene: a "water" strip on the left
//! (low reflectance, NIR lowest), "vegetation" in the middle (NIR high) and
//! "bare soil" on the right. Files are written to a temporary directory in
//! reverse name order to exercise sorted loading.

use geolearn_algorithms::cluster::{mean_image, segment_means, slic, KMeansParams, SlicParams};
use geolearn_algorithms::pipeline::{fit_segmenter, SegmentationConfig};
use geolearn_algorithms::transform::{display_composite, normalize_image, rgb_composite, ConstantChannel, SENTINEL2_RGB};
use geolearn_core::io::{load_image_dir, read_labels, write_labels, write_multiband};
use geolearn_core::ImageStack;
use ndarray::{Array3, Axis};

const BANDS: usize = 12;
const ROWS: usize = 24;
const COLS: usize = 32;

fn reflectance(class: usize, band: usize) -> f64 {
    match class {
        0 => 300.0 + band as f64 * 5.0 - if band == 7 { 200.0 } else { 0.0 },
        1 => 500.0 + if band == 7 { 3500.0 } else { band as f64 * 20.0 },
        _ => 1800.0 + band as f64 * 90.0,
    }
}

fn scene(seed: usize) -> Array3<f64> {
    Array3::from_shape_fn((BANDS, ROWS, COLS), |(b, r, c)| {
        let class = if c < 10 { 0 } else if c < 21 { 1 } else { 2 };
        let noise = ((r * 31 + c * 17 + b * 7 + seed * 13) % 11) as f64;
        reflectance(class, b) + noise
    })
}

fn write_dir() -> (tempfile::TempDir, Vec<Array3<f64>>) {
    let dir = tempfile::tempdir().unwrap();
    let images: Vec<Array3<f64>> = (0..3).map(scene).collect();
    for (i, img) in images.iter().enumerate().rev() {
        write_multiband(img.view(), dir.path().join(format!("S2_{:02}.tif", i))).unwrap();
    }
    (dir, images)
}

// ---------------------------------------------------------------------------
// Loading and composites
// ---------------------------------------------------------------------------

#[test]
fn loads_sorted_and_exact() {
    let (dir, images) = write_dir();
    let stack = load_image_dir(dir.path()).unwrap();
    assert_eq!(stack.shape(), (3, BANDS, ROWS, COLS));
    for (i, img) in images.iter().enumerate() {
        assert_eq!(stack.image(i).unwrap(), img.view());
        assert!(stack.sources()[i].ends_with(format!("S2_{:02}.tif", i)));
    }
}

#[test]
fn composite_matches_stored_bands() {
    let (dir, images) = write_dir();
    let stack = load_image_dir(dir.path()).unwrap();
    let rgb = rgb_composite(&stack, 2, SENTINEL2_RGB).unwrap();
    for (ch, &band) in SENTINEL2_RGB.iter().enumerate() {
        assert_eq!(rgb.index_axis(Axis(0), ch), images[2].index_axis(Axis(0), band));
    }

    let display = display_composite(&stack, 2, SENTINEL2_RGB, ConstantChannel::Zero).unwrap();
    for channel in display.axis_iter(Axis(0)) {
        let min = channel.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = channel.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(min, 0.0);
        assert_eq!(max, 1.0);
    }
}

// ---------------------------------------------------------------------------
// K-means
// ---------------------------------------------------------------------------

#[test]
fn kmeans_recovers_land_cover_classes() {
    let (dir, _) = write_dir();
    let stack = load_image_dir(dir.path()).unwrap();
    let config = SegmentationConfig {
        kmeans: KMeansParams {
            k: 3,
            n_init: 3,
            ..Default::default()
        },
        ..Default::default()
    };
    let segmenter = fit_segmenter(&stack, &[0, 1], &config).unwrap();

    for i in 0..stack.n_images() {
        let labels = segmenter.segment(&stack, i).unwrap();
        let view = labels.view();
        let water = view[[0, 0]];
        let veg = view[[0, 15]];
        let soil = view[[0, 31]];
        assert!(water != veg && veg != soil && water != soil);
        for ((_, c), &l) in view.indexed_iter() {
            let expected = if c < 10 { water } else if c < 21 { veg } else { soil };
            assert_eq!(l, expected);
        }
    }
}

#[test]
fn labels_survive_tiff_roundtrip() {
    let (dir, _) = write_dir();
    let stack = load_image_dir(dir.path()).unwrap();
    let config = SegmentationConfig {
        kmeans: KMeansParams { k: 3, ..Default::default() },
        ..Default::default()
    };
    let labels = fit_segmenter(&stack, &[0], &config).unwrap().segment(&stack, 0).unwrap();

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("labels.tif");
    write_labels(&labels, &path).unwrap();
    let back = read_labels(&path).unwrap();
    assert_eq!(back.view(), labels.view());
}

// ---------------------------------------------------------------------------
// SLIC
// ---------------------------------------------------------------------------

#[test]
fn slic_segments_do_not_cross_class_edges() {
    let stack = ImageStack::from_images(vec![scene(0)]).unwrap();
    let normalized = normalize_image(stack.image(0).unwrap(), ConstantChannel::Zero).unwrap();
    let labels = slic(
        normalized.view(),
        &SlicParams {
            n_segments: 24,
            // Spectral distances are O(1) after normalization
            compactness: 1.0,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(labels.n_labels() >= 3);

    // Every segment lies inside a single land-cover strip
    let class = |c: usize| if c < 10 { 0 } else if c < 21 { 1 } else { 2 };
    let mut segment_class = vec![None; labels.n_labels()];
    for ((_, c), &l) in labels.view().indexed_iter() {
        let slot = &mut segment_class[l as usize];
        match *slot {
            None => *slot = Some(class(c)),
            Some(k) => assert_eq!(k, class(c), "segment {} crosses a class edge", l),
        }
    }

    let means = segment_means(normalized.view(), &labels).unwrap();
    assert_eq!(means.dim(), (labels.n_labels(), BANDS));
    let avg = mean_image(normalized.view(), &labels).unwrap();
    assert_eq!(avg.dim(), normalized.dim());
}
