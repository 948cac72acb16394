//! End-to-end tests of `make_efficient_example` on files in a temp directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::{GrayImage, Luma, Rgb, RgbImage};
use nalgebra::{Matrix3, Point2, Point3};
use posecrop_core::camera::reproject_image_points;
use posecrop_core::decode::read_image;
use posecrop_core::{
    make_efficient_example, BBox, BrownConrady, Camera, CropOptions, Example, ImageSource, MaskRepr,
    Pose, PreprocessError, RleMask,
};
use tempfile::TempDir;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn write_source(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    gradient(width, height).save(&path).unwrap();
    path
}

fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

fn coords(example: &Example) -> &[Point2<f64>] {
    match &example.pose {
        Pose::Pose2D { coords, .. } => coords,
        Pose::Pose3D { .. } => panic!("expected a 2D example"),
    }
}

fn studio_camera() -> Camera {
    Camera::from_intrinsics(Matrix3::new(
        800.0, 0.0, 330.0, //
        0.0, 810.0, 235.0, //
        0.0, 0.0, 1.0,
    ))
    .with_extrinsics(Matrix3::identity(), Point3::new(0.2, -1.6, -3.0))
    .with_distortion(BrownConrady::from_opencv([-0.2, 0.05, 0.001, -0.0005, 0.0]))
}

#[test]
fn test_2d_coords_are_shifted_and_scaled() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path(), "frame.png", 640, 480);
    let dst = dir.path().join("crops/frame.jpg");

    let example = Example::new_2d(src, BBox::new(100.0, 100.0, 50.0, 80.0), vec![Point2::new(120.0, 140.0)]);
    let options = CropOptions::default().with_further_expansion_factor(0.0);
    let new_ex = make_efficient_example(&example, &dst, &options).unwrap().unwrap();

    // Crop origin (100, 100), zoom capped at 1.2.
    let p = coords(&new_ex)[0];
    assert!((p.x - 24.0).abs() < 1e-9 && (p.y - 48.0).abs() < 1e-9, "{:?}", p);
    assert!((new_ex.bbox.width - 60.0).abs() < 1e-9);
    assert!((new_ex.bbox.height - 96.0).abs() < 1e-9);
    assert_eq!(new_ex.image, ImageSource::Path(dst.clone()));
    assert!(new_ex.camera().is_none());

    let written = read_image(&dst).unwrap();
    assert_eq!(written.dimensions(), (60, 96));

    // The input record is untouched.
    assert_eq!(coords(&example)[0], Point2::new(120.0, 140.0));
}

#[test]
fn test_cached_output_is_not_rewritten() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path(), "frame.png", 320, 240);
    let dst = dir.path().join("out/frame.jpg");
    let example = Example::new_2d(src, BBox::new(100.0, 60.0, 60.0, 120.0), vec![Point2::new(130.0, 70.0)]);
    let options = CropOptions::default();

    let first = make_efficient_example(&example, &dst, &options).unwrap().unwrap();
    let written_at = mtime(&dst);
    let bytes = fs::read(&dst).unwrap();

    let second = make_efficient_example(&example, &dst, &options).unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(mtime(&dst), written_at);
    assert_eq!(fs::read(&dst).unwrap(), bytes);
}

#[test]
fn test_unreadable_cache_is_rewritten() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path(), "frame.png", 320, 240);
    let dst = dir.path().join("frame.jpg");
    fs::write(&dst, b"truncated").unwrap();

    let example = Example::new_2d(src, BBox::new(100.0, 60.0, 60.0, 120.0), vec![]);
    make_efficient_example(&example, &dst, &CropOptions::default()).unwrap().unwrap();
    assert!(read_image(&dst).is_ok());
}

#[test]
fn test_stale_cache_is_rewritten() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path(), "frame.png", 320, 240);
    let dst = dir.path().join("frame.png");
    // A readable but wrong image at the destination.
    RgbImage::from_pixel(3, 3, Rgb([1, 2, 3])).save(&dst).unwrap();

    let example = Example::new_2d(src, BBox::new(100.0, 60.0, 60.0, 120.0), vec![]);
    let fresh = CropOptions::default();
    make_efficient_example(&example, &dst, &fresh).unwrap().unwrap();
    assert_eq!(read_image(&dst).unwrap().dimensions(), (3, 3));

    let stale = CropOptions::default().with_min_time(SystemTime::now() + std::time::Duration::from_secs(3600));
    make_efficient_example(&example, &dst, &stale).unwrap().unwrap();
    assert_ne!(read_image(&dst).unwrap().dimensions(), (3, 3));
}

#[test]
fn test_broken_source_is_skipped_when_allowed() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("broken.jpg");
    fs::File::create(&src).unwrap();
    let dst = dir.path().join("out.jpg");
    let example = Example::new_2d(src, BBox::new(0.0, 0.0, 10.0, 10.0), vec![]);

    let skipped = make_efficient_example(&example, &dst, &CropOptions::default().with_ignore_broken_image(true));
    assert!(matches!(skipped, Ok(None)));
    assert!(!dst.exists());

    let failed = make_efficient_example(&example, &dst, &CropOptions::default());
    assert!(matches!(failed, Err(PreprocessError::CorruptSourceImage { .. })));
}

#[test]
fn test_missing_source_is_always_fatal() {
    let dir = TempDir::new().unwrap();
    let example = Example::new_2d(dir.path().join("nope.jpg"), BBox::new(0.0, 0.0, 10.0, 10.0), vec![]);
    let dst = dir.path().join("out.jpg");

    for ignore in [false, true] {
        let options = CropOptions::default().with_ignore_broken_image(ignore);
        let result = make_efficient_example(&example, &dst, &options);
        assert!(matches!(result, Err(PreprocessError::MissingSourceImage { .. })), "{:?}", result);
    }
}

#[test]
fn test_3d_example_gets_new_camera() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path(), "frame.png", 640, 480);
    let dst = dir.path().join("frame.jpg");

    let camera = studio_camera();
    let bbox = BBox::new(420.0, 150.0, 90.0, 220.0);
    let head = camera.image_to_world(&Point2::new(465.0, 170.0), 3.0).unwrap();
    let example = Example::new_3d(src, bbox, vec![head], camera.clone());

    let new_ex = make_efficient_example(&example, &dst, &CropOptions::default()).unwrap().unwrap();
    let new_camera = new_ex.camera().unwrap();
    assert!(!new_camera.has_distortion());
    assert_eq!(new_camera.optical_center, camera.optical_center);
    assert_ne!(new_camera.rot_world_to_cam, camera.rot_world_to_cam);

    match &new_ex.pose {
        Pose::Pose3D { world_coords, .. } => assert_eq!(world_coords, &vec![head]),
        Pose::Pose2D { .. } => panic!("3D example became 2D"),
    }

    // The head still projects into the person's box of the crop.
    let (w, h) = read_image(&dst).unwrap().dimensions();
    let projected = new_camera.world_to_image(&head).unwrap();
    assert!(new_ex.bbox.contains_point(&projected, 1e-6), "{:?} vs {:?}", projected, new_ex.bbox);
    assert!(projected.x >= 0.0 && projected.x < w as f64);
    assert!(projected.y >= 0.0 && projected.y < h as f64);
}

#[test]
fn test_2d_example_with_camera_is_turned() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path(), "frame.png", 640, 480);
    let dst = dir.path().join("frame.jpg");
    let camera = studio_camera();
    let joint = Point2::new(100.0, 400.0);
    let example = Example::new_2d(src, BBox::new(60.0, 300.0, 80.0, 160.0), vec![joint]).with_camera(camera.clone());

    let new_ex = make_efficient_example(&example, &dst, &CropOptions::default()).unwrap().unwrap();
    let new_camera = new_ex.camera().unwrap().clone();
    let expected = reproject_image_points(&[joint], &camera, &new_camera).unwrap()[0];
    assert!((coords(&new_ex)[0] - expected).norm() < 1e-9);
}

#[test]
fn test_in_memory_source_and_png_output() {
    let dir = TempDir::new().unwrap();
    let dst = dir.path().join("crop.png");
    let pixels = RgbImage::from_pixel(200, 150, Rgb([90, 160, 30]));
    let example = Example::new_2d(pixels, BBox::new(50.0, 40.0, 60.0, 80.0), vec![Point2::new(f64::NAN, f64::NAN)]);

    let new_ex = make_efficient_example(&example, &dst, &CropOptions::default()).unwrap().unwrap();
    assert!(coords(&new_ex)[0].x.is_nan());

    let written = read_image(&dst).unwrap();
    let p = written.get_pixel(written.width() / 2, written.height() / 2);
    for (got, want) in p.0.iter().zip([90u8, 160, 30]) {
        assert!((*got as i32 - want as i32).abs() <= 1, "{:?}", p);
    }
}

#[test]
fn test_data_root_resolves_relative_paths() {
    let dir = TempDir::new().unwrap();
    write_source(dir.path(), "frame.png", 320, 240);
    let example = Example::new_2d(PathBuf::from("frame.png"), BBox::new(100.0, 60.0, 60.0, 120.0), vec![]);
    let relative_dst = Path::new("crops/a/frame.jpg");

    let options = CropOptions::default().with_data_root(dir.path());
    let new_ex = make_efficient_example(&example, relative_dst, &options).unwrap().unwrap();
    assert_eq!(new_ex.image, ImageSource::Path(relative_dst.to_path_buf()));
    assert!(dir.path().join(relative_dst).exists());
}

#[test]
fn test_dense_mask_is_encoded_at_crop_size() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path(), "frame.png", 200, 200);
    let dst = dir.path().join("frame.jpg");
    let mask = GrayImage::from_fn(200, 200, |x, y| {
        Luma([if (60..100).contains(&x) && (50..130).contains(&y) { 255 } else { 0 }])
    });
    let example = Example::new_2d(src, BBox::new(60.0, 50.0, 40.0, 80.0), vec![]).with_mask(MaskRepr::Dense(mask));

    let options = CropOptions::default().with_further_expansion_factor(0.0);
    let new_ex = make_efficient_example(&example, &dst, &options).unwrap().unwrap();
    let Some(MaskRepr::Encoded(rle)) = &new_ex.mask else {
        panic!("mask was not encoded: {:?}", new_ex.mask);
    };
    assert_eq!((rle.width, rle.height), (48, 96));
    // The crop is exactly the masked region.
    assert_eq!(rle.area(), 48 * 96);
}

#[test]
fn test_file_mask_keeps_the_person() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path(), "frame.png", 300, 200);
    let mask_path = dir.path().join("mask.png");
    // The person, and a second blob that falls inside the crop.
    RgbImage::from_fn(300, 200, |x, y| {
        let person = (120..180).contains(&x) && (40..160).contains(&y);
        let other = (60..80).contains(&x) && (60..80).contains(&y);
        Rgb([if person || other { 255 } else { 0 }, 0, 0])
    })
    .save(&mask_path)
    .unwrap();

    let example = Example::new_2d(src, BBox::new(120.0, 40.0, 60.0, 120.0), vec![])
        .with_mask(MaskRepr::Path(PathBuf::from("mask.png")));
    let options = CropOptions::default().with_data_root(dir.path());
    let new_ex = make_efficient_example(&example, Path::new("crop.jpg"), &options).unwrap().unwrap();

    let Some(MaskRepr::Encoded(rle)) = &new_ex.mask else {
        panic!("mask was not encoded");
    };
    let mask_box = rle.bbox().unwrap();
    assert!(mask_box.iou(&new_ex.bbox) > 0.9, "{:?} vs {:?}", mask_box, new_ex.bbox);
}

#[test]
fn test_encoded_mask_round_trips_through_crop() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path(), "frame.png", 100, 100);
    let dst = dir.path().join("frame.jpg");
    let rle = RleMask::from_fn(100, 100, |x, y| (20..40).contains(&x) && (30..70).contains(&y));

    let example = Example::new_2d(src, BBox::new(20.0, 30.0, 20.0, 40.0), vec![]).with_mask(MaskRepr::Encoded(rle));
    let options = CropOptions::default().with_further_expansion_factor(0.0);
    let new_ex = make_efficient_example(&example, &dst, &options).unwrap().unwrap();
    let Some(MaskRepr::Encoded(out)) = &new_ex.mask else {
        panic!("mask was not encoded");
    };
    assert_eq!((out.width, out.height), (24, 48));
    assert_eq!(out.area(), 24 * 48);
}
