use facefind::{run, Config, NoProgress, ScanError};
use facefind_core::{BoundingBox, DetectedFace, EmbedderError, Embedding, FaceEmbedder};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Stand-in embedder: one 80×80 face whose embedding is the colour of the
/// top-left pixel. Black images have no face.
struct ColorEmbedder;

impl FaceEmbedder for ColorEmbedder {
    fn faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, EmbedderError> {
        let p = image.get_pixel(0, 0);
        if p.0 == [0, 0, 0] {
            return Ok(Vec::new());
        }
        Ok(vec![DetectedFace {
            bbox: BoundingBox::from_corners(10.0, 10.0, 90.0, 90.0),
            embedding: Embedding::new(vec![p[0] as f32, p[1] as f32, p[2] as f32]),
        }])
    }
}

fn write_png(path: &Path, color: [u8; 3]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(100, 100, Rgb(color)).save(path).unwrap();
}

/// Alice is red, Bob is blue, Nobody has no usable sample.
/// `alice_party.png` scores ~0.5 against Alice; `empty_room.png` has no face.
fn fixture(root: &Path) -> Config {
    let known = root.join("Known");
    write_png(&known.join("Alice/a1.png"), [255, 0, 0]);
    write_png(&known.join("Alice/nested/a2.png"), [200, 0, 0]);
    write_png(&known.join("Bob/b1.png"), [0, 0, 255]);
    write_png(&known.join("Nobody/dark.png"), [0, 0, 0]);
    fs::write(known.join("Nobody/corrupt.jpg"), b"not an image").unwrap();

    let photos = root.join("Event Photos");
    write_png(&photos.join("alice_party.png"), [100, 173, 0]);
    write_png(&photos.join("sub/empty_room.png"), [0, 0, 0]);
    fs::write(photos.join("notes.txt"), b"ignore me").unwrap();
    fs::write(photos.join("broken.jpg"), b"garbage").unwrap();

    Config {
        known_dir: known,
        photos_dir: photos,
        output_dir: root.join("output"),
        ..Config::default()
    }
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                out.extend(files_under(&path));
            } else {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

#[test]
fn test_single_match_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = fixture(dir.path());

    let summary = run(&cfg, &mut ColorEmbedder, &mut NoProgress).unwrap();

    assert_eq!(summary.identities, vec!["Alice", "Bob"]);
    assert_eq!(summary.photos, 3);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        summary.appearances,
        vec![("Alice".to_string(), 1), ("Bob".to_string(), 0)]
    );
    assert_eq!(summary.identified(), 1);

    let out = &cfg.output_dir;
    assert_eq!(
        files_under(&out.join("annotated")),
        vec![out.join("annotated/alice_party_annotated.png")]
    );
    assert_eq!(
        files_under(&out.join("per_person")),
        vec![out.join("per_person/Alice/alice_party.png")]
    );

    let csv = fs::read_to_string(&summary.reports.csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "photo,annotated,matches,scores");
    assert!(lines[1].contains("alice_party.png"));
    assert!(lines[1].contains("alice_party_annotated.png"));
    assert!(lines[1].contains(",Alice,"));
    assert!(!csv.contains("empty_room"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary.reports.json).unwrap()).unwrap();
    let matches = json["matches"].as_object().unwrap();
    assert_eq!(matches.keys().collect::<Vec<_>>(), ["Alice", "Bob"]);
    let alice = matches["Alice"].as_array().unwrap();
    assert_eq!(alice.len(), 1);
    let score = alice[0]["score"].as_f64().unwrap();
    assert!((score - 0.5).abs() < 1e-2, "score = {score}");
    assert!(alice[0]["photo"].as_str().unwrap().ends_with("alice_party.png"));
    assert_eq!(matches["Bob"], serde_json::json!([]));
    assert!(!json.to_string().contains("empty_room"));
    assert!(!json.to_string().contains("Nobody"));
}

#[test]
fn test_threshold_above_score_produces_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config {
        similarity_threshold: 0.6,
        ..fixture(dir.path())
    };

    let summary = run(&cfg, &mut ColorEmbedder, &mut NoProgress).unwrap();

    assert_eq!(summary.matched, 0);
    assert!(files_under(&cfg.output_dir.join("annotated")).is_empty());
    assert!(files_under(&cfg.output_dir.join("per_person")).is_empty());
    let csv = fs::read_to_string(&summary.reports.csv).unwrap();
    assert_eq!(csv, "photo,annotated,matches,scores\n");
}

#[test]
fn test_no_usable_identities_aborts_before_scanning() {
    let dir = tempfile::tempdir().unwrap();
    let known = dir.path().join("Known");
    write_png(&known.join("Ghost/dark.png"), [0, 0, 0]);
    let photos = dir.path().join("photos");
    write_png(&photos.join("p.png"), [255, 0, 0]);

    let cfg = Config {
        known_dir: known,
        photos_dir: photos,
        output_dir: dir.path().join("output"),
        ..Config::default()
    };

    let mut calls = 0;
    let mut progress = |_: usize, _: usize, _: &str| calls += 1;
    let err = run(&cfg, &mut ColorEmbedder, &mut progress).unwrap_err();

    assert!(matches!(err, ScanError::NoProfiles));
    assert_eq!(calls, 0);
    assert!(!cfg.output_dir.exists());
}

#[test]
fn test_missing_photos_dir_is_distinct_from_no_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config {
        photos_dir: dir.path().join("does-not-exist"),
        ..fixture(dir.path())
    };
    let err = run(&cfg, &mut ColorEmbedder, &mut NoProgress).unwrap_err();
    assert!(matches!(err, ScanError::Photos { .. }));
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = fixture(dir.path());
    // A second matching photo so row order matters.
    write_png(&cfg.photos_dir.join("a_bob.png"), [10, 0, 250]);

    let first = run(&cfg, &mut ColorEmbedder, &mut NoProgress).unwrap();
    let csv1 = fs::read(&first.reports.csv).unwrap();
    let json1 = fs::read(&first.reports.json).unwrap();

    assert_eq!(first.identified(), 2);

    let second = run(&cfg, &mut ColorEmbedder, &mut NoProgress).unwrap();
    assert_eq!(fs::read(&second.reports.csv).unwrap(), csv1);
    assert_eq!(fs::read(&second.reports.json).unwrap(), json1);

    let csv = String::from_utf8(csv1).unwrap();
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].contains("a_bob.png"));
    assert!(rows[1].contains("alice_party.png"));
}
