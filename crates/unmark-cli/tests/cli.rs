use std::path::{Path, PathBuf};
use std::time::Duration;

use assert_cmd::Command;
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use predicates::prelude::*;
use tempfile::TempDir;

fn unmark() -> Command {
    Command::cargo_bin("unmark").unwrap()
}

/// One-page PDF with the given content and DeviceRGB image XObjects.
fn write_pdf(dir: &Path, content: &[u8], images: &[(&str, u32, u32, [u8; 3])]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut xobjects = Dictionary::new();
    for &(name, width, height, rgb) in images {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.repeat((width * height) as usize),
        );
        xobjects.set(name, doc.add_object(stream));
    }

    let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! { "XObject" => xobjects },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join("input.pdf");
    doc.save(&path).unwrap();
    path
}

fn page_text(path: &Path) -> String {
    let doc = Document::load(path).unwrap();
    let page = doc.get_pages()[&1];
    String::from_utf8_lossy(&doc.get_page_content(page).unwrap()).into_owned()
}

#[test]
fn test_help() {
    unmark()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--scanned"))
        .stdout(predicate::str::contains("--skip-form"));
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    unmark()
        .arg(dir.path().join("nope.pdf"))
        .arg("-o")
        .arg(dir.path().join("out.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_text_removal() {
    let dir = TempDir::new().unwrap();
    let input = write_pdf(dir.path(), b"BT (CONFIDENTIAL draft) Tj (Body) Tj ET", &[]);
    let output = dir.path().join("clean.pdf");

    unmark()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--text", "CONFIDENTIAL"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 text run(s)"));

    let text = page_text(&output);
    assert!(!text.contains("CONFIDENTIAL"));
    assert!(text.contains("Body"));
}

#[test]
fn test_image_removal_without_prompt() {
    let dir = TempDir::new().unwrap();
    let input = write_pdf(
        dir.path(),
        b"q 50 0 0 50 0 0 cm /Im0 Do Q",
        &[("Im0", 4, 4, [220, 220, 220])],
    );
    let output = dir.path().join("clean.pdf");

    unmark()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["-i", "--review", "remove"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 image(s)"));

    assert!(!page_text(&output).contains("Im0"));
}

#[test]
fn test_scanned_mode() {
    let dir = TempDir::new().unwrap();
    let input = write_pdf(
        dir.path(),
        b"",
        &[("Im0", 8, 4, [240, 80, 80]), ("Im1", 8, 4, [30, 30, 30])],
    );
    let output = dir.path().join("scan.pdf");

    unmark()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--scanned")
        .assert()
        .success()
        .stdout(predicate::str::contains("32 pixel(s) whitened"));

    let doc = Document::load(&output).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_pdf(dir.path(), b"", &[]);
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{"scan": {"jpeg_quality": 0}}"#).unwrap();

    unmark()
        .arg(&input)
        .arg("-o")
        .arg(dir.path().join("out.pdf"))
        .arg("-c")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("jpeg_quality"));
}

#[test]
fn test_prompt_stops_when_stdin_is_closed() {
    let dir = TempDir::new().unwrap();
    let input = write_pdf(dir.path(), b"/Im0 Do", &[("Im0", 2, 2, [9, 9, 9])]);
    let output = dir.path().join("out.pdf");

    unmark()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("-i")
        .write_stdin("")
        .timeout(Duration::from_secs(20))
        .assert()
        .failure()
        .stderr(predicate::str::contains("stdin closed"));

    assert!(!output.exists());
}

#[test]
fn test_prompt_reads_answer_from_stdin() {
    let dir = TempDir::new().unwrap();
    let input = write_pdf(dir.path(), b"/Im0 Do", &[("Im0", 2, 2, [9, 9, 9])]);
    let output = dir.path().join("out.pdf");

    unmark()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("-i")
        .write_stdin("maybe\ny\n")
        .timeout(Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 image(s)"));

    assert!(!page_text(&output).contains("Im0"));
}

#[test]
fn test_scanned_mode_ignores_empty_text() {
    let dir = TempDir::new().unwrap();
    let input = write_pdf(dir.path(), b"", &[("Im0", 4, 4, [30, 30, 30])]);
    let output = dir.path().join("scan.pdf");

    unmark()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--scanned", "--text", ""])
        .assert()
        .success();

    assert!(output.exists());
}
