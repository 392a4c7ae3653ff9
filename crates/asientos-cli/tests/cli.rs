use std::fs;
use std::path::Path;

use assert_cmd::Command;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use predicates::prelude::*;

fn asientos(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("asientos").unwrap();
    // Keep the user's config and language data out of the tests
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("TESSDATA_PREFIX")
        .env_remove("RUST_LOG");
    cmd
}

/// Single-page PDF with one line of Helvetica text per entry in `lines`.
fn text_pdf(path: &Path, lines: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 11.into()]),
        Operation::new("TL", vec![14.into()]),
        Operation::new("Td", vec![40.into(), 740.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    let content = Content { operations };

    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Single-page PDF holding only a gray raster.
fn image_pdf(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 40,
            "Height" => 20,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![255u8; 40 * 20],
    ));
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        b"q 612 0 0 792 0 0 cm /Im0 Do Q".to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

#[test]
fn help_lists_subcommands() {
    let home = tempfile::tempdir().unwrap();
    asientos(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn process_missing_file_fails() {
    let home = tempfile::tempdir().unwrap();
    asientos(home.path())
        .args(["process", "does-not-exist.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn process_rejects_non_pdf() {
    let home = tempfile::tempdir().unwrap();
    let input = home.path().join("scan.png");
    fs::write(&input, b"not really a png").unwrap();

    asientos(home.path())
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}

#[test]
fn process_image_only_pdf_without_ocr_writes_empty_array() {
    let home = tempfile::tempdir().unwrap();
    let input = home.path().join("scan.pdf");
    let output = home.path().join("out.json");
    image_pdf(&input);

    asientos(home.path())
        .arg("process")
        .arg(&input)
        .arg("--text-only")
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&output).unwrap().trim(), "[]");
}

#[test]
fn process_text_pdf_detects_target_clause() {
    let home = tempfile::tempdir().unwrap();
    let input = home.path().join("certificado.pdf");
    let text_output = home.path().join("pages.txt");
    text_pdf(
        &input,
        &[
            "CERTIFICACION DE ESTADO JURIDICO DEL INMUEBLE",
            "Hipoteca en primer rango a favor de BANCO RESERVAS",
            "por la suma de RD$ 1,500,000.00 segun acto notarial",
        ],
    );

    asientos(home.path())
        .arg("process")
        .arg(&input)
        .arg("--text-only")
        .arg("--text-output")
        .arg(&text_output)
        .assert()
        .success()
        .stdout(predicate::str::contains("[ID Parcial]"))
        .stdout(predicate::str::contains("\"isSimilarityMatch\": false"));

    let pages = fs::read_to_string(&text_output).unwrap();
    assert!(pages.starts_with("--- Página 1 (direct) ---"));
    assert!(pages.contains("BANCO RESERVAS"));
}

#[test]
fn process_csv_uses_entry_field_names() {
    let home = tempfile::tempdir().unwrap();
    let input = home.path().join("certificado.pdf");
    let output = home.path().join("entries.csv");
    text_pdf(
        &input,
        &[
            "CERTIFICACION DE ESTADO JURIDICO DEL INMUEBLE",
            "Hipoteca en primer rango a favor de BANCO RESERVAS",
            "por la suma de RD$ 1,500,000.00 segun acto notarial",
        ],
    );

    asientos(home.path())
        .arg("process")
        .arg(&input)
        .args(["--text-only", "-f", "csv", "-o"])
        .arg(&output)
        .assert()
        .success();

    let csv = fs::read_to_string(&output).unwrap();
    assert!(csv.starts_with(
        "inscriptionRecord,originReference,identification,description,isSimilarityMatch\n"
    ));
    assert!(csv.contains("[ID Parcial]"));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("asientos.json");

    asientos(home.path())
        .args(["config", "init", "-o"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    asientos(home.path())
        .args(["config", "init", "-o"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    asientos(home.path())
        .arg("-c")
        .arg(&path)
        .args(["config", "get", "extraction.similarity_threshold"])
        .assert()
        .success()
        .stdout(predicate::str::contains("75"));
}

#[test]
fn doctor_reports_setup() {
    let home = tempfile::tempdir().unwrap();
    let tessdata = home.path().join("tessdata");
    fs::create_dir_all(&tessdata).unwrap();
    fs::write(tessdata.join("spa.traineddata"), b"").unwrap();

    asientos(home.path())
        .arg("doctor")
        .arg("--tessdata")
        .arg(&tessdata)
        .assert()
        .success()
        .stdout(predicate::str::contains("from --tessdata"))
        .stdout(predicate::str::contains("Languages:  spa"));
}

#[test]
fn batch_writes_outputs_and_summary() {
    let home = tempfile::tempdir().unwrap();
    let input_dir = home.path().join("scans");
    let output_dir = home.path().join("out");
    fs::create_dir_all(&input_dir).unwrap();
    image_pdf(&input_dir.join("uno.pdf"));
    image_pdf(&input_dir.join("dos.pdf"));
    fs::write(input_dir.join("roto.pdf"), b"%PDF-1.5 garbage").unwrap();

    let pattern = format!("{}/*.pdf", input_dir.display());
    asientos(home.path())
        .args(["batch", &pattern, "--text-only", "--summary", "--continue-on-error", "-d"])
        .arg(&output_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful, 1 failed"));

    assert!(output_dir.join("uno_asientos.json").exists());
    assert!(output_dir.join("dos_asientos.json").exists());
    assert!(!output_dir.join("roto_asientos.json").exists());

    let summary = fs::read_to_string(output_dir.join("summary.csv")).unwrap();
    assert!(summary.starts_with("filename,status,pages,ocr_pages,entries,target_detected"));
    assert!(summary.contains("roto.pdf,error"));
    // Image-only pages: no entries, flagged as scanned
    assert!(summary.contains("uno.pdf,success,1,0,0,false,true,"));
}
