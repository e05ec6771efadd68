use std::fs;
use std::path::Path;
use std::process::Command;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_taxforms-pdf"));
    cmd.env_remove("TAXFORMS_RELAY_URL").env_remove("TAXFORMS_RELAY_TIMEOUT");
    cmd
}

fn output_dir() -> &'static Path {
    Path::new("tests/output")
}

fn setup() {
    fs::create_dir_all(output_dir()).expect("Failed to create output directory");
}

fn cleanup_file(name: &str) {
    let path = output_dir().join(name);
    if path.exists() {
        fs::remove_file(&path).ok();
    }
}

fn assert_pdf(path: &Path) {
    assert!(path.exists(), "PDF file was not created");
    let bytes = fs::read(path).expect("Failed to read PDF");
    assert!(bytes.starts_with(b"%PDF"), "Output is not a PDF");
    assert!(bytes.len() > 1000, "PDF file is too small, likely empty or corrupt");
}

fn generate_fixture(fixture: &str, output_file: &str) {
    setup();
    cleanup_file(output_file);

    let output = cargo_bin()
        .args([
            "-i", &format!("tests/fixtures/{}", fixture),
            "-o", &format!("tests/output/{}", output_file),
            "--reference", "TEST0001",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&output_dir().join(output_file));
}

#[test]
fn test_mileage_logbook() {
    generate_fixture("mileage-logbook.json", "test-mileage-logbook.pdf");
}

#[test]
fn test_expense_report() {
    generate_fixture("expense-report.json", "test-expense-report.pdf");
}

#[test]
fn test_company_incorporation() {
    generate_fixture("company-incorporation.json", "test-company-incorporation.pdf");
}

#[test]
fn test_sepa_mandate() {
    generate_fixture("sepa.json", "test-sepa.pdf");
}

#[test]
fn test_card_mandate() {
    generate_fixture("card.json", "test-card.pdf");
}

#[test]
fn test_default_filename_uses_date() {
    setup();
    let dir = output_dir().join("default-name");
    fs::create_dir_all(&dir).expect("Failed to create output directory");
    let expected = dir.join("sepa-2025-12-25.pdf");
    if expected.exists() {
        fs::remove_file(&expected).ok();
    }

    let output = cargo_bin()
        .args([
            "-i", "tests/fixtures/sepa.json",
            "--out-dir", dir.to_str().unwrap(),
            "-d", "2025-12-25",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&expected);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sepa-2025-12-25.pdf"), "unexpected output: {}", stdout);
}

fn write_signature(name: &str) -> std::path::PathBuf {
    setup();
    let signature = output_dir().join(name);
    let img = image::RgbaImage::from_fn(200, 60, |x, y| {
        if (y as i32 - 30).abs() < 3 && x > 10 && x < 190 {
            image::Rgba([0, 0, 0, 255])
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    });
    img.save(&signature).expect("Failed to write signature image");
    signature
}

#[test]
fn test_with_signature_image() {
    let signature = write_signature("signature-input.png");

    let output_file = "test-signed-card.pdf";
    cleanup_file(output_file);

    let output = cargo_bin()
        .args([
            "-i", "tests/fixtures/card.json",
            "--signature", signature.to_str().unwrap(),
            "--scale", "2",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&output_dir().join(output_file));
}

#[test]
fn test_huge_signature_scale_fails_cleanly() {
    let signature = write_signature("signature-huge.png");
    let output_file = "test-huge-signature.pdf";
    cleanup_file(output_file);

    let output = cargo_bin()
        .args([
            "-i", "tests/fixtures/card.json",
            "--signature", signature.to_str().unwrap(),
            "--scale", "1e9",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should have refused the export size");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("export size"), "unexpected error output: {}", stderr);
    assert!(!output_dir().join(output_file).exists());
}

#[test]
fn test_missing_logo_file() {
    let output = cargo_bin()
        .args([
            "-i", "tests/fixtures/sepa.json",
            "--logo", "nonexistent.png",
            "-o", "tests/output/should-not-exist.pdf",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should have failed for missing logo");
}

#[test]
fn test_invalid_input_file() {
    let output = cargo_bin()
        .args(["-i", "nonexistent.json", "-o", "tests/output/should-not-exist.pdf"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should have failed for missing input");
}

#[test]
fn test_invalid_date_format() {
    let output = cargo_bin()
        .args([
            "-i", "tests/fixtures/sepa.json",
            "-d", "not-a-date",
            "-o", "tests/output/should-not-exist.pdf",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should have failed for invalid date");
}

#[test]
fn test_invalid_iban_rejected() {
    setup();
    let fixture = fs::read_to_string("tests/fixtures/sepa.json").expect("Failed to read fixture");
    let broken = fixture.replace("IE29AIBK93115212345678", "IE29AIBK93115212345679");
    let input = output_dir().join("bad-iban.json");
    fs::write(&input, broken).expect("Failed to write input");

    let output_file = "test-bad-iban.pdf";
    cleanup_file(output_file);

    let output = cargo_bin()
        .args([
            "-i", input.to_str().unwrap(),
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should have failed validation");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("iban"), "unexpected error output: {}", stderr);
    assert!(!output_dir().join(output_file).exists());

    // The same data renders when validation is skipped.
    let output = cargo_bin()
        .args([
            "-i", input.to_str().unwrap(),
            "--no-validate",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(&output_dir().join(output_file));
}

#[test]
fn test_send_without_relay_url() {
    let output = cargo_bin()
        .args([
            "-i", "tests/fixtures/card.json",
            "--send",
            "-o", "tests/output/should-not-exist.pdf",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should have failed without a relay URL");
}

#[test]
fn test_unreachable_relay_keeps_pdf() {
    setup();
    let output_file = "test-unsent-card.pdf";
    cleanup_file(output_file);

    let output = cargo_bin()
        .args([
            "-i", "tests/fixtures/card.json",
            "--send",
            "--relay-url", "http://127.0.0.1:9/send",
            "--timeout-secs", "2",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should report the relay failure");
    assert_pdf(&output_dir().join(output_file));
}
