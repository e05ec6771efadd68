//! Terminal actions on a finished PDF: save it under its download name, or
//! base64-encode it for the email relay.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;

use crate::builders::FormType;

/// A serialised PDF and what it was generated from.
#[derive(Debug, Clone)]
pub struct PdfOutput {
    pub form_type: FormType,
    pub date: NaiveDate,
    pub bytes: Vec<u8>,
}

impl PdfOutput {
    pub fn new(form_type: FormType, date: NaiveDate, bytes: Vec<u8>) -> Self {
        Self {
            form_type,
            date,
            bytes,
        }
    }

    /// `{form-type}-{YYYY-MM-DD}.pdf`
    pub fn filename(&self) -> String {
        download_filename(self.form_type, self.date)
    }

    /// Write the PDF into `dir` under its download name.
    pub fn save_in(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(self.filename());
        self.save_as(&path)?;
        Ok(path)
    }

    pub fn save_as(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, &self.bytes)
    }

    /// Base64 without any data-URI prefix, as the relay expects.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

pub fn download_filename(form_type: FormType, date: NaiveDate) -> String {
    format!("{}-{}.pdf", form_type.slug(), date.format("%Y-%m-%d"))
}

/// Drop a leading `data:<mime>;base64,` if present.
pub fn strip_data_uri_prefix(data: &str) -> &str {
    if data.starts_with("data:") {
        if let Some(idx) = data.find(";base64,") {
            return &data[idx + ";base64,".len()..];
        }
        if let Some(idx) = data.find(',') {
            return &data[idx + 1..];
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_pattern() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(
            download_filename(FormType::MileageLogbook, date),
            "mileage-logbook-2026-03-09.pdf"
        );
        assert_eq!(download_filename(FormType::Sepa, date), "sepa-2026-03-09.pdf");
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_data_uri_prefix("data:application/pdf;base64,JVBE"), "JVBE");
        assert_eq!(strip_data_uri_prefix("JVBE"), "JVBE");
        assert_eq!(strip_data_uri_prefix("data:,abc"), "abc");
    }

    #[test]
    fn test_base64_has_no_prefix() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let out = PdfOutput::new(FormType::Card, date, b"%PDF-1.3".to_vec());
        assert_eq!(out.to_base64(), "JVBERi0xLjM=");
    }

    #[test]
    fn test_save_in_uses_download_name() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let out = PdfOutput::new(FormType::ExpenseReport, date, b"%PDF".to_vec());
        let path = out.save_in(dir.path()).unwrap();
        assert!(path.ends_with("expense-report-2026-05-01.pdf"));
        assert_eq!(fs::read(path).unwrap(), b"%PDF");
    }
}
