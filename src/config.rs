// taxforms-pdf: command-line configuration

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::Parser;
use serde::Deserialize;
use uuid::Uuid;

use crate::builders::{DocumentData, FormType};
use crate::error::AppError;
use crate::relay::RelayConfig;

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Generate Irish tax-compliance forms as PDF")]
pub struct Args {
    /// Form data file (JSON: {"form": "<type>", "data": {...}})
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output filename (defaults to {form-type}-{date}.pdf in --out-dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for the default output filename
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Logo image (file path or URL) to display in header top-right
    #[arg(long)]
    pub logo: Option<String>,

    /// Signature image (PNG/JPEG) to place in the signature box
    #[arg(long)]
    pub signature: Option<PathBuf>,

    /// Date used in the filename (YYYY-MM-DD format, defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,

    /// Reference printed under the title (defaults to a generated id)
    #[arg(long)]
    pub reference: Option<String>,

    /// Skip form data validation
    #[arg(long)]
    pub no_validate: bool,

    /// Post the PDF to the email relay after saving it
    #[arg(long)]
    pub send: bool,

    /// Email relay endpoint
    #[arg(long, env = "TAXFORMS_RELAY_URL")]
    pub relay_url: Option<String>,

    /// Email relay timeout in seconds
    #[arg(long, env = "TAXFORMS_RELAY_TIMEOUT", default_value = "30")]
    pub timeout_secs: u64,

    /// Signature export scale factor
    #[arg(long, default_value = "1.0")]
    pub scale: f32,
}

/// Input file layout.
#[derive(Debug, Deserialize)]
struct InputFile {
    form: FormType,
    data: serde_json::Value,
    #[serde(default)]
    meta: Option<serde_json::Value>,
}

/// Form data as read from the input file.
#[derive(Debug, Clone)]
pub struct FormInput {
    pub data: DocumentData,
    /// Passed through to the relay untouched
    pub meta: Option<serde_json::Value>,
}

/// Everything a run needs, resolved from [`Args`].
pub struct RunConfig {
    pub form: FormInput,
    pub output: PathBuf,
    pub date: NaiveDate,
    pub reference: String,
    pub logo: Option<Vec<u8>>,
    pub signature: Option<Vec<u8>>,
    pub signature_scale: f32,
    pub validate: bool,
    /// Set when the PDF should be sent
    pub relay: Option<RelayConfig>,
}

impl RunConfig {
    pub fn from_args(args: Args) -> Result<Self, AppError> {
        let date = parse_date(&args.date)?;
        let form = load_form(&args.input)?;
        let logo = load_logo(&args.logo)?;
        let signature = match &args.signature {
            Some(path) => Some(
                std::fs::read(path)
                    .map_err(|e| AppError::ImageError(format!("{}: {}", path.display(), e)))?,
            ),
            None => None,
        };

        let relay = if args.send {
            let endpoint = args.relay_url.clone().ok_or_else(|| {
                AppError::InputError("--send needs --relay-url or TAXFORMS_RELAY_URL".to_string())
            })?;
            Some(RelayConfig::new(endpoint).with_timeout(Duration::from_secs(args.timeout_secs)))
        } else {
            None
        };

        if !(args.scale.is_finite() && args.scale > 0.0) {
            return Err(AppError::InputError(format!("Invalid --scale: {}", args.scale)));
        }

        let output = args.output.unwrap_or_else(|| {
            args.out_dir
                .join(crate::output::download_filename(form.data.form_type(), date))
        });

        Ok(Self {
            form,
            output,
            date,
            reference: args.reference.unwrap_or_else(generate_short_id),
            logo,
            signature,
            signature_scale: args.scale,
            validate: !args.no_validate,
            relay,
        })
    }
}

pub fn parse_date(date_str: &Option<String>) -> Result<NaiveDate, AppError> {
    match date_str {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| AppError::DateError(s.clone())),
        None => Ok(Local::now().date_naive()),
    }
}

pub fn generate_short_id() -> String {
    let uuid = Uuid::new_v4();
    let hex = format!("{:x}", uuid);
    hex[..8].to_uppercase()
}

/// Parse an input file's contents.
pub fn parse_form(content: &str) -> Result<FormInput, AppError> {
    let input: InputFile = serde_json::from_str(content)
        .map_err(|e| AppError::InputError(format!("Invalid JSON: {}", e)))?;
    let data = DocumentData::from_json(input.form, input.data)
        .map_err(|e| AppError::InputError(format!("Invalid {} data: {}", input.form, e)))?;
    Ok(FormInput {
        data,
        meta: input.meta,
    })
}

fn load_form(path: &Path) -> Result<FormInput, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::InputError(format!("{}: {}", path.display(), e)))?;
    parse_form(&content)
}

/// Raw logo bytes. Decoding happens at render time, where a bad image is
/// only a warning.
fn load_logo(path: &Option<String>) -> Result<Option<Vec<u8>>, AppError> {
    match path {
        Some(p) => {
            let bytes = if p.starts_with("http://") || p.starts_with("https://") {
                let response = ureq::get(p)
                    .call()
                    .map_err(|e| AppError::ImageError(format!("Failed to fetch URL: {}", e)))?;

                let mut bytes = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut bytes)
                    .map_err(|e| AppError::ImageError(format!("Failed to read response: {}", e)))?;
                bytes
            } else {
                std::fs::read(p).map_err(|e| AppError::ImageError(format!("{}: {}", p, e)))?
            };
            Ok(Some(bytes))
        }
        None => Ok(None),
    }
}
