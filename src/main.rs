// taxforms-pdf: Generate Irish tax-compliance forms as PDF

use clap::Parser;
use log::{info, warn};

use taxforms_pdf::config::{Args, RunConfig};
use taxforms_pdf::output::PdfOutput;
use taxforms_pdf::relay::{RelayClient, RelayRequest};
use taxforms_pdf::signature::SignaturePad;
use taxforms_pdf::{generate_pdf, AppError, BuildOptions, Labels, Validate};

/// Signature surface in CSS pixels, same aspect as the 60×25 mm box
const SIGNATURE_PAD_WIDTH: u32 = 600;
const SIGNATURE_PAD_HEIGHT: u32 = 250;

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let args = Args::parse();
    let mut config = RunConfig::from_args(args)?;
    let form_type = config.form.data.form_type();

    if let Some(bytes) = &config.signature {
        let mut pad = SignaturePad::new(SIGNATURE_PAD_WIDTH, SIGNATURE_PAD_HEIGHT, 1.0);
        pad.load_image(bytes)?;
        let image = pad.accept(config.signature_scale)?;
        info!("Signature {}x{} px", image.width, image.height);
        *config.form.data.signature_mut() = Some(image.to_data_url());
    }

    if config.validate {
        config
            .form
            .data
            .validate()
            .map_err(AppError::ValidationError)?;
    }

    let options = BuildOptions {
        logo: config.logo.as_deref(),
        reference: Some(config.reference.as_str()),
        labels: Labels::english(),
        ..BuildOptions::default()
    };
    let generated = generate_pdf(&config.form.data, &options)?;
    for warning in &generated.warnings {
        warn!("{}", warning);
    }

    let output = PdfOutput::new(form_type, config.date, generated.bytes);
    output.save_as(&config.output)?;

    println!("✓ Generated: {}", config.output.display());
    println!("  Form: {}", form_type.default_title());
    println!("  Pages: {}", generated.page_count);
    println!("  Reference: {}", config.reference);
    if !generated.warnings.is_empty() {
        println!("  Warnings: {}", generated.warnings.len());
    }

    if let Some(relay) = config.relay.take() {
        let submitter = config.form.data.submitter();
        let request = RelayRequest::new(&submitter, &output).with_meta(config.form.meta.take());
        let client = RelayClient::new(relay);

        // The PDF stays on disk whatever the relay says.
        let delivery = client.send(&request);
        let warning = delivery.warning();
        match delivery.primary {
            Ok(admin_email_id) => {
                println!("✓ Sent: admin copy {}", admin_email_id);
                if let Some(message) = warning {
                    println!("  Warning: {}", message);
                }
            }
            Err(e) => {
                if e.is_transient() {
                    eprintln!(
                        "  Relay unavailable, try again later. PDF kept at {}",
                        config.output.display()
                    );
                }
                return Err(AppError::from(e));
            }
        }
    }

    Ok(())
}
