//! Lay out Irish tax-compliance forms as paginated A4 PDFs.
//!
//! A form is described by a [`DocumentData`] value. [`generate_pdf`] picks the
//! builder for its form type, lays the document out on a display list and
//! serialises it with `printpdf`. The result can be saved under its download
//! name or posted to the email relay with [`relay::RelayClient`].

pub mod builders;
pub mod config;
pub mod error;
pub mod layout;
pub mod output;
pub mod relay;
pub mod signature;
pub mod table;
pub mod validation;

pub use builders::{build_document, BuildOptions, DocumentData, FormType, Labels};
pub use error::{AppError, RenderWarning};
pub use layout::RenderedDocument;
pub use validation::Validate;

/// A serialised document plus what went wrong along the way.
#[derive(Debug, Clone)]
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub warnings: Vec<RenderWarning>,
}

/// Build and serialise `data`. Rendering defects are reported on the
/// result; only PDF serialisation can fail.
pub fn generate_pdf(data: &DocumentData, options: &BuildOptions) -> Result<GeneratedPdf, AppError> {
    let document = build_document(data, options);
    let bytes = document.to_pdf()?;
    Ok(GeneratedPdf {
        bytes,
        page_count: document.page_count(),
        warnings: document.warnings,
    })
}
