//! Document builders, one per form type.
//!
//! - `mileage` - Mileage logbook (business travel by private vehicle)
//! - `expense` - Expense report
//! - `incorporation` - Company incorporation request
//! - `sepa` - SEPA direct-debit mandate
//! - `card` - Card payment mandate
//!
//! Every builder renders the strings it is given. Totals and percentages are
//! computed by whoever fills the form; builders only format and lay out.

pub mod card;
pub mod common;
pub mod expense;
pub mod incorporation;
pub mod mileage;
pub mod sepa;

use serde::{Deserialize, Serialize};

use crate::layout::{PageGeometry, RenderedDocument};
use crate::validation::{Validate, ValidationErrors};

pub use card::CardMandate;
pub use expense::{ExpenseItem, ExpenseReport};
pub use incorporation::{BeneficialOwner, CompanyIncorporation, Director};
pub use mileage::{MileageLogbook, Trip};
pub use sepa::{PaymentType, SepaMandate};

/// Form types accepted by the email relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormType {
    ExpenseReport,
    MileageLogbook,
    Sepa,
    Card,
    CompanyIncorporation,
}

impl FormType {
    pub const ALL: [FormType; 5] = [
        FormType::ExpenseReport,
        FormType::MileageLogbook,
        FormType::Sepa,
        FormType::Card,
        FormType::CompanyIncorporation,
    ];

    /// Wire name, also the download filename prefix.
    pub fn slug(self) -> &'static str {
        match self {
            FormType::ExpenseReport => "expense-report",
            FormType::MileageLogbook => "mileage-logbook",
            FormType::Sepa => "sepa",
            FormType::Card => "card",
            FormType::CompanyIncorporation => "company-incorporation",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.slug() == slug)
    }

    pub fn default_title(self) -> &'static str {
        match self {
            FormType::ExpenseReport => "Expense Report",
            FormType::MileageLogbook => "Mileage Logbook",
            FormType::Sepa => "SEPA Direct Debit Mandate",
            FormType::Card => "Card Payment Mandate",
            FormType::CompanyIncorporation => "Company Incorporation Request",
        }
    }
}

impl std::fmt::Display for FormType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Form data, one variant per form type.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentData {
    MileageLogbook(MileageLogbook),
    ExpenseReport(ExpenseReport),
    CompanyIncorporation(CompanyIncorporation),
    SepaMandate(SepaMandate),
    CardMandate(CardMandate),
}

/// Who submitted a form, as the email relay needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitter {
    pub name: String,
    pub email: String,
    pub pps: String,
}

impl DocumentData {
    pub fn form_type(&self) -> FormType {
        match self {
            DocumentData::MileageLogbook(_) => FormType::MileageLogbook,
            DocumentData::ExpenseReport(_) => FormType::ExpenseReport,
            DocumentData::CompanyIncorporation(_) => FormType::CompanyIncorporation,
            DocumentData::SepaMandate(_) => FormType::Sepa,
            DocumentData::CardMandate(_) => FormType::Card,
        }
    }

    /// Deserialise the `data` object of an input file for `form`.
    pub fn from_json(form: FormType, data: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match form {
            FormType::MileageLogbook => DocumentData::MileageLogbook(serde_json::from_value(data)?),
            FormType::ExpenseReport => DocumentData::ExpenseReport(serde_json::from_value(data)?),
            FormType::CompanyIncorporation => {
                DocumentData::CompanyIncorporation(serde_json::from_value(data)?)
            }
            FormType::Sepa => DocumentData::SepaMandate(serde_json::from_value(data)?),
            FormType::Card => DocumentData::CardMandate(serde_json::from_value(data)?),
        })
    }

    pub fn submitter(&self) -> Submitter {
        let (name, email, pps) = match self {
            DocumentData::MileageLogbook(d) => (&d.driver_name, &d.email, &d.pps_number),
            DocumentData::ExpenseReport(d) => (&d.employee_name, &d.email, &d.pps_number),
            DocumentData::CompanyIncorporation(d) => {
                (&d.contact_name, &d.contact_email, &d.contact_pps)
            }
            DocumentData::SepaMandate(d) => (&d.debtor_name, &d.debtor_email, &d.pps_number),
            DocumentData::CardMandate(d) => (&d.cardholder_name, &d.email, &d.pps_number),
        };
        Submitter {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            pps: pps.trim().to_string(),
        }
    }

    /// The signature data URI slot of the form.
    pub fn signature_mut(&mut self) -> &mut Option<String> {
        match self {
            DocumentData::MileageLogbook(d) => &mut d.signature,
            DocumentData::ExpenseReport(d) => &mut d.signature,
            DocumentData::CompanyIncorporation(d) => &mut d.signature,
            DocumentData::SepaMandate(d) => &mut d.signature,
            DocumentData::CardMandate(d) => &mut d.signature,
        }
    }
}

impl Validate for DocumentData {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            DocumentData::MileageLogbook(d) => d.validate(),
            DocumentData::ExpenseReport(d) => d.validate(),
            DocumentData::CompanyIncorporation(d) => d.validate(),
            DocumentData::SepaMandate(d) => d.validate(),
            DocumentData::CardMandate(d) => d.validate(),
        }
    }
}

/// Label lookup. Keys without a translation fall back to English.
pub type Translate<'a> = &'a dyn Fn(&str) -> Option<String>;

#[derive(Clone, Copy, Default)]
pub struct Labels<'a> {
    translate: Option<Translate<'a>>,
}

impl<'a> Labels<'a> {
    pub fn english() -> Self {
        Self { translate: None }
    }

    pub fn with(translate: Translate<'a>) -> Self {
        Self {
            translate: Some(translate),
        }
    }

    pub fn get(&self, key: &str, default: &str) -> String {
        self.translate
            .and_then(|t| t(key))
            .unwrap_or_else(|| default.to_string())
    }
}

/// Everything a builder needs besides the form data.
#[derive(Clone, Copy, Default)]
pub struct BuildOptions<'a> {
    /// Encoded PNG/JPEG shown in the header band.
    pub logo: Option<&'a [u8]>,
    /// Submission reference printed under the title.
    pub reference: Option<&'a str>,
    pub labels: Labels<'a>,
    pub geometry: PageGeometry,
}

/// Lay out `data` with the builder for its form type.
pub fn build_document(data: &DocumentData, options: &BuildOptions) -> RenderedDocument {
    match data {
        DocumentData::MileageLogbook(d) => mileage::build(d, options),
        DocumentData::ExpenseReport(d) => expense::build(d, options),
        DocumentData::CompanyIncorporation(d) => incorporation::build(d, options),
        DocumentData::SepaMandate(d) => sepa::build(d, options),
        DocumentData::CardMandate(d) => card::build(d, options),
    }
}
