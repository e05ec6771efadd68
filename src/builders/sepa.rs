//! SEPA Core direct-debit mandate.

use serde::{Deserialize, Serialize};

use super::common::{field_table, signature_block, start_document, text_section};
use super::BuildOptions;
use crate::layout::RenderedDocument;
use crate::validation::{
    validate_bic_optional, validate_email, validate_iban, validate_pps_optional,
    validate_required, Validate, ValidationErrors,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentType {
    #[default]
    Recurrent,
    OneOff,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SepaMandate {
    pub mandate_reference: String,
    pub creditor_name: String,
    pub creditor_identifier: String,
    pub creditor_address: String,
    pub debtor_name: String,
    pub debtor_email: String,
    pub debtor_address: String,
    pub pps_number: String,
    pub iban: String,
    pub bic: String,
    pub payment_type: PaymentType,
    pub signature: Option<String>,
    pub signature_place: String,
    pub signature_date: String,
}

impl Validate for SepaMandate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_required(&self.creditor_name, "creditor_name", "Creditor name", &mut errors);
        validate_required(
            &self.creditor_identifier,
            "creditor_identifier",
            "Creditor identifier",
            &mut errors,
        );
        validate_required(&self.debtor_name, "debtor_name", "Account holder name", &mut errors);
        validate_email(&self.debtor_email, "debtor_email", &mut errors);
        validate_required(
            &self.debtor_address,
            "debtor_address",
            "Account holder address",
            &mut errors,
        );
        validate_pps_optional(&self.pps_number, "pps_number", &mut errors);
        validate_iban(&self.iban, "iban", &mut errors);
        validate_bic_optional(&self.bic, "bic", &mut errors);
        errors.into_result()
    }
}

/// `"ie29aibk93115212345678"` → `"IE29 AIBK 9311 5212 3456 78"`
pub fn group_iban(iban: &str) -> String {
    let compact: Vec<char> = iban
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    compact
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

fn authorisation_text(creditor: &str) -> String {
    let creditor = if creditor.trim().is_empty() {
        "the creditor"
    } else {
        creditor.trim()
    };
    format!(
        "By signing this mandate form, you authorise (A) {creditor} to send instructions to your \
         bank to debit your account and (B) your bank to debit your account in accordance with \
         the instructions from {creditor}. As part of your rights, you are entitled to a refund \
         from your bank under the terms and conditions of your agreement with your bank. A refund \
         must be claimed within 8 weeks starting from the date on which your account was debited. \
         Your rights are explained in a statement that you can obtain from your bank."
    )
}

pub fn build(data: &SepaMandate, options: &BuildOptions) -> RenderedDocument {
    let labels = &options.labels;
    let title = labels.get("sepa.title", "SEPA Direct Debit Mandate");
    let subtitle = labels.get("sepa.subtitle", "SEPA Core Direct Debit Scheme");
    let mut ctx = start_document(&title, &subtitle, options);

    field_table(
        &mut ctx,
        &labels.get("sepa.mandate", "Mandate"),
        vec![
            (
                labels.get("sepa.mandate_reference", "Mandate reference"),
                data.mandate_reference.clone(),
            ),
            (
                labels.get("sepa.payment_type", "Type of payment"),
                match data.payment_type {
                    PaymentType::Recurrent => labels.get("sepa.recurrent", "Recurrent"),
                    PaymentType::OneOff => labels.get("sepa.one_off", "One-off"),
                },
            ),
        ],
    );

    field_table(
        &mut ctx,
        &labels.get("sepa.creditor", "Creditor"),
        vec![
            (labels.get("sepa.creditor_name", "Name"), data.creditor_name.clone()),
            (
                labels.get("sepa.creditor_identifier", "Creditor identifier"),
                data.creditor_identifier.clone(),
            ),
            (labels.get("sepa.creditor_address", "Address"), data.creditor_address.clone()),
        ],
    );

    field_table(
        &mut ctx,
        &labels.get("sepa.debtor", "Account holder"),
        vec![
            (labels.get("sepa.debtor_name", "Name"), data.debtor_name.clone()),
            (labels.get("sepa.debtor_address", "Address"), data.debtor_address.clone()),
            (labels.get("common.email", "Email"), data.debtor_email.clone()),
            (labels.get("common.pps", "PPS number"), data.pps_number.clone()),
            (labels.get("sepa.iban", "IBAN"), group_iban(&data.iban)),
            (labels.get("sepa.bic", "BIC"), data.bic.trim().to_ascii_uppercase()),
        ],
    );

    // Translations carry a `{creditor}` placeholder.
    let authorisation = labels
        .get("sepa.authorisation_text", &authorisation_text(&data.creditor_name))
        .replace("{creditor}", data.creditor_name.trim());
    text_section(
        &mut ctx,
        &labels.get("sepa.authorisation", "Authorisation"),
        &authorisation,
    );

    signature_block(
        &mut ctx,
        labels,
        data.signature.as_deref(),
        &data.debtor_name,
        &data.signature_date,
        Some(&data.signature_place),
    );

    ctx.stamp_page_numbers();
    ctx.finish()
}
