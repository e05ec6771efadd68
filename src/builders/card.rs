//! Card payment mandate: standing authority to charge a debit or credit card.

use serde::{Deserialize, Serialize};

use super::common::{declaration, field_table, format_euro, signature_block, start_document};
use super::BuildOptions;
use crate::layout::RenderedDocument;
use crate::validation::{
    validate_card_expiry, validate_card_number, validate_email, validate_pps_optional,
    validate_required, Validate, ValidationError, ValidationErrors,
};

const DEFAULT_AUTHORISATION: &str = "I authorise the merchant named above to charge the card \
described in this mandate for the amount and at the frequency shown, until I withdraw this \
authority in writing. I confirm that I am the cardholder or am authorised to use this card.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardMandate {
    pub merchant_name: String,
    pub cardholder_name: String,
    pub email: String,
    pub pps_number: String,
    pub billing_address: String,
    pub card_type: String,
    pub card_number: String,
    pub expiry: String,
    pub amount: String,
    pub frequency: String,
    pub start_date: String,
    pub authorisation_accepted: bool,
    pub signature: Option<String>,
    pub signature_date: String,
}

impl Validate for CardMandate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_required(&self.cardholder_name, "cardholder_name", "Cardholder name", &mut errors);
        validate_email(&self.email, "email", &mut errors);
        validate_pps_optional(&self.pps_number, "pps_number", &mut errors);
        validate_required(&self.billing_address, "billing_address", "Billing address", &mut errors);
        validate_card_number(&self.card_number, "card_number", &mut errors);
        validate_card_expiry(&self.expiry, "expiry", &mut errors);
        validate_required(&self.amount, "amount", "Amount", &mut errors);
        if !self.authorisation_accepted {
            errors.add(ValidationError::new(
                "authorisation_accepted",
                "The authorisation must be accepted",
            ));
        }
        errors.into_result()
    }
}

/// Only the last four digits of a card number ever reach the document.
///
/// `"4111 1111 1111 1111"` → `"**** **** **** 1111"`
pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return String::new();
    }
    let keep = digits.len().min(4);
    let last: String = digits[digits.len() - keep..].iter().collect();
    format!("**** **** **** {}", last)
}

pub fn build(data: &CardMandate, options: &BuildOptions) -> RenderedDocument {
    let labels = &options.labels;
    let title = labels.get("card.title", "Card Payment Mandate");
    let subtitle = labels.get("card.subtitle", "Recurring card payment authority");
    let mut ctx = start_document(&title, &subtitle, options);

    field_table(
        &mut ctx,
        &labels.get("card.cardholder", "Cardholder"),
        vec![
            (labels.get("card.cardholder_name", "Name"), data.cardholder_name.clone()),
            (labels.get("common.email", "Email"), data.email.clone()),
            (labels.get("common.pps", "PPS number"), data.pps_number.clone()),
            (labels.get("card.billing_address", "Billing address"), data.billing_address.clone()),
        ],
    );

    field_table(
        &mut ctx,
        &labels.get("card.card", "Card"),
        vec![
            (labels.get("card.card_type", "Card type"), data.card_type.clone()),
            (labels.get("card.card_number", "Card number"), mask_card_number(&data.card_number)),
            (labels.get("card.expiry", "Expiry"), data.expiry.clone()),
        ],
    );

    field_table(
        &mut ctx,
        &labels.get("card.payment", "Payment"),
        vec![
            (labels.get("card.merchant", "Merchant"), data.merchant_name.clone()),
            (labels.get("card.amount", "Amount"), format_euro(&data.amount)),
            (labels.get("card.frequency", "Frequency"), data.frequency.clone()),
            (labels.get("card.start_date", "First payment"), data.start_date.clone()),
        ],
    );

    declaration(
        &mut ctx,
        labels,
        &labels.get("card.authorisation", DEFAULT_AUTHORISATION),
        data.authorisation_accepted,
    );

    signature_block(
        &mut ctx,
        labels,
        data.signature.as_deref(),
        &data.cardholder_name,
        &data.signature_date,
        None,
    );

    ctx.stamp_page_numbers();
    ctx.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mandate() -> CardMandate {
        CardMandate {
            merchant_name: "Acme Accountants Ltd".into(),
            cardholder_name: "Jane Doe".into(),
            email: "jane@example.ie".into(),
            billing_address: "1 Main Street, Cork".into(),
            card_type: "Visa".into(),
            card_number: "4111 1111 1111 1111".into(),
            expiry: "09/28".into(),
            amount: "49.5".into(),
            frequency: "Monthly".into(),
            authorisation_accepted: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_mask_card_number() {
        assert_eq!(mask_card_number("4111 1111 1111 1234"), "**** **** **** 1234");
        assert_eq!(mask_card_number("4111-1111-1111-1234"), "**** **** **** 1234");
        assert_eq!(mask_card_number("12"), "**** **** **** 12");
        assert_eq!(mask_card_number(""), "");
    }

    #[test]
    fn test_full_card_number_never_rendered() {
        let doc = build(&mandate(), &BuildOptions::default());
        assert!(doc.contains_text("**** **** **** 1111"));
        assert!(!doc.all_texts().iter().any(|t| t.contains("4111")));
        assert!(doc.contains_text("€49.50"));
    }

    #[test]
    fn test_validate_ok() {
        assert!(mandate().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_card() {
        let data = CardMandate {
            card_number: "4111 1111 1111 1112".into(),
            expiry: "13/28".into(),
            ..mandate()
        };
        let errors = data.validate().unwrap_err();
        assert!(errors.has_field("card_number"));
        assert!(errors.has_field("expiry"));
        assert_eq!(errors.len(), 2);
    }
}
