//! Company incorporation request: company particulars, directors and
//! beneficial owners.

use serde::{Deserialize, Serialize};

use super::common::{
    begin_section, declaration, estimate_rows, field_table, is_blank, note, signature_block,
    start_document, table_section, with_suffix,
};
use super::BuildOptions;
use crate::layout::RenderedDocument;
use crate::table::{CellMatrix, ColumnWidth, TableStyle};
use crate::validation::{
    validate_email, validate_pps_optional, validate_required, Validate, ValidationError,
    ValidationErrors,
};

const DEFAULT_DECLARATION: &str = "I confirm that the information provided in this request \
is true and complete, that each director named has consented to act, and that the beneficial \
ownership details will be filed with the Register of Beneficial Ownership.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Director {
    pub name: String,
    pub date_of_birth: String,
    pub nationality: String,
    pub address: String,
    pub occupation: String,
    pub pps_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeneficialOwner {
    pub name: String,
    pub nationality: String,
    pub address: String,
    pub ownership_percent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyIncorporation {
    pub proposed_name: String,
    pub alternative_name: String,
    pub company_type: String,
    pub registered_office: String,
    pub principal_activity: String,
    pub nace_code: String,
    pub share_capital: String,
    pub secretary_name: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub contact_pps: String,
    pub directors: Vec<Director>,
    pub beneficial_owners: Vec<BeneficialOwner>,
    pub declaration_accepted: bool,
    pub signature: Option<String>,
    pub signature_date: String,
}

impl CompanyIncorporation {
    pub fn named_directors(&self) -> impl Iterator<Item = &Director> {
        self.directors.iter().filter(|d| !is_blank(&d.name))
    }

    pub fn named_owners(&self) -> impl Iterator<Item = &BeneficialOwner> {
        self.beneficial_owners.iter().filter(|o| !is_blank(&o.name))
    }
}

impl Validate for CompanyIncorporation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_required(
            &self.proposed_name,
            "proposed_name",
            "Proposed company name",
            &mut errors,
        );
        validate_required(
            &self.registered_office,
            "registered_office",
            "Registered office",
            &mut errors,
        );
        validate_required(
            &self.principal_activity,
            "principal_activity",
            "Principal activity",
            &mut errors,
        );
        validate_required(&self.contact_name, "contact_name", "Contact name", &mut errors);
        validate_email(&self.contact_email, "contact_email", &mut errors);
        validate_pps_optional(&self.contact_pps, "contact_pps", &mut errors);

        if self.named_directors().next().is_none() {
            errors.add(ValidationError::new("directors", "At least one director is required"));
        }
        for (i, director) in self.directors.iter().enumerate() {
            if is_blank(&director.name) {
                continue;
            }
            validate_required(
                &director.address,
                &format!("directors[{i}].address"),
                "Director address",
                &mut errors,
            );
            let field = format!("directors[{i}].pps_number");
            validate_pps_optional(&director.pps_number, &field, &mut errors);
        }
        if !self.declaration_accepted {
            errors.add(ValidationError::new(
                "declaration_accepted",
                "The declaration must be accepted",
            ));
        }
        errors.into_result()
    }
}

pub fn build(data: &CompanyIncorporation, options: &BuildOptions) -> RenderedDocument {
    let labels = &options.labels;
    let title = labels.get("incorporation.title", "Company Incorporation Request");
    let subtitle = labels.get(
        "incorporation.subtitle",
        "Particulars for registration with the CRO",
    );
    let mut ctx = start_document(&title, &subtitle, options);

    field_table(
        &mut ctx,
        &labels.get("incorporation.company", "Company"),
        vec![
            (
                labels.get("incorporation.proposed_name", "Proposed name"),
                data.proposed_name.clone(),
            ),
            (
                labels.get("incorporation.alternative_name", "Alternative name"),
                data.alternative_name.clone(),
            ),
            (labels.get("incorporation.company_type", "Company type"), data.company_type.clone()),
            (
                labels.get("incorporation.registered_office", "Registered office"),
                data.registered_office.clone(),
            ),
            (
                labels.get("incorporation.principal_activity", "Principal activity"),
                data.principal_activity.clone(),
            ),
            (labels.get("incorporation.nace_code", "NACE code"), data.nace_code.clone()),
            (
                labels.get("incorporation.share_capital", "Share capital"),
                data.share_capital.clone(),
            ),
            (
                labels.get("incorporation.secretary", "Company secretary"),
                data.secretary_name.clone(),
            ),
        ],
    );

    field_table(
        &mut ctx,
        &labels.get("incorporation.contact", "Contact"),
        vec![
            (labels.get("incorporation.contact_name", "Name"), data.contact_name.clone()),
            (labels.get("common.email", "Email"), data.contact_email.clone()),
            (labels.get("incorporation.contact_phone", "Phone"), data.contact_phone.clone()),
            (labels.get("common.pps", "PPS number"), data.contact_pps.clone()),
        ],
    );

    let directors: Vec<&Director> = data.named_directors().collect();
    if directors.is_empty() {
        let heading = labels.get("incorporation.directors", "Directors");
        begin_section(&mut ctx, &heading, estimate_rows(1));
        note(&mut ctx, &labels.get("incorporation.no_directors", "No directors listed."));
    }
    let director_label = labels.get("incorporation.director", "Director");
    for (i, director) in directors.iter().enumerate() {
        // field_table reserves the whole block, so a director never splits across pages.
        field_table(
            &mut ctx,
            &format!("{} {}", director_label, i + 1),
            vec![
                (labels.get("incorporation.director_name", "Name"), director.name.clone()),
                (
                    labels.get("incorporation.date_of_birth", "Date of birth"),
                    director.date_of_birth.clone(),
                ),
                (
                    labels.get("incorporation.nationality", "Nationality"),
                    director.nationality.clone(),
                ),
                (labels.get("incorporation.address", "Address"), director.address.clone()),
                (labels.get("incorporation.occupation", "Occupation"), director.occupation.clone()),
                (labels.get("common.pps", "PPS number"), director.pps_number.clone()),
            ],
        );
    }

    let owners: Vec<Vec<String>> = data
        .named_owners()
        .map(|o| {
            vec![
                o.name.trim().to_string(),
                o.nationality.trim().to_string(),
                o.address.trim().to_string(),
                with_suffix(&o.ownership_percent, "%"),
            ]
        })
        .collect();
    let owners_heading = labels.get("incorporation.owners", "Beneficial owners");
    if owners.is_empty() {
        begin_section(&mut ctx, &owners_heading, estimate_rows(1));
        note(&mut ctx, &labels.get("incorporation.no_owners", "No beneficial owners listed."));
    } else {
        begin_section(&mut ctx, &owners_heading, estimate_rows(2));
        let matrix = CellMatrix::new(owners)
            .with_header([
                labels.get("incorporation.owner_name", "Name"),
                labels.get("incorporation.nationality", "Nationality"),
                labels.get("incorporation.address", "Address"),
                labels.get("incorporation.ownership", "Ownership"),
            ])
            .with_widths(vec![
                ColumnWidth::Proportional(1.0),
                ColumnWidth::Absolute(28.0),
                ColumnWidth::Proportional(1.4),
                ColumnWidth::Absolute(24.0),
            ]);
        table_section(&mut ctx, &matrix, &TableStyle::default());
    }

    declaration(
        &mut ctx,
        labels,
        &labels.get("incorporation.declaration", DEFAULT_DECLARATION),
        data.declaration_accepted,
    );

    signature_block(
        &mut ctx,
        labels,
        data.signature.as_deref(),
        &data.contact_name,
        &data.signature_date,
        None,
    );

    ctx.stamp_page_numbers();
    ctx.finish()
}
