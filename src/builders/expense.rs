//! Expense report: itemised claims with VAT.

use serde::{Deserialize, Serialize};

use super::common::{
    all_blank, begin_section, declaration, estimate_rows, field_table, format_euro, note,
    signature_block, start_document, table_section,
};
use super::BuildOptions;
use crate::layout::RenderedDocument;
use crate::table::{CellMatrix, ColumnWidth, TableStyle};
use crate::validation::{
    validate_email, validate_pps, validate_required, Validate, ValidationError, ValidationErrors,
};

const DEFAULT_DECLARATION: &str = "I certify that the expenses claimed above were incurred \
by me in the course of my employment, that receipts are held for each item, and that no \
part of this claim has been reimbursed from any other source.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseItem {
    pub date: String,
    pub category: String,
    pub description: String,
    pub vat: String,
    pub amount: String,
}

impl ExpenseItem {
    pub fn is_empty(&self) -> bool {
        all_blank(&[&self.date, &self.description, &self.amount])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseReport {
    pub employee_name: String,
    pub email: String,
    pub pps_number: String,
    pub employer: String,
    pub department: String,
    pub period_start: String,
    pub period_end: String,
    pub items: Vec<ExpenseItem>,
    /// Pre-computed by the form
    pub total_vat: String,
    /// Pre-computed by the form
    pub total_amount: String,
    pub notes: String,
    pub declaration_accepted: bool,
    pub signature: Option<String>,
    pub signature_date: String,
}

impl ExpenseReport {
    pub fn populated_items(&self) -> impl Iterator<Item = &ExpenseItem> {
        self.items.iter().filter(|i| !i.is_empty())
    }
}

impl Validate for ExpenseReport {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_required(&self.employee_name, "employee_name", "Employee name", &mut errors);
        validate_email(&self.email, "email", &mut errors);
        validate_pps(&self.pps_number, "pps_number", &mut errors);
        validate_required(&self.total_amount, "total_amount", "Total claimed", &mut errors);
        if self.populated_items().next().is_none() {
            errors.add(ValidationError::new("items", "At least one expense is required"));
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.is_empty() {
                continue;
            }
            validate_required(&item.date, &format!("items[{i}].date"), "Expense date", &mut errors);
            validate_required(&item.amount, &format!("items[{i}].amount"), "Amount", &mut errors);
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

pub fn build(data: &ExpenseReport, options: &BuildOptions) -> RenderedDocument {
    let labels = &options.labels;
    let title = labels.get("expense.title", "Expense Report");
    let subtitle = labels.get("expense.subtitle", "Claim for business expenses");
    let mut ctx = start_document(&title, &subtitle, options);

    let period = match (data.period_start.trim(), data.period_end.trim()) {
        ("", "") => String::new(),
        (start, "") => start.to_string(),
        ("", end) => end.to_string(),
        (start, end) => format!("{} – {}", start, end),
    };

    field_table(
        &mut ctx,
        &labels.get("expense.employee", "Employee"),
        vec![
            (labels.get("expense.employee_name", "Name"), data.employee_name.clone()),
            (labels.get("common.email", "Email"), data.email.clone()),
            (labels.get("common.pps", "PPS number"), data.pps_number.clone()),
            (labels.get("expense.employer", "Employer"), data.employer.clone()),
            (labels.get("expense.department", "Department"), data.department.clone()),
            (labels.get("expense.period", "Claim period"), period),
        ],
    );

    let rows: Vec<Vec<String>> = data
        .populated_items()
        .map(|item| {
            vec![
                item.date.trim().to_string(),
                item.category.trim().to_string(),
                item.description.trim().to_string(),
                format_euro(&item.vat),
                format_euro(&item.amount),
            ]
        })
        .collect();

    let heading = labels.get("expense.items", "Expenses");
    if rows.is_empty() {
        begin_section(&mut ctx, &heading, estimate_rows(1));
        note(&mut ctx, &labels.get("expense.no_items", "No expenses recorded."));
    } else {
        begin_section(&mut ctx, &heading, estimate_rows(2));
        let matrix = CellMatrix::new(rows)
            .with_header([
                labels.get("expense.item_date", "Date"),
                labels.get("expense.item_category", "Category"),
                labels.get("expense.item_description", "Description"),
                labels.get("expense.item_vat", "VAT"),
                labels.get("expense.item_amount", "Amount"),
            ])
            .with_widths(vec![
                ColumnWidth::Absolute(24.0),
                ColumnWidth::Absolute(30.0),
                ColumnWidth::Proportional(1.0),
                ColumnWidth::Absolute(22.0),
                ColumnWidth::Absolute(26.0),
            ]);
        table_section(&mut ctx, &matrix, &TableStyle::default());
    }

    field_table(
        &mut ctx,
        &labels.get("expense.totals", "Totals"),
        vec![
            (labels.get("expense.total_vat", "Total VAT"), format_euro(&data.total_vat)),
            (labels.get("expense.total_amount", "Total claimed"), format_euro(&data.total_amount)),
        ],
    );

    if !data.notes.trim().is_empty() {
        super::common::text_section(&mut ctx, &labels.get("expense.notes", "Notes"), &data.notes);
    }

    declaration(
        &mut ctx,
        labels,
        &labels.get("expense.declaration", DEFAULT_DECLARATION),
        data.declaration_accepted,
    );

    signature_block(
        &mut ctx,
        labels,
        data.signature.as_deref(),
        &data.employee_name,
        &data.signature_date,
        None,
    );

    ctx.stamp_page_numbers();
    ctx.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(date: &str, description: &str, amount: &str) -> ExpenseItem {
        ExpenseItem {
            date: date.into(),
            category: "Travel".into(),
            description: description.into(),
            vat: String::new(),
            amount: amount.into(),
        }
    }

    #[test]
    fn test_amounts_are_formatted_not_summed() {
        let data = ExpenseReport {
            employee_name: "Seán Ó Briain".into(),
            items: vec![
                item("2026-02-01", "Train to Galway", "34.5"),
                item("", "", ""),
                item("2026-02-02", "Hotel", "120"),
            ],
            total_amount: "999".into(),
            ..Default::default()
        };
        let doc = build(&data, &BuildOptions::default());
        assert!(doc.contains_text("€34.50"));
        assert!(doc.contains_text("€120.00"));
        // the builder trusts the given total
        assert!(doc.contains_text("€999.00"));
        assert!(doc.contains_text("Seán Ó Briain"));
    }

    #[test]
    fn test_item_blankness() {
        assert!(item("", " ", "").is_empty());
        assert!(!item("", "", "5").is_empty());
    }

    #[test]
    fn test_validate_needs_an_item() {
        let errors = ExpenseReport::default().validate().unwrap_err();
        assert!(errors.has_field("items"));
        assert!(errors.has_field("employee_name"));
    }
}
