//! Mileage logbook: business trips made in a private vehicle.

use serde::{Deserialize, Serialize};

use super::common::{
    all_blank, begin_section, declaration, estimate_rows, field_table, note, signature_block,
    start_document, table_section, with_suffix,
};
use super::BuildOptions;
use crate::layout::RenderedDocument;
use crate::table::{CellMatrix, ColumnWidth, TableStyle};
use crate::validation::{
    validate_email, validate_pps, validate_required, Validate, ValidationErrors,
};

const DEFAULT_DECLARATION: &str = "I declare that the journeys listed above were undertaken \
wholly, exclusively and necessarily in the performance of my duties, and that the distances \
recorded are accurate to the best of my knowledge.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trip {
    pub date: String,
    pub from: String,
    pub to: String,
    pub purpose: String,
    pub business_km: String,
}

impl Trip {
    /// A trip with no date, origin or destination is an unused form row.
    pub fn is_empty(&self) -> bool {
        all_blank(&[&self.date, &self.from, &self.to])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MileageLogbook {
    pub driver_name: String,
    pub email: String,
    pub pps_number: String,
    pub tax_year: String,
    pub employer: String,
    pub vehicle_registration: String,
    pub vehicle_make_model: String,
    pub engine_cc: String,
    pub odometer_start: String,
    pub odometer_end: String,
    pub trips: Vec<Trip>,
    /// Total km driven in the period, business and private
    pub total_km_all: String,
    /// Sum of the populated trips' business km, computed by the form
    pub business_km: String,
    /// business_km / total_km_all × 100, computed by the form
    pub business_percent: String,
    pub declaration_accepted: bool,
    pub signature: Option<String>,
    pub signature_date: String,
}

impl MileageLogbook {
    pub fn populated_trips(&self) -> impl Iterator<Item = &Trip> {
        self.trips.iter().filter(|t| !t.is_empty())
    }
}

impl Validate for MileageLogbook {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_required(&self.driver_name, "driver_name", "Driver name", &mut errors);
        validate_email(&self.email, "email", &mut errors);
        validate_pps(&self.pps_number, "pps_number", &mut errors);
        validate_required(
            &self.vehicle_registration,
            "vehicle_registration",
            "Vehicle registration",
            &mut errors,
        );
        validate_required(&self.total_km_all, "total_km_all", "Total km", &mut errors);
        validate_required(&self.business_km, "business_km", "Business km", &mut errors);
        for (i, trip) in self.trips.iter().enumerate() {
            if trip.is_empty() {
                continue;
            }
            validate_required(&trip.date, &format!("trips[{i}].date"), "Trip date", &mut errors);
            validate_required(&trip.from, &format!("trips[{i}].from"), "Trip origin", &mut errors);
            validate_required(&trip.to, &format!("trips[{i}].to"), "Trip destination", &mut errors);
        }
        if !self.declaration_accepted {
            errors.add(crate::validation::ValidationError::new(
                "declaration_accepted",
                "The declaration must be accepted",
            ));
        }
        errors.into_result()
    }
}

pub fn build(data: &MileageLogbook, options: &BuildOptions) -> RenderedDocument {
    let labels = &options.labels;
    let title = labels.get("mileage.title", "Mileage Logbook");
    let subtitle = labels.get("mileage.subtitle", "Record of business travel in a private vehicle");
    let mut ctx = start_document(&title, &subtitle, options);

    field_table(
        &mut ctx,
        &labels.get("mileage.driver", "Driver"),
        vec![
            (labels.get("mileage.driver_name", "Name"), data.driver_name.clone()),
            (labels.get("common.email", "Email"), data.email.clone()),
            (labels.get("common.pps", "PPS number"), data.pps_number.clone()),
            (labels.get("mileage.employer", "Employer"), data.employer.clone()),
            (labels.get("mileage.tax_year", "Tax year"), data.tax_year.clone()),
        ],
    );

    field_table(
        &mut ctx,
        &labels.get("mileage.vehicle", "Vehicle"),
        vec![
            (labels.get("mileage.registration", "Registration"), data.vehicle_registration.clone()),
            (labels.get("mileage.make_model", "Make and model"), data.vehicle_make_model.clone()),
            (labels.get("mileage.engine_cc", "Engine size (cc)"), data.engine_cc.clone()),
            (
                labels.get("mileage.odometer_start", "Odometer at start"),
                data.odometer_start.clone(),
            ),
            (labels.get("mileage.odometer_end", "Odometer at end"), data.odometer_end.clone()),
        ],
    );

    let rows: Vec<Vec<String>> = data
        .populated_trips()
        .map(|t| {
            vec![
                t.date.trim().to_string(),
                t.from.trim().to_string(),
                t.to.trim().to_string(),
                t.purpose.trim().to_string(),
                t.business_km.trim().to_string(),
            ]
        })
        .collect();

    let trips_heading = labels.get("mileage.trips", "Business trips");
    if rows.is_empty() {
        begin_section(&mut ctx, &trips_heading, estimate_rows(1));
        note(&mut ctx, &labels.get("mileage.no_trips", "No business trips recorded."));
    } else {
        // Only the header and first rows need to fit; the table breaks pages itself.
        begin_section(&mut ctx, &trips_heading, estimate_rows(2));
        let matrix = CellMatrix::new(rows)
            .with_header([
                labels.get("mileage.trip_date", "Date"),
                labels.get("mileage.trip_from", "From"),
                labels.get("mileage.trip_to", "To"),
                labels.get("mileage.trip_purpose", "Purpose"),
                labels.get("mileage.trip_km", "Business km"),
            ])
            .with_widths(vec![
                ColumnWidth::Absolute(24.0),
                ColumnWidth::Proportional(1.0),
                ColumnWidth::Proportional(1.0),
                ColumnWidth::Proportional(1.4),
                ColumnWidth::Absolute(24.0),
            ]);
        table_section(&mut ctx, &matrix, &TableStyle::default());
    }

    field_table(
        &mut ctx,
        &labels.get("mileage.totals", "Totals"),
        vec![
            (
                labels.get("mileage.total_km_all", "Total km (all driving)"),
                data.total_km_all.clone(),
            ),
            (labels.get("mileage.business_km", "Business km"), data.business_km.clone()),
            (
                labels.get("mileage.business_percent", "Business use"),
                with_suffix(&data.business_percent, "%"),
            ),
        ],
    );

    declaration(
        &mut ctx,
        labels,
        &labels.get("mileage.declaration", DEFAULT_DECLARATION),
        data.declaration_accepted,
    );

    signature_block(
        &mut ctx,
        labels,
        data.signature.as_deref(),
        &data.driver_name,
        &data.signature_date,
        None,
    );

    ctx.stamp_page_numbers();
    ctx.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(date: &str, from: &str, to: &str, km: &str) -> Trip {
        Trip {
            date: date.into(),
            from: from.into(),
            to: to.into(),
            purpose: "Client visit".into(),
            business_km: km.into(),
        }
    }

    #[test]
    fn test_blank_trips_are_skipped() {
        let data = MileageLogbook {
            trips: vec![
                trip("", "", "", "12"),
                trip("2026-01-05", "Dublin", "Naas", "40"),
                trip(" ", "", "\t", ""),
            ],
            ..Default::default()
        };
        assert_eq!(data.populated_trips().count(), 1);

        let doc = build(&data, &BuildOptions::default());
        assert!(doc.contains_text("Naas"));
        assert!(!doc.contains_text("12"));
    }

    #[test]
    fn test_no_trips_renders_note() {
        let doc = build(&MileageLogbook::default(), &BuildOptions::default());
        assert!(doc.contains_text("No business trips recorded."));
        assert!(!doc.contains_text("Purpose"));
    }

    #[test]
    fn test_validate_requires_key_fields() {
        let errors = MileageLogbook::default().validate().unwrap_err();
        assert!(errors.has_field("driver_name"));
        assert!(errors.has_field("pps_number"));
        assert!(errors.has_field("declaration_accepted"));
    }

    #[test]
    fn test_validate_flags_half_filled_trip() {
        let data = MileageLogbook {
            driver_name: "Jane Doe".into(),
            email: "jane@example.ie".into(),
            pps_number: "1234567T".into(),
            vehicle_registration: "191-D-12345".into(),
            total_km_all: "100".into(),
            business_km: "40".into(),
            declaration_accepted: true,
            trips: vec![trip("2026-01-05", "Dublin", "", "40")],
            ..Default::default()
        };
        let errors = data.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.has_field("trips[0].to"));
    }
}
