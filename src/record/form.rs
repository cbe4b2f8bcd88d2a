//! The form for adding and editing financial records.

use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    html::{
        BUTTON_PRIMARY_STYLE, ERROR_TEXT_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, Input, base,
    },
    navigation::NavBar,
    record::core::{FinancialRecord, NewRecord, RecordType},
    user::UserID,
    validation::{FieldRules, Rule, Validate, ValidationErrors, parse_iso_date},
};

/// The raw values submitted in the record form.
///
/// Every field is kept as text so that the form can be shown again exactly as
/// the user entered it when validation fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordForm {
    pub date: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub category: String,
    pub nominal: String,
    pub description: String,
    pub attachment: String,
}

impl Validate for RecordForm {
    const RULES: &'static [FieldRules] = &[
        FieldRules {
            field: "date",
            label: Some("Tanggal"),
            rules: &[Rule::Required, Rule::IsoDate],
        },
        FieldRules {
            field: "type",
            label: Some("Tipe"),
            rules: &[Rule::Required, Rule::OneOf(RecordType::VALUES)],
        },
        FieldRules {
            field: "category",
            label: Some("Kategori"),
            rules: &[Rule::Required],
        },
        FieldRules {
            field: "nominal",
            label: Some("Nominal"),
            rules: &[Rule::Required, Rule::Numeric, Rule::MinValue(1)],
        },
    ];

    fn field_value(&self, field: &str) -> Option<&str> {
        match field {
            "date" => Some(&self.date),
            "type" => Some(&self.record_type),
            "category" => Some(&self.category),
            "nominal" => Some(&self.nominal),
            "description" => Some(&self.description),
            "attachment" => Some(&self.attachment),
            _ => None,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();

    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

impl RecordForm {
    /// Convert a validated form into a record owned by `user_id`.
    ///
    /// Empty descriptions and attachments are stored as `None`.
    ///
    /// # Errors
    /// Returns [Error::InvalidForm] if a field cannot be parsed, which means the form was not validated.
    pub fn to_new_record(&self, user_id: UserID) -> Result<NewRecord, Error> {
        let date = parse_iso_date(&self.date)
            .ok_or_else(|| Error::InvalidForm(format!("invalid date {:?}", self.date)))?;
        let record_type: RecordType = self
            .record_type
            .parse()
            .map_err(|_| Error::InvalidForm(format!("invalid type {:?}", self.record_type)))?;
        let nominal = self
            .nominal
            .trim()
            .parse()
            .map_err(|_| Error::InvalidForm(format!("invalid nominal {:?}", self.nominal)))?;

        Ok(NewRecord {
            user_id,
            date,
            record_type,
            category: self.category.trim().to_owned(),
            nominal,
            description: non_empty(&self.description),
            attachment: non_empty(&self.attachment),
        })
    }

    /// Fill the form with the values of a stored record.
    pub fn from_record(record: &FinancialRecord) -> Self {
        Self {
            date: record.date.to_string(),
            record_type: record.record_type.as_str().to_owned(),
            category: record.category.clone(),
            nominal: record.nominal.to_string(),
            description: record.description.clone().unwrap_or_default(),
            attachment: record.attachment.clone().unwrap_or_default(),
        }
    }
}

/// What to show on a page with the record form.
pub struct RecordFormView<'a> {
    /// The page title and heading.
    pub title: &'a str,
    /// The navigation bar link to highlight.
    pub active_endpoint: &'a str,
    /// Where the form is submitted to.
    pub action: &'a str,
    pub form: &'a RecordForm,
    pub errors: Option<&'a ValidationErrors>,
    /// A message about the whole page, e.g. a failed database query.
    pub error_message: Option<&'a str>,
}

fn type_select(selected: &str, error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label for="type" class=(FORM_LABEL_STYLE) { "Tipe" }

            select name="type" id="type" required class=(FORM_TEXT_INPUT_STYLE)
            {
                option value="" selected[selected.is_empty()] { "Pilih tipe" }

                @for record_type in [RecordType::Income, RecordType::Expense] {
                    option
                        value=(record_type.as_str())
                        selected[selected == record_type.as_str()]
                    {
                        (record_type.label())
                    }
                }
            }

            @if let Some(error_message) = error_message
            {
                p class=(ERROR_TEXT_STYLE) { (error_message) }
            }
        }
    }
}

/// Render a page with the record form.
pub fn record_form_page(view: &RecordFormView<'_>) -> Markup {
    let form = view.form;
    let errors = view.errors;
    let nav_bar = NavBar::new(view.active_endpoint).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { (view.title) }

            @if let Some(error_message) = view.error_message
            {
                p class=(ERROR_TEXT_STYLE) { (error_message) }
            }

            form method="post" action=(view.action) class="w-full space-y-4 md:space-y-6"
            {
                (Input::text("date", "Tanggal", &form.date).with_type("date").render(errors))
                (type_select(&form.record_type, errors.and_then(|errors| errors.get("type"))))
                (Input::text("category", "Kategori", &form.category).render(errors))
                (Input::text("nominal", "Nominal", &form.nominal).with_type("number").render(errors))
                (Input::text("description", "Deskripsi", &form.description).optional().render(errors))
                (Input::text("attachment", "Lampiran", &form.attachment).optional().render(errors))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Simpan" }
            }
        }
    };

    base(view.title, &content)
}
