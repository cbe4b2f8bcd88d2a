//! The rules a form field can declare.

/// A single check applied to a form field's submitted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The trimmed value must not be empty.
    Required,
    /// An empty value passes and skips the rules that follow.
    Optional,
    /// The value must be a syntactically valid email address.
    Email,
    /// The value must have at least this many characters.
    MinLength(usize),
    /// The value must be a whole number.
    Numeric,
    /// The value must be a whole number no smaller than this.
    MinValue(i64),
    /// The value must be a calendar date formatted as `YYYY-MM-DD`.
    IsoDate,
    /// The value must be one of the listed values.
    OneOf(&'static [&'static str]),
    /// The value must equal the value of the named field.
    EqualsField(&'static str),
    /// No row in `table` may already have the value in `column`.
    UniqueAcrossTable {
        table: &'static str,
        column: &'static str,
    },
}

/// The ordered rules for one form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRules {
    /// The field's name in the submitted form.
    pub field: &'static str,
    /// The name shown to the user, defaults to `field`.
    pub label: Option<&'static str>,
    /// The checks to run, in order.
    pub rules: &'static [Rule],
}

impl FieldRules {
    pub fn label(&self) -> &'static str {
        self.label.unwrap_or(self.field)
    }
}

/// A form that can be checked by a [super::Validator].
pub trait Validate {
    /// The rules for each field, in the order they are checked.
    const RULES: &'static [FieldRules];

    /// The submitted value of `field`, or `None` if the form has no such field.
    fn field_value(&self, field: &str) -> Option<&str>;
}
