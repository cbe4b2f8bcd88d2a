//! Declarative form validation.
//!
//! Each form type lists its fields and their [Rule]s through the [Validate]
//! trait. [Validator::validate] checks the fields in the declared order and
//! reports at most one error per field: the first rule that fails.

mod locale;
mod rule;

use email_address::EmailAddress;
use rusqlite::{Connection, OptionalExtension};
use time::{Date, macros::format_description};

pub use locale::Locale;
pub use rule::{FieldRules, Rule, Validate};

use crate::Error;

/// The error message for a single form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The field's name in the submitted form.
    pub field: &'static str,
    /// The name of the field shown to the user.
    pub label: &'static str,
    /// The localized error message.
    pub message: String,
}

/// The failed fields of a form, in the order they were declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// The error message for `field`, if it failed validation.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    /// Set the error for `field`, replacing any existing error for that field.
    pub fn insert(&mut self, field: &'static str, label: &'static str, message: String) {
        match self.0.iter_mut().find(|error| error.field == field) {
            Some(error) => error.message = message,
            None => self.0.push(FieldError {
                field,
                label,
                message,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

/// Checks forms against their declared rules.
///
/// The validator borrows a database connection for [Rule::UniqueAcrossTable].
pub struct Validator<'a> {
    connection: &'a Connection,
    locale: Locale,
}

impl<'a> Validator<'a> {
    /// Create a validator that writes messages in the default locale.
    pub fn new(connection: &'a Connection) -> Self {
        Self {
            connection,
            locale: Locale::default(),
        }
    }

    pub fn with_locale(self, locale: Locale) -> Self {
        Self { locale, ..self }
    }

    /// Check `form` against [Validate::RULES].
    ///
    /// Returns `None` if every field is valid.
    ///
    /// # Errors
    ///
    /// Returns an [Error::SqlError] if a uniqueness query fails.
    pub fn validate<T: Validate>(&self, form: &T) -> Result<Option<ValidationErrors>, Error> {
        let mut errors = ValidationErrors::default();

        for field_rules in T::RULES {
            let value = form.field_value(field_rules.field).unwrap_or_default();

            if let Some(message) = self.check_field(form, field_rules, value)? {
                errors.insert(field_rules.field, field_rules.label(), message);
            }
        }

        if errors.is_empty() {
            Ok(None)
        } else {
            Ok(Some(errors))
        }
    }

    /// Find the message for the first rule of `field_rules` that `value` fails.
    fn check_field<T: Validate>(
        &self,
        form: &T,
        field_rules: &FieldRules,
        value: &str,
    ) -> Result<Option<String>, Error> {
        for rule in field_rules.rules {
            let passed = match rule {
                Rule::Required => !value.trim().is_empty(),
                Rule::Optional if value.is_empty() => return Ok(None),
                Rule::Optional => true,
                Rule::Email => EmailAddress::is_valid(value),
                Rule::MinLength(length) => value.chars().count() >= *length,
                Rule::Numeric => value.trim().parse::<i64>().is_ok(),
                Rule::MinValue(min) => value.trim().parse::<i64>().is_ok_and(|n| n >= *min),
                Rule::IsoDate => parse_iso_date(value).is_some(),
                Rule::OneOf(values) => values.iter().any(|allowed| *allowed == value),
                Rule::EqualsField(other) => form.field_value(other) == Some(value),
                Rule::UniqueAcrossTable { table, column } => {
                    !self.value_exists(table, column, value)?
                }
            };

            if !passed {
                let other_label = match rule {
                    Rule::EqualsField(other) => label_of::<T>(other),
                    _ => "",
                };

                return Ok(Some(self.locale.message(
                    rule,
                    field_rules.label(),
                    other_label,
                )));
            }
        }

        Ok(None)
    }

    fn value_exists(&self, table: &str, column: &str, value: &str) -> Result<bool, Error> {
        // `table` and `column` come from the static rule tables, never from user input.
        let query = format!("SELECT 1 FROM {table} WHERE {column} = ?1 LIMIT 1");

        let row: Option<i64> = self
            .connection
            .query_row(&query, [value], |row| row.get(0))
            .optional()?;

        Ok(row.is_some())
    }
}

fn label_of<T: Validate>(field: &str) -> &'static str {
    T::RULES
        .iter()
        .find(|field_rules| field_rules.field == field)
        .map(|field_rules| field_rules.label())
        .unwrap_or("")
}

/// Parse a date formatted as `YYYY-MM-DD`, the format of HTML date inputs.
pub fn parse_iso_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).ok()
}

#[cfg(test)]
mod validator_tests {
    use rusqlite::Connection;

    use crate::{db::initialize, validation::Locale};

    use super::{FieldRules, Rule, Validate, ValidationErrors, Validator};

    struct SignUp {
        email: String,
        password: String,
        confirm_password: String,
        nickname: String,
        age: String,
    }

    impl Validate for SignUp {
        const RULES: &'static [FieldRules] = &[
            FieldRules {
                field: "email",
                label: None,
                rules: &[
                    Rule::Required,
                    Rule::Email,
                    Rule::UniqueAcrossTable {
                        table: "users",
                        column: "email",
                    },
                ],
            },
            FieldRules {
                field: "password",
                label: Some("Kata Sandi"),
                rules: &[Rule::Required, Rule::MinLength(6)],
            },
            FieldRules {
                field: "confirm_password",
                label: Some("Konfirmasi"),
                rules: &[Rule::Required, Rule::EqualsField("password")],
            },
            FieldRules {
                field: "nickname",
                label: None,
                rules: &[Rule::Optional, Rule::MinLength(3)],
            },
            FieldRules {
                field: "age",
                label: None,
                rules: &[Rule::Required, Rule::Numeric],
            },
        ];

        fn field_value(&self, field: &str) -> Option<&str> {
            match field {
                "email" => Some(&self.email),
                "password" => Some(&self.password),
                "confirm_password" => Some(&self.confirm_password),
                "nickname" => Some(&self.nickname),
                "age" => Some(&self.age),
                _ => None,
            }
        }
    }

    fn valid_form() -> SignUp {
        SignUp {
            email: "budi@example.com".to_owned(),
            password: "rahasia".to_owned(),
            confirm_password: "rahasia".to_owned(),
            nickname: String::new(),
            age: "30".to_owned(),
        }
    }

    fn get_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[track_caller]
    fn must_fail(form: &SignUp, connection: &Connection) -> ValidationErrors {
        Validator::new(connection)
            .validate(form)
            .expect("validation query failed")
            .expect("want validation errors, got none")
    }

    #[test]
    fn valid_form_has_no_errors() {
        let connection = get_connection();

        let result = Validator::new(&connection).validate(&valid_form());

        assert_eq!(result, Ok(None));
    }

    #[test]
    fn first_failing_rule_wins() {
        let connection = get_connection();
        let form = SignUp {
            email: String::new(),
            ..valid_form()
        };

        let errors = must_fail(&form, &connection);

        assert_eq!(errors.get("email"), Some("email tidak boleh kosong"));
        assert_eq!(errors.iter().count(), 1);
    }

    #[test]
    fn whitespace_fails_required() {
        let connection = get_connection();
        let form = SignUp {
            age: "   ".to_owned(),
            ..valid_form()
        };

        let errors = must_fail(&form, &connection);

        assert_eq!(errors.get("age"), Some("age tidak boleh kosong"));
    }

    #[test]
    fn reports_errors_in_declaration_order() {
        let connection = get_connection();
        let form = SignUp {
            email: "bukan email".to_owned(),
            password: "123".to_owned(),
            confirm_password: "456".to_owned(),
            nickname: String::new(),
            age: "tiga puluh".to_owned(),
        };

        let errors = must_fail(&form, &connection);
        let fields: Vec<_> = errors.iter().map(|error| error.field).collect();

        assert_eq!(fields, ["email", "password", "confirm_password", "age"]);
        assert_eq!(
            errors.get("email"),
            Some("email harus berupa email yang valid")
        );
        assert_eq!(errors.get("password"), Some("Kata Sandi minimal 6 karakter"));
        assert_eq!(
            errors.get("confirm_password"),
            Some("Konfirmasi harus sama dengan Kata Sandi")
        );
        assert_eq!(errors.get("age"), Some("age harus berupa angka"));
    }

    #[test]
    fn optional_skips_empty_but_checks_present_values() {
        let connection = get_connection();

        let errors = must_fail(
            &SignUp {
                nickname: "ab".to_owned(),
                ..valid_form()
            },
            &connection,
        );

        assert_eq!(errors.get("nickname"), Some("nickname minimal 3 karakter"));
    }

    #[test]
    fn min_length_counts_characters_not_bytes() {
        let connection = get_connection();
        let form = SignUp {
            password: "ééééé".to_owned(),
            confirm_password: "ééééé".to_owned(),
            ..valid_form()
        };

        let errors = must_fail(&form, &connection);

        assert_eq!(errors.get("password"), Some("Kata Sandi minimal 6 karakter"));
    }

    #[test]
    fn unique_rule_fails_for_existing_value() {
        let connection = get_connection();
        connection
            .execute(
                "INSERT INTO users (name, email, password, created_at, updated_at) \
                VALUES ('Budi', 'budi@example.com', 'x', '', '')",
                (),
            )
            .unwrap();

        let errors = must_fail(&valid_form(), &connection);

        assert_eq!(errors.get("email"), Some("email sudah digunakan"));
    }

    #[test]
    fn uses_requested_locale() {
        let connection = get_connection();
        let form = SignUp {
            password: "123".to_owned(),
            confirm_password: "123".to_owned(),
            ..valid_form()
        };

        let errors = Validator::new(&connection)
            .with_locale(Locale::English)
            .validate(&form)
            .unwrap()
            .unwrap();

        assert_eq!(
            errors.get("password"),
            Some("Kata Sandi must be at least 6 characters in length")
        );
    }

    #[test]
    fn min_value_rejects_smaller_numbers() {
        struct Amount(&'static str);

        impl Validate for Amount {
            const RULES: &'static [FieldRules] = &[FieldRules {
                field: "amount",
                label: None,
                rules: &[Rule::Required, Rule::Numeric, Rule::MinValue(1)],
            }];

            fn field_value(&self, field: &str) -> Option<&str> {
                (field == "amount").then_some(self.0)
            }
        }

        let connection = get_connection();
        let validator = Validator::new(&connection);

        for value in ["0", "-1", "-9223372036854775808"] {
            let errors = validator.validate(&Amount(value)).unwrap().unwrap();
            assert_eq!(errors.get("amount"), Some("amount minimal 1"), "value {value}");
        }
        assert_eq!(validator.validate(&Amount("1")), Ok(None));
        assert_eq!(
            validator.validate(&Amount("abc")).unwrap().unwrap().get("amount"),
            Some("amount harus berupa angka")
        );
    }

    #[test]
    fn insert_replaces_existing_error() {
        let mut errors = ValidationErrors::default();
        errors.insert("email", "Email", "first".to_owned());
        errors.insert("email", "Email", "second".to_owned());

        assert_eq!(errors.get("email"), Some("second"));
        assert_eq!(errors.iter().count(), 1);
    }
}
