//! Inline field errors for re-rendered forms.

use std::collections::BTreeMap;
use validator::ValidationErrors;

/// Messages keyed by form field name, in insertion order per field.
#[derive(Clone, Debug, Default)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the messages of a failed `validator` run.
    pub fn from_validation(errors: &ValidationErrors) -> Self {
        let mut out = Self::new();
        for (field, errs) in errors.field_errors() {
            for err in errs.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                out.add(field, message);
            }
        }
        out
    }

    /// Runs `validator` on `form` and collects whatever it reports.
    pub fn validate<T: validator::Validate>(form: &T) -> Self {
        match form.validate() {
            Ok(()) => Self::new(),
            Err(errors) => Self::from_validation(&errors),
        }
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All messages for `field` joined for display.
    pub fn get(&self, field: &str) -> String {
        self.messages(field).join(" ")
    }
}
