//! Post and comment forms.
//!
//! A form is the raw submitted payload plus the rules that turn it into
//! clean values. Failures are collected per field in [`FormErrors`] so the
//! page can be re-rendered with messages next to the inputs.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

pub const REQUIRED: &str = "Обязательное поле.";
pub const INVALID_CHOICE: &str =
    "Выберите корректный вариант. Вашего варианта нет среди допустимых значений.";
pub const INVALID_IMAGE: &str = "Загрузите правильное изображение. Файл, который вы загрузили, поврежден или не является изображением.";

/// Presentation metadata of one form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMeta {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: Option<&'static str>,
    pub placeholder: Option<&'static str>,
    /// Text of the "nothing selected" option of a choice field.
    pub empty_label: Option<&'static str>,
    pub required: bool,
}

impl FieldMeta {
    const fn new(name: &'static str, label: &'static str, required: bool) -> Self {
        Self {
            name,
            label,
            help_text: None,
            placeholder: None,
            empty_label: None,
            required,
        }
    }

    pub(crate) const fn input(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, true)
    }

    const fn help_text(mut self, help_text: &'static str) -> Self {
        self.help_text = Some(help_text);
        self
    }

    const fn placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    const fn empty_label(mut self, empty_label: &'static str) -> Self {
        self.empty_label = Some(empty_label);
        self
    }
}

/// Index field metadata by name for template lookups.
pub fn field_map(fields: &[FieldMeta]) -> BTreeMap<&'static str, FieldMeta> {
    fields.iter().map(|field| (field.name, *field)).collect()
}

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Merge another set of errors into this one.
    pub fn extend(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = Self::default();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| error.code.to_string());
                form_errors.add(&field, message);
            }
        }
        form_errors
    }
}

fn collect(result: Result<(), ValidationErrors>) -> FormErrors {
    match result {
        Ok(()) => FormErrors::default(),
        Err(errors) => errors.into(),
    }
}

pub(crate) fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("required", REQUIRED));
    }
    Ok(())
}

/// Submitted post form. Every field defaults to empty so a partial body
/// still binds and reports field errors instead of failing extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PostForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub text: String,

    /// Group id as sent by the select box; empty means "no group".
    #[serde(default)]
    pub group: String,
}

/// Values of a post form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedPost {
    pub text: String,
    pub group_id: Option<i32>,
}

impl PostForm {
    pub const FIELDS: [FieldMeta; 3] = [
        FieldMeta::new("text", "Введите текст", true)
            .help_text("Попробуй ввести текст")
            .placeholder("Напиши текст, пожалуйста"),
        FieldMeta::new("group", "Выберете группу", false)
            .help_text("Выбор за тобой")
            .empty_label("Выберите группу, если желаете 🙂"),
        FieldMeta::new("image", "Картинка", false),
    ];

    pub fn new(text: impl Into<String>, group_id: Option<i32>) -> Self {
        Self {
            text: text.into(),
            group: group_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }

    /// Validate the form against the ids of existing groups.
    pub fn clean(&self, group_ids: &[i32]) -> Result<CleanedPost, FormErrors> {
        let mut errors = collect(self.validate());

        let group_id = match self.group.trim() {
            "" => None,
            raw => {
                let id = raw.parse::<i32>().ok().filter(|id| group_ids.contains(id));
                if id.is_none() {
                    errors.add("group", INVALID_CHOICE);
                }
                id
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CleanedPost {
            text: self.text.trim().to_string(),
            group_id,
        })
    }
}

/// Submitted comment form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub text: String,
}

impl CommentForm {
    pub const FIELDS: [FieldMeta; 1] = [FieldMeta::new("text", "Комментарий", true)];

    /// Returns the trimmed comment text.
    pub fn clean(&self) -> Result<String, FormErrors> {
        let errors = collect(self.validate());
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(self.text.trim().to_string())
    }
}
