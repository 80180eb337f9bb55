//! Field definitions and bound forms.
//!
//! A form is a list of [`FormFieldDef`]s. Binding it to submitted data
//! produces a [`BoundForm`] which coerces every value to JSON, runs the
//! field validators and keeps the raw submission so an invalid form can be
//! shown again exactly as the user typed it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{NON_FIELD_ERRORS, ValidationErrors};
use crate::validation::{EmailValidator, MaxLengthValidator, Validator};

const REQUIRED_MESSAGE: &str = "This field is required.";

/// What kind of value a field accepts, and how it is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Free text.
    Text,
    /// Text that must be an email address.
    Email,
    /// A signed whole number.
    Integer,
    /// A checkbox; absent means false.
    Boolean,
    /// Exactly one of the declared choices.
    Choice,
    /// Any subset of the declared choices.
    MultipleChoice,
}

impl FieldType {
    /// Returns the input type a template would render for this field.
    pub fn input_type(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Integer => "number",
            Self::Boolean => "checkbox",
            Self::Choice | Self::MultipleChoice => "select",
        }
    }
}

/// Definition of a single form field.
#[derive(Clone)]
pub struct FormFieldDef {
    /// Field name, also the submitted key.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Coercion rule.
    pub field_type: FieldType,
    /// Whether an empty submission is an error.
    pub required: bool,
    /// Disabled fields ignore submitted data and keep their initial value.
    pub disabled: bool,
    /// Help text shown next to the field.
    pub help_text: Option<String>,
    /// Initial value used when the form is unbound.
    pub initial: Option<Value>,
    /// Allowed values with their labels, for choice fields.
    pub choices: Vec<(Value, String)>,
    /// Extra HTML attributes (for example `class`).
    pub attrs: BTreeMap<String, String>,
    validators: Vec<Arc<dyn Validator>>,
}

impl std::fmt::Debug for FormFieldDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormFieldDef")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("required", &self.required)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl FormFieldDef {
    /// Creates a required field; the label defaults to the humanized name.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        let mut def = Self {
            label: humanize(&name),
            name,
            field_type,
            required: field_type != FieldType::Boolean,
            disabled: false,
            help_text: None,
            initial: None,
            choices: Vec::new(),
            attrs: BTreeMap::new(),
            validators: Vec::new(),
        };
        if field_type == FieldType::Email {
            def.validators.push(Arc::new(EmailValidator::new()));
        }
        def
    }

    /// Creates a text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    /// Creates an integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    /// Creates an email field.
    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Email)
    }

    /// Creates a checkbox field.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    /// Creates a single-choice field.
    pub fn choice(name: impl Into<String>, choices: Vec<(Value, String)>) -> Self {
        Self::new(name, FieldType::Choice).choices(choices)
    }

    /// Creates a multiple-choice field.
    pub fn multiple_choice(name: impl Into<String>, choices: Vec<(Value, String)>) -> Self {
        Self::new(name, FieldType::MultipleChoice).choices(choices)
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    pub fn choices(mut self, choices: Vec<(Value, String)>) -> Self {
        self.choices = choices;
        self
    }

    /// Adds a `MaxLengthValidator`.
    pub fn max_length(self, max_length: usize) -> Self {
        self.validator(MaxLengthValidator::new(max_length))
    }

    /// Adds a validator, run after coercion on non-empty values.
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Sets an HTML attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Runs every validator against `raw`, collecting messages.
    fn run_validators(&self, raw: &str, errors: &mut ValidationErrors) {
        for validator in &self.validators {
            if let Err(message) = validator.validate(raw) {
                errors.add(&self.name, message);
            }
        }
    }

    /// Finds the declared choice whose string form equals `raw`.
    fn find_choice(&self, raw: &str) -> Option<&Value> {
        self.choices
            .iter()
            .map(|(value, _)| value)
            .find(|value| value_to_string(value) == raw)
    }

    /// Coerces the submitted values for this field into a JSON value.
    fn clean(&self, raw: &[String], errors: &mut ValidationErrors) -> Value {
        match self.field_type {
            FieldType::Boolean => {
                let checked = raw
                    .last()
                    .is_some_and(|v| matches!(v.as_str(), "on" | "true" | "1" | "yes"));
                if self.required && !checked {
                    errors.add(&self.name, REQUIRED_MESSAGE);
                }
                Value::Bool(checked)
            }
            FieldType::MultipleChoice => {
                let mut selected = Vec::new();
                for value in raw.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
                    match self.find_choice(value) {
                        Some(choice) => selected.push(choice.clone()),
                        None => errors.add(
                            &self.name,
                            format!("Select a valid choice. {value} is not one of the available choices."),
                        ),
                    }
                }
                if self.required && selected.is_empty() {
                    errors.add(&self.name, REQUIRED_MESSAGE);
                }
                Value::Array(selected)
            }
            FieldType::Text | FieldType::Email | FieldType::Integer | FieldType::Choice => {
                let value = raw.last().map(|v| v.trim()).unwrap_or_default();
                if value.is_empty() {
                    if self.required {
                        errors.add(&self.name, REQUIRED_MESSAGE);
                    }
                    return match self.field_type {
                        FieldType::Text | FieldType::Email => Value::String(String::new()),
                        _ => Value::Null,
                    };
                }

                self.run_validators(value, errors);

                match self.field_type {
                    FieldType::Integer => match value.parse::<i64>() {
                        Ok(n) => Value::from(n),
                        Err(_) => {
                            errors.add(&self.name, "Enter a whole number.");
                            Value::Null
                        }
                    },
                    FieldType::Choice => match self.find_choice(value) {
                        Some(choice) => choice.clone(),
                        None => {
                            errors.add(
                                &self.name,
                                format!("Select a valid choice. {value} is not one of the available choices."),
                            );
                            Value::Null
                        }
                    },
                    _ => Value::String(value.to_string()),
                }
            }
        }
    }
}

/// Builder for an ordered list of field definitions.
#[derive(Debug, Clone, Default)]
pub struct FormBuilder {
    fields: Vec<FormFieldDef>,
    widget_attrs: BTreeMap<String, String>,
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    pub fn field(mut self, field: FormFieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets an attribute on every field that does not define it already.
    pub fn widget_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.widget_attrs.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Vec<FormFieldDef> {
        let widget_attrs = self.widget_attrs;
        self.fields
            .into_iter()
            .map(|mut field| {
                for (name, value) in &widget_attrs {
                    field
                        .attrs
                        .entry(name.clone())
                        .or_insert_with(|| value.clone());
                }
                field
            })
            .collect()
    }
}

/// A form together with its data, errors and cleaned values.
#[derive(Debug, Clone)]
pub struct BoundForm {
    fields: Vec<FormFieldDef>,
    initial: Map<String, Value>,
    data: Option<Vec<(String, String)>>,
    errors: ValidationErrors,
    cleaned_data: Map<String, Value>,
}

impl BoundForm {
    /// Creates a form with no submitted data.
    ///
    /// `initial` takes precedence over each field's own initial value; it is
    /// how an edit form is prefilled from an existing record.
    pub fn unbound(fields: Vec<FormFieldDef>, initial: Map<String, Value>) -> Self {
        Self {
            fields,
            initial,
            data: None,
            errors: ValidationErrors::new(),
            cleaned_data: Map::new(),
        }
    }

    /// Binds submitted key/value pairs and validates them immediately.
    pub fn bind<I, K, V>(fields: Vec<FormFieldDef>, initial: Map<String, Value>, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let data: Vec<(String, String)> = data
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();

        let mut form = Self {
            fields,
            initial,
            data: Some(data),
            errors: ValidationErrors::new(),
            cleaned_data: Map::new(),
        };
        form.full_clean();
        form
    }

    fn full_clean(&mut self) {
        let Some(data) = &self.data else {
            return;
        };

        let mut errors = ValidationErrors::new();
        let mut cleaned = Map::new();

        for field in &self.fields {
            if field.disabled {
                if let Some(value) = self.initial_for(field) {
                    cleaned.insert(field.name.clone(), value);
                }
                continue;
            }
            let raw: Vec<String> = data
                .iter()
                .filter(|(k, _)| *k == field.name)
                .map(|(_, v)| v.clone())
                .collect();
            let value = field.clean(&raw, &mut errors);
            cleaned.insert(field.name.clone(), value);
        }

        self.errors = errors;
        self.cleaned_data = cleaned;
    }

    fn initial_for(&self, field: &FormFieldDef) -> Option<Value> {
        self.initial
            .get(&field.name)
            .cloned()
            .or_else(|| field.initial.clone())
    }

    pub fn is_bound(&self) -> bool {
        self.data.is_some()
    }

    /// Returns true when the form is bound and has no errors.
    pub fn is_valid(&self) -> bool {
        self.is_bound() && self.errors.is_empty()
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Records an error found outside field cleaning, such as by storage.
    ///
    /// Errors for names the form does not define are kept as non-field
    /// errors so they are still shown.
    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        if self.field(field).is_some() {
            self.errors.add(field, message);
        } else {
            self.errors.add_non_field(message);
        }
    }

    /// Merges a whole set of errors, see [`BoundForm::add_error`].
    pub fn add_errors(&mut self, errors: ValidationErrors) {
        for (field, messages) in errors.errors {
            for message in messages {
                self.add_error(&field, message);
            }
        }
    }

    /// Values coerced to JSON. Empty unless the form is bound.
    pub fn cleaned_data(&self) -> &Map<String, Value> {
        &self.cleaned_data
    }

    pub fn fields(&self) -> &[FormFieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormFieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Values to display for a field: the raw submission when bound,
    /// otherwise the initial value.
    pub fn values(&self, field: &FormFieldDef) -> Vec<String> {
        match &self.data {
            Some(data) if !field.disabled => data
                .iter()
                .filter(|(k, _)| *k == field.name)
                .map(|(_, v)| v.clone())
                .collect(),
            _ => match self.initial_for(field) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items.iter().map(value_to_string).collect(),
                Some(value) => vec![value_to_string(&value)],
            },
        }
    }

    /// Serializable view of the form for templates.
    pub fn context(&self) -> FormContext {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                let values = self.values(field);
                FieldContext {
                    name: field.name.clone(),
                    label: field.label.clone(),
                    field_type: field.field_type,
                    input_type: field.field_type.input_type(),
                    required: field.required,
                    disabled: field.disabled,
                    help_text: field.help_text.clone(),
                    value: values.last().cloned().unwrap_or_default(),
                    choices: field
                        .choices
                        .iter()
                        .map(|(value, label)| {
                            let value = value_to_string(value);
                            ChoiceContext {
                                selected: values.contains(&value),
                                value,
                                label: label.clone(),
                            }
                        })
                        .collect(),
                    values,
                    attrs: field.attrs.clone(),
                    errors: self.errors.get(&field.name).cloned().unwrap_or_default(),
                }
            })
            .collect();

        FormContext {
            fields,
            non_field_errors: self
                .errors
                .get(NON_FIELD_ERRORS)
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// Template-facing representation of a form.
#[derive(Debug, Clone, Serialize)]
pub struct FormContext {
    pub fields: Vec<FieldContext>,
    pub non_field_errors: Vec<String>,
}

/// Template-facing representation of one field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldContext {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub input_type: &'static str,
    pub required: bool,
    pub disabled: bool,
    pub help_text: Option<String>,
    /// Last value, for single-valued inputs.
    pub value: String,
    pub values: Vec<String>,
    pub choices: Vec<ChoiceContext>,
    pub attrs: BTreeMap<String, String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceContext {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Renders a JSON value the way it would appear in a form input.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Turns `field_name` into `Field name`.
fn humanize(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
