//! # stark-forms
//!
//! Form definitions, binding and validation.
//!
//! Forms here produce data, not markup: a [`BoundForm`] exposes a
//! serializable [`FormContext`] that any template engine can render.
//!
//! ## Example
//!
//! ```rust
//! use stark_forms::{BoundForm, FormBuilder, FormFieldDef};
//!
//! let fields = FormBuilder::new()
//!     .field(FormFieldDef::text("name").max_length(32))
//!     .field(FormFieldDef::email("email"))
//!     .widget_attr("class", "form-control")
//!     .build();
//!
//! let form = BoundForm::bind(
//!     fields,
//!     Default::default(),
//!     [("name", "ann"), ("email", "ann@example.com")],
//! );
//! assert!(form.is_valid());
//! assert_eq!(form.cleaned_data()["name"], "ann");
//! ```

pub mod error;
pub mod form;
pub mod validation;

pub use error::{FormError, NON_FIELD_ERRORS, Result, ValidationErrors};
pub use form::{
    BoundForm, ChoiceContext, FieldContext, FieldType, FormBuilder, FormContext, FormFieldDef,
    value_to_string,
};
pub use validation::{EmailValidator, MaxLengthValidator, Validator};
