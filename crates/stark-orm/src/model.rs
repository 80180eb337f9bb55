//! Entity trait and field metadata.
//!
//! An [`Entity`] describes itself through [`EntityMeta`]: the app it belongs
//! to, its model name and the list of its fields. The admin layer reads this
//! metadata to derive URL names, column headers and form fields.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Name of the primary key field every entity exposes.
pub const PK_FIELD: &str = "id";

/// A record type that can be managed by the admin.
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use stark_orm::{Entity, EntityMeta, FieldMeta};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Depart {
///     id: i64,
///     title: String,
/// }
///
/// impl std::fmt::Display for Depart {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         f.write_str(&self.title)
///     }
/// }
///
/// impl Entity for Depart {
///     fn meta() -> EntityMeta {
///         EntityMeta::new("app01", "depart")
///             .field(FieldMeta::auto("id"))
///             .field(FieldMeta::char("title", "Department", 32))
///     }
///
///     fn pk(&self) -> i64 {
///         self.id
///     }
/// }
///
/// let d = Depart { id: 1, title: "IT".into() };
/// assert_eq!(d.value("title"), Some("IT".into()));
/// ```
pub trait Entity: Serialize + Clone + fmt::Display + Send + Sync + 'static {
    /// Returns the entity's metadata.
    fn meta() -> EntityMeta;

    /// Returns the primary key value for this instance.
    fn pk(&self) -> i64;

    /// Returns the entity as a JSON object.
    fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Returns the value of one field, `None` if the field does not exist.
    fn value(&self, field: &str) -> Option<Value> {
        self.to_map().remove(field)
    }
}

/// What kind of data a field holds.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Auto-assigned integer primary key.
    Auto,
    /// Short text.
    Char,
    /// Long text.
    Text,
    Integer,
    Boolean,
    Email,
    /// A value restricted to a fixed list of (value, label) pairs.
    Choices(Vec<(Value, String)>),
    /// Reference to a single row of another collection.
    ForeignKey { to: &'static str },
    /// References to any number of rows of another collection.
    ManyToMany { to: &'static str },
}

impl FieldKind {
    /// Returns the related collection for relation fields.
    pub fn related_to(&self) -> Option<&'static str> {
        match self {
            Self::ForeignKey { to } | Self::ManyToMany { to } => Some(*to),
            _ => None,
        }
    }
}

/// Metadata for a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    pub name: &'static str,
    pub verbose_name: String,
    pub kind: FieldKind,
    /// Whether the field must be provided on save.
    pub required: bool,
    pub max_length: Option<usize>,
    /// Whether the field appears in generated forms.
    pub editable: bool,
    /// Whether two rows may not share a value.
    pub unique: bool,
}

impl FieldMeta {
    /// Creates a required, editable field.
    pub fn new(name: &'static str, verbose_name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name,
            verbose_name: verbose_name.into(),
            kind,
            required: true,
            max_length: None,
            editable: true,
            unique: false,
        }
    }

    /// Creates the auto-increment primary key field.
    pub fn auto(name: &'static str) -> Self {
        Self::new(name, "ID", FieldKind::Auto).read_only()
    }

    pub fn char(name: &'static str, verbose_name: impl Into<String>, max_length: usize) -> Self {
        let mut field = Self::new(name, verbose_name, FieldKind::Char);
        field.max_length = Some(max_length);
        field
    }

    pub fn text(name: &'static str, verbose_name: impl Into<String>) -> Self {
        Self::new(name, verbose_name, FieldKind::Text)
    }

    pub fn integer(name: &'static str, verbose_name: impl Into<String>) -> Self {
        Self::new(name, verbose_name, FieldKind::Integer)
    }

    pub fn boolean(name: &'static str, verbose_name: impl Into<String>) -> Self {
        Self::new(name, verbose_name, FieldKind::Boolean).optional()
    }

    pub fn email(name: &'static str, verbose_name: impl Into<String>) -> Self {
        Self::new(name, verbose_name, FieldKind::Email)
    }

    /// Creates a choice field; `choices` pairs a stored value with its label.
    pub fn choices<V: Into<Value>>(
        name: &'static str,
        verbose_name: impl Into<String>,
        choices: impl IntoIterator<Item = (V, &'static str)>,
    ) -> Self {
        let choices = choices
            .into_iter()
            .map(|(value, label)| (value.into(), label.to_string()))
            .collect();
        Self::new(name, verbose_name, FieldKind::Choices(choices))
    }

    pub fn foreign_key(
        name: &'static str,
        verbose_name: impl Into<String>,
        to: &'static str,
    ) -> Self {
        Self::new(name, verbose_name, FieldKind::ForeignKey { to })
    }

    pub fn many_to_many(
        name: &'static str,
        verbose_name: impl Into<String>,
        to: &'static str,
    ) -> Self {
        Self::new(name, verbose_name, FieldKind::ManyToMany { to }).optional()
    }

    /// Marks the field as not required.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Rejects saves that would duplicate this field's value.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Excludes the field from generated forms.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Returns the label for a stored choice value.
    pub fn choice_label(&self, value: &Value) -> Option<&str> {
        match &self.kind {
            FieldKind::Choices(choices) => choices
                .iter()
                .find(|(v, _)| crate::query::loose_eq(v, value))
                .map(|(_, label)| label.as_str()),
            _ => None,
        }
    }
}

/// Metadata describing an entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMeta {
    /// Application the entity belongs to, first URL segment.
    pub app_label: &'static str,
    /// Lower-case model name, second URL segment.
    pub model_name: &'static str,
    pub verbose_name: String,
    pub fields: Vec<FieldMeta>,
}

impl EntityMeta {
    pub fn new(app_label: &'static str, model_name: &'static str) -> Self {
        Self {
            app_label,
            model_name,
            verbose_name: model_name.to_string(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn verbose_name(mut self, verbose_name: impl Into<String>) -> Self {
        self.verbose_name = verbose_name.into();
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the metadata of a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    /// Returns the fields shown in generated forms, in declaration order.
    pub fn editable_fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.iter().filter(|f| f.editable)
    }
}
