//! Search groups: one row of toggle links per filterable field.
//!
//! Each option's link is the current query with that option switched on or
//! off, so the links double as the filter state.

use serde::Serialize;
use serde_json::Value;
use stark_forms::value_to_string;
use stark_orm::{Entity, EntityMeta, FieldKind, FieldMeta, Q, Storage};
use stark_router::QueryParams;

use crate::context::RequestContext;
use crate::error::{Result, StarkError};

/// A field the list can be narrowed by.
#[derive(Debug, Clone)]
pub struct SearchOption {
    pub field: String,
    /// Extra predicate narrowing the related rows offered as options.
    pub condition: Option<Q>,
    /// Whether several values may be selected at once.
    pub multi: bool,
    /// Row title; defaults to the field's verbose name.
    pub title: Option<String>,
}

impl SearchOption {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            condition: None,
            multi: false,
            title: None,
        }
    }

    #[must_use]
    pub fn condition(mut self, condition: Q) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Checks that the field exists and has a finite set of values.
    pub fn validate(&self, meta: &EntityMeta) -> Result<()> {
        self.field_meta(meta).map(|_| ())
    }

    fn field_meta<'m>(&self, meta: &'m EntityMeta) -> Result<&'m FieldMeta> {
        let field = meta
            .get_field(&self.field)
            .ok_or_else(|| StarkError::UnknownField {
                model: meta.model_name.to_string(),
                option: "search_group",
                field: self.field.clone(),
            })?;
        match field.kind {
            FieldKind::Choices(_) | FieldKind::ForeignKey { .. } | FieldKind::ManyToMany { .. } => {
                Ok(field)
            }
            _ => Err(StarkError::InvalidConfig(format!(
                "{}: search_group field {:?} has no choices and is not a relation",
                meta.model_name, self.field
            ))),
        }
    }

    /// Values currently selected for this field, as raw strings.
    pub fn selected<'a>(&self, query: &'a QueryParams) -> Vec<&'a str> {
        query.get_all(&self.field)
    }

    /// Resolves the options against the current request.
    pub async fn resolve<E: Entity>(
        &self,
        meta: &EntityMeta,
        storage: &dyn Storage<E>,
        ctx: &RequestContext,
        page_param: &str,
    ) -> Result<SearchGroupRow> {
        let field = self.field_meta(meta)?;

        let choices = match (&field.kind, field.kind.related_to()) {
            (FieldKind::Choices(choices), _) => choices.clone(),
            (_, Some(target)) => storage.related_choices(target, self.condition.as_ref()).await?,
            _ => Vec::new(),
        };

        // The page number never survives a change of filter.
        let base = ctx.query.without(page_param);
        let current: Vec<String> = self
            .selected(&ctx.query)
            .into_iter()
            .map(str::to_string)
            .collect();

        let all = {
            let mut query = base.clone();
            query.remove(&self.field);
            GroupChoice {
                value: String::new(),
                label: "All".to_string(),
                selected: current.is_empty(),
                url: link(&ctx.path, &query),
            }
        };

        let options = choices
            .iter()
            .map(|(value, label)| self.choice(&ctx.path, &base, &current, value, label))
            .collect();

        Ok(SearchGroupRow {
            field: self.field.clone(),
            title: self
                .title
                .clone()
                .unwrap_or_else(|| field.verbose_name.clone()),
            multi: self.multi,
            all,
            options,
        })
    }

    fn choice(
        &self,
        path: &str,
        base: &QueryParams,
        current: &[String],
        value: &Value,
        label: &str,
    ) -> GroupChoice {
        let value = value_to_string(value);
        let selected = current.contains(&value);

        let mut query = base.clone();
        if self.multi {
            query.remove(&self.field);
            for v in current.iter().filter(|v| **v != value) {
                query.append(self.field.clone(), v.clone());
            }
            if !selected {
                query.append(self.field.clone(), value.clone());
            }
        } else if selected {
            query.remove(&self.field);
        } else {
            query.set(self.field.clone(), value.clone());
        }

        GroupChoice {
            url: link(path, &query),
            value,
            label: label.to_string(),
            selected,
        }
    }
}

fn link(path: &str, query: &QueryParams) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", query.urlencode())
    }
}

/// One option of a search group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupChoice {
    pub value: String,
    pub label: String,
    pub selected: bool,
    /// Current list URL with this option toggled.
    pub url: String,
}

/// A resolved search group, ready for the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchGroupRow {
    pub field: String,
    pub title: String,
    pub multi: bool,
    pub all: GroupChoice,
    pub options: Vec<GroupChoice>,
}
