use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A logical entity declared by the caller: typed attributes, traits, and
/// relations. This is the input to the plan builder — §3 `ModelDefinition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    /// Physical table name. `None` means "derive from `name`" (snake/plural).
    pub table: Option<String>,
    /// Primary key column name, defaults to `id`.
    pub primary_key: Option<String>,
    pub traits: Vec<Trait>,
    /// Ordered mapping from logical column name to its definition. A `Vec`
    /// of pairs, not a `HashMap`, because declaration order is semantic
    /// (it seeds canonical column order before trait injection).
    pub attributes: Vec<(String, AttributeDef)>,
    pub relations: BTreeMap<String, RelationDef>,
}

impl ModelDefinition {
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| crate::model::pluralize_snake(&self.name))
    }

    pub fn primary_key_name(&self) -> &str {
        self.primary_key.as_deref().unwrap_or("id")
    }

    pub fn has_trait(&self, t: Trait) -> bool {
        self.traits.contains(&t)
    }
}

/// Behavioral traits that inject fixed columns or API surface at the
/// normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trait {
    UseUuid,
    UseTimestamps,
    UseSoftDeletes,
    UseApi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub r#type: AttributeType,
    pub fillable: bool,
    pub unique: bool,
    pub hidden: bool,
    pub guarded: bool,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    /// Explicit ordering hint; attributes without one keep declaration
    /// order relative to each other.
    pub order: Option<i32>,
}

impl AttributeDef {
    pub fn new(r#type: AttributeType) -> Self {
        AttributeDef {
            r#type,
            fillable: true,
            unique: false,
            hidden: false,
            guarded: false,
            nullable: false,
            default: None,
            order: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// The closed set of logical column types. `Enum` carries its non-empty
/// ordered literal tuple inline, rather than via a type-level trick: at the
/// plan level a literal union is just a tagged `Vec<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AttributeType {
    String,
    Text,
    Integer,
    Smallint,
    Bigint,
    Float,
    Double,
    Decimal,
    Boolean,
    Date,
    Datetime,
    Time,
    Timestamp,
    TimestampTz,
    Json,
    Blob,
    Enum { values: Vec<String> },
}

impl AttributeType {
    pub fn is_enum(&self) -> bool {
        matches!(self, AttributeType::Enum { .. })
    }

    pub fn enum_values(&self) -> Option<&[String]> {
        match self {
            AttributeType::Enum { values } => Some(values),
            _ => None,
        }
    }
}

/// A literal default, or one of the two symbolic defaults (`now()`/`uuid()`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum DefaultValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Now,
    Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    HasOne,
    HasMany,
    BelongsTo,
    BelongsToMany,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDef {
    pub kind: RelationKind,
    pub model: String,
    pub foreign_key: Option<String>,
    /// `ownerKey` for `belongsTo`, `localKey` for `hasOne`/`hasMany`.
    pub owner_or_local_key: Option<String>,
    /// Present only for `belongsToMany`; names the pivot table if the
    /// caller wants an explicit name instead of a synthesized one.
    pub pivot: Option<String>,
}

/// Minimal snake/plural derivation used when a model doesn't declare an
/// explicit `table`. Deliberately conservative: it lowercases, replaces
/// non-alphanumerics with underscores, and appends `s` (or `es` after a
/// sibilant) — enough to keep names lower-snake without pulling in a
/// dedicated inflector crate for a single call site.
pub(crate) fn pluralize_snake(name: &str) -> String {
    let snake = to_snake_case(name);
    if snake.ends_with('s') || snake.ends_with('x') || snake.ends_with("ch") || snake.ends_with("sh") {
        format!("{}es", snake)
    } else if let Some(stripped) = snake.strip_suffix('y') {
        format!("{}ies", stripped)
    } else {
        format!("{}s", snake)
    }
}

pub(crate) fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else if ch.is_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}
