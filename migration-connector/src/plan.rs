use crate::dialect::Dialect;
use crate::model::{AttributeType, DefaultValue};
use serde::{Deserialize, Serialize};

/// The canonical, dialect-tagged snapshot of the intended schema. Immutable
/// once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub dialect: Dialect,
    pub tables: Vec<TableSpec>,
    pub enums: Vec<EnumSpec>,
    /// Bumped on incompatible plan *shape* changes (not on ordinary schema
    /// evolution); consumers that persist plans across qb versions can use
    /// this to detect when a from-scratch rebuild is required.
    pub schema_version: u32,
}

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

impl MigrationPlan {
    pub fn new(dialect: Dialect) -> Self {
        MigrationPlan {
            dialect,
            tables: Vec::new(),
            enums: Vec::new(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn find_table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.find_table(name).is_some()
    }

    /// Canonical JSON used for byte-identity comparisons between two plans
    /// and for the snapshot store's content hash. Serde's struct field order
    /// follows declaration order and is stable across runs, and every
    /// ordered collection in this type is kept in canonical order by the
    /// plan builder, so `serde_json::to_vec` here is already canonical —
    /// no extra key-sorting pass is needed.
    pub fn canonical_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Resolves an enum column's value set to the name `collect_enums` gave
    /// the deduped `EnumSpec` it merged into, by value-set equality rather
    /// than the column's own name — a later column sharing an earlier
    /// column's value set is renamed onto that earlier `EnumSpec`, so a
    /// driver must look the name up here instead of re-deriving it.
    pub fn enum_name_for(&self, values: &[String]) -> Option<&str> {
        let candidate = EnumSpec { name: String::new(), values: values.to_vec() };
        self.enums.iter().find(|e| e.same_value_set(&candidate)).map(|e| e.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub table: String,
    pub primary_key: String,
    pub columns: Vec<ColumnSpec>,
    pub indexes: Vec<IndexSpec>,
    pub foreign_keys: Vec<ForeignKeySpec>,
}

impl TableSpec {
    pub fn find_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub r#type: AttributeType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub unique: bool,
}

impl ColumnSpec {
    /// Dialect-independent equality used by the differ's alter detection:
    /// `{type, nullable, default, unique, enumValues}` (enum values are
    /// part of `r#type` already, since `AttributeType::Enum` carries them).
    pub fn differs_from(&self, other: &ColumnSpec) -> bool {
        self.r#type != other.r#type
            || self.nullable != other.nullable
            || self.default != other.default
            || self.unique != other.unique
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FkAction {
    Cascade,
    Restrict,
    SetNull,
    NoAction,
}

impl Default for FkAction {
    fn default() -> Self {
        FkAction::Restrict
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
    pub on_delete: FkAction,
    pub on_update: FkAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumSpec {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumSpec {
    /// Enums are considered the same type iff their *value sets* match,
    /// regardless of declared order — duplicates are merged by value-set
    /// equality, not by name or order.
    pub fn same_value_set(&self, other: &EnumSpec) -> bool {
        let mut a = self.values.clone();
        let mut b = other.values.clone();
        a.sort();
        b.sort();
        a == b
    }
}
