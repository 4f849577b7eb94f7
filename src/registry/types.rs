//! Declarative entity definitions: the model every other layer runs on.

/// Primary key column, shared by every entity.
pub const PK_COLUMN: &str = "id";

/// Owner column for ownership-scoped entities.
pub const OWNER_COLUMN: &str = "user_id";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    List,
    Show,
    Create,
    Update,
    Delete,
}

pub const ALL_OPERATIONS: &[Operation] = &[
    Operation::List,
    Operation::Show,
    Operation::Create,
    Operation::Update,
    Operation::Delete,
];

/// PostgreSQL column types used by the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PgType {
    BigSerial,
    BigInt,
    Int,
    Text,
    Bool,
    Date,
    Timestamptz,
}

impl PgType {
    pub fn ddl(self) -> &'static str {
        match self {
            PgType::BigSerial => "BIGSERIAL",
            PgType::BigInt => "BIGINT",
            PgType::Int => "INTEGER",
            PgType::Text => "TEXT",
            PgType::Bool => "BOOLEAN",
            PgType::Date => "DATE",
            PgType::Timestamptz => "TIMESTAMPTZ",
        }
    }

    /// SQL cast appended to bind placeholders so parameters coerce to the
    /// column type regardless of how the JSON value was bound.
    pub fn cast(self) -> Option<&'static str> {
        match self {
            PgType::BigSerial | PgType::BigInt => Some("bigint"),
            PgType::Int => Some("integer"),
            PgType::Bool => Some("boolean"),
            PgType::Date => Some("date"),
            PgType::Timestamptz => Some("timestamptz"),
            PgType::Text => None,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, PgType::BigSerial | PgType::BigInt | PgType::Int)
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, PgType::Bool)
    }
}

#[derive(Clone, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub pg_type: PgType,
    pub nullable: bool,
    pub unique: bool,
    /// SQL default expression, verbatim in the DDL.
    pub default: Option<&'static str>,
}

/// Non-null column without default; builder methods relax from there.
pub fn col(name: &'static str, pg_type: PgType) -> ColumnDef {
    ColumnDef {
        name,
        pg_type,
        nullable: false,
        unique: false,
        default: None,
    }
}

impl ColumnDef {
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_expr(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self
    }
}

/// `created_at` / `updated_at` pair appended to every table.
pub fn timestamps() -> [ColumnDef; 2] {
    [
        col("created_at", PgType::Timestamptz).default_expr("NOW()"),
        col("updated_at", PgType::Timestamptz).default_expr("NOW()"),
    ]
}

/// Appends the timestamp pair to a column list.
pub fn with_timestamps(mut columns: Vec<ColumnDef>) -> Vec<ColumnDef> {
    columns.extend(timestamps());
    columns
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    /// Exact equality against the column.
    Equals,
    /// Case-insensitive substring match.
    Contains,
}

#[derive(Clone, Debug)]
pub struct FilterDef {
    pub param: &'static str,
    pub column: &'static str,
    pub kind: FilterKind,
}

pub fn filter(param: &'static str, column: &'static str) -> FilterDef {
    FilterDef {
        param,
        column,
        kind: FilterKind::Equals,
    }
}

pub fn contains_filter(param: &'static str, column: &'static str) -> FilterDef {
    FilterDef {
        param,
        column,
        kind: FilterKind::Contains,
    }
}

/// Per-field request validation rules.
#[derive(Clone, Debug, Default)]
pub struct FieldRule {
    pub field: &'static str,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<&'static str>,
    pub one_of: Option<&'static [&'static str]>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub integer: bool,
}

pub fn rule(field: &'static str) -> FieldRule {
    FieldRule {
        field,
        ..FieldRule::default()
    }
}

impl FieldRule {
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn pattern(mut self, re: &'static str) -> Self {
        self.pattern = Some(re);
        self
    }

    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.one_of = Some(values);
        self
    }

    pub fn min(mut self, n: f64) -> Self {
        self.minimum = Some(n);
        self
    }

    pub fn max(mut self, n: f64) -> Self {
        self.maximum = Some(n);
        self
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }
}

/// Foreign key to a parent entity's `id`, checked before insert/update and
/// declared in the DDL.
#[derive(Clone, Debug)]
pub struct ForeignKeyDef {
    pub column: &'static str,
    pub table: &'static str,
}

/// To-one relation embedded into list/show rows (single-query eager load).
#[derive(Clone, Debug)]
pub struct EmbedDef {
    /// JSON key for the embedded object.
    pub name: &'static str,
    pub fk_column: &'static str,
    /// Path segment of the related entity.
    pub related: &'static str,
}

/// Child rows that block deletion of a parent.
#[derive(Clone, Debug)]
pub struct ChildRef {
    pub table: &'static str,
    pub fk_column: &'static str,
    /// Human label used in the 422 message ("tags", "provinces").
    pub label: &'static str,
}

#[derive(Clone, Debug)]
pub struct TopSpec {
    pub by: &'static str,
    pub limit: u32,
}

/// Spec for the per-entity `statistics` endpoint.
#[derive(Clone, Debug)]
pub struct StatisticsDef {
    pub group_by: &'static str,
    pub numeric: Option<&'static str>,
    pub top: Option<TopSpec>,
}

#[derive(Clone, Debug)]
pub struct EntityDef {
    pub table: &'static str,
    pub path: &'static str,
    /// Present for entities with public slugs (dual id-or-slug lookup).
    pub slug_column: Option<&'static str>,
    pub columns: Vec<ColumnDef>,
    pub operations: &'static [Operation],
    pub filters: Vec<FilterDef>,
    pub search_columns: &'static [&'static str],
    pub sortable_columns: &'static [&'static str],
    pub rules: Vec<FieldRule>,
    pub foreign_keys: Vec<ForeignKeyDef>,
    pub embeds: Vec<EmbedDef>,
    pub restrict_delete: Vec<ChildRef>,
    /// Stripped from list/show responses (e.g. API key tokens).
    pub sensitive_columns: &'static [&'static str],
    /// Server-managed columns never taken from a request body.
    pub protected_columns: &'static [&'static str],
    /// Rows scoped to the authenticated user.
    pub owned: bool,
    pub statistics: Option<StatisticsDef>,
}

impl EntityDef {
    pub fn new(table: &'static str, path: &'static str) -> Self {
        EntityDef {
            table,
            path,
            slug_column: None,
            columns: Vec::new(),
            operations: ALL_OPERATIONS,
            filters: Vec::new(),
            search_columns: &[],
            sortable_columns: &[],
            rules: Vec::new(),
            foreign_keys: Vec::new(),
            embeds: Vec::new(),
            restrict_delete: Vec::new(),
            sensitive_columns: &[],
            protected_columns: &[],
            owned: false,
            statistics: None,
        }
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn rule(&self, field: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    /// Whether a body key may be written to this column.
    pub fn writable(&self, name: &str) -> bool {
        if name == PK_COLUMN
            || name == OWNER_COLUMN
            || name == "created_at"
            || name == "updated_at"
            || self.protected_columns.contains(&name)
        {
            return false;
        }
        self.has_column(name)
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.sensitive_columns.contains(&name)
    }
}
