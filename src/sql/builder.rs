//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and aggregate queries
//! from entity definitions. Identifiers come from the registry only; every
//! request value is a bind parameter with an explicit cast to the column type.

use crate::registry::{EmbedDef, EntityDef, FilterKind, PgType, OWNER_COLUMN, PK_COLUMN};
use serde_json::Value;
use std::collections::HashMap;

const MAIN_ALIAS: &str = "main";

/// Quote identifier for PostgreSQL (safe: only from the registry).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value, cast: Option<&str>) -> String {
        self.params.push(v);
        let n = self.params.len();
        match cast {
            Some(c) => format!("${}::{}", n, c),
            None => format!("${}", n),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One resolved list filter: column, typed value, match kind.
#[derive(Clone, Debug)]
pub struct Filter {
    pub column: String,
    pub value: Value,
    pub kind: FilterKind,
}

/// Everything needed to build a list page. Filters and sort column are
/// validated upstream against the entity definition.
#[derive(Clone, Debug)]
pub struct ListSelect {
    pub filters: Vec<Filter>,
    pub search: Option<String>,
    pub sort: String,
    pub direction: Direction,
    pub limit: u32,
    pub offset: u64,
    pub owner: Option<i64>,
}

/// To-one embed with the related entity resolved.
pub struct EmbedSelect<'a> {
    pub def: &'a EmbedDef,
    pub related: &'a EntityDef,
}

/// Record lookup key: plain numeric id, or id-or-slug for public entities.
#[derive(Clone, Debug)]
pub enum RecordKey {
    Id(i64),
    IdOrSlug { id: Option<i64>, slug: String },
}

/// Escape LIKE wildcards in a user-supplied search term.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn column_cast(entity: &EntityDef, column: &str) -> Option<&'static str> {
    entity.column(column).and_then(|c| c.pg_type.cast())
}

/// Column projection for the main table or an embed subquery. Sensitive
/// columns are always excluded from embeds; the service strips them from
/// main rows after fetching (create responses keep them once).
fn select_column_list(entity: &EntityDef, alias: Option<&str>, skip_sensitive: bool) -> String {
    entity
        .columns
        .iter()
        .filter(|c| !(skip_sensitive && entity.is_sensitive(c.name)))
        .map(|c| {
            let q = quoted(c.name);
            match alias {
                Some(a) => format!("{}.{}", a, q),
                None => q,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn embed_subquery(embed: &EmbedSelect<'_>) -> String {
    let rel_table = quoted(embed.related.table);
    let rel_cols = select_column_list(embed.related, None, true);
    format!(
        "(SELECT row_to_json(sub) FROM (SELECT {} FROM {} WHERE {}.{} = {}.{}) sub) AS {}",
        rel_cols,
        rel_table,
        rel_table,
        quoted(PK_COLUMN),
        MAIN_ALIAS,
        quoted(embed.def.fk_column),
        quoted(embed.def.name)
    )
}

/// Shared WHERE clause for list and count: AND of equality/contains filters,
/// OR-combined search block, and owner scope.
fn where_clause(entity: &EntityDef, sel: &ListSelect, q: &mut QueryBuf) -> String {
    let mut parts = Vec::new();
    for f in &sel.filters {
        let col = format!("{}.{}", MAIN_ALIAS, quoted(&f.column));
        match f.kind {
            FilterKind::Equals => {
                let ph = q.push_param(f.value.clone(), column_cast(entity, &f.column));
                parts.push(format!("{} = {}", col, ph));
            }
            FilterKind::Contains => {
                let term = f.value.as_str().unwrap_or_default();
                let ph = q.push_param(Value::String(format!("%{}%", escape_like(term))), None);
                parts.push(format!("{} ILIKE {}", col, ph));
            }
        }
    }
    if let Some(term) = sel.search.as_deref() {
        let pattern = format!("%{}%", escape_like(term));
        let mut search_parts = Vec::new();
        for col in entity.search_columns {
            let ph = q.push_param(Value::String(pattern.clone()), None);
            search_parts.push(format!("{}.{} ILIKE {}", MAIN_ALIAS, quoted(col), ph));
        }
        if !search_parts.is_empty() {
            parts.push(format!("({})", search_parts.join(" OR ")));
        }
    }
    if let Some(owner) = sel.owner {
        let ph = q.push_param(Value::Number(owner.into()), Some("bigint"));
        parts.push(format!("{}.{} = {}", MAIN_ALIAS, quoted(OWNER_COLUMN), ph));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// One page of rows with embeds, ordered by the requested column with the
/// primary key as tiebreak for a stable window.
pub fn select_page(entity: &EntityDef, sel: &ListSelect, embeds: &[EmbedSelect<'_>]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut select_parts = vec![select_column_list(entity, Some(MAIN_ALIAS), false)];
    for embed in embeds {
        select_parts.push(embed_subquery(embed));
    }
    let where_sql = where_clause(entity, sel, &mut q);
    let mut order = format!(
        " ORDER BY {}.{} {}",
        MAIN_ALIAS,
        quoted(&sel.sort),
        sel.direction.as_sql()
    );
    if sel.sort != PK_COLUMN {
        order.push_str(&format!(", {}.{} ASC", MAIN_ALIAS, quoted(PK_COLUMN)));
    }
    q.sql = format!(
        "SELECT {} FROM {} {}{}{} LIMIT {} OFFSET {}",
        select_parts.join(", "),
        quoted(entity.table),
        MAIN_ALIAS,
        where_sql,
        order,
        sel.limit,
        sel.offset
    );
    q
}

/// Filtered row count, independent of the page window.
pub fn count_rows(entity: &EntityDef, sel: &ListSelect) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(entity, sel, &mut q);
    q.sql = format!(
        "SELECT COUNT(*) FROM {} {}{}",
        quoted(entity.table),
        MAIN_ALIAS,
        where_sql
    );
    q
}

/// Single row by key with embeds. Id-or-slug keys match either column in one
/// OR query.
pub fn select_one(
    entity: &EntityDef,
    key: &RecordKey,
    owner: Option<i64>,
    embeds: &[EmbedSelect<'_>],
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut select_parts = vec![select_column_list(entity, Some(MAIN_ALIAS), false)];
    for embed in embeds {
        select_parts.push(embed_subquery(embed));
    }
    let key_sql = match key {
        RecordKey::Id(id) => {
            let ph = q.push_param(Value::Number((*id).into()), Some("bigint"));
            format!("{}.{} = {}", MAIN_ALIAS, quoted(PK_COLUMN), ph)
        }
        RecordKey::IdOrSlug { id, slug } => {
            let slug_col = entity.slug_column.unwrap_or("slug");
            match id {
                Some(id) => {
                    let id_ph = q.push_param(Value::Number((*id).into()), Some("bigint"));
                    let slug_ph = q.push_param(Value::String(slug.clone()), None);
                    format!(
                        "({}.{} = {} OR {}.{} = {})",
                        MAIN_ALIAS,
                        quoted(PK_COLUMN),
                        id_ph,
                        MAIN_ALIAS,
                        quoted(slug_col),
                        slug_ph
                    )
                }
                None => {
                    let ph = q.push_param(Value::String(slug.clone()), None);
                    format!("{}.{} = {}", MAIN_ALIAS, quoted(slug_col), ph)
                }
            }
        }
    };
    let owner_sql = match owner {
        Some(owner) => {
            let ph = q.push_param(Value::Number(owner.into()), Some("bigint"));
            format!(" AND {}.{} = {}", MAIN_ALIAS, quoted(OWNER_COLUMN), ph)
        }
        None => String::new(),
    };
    q.sql = format!(
        "SELECT {} FROM {} {} WHERE {}{}",
        select_parts.join(", "),
        quoted(entity.table),
        MAIN_ALIAS,
        key_sql,
        owner_sql
    );
    q
}

/// INSERT from body plus server-supplied values. Columns absent from both are
/// omitted so the database default applies. Returns the created row.
pub fn insert(
    entity: &EntityDef,
    body: &HashMap<String, Value>,
    extra: &[(&str, Value)],
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        if c.pg_type == PgType::BigSerial {
            continue;
        }
        let value = extra
            .iter()
            .find(|(name, _)| *name == c.name)
            .map(|(_, v)| v.clone())
            .or_else(|| {
                if entity.writable(c.name) {
                    body.get(c.name).cloned()
                } else {
                    None
                }
            });
        let Some(value) = value else { continue };
        let ph = q.push_param(value, c.pg_type.cast());
        cols.push(quoted(c.name));
        placeholders.push(ph);
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(entity.table),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(entity, None, false)
    );
    q
}

/// UPDATE by id: SET only writable columns present in body, always touching
/// `updated_at`. Returns the updated row, or no row when the id (or owner
/// scope) does not match.
pub fn update(
    entity: &EntityDef,
    id: i64,
    body: &HashMap<String, Value>,
    owner: Option<i64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &entity.columns {
        if !entity.writable(c.name) {
            continue;
        }
        if let Some(value) = body.get(c.name) {
            let ph = q.push_param(value.clone(), c.pg_type.cast());
            sets.push(format!("{} = {}", quoted(c.name), ph));
        }
    }
    sets.push(format!("{} = NOW()", quoted("updated_at")));
    let id_ph = q.push_param(Value::Number(id.into()), Some("bigint"));
    let mut where_sql = format!("{} = {}", quoted(PK_COLUMN), id_ph);
    if let Some(owner) = owner {
        let ph = q.push_param(Value::Number(owner.into()), Some("bigint"));
        where_sql.push_str(&format!(" AND {} = {}", quoted(OWNER_COLUMN), ph));
    }
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} RETURNING {}",
        quoted(entity.table),
        sets.join(", "),
        where_sql,
        select_column_list(entity, None, false)
    );
    q
}

/// Server-side column update for lifecycle transitions: sets the given
/// columns regardless of writability (they are protected from request
/// bodies, not from the application).
pub fn update_columns(
    entity: &EntityDef,
    id: i64,
    sets: &[(&str, Value)],
    owner: Option<i64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut set_parts = Vec::new();
    for (name, value) in sets {
        let cast = column_cast(entity, name);
        let ph = q.push_param(value.clone(), cast);
        set_parts.push(format!("{} = {}", quoted(name), ph));
    }
    set_parts.push(format!("{} = NOW()", quoted("updated_at")));
    let id_ph = q.push_param(Value::Number(id.into()), Some("bigint"));
    let mut where_sql = format!("{} = {}", quoted(PK_COLUMN), id_ph);
    if let Some(owner) = owner {
        let ph = q.push_param(Value::Number(owner.into()), Some("bigint"));
        where_sql.push_str(&format!(" AND {} = {}", quoted(OWNER_COLUMN), ph));
    }
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} RETURNING {}",
        quoted(entity.table),
        set_parts.join(", "),
        where_sql,
        select_column_list(entity, None, false)
    );
    q
}

/// DELETE by id, returning the id so the caller can distinguish a miss.
pub fn delete(entity: &EntityDef, id: i64, owner: Option<i64>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_ph = q.push_param(Value::Number(id.into()), Some("bigint"));
    let mut where_sql = format!("{} = {}", quoted(PK_COLUMN), id_ph);
    if let Some(owner) = owner {
        let ph = q.push_param(Value::Number(owner.into()), Some("bigint"));
        where_sql.push_str(&format!(" AND {} = {}", quoted(OWNER_COLUMN), ph));
    }
    q.sql = format!(
        "DELETE FROM {} WHERE {} RETURNING {}",
        quoted(entity.table),
        where_sql,
        quoted(PK_COLUMN)
    );
    q
}

/// EXISTS check for a unique column value, optionally excluding one row
/// (update path).
pub fn exists_unique(
    entity: &EntityDef,
    column: &str,
    value: &Value,
    exclude_id: Option<i64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(value.clone(), column_cast(entity, column));
    let mut where_sql = format!("{} = {}", quoted(column), ph);
    if let Some(id) = exclude_id {
        let id_ph = q.push_param(Value::Number(id.into()), Some("bigint"));
        where_sql.push_str(&format!(" AND {} <> {}", quoted(PK_COLUMN), id_ph));
    }
    q.sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
        quoted(entity.table),
        where_sql
    );
    q
}

/// EXISTS check for any row in `table` with `column = value`. Used for both
/// foreign-key existence and restrict-delete pre-checks.
pub fn exists_related(table: &str, column: &str, value: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(value.clone(), Some("bigint"));
    q.sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = {})",
        quoted(table),
        quoted(column),
        ph
    );
    q
}

pub fn count_all(entity: &EntityDef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT COUNT(*) FROM {}", quoted(entity.table));
    q
}

/// Counts grouped by one categorical column, most frequent first.
pub fn group_counts(entity: &EntityDef, column: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let col = quoted(column);
    q.sql = format!(
        "SELECT {}::text AS value, COUNT(*) AS count FROM {} GROUP BY {} ORDER BY count DESC, value ASC",
        col,
        quoted(entity.table),
        col
    );
    q
}

/// MIN/MAX/AVG over one numeric column, all as float8 for uniform decoding.
pub fn numeric_summary(entity: &EntityDef, column: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let col = quoted(column);
    q.sql = format!(
        "SELECT MIN({})::float8 AS min, MAX({})::float8 AS max, AVG({}::float8) AS avg FROM {}",
        col,
        col,
        col,
        quoted(entity.table)
    );
    q
}

/// Top-N rows by a numeric column, highest first.
pub fn top_rows(entity: &EntityDef, by: &str, limit: u32) -> QueryBuf {
    let mut q = QueryBuf::new();
    let col = quoted(by);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IS NOT NULL ORDER BY {} DESC, {} ASC LIMIT {}",
        select_column_list(entity, None, true),
        quoted(entity.table),
        col,
        col,
        quoted(PK_COLUMN),
        limit
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CatalogModel;
    use serde_json::json;

    fn model() -> CatalogModel {
        CatalogModel::builtin().unwrap()
    }

    fn plain_list() -> ListSelect {
        ListSelect {
            filters: Vec::new(),
            search: None,
            sort: PK_COLUMN.to_string(),
            direction: Direction::Asc,
            limit: 15,
            offset: 0,
            owner: None,
        }
    }

    #[test]
    fn list_filters_are_conjunctive_and_parameterized() {
        let model = model();
        let books = model.entity("books").unwrap();
        let mut sel = plain_list();
        sel.filters = vec![
            Filter {
                column: "genre".into(),
                value: json!("pintura"),
                kind: FilterKind::Equals,
            },
            Filter {
                column: "published_year".into(),
                value: json!(1998),
                kind: FilterKind::Equals,
            },
        ];
        let q = select_page(books, &sel, &[]);
        assert!(q.sql.contains("\"genre\" = $1"));
        assert!(q.sql.contains("\"published_year\" = $2::integer"));
        assert!(q.sql.contains(" AND "));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn search_is_or_combined_and_escaped() {
        let model = model();
        let books = model.entity("books").unwrap();
        let mut sel = plain_list();
        sel.search = Some("50%".into());
        let q = select_page(books, &sel, &[]);
        assert!(q.sql.contains("\"title\" ILIKE $1 OR"));
        assert!(q.sql.contains("\"author\" ILIKE $2"));
        assert_eq!(q.params[0], json!("%50\\%%"));
    }

    #[test]
    fn non_pk_sort_keeps_id_tiebreak() {
        let model = model();
        let books = model.entity("books").unwrap();
        let mut sel = plain_list();
        sel.sort = "title".into();
        sel.direction = Direction::Desc;
        let q = select_page(books, &sel, &[]);
        assert!(q.sql.contains("ORDER BY main.\"title\" DESC, main.\"id\" ASC"));
    }

    #[test]
    fn count_ignores_the_page_window() {
        let model = model();
        let books = model.entity("books").unwrap();
        let mut sel = plain_list();
        sel.limit = 5;
        sel.offset = 10;
        let q = count_rows(books, &sel);
        assert!(q.sql.starts_with("SELECT COUNT(*)"));
        assert!(!q.sql.contains("LIMIT"));
    }

    #[test]
    fn id_or_slug_lookup_matches_either_column() {
        let model = model();
        let awards = model.entity("awards").unwrap();
        let q = select_one(
            awards,
            &RecordKey::IdOrSlug {
                id: Some(7),
                slug: "7".into(),
            },
            None,
            &[],
        );
        assert!(q.sql.contains("\"id\" = $1::bigint OR main.\"slug\" = $2"));

        let q = select_one(
            awards,
            &RecordKey::IdOrSlug {
                id: None,
                slug: "premio-x".into(),
            },
            None,
            &[],
        );
        assert!(q.sql.contains("\"slug\" = $1"));
        assert!(!q.sql.contains("OR"));
    }

    #[test]
    fn owner_scope_is_applied_to_lookup_and_delete() {
        let model = model();
        let keys = model.entity("api-keys").unwrap();
        let q = select_one(keys, &RecordKey::Id(3), Some(9), &[]);
        assert!(q.sql.contains("\"user_id\" = $2::bigint"));
        let q = delete(keys, 3, Some(9));
        assert!(q.sql.contains("\"user_id\" = $2::bigint"));
        assert!(q.sql.contains("RETURNING \"id\""));
    }

    #[test]
    fn insert_prefers_server_values_and_skips_absent_defaults() {
        let model = model();
        let keys = model.entity("api-keys").unwrap();
        let body: HashMap<String, Value> = [
            ("name".to_string(), json!("ci")),
            // protected column in the body must be ignored
            ("token".to_string(), json!("forged")),
        ]
        .into_iter()
        .collect();
        let extra = [
            ("user_id", json!(4)),
            ("token", json!("f3c1e0d2-aaaa-bbbb-cccc-121212121212")),
        ];
        let q = insert(keys, &body, &extra);
        assert!(q.sql.contains("\"user_id\""));
        assert!(q.sql.contains("\"token\""));
        assert_eq!(q.params.len(), 3);
        assert!(q
            .params
            .contains(&json!("f3c1e0d2-aaaa-bbbb-cccc-121212121212")));
        assert!(!q.params.contains(&json!("forged")));
    }

    #[test]
    fn update_touches_updated_at_and_ignores_protected_keys() {
        let model = model();
        let subs = model.entity("user-subscriptions").unwrap();
        let body: HashMap<String, Value> =
            [("status".to_string(), json!("active"))].into_iter().collect();
        let q = update(subs, 1, &body, Some(2));
        assert!(!q.sql.contains("\"status\" = $"));
        assert!(q.sql.contains("\"updated_at\" = NOW()"));
    }

    #[test]
    fn unique_check_can_exclude_the_row_being_updated() {
        let model = model();
        let awards = model.entity("awards").unwrap();
        let q = exists_unique(awards, "slug", &json!("premio-x"), Some(12));
        assert!(q.sql.contains("\"slug\" = $1"));
        assert!(q.sql.contains("\"id\" <> $2::bigint"));
    }

    #[test]
    fn embeds_are_scalar_subqueries_on_the_related_pk() {
        let model = model();
        let provinces = model.entity("provinces").unwrap();
        let countries = model.entity("countries").unwrap();
        let embeds = [EmbedSelect {
            def: &provinces.embeds[0],
            related: countries,
        }];
        let q = select_one(provinces, &RecordKey::Id(1), None, &embeds);
        assert!(q.sql.contains("row_to_json"));
        assert!(q.sql.contains("\"countries\".\"id\" = main.\"country_id\""));
        assert!(q.sql.contains("AS \"country\""));
    }

    #[test]
    fn statistics_queries_group_and_bound() {
        let model = model();
        let books = model.entity("books").unwrap();
        let q = group_counts(books, "genre");
        assert!(q.sql.contains("GROUP BY \"genre\""));
        assert!(q.sql.contains("ORDER BY count DESC"));
        let q = numeric_summary(books, "pages");
        assert!(q.sql.contains("AVG(\"pages\"::float8)"));
        let q = top_rows(books, "pages", 5);
        assert!(q.sql.ends_with("LIMIT 5"));
        assert!(q.sql.contains("\"pages\" IS NOT NULL"));
    }
}
