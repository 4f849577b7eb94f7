//! Generic entity handlers: list, show, create, update, delete.
//!
//! One set of handlers serves every public entity in the registry; the path
//! segment selects the definition. Ownership-scoped entities have their own
//! handlers and never reach these.

use crate::error::{AppError, ValidationErrors};
use crate::registry::{
    CatalogModel, EntityDef, FilterDef, FilterKind, Operation, PgType, PK_COLUMN,
};
use crate::response::{Page, PageMeta, Resource};
use crate::service::{strip_sensitive, CatalogService, RequestValidator};
use crate::sql::{Direction, Filter, ListSelect, RecordKey};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

pub(crate) const DEFAULT_PER_PAGE: u32 = 15;
pub(crate) const MAX_PER_PAGE: u32 = 100;

/// Resolve a public (non-owned) entity or answer 404. Disabled operations
/// look the same as unknown resources.
pub(crate) fn public_entity<'a>(
    model: &'a CatalogModel,
    resource: &str,
    op: Operation,
) -> Result<&'a EntityDef, AppError> {
    let entity = model.entity(resource).ok_or(AppError::NotFound)?;
    if entity.owned || !entity.allows(op) {
        return Err(AppError::NotFound);
    }
    Ok(entity)
}

pub(crate) fn body_to_map(value: Value) -> Result<HashMap<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(AppError::BadRequest("Request body must be a JSON object.".into())),
    }
}

/// Path id for mutation endpoints: always numeric.
pub(crate) fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

/// Lookup key for show: id or slug for public-slug entities, numeric id
/// otherwise. A non-numeric id on an id-only entity cannot exist.
pub(crate) fn parse_key(entity: &EntityDef, raw: &str) -> Result<RecordKey, AppError> {
    if entity.slug_column.is_some() {
        Ok(RecordKey::IdOrSlug {
            id: raw.parse().ok(),
            slug: raw.to_string(),
        })
    } else {
        Ok(RecordKey::Id(parse_id(raw)?))
    }
}

fn parse_filter_value(entity: &EntityDef, f: &FilterDef, raw: &str) -> Result<Value, String> {
    if f.kind == FilterKind::Contains {
        return Ok(Value::String(raw.to_string()));
    }
    let pg_type = entity.column(f.column).map(|c| c.pg_type).unwrap_or(PgType::Text);
    match pg_type {
        PgType::BigSerial | PgType::BigInt | PgType::Int => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| format!("The {} must be an integer.", f.param)),
        PgType::Bool => match raw {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(format!("The {} field must be true or false.", f.param)),
        },
        PgType::Date => {
            if chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(format!("The {} is not a valid date.", f.param))
            }
        }
        PgType::Timestamptz => {
            if chrono::DateTime::parse_from_rfc3339(raw).is_ok() {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(format!("The {} is not a valid date.", f.param))
            }
        }
        PgType::Text => Ok(Value::String(raw.to_string())),
    }
}

#[derive(Debug)]
pub(crate) struct ListParams {
    pub page: u32,
    pub per_page: u32,
    pub select: ListSelect,
}

/// Parse pagination, sort, search, and declared filters. Any invalid value
/// fails the request with a 422 naming the offending parameter; unknown
/// parameters are ignored.
pub(crate) fn parse_list_params(
    entity: &EntityDef,
    params: &HashMap<String, String>,
    owner: Option<i64>,
) -> Result<ListParams, AppError> {
    let mut errors = ValidationErrors::new();

    let page = match params.get("page") {
        None => 1,
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => {
                errors.add("page", "The page must be a positive integer.");
                1
            }
        },
    };
    // Oversized per_page is clamped, not rejected.
    let per_page = match params.get("per_page") {
        None => DEFAULT_PER_PAGE,
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n >= 1 => n.min(MAX_PER_PAGE),
            _ => {
                errors.add("per_page", "The per_page must be a positive integer.");
                DEFAULT_PER_PAGE
            }
        },
    };
    let sort = match params.get("sort") {
        None => PK_COLUMN.to_string(),
        Some(s) if entity.sortable_columns.contains(&s.as_str()) => s.clone(),
        Some(_) => {
            errors.add("sort", "The selected sort is invalid.");
            PK_COLUMN.to_string()
        }
    };
    let direction = match params.get("direction").map(String::as_str) {
        None | Some("asc") => Direction::Asc,
        Some("desc") => Direction::Desc,
        Some(_) => {
            errors.add("direction", "The selected direction is invalid.");
            Direction::Asc
        }
    };
    let search = params
        .get("q")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut filters = Vec::new();
    for f in &entity.filters {
        if let Some(raw) = params.get(f.param) {
            match parse_filter_value(entity, f, raw) {
                Ok(value) => filters.push(Filter {
                    column: f.column.to_string(),
                    value,
                    kind: f.kind,
                }),
                Err(message) => errors.add(f.param, message),
            }
        }
    }
    errors.into_result()?;

    Ok(ListParams {
        page,
        per_page,
        select: ListSelect {
            filters,
            search,
            sort,
            direction,
            limit: per_page,
            offset: (page as u64 - 1) * per_page as u64,
            owner,
        },
    })
}

pub async fn list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Value>>, AppError> {
    let entity = public_entity(&state.model, &resource, Operation::List)?;
    let lp = parse_list_params(entity, &params, None)?;
    let (rows, total) = CatalogService::page(&state.pool, &state.model, entity, &lp.select).await?;
    Ok(Json(Page {
        data: rows,
        meta: PageMeta::new(lp.page, lp.per_page, total),
    }))
}

pub async fn show(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Resource<Value>>, AppError> {
    let entity = public_entity(&state.model, &resource, Operation::Show)?;
    let key = parse_key(entity, &id)?;
    let row = CatalogService::find(&state.pool, &state.model, entity, &key, None)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(Resource { data: row }))
}

pub async fn create(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Resource<Value>>), AppError> {
    let entity = public_entity(&state.model, &resource, Operation::Create)?;
    let body = body_to_map(body)?;
    let mut errors = RequestValidator::validate_create(entity, &body);
    if errors.is_empty() {
        errors.merge(CatalogService::check_constraints(&state.pool, entity, &body, None).await?);
    }
    errors.into_result()?;
    let mut row = CatalogService::create(&state.pool, entity, &body, &[]).await?;
    strip_sensitive(entity, &mut row);
    Ok((StatusCode::CREATED, Json(Resource { data: row })))
}

pub async fn update(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Resource<Value>>, AppError> {
    let entity = public_entity(&state.model, &resource, Operation::Update)?;
    let id = parse_id(&id)?;
    // Existence first: an unknown id is a 404 even with an invalid body.
    CatalogService::find(&state.pool, &state.model, entity, &RecordKey::Id(id), None)
        .await?
        .ok_or(AppError::NotFound)?;
    let body = body_to_map(body)?;
    let mut errors = RequestValidator::validate_update(entity, &body);
    if errors.is_empty() {
        errors
            .merge(CatalogService::check_constraints(&state.pool, entity, &body, Some(id)).await?);
    }
    errors.into_result()?;
    let mut row = CatalogService::update(&state.pool, entity, id, &body, None)
        .await?
        .ok_or(AppError::NotFound)?;
    strip_sensitive(entity, &mut row);
    Ok(Json(Resource { data: row }))
}

pub async fn destroy(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let entity = public_entity(&state.model, &resource, Operation::Delete)?;
    let id = parse_id(&id)?;
    CatalogService::check_restrict_delete(&state.pool, entity, id)
        .await?
        .into_result()?;
    if !CatalogService::delete(&state.pool, entity, id, None).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CatalogModel;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn model() -> CatalogModel {
        CatalogModel::builtin().unwrap()
    }

    #[test]
    fn defaults_apply_without_params() {
        let model = model();
        let books = model.entity("books").unwrap();
        let lp = parse_list_params(books, &params(&[]), None).unwrap();
        assert_eq!(lp.page, 1);
        assert_eq!(lp.per_page, DEFAULT_PER_PAGE);
        assert_eq!(lp.select.sort, "id");
        assert_eq!(lp.select.direction, Direction::Asc);
        assert!(lp.select.filters.is_empty());
    }

    #[test]
    fn per_page_is_clamped_to_the_maximum() {
        let model = model();
        let books = model.entity("books").unwrap();
        let lp = parse_list_params(books, &params(&[("per_page", "500")]), None).unwrap();
        assert_eq!(lp.per_page, MAX_PER_PAGE);
        assert_eq!(lp.select.limit, MAX_PER_PAGE);
    }

    #[test]
    fn offset_follows_the_page_number() {
        let model = model();
        let books = model.entity("books").unwrap();
        let lp =
            parse_list_params(books, &params(&[("page", "3"), ("per_page", "20")]), None).unwrap();
        assert_eq!(lp.select.offset, 40);
    }

    #[test]
    fn invalid_pagination_values_are_rejected() {
        let model = model();
        let books = model.entity("books").unwrap();
        for (k, v) in [("page", "0"), ("page", "abc"), ("per_page", "-2")] {
            let err = parse_list_params(books, &params(&[(k, v)]), None).unwrap_err();
            match err {
                AppError::Validation(errors) => assert!(errors.contains(k)),
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn declared_filters_parse_to_column_types() {
        let model = model();
        let books = model.entity("books").unwrap();
        let lp = parse_list_params(
            books,
            &params(&[("genre", "pintura"), ("published_year", "1998")]),
            None,
        )
        .unwrap();
        assert_eq!(lp.select.filters.len(), 2);
        let year = lp
            .select
            .filters
            .iter()
            .find(|f| f.column == "published_year")
            .unwrap();
        assert_eq!(year.value, json!(1998));
    }

    #[test]
    fn non_integer_filter_value_names_the_parameter() {
        let model = model();
        let books = model.entity("books").unwrap();
        let err =
            parse_list_params(books, &params(&[("published_year", "pintura")]), None).unwrap_err();
        match err {
            AppError::Validation(errors) => assert!(errors.contains("published_year")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn boolean_filters_accept_true_false_and_bits() {
        let model = model();
        let awards = model.entity("awards").unwrap();
        for (raw, expected) in [("true", true), ("1", true), ("false", false), ("0", false)] {
            let lp = parse_list_params(awards, &params(&[("active", raw)]), None).unwrap();
            assert_eq!(lp.select.filters[0].value, json!(expected));
        }
        assert!(parse_list_params(awards, &params(&[("active", "yes")]), None).is_err());
    }

    #[test]
    fn unknown_params_are_ignored() {
        let model = model();
        let books = model.entity("books").unwrap();
        let lp = parse_list_params(books, &params(&[("flavour", "salado")]), None).unwrap();
        assert!(lp.select.filters.is_empty());
    }

    #[test]
    fn unknown_sort_column_is_rejected() {
        let model = model();
        let books = model.entity("books").unwrap();
        assert!(parse_list_params(books, &params(&[("sort", "genre")]), None).is_err());
        assert!(parse_list_params(books, &params(&[("sort", "title")]), None).is_ok());
        assert!(
            parse_list_params(books, &params(&[("direction", "sideways")]), None).is_err()
        );
    }

    #[test]
    fn blank_search_is_dropped() {
        let model = model();
        let books = model.entity("books").unwrap();
        let lp = parse_list_params(books, &params(&[("q", "  ")]), None).unwrap();
        assert!(lp.select.search.is_none());
        let lp = parse_list_params(books, &params(&[("q", " sol ")]), None).unwrap();
        assert_eq!(lp.select.search.as_deref(), Some("sol"));
    }

    #[test]
    fn slug_entities_accept_id_or_slug_keys() {
        let model = model();
        let awards = model.entity("awards").unwrap();
        match parse_key(awards, "premio-x").unwrap() {
            RecordKey::IdOrSlug { id: None, slug } => assert_eq!(slug, "premio-x"),
            other => panic!("unexpected key {:?}", other),
        }
        match parse_key(awards, "42").unwrap() {
            RecordKey::IdOrSlug { id: Some(42), .. } => {}
            other => panic!("unexpected key {:?}", other),
        }
    }

    #[test]
    fn id_only_entities_reject_non_numeric_keys_as_not_found() {
        let model = model();
        let currencies = model.entity("currencies").unwrap();
        assert!(matches!(parse_key(currencies, "42"), Ok(RecordKey::Id(42))));
        assert!(matches!(
            parse_key(currencies, "eur"),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn owned_entities_are_invisible_to_public_handlers() {
        let model = model();
        assert!(matches!(
            public_entity(&model, "api-keys", Operation::List),
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            public_entity(&model, "no-such", Operation::List),
            Err(AppError::NotFound)
        ));
        assert!(public_entity(&model, "books", Operation::List).is_ok());
    }
}
