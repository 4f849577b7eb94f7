//! Built-in entity catalog.
//!
//! Each entry is one declarative definition; the generic handlers, SQL
//! builder, validator, and migrations all run off this data. Adding an
//! entity here is the whole job of exposing it over the API.

use super::types::*;

pub const AWARD_CATEGORIES: &[&str] = &["nacional", "internacional", "regional"];
pub const BOOK_GENRES: &[&str] = &[
    "novela",
    "poesia",
    "ensayo",
    "cuento",
    "historia",
    "pintura",
    "biografia",
];
pub const VENUE_KINDS: &[&str] = &["teatro", "museo", "galeria", "auditorio", "biblioteca"];
pub const ACHIEVEMENT_CATEGORIES: &[&str] =
    &["premio", "reconocimiento", "record", "publicacion"];
pub const ANNIVERSARY_CATEGORIES: &[&str] =
    &["nacimiento", "fallecimiento", "acontecimiento"];
pub const NEWS_SOURCE_KINDS: &[&str] = &["periodico", "radio", "television", "digital"];
pub const PLAN_PERIODS: &[&str] = &["monthly", "yearly"];

/// kebab-case, lowercase alphanumeric segments.
pub const SLUG_PATTERN: &str = "^[a-z0-9]+(?:-[a-z0-9]+)*$";

/// Resources whose contract is undefined in the source system; every method
/// answers 501 until a real contract exists.
pub const STUB_RESOURCES: &[&str] = &[
    "book-reviews",
    "festival-schedules",
    "social-entities",
    "trending-topics",
    "notification-settings",
];

fn id_column() -> ColumnDef {
    col(PK_COLUMN, PgType::BigSerial)
}

fn slug_rules(field: &'static str, max: usize) -> FieldRule {
    rule(field).required().max_length(max).pattern(SLUG_PATTERN)
}

fn countries() -> EntityDef {
    EntityDef {
        slug_column: Some("slug"),
        columns: with_timestamps(vec![
            id_column(),
            col("name", PgType::Text),
            col("slug", PgType::Text).unique(),
            col("iso_code", PgType::Text).unique(),
            col("active", PgType::Bool).default_expr("TRUE"),
        ]),
        filters: vec![filter("active", "active")],
        search_columns: &["name"],
        sortable_columns: &["id", "name"],
        rules: vec![
            rule("name").required().max_length(150),
            slug_rules("slug", 150),
            rule("iso_code").required().min_length(2).max_length(3).pattern("^[A-Z]{2,3}$"),
        ],
        restrict_delete: vec![ChildRef {
            table: "provinces",
            fk_column: "country_id",
            label: "provinces",
        }],
        ..EntityDef::new("countries", "countries")
    }
}

fn provinces() -> EntityDef {
    EntityDef {
        slug_column: Some("slug"),
        columns: with_timestamps(vec![
            id_column(),
            col("name", PgType::Text),
            col("slug", PgType::Text).unique(),
            col("code", PgType::Text).nullable(),
            col("country_id", PgType::BigInt),
            col("active", PgType::Bool).default_expr("TRUE"),
        ]),
        filters: vec![filter("country_id", "country_id"), filter("active", "active")],
        search_columns: &["name"],
        sortable_columns: &["id", "name"],
        rules: vec![
            rule("name").required().max_length(150),
            slug_rules("slug", 150),
            rule("code").max_length(10),
            rule("country_id").required().integer().min(1.0),
        ],
        foreign_keys: vec![ForeignKeyDef {
            column: "country_id",
            table: "countries",
        }],
        embeds: vec![EmbedDef {
            name: "country",
            fk_column: "country_id",
            related: "countries",
        }],
        restrict_delete: vec![ChildRef {
            table: "municipalities",
            fk_column: "province_id",
            label: "municipalities",
        }],
        ..EntityDef::new("provinces", "provinces")
    }
}

fn municipalities() -> EntityDef {
    EntityDef {
        slug_column: Some("slug"),
        columns: with_timestamps(vec![
            id_column(),
            col("name", PgType::Text),
            col("slug", PgType::Text).unique(),
            col("province_id", PgType::BigInt),
            col("population", PgType::Int).nullable(),
        ]),
        filters: vec![filter("province_id", "province_id")],
        search_columns: &["name"],
        sortable_columns: &["id", "name", "population"],
        rules: vec![
            rule("name").required().max_length(150),
            slug_rules("slug", 150),
            rule("province_id").required().integer().min(1.0),
            rule("population").integer().min(0.0),
        ],
        foreign_keys: vec![ForeignKeyDef {
            column: "province_id",
            table: "provinces",
        }],
        embeds: vec![EmbedDef {
            name: "province",
            fk_column: "province_id",
            related: "provinces",
        }],
        restrict_delete: vec![
            ChildRef {
                table: "venues",
                fk_column: "municipality_id",
                label: "venues",
            },
            ChildRef {
                table: "parishes",
                fk_column: "municipality_id",
                label: "parishes",
            },
        ],
        ..EntityDef::new("municipalities", "municipalities")
    }
}

fn currencies() -> EntityDef {
    EntityDef {
        columns: with_timestamps(vec![
            id_column(),
            col("name", PgType::Text),
            col("code", PgType::Text).unique(),
            col("symbol", PgType::Text).nullable(),
            col("active", PgType::Bool).default_expr("TRUE"),
        ]),
        filters: vec![filter("active", "active")],
        search_columns: &["name", "code"],
        sortable_columns: &["id", "name", "code"],
        rules: vec![
            rule("name").required().max_length(100),
            rule("code").required().min_length(3).max_length(3).pattern("^[A-Z]{3}$"),
            rule("symbol").max_length(8),
        ],
        ..EntityDef::new("currencies", "currencies")
    }
}

fn awards() -> EntityDef {
    EntityDef {
        slug_column: Some("slug"),
        columns: with_timestamps(vec![
            id_column(),
            col("name", PgType::Text),
            col("slug", PgType::Text).unique(),
            col("category", PgType::Text).nullable(),
            col("year", PgType::Int).nullable(),
            col("active", PgType::Bool).default_expr("TRUE"),
        ]),
        filters: vec![
            filter("category", "category"),
            filter("year", "year"),
            filter("active", "active"),
        ],
        search_columns: &["name"],
        sortable_columns: &["id", "name", "year"],
        rules: vec![
            rule("name").required().max_length(200),
            slug_rules("slug", 200),
            rule("category").one_of(AWARD_CATEGORIES),
            rule("year").integer().min(1800.0).max(2100.0),
        ],
        ..EntityDef::new("awards", "awards")
    }
}

fn books() -> EntityDef {
    EntityDef {
        slug_column: Some("slug"),
        columns: with_timestamps(vec![
            id_column(),
            col("title", PgType::Text),
            col("slug", PgType::Text).unique(),
            col("author", PgType::Text),
            col("genre", PgType::Text),
            col("pages", PgType::Int).nullable(),
            col("published_year", PgType::Int).nullable(),
            col("publisher", PgType::Text).nullable(),
        ]),
        filters: vec![
            filter("genre", "genre"),
            filter("published_year", "published_year"),
            contains_filter("publisher", "publisher"),
        ],
        search_columns: &["title", "author"],
        sortable_columns: &["id", "title", "published_year", "pages"],
        rules: vec![
            rule("title").required().max_length(250),
            slug_rules("slug", 250),
            rule("author").required().max_length(200),
            rule("genre").required().one_of(BOOK_GENRES),
            rule("pages").integer().min(1.0),
            rule("published_year").integer().min(1000.0).max(2100.0),
            rule("publisher").max_length(200),
        ],
        statistics: Some(StatisticsDef {
            group_by: "genre",
            numeric: Some("pages"),
            top: Some(TopSpec {
                by: "pages",
                limit: 5,
            }),
        }),
        ..EntityDef::new("books", "books")
    }
}

fn venues() -> EntityDef {
    EntityDef {
        slug_column: Some("slug"),
        columns: with_timestamps(vec![
            id_column(),
            col("name", PgType::Text),
            col("slug", PgType::Text).unique(),
            col("kind", PgType::Text),
            col("municipality_id", PgType::BigInt).nullable(),
            col("capacity", PgType::Int).nullable(),
            col("active", PgType::Bool).default_expr("TRUE"),
        ]),
        filters: vec![
            filter("kind", "kind"),
            filter("municipality_id", "municipality_id"),
            filter("active", "active"),
        ],
        search_columns: &["name"],
        sortable_columns: &["id", "name", "capacity"],
        rules: vec![
            rule("name").required().max_length(200),
            slug_rules("slug", 200),
            rule("kind").required().one_of(VENUE_KINDS),
            rule("municipality_id").integer().min(1.0),
            rule("capacity").integer().min(1.0),
        ],
        foreign_keys: vec![ForeignKeyDef {
            column: "municipality_id",
            table: "municipalities",
        }],
        embeds: vec![EmbedDef {
            name: "municipality",
            fk_column: "municipality_id",
            related: "municipalities",
        }],
        ..EntityDef::new("venues", "venues")
    }
}

fn achievements() -> EntityDef {
    EntityDef {
        columns: with_timestamps(vec![
            id_column(),
            col("title", PgType::Text),
            col("person_name", PgType::Text),
            col("category", PgType::Text),
            col("achieved_on", PgType::Date).nullable(),
            col("description", PgType::Text).nullable(),
        ]),
        filters: vec![
            filter("category", "category"),
            contains_filter("person", "person_name"),
        ],
        search_columns: &["title", "person_name"],
        sortable_columns: &["id", "title", "achieved_on"],
        rules: vec![
            rule("title").required().max_length(250),
            rule("person_name").required().max_length(200),
            rule("category").required().one_of(ACHIEVEMENT_CATEGORIES),
            rule("description").max_length(2000),
        ],
        ..EntityDef::new("achievements", "achievements")
    }
}

fn tag_groups() -> EntityDef {
    EntityDef {
        slug_column: Some("slug"),
        columns: with_timestamps(vec![
            id_column(),
            col("name", PgType::Text),
            col("slug", PgType::Text).unique(),
            col("description", PgType::Text).nullable(),
        ]),
        search_columns: &["name"],
        sortable_columns: &["id", "name"],
        rules: vec![
            rule("name").required().max_length(100),
            slug_rules("slug", 100),
            rule("description").max_length(500),
        ],
        restrict_delete: vec![ChildRef {
            table: "tags",
            fk_column: "tag_group_id",
            label: "tags",
        }],
        ..EntityDef::new("tag_groups", "tag-groups")
    }
}

fn tags() -> EntityDef {
    EntityDef {
        slug_column: Some("slug"),
        columns: with_timestamps(vec![
            id_column(),
            col("name", PgType::Text),
            col("slug", PgType::Text).unique(),
            col("tag_group_id", PgType::BigInt),
        ]),
        filters: vec![filter("tag_group_id", "tag_group_id")],
        search_columns: &["name"],
        sortable_columns: &["id", "name"],
        rules: vec![
            rule("name").required().max_length(100),
            slug_rules("slug", 100),
            rule("tag_group_id").required().integer().min(1.0),
        ],
        foreign_keys: vec![ForeignKeyDef {
            column: "tag_group_id",
            table: "tag_groups",
        }],
        embeds: vec![EmbedDef {
            name: "tag_group",
            fk_column: "tag_group_id",
            related: "tag-groups",
        }],
        ..EntityDef::new("tags", "tags")
    }
}

fn daily_anniversaries() -> EntityDef {
    EntityDef {
        columns: with_timestamps(vec![
            id_column(),
            col("title", PgType::Text),
            col("category", PgType::Text),
            col("month", PgType::Int),
            col("day", PgType::Int),
            col("year", PgType::Int).nullable(),
            col("active", PgType::Bool).default_expr("TRUE"),
        ]),
        filters: vec![filter("category", "category"), filter("month", "month")],
        search_columns: &["title"],
        sortable_columns: &["id", "month", "day"],
        rules: vec![
            rule("title").required().max_length(250),
            rule("category").required().one_of(ANNIVERSARY_CATEGORIES),
            rule("month").required().integer().min(1.0).max(12.0),
            rule("day").required().integer().min(1.0).max(31.0),
            rule("year").integer().min(1.0).max(2100.0),
        ],
        statistics: Some(StatisticsDef {
            group_by: "category",
            numeric: None,
            top: None,
        }),
        ..EntityDef::new("daily_anniversaries", "daily-anniversaries")
    }
}

fn parishes() -> EntityDef {
    EntityDef {
        slug_column: Some("slug"),
        columns: with_timestamps(vec![
            id_column(),
            col("name", PgType::Text),
            col("slug", PgType::Text).unique(),
            col("municipality_id", PgType::BigInt).nullable(),
            col("founded_year", PgType::Int).nullable(),
        ]),
        filters: vec![filter("municipality_id", "municipality_id")],
        search_columns: &["name"],
        sortable_columns: &["id", "name", "founded_year"],
        rules: vec![
            rule("name").required().max_length(200),
            slug_rules("slug", 200),
            rule("municipality_id").integer().min(1.0),
            rule("founded_year").integer().min(1500.0).max(2100.0),
        ],
        foreign_keys: vec![ForeignKeyDef {
            column: "municipality_id",
            table: "municipalities",
        }],
        embeds: vec![EmbedDef {
            name: "municipality",
            fk_column: "municipality_id",
            related: "municipalities",
        }],
        statistics: Some(StatisticsDef {
            group_by: "municipality_id",
            numeric: Some("founded_year"),
            top: Some(TopSpec {
                by: "founded_year",
                limit: 5,
            }),
        }),
        ..EntityDef::new("parishes", "parishes")
    }
}

fn news_sources() -> EntityDef {
    EntityDef {
        slug_column: Some("slug"),
        columns: with_timestamps(vec![
            id_column(),
            col("name", PgType::Text),
            col("slug", PgType::Text).unique(),
            col("kind", PgType::Text),
            col("url", PgType::Text).nullable(),
            col("active", PgType::Bool).default_expr("TRUE"),
        ]),
        filters: vec![filter("kind", "kind"), filter("active", "active")],
        search_columns: &["name"],
        sortable_columns: &["id", "name"],
        rules: vec![
            rule("name").required().max_length(200),
            slug_rules("slug", 200),
            rule("kind").required().one_of(NEWS_SOURCE_KINDS),
            rule("url").max_length(300),
        ],
        statistics: Some(StatisticsDef {
            group_by: "kind",
            numeric: None,
            top: None,
        }),
        ..EntityDef::new("news_sources", "news-sources")
    }
}

fn subscription_plans() -> EntityDef {
    EntityDef {
        slug_column: Some("slug"),
        columns: with_timestamps(vec![
            id_column(),
            col("name", PgType::Text),
            col("slug", PgType::Text).unique(),
            col("price_cents", PgType::Int),
            col("currency_code", PgType::Text),
            col("period", PgType::Text),
            col("trial_days", PgType::Int).default_expr("0"),
            col("active", PgType::Bool).default_expr("TRUE"),
        ]),
        filters: vec![filter("period", "period"), filter("active", "active")],
        search_columns: &["name"],
        sortable_columns: &["id", "name", "price_cents"],
        rules: vec![
            rule("name").required().max_length(150),
            slug_rules("slug", 150),
            rule("price_cents").required().integer().min(0.0),
            rule("currency_code").required().pattern("^[A-Z]{3}$"),
            rule("period").required().one_of(PLAN_PERIODS),
            rule("trial_days").integer().min(0.0).max(365.0),
        ],
        restrict_delete: vec![ChildRef {
            table: "user_subscriptions",
            fk_column: "plan_id",
            label: "subscriptions",
        }],
        ..EntityDef::new("subscription_plans", "subscription-plans")
    }
}

fn api_keys() -> EntityDef {
    EntityDef {
        columns: with_timestamps(vec![
            id_column(),
            col(OWNER_COLUMN, PgType::BigInt),
            col("name", PgType::Text),
            col("token", PgType::Text).unique(),
            col("active", PgType::Bool).default_expr("TRUE"),
            col("last_used_at", PgType::Timestamptz).nullable(),
        ]),
        filters: vec![filter("active", "active")],
        search_columns: &["name"],
        sortable_columns: &["id", "name"],
        rules: vec![rule("name").required().max_length(100)],
        sensitive_columns: &["token"],
        protected_columns: &["token", "last_used_at"],
        owned: true,
        ..EntityDef::new("api_keys", "api-keys")
    }
}

fn user_subscriptions() -> EntityDef {
    EntityDef {
        columns: with_timestamps(vec![
            id_column(),
            col(OWNER_COLUMN, PgType::BigInt),
            col("plan_id", PgType::BigInt),
            col("status", PgType::Text),
            col("trial_ends_at", PgType::Timestamptz).nullable(),
            col("current_period_end", PgType::Timestamptz).nullable(),
            col("cancelled_at", PgType::Timestamptz).nullable(),
            col("ends_at", PgType::Timestamptz).nullable(),
        ]),
        operations: &[Operation::List, Operation::Show, Operation::Create],
        filters: vec![filter("status", "status")],
        sortable_columns: &["id"],
        rules: vec![rule("plan_id").required().integer().min(1.0)],
        foreign_keys: vec![ForeignKeyDef {
            column: "plan_id",
            table: "subscription_plans",
        }],
        embeds: vec![EmbedDef {
            name: "plan",
            fk_column: "plan_id",
            related: "subscription-plans",
        }],
        protected_columns: &[
            "status",
            "trial_ends_at",
            "current_period_end",
            "cancelled_at",
            "ends_at",
        ],
        owned: true,
        ..EntityDef::new("user_subscriptions", "user-subscriptions")
    }
}

/// The full catalog, in dependency order (parents before children so the
/// migration can add foreign keys as it goes).
pub fn builtin() -> Vec<EntityDef> {
    vec![
        countries(),
        provinces(),
        municipalities(),
        currencies(),
        awards(),
        books(),
        venues(),
        achievements(),
        tag_groups(),
        tags(),
        daily_anniversaries(),
        parishes(),
        news_sources(),
        subscription_plans(),
        api_keys(),
        user_subscriptions(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_internally_consistent() {
        let entities = builtin();
        super::super::validator::validate(&entities).unwrap();
    }

    #[test]
    fn slug_entities_declare_a_unique_slug_column() {
        for entity in builtin() {
            if let Some(slug) = entity.slug_column {
                let column = entity.column(slug).unwrap();
                assert!(column.unique, "{} slug column must be unique", entity.path);
            }
        }
    }

    #[test]
    fn owned_entities_carry_the_owner_column() {
        for entity in builtin() {
            if entity.owned {
                assert!(entity.has_column(OWNER_COLUMN), "{}", entity.path);
            }
        }
    }

    #[test]
    fn stub_resources_do_not_collide_with_real_entities() {
        let entities = builtin();
        for stub in STUB_RESOURCES {
            assert!(entities.iter().all(|e| e.path != *stub));
        }
    }
}
