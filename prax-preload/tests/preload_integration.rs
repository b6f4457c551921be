//! End-to-end preloading against the in-memory engine.

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use prax_preload::prelude::*;
use prax_preload::{ErrorCode, MemoryEngine, PreloadConfig, RelationType};

fn catalog() -> Catalog {
    Catalog::new()
        .with(
            ModelMeta::new("User", "users")
                .columns(["id", "name", "email", "type"])
                .discriminator("type")
                .relation(RelationSpec::one_to_many("posts", "Post").foreign_key("author_id"))
                .relation(RelationSpec::one_to_one("profile", "Profile")),
        )
        .with(
            ModelMeta::subtype("Admin", "User")
                .columns(["clearance"])
                .relation(
                    RelationSpec::one_to_many("audit_logs", "AuditLog").foreign_key("user_id"),
                ),
        )
        .with(
            ModelMeta::new("Post", "posts")
                .columns(["id", "author_id", "title", "body", "published"])
                .relation(RelationSpec::many_to_one("author", "User"))
                .relation(RelationSpec::one_to_many("comments", "Comment"))
                .relation(
                    RelationSpec::one_to_many("approved_comments", "Comment").scope(
                        RelationScope::new()
                            .r#where(Filter::equals("approved", true))
                            .order_by(OrderByField::desc("id")),
                    ),
                ),
        )
        .with(
            ModelMeta::new("Comment", "comments")
                .columns(["id", "post_id", "owner_id", "body", "approved", "ip"])
                .relation(RelationSpec::many_to_one("owner", "User")),
        )
        .with(ModelMeta::new("Profile", "profiles").columns(["id", "user_id", "bio", "avatar"]))
        .with(ModelMeta::new("AuditLog", "audit_logs").columns(["id", "user_id", "action"]))
}

fn engine() -> MemoryEngine {
    MemoryEngine::new()
        .with_table("users", ["id", "name", "email", "type", "clearance"])
        .with_table("posts", ["id", "author_id", "title", "body", "published"])
        .with_table("comments", ["id", "post_id", "owner_id", "body", "approved", "ip"])
        .with_table("profiles", ["id", "user_id", "bio", "avatar"])
        .with_table("audit_logs", ["id", "user_id", "action"])
}

fn seeded() -> QueryBuilder<MemoryEngine> {
    let engine = engine();
    engine
        .insert_many(
            "users",
            [
                row! {"id" => 1, "name" => "Ada", "email" => "ada@example.com", "type" => "User"},
                row! {"id" => 2, "name" => "Grace", "email" => "grace@example.com", "type" => "Admin", "clearance" => 3},
                row! {"id" => 3, "name" => "Linus", "email" => "linus@example.com", "type" => "User"},
            ],
        )
        .unwrap();
    engine
        .insert_many(
            "posts",
            [
                row! {"id" => 10, "author_id" => 1, "title" => "Hello", "body" => "...", "published" => true},
                row! {"id" => 11, "author_id" => 2, "title" => "Draft", "body" => "...", "published" => false},
                row! {"id" => 12, "author_id" => FilterValue::Null, "title" => "Orphan", "body" => "...", "published" => true},
                row! {"id" => 13, "author_id" => 99, "title" => "Dangling", "body" => "...", "published" => true},
            ],
        )
        .unwrap();
    engine
        .insert_many(
            "comments",
            [
                row! {"id" => 100, "post_id" => 10, "owner_id" => 3, "body" => "first", "approved" => true, "ip" => "10.0.0.1"},
                row! {"id" => 101, "post_id" => 10, "owner_id" => 2, "body" => "spam", "approved" => false, "ip" => "10.0.0.2"},
                row! {"id" => 102, "post_id" => 10, "owner_id" => 1, "body" => "thanks", "approved" => true, "ip" => "10.0.0.3"},
                row! {"id" => 103, "post_id" => 11, "owner_id" => 3, "body" => "soon?", "approved" => true, "ip" => "10.0.0.4"},
            ],
        )
        .unwrap();
    engine
        .insert("profiles", row! {"id" => 7, "user_id" => 1, "bio" => "Countess", "avatar" => "ada.png"})
        .unwrap();
    engine
        .insert_many(
            "audit_logs",
            [
                row! {"id" => 1, "user_id" => 2, "action" => "login"},
                row! {"id" => 2, "user_id" => 2, "action" => "grant"},
            ],
        )
        .unwrap();
    QueryBuilder::new(engine, catalog())
}

fn field_set(record: &Record) -> BTreeSet<&str> {
    record.field_names().collect()
}

fn set<'a>(names: impl IntoIterator<Item = &'a str>) -> BTreeSet<&'a str> {
    names.into_iter().collect()
}

#[tokio::test]
async fn test_query_count_independent_of_batch_size() {
    for n in [0_i64, 1, 1000] {
        let engine = engine();
        engine
            .insert_many(
                "users",
                (1..=n).map(|id| {
                    row! {"id" => id, "name" => format!("user {id}"), "email" => "", "type" => "User"}
                }),
            )
            .unwrap();
        engine
            .insert_many(
                "posts",
                (1..=n).map(|id| {
                    row! {"id" => id, "author_id" => id, "title" => "t", "body" => "b", "published" => true}
                }),
            )
            .unwrap();
        engine
            .insert_many(
                "comments",
                (1..=n).map(|id| {
                    row! {"id" => id, "post_id" => id, "owner_id" => id, "body" => "c", "approved" => true, "ip" => ""}
                }),
            )
            .unwrap();
        let client = QueryBuilder::new(engine, catalog());

        let users = client
            .find_many("User")
            .with_columns(ColumnSpecs::new().relation("posts", ["title"]))
            .unwrap()
            .exec()
            .await
            .unwrap();
        assert_eq!(users.len() as i64, n);
        let expected = if n == 0 { 1 } else { 2 };
        assert_eq!(client.engine().query_count(), expected, "one level, n = {n}");

        client.engine().clear_log();
        let users = client
            .find_many("User")
            .with_columns(ColumnSpecs::new().relation(
                "posts",
                ColumnSpec::columns(["title"])
                    .include("comments", ColumnSpec::columns(["body"]).include("owner", ["name"])),
            ))
            .unwrap()
            .exec()
            .await
            .unwrap();
        let expected = if n == 0 { 1 } else { 4 };
        assert_eq!(client.engine().query_count(), expected, "three levels, n = {n}");
        if let Some(last) = users.last() {
            let post = &last.many("posts")[0];
            let owner = post.many("comments")[0].one("owner").unwrap();
            assert_eq!(owner.value("id"), last.value("id"));
        }
    }
}

#[tokio::test]
async fn test_whitelist_exact_field_set() {
    let client = seeded();
    let posts = client
        .find_many("Post")
        .r#where(Filter::equals("id", 10))
        .with_columns(ColumnSpecs::new().relation("comments", ["body", "body"]))
        .unwrap()
        .exec()
        .await
        .unwrap();

    let comments = posts[0].many("comments");
    assert_eq!(comments.len(), 3);
    for comment in comments {
        assert_eq!(field_set(comment), set(["id", "post_id", "body"]));
    }
}

#[tokio::test]
async fn test_blacklist_keeps_required_keys() {
    let client = seeded();
    let posts = client
        .find_many("Post")
        .r#where(Filter::equals("id", 10))
        .without_columns(
            ColumnSpecs::new().relation("comments", ["id", "post_id", "ip", "approved"]),
        )
        .unwrap()
        .exec()
        .await
        .unwrap();

    for comment in posts[0].many("comments") {
        assert_eq!(field_set(comment), set(["id", "post_id", "owner_id", "body"]));
    }
}

#[tokio::test]
async fn test_nested_foreign_key_inference() {
    let client = seeded();
    let posts = client
        .find_many("Post")
        .r#where(Filter::equals("id", 10))
        .with_columns(ColumnSpecs::new().relation(
            "comments",
            ColumnSpec::columns(["body"]).include("owner", ["name"]),
        ))
        .unwrap()
        .exec()
        .await
        .unwrap();

    let comment = &posts[0].many("comments")[0];
    assert!(comment.get("owner_id").is_some());
    assert_eq!(
        comment.one("owner").map(|u| u.value("name").clone()),
        Some(FilterValue::from("Linus"))
    );
}

#[tokio::test]
async fn test_many_to_one_null_and_dangling_keys() {
    let client = seeded();
    let posts = client
        .find_many("Post")
        .order_by(OrderByField::asc("id"))
        .with_columns(ColumnSpecs::new().relation("author", ["name"]))
        .unwrap()
        .exec()
        .await
        .unwrap();

    let authors: Vec<Option<&FilterValue>> = posts
        .iter()
        .map(|p| p.one("author").map(|a| a.value("name")))
        .collect();
    assert_eq!(
        authors,
        vec![
            Some(&FilterValue::from("Ada")),
            Some(&FilterValue::from("Grace")),
            None,
            None,
        ]
    );
    assert!(posts.iter().all(|p| p.is_loaded("author")));

    let queries = client.engine().queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(
        queries[1].filter,
        Filter::In(
            "id".into(),
            vec![FilterValue::Int(1), FilterValue::Int(2), FilterValue::Int(99)]
        )
    );
}

#[tokio::test]
async fn test_scope_composes_with_projection() {
    let client = seeded();
    let posts = client
        .find_many("Post")
        .r#where(Filter::in_list("id", [10.into(), 11.into()]))
        .order_by(OrderByField::asc("id"))
        .with_columns(ColumnSpecs::new().relation("approved_comments", ["body"]))
        .unwrap()
        .exec()
        .await
        .unwrap();

    let bodies: Vec<Vec<&FilterValue>> = posts
        .iter()
        .map(|p| p.many("approved_comments").iter().map(|c| c.value("body")).collect())
        .collect();
    assert_eq!(
        bodies,
        vec![
            vec![&FilterValue::from("thanks"), &FilterValue::from("first")],
            vec![&FilterValue::from("soon?")],
        ]
    );
    for comment in posts.iter().flat_map(|p| p.many("approved_comments")) {
        assert_eq!(field_set(comment), set(["id", "post_id", "body"]));
    }
}

#[tokio::test]
async fn test_unknown_relation_top_level_and_nested() {
    let client = seeded();

    let err = client
        .find_many("Post")
        .with_columns(ColumnSpecs::new().relation("fake", ["x"]))
        .err()
        .unwrap();
    assert_eq!(err.code, ErrorCode::UnknownRelation);
    assert_eq!(err.relation(), Some("fake"));
    assert_eq!(client.engine().query_count(), 0);

    let err = client
        .find_many("Post")
        .with_columns(ColumnSpecs::new().relation(
            "comments",
            ColumnSpec::columns(["body"]).include("fake", ["x"]),
        ))
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert!(err.is_unknown_relation());
    assert_eq!(err.relation(), Some("fake"));
    assert_eq!(err.context.model.as_deref(), Some("Comment"));
    // The root query runs, the comments batch never does.
    assert_eq!(client.engine().query_count(), 1);
}

#[tokio::test]
async fn test_children_with_nested_owner_scenario() {
    let engine = engine();
    engine
        .insert("posts", row! {"id" => 1, "author_id" => 1, "title" => "t", "body" => "b", "published" => true})
        .unwrap();
    engine
        .insert_many(
            "users",
            (1..=5).map(|id| {
                row! {"id" => id, "name" => format!("owner {id}"), "email" => "", "type" => "User"}
            }),
        )
        .unwrap();
    engine
        .insert_many(
            "comments",
            (1..=5).map(|id| {
                row! {"id" => id, "post_id" => 1, "owner_id" => id, "body" => "hi", "approved" => true, "ip" => ""}
            }),
        )
        .unwrap();
    let catalog = Catalog::new()
        .with(
            ModelMeta::new("Post", "posts")
                .columns(["id", "title"])
                .relation(RelationSpec::one_to_many("comments", "Comment")),
        )
        .with(
            ModelMeta::new("Comment", "comments")
                .columns(["id", "post_id", "owner_id", "body", "approved", "ip"])
                .relation(RelationSpec::many_to_one("owner", "Owner")),
        )
        .with(ModelMeta::new("Owner", "users").columns(["id", "name", "email"]));
    let client = QueryBuilder::new(engine, catalog);

    let specs = ColumnSpecs::from_json(&serde_json::json!({
        "comments": {"columns": ["body"], "include": {"owner": ["name"]}}
    }))
    .unwrap();
    let posts = client.find_many("Post").with_columns(specs).unwrap().exec().await.unwrap();

    assert_eq!(client.engine().query_count(), 3);
    let comments = posts[0].many("comments");
    assert_eq!(comments.len(), 5);
    for comment in comments {
        assert_eq!(field_set(comment), set(["id", "post_id", "body", "owner_id"]));
        let owner = comment.one("owner").unwrap();
        assert_eq!(field_set(owner), set(["id", "name"]));
        assert_eq!(owner.value("id"), comment.value("owner_id"));
    }
}

#[tokio::test]
async fn test_polymorphic_batch_loads_per_concrete_model() {
    let client = seeded();
    let users = client
        .find_many("User")
        .order_by(OrderByField::asc("id"))
        .with_columns(
            ColumnSpecs::new()
                .relation("posts", ["title"])
                .relation("audit_logs", ["action"]),
        )
        .unwrap()
        .exec()
        .await
        .unwrap();

    assert_eq!(
        users.iter().map(Record::model).collect::<Vec<_>>(),
        vec!["User", "Admin", "User"]
    );
    // root, posts for User, posts for Admin, audit logs for Admin
    assert_eq!(client.engine().query_count(), 4);

    assert_eq!(users[0].many("posts").len(), 1);
    assert_eq!(users[1].many("posts").len(), 1);
    assert!(users[2].many("posts").is_empty());

    assert_eq!(users[1].many("audit_logs").len(), 2);
    assert!(!users[0].is_loaded("audit_logs"));
    assert!(!users[2].is_loaded("audit_logs"));
}

#[tokio::test]
async fn test_subtype_relation_over_batch_without_subtype() {
    let client = seeded();
    let users = client
        .find_many("User")
        .r#where(Filter::equals("type", "User"))
        .with_columns(ColumnSpecs::new().relation("audit_logs", ["action"]))
        .unwrap()
        .exec()
        .await
        .unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(client.engine().query_count(), 1);
    assert!(users.iter().all(|user| !user.is_loaded("audit_logs")));
}

#[tokio::test]
async fn test_subtype_columns_are_fetched() {
    let client = seeded();
    let users = client
        .find_many("User")
        .order_by(OrderByField::asc("id"))
        .exec()
        .await
        .unwrap();

    assert_eq!(field_set(&users[0]), set(["id", "name", "email", "type"]));
    assert_eq!(field_set(&users[1]), set(["id", "name", "email", "type", "clearance"]));
    assert_eq!(users[1].value("clearance"), &FilterValue::from(3));

    client.engine().clear_log();
    let comments = client
        .find_many("Comment")
        .order_by(OrderByField::asc("id"))
        .without_columns(ColumnSpecs::new().relation("owner", ["email"]))
        .unwrap()
        .exec()
        .await
        .unwrap();

    assert_eq!(client.engine().query_count(), 2);
    let admin = comments[1].one("owner").unwrap();
    assert_eq!(admin.model(), "Admin");
    assert_eq!(field_set(admin), set(["id", "name", "type", "clearance"]));
    let owner = comments[0].one("owner").unwrap();
    assert_eq!(field_set(owner), set(["id", "name", "type"]));
}

#[tokio::test]
async fn test_one_to_one_and_serialization() {
    let client = seeded();
    let users = client
        .find_many("User")
        .r#where(Filter::in_list("id", [1.into(), 3.into()]))
        .order_by(OrderByField::asc("id"))
        .select(["name"])
        .without_columns(ColumnSpecs::new().relation("profile", ["avatar"]))
        .unwrap()
        .exec()
        .await
        .unwrap();

    let json = serde_json::to_value(&users).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {
                "name": "Ada",
                "id": 1,
                "type": "User",
                "profile": {"id": 7, "user_id": 1, "bio": "Countess"},
            },
            {"name": "Linus", "id": 3, "type": "User", "profile": null},
        ])
    );
}

#[tokio::test]
async fn test_plain_include_is_replaced_by_column_spec() {
    let client = seeded();
    let posts = client
        .find_many("Post")
        .r#where(Filter::equals("id", 10))
        .include("comments")
        .include(IncludeSpec::new("author").include("profile"))
        .with_columns(ColumnSpecs::new().relation("comments", ["body"]))
        .unwrap()
        .exec()
        .await
        .unwrap();

    // root, author, comments, author.profile
    assert_eq!(client.engine().query_count(), 4);
    for comment in posts[0].many("comments") {
        assert_eq!(field_set(comment), set(["id", "post_id", "body"]));
    }
    let author = posts[0].one("author").unwrap();
    assert_eq!(field_set(author), set(["id", "name", "email", "type"]));
    assert_eq!(
        author.one("profile").map(|p| p.value("avatar").clone()),
        Some(FilterValue::from("ada.png"))
    );
}

#[tokio::test]
async fn test_engine_errors_pass_through() {
    let engine = engine().with_table("comments", ["id", "post_id", "body"]);
    engine
        .insert("posts", row! {"id" => 1, "author_id" => 1, "title" => "t", "body" => "b", "published" => true})
        .unwrap();
    let client = QueryBuilder::new(engine, catalog());

    let err = client
        .find_many("Post")
        .without_columns(ColumnSpecs::new().relation("comments", ["body"]))
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DatabaseError);
}

#[tokio::test]
async fn test_catalog_from_toml() {
    let config = PreloadConfig::from_str(
        r#"
        [debug]
        log_queries = true

        [models.Author]
        table = "users"
        columns = ["id", "name", "email", "type", "clearance"]
        relations.books = { kind = "one_to_many", model = "Book", target_key = "author_id", scope = { where = { published = true } } }

        [models.Book]
        table = "posts"
        columns = ["id", "author_id", "title", "body", "published"]
        relations.writer = { kind = "many_to_one", model = "Author", source_key = "author_id" }
    "#,
    )
    .unwrap();
    assert_eq!(
        config.models["Book"].relations["writer"].kind,
        RelationType::ManyToOne
    );

    let engine = engine();
    engine
        .insert("users", row! {"id" => 1, "name" => "Ada", "email" => "", "type" => "User"})
        .unwrap();
    engine
        .insert_many(
            "posts",
            [
                row! {"id" => 1, "author_id" => 1, "title" => "Out", "body" => "", "published" => true},
                row! {"id" => 2, "author_id" => 1, "title" => "In progress", "body" => "", "published" => false},
            ],
        )
        .unwrap();
    let client = QueryBuilder::from_config(engine, &config).unwrap();

    let authors = client
        .find_many("Author")
        .with_columns(ColumnSpecs::new().relation(
            "books",
            ColumnSpec::columns(["title"]).include("writer", ["name"]),
        ))
        .unwrap()
        .exec()
        .await
        .unwrap();

    let books = authors[0].many("books");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].value("title"), &FilterValue::from("Out"));
    assert_eq!(
        books[0].one("writer").map(|w| w.value("name").clone()),
        Some(FilterValue::from("Ada"))
    );
}
