//! Recursive preloading of column-restricted relations.
//!
//! A level is processed across the whole parent batch before any nested
//! level starts. Parents are grouped by concrete model; each group issues
//! at most one query per relation, so the query count depends on the depth
//! of the include tree and the number of models in a batch, never on the
//! number of parents.

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

use super::assign::assign_one;
use super::include::ColumnIncludes;
use super::loader::{BatchLoader, collect_keys};
use super::select::ColumnResolver;
use crate::catalog::Catalog;
use crate::error::QueryResult;
use crate::prax_trace;
use crate::record::Record;
use crate::traits::{BoxFuture, QueryEngine};

/// Loads nested relation specs onto records.
pub struct Preloader<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
    catalog: &'a Catalog,
}

impl<'a, E: QueryEngine + ?Sized> Preloader<'a, E> {
    /// Create a preloader.
    pub fn new(engine: &'a E, catalog: &'a Catalog) -> Self {
        Self { engine, catalog }
    }

    /// Load every relation in `includes` onto `records`, recursing into nested specs.
    ///
    /// Fails with an unknown relation error when a spec names a relation no
    /// model in the records' inheritance families declares, at any depth.
    /// Records whose concrete model lacks a relation a sibling subtype
    /// declares are left with that slot unloaded. Engine errors abort the
    /// load as they are.
    pub async fn load(
        &self,
        records: &mut [Record],
        includes: &ColumnIncludes,
    ) -> QueryResult<()> {
        if records.is_empty() || includes.is_empty() {
            return Ok(());
        }
        self.load_level(records.iter_mut().collect(), includes, 1).await
    }

    fn load_level<'b>(
        &'b self,
        mut parents: Vec<&'b mut Record>,
        includes: &'b ColumnIncludes,
        depth: usize,
    ) -> BoxFuture<'b, QueryResult<()>>
    where
        'a: 'b,
    {
        Box::pin(async move {
            let mut groups: IndexMap<SmolStr, Vec<usize>> = IndexMap::new();
            for (i, parent) in parents.iter().enumerate() {
                groups.entry(SmolStr::new(parent.model())).or_default().push(i);
            }

            for name in includes.names() {
                self.check_declared(&groups, name)?;
            }

            let resolver = ColumnResolver::new(self.catalog);
            let loader = BatchLoader::new(self.engine, self.catalog);

            for (name, include) in includes.iter() {
                for (model, indices) in &groups {
                    let Some(association) = self.catalog.relation(model, name)? else {
                        prax_trace!(
                            relation = name,
                            model = %model,
                            depth,
                            "Relation not declared on model, skipping group"
                        );
                        continue;
                    };

                    let columns = resolver.resolve(&association, include)?;
                    let group = indices.iter().map(|&i| &*parents[i]);
                    let keys = collect_keys(group, &association.source_key);
                    debug!(
                        relation = name,
                        model = %model,
                        depth,
                        parents = indices.len(),
                        keys = keys.len(),
                        columns = ?columns,
                        "Batch loading relation"
                    );

                    let batch = loader.load(&association, columns, keys).await?;
                    for &i in indices {
                        assign_one(&mut *parents[i], &association, &batch);
                    }
                }
            }

            for (name, include) in includes.iter() {
                if !include.has_nested() {
                    continue;
                }
                let children: Vec<&mut Record> = parents
                    .iter_mut()
                    .flat_map(|parent| parent.related_mut(name))
                    .collect();
                if children.is_empty() {
                    prax_trace!(relation = name, depth, "No records to recurse into");
                    continue;
                }
                self.load_level(children, &include.nested, depth + 1).await?;
            }

            Ok(())
        })
    }

    /// Check that some model in the family of a grouped model declares `relation`.
    fn check_declared(
        &self,
        groups: &IndexMap<SmolStr, Vec<usize>>,
        relation: &str,
    ) -> QueryResult<()> {
        let mut missing = None;
        for model in groups.keys() {
            let base = self.catalog.base_model(model)?;
            match self.catalog.family_relations(base, relation) {
                Ok(_) => return Ok(()),
                Err(err) => {
                    missing.get_or_insert(err);
                }
            }
        }
        missing.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelMeta;
    use crate::filter::FilterValue;
    use crate::memory::MemoryEngine;
    use crate::relations::{ColumnSpec, ColumnSpecs, RelationSpec, SelectionMode};
    use crate::row;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        Catalog::new()
            .with(
                ModelMeta::new("User", "users")
                    .columns(["id", "name", "email"])
                    .relation(RelationSpec::one_to_many("posts", "Post").foreign_key("author_id")),
            )
            .with(
                ModelMeta::new("Post", "posts")
                    .columns(["id", "title", "author_id"])
                    .relation(RelationSpec::many_to_one("author", "User"))
                    .relation(RelationSpec::one_to_many("comments", "Comment")),
            )
            .with(ModelMeta::new("Comment", "comments").columns(["id", "post_id", "body"]))
    }

    fn engine() -> MemoryEngine {
        let engine = MemoryEngine::new()
            .with_table("users", ["id", "name", "email"])
            .with_table("posts", ["id", "title", "author_id"])
            .with_table("comments", ["id", "post_id", "body"]);
        engine
            .insert_many(
                "users",
                [
                    row! {"id" => 1, "name" => "Ada", "email" => "ada@example.com"},
                    row! {"id" => 2, "name" => "Grace", "email" => "grace@example.com"},
                ],
            )
            .unwrap();
        engine
            .insert_many(
                "posts",
                [
                    row! {"id" => 10, "title" => "One", "author_id" => 1},
                    row! {"id" => 11, "title" => "Two", "author_id" => 2},
                    row! {"id" => 12, "title" => "Three", "author_id" => 1},
                ],
            )
            .unwrap();
        engine
            .insert_many(
                "comments",
                [
                    row! {"id" => 100, "post_id" => 10, "body" => "first"},
                    row! {"id" => 101, "post_id" => 12, "body" => "second"},
                ],
            )
            .unwrap();
        engine
    }

    fn users() -> Vec<Record> {
        vec![Record::new("User").with("id", 1), Record::new("User").with("id", 2)]
    }

    #[tokio::test]
    async fn test_one_query_per_level() {
        let catalog = catalog();
        let engine = engine();
        let includes = ColumnSpecs::new()
            .relation(
                "posts",
                ColumnSpec::columns(["title"]).include("comments", ["body"]),
            )
            .parse(SelectionMode::Include);

        let mut users = users();
        Preloader::new(&engine, &catalog)
            .load(&mut users, &includes)
            .await
            .unwrap();

        assert_eq!(engine.query_count(), 2);
        let posts = users[0].many("posts");
        assert_eq!(posts.len(), 2);
        assert_eq!(
            posts[0].field_names().collect::<Vec<_>>(),
            vec!["title", "id", "author_id"]
        );
        assert_eq!(posts[0].many("comments")[0].value("body"), &FilterValue::from("first"));
        assert_eq!(
            posts[0].many("comments")[0].field_names().collect::<Vec<_>>(),
            vec!["body", "id", "post_id"]
        );
        assert!(users[1].many("posts")[0].is_loaded("comments"));
        assert!(users[1].many("posts")[0].many("comments").is_empty());
    }

    #[tokio::test]
    async fn test_cyclic_association_graph() {
        let catalog = catalog();
        let engine = engine();
        let includes = ColumnSpecs::new()
            .relation(
                "posts",
                ColumnSpec::columns(["title"]).include(
                    "author",
                    ColumnSpec::columns(["name"]).include("posts", ["title"]),
                ),
            )
            .parse(SelectionMode::Include);

        let mut users = users();
        Preloader::new(&engine, &catalog)
            .load(&mut users, &includes)
            .await
            .unwrap();

        assert_eq!(engine.query_count(), 3);
        let author = users[0].many("posts")[0].one("author").unwrap();
        assert_eq!(author.value("name"), &FilterValue::from("Ada"));
        assert_eq!(author.many("posts").len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_relation_fails_before_querying() {
        let catalog = catalog();
        let engine = engine();
        let includes = ColumnSpecs::new()
            .relation("followers", ["name"])
            .parse(SelectionMode::Include);

        let err = Preloader::new(&engine, &catalog)
            .load(&mut users(), &includes)
            .await
            .unwrap_err();
        assert!(err.is_unknown_relation());
        assert_eq!(err.relation(), Some("followers"));
        assert_eq!(engine.query_count(), 0);
    }

    #[tokio::test]
    async fn test_subtype_relation_without_subtype_rows() {
        let catalog = catalog()
            .with(
                ModelMeta::new("Account", "accounts")
                    .columns(["id", "kind"])
                    .discriminator("kind"),
            )
            .with(
                ModelMeta::subtype("Moderator", "Account")
                    .relation(RelationSpec::one_to_many("bans", "Comment").foreign_key("post_id")),
            );
        let engine = engine();
        let includes = ColumnSpecs::new().relation("bans", ["body"]).parse(SelectionMode::Include);

        let mut accounts = vec![Record::new("Account").with("id", 10)];
        Preloader::new(&engine, &catalog)
            .load(&mut accounts, &includes)
            .await
            .unwrap();
        assert_eq!(engine.query_count(), 0);
        assert!(!accounts[0].is_loaded("bans"));

        let mut mixed = vec![
            Record::new("Account").with("id", 10),
            Record::new("Moderator").with("id", 12),
        ];
        Preloader::new(&engine, &catalog)
            .load(&mut mixed, &includes)
            .await
            .unwrap();
        assert_eq!(engine.query_count(), 1);
        assert!(!mixed[0].is_loaded("bans"));
        assert_eq!(mixed[1].many("bans")[0].value("body"), &FilterValue::from("second"));

        let unknown = ColumnSpecs::new().relation("mutes", ["body"]).parse(SelectionMode::Include);
        let err = Preloader::new(&engine, &catalog)
            .load(&mut accounts, &unknown)
            .await
            .unwrap_err();
        assert!(err.is_unknown_relation());
        assert_eq!(err.context.model.as_deref(), Some("Account"));
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let catalog = catalog();
        let engine = engine();
        let includes = ColumnSpecs::new()
            .relation("posts", ["title"])
            .parse(SelectionMode::Include);

        let mut none: Vec<Record> = Vec::new();
        Preloader::new(&engine, &catalog)
            .load(&mut none, &includes)
            .await
            .unwrap();
        assert_eq!(engine.query_count(), 0);
    }
}
