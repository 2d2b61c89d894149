mod common;

use common::{condition, group, query};

mod compile {
    use super::*;
    use query_engine_metadata::metadata::FieldType;
    use query_engine_models::BaseComparator;
    use query_engine_translation::translation::error::Error;
    use query_engine_translation::translation::query::{
        compile_query, ComparisonOperator, Interval, Predicate, Value,
    };

    fn compile(tree: serde_json::Value) -> anyhow::Result<Result<Option<Predicate>, Error>> {
        let metadata = common::metadata()?;
        let query = query("orders", tree)?;
        Ok(compile_query(&metadata, &query, Some("orders")))
    }

    fn compare(path: &str, operator: ComparisonOperator, value: Value) -> Predicate {
        Predicate::Compare {
            path: path.to_string(),
            operator,
            value,
        }
    }

    #[test]
    fn negated_comparison() -> anyhow::Result<()> {
        let predicate = compile(group(
            "all",
            vec![condition("tags__name", "not_iexact", "urgent", "identity")],
        ))??;
        similar_asserts::assert_eq!(
            predicate,
            Some(Predicate::negate(compare(
                "tags__name",
                ComparisonOperator::Equals,
                Value::String("urgent".to_string())
            )))
        );
        Ok(())
    }

    #[test]
    fn groups_nest() -> anyhow::Result<()> {
        let predicate = compile(group(
            "all",
            vec![
                condition("name", "istartswith", "PO", "identity"),
                group(
                    "any",
                    vec![
                        condition("status", "iexact", "open", "identity"),
                        condition("customer__name", "icontains", "acme", "identity"),
                    ],
                ),
            ],
        ))??;
        similar_asserts::assert_eq!(
            predicate,
            Some(Predicate::and(
                compare(
                    "name",
                    ComparisonOperator::StartsWith,
                    Value::String("PO".to_string())
                ),
                Predicate::or(
                    compare(
                        "status",
                        ComparisonOperator::Equals,
                        Value::String("open".to_string())
                    ),
                    compare(
                        "customer__name",
                        ComparisonOperator::Contains,
                        Value::String("acme".to_string())
                    ),
                ),
            ))
        );
        Ok(())
    }

    #[test]
    fn null_check_ignores_value_and_units() -> anyhow::Result<()> {
        let predicate = compile(group(
            "all",
            vec![condition("customer__email", "isnull", "whatever", "identity")],
        ))??;
        assert_eq!(
            predicate,
            Some(Predicate::IsNull {
                path: "customer__email".to_string()
            })
        );
        Ok(())
    }

    #[test]
    fn durations_are_converted() -> anyhow::Result<()> {
        let predicate = compile(group(
            "all",
            vec![condition("samples__animal__age", "gte", "2", "weeks")],
        ))??;
        assert_eq!(
            predicate,
            Some(compare(
                "samples__animal__age",
                ComparisonOperator::GreaterThanOrEqualTo,
                Value::Interval(Interval {
                    months: 0,
                    days: 14,
                    microseconds: 0
                })
            ))
        );
        Ok(())
    }

    #[test]
    fn concentrations_are_converted_to_micromolar() -> anyhow::Result<()> {
        let predicate = compile(group(
            "all",
            vec![condition("samples__concentration", "lt", "1", "millimolar")],
        ))??;
        assert_eq!(
            predicate,
            Some(compare(
                "samples__concentration",
                ComparisonOperator::LessThan,
                Value::Float(1000.0)
            ))
        );
        Ok(())
    }

    #[test]
    fn unparsable_values_are_compared_as_typed() -> anyhow::Result<()> {
        let predicate = compile(group(
            "all",
            vec![condition("samples__animal__age", "lt", "a while", "weeks")],
        ))??;
        assert_eq!(
            predicate,
            Some(compare(
                "samples__animal__age",
                ComparisonOperator::LessThan,
                Value::String("a while".to_string())
            ))
        );
        Ok(())
    }

    #[test]
    fn units_must_be_selectable() -> anyhow::Result<()> {
        let result = compile(group(
            "all",
            vec![condition("samples__animal__age", "lt", "2", "years")],
        ))?;
        assert_eq!(
            result,
            Err(Error::InvalidUnits {
                path: "samples__animal__age".to_string(),
                units: "years".to_string()
            })
        );
        Ok(())
    }

    #[test]
    fn comparators_depend_on_the_field_type() -> anyhow::Result<()> {
        let result = compile(group(
            "all",
            vec![condition("status", "icontains", "open", "identity")],
        ))?;
        assert_eq!(
            result,
            Err(Error::ComparatorNotSupported {
                path: "status".to_string(),
                comparator: "icontains".to_string()
            })
        );
        for field_type in enum_iterator::all::<FieldType>() {
            assert!(field_type.comparators().contains(&BaseComparator::Equals));
            assert!(field_type.comparators().contains(&BaseComparator::IsNull));
        }
        Ok(())
    }

    #[test]
    fn unknown_field() -> anyhow::Result<()> {
        let result = compile(group(
            "all",
            vec![condition("tags__colour", "iexact", "red", "identity")],
        ))?;
        assert_eq!(
            result,
            Err(Error::UnknownField {
                format: "orders".to_string(),
                path: "tags__colour".to_string()
            })
        );
        Ok(())
    }

    #[test]
    fn requested_format_must_be_selected() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let query = query(
            "orders",
            group("all", vec![condition("name", "iexact", "PO-1", "identity")]),
        )?;
        assert_eq!(
            compile_query(&metadata, &query, Some("samples")),
            Err(Error::FormatMismatch {
                selected: "orders".to_string(),
                requested: "samples".to_string()
            })
        );
        assert!(compile_query(&metadata, &query, None)?.is_some());
        Ok(())
    }

    #[test]
    fn empty_group_matches_everything() -> anyhow::Result<()> {
        let predicate = compile(group(
            "all",
            vec![
                condition("name", "iexact", "PO-1", "identity"),
                group("any", vec![]),
            ],
        ))??;
        assert_eq!(predicate, None);
        Ok(())
    }
}

mod plan {
    use super::*;
    use query_engine_translation::translation::error::Error;
    use query_engine_translation::translation::helpers::Env;
    use query_engine_translation::translation::lowering::prefetch_steps;
    use query_engine_translation::translation::query::distinct::resolve_distinct_fields;
    use query_engine_translation::translation::query::{
        plan_search, Annotation, ComparisonOperator, OrderDirection, Predicate, SearchOptions,
        SubqueryFilter, Value,
    };

    fn tagged_urgent() -> anyhow::Result<query_engine_models::Query> {
        query(
            "orders",
            group(
                "all",
                vec![condition("tags__name", "iexact", "urgent", "identity")],
            ),
        )
    }

    #[test]
    fn split_rows_make_rows_distinct_per_tag() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let plan = plan_search(&env, &tagged_urgent()?, &SearchOptions::default())?;

        similar_asserts::assert_eq!(
            plan.distinct_fields,
            vec!["name", "pk", "tags__name", "tags__pk"]
        );
        let order: Vec<(&str, OrderDirection)> = plan
            .order_by
            .iter()
            .map(|element| (element.path.as_str(), element.direction))
            .collect();
        similar_asserts::assert_eq!(
            order,
            vec![
                ("name", OrderDirection::Asc),
                ("pk", OrderDirection::Asc),
                ("tags__name", OrderDirection::Asc),
                ("tags__pk", OrderDirection::Asc),
            ]
        );
        assert_eq!(
            plan.annotations,
            vec![Annotation {
                name: "tag_pk".to_string(),
                path: "tags__pk".to_string()
            }]
        );
        Ok(())
    }

    #[test]
    fn prefetches_follow_declaration_order() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let plan = plan_search(&env, &tagged_urgent()?, &SearchOptions::default())?;

        let paths: Vec<&str> = plan.prefetch.iter().map(|p| p.path.as_str()).collect();
        similar_asserts::assert_eq!(
            paths,
            vec!["customer", "tags", "tags__category", "samples__animal"]
        );
        let tag_filter = Some(SubqueryFilter {
            instance: "Tag".to_string(),
            path: "tags".to_string(),
            entity: "tag".to_string(),
            predicate: Predicate::Compare {
                path: "name".to_string(),
                operator: ComparisonOperator::Equals,
                value: Value::String("urgent".to_string()),
            },
        });
        let tags = &plan.prefetch[1];
        assert_eq!(tags.entity, "tag");
        assert_eq!(tags.filter, tag_filter);
        let categories = &plan.prefetch[2];
        assert_eq!(categories.entity, "category");
        assert_eq!(categories.filter, tag_filter);
        assert!(plan
            .prefetch
            .iter()
            .filter(|prefetch| !prefetch.path.starts_with("tags"))
            .all(|prefetch| prefetch.filter.is_none()));

        let steps: Vec<String> = prefetch_steps(&env, &plan)?
            .into_iter()
            .map(|step| step.path)
            .collect();
        similar_asserts::assert_eq!(
            steps,
            vec![
                "customer",
                "tags",
                "tags__category",
                "samples",
                "samples__animal"
            ]
        );
        Ok(())
    }

    #[test]
    fn merged_instance_order_does_not_change_distinct_fields() -> anyhow::Result<()> {
        let mut metadata = common::metadata()?;
        let expected = {
            let env = Env::new(&metadata);
            plan_search(&env, &tagged_urgent()?, &SearchOptions::default())?.distinct_fields
        };
        let format = metadata
            .formats
            .0
            .get_mut("orders")
            .ok_or_else(|| anyhow::anyhow!("no orders format"))?;
        format.model_instances.reverse();
        let env = Env::new(&metadata);
        let plan = plan_search(&env, &tagged_urgent()?, &SearchOptions::default())?;
        assert_eq!(plan.distinct_fields, expected);
        Ok(())
    }

    fn orders_format(
        metadata: &query_engine_metadata::metadata::Metadata,
    ) -> anyhow::Result<&query_engine_metadata::metadata::Format> {
        metadata
            .format("orders")
            .ok_or_else(|| anyhow::anyhow!("no orders format"))
    }

    #[test]
    fn distinct_fields_are_stable() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let format = orders_format(&metadata)?;
        for split_all in [false, true] {
            let first = resolve_distinct_fields(&env, format, Some("status"), false, split_all)?;
            let second = resolve_distinct_fields(&env, format, Some("status"), false, split_all)?;
            similar_asserts::assert_eq!(first, second);
        }
        Ok(())
    }

    #[test]
    fn split_all_splits_every_many_to_many_instance() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let fields = resolve_distinct_fields(&env, orders_format(&metadata)?, None, false, true)?;
        similar_asserts::assert_eq!(
            fields,
            vec![
                "name",
                "pk",
                "tags__name",
                "tags__pk",
                "tags__category__name",
                "tags__category__pk"
            ]
        );
        Ok(())
    }

    #[test]
    fn custom_distinct_fields_unless_splitting_all() -> anyhow::Result<()> {
        let mut metadata = common::metadata()?;
        metadata
            .formats
            .0
            .get_mut("orders")
            .and_then(|format| format.model_instances.get_mut("Tag"))
            .ok_or_else(|| anyhow::anyhow!("no Tag instance"))?
            .distinct_fields = Some(vec!["name".to_string()]);
        let env = Env::new(&metadata);
        let format = orders_format(&metadata)?;

        let custom = resolve_distinct_fields(&env, format, None, false, false)?;
        similar_asserts::assert_eq!(custom, vec!["name", "pk", "tags__name"]);

        let split_all = resolve_distinct_fields(&env, format, None, false, true)?;
        similar_asserts::assert_eq!(
            split_all,
            vec![
                "name",
                "pk",
                "tags__name",
                "tags__pk",
                "tags__category__name",
                "tags__category__pk"
            ]
        );
        Ok(())
    }

    #[test]
    fn distinct_rows_keep_descending_natural_ordering() -> anyhow::Result<()> {
        let mut metadata = common::metadata()?;
        metadata
            .entities
            .0
            .get_mut("order")
            .ok_or_else(|| anyhow::anyhow!("no order entity"))?
            .ordering = vec!["-placed".to_string()];
        let env = Env::new(&metadata);
        let plan = plan_search(&env, &tagged_urgent()?, &SearchOptions::default())?;

        similar_asserts::assert_eq!(
            plan.distinct_fields,
            vec!["placed", "pk", "tags__name", "tags__pk"]
        );
        let order: Vec<(&str, OrderDirection)> = plan
            .order_by
            .iter()
            .map(|element| (element.path.as_str(), element.direction))
            .collect();
        similar_asserts::assert_eq!(
            order,
            vec![
                ("placed", OrderDirection::Desc),
                ("pk", OrderDirection::Asc),
                ("tags__name", OrderDirection::Asc),
                ("tags__pk", OrderDirection::Asc),
            ]
        );
        Ok(())
    }

    #[test]
    fn merged_instances_keep_rows_unique() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let search = query(
            "samples",
            group(
                "all",
                vec![condition("animal__name", "iexact", "alpha", "identity")],
            ),
        )?;

        let plan = plan_search(&env, &search, &SearchOptions::default())?;
        assert!(plan.distinct_fields.is_empty());
        let order: Vec<&str> = plan.order_by.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(order, vec!["animal__name", "name", "pk"]);
        let paths: Vec<&str> = plan.prefetch.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["animal", "order__tags"]);

        let ordered = SearchOptions {
            order_by: Some("order__tags__name".to_string()),
            ..SearchOptions::default()
        };
        let plan = plan_search(&env, &search, &ordered)?;
        assert_eq!(plan.distinct_fields, vec!["pk"]);
        let order: Vec<&str> = plan.order_by.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(order, vec!["order__tags__name", "pk"]);
        Ok(())
    }

    #[test]
    fn searching_across_many_related_records_dedupes_roots() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let search = query(
            "samples",
            group(
                "all",
                vec![condition("order__tags__name", "iexact", "urgent", "identity")],
            ),
        )?;
        let plan = plan_search(&env, &search, &SearchOptions::default())?;
        assert_eq!(plan.distinct_fields, vec!["pk"]);
        let order: Vec<&str> = plan.order_by.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(order, vec!["pk"]);
        Ok(())
    }

    #[test]
    fn unpopulated_queries_are_not_planned() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let search = query(
            "orders",
            group("all", vec![condition("name", "iexact", "", "identity")]),
        )?;
        assert_eq!(
            plan_search(&env, &search, &SearchOptions::default()),
            Err(Error::NotPopulated)
        );
        Ok(())
    }

    #[test]
    fn stats_are_planned_on_request() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let plan = plan_search(&env, &tagged_urgent()?, &SearchOptions::default())?;
        assert!(plan.stats.is_empty());

        let options = SearchOptions {
            compute_stats: true,
            limit: Some(10),
            ..SearchOptions::default()
        };
        let plan = plan_search(&env, &tagged_urgent()?, &options)?;
        let stats: Vec<(&str, usize, &str)> = plan
            .stats
            .iter()
            .map(|s| (s.name.as_str(), s.top_n, s.delimiter.as_str()))
            .collect();
        assert_eq!(stats, vec![("tags", 5, " "), ("genotypes", 10, " ")]);
        assert_eq!(plan.limit, Some(10));
        Ok(())
    }

    #[test]
    fn ordering_by_an_unknown_field_fails() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let options = SearchOptions {
            order_by: Some("tags__colour".to_string()),
            ..SearchOptions::default()
        };
        assert_eq!(
            plan_search(&env, &tagged_urgent()?, &options),
            Err(Error::UnknownColumn {
                entity: "tag".to_string(),
                column: "colour".to_string()
            })
        );
        Ok(())
    }
}

mod reroot {
    use super::*;
    use query_engine_models::Node;
    use query_engine_translation::translation::query::reroot::{instance_paths, reroot};

    #[test]
    fn round_trip_through_another_instance() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let format = metadata
            .format("orders")
            .ok_or_else(|| anyhow::anyhow!("no orders format"))?;
        let tree = Node::from_json(group(
            "all",
            vec![
                condition("name", "iexact", "PO-1", "identity"),
                group(
                    "any",
                    vec![
                        condition("tags__name", "iexact", "urgent", "identity"),
                        condition("samples__animal__name", "iexact", "alpha", "identity"),
                    ],
                ),
            ],
        ))?;

        let rerooted = reroot(&tree, "orders", format, "Order", "Animal")?;
        let paths: Vec<&str> = rerooted
            .conditions()
            .into_iter()
            .map(|condition| condition.field_path.as_str())
            .collect();
        assert_eq!(
            paths,
            vec!["samples__order__name", "samples__order__tags__name", "name"]
        );

        let back = reroot(&rerooted, "orders", format, "Animal", "Order")?;
        similar_asserts::assert_eq!(back, tree);
        Ok(())
    }

    #[test]
    fn every_instance_has_one_path() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let format = metadata
            .format("orders")
            .ok_or_else(|| anyhow::anyhow!("no orders format"))?;
        let paths = instance_paths("orders", format, "Animal")?;
        let paths: Vec<(&str, &str)> = paths
            .iter()
            .map(|(path, instance)| (path.as_str(), *instance))
            .collect();
        similar_asserts::assert_eq!(
            paths,
            vec![
                ("", "Animal"),
                ("samples", "Sample"),
                ("samples__order", "Order"),
                ("samples__order__customer", "Customer"),
                ("samples__order__tags", "Tag"),
                ("samples__order__tags__category", "Category"),
            ]
        );
        Ok(())
    }
}

mod basic {
    use super::common;
    use query_engine_models::{is_query_populated, BaseComparator, Comparator};
    use query_engine_translation::translation::error::Error;
    use query_engine_translation::translation::helpers::Env;
    use query_engine_translation::translation::query::basic::{
        default_query, handoff_field, new_basic_query, plan_handoff_lookup, HANDOFF_STATS,
    };

    #[test]
    fn default_query_selects_the_first_format() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let query = default_query(&env, None)?;
        assert_eq!(query.selected_format_id, "orders");
        assert_eq!(
            query.searches.keys().collect::<Vec<_>>(),
            vec!["orders", "samples"]
        );
        assert!(!is_query_populated(&query));
        assert_eq!(
            default_query(&env, Some("invoices")),
            Err(Error::UnknownFormat("invoices".to_string()))
        );
        Ok(())
    }

    #[test]
    fn basic_query_fills_the_empty_slot() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let query = new_basic_query(
            &env,
            "orders",
            "Tag",
            "name",
            Comparator::new(BaseComparator::Equals),
            "urgent",
            None,
        )?;
        assert!(is_query_populated(&query));
        let conditions = query
            .selected_tree()
            .map(|tree| tree.conditions())
            .unwrap_or_default();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].field_path, "tags__name");
        assert_eq!(conditions[0].value, "urgent");
        assert_eq!(conditions[0].units, "identity");
        Ok(())
    }

    #[test]
    fn basic_query_uses_the_default_units() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let query = new_basic_query(
            &env,
            "orders",
            "Animal",
            "age",
            Comparator::new(BaseComparator::LessThan),
            "3",
            None,
        )?;
        let conditions = query
            .selected_tree()
            .map(|tree| tree.conditions())
            .unwrap_or_default();
        assert_eq!(conditions[0].field_path, "samples__animal__age");
        assert_eq!(conditions[0].units, "weeks");
        Ok(())
    }

    #[test]
    fn basic_query_needs_exactly_one_slot() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let result = new_basic_query(
            &env,
            "samples",
            "Sample",
            "name",
            Comparator::new(BaseComparator::Equals),
            "S1",
            None,
        );
        assert_eq!(
            result,
            Err(Error::BasicQuerySlot {
                format: "samples".to_string(),
                count: 2
            })
        );
        Ok(())
    }

    #[test]
    fn hidden_fields_hand_off_to_displayed_ones() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        assert_eq!(
            handoff_field(&env, "orders", "Order", "id")?,
            Some("name".to_string())
        );
        assert_eq!(handoff_field(&env, "orders", "Order", "name")?, None);

        let query = new_basic_query(
            &env,
            "orders",
            "Order",
            "id",
            Comparator::new(BaseComparator::Equals),
            "2",
            None,
        )?;
        let plan = plan_handoff_lookup(&env, &query, "Order", "name")?;
        assert_eq!(plan.stats.len(), 1);
        assert_eq!(plan.stats[0].name, HANDOFF_STATS);
        assert_eq!(plan.stats[0].fields, vec!["name"]);
        assert_eq!(plan.stats[0].top_n, 2);
        Ok(())
    }
}

mod lowering {
    use super::*;
    use query_engine_translation::translation::helpers::Env;
    use query_engine_translation::translation::lowering::{translate, translate_prefetch};
    use query_engine_translation::translation::query::{plan_search, SearchOptions};

    #[test]
    fn rows_and_count_of_a_merged_search() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let search = query(
            "samples",
            group(
                "all",
                vec![condition("animal__name", "iexact", "alpha", "identity")],
            ),
        )?;
        let plan = plan_search(&env, &search, &SearchOptions::default())?;
        let execution_plan = translate(&env, &plan)?;

        let rows = execution_plan.rows_sql();
        insta::assert_snapshot!(rows.sql, @r#"SELECT CAST("root"."id" AS text) AS "pk", row_to_json("root") AS "record" FROM "public"."samples" AS "root" LEFT OUTER JOIN "public"."animals" AS "animal" ON ("root"."animal_id" = "animal"."id") WHERE ("animal"."name" ILIKE $1) ORDER BY "animal"."name" ASC, "root"."name" ASC, "root"."id" ASC"#);
        assert_eq!(common::params(&rows), vec!["alpha"]);

        let count = execution_plan.count_sql();
        insta::assert_snapshot!(count.sql, @r#"SELECT COUNT(*) AS "count" FROM (SELECT 1 FROM "public"."samples" AS "root" LEFT OUTER JOIN "public"."animals" AS "animal" ON ("root"."animal_id" = "animal"."id") WHERE ("animal"."name" ILIKE $1)) AS "counted""#);
        assert_eq!(common::params(&count), vec!["alpha"]);
        Ok(())
    }

    #[test]
    fn split_rows_select_distinct_on_the_related_record() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let search = query(
            "orders",
            group(
                "all",
                vec![condition("tags__name", "iexact", "urgent", "identity")],
            ),
        )?;
        let options = SearchOptions {
            limit: Some(20),
            offset: Some(40),
            ..SearchOptions::default()
        };
        let plan = plan_search(&env, &search, &options)?;
        let rows = translate(&env, &plan)?.rows_sql();
        let pretty = common::pretty(&rows);

        assert!(
            rows.sql.starts_with(
                r#"SELECT DISTINCT ON ("root"."name", "root"."id", "tags"."name", "tags"."id") "#
            ),
            "{pretty}"
        );
        assert!(
            rows.sql
                .contains(r#"CAST("tags"."id" AS text) AS "tag_pk""#),
            "{pretty}"
        );
        assert!(
            rows.sql.contains(
                r#" LEFT OUTER JOIN "public"."order_tags" AS "tags__through" ON ("root"."id" = "tags__through"."order_id") LEFT OUTER JOIN "public"."tags" AS "tags" ON ("tags__through"."tag_id" = "tags"."id")"#
            ),
            "{pretty}"
        );
        assert!(rows.sql.ends_with(" LIMIT 20 OFFSET 40"), "{pretty}");
        Ok(())
    }

    #[test]
    fn prefetch_of_split_rows_is_filtered() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let search = query(
            "orders",
            group(
                "all",
                vec![condition("tags__name", "iexact", "urgent", "identity")],
            ),
        )?;
        let plan = plan_search(&env, &search, &SearchOptions::default())?;
        let tags = plan
            .prefetch
            .iter()
            .find(|prefetch| prefetch.path == "tags")
            .ok_or_else(|| anyhow::anyhow!("tags are not prefetched"))?;
        let select = translate_prefetch(&env, &plan, tags, &["1".to_string(), "2".to_string()])?;
        let statement = select.to_statement();
        let pretty = common::pretty(&statement);

        assert!(
            statement.sql.starts_with(
                r#"SELECT DISTINCT ON ("root"."id", "tags"."id") CAST("root"."id" AS text) AS "root_pk", row_to_json("tags") AS "record" FROM "public"."orders" AS "root" INNER JOIN "public"."order_tags" AS "tags__through""#
            ),
            "{pretty}"
        );
        assert!(
            statement.sql.contains(
                r#"("tags"."id" IN (SELECT "subquery"."id" AS "pk" FROM "public"."tags" AS "subquery" WHERE ("subquery"."name" ILIKE $3)))"#
            ),
            "{pretty}"
        );
        assert_eq!(common::params(&statement), vec!["1", "2", "urgent"]);
        Ok(())
    }

    #[test]
    fn prefetch_below_split_rows_is_filtered_by_the_split_instance() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let search = query(
            "orders",
            group(
                "all",
                vec![condition("tags__name", "iexact", "urgent", "identity")],
            ),
        )?;
        let plan = plan_search(&env, &search, &SearchOptions::default())?;
        let categories = plan
            .prefetch
            .iter()
            .find(|prefetch| prefetch.path == "tags__category")
            .ok_or_else(|| anyhow::anyhow!("categories are not prefetched"))?;
        let statement = translate_prefetch(&env, &plan, categories, &["1".to_string()])?
            .to_statement();
        let pretty = common::pretty(&statement);

        assert!(
            statement.sql.contains(
                r#"("tags"."id" IN (SELECT "subquery"."id" AS "pk" FROM "public"."tags" AS "subquery" WHERE ("subquery"."name" ILIKE $2)))"#
            ),
            "{pretty}"
        );
        assert_eq!(common::params(&statement), vec!["1", "urgent"]);
        Ok(())
    }

    #[test]
    fn stats_count_distinct_roots_per_value() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let search = query(
            "orders",
            group(
                "all",
                vec![condition("tags__name", "iexact", "urgent", "identity")],
            ),
        )?;
        let options = SearchOptions {
            compute_stats: true,
            ..SearchOptions::default()
        };
        let plan = plan_search(&env, &search, &options)?;
        let execution_plan = translate(&env, &plan)?;
        assert_eq!(execution_plan.stats.len(), 2);

        let tags = execution_plan.stats[0].select.to_statement();
        assert!(
            tags.sql.starts_with(
                r#"SELECT concat_ws($1, CAST("tags"."name" AS text)) AS "value", COUNT(DISTINCT "root"."id") AS "count""#
            ),
            "{}",
            common::pretty(&tags)
        );
        assert!(
            tags.sql
                .ends_with(r#" WHERE ("tags"."name" ILIKE $2) GROUP BY 1 ORDER BY 2 DESC, 1 ASC"#),
            "{}",
            common::pretty(&tags)
        );
        assert_eq!(common::params(&tags), vec![" ", "urgent"]);

        let genotypes = execution_plan.stats[1].select.to_statement();
        assert!(
            genotypes.sql.contains(
                r#" LEFT OUTER JOIN "public"."samples" AS "samples" ON ("root"."id" = "samples"."order_id") LEFT OUTER JOIN "public"."animals" AS "samples__animal" ON ("samples"."animal_id" = "samples__animal"."id")"#
            ),
            "{}",
            common::pretty(&genotypes)
        );
        Ok(())
    }

    #[test]
    fn typed_comparisons_cast_their_value() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let search = query(
            "orders",
            group(
                "all",
                vec![
                    condition("samples__animal__age", "gte", "2", "weeks"),
                    condition("samples__concentration", "lt", "1", "millimolar"),
                ],
            ),
        )?;
        let plan = plan_search(&env, &search, &SearchOptions::default())?;
        let rows = translate(&env, &plan)?.rows_sql();
        assert!(
            rows.sql.contains(
                r#" WHERE (("samples__animal"."age" >= CAST($1 AS interval)) AND ("samples"."concentration" < CAST($2 AS double precision)))"#
            ),
            "{}",
            common::pretty(&rows)
        );
        assert_eq!(
            common::params(&rows),
            vec!["0 mons 14 days 0 microseconds", "1000"]
        );
        Ok(())
    }

    #[test]
    fn pattern_characters_are_escaped() -> anyhow::Result<()> {
        let metadata = common::metadata()?;
        let env = Env::new(&metadata);
        let search = query(
            "orders",
            group(
                "all",
                vec![
                    condition("name", "icontains", "50%", "identity"),
                    condition("customer__name", "not_iendswith", "_x", "identity"),
                ],
            ),
        )?;
        let plan = plan_search(&env, &search, &SearchOptions::default())?;
        let rows = translate(&env, &plan)?.rows_sql();
        assert!(
            rows.sql.contains(
                r#" WHERE (("root"."name" ILIKE $1) AND NOT ("customer"."name" ILIKE $2))"#
            ),
            "{}",
            common::pretty(&rows)
        );
        assert_eq!(common::params(&rows), vec!["%50\\%%", "%\\_x"]);
        Ok(())
    }
}
