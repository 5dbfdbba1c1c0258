//! End-to-end tests against an in-memory `SQLite` database.

#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{catalogue, ids, init_tracing};
use omnia_query::{
    Client, Connection, Count, Error, OrderOptions, Relationships, Render, SelectOptions,
    UpsertOptions,
};
use omnia_sql::SqliteConnection;
use serde_json::json;

#[tokio::test]
async fn latest_active_products_with_category() {
    let (client, _) = catalogue();

    let result = client
        .from("products")
        .select("id,title,category(name)")
        .eq("active", true)
        .order("created_at", OrderOptions::desc())
        .limit(5)
        .await;

    assert!(result.is_ok(), "{:?}", result.error);
    assert_eq!(ids(&result.data), [10, 8, 6, 4, 2]);
    assert_eq!(
        result.data[0],
        json!({"id": 10, "title": "Product 10", "category": {"name": "Garden"}})
    );
    assert_eq!(
        result.data[4],
        json!({"id": 2, "title": "Product 2", "category": {"name": "Tools"}})
    );
}

#[tokio::test]
async fn has_many_relation() {
    let (client, _) = catalogue();

    let result =
        client.from("categories").select("id,tags(label)").order("id", OrderOptions::default()).await;

    assert!(result.is_ok(), "{:?}", result.error);
    let labels = result.data[0]["tags"]
        .as_array()
        .expect("three tags")
        .iter()
        .map(|tag| tag["label"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(labels.len(), 3);
    assert!(labels.contains(&"screws".to_string()));

    assert_eq!(result.data[1], json!({"id": 2, "tags": null}));
    assert_eq!(result.data[2], json!({"id": 3, "tags": {"label": "rake"}}));
}

#[tokio::test]
async fn has_many_with_text_keys() {
    init_tracing();
    let conn = SqliteConnection::in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE categories (id TEXT PRIMARY KEY, name TEXT);
         CREATE TABLE products (id TEXT PRIMARY KEY, category_id TEXT);
         INSERT INTO categories VALUES ('cat-1', 'Tools'), ('cat-2', 'Garden');
         INSERT INTO products VALUES ('p-1', 'cat-1'), ('p-2', 'cat-1'), ('p-3', 'cat-1'), ('p-4', 'cat-2');",
    )
    .unwrap();
    let client = Client::new(Arc::new(conn) as Arc<dyn Connection>)
        .with_relationships(Relationships::new().reverse("products"));

    let result = client.from("categories").select("id,products(id)").eq("id", "cat-1").await;

    assert!(result.is_ok(), "{:?}", result.error);
    let rows = result.data.as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!("cat-1"));

    let mut products = rows[0]["products"]
        .as_array()
        .expect("array of products")
        .iter()
        .map(|product| product["id"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    products.sort();
    assert_eq!(products, ["p-1", "p-2", "p-3"]);
}

#[tokio::test]
async fn relation_filter_narrows_main_rows() {
    let (client, _) = catalogue();

    let result = client
        .from("products")
        .select("id,category(name)")
        .eq("category.name", "Garden")
        .order("id", OrderOptions::default())
        .await;

    assert!(result.is_ok(), "{:?}", result.error);
    assert_eq!(ids(&result.data), [7, 8, 9, 10]);
}

#[tokio::test]
async fn inner_relation_excludes_orphans() {
    let (client, conn) = catalogue();
    conn.execute_batch(
        "INSERT INTO products (id, title, created_at, category_id) VALUES (11, 'Orphan', '2024-02-01', NULL);
         INSERT INTO products (id, title, created_at, category_id) VALUES (12, 'Dangling', '2024-02-02', 99);",
    )
    .unwrap();

    let all =
        client.from("products").select("id").gt("id", 9).order("id", OrderOptions::default()).await;
    assert_eq!(ids(&all.data), [10, 11, 12]);

    let inner = client
        .from("products")
        .select("id,category!inner(name)")
        .gt("id", 9)
        .order("id", OrderOptions::default())
        .await;
    assert_eq!(ids(&inner.data), [10]);
}

#[tokio::test]
async fn range_and_exact_count() {
    let (client, _) = catalogue();

    let options = SelectOptions {
        count: Some(Count::Exact),
        head: false,
    };
    let result = client
        .from("products")
        .select_with("id", options)
        .order("id", OrderOptions::default())
        .range(2, 4)
        .await;

    assert_eq!(result.count, Some(10));
    assert_eq!(ids(&result.data), [3, 4, 5]);
}

#[tokio::test]
async fn or_group_and_null_ordering() {
    let (client, conn) = catalogue();
    conn.execute_batch("UPDATE products SET price = NULL WHERE id IN (1, 2)").unwrap();

    let result = client
        .from("products")
        .select("id")
        .or("price.is.null,price.gte.45")
        .order("price", OrderOptions::desc().nulls_first(false))
        .await;

    assert!(result.is_ok(), "{:?}", result.error);
    let found = ids(&result.data);
    assert_eq!(found.len(), 4);
    assert_eq!(found[..2], [10, 9]);

    // nulls last, in no particular order
    let mut nulls = found[2..].to_vec();
    nulls.sort_unstable();
    assert_eq!(nulls, [1, 2]);
}

#[tokio::test]
async fn or_group_matches_typed_predicate() {
    let (client, _) = catalogue();

    let direct = client.from("products").select("id").eq("active", true).order("id", OrderOptions::default()).await;
    let grouped =
        client.from("products").select("id").or("active.eq.true").order("id", OrderOptions::default()).await;

    assert!(grouped.is_ok(), "{:?}", grouped.error);
    assert_eq!(ids(&direct.data), [2, 4, 6, 8, 10]);
    assert_eq!(ids(&grouped.data), ids(&direct.data));
}

#[tokio::test]
async fn ilike_is_case_insensitive() {
    let (client, _) = catalogue();

    let result = client
        .from("products")
        .select("id")
        .ilike("title", "%product 1%")
        .order("id", OrderOptions::default())
        .await;

    assert!(result.is_ok(), "{:?}", result.error);
    assert_eq!(ids(&result.data), [1, 10]);
}

#[tokio::test]
async fn structured_values_are_stored_as_json_text() {
    let (client, conn) = catalogue();
    conn.execute_batch("CREATE TABLE documents (id INTEGER PRIMARY KEY, body TEXT, tags TEXT)").unwrap();

    let inserted = client
        .from("documents")
        .insert(json!({"id": 1, "body": {"a": 1}, "tags": ["x"]}))
        .select("*")
        .single()
        .await;
    assert!(inserted.is_ok(), "{:?}", inserted.error);
    assert_eq!(inserted.data["body"], json!(r#"{"a":1}"#));

    let found = client.from("documents").select("id").eq("tags", json!(["x"])).await;
    assert!(found.is_ok(), "{:?}", found.error);
    assert_eq!(ids(&found.data), [1]);
}

#[tokio::test]
async fn single_and_maybe_single() {
    let (client, _) = catalogue();

    let found = client.from("category").select("name").eq("id", 1).single().await;
    assert_eq!(found.data, json!({"name": "Tools"}));

    let missing = client.from("category").select("name").eq("id", 42).single().await;
    assert!(matches!(missing.error, Some(Error::NotFound { .. })));

    let maybe = client.from("category").select("name").eq("id", 42).maybe_single().await;
    assert!(maybe.is_ok());
    assert_eq!(maybe.data, json!(null));
}

#[tokio::test]
async fn insert_update_delete_round() {
    let (client, _) = catalogue();

    let inserted = client
        .from("category")
        .insert(json!([{"id": 3, "name": "Kitchen"}, {"id": 4, "name": "Bath"}]))
        .select("*")
        .await;
    assert!(inserted.is_ok(), "{:?}", inserted.error);
    assert_eq!(inserted.data.as_array().map(Vec::len), Some(2));

    let updated = client.from("category").update(json!({"name": "Bathroom"})).eq("id", 4).await;
    assert_eq!(updated.data, json!([{"id": 4, "name": "Bathroom"}]));

    let deleted = client.from("category").delete().r#in("id", [3, 4]).await;
    assert!(deleted.is_ok());
    assert_eq!(deleted.data, json!(null));

    let remaining = client.from("category").select("id").order("id", OrderOptions::default()).await;
    assert_eq!(ids(&remaining.data), [1, 2]);
}

#[tokio::test]
async fn insert_returning_with_relation() {
    let (client, _) = catalogue();

    let result = client
        .from("products")
        .insert(json!({"id": 20, "title": "Trowel", "created_at": "2024-03-01", "category_id": 2}))
        .select("id,title,category(name)")
        .single()
        .await;

    assert!(result.is_ok(), "{:?}", result.error);
    assert_eq!(result.data["category"], json!({"name": "Garden"}));
}

#[tokio::test]
async fn upsert_on_slug() {
    let (client, _) = catalogue();
    let options = UpsertOptions {
        on_conflict: Some("slug".to_string()),
    };

    let result = client
        .from("products")
        .upsert_with(
            json!({"slug": "product-3", "title": "Renamed", "created_at": "2024-01-03"}),
            options,
        )
        .await;
    assert!(result.is_ok(), "{:?}", result.error);

    let row = client.from("products").select("id,title").eq("slug", "product-3").single().await;
    assert_eq!(row.data, json!({"id": 3, "title": "Renamed"}));
}

#[tokio::test]
async fn bound_parameters() {
    let (client, _) = catalogue();
    let client = client.with_render(Render::Bound);

    let result = client
        .from("products")
        .select("id")
        .eq("title", "Product 4")
        .gte("price", 10)
        .limit(5)
        .await;

    assert!(result.is_ok(), "{:?}", result.error);
    assert_eq!(ids(&result.data), [4]);
}

#[tokio::test]
async fn missing_table_is_an_execution_error() {
    let (client, _) = catalogue();

    let result = client.from("nope").select("*").await;

    assert_eq!(result.data, json!(null));
    let err = result.error.expect("error");
    assert!(matches!(err, Error::Execution { .. }));
    assert!(err.message().contains("no such table"));
}
