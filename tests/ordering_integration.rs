//! Integration tests for dependency ranking and snapshot loading

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use realign::model::{
    ColumnSpec, DependencyGraph, Engine, ForeignKeySpec, IndexSpec, ListedKind, ListingFilter,
    MetadataLoader, MetadataModel, QualifiedName, Scope, SnapshotLoader, TableData, TableEntity,
    Value, read_snapshot, save_snapshot,
};

fn q(name: &str) -> QualifiedName {
    QualifiedName::parse(name, "dbo")
}

fn table(name: &str, parents: &[&str]) -> TableEntity {
    let mut table = TableEntity::new(q(name))
        .with_column(ColumnSpec::new("id", "int").not_null())
        .with_index(IndexSpec::primary_key(format!("pk_{}", q(name).name), &["id"]));
    for parent in parents {
        let column = format!("{}_id", q(parent).name);
        table = table
            .with_column(ColumnSpec::new(column.as_str(), "int"))
            .with_foreign_key(ForeignKeySpec::new(
                format!("fk_{}_{}", q(name).name, q(parent).name),
                q(parent),
                &[(column.as_str(), "id")],
            ));
    }
    table
}

/// customers <- orders <- order_lines -> products, plus a self-reference
/// and an independent lookup table in another schema.
fn shop() -> MetadataModel {
    MetadataModel::new(Engine::Mssql)
        .with_table(table("order_lines", &["orders", "products"]))
        .with_table(table("orders", &["customers"]))
        .with_table(table("customers", &["customers"]))
        .with_table(table("products", &[]))
        .with_table(table("ref.countries", &[]))
}

#[test]
fn test_every_child_ranks_after_its_parents() {
    let model = shop();
    let tables: Vec<QualifiedName> = model.tables.keys().cloned().collect();
    let graph = DependencyGraph::from_model(&model, &tables);
    let order = graph.topological_order();

    assert!(!order.has_cycle());
    assert_eq!(order.ranked().len(), tables.len());
    for edge in graph.edges() {
        let child = order.rank(&edge.source).unwrap();
        let parent = order.rank(&edge.target).unwrap();
        assert!(child > parent, "{} must rank after {}", edge.source, edge.target);
    }
}

#[test]
fn test_parentless_tables_take_the_minimum_rank() {
    let model = shop();
    let tables: Vec<QualifiedName> = model.tables.keys().cloned().collect();
    let order = DependencyGraph::from_model(&model, &tables).topological_order();

    assert_eq!(order.rank(&q("customers")), Some(1), "self-references are ignored");
    assert_eq!(order.rank(&q("products")), Some(1));
    assert_eq!(order.rank(&q("ref.countries")), Some(1));
    assert_eq!(order.rank(&q("orders")), Some(2));
    assert_eq!(order.rank(&q("order_lines")), Some(3));
    assert_eq!(order.max_rank(), 3);
}

#[test]
fn test_ranking_a_subset_ignores_outside_parents() {
    let model = shop();
    let order = DependencyGraph::from_model(&model, &[q("orders"), q("order_lines")])
        .topological_order();
    assert_eq!(order.rank(&q("orders")), Some(1));
    assert_eq!(order.rank(&q("order_lines")), Some(2));
}

#[test]
fn test_cycles_fall_back_to_a_flat_order() {
    let model = MetadataModel::new(Engine::Mssql)
        .with_table(table("a", &["b"]))
        .with_table(table("b", &["a"]))
        .with_table(table("c", &[]));
    let tables: Vec<QualifiedName> = model.tables.keys().cloned().collect();
    let order = DependencyGraph::from_model(&model, &tables).topological_order();

    assert!(order.has_cycle());
    assert_eq!(order.cycle(), &[q("a"), q("b")]);
    assert!(order.ranked().iter().all(|(_, rank)| *rank == 1));
    assert_eq!(order.entity_rank(), 2);
}

#[tokio::test]
async fn test_snapshot_file_round_trip_and_listing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("shop.json");
    let model = shop().with_data(
        TableData::new(q("products"), &["id"]).with_row(vec![Value::from(7)]),
    );
    save_snapshot(&model, &path).unwrap();

    let loaded = read_snapshot(&path).await.unwrap();
    assert_eq!(loaded, model);

    let loader = SnapshotLoader::new(&path);
    let listing = loader
        .load_entity_list(&ListingFilter {
            schemas: vec!["dbo".into()],
            tables_only: true,
        })
        .await
        .unwrap();
    let names: Vec<(&str, u32)> = listing
        .iter()
        .map(|l| (l.name.as_str(), l.sort_order))
        .collect();
    assert_eq!(
        names,
        vec![("customers", 1), ("products", 1), ("orders", 2), ("order_lines", 3)]
    );
    assert!(listing.iter().all(|l| l.kind == ListedKind::Table));

    let scoped = loader
        .load_metadata(&Scope::all().with_schemas(["ref"]))
        .await
        .unwrap();
    assert_eq!(scoped.tables.len(), 1);
    assert!(scoped.data.is_empty());
}
