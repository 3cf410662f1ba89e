use dbcut_schema::{Relationship, RelationshipDirection, Schema, Table};

use super::*;

fn bare_table(name: &str) -> Table {
    Table {
        name: name.to_string(),
        columns: vec![],
        primary_key: vec!["id".into()],
        unique_constraints: vec![],
        indexes: vec![],
        foreign_keys: vec![],
    }
}

fn rel(
    name: &str,
    direction: RelationshipDirection,
    local: &str,
    remote: &str,
) -> Relationship {
    Relationship {
        name: name.to_string(),
        direction,
        local_table: local.to_string(),
        local_columns: vec![],
        remote_table: remote.to_string(),
        remote_columns: vec![],
        back_populates: None,
        association_table: None,
    }
}

fn books_authors_tags_schema() -> Schema {
    let mut schema = Schema::new();
    schema.insert_table(bare_table("books"));
    schema.insert_table(bare_table("authors"));
    schema.insert_table(bare_table("tags"));
    schema.relationships = vec![
        rel("tags", RelationshipDirection::ManyToMany, "books", "tags"),
        rel("author", RelationshipDirection::ManyToOne, "books", "authors"),
        rel("books", RelationshipDirection::OneToMany, "authors", "books"),
    ];
    schema
}

#[test]
fn out_edges_puts_many_to_one_before_collection_edges() {
    let schema = books_authors_tags_schema();
    let graph = RelationGraph::new(&schema);
    let edges = graph.out_edges("books");
    assert_eq!(edges[0].direction, RelationshipDirection::ManyToOne);
    assert_eq!(edges[0].name, "author");
    assert_eq!(edges[1].direction, RelationshipDirection::ManyToMany);
}

#[test]
fn out_edges_orders_siblings_of_the_same_rank_by_name() {
    let mut schema = Schema::new();
    schema.insert_table(bare_table("root"));
    schema.insert_table(bare_table("a"));
    schema.insert_table(bare_table("b"));
    schema.relationships = vec![
        rel("z_edge", RelationshipDirection::ManyToOne, "root", "b"),
        rel("a_edge", RelationshipDirection::ManyToOne, "root", "a"),
    ];
    let graph = RelationGraph::new(&schema);
    let edges = graph.out_edges("root");
    assert_eq!(edges[0].name, "a_edge");
    assert_eq!(edges[1].name, "z_edge");
}

#[test]
fn self_referencing_table_is_reachable_in_a_single_hop() {
    let mut schema = Schema::new();
    schema.insert_table(bare_table("employees"));
    schema.relationships = vec![rel(
        "manager",
        RelationshipDirection::ManyToOne,
        "employees",
        "employees",
    )];
    let graph = RelationGraph::new(&schema);
    let path = graph.find_path("employees", "employees").unwrap();
    // `from == to` short-circuits to the empty path; the self-edge itself
    // is reachable as a single out-edge, not via find_path-to-self.
    assert!(path.is_empty());
    let edges = graph.out_edges("employees");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].remote_table, "employees");
}

#[test]
fn find_path_returns_shortest_route_across_multiple_hops() {
    let schema = books_authors_tags_schema();
    let graph = RelationGraph::new(&schema);
    let path = graph.find_path("books", "tags").unwrap();
    assert_eq!(path.len(), 1);
    assert_eq!(path[0].remote_table, "tags");
}

#[test]
fn find_path_returns_none_when_unreachable() {
    let mut schema = Schema::new();
    schema.insert_table(bare_table("islands"));
    schema.insert_table(bare_table("mainland"));
    let graph = RelationGraph::new(&schema);
    assert!(graph.find_path("islands", "mainland").is_none());
}

#[test]
fn is_association_flags_only_tables_used_as_an_association() {
    let mut schema = Schema::new();
    schema.insert_table(bare_table("books"));
    schema.insert_table(bare_table("tags"));
    schema.insert_table(bare_table("book_tags"));
    let mut m2m = rel("tags", RelationshipDirection::ManyToMany, "books", "tags");
    m2m.association_table = Some("book_tags".to_string());
    schema.relationships = vec![m2m];
    let graph = RelationGraph::new(&schema);
    assert!(graph.is_association("book_tags"));
    assert!(!graph.is_association("books"));
}
