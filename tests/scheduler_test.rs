mod common;

use common::test_registry;
use splice::compiler::core::Compiler;
use splice::compiler::exports::ExportOptions;
use splice::dsl::RawGraph;
use splice::dsl::builder::GraphBuilder;
use splice::error::CompileError;

fn schedule_of(graph: &RawGraph) -> Result<Vec<String>, CompileError> {
    let (registry, _) = test_registry();
    let compiled = Compiler::new(&registry).compile(graph, &ExportOptions::default())?;
    Ok(compiled.processors.iter().map(|p| p.node_id.to_string()).collect())
}

fn position(order: &[String], id: &str) -> usize {
    order.iter().position(|n| n == id).unwrap_or_else(|| panic!("{} not scheduled", id))
}

#[test]
fn test_simple_chain_order() {
    let graph = GraphBuilder::new()
        .node("B", "Double").slot("y").build()
        .add("A", "Emit")
        .link("A", 0, "B", 0, "INT")
        .build();

    assert_eq!(schedule_of(&graph).unwrap(), vec!["A", "B"]);
}

#[test]
fn test_diamond_is_topologically_valid() {
    // 1 -> 2, 1 -> 3, 2 -> 4.a, 3 -> 4.b; listed in reverse on purpose.
    let graph = GraphBuilder::new()
        .node("4", "Add").slot("a").slot("b").build()
        .node("3", "Double").slot("y").build()
        .node("2", "Double").slot("y").build()
        .add("1", "Emit")
        .link("1", 0, "2", 0, "INT")
        .link("1", 0, "3", 0, "INT")
        .link("2", 0, "4", 0, "INT")
        .link("3", 0, "4", 1, "INT")
        .build();

    let order = schedule_of(&graph).unwrap();
    assert_eq!(order.len(), 4);
    for link in &graph.links {
        assert!(
            position(&order, link.from_node.as_str()) < position(&order, link.to_node.as_str()),
            "{} must run before {}",
            link.from_node,
            link.to_node
        );
    }
    // Ties resolve to list order after each placement.
    assert_eq!(order, vec!["1", "3", "2", "4"]);
}

#[test]
fn test_schedule_is_deterministic() {
    let graph = GraphBuilder::new()
        .add("a", "Emit")
        .add("b", "Pair")
        .node("c", "Add").slot("a").slot("b").build()
        .node("d", "Double").slot("y").build()
        .link("a", 0, "c", 0, "INT")
        .link("b", 1, "c", 1, "INT")
        .link("c", 0, "d", 0, "INT")
        .build();

    let first = schedule_of(&graph).unwrap();
    for _ in 0..5 {
        assert_eq!(schedule_of(&graph).unwrap(), first);
    }
}

#[test]
fn test_order_hint_breaks_ties() {
    let graph = GraphBuilder::new()
        .node("late", "Emit").order(2).build()
        .node("early", "Emit").order(-1).build()
        .add("middle", "Emit")
        .node("also_middle", "Emit").order(0).build()
        .build();

    assert_eq!(schedule_of(&graph).unwrap(), vec!["early", "middle", "also_middle", "late"]);
}

#[test]
fn test_order_hint_never_overrides_dependencies() {
    let graph = GraphBuilder::new()
        .add("source", "Emit")
        .node("sink", "Double").slot("y").order(-5).build()
        .link("source", 0, "sink", 0, "INT")
        .build();

    assert_eq!(schedule_of(&graph).unwrap(), vec!["source", "sink"]);
}

#[test]
fn test_cycle_is_rejected() {
    let graph = GraphBuilder::new()
        .add("root", "Emit")
        .node("x", "Add").slot("a").slot("b").build()
        .node("y", "Double").slot("y").build()
        .link("root", 0, "x", 0, "INT")
        .link("y", 0, "x", 1, "INT")
        .link("x", 0, "y", 0, "INT")
        .build();

    match schedule_of(&graph) {
        Err(CompileError::DependencyCycle(nodes)) => {
            let ids: Vec<&str> = nodes.iter().map(|n| n.as_str()).collect();
            assert_eq!(ids, vec!["x", "y"]);
        }
        other => panic!("expected a cycle error, got {:?}", other),
    }
}

#[test]
fn test_self_link_is_a_cycle() {
    let graph = GraphBuilder::new()
        .node("loop", "Double").slot("y").build()
        .link("loop", 0, "loop", 0, "INT")
        .build();

    let err = schedule_of(&graph).unwrap_err();
    assert!(matches!(err, CompileError::DependencyCycle(_)));
    assert!(err.to_string().contains("loop"));
}
