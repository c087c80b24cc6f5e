//! Union-access correctness
//!
//! For any person, the canonical union query must return exactly
//! `direct_assignments ∪ {app | person MEMBER_OF team ∧ team GROUP_HAS_ACCESS app}`.

use graphstore::snapshot::{insert_edge, person, upsert_node, GraphData};
use graphstore::{run_query, GraphSnapshot, Node};
use std::collections::BTreeSet;

fn union_query(person_id: &str) -> String {
    format!(
        "MATCH (p:Person)-[:HAS_ACCESS]->(a:Application) WHERE p.id = '{id}' RETURN a.id AS app \
         UNION \
         MATCH (p:Person)-[:MEMBER_OF]->(t:Team)-[:GROUP_HAS_ACCESS]->(a:Application) \
         WHERE p.id = '{id}' RETURN a.id AS app",
        id = person_id
    )
}

fn app_set(snapshot: &GraphSnapshot, person_id: &str) -> BTreeSet<String> {
    run_query(snapshot, &union_query(person_id))
        .unwrap()
        .rows
        .iter()
        .map(|row| row[0].as_text().unwrap().to_string())
        .collect()
}

#[test]
fn person_with_no_access_returns_empty() {
    // Seed scenario A: one person, no teams, no direct apps
    let mut data = GraphData::default();
    upsert_node(&mut data, "Person", person("p1", "p1@acme.com", "active"));
    upsert_node(&mut data, "Application", Node::new("x1").with_text("label", "X"));
    let snapshot = GraphSnapshot::new(1, data);

    assert!(app_set(&snapshot, "p1").is_empty());
}

#[test]
fn team_mediated_access_is_included() {
    // Seed scenario B: p1 MEMBER_OF t1, t1 GROUP_HAS_ACCESS a1
    let mut data = GraphData::default();
    upsert_node(&mut data, "Person", person("p1", "p1@acme.com", "active"));
    upsert_node(&mut data, "Team", Node::new("t1").with_text("name", "Eng"));
    upsert_node(&mut data, "Application", Node::new("a1").with_text("label", "Jira"));
    insert_edge(&mut data, "MEMBER_OF", "p1", "t1");
    insert_edge(&mut data, "GROUP_HAS_ACCESS", "t1", "a1");
    let snapshot = GraphSnapshot::new(1, data);

    let apps = app_set(&snapshot, "p1");
    assert_eq!(apps.into_iter().collect::<Vec<_>>(), vec!["a1".to_string()]);
}

#[test]
fn union_equals_direct_plus_team_mediated_for_every_person() {
    // Two people with overlapping direct and team-scoped assignments
    let mut data = GraphData::default();
    for (id, email) in [("p1", "p1@acme.com"), ("p2", "p2@acme.com")] {
        upsert_node(&mut data, "Person", person(id, email, "active"));
    }
    for team in ["t1", "t2"] {
        upsert_node(&mut data, "Team", Node::new(team).with_text("name", team));
    }
    for app in ["a1", "a2", "a3", "a4"] {
        upsert_node(&mut data, "Application", Node::new(app).with_text("label", app));
    }

    // p1: direct a1, via t1 a2; a2 also direct (overlap)
    insert_edge(&mut data, "HAS_ACCESS", "p1", "a1");
    insert_edge(&mut data, "HAS_ACCESS", "p1", "a2");
    insert_edge(&mut data, "MEMBER_OF", "p1", "t1");
    insert_edge(&mut data, "GROUP_HAS_ACCESS", "t1", "a2");
    // p2: via t2 only
    insert_edge(&mut data, "MEMBER_OF", "p2", "t2");
    insert_edge(&mut data, "GROUP_HAS_ACCESS", "t2", "a3");
    insert_edge(&mut data, "GROUP_HAS_ACCESS", "t2", "a4");

    let snapshot = GraphSnapshot::new(1, data);

    for person_id in ["p1", "p2"] {
        let from_query = app_set(&snapshot, person_id);
        let from_engine = snapshot.accessible_applications(person_id);
        assert_eq!(from_query, from_engine, "person {}", person_id);
    }

    assert_eq!(
        app_set(&snapshot, "p1").into_iter().collect::<Vec<_>>(),
        vec!["a1".to_string(), "a2".to_string()]
    );
    assert_eq!(
        app_set(&snapshot, "p2").into_iter().collect::<Vec<_>>(),
        vec!["a3".to_string(), "a4".to_string()]
    );
}

#[test]
fn missing_one_branch_is_incorrect() {
    // The direct-only query must under-report for a team-mediated person,
    // which is exactly why the union is mandatory.
    let mut data = GraphData::default();
    upsert_node(&mut data, "Person", person("p1", "p1@acme.com", "active"));
    upsert_node(&mut data, "Team", Node::new("t1"));
    upsert_node(&mut data, "Application", Node::new("a1"));
    insert_edge(&mut data, "MEMBER_OF", "p1", "t1");
    insert_edge(&mut data, "GROUP_HAS_ACCESS", "t1", "a1");
    let snapshot = GraphSnapshot::new(1, data);

    let direct_only = run_query(
        &snapshot,
        "MATCH (p:Person)-[:HAS_ACCESS]->(a:Application) WHERE p.id = 'p1' RETURN a.id",
    )
    .unwrap();
    assert_eq!(direct_only.row_count(), 0);
    assert_eq!(app_set(&snapshot, "p1").len(), 1);
}
