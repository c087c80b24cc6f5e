//! Query execution against a loaded snapshot
//!
//! Bindings are enumerated with a backtracking join over the pattern
//! variables. Node and neighbor iteration is BTree-ordered, so output is
//! deterministic for a given snapshot version.

use crate::error::{GraphError, Result};
use crate::model::PropertyValue;
use crate::query::ast::*;
use crate::query::table::Table;
use crate::schema;
use crate::snapshot::GraphSnapshot;
use std::collections::BTreeMap;

/// Execute a parsed query
pub fn execute(snapshot: &GraphSnapshot, query: &Query) -> Result<Table> {
    let mut combined: Option<Table> = None;

    for select in &query.selects {
        let table = execute_select(snapshot, select)?;
        match combined.as_mut() {
            None => combined = Some(table),
            Some(acc) => {
                if acc.columns.len() != table.columns.len() {
                    return Err(GraphError::Parse(format!(
                        "UNION branches return {} and {} columns",
                        acc.columns.len(),
                        table.columns.len()
                    )));
                }
                acc.rows.extend(table.rows);
            }
        }
    }

    let mut table = combined.unwrap_or_default();
    if query.selects.len() > 1 {
        // UNION is duplicate-eliminating
        table.dedupe();
    }
    Ok(table)
}

/// An edge constraint normalized to storage direction
#[derive(Debug)]
struct EdgeConstraint {
    from: String,
    rel: String,
    to: String,
}

fn execute_select(snapshot: &GraphSnapshot, select: &Select) -> Result<Table> {
    // Variable registration and label inference
    let mut labels: BTreeMap<String, Option<String>> = BTreeMap::new();
    let mut var_order: Vec<String> = Vec::new();
    let mut edges: Vec<EdgeConstraint> = Vec::new();
    let mut anon = 0usize;

    for pattern in &select.patterns {
        let mut names = Vec::new();
        for node in &pattern.nodes {
            let name = match &node.var {
                Some(v) => v.clone(),
                None => {
                    anon += 1;
                    format!("$anon{}", anon)
                }
            };
            if let Some(label) = &node.label {
                if !schema::is_label(label) {
                    return Err(GraphError::UnknownLabel(label.clone()));
                }
                assign_label(&mut labels, &name, label)?;
            } else {
                labels.entry(name.clone()).or_insert(None);
            }
            if !var_order.contains(&name) {
                var_order.push(name.clone());
            }
            names.push(name);
        }

        for (i, hop) in pattern.hops.iter().enumerate() {
            let (from_label, to_label) = schema::relationship(&hop.rel)
                .ok_or_else(|| GraphError::UnknownRelationship(hop.rel.clone()))?;
            let (from_var, to_var) = match hop.direction {
                Direction::Out => (names[i].clone(), names[i + 1].clone()),
                Direction::In => (names[i + 1].clone(), names[i].clone()),
            };
            // Relationship endpoints pin the variable labels
            assign_label(&mut labels, &from_var, from_label)?;
            assign_label(&mut labels, &to_var, to_label)?;
            edges.push(EdgeConstraint {
                from: from_var,
                rel: hop.rel.clone(),
                to: to_var,
            });
        }
    }

    let labels: BTreeMap<String, String> = labels
        .into_iter()
        .map(|(var, label)| {
            label
                .map(|l| (var.clone(), l))
                .ok_or_else(|| GraphError::Parse(format!("variable '{}' needs a label", var)))
        })
        .collect::<Result<_>>()?;

    // Attribute validation against the snapshot schema
    let mut operands: Vec<&Operand> = select.items.iter().map(|i| &i.operand).collect();
    if let Some(filter) = &select.filter {
        collect_operands(filter, &mut operands);
    }
    for operand in operands {
        if let Operand::Property { var, prop } = operand {
            let label = labels.get(var).ok_or_else(|| {
                GraphError::Parse(format!("unbound variable '{}' in expression", var))
            })?;
            if !snapshot.schema().has_column(label, prop) {
                return Err(GraphError::InvalidAttribute {
                    token: prop.clone(),
                    label: label.clone(),
                });
            }
        }
    }

    // Enumerate bindings
    let columns: Vec<String> = select.items.iter().map(|i| i.column_name()).collect();
    let mut table = Table::new(columns);

    let mut binding: BTreeMap<String, String> = BTreeMap::new();
    enumerate(
        snapshot,
        select,
        &var_order,
        &labels,
        &edges,
        &mut binding,
        0,
        &mut table,
    )?;

    if select.distinct {
        table.dedupe();
    }

    if !select.order_by.is_empty() {
        sort_rows(&mut table, &select.order_by)?;
    }

    if let Some(limit) = select.limit {
        table.rows.truncate(limit);
    }

    Ok(table)
}

fn assign_label(
    labels: &mut BTreeMap<String, Option<String>>,
    var: &str,
    label: &str,
) -> Result<()> {
    match labels.get(var) {
        Some(Some(existing)) if existing != label => Err(GraphError::Parse(format!(
            "variable '{}' is both {} and {}",
            var, existing, label
        ))),
        _ => {
            labels.insert(var.to_string(), Some(label.to_string()));
            Ok(())
        }
    }
}

fn collect_operands<'a>(expr: &'a Expr, out: &mut Vec<&'a Operand>) {
    match expr {
        Expr::And(a, b) | Expr::Or(a, b) => {
            collect_operands(a, out);
            collect_operands(b, out);
        }
        Expr::Not(inner) => collect_operands(inner, out),
        Expr::Cmp { left, right, .. }
        | Expr::Contains { left, right }
        | Expr::StartsWith { left, right } => {
            out.push(left);
            out.push(right);
        }
        Expr::In { left, .. } => out.push(left),
        Expr::IsNull { operand, .. } => out.push(operand),
    }
}

#[allow(clippy::too_many_arguments)]
fn enumerate(
    snapshot: &GraphSnapshot,
    select: &Select,
    var_order: &[String],
    labels: &BTreeMap<String, String>,
    edges: &[EdgeConstraint],
    binding: &mut BTreeMap<String, String>,
    depth: usize,
    table: &mut Table,
) -> Result<()> {
    if depth == var_order.len() {
        // All edge constraints must hold
        for edge in edges {
            let from = &binding[&edge.from];
            let to = &binding[&edge.to];
            if !snapshot.has_edge(&edge.rel, from, to) {
                return Ok(());
            }
        }
        if let Some(filter) = &select.filter {
            if !eval_expr(snapshot, labels, binding, filter)? {
                return Ok(());
            }
        }
        let row = select
            .items
            .iter()
            .map(|item| resolve(snapshot, labels, binding, &item.operand))
            .collect::<Result<Vec<_>>>()?;
        table.rows.push(row);
        return Ok(());
    }

    let var = &var_order[depth];
    let label = &labels[var];

    // Prefer adjacency over a full label scan when a bound neighbor exists
    let mut candidates: Option<Vec<String>> = None;
    for edge in edges {
        if edge.to == *var {
            if let Some(from_id) = binding.get(&edge.from) {
                let neighbors: Vec<String> = snapshot
                    .out_neighbors(&edge.rel, from_id)
                    .map(String::from)
                    .collect();
                candidates = Some(intersect(candidates, neighbors));
            }
        } else if edge.from == *var {
            if let Some(to_id) = binding.get(&edge.to) {
                let neighbors: Vec<String> = snapshot
                    .in_neighbors(&edge.rel, to_id)
                    .map(String::from)
                    .collect();
                candidates = Some(intersect(candidates, neighbors));
            }
        }
    }

    let candidates = match candidates {
        Some(ids) => ids,
        None => snapshot.nodes(label).map(|n| n.external_id.clone()).collect(),
    };

    for id in candidates {
        // Neighbor ids must exist under the variable's label
        if snapshot.node(label, &id).is_none() {
            continue;
        }
        binding.insert(var.clone(), id);
        enumerate(snapshot, select, var_order, labels, edges, binding, depth + 1, table)?;
        binding.remove(var);
    }

    Ok(())
}

fn intersect(existing: Option<Vec<String>>, new: Vec<String>) -> Vec<String> {
    match existing {
        None => new,
        Some(old) => old.into_iter().filter(|id| new.contains(id)).collect(),
    }
}

fn resolve(
    snapshot: &GraphSnapshot,
    labels: &BTreeMap<String, String>,
    binding: &BTreeMap<String, String>,
    operand: &Operand,
) -> Result<PropertyValue> {
    match operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Property { var, prop } => {
            let label = &labels[var];
            let id = binding.get(var).ok_or_else(|| {
                GraphError::Parse(format!("variable '{}' is not bound", var))
            })?;
            Ok(snapshot
                .node(label, id)
                .map(|n| n.property(prop))
                .unwrap_or(PropertyValue::Null))
        }
    }
}

fn eval_expr(
    snapshot: &GraphSnapshot,
    labels: &BTreeMap<String, String>,
    binding: &BTreeMap<String, String>,
    expr: &Expr,
) -> Result<bool> {
    match expr {
        Expr::And(a, b) => Ok(eval_expr(snapshot, labels, binding, a)?
            && eval_expr(snapshot, labels, binding, b)?),
        Expr::Or(a, b) => Ok(eval_expr(snapshot, labels, binding, a)?
            || eval_expr(snapshot, labels, binding, b)?),
        Expr::Not(inner) => Ok(!eval_expr(snapshot, labels, binding, inner)?),
        Expr::Cmp { left, op, right } => {
            let l = resolve(snapshot, labels, binding, left)?;
            let r = resolve(snapshot, labels, binding, right)?;
            Ok(compare(&l, *op, &r))
        }
        Expr::Contains { left, right } => {
            let l = resolve(snapshot, labels, binding, left)?;
            let r = resolve(snapshot, labels, binding, right)?;
            let Some(needle) = r.as_text() else {
                return Ok(false);
            };
            Ok(match &l {
                PropertyValue::Text(haystack) => haystack.contains(needle),
                // Existential semantics on list-valued attributes
                PropertyValue::List(items) => items
                    .iter()
                    .any(|item| item.as_text().is_some_and(|s| s.contains(needle))),
                _ => false,
            })
        }
        Expr::StartsWith { left, right } => {
            let l = resolve(snapshot, labels, binding, left)?;
            let r = resolve(snapshot, labels, binding, right)?;
            match (l.as_text(), r.as_text()) {
                (Some(value), Some(prefix)) => Ok(value.starts_with(prefix)),
                _ => Ok(false),
            }
        }
        Expr::In { left, list } => {
            let l = resolve(snapshot, labels, binding, left)?;
            Ok(list.iter().any(|item| values_equal(&l, item)))
        }
        Expr::IsNull { operand, negated } => {
            let value = resolve(snapshot, labels, binding, operand)?;
            Ok(value.is_null() != *negated)
        }
    }
}

/// Comparisons involving null are false, matching the source dialect
fn compare(left: &PropertyValue, op: CmpOp, right: &PropertyValue) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }
    match op {
        CmpOp::Eq => values_equal(left, right),
        CmpOp::Ne => !values_equal(left, right),
        CmpOp::Lt => left.compare(right) == std::cmp::Ordering::Less,
        CmpOp::Le => left.compare(right) != std::cmp::Ordering::Greater,
        CmpOp::Gt => left.compare(right) == std::cmp::Ordering::Greater,
        CmpOp::Ge => left.compare(right) != std::cmp::Ordering::Less,
    }
}

fn values_equal(left: &PropertyValue, right: &PropertyValue) -> bool {
    use PropertyValue::*;
    match (left, right) {
        (Null, _) | (_, Null) => false,
        (Int(a), Float(b)) => (*a as f64) == *b,
        (Float(a), Int(b)) => *a == (*b as f64),
        (a, b) => a == b,
    }
}

fn sort_rows(table: &mut Table, keys: &[OrderKey]) -> Result<()> {
    let mut indices = Vec::new();
    for key in keys {
        let index = table
            .columns
            .iter()
            .position(|c| c == &key.column)
            .ok_or_else(|| {
                GraphError::Parse(format!("ORDER BY references unknown column '{}'", key.column))
            })?;
        indices.push((index, key.descending));
    }

    table.rows.sort_by(|a, b| {
        for (index, descending) in &indices {
            let ordering = a[*index].compare(&b[*index]);
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use crate::query::run_query;
    use crate::snapshot::{insert_edge, person, upsert_node, GraphData};

    fn snapshot() -> GraphSnapshot {
        let mut data = GraphData::default();
        upsert_node(
            &mut data,
            "Person",
            person("p1", "kim@acme.com", "active").with_text("department", "Engineering"),
        );
        upsert_node(
            &mut data,
            "Person",
            person("p2", "lee@acme.com", "suspended").with_text("department", "Sales"),
        );
        upsert_node(
            &mut data,
            "Person",
            person("p3", "ana@acme.com", "active").with_text("department", "Engineering"),
        );
        upsert_node(&mut data, "Team", Node::new("t1").with_text("name", "Platform"));
        upsert_node(&mut data, "Application", Node::new("a1").with_text("label", "Jira"));
        upsert_node(&mut data, "Application", Node::new("a2").with_text("label", "Slack"));
        insert_edge(&mut data, "MEMBER_OF", "p1", "t1");
        insert_edge(&mut data, "MEMBER_OF", "p3", "t1");
        insert_edge(&mut data, "GROUP_HAS_ACCESS", "t1", "a1");
        insert_edge(&mut data, "HAS_ACCESS", "p1", "a2");
        GraphSnapshot::new(1, data)
    }

    #[test]
    fn filters_and_projects() {
        let table = run_query(
            &snapshot(),
            "MATCH (p:Person) WHERE p.status = 'active' RETURN p.email ORDER BY p.email",
        )
        .unwrap();
        assert_eq!(table.columns, vec!["p.email"]);
        let emails: Vec<_> = table.rows.iter().map(|r| r[0].as_text().unwrap()).collect();
        assert_eq!(emails, vec!["ana@acme.com", "kim@acme.com"]);
    }

    #[test]
    fn hop_patterns_bind_through_edges() {
        let table = run_query(
            &snapshot(),
            "MATCH (p:Person)-[:MEMBER_OF]->(t:Team) WHERE t.name = 'Platform' \
             RETURN p.email ORDER BY p.email",
        )
        .unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn reverse_hops_match_the_same_edges() {
        let table = run_query(
            &snapshot(),
            "MATCH (t:Team)<-[:MEMBER_OF]-(p:Person) RETURN p.email ORDER BY p.email",
        )
        .unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn union_access_pattern_combines_paths() {
        let query = "MATCH (p:Person)-[:HAS_ACCESS]->(a:Application) \
                     WHERE p.id = 'p1' RETURN a.label AS app \
                     UNION \
                     MATCH (p:Person)-[:MEMBER_OF]->(t:Team)-[:GROUP_HAS_ACCESS]->(a:Application) \
                     WHERE p.id = 'p1' RETURN a.label AS app";
        let table = run_query(&snapshot(), query).unwrap();
        let mut apps: Vec<_> = table.rows.iter().map(|r| r[0].as_text().unwrap().to_string()).collect();
        apps.sort();
        assert_eq!(apps, vec!["Jira", "Slack"]);
    }

    #[test]
    fn invalid_attribute_names_the_token() {
        let err = run_query(&snapshot(), "MATCH (p:Person) RETURN p.favourite_color").unwrap_err();
        match err {
            GraphError::InvalidAttribute { token, label } => {
                assert_eq!(token, "favourite_color");
                assert_eq!(label, "Person");
            }
            other => panic!("expected InvalidAttribute, got {:?}", other),
        }
    }

    #[test]
    fn unknown_label_and_relationship_are_structured_errors() {
        assert!(matches!(
            run_query(&snapshot(), "MATCH (d:Device) RETURN d.id"),
            Err(GraphError::UnknownLabel(_))
        ));
        assert!(matches!(
            run_query(&snapshot(), "MATCH (p:Person)-[:OWNS]->(a:Application) RETURN a.id"),
            Err(GraphError::UnknownRelationship(_))
        ));
    }

    #[test]
    fn relationship_endpoints_pin_mismatched_labels() {
        let err = run_query(
            &snapshot(),
            "MATCH (a:Application)-[:MEMBER_OF]->(t:Team) RETURN t.name",
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::Parse(_)));
    }

    #[test]
    fn distinct_order_limit() {
        let table = run_query(
            &snapshot(),
            "MATCH (p:Person) RETURN DISTINCT p.department AS dept ORDER BY dept",
        )
        .unwrap();
        let depts: Vec<_> = table.rows.iter().map(|r| r[0].as_text().unwrap()).collect();
        assert_eq!(depts, vec!["Engineering", "Sales"]);

        let limited = run_query(
            &snapshot(),
            "MATCH (p:Person) RETURN p.email ORDER BY p.email LIMIT 1",
        )
        .unwrap();
        assert_eq!(limited.row_count(), 1);
    }

    #[test]
    fn re_execution_is_deterministic() {
        let query = "MATCH (p:Person) RETURN p.email, p.status";
        let snap = snapshot();
        let first = run_query(&snap, query).unwrap();
        let second = run_query(&snap, query).unwrap();
        assert_eq!(first.to_row_objects(), second.to_row_objects());
    }

    #[test]
    fn contains_matches_list_elements() {
        let mut data = GraphData::default();
        let mut schema_node = person("p9", "dev@acme.com", "active");
        schema_node.properties.insert(
            "second_email".to_string(),
            PropertyValue::List(vec![
                PropertyValue::Text("dev@corp.example".to_string()),
                PropertyValue::Text("oncall@acme.com".to_string()),
            ]),
        );
        upsert_node(&mut data, "Person", schema_node);
        let snap = GraphSnapshot::new(1, data);

        let table = run_query(
            &snap,
            "MATCH (p:Person) WHERE p.second_email CONTAINS 'oncall' RETURN p.email",
        )
        .unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn comparisons_with_null_are_false() {
        let table = run_query(
            &snapshot(),
            "MATCH (p:Person) WHERE p.last_login = 'never' RETURN p.email",
        )
        .unwrap();
        assert_eq!(table.row_count(), 0);

        let null_check = run_query(
            &snapshot(),
            "MATCH (p:Person) WHERE p.last_login IS NULL RETURN p.email",
        )
        .unwrap();
        assert_eq!(null_check.row_count(), 3);
    }
}
