use super::*;

fn mysql(expr: &Expr) -> BuiltQuery {
    expr.build(Dialect::MySql).unwrap()
}

#[test]
fn key_value_conditions_sort_columns() {
    let conditions = Conditions::new()
        .value("id", 1)
        .op("age", Op::between(0, 20));
    let q = conditions.build(Dialect::MySql).unwrap();
    assert_eq!(q.sql, "(`age` BETWEEN ? AND ? AND `id` = ?)");
    assert_eq!(q.args, vec![Value::Int(0), Value::Int(20), Value::Int(1)]);
}

#[test]
fn conditions_are_deterministic() {
    let columns = ["zeta", "alpha", "mid", "beta", "omega", "delta", "kappa"];
    let forward: Conditions = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (*c, Op::eq(i as i64)))
        .collect();
    let backward: Conditions = columns
        .iter()
        .enumerate()
        .rev()
        .map(|(i, c)| (*c, Op::eq(i as i64)))
        .collect();

    let a = forward.build(Dialect::Postgres).unwrap();
    let b = backward.build(Dialect::Postgres).unwrap();
    assert_eq!(a, b);
    assert!(a.sql.starts_with(r#"("alpha" = $1 AND "beta" = $2"#));
}

#[test]
fn leaf_operators() {
    let cases = vec![
        (Expr::eq("a", 1), "`a` = ?"),
        (Expr::ne("a", 1), "`a` <> ?"),
        (Expr::gt("a", 1), "`a` > ?"),
        (Expr::gte("a", 1), "`a` >= ?"),
        (Expr::lt("a", 1), "`a` < ?"),
        (Expr::lte("a", 1), "`a` <= ?"),
        (Expr::like("a", "x%"), "`a` LIKE ?"),
        (Expr::not_like("a", "x%"), "`a` NOT LIKE ?"),
        (Expr::is_null("a"), "`a` IS NULL"),
        (Expr::is_not_null("a"), "`a` IS NOT NULL"),
        (Expr::in_list("a", [1, 2, 3]), "`a` IN (?, ?, ?)"),
        (Expr::not_in("a", [1]), "`a` NOT IN (?)"),
        (Expr::between("a", 1, 2), "`a` BETWEEN ? AND ?"),
        (Expr::not_between("a", 1, 2), "`a` NOT BETWEEN ? AND ?"),
    ];
    for (expr, sql) in cases {
        assert_eq!(mysql(&expr).sql, sql);
    }
}

#[test]
fn nested_groups_keep_grouping() {
    let expr = Expr::eq("status", "active").and(Expr::any(vec![
        Expr::eq("role", "admin"),
        Expr::all(vec![Expr::gt("age", 18), Expr::lt("age", 65)]),
    ]));
    let q = expr.build(Dialect::Postgres).unwrap();
    assert_eq!(
        q.sql,
        r#"("status" = $1 AND ("role" = $2 OR ("age" > $3 AND "age" < $4)))"#
    );
    assert_eq!(q.args.len(), 4);
}

#[test]
fn not_wraps_leaves() {
    assert_eq!(mysql(&Expr::not(Expr::eq("a", 1))).sql, "NOT (`a` = ?)");
    assert_eq!(
        mysql(&Expr::not(Expr::eq("a", 1).or(Expr::eq("b", 2)))).sql,
        "NOT (`a` = ? OR `b` = ?)"
    );
}

#[test]
fn raw_fragments_are_renumbered() {
    let expr = Expr::eq("tenant", 7).and(Expr::raw_with(
        "score > ? OR bonus > ?",
        vec![Value::Int(1), Value::Int(2)],
    ));
    let q = expr.build(Dialect::Postgres).unwrap();
    assert_eq!(q.sql, r#"("tenant" = $1 AND (score > $2 OR bonus > $3))"#);
    assert_eq!(q.args, vec![Value::Int(7), Value::Int(1), Value::Int(2)]);
}

#[test]
fn raw_fragments_keep_their_grouping() {
    let raw = || Expr::raw_with("a = ? OR b = ?", vec![Value::Int(1), Value::Int(2)]);

    assert_eq!(
        mysql(&Expr::eq("tenant", 7).and(raw())).sql,
        "(`tenant` = ? AND (a = ? OR b = ?))"
    );
    assert_eq!(
        mysql(&Expr::any(vec![raw(), Expr::is_null("c")])).sql,
        "((a = ? OR b = ?) OR `c` IS NULL)"
    );
    assert_eq!(mysql(&Expr::not(raw())).sql, "NOT (a = ? OR b = ?)");
    // Standalone fragments render as written.
    assert_eq!(mysql(&raw()).sql, "a = ? OR b = ?");
}

#[test]
fn raw_placeholder_count_must_match() {
    let err = Expr::raw_with("a = ?", vec![]).build(Dialect::MySql).unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn degenerate_fragments_are_dangerous() {
    let dangerous = vec![
        Expr::raw(""),
        Expr::raw("   \t"),
        Expr::all(vec![]),
        Expr::any(vec![]),
        Expr::eq(" ", 1),
        Expr::not(Expr::all(vec![])),
        Expr::all(vec![Expr::eq("a", 1), Expr::raw(" ")]),
        Expr::in_list("a", Vec::<i64>::new()),
        Expr::not_in("a", Vec::<i64>::new()),
        Expr::from(Conditions::new()),
    ];
    for expr in dangerous {
        let err = expr.build(Dialect::MySql).unwrap_err();
        assert!(err.is_dangerous(), "{expr:?} produced {err}");
    }
}

#[test]
fn later_op_replaces_earlier() {
    let conditions = Conditions::new().value("id", 1).op("id", Op::IsNull);
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions.build(Dialect::MySql).unwrap().sql, "(`id` IS NULL)");
}
