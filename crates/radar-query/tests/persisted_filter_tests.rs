//! Translation of filters that went through the JSON wire format.
//!
//! Persisted filters and HTTP clients both hand the translator
//! deserialized ASTs, so translation must be insensitive to a wire
//! round trip.

use radar_common::Value;
use radar_expr::ast::builders::*;
use radar_expr::{unwrap_json, wrap_json, AttributeType, Expression};
use radar_query::{transform_attribute_query, transform_file_query, AttributeQuery, FileQuery};

fn round_trip(expr: &Expression) -> Expression {
    unwrap_json(&wrap_json(expr)).expect("wire round trip")
}

#[test]
fn test_round_tripped_filter_translates_identically() {
    let filter = and(
        eq(
            attribute("what/object", AttributeType::String),
            Expression::literal("pvol"),
        ),
        between(
            attribute("what/date", AttributeType::Date),
            date(2000, 1, 1),
            date(2001, 1, 1),
        ),
    );

    let direct = transform_file_query(&FileQuery::new().with_filter(filter.clone()))
        .unwrap()
        .to_sql();
    let wired = transform_file_query(&FileQuery::new().with_filter(round_trip(&filter)))
        .unwrap()
        .to_sql();

    assert_eq!(direct, wired);
}

#[test]
fn test_wire_form_parsed_from_raw_json() {
    // What a client would actually POST.
    let raw = r#"["list",["symbol","="],["list",["symbol","attr"],"what/source:NOD","string"],"seang"]"#;
    let json: serde_json::Value = serde_json::from_str(raw).unwrap();
    let filter = unwrap_json(&json).unwrap();

    let (sql, params) = transform_file_query(&FileQuery::new().with_filter(filter))
        .unwrap()
        .to_sql();
    assert!(sql.contains("src_nod.value = $2"));
    assert_eq!(params, vec![Value::from("NOD"), Value::from("seang")]);
}

#[test]
fn test_round_tripped_attribute_query_terms() {
    let fetch_expr = attribute("where/xsize", AttributeType::Long);
    let order_expr = desc(attribute("what/date", AttributeType::Date));
    let group_expr = attribute("what/source:_name", AttributeType::String);

    let build = |fetch: Expression, order: Expression, group: Expression| {
        transform_attribute_query(
            &AttributeQuery::new()
                .fetch("xsize", fetch)
                .fetch("source", attribute("what/source:_name", AttributeType::String))
                .order_by(order)
                .group_by(group.clone())
                .group_by(attribute("where/xsize", AttributeType::Long)),
        )
        .unwrap()
        .to_sql()
    };

    let direct = build(fetch_expr.clone(), order_expr.clone(), group_expr.clone());
    let wired = build(
        round_trip(&fetch_expr),
        round_trip(&order_expr),
        round_trip(&group_expr),
    );
    assert_eq!(direct, wired);
}

#[test]
fn test_malformed_wire_filter_is_value_error() {
    let json: serde_json::Value = serde_json::from_str(r#"[["no","tag"],1]"#).unwrap();
    assert!(unwrap_json(&json).is_err());
}
