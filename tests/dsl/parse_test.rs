use sieve::dsl::{parse_filter, parse_join, parse_sort, Filter, Join, ParseError, Request, Sort};
use sieve::operator::{Operator, OperatorRegistry};
use sieve::sql::expr::ExprExt;

#[test]
fn test_request_from_query_string_pairs() {
    let pairs = vec![
        ("filter".to_string(), "age||$gte||18".to_string()),
        ("or".to_string(), "name||$cont||Jo".to_string()),
        ("or".to_string(), "name||$cont||Doe".to_string()),
        ("join[]".to_string(), "Pets.Toys||name".to_string()),
        ("join[]".to_string(), "Pets||".to_string()),
        ("sort".to_string(), "age,DESC".to_string()),
        ("sort".to_string(), "name,asc".to_string()),
    ];
    let request = Request::from_query(pairs, OperatorRegistry::standard()).unwrap();

    assert_eq!(request.filter, vec![Filter::new("age", "$gte", &["18"])]);
    assert_eq!(
        request.or,
        vec![
            Filter::new("name", "$cont", &["Jo"]).disjunctive(),
            Filter::new("name", "$cont", &["Doe"]).disjunctive(),
        ]
    );
    assert_eq!(
        request.join,
        vec![
            Join::new("Pets.Toys").with_fields(&["name"]),
            Join::new("Pets").with_fields(&[]),
        ]
    );
    assert_eq!(request.sort, vec![Sort::desc("age"), Sort::asc("name")]);
    assert_eq!(request.fields, None);
    assert_eq!(request.search, None);
}

#[test]
fn test_first_error_rejects_request() {
    let pairs = [
        ("filter", "age||$gte||18"),
        ("sort", "age"),
        ("filter", "name||$bogus||x"),
    ];
    let err = Request::from_query(pairs, OperatorRegistry::standard()).unwrap_err();
    assert!(matches!(err, ParseError::SortSyntax { .. }));
    assert_eq!(err.to_string(), "invalid sort 'age': expected field,order");
}

#[test]
fn test_registered_operator_is_parseable() {
    let mut operators = OperatorRegistry::builtin();
    assert!(matches!(
        parse_filter("name||$ieq||x", false, &operators),
        Err(ParseError::UnknownOperator(_))
    ));

    operators
        .register(Operator::new("$ieq", 1, |column, _, args| {
            column.clone().eq(args[0].as_str())
        }))
        .unwrap();
    let filter = parse_filter("name||$ieq||x", false, &operators).unwrap();
    assert_eq!(filter.operator, "$ieq");
}

#[test]
fn test_descriptor_round_trip() {
    let operators = OperatorRegistry::standard();
    let filters = [
        "Pets.Toys.price||$between||1.5,20",
        "name||$in||a,b,c",
        "deleted_at||$isnull",
    ];
    for raw in filters {
        let filter = parse_filter(raw, true, operators).unwrap();
        let reparsed = parse_filter(&filter.to_string(), true, operators).unwrap();
        assert_eq!(reparsed, filter);
        assert_eq!(reparsed.args, filter.args);
    }

    let sort = parse_sort("Pets.name,DESC").unwrap();
    assert_eq!(sort.to_string().parse::<Sort>().unwrap(), sort);

    for raw in ["Pets", "Pets||", "Pets.Toys||name,price"] {
        let join = parse_join(raw).unwrap();
        assert_eq!(join.to_string().parse::<Join>().unwrap(), join);
    }
}
