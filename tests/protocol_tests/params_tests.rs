//! Query Parameter Tests
//!
//! Tests for unpacking comma-delimited request parameters into operations.

use dby_bridge::protocol::{encode, split_list, EntityRef, QueryParams, COUNT_MISMATCH};
use dby_bridge::{BridgeError, Operation, OperationKind};

// =============================================================================
// Unpacking Tests
// =============================================================================

#[test]
fn test_split_list() {
    assert_eq!(split_list("a,b,c"), vec!["a", "b", "c"]);
    assert_eq!(split_list("solo"), vec!["solo"]);
    assert!(split_list("").is_empty());
    assert_eq!(split_list("a,,b"), vec!["a", "", "b"]);
}

#[test]
fn test_unpack_definition_lists() {
    let params = QueryParams::unpack([("fields", "name,age"), ("types", "string,int")]).unwrap();
    assert_eq!(params.fields, vec!["name", "age"]);
    assert_eq!(params.types, vec!["string", "int"]);
    assert!(params.fields1.is_empty());
    assert!(params.values2.is_empty());
}

#[test]
fn test_unpack_relation_lists() {
    let params = QueryParams::unpack(vec![
        ("fields1", "name"),
        ("values1", "ann"),
        ("fields2", "name,city"),
        ("values2", "acme,oslo"),
    ])
    .unwrap();

    assert_eq!(params.left("Person"), EntityRef::new("Person", vec!["name"], vec!["ann"]));
    assert_eq!(
        params.right("Company"),
        EntityRef::new("Company", vec!["name", "city"], vec!["acme", "oslo"])
    );
}

#[test]
fn test_unpack_with_no_parameters() {
    let params = QueryParams::unpack(Vec::<(String, String)>::new()).unwrap();
    assert_eq!(params, QueryParams::default());
}

#[test]
fn test_unpack_ignores_unknown_names() {
    let params = QueryParams::unpack([("session", "abc"), ("fields", "x"), ("types", "int")]).unwrap();
    assert_eq!(params.fields, vec!["x"]);
}

#[test]
fn test_unpack_rejects_mismatched_counts() {
    let cases: Vec<Vec<(&str, &str)>> = vec![
        vec![("fields", "name,age"), ("types", "string")],
        vec![("fields", "name")],
        vec![("fields1", "a,b"), ("values1", "1")],
        vec![("values2", "1")],
    ];

    for pairs in cases {
        match QueryParams::unpack(pairs.clone()) {
            Err(BridgeError::Validation(message)) => assert_eq!(message, COUNT_MISMATCH),
            other => panic!("{:?} should fail validation, got {:?}", pairs, other),
        }
    }
}

// =============================================================================
// Operation Assembly Tests
// =============================================================================

#[test]
fn test_from_query_define_entity() {
    let params = QueryParams::unpack([("fields", "name,age"), ("types", "string,int")]).unwrap();
    let op = Operation::from_query(OperationKind::DefineEntity, &["Person"], &params).unwrap();
    assert_eq!(encode(&op).unwrap(), "def Person(name_string,age_int)");
}

#[test]
fn test_from_query_relations() {
    let params = QueryParams::unpack([
        ("fields1", "name"),
        ("values1", "ann"),
        ("fields2", "name"),
        ("values2", "acme"),
    ])
    .unwrap();

    let add = Operation::from_query(OperationKind::AddRelation, &["Person", "Company"], &params).unwrap();
    let rm = Operation::from_query(OperationKind::RemoveRelation, &["Person", "Company"], &params).unwrap();
    let lst = Operation::from_query(OperationKind::ListRelation, &["Person", "Company"], &params).unwrap();

    assert_eq!(encode(&add).unwrap(), "add rel Person(name=ann) Company(name=acme)");
    assert_eq!(encode(&rm).unwrap(), "rm rel Person(name=ann) Company(name=acme)");
    assert_eq!(encode(&lst).unwrap(), "lst rel Person(name=ann) Company(name=acme)");
}

#[test]
fn test_from_query_positional_only() {
    let params = QueryParams::default();
    let rm = Operation::from_query(OperationKind::RemoveEntity, &["Widget"], &params).unwrap();
    let lst = Operation::from_query(OperationKind::ListEntity, &["Wid.*"], &params).unwrap();
    let gen = Operation::from_query(OperationKind::Generate, &[] as &[&str], &params).unwrap();

    assert_eq!(rm, Operation::remove_entity("Widget"));
    assert_eq!(lst, Operation::list_entity("Wid.*"));
    assert_eq!(gen, Operation::Generate);
}

#[test]
fn test_from_query_rejects_wrong_arity() {
    let params = QueryParams::default();
    let err = Operation::from_query(OperationKind::AddRelation, &["OnlyOne"], &params).unwrap_err();
    assert!(matches!(err, BridgeError::Validation(_)));

    let err = Operation::from_query(OperationKind::Generate, &["extra"], &params).unwrap_err();
    assert!(matches!(err, BridgeError::Validation(_)));
}

#[test]
fn test_from_query_revalidates_hand_built_params() {
    let params = QueryParams {
        fields: vec!["a".to_string()],
        ..QueryParams::default()
    };
    let err = Operation::from_query(OperationKind::DefineEntity, &["A"], &params).unwrap_err();
    assert!(matches!(err, BridgeError::Validation(_)));
}
