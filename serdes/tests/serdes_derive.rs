use std::{collections::HashMap, io::Cursor};

use serdes::{SerdeError, WireSerde};

#[derive(WireSerde, Debug, PartialEq)]
struct PendingUpdate {
    rank: usize,
    index: usize,
    values: Vec<f64>,
}

#[derive(WireSerde, Debug, PartialEq)]
struct NodeId(u64, u32);

#[derive(WireSerde, Debug, PartialEq)]
enum Field {
    Temperature,
    Displacement(f64, f64, f64),
    Named { name: String, value: f64 },
}

#[test]
fn test_struct_serialization() {
    let original = PendingUpdate {
        rank: 3,
        index: 42,
        values: vec![1.5, -2.0, 8.0],
    };

    let mut buf = Vec::new();
    original.serialize_into(&mut buf).unwrap();

    let mut cursor = Cursor::new(buf);
    let deserialized = PendingUpdate::deserialize_from(&mut cursor).unwrap();

    assert_eq!(original, deserialized);
}

#[test]
fn test_tuple_struct_serialization() {
    let original = NodeId(7, 2);

    let mut buf = Vec::new();
    original.serialize_into(&mut buf).unwrap();
    assert_eq!(buf.len(), 12);

    assert_eq!(NodeId::deserialize_from(buf.as_slice()).unwrap(), original);
}

#[test]
fn test_enum_serialization() {
    let test_cases = vec![
        Field::Temperature,
        Field::Displacement(0.5, 1.0, -3.25),
        Field::Named {
            name: "TEMPERATURE".to_string(),
            value: 21.0,
        },
    ];

    for original in test_cases {
        let mut buf = Vec::new();
        original.serialize_into(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let deserialized = Field::deserialize_from(&mut cursor).unwrap();

        assert_eq!(original, deserialized);
    }
}

#[test]
fn test_enum_rejects_unknown_variant() {
    let mut buf = Vec::new();
    9u32.serialize_into(&mut buf).unwrap();

    match Field::deserialize_from(buf.as_slice()) {
        Err(SerdeError::InvalidVariantIndex(9)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_map_of_vectors() {
    let mut original: HashMap<usize, Vec<(u64, f64)>> = HashMap::new();
    original.insert(1, vec![(10, 5.0), (11, 6.0)]);
    original.insert(4, vec![]);

    let mut buf = Vec::new();
    original.serialize_into(&mut buf).unwrap();

    let deserialized = HashMap::<usize, Vec<(u64, f64)>>::deserialize_from(buf.as_slice()).unwrap();
    assert_eq!(original, deserialized);
}

#[test]
fn test_truncated_input_is_an_error() {
    let original = vec![1u64, 2, 3];
    let mut buf = Vec::new();
    original.serialize_into(&mut buf).unwrap();
    buf.truncate(buf.len() - 3);

    assert!(matches!(
        Vec::<u64>::deserialize_from(buf.as_slice()),
        Err(SerdeError::IOError(_))
    ));
}

#[test]
fn test_corrupt_length_prefix_is_an_error() {
    // a huge length with no payload behind it must not be trusted for allocation
    let bytes = u64::MAX.to_le_bytes();
    assert!(matches!(
        String::deserialize_from(&bytes[..]),
        Err(SerdeError::IOError(_))
    ));
    assert!(matches!(
        Vec::<u64>::deserialize_from(&bytes[..]),
        Err(SerdeError::IOError(_))
    ));

    let mut short = 10u64.to_le_bytes().to_vec();
    short.extend_from_slice(b"abc");
    assert!(matches!(
        String::deserialize_from(short.as_slice()),
        Err(SerdeError::IOError(_))
    ));
}
