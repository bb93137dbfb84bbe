use serde_json::Value;

use tsugihagi_core::{codec, CodecError, SaveRecord, SavedGroup, ShapeKind};

fn sample(rotation: bool) -> SaveRecord {
    SaveRecord {
        image_src: "https://example.test/p.jpg".to_string(),
        origin_tag: Some("gallery".to_string()),
        nx: 4,
        ny: 3,
        board_width: 1280,
        seed: 0xDEAD_0042,
        rotation_allowed: rotation,
        shape_kind: ShapeKind::Tab,
        natural_width: 1600,
        natural_height: 1200,
        groups: vec![
            SavedGroup {
                x: 12,
                y: -7,
                rot: if rotation { 3 } else { 0 },
                cells: vec![(0, 0), (1, 0)],
            },
            SavedGroup {
                x: 640,
                y: 480,
                rot: 0,
                cells: vec![
                    (2, 0),
                    (3, 0),
                    (0, 1),
                    (1, 1),
                    (2, 1),
                    (3, 1),
                    (0, 2),
                    (1, 2),
                    (2, 2),
                    (3, 2),
                ],
            },
        ],
    }
}

#[test]
fn round_trip_with_rotation() {
    let record = sample(true);
    let decoded = codec::decode(&codec::encode(&record)).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn round_trip_without_rotation() {
    let record = sample(false);
    let payload = codec::encode(&record);
    let decoded = codec::decode(&payload).unwrap();
    assert_eq!(decoded, record);
    // The rotation field is absent from the wire when rotation is off.
    let value: Value = serde_json::from_str(&payload).unwrap();
    let group = value[4][0].as_array().unwrap();
    assert_eq!(group.len(), 2 + 2 * 2);
}

#[test]
fn round_trip_ten_by_ten() {
    let groups = (0..10u32)
        .flat_map(|ky| (0..10u32).map(move |kx| (kx, ky)))
        .enumerate()
        .map(|(index, cell)| SavedGroup {
            x: (index as i32 * 13) % 900,
            y: (index as i32 * 29) % 700,
            rot: (index % 4) as u8,
            cells: vec![cell],
        })
        .collect();
    let record = SaveRecord {
        nx: 10,
        ny: 10,
        groups,
        ..sample(true)
    };
    let decoded = codec::decode(&codec::encode(&record)).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn missing_origin_tag_round_trips_as_none() {
    let record = SaveRecord {
        origin_tag: None,
        ..sample(true)
    };
    let decoded = codec::decode(&codec::encode(&record)).unwrap();
    assert_eq!(decoded.origin_tag, None);
}

#[test]
fn foreign_signature_is_rejected() {
    let mut value: Value = serde_json::from_str(&codec::encode(&sample(true))).unwrap();
    value[0] = Value::String("someone-else.v9".to_string());
    let err = codec::decode(&value.to_string()).unwrap_err();
    assert!(matches!(err, CodecError::Signature));
}

#[test]
fn garbage_payloads_are_rejected() {
    assert!(matches!(
        codec::decode("not json at all"),
        Err(CodecError::Json(_))
    ));
    assert!(matches!(
        codec::decode("{\"sig\": true}"),
        Err(CodecError::Malformed(_))
    ));
    assert!(matches!(codec::decode("[]"), Err(CodecError::Signature)));
}

#[test]
fn truncated_base_record_is_rejected() {
    let mut value: Value = serde_json::from_str(&codec::encode(&sample(true))).unwrap();
    let base = value[3].as_array_mut().unwrap();
    base.pop();
    assert!(matches!(
        codec::decode(&value.to_string()),
        Err(CodecError::Malformed(_))
    ));
}

#[test]
fn out_of_range_cells_are_rejected() {
    let record = SaveRecord {
        groups: vec![SavedGroup {
            x: 0,
            y: 0,
            rot: 0,
            cells: vec![(9, 0)],
        }],
        ..sample(true)
    };
    let err = codec::decode(&codec::encode(&record)).unwrap_err();
    assert!(matches!(err, CodecError::CellOutOfRange(9, 0)));
}

#[test]
fn odd_cell_list_is_rejected() {
    let mut value: Value = serde_json::from_str(&codec::encode(&sample(true))).unwrap();
    let group = value[4][0].as_array_mut().unwrap();
    group.pop();
    assert!(matches!(
        codec::decode(&value.to_string()),
        Err(CodecError::Malformed(_))
    ));
}
