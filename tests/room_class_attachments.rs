
use serde_json::json;
use test_support::{error_code, request_err, request_ok, result_id, spawn_daemon, temp_dir};

#[test]
fn features_and_bed_types_travel_with_the_class() {
    let workspace = temp_dir("hoteld-class-attach");
    let (mut child, mut stdin, mut reader) = spawn_daemon();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let wifi = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "features.create",
        json!({ "name": "Wifi" }),
    );
    let balcony = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "features.create",
        json!({ "name": "Balcony" }),
    );
    let queen = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "bedTypes.create",
        json!({ "name": "Queen" }),
    );
    let single = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "bedTypes.create",
        json!({ "name": "Single" }),
    );

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "roomClasses.create",
        json!({
            "name": "Family Suite",
            "basePrice": 240.0,
            "featureIds": [result_id(&wifi), result_id(&balcony)],
            "bedTypes": [
                { "bedTypeId": result_id(&queen), "count": 1 },
                { "bedTypeId": result_id(&single), "count": 2 }
            ]
        }),
    );
    let class_id = result_id(&class);
    assert_eq!(
        class.get("features").and_then(|v| v.as_array()).map(|v| v.len()),
        Some(2)
    );
    let beds = class.get("bedTypes").and_then(|v| v.as_array()).expect("bedTypes");
    assert_eq!(beds.len(), 2);
    // Attachment rows are sorted by name, so Queen precedes Single.
    assert_eq!(beds[0].get("count").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(beds[1].get("count").and_then(|v| v.as_i64()), Some(2));

    // Updating with a new set replaces the old attachments.
    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "roomClasses.update",
        json!({
            "roomClassId": class_id,
            "name": "Family Suite",
            "basePrice": 260.0,
            "featureIds": [result_id(&wifi)],
            "bedTypes": [
                { "bedTypeId": result_id(&queen), "count": 2 }
            ]
        }),
    );
    assert_eq!(
        updated.get("features").and_then(|v| v.as_array()).map(|v| v.len()),
        Some(1)
    );
    assert_eq!(
        updated.get("bedTypes").and_then(|v| v.as_array()).map(|v| v.len()),
        Some(1)
    );
    assert_eq!(updated.get("basePrice").and_then(|v| v.as_f64()), Some(260.0));

    // A referenced bed type is now protected.
    let error = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "bedTypes.delete",
        json!({ "bedTypeId": result_id(&queen) }),
    );
    assert_eq!(error_code(&error), "in_use");

    // Unknown attachment ids are rejected before anything is written.
    let error = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "roomClasses.create",
        json!({
            "name": "Broken",
            "basePrice": 100.0,
            "featureIds": ["ghost"]
        }),
    );
    assert_eq!(error_code(&error), "bad_params");
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "roomClasses.list",
        json!({ "search": "broken" }),
    );
    assert_eq!(
        listed.get("items").and_then(|v| v.as_array()).map(|v| v.len()),
        Some(0)
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
