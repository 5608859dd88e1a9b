//! Generate a session report for validation testing

fn main() {
    let ndjson = r#"
{ "timestamp": "2024-01-15T14:00:00Z", "face_count": 1 }
{ "timestamp": "2024-01-15T14:00:02Z", "face_count": 2 }
{ "timestamp": "2024-01-15T14:00:04Z", "face_count": 1, "detected_objects": [{ "label": "cell phone", "confidence": 0.91 }] }
{ "timestamp": "2024-01-15T14:00:06Z", "face_count": 0 }
{ "timestamp": "2024-01-15T14:00:11Z", "face_count": 0 }
{ "timestamp": "2024-01-15T14:00:17Z", "face_count": 0 }
{ "timestamp": "2024-01-15T14:00:18Z", "error": "detector timeout" }
{ "timestamp": "2024-01-15T14:00:20Z", "face_count": 1 }
"#;

    match proctor_engine::frames_to_report(ndjson, "validation-test") {
        Ok(report) => print!("{report}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
