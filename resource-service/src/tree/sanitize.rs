use serde_json::Value;

/// Remove every object member named `reserved`, at any depth.
pub fn strip_reserved(value: &mut Value, reserved: &str) {
    match value {
        Value::Object(map) => {
            map.remove(reserved);
            for child in map.values_mut() {
                strip_reserved(child, reserved);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_reserved(item, reserved);
            }
        }
        _ => {}
    }
}

pub fn sanitized(value: &Value, reserved: &str) -> Value {
    let mut copy = value.clone();
    strip_reserved(&mut copy, reserved);
    copy
}

/// True when `reserved` appears as an object member anywhere in `value`.
pub fn contains_reserved(value: &Value, reserved: &str) -> bool {
    match value {
        Value::Object(map) => {
            map.contains_key(reserved) || map.values().any(|v| contains_reserved(v, reserved))
        }
        Value::Array(items) => items.iter().any(|v| contains_reserved(v, reserved)),
        _ => false,
    }
}
