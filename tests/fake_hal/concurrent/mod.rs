use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;

lazy_static! {
    static ref NAMED_VALUES: Mutex<HashMap<String, usize>> = Mutex::new(HashMap::new());
}

pub fn set_named_value(name: &str, value: usize) {
    let mut map = NAMED_VALUES.lock().unwrap();
    map.insert(name.to_string(), value);
}

pub fn get_named_value(name: &str) -> usize {
    let map = NAMED_VALUES.lock().unwrap();
    *map.get(name).unwrap_or(&0)
}

pub fn increment_named_value(name: &str) -> usize {
    let mut map = NAMED_VALUES.lock().unwrap();
    let value = map.entry(name.to_string()).or_insert(0);
    *value = *value + 1;
    *value
}
