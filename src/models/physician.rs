use serde::Serialize;

/// Clinic roster offered by the primary-physician pickers.
pub const PHYSICIANS: &[&str] = &[
    "John Green",
    "Leila Cameron",
    "David Livingston",
    "Evan Peter",
    "Jane Powell",
    "Alex Ramirez",
    "Jasmine Lee",
    "Alyana Cruz",
    "Hardik Sharma",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Physician {
    pub name: &'static str,
}

pub fn roster() -> Vec<Physician> {
    PHYSICIANS.iter().map(|name| Physician { name }).collect()
}

pub fn is_on_roster(name: &str) -> bool {
    PHYSICIANS.iter().any(|p| p.eq_ignore_ascii_case(name.trim()))
}
