//! Plate normalization.
//!
//! The normalized form is only ever used as an equality key. Stored
//! records keep the plate text exactly as the user or recognizer wrote it.

/// Canonicalize a plate for lookup: drop all whitespace, upper-case the rest.
///
/// # Examples
///
/// ```
/// use spotted_core::plate::normalize_plate;
///
/// assert_eq!(normalize_plate("ab12 cde"), "AB12CDE");
/// assert_eq!(normalize_plate(" AB12\tCDE\n"), "AB12CDE");
/// assert_eq!(normalize_plate(""), "");
/// ```
pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Whether two plate strings identify the same vehicle.
pub fn plates_match(a: &str, b: &str) -> bool {
    normalize_plate(a) == normalize_plate(b)
}
