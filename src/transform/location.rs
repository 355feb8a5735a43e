/// Split a "Certified Buyer, Bangalore" style string into
/// `(buyer_status, location_clean)`. Parts past the second are dropped.
pub fn split_location(raw: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(raw) = raw else {
        return (None, None);
    };

    let mut parts = raw.split(',').map(|p| p.trim().to_string());
    let status = parts.next();
    let place = parts.next();
    (status, place)
}
