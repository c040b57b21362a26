// utils/ticket_number.rs
use rand::distr::Alphanumeric;
use rand::{rng, Rng};

/// Mint a human-scannable ticket number: millisecond timestamp plus a short
/// random suffix, e.g. `SR-1724932800123-7K2FQ`. Uniqueness is re-checked
/// against the store before use.
pub fn mint_ticket_number() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();

    format!("SR-{}-{}", millis, suffix)
}
