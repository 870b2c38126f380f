use uuid::Uuid;

/// Returns a collision-resistant opaque identifier with the given prefix,
/// e.g. `pi_b0e6a4f09c2d4fb8a3c1d5e7f9012345`.
///
/// The token part is a UUIDv4 with hyphens stripped (32 lowercase hex
/// characters). An empty prefix yields the bare token.
pub fn generate(prefix: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    if prefix.is_empty() {
        token
    } else {
        format!("{prefix}_{token}")
    }
}
