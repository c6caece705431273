//! Unique names for temporary working directories.

use uuid::Uuid;

/// Produces a globally unique, opaque string
pub type IdGenerator = fn() -> String;

/// Default [`IdGenerator`] backed by random UUIDs
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use crate::id::generate_id;

    #[test]
    fn ids_are_unique() {
        let ids = (0..64).map(|_| generate_id()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 64);
        assert!(ids.iter().all(|id| id.chars().all(|c| c.is_ascii_hexdigit())));
    }
}
