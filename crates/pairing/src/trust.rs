//! Trust levels (§4.2): `stranger` is the absence of a `PairedUser` row,
//! `owner ⇒ paired`.

use chatgate_store::PairedUserRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrustLevel {
    Stranger,
    Paired,
    Owner,
}

impl TrustLevel {
    #[must_use]
    pub fn from_paired_user(row: Option<&PairedUserRow>) -> Self {
        match row {
            None => Self::Stranger,
            Some(row) if row.is_owner() => Self::Owner,
            Some(_) => Self::Paired,
        }
    }

    #[must_use]
    pub fn is_at_least(self, other: Self) -> bool {
        self >= other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(is_owner: i64) -> PairedUserRow {
        PairedUserRow {
            channel: "telegram".into(),
            user_id: "1".into(),
            username: None,
            paired_at: "2026-01-01T00:00:00Z".into(),
            paired_by: "code".into(),
            is_owner,
        }
    }

    #[test]
    fn absence_of_row_is_stranger() {
        assert_eq!(TrustLevel::from_paired_user(None), TrustLevel::Stranger);
    }

    #[test]
    fn owner_row_outranks_paired() {
        assert_eq!(TrustLevel::from_paired_user(Some(&row(1))), TrustLevel::Owner);
        assert_eq!(TrustLevel::from_paired_user(Some(&row(0))), TrustLevel::Paired);
        assert!(TrustLevel::Owner.is_at_least(TrustLevel::Paired));
        assert!(!TrustLevel::Stranger.is_at_least(TrustLevel::Paired));
    }
}
