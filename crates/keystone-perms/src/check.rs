//! Two-phase permission evaluation.
//!
//! Phase one is the ROOT bypass, phase two the per-id bit test. Both work on
//! a snapshot of the scoped and wildcard sets, so they can be tested without
//! a registry.

use keystone_core::PermissionSet;

use crate::error::Result;

/// A snapshot of the sets relevant to one (operator, account, scope) query.
#[derive(Debug, Clone, Copy)]
pub struct PermissionCheck {
    scoped: PermissionSet,
    /// `None` when the query does not include the wildcard scope.
    wildcard: Option<PermissionSet>,
    include_root: bool,
}

impl PermissionCheck {
    /// Build a check from the stored sets and the query flags.
    pub fn new(
        scoped: PermissionSet,
        wildcard: PermissionSet,
        include_root: bool,
        include_wildcard_scope: bool,
    ) -> Self {
        Self {
            scoped,
            wildcard: include_wildcard_scope.then_some(wildcard),
            include_root,
        }
    }

    /// Phase one: whether ROOT is held and honored.
    pub fn root_bypass(&self, root: u8) -> bool {
        self.include_root && self.grants(root)
    }

    /// Phase two: whether `id` is set in the scoped set, or in the wildcard
    /// set when that is included.
    pub fn grants(&self, id: u8) -> bool {
        self.scoped.contains(id) || self.wildcard.is_some_and(|w| w.contains(id))
    }

    /// Evaluate a single raw id. The id is bounds checked before anything else.
    pub fn permits(&self, root: u8, id: u16) -> Result<bool> {
        let id = PermissionSet::check_id(id)?;
        if self.root_bypass(root) {
            return Ok(true);
        }
        Ok(self.grants(id))
    }

    /// Evaluate a list of raw ids.
    ///
    /// The ROOT bypass runs once, up front. Ids are then bounds checked and
    /// tested in order; the first id that is not granted ends the evaluation.
    pub fn permits_all(&self, root: u8, ids: &[u16]) -> Result<bool> {
        if self.root_bypass(root) {
            return Ok(true);
        }
        for &id in ids {
            let id = PermissionSet::check_id(id)?;
            if !self.grants(id) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PermsError;
    use crate::permission_ids::ROOT;

    fn set(ids: &[u16]) -> PermissionSet {
        PermissionSet::from_ids(ids).unwrap()
    }

    #[test]
    fn test_root_requires_include_root() {
        let check = PermissionCheck::new(set(&[1]), PermissionSet::EMPTY, false, false);
        assert!(!check.root_bypass(ROOT));
        assert!(!check.permits(ROOT, 42).unwrap());

        let check = PermissionCheck::new(set(&[1]), PermissionSet::EMPTY, true, false);
        assert!(check.permits(ROOT, 42).unwrap());
    }

    #[test]
    fn test_wildcard_root_requires_both_flags() {
        let wildcard = set(&[1]);
        assert!(!PermissionCheck::new(PermissionSet::EMPTY, wildcard, true, false).root_bypass(ROOT));
        assert!(!PermissionCheck::new(PermissionSet::EMPTY, wildcard, false, true).root_bypass(ROOT));
        assert!(PermissionCheck::new(PermissionSet::EMPTY, wildcard, true, true).root_bypass(ROOT));
    }

    #[test]
    fn test_wildcard_bits_only_when_included() {
        let wildcard = set(&[9]);
        assert!(!PermissionCheck::new(PermissionSet::EMPTY, wildcard, false, false).grants(9));
        assert!(PermissionCheck::new(PermissionSet::EMPTY, wildcard, false, true).grants(9));
    }

    #[test]
    fn test_single_id_bounds_checked_before_root() {
        let check = PermissionCheck::new(set(&[1]), PermissionSet::EMPTY, true, true);
        assert!(matches!(
            check.permits(ROOT, 256),
            Err(PermsError::PermissionIdOutOfBounds(256))
        ));
    }

    #[test]
    fn test_all_ids_root_short_circuits_bounds() {
        let check = PermissionCheck::new(set(&[1]), PermissionSet::EMPTY, true, false);
        assert!(check.permits_all(ROOT, &[300]).unwrap());
    }

    #[test]
    fn test_all_ids_mixes_scoped_and_wildcard() {
        let check = PermissionCheck::new(set(&[3]), set(&[4]), false, true);
        assert!(check.permits_all(ROOT, &[3, 4]).unwrap());
        assert!(!check.permits_all(ROOT, &[3, 4, 5]).unwrap());
    }

    #[test]
    fn test_all_ids_stops_at_first_missing() {
        let check = PermissionCheck::new(set(&[3]), PermissionSet::EMPTY, false, false);
        // 7 is missing, so the out-of-bounds id after it is never inspected.
        assert!(!check.permits_all(ROOT, &[3, 7, 999]).unwrap());
        assert!(matches!(
            check.permits_all(ROOT, &[3, 999, 7]),
            Err(PermsError::PermissionIdOutOfBounds(999))
        ));
    }

    #[test]
    fn test_empty_list_is_vacuously_true() {
        let check = PermissionCheck::new(PermissionSet::EMPTY, PermissionSet::EMPTY, false, false);
        assert!(check.permits_all(ROOT, &[]).unwrap());
    }
}
