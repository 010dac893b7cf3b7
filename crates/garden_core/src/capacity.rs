use crate::{GridContext, Position, Tier};

/// Rows and columns of the base grid for a tier.
pub fn base_dimensions(tier: Tier) -> (u32, u32) {
    match tier {
        Tier::Basic => (3, 3),
        Tier::Premium => (6, 6),
    }
}

pub fn base_capacity(tier: Tier) -> u32 {
    let (rows, cols) = base_dimensions(tier);
    rows * cols
}

/// Saturates at `u32::MAX`; growth paths check with
/// [`checked_total_capacity`] first.
pub fn total_capacity(tier: Tier, purchased_extra: u32) -> u32 {
    base_capacity(tier).saturating_add(purchased_extra)
}

pub fn checked_total_capacity(tier: Tier, purchased_extra: u32) -> Option<u32> {
    base_capacity(tier).checked_add(purchased_extra)
}

impl GridContext {
    pub fn total_capacity(&self) -> u32 {
        total_capacity(self.tier, self.purchased_extra)
    }

    /// Whether `position` is one of the positions this context derives.
    pub fn is_canonical(&self, position: &Position) -> bool {
        let (rows, cols) = base_dimensions(self.tier);
        match position {
            Position::Grid { row, col } => (1..=rows).contains(row) && (1..=cols).contains(col),
            Position::Additional(index) => (1..=self.purchased_extra).contains(index),
            Position::Custom(_) => false,
        }
    }

    /// Canonical positions in layout order: base cells row-major, then
    /// purchased slots by index.
    pub fn canonical_positions(&self) -> impl Iterator<Item = Position> {
        let (rows, cols) = base_dimensions(self.tier);
        let base = (1..=rows).flat_map(move |row| (1..=cols).map(move |col| Position::grid(row, col)));
        let extra = (1..=self.purchased_extra).map(Position::Additional);
        base.chain(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_is_three_by_three() {
        assert_eq!(base_dimensions(Tier::Basic), (3, 3));
        assert_eq!(base_capacity(Tier::Basic), 9);
    }

    #[test]
    fn premium_is_six_by_six() {
        assert_eq!(base_dimensions(Tier::Premium), (6, 6));
        assert_eq!(base_capacity(Tier::Premium), 36);
    }

    #[test]
    fn purchased_spaces_add_to_base() {
        assert_eq!(total_capacity(Tier::Basic, 4), 13);
        assert_eq!(total_capacity(Tier::Premium, 0), 36);
    }

    #[test]
    fn total_capacity_never_wraps() {
        assert_eq!(total_capacity(Tier::Basic, u32::MAX - 9), u32::MAX);
        assert_eq!(total_capacity(Tier::Premium, u32::MAX), u32::MAX);
        assert_eq!(checked_total_capacity(Tier::Basic, u32::MAX - 9), Some(u32::MAX));
        assert_eq!(checked_total_capacity(Tier::Basic, u32::MAX - 8), None);
    }

    #[test]
    fn unknown_tier_label_falls_back_to_basic() {
        assert_eq!(Tier::from_label("gold"), Tier::Basic);
        assert_eq!(Tier::from_label("Premium"), Tier::Premium);
    }

    #[test]
    fn canonical_positions_are_row_major_then_extra() {
        let ctx = GridContext::new(Tier::Basic, 2);
        let labels: Vec<String> = ctx.canonical_positions().map(|p| p.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "1,1", "1,2", "1,3", "2,1", "2,2", "2,3", "3,1", "3,2", "3,3", "additional-1",
                "additional-2"
            ]
        );
    }

    #[test]
    fn out_of_range_positions_are_not_canonical() {
        let ctx = GridContext::new(Tier::Basic, 1);
        assert!(ctx.is_canonical(&Position::grid(3, 3)));
        assert!(!ctx.is_canonical(&Position::grid(4, 1)));
        assert!(ctx.is_canonical(&Position::Additional(1)));
        assert!(!ctx.is_canonical(&Position::Additional(2)));
        assert!(!ctx.is_canonical(&Position::Custom("bed-a".to_string())));
    }
}
