bitflags::bitflags! {
    /// Pending effects on a fiber (`flags`) or anywhere below it (`subtree_flags`).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Flags: u8 {
        const PERFORMED_WORK = 0b0000_0001;
        /// Host node must be inserted (or moved) at commit.
        const PLACEMENT      = 0b0000_0010;
        /// Host node props or text changed.
        const UPDATE         = 0b0000_0100;
        /// `deletions` holds children to remove at commit.
        const CHILD_DELETION = 0b0000_1000;

        const MUTATION_MASK = Self::PLACEMENT.bits() | Self::UPDATE.bits() | Self::CHILD_DELETION.bits();
    }
}

impl Flags {
    pub const NONE: Flags = Flags::empty();
}
