use bitflags::bitflags;

bitflags! {
    /// Work recorded on a fiber during render and applied during commit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        const PLACEMENT = 0b0000_0010;
        const UPDATE = 0b0000_0100;
        const CHILD_DELETION = 0b0000_1000;
        const PASSIVE = 0b0001_0000;
        const REF = 0b0010_0000;
        const VISIBILITY = 0b0100_0000;
    }
}

impl Flags {
    /// Flags handled by the mutation phase.
    pub const MUTATION_MASK: Flags = Flags::PLACEMENT
        .union(Flags::UPDATE)
        .union(Flags::CHILD_DELETION)
        .union(Flags::REF)
        .union(Flags::VISIBILITY);

    /// Flags handled after the tree swap.
    pub const LAYOUT_MASK: Flags = Flags::REF;

    /// Flags that imply passive effects to flush after commit.
    pub const PASSIVE_MASK: Flags = Flags::PASSIVE.union(Flags::CHILD_DELETION);
}

bitflags! {
    /// Tags carried by effect records.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HookFlags: u8 {
        const PASSIVE = 0b0001;
        /// The effect's create must run in the next flush.
        const HAS_EFFECT = 0b0010;
    }
}
