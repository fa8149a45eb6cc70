/// Tuning knobs for [`MCritBitTree`](crate::MCritBitTree).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Initial number of internal node slots reserved in the arena
    pub initial_capacity: usize,
    /// Run `validate()` after every mutation and panic on failure
    pub check_invariants: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            check_invariants: false,
        }
    }
}
