//! The two configuration knobs the validator honours. Threaded by value
//! through every validator call; there is no global or thread-local
//! configuration state.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Report every test leaf even under an element that already failed.
    /// When false (the default), `ElementBuilder::child` drops a nested
    /// element's test detail once its parent already carries a failure
    /// of its own — the parent's `is_valid` is already settled, so there
    /// is nothing left to learn from enumerating it. Properties are
    /// never affected; they are folded in full either way.
    pub verbose_tests: bool,

    /// Trim a single trailing NUL from XML/UUID text payloads before
    /// recording them as a property. Affects property values only, never
    /// validation outcomes.
    pub extract_null_terminated_xml: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verbose_tests: false,
            extract_null_terminated_xml: false,
        }
    }
}
