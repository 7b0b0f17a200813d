//! Trait for components that can be advanced by clock ticks.

/// A component that can be advanced by master clock ticks.
///
/// Components track their own phase relative to the master clock and
/// perform work when appropriate (e.g., a chip running at a quarter of the
/// master rate only does work on every fourth tick).
pub trait Tickable {
    /// Advance the component by one master clock tick.
    fn tick(&mut self);
}
