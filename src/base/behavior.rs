use std::sync::Arc;

/// Clocked behavior shared by every simulated unit.
pub trait ModuleBehaviors {
    /// Advance the module by exactly one clock edge.
    fn tick_one(&mut self);

    /// Return to the power-on state, keeping the configuration.
    fn reset(&mut self) {}
}

pub trait Parameterizable {
    type ConfigType;

    fn conf(&self) -> &Self::ConfigType;

    fn init_conf(&mut self, conf: Arc<Self::ConfigType>);
}
