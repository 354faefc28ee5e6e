use std::sync::{Arc, OnceLock};
use crate::base::behavior::*;

#[derive(Debug)]
pub struct ModuleBase<T, C> {
    pub cycle: u64,
    pub state: T,
    pub config: OnceLock<Arc<C>>,
}

impl<T, C> ModuleBase<T, C> {
    /// A module at cycle zero whose config is set later through `init_conf`.
    pub fn new(state: T) -> Self {
        Self {
            cycle: 0,
            state,
            config: OnceLock::new(),
        }
    }
}

pub trait IsModule: ModuleBehaviors {
    type StateType;
    type ConfigType;

    fn base(&mut self) -> &mut ModuleBase<Self::StateType, Self::ConfigType>;

    fn base_ref(&self) -> &ModuleBase<Self::StateType, Self::ConfigType>;

    fn state(&self) -> &Self::StateType {
        &self.base_ref().state
    }

    fn cycle(&self) -> u64 {
        self.base_ref().cycle
    }
}

impl<X> Parameterizable for X where X: IsModule {
    type ConfigType = X::ConfigType;

    fn conf(&self) -> &Self::ConfigType {
        self.base_ref().config.get().expect("config not found, was `init_conf` called in `new`?")
    }

    fn init_conf(&mut self, conf: Arc<Self::ConfigType>) {
        self.base().config.set(Arc::clone(&conf)).map_err(|_| "config already set").unwrap();
    }
}

/// arguments: identifier, state type, config type, additional methods
macro_rules! module {
    ($comp:ident, $T:ty, $C:ty, $($method:item)*) => {
        impl IsModule for $comp {
            type StateType = $T;
            type ConfigType = $C;

            fn base(&mut self) -> &mut ModuleBase<$T, $C> {
                &mut self.base
            }

            fn base_ref(&self) -> &ModuleBase<$T, $C> {
                &self.base
            }

            $($method)*
        }
    };
}

pub(crate) use module;
