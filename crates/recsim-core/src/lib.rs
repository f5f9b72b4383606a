//! recsim Core - state and configuration for recommender simulations
//!
//! This crate provides the types shared by every other recsim crate:
//!
//! - [`StateView`]: A read-only snapshot of the recommender state
//! - [`Interaction`]: One realized user-item interaction
//! - [`SimulationConfig`] and [`ErrorPolicy`]: Run configuration
//! - Error types for state validation, configuration and recommenders
//!
//! # Quick Start
//!
//! ```
//! use ndarray::array;
//! use recsim_core::prelude::*;
//!
//! let users = array![[1.0, 0.0], [0.0, 1.0]];
//! let items = array![[0.6, 0.8]];
//! let interactions = vec![Interaction::new(0, 0), Interaction::new(1, 0)];
//!
//! let state = StateView::new(1, &interactions, users.view(), items.view());
//! state.validate()?;
//! # Ok::<(), StateError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           Simulation driver             │
//! ├─────────────────────────────────────────┤
//! │            recsim (facade)              │
//! ├─────────────────────────────────────────┤
//! │ recsim-measure │ recsim-observe │  ...  │
//! ├─────────────────────────────────────────┤
//! │              recsim-core                │
//! └─────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod state;

// Re-export main types at crate root
pub use config::{ErrorPolicy, SimulationConfig};
pub use error::{
    ConfigError, ConfigResult, RecommenderError, StateError, StateResult,
};
pub use state::{Interaction, StateView};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{ErrorPolicy, SimulationConfig};
    pub use crate::error::{ConfigError, RecommenderError, StateError};
    pub use crate::state::{Interaction, StateView};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use ndarray::array;

    #[test]
    fn test_snapshot_end_to_end() {
        let users = array![[1.0, 0.0], [0.0, 1.0]];
        let items = array![[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]];
        let interactions = vec![Interaction::new(0, 2), Interaction::from((1, 1))];

        let state = StateView::new(2, &interactions, users.view(), items.view())
            .with_actual_user_profiles(users.view())
            .with_actual_item_attributes(items.view());

        assert!(state.validate().is_ok());
        assert_eq!(
            state.predicted_scores().unwrap(),
            state.actual_scores().unwrap().unwrap()
        );
        assert_eq!(state.interactions()[1], Interaction::new(1, 1));
    }
}
