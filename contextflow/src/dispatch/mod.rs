//! Entry point used by the transport boundary.

mod dispatcher;

pub use dispatcher::{propagated_seed, standard_filters, Dispatcher};
