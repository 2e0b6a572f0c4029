//! Callback-driven menu state machine: tokens, per-user state, the wizard
//! math, and the dispatch layer that ties them together (§4.3).

pub mod dispatch;
pub mod error;
pub mod render;
pub mod state;
pub mod token;
pub mod wizard;

pub use {
    dispatch::MenuService,
    error::{Error, Result},
    render::MenuView,
    state::{MenuState, MenuStateStore, OrderSide, OrderType, PendingTextInput},
    token::{Action, Token},
};
