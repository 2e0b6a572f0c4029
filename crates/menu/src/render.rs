//! The `{text, buttons, parseMode}` a menu handler returns (§4.3 step 4).

use chatgate_common::types::{Button, ParseMode};

#[derive(Debug, Clone)]
pub struct MenuView {
    pub text: String,
    pub buttons: Option<Vec<Vec<Button>>>,
    pub parse_mode: ParseMode,
}

impl MenuView {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), buttons: None, parse_mode: ParseMode::Plain }
    }

    #[must_use]
    pub fn with_buttons(mut self, buttons: Vec<Vec<Button>>) -> Self {
        self.buttons = Some(buttons);
        self
    }

    #[must_use]
    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    /// A single `Main Menu` button card, used by the dispatch-layer error
    /// handler (§4.3 "Error handling in handlers").
    #[must_use]
    pub fn main_menu_error(message: impl Into<String>) -> Self {
        Self::new(message.into()).with_buttons(vec![vec![Button::callback("Main Menu", "menu:main")]])
    }
}
