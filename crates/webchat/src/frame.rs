//! Wire frames exchanged over the `/chat` WebSocket. Deliberately simpler
//! than `chatgate-protocol`'s operator RPC frames (§6.1 is the bot's inline
//! callback token wire format; this is the webchat's own, much smaller,
//! text+attachments contract): a client sends one `text`/`attachments` frame
//! per turn, the server streams back `message`/`edit`/`delete`/`reaction`
//! frames addressed by an opaque message id.

use serde::{Deserialize, Serialize};

use chatgate_common::types::{Attachment, Button, ParseMode};

/// A frame sent by the webchat client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A frame sent by the gateway to a connected webchat client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Message {
        id: String,
        text: String,
        parse_mode: ParseMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        buttons: Option<Vec<Vec<Button>>>,
    },
    Edit {
        id: String,
        text: String,
        parse_mode: ParseMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        buttons: Option<Vec<Vec<Button>>>,
    },
    EditButtons {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        buttons: Option<Vec<Vec<Button>>>,
    },
    Delete {
        id: String,
    },
    Reaction {
        id: String,
        emoji: String,
    },
    Poll {
        id: String,
        question: String,
        options: Vec<String>,
    },
    Attachment {
        id: String,
        attachment: Attachment,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}
