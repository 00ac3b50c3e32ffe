//! Bot Framework Direct Line bridge.
//!
//! The text chat path is a thin pass-through: conversations are started and
//! polled on the bot's Direct Line channel, and every user or bot message is
//! mirrored into the conversation store.

mod client;
mod messages;

pub use client::{
    ActivitiesQuery, DIRECT_LINE_BASE_URL, DirectLineClient, DirectLineConfig, DirectLineError,
    DirectLineResult,
};
pub use messages::{
    Activity, ActivitySet, ChannelAccount, DirectLineConversation, ResourceResponse, USER_ID,
};
