//! Text chat bridged to a Direct Line bot.
//!
//! Conversations are started on the bot's Direct Line channel and mirrored in
//! the conversation store. The client polls `/activities`; bot replies seen
//! while polling are stored as assistant messages.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::core::direct_line::{ActivitiesQuery, Activity, ActivitySet, DirectLineClient};
use crate::core::storage::{Conversation, ConversationId, Message, NewMessage, Sender};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Response to `POST /api/conversations/start`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationResponse {
    pub id: ConversationId,
    pub direct_line_conversation_id: String,
    pub token: Option<String>,
    pub stream_url: Option<String>,
}

/// Body of `POST /api/conversations/{id}/messages`
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub id: String,
}

fn direct_line(state: &AppState) -> AppResult<&DirectLineClient> {
    state
        .direct_line
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Direct Line is not configured".to_string()))
}

async fn find_conversation(state: &AppState, id: ConversationId) -> AppResult<Conversation> {
    state
        .store
        .get_conversation(id)
        .await
        .map_err(|e| {
            error!(conversation_id = id, error = %e, "Failed to load conversation");
            AppError::Internal("Failed to load conversation".to_string())
        })?
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))
}

/// Start a bot conversation
pub async fn start_conversation(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<StartConversationResponse>> {
    let client = direct_line(&state)?;
    let internal = || AppError::Internal("Failed to start conversation".to_string());

    let started = client.start_conversation().await.map_err(|e| {
        error!(error = %e, "Error starting conversation");
        internal()
    })?;

    let conversation = state
        .store
        .create_conversation(&started.conversation_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Error storing conversation");
            internal()
        })?;

    info!(
        conversation_id = conversation.id,
        direct_line_conversation_id = %started.conversation_id,
        "Conversation started"
    );

    Ok(Json(StartConversationResponse {
        id: conversation.id,
        direct_line_conversation_id: started.conversation_id,
        token: started.token,
        stream_url: started.stream_url,
    }))
}

/// Send a user message to the bot
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
    Json(request): Json<SendMessageRequest>,
) -> AppResult<Json<SendMessageResponse>> {
    let text = request
        .text
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AppError::BadRequest("Message text is required".to_string()))?;

    let client = direct_line(&state)?;
    let conversation = find_conversation(&state, id).await?;
    let internal = || AppError::Internal("Failed to send message".to_string());

    let sent = client
        .send_activity(
            &conversation.direct_line_conversation_id,
            &Activity::user_message(text.as_str()),
        )
        .await
        .map_err(|e| {
            error!(conversation_id = id, error = %e, "Error sending message");
            internal()
        })?;

    state
        .store
        .create_message(NewMessage::text(id, Sender::User, text))
        .await
        .map_err(|e| {
            error!(conversation_id = id, error = %e, "Error storing message");
            internal()
        })?;

    Ok(Json(SendMessageResponse { id: sent.id }))
}

/// Poll the bot for new activities
pub async fn get_activities(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
    Query(query): Query<ActivitiesQuery>,
) -> AppResult<Json<ActivitySet>> {
    let client = direct_line(&state)?;
    let conversation = find_conversation(&state, id).await?;
    let internal = || AppError::Internal("Failed to get activities".to_string());

    let activities = client
        .get_activities(
            &conversation.direct_line_conversation_id,
            query.watermark.as_deref(),
        )
        .await
        .map_err(|e| {
            error!(conversation_id = id, error = %e, "Error getting activities");
            internal()
        })?;

    for text in activities
        .activities
        .iter()
        .filter_map(Activity::bot_message_text)
    {
        state
            .store
            .create_message(NewMessage::text(id, Sender::Assistant, text))
            .await
            .map_err(|e| {
                error!(conversation_id = id, error = %e, "Error storing bot message");
                internal()
            })?;
    }

    Ok(Json(activities))
}

/// Stored messages of a conversation, oldest first
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
) -> AppResult<Json<Vec<Message>>> {
    state
        .store
        .get_messages_by_conversation_id(id)
        .await
        .map(Json)
        .map_err(|e| {
            error!(conversation_id = id, error = %e, "Error getting messages");
            AppError::Internal("Failed to get messages".to_string())
        })
}

pub async fn clear_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ConversationId>,
) -> AppResult<Json<Value>> {
    state
        .store
        .clear_conversation_messages(id)
        .await
        .map_err(|e| {
            error!(conversation_id = id, error = %e, "Error clearing messages");
            AppError::Internal("Failed to clear messages".to_string())
        })?;

    Ok(Json(json!({ "success": true })))
}
