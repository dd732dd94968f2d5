//! C8 Dispatcher — routes one parsed `ReqFrame` to the Room/Chat/Instance
//! operation it names and writes back a `ResFrame` (§4.7). Domain state
//! changes (presence, chat, groups, questions) push their own `EventFrame`s
//! directly through `Room`/`Chat`, the same way those types already behave
//! when driven from their unit tests — this module's job is parsing params,
//! finding the right handle, and acknowledging the request.

use classroom_collab::{CommentEventInput, InstanceHandle, Selection, Step};
use classroom_core::types::{DocumentId, Email, Role, RoomName};
use classroom_protocol::frames::{EventFrame, ReqFrame, ResFrame};
use classroom_protocol::messages::{
    ChatMessageParams, CollaborativeEditingEventsPayload, CommentEventWire, CreateGroupsParams,
    DirectInvitationParams, EventParams, EventTarget, JoinChatParams,
    JoinCollaborativeEditingParams, JoinParams, JoinedCollaborativeEditingPayload,
    PollCollaborativeEditingEventsParams, ProgressParams, QuestionParams,
    SendCollaborativeEditingEventsParams, StepWire, UpdateCursorParams,
};
use classroom_protocol::methods;
use classroom_rooms::chat::ChatMessage;
use classroom_rooms::member::Member;
use classroom_rooms::Transport;
use operational_transform::OperationSeq;
use serde_json::{json, Value};

use crate::ws::connection::ConnectionCtx;

/// Parse and dispatch one request. Returns `true` if the caller should close
/// the connection afterward (`disconnect`, or a fatal parse failure).
pub async fn handle_request(ctx: &mut ConnectionCtx, req: ReqFrame) -> bool {
    let id = req.id.clone();
    let params = req.params.clone().unwrap_or(Value::Null);

    let result = match req.method.as_str() {
        methods::JOIN => handle_join(ctx, params).await,
        methods::PROGRESS => handle_progress(ctx, params),
        methods::EVENT => handle_event(ctx, params),
        methods::JOIN_CHAT => handle_join_chat(ctx, params),
        methods::LEAVE_CHAT => handle_leave_chat(ctx, params),
        methods::CLOSE_CHAT => handle_close_chat(ctx, params),
        methods::CHAT_MESSAGE => handle_chat_message(ctx, params),
        methods::CHAT_INVITATION => handle_direct_invitation(ctx, methods::CHAT_INVITATION, params),
        methods::VIDEO_INVITATION => handle_direct_invitation(ctx, methods::VIDEO_INVITATION, params),
        methods::CREATE_GROUPS => handle_create_groups(ctx, params),
        methods::DELETE_GROUPS => handle_delete_groups(ctx),
        methods::ADD_QUESTION => handle_add_question(ctx, params),
        methods::REMOVE_QUESTION => handle_remove_question(ctx, params),
        methods::JOIN_COLLABORATIVE_EDITING => handle_join_collaborative_editing(ctx, params).await,
        methods::SEND_COLLABORATIVE_EDITING_EVENTS => {
            handle_send_collaborative_editing_events(ctx, params).await
        }
        methods::POLL_COLLABORATIVE_EDITING_EVENTS => {
            return handle_poll_collaborative_editing_events(ctx, &id, params).await;
        }
        methods::UPDATE_CURSOR => handle_update_cursor(ctx, params).await,
        methods::LEAVE => {
            leave_current_room(ctx);
            Ok(Value::Null)
        }
        methods::DISCONNECT => {
            cleanup_connection(ctx).await;
            reply(ctx, ResFrame::ok(id, Value::Null));
            return true;
        }
        other => Err(ClassroomError::InvalidInput(format!("unknown method: {other}"))),
    };

    match result {
        Ok(payload) => reply(ctx, ResFrame::ok(id, payload)),
        Err(e) => reply(ctx, ResFrame::err(id, e.code(), &e.to_string())),
    }
    false
}

/// Socket-close teardown — leave the current room and clear this socket's
/// presence from every collaborative-editing instance it joined.
pub async fn cleanup_connection(ctx: &mut ConnectionCtx) {
    leave_current_room(ctx);
    let email = ctx.user.email.as_str().to_string();
    for (_, client_id, handle) in ctx.joined_docs.drain(..) {
        handle.lock().await.remove_user(&email, &client_id);
    }
}

fn reply(ctx: &ConnectionCtx, frame: ResFrame) {
    if let Ok(text) = serde_json::to_string(&frame) {
        ctx.transport.send_text(text);
    }
}

fn leave_current_room(ctx: &mut ConnectionCtx) {
    let Some((room_name, handle)) = ctx.room.take() else {
        return;
    };
    handle.lock().unwrap().leave(&ctx.socket_id);
    ctx.state.rooms.evict_if_empty(&room_name);
}

use classroom_core::ClassroomError;

async fn handle_join(ctx: &mut ConnectionCtx, params: Value) -> classroom_core::Result<Value> {
    let params: JoinParams = serde_json::from_value(params)
        .map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;

    leave_current_room(ctx);

    let is_owner = if ctx.user.is_admin {
        true
    } else {
        ctx.state
            .namespaces
            .is_owner(&ctx.user.id, &params.namespace_name)
            .await?
    };
    ctx.role = if is_owner { Role::Owner } else { Role::Student };
    ctx.display_name = if params.user_name.is_empty() {
        ctx.user.display_name.clone()
    } else {
        params.user_name.clone()
    };

    let room_name = RoomName::new(&params.namespace_name, &params.lesson_name);
    let handle = ctx.state.rooms.get_or_create(&room_name);

    let member = Member::new(
        Email::from(params.user_email.as_str()),
        ctx.display_name.clone(),
        ctx.role,
        classroom_rooms::chat::DEFAULT_AVATAR.to_string(),
        ctx.transport.clone(),
    );
    handle.lock().unwrap().join(member);
    ctx.room = Some((room_name, handle));

    Ok(Value::Null)
}

fn current_member(ctx: &ConnectionCtx) -> classroom_core::Result<Member> {
    let (_, handle) = ctx
        .room
        .as_ref()
        .ok_or_else(|| ClassroomError::InvalidInput("not joined to a room".to_string()))?;
    handle
        .lock()
        .unwrap()
        .member_by_socket(&ctx.socket_id)
        .cloned()
        .ok_or_else(|| ClassroomError::NotFound("member not present in room".to_string()))
}

fn handle_progress(ctx: &ConnectionCtx, params: Value) -> classroom_core::Result<Value> {
    let params: ProgressParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    let member = current_member(ctx)?;
    let (_, handle) = ctx.room.as_ref().unwrap();
    handle.lock().unwrap().emit_progress(params.value, &member);
    Ok(Value::Null)
}

fn handle_event(ctx: &ConnectionCtx, params: Value) -> classroom_core::Result<Value> {
    let params: EventParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    let (_, handle) = ctx
        .room
        .as_ref()
        .ok_or_else(|| ClassroomError::InvalidInput("not joined to a room".to_string()))?;
    let room = handle.lock().unwrap();
    match EventTarget::parse(&params.target) {
        EventTarget::Members => room.emit_to_members(&params.event_type, params.data, params.anonymous),
        EventTarget::Owners => room.emit_to_owners(&params.event_type, params.data, params.anonymous),
        EventTarget::Email(email) => room.emit_to_email(&Email::from(email), &params.event_type, params.data),
    }
    Ok(Value::Null)
}

fn handle_join_chat(ctx: &ConnectionCtx, params: Value) -> classroom_core::Result<Value> {
    let params: JoinChatParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    let (_, handle) = ctx
        .room
        .as_ref()
        .ok_or_else(|| ClassroomError::InvalidInput("not joined to a room".to_string()))?;
    let mirror = handle
        .lock()
        .unwrap()
        .join_chat(&params.name, &ctx.socket_id)
        .ok_or_else(|| ClassroomError::NotFound("member not present in room".to_string()))?;
    Ok(json!({ "mirror": mirror }))
}

fn handle_leave_chat(ctx: &ConnectionCtx, params: Value) -> classroom_core::Result<Value> {
    let params: JoinChatParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    if let Some((_, handle)) = ctx.room.as_ref() {
        handle.lock().unwrap().leave_chat(&params.name, &ctx.socket_id);
    }
    Ok(Value::Null)
}

fn handle_close_chat(ctx: &ConnectionCtx, params: Value) -> classroom_core::Result<Value> {
    if !ctx.role.is_owner() {
        return Err(ClassroomError::PermissionDenied {
            reason: "only an owner may close a chat".to_string(),
        });
    }
    let params: JoinChatParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    if let Some((_, handle)) = ctx.room.as_ref() {
        handle.lock().unwrap().close_chat_for_all(&params.name);
    }
    Ok(Value::Null)
}

fn handle_chat_message(ctx: &ConnectionCtx, params: Value) -> classroom_core::Result<Value> {
    let params: ChatMessageParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    let member = current_member(ctx)?;
    let message = ChatMessage {
        body: params.body,
        author_display: member.display_name.clone(),
        author_email: member.email.clone(),
        avatar: member.avatar.clone(),
        timestamp: chrono::Utc::now(),
        anonymous: params.anonymous,
    };
    let (_, handle) = ctx.room.as_ref().unwrap();
    handle.lock().unwrap().send_chat_message(&params.chatroom, message);
    Ok(Value::Null)
}

fn handle_direct_invitation(ctx: &ConnectionCtx, method: &str, params: Value) -> classroom_core::Result<Value> {
    let params: DirectInvitationParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    let (_, handle) = ctx
        .room
        .as_ref()
        .ok_or_else(|| ClassroomError::InvalidInput("not joined to a room".to_string()))?;
    handle
        .lock()
        .unwrap()
        .emit_to_email(&Email::from(params.to), method, params.data);
    Ok(Value::Null)
}

fn handle_create_groups(ctx: &ConnectionCtx, params: Value) -> classroom_core::Result<Value> {
    if !ctx.role.is_owner() {
        return Err(ClassroomError::PermissionDenied {
            reason: "only an owner may create breakout groups".to_string(),
        });
    }
    let params: CreateGroupsParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    let (_, handle) = ctx.room.as_ref().unwrap();
    handle.lock().unwrap().create_groups(params.groups);
    Ok(Value::Null)
}

fn handle_delete_groups(ctx: &ConnectionCtx) -> classroom_core::Result<Value> {
    if !ctx.role.is_owner() {
        return Err(ClassroomError::PermissionDenied {
            reason: "only an owner may delete breakout groups".to_string(),
        });
    }
    let (_, handle) = ctx
        .room
        .as_ref()
        .ok_or_else(|| ClassroomError::InvalidInput("not joined to a room".to_string()))?;
    handle.lock().unwrap().delete_groups();
    Ok(Value::Null)
}

fn handle_add_question(ctx: &ConnectionCtx, params: Value) -> classroom_core::Result<Value> {
    let params: QuestionParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    let member = current_member(ctx)?;
    let (_, handle) = ctx.room.as_ref().unwrap();
    handle.lock().unwrap().add_question(params.value, &member);
    Ok(Value::Null)
}

fn handle_remove_question(ctx: &ConnectionCtx, params: Value) -> classroom_core::Result<Value> {
    let params: QuestionParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    let member = current_member(ctx)?;
    let (_, handle) = ctx.room.as_ref().unwrap();
    handle.lock().unwrap().remove_question(&params.value, &member);
    Ok(Value::Null)
}

/// Resolve a wire `doc_id` into its namespace/lesson/component triple and the
/// live instance for it, creating or loading it on first use (§4.5 C5).
async fn resolve_instance(ctx: &ConnectionCtx, doc_id: &str) -> classroom_core::Result<InstanceHandle> {
    let (namespace_id, lesson_id, component_id) = DocumentId(doc_id.to_string()).parse()?;
    ctx.state
        .instances
        .get_instance(&namespace_id, &lesson_id, &component_id)
        .await
        .map_err(|e| ClassroomError::Internal(e.to_string()))
}

/// The instance this connection already joined under `doc_id`, if any.
fn joined_instance(ctx: &ConnectionCtx, doc_id: &str) -> Option<InstanceHandle> {
    ctx.joined_docs
        .iter()
        .find(|(id, _, _)| id == doc_id)
        .map(|(_, _, handle)| handle.clone())
}

async fn handle_join_collaborative_editing(
    ctx: &mut ConnectionCtx,
    params: Value,
) -> classroom_core::Result<Value> {
    let params: JoinCollaborativeEditingParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    let handle = resolve_instance(ctx, &params.doc_id).await?;

    let payload = {
        let mut instance = handle.lock().await;
        instance.register_user(ctx.user.email.as_str(), &ctx.display_name, Some(ctx.user.id.clone()));
        let cursors: std::collections::HashMap<_, _> = instance
            .cursors()
            .all()
            .map(|(id, sel)| (id.clone(), sel.clone()))
            .collect();
        JoinedCollaborativeEditingPayload {
            doc: json!(instance.text()),
            users: json!(instance.users()),
            version: instance.version(),
            comments: json!(instance.comments().live()),
            comment_version: instance.comments().version(),
            cursors: json!(cursors),
        }
    };

    if !ctx
        .joined_docs
        .iter()
        .any(|(doc_id, client_id, _)| doc_id == &params.doc_id && client_id == &params.client_id)
    {
        ctx.joined_docs.push((params.doc_id, params.client_id, handle));
    }

    // Delivered as its own event, mirroring how `Room::join` hands the
    // joiner its state directly rather than riding the generic `res` ack.
    ctx.transport
        .send(EventFrame::new(methods::JOINED_COLLABORATIVE_EDITING, payload));
    Ok(Value::Null)
}

fn decode_op(value: &Value) -> classroom_core::Result<OperationSeq> {
    serde_json::from_value(value.clone()).map_err(|e| ClassroomError::InvalidInput(e.to_string()))
}

fn decode_comment(wire: CommentEventWire) -> classroom_core::Result<CommentEventInput> {
    match wire.kind.as_str() {
        "create" => Ok(CommentEventInput::Create {
            id: wire.id,
            from: wire.from.ok_or_else(|| ClassroomError::InvalidInput("comment create missing from".into()))?,
            to: wire.to.ok_or_else(|| ClassroomError::InvalidInput("comment create missing to".into()))?,
            text: wire.text.unwrap_or_default(),
        }),
        "delete" => Ok(CommentEventInput::Delete { id: wire.id }),
        other => Err(ClassroomError::InvalidInput(format!("unknown comment event type: {other}"))),
    }
}

fn encode_step(step: &Step) -> classroom_core::Result<StepWire> {
    Ok(StepWire {
        client_id: step.client_id.clone(),
        op: serde_json::to_value(&step.op).map_err(ClassroomError::Serialization)?,
    })
}

async fn handle_send_collaborative_editing_events(
    ctx: &ConnectionCtx,
    params: Value,
) -> classroom_core::Result<Value> {
    let params: SendCollaborativeEditingEventsParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    let handle = joined_instance(ctx, &params.doc_id)
        .ok_or_else(|| ClassroomError::InvalidInput("not joined to this document".to_string()))?;

    let (version, comment_version, user_count, accepted) = {
        let mut instance = handle.lock().await;

        let mut accepted = Vec::new();
        if !params.steps.is_empty() {
            let ops = params
                .steps
                .iter()
                .map(|step| decode_op(&step.op))
                .collect::<classroom_core::Result<Vec<_>>>()?;
            let result = instance
                .add_steps(&params.client_id, params.version as u64, ops)
                .map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
            accepted = result.accepted;
        }

        for comment in params.comment {
            instance.apply_comment_event(decode_comment(comment)?);
        }

        (
            instance.version(),
            instance.comments().version(),
            instance.active_user_count(),
            accepted,
        )
    };

    let steps = accepted
        .iter()
        .map(encode_step)
        .collect::<classroom_core::Result<Vec<_>>>()?;
    let payload = CollaborativeEditingEventsPayload {
        version,
        comment_version,
        user_count,
        steps,
        comment: Vec::new(),
        cursors: None,
    };

    // Fan the applied diff out to the rest of the room — the gateway has no
    // separate per-document subscriber directory, so the enclosing Room is
    // used as the broadcast unit, same as every other event in this crate.
    if let Some((_, room_handle)) = &ctx.room {
        let room = room_handle.lock().unwrap();
        for member in room.members() {
            if member.socket.id() != &ctx.socket_id {
                member.socket.send(EventFrame::new(methods::COLLABORATIVE_EDITING_EVENTS, &payload));
            }
        }
    }

    ctx.transport
        .send(EventFrame::new(methods::SENT_COLLABORATIVE_EDITING_EVENTS, &payload));
    Ok(Value::Null)
}

/// No reply is sent when there is nothing new to report — a polling client
/// at the current version gets silence, not an empty-payload ack.
async fn handle_poll_collaborative_editing_events(ctx: &ConnectionCtx, id: &str, params: Value) -> bool {
    let params: PollCollaborativeEditingEventsParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => {
            reply(ctx, ResFrame::err(id, "INVALID_INPUT", &e.to_string()));
            return false;
        }
    };

    let Some(handle) = joined_instance(ctx, &params.doc_id) else {
        reply(ctx, ResFrame::err(id, "INVALID_INPUT", "not joined to this document"));
        return false;
    };

    let diff = {
        let instance = handle.lock().await;
        instance.events_after(params.version, params.comment_version, params.cursor_version)
    };

    if diff.steps.is_empty() && diff.comment_events.is_empty() && diff.cursors.is_none() {
        return false;
    }

    let steps = match diff.steps.iter().map(encode_step).collect::<classroom_core::Result<Vec<_>>>() {
        Ok(s) => s,
        Err(e) => {
            reply(ctx, ResFrame::err(id, e.code(), &e.to_string()));
            return false;
        }
    };
    let comment = diff
        .comment_events
        .into_iter()
        .map(|e| match e {
            classroom_collab::OutCommentEvent::Create { id, from, to, text } => CommentEventWire {
                kind: "create".to_string(),
                id,
                text: Some(text),
                from: Some(from),
                to: Some(to),
            },
            classroom_collab::OutCommentEvent::Delete { id } => CommentEventWire {
                kind: "delete".to_string(),
                id,
                text: None,
                from: None,
                to: None,
            },
        })
        .collect();

    let instance = handle.lock().await;
    let payload = CollaborativeEditingEventsPayload {
        version: diff.version,
        comment_version: instance.comments().version(),
        user_count: instance.active_user_count(),
        steps,
        comment,
        cursors: diff.cursors.map(|c| json!(c)),
    };
    drop(instance);

    reply(ctx, ResFrame::ok(id, payload));
    false
}

async fn handle_update_cursor(ctx: &ConnectionCtx, params: Value) -> classroom_core::Result<Value> {
    let params: UpdateCursorParams =
        serde_json::from_value(params).map_err(|e| ClassroomError::InvalidInput(e.to_string()))?;
    let handle = joined_instance(ctx, &params.doc_id)
        .ok_or_else(|| ClassroomError::InvalidInput("not joined to this document".to_string()))?;

    {
        let mut instance = handle.lock().await;
        instance.update_cursor(
            &params.client_id,
            Selection {
                ranges: params.ranges.clone(),
            },
        );
    }

    if let Some((_, room_handle)) = &ctx.room {
        let room = room_handle.lock().unwrap();
        for member in room.members() {
            if member.socket.id() != &ctx.socket_id {
                member.socket.send(EventFrame::new(
                    methods::CURSOR_UPDATED,
                    json!({
                        "doc_id": params.doc_id,
                        "client_id": params.client_id,
                        "ranges": params.ranges,
                    }),
                ));
            }
        }
    }

    Ok(Value::Null)
}
