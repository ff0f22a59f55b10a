#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::time::Duration;
	use tokio::sync::mpsc;
	use tokio::time::timeout;
	use ws_client::transport::inmem::{InMemTransport, ServerEnd};
	use ws_client::{ClientConfig, ClientHandle};
	use ws_features::{ChatAdapter, ChatIdentity, EventsAdapter, NotificationsAdapter, PresenceAdapter};
	use ws_messages::{
		ChatMessageData, Envelope, EventAction, EventUpdateData, MessageType, NotificationCategory, NotificationData, Payload, PresenceData, PresenceStatus,
		ReceiptData, UserEventData,
	};

	const WAIT: Duration = Duration::from_secs(2);

	async fn connected_client() -> (ClientHandle, ServerEnd) {
		let config = ClientConfig {
			url: "ws://testing".to_string(),
			heartbeat_interval: Duration::from_secs(60),
			connection_timeout: Duration::from_millis(250),
			..ClientConfig::default()
		};
		let (transport, mut acceptor) = InMemTransport::new();
		let handle = ClientHandle::spawn(config, transport);

		handle.connect().await.expect("connect failed");
		let server = timeout(WAIT, acceptor.recv()).await.expect("no connection").expect("acceptor closed");
		(handle, server)
	}

	fn identity() -> ChatIdentity {
		ChatIdentity {
			user_id: "u1".to_string(),
			user_name: "Ananda".to_string(),
		}
	}

	fn chat_from(id: &str, room: &str, user: &str, content: &str) -> Envelope {
		Envelope::new(MessageType::ChatMessage, Payload::Chat(ChatMessageData::new(content).unwrap()))
			.with_id(id)
			.with_room(room)
			.with_user(user)
	}

	fn notification(id: &str, title: &str, dismissible: bool) -> Envelope {
		Envelope::new(
			MessageType::Notification,
			Payload::Notification(NotificationData {
				title: title.to_string(),
				body: "details".to_string(),
				category: NotificationCategory::Info,
				action_url: None,
				dismissible,
				persistent: false,
				read: None,
			}),
		)
		.with_id(id)
	}

	async fn eventually<F>(mut check: F)
	where
		F: FnMut() -> bool,
	{
		timeout(WAIT, async {
			while !check() {
				tokio::time::sleep(Duration::from_millis(10)).await;
			}
		})
		.await
		.expect("condition not reached within deadline");
	}

	async fn expect_type(server: &mut ServerEnd, message_type: &MessageType) -> Envelope {
		timeout(WAIT, async {
			loop {
				let envelope = server.recv_envelope().await.expect("transport ended while waiting for frame");
				if envelope.message_type == *message_type {
					return envelope;
				}
			}
		})
		.await
		.expect("expected frame within deadline")
	}

	#[tokio::test]
	async fn test_chat_history_is_bounded() {
		let (handle, server) = connected_client().await;
		let chat = ChatAdapter::attach_with_capacity(handle, identity(), 3).await.unwrap();

		for n in 0..5 {
			let envelope = chat_from(&format!("m{n}"), "general", "u9", &format!("message {n}"));
			server.send_envelope(&envelope).await.unwrap();
		}

		eventually(|| {
			let recent = chat.recent("general");
			recent.last().is_some_and(|entry| entry.content == "message 4")
		})
		.await;

		let contents: Vec<String> = chat.recent("general").into_iter().map(|entry| entry.content).collect();
		assert_eq!(contents, vec!["message 2", "message 3", "message 4"]);
	}

	#[tokio::test]
	async fn test_send_message_returns_id_and_hits_wire() {
		let (handle, mut server) = connected_client().await;
		let chat = ChatAdapter::attach(handle, identity()).await.unwrap();

		let id = chat.send_message("general", "namaste", Some("m0")).await.unwrap();

		let sent = expect_type(&mut server, &MessageType::ChatMessage).await;
		assert_eq!(sent.id, id);
		assert_eq!(sent.room.as_deref(), Some("general"));
		assert_eq!(sent.user_id.as_deref(), Some("u1"));
		match &sent.payload {
			Payload::Chat(data) => {
				assert_eq!(data.content, "namaste");
				assert_eq!(data.reply_to.as_deref(), Some("m0"));
			}
			other => panic!("expected chat payload, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_receipts_flip_local_flags() {
		let (handle, server) = connected_client().await;
		let chat = ChatAdapter::attach(handle, identity()).await.unwrap();

		server.send_envelope(&chat_from("m1", "general", "u9", "hello")).await.unwrap();
		eventually(|| chat.recent("general").len() == 1).await;
		assert!(!chat.recent("general")[0].read);

		let receipt = Envelope::new(
			MessageType::MessageRead,
			Payload::Receipt(ReceiptData {
				message_id: "m1".to_string(),
			}),
		);
		server.send_envelope(&receipt).await.unwrap();

		eventually(|| chat.recent("general")[0].read).await;
		assert!(chat.recent("general")[0].delivered);
	}

	#[tokio::test]
	async fn test_typing_auto_stops_after_idle() {
		let (handle, mut server) = connected_client().await;
		let chat = ChatAdapter::attach(handle, identity()).await.unwrap().with_typing_idle(Duration::from_millis(80));

		chat.start_typing("general").await.unwrap();
		let start = expect_type(&mut server, &MessageType::TypingStart).await;
		match &start.payload {
			Payload::Typing(data) => assert_eq!(data.user_name, "Ananda"),
			other => panic!("expected typing payload, got {other:?}"),
		}

		// No explicit stop call: the idle timer sends it.
		let stop = expect_type(&mut server, &MessageType::TypingStop).await;
		assert_eq!(stop.room.as_deref(), Some("general"));
	}

	#[tokio::test]
	async fn test_explicit_stop_cancels_idle_timer() {
		let (handle, mut server) = connected_client().await;
		let chat = ChatAdapter::attach(handle, identity()).await.unwrap().with_typing_idle(Duration::from_millis(80));

		chat.start_typing("general").await.unwrap();
		let _ = expect_type(&mut server, &MessageType::TypingStart).await;

		chat.stop_typing("general").await.unwrap();
		let _ = expect_type(&mut server, &MessageType::TypingStop).await;

		// The idle timer was cancelled; no second stop arrives.
		tokio::time::sleep(Duration::from_millis(150)).await;
		let extra = server.from_client.try_recv();
		assert!(extra.is_err(), "no further frames expected, got {extra:?}");
	}

	#[tokio::test]
	async fn test_presence_roster_tracks_updates() {
		let (handle, server) = connected_client().await;
		let presence = PresenceAdapter::attach(handle, "u1").await.unwrap();

		let update = Envelope::new(
			MessageType::PresenceUpdate,
			Payload::Presence(PresenceData {
				user_id: "u2".to_string(),
				status: PresenceStatus::Busy,
				last_seen: None,
				custom_status: Some("in meditation".to_string()),
			}),
		);
		server.send_envelope(&update).await.unwrap();

		let online = Envelope::new(
			MessageType::UserOnline,
			Payload::UserEvent(UserEventData {
				user_id: "u3".to_string(),
				user_name: Some("Devadatta".to_string()),
			}),
		);
		server.send_envelope(&online).await.unwrap();

		eventually(|| presence.roster().len() == 2).await;

		let busy = presence.status_of("u2").unwrap();
		assert_eq!(busy.status, PresenceStatus::Busy);
		assert_eq!(busy.custom_status.as_deref(), Some("in meditation"));
		assert_eq!(presence.status_of("u3").unwrap().status, PresenceStatus::Online);
	}

	#[tokio::test]
	async fn test_set_status_broadcasts_presence_update() {
		let (handle, mut server) = connected_client().await;
		let presence = PresenceAdapter::attach(handle, "u1").await.unwrap();

		presence.set_status(PresenceStatus::Away, Some("walking".to_string())).await.unwrap();

		let sent = expect_type(&mut server, &MessageType::PresenceUpdate).await;
		match &sent.payload {
			Payload::Presence(data) => {
				assert_eq!(data.user_id, "u1");
				assert_eq!(data.status, PresenceStatus::Away);
				assert_eq!(data.custom_status.as_deref(), Some("walking"));
			}
			other => panic!("expected presence payload, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_notification_feed_unread_and_dismiss() {
		let (handle, server) = connected_client().await;
		let notifications = NotificationsAdapter::attach(handle).await.unwrap();

		server.send_envelope(&notification("n1", "retreat", true)).await.unwrap();
		server.send_envelope(&notification("n2", "schedule", false)).await.unwrap();

		eventually(|| notifications.recent().len() == 2).await;
		assert_eq!(notifications.unread_count(), 2);

		let first = notifications.recent()[0].id.clone();
		notifications.mark_read(&first).await.unwrap();
		assert_eq!(notifications.unread_count(), 1);

		// Dismissible entry goes; the other refuses.
		assert!(notifications.dismiss(&first));
		let second = notifications.recent()[0].id.clone();
		assert!(!notifications.dismiss(&second));
		assert_eq!(notifications.recent().len(), 1);
	}

	#[tokio::test]
	async fn test_notification_feed_is_bounded() {
		let (handle, server) = connected_client().await;
		let notifications = NotificationsAdapter::attach_with_capacity(handle, 2).await.unwrap();

		for n in 0..4 {
			server.send_envelope(&notification(&format!("n{n}"), "title", false)).await.unwrap();
		}

		eventually(|| {
			let recent = notifications.recent();
			recent.len() == 2 && recent[0].id.as_str() == "n2"
		})
		.await;
	}

	#[tokio::test]
	async fn test_event_reminders_ack_locally() {
		let (handle, server) = connected_client().await;
		let events = EventsAdapter::attach(handle).await.unwrap();

		let reminder = Envelope::new(
			MessageType::EventReminder,
			Payload::Event(EventUpdateData {
				event_id: "vesak".to_string(),
				action: EventAction::Reminder,
				event_data: serde_json::json!({ "startsAt": "2026-05-01T09:00:00Z" }),
			}),
		);
		server.send_envelope(&reminder).await.unwrap();

		eventually(|| events.pending_reminders().len() == 1).await;

		assert_eq!(events.ack_reminder("vesak"), 1);
		assert!(events.pending_reminders().is_empty());
		assert_eq!(events.recent().len(), 1);
	}
}
