//! Realtime subscriptions over server-sent events.
//!
//! Each subscription owns one SSE connection: the server announces a client
//! id in its first event, the topic is registered for that id, and from then
//! on events named after the topic carry `{action, record}` payloads.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Method;
use tracing::{debug, info, instrument, warn};

use filedeck_core::error::SubscriptionError;
use filedeck_core::{
    AuthToken, ChangeSender, ChangeSubscription, RawChange, Result, SubscriptionRegistry, Topic,
};

use crate::client::ApiClient;
use crate::endpoints::{CONNECT_EVENT, ConnectEvent, REALTIME, SetSubscriptionsRequest};
use crate::sse::{self, EventStream};

/// How long to wait for the connect event.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connects, registers `topic` and hands the connection to a producer task.
#[instrument(skip(client, token, registry, topic), fields(%topic))]
pub(crate) async fn subscribe(
    client: &ApiClient,
    token: &AuthToken,
    registry: &Arc<SubscriptionRegistry>,
    topic: &Topic,
) -> Result<ChangeSubscription> {
    let response = client.open_stream(REALTIME).await?;
    let mut events = sse::events(response);

    let client_id = tokio::time::timeout(HANDSHAKE_TIMEOUT, wait_for_connect(&mut events))
        .await
        .map_err(|_| SubscriptionError::Handshake {
            message: format!("no {} event within {:?}", CONNECT_EVENT, HANDSHAKE_TIMEOUT),
        })??;
    debug!(%client_id, "Realtime connection established");

    let request = SetSubscriptionsRequest {
        client_id: &client_id,
        subscriptions: vec![topic.to_string()],
    };
    client
        .send_json_no_response(Method::POST, REALTIME, &request, Some(token))
        .await?;

    info!(%client_id, "Realtime topic registered");

    let name = topic.to_string();
    Ok(registry.open(topic.clone(), move |tx| forward(events, name, tx)))
}

async fn wait_for_connect(events: &mut EventStream) -> Result<String> {
    while let Some(event) = events.next().await {
        let event = event?;
        if event.event != CONNECT_EVENT {
            debug!(event = %event.event, "Ignoring event before connect");
            continue;
        }
        let connect: ConnectEvent =
            serde_json::from_str(&event.data).map_err(|e| SubscriptionError::Handshake {
                message: format!("malformed {} payload: {}", CONNECT_EVENT, e),
            })?;
        return Ok(connect.client_id);
    }

    Err(SubscriptionError::Handshake {
        message: "connection closed before the connect event".to_string(),
    }
    .into())
}

/// Decodes events named `topic` and sends them on until either side closes.
async fn forward(mut events: EventStream, topic: String, tx: ChangeSender) {
    while let Some(event) = events.next().await {
        let item: Result<RawChange> = match event {
            Ok(event) if event.event == topic => {
                serde_json::from_str::<RawChange>(&event.data).map_err(|e| {
                    warn!(%topic, error = %e, "Malformed realtime event");
                    SubscriptionError::MalformedEvent {
                        event: event.event.clone(),
                        reason: e.to_string(),
                    }
                    .into()
                })
            }
            Ok(event) => {
                debug!(event = %event.event, "Ignoring event for another topic");
                continue;
            }
            Err(e) => {
                warn!(%topic, error = %e, "Realtime stream failed");
                let _ = tx.send(Err(e));
                return;
            }
        };

        if tx.send(item).is_err() {
            debug!(%topic, "Subscriber gone");
            return;
        }
    }

    info!(%topic, "Realtime stream closed by server");
}
