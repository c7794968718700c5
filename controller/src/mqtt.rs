use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, QoS};
use tracing::{debug, info, warn};

use envrig_common::{
    config::NetworkConfig,
    ports::{Publisher, RemoteInbox},
    RemoteChannel, TransportFault, TOPIC_CMD_CONTROL, TOPIC_CMD_THRESHOLD, TOPIC_STATUS,
};

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;
const MAILBOX_DEPTH: usize = 8;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Undelivered remote messages, one queue per channel.
#[derive(Debug, Default)]
struct Mailbox {
    control: VecDeque<String>,
    threshold: VecDeque<String>,
}

impl Mailbox {
    fn queue(&mut self, channel: RemoteChannel) -> &mut VecDeque<String> {
        match channel {
            RemoteChannel::Control => &mut self.control,
            RemoteChannel::Threshold => &mut self.threshold,
        }
    }

    fn deliver(&mut self, channel: RemoteChannel, message: String) {
        let queue = self.queue(channel);
        if queue.len() == MAILBOX_DEPTH {
            queue.pop_front();
            warn!("{channel:?} mailbox full; dropping oldest message");
        }
        queue.push_back(message);
    }
}

#[derive(Debug, Default)]
struct Link {
    connected: AtomicBool,
    reconnect: tokio::sync::Notify,
    mailbox: Mutex<Mailbox>,
}

fn channel_for(topic: &str) -> Option<RemoteChannel> {
    match topic {
        TOPIC_CMD_CONTROL => Some(RemoteChannel::Control),
        TOPIC_CMD_THRESHOLD => Some(RemoteChannel::Threshold),
        _ => None,
    }
}

pub struct MqttPublisher {
    client: AsyncClient,
    link: Arc<Link>,
}

pub struct MqttInbox {
    link: Arc<Link>,
}

/// Starts the broker session and its event-loop task.
pub fn connect(network: &NetworkConfig) -> (MqttPublisher, MqttInbox) {
    let mut options = MqttOptions::new(
        network.client_id.clone(),
        network.mqtt_host.clone(),
        network.mqtt_port,
    );
    options.set_keep_alive(Duration::from_secs(30));
    options.set_last_will(LastWill::new(TOPIC_STATUS, "offline", QoS::AtLeastOnce, true));
    if !network.mqtt_user.is_empty() {
        options.set_credentials(network.mqtt_user.clone(), network.mqtt_pass.clone());
    }

    let (client, eventloop) = AsyncClient::new(options, 64);
    let link = Arc::new(Link::default());
    tokio::spawn(drive(client.clone(), eventloop, Arc::clone(&link)));

    info!(
        "mqtt session to {}:{} as {}",
        network.mqtt_host, network.mqtt_port, network.client_id
    );
    (
        MqttPublisher {
            client,
            link: Arc::clone(&link),
        },
        MqttInbox { link },
    )
}

async fn drive(client: AsyncClient, mut eventloop: EventLoop, link: Arc<Link>) {
    loop {
        let polled = tokio::select! {
            _ = link.reconnect.notified() => {
                link.connected.store(false, Ordering::Relaxed);
                eventloop.clean();
                info!("mqtt session reset on request");
                continue;
            }
            polled = eventloop.poll() => polled,
        };

        match polled {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                info!("mqtt connected");
                for topic in [TOPIC_CMD_CONTROL, TOPIC_CMD_THRESHOLD] {
                    if let Err(err) = client.try_subscribe(topic, QoS::AtLeastOnce) {
                        warn!("subscribe to {topic} failed: {err}");
                    }
                }
                let online = client.try_publish(TOPIC_STATUS, QoS::AtLeastOnce, true, "online");
                if let Err(err) = online {
                    warn!("status publish failed: {err}");
                }
                link.connected.store(true, Ordering::Relaxed);
            }
            Ok(Event::Incoming(Incoming::Publish(message))) => {
                handle_message(&link, &message.topic, &message.payload);
            }
            Ok(Event::Incoming(Incoming::Disconnect)) => {
                link.connected.store(false, Ordering::Relaxed);
                info!("mqtt disconnected by broker");
            }
            Ok(_) => {}
            Err(err) => {
                if link.connected.swap(false, Ordering::Relaxed) {
                    warn!("mqtt connection lost: {err}");
                } else {
                    debug!("mqtt poll error: {err}");
                }
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

fn handle_message(link: &Link, topic: &str, payload: &[u8]) {
    let Some(channel) = channel_for(topic) else {
        debug!("ignoring message on {topic}");
        return;
    };
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {topic} ({} bytes)",
            payload.len()
        );
        return;
    }
    let message = match std::str::from_utf8(payload) {
        Ok(message) => message.to_string(),
        Err(err) => {
            warn!("dropping non utf8 payload on {topic}: {err}");
            return;
        }
    };

    match link.mailbox.lock() {
        Ok(mut mailbox) => mailbox.deliver(channel, message),
        Err(_) => warn!("mailbox poisoned; dropping message on {topic}"),
    }
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, topic: &str, payload: String) -> Result<(), TransportFault> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|err| TransportFault::Send(err.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.link.connected.load(Ordering::Relaxed)
    }

    fn request_reconnect(&mut self) {
        self.link.reconnect.notify_one();
    }

    /// Best effort; the broker's last will covers an unclean exit.
    fn disconnect(&mut self) {
        let offline = self
            .client
            .try_publish(TOPIC_STATUS, QoS::AtLeastOnce, true, "offline");
        if let Err(err) = offline {
            debug!("offline status not queued: {err}");
        }
        if let Err(err) = self.client.try_disconnect() {
            debug!("mqtt disconnect not queued: {err}");
        }
        self.link.connected.store(false, Ordering::Relaxed);
    }
}

impl RemoteInbox for MqttInbox {
    fn fetch(&mut self, channel: RemoteChannel) -> Result<Option<String>, TransportFault> {
        let mut mailbox = self
            .link
            .mailbox
            .lock()
            .map_err(|_| TransportFault::Receive("mailbox poisoned".to_string()))?;
        let message = mailbox.queue(channel).pop_front();
        if message.is_none() && !self.link.connected.load(Ordering::Relaxed) {
            return Err(TransportFault::NotConnected);
        }
        Ok(message)
    }
}
