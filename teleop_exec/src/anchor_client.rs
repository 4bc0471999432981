//! # Anchor Client
//!
//! Subscribes to anchor pose messages, which align the odometry frame with the map frame. The
//! publisher may send at any rate, the client drains the pending messages once per cycle, up to a
//! fixed limit, and keeps only the newest valid pose.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};

use comms_if::{
    anchor::AnchorPose,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

use crate::ctrl_loop::AnchorSource;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Most messages received by one call to [`AnchorClient::drain`], equal to the zmq default
/// receive high water mark.
pub const MAX_DRAIN_PER_CALL: usize = 1000;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Anchor pose subscriber
pub struct AnchorClient {
    socket: MonitoredSocket,

    max_drain: usize,
}

/// Anchor source which never provides an anchor, used when running offline.
#[derive(Debug, Default)]
pub struct NoAnchor;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AnchorClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not recieve a message from the publisher: {0}")]
    RecvError(zmq::Error),

    #[error("Could not deserialize the anchor pose: {0}")]
    DeserializeError(serde_json::Error),

    #[error("The anchor pose contains non-finite values: {0:?}")]
    NonFinite(AnchorPose),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AnchorClient {
    /// Create a new instance of the anchor client.
    ///
    /// This function will not block until the publisher is available.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, AnchorClientError> {
        let socket_options = SocketOptions {
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.anchor_endpoint)
            .map_err(AnchorClientError::SocketError)?;

        Ok(Self {
            socket,
            max_drain: MAX_DRAIN_PER_CALL,
        })
    }

    /// Returns `true` if the client is connected to the publisher.
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Receive pending messages without blocking, returning the newest valid anchor pose.
    ///
    /// At most `MAX_DRAIN_PER_CALL` messages are read, anything beyond that is left for the next
    /// call. Invalid messages are logged and dropped.
    pub fn drain(&mut self) -> Result<Option<AnchorPose>, AnchorClientError> {
        let mut latest = None;

        for _ in 0..self.max_drain {
            let msg = match self.socket.recv_string(zmq::DONTWAIT) {
                Ok(Ok(s)) => s,
                Ok(Err(_)) => {
                    warn!("Non UTF-8 anchor message");
                    continue;
                }
                Err(zmq::Error::EAGAIN) => break,
                Err(e) => return Err(AnchorClientError::RecvError(e)),
            };

            match parse_anchor(&msg) {
                Ok(anchor) => {
                    info!(
                        "Anchor received: position {:?}, attitude {:?}",
                        anchor.position_m.as_slice(),
                        anchor.attitude_q.coords.as_slice()
                    );
                    latest = Some(anchor);
                }
                Err(e) => warn!("Rejected anchor message: {}", e),
            }
        }

        Ok(latest)
    }
}

impl AnchorSource for AnchorClient {
    fn latest(&mut self) -> Option<AnchorPose> {
        match self.drain() {
            Ok(a) => a,
            Err(e) => {
                warn!("AnchorClient error: {}", e);
                None
            }
        }
    }
}

impl AnchorSource for NoAnchor {
    fn latest(&mut self) -> Option<AnchorPose> {
        None
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse and validate one anchor message.
fn parse_anchor(msg: &str) -> Result<AnchorPose, AnchorClientError> {
    let anchor: AnchorPose =
        serde_json::from_str(msg).map_err(AnchorClientError::DeserializeError)?;

    if !anchor.is_finite() {
        return Err(AnchorClientError::NonFinite(anchor));
    }

    Ok(anchor)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{thread, time::Duration};

    #[test]
    fn test_parse_anchor() {
        let a = parse_anchor(r#"{"position_m": [1.0, -2.0, 0.5], "attitude_q": [0.0, 0.0, 0.0, 1.0]}"#)
            .unwrap();
        assert_eq!(a.position_m.x, 1.0);
        assert_eq!(a.position_m.y, -2.0);
        assert_eq!(a.attitude_q.w, 1.0);

        assert!(matches!(
            parse_anchor("not json"),
            Err(AnchorClientError::DeserializeError(_))
        ));
        assert!(matches!(
            parse_anchor(r#"{"position_m": [1.0, 2.0], "attitude_q": [0.0, 0.0, 0.0, 1.0]}"#),
            Err(AnchorClientError::DeserializeError(_))
        ));
    }

    #[test]
    fn test_non_finite_anchor_rejected() {
        // JSON has no literal for infinity, but an overflowing number parses to it
        let msg = r#"{"position_m": [1e400, 0.0, 0.0], "attitude_q": [0.0, 0.0, 0.0, 1.0]}"#;

        match parse_anchor(msg) {
            Err(AnchorClientError::NonFinite(_)) | Err(AnchorClientError::DeserializeError(_)) => (),
            other => panic!("Expected the anchor to be rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_drain_keeps_latest_valid() {
        let ctx = zmq::Context::new();
        let params = NetParams {
            odom_endpoint: "inproc://unused".into(),
            anchor_endpoint: "inproc://test_anchor_client".into(),
        };

        let publisher = ctx.socket(zmq::PUB).unwrap();
        publisher.set_linger(0).unwrap();
        publisher.bind(&params.anchor_endpoint).unwrap();

        let mut client = AnchorClient::new(&ctx, &params).unwrap();

        // Slow joiner, wait until a first message makes it through
        let first = r#"{"position_m": [0.0, 0.0, 0.0], "attitude_q": [0.0, 0.0, 0.0, 1.0]}"#;
        let mut joined = false;
        for _ in 0..50 {
            publisher.send(first, 0).unwrap();
            thread::sleep(Duration::from_millis(20));
            if client.drain().unwrap().is_some() {
                joined = true;
                break;
            }
        }
        assert!(joined);

        publisher
            .send(r#"{"position_m": [1.0, 0.0, 0.0], "attitude_q": [0.0, 0.0, 0.0, 1.0]}"#, 0)
            .unwrap();
        publisher
            .send(r#"{"position_m": [2.0, 0.0, 0.0], "attitude_q": [0.0, 0.0, 0.0, 1.0]}"#, 0)
            .unwrap();
        publisher.send("garbage", 0).unwrap();
        thread::sleep(Duration::from_millis(50));

        let latest = client.latest().unwrap();
        assert_eq!(latest.position_m.x, 2.0);

        // Nothing pending now
        assert!(client.latest().is_none());
    }

    #[test]
    fn test_drain_is_bounded() {
        let ctx = zmq::Context::new();
        let params = NetParams {
            odom_endpoint: "inproc://unused".into(),
            anchor_endpoint: "inproc://test_anchor_client_bounded".into(),
        };

        let publisher = ctx.socket(zmq::PUB).unwrap();
        publisher.set_linger(0).unwrap();
        publisher.bind(&params.anchor_endpoint).unwrap();

        let mut client = AnchorClient::new(&ctx, &params).unwrap();
        let anchor_msg = |x: f64| {
            format!(
                r#"{{"position_m": [{:.1}, 0.0, 0.0], "attitude_q": [0.0, 0.0, 0.0, 1.0]}}"#,
                x
            )
        };

        // Slow joiner
        let mut joined = false;
        for _ in 0..50 {
            publisher.send(&anchor_msg(0.0), 0).unwrap();
            thread::sleep(Duration::from_millis(20));
            if client.drain().unwrap().is_some() {
                joined = true;
                break;
            }
        }
        assert!(joined);

        client.max_drain = 5;
        for i in 1..=8 {
            publisher.send(&anchor_msg(i as f64), 0).unwrap();
        }
        thread::sleep(Duration::from_millis(50));

        // A flood is spread over several calls instead of stalling one
        assert_eq!(client.drain().unwrap().unwrap().position_m.x, 5.0);
        assert_eq!(client.drain().unwrap().unwrap().position_m.x, 8.0);
        assert!(client.drain().unwrap().is_none());
    }

    #[test]
    fn test_no_anchor() {
        assert!(NoAnchor.latest().is_none());
    }
}
