use serde::{Deserialize, Serialize};

use benor_common::{ConsensusError, NodeId, Phase, PhaseMessage, Value};

/// Body of `POST /message`: `{"senderId": 2, "value": {"phase": 1, "k": 3, "x": 0}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub sender_id: usize,
    pub value: MessageValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageValue {
    pub phase: Phase,
    pub k: u32,
    pub x: Value,
}

impl MessageRequest {
    /// Validates an untrusted JSON body into a phase message for a cluster of
    /// `n` participants.
    pub fn parse(body: serde_json::Value, n: usize) -> Result<PhaseMessage, ConsensusError> {
        let request: MessageRequest = serde_json::from_value(body)
            .map_err(|e| ConsensusError::InvalidMessage(e.to_string()))?;
        request.into_phase_message(n)
    }

    pub fn into_phase_message(self, n: usize) -> Result<PhaseMessage, ConsensusError> {
        if self.sender_id >= n {
            return Err(ConsensusError::InvalidMessage(format!(
                "sender {} outside of 0..{}",
                self.sender_id, n
            )));
        }
        Ok(PhaseMessage {
            sender: NodeId(self.sender_id),
            phase: self.value.phase,
            k: self.value.k,
            x: self.value.x,
        })
    }
}

impl From<PhaseMessage> for MessageRequest {
    fn from(msg: PhaseMessage) -> Self {
        Self {
            sender_id: msg.sender.0,
            value: MessageValue {
                phase: msg.phase,
                k: msg.k,
                x: msg.x,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_body() {
        let body = json!({ "senderId": 2, "value": { "phase": 2, "k": 5, "x": 1 } });
        let msg = MessageRequest::parse(body, 4).unwrap();
        assert_eq!(
            msg,
            PhaseMessage { sender: NodeId(2), phase: Phase::Confirm, k: 5, x: Value::One }
        );
    }

    #[test]
    fn serializes_with_camel_case_sender() {
        let msg = PhaseMessage { sender: NodeId(1), phase: Phase::Propose, k: 1, x: Value::Zero };
        let json = serde_json::to_value(MessageRequest::from(msg)).unwrap();
        assert_eq!(json, json!({ "senderId": 1, "value": { "phase": 1, "k": 1, "x": 0 } }));
    }

    #[test]
    fn rejects_malformed_payloads() {
        let cases = [
            json!({ "senderId": 0, "value": { "phase": 3, "k": 1, "x": 0 } }),
            json!({ "senderId": 0, "value": { "phase": 1, "k": 1, "x": 7 } }),
            json!({ "senderId": 0, "value": { "phase": 1, "x": 0 } }),
            json!({ "senderId": 9, "value": { "phase": 1, "k": 1, "x": 0 } }),
            json!({ "value": { "phase": 1, "k": 1, "x": 0 } }),
            json!("hello"),
        ];
        for body in cases {
            assert!(
                matches!(MessageRequest::parse(body.clone(), 4), Err(ConsensusError::InvalidMessage(_))),
                "accepted {body}"
            );
        }
    }
}
