//! 信封编解码
//!
//! 线上格式为 UTF-8 JSON：`{"Action": "<NAME>", "Data": <payload|null>}`。
//! Action 严格解析，负载按 Action 选择变体；负载内的枚举字段宽松解析。

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ProtocolError, Result};
use crate::message::{
    Action, DestinationSet, Message, MoveOrder, Payload, PieceSet, SetupChoice, StatusReport,
};
use crate::piece::{Category, Color, Coordinate, LenientEnum, PieceSnapshot};

const ACTION_FIELD: &str = "Action";
const DATA_FIELD: &str = "Data";

/// 解码方角色，决定哪些 Action 的负载需要还原
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// 客户端：还原服务端回复
    Client,
    /// 服务端：还原客户端请求
    Server,
}

#[derive(Serialize)]
struct OutgoingEnvelope<'a> {
    #[serde(rename = "Action")]
    action: Action,
    #[serde(rename = "Data")]
    data: Option<&'a Payload>,
}

/// 编码消息信封
pub fn encode(message: &Message) -> Result<Vec<u8>> {
    let envelope = OutgoingEnvelope {
        action: message.action,
        data: message.payload.as_ref(),
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// 以客户端角色解码
pub fn decode(bytes: &[u8]) -> Result<Message> {
    decode_with(bytes, Role::Client)
}

/// 按指定角色解码
///
/// 判别字段缺失或无法识别时返回 `MalformedEnvelope`；
/// 负载结构不符只降级为空负载。
pub fn decode_with(bytes: &[u8], role: Role) -> Result<Message> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ProtocolError::malformed(format!("body is not UTF-8: {}", e)))?;
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ProtocolError::malformed(format!("body is not JSON: {}", e)))?;
    let Value::Object(mut object) = value else {
        return Err(ProtocolError::malformed("envelope is not a JSON object"));
    };

    let action = match object.get(ACTION_FIELD) {
        Some(Value::String(token)) => token.parse::<Action>().map_err(ProtocolError::malformed)?,
        Some(other) => {
            return Err(ProtocolError::malformed(format!(
                "`{}` is not a string: {}",
                ACTION_FIELD, other
            )))
        }
        None => {
            return Err(ProtocolError::malformed(format!(
                "missing `{}` field",
                ACTION_FIELD
            )))
        }
    };

    let data = object.remove(DATA_FIELD).unwrap_or(Value::Null);
    let payload = match resolve_payload(role, action, data) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Dropping payload: {}", e);
            None
        }
    };

    Ok(Message { action, payload })
}

/// 按 Action 还原负载变体
///
/// 未列出的 Action 一律没有负载。新增带负载的 Action 时必须在这里加分支。
pub fn resolve_payload(role: Role, action: Action, data: Value) -> Result<Option<Payload>> {
    let payload = match (role, action) {
        (Role::Client, Action::GameStarted) => Payload::PieceSet(resolve_piece_set(action, &data)?),
        (Role::Client, Action::GameStatus) => {
            Payload::StatusReport(resolve_struct::<StatusReport>(action, data)?)
        }
        (Role::Client, Action::PieceDestinations)
        | (Role::Server, Action::GetPieceDestinations) => {
            Payload::DestinationSet(resolve_struct::<DestinationSet>(action, data)?)
        }
        (Role::Server, Action::SetupCompleted) => {
            Payload::SetupChoice(resolve_struct::<SetupChoice>(action, data)?)
        }
        (Role::Server, Action::MoveCompleted) => {
            Payload::MoveOrder(resolve_struct::<MoveOrder>(action, data)?)
        }
        _ => return Ok(None),
    };
    Ok(Some(payload))
}

fn unresolved(action: Action, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::UnresolvedPayload {
        action,
        reason: reason.into(),
    }
}

fn resolve_struct<T: DeserializeOwned>(action: Action, data: Value) -> Result<T> {
    if data.is_null() {
        return Err(unresolved(action, "data is null"));
    }
    serde_json::from_value(data).map_err(|e| unresolved(action, e.to_string()))
}

fn resolve_piece_set(action: Action, data: &Value) -> Result<PieceSet> {
    let entries = data
        .get("Pieces")
        .and_then(Value::as_array)
        .ok_or_else(|| unresolved(action, "missing `Pieces` list"))?;

    let pieces = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let piece = entry
                .as_object()
                .ok_or_else(|| unresolved(action, format!("piece {} is not an object", index)))?;
            resolve_piece(action, index, piece)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PieceSet { pieces })
}

fn resolve_piece(
    action: Action,
    index: usize,
    piece: &Map<String, Value>,
) -> Result<PieceSnapshot> {
    let position = piece
        .get("Position")
        .cloned()
        .ok_or_else(|| unresolved(action, format!("piece {} has no `Position`", index)))
        .and_then(|v| {
            serde_json::from_value::<Coordinate>(v)
                .map_err(|e| unresolved(action, format!("piece {} position: {}", index, e)))
        })?;

    // 单个棋子的阵营或类型无法识别时回退到零值，不影响整条消息
    let color = Color::parse_or_zero(&token(piece.get("Color")));
    let category = Category::parse_or_zero(&token(piece.get("Category")));

    Ok(PieceSnapshot {
        position,
        color,
        category,
    })
}

fn token(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip(message: Message, role: Role) {
        let bytes = encode(&message).unwrap();
        let decoded = decode_with(&bytes, role).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_round_trip_piece_set() {
        let pieces = vec![
            PieceSnapshot::new(Coordinate::new(4, 1), Color::Red, Category::General),
            PieceSnapshot::new(Coordinate::new(0, 9), Color::Blue, Category::Chariot),
        ];
        round_trip(
            Message::with_payload(Action::GameStarted, Payload::PieceSet(PieceSet { pieces })),
            Role::Client,
        );
    }

    #[test]
    fn test_round_trip_status_report() {
        let report = StatusReport {
            game_state: "UNFINISHED".to_string(),
            player_turn: "RED".to_string(),
            is_checked: true,
        };
        round_trip(
            Message::with_payload(Action::GameStatus, Payload::StatusReport(report)),
            Role::Client,
        );
    }

    #[test]
    fn test_round_trip_destination_set() {
        let set = DestinationSet {
            source: Coordinate::new(1, 2),
            destinations: Some(vec![Coordinate::new(1, 3), Coordinate::new(2, 2)]),
        };
        round_trip(
            Message::with_payload(Action::PieceDestinations, Payload::DestinationSet(set.clone())),
            Role::Client,
        );
        let request = DestinationSet {
            destinations: None,
            ..set
        };
        round_trip(
            Message::with_payload(Action::GetPieceDestinations, Payload::DestinationSet(request)),
            Role::Server,
        );
    }

    #[test]
    fn test_round_trip_request_payloads() {
        let choice = SetupChoice {
            blue_left_swap: true,
            red_right_swap: true,
            ..Default::default()
        };
        round_trip(
            Message::with_payload(Action::SetupCompleted, Payload::SetupChoice(choice)),
            Role::Server,
        );

        let order = MoveOrder {
            source: Coordinate::new(0, 6),
            destination: Coordinate::new(0, 5),
        };
        round_trip(
            Message::with_payload(Action::MoveCompleted, Payload::MoveOrder(order)),
            Role::Server,
        );
    }

    #[test]
    fn test_round_trip_bare_message() {
        round_trip(Message::bare(Action::NewGame), Role::Client);
        round_trip(Message::bare(Action::MoveConfirmed), Role::Client);
        round_trip(Message::bare(Action::GetGameStatus), Role::Server);
    }

    #[test]
    fn test_wire_format() {
        let message = Message::with_payload(
            Action::MoveCompleted,
            Payload::MoveOrder(MoveOrder {
                source: Coordinate::new(1, 2),
                destination: Coordinate::new(3, 4),
            }),
        );
        let value: Value = serde_json::from_slice(&encode(&message).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"Action": "MOVE_COMPLETED", "Data": {"Source": [1, 2], "Destination": [3, 4]}})
        );

        let bytes = encode(&Message::bare(Action::NewGame)).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"Action": "NEW_GAME", "Data": null}));
    }

    #[test]
    fn test_piece_set_keeps_count_and_order() {
        let pieces: Vec<Value> = (0..9)
            .map(|x| json!({"Position": [x, 3], "Color": "RED", "Category": "SOLDIER"}))
            .collect();
        let body = json!({"Action": "GAME_STARTED", "Data": {"Pieces": pieces}});
        let message = decode(body.to_string().as_bytes()).unwrap();

        let Some(Payload::PieceSet(set)) = message.payload else {
            panic!("Expected piece set");
        };
        assert_eq!(set.pieces.len(), 9);
        for (x, piece) in set.pieces.iter().enumerate() {
            assert_eq!(piece.position, Coordinate::new(x as i32, 3));
        }
    }

    #[test]
    fn test_unknown_piece_tokens_fall_back_to_zero_value() {
        let body = json!({
            "Action": "GAME_STARTED",
            "Data": {"Pieces": [
                {"Position": [4, 1], "Color": "PURPLE", "Category": "DRAGON"},
                {"Position": [0, 0], "Color": "RED", "Category": "CHARIOT"},
            ]}
        });
        let message = decode(body.to_string().as_bytes()).unwrap();

        let Some(Payload::PieceSet(set)) = message.payload else {
            panic!("Expected piece set");
        };
        assert_eq!(set.pieces[0].color, Color::Blue);
        assert_eq!(set.pieces[0].category, Category::General);
        assert_eq!(set.pieces[1].color, Color::Red);
        assert_eq!(set.pieces[1].category, Category::Chariot);
    }

    #[test]
    fn test_unknown_action_is_malformed() {
        let body = json!({"Action": "BOGUS", "Data": null});
        let err = decode(body.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedEnvelope { .. }));
    }

    #[test]
    fn test_missing_action_is_malformed() {
        let err = decode(br#"{"Data": null}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedEnvelope { .. }));

        let err = decode(br#"{"Action": 3, "Data": null}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedEnvelope { .. }));

        let err = decode(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedEnvelope { .. }));

        let err = decode(b"[1, 2]").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedEnvelope { .. }));
    }

    #[test]
    fn test_unexpected_payload_shape_degrades_to_none() {
        let body = json!({"Action": "GAME_STATUS", "Data": {"Unexpected": 1}});
        let message = decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(message.action, Action::GameStatus);
        assert_eq!(message.payload, None);

        let body = json!({"Action": "GAME_STARTED", "Data": null});
        let message = decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(message.payload, None);

        let body = json!({"Action": "GAME_STARTED", "Data": {"Pieces": [{"Position": [1]}]}});
        let message = decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(message.payload, None);
    }

    #[test]
    fn test_unresolved_actions_reach_none() {
        // 客户端不还原自己发出的请求负载
        let body = json!({
            "Action": "MOVE_COMPLETED",
            "Data": {"Source": [1, 2], "Destination": [3, 4]}
        });
        let message = decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(message.payload, None);

        for action in Action::ALL {
            if matches!(
                action,
                Action::GameStarted | Action::GameStatus | Action::PieceDestinations
            ) {
                continue;
            }
            let body = json!({"Action": action.name(), "Data": {"Anything": true}});
            let message = decode(body.to_string().as_bytes()).unwrap();
            assert_eq!(message.action, action);
            assert_eq!(message.payload, None, "{} should carry no payload", action);
        }
    }

    #[test]
    fn test_missing_data_field_is_null() {
        let message = decode(br#"{"Action": "MOVE_CONFIRMED"}"#).unwrap();
        assert_eq!(message, Message::bare(Action::MoveConfirmed));
    }

    #[test]
    fn test_resolve_payload_errors_are_unresolved() {
        let err = resolve_payload(Role::Client, Action::GameStatus, json!("nope")).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnresolvedPayload {
                action: Action::GameStatus,
                ..
            }
        ));
    }
}
