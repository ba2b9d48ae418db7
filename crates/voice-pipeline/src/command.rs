//! Interpreted voice commands and the confidence gate.

use kitchen_core::{OrderStatus, ScreenView};
use serde::{Deserialize, Serialize};

/// Commands below this confidence are never dispatched.
pub const MIN_CONFIDENCE: f64 = 0.7;

/// Actions the interpreter may return.
pub const ALLOWED_ACTIONS: [&str; 4] = ["change_status", "show_all_day", "show_recently_completed", "list_orders"];

/// Raw interpreter output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretedCommand {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

impl InterpretedCommand {
    pub fn new(action: impl Into<String>, confidence: f64) -> Self {
        Self {
            action: action.into(),
            order_number: None,
            status: None,
            confidence,
        }
    }

    /// A `change_status` command.
    pub fn change_status(order_number: u32, status: impl Into<String>, confidence: f64) -> Self {
        Self {
            action: "change_status".to_string(),
            order_number: Some(order_number),
            status: Some(status.into()),
            confidence,
        }
    }
}

/// A command that passed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    ChangeStatus { order_number: u32, status: OrderStatus },
    ShowView(ScreenView),
    ListOrders,
}

/// Why the gate refused a command.
#[derive(Debug, Clone, PartialEq)]
pub enum GateRejection {
    /// Confidence below [`MIN_CONFIDENCE`].
    LowConfidence(f64),
    /// The action is not on the allow-list.
    Disallowed(String),
    /// An allowed action with missing or unusable arguments.
    Incomplete(String),
}

impl GateRejection {
    /// What the screen says back.
    pub fn reply(&self) -> String {
        match self {
            Self::LowConfidence(_) => "Sorry, I'm not sure what you meant. Please try again.".to_string(),
            Self::Disallowed(_) => "Sorry, I can only update order status, show all day, \
                                    show recently completed orders, or list orders."
                .to_string(),
            Self::Incomplete(reason) => format!("Sorry, {}.", reason),
        }
    }
}

/// Apply the confidence gate and the allow-list.
///
/// Confidence is checked first, so a low-confidence command never reaches
/// dispatch whatever its action.
pub fn gate(command: &InterpretedCommand) -> Result<VoiceCommand, GateRejection> {
    if !command.confidence.is_finite() || command.confidence < MIN_CONFIDENCE {
        return Err(GateRejection::LowConfidence(command.confidence));
    }

    match command.action.as_str() {
        "change_status" => {
            let order_number = command
                .order_number
                .ok_or_else(|| GateRejection::Incomplete("I didn't catch the order number".to_string()))?;
            let status = command
                .status
                .as_deref()
                .ok_or_else(|| GateRejection::Incomplete("I didn't catch the new status".to_string()))?
                .parse::<OrderStatus>()
                .map_err(|_| GateRejection::Incomplete("that isn't a status I know".to_string()))?;
            Ok(VoiceCommand::ChangeStatus { order_number, status })
        }
        "show_all_day" => Ok(VoiceCommand::ShowView(ScreenView::AllDay)),
        "show_recently_completed" => Ok(VoiceCommand::ShowView(ScreenView::RecentlyCompleted)),
        "list_orders" => Ok(VoiceCommand::ListOrders),
        other => Err(GateRejection::Disallowed(other.to_string())),
    }
}

/// Past-tense phrase for a status change ("marked ready").
pub fn status_phrase(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "set to pending",
        OrderStatus::Preparing => "accepted",
        OrderStatus::Ready => "marked ready",
        OrderStatus::Completed => "completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_confidence_never_passes() {
        for confidence in [0.0, 0.5, 0.69, f64::NAN] {
            let cmd = InterpretedCommand::change_status(1, "ready", confidence);
            assert!(matches!(gate(&cmd), Err(GateRejection::LowConfidence(_))));
        }
        assert!(gate(&InterpretedCommand::change_status(1, "ready", 0.7)).is_ok());
    }

    #[test]
    fn test_allow_list() {
        assert_eq!(
            gate(&InterpretedCommand::new("show_all_day", 0.9)),
            Ok(VoiceCommand::ShowView(ScreenView::AllDay))
        );
        assert_eq!(gate(&InterpretedCommand::new("list_orders", 0.9)), Ok(VoiceCommand::ListOrders));
        assert_eq!(
            gate(&InterpretedCommand::new("delete_order", 0.99)),
            Err(GateRejection::Disallowed("delete_order".to_string()))
        );
        for action in ALLOWED_ACTIONS {
            assert!(!matches!(
                gate(&InterpretedCommand::new(action, 0.9)),
                Err(GateRejection::Disallowed(_))
            ));
        }
    }

    #[test]
    fn test_change_status_arguments() {
        assert_eq!(
            gate(&InterpretedCommand::change_status(3, "Ready", 0.8)),
            Ok(VoiceCommand::ChangeStatus {
                order_number: 3,
                status: OrderStatus::Ready
            })
        );
        assert!(matches!(
            gate(&InterpretedCommand::new("change_status", 0.8)),
            Err(GateRejection::Incomplete(_))
        ));
        assert!(matches!(
            gate(&InterpretedCommand::change_status(3, "burnt", 0.8)),
            Err(GateRejection::Incomplete(_))
        ));
    }

    #[test]
    fn test_parse_interpreter_output() {
        let cmd: InterpretedCommand =
            serde_json::from_str(r#"{"action":"change_status","orderNumber":2,"status":"ready","confidence":0.92}"#)
                .unwrap();
        assert_eq!(cmd, InterpretedCommand::change_status(2, "ready", 0.92));
    }
}
