//! User-facing notices
//!
//! Fatal precondition failures and empty results must be acknowledged by the
//! operator, so a half-finished run is never mistaken for a complete one.

use headless_chrome::Tab;
use std::sync::Arc;

/// Something the operator has to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The run was started on the wrong screen
    WrongScreen { expected: String },
    /// A required control is missing from the page
    MissingControl { what: String },
    /// The traversal finished without a single record
    NoData,
    /// The traversal was stopped before finishing; nothing was exported
    Cancelled { records: usize },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::WrongScreen { expected } => {
                format!("Wrong screen: switch to the '{}' pane before starting the run.", expected)
            }
            Notice::MissingControl { what } => format!("The page is missing {}; nothing was extracted.", what),
            Notice::NoData => "No records were extracted. Check that the grid rendered correctly.".to_string(),
            Notice::Cancelled { records } => {
                format!("Run cancelled after {} record(s); nothing was exported.", records)
            }
        }
    }

    /// Whether the notice reports a failure rather than an outcome
    pub fn is_error(&self) -> bool {
        matches!(self, Notice::WrongScreen { .. } | Notice::MissingControl { .. })
    }
}

/// Surfaces notices to the operator
pub trait Notifier {
    fn notify(&self, notice: &Notice);
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, notice: &Notice) {
        (**self).notify(notice)
    }
}

/// Writes notices to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        if notice.is_error() {
            log::error!("{}", notice.message());
        } else {
            log::warn!("{}", notice.message());
        }
    }
}

/// Logs the notice and raises an `alert()` in the page the operator is watching
pub struct PageAlertNotifier {
    tab: Arc<Tab>,
}

impl PageAlertNotifier {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }
}

/// The alert is scheduled so the CDP call returns before the dialog blocks the page
fn alert_script(message: &str) -> String {
    let literal = serde_json::to_string(message).unwrap_or_else(|_| "\"\"".to_string());
    format!("setTimeout(function () {{ alert({}); }}, 0)", literal)
}

impl Notifier for PageAlertNotifier {
    fn notify(&self, notice: &Notice) {
        LogNotifier.notify(notice);
        if let Err(e) = self.tab.evaluate(&alert_script(&notice.message()), false) {
            log::debug!("Failed to raise page alert: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_screen_message_names_pane() {
        let notice = Notice::WrongScreen { expected: "CommunityCase".to_string() };
        assert!(notice.message().contains("CommunityCase"));
        assert!(notice.is_error());
    }

    #[test]
    fn test_no_data_is_not_an_error() {
        assert!(!Notice::NoData.is_error());
        assert!(!Notice::Cancelled { records: 3 }.is_error());
        assert!(Notice::Cancelled { records: 3 }.message().contains('3'));
    }

    #[test]
    fn test_alert_script_escapes_message() {
        let script = alert_script("it's \"quoted\"");
        assert_eq!(script, r#"setTimeout(function () { alert("it's \"quoted\""); }, 0)"#);
    }
}
