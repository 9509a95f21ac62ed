use eframe::egui::{self, Color32, RichText, Ui};

use crate::error::AnalysisError;

/// A modal message shown until the user acknowledges it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub is_error: bool,
}

impl Notice {
    pub fn error(err: &AnalysisError) -> Self {
        Notice {
            title: err.title().to_string(),
            message: err.to_string(),
            is_error: true,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice {
            title: title.into(),
            message: message.into(),
            is_error: false,
        }
    }
}

/// Draw the pending notice, if any, blocking the rest of the UI until it is
/// dismissed with OK or Escape.
pub fn show_notice(ctx: &egui::Context, notice: &mut Option<Notice>) {
    let Some(current) = notice.as_ref() else {
        return;
    };

    let mut dismissed = false;
    let response = egui::Modal::new(egui::Id::new("notice_window")).show(ctx, |ui: &mut Ui| {
        ui.set_min_width(320.0);
        ui.heading(current.title.as_str());
        ui.separator();

        let text = RichText::new(&current.message);
        let text = if current.is_error {
            text.color(Color32::RED)
        } else {
            text
        };
        ui.label(text);
        ui.add_space(8.0);
        ui.vertical_centered(|ui: &mut Ui| {
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });
    });

    if dismissed || response.should_close() {
        *notice = None;
    }
}

/// Queue `next` unless a notice is already waiting to be acknowledged.
///
/// The first message wins so an unread failure is never overwritten.
pub fn raise(slot: &mut Option<Notice>, next: Notice) {
    if slot.is_none() {
        *slot = Some(next);
    } else {
        log::warn!("Notice {:?} suppressed; another is still open", next.title);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_notice_carries_title_and_message() {
        let notice = Notice::error(&AnalysisError::MissingSelection("Group By"));
        assert!(notice.is_error);
        assert_eq!(notice.title, "Missing input");
        assert_eq!(notice.message, "Please select a value for \"Group By\".");
    }

    #[test]
    fn open_notice_is_not_replaced() {
        let mut slot = None;
        raise(&mut slot, Notice::error(&AnalysisError::NoFile));
        raise(&mut slot, Notice::info("Success", "Chart exported successfully!"));

        let shown = slot.unwrap();
        assert!(shown.is_error);
        assert_eq!(shown.message, "Please select a file first.");
    }

    #[test]
    fn info_notice_is_not_an_error() {
        let notice = Notice::info("Success", "Report exported successfully!");
        assert!(!notice.is_error);
        assert_eq!(notice.title, "Success");
    }
}
