//! Presentation seam
//!
//! The controller describes what the visitor should see; a [`Renderer`]
//! decides how. A browser host would map these calls onto the DOM, the
//! terminal adaptor prints them.

use crate::types::{ConversationMessage, FieldError, HeaderLabels, QuickAction};

/// Receives every visible change of the widget
pub trait Renderer: Send {
    /// Append a message bubble
    fn render_message(&mut self, message: &ConversationMessage);

    /// Show or hide the typing indicator
    fn set_typing(&mut self, visible: bool);

    /// Show or hide the "transferring" indicator
    fn set_transfer(&mut self, visible: bool);

    /// Replace the quick-action menu
    fn show_quick_actions(&mut self, actions: &[QuickAction]);

    /// Remove the quick-action menu
    fn hide_quick_actions(&mut self);

    /// Update the header
    fn set_header(&mut self, labels: &HeaderLabels);

    /// Show the intake form
    fn show_intake_form(&mut self);

    /// Remove the intake form
    fn hide_intake_form(&mut self);

    /// Mark invalid form fields
    fn show_form_errors(&mut self, errors: &[FieldError]);
}
