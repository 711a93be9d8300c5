use std::sync::Arc;

use shared::domain::{Mode, ResultsState, Route};
use tracing::{debug, info};

use crate::{
    notification::{NotificationKind, Notifier},
    submission::{EmotionReport, SubmissionResult},
};

/// Navigation capability provided by the host UI.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator for hosts without a results view.
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: Route) {
        info!(path = route.path(), "navigation requested without a host view");
    }
}

#[derive(Clone)]
pub struct ResultRouter {
    navigator: Arc<dyn Navigator>,
    notifier: Notifier,
}

impl ResultRouter {
    pub fn new(navigator: Arc<dyn Navigator>, notifier: Notifier) -> Self {
        Self {
            navigator,
            notifier,
        }
    }

    /// Text successes navigate to the results view; face and speech only notify.
    pub fn route(&self, mode: Mode, result: &SubmissionResult) {
        match result {
            Ok(report) => {
                self.notifier
                    .emit(NotificationKind::SubmissionSucceeded, success_message(mode));
                if let EmotionReport::Text(response) = report {
                    info!(%mode, emotion = %response.emotion, "routing to results");
                    self.navigator.navigate(Route::Results(ResultsState {
                        emotion: response.emotion.clone(),
                        recommendations: response.recommendations.clone(),
                    }));
                }
            }
            Err(err) => {
                debug!(%mode, error = %err, "routing submission failure");
                self.notifier
                    .emit(NotificationKind::SubmissionFailed, failure_message(mode));
            }
        }
    }
}

pub fn success_message(mode: Mode) -> &'static str {
    match mode {
        Mode::Text => "Text processed successfully!",
        Mode::Face => "Image captured and processed successfully!",
        Mode::Speech => "Audio processed successfully!",
    }
}

pub fn failure_message(mode: Mode) -> &'static str {
    match mode {
        Mode::Text => "Failed to process the text. Please try again.",
        Mode::Face => "Failed to process the image. Please try again.",
        Mode::Speech => "Failed to process the audio. Please try again.",
    }
}
