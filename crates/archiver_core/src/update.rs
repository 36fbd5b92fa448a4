use crate::{ConversionResultKind, ProgressMsg, RunState, Stage};

/// Pure update function: folds one progress message into the run state.
pub fn update(mut state: RunState, msg: ProgressMsg) -> RunState {
    match msg {
        ProgressMsg::CatalogReady { lessons, chapters } => {
            state.lessons_total = lessons;
            state.chapters_total = chapters;
        }
        ProgressMsg::LessonStarted { index, ordinal } => {
            // Indices are 0-based; started count never goes backwards.
            state.lessons_started = state.lessons_started.max(index + 1);
            state.set_current(ordinal, Stage::Queued);
        }
        ProgressMsg::StageChanged { ordinal, stage } => {
            state.set_current(ordinal, stage);
        }
        ProgressMsg::HtmlWritten { ordinal } => {
            state.html_written += 1;
            state.set_current(ordinal, Stage::WritingHtml);
        }
        ProgressMsg::FetchFailed { ordinal } => {
            state.fetch_failures += 1;
            state.record_failure(ordinal, None);
        }
        ProgressMsg::SanitizeFailed { ordinal, kept_raw } => {
            if kept_raw {
                state.sanitize_fallbacks += 1;
            } else {
                state.sanitize_skips += 1;
                state.record_failure(ordinal, None);
            }
        }
        ProgressMsg::ConversionDone {
            ordinal,
            format,
            result,
        } => match result {
            ConversionResultKind::Success => state.conversions_succeeded += 1,
            ConversionResultKind::SuccessWithDiagnostic => {
                state.conversions_succeeded += 1;
                state.benign_diagnostics += 1;
            }
            ConversionResultKind::Failed => {
                state.conversions_failed += 1;
                state.record_failure(ordinal, Some(format));
            }
            ConversionResultKind::Cancelled => state.conversions_cancelled += 1,
        },
        ProgressMsg::Cancelled => {
            state.cancelled = true;
        }
    }

    state
}
