use tokio_util::sync::CancellationToken;

use crate::pipeline::IngestionPipeline;
use crate::ports::{BrightnessActuator, CalibrationPersistence, LineSource};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Feed every line of `source` through the pipeline until cancelled or the
/// source ends.
///
/// Blank lines are skipped without counting as rejected readings. End of
/// stream and source errors both end the session; cancellation does not, the
/// canceller owns that transition.
pub async fn sensing_loop<A, P, S>(
    pipeline: IngestionPipeline<A, P>,
    mut source: S,
    cancel_token: CancellationToken,
) where
    A: BrightnessActuator,
    P: CalibrationPersistence,
    S: LineSource,
{
    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("sensing loop shutting down");
                break;
            }
            next = source.next_line() => match next {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Err(err) = pipeline.handle_line(line).await {
                        log_debug!("reading dropped: {err}");
                    }
                }
                Ok(None) => {
                    log_info!("sensor stream ended");
                    pipeline
                        .mark_disconnected(Some("sensor stream ended".to_string()))
                        .await;
                    break;
                }
                Err(err) => {
                    log_error!("sensor stream failed: {err:#}");
                    pipeline
                        .mark_disconnected(Some(format!("sensor stream failed: {err:#}")))
                        .await;
                    break;
                }
            }
        }
    }
}
