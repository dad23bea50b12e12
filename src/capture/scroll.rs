//! Page scrolling ahead of a full-page screenshot
//!
//! Lazy-loaded pages only render content that has been scrolled into view.
//! The routine scrolls to the bottom until the page height stops growing,
//! then sweeps back down from the top one viewport at a time.

use crate::browser::BrowserContext;
use crate::capture::ControlToken;
use std::time::Duration;
use tracing::debug;

const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";
const TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";
const TO_TOP_SCRIPT: &str = "window.scrollTo(0, 0)";

/// Tuning of the scroll routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSettings {
    pub max_iterations: u32,
    /// Longest wait for network quiescence after each scroll
    pub idle_timeout: Duration,
    /// Pause used instead when the network does not go quiet
    pub busy_pause: Duration,
    pub bounce_px: u32,
    pub bounce_pause: Duration,
    pub top_pause: Duration,
    pub sweep_step_px: u32,
    pub sweep_pause: Duration,
    pub final_pause: Duration,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            idle_timeout: Duration::from_millis(1500),
            busy_pause: Duration::from_secs(1),
            bounce_px: 500,
            bounce_pause: Duration::from_millis(500),
            top_pause: Duration::from_millis(500),
            sweep_step_px: 1080,
            sweep_pause: Duration::from_millis(200),
            final_pause: Duration::from_secs(1),
        }
    }
}

impl ScrollSettings {
    /// Default timings sweeping one viewport height per step
    pub fn for_viewport(max_iterations: u32, viewport_height: u32) -> Self {
        Self {
            max_iterations,
            sweep_step_px: viewport_height,
            ..Self::default()
        }
    }

    /// Same timings with all pauses removed
    pub fn instant(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            idle_timeout: Duration::ZERO,
            busy_pause: Duration::ZERO,
            bounce_pause: Duration::ZERO,
            top_pause: Duration::ZERO,
            sweep_pause: Duration::ZERO,
            final_pause: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// What the routine did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollReport {
    pub iterations: u32,
    pub final_height: u64,
    pub sweep_steps: u32,
}

async fn height(ctx: &mut dyn BrowserContext) -> Result<u64, crate::browser::BrowserError> {
    Ok(ctx.evaluate(HEIGHT_SCRIPT).await?.as_u64().unwrap_or(0))
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Scrolls the page so lazy content loads
///
/// Errors are logged and end the routine early; they never fail the capture.
pub async fn scroll_page(
    ctx: &mut dyn BrowserContext,
    settings: &ScrollSettings,
    control: &ControlToken,
) -> ScrollReport {
    let mut report = ScrollReport::default();

    if let Err(e) = scroll_inner(ctx, settings, control, &mut report).await {
        debug!("Scroll interrupted: {}", e);
    }

    report
}

async fn scroll_inner(
    ctx: &mut dyn BrowserContext,
    settings: &ScrollSettings,
    control: &ControlToken,
    report: &mut ScrollReport,
) -> Result<(), crate::browser::BrowserError> {
    let mut last_height = height(ctx).await?;

    for _ in 0..settings.max_iterations {
        if !control.proceed().await {
            return Ok(());
        }
        report.iterations += 1;

        ctx.evaluate(TO_BOTTOM_SCRIPT).await?;

        if ctx
            .wait_for_network_idle(settings.idle_timeout)
            .await
            .is_err()
        {
            pause(settings.busy_pause).await;
        }

        let new_height = height(ctx).await?;
        if new_height != last_height {
            last_height = new_height;
            continue;
        }

        ctx.evaluate(&format!("window.scrollBy(0, -{})", settings.bounce_px))
            .await?;
        pause(settings.bounce_pause).await;
        ctx.evaluate(TO_BOTTOM_SCRIPT).await?;

        let bounced_height = height(ctx).await?;
        if bounced_height == last_height {
            break;
        }
        last_height = bounced_height;
    }

    report.final_height = last_height;

    ctx.evaluate(TO_TOP_SCRIPT).await?;
    pause(settings.top_pause).await;

    let step = u64::from(settings.sweep_step_px.max(1));
    let mut y = 0u64;
    while y < last_height {
        if !control.proceed().await {
            return Ok(());
        }
        y += step;
        ctx.evaluate(&format!("window.scrollTo(0, {})", y)).await?;
        report.sweep_steps += 1;
        pause(settings.sweep_pause).await;
    }

    pause(settings.final_pause).await;
    Ok(())
}
