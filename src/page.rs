//! Page controller – fixed viewport and settled navigation.

use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt as _;

use crate::config::{NavigationConfig, ViewportConfig};
use crate::error::PipelineError;
use crate::idle::LifecycleWatch;

/// Pin the rendering surface to exact CSS pixel dimensions and density,
/// independent of any physical display.
pub async fn set_viewport(page: &Page, viewport: &ViewportConfig) -> Result<(), PipelineError> {
    let params = SetDeviceMetricsOverrideParams::builder()
        .width(i64::from(viewport.width))
        .height(i64::from(viewport.height))
        .device_scale_factor(viewport.device_scale_factor)
        .mobile(false)
        .build()
        .map_err(PipelineError::Viewport)?;
    page.execute(params)
        .await
        .map_err(|e| PipelineError::Viewport(e.to_string()))?;
    log::debug!(
        "Viewport set to {}x{} @{}x",
        viewport.width,
        viewport.height,
        viewport.device_scale_factor
    );
    Ok(())
}

/// Navigate to `url` and block until `navigation.wait_until` holds for the
/// main frame.
pub async fn navigate(
    page: &Page,
    url: &str,
    navigation: &NavigationConfig,
) -> Result<(), PipelineError> {
    let nav_err = |reason: String| PipelineError::Navigation {
        url: url.to_string(),
        reason,
    };

    page.execute(SetLifecycleEventsEnabledParams::new(true))
        .await
        .map_err(|e| nav_err(e.to_string()))?;
    let frame = page
        .mainframe()
        .await
        .map_err(|e| nav_err(e.to_string()))?
        .map(|id| id.inner().clone());
    // Subscribe before navigating so no lifecycle event is missed.
    let mut events = page
        .event_listener::<EventLifecycleEvent>()
        .await
        .map_err(|e| nav_err(e.to_string()))?;

    let settle = async {
        page.goto(url).await.map_err(|e| nav_err(e.to_string()))?;
        let mut watch = LifecycleWatch::new(navigation.wait_until, frame);
        while let Some(event) = events.next().await {
            if watch.observe(event.frame_id.inner(), &event.name) {
                return Ok(());
            }
        }
        Err(nav_err("page closed before navigation settled".to_string()))
    };

    match navigation.timeout() {
        Some(limit) => tokio::time::timeout(limit, settle)
            .await
            .map_err(|_| PipelineError::NavigationTimeout {
                url: url.to_string(),
                limit,
            })?,
        None => settle.await,
    }?;

    log::info!(
        "Navigated to {url} ({})",
        navigation.wait_until.lifecycle_event()
    );
    Ok(())
}
