/// Live page transcript extraction
///
/// Reads the transcript panel of an already rendered watch page through a
/// `PageAutomation` capability. The caller owns the page; this source only
/// polls for segment elements, opens the panel and steers the language menu.
use super::{AcquisitionContext, AcquisitionResult, TranscriptSource};
use crate::config::DomConfig;
use crate::error::{Result, TranscriptError};
use crate::parsers::clean_caption_text;
use crate::transcript::{Segment, Transcript};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Opaque reference to an element on the live page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// An element and its rendered text
#[derive(Debug, Clone, PartialEq)]
pub struct PageElement {
    pub handle: ElementHandle,
    pub text: String,
}

/// What the DOM source needs from a live page
#[async_trait]
pub trait PageAutomation: Send + Sync {
    /// Elements matching `selector`, searched under `scope` or the whole page
    async fn find_elements(&self, scope: Option<&ElementHandle>, selector: &str) -> Result<Vec<PageElement>>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    /// Wait until `selector` matches something. `Ok(false)` on timeout.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool>;
}

/// Parse `M:SS` or `H:MM:SS` into seconds
pub fn parse_clock(value: &str) -> Option<f64> {
    let parts: Vec<u64> = value
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let seconds = parts
        .iter()
        .try_fold(0u64, |total, part| total.checked_mul(60)?.checked_add(*part))?;
    Some(seconds as f64)
}

/// Pick the first preferred language, exact or prefix match before substring
pub fn pick_language<'a>(items: &'a [PageElement], preferred: &[String]) -> Option<&'a PageElement> {
    preferred.iter().find_map(|want| {
        items
            .iter()
            .find(|item| item.text.trim().starts_with(want.as_str()))
            .or_else(|| items.iter().find(|item| item.text.contains(want.as_str())))
    })
}

pub struct DomSource {
    config: DomConfig,
}

impl DomSource {
    pub fn new(config: DomConfig) -> Self {
        Self { config }
    }

    async fn find(&self, page: &dyn PageAutomation, scope: Option<&ElementHandle>, selector: &str) -> Vec<PageElement> {
        match page.find_elements(scope, selector).await {
            Ok(elements) => elements,
            Err(e) => {
                debug!("Element lookup for '{}' failed: {}", selector, e);
                Vec::new()
            }
        }
    }

    async fn open_panel(&self, page: &dyn PageAutomation) {
        let selectors = &self.config.selectors;
        if !self.find(page, None, &selectors.panel).await.is_empty() {
            return;
        }
        if let Some(button) = self.find(page, None, &selectors.show_transcript_button).await.first() {
            debug!("Opening transcript panel");
            if let Err(e) = page.click(&button.handle).await {
                debug!("Show transcript click failed: {}", e);
            }
        }
    }

    /// Switch the panel to the preferred language. Returns whether a switch happened.
    async fn steer_language(&self, page: &dyn PageAutomation) -> Result<bool> {
        let selectors = &self.config.selectors;
        let wait = Duration::from_millis(self.config.ui_wait_timeout_ms);

        self.open_panel(page).await;

        let Some(dropdown) = self.find(page, None, &selectors.language_dropdown).await.into_iter().next() else {
            debug!("No language dropdown in transcript panel");
            return Ok(false);
        };
        page.click(&dropdown.handle).await?;

        if !page.wait_for(&selectors.language_menu_item, wait).await? {
            debug!("Language menu did not open");
            return Ok(false);
        }

        let items = self.find(page, None, &selectors.language_menu_item).await;
        let Some(choice) = pick_language(&items, &self.config.preferred_languages) else {
            debug!("No preferred language among {} menu entries", items.len());
            return Ok(false);
        };

        info!("🌐 Switching transcript language to '{}'", choice.text.trim());
        page.click(&choice.handle).await?;
        page.wait_for(&selectors.segment, wait).await?;
        Ok(true)
    }

    async fn read_segments(&self, page: &dyn PageAutomation, elements: &[PageElement]) -> Transcript {
        let selectors = &self.config.selectors;
        let nominal = self.config.nominal_segment_duration;
        let mut segments = Vec::with_capacity(elements.len());

        for (index, element) in elements.iter().enumerate() {
            let text = match self.find(page, Some(&element.handle), &selectors.segment_text).await.first() {
                Some(inner) => inner.text.clone(),
                None => element.text.clone(),
            };
            let start = self
                .find(page, Some(&element.handle), &selectors.segment_timestamp)
                .await
                .first()
                .and_then(|ts| parse_clock(&ts.text))
                .unwrap_or(index as f64 * nominal);

            if let Some(segment) = Segment::new(clean_caption_text(&text), start, nominal) {
                segments.push(segment);
            }
        }

        segments
    }

    async fn extract(&self, page: &dyn PageAutomation) -> Result<Transcript> {
        let selectors = &self.config.selectors;
        let max_polls = self.config.max_poll_attempts;
        let mut steered = false;

        for poll in 1..=max_polls {
            let mut elements = self.find(page, None, &selectors.segment).await;

            if elements.is_empty() {
                debug!("Poll {}/{}: no transcript segments yet", poll, max_polls);
                self.open_panel(page).await;
            } else {
                if !steered {
                    steered = true;
                    match self.steer_language(page).await {
                        Ok(true) => elements = self.find(page, None, &selectors.segment).await,
                        Ok(false) => {}
                        Err(e) => warn!("Language selection failed: {}", e),
                    }
                }

                let segments = self.read_segments(page, &elements).await;
                if !segments.is_empty() {
                    return Ok(segments);
                }
            }

            if poll < max_polls && self.config.poll_interval_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
            }
        }

        Err(TranscriptError::SourceUnavailable(format!(
            "no transcript segments after {} polls",
            max_polls
        )))
    }
}

#[async_trait]
impl TranscriptSource for DomSource {
    fn name(&self) -> &str {
        "dom"
    }

    async fn acquire(&self, ctx: &AcquisitionContext<'_>) -> AcquisitionResult {
        let Some(page) = ctx.page else {
            return AcquisitionResult::Failed("no live page context".to_string());
        };

        let result = self.extract(page).await;
        match &result {
            Ok(segments) => info!("🖥️  Read {} segments from the live page", segments.len()),
            Err(e) => warn!("Live page extraction failed: {}", e),
        }
        AcquisitionResult::from_result(result)
    }
}
