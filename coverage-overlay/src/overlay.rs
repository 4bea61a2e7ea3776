// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::OverlayError;
use crate::memo::CoverageMemo;
use crate::page::{LineColor, PageAdapter, PageTarget};

pub const TOGGLE_KEY: char = 'c';

pub const FAILURE_TOOLTIP: &str = "Error retrieving coverage information for this file";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OverlayState {
    Disabled,
    Enabled,

    /// Coverage could not be shown. The toggle stays off until the page is
    /// rebuilt.
    Failed { tooltip: String },
}

/// Coverage highlighting for one page, switched on and off by a toggle.
pub struct Overlay<P> {
    page: P,
    memo: Arc<CoverageMemo>,
    state: OverlayState,
    target: Option<PageTarget>,
    styled: BTreeSet<u32>,
}

impl<P: PageAdapter> Overlay<P> {
    pub fn new(page: P, memo: Arc<CoverageMemo>) -> Self {
        Self {
            page,
            memo,
            state: OverlayState::Disabled,
            target: None,
            styled: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn into_page(self) -> P {
        self.page
    }

    async fn target(&mut self) -> Result<PageTarget, OverlayError> {
        if let Some(target) = &self.target {
            return Ok(target.clone());
        }

        let target = self.page.resolve().await?;
        self.target = Some(target.clone());
        Ok(target)
    }

    /// Resolve the page and start fetching its coverage before the first
    /// toggle.
    pub async fn preload(&mut self) -> Result<(), OverlayError> {
        let target = self.target().await?;
        self.memo.preload(&target.revision, &target.path);
        Ok(())
    }

    /// Flip the overlay. Once failed, toggling does nothing.
    pub async fn toggle(&mut self) -> Result<(), OverlayError> {
        match self.state {
            OverlayState::Disabled => self.enable().await,
            OverlayState::Enabled => {
                self.disable();
                Ok(())
            }
            OverlayState::Failed { .. } => {
                debug!("coverage overlay is disabled after a failure");
                Ok(())
            }
        }
    }

    /// Keyboard shortcut. Returns whether the key was handled.
    pub async fn on_key(&mut self, key: char) -> Result<bool, OverlayError> {
        if key != TOGGLE_KEY {
            return Ok(false);
        }

        self.toggle().await?;
        Ok(true)
    }

    async fn enable(&mut self) -> Result<(), OverlayError> {
        match self.apply().await {
            Ok(()) => {
                self.state = OverlayState::Enabled;
                Ok(())
            }
            Err(err) => {
                warn!("unable to apply coverage overlay: {}", err);
                self.clear();
                self.state = OverlayState::Failed {
                    tooltip: FAILURE_TOOLTIP.to_owned(),
                };
                Err(err)
            }
        }
    }

    async fn apply(&mut self) -> Result<(), OverlayError> {
        let target = self.target().await?;
        let record = self.memo.fetch(&target.revision, &target.path).await?;
        let coverage = record.coverage.as_ref().ok_or(OverlayError::MissingCoverage)?;

        for (key, hits) in coverage.iter() {
            let color = match LineColor::for_hits(hits) {
                Some(color) => color,
                None => continue,
            };

            let line = match self.page.line_for_key(key) {
                Some(line) => line,
                None => continue,
            };
            if let Some(element) = self.page.locate_line(line) {
                element.set_background(Some(color));
                self.styled.insert(line);
            }
        }

        Ok(())
    }

    fn disable(&mut self) {
        self.clear();
        self.state = OverlayState::Disabled;
    }

    fn clear(&mut self) {
        for line in std::mem::take(&mut self.styled) {
            if let Some(element) = self.page.locate_line(line) {
                element.set_background(None);
            }
        }
    }
}
