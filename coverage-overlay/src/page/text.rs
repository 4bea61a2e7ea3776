// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use async_trait::async_trait;

use super::{LineColor, LineElement, PageAdapter, PageTarget};
use crate::error::OverlayError;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub background: Option<LineColor>,
}

impl LineElement for TextLine {
    fn set_background(&mut self, color: Option<LineColor>) {
        self.background = color;
    }
}

/// Plain source text. Lines are indexed from zero like the coverage map.
#[derive(Clone, Debug)]
pub struct TextPage {
    target: PageTarget,
    lines: Vec<TextLine>,
}

impl TextPage {
    pub fn new(target: PageTarget, source: &str) -> Self {
        let lines = source
            .lines()
            .map(|text| TextLine {
                text: text.to_owned(),
                background: None,
            })
            .collect();

        Self { target, lines }
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }
}

#[async_trait]
impl PageAdapter for TextPage {
    async fn resolve(&self) -> Result<PageTarget, OverlayError> {
        Ok(self.target.clone())
    }

    fn locate_line(&mut self, line: u32) -> Option<&mut dyn LineElement> {
        self.lines
            .get_mut(line as usize)
            .map(|line| line as &mut dyn LineElement)
    }
}

/// One line per source line: a marker column (`+` covered, `-` uncovered),
/// the one-based line number, then the text.
impl fmt::Display for TextPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.lines.len().to_string().len();

        for (index, line) in self.lines.iter().enumerate() {
            let marker = match line.background {
                Some(LineColor::Covered) => '+',
                Some(LineColor::Uncovered) => '-',
                None => ' ',
            };
            writeln!(f, "{} {:>width$} | {}", marker, index + 1, line.text, width = width)?;
        }

        Ok(())
    }
}
