use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Unicode-aware text measurement. Built once by the caller and lent to
/// whoever needs it; there is no process-wide instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextMeasure {
    tab_width: usize,
}

impl Default for TextMeasure {
    fn default() -> Self {
        Self::new(DEFAULT_TAB_WIDTH)
    }
}

impl TextMeasure {
    #[must_use]
    pub const fn new(tab_width: usize) -> Self {
        Self { tab_width }
    }

    #[must_use]
    pub const fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// User-perceived characters (extended grapheme clusters).
    #[must_use]
    pub fn grapheme_count(&self, s: &str) -> usize {
        s.graphemes(true).count()
    }

    /// Terminal cells occupied by `s`, tabs expanded to `tab_width`.
    #[must_use]
    pub fn display_width(&self, s: &str) -> usize {
        s.graphemes(true)
            .map(|g| if g == "\t" { self.tab_width } else { g.width() })
            .sum()
    }
}
