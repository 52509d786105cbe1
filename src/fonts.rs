//! Embedded font used by every chart and legend.
//!
//! Text is rendered from the bundled DejaVu Sans so output does not depend on
//! the fonts installed on the host.

use std::sync::OnceLock;

use plotters::style::{register_font, FontStyle};

use crate::error::{ReportError, Result};

pub const FAMILY: &str = "sans-serif";

static DEJAVU_SANS: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
static REGISTERED: OnceLock<bool> = OnceLock::new();

/// Registers the embedded font with plotters, once per process.
pub fn ensure_registered() -> Result<()> {
    let ok = *REGISTERED.get_or_init(|| {
        [FontStyle::Normal, FontStyle::Bold]
            .into_iter()
            .all(|style| register_font(FAMILY, style, DEJAVU_SANS).is_ok())
    });

    if ok {
        Ok(())
    } else {
        Err(ReportError::Render("embedded font could not be loaded".to_string()))
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_register_embedded_font() {
        assert!(ensure_registered().is_ok());
        assert!(ensure_registered().is_ok());
    }
}
