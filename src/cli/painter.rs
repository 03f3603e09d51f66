use owo_colors::{OwoColorize, Style as OwoStyle};

/// Styles pretty command output, or passes it through untouched.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    /// Check mark that prefixes a successful command line.
    pub(crate) fn tick(self) -> String {
        self.paint("✓", OwoStyle::new().bold().green())
    }

    pub(crate) fn value<T: AsRef<str>>(self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold())
    }

    fn paint(self, text: &str, style: OwoStyle) -> String {
        if self.use_colour {
            format!("{}", text.style(style))
        } else {
            text.to_string()
        }
    }
}
