use std::ops::BitOr;

use thiserror::Error;

use super::label::Label;

const FLASH_OPEN: [u8; 2] = [0x07, 0x31];
const FLASH_CLOSE: [u8; 2] = [0x07, 0x30];
const COLOR_ESCAPE: u8 = 0x1C;
const COLOR_CLOSE: [u8; 2] = [COLOR_ESCAPE, 0x43];
const CALL_STRING: u8 = 0x10;
const CALL_PICTURE: u8 = 0x14;

/// Errors returned while rendering formatted text.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FormatError {
    /// Text content must be plain ASCII.
    #[error("text `{text}` contains non-ASCII characters")]
    NonAsciiText { text: String },
    /// Text writes need at least one character.
    #[error("text must be at least one character long")]
    EmptyText,
    /// Formatted writes need at least one node.
    #[error("formatted text must contain at least one node")]
    EmptyFormat,
    /// The animation mode bytes are not in the protocol's mode table.
    #[error("animation mode `{code}` is not a known mode")]
    InvalidMode { code: String },
}

/// Sign features that gate optional control sequences.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct CapabilityMask(u8);

impl CapabilityMask {
    /// No optional features.
    pub const NONE: Self = Self(0x0);
    /// The sign can flash text.
    pub const FLASH: Self = Self(0x1);
    /// The sign can render coloured text.
    pub const COLOR: Self = Self(0x2);

    /// Builds a mask from individual feature flags.
    ///
    /// ```
    /// use ledsign::CapabilityMask;
    ///
    /// let mask = CapabilityMask::from_flags(true, false);
    /// assert!(mask.contains(CapabilityMask::FLASH));
    /// assert!(!mask.contains(CapabilityMask::COLOR));
    /// ```
    #[must_use]
    pub fn from_flags(supports_flash: bool, supports_color: bool) -> Self {
        let mut mask = Self::NONE;
        if supports_flash {
            mask = mask | Self::FLASH;
        }
        if supports_color {
            mask = mask | Self::COLOR;
        }
        mask
    }

    /// Returns whether every bit in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for CapabilityMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Unconditional text styles, each with a fixed open/close pair.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum GroupKind {
    /// Reduced-height font.
    Small,
    /// Decorative font.
    Fancy,
    /// Double-width characters.
    Wide,
    /// Monospaced characters.
    FixedWidth,
}

impl GroupKind {
    const fn open(self) -> [u8; 2] {
        match self {
            Self::Small => [0x1A, 0x31],
            Self::Fancy => [0x1A, 0x35],
            Self::Wide => [0x12, 0x31],
            Self::FixedWidth => [0x1E, 0x31],
        }
    }

    const fn close(self) -> [u8; 2] {
        match self {
            Self::Small | Self::Fancy => [0x1A, 0x39],
            Self::Wide => [0x12, 0x30],
            Self::FixedWidth => [0x1E, 0x30],
        }
    }
}

/// Colours and patterns available on colour-capable signs.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ColorCode {
    /// Solid red.
    Red,
    /// Solid amber.
    Amber,
    /// Solid green.
    Green,
    /// Alternating colour bands.
    Striped,
    /// Per-character colour cycling.
    Mixed,
}

impl ColorCode {
    const fn code(self) -> u8 {
        match self {
            Self::Red => 0x31,
            Self::Amber => 0x32,
            Self::Green => 0x33,
            Self::Striped => 0x39,
            Self::Mixed => 0x41,
        }
    }
}

/// A node in a formatted-text tree.
///
/// ```
/// use ledsign::{CapabilityMask, FormatNode};
///
/// let tree = FormatNode::flash(vec![FormatNode::text("HI")]);
/// assert_eq!(b"HI".to_vec(), tree.render(CapabilityMask::NONE)?);
/// assert_eq!(b"\x071HI\x070".to_vec(), tree.render(CapabilityMask::FLASH)?);
/// # Ok::<(), ledsign::FormatError>(())
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormatNode {
    /// Literal ASCII text.
    Text(String),
    /// Children wrapped in an unconditional style.
    Group(GroupKind, Vec<FormatNode>),
    /// Children flashed when the sign supports it.
    Flash(Vec<FormatNode>),
    /// Children coloured when the sign supports it.
    Color(ColorCode, Vec<FormatNode>),
    /// Inline call of a configured string page.
    StringRef(Label),
    /// Inline call of a configured picture page.
    PictureRef(Label),
}

impl FormatNode {
    /// Literal ASCII text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Renders `children` in the small font.
    #[must_use]
    pub fn small(children: Vec<FormatNode>) -> Self {
        Self::Group(GroupKind::Small, children)
    }

    /// Renders `children` in the fancy font.
    #[must_use]
    pub fn fancy(children: Vec<FormatNode>) -> Self {
        Self::Group(GroupKind::Fancy, children)
    }

    /// Renders `children` double-width.
    #[must_use]
    pub fn wide(children: Vec<FormatNode>) -> Self {
        Self::Group(GroupKind::Wide, children)
    }

    /// Renders `children` monospaced.
    #[must_use]
    pub fn fixed_width(children: Vec<FormatNode>) -> Self {
        Self::Group(GroupKind::FixedWidth, children)
    }

    /// Flashes `children` on signs that support it.
    #[must_use]
    pub fn flash(children: Vec<FormatNode>) -> Self {
        Self::Flash(children)
    }

    /// Colours `children` red on colour signs.
    #[must_use]
    pub fn red(children: Vec<FormatNode>) -> Self {
        Self::Color(ColorCode::Red, children)
    }

    /// Colours `children` amber on colour signs.
    #[must_use]
    pub fn amber(children: Vec<FormatNode>) -> Self {
        Self::Color(ColorCode::Amber, children)
    }

    /// Colours `children` green on colour signs.
    #[must_use]
    pub fn green(children: Vec<FormatNode>) -> Self {
        Self::Color(ColorCode::Green, children)
    }

    /// Draws `children` in colour stripes on colour signs.
    #[must_use]
    pub fn striped(children: Vec<FormatNode>) -> Self {
        Self::Color(ColorCode::Striped, children)
    }

    /// Cycles the colour of `children` on colour signs.
    #[must_use]
    pub fn mixed(children: Vec<FormatNode>) -> Self {
        Self::Color(ColorCode::Mixed, children)
    }

    /// Renders this node to control bytes for a sign with `mask`.
    ///
    /// Flash and colour wrappers are dropped when the sign lacks the feature;
    /// their children are always rendered.
    ///
    /// # Errors
    ///
    /// Returns an error when any text node holds non-ASCII content.
    pub fn render(&self, mask: CapabilityMask) -> Result<Vec<u8>, FormatError> {
        let mut rendered = Vec::new();
        self.render_into(mask, &mut rendered)?;
        Ok(rendered)
    }

    fn render_into(&self, mask: CapabilityMask, out: &mut Vec<u8>) -> Result<(), FormatError> {
        match self {
            Self::Text(text) => out.extend_from_slice(&ascii_bytes(text)?),
            Self::Group(kind, children) => {
                wrap(out, kind.open(), kind.close(), |out| {
                    render_children(children, mask, out)
                })?;
            }
            Self::Flash(children) if mask.contains(CapabilityMask::FLASH) => {
                wrap(out, FLASH_OPEN, FLASH_CLOSE, |out| {
                    render_children(children, mask, out)
                })?;
            }
            Self::Color(color, children) if mask.contains(CapabilityMask::COLOR) => {
                wrap(out, [COLOR_ESCAPE, color.code()], COLOR_CLOSE, |out| {
                    render_children(children, mask, out)
                })?;
            }
            Self::Flash(children) | Self::Color(_, children) => {
                render_children(children, mask, out)?;
            }
            Self::StringRef(label) => out.extend_from_slice(&[CALL_STRING, label.value()]),
            Self::PictureRef(label) => out.extend_from_slice(&[CALL_PICTURE, label.value()]),
        }
        Ok(())
    }
}

/// Renders a sequence of sibling nodes back to back.
///
/// # Errors
///
/// Returns an error when any text node holds non-ASCII content.
pub fn render_all(nodes: &[FormatNode], mask: CapabilityMask) -> Result<Vec<u8>, FormatError> {
    let mut rendered = Vec::new();
    render_children(nodes, mask, &mut rendered)?;
    Ok(rendered)
}

pub(crate) fn ascii_bytes(text: &str) -> Result<Vec<u8>, FormatError> {
    if !text.is_ascii() {
        return Err(FormatError::NonAsciiText {
            text: text.to_string(),
        });
    }
    Ok(text.as_bytes().to_vec())
}

fn render_children(
    children: &[FormatNode],
    mask: CapabilityMask,
    out: &mut Vec<u8>,
) -> Result<(), FormatError> {
    children
        .iter()
        .try_for_each(|child| child.render_into(mask, out))
}

fn wrap<F>(out: &mut Vec<u8>, open: [u8; 2], close: [u8; 2], body: F) -> Result<(), FormatError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), FormatError>,
{
    out.extend_from_slice(&open);
    body(out)?;
    out.extend_from_slice(&close);
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn label(value: char) -> Label {
        Label::new(value).expect("test label should be valid")
    }

    fn all_features() -> CapabilityMask {
        CapabilityMask::FLASH | CapabilityMask::COLOR
    }

    #[test]
    fn text_renders_verbatim() {
        let rendered = FormatNode::text("abc ")
            .render(CapabilityMask::NONE)
            .expect("ascii text should render");
        assert_eq!(b"abc ".to_vec(), rendered);
    }

    #[test]
    fn text_rejects_non_ascii() {
        assert_matches!(
            FormatNode::text("café").render(CapabilityMask::NONE),
            Err(FormatError::NonAsciiText { text }) if text == "café"
        );
    }

    #[rstest]
    #[case(FormatNode::small(vec![FormatNode::text("x")]), b"\x1a1x\x1a9".to_vec())]
    #[case(FormatNode::fancy(vec![FormatNode::text("x")]), b"\x1a5x\x1a9".to_vec())]
    #[case(FormatNode::wide(vec![FormatNode::text("x")]), b"\x121x\x120".to_vec())]
    #[case(FormatNode::fixed_width(vec![FormatNode::text("x")]), b"\x1e1x\x1e0".to_vec())]
    fn groups_render_regardless_of_mask(#[case] node: FormatNode, #[case] expected: Vec<u8>) {
        for mask in [CapabilityMask::NONE, all_features()] {
            let rendered = node.render(mask).expect("group should render");
            assert_eq!(expected, rendered);
        }
    }

    #[rstest]
    #[case(FormatNode::red(vec![FormatNode::text("x")]), 0x31)]
    #[case(FormatNode::amber(vec![FormatNode::text("x")]), 0x32)]
    #[case(FormatNode::green(vec![FormatNode::text("x")]), 0x33)]
    #[case(FormatNode::striped(vec![FormatNode::text("x")]), 0x39)]
    #[case(FormatNode::mixed(vec![FormatNode::text("x")]), 0x41)]
    fn colors_wrap_only_on_color_signs(#[case] node: FormatNode, #[case] code: u8) {
        let plain = node
            .render(CapabilityMask::FLASH)
            .expect("colour node should render");
        assert_eq!(b"x".to_vec(), plain);

        let coloured = node
            .render(CapabilityMask::COLOR)
            .expect("colour node should render");
        assert_eq!(vec![0x1C, code, b'x', 0x1C, 0x43], coloured);
    }

    #[test]
    fn flash_wraps_only_on_flash_signs() {
        let node = FormatNode::flash(vec![FormatNode::text("a"), FormatNode::text("b")]);
        assert_eq!(
            b"ab".to_vec(),
            node.render(CapabilityMask::COLOR).expect("flash should render")
        );
        assert_eq!(
            b"\x071ab\x070".to_vec(),
            node.render(CapabilityMask::FLASH).expect("flash should render")
        );
    }

    #[test]
    fn page_references_render_under_any_mask() {
        let nodes = [FormatNode::StringRef(label('B')), FormatNode::PictureRef(label('C'))];
        for mask in [CapabilityMask::NONE, all_features()] {
            let rendered = render_all(&nodes, mask).expect("references should render");
            assert_eq!(vec![0x10, b'B', 0x14, b'C'], rendered);
        }
    }

    #[test]
    fn degraded_rendering_matches_stripped_tree() {
        let styled = vec![
            FormatNode::small(vec![
                FormatNode::flash(vec![
                    FormatNode::red(vec![FormatNode::text("A")]),
                    FormatNode::amber(vec![FormatNode::text("B")]),
                ]),
                FormatNode::mixed(vec![FormatNode::text("abc")]),
            ]),
            FormatNode::text(" "),
        ];
        let stripped = vec![
            FormatNode::small(vec![
                FormatNode::text("A"),
                FormatNode::text("B"),
                FormatNode::text("abc"),
            ]),
            FormatNode::text(" "),
        ];

        assert_eq!(
            render_all(&stripped, CapabilityMask::NONE).expect("stripped tree should render"),
            render_all(&styled, CapabilityMask::NONE).expect("styled tree should render"),
        );
    }

    #[test]
    fn nested_rendering_under_full_mask() {
        let tree = FormatNode::small(vec![FormatNode::flash(vec![FormatNode::green(vec![
            FormatNode::text("C"),
        ])])]);
        let rendered = tree.render(all_features()).expect("tree should render");
        assert_eq!(
            vec![
                0x1A, 0x31, 0x07, 0x31, 0x1C, 0x33, b'C', 0x1C, 0x43, 0x07, 0x30, 0x1A, 0x39
            ],
            rendered
        );
    }

    #[test]
    fn mask_from_flags_sets_bits() {
        assert_eq!(0x0, CapabilityMask::from_flags(false, false).bits());
        assert_eq!(0x1, CapabilityMask::from_flags(true, false).bits());
        assert_eq!(0x2, CapabilityMask::from_flags(false, true).bits());
        assert_eq!(0x3, CapabilityMask::from_flags(true, true).bits());
    }
}
