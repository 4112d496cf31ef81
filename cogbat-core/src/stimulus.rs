/// Straight (non-premultiplied) RGBA colour.
pub type Rgba = [u8; 4];

pub const BLACK: Rgba = [0, 0, 0, 255];
pub const WHITE: Rgba = [255, 255, 255, 255];
pub const GREY: Rgba = [128, 128, 128, 255];
pub const RED: Rgba = [255, 0, 0, 255];
pub const GREEN: Rgba = [0, 255, 0, 255];
pub const BLUE: Rgba = [0, 0, 255, 255];

/// One axis of an element's placement.
///
/// `Center` centres the element on the screen, `At` puts its leading edge at
/// an absolute pixel offset and `FromCenter` puts its leading edge at an
/// offset from the screen's midpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coord {
    Center,
    At(f32),
    FromCenter(f32),
}

impl Coord {
    /// Leading edge of an element of `size` inside a surface of `extent`.
    pub fn resolve(self, extent: f32, size: f32) -> f32 {
        match self {
            Coord::Center => (extent - size) * 0.5,
            Coord::At(px) => px,
            Coord::FromCenter(offset) => extent * 0.5 + offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: Coord,
    pub y: Coord,
}

impl Position {
    pub const CENTER: Position = Position {
        x: Coord::Center,
        y: Coord::Center,
    };

    pub fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Horizontally centred, with the top edge `dy` pixels from the midpoint.
    pub fn center_x(dy: f32) -> Self {
        Self {
            x: Coord::Center,
            y: Coord::FromCenter(dy),
        }
    }

    pub fn top_left(x: f32, y: f32) -> Self {
        Self {
            x: Coord::At(x),
            y: Coord::At(y),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::CENTER
    }
}

/// Handle to a surface preloaded by the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowDirection {
    Left,
    Right,
}

impl ArrowDirection {
    pub fn label(&self) -> &'static str {
        match self {
            ArrowDirection::Left => "left",
            ArrowDirection::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Rendered from a string at draw time.
    Text {
        content: String,
        size: f32,
        color: Rgba,
        at: Position,
    },
    /// Blitted from a surface loaded ahead of time.
    Image {
        handle: ImageHandle,
        scale: f32,
        at: Position,
    },
    Fixation {
        size: f32,
        color: Rgba,
        at: Position,
    },
    Arrow {
        direction: ArrowDirection,
        size: f32,
        color: Rgba,
        at: Position,
    },
    Rectangle {
        width: f32,
        height: f32,
        color: Rgba,
        at: Position,
    },
    Circle {
        radius: f32,
        color: Rgba,
        at: Position,
    },
    Outline {
        width: f32,
        height: f32,
        thickness: f32,
        color: Rgba,
        at: Position,
    },
    /// Ring crossed by two diagonals, used to mask a preceding digit.
    Mask {
        size: f32,
        color: Rgba,
        at: Position,
    },
}

impl Element {
    pub fn text(content: impl Into<String>, size: f32, color: Rgba) -> Self {
        Element::Text {
            content: content.into(),
            size,
            color,
            at: Position::CENTER,
        }
    }

    pub fn image(handle: ImageHandle) -> Self {
        Element::Image {
            handle,
            scale: 1.0,
            at: Position::CENTER,
        }
    }

    pub fn fixation(color: Rgba) -> Self {
        Element::Fixation {
            size: 40.0,
            color,
            at: Position::CENTER,
        }
    }

    /// Moves the element, keeping everything else.
    pub fn at(mut self, pos: Position) -> Self {
        match &mut self {
            Element::Text { at, .. }
            | Element::Image { at, .. }
            | Element::Fixation { at, .. }
            | Element::Arrow { at, .. }
            | Element::Rectangle { at, .. }
            | Element::Circle { at, .. }
            | Element::Outline { at, .. }
            | Element::Mask { at, .. } => *at = pos,
        }
        self
    }

    pub fn position(&self) -> Position {
        match self {
            Element::Text { at, .. }
            | Element::Image { at, .. }
            | Element::Fixation { at, .. }
            | Element::Arrow { at, .. }
            | Element::Rectangle { at, .. }
            | Element::Circle { at, .. }
            | Element::Outline { at, .. }
            | Element::Mask { at, .. } => *at,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Element::Text { .. })
    }
}

/// Everything shown in one presented frame, drawn back to front.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub background: Rgba,
    pub elements: Vec<Element>,
}

impl Scene {
    pub fn new(background: Rgba) -> Self {
        Self {
            background,
            elements: Vec::new(),
        }
    }

    pub fn with(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn is_blank(&self) -> bool {
        self.elements.is_empty()
    }

    /// Text content in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|t| t.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coords_resolve_to_leading_edge() {
        assert_eq!(Coord::Center.resolve(1000.0, 100.0), 450.0);
        assert_eq!(Coord::At(100.0).resolve(1000.0, 100.0), 100.0);
        assert_eq!(Coord::FromCenter(31.0).resolve(1000.0, 100.0), 531.0);
        assert_eq!(Coord::FromCenter(-131.0).resolve(1000.0, 100.0), 369.0);
    }

    #[test]
    fn at_moves_any_element() {
        let e = Element::fixation(BLACK).at(Position::top_left(3.0, 4.0));
        assert_eq!(e.position(), Position::top_left(3.0, 4.0));
        assert!(!e.is_text());
    }

    #[test]
    fn scene_collects_text() {
        let scene = Scene::new(WHITE)
            .with(Element::text("correct", 30.0, GREEN))
            .with(Element::fixation(BLACK))
            .with(Element::text("(press space to continue)", 30.0, BLACK));
        assert_eq!(
            scene.texts().collect::<Vec<_>>(),
            vec!["correct", "(press space to continue)"]
        );
        assert!(scene.contains_text("space"));
        assert!(!scene.is_blank());
    }
}
