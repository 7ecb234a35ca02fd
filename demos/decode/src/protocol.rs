//! Shape records exchanged by the `shape` subcommand.

use courier_core::{PolymorphicRegistry, RegistryBuilder, subtypes};
use courier_core::numeric::lenient;
use serde::{Deserialize, Serialize};

/// Discriminator member shared by every shape record.
pub const KIND: &str = "kind";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    #[serde(deserialize_with = "lenient")]
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Square {
    #[serde(deserialize_with = "lenient")]
    pub side: f64,
}

/// A rectangle may carry an optional label; it is dropped on encode when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle(Circle),
    Square(Square),
    Rect(Rect),
}

subtypes!(Shape {
    Circle(Circle),
    Square(Square),
    Rect(Rect),
});

impl Shape {
    pub fn area(&self) -> f64 {
        match self {
            Self::Circle(circle) => std::f64::consts::PI * circle.radius * circle.radius,
            Self::Square(square) => square.side * square.side,
            Self::Rect(rect) => rect.width * rect.height,
        }
    }
}

/// Registry for shapes keyed by their `kind` string.
pub fn shapes() -> RegistryBuilder<Shape, String> {
    PolymorphicRegistry::builder(KIND)
        .with_subtype::<Circle>("circle")
        .with_subtype::<Square>("square")
        .with_subtype::<Rect>("rect")
}
